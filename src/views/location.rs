use crate::aggregate::group::{group_by, Agg, GroupKey, GroupedTable};
use crate::aggregate::pivot::{pivot, PivotTable};
use crate::data::model::{Dataset, Dimension, Measure};

use super::TIME_OF_DAY_ORDER;

/// ISO-3166 alpha-3 code for the countries the source data carries; the
/// join key choropleth renderers need.
pub fn iso3_code(country: &str) -> Option<&'static str> {
    match country {
        "USA" => Some("USA"),
        "UK" => Some("GBR"),
        "Canada" => Some("CAN"),
        "India" => Some("IND"),
        "China" => Some("CHN"),
        "Germany" => Some("DEU"),
        "Australia" => Some("AUS"),
        "Brazil" => Some("BRA"),
        "Japan" => Some("JPN"),
        "Russia" => Some("RUS"),
        _ => None,
    }
}

/// Per-country casualty totals with the ISO join key attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRow {
    pub country: String,
    pub iso3: Option<&'static str>,
    pub fatalities: u64,
    pub injuries: u64,
}

pub fn country_totals(dataset: &Dataset) -> Vec<CountryRow> {
    let table = group_by(
        dataset,
        &[GroupKey::Dim(Dimension::Country)],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
        ],
    );
    table
        .rows
        .into_iter()
        .map(|row| {
            let country = row.keys.into_iter().next().unwrap_or_default();
            let fatalities = row.values.first().copied().flatten().unwrap_or(0.0) as u64;
            let injuries = row.values.get(1).copied().flatten().unwrap_or(0.0) as u64;
            CountryRow {
                iso3: iso3_code(&country),
                country,
                fatalities,
                injuries,
            }
        })
        .collect()
}

/// Urban against rural casualty sums.
pub fn area_split(dataset: &Dataset) -> GroupedTable {
    group_by(
        dataset,
        &[GroupKey::Dim(Dimension::Area)],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
        ],
    )
}

/// Sums of one casualty measure per region and time of day, columns in
/// diurnal order.
pub fn region_time_pivot(dataset: &Dataset, measure: Measure) -> PivotTable {
    pivot(
        dataset,
        &GroupKey::Dim(Dimension::Region),
        &GroupKey::Dim(Dimension::TimeOfDay),
        measure,
        Agg::Sum,
    )
    .with_col_order(&TIME_OF_DAY_ORDER)
}

/// Per-region casualty and loss sums plus each region's share of the
/// filtered casualty totals.
pub fn region_table(dataset: &Dataset) -> GroupedTable {
    let mut table = group_by(
        dataset,
        &[GroupKey::Dim(Dimension::Region)],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
            (Measure::EconomicLoss, Agg::Sum),
        ],
    );
    for (col, name) in [(0, "Fatalities (%)"), (1, "Injuries (%)")] {
        let total: f64 = table
            .rows
            .iter()
            .filter_map(|r| r.values.get(col).copied().flatten())
            .sum();
        table.value_columns.push(name.to_string());
        for row in &mut table.rows {
            let v = row.values.get(col).copied().flatten().unwrap_or(0.0);
            row.values.push((total > 0.0).then(|| v / total * 100.0));
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::AccidentRecord;

    fn record(country: &str, region: &str, fatalities: u32) -> AccidentRecord {
        AccidentRecord {
            country: country.to_string(),
            region: region.to_string(),
            fatalities: Some(fatalities),
            injuries: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn iso_codes_cover_the_source_countries() {
        assert_eq!(iso3_code("UK"), Some("GBR"));
        assert_eq!(iso3_code("Japan"), Some("JPN"));
        assert_eq!(iso3_code("Atlantis"), None);
    }

    #[test]
    fn country_totals_carry_sums_and_join_keys() {
        let ds = Dataset::from_records(vec![
            record("USA", "North America", 1),
            record("USA", "North America", 0),
            record("UK", "Europe", 2),
        ]);
        let rows = country_totals(&ds);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].country, "USA");
        assert_eq!(rows[0].iso3, Some("USA"));
        assert_eq!(rows[0].fatalities, 1);
        assert_eq!(rows[0].injuries, 2);
        assert_eq!(rows[1].iso3, Some("GBR"));
        assert_eq!(rows[1].fatalities, 2);
    }

    #[test]
    fn region_shares_split_the_casualty_totals() {
        let ds = Dataset::from_records(vec![
            record("USA", "North America", 1),
            record("USA", "North America", 1),
            record("UK", "Europe", 1),
            record("India", "Asia", 1),
        ]);
        let table = region_table(&ds);
        assert_eq!(
            table.value_columns,
            vec![
                "Number of Fatalities (sum)",
                "Number of Injuries (sum)",
                "Economic Loss (sum)",
                "Fatalities (%)",
                "Injuries (%)"
            ]
        );
        assert_eq!(table.rows[0].values[3], Some(50.0));
        assert_eq!(table.rows[0].values[4], Some(50.0));
        let share_sum: f64 = table
            .rows
            .iter()
            .filter_map(|r| r.values.last().copied().flatten())
            .sum();
        assert!((share_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_casualties_leave_shares_unset() {
        let table = region_table(&Dataset::from_records(vec![record(
            "USA",
            "North America",
            0,
        )]));
        assert_eq!(table.rows[0].values[3], None);
    }

    #[test]
    fn region_time_pivot_uses_diurnal_column_order() {
        let mut early = record("USA", "North America", 2);
        early.time_of_day = "Night".to_string();
        let mut late = record("UK", "Europe", 1);
        late.time_of_day = "Morning".to_string();
        let table = region_time_pivot(
            &Dataset::from_records(vec![early, late]),
            Measure::Fatalities,
        );
        assert_eq!(
            table.col_keys,
            vec!["Morning", "Afternoon", "Evening", "Night"]
        );
        assert_eq!(table.values[0], vec![0.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn area_split_sums_casualties_per_area() {
        let mut urban = record("USA", "North America", 1);
        urban.area = "Urban".to_string();
        let mut rural = record("USA", "North America", 3);
        rural.area = "Rural".to_string();
        let table = area_split(&Dataset::from_records(vec![urban, rural]));
        assert_eq!(table.key_columns, vec!["Urban/Rural"]);
        assert_eq!(table.rows[0].keys, vec!["Urban"]);
        assert_eq!(table.rows[0].values, vec![Some(1.0), Some(1.0)]);
        assert_eq!(table.rows[1].values, vec![Some(3.0), Some(1.0)]);
    }
}
