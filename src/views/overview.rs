use std::collections::HashSet;

use crate::aggregate::group::{value_counts, GroupKey, GroupedTable};
use crate::aggregate::summary::{mean_of, summary_statistics};
use crate::data::model::{Dataset, Dimension, Measure};

use super::share;

/// Headline metrics comparing a filtered dataset against its unfiltered
/// baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewMetrics {
    pub accidents: usize,
    /// Filtered share of the baseline, percent.
    pub share_of_baseline: Option<f64>,
    pub total_fatalities: u64,
    pub total_injuries: u64,
    pub fatalities_per_accident: Option<f64>,
    pub injuries_per_accident: Option<f64>,
    pub avg_response_time: Option<f64>,
    /// Filtered mean response time minus the baseline mean, minutes.
    pub response_time_delta: Option<f64>,
}

pub fn metrics(filtered: &Dataset, baseline: &Dataset) -> OverviewMetrics {
    let stats = summary_statistics(filtered);
    let baseline_response = mean_of(baseline, Measure::ResponseTime);
    let per_accident =
        |total: u64| (stats.count > 0).then(|| total as f64 / stats.count as f64);

    OverviewMetrics {
        accidents: stats.count,
        share_of_baseline: share(stats.count, baseline.len()),
        total_fatalities: stats.total_fatalities,
        total_injuries: stats.total_injuries,
        fatalities_per_accident: per_accident(stats.total_fatalities),
        injuries_per_accident: per_accident(stats.total_injuries),
        avg_response_time: stats.avg_response_time,
        response_time_delta: match (stats.avg_response_time, baseline_response) {
            (Some(filtered_mean), Some(base_mean)) => Some(filtered_mean - base_mean),
            _ => None,
        },
    }
}

/// Accidents per severity level, first-appearance order.
pub fn severity_distribution(dataset: &Dataset) -> GroupedTable {
    value_counts(dataset, &GroupKey::Dim(Dimension::Severity))
}

/// What the dataset covers: analysis period, breadth, latest-year volume.
/// Meant for the unfiltered dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetCoverage {
    /// First and last calendar year on record.
    pub year_span: Option<(i32, i32)>,
    /// Accidents recorded in the latest year.
    pub latest_year_accidents: usize,
    pub regions: usize,
    pub countries: usize,
}

pub fn coverage(dataset: &Dataset) -> DatasetCoverage {
    let year_span = dataset.year_span();
    let latest_year_accidents = year_span.map_or(0, |(_, hi)| {
        dataset.iter().filter(|r| r.year == Some(hi)).count()
    });
    let regions: HashSet<&str> = dataset.iter().map(|r| r.region.as_str()).collect();
    let countries: HashSet<&str> = dataset.iter().map(|r| r.country.as_str()).collect();
    DatasetCoverage {
        year_span,
        latest_year_accidents,
        regions: regions.len(),
        countries: countries.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::AccidentRecord;

    fn record(severity: &str, fatalities: u32, response: Option<f64>) -> AccidentRecord {
        AccidentRecord {
            severity: severity.to_string(),
            fatalities: Some(fatalities),
            injuries: Some(fatalities * 2),
            response_time_min: response,
            ..Default::default()
        }
    }

    #[test]
    fn metrics_compare_filtered_against_baseline() {
        let baseline = Dataset::from_records(vec![
            record("Severe", 2, Some(10.0)),
            record("Minor", 0, Some(20.0)),
            record("Minor", 0, Some(30.0)),
            record("Moderate", 1, Some(20.0)),
        ]);
        let filtered = Dataset::from_records(vec![record("Severe", 2, Some(10.0))]);

        let m = metrics(&filtered, &baseline);
        assert_eq!(m.accidents, 1);
        assert_eq!(m.share_of_baseline, Some(25.0));
        assert_eq!(m.total_fatalities, 2);
        assert_eq!(m.total_injuries, 4);
        assert_eq!(m.fatalities_per_accident, Some(2.0));
        assert_eq!(m.avg_response_time, Some(10.0));
        // 10 filtered against a 20 baseline mean.
        assert_eq!(m.response_time_delta, Some(-10.0));
    }

    #[test]
    fn empty_filtered_set_yields_none_metrics() {
        let baseline = Dataset::from_records(vec![record("Severe", 1, Some(10.0))]);
        let m = metrics(&Dataset::default(), &baseline);
        assert_eq!(m.accidents, 0);
        assert_eq!(m.share_of_baseline, Some(0.0));
        assert_eq!(m.fatalities_per_accident, None);
        assert_eq!(m.avg_response_time, None);
        assert_eq!(m.response_time_delta, None);
    }

    #[test]
    fn coverage_spans_the_recorded_years() {
        let mut records = Vec::new();
        for (year, region, country) in [
            (2022, "Europe", "UK"),
            (2023, "Europe", "Germany"),
            (2024, "North America", "USA"),
            (2024, "North America", "Canada"),
        ] {
            records.push(AccidentRecord {
                year: Some(year),
                region: region.to_string(),
                country: country.to_string(),
                ..Default::default()
            });
        }
        let c = coverage(&Dataset::from_records(records));
        assert_eq!(c.year_span, Some((2022, 2024)));
        assert_eq!(c.latest_year_accidents, 2);
        assert_eq!(c.regions, 2);
        assert_eq!(c.countries, 4);

        let empty = coverage(&Dataset::default());
        assert_eq!(empty.year_span, None);
        assert_eq!(empty.latest_year_accidents, 0);
    }

    #[test]
    fn severity_distribution_counts_each_level() {
        let ds = Dataset::from_records(vec![
            record("Severe", 1, None),
            record("Minor", 0, None),
            record("Minor", 0, None),
        ]);
        let table = severity_distribution(&ds);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].keys, vec!["Severe"]);
        assert_eq!(table.rows[1].values, vec![Some(2.0)]);
    }
}
