use std::collections::HashMap;

use super::group::{Agg, AggState, GroupKey, GroupRow, GroupedTable};
use crate::data::model::{Dataset, Measure};

// ---------------------------------------------------------------------------
// Dense cross-tabulation
// ---------------------------------------------------------------------------

/// A dense `|row_keys| × |col_keys|` matrix over the observed keys.
///
/// Every cell holds a number: unobserved combinations and means with no
/// present values fill with `0.0`.  Key order is first appearance until a
/// canonical order is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
    pub row_name: String,
    pub col_name: String,
    pub value_name: String,
    pub row_keys: Vec<String>,
    pub col_keys: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// Cross-tabulate `value` under `agg`, one row per observed `row` key and
/// one column per observed `col` key.  Rows with a missing key on either
/// axis are left out.
pub fn pivot(
    dataset: &Dataset,
    row: &GroupKey,
    col: &GroupKey,
    value: Measure,
    agg: Agg,
) -> PivotTable {
    let mut row_keys: Vec<String> = Vec::new();
    let mut col_keys: Vec<String> = Vec::new();
    let mut row_index: HashMap<String, usize> = HashMap::new();
    let mut col_index: HashMap<String, usize> = HashMap::new();
    let mut cells: HashMap<(usize, usize), AggState> = HashMap::new();

    for (i, record) in dataset.iter().enumerate() {
        let (Some(rk), Some(ck)) = (row.key_for(record, i), col.key_for(record, i)) else {
            continue;
        };
        let r = *row_index.entry(rk.clone()).or_insert_with(|| {
            row_keys.push(rk.clone());
            row_keys.len() - 1
        });
        let c = *col_index.entry(ck.clone()).or_insert_with(|| {
            col_keys.push(ck.clone());
            col_keys.len() - 1
        });
        cells
            .entry((r, c))
            .or_default()
            .add(record.measure(value));
    }

    let mut values = vec![vec![0.0; col_keys.len()]; row_keys.len()];
    for ((r, c), state) in cells {
        values[r][c] = state.finish(agg).unwrap_or(0.0);
    }

    PivotTable {
        row_name: row.name().to_string(),
        col_name: col.name().to_string(),
        value_name: format!("{} ({})", value.label(), agg.tag()),
        row_keys,
        col_keys,
        values,
    }
}

impl PivotTable {
    /// Re-shape rows to exactly `canonical`: listed keys that were never
    /// observed become zero rows, observed keys left off the list are
    /// dropped.
    pub fn with_row_order(mut self, canonical: &[&str]) -> Self {
        let index: HashMap<&str, usize> = self
            .row_keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();
        let width = self.col_keys.len();
        let values = canonical
            .iter()
            .map(|key| match index.get(key) {
                Some(&i) => self.values[i].clone(),
                None => vec![0.0; width],
            })
            .collect();
        self.row_keys = canonical.iter().map(|k| (*k).to_string()).collect();
        self.values = values;
        self
    }

    /// Column counterpart of [`PivotTable::with_row_order`].
    pub fn with_col_order(mut self, canonical: &[&str]) -> Self {
        let index: HashMap<&str, usize> = self
            .col_keys
            .iter()
            .enumerate()
            .map(|(i, k)| (k.as_str(), i))
            .collect();
        self.values = self
            .values
            .iter()
            .map(|row| {
                canonical
                    .iter()
                    .map(|key| index.get(key).map_or(0.0, |&i| row[i]))
                    .collect()
            })
            .collect();
        self.col_keys = canonical.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// Flatten to a [`GroupedTable`]: one key column for the row axis, one
    /// value column per column key.  Used for export.
    pub fn to_grouped(&self) -> GroupedTable {
        GroupedTable {
            key_columns: vec![self.row_name.clone()],
            value_columns: self.col_keys.clone(),
            rows: self
                .row_keys
                .iter()
                .zip(&self.values)
                .map(|(key, row)| GroupRow {
                    keys: vec![key.clone()],
                    values: row.iter().map(|v| Some(*v)).collect(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{AccidentRecord, Dimension};

    fn record(day: &str, time: &str, injuries: Option<u32>) -> AccidentRecord {
        AccidentRecord {
            day_of_week: day.to_string(),
            time_of_day: time.to_string(),
            injuries,
            ..Default::default()
        }
    }

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            record("Monday", "Morning", Some(2)),
            record("Monday", "Night", Some(1)),
            record("Tuesday", "Morning", Some(4)),
            record("Monday", "Morning", Some(3)),
        ])
    }

    #[test]
    fn matrix_is_dense_over_observed_keys_with_zero_fill() {
        let table = pivot(
            &sample(),
            &GroupKey::Dim(Dimension::DayOfWeek),
            &GroupKey::Dim(Dimension::TimeOfDay),
            Measure::Injuries,
            Agg::Sum,
        );
        assert_eq!(table.row_keys, vec!["Monday", "Tuesday"]);
        assert_eq!(table.col_keys, vec!["Morning", "Night"]);
        assert_eq!(table.values.len(), 2);
        assert!(table.values.iter().all(|row| row.len() == 2));
        assert_eq!(table.values[0], vec![5.0, 1.0]);
        // Tuesday/Night was never observed.
        assert_eq!(table.values[1], vec![4.0, 0.0]);
    }

    #[test]
    fn count_pivot_counts_rows_per_cell() {
        let table = pivot(
            &sample(),
            &GroupKey::Dim(Dimension::DayOfWeek),
            &GroupKey::Dim(Dimension::TimeOfDay),
            Measure::Injuries,
            Agg::Count,
        );
        assert_eq!(table.values[0], vec![2.0, 1.0]);
        assert_eq!(table.values[1], vec![1.0, 0.0]);
    }

    #[test]
    fn canonical_orders_add_zero_lines_and_drop_unlisted_keys() {
        let table = pivot(
            &sample(),
            &GroupKey::Dim(Dimension::DayOfWeek),
            &GroupKey::Dim(Dimension::TimeOfDay),
            Measure::Injuries,
            Agg::Sum,
        )
        .with_row_order(&["Sunday", "Monday"])
        .with_col_order(&["Morning", "Afternoon", "Night"]);

        assert_eq!(table.row_keys, vec!["Sunday", "Monday"]);
        assert_eq!(table.col_keys, vec!["Morning", "Afternoon", "Night"]);
        // Sunday was never observed; Tuesday was dropped.
        assert_eq!(table.values[0], vec![0.0, 0.0, 0.0]);
        assert_eq!(table.values[1], vec![5.0, 0.0, 1.0]);
    }

    #[test]
    fn rows_with_a_missing_axis_key_are_left_out() {
        let ds = Dataset::from_records(vec![
            record("Monday", "Morning", Some(2)),
            record("", "Morning", Some(9)),
            record("Monday", "", Some(9)),
        ]);
        let table = pivot(
            &ds,
            &GroupKey::Dim(Dimension::DayOfWeek),
            &GroupKey::Dim(Dimension::TimeOfDay),
            Measure::Injuries,
            Agg::Sum,
        );
        assert_eq!(table.row_keys, vec!["Monday"]);
        assert_eq!(table.col_keys, vec!["Morning"]);
        assert_eq!(table.values, vec![vec![2.0]]);
    }

    #[test]
    fn flattening_keeps_shape_and_headers() {
        let grouped = pivot(
            &sample(),
            &GroupKey::Dim(Dimension::DayOfWeek),
            &GroupKey::Dim(Dimension::TimeOfDay),
            Measure::Injuries,
            Agg::Sum,
        )
        .to_grouped();
        assert_eq!(grouped.key_columns, vec!["Day of Week"]);
        assert_eq!(grouped.value_columns, vec!["Morning", "Night"]);
        assert_eq!(grouped.rows.len(), 2);
        assert_eq!(grouped.rows[0].values, vec![Some(5.0), Some(1.0)]);
    }
}
