use std::borrow::Cow;
use std::collections::HashMap;

use crate::data::model::{AccidentRecord, Dataset, Dimension, Measure};

// ---------------------------------------------------------------------------
// Grouping keys
// ---------------------------------------------------------------------------

/// A grouping key: either a model dimension or a caller-derived label
/// column (quantile bins, calendar buckets).
///
/// A row whose key label is unavailable is left out of the grouping, so
/// groups never contain rows with unknown membership.
#[derive(Debug, Clone)]
pub enum GroupKey<'a> {
    Dim(Dimension),
    Derived {
        name: &'a str,
        labels: &'a [Option<String>],
    },
}

impl GroupKey<'_> {
    /// Column name the key contributes to derived tables.
    pub fn name(&self) -> &str {
        match self {
            GroupKey::Dim(d) => d.label(),
            GroupKey::Derived { name, .. } => name,
        }
    }

    pub(super) fn key_for(&self, record: &AccidentRecord, idx: usize) -> Option<String> {
        match self {
            GroupKey::Dim(d) => record.dimension(*d).map(Cow::into_owned),
            GroupKey::Derived { labels, .. } => labels.get(idx).cloned().flatten(),
        }
    }
}

/// How a measure folds within one group.
///
/// `Sum` over zero present values is `0`; `Mean` over zero present values
/// is `None`; `Count` is the number of rows in the group regardless of
/// which cells are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agg {
    Sum,
    Mean,
    Count,
}

impl Agg {
    pub(super) fn tag(self) -> &'static str {
        match self {
            Agg::Sum => "sum",
            Agg::Mean => "mean",
            Agg::Count => "count",
        }
    }
}

// ---------------------------------------------------------------------------
// Grouped tables
// ---------------------------------------------------------------------------

/// One row per observed key combination, in first-appearance order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedTable {
    pub key_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub rows: Vec<GroupRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub keys: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl GroupedTable {
    /// Re-order rows by a caller-supplied key order for key column `col`.
    /// Rows whose key is not listed are dropped; ordering is stable within
    /// equal keys.
    pub fn order_rows_by_key(&mut self, col: usize, canonical: &[&str]) {
        if col >= self.key_columns.len() {
            return;
        }
        let rank: HashMap<&str, usize> = canonical
            .iter()
            .enumerate()
            .map(|(i, k)| (*k, i))
            .collect();
        self.rows
            .retain(|row| rank.contains_key(row.keys[col].as_str()));
        self.rows.sort_by_key(|row| {
            rank.get(row.keys[col].as_str())
                .copied()
                .unwrap_or(usize::MAX)
        });
    }

    /// Replace the generated value-column names, e.g. for export headers.
    pub fn with_value_names(mut self, names: &[&str]) -> Self {
        for (slot, name) in self.value_columns.iter_mut().zip(names) {
            *slot = (*name).to_string();
        }
        self
    }
}

#[derive(Clone, Copy, Default)]
pub(super) struct AggState {
    sum: f64,
    present: usize,
    rows: usize,
}

impl AggState {
    pub(super) fn add(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(v) = value {
            self.sum += v;
            self.present += 1;
        }
    }

    pub(super) fn finish(self, agg: Agg) -> Option<f64> {
        match agg {
            Agg::Sum => Some(self.sum),
            Agg::Mean => (self.present > 0).then(|| self.sum / self.present as f64),
            Agg::Count => Some(self.rows as f64),
        }
    }
}

/// Group the dataset by `keys` and fold each `(measure, agg)` pair within
/// every group.  Groups appear in first-appearance order and only when at
/// least one row belongs to them.
pub fn group_by(dataset: &Dataset, keys: &[GroupKey], aggs: &[(Measure, Agg)]) -> GroupedTable {
    let mut order: Vec<Vec<String>> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut states: Vec<Vec<AggState>> = Vec::new();

    'rows: for (i, record) in dataset.iter().enumerate() {
        let mut tuple = Vec::with_capacity(keys.len());
        for key in keys {
            match key.key_for(record, i) {
                Some(k) => tuple.push(k),
                None => continue 'rows,
            }
        }
        let slot = match index.get(&tuple) {
            Some(&s) => s,
            None => {
                let s = order.len();
                index.insert(tuple.clone(), s);
                order.push(tuple);
                states.push(vec![AggState::default(); aggs.len()]);
                s
            }
        };
        for (j, (measure, _)) in aggs.iter().enumerate() {
            states[slot][j].add(record.measure(*measure));
        }
    }

    let rows = order
        .into_iter()
        .zip(states)
        .map(|(tuple, state)| GroupRow {
            keys: tuple,
            values: aggs
                .iter()
                .zip(state)
                .map(|((_, agg), st)| st.finish(*agg))
                .collect(),
        })
        .collect();

    GroupedTable {
        key_columns: keys.iter().map(|k| k.name().to_string()).collect(),
        value_columns: aggs
            .iter()
            .map(|(m, agg)| match agg {
                Agg::Count => "Accidents".to_string(),
                _ => format!("{} ({})", m.label(), agg.tag()),
            })
            .collect(),
        rows,
    }
}

/// Occurrence counts per key, one row per observed key in first-appearance
/// order.  The count column is named `Accidents`.
pub fn value_counts(dataset: &Dataset, key: &GroupKey) -> GroupedTable {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for (i, record) in dataset.iter().enumerate() {
        if let Some(k) = key.key_for(record, i) {
            if !counts.contains_key(&k) {
                order.push(k.clone());
            }
            *counts.entry(k).or_insert(0) += 1;
        }
    }

    GroupedTable {
        key_columns: vec![key.name().to_string()],
        value_columns: vec!["Accidents".to_string()],
        rows: order
            .into_iter()
            .map(|k| {
                let n = counts.get(&k).copied().unwrap_or(0);
                GroupRow {
                    keys: vec![k],
                    values: vec![Some(n as f64)],
                }
            })
            .collect(),
    }
}

/// Most frequent key label; ties keep the first appearance.
pub fn mode(dataset: &Dataset, key: &GroupKey) -> Option<String> {
    let table = value_counts(dataset, key);
    let mut best: Option<(String, f64)> = None;
    for row in table.rows {
        let n = row.values.first().copied().flatten().unwrap_or(0.0);
        let better = best.as_ref().map_or(true, |(_, bn)| n > *bn);
        if better {
            if let Some(k) = row.keys.into_iter().next() {
                best = Some((k, n));
            }
        }
    }
    best.map(|(k, _)| k)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(severity: &str, weather: &str, injuries: Option<u32>) -> AccidentRecord {
        AccidentRecord {
            severity: severity.to_string(),
            weather: weather.to_string(),
            injuries,
            ..Default::default()
        }
    }

    fn sample() -> Dataset {
        Dataset::from_records(vec![
            record("Severe", "Rainy", Some(3)),
            record("Minor", "Clear", Some(0)),
            record("Severe", "Clear", None),
            record("Minor", "Clear", Some(2)),
        ])
    }

    #[test]
    fn groups_appear_in_first_appearance_order() {
        let table = group_by(
            &sample(),
            &[GroupKey::Dim(Dimension::Severity)],
            &[(Measure::Injuries, Agg::Sum)],
        );
        let keys: Vec<&str> = table.rows.iter().map(|r| r.keys[0].as_str()).collect();
        assert_eq!(keys, vec!["Severe", "Minor"]);
    }

    #[test]
    fn sum_skips_missing_and_mean_of_none_present_is_none() {
        let ds = Dataset::from_records(vec![
            record("Severe", "Rainy", None),
            record("Severe", "Rainy", None),
        ]);
        let table = group_by(
            &ds,
            &[GroupKey::Dim(Dimension::Severity)],
            &[
                (Measure::Injuries, Agg::Sum),
                (Measure::Injuries, Agg::Mean),
                (Measure::Injuries, Agg::Count),
            ],
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].values, vec![Some(0.0), None, Some(2.0)]);
    }

    #[test]
    fn rows_with_missing_keys_are_left_out() {
        let ds = Dataset::from_records(vec![
            record("Severe", "Rainy", Some(1)),
            record("", "Rainy", Some(5)),
        ]);
        let table = group_by(
            &ds,
            &[GroupKey::Dim(Dimension::Severity)],
            &[(Measure::Injuries, Agg::Sum)],
        );
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].keys, vec!["Severe".to_string()]);
        assert_eq!(table.rows[0].values, vec![Some(1.0)]);
    }

    #[test]
    fn multi_key_groups_combine_both_columns() {
        let table = group_by(
            &sample(),
            &[
                GroupKey::Dim(Dimension::Severity),
                GroupKey::Dim(Dimension::Weather),
            ],
            &[(Measure::Injuries, Agg::Count)],
        );
        assert_eq!(table.key_columns.len(), 2);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].keys, vec!["Severe", "Rainy"]);
    }

    #[test]
    fn derived_labels_group_rows_and_none_drops_them() {
        let ds = sample();
        let labels = vec![
            Some("low".to_string()),
            Some("high".to_string()),
            None,
            Some("high".to_string()),
        ];
        let key = GroupKey::Derived {
            name: "Band",
            labels: &labels,
        };
        let table = group_by(&ds, &[key], &[(Measure::Injuries, Agg::Count)]);
        assert_eq!(table.key_columns, vec!["Band".to_string()]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].keys, vec!["low"]);
        assert_eq!(table.rows[0].values, vec![Some(1.0)]);
        assert_eq!(table.rows[1].keys, vec!["high"]);
        assert_eq!(table.rows[1].values, vec![Some(2.0)]);
    }

    #[test]
    fn canonical_ordering_sorts_and_drops_unlisted_keys() {
        let mut table = group_by(
            &sample(),
            &[GroupKey::Dim(Dimension::Weather)],
            &[(Measure::Injuries, Agg::Count)],
        );
        table.order_rows_by_key(0, &["Clear", "Snowy"]);
        let keys: Vec<&str> = table.rows.iter().map(|r| r.keys[0].as_str()).collect();
        assert_eq!(keys, vec!["Clear"]);
    }

    #[test]
    fn value_counts_and_mode_follow_first_appearance_on_ties() {
        let ds = Dataset::from_records(vec![
            record("Moderate", "Clear", None),
            record("Severe", "Rainy", None),
            record("Severe", "Rainy", None),
            record("Moderate", "Clear", None),
        ]);
        let key = GroupKey::Dim(Dimension::Severity);
        let table = value_counts(&ds, &key);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].keys, vec!["Moderate"]);
        // Two groups of two; the first seen wins the tie.
        assert_eq!(mode(&ds, &key), Some("Moderate".to_string()));
    }

    #[test]
    fn mode_of_empty_dataset_is_none() {
        assert_eq!(
            mode(&Dataset::default(), &GroupKey::Dim(Dimension::Severity)),
            None
        );
    }
}
