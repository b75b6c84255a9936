use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::model::{AccidentRecord, Dataset};

// ---------------------------------------------------------------------------
// Filter predicate: which accident records stay in view
// ---------------------------------------------------------------------------

/// Full selectable span per range control.  A range equal to its span
/// constrains nothing, so rows with a missing operand stay in.
pub const VEHICLES_SPAN: (u32, u32) = (1, 4);
pub const CASUALTIES_SPAN: (u32, u32) = (0, 23);
pub const RESPONSE_TIME_SPAN: (f64, f64) = (5.0, 60.0);

/// Declarative description of which accident records to keep.
///
/// Predicates are AND-composed.  Each one has a neutral value that
/// constrains nothing: an empty selection set keeps every severity or
/// cause, a range at its full span keeps rows even when the operand is
/// missing, and the involvement toggles default to off.  Narrowing a
/// range turns it into a real comparison that a missing operand can
/// never satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccidentFilter {
    /// Keep rows whose severity is in this set; empty keeps all.
    pub severity: BTreeSet<String>,
    /// Keep rows whose cause is in this set; empty keeps all.
    pub causes: BTreeSet<String>,
    /// Inclusive bounds on vehicles involved.
    pub vehicles_range: (u32, u32),
    /// Inclusive bounds on casualties (injuries plus fatalities).
    pub casualties_range: (u32, u32),
    /// Inclusive bounds on emergency response time, in minutes.
    pub response_time_range: (f64, f64),
    /// Keep only rows with at least one pedestrian involved.
    pub pedestrians_only: bool,
    /// Keep only rows with at least one cyclist involved.
    pub cyclists_only: bool,
}

impl Default for AccidentFilter {
    fn default() -> Self {
        Self {
            severity: BTreeSet::new(),
            causes: BTreeSet::new(),
            vehicles_range: VEHICLES_SPAN,
            casualties_range: CASUALTIES_SPAN,
            response_time_range: RESPONSE_TIME_SPAN,
            pedestrians_only: false,
            cyclists_only: false,
        }
    }
}

impl AccidentFilter {
    /// True when every predicate sits at its neutral value, i.e. the
    /// filter keeps the whole dataset.
    pub fn is_neutral(&self) -> bool {
        self.severity.is_empty()
            && self.causes.is_empty()
            && self.vehicles_range == VEHICLES_SPAN
            && self.casualties_range == CASUALTIES_SPAN
            && self.response_time_range == RESPONSE_TIME_SPAN
            && !self.pedestrians_only
            && !self.cyclists_only
    }

    /// Evaluate every predicate against one record.
    pub fn matches(&self, record: &AccidentRecord) -> bool {
        if !self.severity.is_empty() && !self.severity.contains(&record.severity) {
            return false;
        }
        if !self.causes.is_empty() && !self.causes.contains(&record.cause) {
            return false;
        }
        if !in_count_range(record.vehicles_involved, self.vehicles_range, VEHICLES_SPAN) {
            return false;
        }
        if !in_count_range(record.casualties(), self.casualties_range, CASUALTIES_SPAN) {
            return false;
        }
        if !in_value_range(
            record.response_time_min,
            self.response_time_range,
            RESPONSE_TIME_SPAN,
        ) {
            return false;
        }
        if self.pedestrians_only && !record.pedestrians_involved.is_some_and(|n| n > 0) {
            return false;
        }
        if self.cyclists_only && !record.cyclists_involved.is_some_and(|n| n > 0) {
            return false;
        }
        true
    }
}

fn in_count_range(value: Option<u32>, range: (u32, u32), span: (u32, u32)) -> bool {
    if range == span {
        return true;
    }
    value.is_some_and(|v| range.0 <= v && v <= range.1)
}

fn in_value_range(value: Option<f64>, range: (f64, f64), span: (f64, f64)) -> bool {
    if range == span {
        return true;
    }
    value.is_some_and(|v| range.0 <= v && v <= range.1)
}

/// Indices of records that pass every active predicate, in dataset order.
pub fn filtered_indices(dataset: &Dataset, filter: &AccidentFilter) -> Vec<usize> {
    dataset
        .iter()
        .enumerate()
        .filter(|(_, r)| filter.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// Materialize the filtered subset as its own dataset.
pub fn apply_filter(dataset: &Dataset, filter: &AccidentFilter) -> Dataset {
    if filter.is_neutral() {
        return dataset.clone();
    }
    dataset.iter().filter(|r| filter.matches(r)).cloned().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
