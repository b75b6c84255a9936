use crate::aggregate::bins::{histogram, Histogram};
use crate::aggregate::group::{group_by, mode, Agg, GroupKey, GroupRow, GroupedTable};
use crate::aggregate::summary::mean_of;
use crate::data::model::{Dataset, Dimension, Measure};

use super::share;

/// Buckets in the speed-limit histogram.
pub const SPEED_BINS: usize = 20;

pub fn speed_histogram(dataset: &Dataset) -> Histogram {
    histogram(dataset, Measure::SpeedLimit, SPEED_BINS)
}

/// The speed-limit histogram as a labelled table, one row per bucket.
pub fn speed_distribution(dataset: &Dataset) -> GroupedTable {
    let hist = speed_histogram(dataset);
    GroupedTable {
        key_columns: vec![Measure::SpeedLimit.label().to_string()],
        value_columns: vec!["Accidents".to_string()],
        rows: hist
            .counts
            .iter()
            .enumerate()
            .filter_map(|(i, n)| {
                hist.bin_label(i).map(|label| GroupRow {
                    keys: vec![label],
                    values: vec![Some(*n as f64)],
                })
            })
            .collect(),
    }
}

/// Accidents and casualty sums per vehicle condition.
pub fn condition_totals(dataset: &Dataset) -> GroupedTable {
    group_by(
        dataset,
        &[GroupKey::Dim(Dimension::VehicleCondition)],
        &[
            (Measure::Fatalities, Agg::Count),
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
        ],
    )
}

/// Casualty sum/mean pairs and mean speed limit per vehicle condition.
pub fn condition_stats(dataset: &Dataset) -> GroupedTable {
    group_by(
        dataset,
        &[GroupKey::Dim(Dimension::VehicleCondition)],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Fatalities, Agg::Mean),
            (Measure::Injuries, Agg::Sum),
            (Measure::Injuries, Agg::Mean),
            (Measure::SpeedLimit, Agg::Mean),
        ],
    )
}

/// Headline vehicle figures for the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleMetrics {
    pub avg_speed_limit: Option<f64>,
    /// Most frequent vehicle condition; ties keep first appearance.
    pub modal_condition: Option<String>,
    /// Share (%) the modal condition holds over all rows.
    pub modal_condition_share: Option<f64>,
    /// Share (%) of accidents caused by speeding.
    pub speeding_share: Option<f64>,
    /// Share (%) of accidents caused by mechanical failure.
    pub mechanical_failure_share: Option<f64>,
}

pub fn metrics(dataset: &Dataset) -> VehicleMetrics {
    let modal_condition = mode(dataset, &GroupKey::Dim(Dimension::VehicleCondition));
    let modal_condition_share = modal_condition.as_ref().and_then(|label| {
        let n = dataset
            .iter()
            .filter(|r| &r.vehicle_condition == label)
            .count();
        share(n, dataset.len())
    });
    let speeding = dataset.iter().filter(|r| r.cause == "Speeding").count();
    let mechanical = dataset
        .iter()
        .filter(|r| r.cause == "Mechanical Failure")
        .count();
    VehicleMetrics {
        avg_speed_limit: mean_of(dataset, Measure::SpeedLimit),
        modal_condition,
        modal_condition_share,
        speeding_share: share(speeding, dataset.len()),
        mechanical_failure_share: share(mechanical, dataset.len()),
    }
}
