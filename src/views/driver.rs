use crate::aggregate::group::{group_by, mode, Agg, GroupKey, GroupedTable};
use crate::aggregate::pivot::{pivot, PivotTable};
use crate::aggregate::summary::mean_of;
use crate::data::model::{Dataset, Dimension, Measure};

use super::{share, AGE_GROUP_ORDER};

/// Fatigue flag as a derivable group label; rows with an unknown flag get
/// `None` and stay out of fatigue groupings.
pub fn fatigue_labels(dataset: &Dataset) -> Vec<Option<String>> {
    dataset
        .iter()
        .map(|r| {
            r.driver_fatigue
                .map(|f| if f { "Fatigued" } else { "Rested" }.to_string())
        })
        .collect()
}

/// Accident counts per age group and gender, rows youngest first.
pub fn age_gender_pivot(dataset: &Dataset) -> PivotTable {
    pivot(
        dataset,
        &GroupKey::Dim(Dimension::DriverAgeGroup),
        &GroupKey::Dim(Dimension::DriverGender),
        Measure::Fatalities,
        Agg::Count,
    )
    .with_row_order(&AGE_GROUP_ORDER)
}

/// Casualty sums and mean alcohol level per age group, gender and fatigue
/// state, in canonical age order.
pub fn fatigue_breakdown(dataset: &Dataset) -> GroupedTable {
    let fatigue = fatigue_labels(dataset);
    let mut table = group_by(
        dataset,
        &[
            GroupKey::Dim(Dimension::DriverAgeGroup),
            GroupKey::Dim(Dimension::DriverGender),
            GroupKey::Derived {
                name: "Fatigue",
                labels: &fatigue,
            },
        ],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
            (Measure::AlcoholLevel, Agg::Mean),
        ],
    );
    table.order_rows_by_key(0, &AGE_GROUP_ORDER);
    table
}

/// Casualty, alcohol and fatigue statistics per age group and gender, in
/// canonical age order. The fatigue mean is the fatigued fraction among
/// rows with a known flag.
pub fn age_gender_stats(dataset: &Dataset) -> GroupedTable {
    let mut table = group_by(
        dataset,
        &[
            GroupKey::Dim(Dimension::DriverAgeGroup),
            GroupKey::Dim(Dimension::DriverGender),
        ],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
            (Measure::AlcoholLevel, Agg::Mean),
            (Measure::DriverFatigue, Agg::Mean),
        ],
    );
    table.order_rows_by_key(0, &AGE_GROUP_ORDER);
    table
}

/// Headline driver figures for the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverMetrics {
    /// Most frequent age group; ties keep first appearance.
    pub modal_age_group: Option<String>,
    /// Share (%) of male drivers over all rows.
    pub male_share: Option<f64>,
    pub avg_alcohol_level: Option<f64>,
    /// Share (%) of fatigued drivers over rows with a known flag.
    pub fatigued_share: Option<f64>,
}

pub fn metrics(dataset: &Dataset) -> DriverMetrics {
    let male = dataset
        .iter()
        .filter(|r| r.driver_gender == "Male")
        .count();
    let mut flagged = 0usize;
    let mut fatigued = 0usize;
    for flag in dataset.iter().filter_map(|r| r.driver_fatigue) {
        flagged += 1;
        if flag {
            fatigued += 1;
        }
    }
    DriverMetrics {
        modal_age_group: mode(dataset, &GroupKey::Dim(Dimension::DriverAgeGroup)),
        male_share: share(male, dataset.len()),
        avg_alcohol_level: mean_of(dataset, Measure::AlcoholLevel),
        fatigued_share: share(fatigued, flagged),
    }
}
