use crate::aggregate::bins::quantile_bins;
use crate::aggregate::group::{group_by, Agg, GroupKey, GroupedTable};
use crate::aggregate::pivot::{pivot, PivotTable};
use crate::aggregate::summary::mean_of;
use crate::data::model::{Dataset, Dimension, Measure};

use super::share;

/// Weather labels counted as adverse.
pub const BAD_WEATHER: [&str; 3] = ["Rainy", "Snowy", "Foggy"];

/// Road surfaces counted as degraded.
pub const DEGRADED_ROADS: [&str; 3] = ["Wet", "Icy", "Snow-covered"];

/// Visibility level below which a record counts as low-visibility.
pub const LOW_VISIBILITY: f64 = 100.0;

/// Visibility quintile labels, poorest first.
pub const VISIBILITY_BANDS: [&str; 5] = ["Very Low", "Low", "Medium", "Good", "Very Good"];

/// Traffic-volume quintile labels, lightest first.
pub const TRAFFIC_BANDS: [&str; 5] = ["Very Low", "Low", "Medium", "High", "Very High"];

/// Casualty sums per road type and weather condition.
pub fn road_weather_table(dataset: &Dataset) -> GroupedTable {
    group_by(
        dataset,
        &[
            GroupKey::Dim(Dimension::RoadType),
            GroupKey::Dim(Dimension::Weather),
        ],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
        ],
    )
}

/// Casualty sums across visibility and traffic quintile bands.  Rows run
/// from best to poorest visibility, columns from lightest to heaviest
/// traffic.
pub fn visibility_traffic_pivot(dataset: &Dataset, measure: Measure) -> PivotTable {
    let visibility = quantile_bins(dataset, Measure::VisibilityLevel, &VISIBILITY_BANDS);
    let traffic = quantile_bins(dataset, Measure::TrafficVolume, &TRAFFIC_BANDS);
    let mut row_order = VISIBILITY_BANDS;
    row_order.reverse();
    pivot(
        dataset,
        &GroupKey::Derived {
            name: "Visibility Band",
            labels: &visibility,
        },
        &GroupKey::Derived {
            name: "Traffic Band",
            labels: &traffic,
        },
        measure,
        Agg::Sum,
    )
    .with_row_order(&row_order)
    .with_col_order(&TRAFFIC_BANDS)
}

/// Casualty sums per road surface condition.
pub fn road_condition_totals(dataset: &Dataset) -> GroupedTable {
    group_by(
        dataset,
        &[GroupKey::Dim(Dimension::RoadCondition)],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
        ],
    )
}

/// Sums of one casualty measure per weather condition and road surface.
pub fn weather_road_pivot(dataset: &Dataset, measure: Measure) -> PivotTable {
    pivot(
        dataset,
        &GroupKey::Dim(Dimension::Weather),
        &GroupKey::Dim(Dimension::RoadCondition),
        measure,
        Agg::Sum,
    )
}

/// Headline conditions figures for the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentMetrics {
    /// Share (%) of accidents under adverse weather.
    pub bad_weather_share: Option<f64>,
    /// Share (%) of accidents with visibility below [`LOW_VISIBILITY`].
    pub low_visibility_share: Option<f64>,
    /// Share (%) of accidents on a degraded road surface.
    pub degraded_road_share: Option<f64>,
    pub avg_traffic_volume: Option<f64>,
}

pub fn metrics(dataset: &Dataset) -> EnvironmentMetrics {
    let total = dataset.len();
    let bad_weather = dataset
        .iter()
        .filter(|r| BAD_WEATHER.contains(&r.weather.as_str()))
        .count();
    let low_visibility = dataset
        .iter()
        .filter(|r| r.visibility_level.is_some_and(|v| v < LOW_VISIBILITY))
        .count();
    let degraded = dataset
        .iter()
        .filter(|r| DEGRADED_ROADS.contains(&r.road_condition.as_str()))
        .count();
    EnvironmentMetrics {
        bad_weather_share: share(bad_weather, total),
        low_visibility_share: share(low_visibility, total),
        degraded_road_share: share(degraded, total),
        avg_traffic_volume: mean_of(dataset, Measure::TrafficVolume),
    }
}
