use std::collections::BTreeMap;

use chrono::{Datelike, Months};

use crate::aggregate::group::{group_by, Agg, GroupKey, GroupedTable};
use crate::aggregate::pivot::{pivot, PivotTable};
use crate::aggregate::rates::{period_over_period, window_value, PeriodMeasure, PeriodWindow};
use crate::aggregate::summary::mean_of;
use crate::data::model::{Dataset, Dimension, Measure, MONTHS};

use super::{DAY_ORDER, TIME_OF_DAY_ORDER};

// ---------------------------------------------------------------------------
// Calendar axes
// ---------------------------------------------------------------------------

/// One `YYYY-MM` label per record, `None` for rows without a derived date.
pub fn period_labels(dataset: &Dataset) -> Vec<Option<String>> {
    dataset
        .iter()
        .map(|r| r.date.map(|d| format!("{:04}-{:02}", d.year(), d.month())))
        .collect()
}

/// Casualty sums per calendar month, in chronological order.  Undated rows
/// fall off the axis.
pub fn monthly_timeline(dataset: &Dataset) -> GroupedTable {
    let labels = period_labels(dataset);
    let mut table = group_by(
        dataset,
        &[GroupKey::Derived {
            name: "Period",
            labels: &labels,
        }],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
        ],
    );
    // Zero-padded labels sort lexicographically into calendar order.
    table.rows.sort_by(|a, b| a.keys.cmp(&b.keys));
    table
}

/// Sums of one casualty measure per weekday and time of day, axes in
/// calendar order.
pub fn day_time_pivot(dataset: &Dataset, measure: Measure) -> PivotTable {
    pivot(
        dataset,
        &GroupKey::Dim(Dimension::DayOfWeek),
        &GroupKey::Dim(Dimension::TimeOfDay),
        measure,
        Agg::Sum,
    )
    .with_row_order(&DAY_ORDER)
    .with_col_order(&TIME_OF_DAY_ORDER)
}

/// Casualty sums per named month, January through December.
pub fn month_distribution(dataset: &Dataset) -> GroupedTable {
    let mut table = group_by(
        dataset,
        &[GroupKey::Dim(Dimension::Month)],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Injuries, Agg::Sum),
        ],
    );
    table.order_rows_by_key(0, &MONTHS);
    table
}

/// Monthly casualty and response statistics, in chronological order.
pub fn monthly_stats_table(dataset: &Dataset) -> GroupedTable {
    let labels = period_labels(dataset);
    let mut table = group_by(
        dataset,
        &[GroupKey::Derived {
            name: "Period",
            labels: &labels,
        }],
        &[
            (Measure::Fatalities, Agg::Sum),
            (Measure::Fatalities, Agg::Mean),
            (Measure::Injuries, Agg::Sum),
            (Measure::Injuries, Agg::Mean),
            (Measure::ResponseTime, Agg::Mean),
        ],
    );
    table.rows.sort_by(|a, b| a.keys.cmp(&b.keys));
    table
}

// ---------------------------------------------------------------------------
// Year-over-year headlines
// ---------------------------------------------------------------------------

/// One year-scoped headline: the latest calendar year's value and its
/// change against the year before.
#[derive(Debug, Clone, PartialEq)]
pub struct YearKpi {
    pub current: f64,
    /// `None` without a comparable previous year.
    pub yoy_change: Option<f64>,
}

/// Headline figures for the temporal view.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalMetrics {
    pub accidents: YearKpi,
    pub fatalities: YearKpi,
    pub injuries: YearKpi,
    pub avg_response_time: Option<f64>,
}

pub fn metrics(dataset: &Dataset) -> TemporalMetrics {
    let windows = year_windows(dataset);
    TemporalMetrics {
        accidents: year_kpi(dataset, PeriodMeasure::Count, windows),
        fatalities: year_kpi(dataset, PeriodMeasure::Sum(Measure::Fatalities), windows),
        injuries: year_kpi(dataset, PeriodMeasure::Sum(Measure::Injuries), windows),
        avg_response_time: mean_of(dataset, Measure::ResponseTime),
    }
}

/// Latest calendar year on record and the one before it.
fn year_windows(dataset: &Dataset) -> Option<(PeriodWindow, PeriodWindow)> {
    let latest = dataset.latest_date()?;
    let previous = latest.checked_sub_months(Months::new(12))?;
    Some((PeriodWindow::year_of(latest), PeriodWindow::year_of(previous)))
}

fn year_kpi(
    dataset: &Dataset,
    measure: PeriodMeasure,
    windows: Option<(PeriodWindow, PeriodWindow)>,
) -> YearKpi {
    YearKpi {
        current: windows
            .and_then(|(current, _)| window_value(dataset, current, measure))
            .unwrap_or(0.0),
        yoy_change: windows.and_then(|(current, previous)| {
            period_over_period(dataset, current, previous, measure)
        }),
    }
}

// ---------------------------------------------------------------------------
// Seasonal decomposition
// ---------------------------------------------------------------------------

/// Additive decomposition of the monthly casualty series:
/// `observed = trend + seasonal + residual`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonalDecomposition {
    /// Gapless `YYYY-MM` axis spanning the dated rows.
    pub periods: Vec<String>,
    /// Casualties per period; months with no rows contribute zero.
    pub observed: Vec<f64>,
    /// Centred 12-month moving average, undefined within six months of
    /// either end (and everywhere when fewer than 13 months exist).
    pub trend: Vec<Option<f64>>,
    /// Zero-mean cycle per calendar month, repeated along the axis.
    pub seasonal: Vec<f64>,
    /// `observed - trend - seasonal` wherever the trend is defined.
    pub residual: Vec<Option<f64>>,
}

pub fn seasonal_decomposition(dataset: &Dataset) -> SeasonalDecomposition {
    let mut sums: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for record in dataset.iter() {
        if let Some(date) = record.date {
            *sums.entry((date.year(), date.month())).or_insert(0.0) +=
                record.casualties().map_or(0.0, f64::from);
        }
    }
    let (Some(&first), Some(&last)) = (sums.keys().next(), sums.keys().next_back()) else {
        return SeasonalDecomposition::default();
    };

    let mut periods = Vec::new();
    let mut month_axis = Vec::new();
    let mut observed = Vec::new();
    let (mut year, mut month) = first;
    loop {
        periods.push(format!("{year:04}-{month:02}"));
        month_axis.push(month);
        observed.push(sums.get(&(year, month)).copied().unwrap_or(0.0));
        if (year, month) == last {
            break;
        }
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }

    let trend = centered_trend(&observed, 12);

    // Calendar-month means of the detrended series, re-centred to zero.
    let mut month_sums = [0.0f64; 12];
    let mut month_rows = [0usize; 12];
    for (i, value) in observed.iter().enumerate() {
        if let Some(t) = trend[i] {
            let m = (month_axis[i] - 1) as usize;
            month_sums[m] += value - t;
            month_rows[m] += 1;
        }
    }
    let monthly: Vec<Option<f64>> = (0..12)
        .map(|m| (month_rows[m] > 0).then(|| month_sums[m] / month_rows[m] as f64))
        .collect();
    let present: Vec<f64> = monthly.iter().copied().flatten().collect();
    let grand = if present.is_empty() {
        0.0
    } else {
        present.iter().sum::<f64>() / present.len() as f64
    };
    let seasonal: Vec<f64> = month_axis
        .iter()
        .map(|&m| monthly[(m - 1) as usize].map_or(0.0, |v| v - grand))
        .collect();

    let residual = observed
        .iter()
        .enumerate()
        .map(|(i, value)| trend[i].map(|t| value - t - seasonal[i]))
        .collect();

    SeasonalDecomposition {
        periods,
        observed,
        trend,
        seasonal,
        residual,
    }
}

/// Centred moving average for an even window: `window + 1` points with the
/// two endpoints at half weight. Undefined (and all-`None` when the series
/// is shorter than `window + 1`) within `window / 2` of either end.
fn centered_trend(series: &[f64], window: usize) -> Vec<Option<f64>> {
    let half = window / 2;
    let n = series.len();
    let mut out = vec![None; n];
    if n < window + 1 {
        return out;
    }
    for (i, slot) in out.iter_mut().enumerate().take(n - half).skip(half) {
        let lo = i - half;
        let hi = i + half;
        let mut acc = (series[lo] + series[hi]) / 2.0;
        for v in &series[lo + 1..hi] {
            acc += v;
        }
        *slot = Some(acc / window as f64);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::AccidentRecord;
    use chrono::NaiveDate;

    fn dated(year: i32, month: u32, injuries: u32) -> AccidentRecord {
        AccidentRecord {
            injuries: Some(injuries),
            fatalities: Some(0),
            month: MONTHS[(month - 1) as usize].to_string(),
            year: Some(year),
            date: NaiveDate::from_ymd_opt(year, month, 1),
            ..Default::default()
        }
    }

    #[test]
    fn timeline_is_chronological_and_skips_undated_rows() {
        let ds = Dataset::from_records(vec![
            dated(2024, 3, 1),
            dated(2023, 12, 2),
            AccidentRecord::default(),
            dated(2024, 3, 4),
        ]);
        let table = monthly_timeline(&ds);
        let keys: Vec<&str> = table.rows.iter().map(|r| r.keys[0].as_str()).collect();
        assert_eq!(keys, vec!["2023-12", "2024-03"]);
        // March: no fatalities, five injuries.
        assert_eq!(table.rows[1].values[0], Some(0.0));
        assert_eq!(table.rows[1].values[1], Some(5.0));
    }

    #[test]
    fn month_distribution_runs_january_through_december() {
        let ds = Dataset::from_records(vec![
            dated(2024, 12, 2),
            dated(2024, 1, 1),
            dated(2024, 12, 2),
        ]);
        let table = month_distribution(&ds);
        let keys: Vec<&str> = table.rows.iter().map(|r| r.keys[0].as_str()).collect();
        assert_eq!(keys, vec!["January", "December"]);
        assert_eq!(table.rows[1].values[1], Some(4.0));
    }

    #[test]
    fn monthly_stats_fold_sums_and_means() {
        let mut quick = dated(2024, 2, 3);
        quick.response_time_min = Some(10.0);
        let mut slow = dated(2024, 2, 5);
        slow.response_time_min = Some(20.0);
        let ds = Dataset::from_records(vec![dated(2024, 1, 2), quick, slow]);
        let table = monthly_stats_table(&ds);
        assert_eq!(
            table.value_columns,
            vec![
                "Number of Fatalities (sum)",
                "Number of Fatalities (mean)",
                "Number of Injuries (sum)",
                "Number of Injuries (mean)",
                "Emergency Response Time (mean)"
            ]
        );
        assert_eq!(table.rows[0].keys, vec!["2024-01"]);
        assert_eq!(table.rows[1].values[2], Some(8.0));
        assert_eq!(table.rows[1].values[3], Some(4.0));
        assert_eq!(table.rows[1].values[4], Some(15.0));
        // No response times in January.
        assert_eq!(table.rows[0].values[4], None);
    }

    #[test]
    fn metrics_compare_the_latest_two_years() {
        let mut records = vec![dated(2023, 5, 1), dated(2023, 6, 1)];
        records.extend([dated(2024, 1, 1), dated(2024, 2, 1), dated(2024, 3, 1)]);
        let ds = Dataset::from_records(records);
        let m = metrics(&ds);
        // 3 accidents in 2024 against 2 in 2023.
        assert_eq!(m.accidents.current, 3.0);
        assert_eq!(m.accidents.yoy_change, Some(50.0));
        assert_eq!(m.injuries.current, 3.0);
        assert_eq!(m.injuries.yoy_change, Some(50.0));
        // No fatalities either year, so the base is zero.
        assert_eq!(m.fatalities.current, 0.0);
        assert_eq!(m.fatalities.yoy_change, None);
    }

    #[test]
    fn metrics_without_history_have_no_deltas() {
        let m = metrics(&Dataset::default());
        assert_eq!(m.accidents.current, 0.0);
        assert_eq!(m.accidents.yoy_change, None);
        assert_eq!(m.avg_response_time, None);

        let only_one_year = metrics(&Dataset::from_records(vec![dated(2024, 1, 0)]));
        assert_eq!(only_one_year.accidents.current, 1.0);
        assert_eq!(only_one_year.accidents.yoy_change, None);
    }

    #[test]
    fn decomposition_axis_is_gapless() {
        let ds = Dataset::from_records(vec![dated(2024, 1, 3), dated(2024, 4, 1)]);
        let parts = seasonal_decomposition(&ds);
        assert_eq!(parts.periods, vec!["2024-01", "2024-02", "2024-03", "2024-04"]);
        assert_eq!(parts.observed, vec![3.0, 0.0, 0.0, 1.0]);
        // Too short for a 12-month trend.
        assert!(parts.trend.iter().all(Option::is_none));
        assert_eq!(parts.seasonal, vec![0.0; 4]);
    }

    #[test]
    fn decomposition_recovers_a_pure_january_cycle() {
        // Three years of monthly data: 24 casualties every January, 12 in
        // every other month. Flat trend, so each component is exact.
        let mut records = Vec::new();
        for year in 2022..=2024 {
            for month in 1..=12 {
                let injuries = if month == 1 { 24 } else { 12 };
                records.push(dated(year, month, injuries));
            }
        }
        let parts = seasonal_decomposition(&Dataset::from_records(records));
        assert_eq!(parts.periods.len(), 36);

        // The moving average is defined away from the ends and flat at 13.
        assert_eq!(parts.trend[0], None);
        assert_eq!(parts.trend[5], None);
        assert_eq!(parts.trend[6], Some(13.0));
        assert_eq!(parts.trend[29], Some(13.0));
        assert_eq!(parts.trend[30], None);

        // January sits 11 above the trend, every other month 1 below.
        assert!((parts.seasonal[12] - 11.0).abs() < 1e-9);
        assert!((parts.seasonal[13] + 1.0).abs() < 1e-9);
        let cycle_sum: f64 = parts.seasonal[12..24].iter().sum();
        assert!(cycle_sum.abs() < 1e-9);

        // The synthetic series has no noise left over.
        for residual in parts.residual.iter().flatten() {
            assert!(residual.abs() < 1e-9);
        }
    }

    #[test]
    fn day_time_pivot_orders_both_axes() {
        let mut a = dated(2024, 1, 0);
        a.day_of_week = "Sunday".to_string();
        a.time_of_day = "Night".to_string();
        a.fatalities = Some(2);
        let mut b = dated(2024, 1, 0);
        b.day_of_week = "Monday".to_string();
        b.time_of_day = "Morning".to_string();
        b.fatalities = Some(1);
        let table = day_time_pivot(&Dataset::from_records(vec![a, b]), Measure::Fatalities);
        assert_eq!(table.row_keys.len(), 7);
        assert_eq!(table.row_keys[0], "Monday");
        assert_eq!(table.row_keys[6], "Sunday");
        assert_eq!(
            table.col_keys,
            vec!["Morning", "Afternoon", "Evening", "Night"]
        );
        assert_eq!(table.values[0][0], 1.0);
        assert_eq!(table.values[6][3], 2.0);
        // Days with no rows reshape to zero lines.
        assert_eq!(table.values[1], vec![0.0; 4]);
    }
}
