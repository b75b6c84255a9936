use chrono::{Datelike, NaiveDate};

use crate::data::model::{Dataset, Measure};

// ---------------------------------------------------------------------------
// Per-row rates
// ---------------------------------------------------------------------------

/// Derived ratios for one record.  Any rate whose operand is missing or
/// whose denominator is zero is `None`, never `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    /// Fatalities per vehicle involved.
    pub fatality_rate: Option<f64>,
    /// Injuries per vehicle involved.
    pub injury_rate: Option<f64>,
    /// `(fatalities * 5 + injuries) / rows`, weighted against the size of
    /// the dataset the row belongs to.
    pub severity_index: Option<f64>,
}

/// Compute one [`RateRow`] per record, in dataset order.  The severity
/// index denominator is the length of the dataset handed in, so rates over
/// a filtered set are weighted against that set.
pub fn rates(dataset: &Dataset) -> Vec<RateRow> {
    let n = dataset.len() as f64;
    dataset
        .iter()
        .map(|record| {
            let vehicles = record
                .vehicles_involved
                .filter(|&v| v > 0)
                .map(f64::from);
            let fatality_rate = vehicles.and_then(|v| {
                record.fatalities.map(|f| f64::from(f) / v)
            });
            let injury_rate = vehicles.and_then(|v| {
                record.injuries.map(|i| f64::from(i) / v)
            });
            let severity_index = match (record.fatalities, record.injuries) {
                (Some(f), Some(i)) => Some((f64::from(f) * 5.0 + f64::from(i)) / n),
                _ => None,
            };
            RateRow {
                fatality_rate,
                injury_rate,
                severity_index,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Period-over-period change
// ---------------------------------------------------------------------------

/// Percent change from `previous` to `current`; `None` when the base is
/// zero, since no meaningful ratio exists.
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

/// Inclusive date window.  Rows without a derived date belong to no
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let next_month = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
        };
        let end = next_month.and_then(|d| d.pred_opt()).unwrap_or(start);
        Self { start, end }
    }

    /// The calendar year containing `date`.
    pub fn year_of(date: NaiveDate) -> Self {
        let start = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
        let end = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// What to fold within each window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeriodMeasure {
    /// Number of rows falling in the window.
    Count,
    Sum(Measure),
    Mean(Measure),
}

/// Percent change of a measure between two date windows.  `None` when the
/// previous value is zero or either window is unevaluable (a mean with no
/// present values).
pub fn period_over_period(
    dataset: &Dataset,
    current: PeriodWindow,
    previous: PeriodWindow,
    measure: PeriodMeasure,
) -> Option<f64> {
    let cur = window_value(dataset, current, measure)?;
    let prev = window_value(dataset, previous, measure)?;
    percent_change(cur, prev)
}

/// Fold one window of the dataset down to a scalar.
pub fn window_value(
    dataset: &Dataset,
    window: PeriodWindow,
    measure: PeriodMeasure,
) -> Option<f64> {
    let rows = dataset
        .iter()
        .filter(|r| r.date.is_some_and(|d| window.contains(d)));
    match measure {
        PeriodMeasure::Count => Some(rows.count() as f64),
        PeriodMeasure::Sum(m) => Some(rows.filter_map(|r| r.measure(m)).sum()),
        PeriodMeasure::Mean(m) => {
            let mut sum = 0.0;
            let mut n = 0usize;
            for v in rows.filter_map(|r| r.measure(m)) {
                sum += v;
                n += 1;
            }
            (n > 0).then(|| sum / n as f64)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
