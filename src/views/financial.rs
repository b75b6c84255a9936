use chrono::Months;

use crate::aggregate::bins::quantile_bins;
use crate::aggregate::group::{group_by, Agg, GroupKey, GroupedTable};
use crate::aggregate::pivot::{pivot, PivotTable};
use crate::aggregate::rates::{
    percent_change, period_over_period, window_value, PeriodMeasure, PeriodWindow,
};
use crate::aggregate::summary::sum_of;
use crate::data::model::{Dataset, Dimension, Measure, SEVERITY_LEVELS};

use super::temporal::period_labels;

/// Population-density quintile labels, sparsest first.
pub const DENSITY_BANDS: [&str; 5] = ["Very Sparse", "Sparse", "Moderate", "Dense", "Very Dense"];

/// One cost headline: the filtered total and its change against the
/// previous calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct CostKpi {
    pub total: f64,
    /// Percent change of the latest month on record over the one before
    /// it; `None` without two months or with a zero base.
    pub mom_change: Option<f64>,
}

/// Headline cost figures for the filtered set.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialMetrics {
    pub medical_cost: CostKpi,
    pub economic_loss: CostKpi,
    pub insurance_claims: CostKpi,
    /// Medical cost spread over every accident in the filtered set.
    pub avg_cost_per_accident: Option<f64>,
    /// Month-over-month change of the per-accident average.
    pub avg_cost_change: Option<f64>,
}

pub fn metrics(dataset: &Dataset) -> FinancialMetrics {
    let windows = month_windows(dataset);
    FinancialMetrics {
        medical_cost: cost_kpi(dataset, Measure::MedicalCost, windows),
        economic_loss: cost_kpi(dataset, Measure::EconomicLoss, windows),
        insurance_claims: cost_kpi(dataset, Measure::InsuranceClaims, windows),
        avg_cost_per_accident: (!dataset.is_empty())
            .then(|| sum_of(dataset, Measure::MedicalCost) / dataset.len() as f64),
        avg_cost_change: windows.and_then(|(current, previous)| {
            let cur = per_accident_cost(dataset, current)?;
            let prev = per_accident_cost(dataset, previous)?;
            percent_change(cur, prev)
        }),
    }
}

/// Medical cost per accident within one window; `None` for an empty window.
fn per_accident_cost(dataset: &Dataset, window: PeriodWindow) -> Option<f64> {
    let rows = window_value(dataset, window, PeriodMeasure::Count)?;
    if rows == 0.0 {
        return None;
    }
    let total = window_value(dataset, window, PeriodMeasure::Sum(Measure::MedicalCost))?;
    Some(total / rows)
}

/// Latest calendar month on record and the one before it.
fn month_windows(dataset: &Dataset) -> Option<(PeriodWindow, PeriodWindow)> {
    let latest = dataset.latest_date()?;
    let previous = latest.checked_sub_months(Months::new(1))?;
    Some((
        PeriodWindow::month_of(latest),
        PeriodWindow::month_of(previous),
    ))
}

fn cost_kpi(
    dataset: &Dataset,
    measure: Measure,
    windows: Option<(PeriodWindow, PeriodWindow)>,
) -> CostKpi {
    CostKpi {
        total: sum_of(dataset, measure),
        mom_change: windows.and_then(|(current, previous)| {
            period_over_period(dataset, current, previous, PeriodMeasure::Sum(measure))
        }),
    }
}

/// Economic loss per calendar month and severity, in chronological order.
pub fn loss_by_severity_over_time(dataset: &Dataset) -> GroupedTable {
    let labels = period_labels(dataset);
    let mut table = group_by(
        dataset,
        &[
            GroupKey::Derived {
                name: "Period",
                labels: &labels,
            },
            GroupKey::Dim(Dimension::Severity),
        ],
        &[(Measure::EconomicLoss, Agg::Sum)],
    );
    table.rows.sort_by(|a, b| a.keys.cmp(&b.keys));
    table
}

/// Total economic loss across population-density quintiles and severity.
pub fn density_severity_pivot(dataset: &Dataset) -> PivotTable {
    let density = quantile_bins(dataset, Measure::PopulationDensity, &DENSITY_BANDS);
    pivot(
        dataset,
        &GroupKey::Derived {
            name: "Density Band",
            labels: &density,
        },
        &GroupKey::Dim(Dimension::Severity),
        Measure::EconomicLoss,
        Agg::Sum,
    )
    .with_row_order(&DENSITY_BANDS)
    .with_col_order(&SEVERITY_LEVELS)
}

/// Cost statistics per severity and region, severities in canonical order.
pub fn severity_region_costs(dataset: &Dataset) -> GroupedTable {
    let mut table = group_by(
        dataset,
        &[
            GroupKey::Dim(Dimension::Severity),
            GroupKey::Dim(Dimension::Region),
        ],
        &[
            (Measure::MedicalCost, Agg::Mean),
            (Measure::MedicalCost, Agg::Sum),
            (Measure::EconomicLoss, Agg::Mean),
            (Measure::EconomicLoss, Agg::Sum),
            (Measure::InsuranceClaims, Agg::Count),
            (Measure::InsuranceClaims, Agg::Mean),
            (Measure::InsuranceClaims, Agg::Sum),
        ],
    );
    table.order_rows_by_key(0, &SEVERITY_LEVELS);
    table
}
