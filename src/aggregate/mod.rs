/// Aggregation layer: stateless rollups over (usually filtered) datasets.
///
/// ```text
///   Dataset ──▶ summary   headline totals and means
///           ──▶ group     GroupedTable, first-appearance key order
///           ──▶ pivot     dense |rows|×|cols| matrix, 0.0 fill
///           ──▶ rates     per-row ratios, period-over-period change
///           ──▶ bins      quantile labels, fixed-width histograms
/// ```

pub mod bins;
pub mod group;
pub mod pivot;
pub mod rates;
pub mod summary;
