//! roadlens – an analytics engine for road-accident records.
//!
//! The crate loads tabular accident data (CSV, JSON, Parquet) into a typed
//! [`Dataset`], narrows it through a declarative [`AccidentFilter`], and
//! folds the result into summary statistics, grouped tables and dense
//! pivots. The [`views`] modules prepare one thematic analysis page each
//! as plain data, ready for any presentation front-end.

pub mod aggregate;
pub mod data;
pub mod export;
pub mod session;
pub mod views;

pub use aggregate::bins::{histogram, quantile_bins, Histogram};
pub use aggregate::group::{group_by, mode, value_counts, Agg, GroupKey, GroupRow, GroupedTable};
pub use aggregate::pivot::{pivot, PivotTable};
pub use aggregate::rates::{
    percent_change, period_over_period, rates, window_value, PeriodMeasure, PeriodWindow, RateRow,
};
pub use aggregate::summary::{mean_of, sum_of, summary_statistics, SummaryStats};
pub use data::filter::{apply_filter, filtered_indices, AccidentFilter};
pub use data::loader::{load_file, required_columns, LoadError};
pub use data::model::{AccidentRecord, Dataset, Dimension, Measure};
pub use export::{dataset_to_csv, to_csv_string, write_csv, write_dataset_csv, ExportError};
pub use session::{AnalysisSession, DatasetCache};
