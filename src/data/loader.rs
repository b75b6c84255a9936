use std::collections::HashMap;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use chrono::NaiveDate;
use log::{info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{month_number, AccidentRecord, Dataset, Dimension, Measure};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures that abort a load outright.
///
/// Individual unparseable cells never abort: they degrade to missing
/// values on the affected row and the row is kept.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),
    #[error("source is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("malformed {format} source: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
    #[error("source contains no data rows")]
    Empty,
}

fn malformed(format: &'static str, message: impl ToString) -> LoadError {
    LoadError::Malformed {
        format,
        message: message.to_string(),
    }
}

/// Column headers every source must carry, in schema order.
pub fn required_columns() -> impl Iterator<Item = &'static str> {
    Dimension::ALL
        .iter()
        .map(|d| d.label())
        .chain(Measure::ALL.iter().map(|m| m.label()))
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load accident records from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row naming every schema column
/// * `.json`    – records-oriented array, as written by `df.to_json(orient='records')`
/// * `.parquet` – flat table written by pandas or polars
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }?;

    if dataset.is_empty() {
        return Err(LoadError::Empty);
    }

    let undated = dataset.iter().filter(|r| r.date.is_none()).count();
    if undated > 0 {
        warn!(
            "{undated} of {} rows have no derivable date (unusable month or year)",
            dataset.len()
        );
    }
    info!(
        "loaded {} accident records from {}",
        dataset.len(),
        path.display()
    );

    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: one header row naming every schema column, one data row
/// per accident.  Column order is irrelevant; extra columns are ignored.
fn load_csv(path: &Path) -> Result<Dataset, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| malformed("CSV", e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut columns = HashMap::new();
    for name in required_columns() {
        let idx = headers
            .iter()
            .position(|h| h == name)
            .ok_or(LoadError::MissingColumn(name))?;
        columns.insert(name, idx);
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.map_err(|e| malformed("CSV", format!("row {row_no}: {e}")))?;
        records.push(record_from(|name| {
            columns
                .get(name)
                .and_then(|&idx| row.get(idx))
                .map_or(Cell::Missing, Cell::from_text)
        }));
    }

    Ok(Dataset::from_records(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "Country": "USA",
///     "Year": 2024,
///     "Month": "January",
///     "Number of Injuries": 3,
///     ...
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Dataset, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|e| malformed("JSON", e))?;

    let rows = root
        .as_array()
        .ok_or_else(|| malformed("JSON", "expected a top-level array of records"))?;

    // Schema check against the first record; later records may omit keys
    // per row, which reads as missing.
    if let Some(first) = rows.first() {
        let obj = first
            .as_object()
            .ok_or_else(|| malformed("JSON", "row 0 is not an object"))?;
        for name in required_columns() {
            if !obj.contains_key(name) {
                return Err(LoadError::MissingColumn(name));
            }
        }
    }

    let mut records = Vec::with_capacity(rows.len());
    for (i, rec) in rows.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| malformed("JSON", format!("row {i} is not an object")))?;
        records.push(record_from(|name| json_cell(obj.get(name))));
    }

    Ok(Dataset::from_records(records))
}

fn json_cell(val: Option<&JsonValue>) -> Cell<'_> {
    match val {
        Some(JsonValue::String(s)) => Cell::from_text(s),
        Some(JsonValue::Number(n)) => n.as_f64().map_or(Cell::Missing, Cell::Number),
        Some(JsonValue::Bool(b)) => Cell::Bool(*b),
        _ => Cell::Missing,
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file holding one flat row per accident.
///
/// Works with files written by both **pandas** (`df.to_parquet()`) and
/// **polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Dataset, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| malformed("parquet", e))?;
    let reader = builder.build().map_err(|e| malformed("parquet", e))?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|e| malformed("parquet", e))?;
        let schema = batch.schema();

        let mut columns = HashMap::new();
        for name in required_columns() {
            let idx = schema
                .index_of(name)
                .map_err(|_| LoadError::MissingColumn(name))?;
            columns.insert(name, idx);
        }

        for row in 0..batch.num_rows() {
            records.push(record_from(|name| {
                columns
                    .get(name)
                    .map_or(Cell::Missing, |&idx| arrow_cell(batch.column(idx), row))
            }));
        }
    }

    Ok(Dataset::from_records(records))
}

/// Read one Arrow cell as an untyped [`Cell`].  Column types outside the
/// supported set read as missing rather than failing the load.
fn arrow_cell(col: &ArrayRef, row: usize) -> Cell<'_> {
    if col.is_null(row) {
        return Cell::Missing;
    }
    match col.data_type() {
        DataType::Utf8 => Cell::from_text(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => Cell::from_text(col.as_string::<i64>().value(row)),
        DataType::Int32 => Cell::Number(col.as_primitive::<Int32Type>().value(row) as f64),
        DataType::Int64 => Cell::Number(col.as_primitive::<Int64Type>().value(row) as f64),
        DataType::Float32 => Cell::Number(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Cell::Number(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Cell::Bool(col.as_boolean().value(row)),
        _ => Cell::Missing,
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// One source cell, untyped, as the three formats hand it over.
#[derive(Clone, Copy)]
enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Bool(bool),
    Missing,
}

impl<'a> Cell<'a> {
    fn from_text(s: &'a str) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(trimmed)
        }
    }

    /// Categorical value; missing reads as the empty string.
    fn text(self) -> String {
        match self {
            Cell::Text(s) => s.to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => (n as i64).to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Missing => String::new(),
        }
    }

    /// Finite numeric value, if the cell holds one.
    fn number(self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(n),
            Cell::Number(_) => None,
            Cell::Text(s) => s.parse::<f64>().ok().filter(|v| v.is_finite()),
            Cell::Bool(b) => Some(f64::from(u8::from(b))),
            Cell::Missing => None,
        }
    }

    /// Non-negative whole number.  `3` and `3.0` qualify, `3.5` and `-1`
    /// do not.
    fn count(self) -> Option<u32> {
        let v = self.number()?;
        if v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) {
            Some(v as u32)
        } else {
            None
        }
    }

    fn year(self) -> Option<i32> {
        let v = self.number()?;
        if v.fract() == 0.0 && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&v) {
            Some(v as i32)
        } else {
            None
        }
    }

    /// Boolean flag stored as `true`/`false` or `0`/`1`.
    fn flag(self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(b),
            Cell::Text("true") => Some(true),
            Cell::Text("false") => Some(false),
            other => match other.number() {
                Some(v) if v == 0.0 => Some(false),
                Some(v) if v == 1.0 => Some(true),
                _ => None,
            },
        }
    }
}

/// First day of the record's month, when both parts are usable.
fn derive_date(year: Option<i32>, month: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year?, month_number(month)?, 1)
}

/// Assemble one typed record from whatever cell representation the source
/// format yields.  Every conversion failure becomes a missing value on
/// that row, never a load failure.
fn record_from<'a, F>(cell: F) -> AccidentRecord
where
    F: Fn(&'static str) -> Cell<'a>,
{
    use Dimension as D;
    use Measure as M;

    let year = cell(D::Year.label()).year();
    let month = cell(D::Month.label()).text();
    let date = derive_date(year, &month);

    AccidentRecord {
        country: cell(D::Country.label()).text(),
        region: cell(D::Region.label()).text(),
        area: cell(D::Area.label()).text(),
        severity: cell(D::Severity.label()).text(),
        cause: cell(D::Cause.label()).text(),
        road_type: cell(D::RoadType.label()).text(),
        road_condition: cell(D::RoadCondition.label()).text(),
        weather: cell(D::Weather.label()).text(),
        time_of_day: cell(D::TimeOfDay.label()).text(),
        day_of_week: cell(D::DayOfWeek.label()).text(),
        driver_age_group: cell(D::DriverAgeGroup.label()).text(),
        driver_gender: cell(D::DriverGender.label()).text(),
        vehicle_condition: cell(D::VehicleCondition.label()).text(),
        month,
        year,
        vehicles_involved: cell(M::VehiclesInvolved.label()).count(),
        injuries: cell(M::Injuries.label()).count(),
        fatalities: cell(M::Fatalities.label()).count(),
        pedestrians_involved: cell(M::PedestriansInvolved.label()).count(),
        cyclists_involved: cell(M::CyclistsInvolved.label()).count(),
        driver_fatigue: cell(M::DriverFatigue.label()).flag(),
        response_time_min: cell(M::ResponseTime.label()).number(),
        alcohol_level: cell(M::AlcoholLevel.label()).number(),
        traffic_volume: cell(M::TrafficVolume.label()).number(),
        visibility_level: cell(M::VisibilityLevel.label()).number(),
        speed_limit: cell(M::SpeedLimit.label()).number(),
        population_density: cell(M::PopulationDensity.label()).number(),
        medical_cost: cell(M::MedicalCost.label()).number(),
        economic_loss: cell(M::EconomicLoss.label()).number(),
        insurance_claims: cell(M::InsuranceClaims.label()).number(),
        date,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
