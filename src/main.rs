//! roadlens – command-line front-end for the accident analytics engine.
//!
//! Usage:
//!   roadlens --data accidents.csv --severity Severe --vehicles 2:4 --view location
//!
//! Loads the dataset, applies the filter flags, then prints summary
//! statistics and one thematic table.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::{Parser, ValueEnum};

use roadlens::views::{driver, environment, financial, location, overview, temporal, vehicle};
use roadlens::{
    export, summary_statistics, AccidentFilter, AnalysisSession, Dataset, DatasetCache,
    GroupedTable,
};

#[derive(Parser, Debug)]
#[command(name = "roadlens")]
#[command(about = "Filter and aggregate road-accident records")]
#[command(version)]
struct Args {
    /// Accident dataset (.csv, .json or .parquet)
    #[arg(short, long)]
    data: PathBuf,

    /// Keep only these severities (repeatable)
    #[arg(long)]
    severity: Vec<String>,

    /// Keep only these accident causes (repeatable)
    #[arg(long)]
    cause: Vec<String>,

    /// Bounds on vehicles involved, e.g. 2:4
    #[arg(long, value_parser = parse_u32_range)]
    vehicles: Option<(u32, u32)>,

    /// Bounds on casualties (injuries plus fatalities), e.g. 1:10
    #[arg(long, value_parser = parse_u32_range)]
    casualties: Option<(u32, u32)>,

    /// Bounds on emergency response minutes, e.g. 5:20
    #[arg(long, value_parser = parse_f64_range)]
    response_time: Option<(f64, f64)>,

    /// Keep only accidents with pedestrians involved
    #[arg(long)]
    pedestrians: bool,

    /// Keep only accidents with cyclists involved
    #[arg(long)]
    cyclists: bool,

    /// Thematic table to print
    #[arg(long, value_enum, default_value_t = View::Overview)]
    view: View,

    /// Output format for the table
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum View {
    Overview,
    Location,
    Temporal,
    Environment,
    Driver,
    Vehicle,
    Financial,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Table,
    Csv,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut cache = DatasetCache::new();
    let base = cache
        .load(&args.data)
        .with_context(|| format!("loading {}", args.data.display()))?;

    let mut session = AnalysisSession::new(base);
    session.set_filter(filter_from(&args));

    print_summary(session.filtered(), session.base());

    let table = view_table(args.view, session.filtered());
    match args.format {
        Format::Csv => print!("{}", export::to_csv_string(&table)?),
        Format::Table => {
            let batch = grouped_to_batch(&table)?;
            println!("{}", pretty_format_batches(&[batch])?);
        }
    }
    Ok(())
}

fn filter_from(args: &Args) -> AccidentFilter {
    let neutral = AccidentFilter::default();
    AccidentFilter {
        severity: args.severity.iter().cloned().collect(),
        causes: args.cause.iter().cloned().collect(),
        vehicles_range: args.vehicles.unwrap_or(neutral.vehicles_range),
        casualties_range: args.casualties.unwrap_or(neutral.casualties_range),
        response_time_range: args.response_time.unwrap_or(neutral.response_time_range),
        pedestrians_only: args.pedestrians,
        cyclists_only: args.cyclists,
    }
}

fn print_summary(filtered: &Dataset, base: &Dataset) {
    let stats = summary_statistics(filtered);
    let response = stats
        .avg_response_time
        .map_or("n/a".to_string(), |v| format!("{v:.1} min"));
    println!(
        "{} of {} accidents | fatalities {} | injuries {} | avg response {} | economic loss {:.0}",
        stats.count,
        base.len(),
        stats.total_fatalities,
        stats.total_injuries,
        response,
        stats.total_economic_loss,
    );
}

fn view_table(view: View, filtered: &Dataset) -> GroupedTable {
    match view {
        View::Overview => overview::severity_distribution(filtered),
        View::Location => location::region_table(filtered),
        View::Temporal => temporal::monthly_timeline(filtered),
        View::Environment => environment::road_weather_table(filtered),
        View::Driver => driver::age_gender_pivot(filtered).to_grouped(),
        View::Vehicle => vehicle::condition_stats(filtered),
        View::Financial => financial::severity_region_costs(filtered),
    }
}

/// Render a derived table through Arrow so wide outputs stay aligned.
fn grouped_to_batch(table: &GroupedTable) -> anyhow::Result<RecordBatch> {
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();
    for (i, name) in table.key_columns.iter().enumerate() {
        fields.push(Field::new(name, DataType::Utf8, false));
        columns.push(Arc::new(StringArray::from_iter_values(
            table
                .rows
                .iter()
                .map(|r| r.keys.get(i).map_or("", String::as_str)),
        )));
    }
    for (j, name) in table.value_columns.iter().enumerate() {
        fields.push(Field::new(name, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from_iter(
            table.rows.iter().map(|r| r.values.get(j).copied().flatten()),
        )));
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn parse_u32_range(raw: &str) -> Result<(u32, u32), String> {
    let (lo, hi) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected MIN:MAX, got {raw}"))?;
    let lo = lo.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let hi = hi.trim().parse::<u32>().map_err(|e| e.to_string())?;
    if lo > hi {
        return Err(format!("empty range {lo}:{hi}"));
    }
    Ok((lo, hi))
}

fn parse_f64_range(raw: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected MIN:MAX, got {raw}"))?;
    let lo = lo.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let hi = hi.trim().parse::<f64>().map_err(|e| e.to_string())?;
    if lo > hi {
        return Err(format!("empty range {lo}:{hi}"));
    }
    Ok((lo, hi))
}
