//! Writes a deterministic synthetic accident dataset so the CLI and tests
//! have data to chew on.
//!
//! Usage:
//!   generate_sample --out accidents.csv --rows 1000 --seed 42
//!
//! The extension picks the format: `.csv` or `.parquet`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use roadlens::data::model::{month_number, ACCIDENT_CAUSES, MONTHS, SEVERITY_LEVELS};
use roadlens::views::{AGE_GROUP_ORDER, DAY_ORDER, TIME_OF_DAY_ORDER};
use roadlens::{export, AccidentRecord, Dataset, Dimension, Measure};

const COUNTRIES: [&str; 10] = [
    "USA",
    "UK",
    "Canada",
    "India",
    "China",
    "Germany",
    "Australia",
    "Brazil",
    "Japan",
    "Russia",
];
const REGIONS: [&str; 5] = ["North America", "Europe", "Asia", "South America", "Oceania"];
const AREAS: [&str; 2] = ["Urban", "Rural"];
const ROAD_TYPES: [&str; 4] = ["Highway", "Main Road", "Street", "Mountain Road"];
const ROAD_CONDITIONS: [&str; 5] = ["Dry", "Wet", "Icy", "Snow-covered", "Under Construction"];
const WEATHER: [&str; 5] = ["Clear", "Rainy", "Snowy", "Foggy", "Windy"];
const GENDERS: [&str; 2] = ["Male", "Female"];
const VEHICLE_CONDITIONS: [&str; 3] = ["Good", "Moderate", "Poor"];

/// Fraction of optional numeric cells left empty.
const MISSING_RATE: f64 = 0.02;

#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
#[command(about = "Write a deterministic synthetic accident dataset")]
struct Args {
    /// Output path; the extension picks the format
    #[arg(short, long, default_value = "accidents.csv")]
    out: PathBuf,

    /// Number of records
    #[arg(short, long, default_value_t = 1000)]
    rows: usize,

    /// PRNG seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (splitmix64)
struct SampleRng {
    state: u64,
}

impl SampleRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[(self.next_u64() % values.len() as u64) as usize]
    }

    fn range_u32(&mut self, lo: u32, hi: u32) -> u32 {
        lo + (self.next_u64() % u64::from(hi - lo + 1)) as u32
    }

    fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn opt_u32(&mut self, lo: u32, hi: u32) -> Option<u32> {
        if self.chance(MISSING_RATE) {
            None
        } else {
            Some(self.range_u32(lo, hi))
        }
    }

    fn opt_f64(&mut self, lo: f64, hi: f64) -> Option<f64> {
        if self.chance(MISSING_RATE) {
            None
        } else {
            Some(self.range_f64(lo, hi))
        }
    }
}

fn synth_record(rng: &mut SampleRng) -> AccidentRecord {
    let year = 2020 + rng.range_u32(0, 4) as i32;
    let month = rng.pick(&MONTHS).to_string();
    let date = month_number(&month).and_then(|m| NaiveDate::from_ymd_opt(year, m, 1));
    AccidentRecord {
        country: rng.pick(&COUNTRIES).to_string(),
        region: rng.pick(&REGIONS).to_string(),
        area: rng.pick(&AREAS).to_string(),
        severity: rng.pick(&SEVERITY_LEVELS).to_string(),
        cause: rng.pick(&ACCIDENT_CAUSES).to_string(),
        road_type: rng.pick(&ROAD_TYPES).to_string(),
        road_condition: rng.pick(&ROAD_CONDITIONS).to_string(),
        weather: rng.pick(&WEATHER).to_string(),
        time_of_day: rng.pick(&TIME_OF_DAY_ORDER).to_string(),
        day_of_week: rng.pick(&DAY_ORDER).to_string(),
        driver_age_group: rng.pick(&AGE_GROUP_ORDER).to_string(),
        driver_gender: rng.pick(&GENDERS).to_string(),
        vehicle_condition: rng.pick(&VEHICLE_CONDITIONS).to_string(),
        month,
        year: Some(year),
        vehicles_involved: rng.opt_u32(1, 4),
        injuries: rng.opt_u32(0, 10),
        fatalities: rng.opt_u32(0, 3),
        pedestrians_involved: rng.opt_u32(0, 3),
        cyclists_involved: rng.opt_u32(0, 2),
        driver_fatigue: if rng.chance(0.3) {
            None
        } else {
            Some(rng.chance(0.25))
        },
        response_time_min: rng.opt_f64(5.0, 60.0),
        alcohol_level: rng.opt_f64(0.0, 0.3),
        traffic_volume: rng.opt_f64(100.0, 10_000.0),
        visibility_level: rng.opt_f64(20.0, 500.0),
        speed_limit: rng.opt_f64(20.0, 120.0),
        population_density: rng.opt_f64(50.0, 5_000.0),
        medical_cost: rng.opt_f64(100.0, 50_000.0),
        economic_loss: rng.opt_f64(500.0, 100_000.0),
        insurance_claims: rng.opt_u32(0, 10).map(f64::from),
        date,
    }
}

fn write_parquet(path: &Path, dataset: &Dataset) -> anyhow::Result<()> {
    let mut columns: Vec<(String, ArrayRef)> = Vec::new();
    for dim in Dimension::ALL {
        let array: ArrayRef = match dim {
            Dimension::Year => Arc::new(Int32Array::from_iter(dataset.iter().map(|r| r.year))),
            _ => Arc::new(StringArray::from_iter_values(
                dataset.iter().map(|r| r.dimension(dim).unwrap_or_default()),
            )),
        };
        columns.push((dim.label().to_string(), array));
    }
    for measure in Measure::ALL {
        let array: ArrayRef = match measure {
            Measure::VehiclesInvolved
            | Measure::Injuries
            | Measure::Fatalities
            | Measure::PedestriansInvolved
            | Measure::CyclistsInvolved => Arc::new(Int64Array::from_iter(
                dataset.iter().map(|r| r.measure(measure).map(|v| v as i64)),
            )),
            Measure::DriverFatigue => Arc::new(BooleanArray::from_iter(
                dataset.iter().map(|r| r.driver_fatigue),
            )),
            _ => Arc::new(Float64Array::from_iter(
                dataset.iter().map(|r| r.measure(measure)),
            )),
        };
        columns.push((measure.label().to_string(), array));
    }

    let batch = RecordBatch::try_from_iter(columns)?;
    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut rng = SampleRng::new(args.seed);
    let dataset: Dataset = (0..args.rows).map(|_| synth_record(&mut rng)).collect();

    match args.out.extension().and_then(|e| e.to_str()) {
        Some("parquet") | Some("pq") => write_parquet(&args.out, &dataset)?,
        _ => std::fs::write(&args.out, export::dataset_to_csv(&dataset)?)?,
    }

    println!("Wrote {} records to {}", dataset.len(), args.out.display());
    Ok(())
}
