use std::borrow::Cow;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Column vocabulary
// ---------------------------------------------------------------------------

/// The twelve canonical English month names, in calendar order. Month cells
/// must match one of these exactly (case-sensitive) to produce a date.
pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Severity levels observed in the source data.
pub const SEVERITY_LEVELS: [&str; 3] = ["Minor", "Moderate", "Severe"];

/// Accident causes observed in the source data.
pub const ACCIDENT_CAUSES: [&str; 5] = [
    "Weather",
    "Mechanical Failure",
    "Speeding",
    "Distracted Driving",
    "Drunk Driving",
];

/// Calendar number (1-12) of a canonical month name, `None` for anything
/// else (including case variants).
pub fn month_number(name: &str) -> Option<u32> {
    MONTHS.iter().position(|m| *m == name).map(|i| i as u32 + 1)
}

// ---------------------------------------------------------------------------
// Typed field keys
// ---------------------------------------------------------------------------

/// A numeric column, addressable by key so aggregations can run over any
/// measure without stringly-typed lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    VehiclesInvolved,
    Injuries,
    Fatalities,
    PedestriansInvolved,
    CyclistsInvolved,
    ResponseTime,
    AlcoholLevel,
    TrafficVolume,
    VisibilityLevel,
    SpeedLimit,
    PopulationDensity,
    MedicalCost,
    EconomicLoss,
    InsuranceClaims,
    DriverFatigue,
}

impl Measure {
    /// Every measure, in schema order.
    pub const ALL: [Measure; 15] = [
        Measure::VehiclesInvolved,
        Measure::Injuries,
        Measure::Fatalities,
        Measure::PedestriansInvolved,
        Measure::CyclistsInvolved,
        Measure::ResponseTime,
        Measure::AlcoholLevel,
        Measure::TrafficVolume,
        Measure::VisibilityLevel,
        Measure::SpeedLimit,
        Measure::PopulationDensity,
        Measure::MedicalCost,
        Measure::EconomicLoss,
        Measure::InsuranceClaims,
        Measure::DriverFatigue,
    ];

    /// Header name of the column in the source table.
    pub fn label(self) -> &'static str {
        match self {
            Measure::VehiclesInvolved => "Number of Vehicles Involved",
            Measure::Injuries => "Number of Injuries",
            Measure::Fatalities => "Number of Fatalities",
            Measure::PedestriansInvolved => "Pedestrians Involved",
            Measure::CyclistsInvolved => "Cyclists Involved",
            Measure::ResponseTime => "Emergency Response Time",
            Measure::AlcoholLevel => "Driver Alcohol Level",
            Measure::TrafficVolume => "Traffic Volume",
            Measure::VisibilityLevel => "Visibility Level",
            Measure::SpeedLimit => "Speed Limit",
            Measure::PopulationDensity => "Population Density",
            Measure::MedicalCost => "Medical Cost",
            Measure::EconomicLoss => "Economic Loss",
            Measure::InsuranceClaims => "Insurance Claims",
            Measure::DriverFatigue => "Driver Fatigue",
        }
    }
}

/// A categorical column usable as a grouping key. `Year` is the one numeric
/// column the dashboard also groups by, so it is exposed here as a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Country,
    Region,
    Area,
    Severity,
    Cause,
    RoadType,
    RoadCondition,
    Weather,
    TimeOfDay,
    DayOfWeek,
    DriverAgeGroup,
    DriverGender,
    VehicleCondition,
    Month,
    Year,
}

impl Dimension {
    /// Every dimension, in schema order.
    pub const ALL: [Dimension; 15] = [
        Dimension::Country,
        Dimension::Region,
        Dimension::Area,
        Dimension::Severity,
        Dimension::Cause,
        Dimension::RoadType,
        Dimension::RoadCondition,
        Dimension::Weather,
        Dimension::TimeOfDay,
        Dimension::DayOfWeek,
        Dimension::DriverAgeGroup,
        Dimension::DriverGender,
        Dimension::VehicleCondition,
        Dimension::Month,
        Dimension::Year,
    ];

    /// Header name of the column in the source table.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Country => "Country",
            Dimension::Region => "Region",
            Dimension::Area => "Urban/Rural",
            Dimension::Severity => "Accident Severity",
            Dimension::Cause => "Accident Cause",
            Dimension::RoadType => "Road Type",
            Dimension::RoadCondition => "Road Condition",
            Dimension::Weather => "Weather Conditions",
            Dimension::TimeOfDay => "Time of Day",
            Dimension::DayOfWeek => "Day of Week",
            Dimension::DriverAgeGroup => "Driver Age Group",
            Dimension::DriverGender => "Driver Gender",
            Dimension::VehicleCondition => "Vehicle Condition",
            Dimension::Month => "Month",
            Dimension::Year => "Year",
        }
    }
}

// ---------------------------------------------------------------------------
// AccidentRecord – one row of the table
// ---------------------------------------------------------------------------

/// A single accident event. `None` in any numeric field means the source
/// cell was absent or failed coercion; arithmetic and range predicates treat
/// it as a first-class missing value, never as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccidentRecord {
    pub country: String,
    pub region: String,
    /// "Urban" or "Rural".
    pub area: String,
    pub severity: String,
    pub cause: String,
    pub road_type: String,
    pub road_condition: String,
    pub weather: String,
    pub time_of_day: String,
    pub day_of_week: String,
    pub driver_age_group: String,
    pub driver_gender: String,
    pub vehicle_condition: String,
    /// Canonical English month name, kept verbatim from the source.
    pub month: String,
    pub year: Option<i32>,

    pub vehicles_involved: Option<u32>,
    pub injuries: Option<u32>,
    pub fatalities: Option<u32>,
    pub pedestrians_involved: Option<u32>,
    pub cyclists_involved: Option<u32>,
    pub driver_fatigue: Option<bool>,

    pub response_time_min: Option<f64>,
    pub alcohol_level: Option<f64>,
    pub traffic_volume: Option<f64>,
    pub visibility_level: Option<f64>,
    pub speed_limit: Option<f64>,
    pub population_density: Option<f64>,
    pub medical_cost: Option<f64>,
    pub economic_loss: Option<f64>,
    pub insurance_claims: Option<f64>,

    /// First day of (`year`, `month`); `None` when either part is missing
    /// or the month name is not canonical.
    pub date: Option<NaiveDate>,
}

impl AccidentRecord {
    /// Injuries + fatalities; missing if either count is missing.
    pub fn casualties(&self) -> Option<u32> {
        Some(self.injuries? + self.fatalities?)
    }

    /// Numeric value of a measure column. Counts and flags widen to `f64`
    /// so every measure aggregates through the same code path.
    pub fn measure(&self, m: Measure) -> Option<f64> {
        match m {
            Measure::VehiclesInvolved => self.vehicles_involved.map(f64::from),
            Measure::Injuries => self.injuries.map(f64::from),
            Measure::Fatalities => self.fatalities.map(f64::from),
            Measure::PedestriansInvolved => self.pedestrians_involved.map(f64::from),
            Measure::CyclistsInvolved => self.cyclists_involved.map(f64::from),
            Measure::ResponseTime => self.response_time_min,
            Measure::AlcoholLevel => self.alcohol_level,
            Measure::TrafficVolume => self.traffic_volume,
            Measure::VisibilityLevel => self.visibility_level,
            Measure::SpeedLimit => self.speed_limit,
            Measure::PopulationDensity => self.population_density,
            Measure::MedicalCost => self.medical_cost,
            Measure::EconomicLoss => self.economic_loss,
            Measure::InsuranceClaims => self.insurance_claims,
            Measure::DriverFatigue => self.driver_fatigue.map(|f| f64::from(u8::from(f))),
        }
    }

    /// Categorical value of a dimension column. `None` when the cell was
    /// empty (or, for `Year`, unparseable) – such rows form no group.
    pub fn dimension(&self, d: Dimension) -> Option<Cow<'_, str>> {
        let text = match d {
            Dimension::Country => &self.country,
            Dimension::Region => &self.region,
            Dimension::Area => &self.area,
            Dimension::Severity => &self.severity,
            Dimension::Cause => &self.cause,
            Dimension::RoadType => &self.road_type,
            Dimension::RoadCondition => &self.road_condition,
            Dimension::Weather => &self.weather,
            Dimension::TimeOfDay => &self.time_of_day,
            Dimension::DayOfWeek => &self.day_of_week,
            Dimension::DriverAgeGroup => &self.driver_age_group,
            Dimension::DriverGender => &self.driver_gender,
            Dimension::VehicleCondition => &self.vehicle_condition,
            Dimension::Month => &self.month,
            Dimension::Year => return self.year.map(|y| Cow::Owned(y.to_string())),
        };
        if text.is_empty() {
            None
        } else {
            Some(Cow::Borrowed(text.as_str()))
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An ordered, immutable-after-load sequence of accident records. Engine
/// operations never mutate a dataset in place; filtering and selection
/// return new ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<AccidentRecord>,
}

impl Dataset {
    pub fn from_records(records: Vec<AccidentRecord>) -> Self {
        Dataset { records }
    }

    pub fn records(&self) -> &[AccidentRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AccidentRecord> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// New dataset containing the rows at `indices`, in the given order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
        }
    }

    /// Sorted unique values of a dimension (empty cells excluded).
    pub fn distinct(&self, d: Dimension) -> Vec<String> {
        let mut values: Vec<String> = self
            .records
            .iter()
            .filter_map(|r| r.dimension(d).map(Cow::into_owned))
            .collect();
        values.sort();
        values.dedup();
        values
    }

    /// Inclusive (min, max) over the parsed `Year` column.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        let mut years = self.records.iter().filter_map(|r| r.year);
        let first = years.next()?;
        Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }

    /// Latest derived date in the dataset, if any row has one.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.iter().filter_map(|r| r.date).max()
    }
}

impl FromIterator<AccidentRecord> for Dataset {
    fn from_iter<T: IntoIterator<Item = AccidentRecord>>(iter: T) -> Self {
        Dataset {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_numbers_are_calendar_positions() {
        assert_eq!(month_number("January"), Some(1));
        assert_eq!(month_number("December"), Some(12));
        assert_eq!(month_number("january"), None);
        assert_eq!(month_number("Fevrier"), None);
    }

    #[test]
    fn casualties_need_both_counts() {
        let rec = AccidentRecord {
            injuries: Some(3),
            fatalities: Some(1),
            ..AccidentRecord::default()
        };
        assert_eq!(rec.casualties(), Some(4));

        let rec = AccidentRecord {
            injuries: Some(3),
            fatalities: None,
            ..AccidentRecord::default()
        };
        assert_eq!(rec.casualties(), None);
    }

    #[test]
    fn measure_widens_counts_and_flags() {
        let rec = AccidentRecord {
            fatalities: Some(2),
            driver_fatigue: Some(true),
            medical_cost: Some(1250.5),
            ..AccidentRecord::default()
        };
        assert_eq!(rec.measure(Measure::Fatalities), Some(2.0));
        assert_eq!(rec.measure(Measure::DriverFatigue), Some(1.0));
        assert_eq!(rec.measure(Measure::MedicalCost), Some(1250.5));
        assert_eq!(rec.measure(Measure::EconomicLoss), None);
    }

    #[test]
    fn dimension_treats_empty_text_as_missing() {
        let rec = AccidentRecord {
            severity: "Severe".into(),
            year: Some(2024),
            ..AccidentRecord::default()
        };
        assert_eq!(rec.dimension(Dimension::Severity).as_deref(), Some("Severe"));
        assert_eq!(rec.dimension(Dimension::Region), None);
        assert_eq!(rec.dimension(Dimension::Year).as_deref(), Some("2024"));
    }

    #[test]
    fn distinct_is_sorted_and_deduplicated() {
        let ds = Dataset::from_records(vec![
            AccidentRecord {
                region: "South".into(),
                ..AccidentRecord::default()
            },
            AccidentRecord {
                region: "North".into(),
                ..AccidentRecord::default()
            },
            AccidentRecord {
                region: "South".into(),
                ..AccidentRecord::default()
            },
            AccidentRecord::default(),
        ]);
        assert_eq!(ds.distinct(Dimension::Region), vec!["North", "South"]);
    }

    #[test]
    fn select_preserves_requested_order() {
        let ds = Dataset::from_records(vec![
            AccidentRecord {
                country: "UK".into(),
                ..AccidentRecord::default()
            },
            AccidentRecord {
                country: "Japan".into(),
                ..AccidentRecord::default()
            },
            AccidentRecord {
                country: "Brazil".into(),
                ..AccidentRecord::default()
            },
        ]);
        let picked = ds.select(&[2, 0]);
        assert_eq!(picked.records()[0].country, "Brazil");
        assert_eq!(picked.records()[1].country, "UK");
    }
}
