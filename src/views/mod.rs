/// Thematic data preparation for presentation layers.
///
/// Every function takes an already-filtered dataset and returns plain
/// tables or metric structs; rendering, colours, and layout stay with the
/// caller.  Empty input produces empty tables and `None` metrics.

pub mod driver;
pub mod environment;
pub mod financial;
pub mod location;
pub mod overview;
pub mod temporal;
pub mod vehicle;

/// Weekday order for day-of-week tables.
pub const DAY_ORDER: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Diurnal order for time-of-day tables.
pub const TIME_OF_DAY_ORDER: [&str; 4] = ["Morning", "Afternoon", "Evening", "Night"];

/// Age bands, youngest first.
pub const AGE_GROUP_ORDER: [&str; 5] = ["<18", "18-25", "26-40", "41-60", "61+"];

/// Share of `part` in `whole`, percent; `None` for an empty whole.
pub(crate) fn share(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64 * 100.0)
}
