use crate::data::model::{Dataset, Measure};

// ---------------------------------------------------------------------------
// Headline statistics
// ---------------------------------------------------------------------------

/// Totals and means for one dataset, usually a filtered one.
///
/// Sums skip missing cells.  `avg_response_time` is `None` when no row
/// carries a response time, so an empty dataset yields zeroed totals and
/// no mean rather than a division fault.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub count: usize,
    pub total_fatalities: u64,
    pub total_injuries: u64,
    pub avg_response_time: Option<f64>,
    pub total_economic_loss: f64,
}

pub fn summary_statistics(dataset: &Dataset) -> SummaryStats {
    let mut total_fatalities: u64 = 0;
    let mut total_injuries: u64 = 0;
    let mut total_economic_loss = 0.0;
    let mut response_sum = 0.0;
    let mut response_n: usize = 0;

    for record in dataset.iter() {
        total_fatalities += u64::from(record.fatalities.unwrap_or(0));
        total_injuries += u64::from(record.injuries.unwrap_or(0));
        total_economic_loss += record.economic_loss.unwrap_or(0.0);
        if let Some(t) = record.response_time_min {
            response_sum += t;
            response_n += 1;
        }
    }

    SummaryStats {
        count: dataset.len(),
        total_fatalities,
        total_injuries,
        avg_response_time: (response_n > 0).then(|| response_sum / response_n as f64),
        total_economic_loss,
    }
}

/// Sum of a measure's present values; `0.0` when none are present.
pub fn sum_of(dataset: &Dataset, measure: Measure) -> f64 {
    dataset.iter().filter_map(|r| r.measure(measure)).sum()
}

/// Mean of a measure's present values; `None` when none are present.
pub fn mean_of(dataset: &Dataset, measure: Measure) -> Option<f64> {
    let mut sum = 0.0;
    let mut n: usize = 0;
    for v in dataset.iter().filter_map(|r| r.measure(measure)) {
        sum += v;
        n += 1;
    }
    (n > 0).then(|| sum / n as f64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply_filter, AccidentFilter};
    use crate::data::model::AccidentRecord;
    use std::collections::BTreeSet;

    fn record(
        severity: &str,
        injuries: Option<u32>,
        fatalities: Option<u32>,
        response: Option<f64>,
        loss: Option<f64>,
    ) -> AccidentRecord {
        AccidentRecord {
            severity: severity.to_string(),
            injuries,
            fatalities,
            response_time_min: response,
            economic_loss: loss,
            ..Default::default()
        }
    }

    #[test]
    fn empty_dataset_yields_zeroes_and_no_mean() {
        let stats = summary_statistics(&Dataset::default());
        assert_eq!(stats.count, 0);
        assert_eq!(stats.total_fatalities, 0);
        assert_eq!(stats.total_injuries, 0);
        assert_eq!(stats.avg_response_time, None);
        assert_eq!(stats.total_economic_loss, 0.0);
    }

    #[test]
    fn sums_skip_missing_cells_and_count_covers_every_row() {
        let ds = Dataset::from_records(vec![
            record("Severe", Some(3), Some(1), Some(10.0), Some(1000.0)),
            record("Minor", None, Some(2), None, None),
            record("Minor", Some(1), None, Some(20.0), Some(500.0)),
        ]);
        let stats = summary_statistics(&ds);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_fatalities, 3);
        assert_eq!(stats.total_injuries, 4);
        assert_eq!(stats.avg_response_time, Some(15.0));
        assert_eq!(stats.total_economic_loss, 1500.0);
    }

    #[test]
    fn all_missing_response_times_yield_no_mean() {
        let ds = Dataset::from_records(vec![
            record("Severe", Some(1), Some(0), None, None),
            record("Minor", Some(0), Some(0), None, None),
        ]);
        assert_eq!(summary_statistics(&ds).avg_response_time, None);
    }

    #[test]
    fn scalar_folds_skip_missing_values() {
        let ds = Dataset::from_records(vec![
            record("Severe", Some(1), Some(0), Some(10.0), Some(100.0)),
            record("Minor", Some(0), Some(0), None, Some(50.0)),
        ]);
        assert_eq!(sum_of(&ds, Measure::EconomicLoss), 150.0);
        assert_eq!(mean_of(&ds, Measure::ResponseTime), Some(10.0));
        assert_eq!(mean_of(&ds, Measure::AlcoholLevel), None);
    }

    #[test]
    fn filtered_summary_matches_hand_computed_values() {
        let ds = Dataset::from_records(vec![
            record("Severe", Some(3), Some(1), Some(12.0), Some(9000.0)),
            record("Minor", Some(0), Some(0), Some(8.0), Some(100.0)),
        ]);

        let full = summary_statistics(&ds);
        assert_eq!(full.count, 2);
        assert_eq!(full.total_fatalities, 1);
        assert_eq!(full.total_injuries, 3);
        assert_eq!(full.avg_response_time, Some(10.0));

        let filter = AccidentFilter {
            severity: BTreeSet::from(["Severe".to_string()]),
            ..Default::default()
        };
        let stats = summary_statistics(&apply_filter(&ds, &filter));
        assert_eq!(stats.count, 1);
        assert_eq!(stats.total_fatalities, 1);
        assert_eq!(stats.total_injuries, 3);
        assert_eq!(stats.avg_response_time, Some(12.0));
    }
}
