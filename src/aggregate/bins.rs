use crate::data::model::{Dataset, Measure};

// ---------------------------------------------------------------------------
// Quantile bins
// ---------------------------------------------------------------------------

/// Equal-frequency bin label per row, `labels.len()` bins computed over the
/// rows where the measure is present.  A missing measure gets `None`, which
/// keeps the row out of any grouping built on these labels.
///
/// Bin edges are linearly interpolated quantiles of the present values;
/// each interval is closed on the right, so a value equal to an edge falls
/// in the lower bin.
pub fn quantile_bins(dataset: &Dataset, measure: Measure, labels: &[&str]) -> Vec<Option<String>> {
    let present: Vec<Option<f64>> = dataset.iter().map(|r| r.measure(measure)).collect();

    let mut sorted: Vec<f64> = present.iter().copied().flatten().collect();
    sorted.sort_by(f64::total_cmp);
    if sorted.is_empty() || labels.is_empty() {
        return vec![None; present.len()];
    }

    let k = labels.len();
    let edges: Vec<f64> = (1..k)
        .map(|i| quantile(&sorted, i as f64 / k as f64))
        .collect();

    present
        .into_iter()
        .map(|value| {
            value.map(|v| {
                let bin = edges.partition_point(|e| *e < v);
                labels[bin.min(k - 1)].to_string()
            })
        })
        .collect()
}

/// Linearly interpolated quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

// ---------------------------------------------------------------------------
// Fixed-width histograms
// ---------------------------------------------------------------------------

/// Fixed-width bin counts over the observed range of a measure.
///
/// `edges` has one more entry than `counts`; bin `i` covers
/// `edges[i] ..= edges[i + 1]` with the upper edge belonging to the next
/// bin except for the last, which keeps the maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Human-readable label for bin `i`, e.g. `"60-80"`.
    pub fn bin_label(&self, i: usize) -> Option<String> {
        let lo = self.edges.get(i)?;
        let hi = self.edges.get(i + 1)?;
        Some(format!("{lo:.0}-{hi:.0}"))
    }
}

/// Count present values of a measure into `bins` equal-width buckets over
/// the observed range.  No present values or zero bins yield an empty
/// histogram.
pub fn histogram(dataset: &Dataset, measure: Measure, bins: usize) -> Histogram {
    let values: Vec<f64> = dataset.iter().filter_map(|r| r.measure(measure)).collect();
    if bins == 0 || values.is_empty() {
        return Histogram {
            edges: Vec::new(),
            counts: Vec::new(),
        };
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in &values {
        let idx = if width == 0.0 {
            0
        } else {
            (((v - min) / width) as usize).min(bins - 1)
        };
        counts[idx] += 1;
    }

    Histogram {
        edges: (0..=bins).map(|i| min + width * i as f64).collect(),
        counts,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
