//! Store summary statistics.

use serde::Serialize;
use std::collections::BTreeMap;

/// Min / max / mean of one metric over valid records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
}

impl MetricSummary {
    /// Summarise a sequence of values; `None` when empty.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        (count > 0).then(|| Self {
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

/// Summary of a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    /// Total rows.
    pub records: usize,
    /// Rows with a complete, valid fingerprint.
    pub valid: usize,
    /// Direction dimension → number of valid rows.
    pub dimensions: BTreeMap<usize, usize>,
    /// Strength over valid rows; `None` when there are none.
    pub strength: Option<MetricSummary>,
    /// Consistency over valid rows; `None` when there are none.
    pub consistency: Option<MetricSummary>,
    /// Keys held by more than one row.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duplicate_keys: Vec<i64>,
}

impl StoreStats {
    /// Number of rows that could not be read as records.
    pub fn invalid(&self) -> usize {
        self.records - self.valid
    }
}
