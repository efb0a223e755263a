//! Progress summary over fetched metric records
//!
//! Averages are taken over the records that carry the value; a record without an
//! accuracy (or duration) still counts as an attempt.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::StoredMetric;

/// Dashboard figures for one child (or everyone)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub attempts: usize,
    /// Mean accuracy, rounded to a whole percent
    pub average_accuracy: u32,
    /// Mean duration in seconds, rounded to one decimal
    pub average_duration: f64,
}

impl ProgressSummary {
    pub fn from_records(records: &[StoredMetric]) -> Self {
        let accuracy = mean(records.iter().filter_map(|m| m.accuracy));
        let duration = mean(records.iter().filter_map(|m| m.duration));

        Self {
            attempts: records.len(),
            average_accuracy: accuracy.round().clamp(0.0, 100.0) as u32,
            average_duration: (duration * 10.0).round() / 10.0,
        }
    }
}

impl fmt::Display for ProgressSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempts: {}, average accuracy: {}%, average duration: {:.1}s",
            self.attempts, self.average_accuracy, self.average_duration
        )
    }
}

/// Mean of the finite values, 0 when there are none
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
