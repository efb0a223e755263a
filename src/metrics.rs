//! Session metrics
//!
//! [`SessionMetricsBuilder`] turns a game's terminal state into a
//! [`TherapyMetricRecord`]. Records are handed to a [`MetricsSink`]; a sink never
//! reports back into the session, so a failed save cannot block the next one.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::gesture::TreatOutcome;
use crate::types::{ExerciseType, TherapyMetricRecord};
use crate::vocalization::VocalizationOutcome;

/// Placeholder identity used when no child is selected
pub const DEFAULT_CHILD_ID: &str = "Leo Thompson";

/// Builder for persistable metric records
pub struct SessionMetricsBuilder;

impl SessionMetricsBuilder {
    /// Oral motor record: accuracy is the share of the round collected at stop
    pub fn oral_motor(
        child_id: &str,
        outcome: &TreatOutcome,
        timestamp: DateTime<Utc>,
    ) -> TherapyMetricRecord {
        let accuracy = ratio_percent(
            f64::from(outcome.treats_collected),
            f64::from(outcome.round_size),
        );

        TherapyMetricRecord {
            child_id: child_id.to_string(),
            exercise_type: ExerciseType::OralMotor,
            duration_seconds: None,
            intensity: None,
            accuracy_percent: Some(accuracy),
            timestamp,
        }
    }

    /// Balloon record: duration, last valid pitch as intensity, and the share of
    /// the duration goal reached
    pub fn vocalization(
        child_id: &str,
        outcome: &VocalizationOutcome,
        timestamp: DateTime<Utc>,
    ) -> TherapyMetricRecord {
        let accuracy = ratio_percent(outcome.elapsed_active_seconds, outcome.goal_seconds);

        TherapyMetricRecord {
            child_id: child_id.to_string(),
            exercise_type: ExerciseType::VocalizationBalloon,
            duration_seconds: Some(outcome.elapsed_active_seconds),
            intensity: outcome.last_pitch_hz,
            accuracy_percent: Some(accuracy),
            timestamp,
        }
    }
}

/// `value / total * 100`, clamped to 0-100
fn ratio_percent(value: f64, total: f64) -> f64 {
    if total <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    ((value / total) * 100.0).clamp(0.0, 100.0)
}

/// Destination for completed records
///
/// Implementations must not block the caller; failures are theirs to log.
pub trait MetricsSink: Send + Sync {
    fn submit(&self, record: TherapyMetricRecord);
}

/// Sink that keeps records in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<TherapyMetricRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TherapyMetricRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MetricsSink for MemorySink {
    fn submit(&self, record: TherapyMetricRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(_) => warn!("memory sink poisoned, dropping metric record"),
        }
    }
}
