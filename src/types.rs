//! Core types for the Therapy Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: landmark and spectral frames from the capture layer, the per-frame
//! samples derived from them, detector events, and the metric record produced at
//! the end of a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Landmark index of the upper lip (inner, center)
pub const UPPER_LIP: usize = 13;
/// Landmark index of the lower lip (inner, center)
pub const LOWER_LIP: usize = 14;
/// Landmark index of the top of the face (forehead)
pub const FACE_TOP: usize = 10;
/// Landmark index of the bottom of the face (chin)
pub const FACE_BOTTOM: usize = 152;

/// A single normalized 3D facial landmark
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One camera-synchronized detection result
///
/// Points are addressed by the detector's fixed landmark index. A detector that
/// lost the face produces an empty frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub points: Vec<LandmarkPoint>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    /// Point at a landmark index, if the detector produced it
    pub fn point(&self, index: usize) -> Option<&LandmarkPoint> {
        self.points.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One normalized gesture measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MouthOpeningSample {
    /// Mouth gap divided by face height (>= 0)
    pub ratio: f64,
}

/// One audio analysis tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralFrame {
    /// Per-bin byte magnitudes, lowest frequency first
    pub magnitudes: Vec<u8>,
    /// Sampling rate used to produce the spectrum (Hz)
    pub sample_rate_hz: f64,
}

impl SpectralFrame {
    pub fn new(magnitudes: Vec<u8>, sample_rate_hz: f64) -> Self {
        Self {
            magnitudes,
            sample_rate_hz,
        }
    }
}

/// One volume/pitch measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VocalizationSample {
    /// Mean bin magnitude (0-255)
    pub average_volume: f64,
    /// Dominant-bin frequency estimate (Hz)
    pub estimated_pitch_hz: f64,
}

/// A discrete "mouth opened wide enough" event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    /// Clock time the event fired (ms)
    pub at_ms: u64,
    /// Opening ratio that triggered the event
    pub ratio: f64,
    /// Treat count after the game counted this event; 0 until a session stamps it
    #[serde(default)]
    pub treats_collected: u32,
}

/// One voiced tick reported by the vocalization tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityTick {
    /// Clock time of the tick (ms)
    pub at_ms: u64,
    /// Seconds since the session started, as of this tick
    pub elapsed_active_seconds: f64,
    /// Balloon altitude derived from the elapsed time
    pub altitude: u64,
    /// Mean bin magnitude of the tick
    pub average_volume: f64,
    /// Raw pitch estimate of the tick (Hz)
    pub estimated_pitch_hz: f64,
    /// Whether the pitch fell inside the acceptance band
    pub pitch_accepted: bool,
}

/// Exercise type of a metric record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseType {
    #[serde(rename = "Oral Motor Training")]
    OralMotor,
    #[serde(rename = "Vocalization Balloon")]
    VocalizationBalloon,
}

impl ExerciseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::OralMotor => "Oral Motor Training",
            ExerciseType::VocalizationBalloon => "Vocalization Balloon",
        }
    }
}

/// A completed exercise attempt
///
/// Serializes to the metrics service request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapyMetricRecord {
    pub child_id: String,
    pub exercise_type: ExerciseType,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(rename = "accuracy", skip_serializing_if = "Option::is_none")]
    pub accuracy_percent: Option<f64>,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
}

/// A metric record as held by the metrics service
///
/// `exercise_type` stays a free string: the service stores whatever label the
/// client sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMetric {
    pub id: Uuid,
    pub child_id: String,
    pub exercise_type: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub date: DateTime<Utc>,
}
