//! Therapy Flux - real-time signal interpretation for gamified therapy exercises
//!
//! Flux turns per-frame sensor input into game events and session metrics through
//! a deterministic pipeline: frame → normalized feature → detector (threshold,
//! cooldown, activity gate) → game state → metric record.
//!
//! ## Exercises
//!
//! - **Oral Motor**: facial landmarks → mouth-opening ratio → treat collection
//! - **Vocalization**: microphone spectrum → volume and pitch → balloon ascent
//!
//! Completed sessions are persisted through a [`MetricsSink`]; the `server`
//! module provides the HTTP metrics service and `client` talks to it.
//!
//! ## Features
//!
//! - `server` (default): axum metrics service
//! - `client` (default): reqwest client and HTTP sink
//! - `cli`: the `therapy-flux` binary
//!
//! With `--no-default-features` only the signal and game pipeline is built.

#[cfg(feature = "client")]
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod media;
pub mod metrics;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;
pub mod session;
pub mod spectral;
pub mod types;
pub mod vocalization;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GestureConfig, SilencePolicy, TherapyConfig, VocalizationConfig};
pub use error::TherapyError;
pub use metrics::{MetricsSink, SessionMetricsBuilder, DEFAULT_CHILD_ID};
pub use session::{OralMotorSession, SessionDeps, VocalizationSession};

// Exercise exports
pub use gesture::{CelebrationEffect, GestureDetector, TreatGame, TreatPhase, TreatVariant};
pub use vocalization::{BalloonGame, TrackerUpdate, VocalizationTracker};

pub use progress::ProgressSummary;
pub use types::{ExerciseType, StoredMetric, TherapyMetricRecord};

/// Crate version reported by the metrics service and CLI
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name used in CLI reports
pub const PRODUCER_NAME: &str = "therapy-flux";
