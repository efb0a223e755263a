//! Vocalization activity tracking
//!
//! Gates each spectral frame on average volume. Voiced frames advance the elapsed
//! duration (measured from session start) and, when the dominant-bin pitch falls in
//! the acceptance band, the last valid pitch. Out-of-band pitches are discarded,
//! never clamped.
//!
//! Silent frames hold all state. With [`SilencePolicy::EndAfter`] the tracker also
//! reports when the silence has lasted too long; the session decides what to do.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::{SilencePolicy, VocalizationConfig};
use crate::error::TherapyError;
use crate::spectral::SpectralFeatures;
use crate::types::{ActivityTick, SpectralFrame, VocalizationSample};

/// Result of feeding one frame to an active tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerUpdate {
    /// Above the gate; state advanced
    Voiced(ActivityTick),
    /// At or below the gate; state held
    Silent { silent_ms: u64 },
    /// Silent for longer than the configured limit
    SilenceTimeout { silent_ms: u64 },
}

/// State at the moment the tracker was stopped
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VocalizationOutcome {
    pub elapsed_active_seconds: f64,
    /// Last in-band pitch, if any voiced frame produced one
    pub last_pitch_hz: Option<f64>,
    pub goal_seconds: f64,
}

/// Volume-gated duration and pitch tracker
#[derive(Debug, Clone)]
pub struct VocalizationTracker {
    config: VocalizationConfig,
    active: bool,
    session_start_ms: u64,
    last_voiced_ms: u64,
    elapsed_active_seconds: f64,
    last_pitch_hz: Option<f64>,
}

impl VocalizationTracker {
    pub fn new(config: &VocalizationConfig) -> Self {
        Self {
            config: config.clone(),
            active: false,
            session_start_ms: 0,
            last_voiced_ms: 0,
            elapsed_active_seconds: 0.0,
            last_pitch_hz: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn elapsed_active_seconds(&self) -> f64 {
        self.elapsed_active_seconds
    }

    pub fn last_pitch_hz(&self) -> Option<f64> {
        self.last_pitch_hz
    }

    /// Altitude for the current elapsed duration
    pub fn altitude(&self) -> u64 {
        altitude_for(self.elapsed_active_seconds, self.config.altitude_per_second)
    }

    /// Idle → Active
    pub fn start(&mut self, now_ms: u64) -> Result<(), TherapyError> {
        if self.active {
            return Err(TherapyError::InvalidState(
                "vocalization tracker is already active".to_string(),
            ));
        }
        self.active = true;
        self.session_start_ms = now_ms;
        self.last_voiced_ms = now_ms;
        self.elapsed_active_seconds = 0.0;
        self.last_pitch_hz = None;
        info!(at_ms = now_ms, "vocalization tracking started");
        Ok(())
    }

    /// Process one spectral frame; `None` while idle or for an empty spectrum
    pub fn process(&mut self, frame: &SpectralFrame, now_ms: u64) -> Option<TrackerUpdate> {
        if !self.active {
            return None;
        }

        let Some(sample) = SpectralFeatures::derive(frame) else {
            trace!("skipping empty spectrum");
            return None;
        };

        Some(self.evaluate(sample, now_ms))
    }

    /// Apply the activity gate to an already-derived sample
    pub fn evaluate(&mut self, sample: VocalizationSample, now_ms: u64) -> TrackerUpdate {
        if sample.average_volume > self.config.volume_gate {
            TrackerUpdate::Voiced(self.record_voiced(sample, now_ms))
        } else {
            let silent_ms = now_ms.saturating_sub(self.last_voiced_ms);
            match self.config.silence {
                SilencePolicy::EndAfter { silence_ms } if silent_ms > silence_ms => {
                    debug!(silent_ms, "silence limit exceeded");
                    TrackerUpdate::SilenceTimeout { silent_ms }
                }
                _ => TrackerUpdate::Silent { silent_ms },
            }
        }
    }

    /// Active → Idle
    pub fn stop(&mut self) -> Option<VocalizationOutcome> {
        if !self.active {
            return None;
        }
        self.active = false;
        let outcome = VocalizationOutcome {
            elapsed_active_seconds: self.elapsed_active_seconds,
            last_pitch_hz: self.last_pitch_hz,
            goal_seconds: self.config.goal_seconds,
        };
        info!(
            elapsed = outcome.elapsed_active_seconds,
            pitch = ?outcome.last_pitch_hz,
            "vocalization tracking stopped"
        );
        Some(outcome)
    }

    fn record_voiced(&mut self, sample: VocalizationSample, now_ms: u64) -> ActivityTick {
        let elapsed = now_ms.saturating_sub(self.session_start_ms) as f64 / 1000.0;
        // A clock that steps backwards must not shrink the duration
        self.elapsed_active_seconds = self.elapsed_active_seconds.max(elapsed);
        self.last_voiced_ms = self.last_voiced_ms.max(now_ms);

        let pitch_accepted = self.config.accepts_pitch(sample.estimated_pitch_hz);
        if pitch_accepted {
            self.last_pitch_hz = Some(sample.estimated_pitch_hz);
        } else {
            trace!(pitch = sample.estimated_pitch_hz, "pitch outside band, discarded");
        }

        ActivityTick {
            at_ms: now_ms,
            elapsed_active_seconds: self.elapsed_active_seconds,
            altitude: self.altitude(),
            average_volume: sample.average_volume,
            estimated_pitch_hz: sample.estimated_pitch_hz,
            pitch_accepted,
        }
    }
}

fn altitude_for(elapsed_seconds: f64, per_second: f64) -> u64 {
    (elapsed_seconds * per_second).floor().max(0.0) as u64
}
