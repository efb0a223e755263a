//! Exercise configuration
//!
//! Every tunable the detectors and games consume, with the defaults the exercises
//! ship with. Loadable from JSON; omitted fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::error::TherapyError;

/// Configuration for both exercises
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TherapyConfig {
    pub gesture: GestureConfig,
    pub vocalization: VocalizationConfig,
}

/// Treat-collection (oral motor) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Opening ratio that must be exceeded to count a gesture
    pub threshold: f64,
    /// Minimum time between two accepted gestures (ms)
    pub cooldown_ms: u64,
    /// Treats needed to complete a round
    pub round_size: u32,
    /// Delay after entering the celebration before the treat is eaten (ms)
    pub eat_delay_ms: u64,
    /// Delay after entering the celebration before the companion grows (ms)
    pub grow_delay_ms: u64,
    /// Length of the celebration window (ms)
    pub celebration_ms: u64,
    /// Companion scale added per completed round
    pub growth_step: f64,
    /// Upper bound of the companion scale
    pub max_scale: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            threshold: 0.12,
            cooldown_ms: 1000,
            round_size: 10,
            eat_delay_ms: 1500,
            grow_delay_ms: 2200,
            celebration_ms: 3000,
            growth_step: 0.15,
            max_scale: 1.4,
        }
    }
}

/// What the vocalization tracker does while the voice is below the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SilencePolicy {
    /// Keep the last duration and pitch; the session continues
    #[default]
    Hold,
    /// End the session once silent for longer than `silence_ms`
    EndAfter { silence_ms: u64 },
}

/// Balloon-ascent (vocalization) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocalizationConfig {
    /// Mean magnitude that must be exceeded to count as vocalizing
    pub volume_gate: f64,
    /// Lowest accepted pitch (Hz, inclusive)
    pub min_pitch_hz: f64,
    /// Highest accepted pitch (Hz, exclusive)
    pub max_pitch_hz: f64,
    /// Altitude units per second of vocalization
    pub altitude_per_second: f64,
    /// Duration that counts as 100% accuracy (seconds)
    pub goal_seconds: f64,
    /// Analysis window size; the spectrum has `fft_size / 2` bins
    pub fft_size: usize,
    pub silence: SilencePolicy,
}

impl Default for VocalizationConfig {
    fn default() -> Self {
        Self {
            volume_gate: 30.0,
            min_pitch_hz: 50.0,
            max_pitch_hz: 1000.0,
            altitude_per_second: 280.0,
            goal_seconds: 10.0,
            fft_size: 256,
            silence: SilencePolicy::Hold,
        }
    }
}

impl VocalizationConfig {
    /// Number of frequency bins produced by the configured window
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Whether a pitch estimate lies in the half-open acceptance band
    pub fn accepts_pitch(&self, pitch_hz: f64) -> bool {
        pitch_hz >= self.min_pitch_hz && pitch_hz < self.max_pitch_hz
    }
}

impl TherapyConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, TherapyError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, TherapyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings the detectors cannot run with
    pub fn validate(&self) -> Result<(), TherapyError> {
        let g = &self.gesture;
        if !(g.threshold.is_finite() && g.threshold >= 0.0) {
            return Err(TherapyError::InvalidConfig(format!(
                "gesture.threshold must be a non-negative number, got {}",
                g.threshold
            )));
        }
        if g.round_size == 0 {
            return Err(TherapyError::InvalidConfig(
                "gesture.round_size must be at least 1".to_string(),
            ));
        }
        if !(g.eat_delay_ms <= g.grow_delay_ms && g.grow_delay_ms <= g.celebration_ms) {
            return Err(TherapyError::InvalidConfig(
                "celebration delays must satisfy eat <= grow <= celebration".to_string(),
            ));
        }
        if g.max_scale < 1.0 {
            return Err(TherapyError::InvalidConfig(
                "gesture.max_scale must be at least 1.0".to_string(),
            ));
        }

        let v = &self.vocalization;
        if v.min_pitch_hz >= v.max_pitch_hz {
            return Err(TherapyError::InvalidConfig(format!(
                "pitch band [{}, {}) is empty",
                v.min_pitch_hz, v.max_pitch_hz
            )));
        }
        if v.goal_seconds <= 0.0 {
            return Err(TherapyError::InvalidConfig(
                "vocalization.goal_seconds must be positive".to_string(),
            ));
        }
        if v.fft_size < 2 || !v.fft_size.is_power_of_two() {
            return Err(TherapyError::InvalidConfig(format!(
                "vocalization.fft_size must be a power of two >= 2, got {}",
                v.fft_size
            )));
        }
        Ok(())
    }
}
