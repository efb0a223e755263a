//! Spectral feature derivation
//!
//! This module derives a volume and a pitch estimate from one byte-magnitude
//! spectrum:
//! - Average magnitude across all bins
//! - Dominant-bin frequency
//!
//! The pitch is the center of the loudest bin, not a fundamental-frequency
//! extraction. Harmonics and bin width (sample rate / window size) limit it to a
//! relative "higher/lower" signal; do not read it as an absolute pitch.

use crate::types::{SpectralFrame, VocalizationSample};

/// Feature deriver for spectral frames
pub struct SpectralFeatures;

impl SpectralFeatures {
    /// Derive volume and pitch, or `None` for an empty spectrum
    pub fn derive(frame: &SpectralFrame) -> Option<VocalizationSample> {
        let average_volume = average_magnitude(&frame.magnitudes)?;
        let dominant = dominant_index(&frame.magnitudes)?;
        let estimated_pitch_hz =
            bin_frequency(dominant, frame.magnitudes.len(), frame.sample_rate_hz);

        Some(VocalizationSample {
            average_volume,
            estimated_pitch_hz,
        })
    }
}

/// Mean of all bin magnitudes
fn average_magnitude(magnitudes: &[u8]) -> Option<f64> {
    if magnitudes.is_empty() {
        return None;
    }
    let sum: u64 = magnitudes.iter().map(|&m| u64::from(m)).sum();
    Some(sum as f64 / magnitudes.len() as f64)
}

/// Index of the loudest bin; the first index wins ties
fn dominant_index(magnitudes: &[u8]) -> Option<usize> {
    let mut best: Option<(usize, u8)> = None;
    for (i, &m) in magnitudes.iter().enumerate() {
        match best {
            Some((_, max)) if m <= max => {}
            _ => best = Some((i, m)),
        }
    }
    best.map(|(i, _)| i)
}

/// Frequency of a bin: (index / bins) * nyquist
fn bin_frequency(index: usize, bins: usize, sample_rate_hz: f64) -> f64 {
    if bins == 0 || !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return 0.0;
    }
    let nyquist = sample_rate_hz / 2.0;
    (index as f64 / bins as f64) * nyquist
}
