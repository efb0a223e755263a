//! Mouth-opening gesture detection
//!
//! Turns the continuous opening ratio into discrete events: a frame fires only
//! when the ratio exceeds the threshold and the cooldown since the previous event
//! has elapsed, so one sustained wide-open pose yields one event per cooldown.

use tracing::{debug, trace};

use crate::config::GestureConfig;
use crate::geometry::NormalizedGeometry;
use crate::types::{GestureEvent, LandmarkFrame, MouthOpeningSample};

/// Debounced threshold detector over landmark frames
///
/// The last-event timestamp belongs to this detector, so two sessions never share
/// a cooldown.
#[derive(Debug, Clone)]
pub struct GestureDetector {
    threshold: f64,
    cooldown_ms: u64,
    last_event_ms: Option<u64>,
}

impl GestureDetector {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            threshold: config.threshold,
            cooldown_ms: config.cooldown_ms,
            last_event_ms: None,
        }
    }

    /// Forget the previous event so the next qualifying frame fires immediately
    pub fn reset(&mut self) {
        self.last_event_ms = None;
    }

    pub fn last_event_ms(&self) -> Option<u64> {
        self.last_event_ms
    }

    /// Process one landmark frame
    ///
    /// Frames missing a required landmark are skipped without error.
    pub fn process(&mut self, frame: &LandmarkFrame, now_ms: u64) -> Option<GestureEvent> {
        match NormalizedGeometry::mouth_opening(frame) {
            Some(sample) => self.evaluate(sample, now_ms),
            None => {
                trace!(points = frame.points.len(), "skipping frame without usable landmarks");
                None
            }
        }
    }

    /// Apply threshold and cooldown to an already-derived sample
    pub fn evaluate(&mut self, sample: MouthOpeningSample, now_ms: u64) -> Option<GestureEvent> {
        if sample.ratio <= self.threshold {
            return None;
        }

        if let Some(last) = self.last_event_ms {
            if now_ms.saturating_sub(last) < self.cooldown_ms {
                trace!(ratio = sample.ratio, since_last_ms = now_ms.saturating_sub(last), "gesture in cooldown");
                return None;
            }
        }

        self.last_event_ms = Some(now_ms);
        debug!(ratio = sample.ratio, at_ms = now_ms, "gesture event");
        Some(GestureEvent {
            at_ms: now_ms,
            ratio: sample.ratio,
            treats_collected: 0,
        })
    }
}
