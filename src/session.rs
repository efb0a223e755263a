//! Exercise sessions
//!
//! A session owns everything one exercise attempt needs: the device lease, the
//! detector, the game, the clock and the metrics sink. Frames enter only through
//! `process_frame`; each call reads the clock once, so a session driven by a
//! [`ManualClock`](crate::clock::ManualClock) is fully deterministic.
//!
//! `stop()` detaches from frame processing before releasing the stream, then hands
//! the metric record to the sink. Calling it again is a no-op.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::TherapyConfig;
use crate::error::TherapyError;
use crate::gesture::{CelebrationEffect, GestureDetector, TreatGame};
use crate::media::{DeviceSlot, MediaSource, StreamLease};
use crate::metrics::{MetricsSink, SessionMetricsBuilder};
use crate::types::{GestureEvent, LandmarkFrame, SpectralFrame, TherapyMetricRecord};
use crate::vocalization::{BalloonGame, TrackerUpdate, VocalizationTracker};

/// Collaborators shared by a session
#[derive(Clone)]
pub struct SessionDeps {
    pub source: Arc<dyn MediaSource>,
    pub slot: DeviceSlot,
    pub sink: Arc<dyn MetricsSink>,
    pub clock: Arc<dyn Clock>,
}

/// What one landmark frame produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GestureFrameOutcome {
    pub event: Option<GestureEvent>,
    pub effects: Vec<CelebrationEffect>,
}

/// Oral motor (treat-collection) session
pub struct OralMotorSession<R: Rng = StdRng> {
    child_id: String,
    detector: GestureDetector,
    game: TreatGame<R>,
    deps: SessionDeps,
    lease: Option<StreamLease>,
    attached: bool,
}

impl OralMotorSession<StdRng> {
    pub fn with_entropy(config: &TherapyConfig, child_id: &str, deps: SessionDeps) -> Self {
        Self::new(config, child_id, deps, StdRng::from_entropy())
    }
}

impl<R: Rng> OralMotorSession<R> {
    pub fn new(config: &TherapyConfig, child_id: &str, deps: SessionDeps, rng: R) -> Self {
        Self {
            child_id: child_id.to_string(),
            detector: GestureDetector::new(&config.gesture),
            game: TreatGame::new(&config.gesture, rng),
            deps,
            lease: None,
            attached: false,
        }
    }

    pub fn game(&self) -> &TreatGame<R> {
        &self.game
    }

    pub fn is_running(&self) -> bool {
        self.attached
    }

    /// Acquire the camera and start a fresh round
    pub fn start(&mut self) -> Result<(), TherapyError> {
        self.begin(false)
    }

    /// Acquire the camera and continue the previous count
    pub fn resume(&mut self) -> Result<(), TherapyError> {
        self.begin(true)
    }

    fn begin(&mut self, resume: bool) -> Result<(), TherapyError> {
        if self.attached {
            return Err(TherapyError::InvalidState(
                "oral motor session is already running".to_string(),
            ));
        }

        let lease = self.deps.slot.acquire(self.deps.source.as_ref())?;
        self.detector.reset();
        if resume {
            self.game.resume()?;
        } else {
            self.game.start()?;
        }
        self.lease = Some(lease);
        self.attached = true;
        info!(child = %self.child_id, resume, "oral motor session started");
        Ok(())
    }

    /// Interpret one landmark frame
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> GestureFrameOutcome {
        if !self.attached {
            return GestureFrameOutcome::default();
        }

        let now = self.deps.clock.now_ms();
        let mut outcome = GestureFrameOutcome {
            event: None,
            effects: self.game.tick(now),
        };

        if self.game.accepts_gestures() {
            if let Some(mut event) = self.detector.process(frame, now) {
                outcome.effects.extend(self.game.on_gesture_event(&event));
                event.treats_collected = self.game.treats_collected();
                outcome.event = Some(event);
            }
        }
        outcome
    }

    /// Advance celebration timers on a tick without a frame
    pub fn tick(&mut self) -> Vec<CelebrationEffect> {
        if !self.attached {
            return Vec::new();
        }
        self.game.tick(self.deps.clock.now_ms())
    }

    /// User asked for another round during the celebration
    pub fn play_again(&mut self) -> Vec<CelebrationEffect> {
        if !self.attached {
            return Vec::new();
        }
        self.game.play_again()
    }

    /// Stop, release the camera and submit the metric record
    pub fn stop(&mut self) -> Option<TherapyMetricRecord> {
        if !self.attached {
            debug!("oral motor session already stopped");
            return None;
        }
        self.attached = false;
        if let Some(mut lease) = self.lease.take() {
            lease.release();
        }

        let outcome = self.game.stop()?;
        let record = SessionMetricsBuilder::oral_motor(&self.child_id, &outcome, Utc::now());
        self.deps.sink.submit(record.clone());
        info!(child = %self.child_id, accuracy = ?record.accuracy_percent, "oral motor session stopped");
        Some(record)
    }
}

/// What one spectral frame produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalloonFrameOutcome {
    pub update: Option<TrackerUpdate>,
    /// The duration goal was met on this frame
    pub goal_reached: bool,
    /// The session ended on this frame (silence limit)
    pub finished: Option<TherapyMetricRecord>,
}

/// Vocalization (balloon-ascent) session
pub struct VocalizationSession {
    child_id: String,
    tracker: VocalizationTracker,
    game: BalloonGame,
    deps: SessionDeps,
    lease: Option<StreamLease>,
    attached: bool,
}

impl VocalizationSession {
    pub fn new(config: &TherapyConfig, child_id: &str, deps: SessionDeps) -> Self {
        Self {
            child_id: child_id.to_string(),
            tracker: VocalizationTracker::new(&config.vocalization),
            game: BalloonGame::new(&config.vocalization),
            deps,
            lease: None,
            attached: false,
        }
    }

    pub fn tracker(&self) -> &VocalizationTracker {
        &self.tracker
    }

    pub fn game(&self) -> &BalloonGame {
        &self.game
    }

    pub fn is_running(&self) -> bool {
        self.attached
    }

    /// Acquire the microphone and start tracking
    pub fn start(&mut self) -> Result<(), TherapyError> {
        if self.attached {
            return Err(TherapyError::InvalidState(
                "vocalization session is already running".to_string(),
            ));
        }

        let lease = self.deps.slot.acquire(self.deps.source.as_ref())?;
        self.tracker.start(self.deps.clock.now_ms())?;
        self.game.reset();
        self.lease = Some(lease);
        self.attached = true;
        info!(child = %self.child_id, "vocalization session started");
        Ok(())
    }

    /// Interpret one spectral frame
    pub fn process_frame(&mut self, frame: &SpectralFrame) -> BalloonFrameOutcome {
        if !self.attached {
            return BalloonFrameOutcome::default();
        }

        let now = self.deps.clock.now_ms();
        let update = self.tracker.process(frame, now);
        let mut outcome = BalloonFrameOutcome {
            update,
            ..Default::default()
        };

        match update {
            Some(TrackerUpdate::Voiced(tick)) => {
                outcome.goal_reached = self.game.on_activity_tick(&tick);
            }
            Some(TrackerUpdate::SilenceTimeout { silent_ms }) => {
                info!(silent_ms, "ending vocalization session after prolonged silence");
                outcome.finished = self.stop();
            }
            Some(TrackerUpdate::Silent { .. }) | None => {}
        }
        outcome
    }

    /// Stop, release the microphone and submit the metric record
    pub fn stop(&mut self) -> Option<TherapyMetricRecord> {
        if !self.attached {
            debug!("vocalization session already stopped");
            return None;
        }
        self.attached = false;
        if let Some(mut lease) = self.lease.take() {
            lease.release();
        }

        let outcome = self.tracker.stop()?;
        let record = SessionMetricsBuilder::vocalization(&self.child_id, &outcome, Utc::now());
        self.deps.sink.submit(record.clone());
        info!(
            child = %self.child_id,
            duration = ?record.duration_seconds,
            accuracy = ?record.accuracy_percent,
            "vocalization session stopped"
        );
        Some(record)
    }
}
