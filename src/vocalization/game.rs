//! Balloon-ascent game
//!
//! Presentation state derived from tracker ticks. Nothing here is persisted; the
//! session builds the metric record from the tracker outcome.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::VocalizationConfig;
use crate::types::ActivityTick;

/// Snapshot of what the balloon screen shows
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BalloonView {
    pub altitude: u64,
    /// Progress toward the duration goal (0-100)
    pub progress_percent: f64,
    /// Last accepted pitch (Hz)
    pub pitch_hz: Option<f64>,
    pub goal_reached: bool,
}

/// Balloon game driven by voiced activity ticks
#[derive(Debug, Clone)]
pub struct BalloonGame {
    goal_seconds: f64,
    view: BalloonView,
}

impl BalloonGame {
    pub fn new(config: &VocalizationConfig) -> Self {
        Self {
            goal_seconds: config.goal_seconds,
            view: BalloonView::default(),
        }
    }

    pub fn view(&self) -> BalloonView {
        self.view
    }

    pub fn reset(&mut self) {
        self.view = BalloonView::default();
    }

    /// Update from one voiced tick; returns `true` the first time the goal is met
    pub fn on_activity_tick(&mut self, tick: &ActivityTick) -> bool {
        self.view.altitude = tick.altitude;
        self.view.progress_percent = progress_percent(tick.elapsed_active_seconds, self.goal_seconds);
        if tick.pitch_accepted {
            self.view.pitch_hz = Some(tick.estimated_pitch_hz);
        }

        let just_reached = !self.view.goal_reached && self.view.progress_percent >= 100.0;
        if just_reached {
            self.view.goal_reached = true;
            info!(altitude = self.view.altitude, "balloon reached the goal");
        }
        just_reached
    }
}

/// Progress toward the goal, clamped to 0-100
pub fn progress_percent(elapsed_seconds: f64, goal_seconds: f64) -> f64 {
    if goal_seconds <= 0.0 {
        return 100.0;
    }
    ((elapsed_seconds / goal_seconds) * 100.0).clamp(0.0, 100.0)
}
