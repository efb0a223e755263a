//! Vocalization exercise: sustained voice feeding the balloon-ascent game
//!
//! Pipeline: SpectralFrame → SpectralFeatures → VocalizationTracker → BalloonGame

pub mod game;
pub mod tracker;

pub use game::{BalloonGame, BalloonView};
pub use tracker::{TrackerUpdate, VocalizationOutcome, VocalizationTracker};
