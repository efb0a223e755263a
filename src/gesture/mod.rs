//! Oral motor exercise: mouth-opening gestures feeding the treat-collection game
//!
//! Pipeline: LandmarkFrame → NormalizedGeometry → GestureDetector → TreatGame

pub mod detector;
pub mod game;

pub use detector::GestureDetector;
pub use game::{CelebrationEffect, TreatGame, TreatOutcome, TreatPhase, TreatVariant};
