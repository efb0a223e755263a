//! Treat-collection game state machine
//!
//! ```text
//!            start/resume            round_size treats
//!   Idle ─────────────────► Recording ─────────────────► Celebrating
//!    ▲                         ▲                              │
//!    │ stop                    └── +celebration_ms / play_again
//!    └──────────── (from Recording or Celebrating)
//! ```
//!
//! Entering `Celebrating` picks a treat variant and schedules a single ordered
//! timeline relative to the entry time: the companion starts eating, then grows,
//! then the round ends and the count resets to zero.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::GestureConfig;
use crate::error::TherapyError;
use crate::types::GestureEvent;

/// Phase of the treat game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatPhase {
    Idle,
    Recording,
    Celebrating,
}

/// Treat shown during a celebration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreatVariant {
    Bone,
    Biscuit,
    Cookie,
    Carrot,
}

impl TreatVariant {
    pub const ALL: [TreatVariant; 4] = [
        TreatVariant::Bone,
        TreatVariant::Biscuit,
        TreatVariant::Cookie,
        TreatVariant::Carrot,
    ];

    /// Uniform choice over [`TreatVariant::ALL`]
    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Observable side effects of the celebration timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum CelebrationEffect {
    ShowTreat { variant: TreatVariant },
    StartEating,
    Grow { scale: f64 },
    RoundComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Eat,
    Grow,
    Finish,
}

#[derive(Debug, Clone)]
struct Celebration {
    variant: TreatVariant,
    /// Absolute due times, in timeline order
    timeline: [(u64, Step); 3],
    next: usize,
    eating: bool,
}

/// State at the moment the game was stopped
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreatOutcome {
    pub treats_collected: u32,
    pub round_size: u32,
    pub rounds_completed: u32,
}

/// Treat-collection game driven by gesture events and clock ticks
#[derive(Debug)]
pub struct TreatGame<R: Rng = StdRng> {
    config: GestureConfig,
    phase: TreatPhase,
    treats_collected: u32,
    rounds_completed: u32,
    companion_scale: f64,
    celebration: Option<Celebration>,
    rng: R,
}

impl TreatGame<StdRng> {
    /// Game with an entropy-seeded random source
    pub fn from_entropy(config: &GestureConfig) -> Self {
        Self::new(config, StdRng::from_entropy())
    }
}

impl<R: Rng> TreatGame<R> {
    pub fn new(config: &GestureConfig, rng: R) -> Self {
        Self {
            config: config.clone(),
            phase: TreatPhase::Idle,
            treats_collected: 0,
            rounds_completed: 0,
            companion_scale: 1.0,
            celebration: None,
            rng,
        }
    }

    pub fn phase(&self) -> TreatPhase {
        self.phase
    }

    pub fn treats_collected(&self) -> u32 {
        self.treats_collected
    }

    pub fn rounds_completed(&self) -> u32 {
        self.rounds_completed
    }

    pub fn companion_scale(&self) -> f64 {
        self.companion_scale
    }

    /// Treat on display, while celebrating
    pub fn current_treat(&self) -> Option<TreatVariant> {
        self.celebration.as_ref().map(|c| c.variant)
    }

    pub fn is_eating(&self) -> bool {
        self.celebration.as_ref().is_some_and(|c| c.eating)
    }

    /// Gesture frames are only interpreted while recording
    pub fn accepts_gestures(&self) -> bool {
        self.phase == TreatPhase::Recording
    }

    /// Start a fresh round: Idle → Recording with zero treats
    pub fn start(&mut self) -> Result<(), TherapyError> {
        self.ensure_idle()?;
        self.treats_collected = 0;
        self.phase = TreatPhase::Recording;
        info!("treat game started");
        Ok(())
    }

    /// Continue the previous count: Idle → Recording
    ///
    /// A count left at a full round (stopped mid-celebration) starts over.
    pub fn resume(&mut self) -> Result<(), TherapyError> {
        self.ensure_idle()?;
        if self.treats_collected >= self.config.round_size {
            self.treats_collected = 0;
        }
        self.phase = TreatPhase::Recording;
        info!(treats = self.treats_collected, "treat game resumed");
        Ok(())
    }

    /// Count one gesture; may enter the celebration
    pub fn on_gesture_event(&mut self, event: &GestureEvent) -> Vec<CelebrationEffect> {
        if self.phase != TreatPhase::Recording {
            return Vec::new();
        }

        self.treats_collected = (self.treats_collected + 1).min(self.config.round_size);
        debug!(treats = self.treats_collected, "treat collected");

        if self.treats_collected >= self.config.round_size {
            vec![self.enter_celebration(event.at_ms)]
        } else {
            Vec::new()
        }
    }

    /// Apply every celebration step that is due at `now_ms`, in order
    pub fn tick(&mut self, now_ms: u64) -> Vec<CelebrationEffect> {
        let mut effects = Vec::new();
        while let Some(step) = self.next_due_step(now_ms) {
            effects.push(self.apply(step));
        }
        effects
    }

    /// End the celebration early
    ///
    /// The growth reward is still granted when it had not fired yet; the eating
    /// cue is dropped.
    pub fn play_again(&mut self) -> Vec<CelebrationEffect> {
        let mut effects = Vec::new();
        let pending: Vec<Step> = match &self.celebration {
            Some(c) => c.timeline[c.next..].iter().map(|(_, step)| *step).collect(),
            None => return effects,
        };

        for step in pending {
            if step != Step::Eat {
                effects.push(self.apply(step));
            }
        }
        effects
    }

    /// Stop the game from any active phase
    pub fn stop(&mut self) -> Option<TreatOutcome> {
        if self.phase == TreatPhase::Idle {
            return None;
        }

        let outcome = TreatOutcome {
            treats_collected: self.treats_collected,
            round_size: self.config.round_size,
            rounds_completed: self.rounds_completed,
        };
        self.phase = TreatPhase::Idle;
        self.celebration = None;
        info!(treats = outcome.treats_collected, rounds = outcome.rounds_completed, "treat game stopped");
        Some(outcome)
    }

    fn ensure_idle(&self) -> Result<(), TherapyError> {
        if self.phase != TreatPhase::Idle {
            return Err(TherapyError::InvalidState(format!(
                "treat game is already {:?}",
                self.phase
            )));
        }
        Ok(())
    }

    fn enter_celebration(&mut self, at_ms: u64) -> CelebrationEffect {
        let variant = TreatVariant::choose(&mut self.rng);
        // Saturate: a clock near u64::MAX pins the steps to the end of time
        let timeline = [
            (at_ms.saturating_add(self.config.eat_delay_ms), Step::Eat),
            (at_ms.saturating_add(self.config.grow_delay_ms), Step::Grow),
            (at_ms.saturating_add(self.config.celebration_ms), Step::Finish),
        ];
        self.celebration = Some(Celebration {
            variant,
            timeline,
            next: 0,
            eating: false,
        });
        self.phase = TreatPhase::Celebrating;
        info!(?variant, at_ms, "round complete, celebrating");
        CelebrationEffect::ShowTreat { variant }
    }

    fn next_due_step(&self, now_ms: u64) -> Option<Step> {
        let celebration = self.celebration.as_ref()?;
        let (due, step) = *celebration.timeline.get(celebration.next)?;
        (due <= now_ms).then_some(step)
    }

    fn apply(&mut self, step: Step) -> CelebrationEffect {
        if let Some(c) = self.celebration.as_mut() {
            c.next += 1;
        }

        match step {
            Step::Eat => {
                if let Some(c) = self.celebration.as_mut() {
                    c.eating = true;
                }
                CelebrationEffect::StartEating
            }
            Step::Grow => {
                self.companion_scale =
                    (self.companion_scale + self.config.growth_step).min(self.config.max_scale);
                CelebrationEffect::Grow {
                    scale: self.companion_scale,
                }
            }
            Step::Finish => {
                self.celebration = None;
                self.treats_collected = 0;
                self.rounds_completed += 1;
                self.phase = TreatPhase::Recording;
                debug!(rounds = self.rounds_completed, "celebration finished");
                CelebrationEffect::RoundComplete
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn game() -> TreatGame<StdRng> {
        TreatGame::new(&GestureConfig::default(), StdRng::seed_from_u64(7))
    }

    fn event(at_ms: u64) -> GestureEvent {
        GestureEvent {
            at_ms,
            ratio: 0.2,
            treats_collected: 0,
        }
    }

    /// Feed `n` gestures one second apart starting at `start_ms`
    fn collect(game: &mut TreatGame<StdRng>, n: u32, start_ms: u64) -> Vec<CelebrationEffect> {
        let mut effects = Vec::new();
        for i in 0..n {
            effects.extend(game.on_gesture_event(&event(start_ms + u64::from(i) * 1000)));
        }
        effects
    }

    #[test]
    fn test_start_resets_count() {
        let mut game = game();
        game.start().unwrap();
        collect(&mut game, 3, 0);
        game.stop();

        game.start().unwrap();
        assert_eq!(game.treats_collected(), 0);
        assert_eq!(game.phase(), TreatPhase::Recording);
    }

    #[test]
    fn test_resume_keeps_count() {
        let mut game = game();
        game.start().unwrap();
        collect(&mut game, 4, 0);
        game.stop();

        game.resume().unwrap();
        assert_eq!(game.treats_collected(), 4);
    }

    #[test]
    fn test_double_start_is_rejected() {
        let mut game = game();
        game.start().unwrap();
        assert!(matches!(game.start(), Err(TherapyError::InvalidState(_))));
    }

    #[test]
    fn test_events_ignored_while_idle() {
        let mut game = game();
        assert!(game.on_gesture_event(&event(0)).is_empty());
        assert_eq!(game.treats_collected(), 0);
    }

    #[test]
    fn test_full_round_enters_celebration() {
        let mut game = game();
        game.start().unwrap();

        let effects = collect(&mut game, 10, 0);
        assert_eq!(game.phase(), TreatPhase::Celebrating);
        assert_eq!(game.treats_collected(), 10);
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], CelebrationEffect::ShowTreat { .. }));
        assert!(game.current_treat().is_some());
        assert!(!game.accepts_gestures());
    }

    #[test]
    fn test_count_never_exceeds_round_size() {
        let mut game = game();
        game.start().unwrap();
        collect(&mut game, 10, 0);

        // Events arriving mid-celebration are not counted
        collect(&mut game, 25, 10_000);
        assert_eq!(game.treats_collected(), 10);
    }

    #[test]
    fn test_celebration_timeline_order() {
        let mut game = game();
        game.start().unwrap();
        collect(&mut game, 10, 0);
        // Celebration entered at the tenth event, t = 9000
        let entered = 9000;

        assert!(game.tick(entered + 1499).is_empty());
        assert_eq!(game.tick(entered + 1500), vec![CelebrationEffect::StartEating]);
        assert!(game.is_eating());

        let grow = game.tick(entered + 2200);
        assert_eq!(grow.len(), 1);
        assert!(matches!(grow[0], CelebrationEffect::Grow { scale } if (scale - 1.15).abs() < 1e-9));

        assert!(game.tick(entered + 2999).is_empty());
        assert_eq!(game.tick(entered + 3000), vec![CelebrationEffect::RoundComplete]);
        assert_eq!(game.phase(), TreatPhase::Recording);
        assert_eq!(game.treats_collected(), 0);
        assert_eq!(game.rounds_completed(), 1);
        assert_eq!(game.current_treat(), None);
    }

    #[test]
    fn test_late_tick_applies_all_due_steps_once() {
        let mut game = game();
        game.start().unwrap();
        collect(&mut game, 10, 0);

        let effects = game.tick(60_000);
        assert_eq!(effects.len(), 3);
        assert_eq!(effects[0], CelebrationEffect::StartEating);
        assert_eq!(effects[2], CelebrationEffect::RoundComplete);
        assert!(game.tick(70_000).is_empty());
    }

    #[test]
    fn test_play_again_ends_round_early_and_keeps_growth() {
        let mut game = game();
        game.start().unwrap();
        collect(&mut game, 10, 0);

        let effects = game.play_again();
        assert_eq!(effects.len(), 2);
        assert!(matches!(effects[0], CelebrationEffect::Grow { .. }));
        assert_eq!(effects[1], CelebrationEffect::RoundComplete);
        assert_eq!(game.phase(), TreatPhase::Recording);
        assert_eq!(game.treats_collected(), 0);

        // The cancelled timeline never fires later
        assert!(game.tick(100_000).is_empty());
        assert!((game.companion_scale() - 1.15).abs() < 1e-9);
    }

    #[test]
    fn test_celebration_near_clock_limit_does_not_overflow() {
        let mut game = game();
        game.start().unwrap();
        let start = u64::MAX - 9_500;
        collect(&mut game, 10, start);
        assert_eq!(game.phase(), TreatPhase::Celebrating);

        // Entered at u64::MAX - 500: every delay saturates to u64::MAX
        assert!(game.tick(u64::MAX - 1).is_empty());
        let effects = game.tick(u64::MAX);
        assert_eq!(effects.len(), 3);
        assert_eq!(effects[0], CelebrationEffect::StartEating);
        assert!(matches!(effects[1], CelebrationEffect::Grow { .. }));
        assert_eq!(effects[2], CelebrationEffect::RoundComplete);
        assert_eq!(game.rounds_completed(), 1);
    }

    #[test]
    fn test_huge_celebration_window_still_ends_on_play_again() {
        let config = GestureConfig {
            eat_delay_ms: u64::MAX,
            grow_delay_ms: u64::MAX,
            celebration_ms: u64::MAX,
            ..GestureConfig::default()
        };
        let mut game = TreatGame::new(&config, StdRng::seed_from_u64(7));
        game.start().unwrap();
        collect(&mut game, 10, 5_000);

        assert!(game.tick(1_000_000).is_empty());
        assert_eq!(game.phase(), TreatPhase::Celebrating);

        let effects = game.play_again();
        assert_eq!(effects.last(), Some(&CelebrationEffect::RoundComplete));
        assert_eq!(game.phase(), TreatPhase::Recording);
    }

    #[test]
    fn test_play_again_outside_celebration_is_noop() {
        let mut game = game();
        game.start().unwrap();
        assert!(game.play_again().is_empty());
    }

    #[test]
    fn test_companion_scale_is_capped() {
        let mut game = game();
        game.start().unwrap();
        for round in 0..5u64 {
            collect(&mut game, 10, round * 100_000);
            game.tick(round * 100_000 + 50_000);
        }
        assert_eq!(game.rounds_completed(), 5);
        assert!((game.companion_scale() - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_stop_reports_current_count() {
        let mut game = game();
        game.start().unwrap();
        collect(&mut game, 7, 0);

        let outcome = game.stop().unwrap();
        assert_eq!(
            outcome,
            TreatOutcome {
                treats_collected: 7,
                round_size: 10,
                rounds_completed: 0
            }
        );
        assert_eq!(game.phase(), TreatPhase::Idle);
        assert!(game.stop().is_none());
    }

    #[test]
    fn test_seeded_variant_choice_is_deterministic() {
        let pick = |seed| {
            let mut game = TreatGame::new(&GestureConfig::default(), StdRng::seed_from_u64(seed));
            game.start().unwrap();
            collect(&mut game, 10, 0);
            game.current_treat()
        };
        assert_eq!(pick(42), pick(42));

        let mut rng = StdRng::seed_from_u64(1);
        let seen: std::collections::HashSet<_> =
            (0..200).map(|_| TreatVariant::choose(&mut rng)).collect();
        assert_eq!(seen.len(), TreatVariant::ALL.len());
    }
}
