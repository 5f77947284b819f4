//! Per-mode controllers
//!
//! A controller owns one `SessionMachine` plus whatever round-scoped entities
//! its mode needs (options, targets, bubbles), and turns presentation input
//! into transitions. Round entities are rebuilt whenever the machine's round
//! serial changes, so a restart or an advance never leaves stale ones behind.

pub mod bubble;
pub mod cards;
pub mod quiz;
pub mod target;
pub mod typed;

pub use bubble::BubbleController;
pub use cards::CardsController;
pub use quiz::QuizController;
pub use target::TargetController;
pub use typed::TypedController;

use crate::hud::StatusStrip;
use crate::sim::{GameEvent, MistakeOutcome, OutcomeListener, SessionMachine, SessionState, Target};

/// Result of a direct answer (option pick, typed submit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Correct,
    Incorrect(MistakeOutcome),
    /// Session paused, over or exited
    Ignored,
}

/// Common surface the presentation layer drives
pub trait GameController {
    fn machine(&self) -> &SessionMachine;
    fn machine_mut(&mut self) -> &mut SessionMachine;

    /// Frame update: physics (if any), pending steps, timer, round sync
    fn update(&mut self, now_ms: u64, dt: f32);

    /// Rebuild round-scoped entities for the current word
    fn on_round_started(&mut self);

    fn restart(&mut self, now_ms: u64) {
        self.machine_mut().restart(now_ms);
        self.on_round_started();
    }

    fn exit(&mut self) {
        self.machine_mut().exit();
    }

    fn snapshot(&self) -> &SessionState {
        self.machine().state()
    }

    fn status(&self) -> StatusStrip {
        StatusStrip::from_session(self.machine())
    }

    fn drain_events(&mut self) -> Vec<GameEvent> {
        self.machine_mut().drain_events()
    }

    /// Current prompt (the `first` side of the pair)
    fn prompt(&self) -> &str {
        self.machine().current_pair().map(|p| p.first.as_str()).unwrap_or("")
    }
}

/// Tracks the round serial a controller last built entities for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RoundSync(u64);

impl RoundSync {
    /// True (once) when the machine moved to a new round
    pub(crate) fn changed(&mut self, machine: &SessionMachine) -> bool {
        let serial = machine.round_serial();
        if serial == self.0 {
            return false;
        }
        self.0 = serial;
        true
    }
}

/// Feeds physics outcomes into the state machine
pub(crate) struct SessionListener<'a> {
    machine: &'a mut SessionMachine,
    now_ms: u64,
}

impl<'a> SessionListener<'a> {
    pub(crate) fn new(machine: &'a mut SessionMachine, now_ms: u64) -> Self {
        Self { machine, now_ms }
    }
}

impl OutcomeListener for SessionListener<'_> {
    fn on_hit(&mut self, target: &Target) {
        if target.is_correct {
            self.machine.record_correct_answer(self.now_ms);
        } else {
            self.machine.record_incorrect_answer(self.now_ms);
        }
    }

    fn on_match(&mut self, count: u32) {
        self.machine.record_match(count, self.now_ms);
    }

    fn on_miss(&mut self) {
        self.machine.record_miss();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::QuizConfig;
    use crate::sim::{GameMode, SessionSetup};
    use crate::words::WordPair;

    pub fn pairs(n: usize) -> Vec<WordPair> {
        (0..n)
            .map(|i| WordPair::new(format!("w{}", i), format!("t{}", i)))
            .collect()
    }

    pub fn setup(mode: GameMode, words: Vec<WordPair>, lives: u32) -> SessionSetup {
        SessionSetup::new(words, QuizConfig::new(lives, 20), mode).with_seed(7)
    }

    /// Drive a controller's update in 16ms frames until `done` or a frame budget runs out
    pub fn run_until<C: super::GameController>(
        controller: &mut C,
        now: &mut u64,
        mut done: impl FnMut(&C) -> bool,
    ) {
        for _ in 0..2_000 {
            if done(controller) {
                return;
            }
            *now += 16;
            controller.update(*now, 0.016);
        }
    }
}
