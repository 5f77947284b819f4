//! Flip-card review
//!
//! Untimed and never penalized. Flipping speaks the visible side; moving on
//! counts the card as reviewed.

use super::{GameController, RoundSync};
use crate::error::ConfigError;
use crate::sim::{SessionMachine, SessionSetup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSide {
    Front,
    Back,
}

#[derive(Debug)]
pub struct CardsController {
    machine: SessionMachine,
    side: CardSide,
    sync: RoundSync,
}

impl CardsController {
    pub fn new(setup: SessionSetup, now_ms: u64) -> Result<Self, ConfigError> {
        let mut controller = Self {
            machine: SessionMachine::start(setup, now_ms)?,
            side: CardSide::Front,
            sync: RoundSync::default(),
        };
        controller.on_round_started();
        Ok(controller)
    }

    pub fn side(&self) -> CardSide {
        self.side
    }

    /// Text on the visible side
    pub fn visible_text(&self) -> &str {
        match (self.machine.current_pair(), self.side) {
            (Some(pair), CardSide::Front) => &pair.first,
            (Some(pair), CardSide::Back) => &pair.second,
            (None, _) => "",
        }
    }

    pub fn on_card_flip(&mut self, now_ms: u64) {
        if !self.machine.is_accepting_input() {
            return;
        }
        self.side = match self.side {
            CardSide::Front => CardSide::Back,
            CardSide::Back => CardSide::Front,
        };
        let Some(pair) = self.machine.current_pair() else {
            return;
        };
        let (text, audio_ref) = match self.side {
            CardSide::Front => (pair.first.clone(), pair.first_audio_ref.clone()),
            CardSide::Back => (pair.second.clone(), pair.second_audio_ref.clone()),
        };
        self.machine.speak_word(&text, audio_ref, now_ms);
    }

    /// Mark the card reviewed and move on
    pub fn on_card_next(&mut self, now_ms: u64) -> bool {
        self.machine.record_correct_answer(now_ms)
    }
}

impl GameController for CardsController {
    fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    fn machine_mut(&mut self) -> &mut SessionMachine {
        &mut self.machine
    }

    fn update(&mut self, now_ms: u64, _dt: f32) {
        self.machine.update(now_ms);
        if self.sync.changed(&self.machine) {
            self.on_round_started();
        }
    }

    fn on_round_started(&mut self) {
        self.sync.changed(&self.machine);
        self.side = CardSide::Front;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::test_support::{pairs, run_until, setup};
    use crate::sim::GameMode;

    #[test]
    fn test_flip_shows_other_side() {
        let mut cards = CardsController::new(setup(GameMode::Cards, pairs(2), 3), 0).unwrap();
        assert_eq!(cards.visible_text(), "w0");
        cards.on_card_flip(10);
        assert_eq!(cards.side(), CardSide::Back);
        assert_eq!(cards.visible_text(), "t0");
    }

    #[test]
    fn test_review_all_cards_without_timer() {
        let mut cards = CardsController::new(setup(GameMode::Cards, pairs(2), 3), 0).unwrap();
        let mut now = 0;
        for _ in 0..2 {
            cards.on_card_flip(now);
            assert!(cards.on_card_next(now));
            run_until(&mut cards, &mut now, |c| c.machine().is_accepting_input() || c.snapshot().is_over);
            if !cards.snapshot().is_over {
                assert_eq!(cards.side(), CardSide::Front);
            }
        }
        run_until(&mut cards, &mut now, |c| c.snapshot().is_over);

        let state = cards.snapshot();
        assert!(state.is_over);
        assert_eq!(state.completed_count, 2);
        assert_eq!(state.lives_remaining, 3);
        assert_eq!(state.time_left_in_round, 20);
    }
}
