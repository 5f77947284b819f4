//! Combo counter and power-up rounds
//!
//! Consecutive matches build a combo multiplier. Every few combo steps a
//! future word is secretly marked as a power-up round; matching it grants
//! extra round time instead of points.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::POWER_UP_COMBO_STEP;

/// What a match earned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReward {
    /// Normal scoring with the current combo multiplier
    Points { combo: u32 },
    /// Power-up word matched; time bonus instead of points
    PowerUp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboTracker {
    combo: u32,
    power_up_index: Option<usize>,
}

impl ComboTracker {
    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn power_up_index(&self) -> Option<usize> {
        self.power_up_index
    }

    /// Register a match on `word_index` and decide the reward.
    ///
    /// Returns the reward and, if one was just armed, the new power-up index.
    pub fn on_match<R: Rng>(
        &mut self,
        word_index: usize,
        word_count: usize,
        rng: &mut R,
    ) -> (MatchReward, Option<usize>) {
        self.combo += 1;

        let reward = if self.power_up_index == Some(word_index) {
            self.power_up_index = None;
            MatchReward::PowerUp
        } else {
            MatchReward::Points { combo: self.combo }
        };

        let mut armed = None;
        if self.combo % POWER_UP_COMBO_STEP == 0 && self.power_up_index.is_none() {
            let first_future = word_index + 1;
            if first_future < word_count {
                let index = rng.random_range(first_future..word_count);
                self.power_up_index = Some(index);
                armed = Some(index);
            }
        }

        (reward, armed)
    }

    /// Any miss breaks the chain
    pub fn reset_combo(&mut self) {
        self.combo = 0;
    }

    /// Drop the power-up marker if the session moved past it without a match
    pub fn expire_before(&mut self, word_index: usize) {
        if self.power_up_index.is_some_and(|i| i < word_index) {
            self.power_up_index = None;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
