//! Status strip shared by every mode
//!
//! Everything here is derived from `SessionState`; nothing feeds back into
//! the state machine. The life-loss cue is cosmetic only.

use serde::{Deserialize, Serialize};

use crate::config::QuizConfig;
use crate::consts::{LIFE_LOSS_CUE_SECS, LOW_TIME_THRESHOLD};
use crate::settings::Settings;
use crate::sim::{SessionMachine, SessionState};

/// What the header shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusStrip {
    pub lives: u32,
    /// 1-based round number, never beyond `total`
    pub round: usize,
    pub total: usize,
    /// Share of the word list already behind the learner (0 - 100)
    pub percent: u8,
    /// Time bar fill (0.0 - 1.0)
    pub time_ratio: f32,
    pub time_left: u32,
    /// Time bar switches to the alert color
    pub low_time: bool,
    /// Untimed sessions hide the bar
    pub timed: bool,
    pub score: u64,
    pub stars: u8,
}

impl StatusStrip {
    pub fn from_state(state: &SessionState, config: &QuizConfig, total: usize, timed: bool) -> Self {
        let total = total.max(1);
        let percent = if state.is_over {
            100
        } else {
            (state.current_word_index * 100 / total).min(100) as u8
        };
        Self {
            lives: state.lives_remaining,
            round: (state.current_word_index + 1).min(total),
            total,
            percent,
            time_ratio: state.time_ratio(config),
            time_left: state.time_left_in_round,
            low_time: timed && !state.is_over && state.time_left_in_round < LOW_TIME_THRESHOLD,
            timed,
            score: state.score,
            stars: state.star_rating,
        }
    }

    pub fn from_session(machine: &SessionMachine) -> Self {
        let timed = machine.policy().timed && machine.config().quiz_mode_enabled;
        Self::from_state(machine.state(), machine.config(), machine.words().len(), timed)
    }
}

/// One-shot falling/fading heart animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifeLossCue {
    pub started_at_ms: u64,
    /// Lives shown before the loss (the heart that falls)
    pub from_lives: u32,
}

impl LifeLossCue {
    /// Animation progress (0.0 - 1.0), `None` once finished
    pub fn progress(&self, now_ms: u64) -> Option<f32> {
        let duration_ms = (LIFE_LOSS_CUE_SECS * 1000.0) as u64;
        let elapsed = now_ms.saturating_sub(self.started_at_ms);
        (elapsed < duration_ms).then(|| elapsed as f32 / duration_ms as f32)
    }
}

/// Watches successive snapshots and starts a cue whenever a life is lost
#[derive(Debug, Clone, Default)]
pub struct HudTracker {
    last_lives: Option<u32>,
    cue: Option<LifeLossCue>,
    disabled: bool,
}

impl HudTracker {
    pub fn new(animate: bool) -> Self {
        Self {
            disabled: !animate,
            ..Default::default()
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.effective_life_loss_cue())
    }

    /// Feed the latest snapshot. Returns a cue when one just started.
    pub fn observe(&mut self, state: &SessionState, now_ms: u64) -> Option<LifeLossCue> {
        let lives = state.lives_remaining;
        let previous = self.last_lives.replace(lives);
        match previous {
            Some(prev) if lives < prev && !self.disabled => {
                let cue = LifeLossCue {
                    started_at_ms: now_ms,
                    from_lives: prev,
                };
                self.cue = Some(cue);
                Some(cue)
            }
            // Restart refills lives; drop whatever was playing
            Some(prev) if lives > prev => {
                self.cue = None;
                None
            }
            _ => None,
        }
    }

    /// Cue still animating at `now_ms`
    pub fn active_cue(&mut self, now_ms: u64) -> Option<(LifeLossCue, f32)> {
        let cue = self.cue?;
        match cue.progress(now_ms) {
            Some(t) => Some((cue, t)),
            None => {
                self.cue = None;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(lives: u32, index: usize, time_left: u32) -> SessionState {
        let mut state = SessionState::initial(&QuizConfig::new(3, 20), 0);
        state.lives_remaining = lives;
        state.current_word_index = index;
        state.time_left_in_round = time_left;
        state
    }

    #[test]
    fn test_strip_values() {
        let config = QuizConfig::new(3, 20);
        let strip = StatusStrip::from_state(&state(2, 1, 10), &config, 4, true);
        assert_eq!(strip.lives, 2);
        assert_eq!(strip.round, 2);
        assert_eq!(strip.percent, 25);
        assert!((strip.time_ratio - 0.5).abs() < 1e-6);
        assert!(!strip.low_time);
    }

    #[test]
    fn test_low_time_alert() {
        let config = QuizConfig::new(3, 20);
        let low = StatusStrip::from_state(&state(3, 0, LOW_TIME_THRESHOLD - 1), &config, 4, true);
        assert!(low.low_time);
        let untimed = StatusStrip::from_state(&state(3, 0, 1), &config, 4, false);
        assert!(!untimed.low_time);
    }

    #[test]
    fn test_life_loss_cue_fires_once() {
        let mut hud = HudTracker::new(true);
        assert!(hud.observe(&state(3, 0, 20), 0).is_none());
        let cue = hud.observe(&state(2, 0, 20), 100).unwrap();
        assert_eq!(cue.from_lives, 3);
        assert!(hud.observe(&state(2, 0, 20), 200).is_none());

        assert!(hud.active_cue(300).is_some());
        assert!(hud.active_cue(100 + 10_000).is_none());
    }

    #[test]
    fn test_reduced_motion_skips_cue() {
        let settings = Settings {
            reduced_motion: true,
            ..Settings::default()
        };
        let mut hud = HudTracker::from_settings(&settings);
        hud.observe(&state(3, 0, 20), 0);
        assert!(hud.observe(&state(2, 0, 20), 100).is_none());
    }
}
