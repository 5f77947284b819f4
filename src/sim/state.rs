//! Session state and core value types
//!
//! `SessionState` is the snapshot handed to the presentation layer. It is only
//! mutated by the transition functions on `SessionMachine`.

use serde::{Deserialize, Serialize};

use super::policy::GameMode;
use crate::config::QuizConfig;
use crate::error::ConfigError;
use crate::words::{WordPair, validate_words};

/// Star rating for a given number of mistakes
///
/// 0-2 fails earn 3 stars, 3-4 earn 2, 5 or more earn 1.
#[inline]
pub fn star_rating_for(fail_count: u32) -> u8 {
    match fail_count {
        0..=2 => 3,
        3..=4 => 2,
        _ => 1,
    }
}

/// Mode-agnostic game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Index of the word being played (never beyond the list length)
    pub current_word_index: usize,
    pub lives_remaining: u32,
    /// Round countdown in ticks
    pub time_left_in_round: u32,
    /// Clock value (ms) when the current round started
    pub round_started_at_ms: u64,
    /// Total play time, filled in when the session ends
    pub total_elapsed_on_end_ms: u64,
    /// Terminal flag; only a restart leaves this state
    pub is_over: bool,
    /// 1..=3, derived from `fail_count`
    pub star_rating: u8,
    pub fail_count: u32,
    /// Feedback or a user pause is in progress; outcomes are ignored
    pub is_paused: bool,
    pub completed_count: u32,
    pub score: u64,
}

/// Build the initial state for a session.
///
/// Fails fast when the word list or config cannot produce a playable session.
pub fn start_session(
    words: &[WordPair],
    config: &QuizConfig,
    now_ms: u64,
) -> Result<SessionState, ConfigError> {
    validate_words(words)?;
    config.validate()?;
    Ok(SessionState::initial(config, now_ms))
}

impl SessionState {
    /// Fresh state for an already validated config
    pub(crate) fn initial(config: &QuizConfig, now_ms: u64) -> Self {
        Self {
            current_word_index: 0,
            lives_remaining: config.global_lives_limit,
            time_left_in_round: config.activity_time_limit,
            round_started_at_ms: now_ms,
            total_elapsed_on_end_ms: 0,
            is_over: false,
            star_rating: star_rating_for(0),
            fail_count: 0,
            is_paused: false,
            completed_count: 0,
            score: 0,
        }
    }

    /// Round time left as a fraction of the round budget (0.0 - 1.0)
    pub fn time_ratio(&self, config: &QuizConfig) -> f32 {
        if config.activity_time_limit == 0 {
            return 1.0;
        }
        (self.time_left_in_round as f32 / config.activity_time_limit as f32).clamp(0.0, 1.0)
    }
}

/// Notifications queued for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    RoundStarted { index: usize },
    AnswerCorrect { index: usize, points: u64 },
    AnswerIncorrect { index: usize },
    LifeLost { remaining: u32 },
    /// Correct answer shown after the retry budget ran out
    AnswerRevealed { index: usize },
    TimedOut { index: usize },
    PowerUpArmed { index: usize },
    PowerUpCollected { bonus: u32 },
    GameOver { won: bool },
}

/// Result of a finished session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub game_id: String,
    pub mode: GameMode,
    pub score: u64,
    pub stars: u8,
    pub completed: u32,
    pub total_words: usize,
    pub fail_count: u32,
    pub elapsed_ms: u64,
    pub won: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_star_table() {
        assert_eq!(star_rating_for(0), 3);
        assert_eq!(star_rating_for(2), 3);
        assert_eq!(star_rating_for(3), 2);
        assert_eq!(star_rating_for(4), 2);
        assert_eq!(star_rating_for(5), 1);
        assert_eq!(star_rating_for(40), 1);
    }

    #[test]
    fn test_start_session_initial_values() {
        let words = vec![WordPair::new("dog", "perro")];
        let config = QuizConfig::new(4, 15);
        let state = start_session(&words, &config, 500).unwrap();
        assert_eq!(state.lives_remaining, 4);
        assert_eq!(state.time_left_in_round, 15);
        assert_eq!(state.round_started_at_ms, 500);
        assert_eq!(state.star_rating, 3);
        assert!(!state.is_over && !state.is_paused);
    }

    #[test]
    fn test_start_session_fails_fast() {
        let config = QuizConfig::default();
        assert_eq!(
            start_session(&[], &config, 0),
            Err(ConfigError::EmptyWordList)
        );
        let words = vec![WordPair::new("dog", "perro")];
        assert_eq!(
            start_session(&words, &QuizConfig::new(0, 10), 0),
            Err(ConfigError::NonPositiveLives)
        );
    }

    proptest! {
        #[test]
        fn star_rating_is_monotone_and_bounded(fails in 0u32..1000) {
            let stars = star_rating_for(fails);
            prop_assert!((1..=3).contains(&stars));
            prop_assert!(star_rating_for(fails + 1) <= stars);
        }
    }
}
