//! Per-mode rules layered over the shared state machine
//!
//! Every mode shares lives, timer and scoring mechanics; what differs is how
//! a mistake or a timeout is treated and how points are counted.

use serde::{Deserialize, Serialize};

use crate::consts::{COMBO_BASE_POINTS, POINTS_PER_ANSWER};

/// Game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Multiple-choice quiz
    Quiz,
    /// Typed-answer drill
    Typed,
    /// Flip-card review
    Cards,
    /// Projectile target shooting
    Target,
    /// Physics bubble matching
    Bubble,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Quiz => "quiz",
            GameMode::Typed => "typed",
            GameMode::Cards => "cards",
            GameMode::Target => "target",
            GameMode::Bubble => "bubble",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "quiz" | "choice" => Some(GameMode::Quiz),
            "typed" | "type" => Some(GameMode::Typed),
            "cards" | "flip" => Some(GameMode::Cards),
            "target" | "archery" => Some(GameMode::Target),
            "bubble" | "bubbles" => Some(GameMode::Bubble),
            _ => None,
        }
    }

    /// The rule set this mode plays by
    pub fn policy(&self) -> ModePolicy {
        match self {
            GameMode::Quiz => ModePolicy {
                mode: *self,
                retry_on_mistake: true,
                max_retries: Some(1),
                timeout: TimeoutPolicy::RetryOnceThenMistake,
                scoring: Scoring::Flat {
                    points: POINTS_PER_ANSWER,
                },
                timed: true,
            },
            GameMode::Typed => ModePolicy {
                mode: *self,
                retry_on_mistake: true,
                max_retries: None,
                timeout: TimeoutPolicy::Mistake,
                scoring: Scoring::Flat {
                    points: POINTS_PER_ANSWER,
                },
                timed: true,
            },
            GameMode::Cards => ModePolicy {
                mode: *self,
                retry_on_mistake: false,
                max_retries: Some(0),
                timeout: TimeoutPolicy::Ignore,
                scoring: Scoring::Flat {
                    points: POINTS_PER_ANSWER,
                },
                timed: false,
            },
            GameMode::Target => ModePolicy {
                mode: *self,
                retry_on_mistake: false,
                max_retries: Some(0),
                timeout: TimeoutPolicy::Mistake,
                scoring: Scoring::Flat {
                    points: POINTS_PER_ANSWER,
                },
                timed: true,
            },
            GameMode::Bubble => ModePolicy {
                mode: *self,
                retry_on_mistake: false,
                max_retries: Some(0),
                timeout: TimeoutPolicy::Mistake,
                scoring: Scoring::Combo {
                    base: COMBO_BASE_POINTS,
                },
                timed: true,
            },
        }
    }
}

/// What happens when the round countdown hits zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutPolicy {
    /// Counts as a mistake; the mistake rules decide retry vs advance
    Mistake,
    /// First timeout on a word just resets the countdown, the next is a mistake
    RetryOnceThenMistake,
    /// Untimed modes
    Ignore,
}

/// Points awarded for a correct answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scoring {
    Flat { points: u64 },
    /// `base × matched × combo`
    Combo { base: u64 },
}

impl Scoring {
    pub fn points(&self, matched: u32, combo: u32) -> u64 {
        match *self {
            Scoring::Flat { points } => points,
            Scoring::Combo { base } => base * matched as u64 * combo.max(1) as u64,
        }
    }
}

/// Rule set selected by mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModePolicy {
    pub mode: GameMode,
    /// Stay on the word after a non-fatal mistake
    pub retry_on_mistake: bool,
    /// Mistakes allowed per word before the answer is revealed (None = unlimited)
    pub max_retries: Option<u32>,
    pub timeout: TimeoutPolicy,
    pub scoring: Scoring,
    /// Whether the round countdown runs at all
    pub timed: bool,
}

impl ModePolicy {
    /// After `mistakes` on the current word, may the learner try again?
    pub fn allows_retry(&self, mistakes: u32) -> bool {
        self.retry_on_mistake && self.max_retries.is_none_or(|max| mistakes <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_allows_exactly_one_retry() {
        let policy = GameMode::Quiz.policy();
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
    }

    #[test]
    fn test_typed_retries_forever_and_target_never() {
        assert!(GameMode::Typed.policy().allows_retry(50));
        assert!(!GameMode::Target.policy().allows_retry(1));
        assert!(!GameMode::Bubble.policy().allows_retry(1));
    }

    #[test]
    fn test_combo_scoring() {
        let scoring = GameMode::Bubble.policy().scoring;
        assert_eq!(scoring.points(1, 1), COMBO_BASE_POINTS);
        assert_eq!(scoring.points(2, 3), COMBO_BASE_POINTS * 6);
        assert_eq!(
            GameMode::Quiz.policy().scoring.points(5, 5),
            POINTS_PER_ANSWER
        );
    }

    #[test]
    fn test_mode_names_round_trip() {
        for mode in [
            GameMode::Quiz,
            GameMode::Typed,
            GameMode::Cards,
            GameMode::Target,
            GameMode::Bubble,
        ] {
            assert_eq!(GameMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(GameMode::from_str("archery"), Some(GameMode::Target));
        assert_eq!(GameMode::from_str("nope"), None);
    }
}
