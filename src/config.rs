//! Per-session quiz configuration
//!
//! Supplied once when a session starts and read-only during play.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Time budgets and lives for one session (times in round-timer ticks, i.e. seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizConfig {
    /// Session-wide play time budget (0 = unlimited)
    pub global_time_limit: u32,
    /// Lives at session start
    pub global_lives_limit: u32,
    /// Time budget of a single round
    pub activity_time_limit: u32,
    /// When false the round timer never runs (untimed practice)
    pub quiz_mode_enabled: bool,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            global_time_limit: 0,
            global_lives_limit: 3,
            activity_time_limit: 20,
            quiz_mode_enabled: true,
        }
    }
}

impl QuizConfig {
    pub fn new(lives: u32, activity_time_limit: u32) -> Self {
        Self {
            global_lives_limit: lives,
            activity_time_limit,
            ..Default::default()
        }
    }

    pub fn with_global_time_limit(mut self, secs: u32) -> Self {
        self.global_time_limit = secs;
        self
    }

    pub fn with_quiz_mode(mut self, enabled: bool) -> Self {
        self.quiz_mode_enabled = enabled;
        self
    }

    /// Fail fast on values that cannot produce a playable session
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.global_lives_limit == 0 {
            return Err(ConfigError::NonPositiveLives);
        }
        if self.quiz_mode_enabled && self.activity_time_limit == 0 {
            return Err(ConfigError::ZeroActivityTime);
        }
        Ok(())
    }

    /// Parse from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Global budget in milliseconds, if any
    pub fn global_budget_ms(&self) -> Option<u64> {
        (self.global_time_limit > 0).then(|| self.global_time_limit as u64 * 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(QuizConfig::default().validate().is_ok());
        assert_eq!(QuizConfig::default().global_budget_ms(), None);
    }

    #[test]
    fn test_rejects_zero_lives() {
        let config = QuizConfig::new(0, 10);
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveLives));
    }

    #[test]
    fn test_zero_round_time_only_matters_when_timed() {
        assert_eq!(
            QuizConfig::new(3, 0).validate(),
            Err(ConfigError::ZeroActivityTime)
        );
        assert!(QuizConfig::new(3, 0).with_quiz_mode(false).validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = QuizConfig::from_json(r#"{"globalLivesLimit":5,"globalTimeLimit":90}"#).unwrap();
        assert_eq!(config.global_lives_limit, 5);
        assert_eq!(config.activity_time_limit, 20);
        assert_eq!(config.global_budget_ms(), Some(90_000));
        assert!(QuizConfig::from_json(r#"{"globalLivesLimit":0}"#).is_err());
    }
}
