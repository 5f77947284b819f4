//! Error types
//!
//! Only configuration errors ever reach the player. Audio and boundary
//! failures are recovered where they happen and only logged.

use std::fmt;

/// Refusal to start a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No word pairs supplied
    EmptyWordList,
    /// Lives limit must be at least 1
    NonPositiveLives,
    /// Timed sessions need a round budget of at least one tick
    ZeroActivityTime,
    /// A pair entering the session has an empty side
    BlankWord { index: usize },
    /// Config file could not be parsed
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyWordList => write!(f, "word list is empty"),
            ConfigError::NonPositiveLives => write!(f, "lives limit must be at least 1"),
            ConfigError::ZeroActivityTime => write!(f, "round time limit must be positive"),
            ConfigError::BlankWord { index } => {
                write!(f, "word pair {} has an empty side", index)
            }
            ConfigError::Parse(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// Speech or clip playback failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// Backend has no usable voice/output
    Unavailable,
    /// Playback could not be started
    StartFailed(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Unavailable => write!(f, "audio backend unavailable"),
            AudioError::StartFailed(msg) => write!(f, "playback failed to start: {}", msg),
        }
    }
}

impl std::error::Error for AudioError {}

/// Failure talking to an external collaborator (telemetry, play counts)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryError {
    /// Transport failed
    Network(String),
    /// Remote side rejected the request
    Backend(String),
}

impl fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryError::Network(msg) => write!(f, "network error: {}", msg),
            BoundaryError::Backend(msg) => write!(f, "backend error: {}", msg),
        }
    }
}

impl std::error::Error for BoundaryError {}

/// Settings/records file errors
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "I/O error: {}", e),
            SettingsError::Serde(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            SettingsError::Serde(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        SettingsError::Io(e)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(e: serde_json::Error) -> Self {
        SettingsError::Serde(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        assert_eq!(ConfigError::EmptyWordList.to_string(), "word list is empty");
        assert_eq!(
            ConfigError::BlankWord { index: 3 }.to_string(),
            "word pair 3 has an empty side"
        );
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: ConfigError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
