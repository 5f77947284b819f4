//! Telemetry and play-count boundary
//!
//! Both collaborators are fire-and-forget. Failures are logged here and never
//! reach the session.

use serde::{Deserialize, Serialize};

use crate::error::BoundaryError;
use crate::sim::GameMode;

/// Identity of the game being played
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMeta {
    pub game_id: String,
    pub title: String,
    pub source_language: String,
    pub target_language: String,
}

impl GameMeta {
    pub fn new(game_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_language = source.into();
        self.target_language = target.into();
        self
    }

    /// "en-es" style pair label
    pub fn language_pair(&self) -> String {
        format!("{}-{}", self.source_language, self.target_language)
    }
}

/// Named telemetry events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryKind {
    PlayStarted,
    AnswerCorrect,
    AnswerIncorrect,
    GameOver,
}

impl TelemetryKind {
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryKind::PlayStarted => "play_started",
            TelemetryKind::AnswerCorrect => "answer_correct",
            TelemetryKind::AnswerIncorrect => "answer_incorrect",
            TelemetryKind::GameOver => "game_over",
        }
    }
}

/// One event with its fixed property set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub kind: TelemetryKind,
    pub game_id: String,
    pub title: String,
    pub language_pair: String,
    pub mode: GameMode,
    pub word_index: usize,
    pub hearts_remaining: u32,
    pub time_left: u32,
    /// Only set on `game_over`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub won: Option<bool>,
}

impl TelemetryEvent {
    /// Flat property map for analytics sinks
    pub fn properties(&self) -> serde_json::Value {
        serde_json::json!({
            "game_id": self.game_id,
            "game_title": self.title,
            "language_pair": self.language_pair,
            "mode": self.mode.as_str(),
            "word_index": self.word_index,
            "hearts_remaining": self.hearts_remaining,
            "time_left": self.time_left,
            "won": self.won,
        })
    }
}

/// Analytics sink
pub trait Telemetry {
    fn emit(&mut self, event: &TelemetryEvent) -> Result<(), BoundaryError>;
}

/// Backend that counts plays per game
pub trait PlayCounter {
    fn increment_play_count(&mut self, game_id: &str) -> Result<(), BoundaryError>;
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn emit(&mut self, _event: &TelemetryEvent) -> Result<(), BoundaryError> {
        Ok(())
    }
}

impl PlayCounter for NullTelemetry {
    fn increment_play_count(&mut self, _game_id: &str) -> Result<(), BoundaryError> {
        Ok(())
    }
}

/// Sink that writes events to the log (demo binary, debugging)
#[derive(Debug, Default)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn emit(&mut self, event: &TelemetryEvent) -> Result<(), BoundaryError> {
        log::info!("[telemetry] {} {}", event.kind.name(), event.properties());
        Ok(())
    }
}

impl PlayCounter for LogTelemetry {
    fn increment_play_count(&mut self, game_id: &str) -> Result<(), BoundaryError> {
        log::info!("[telemetry] play count +1 for {}", game_id);
        Ok(())
    }
}

/// Wraps both collaborators and contains their failures
pub struct Reporter {
    telemetry: Box<dyn Telemetry>,
    plays: Box<dyn PlayCounter>,
    dropped: u32,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(Box::new(NullTelemetry), Box::new(NullTelemetry))
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").field("dropped", &self.dropped).finish()
    }
}

impl Reporter {
    pub fn new(telemetry: Box<dyn Telemetry>, plays: Box<dyn PlayCounter>) -> Self {
        Self {
            telemetry,
            plays,
            dropped: 0,
        }
    }

    pub fn emit(&mut self, event: &TelemetryEvent) {
        if let Err(e) = self.telemetry.emit(event) {
            self.dropped += 1;
            log::warn!("telemetry event {} dropped: {}", event.kind.name(), e);
        }
    }

    pub fn count_play(&mut self, game_id: &str) {
        if let Err(e) = self.plays.increment_play_count(game_id) {
            self.dropped += 1;
            log::warn!("play count increment for {} failed: {}", game_id, e);
        }
    }

    /// Number of deliveries that failed so far
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flaky;

    impl Telemetry for Flaky {
        fn emit(&mut self, _event: &TelemetryEvent) -> Result<(), BoundaryError> {
            Err(BoundaryError::Network("offline".into()))
        }
    }

    impl PlayCounter for Flaky {
        fn increment_play_count(&mut self, _game_id: &str) -> Result<(), BoundaryError> {
            Err(BoundaryError::Backend("500".into()))
        }
    }

    fn event() -> TelemetryEvent {
        TelemetryEvent {
            kind: TelemetryKind::GameOver,
            game_id: "g1".into(),
            title: "Animals".into(),
            language_pair: "en-es".into(),
            mode: GameMode::Typed,
            word_index: 2,
            hearts_remaining: 1,
            time_left: 7,
            won: Some(true),
        }
    }

    #[test]
    fn test_failures_are_swallowed_and_counted() {
        let mut reporter = Reporter::new(Box::new(Flaky), Box::new(Flaky));
        reporter.emit(&event());
        reporter.count_play("g1");
        assert_eq!(reporter.dropped(), 2);
    }

    #[test]
    fn test_properties_shape() {
        let props = event().properties();
        assert_eq!(props["mode"], "typed");
        assert_eq!(props["hearts_remaining"], 1);
        assert_eq!(props["won"], true);
        assert_eq!(TelemetryKind::GameOver.name(), "game_over");
    }

    #[test]
    fn test_language_pair_label() {
        let meta = GameMeta::new("g", "t").with_languages("en", "fr");
        assert_eq!(meta.language_pair(), "en-fr");
    }
}
