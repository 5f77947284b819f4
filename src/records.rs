//! Personal-best records
//!
//! Keeps the top results per board (one board per game and mode), ranked
//! by score then by stars then by speed. Persisted as JSON next to the
//! settings file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::sim::{GameMode, SessionSummary};

/// Maximum number of records kept per board
pub const MAX_RECORDS_PER_BOARD: usize = 5;

/// A single finished session worth remembering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRecord {
    pub game_id: String,
    pub mode: GameMode,
    pub score: u64,
    pub stars: u8,
    pub elapsed_ms: u64,
    /// Unix timestamp (ms) when achieved
    pub timestamp: u64,
}

impl PlayRecord {
    pub fn from_summary(summary: &SessionSummary, timestamp: u64) -> Self {
        Self {
            game_id: summary.game_id.clone(),
            mode: summary.mode,
            score: summary.score,
            stars: summary.stars,
            elapsed_ms: summary.elapsed_ms,
            timestamp,
        }
    }

    fn on_board(&self, game_id: &str, mode: GameMode) -> bool {
        self.game_id == game_id && self.mode == mode
    }

    /// True when `self` ranks strictly above `other`
    fn beats(&self, other: &PlayRecord) -> bool {
        (self.score, self.stars, std::cmp::Reverse(self.elapsed_ms))
            > (other.score, other.stars, std::cmp::Reverse(other.elapsed_ms))
    }
}

/// Leaderboard of personal bests across games
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecords {
    pub entries: Vec<PlayRecord>,
}

impl PlayRecords {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn board<'a>(&'a self, game_id: &'a str, mode: GameMode) -> impl Iterator<Item = &'a PlayRecord> + 'a {
        self.entries.iter().filter(move |e| e.on_board(game_id, mode))
    }

    /// Check if a result qualifies for its board
    pub fn qualifies(&self, record: &PlayRecord) -> bool {
        if record.score == 0 {
            return false;
        }
        let board: Vec<_> = self.board(&record.game_id, record.mode).collect();
        if board.len() < MAX_RECORDS_PER_BOARD {
            return true;
        }
        board.last().map(|e| record.beats(e)).unwrap_or(true)
    }

    /// Get the rank a result would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, record: &PlayRecord) -> Option<usize> {
        if !self.qualifies(record) {
            return None;
        }
        let board: Vec<_> = self.board(&record.game_id, record.mode).collect();
        let rank = board.iter().position(|e| record.beats(e));
        Some(rank.unwrap_or(board.len()) + 1)
    }

    /// Add a result (if it qualifies). Returns the rank achieved.
    pub fn add(&mut self, record: PlayRecord) -> Option<usize> {
        let rank = self.potential_rank(&record)?;
        let game_id = record.game_id.clone();
        let mode = record.mode;

        // Insert before the first entry on the same board it beats
        let pos = self
            .entries
            .iter()
            .position(|e| e.on_board(&game_id, mode) && record.beats(e))
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, record);

        // Trim this board to max size
        let mut seen = 0;
        self.entries.retain(|e| {
            if !e.on_board(&game_id, mode) {
                return true;
            }
            seen += 1;
            seen <= MAX_RECORDS_PER_BOARD
        });

        Some(rank)
    }

    /// Best record for a game in one mode (if any)
    pub fn best_for<'a>(&'a self, game_id: &'a str, mode: GameMode) -> Option<&'a PlayRecord> {
        self.board(game_id, mode).next()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path)
            .map_err(SettingsError::from)
            .and_then(|json| serde_json::from_str::<PlayRecords>(&json).map_err(SettingsError::from))
        {
            Ok(records) => {
                log::info!("Loaded {} play records", records.entries.len());
                records
            }
            Err(e) => {
                log::info!("No play records found, starting fresh ({})", e);
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        log::info!("Play records saved ({} entries)", self.entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(game: &str, score: u64, stars: u8, elapsed_ms: u64) -> PlayRecord {
        record_in(game, GameMode::Quiz, score, stars, elapsed_ms)
    }

    fn record_in(game: &str, mode: GameMode, score: u64, stars: u8, elapsed_ms: u64) -> PlayRecord {
        PlayRecord {
            game_id: game.into(),
            mode,
            score,
            stars,
            elapsed_ms,
            timestamp: 0,
        }
    }

    #[test]
    fn test_zero_score_never_qualifies() {
        let records = PlayRecords::new();
        assert!(!records.qualifies(&record("g", 0, 3, 1)));
    }

    #[test]
    fn test_ranking_and_tie_breaks() {
        let mut records = PlayRecords::new();
        assert_eq!(records.add(record("g", 50, 2, 10_000)), Some(1));
        assert_eq!(records.add(record("g", 80, 1, 10_000)), Some(1));
        // Same score, more stars ranks higher
        assert_eq!(records.add(record("g", 50, 3, 10_000)), Some(2));
        // Same score and stars, faster ranks higher
        assert_eq!(records.add(record("g", 50, 3, 5_000)), Some(2));
        assert_eq!(records.best_for("g", GameMode::Quiz).map(|r| r.score), Some(80));
    }

    #[test]
    fn test_boards_are_per_game_and_trimmed() {
        let mut records = PlayRecords::new();
        for score in 1..=8 {
            records.add(record("a", score * 10, 3, 1_000));
        }
        records.add(record("b", 5, 3, 1_000));

        assert_eq!(records.entries.iter().filter(|e| e.game_id == "a").count(), MAX_RECORDS_PER_BOARD);
        assert_eq!(records.best_for("a", GameMode::Quiz).map(|r| r.score), Some(80));
        assert_eq!(records.best_for("b", GameMode::Quiz).map(|r| r.score), Some(5));
        assert!(!records.qualifies(&record("a", 10, 3, 1_000)));
    }

    #[test]
    fn test_modes_keep_separate_boards() {
        let mut records = PlayRecords::new();
        assert_eq!(records.add(record_in("demo", GameMode::Typed, 30, 3, 1_000)), Some(1));
        assert_eq!(records.add(record_in("demo", GameMode::Quiz, 90, 3, 1_000)), Some(1));
        assert_eq!(records.add(record_in("demo", GameMode::Cards, 10, 3, 1_000)), Some(1));

        for score in 1..=MAX_RECORDS_PER_BOARD as u64 {
            records.add(record_in("demo", GameMode::Quiz, 100 + score, 3, 1_000));
        }
        // A full quiz board does not push out the other modes
        assert_eq!(records.best_for("demo", GameMode::Typed).map(|r| r.score), Some(30));
        assert_eq!(records.best_for("demo", GameMode::Cards).map(|r| r.score), Some(10));
        assert!(records.best_for("demo", GameMode::Bubble).is_none());

        // Borrowing a short-lived id is fine
        let id = String::from("demo");
        let best = records.best_for(&id, GameMode::Quiz).map(|r| r.score);
        assert_eq!(best, Some(105));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!("word-drill-records-{}.json", std::process::id()));
        let mut records = PlayRecords::new();
        records.add(record("g", 40, 3, 2_000));
        records.save(&path).unwrap();
        assert_eq!(PlayRecords::load(&path), records);
        let _ = std::fs::remove_file(&path);
    }
}
