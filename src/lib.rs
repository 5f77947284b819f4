//! Word Drill - play-time engine for vocabulary games
//!
//! Core modules:
//! - `sim`: Session state machine, round timer and the two physics subsystems
//! - `modes`: Per-game controllers (quiz, typed, cards, target shooting, bubbles)
//! - `audio`: Spoken feedback sequenced with state transitions
//! - `telemetry`: Fire-and-forget boundary contracts
//! - `hud`: Status strip contract shared by every mode

pub mod audio;
pub mod config;
pub mod error;
pub mod hud;
pub mod modes;
pub mod records;
pub mod settings;
pub mod sim;
pub mod telemetry;
pub mod words;

pub use config::QuizConfig;
pub use error::{AudioError, BoundaryError, ConfigError, SettingsError};
pub use records::PlayRecords;
pub use settings::Settings;
pub use words::WordPair;

/// Game tuning constants
pub mod consts {
    /// Round countdown interval (one time unit)
    pub const ROUND_TICK_MS: u64 = 1000;

    /// Fixed physics substep (120 Hz, keeps fast projectiles from tunneling)
    pub const SUBSTEP_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Floor on feedback after a correct answer
    pub const CORRECT_FEEDBACK_MIN_MS: u64 = 800;
    /// Floor on feedback when the correct answer is revealed after a mistake
    pub const REVEAL_FEEDBACK_MIN_MS: u64 = 1500;
    /// Pause after a mistake before the learner may retry the same word
    pub const MISTAKE_PAUSE_MS: u64 = 700;
    /// Delay between finishing the last word and the terminal state
    pub const GAME_OVER_GRACE_MS: u64 = 1200;
    /// Feedback that never reports completion is forced done after this long
    pub const MAX_FEEDBACK_MS: u64 = 8000;

    /// Remaining round time (ticks) below which the time bar turns to alert
    pub const LOW_TIME_THRESHOLD: u32 = 5;
    /// Length of the cosmetic life-loss animation cue (seconds)
    pub const LIFE_LOSS_CUE_SECS: f32 = 0.8;

    /// Points for a correct answer in flat-scored modes
    pub const POINTS_PER_ANSWER: u64 = 10;
    /// Base points for a bubble match before combo multipliers
    pub const COMBO_BASE_POINTS: u64 = 10;
    /// Every this many combo increments may arm a power-up round
    pub const POWER_UP_COMBO_STEP: u32 = 3;
    /// Round time gained by matching a power-up word
    pub const POWER_UP_TIME_BONUS: u32 = 10;

    /// Options shown per multiple-choice round
    pub const QUIZ_OPTIONS: usize = 3;
    /// Targets shown per shooting round
    pub const TARGET_OPTIONS: usize = 4;
    /// Target bubbles shown per matching round
    pub const BUBBLE_TARGETS: usize = 3;
}
