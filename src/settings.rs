//! Learner settings and preferences
//!
//! Persisted as JSON, separately from game content. The preferred voice is
//! resolved through an injected loader and cached per language.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BoundaryError, SettingsError};

/// Learner settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Silence all spoken feedback (pacing floors still apply)
    pub muted: bool,
    /// Explicit voice override; `None` defers to the voice cache
    pub voice_id: Option<String>,
    /// BCP-47 tag used for speech of the answer side
    pub language_tag: Option<String>,

    // === Play ===
    /// Shuffle the session's copy of the word list
    pub shuffle_words: bool,

    // === Accessibility ===
    /// Reduced motion (skip cosmetic life-loss animation)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            muted: false,
            voice_id: None,
            language_tag: None,
            shuffle_words: true,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Effective volume (0 when muted)
    pub fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume.clamp(0.0, 1.0) }
    }

    /// Effective life-loss animation (respects reduced_motion)
    pub fn effective_life_loss_cue(&self) -> bool {
        !self.reduced_motion
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::info!("Using default settings ({})", e);
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

/// Fetches the learner's preferred voice for a language from wherever it
/// is stored (profile service, OS settings)
pub trait VoiceLoader {
    fn preferred_voice(&mut self, language_tag: &str) -> Result<Option<String>, BoundaryError>;
}

#[derive(Debug, Clone)]
struct CachedVoice {
    voice_id: Option<String>,
    loaded_at_ms: u64,
}

/// Lazily refreshed per-language voice preference
pub struct VoiceCache {
    loader: Box<dyn VoiceLoader>,
    refresh_ms: u64,
    entries: HashMap<String, CachedVoice>,
}

impl std::fmt::Debug for VoiceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCache")
            .field("refresh_ms", &self.refresh_ms)
            .field("entries", &self.entries)
            .finish()
    }
}

impl VoiceCache {
    pub fn new(loader: Box<dyn VoiceLoader>, refresh_ms: u64) -> Self {
        Self {
            loader,
            refresh_ms,
            entries: HashMap::new(),
        }
    }

    /// Preferred voice for `language_tag`, reloading when the entry is stale.
    /// A failed reload keeps the previous value.
    pub fn voice_for(&mut self, language_tag: &str, now_ms: u64) -> Option<String> {
        let fresh = self
            .entries
            .get(language_tag)
            .is_some_and(|e| now_ms.saturating_sub(e.loaded_at_ms) < self.refresh_ms);

        if !fresh {
            match self.loader.preferred_voice(language_tag) {
                Ok(voice_id) => {
                    self.entries.insert(
                        language_tag.to_string(),
                        CachedVoice {
                            voice_id,
                            loaded_at_ms: now_ms,
                        },
                    );
                }
                Err(e) => log::warn!("voice preference for {} unavailable: {}", language_tag, e),
            }
        }

        self.entries
            .get(language_tag)
            .and_then(|e| e.voice_id.clone())
    }

    /// Forget everything (e.g. after the learner changes their voice)
    pub fn invalidate(&mut self) {
        self.entries.clear();
    }
}

/// Voice for the answer side: explicit settings override, else the cache
pub fn resolve_voice(settings: &Settings, cache: Option<&mut VoiceCache>, now_ms: u64) -> Option<String> {
    if settings.voice_id.is_some() {
        return settings.voice_id.clone();
    }
    let lang = settings.language_tag.as_deref()?;
    cache.and_then(|c| c.voice_for(lang, now_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingLoader {
        calls: Rc<Cell<u32>>,
        fail_after: u32,
    }

    impl VoiceLoader for CountingLoader {
        fn preferred_voice(&mut self, language_tag: &str) -> Result<Option<String>, BoundaryError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n > self.fail_after {
                return Err(BoundaryError::Network("offline".into()));
            }
            Ok(Some(format!("{}-voice-{}", language_tag, n)))
        }
    }

    #[test]
    fn test_defaults_round_trip_through_json() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, back);

        let partial: Settings = serde_json::from_str(r#"{"muted":true}"#).unwrap();
        assert!(partial.muted);
        assert_eq!(partial.effective_volume(), 0.0);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("word-drill-settings-does-not-exist.json");
        assert_eq!(Settings::load(&path), Settings::default());
    }

    #[test]
    fn test_voice_cache_refreshes_and_survives_failures() {
        let calls = Rc::new(Cell::new(0));
        let loader = CountingLoader {
            calls: calls.clone(),
            fail_after: 1,
        };
        let mut cache = VoiceCache::new(Box::new(loader), 1_000);

        assert_eq!(cache.voice_for("es", 0).as_deref(), Some("es-voice-1"));
        assert_eq!(cache.voice_for("es", 500).as_deref(), Some("es-voice-1"));
        assert_eq!(calls.get(), 1);

        // Stale; reload fails, previous value is kept
        assert_eq!(cache.voice_for("es", 2_000).as_deref(), Some("es-voice-1"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_settings_override_beats_cache() {
        let settings = Settings {
            voice_id: Some("override".into()),
            ..Default::default()
        };
        assert_eq!(resolve_voice(&settings, None, 0).as_deref(), Some("override"));

        let no_lang = Settings::default();
        assert_eq!(resolve_voice(&no_lang, None, 0), None);
    }
}
