//! Word pairs and option sampling
//!
//! The word list is read-only for the whole session. Every mode that shows
//! candidate translations builds them here so distractor rules stay in one
//! place.

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A translation pair with optional example sentences and pre-rendered audio
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPair {
    pub first: String,
    pub second: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_audio_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_audio_ref: Option<String>,
}

impl WordPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            ..Default::default()
        }
    }

    pub fn with_audio(mut self, first_ref: Option<String>, second_ref: Option<String>) -> Self {
        self.first_audio_ref = first_ref;
        self.second_audio_ref = second_ref;
        self
    }

    pub fn is_playable(&self) -> bool {
        !self.first.trim().is_empty() && !self.second.trim().is_empty()
    }
}

/// Reject lists that would produce an unplayable session
pub fn validate_words(pairs: &[WordPair]) -> Result<(), ConfigError> {
    if pairs.is_empty() {
        return Err(ConfigError::EmptyWordList);
    }
    match pairs.iter().position(|p| !p.is_playable()) {
        Some(index) => Err(ConfigError::BlankWord { index }),
        None => Ok(()),
    }
}

/// Parse a JSON array of word pairs and validate it
pub fn words_from_json(json: &str) -> Result<Vec<WordPair>, ConfigError> {
    let pairs: Vec<WordPair> = serde_json::from_str(json)?;
    validate_words(&pairs)?;
    Ok(pairs)
}

/// `second` values of every other pair, excluding the correct answer, deduplicated
/// in list order
pub fn distinct_alternatives(pairs: &[WordPair], index: usize) -> Vec<&str> {
    let correct = pairs.get(index).map(|p| p.second.as_str());
    let mut out: Vec<&str> = Vec::new();
    for (i, pair) in pairs.iter().enumerate() {
        let word = pair.second.as_str();
        if i == index || Some(word) == correct || out.contains(&word) {
            continue;
        }
        out.push(word);
    }
    out
}

/// How to fill distractor slots once the distinct alternatives run out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistractorFill {
    /// Never repeat a word; the result may be shorter than asked
    Distinct,
    /// Repeat alternatives to fill every slot
    Repeat,
}

/// Pick `count` wrong options for the pair at `index`.
///
/// Distinct alternatives come first. With `DistractorFill::Repeat` the
/// remaining slots repeat them; with no alternatives at all the result is
/// shorter than `count` either way. The correct word is never returned.
pub fn sample_distractors<R: Rng>(
    pairs: &[WordPair],
    index: usize,
    count: usize,
    fill: DistractorFill,
    rng: &mut R,
) -> Vec<String> {
    let mut pool = distinct_alternatives(pairs, index);
    pool.shuffle(rng);

    let mut picked: Vec<String> = pool.iter().take(count).map(|w| w.to_string()).collect();
    if fill == DistractorFill::Repeat {
        while picked.len() < count {
            match pool.choose(rng) {
                Some(word) => picked.push(word.to_string()),
                None => break,
            }
        }
    }
    picked
}

/// Shuffled option list containing the correct answer plus distractors.
/// Returns the options and the position of the correct one.
pub fn build_options<R: Rng>(
    pairs: &[WordPair],
    index: usize,
    total: usize,
    fill: DistractorFill,
    rng: &mut R,
) -> (Vec<String>, usize) {
    let correct = pairs[index].second.clone();
    let mut options = sample_distractors(pairs, index, total.saturating_sub(1), fill, rng);
    let slot = rng.random_range(0..=options.len());
    options.insert(slot, correct);
    (options, slot)
}

/// Lenient comparison for typed answers: case, surrounding and repeated
/// whitespace are ignored
pub fn answers_match(input: &str, expected: &str) -> bool {
    normalize_answer(input) == normalize_answer(expected)
}

fn normalize_answer(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn pairs() -> Vec<WordPair> {
        vec![
            WordPair::new("dog", "perro"),
            WordPair::new("cat", "gato"),
            WordPair::new("house", "casa"),
            WordPair::new("home", "casa"),
            WordPair::new("water", "agua"),
        ]
    }

    #[test]
    fn test_validate_rejects_empty_and_blank() {
        assert_eq!(validate_words(&[]), Err(ConfigError::EmptyWordList));
        let bad = vec![WordPair::new("a", "b"), WordPair::new(" ", "c")];
        assert_eq!(validate_words(&bad), Err(ConfigError::BlankWord { index: 1 }));
        assert!(validate_words(&pairs()).is_ok());
    }

    #[test]
    fn test_words_from_json() {
        let json = r#"[{"first":"dog","second":"cat","secondAudioRef":"https://x/cat.mp3"}]"#;
        let words = words_from_json(json).unwrap();
        assert_eq!(words[0].second_audio_ref.as_deref(), Some("https://x/cat.mp3"));
        assert!(matches!(words_from_json("[]"), Err(ConfigError::EmptyWordList)));
        assert!(matches!(words_from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_alternatives_skip_correct_and_duplicates() {
        let words = pairs();
        // "house" -> "casa"; "home" also maps to "casa" and must be excluded
        let alts = distinct_alternatives(&words, 2);
        assert_eq!(alts, vec!["perro", "gato", "agua"]);
    }

    #[test]
    fn test_distractors_never_contain_correct() {
        let words = pairs();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..50 {
            let picked = sample_distractors(&words, 3, 3, DistractorFill::Distinct, &mut rng);
            assert_eq!(picked.len(), 3);
            assert!(!picked.iter().any(|w| w == "casa"));
        }
    }

    #[test]
    fn test_distractors_repeat_when_pool_small() {
        let words = vec![WordPair::new("a", "x"), WordPair::new("b", "y")];
        let mut rng = Pcg32::seed_from_u64(1);
        let picked = sample_distractors(&words, 0, 2, DistractorFill::Repeat, &mut rng);
        assert_eq!(picked, vec!["y".to_string(), "y".to_string()]);

        let single = vec![WordPair::new("a", "x")];
        assert!(sample_distractors(&single, 0, 2, DistractorFill::Repeat, &mut rng).is_empty());
    }

    #[test]
    fn test_distinct_fill_never_repeats() {
        let words = vec![WordPair::new("dog", "perro"), WordPair::new("cat", "gato")];
        let mut rng = Pcg32::seed_from_u64(1);
        let picked = sample_distractors(&words, 0, 2, DistractorFill::Distinct, &mut rng);
        assert_eq!(picked, vec!["gato".to_string()]);

        let (options, slot) = build_options(&words, 0, 3, DistractorFill::Distinct, &mut rng);
        assert_eq!(options.len(), 2);
        assert_eq!(options[slot], "perro");
        assert!(options.contains(&"gato".to_string()));
    }

    #[test]
    fn test_build_options_contains_correct_once() {
        let words = pairs();
        let mut rng = Pcg32::seed_from_u64(99);
        let (options, slot) = build_options(&words, 0, 3, DistractorFill::Distinct, &mut rng);
        assert_eq!(options.len(), 3);
        assert_eq!(options[slot], "perro");
        assert_eq!(options.iter().filter(|o| *o == "perro").count(), 1);
    }

    #[test]
    fn test_answers_match_is_lenient() {
        assert!(answers_match("  Buenos   Dias ", "buenos dias"));
        assert!(!answers_match("buenos", "buenos dias"));
    }
}
