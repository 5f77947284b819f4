//! Word Drill demo entry point
//!
//! Autoplays a typed, a quiz and a flip-card session on a built-in word list
//! (or a JSON word file given as the first argument) with a simulated clock,
//! then prints the summaries and personal bests.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use word_drill::audio::AudioSynchronizer;
    use word_drill::modes::{Answer, CardsController, GameController, QuizController, TypedController};
    use word_drill::records::PlayRecord;
    use word_drill::settings::Settings;
    use word_drill::sim::{GameEvent, GameMode, SessionSetup, SessionSummary};
    use word_drill::telemetry::{GameMeta, LogTelemetry, Reporter};
    use word_drill::words::words_from_json;
    use word_drill::{ConfigError, PlayRecords, QuizConfig, WordPair};

    /// Simulated frame length
    const FRAME_MS: u64 = 16;
    /// Give up on a session after this much simulated time
    const MAX_SESSION_MS: u64 = 10 * 60 * 1000;

    fn builtin_words() -> Vec<WordPair> {
        [
            ("dog", "perro"),
            ("cat", "gato"),
            ("house", "casa"),
            ("water", "agua"),
            ("book", "libro"),
            ("apple", "manzana"),
        ]
        .into_iter()
        .map(|(first, second)| WordPair::new(first, second))
        .collect()
    }

    fn load_words() -> Result<Vec<WordPair>, ConfigError> {
        match std::env::args().nth(1) {
            Some(path) => {
                let json = std::fs::read_to_string(&path)
                    .map_err(|e| ConfigError::Parse(format!("{}: {}", path, e)))?;
                words_from_json(&json)
            }
            None => Ok(builtin_words()),
        }
    }

    fn setup(words: &[WordPair], mode: GameMode, settings: &Settings, seed: u64) -> SessionSetup {
        let meta = GameMeta::new("demo", "Everyday words").with_languages("en", "es");
        let reporter = Reporter::new(Box::new(LogTelemetry), Box::new(LogTelemetry));
        SessionSetup::new(words.to_vec(), QuizConfig::default(), mode)
            .with_meta(meta)
            .with_seed(seed)
            .with_audio(AudioSynchronizer::silent())
            .with_reporter(reporter)
            .with_settings(settings, None, 0)
    }

    /// Step a controller frame by frame, letting `play` act whenever input is accepted
    fn autoplay<C: GameController>(
        controller: &mut C,
        mut play: impl FnMut(&mut C, u64),
    ) -> Option<SessionSummary> {
        let mut now = 0;
        while !controller.snapshot().is_over && now < MAX_SESSION_MS {
            if controller.machine().is_accepting_input() {
                play(controller, now);
            }
            now += FRAME_MS;
            controller.update(now, FRAME_MS as f32 / 1000.0);
            for event in controller.drain_events() {
                if let GameEvent::LifeLost { remaining } = event {
                    log::info!("life lost, {} left", remaining);
                }
            }
        }
        controller.machine().summary()
    }

    fn typed_session(words: &[WordPair], settings: &Settings) -> Result<Option<SessionSummary>, ConfigError> {
        let mut typed = TypedController::new(setup(words, GameMode::Typed, settings, 1), 0)?;
        let mut fumbled = 0;
        Ok(autoplay(&mut typed, |t, now| {
            // Fumble every third word once
            let index = t.snapshot().current_word_index;
            let answer = match t.machine().current_pair() {
                Some(pair) if index % 3 == 0 && fumbled <= index => {
                    fumbled = index + 1;
                    format!("{}?", pair.second)
                }
                Some(pair) => pair.second.to_uppercase(),
                None => return,
            };
            t.on_typed_input_change(&answer);
            if let Answer::Incorrect(outcome) = t.submit(now) {
                log::info!("typed '{}': {:?}", answer, outcome);
            }
        }))
    }

    fn quiz_session(words: &[WordPair], settings: &Settings) -> Result<Option<SessionSummary>, ConfigError> {
        let mut quiz = QuizController::new(setup(words, GameMode::Quiz, settings, 2), 0)?;
        Ok(autoplay(&mut quiz, |q, now| {
            let Some(expected) = q.machine().current_pair().map(|p| p.second.clone()) else {
                return;
            };
            // Always try the first option not yet rejected
            let pick = (0..q.options().len()).find(|i| !q.rejected().contains(i));
            if let Some(pick) = pick {
                let answer = q.on_option_select(pick, now);
                log::debug!("picked '{}' (expected '{}'): {:?}", q.options()[pick], expected, answer);
            }
        }))
    }

    fn cards_session(words: &[WordPair], settings: &Settings) -> Result<Option<SessionSummary>, ConfigError> {
        let mut cards = CardsController::new(setup(words, GameMode::Cards, settings, 3), 0)?;
        Ok(autoplay(&mut cards, |c, now| {
            c.on_card_flip(now);
            c.on_card_next(now);
        }))
    }

    fn print_summary(summary: &SessionSummary) {
        println!(
            "{:<6} {:>4} pts  {}  {}/{} words  {} fails  {:.1}s  {}",
            summary.mode.as_str(),
            summary.score,
            "*".repeat(summary.stars as usize),
            summary.completed,
            summary.total_words,
            summary.fail_count,
            summary.elapsed_ms as f64 / 1000.0,
            if summary.won { "won" } else { "lost" }
        );
    }

    pub fn run() -> Result<(), ConfigError> {
        let settings_path = std::env::temp_dir().join("word-drill-settings.json");
        let settings = Settings::load(&settings_path);
        let words = load_words()?;
        log::info!("Loaded {} word pairs", words.len());

        let summaries: Vec<SessionSummary> = [
            typed_session(&words, &settings)?,
            quiz_session(&words, &settings)?,
            cards_session(&words, &settings)?,
        ]
        .into_iter()
        .flatten()
        .collect();

        let records_path: PathBuf = std::env::temp_dir().join("word-drill-records.json");
        let mut records = PlayRecords::load(&records_path);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        println!("--- results ---");
        for summary in &summaries {
            print_summary(summary);
            if let Some(rank) = records.add(PlayRecord::from_summary(summary, timestamp)) {
                println!("       new personal best, rank #{}", rank);
            }
        }
        if let Err(e) = records.save(&records_path) {
            log::warn!("could not save play records: {}", e);
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Word Drill (native demo) starting...");
    if let Err(e) = demo::run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
