//! Session state machine
//!
//! `SessionMachine` owns `SessionState` and is the only thing that mutates it.
//! Outcomes come in through the transition functions; waits (spoken feedback,
//! grace delays) are held as a single `PendingStep` that `update` resolves.
//! While a step is pending the session is paused and outcomes are ignored,
//! so a late timer tick or a duplicate input cannot be counted twice.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;

use super::combo::{ComboTracker, MatchReward};
use super::policy::{GameMode, ModePolicy, Scoring, TimeoutPolicy};
use super::state::{GameEvent, SessionState, SessionSummary, star_rating_for, start_session};
use super::tick::RoundTimer;
use crate::audio::{AudioSynchronizer, FeedbackPoll, FeedbackTicket, SpeakOptions};
use crate::config::QuizConfig;
use crate::consts::{
    CORRECT_FEEDBACK_MIN_MS, GAME_OVER_GRACE_MS, MISTAKE_PAUSE_MS, POWER_UP_TIME_BONUS,
    REVEAL_FEEDBACK_MIN_MS,
};
use crate::error::ConfigError;
use crate::settings::{Settings, VoiceCache, resolve_voice};
use crate::telemetry::{GameMeta, Reporter, TelemetryEvent, TelemetryKind};
use crate::words::WordPair;

/// Everything needed to start (and later restart) a session
#[derive(Debug)]
pub struct SessionSetup {
    pub words: Vec<WordPair>,
    pub config: QuizConfig,
    pub mode: GameMode,
    pub meta: GameMeta,
    pub seed: u64,
    pub shuffle: bool,
    pub voice_id: Option<String>,
    pub language_tag: Option<String>,
    pub audio: AudioSynchronizer,
    pub reporter: Reporter,
}

impl SessionSetup {
    pub fn new(words: Vec<WordPair>, config: QuizConfig, mode: GameMode) -> Self {
        Self {
            words,
            config,
            mode,
            meta: GameMeta::default(),
            seed: 0,
            shuffle: false,
            voice_id: None,
            language_tag: None,
            audio: AudioSynchronizer::silent(),
            reporter: Reporter::default(),
        }
    }

    pub fn with_meta(mut self, meta: GameMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_voice(mut self, voice_id: Option<String>, language_tag: Option<String>) -> Self {
        self.voice_id = voice_id;
        self.language_tag = language_tag;
        self
    }

    pub fn with_audio(mut self, audio: AudioSynchronizer) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Apply learner settings: volume, mute, shuffle and the resolved voice
    pub fn with_settings(mut self, settings: &Settings, cache: Option<&mut VoiceCache>, now_ms: u64) -> Self {
        self.audio.set_master_volume(settings.master_volume);
        self.audio.set_muted(settings.muted);
        self.shuffle = settings.shuffle_words;
        self.voice_id = resolve_voice(settings, cache, now_ms);
        self.language_tag = settings.language_tag.clone();
        self
    }
}

/// What a pending step waits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Spoken feedback in flight
    Audio(FeedbackTicket),
    /// Fixed delay until the given clock value
    Until(u64),
}

/// What runs once the wait completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterWait {
    Advance,
    /// Retry the same word
    Resume,
    /// Enter the terminal state
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingStep {
    pub wait: Wait,
    pub then: AfterWait,
}

/// How an incorrect answer was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MistakeOutcome {
    /// Session paused, over or exited; nothing changed
    Ignored,
    /// Life taken, same word again after a short pause
    Retry,
    /// Life taken, correct answer revealed, then the round advances
    Reveal,
    /// Last life taken
    GameOver,
}

pub struct SessionMachine {
    meta: GameMeta,
    source_words: Vec<WordPair>,
    words: Vec<WordPair>,
    config: QuizConfig,
    policy: ModePolicy,
    shuffle: bool,
    voice_id: Option<String>,
    language_tag: Option<String>,

    rng: Pcg32,
    state: SessionState,
    timer: RoundTimer,
    audio: AudioSynchronizer,
    reporter: Reporter,
    combo: ComboTracker,
    pending: Option<PendingStep>,
    events: Vec<GameEvent>,

    /// Mistakes and timeouts on the current word
    mistakes_on_word: u32,
    timeouts_on_word: u32,
    /// Power-up time carried into the next round
    carry_bonus: u32,
    /// Play time of finished rounds
    elapsed_before_round_ms: u64,
    user_paused: bool,
    revealing: bool,
    exited: bool,
    won: bool,
    round_serial: u64,
}

impl std::fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMachine")
            .field("mode", &self.policy.mode)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("round_serial", &self.round_serial)
            .finish()
    }
}

impl SessionMachine {
    /// Validate the inputs and start the first round.
    pub fn start(setup: SessionSetup, now_ms: u64) -> Result<Self, ConfigError> {
        let state = start_session(&setup.words, &setup.config, now_ms)?;

        let mut rng = Pcg32::seed_from_u64(setup.seed);
        let mut words = setup.words.clone();
        if setup.shuffle {
            words.shuffle(&mut rng);
        }

        let mut machine = Self {
            meta: setup.meta,
            source_words: setup.words,
            words,
            config: setup.config,
            policy: setup.mode.policy(),
            shuffle: setup.shuffle,
            voice_id: setup.voice_id,
            language_tag: setup.language_tag,
            rng,
            state,
            timer: RoundTimer::default(),
            audio: setup.audio,
            reporter: setup.reporter,
            combo: ComboTracker::default(),
            pending: None,
            events: Vec::new(),
            mistakes_on_word: 0,
            timeouts_on_word: 0,
            carry_bonus: 0,
            elapsed_before_round_ms: 0,
            user_paused: false,
            revealing: false,
            exited: false,
            won: false,
            round_serial: 0,
        };

        log::info!(
            "Session started: {} ({}), {} words, seed {}",
            machine.meta.game_id,
            machine.policy.mode.as_str(),
            machine.words.len(),
            setup.seed
        );
        machine.begin_round(now_ms);
        machine.report(TelemetryKind::PlayStarted, None);
        Ok(machine)
    }

    // === Accessors ===

    /// Read-only snapshot for the presentation layer
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn policy(&self) -> &ModePolicy {
        &self.policy
    }

    pub fn meta(&self) -> &GameMeta {
        &self.meta
    }

    /// The session's (possibly shuffled) copy of the word list
    pub fn words(&self) -> &[WordPair] {
        &self.words
    }

    pub fn current_pair(&self) -> Option<&WordPair> {
        self.words.get(self.state.current_word_index)
    }

    /// Words and RNG together, for controllers that sample options
    pub fn words_and_rng(&mut self) -> (&[WordPair], &mut Pcg32) {
        (&self.words, &mut self.rng)
    }

    pub fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    pub fn combo(&self) -> &ComboTracker {
        &self.combo
    }

    pub fn pending(&self) -> Option<PendingStep> {
        self.pending
    }

    /// Bumped every time a round (re)starts; controllers compare it to know
    /// when to regenerate round-scoped entities
    pub fn round_serial(&self) -> u64 {
        self.round_serial
    }

    /// The correct answer is on screen after the retry budget ran out
    pub fn is_revealing(&self) -> bool {
        self.revealing
    }

    pub fn is_user_paused(&self) -> bool {
        self.user_paused
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    /// Whether outcomes are currently counted
    pub fn is_accepting_input(&self) -> bool {
        !self.state.is_over && !self.state.is_paused && !self.exited
    }

    /// Total play time so far (frozen once the session is over)
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        if self.state.is_over {
            return self.state.total_elapsed_on_end_ms;
        }
        self.elapsed_before_round_ms + now_ms.saturating_sub(self.state.round_started_at_ms)
    }

    /// Result of the session, once it is over
    pub fn summary(&self) -> Option<SessionSummary> {
        if !self.state.is_over {
            return None;
        }
        Some(SessionSummary {
            game_id: self.meta.game_id.clone(),
            mode: self.policy.mode,
            score: self.state.score,
            stars: self.state.star_rating,
            completed: self.state.completed_count,
            total_words: self.words.len(),
            fail_count: self.state.fail_count,
            elapsed_ms: self.state.total_elapsed_on_end_ms,
            won: self.won,
        })
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Transitions ===

    /// Count a correct answer. Returns false when the outcome was ignored.
    pub fn record_correct_answer(&mut self, now_ms: u64) -> bool {
        self.accept_correct(1, now_ms)
    }

    /// Count a match of `matched` bodies with combo-aware scoring
    pub fn record_match(&mut self, matched: u32, now_ms: u64) -> bool {
        self.accept_correct(matched.max(1), now_ms)
    }

    fn accept_correct(&mut self, matched: u32, now_ms: u64) -> bool {
        if !self.is_accepting_input() {
            return false;
        }
        let index = self.state.current_word_index;

        let points = match self.policy.scoring {
            Scoring::Combo { .. } => {
                let (reward, armed) = self.combo.on_match(index, self.words.len(), &mut self.rng);
                if let Some(armed) = armed {
                    log::debug!("power-up armed on word {}", armed);
                    self.events.push(GameEvent::PowerUpArmed { index: armed });
                }
                match reward {
                    MatchReward::Points { combo } => self.policy.scoring.points(matched, combo),
                    MatchReward::PowerUp => {
                        self.carry_bonus += POWER_UP_TIME_BONUS;
                        self.state.time_left_in_round += POWER_UP_TIME_BONUS;
                        self.events.push(GameEvent::PowerUpCollected {
                            bonus: POWER_UP_TIME_BONUS,
                        });
                        0
                    }
                }
            }
            Scoring::Flat { .. } => self.policy.scoring.points(matched, 1),
        };

        self.state.completed_count += 1;
        self.state.score += points;
        self.events.push(GameEvent::AnswerCorrect { index, points });
        self.report(TelemetryKind::AnswerCorrect, None);
        log::debug!("word {} correct, +{} (score {})", index, points, self.state.score);

        let ticket = self.speak_answer(index, CORRECT_FEEDBACK_MIN_MS, now_ms);
        self.await_step(Wait::Audio(ticket), AfterWait::Advance);
        true
    }

    /// Count a mistake: take a life, then retry, reveal or end per mode policy
    pub fn record_incorrect_answer(&mut self, now_ms: u64) -> MistakeOutcome {
        if !self.is_accepting_input() {
            return MistakeOutcome::Ignored;
        }
        let index = self.state.current_word_index;

        self.state.lives_remaining = self.state.lives_remaining.saturating_sub(1);
        self.state.fail_count += 1;
        self.state.star_rating = star_rating_for(self.state.fail_count);
        self.mistakes_on_word += 1;
        self.combo.reset_combo();

        self.events.push(GameEvent::AnswerIncorrect { index });
        self.events.push(GameEvent::LifeLost {
            remaining: self.state.lives_remaining,
        });
        self.report(TelemetryKind::AnswerIncorrect, None);
        log::debug!(
            "word {} incorrect, {} lives left ({} fails)",
            index,
            self.state.lives_remaining,
            self.state.fail_count
        );

        if self.state.lives_remaining == 0 {
            self.finish(now_ms, false);
            return MistakeOutcome::GameOver;
        }

        if self.policy.allows_retry(self.mistakes_on_word) {
            self.await_step(Wait::Until(now_ms + MISTAKE_PAUSE_MS), AfterWait::Resume);
            MistakeOutcome::Retry
        } else {
            self.revealing = true;
            self.events.push(GameEvent::AnswerRevealed { index });
            let ticket = self.speak_answer(index, REVEAL_FEEDBACK_MIN_MS, now_ms);
            self.await_step(Wait::Audio(ticket), AfterWait::Advance);
            MistakeOutcome::Reveal
        }
    }

    /// A shot that ended without a scoring contact. Costs nothing but the combo.
    pub fn record_miss(&mut self) {
        if !self.is_accepting_input() {
            return;
        }
        if self.combo.combo() > 0 {
            log::debug!("miss, combo {} reset", self.combo.combo());
        }
        self.combo.reset_combo();
    }

    /// Move to the next word, or schedule the end after the last one.
    ///
    /// At the last index this never moves past the list; repeated calls keep
    /// the single scheduled finish.
    pub fn advance_round(&mut self, now_ms: u64) {
        if self.state.is_over || self.exited {
            return;
        }
        if matches!(self.pending, Some(PendingStep { then: AfterWait::Finish, .. })) {
            return;
        }
        self.drop_pending();

        if self.state.current_word_index + 1 >= self.words.len() {
            log::debug!("last word done, finishing in {}ms", GAME_OVER_GRACE_MS);
            self.await_step(Wait::Until(now_ms + GAME_OVER_GRACE_MS), AfterWait::Finish);
            return;
        }

        self.elapsed_before_round_ms += now_ms.saturating_sub(self.state.round_started_at_ms);
        self.state.current_word_index += 1;
        self.begin_round(now_ms);
    }

    /// One countdown tick. Called by `update` whenever the round timer fires.
    pub fn tick_timer(&mut self, now_ms: u64) {
        if self.state.is_over || self.state.is_paused || self.exited || !self.is_timed() {
            return;
        }
        if self
            .config
            .global_budget_ms()
            .is_some_and(|budget| self.elapsed_ms(now_ms) >= budget)
        {
            log::info!("global time limit reached");
            self.finish(now_ms, false);
            return;
        }

        self.state.time_left_in_round = self.state.time_left_in_round.saturating_sub(1);
        if self.state.time_left_in_round == 0 {
            self.on_timeout(now_ms);
        }
    }

    fn on_timeout(&mut self, now_ms: u64) {
        let index = self.state.current_word_index;
        self.events.push(GameEvent::TimedOut { index });
        log::debug!("word {} timed out", index);

        match self.policy.timeout {
            TimeoutPolicy::Ignore => {}
            TimeoutPolicy::RetryOnceThenMistake => {
                self.timeouts_on_word += 1;
                if self.timeouts_on_word == 1 {
                    self.state.time_left_in_round = self.config.activity_time_limit;
                } else {
                    self.record_incorrect_answer(now_ms);
                }
            }
            TimeoutPolicy::Mistake => {
                self.record_incorrect_answer(now_ms);
            }
        }
    }

    /// User pause. Freezes the countdown; outcomes are ignored until resume.
    pub fn pause(&mut self) {
        if self.state.is_over || self.exited || self.user_paused {
            return;
        }
        self.user_paused = true;
        self.state.is_paused = true;
        self.timer.cancel();
        log::debug!("paused by user");
    }

    pub fn resume(&mut self, now_ms: u64) {
        if !self.user_paused {
            return;
        }
        self.user_paused = false;
        // A pending step keeps the session paused until it resolves
        if self.pending.is_none() && !self.state.is_over {
            self.state.is_paused = false;
            self.arm_timer(now_ms);
        }
        log::debug!("resumed by user");
    }

    /// Throw the session away and start again with the same inputs.
    /// A shuffled list is reshuffled from the continuing RNG stream.
    pub fn restart(&mut self, now_ms: u64) {
        self.audio.cancel_all();
        self.pending = None;
        self.timer.cancel();

        self.words = self.source_words.clone();
        if self.shuffle {
            self.words.shuffle(&mut self.rng);
        }
        self.state = SessionState::initial(&self.config, now_ms);
        self.combo.clear();
        self.events.clear();
        self.carry_bonus = 0;
        self.elapsed_before_round_ms = 0;
        self.user_paused = false;
        self.exited = false;
        self.won = false;

        log::info!("Session restarted: {}", self.meta.game_id);
        self.begin_round(now_ms);
        self.report(TelemetryKind::PlayStarted, None);
    }

    /// Leave the session: stop the timer and all audio. Nothing counts after this.
    pub fn exit(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;
        self.timer.cancel();
        self.audio.cancel_all();
        self.pending = None;
        log::info!("Session exited: {}", self.meta.game_id);
    }

    /// Frame update: resolve the pending step, then run due countdown ticks.
    pub fn update(&mut self, now_ms: u64) {
        if self.exited {
            return;
        }
        self.audio.pump(now_ms);

        if let Some(step) = self.pending {
            let done = match step.wait {
                Wait::Audio(ticket) => match self.audio.poll(ticket, now_ms) {
                    FeedbackPoll::Pending => false,
                    FeedbackPoll::Resolved(path) => {
                        log::debug!("feedback done via {:?}", path);
                        true
                    }
                    FeedbackPoll::Unknown => true,
                },
                Wait::Until(deadline) => now_ms >= deadline,
            };
            if done {
                self.pending = None;
                self.run_after(step.then, now_ms);
            }
        }

        for _ in 0..self.timer.poll(now_ms) {
            self.tick_timer(now_ms);
            if self.state.is_over || self.state.is_paused {
                break;
            }
        }
    }

    /// Speak a word without gating anything (card flips, prompts)
    pub fn speak_word(&mut self, text: &str, fallback_audio_ref: Option<String>, now_ms: u64) {
        let options = SpeakOptions::new()
            .with_fallback(fallback_audio_ref)
            .with_voice(self.voice_id.clone())
            .with_language(self.language_tag.clone());
        self.audio.speak_detached(text, &options, now_ms);
    }

    // === Internals ===

    fn is_timed(&self) -> bool {
        self.policy.timed && self.config.quiz_mode_enabled
    }

    fn arm_timer(&mut self, now_ms: u64) {
        if self.is_timed() && !self.user_paused {
            self.timer.start(now_ms);
        }
    }

    fn begin_round(&mut self, now_ms: u64) {
        self.state.round_started_at_ms = now_ms;
        self.state.time_left_in_round = self.config.activity_time_limit + self.carry_bonus;
        self.state.is_paused = self.user_paused;
        self.carry_bonus = 0;
        self.mistakes_on_word = 0;
        self.timeouts_on_word = 0;
        self.revealing = false;
        self.round_serial += 1;
        self.combo.expire_before(self.state.current_word_index);

        self.timer.cancel();
        self.arm_timer(now_ms);
        self.events.push(GameEvent::RoundStarted {
            index: self.state.current_word_index,
        });
    }

    fn await_step(&mut self, wait: Wait, then: AfterWait) {
        self.pending = Some(PendingStep { wait, then });
        self.state.is_paused = true;
        self.timer.cancel();
    }

    /// Forget a pending step, silencing its feedback
    fn drop_pending(&mut self) {
        if let Some(PendingStep {
            wait: Wait::Audio(_), ..
        }) = self.pending.take()
        {
            self.audio.cancel_all();
        }
    }

    fn run_after(&mut self, then: AfterWait, now_ms: u64) {
        match then {
            AfterWait::Advance => self.advance_round(now_ms),
            AfterWait::Resume => {
                self.state.is_paused = self.user_paused;
                if self.state.time_left_in_round == 0 {
                    self.state.time_left_in_round = self.config.activity_time_limit;
                }
                self.arm_timer(now_ms);
            }
            AfterWait::Finish => {
                let won = self.state.lives_remaining > 0;
                self.finish(now_ms, won);
            }
        }
    }

    fn finish(&mut self, now_ms: u64, won: bool) {
        if self.state.is_over {
            return;
        }
        let elapsed = self.elapsed_ms(now_ms);
        self.pending = None;
        self.timer.cancel();
        self.state.is_over = true;
        self.state.is_paused = false;
        self.state.total_elapsed_on_end_ms = elapsed;
        self.won = won;

        self.events.push(GameEvent::GameOver { won });
        self.report(TelemetryKind::GameOver, Some(won));
        self.reporter.count_play(&self.meta.game_id);
        log::info!(
            "Game over ({}): score {}, {} stars, {}/{} words, {}ms",
            if won { "won" } else { "lost" },
            self.state.score,
            self.state.star_rating,
            self.state.completed_count,
            self.words.len(),
            elapsed
        );
    }

    fn speak_answer(&mut self, index: usize, min_duration_ms: u64, now_ms: u64) -> FeedbackTicket {
        let (text, fallback) = match self.words.get(index) {
            Some(pair) => (pair.second.clone(), pair.second_audio_ref.clone()),
            None => (String::new(), None),
        };
        let options = SpeakOptions::new()
            .with_fallback(fallback)
            .with_voice(self.voice_id.clone())
            .with_language(self.language_tag.clone())
            .with_min_duration(min_duration_ms);
        self.audio.speak(&text, &options, now_ms)
    }

    fn report(&mut self, kind: TelemetryKind, won: Option<bool>) {
        let event = TelemetryEvent {
            kind,
            game_id: self.meta.game_id.clone(),
            title: self.meta.title.clone(),
            language_pair: self.meta.language_pair(),
            mode: self.policy.mode,
            word_index: self.state.current_word_index,
            hearts_remaining: self.state.lives_remaining,
            time_left: self.state.time_left_in_round,
            won,
        };
        self.reporter.emit(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{NoClips, PlaybackId, PlaybackStatus, SpeechSynth, Utterance};
    use crate::error::{AudioError, BoundaryError};
    use crate::telemetry::{PlayCounter, Telemetry};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn pairs(n: usize) -> Vec<WordPair> {
        (0..n)
            .map(|i| WordPair::new(format!("w{}", i), format!("t{}", i)))
            .collect()
    }

    fn machine(mode: GameMode, words: Vec<WordPair>, config: QuizConfig) -> SessionMachine {
        SessionMachine::start(SessionSetup::new(words, config, mode), 0).unwrap()
    }

    /// Run update until the pending step resolves (silent audio resolves at its floor)
    fn settle(m: &mut SessionMachine, now: &mut u64) {
        let mut guard = 0;
        while m.pending().is_some() && guard < 100 {
            *now += 100;
            m.update(*now);
            guard += 1;
        }
    }

    #[derive(Default)]
    struct Recorded {
        events: Vec<&'static str>,
        plays: Vec<String>,
    }

    struct Recorder(Rc<RefCell<Recorded>>);

    impl Telemetry for Recorder {
        fn emit(&mut self, event: &TelemetryEvent) -> Result<(), BoundaryError> {
            self.0.borrow_mut().events.push(event.kind.name());
            Ok(())
        }
    }

    impl PlayCounter for Recorder {
        fn increment_play_count(&mut self, game_id: &str) -> Result<(), BoundaryError> {
            self.0.borrow_mut().plays.push(game_id.to_string());
            Ok(())
        }
    }

    /// Speech that keeps playing until the test finishes it
    #[derive(Default)]
    struct Held {
        started: u64,
        finished: HashMap<PlaybackId, PlaybackStatus>,
        cancelled: Vec<PlaybackId>,
    }

    struct HeldSpeech(Rc<RefCell<Held>>);

    impl SpeechSynth for HeldSpeech {
        fn is_available(&self, _voice_id: Option<&str>, _language_tag: Option<&str>) -> bool {
            true
        }

        fn start(&mut self, _utterance: &Utterance<'_>) -> Result<PlaybackId, AudioError> {
            let mut held = self.0.borrow_mut();
            held.started += 1;
            Ok(held.started)
        }

        fn status(&mut self, id: PlaybackId) -> PlaybackStatus {
            self.0.borrow().finished.get(&id).copied().unwrap_or(PlaybackStatus::Playing)
        }

        fn cancel(&mut self, id: PlaybackId) {
            self.0.borrow_mut().cancelled.push(id);
        }
    }

    fn voiced_machine(mode: GameMode, words: Vec<WordPair>) -> (SessionMachine, Rc<RefCell<Held>>) {
        let held = Rc::new(RefCell::new(Held::default()));
        let audio = AudioSynchronizer::new(Box::new(HeldSpeech(held.clone())), Box::new(NoClips));
        let setup = SessionSetup::new(words, QuizConfig::new(3, 20), mode).with_audio(audio);
        (SessionMachine::start(setup, 0).unwrap(), held)
    }

    #[test]
    fn test_empty_word_list_fails_fast() {
        let setup = SessionSetup::new(Vec::new(), QuizConfig::default(), GameMode::Quiz);
        assert_eq!(
            SessionMachine::start(setup, 0).unwrap_err(),
            ConfigError::EmptyWordList
        );
    }

    #[test]
    fn test_typed_end_to_end() {
        let words = vec![WordPair::new("dog", "cat")];
        let mut m = machine(GameMode::Typed, words, QuizConfig::new(3, 20));
        let mut now = 100;

        assert_eq!(m.record_incorrect_answer(now), MistakeOutcome::Retry);
        settle(&mut m, &mut now);
        assert_eq!(m.state().current_word_index, 0);

        assert_eq!(m.record_incorrect_answer(now), MistakeOutcome::Retry);
        settle(&mut m, &mut now);

        assert!(m.record_correct_answer(now));
        settle(&mut m, &mut now);

        let state = m.state();
        assert!(state.is_over);
        assert_eq!(state.fail_count, 2);
        assert_eq!(state.star_rating, 3);
        assert_eq!(state.completed_count, 1);
        assert_eq!(state.lives_remaining, 1);
        assert!(m.summary().is_some_and(|s| s.won));
    }

    #[test]
    fn test_quiz_two_wrong_picks_reveal_and_advance() {
        let mut m = machine(GameMode::Quiz, pairs(3), QuizConfig::new(3, 20));
        let mut now = 0;

        assert_eq!(m.record_incorrect_answer(0), MistakeOutcome::Retry);
        settle(&mut m, &mut now);
        assert_eq!(m.record_incorrect_answer(now), MistakeOutcome::Reveal);
        assert!(m.is_revealing());
        assert_eq!(m.state().fail_count, 2);

        settle(&mut m, &mut now);
        assert_eq!(m.state().current_word_index, 1);
        assert!(!m.is_revealing());
        assert!(
            m.drain_events()
                .contains(&GameEvent::AnswerRevealed { index: 0 })
        );
    }

    #[test]
    fn test_reveal_waits_for_feedback_floor() {
        let mut m = machine(GameMode::Target, pairs(3), QuizConfig::new(3, 20));
        assert_eq!(m.record_incorrect_answer(0), MistakeOutcome::Reveal);
        m.update(REVEAL_FEEDBACK_MIN_MS - 1);
        assert_eq!(m.state().current_word_index, 0);
        m.update(REVEAL_FEEDBACK_MIN_MS);
        assert_eq!(m.state().current_word_index, 1);
    }

    #[test]
    fn test_outcomes_ignored_while_feedback_plays() {
        let mut m = machine(GameMode::Quiz, pairs(3), QuizConfig::new(3, 20));
        assert!(m.record_correct_answer(0));
        assert!(m.state().is_paused);

        // Duplicate inputs during the wait are dropped
        assert!(!m.record_correct_answer(10));
        assert_eq!(m.record_incorrect_answer(20), MistakeOutcome::Ignored);
        assert_eq!(m.state().completed_count, 1);
        assert_eq!(m.state().lives_remaining, 3);
    }

    #[test]
    fn test_last_life_ends_immediately() {
        let mut m = machine(GameMode::Target, pairs(5), QuizConfig::new(1, 20));
        assert_eq!(m.record_incorrect_answer(500), MistakeOutcome::GameOver);
        assert!(m.state().is_over);
        assert_eq!(m.state().total_elapsed_on_end_ms, 500);
        assert!(m.summary().is_some_and(|s| !s.won));
    }

    #[test]
    fn test_advance_at_last_index_is_idempotent() {
        let mut m = machine(GameMode::Cards, pairs(2), QuizConfig::new(3, 20));
        m.advance_round(0);
        assert_eq!(m.state().current_word_index, 1);

        m.advance_round(100);
        m.advance_round(200);
        m.advance_round(300);
        assert_eq!(m.state().current_word_index, 1);
        assert!(!m.state().is_over);

        // Finish was scheduled by the first call
        m.update(100 + GAME_OVER_GRACE_MS);
        assert!(m.state().is_over);
        assert_eq!(m.state().current_word_index, 1);
    }

    #[test]
    fn test_elapsed_accumulates_across_rounds() {
        let mut m = machine(GameMode::Cards, pairs(2), QuizConfig::new(3, 20));
        m.advance_round(4_000);
        m.advance_round(6_000);
        m.update(6_000 + GAME_OVER_GRACE_MS);
        assert_eq!(m.state().total_elapsed_on_end_ms, 6_000 + GAME_OVER_GRACE_MS);
    }

    #[test]
    fn test_typed_timeout_keeps_word_and_resets_timer() {
        let mut m = machine(GameMode::Typed, pairs(2), QuizConfig::new(3, 2));
        m.update(1_000);
        assert_eq!(m.state().time_left_in_round, 1);
        m.update(2_000);
        assert_eq!(m.state().lives_remaining, 2);
        assert!(m.state().is_paused);

        m.update(2_000 + MISTAKE_PAUSE_MS);
        assert_eq!(m.state().current_word_index, 0);
        assert_eq!(m.state().time_left_in_round, 2);
        assert!(!m.state().is_paused);
    }

    #[test]
    fn test_quiz_first_timeout_is_free() {
        let mut m = machine(GameMode::Quiz, pairs(2), QuizConfig::new(3, 1));
        m.update(1_000);
        assert_eq!(m.state().lives_remaining, 3);
        assert_eq!(m.state().time_left_in_round, 1);
        m.update(2_000);
        assert_eq!(m.state().lives_remaining, 2);
    }

    #[test]
    fn test_untimed_sessions_never_tick() {
        let config = QuizConfig::new(3, 2).with_quiz_mode(false);
        let mut m = machine(GameMode::Typed, pairs(2), config);
        m.update(60_000);
        assert_eq!(m.state().time_left_in_round, 2);
        assert_eq!(m.state().lives_remaining, 3);

        let mut cards = machine(GameMode::Cards, pairs(2), QuizConfig::new(3, 2));
        cards.update(60_000);
        assert_eq!(cards.state().lives_remaining, 3);
    }

    #[test]
    fn test_global_time_limit_ends_session() {
        let config = QuizConfig::new(3, 100).with_global_time_limit(3);
        let mut m = machine(GameMode::Typed, pairs(2), config);
        m.update(2_000);
        assert!(!m.state().is_over);
        m.update(3_000);
        assert!(m.state().is_over);
        assert!(m.summary().is_some_and(|s| !s.won));
    }

    #[test]
    fn test_user_pause_freezes_countdown() {
        let mut m = machine(GameMode::Typed, pairs(2), QuizConfig::new(3, 10));
        m.update(1_000);
        m.pause();
        m.update(9_000);
        assert_eq!(m.state().time_left_in_round, 9);
        assert!(!m.record_correct_answer(9_000));

        m.resume(9_500);
        m.update(10_500);
        assert_eq!(m.state().time_left_in_round, 8);
    }

    #[test]
    fn test_restart_resets_and_cancels_pending() {
        let mut m = machine(GameMode::Quiz, pairs(3), QuizConfig::new(3, 20));
        m.record_incorrect_answer(0);
        let serial = m.round_serial();

        m.restart(50);
        assert!(m.pending().is_none());
        assert_eq!(m.state(), &SessionState::initial(m.config(), 50));
        assert!(m.round_serial() > serial);

        // The stale retry pause never fires
        m.update(50 + MISTAKE_PAUSE_MS);
        assert_eq!(m.state().lives_remaining, 3);
    }

    #[test]
    fn test_restart_cancels_feedback_in_flight() {
        let (mut m, held) = voiced_machine(GameMode::Quiz, pairs(3));
        assert!(m.record_correct_answer(0));
        assert!(matches!(m.pending(), Some(PendingStep { wait: Wait::Audio(_), .. })));

        m.restart(100);
        assert_eq!(held.borrow().cancelled, vec![1]);
        assert!(m.pending().is_none());

        // New answer speaks on playback 2; the old one finishing must not advance it
        assert!(m.record_correct_answer(200));
        held.borrow_mut().finished.insert(1, PlaybackStatus::Finished);
        m.update(200 + CORRECT_FEEDBACK_MIN_MS + 100);
        assert_eq!(m.state().current_word_index, 0);
        assert!(m.pending().is_some());

        held.borrow_mut().finished.insert(2, PlaybackStatus::Finished);
        m.update(200 + CORRECT_FEEDBACK_MIN_MS + 200);
        assert_eq!(m.state().current_word_index, 1);
        assert_eq!(m.state().completed_count, 1);
    }

    #[test]
    fn test_exit_cancels_feedback_in_flight() {
        let (mut m, held) = voiced_machine(GameMode::Typed, pairs(3));
        assert!(m.record_correct_answer(0));
        m.exit();
        assert_eq!(held.borrow().cancelled, vec![1]);
        assert!(m.pending().is_none());

        held.borrow_mut().finished.insert(1, PlaybackStatus::Finished);
        m.update(CORRECT_FEEDBACK_MIN_MS + 100);
        assert_eq!(m.state().current_word_index, 0);
        assert_eq!(m.state().completed_count, 1);
    }

    #[test]
    fn test_exit_stops_everything() {
        let mut m = machine(GameMode::Typed, pairs(2), QuizConfig::new(3, 1));
        m.exit();
        m.update(10_000);
        assert_eq!(m.state().lives_remaining, 3);
        assert!(!m.record_correct_answer(10_000));
    }

    #[test]
    fn test_bubble_combo_scoring_and_power_up() {
        let mut m = machine(GameMode::Bubble, pairs(4), QuizConfig::new(3, 20));
        let mut now = 0;
        for expected in [10, 20, 30] {
            assert!(m.record_match(1, now));
            let points = m.drain_events().iter().find_map(|e| match e {
                GameEvent::AnswerCorrect { points, .. } => Some(*points),
                _ => None,
            });
            assert_eq!(points, Some(expected));
            settle(&mut m, &mut now);
        }

        // Third match armed the only future word
        assert_eq!(m.combo().power_up_index(), Some(3));
        assert_eq!(m.state().current_word_index, 3);
        assert!(m.record_match(1, now));
        assert!(
            m.drain_events()
                .contains(&GameEvent::PowerUpCollected { bonus: POWER_UP_TIME_BONUS })
        );
        assert_eq!(m.state().score, 60);
    }

    #[test]
    fn test_miss_resets_combo_without_penalty() {
        let mut m = machine(GameMode::Bubble, pairs(4), QuizConfig::new(3, 20));
        let mut now = 0;
        m.record_match(1, now);
        settle(&mut m, &mut now);
        assert_eq!(m.combo().combo(), 1);

        m.record_miss();
        assert_eq!(m.combo().combo(), 0);
        assert_eq!(m.state().lives_remaining, 3);
        assert_eq!(m.state().fail_count, 0);
    }

    #[test]
    fn test_telemetry_and_play_count() {
        let log = Rc::new(RefCell::new(Recorded::default()));
        let reporter = Reporter::new(Box::new(Recorder(log.clone())), Box::new(Recorder(log.clone())));
        let setup = SessionSetup::new(pairs(1), QuizConfig::new(1, 20), GameMode::Typed)
            .with_meta(GameMeta::new("g7", "Animals"))
            .with_reporter(reporter);
        let mut m = SessionMachine::start(setup, 0).unwrap();
        m.record_incorrect_answer(10);

        let recorded = log.borrow();
        assert_eq!(
            recorded.events,
            vec!["play_started", "answer_incorrect", "game_over"]
        );
        assert_eq!(recorded.plays, vec!["g7".to_string()]);
    }

    #[test]
    fn test_shuffle_is_seeded_and_never_touches_source() {
        let words = pairs(8);
        let start = |seed| {
            let setup = SessionSetup::new(words.clone(), QuizConfig::default(), GameMode::Quiz)
                .with_shuffle(true)
                .with_seed(seed);
            SessionMachine::start(setup, 0).unwrap()
        };
        let a = start(42);
        let b = start(42);
        assert_eq!(a.words(), b.words());

        let mut sorted: Vec<_> = a.words().to_vec();
        sorted.sort_by(|x, y| x.first.cmp(&y.first));
        assert_eq!(sorted, words);
    }

    proptest! {
        #[test]
        fn lives_never_increase_and_over_matches_rule(
            outcomes in prop::collection::vec(0u8..3, 1..40)
        ) {
            let mut m = machine(GameMode::Typed, pairs(5), QuizConfig::new(3, 20));
            let mut now = 0u64;
            let mut lives = m.state().lives_remaining;
            for outcome in outcomes {
                match outcome {
                    0 => { m.record_correct_answer(now); }
                    1 => { m.record_incorrect_answer(now); }
                    _ => {}
                }
                settle(&mut m, &mut now);
                let state = m.state();
                prop_assert!(state.lives_remaining <= lives);
                lives = state.lives_remaining;
                prop_assert!(state.current_word_index < 5);
                prop_assert_eq!(state.star_rating, star_rating_for(state.fail_count));
                let exhausted = state.completed_count as usize == 5;
                prop_assert_eq!(state.is_over, state.lives_remaining == 0 || exhausted);
            }
        }
    }
}
