//! Audio feedback synchronizer
//!
//! Plays a spoken rendition of a word (on-device speech, falling back to a
//! pre-rendered clip) and reports completion through a ticket the session
//! polls once per frame. A ticket resolves exactly once, never before its
//! minimum duration, and never blocks play: every failure path resolves.

use crate::consts::MAX_FEEDBACK_MS;
use crate::error::AudioError;

/// Backend-assigned handle for one playback
pub type PlaybackId = u64;

/// Playback progress as reported by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Finished,
    Failed,
}

/// What to say and how
#[derive(Debug, Clone, Copy)]
pub struct Utterance<'a> {
    pub text: &'a str,
    pub voice_id: Option<&'a str>,
    pub language_tag: Option<&'a str>,
    pub volume: f32,
}

/// On-device speech synthesis
pub trait SpeechSynth {
    /// Whether a voice for the request exists at all
    fn is_available(&self, voice_id: Option<&str>, language_tag: Option<&str>) -> bool;
    fn start(&mut self, utterance: &Utterance<'_>) -> Result<PlaybackId, AudioError>;
    fn status(&mut self, id: PlaybackId) -> PlaybackStatus;
    fn cancel(&mut self, id: PlaybackId);
}

/// Player for pre-rendered audio references (URLs)
pub trait ClipPlayer {
    fn play(&mut self, audio_ref: &str, volume: f32) -> Result<PlaybackId, AudioError>;
    fn status(&mut self, id: PlaybackId) -> PlaybackStatus;
    fn stop(&mut self, id: PlaybackId);
}

/// Synth with no voices (headless runs, tests)
#[derive(Debug, Default)]
pub struct NoSpeech;

impl SpeechSynth for NoSpeech {
    fn is_available(&self, _voice_id: Option<&str>, _language_tag: Option<&str>) -> bool {
        false
    }

    fn start(&mut self, _utterance: &Utterance<'_>) -> Result<PlaybackId, AudioError> {
        Err(AudioError::Unavailable)
    }

    fn status(&mut self, _id: PlaybackId) -> PlaybackStatus {
        PlaybackStatus::Failed
    }

    fn cancel(&mut self, _id: PlaybackId) {}
}

/// Clip player without an output device
#[derive(Debug, Default)]
pub struct NoClips;

impl ClipPlayer for NoClips {
    fn play(&mut self, _audio_ref: &str, _volume: f32) -> Result<PlaybackId, AudioError> {
        Err(AudioError::Unavailable)
    }

    fn status(&mut self, _id: PlaybackId) -> PlaybackStatus {
        PlaybackStatus::Failed
    }

    fn stop(&mut self, _id: PlaybackId) {}
}

/// Per-call options for [`AudioSynchronizer::speak`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakOptions {
    pub fallback_audio_ref: Option<String>,
    pub voice_id: Option<String>,
    pub language_tag: Option<String>,
    pub min_duration_ms: u64,
}

impl SpeakOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, audio_ref: Option<String>) -> Self {
        self.fallback_audio_ref = audio_ref;
        self
    }

    pub fn with_voice(mut self, voice_id: Option<String>) -> Self {
        self.voice_id = voice_id;
        self
    }

    pub fn with_language(mut self, language_tag: Option<String>) -> Self {
        self.language_tag = language_tag;
        self
    }

    pub fn with_min_duration(mut self, ms: u64) -> Self {
        self.min_duration_ms = ms;
        self
    }
}

/// Handle returned by `speak`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackTicket(u64);

/// How a feedback job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackPath {
    /// Empty text, nothing played
    Silent,
    /// Learner muted audio
    Muted,
    /// Speech played to completion
    Speech,
    /// Speech started and then failed (the fallback is not tried)
    SpeechInterrupted,
    /// Fallback clip played to completion
    Fallback,
    /// Fallback clip failed to start or to finish
    FallbackFailed,
    /// No speech and no fallback reference
    NoAudio,
    /// Cancelled by a newer call or by `cancel_all`
    Superseded,
    /// Backend never reported completion
    Watchdog,
}

/// Result of polling a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackPoll {
    Pending,
    Resolved(FeedbackPath),
    /// Never issued, or already resolved
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    Idle,
    Speech(PlaybackId),
    Clip(PlaybackId),
}

#[derive(Debug)]
struct Job {
    ticket: FeedbackTicket,
    started_at_ms: u64,
    min_duration_ms: u64,
    playback: Playback,
    path: FeedbackPath,
    detached: bool,
}

impl Job {
    fn playback_done(&self) -> bool {
        self.playback == Playback::Idle
    }

    fn resolvable(&self, now_ms: u64) -> bool {
        self.playback_done() && now_ms >= self.started_at_ms + self.min_duration_ms
    }
}

/// Sequences spoken feedback with game-state transitions
pub struct AudioSynchronizer {
    synth: Box<dyn SpeechSynth>,
    clips: Box<dyn ClipPlayer>,
    jobs: Vec<Job>,
    next_ticket: u64,
    master_volume: f32,
    muted: bool,
}

impl Default for AudioSynchronizer {
    fn default() -> Self {
        Self::silent()
    }
}

impl std::fmt::Debug for AudioSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioSynchronizer")
            .field("jobs", &self.jobs)
            .field("master_volume", &self.master_volume)
            .field("muted", &self.muted)
            .finish()
    }
}

impl AudioSynchronizer {
    pub fn new(synth: Box<dyn SpeechSynth>, clips: Box<dyn ClipPlayer>) -> Self {
        Self {
            synth,
            clips,
            jobs: Vec::new(),
            next_ticket: 1,
            master_volume: 1.0,
            muted: false,
        }
    }

    /// Synchronizer with no audio output; only minimum durations apply
    pub fn silent() -> Self {
        Self::new(Box::new(NoSpeech), Box::new(NoClips))
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all feedback
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    /// Start feedback for `text`. Poll the ticket until it resolves.
    ///
    /// Any playback still running from an earlier call is cancelled first.
    pub fn speak(&mut self, text: &str, options: &SpeakOptions, now_ms: u64) -> FeedbackTicket {
        self.begin(text, options, now_ms, false)
    }

    /// Fire-and-forget variant; the job cleans itself up once finished
    pub fn speak_detached(&mut self, text: &str, options: &SpeakOptions, now_ms: u64) {
        self.begin(text, options, now_ms, true);
    }

    fn begin(
        &mut self,
        text: &str,
        options: &SpeakOptions,
        now_ms: u64,
        detached: bool,
    ) -> FeedbackTicket {
        self.supersede_playing();

        let ticket = FeedbackTicket(self.next_ticket);
        self.next_ticket += 1;

        let (playback, path) = if text.trim().is_empty() {
            (Playback::Idle, FeedbackPath::Silent)
        } else if self.effective_volume() <= 0.0 {
            (Playback::Idle, FeedbackPath::Muted)
        } else {
            self.start_playback(text, options)
        };

        log::debug!("feedback {:?} for {:?}: {:?}", ticket, text, path);
        self.jobs.push(Job {
            ticket,
            started_at_ms: now_ms,
            min_duration_ms: options.min_duration_ms,
            playback,
            path,
            detached,
        });
        ticket
    }

    /// Speech first; the fallback clip only when speech never started
    fn start_playback(&mut self, text: &str, options: &SpeakOptions) -> (Playback, FeedbackPath) {
        let voice = options.voice_id.as_deref();
        let lang = options.language_tag.as_deref();
        let volume = self.effective_volume();

        if self.synth.is_available(voice, lang) {
            let utterance = Utterance {
                text,
                voice_id: voice,
                language_tag: lang,
                volume,
            };
            match self.synth.start(&utterance) {
                Ok(id) => return (Playback::Speech(id), FeedbackPath::Speech),
                Err(e) => log::warn!("speech failed to start, trying fallback: {}", e),
            }
        }

        match options.fallback_audio_ref.as_deref() {
            Some(audio_ref) => match self.clips.play(audio_ref, volume) {
                Ok(id) => (Playback::Clip(id), FeedbackPath::Fallback),
                Err(e) => {
                    log::warn!("fallback clip {} failed: {}", audio_ref, e);
                    (Playback::Idle, FeedbackPath::FallbackFailed)
                }
            },
            None => (Playback::Idle, FeedbackPath::NoAudio),
        }
    }

    fn supersede_playing(&mut self) {
        for job in &mut self.jobs {
            match job.playback {
                Playback::Speech(id) => self.synth.cancel(id),
                Playback::Clip(id) => self.clips.stop(id),
                Playback::Idle => continue,
            }
            job.playback = Playback::Idle;
            job.path = FeedbackPath::Superseded;
        }
    }

    /// Advance every job against its backend. Called by `poll`, and once per
    /// frame by owners that only issue detached feedback.
    pub fn pump(&mut self, now_ms: u64) {
        for job in &mut self.jobs {
            let status = match job.playback {
                Playback::Idle => continue,
                Playback::Speech(id) => self.synth.status(id),
                Playback::Clip(id) => self.clips.status(id),
            };
            match (job.playback, status) {
                (_, PlaybackStatus::Finished) => job.playback = Playback::Idle,
                (Playback::Speech(_), PlaybackStatus::Failed) => {
                    log::warn!("speech failed mid-playback for {:?}", job.ticket);
                    job.playback = Playback::Idle;
                    job.path = FeedbackPath::SpeechInterrupted;
                }
                (Playback::Clip(_), PlaybackStatus::Failed) => {
                    log::warn!("fallback clip failed mid-playback for {:?}", job.ticket);
                    job.playback = Playback::Idle;
                    job.path = FeedbackPath::FallbackFailed;
                }
                (playback, PlaybackStatus::Playing) => {
                    if now_ms.saturating_sub(job.started_at_ms) >= MAX_FEEDBACK_MS {
                        log::warn!("feedback {:?} exceeded watchdog, forcing completion", job.ticket);
                        match playback {
                            Playback::Speech(id) => self.synth.cancel(id),
                            Playback::Clip(id) => self.clips.stop(id),
                            Playback::Idle => {}
                        }
                        job.playback = Playback::Idle;
                        job.path = FeedbackPath::Watchdog;
                    }
                }
                (Playback::Idle, _) => {}
            }
        }
        self.jobs.retain(|j| !(j.detached && j.resolvable(now_ms)));
    }

    /// Check a ticket. Returns `Resolved` exactly once per ticket.
    pub fn poll(&mut self, ticket: FeedbackTicket, now_ms: u64) -> FeedbackPoll {
        self.pump(now_ms);
        let Some(pos) = self.jobs.iter().position(|j| j.ticket == ticket) else {
            return FeedbackPoll::Unknown;
        };
        if self.jobs[pos].resolvable(now_ms) {
            let job = self.jobs.remove(pos);
            FeedbackPoll::Resolved(job.path)
        } else {
            FeedbackPoll::Pending
        }
    }

    /// Stop all playback and forget every job (restart, unmount)
    pub fn cancel_all(&mut self) {
        self.supersede_playing();
        self.jobs.clear();
    }

    /// Whether any job is still outstanding
    pub fn is_busy(&self) -> bool {
        !self.jobs.is_empty()
    }
}
