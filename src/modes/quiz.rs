//! Multiple-choice quiz

use super::{Answer, GameController, RoundSync};
use crate::consts::QUIZ_OPTIONS;
use crate::error::ConfigError;
use crate::sim::{MistakeOutcome, SessionMachine, SessionSetup};
use crate::words::{DistractorFill, build_options};

#[derive(Debug)]
pub struct QuizController {
    machine: SessionMachine,
    total_options: usize,
    options: Vec<String>,
    correct: usize,
    /// Wrong picks on the current word (greyed out)
    rejected: Vec<usize>,
    sync: RoundSync,
}

impl QuizController {
    pub fn new(setup: SessionSetup, now_ms: u64) -> Result<Self, ConfigError> {
        Self::with_options(setup, QUIZ_OPTIONS, now_ms)
    }

    pub fn with_options(setup: SessionSetup, total_options: usize, now_ms: u64) -> Result<Self, ConfigError> {
        let mut controller = Self {
            machine: SessionMachine::start(setup, now_ms)?,
            total_options: total_options.max(1),
            options: Vec::new(),
            correct: 0,
            rejected: Vec::new(),
            sync: RoundSync::default(),
        };
        controller.on_round_started();
        Ok(controller)
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn rejected(&self) -> &[usize] {
        &self.rejected
    }

    /// Index of the correct option, only while it is being revealed
    pub fn revealed(&self) -> Option<usize> {
        self.machine.is_revealing().then_some(self.correct)
    }

    pub fn on_option_select(&mut self, option: usize, now_ms: u64) -> Answer {
        if !self.machine.is_accepting_input() || option >= self.options.len() || self.rejected.contains(&option) {
            return Answer::Ignored;
        }
        if option == self.correct {
            return if self.machine.record_correct_answer(now_ms) {
                Answer::Correct
            } else {
                Answer::Ignored
            };
        }
        match self.machine.record_incorrect_answer(now_ms) {
            MistakeOutcome::Ignored => Answer::Ignored,
            outcome => {
                self.rejected.push(option);
                Answer::Incorrect(outcome)
            }
        }
    }
}

impl GameController for QuizController {
    fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    fn machine_mut(&mut self) -> &mut SessionMachine {
        &mut self.machine
    }

    fn update(&mut self, now_ms: u64, _dt: f32) {
        self.machine.update(now_ms);
        if self.sync.changed(&self.machine) {
            self.on_round_started();
        }
    }

    fn on_round_started(&mut self) {
        self.sync.changed(&self.machine);
        let index = self.machine.state().current_word_index;
        let total = self.total_options;
        let (words, rng) = self.machine.words_and_rng();
        let (options, correct) = build_options(words, index, total, DistractorFill::Distinct, rng);
        self.options = options;
        self.correct = correct;
        self.rejected.clear();
    }
}
