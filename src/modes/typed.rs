//! Typed-answer drill
//!
//! The learner types the translation and submits. A wrong answer costs a
//! life and clears the input; the word stays until it is answered.

use super::{Answer, GameController, RoundSync};
use crate::error::ConfigError;
use crate::sim::{MistakeOutcome, SessionMachine, SessionSetup};
use crate::words::answers_match;

#[derive(Debug)]
pub struct TypedController {
    machine: SessionMachine,
    input: String,
    sync: RoundSync,
}

impl TypedController {
    pub fn new(setup: SessionSetup, now_ms: u64) -> Result<Self, ConfigError> {
        let mut controller = Self {
            machine: SessionMachine::start(setup, now_ms)?,
            input: String::new(),
            sync: RoundSync::default(),
        };
        controller.on_round_started();
        Ok(controller)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn on_typed_input_change(&mut self, text: &str) {
        if self.machine.is_accepting_input() {
            self.input = text.to_string();
        }
    }

    /// Check the current input against the expected translation
    pub fn submit(&mut self, now_ms: u64) -> Answer {
        if !self.machine.is_accepting_input() || self.input.trim().is_empty() {
            return Answer::Ignored;
        }
        let Some(pair) = self.machine.current_pair() else {
            return Answer::Ignored;
        };

        if answers_match(&self.input, &pair.second) {
            if self.machine.record_correct_answer(now_ms) {
                Answer::Correct
            } else {
                Answer::Ignored
            }
        } else {
            match self.machine.record_incorrect_answer(now_ms) {
                MistakeOutcome::Ignored => Answer::Ignored,
                outcome => {
                    self.input.clear();
                    Answer::Incorrect(outcome)
                }
            }
        }
    }
}

impl GameController for TypedController {
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
        self.input.clear();
    }
}
