//! Target shooting
//!
//! Striking the correct target answers the word; striking a wrong one costs
//! a life and reveals the answer. Shots that hit nothing are free.

use glam::Vec2;

use super::{GameController, RoundSync, SessionListener};
use crate::consts::TARGET_OPTIONS;
use crate::error::ConfigError;
use crate::sim::{EulerPhysics, PhysicsBackend, ProjectileRig, SessionMachine, SessionSetup, generate_targets};

#[derive(Debug)]
pub struct TargetController<P: PhysicsBackend = EulerPhysics> {
    machine: SessionMachine,
    rig: ProjectileRig<P>,
    total_options: usize,
    sync: RoundSync,
}

impl TargetController<EulerPhysics> {
    pub fn new(setup: SessionSetup, now_ms: u64) -> Result<Self, ConfigError> {
        Self::with_rig(setup, ProjectileRig::default(), TARGET_OPTIONS, now_ms)
    }
}

impl<P: PhysicsBackend> TargetController<P> {
    pub fn with_rig(
        setup: SessionSetup,
        rig: ProjectileRig<P>,
        total_options: usize,
        now_ms: u64,
    ) -> Result<Self, ConfigError> {
        let mut controller = Self {
            machine: SessionMachine::start(setup, now_ms)?,
            rig,
            total_options: total_options.max(1),
            sync: RoundSync::default(),
        };
        controller.on_round_started();
        Ok(controller)
    }

    pub fn rig(&self) -> &ProjectileRig<P> {
        &self.rig
    }

    /// Pointer down: start drawing
    pub fn on_aim_start(&mut self, now_ms: u64) {
        if self.machine.is_accepting_input() {
            self.rig.begin_draw(now_ms);
        }
    }

    /// Pointer moved (normalized device coords)
    pub fn on_aim_move(&mut self, pointer_ndc: Vec2, now_ms: u64) {
        self.rig.aim_move(pointer_ndc, now_ms);
    }

    /// Pointer up: fire
    pub fn on_release(&mut self, now_ms: u64) -> bool {
        if !self.machine.is_accepting_input() {
            self.rig.cancel_shot();
            return false;
        }
        self.rig.release(now_ms)
    }
}

impl<P: PhysicsBackend> GameController for TargetController<P> {
    fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    fn machine_mut(&mut self) -> &mut SessionMachine {
        &mut self.machine
    }

    fn update(&mut self, now_ms: u64, dt: f32) {
        if self.machine.is_accepting_input() {
            self.rig.refresh_draw(now_ms);
            let mut listener = SessionListener::new(&mut self.machine, now_ms);
            self.rig.step(dt, &mut listener);
        } else if self.rig.flying().is_some() || self.rig.is_drawing() {
            self.rig.cancel_shot();
        }

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
        let targets = generate_targets(words, index, total, rng);
        self.rig.set_targets(targets);
    }
}
