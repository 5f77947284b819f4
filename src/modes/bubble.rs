//! Bubble matching
//!
//! The prompt rides on a shot bubble; the learner flicks it at the target
//! bubble carrying its translation. A wrong contact only loses the shot and
//! the combo. Running out of round time is still a mistake.

use glam::{Vec2, Vec3};

use super::{GameController, RoundSync, SessionListener};
use crate::consts::BUBBLE_TARGETS;
use crate::error::ConfigError;
use crate::sim::bubbles::LAUNCH_POSITION;
use crate::sim::{BubbleWorld, EulerPhysics, PhysicsBackend, SessionMachine, SessionSetup};
use crate::words::{DistractorFill, build_options};

#[derive(Debug)]
pub struct BubbleController<P: PhysicsBackend = EulerPhysics> {
    machine: SessionMachine,
    world: BubbleWorld<P>,
    aim: Vec3,
    sync: RoundSync,
}

impl BubbleController<EulerPhysics> {
    pub fn new(setup: SessionSetup, now_ms: u64) -> Result<Self, ConfigError> {
        Self::with_world(setup, BubbleWorld::default(), now_ms)
    }
}

impl<P: PhysicsBackend> BubbleController<P> {
    pub fn with_world(setup: SessionSetup, world: BubbleWorld<P>, now_ms: u64) -> Result<Self, ConfigError> {
        let mut controller = Self {
            machine: SessionMachine::start(setup, now_ms)?,
            world,
            aim: Vec3::Y,
            sync: RoundSync::default(),
        };
        controller.on_round_started();
        Ok(controller)
    }

    pub fn world(&self) -> &BubbleWorld<P> {
        &self.world
    }

    pub fn aim(&self) -> Vec3 {
        self.aim
    }

    /// Pointer moved to a point in arena coordinates; aim from the launcher
    pub fn on_aim_move(&mut self, pointer: Vec2) {
        let dir = (pointer.extend(0.0) - LAUNCH_POSITION).normalize_or_zero();
        if dir != Vec3::ZERO {
            self.aim = dir;
        }
    }

    /// Launch the prompt bubble. False while gated or while a shot is in flight.
    pub fn on_release(&mut self) -> bool {
        if !self.machine.is_accepting_input() {
            return false;
        }
        let prompt = self
            .machine
            .current_pair()
            .map(|p| p.first.clone())
            .unwrap_or_default();
        self.world.launch(&prompt, self.aim).is_some()
    }
}

impl<P: PhysicsBackend> GameController for BubbleController<P> {
    fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    fn machine_mut(&mut self) -> &mut SessionMachine {
        &mut self.machine
    }

    fn update(&mut self, now_ms: u64, dt: f32) {
        if self.machine.is_accepting_input() {
            let mut listener = SessionListener::new(&mut self.machine, now_ms);
            self.world.step(dt, &mut listener);
        } else if self.world.has_active_shot() {
            self.world.clear_shots();
        }

        self.machine.update(now_ms);
        if self.sync.changed(&self.machine) {
            self.on_round_started();
        }
    }

    fn on_round_started(&mut self) {
        self.sync.changed(&self.machine);
        let index = self.machine.state().current_word_index;
        let (words, rng) = self.machine.words_and_rng();
        let (options, _) = build_options(words, index, BUBBLE_TARGETS, DistractorFill::Repeat, rng);
        let expected = words[index].second.clone();
        self.world.setup_round(expected, &options);
    }
}
