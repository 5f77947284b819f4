//! Rigid-body matching world
//!
//! One shot bubble carrying the prompt is launched at a row of floating target
//! bubbles. Touching the target that carries the expected answer pops both;
//! touching any other target only discards the shot. Shots may bounce off the
//! side and top walls a limited number of times.
//!
//! Three collision groups keep the contact rules honest:
//! targets only meet shots, walls only meet shots, shots meet both.
//! The world has no gravity and is locked to the z = 0 plane.

use glam::Vec3;

use super::OutcomeListener;
use super::collision::{CollisionGroups, EulerPhysics, PhysicsBackend, reflect_damped};
use super::tick::FixedStep;
use crate::consts::SUBSTEP_DT;

pub const GROUP_TARGETS: u32 = 1 << 0;
pub const GROUP_SHOTS: u32 = 1 << 1;
pub const GROUP_WALLS: u32 = 1 << 2;

pub const TARGET_GROUPS: CollisionGroups = CollisionGroups::new(GROUP_TARGETS, GROUP_SHOTS);
pub const SHOT_GROUPS: CollisionGroups = CollisionGroups::new(GROUP_SHOTS, GROUP_TARGETS | GROUP_WALLS);
pub const WALL_GROUPS: CollisionGroups = CollisionGroups::new(GROUP_WALLS, GROUP_SHOTS);

pub const LAUNCH_POSITION: Vec3 = Vec3::new(0.0, -4.0, 0.0);
pub const LAUNCH_SPEED: f32 = 9.0;
pub const SHOT_RADIUS: f32 = 0.45;
pub const TARGET_RADIUS: f32 = 0.8;
pub const SHOT_LINEAR_DAMPING: f32 = 0.3;
pub const WALL_RESTITUTION: f32 = 0.8;
/// Wall bounces a shot survives
pub const MAX_BOUNCES: u32 = 1;
pub const SHOT_LIFETIME_SECS: f32 = 4.0;

pub const ARENA_HALF_WIDTH: f32 = 5.0;
pub const ARENA_TOP: f32 = 5.0;
/// Shots below this are gone
pub const ARENA_BOTTOM: f32 = -5.5;
pub const TARGET_ROW_Y: f32 = 3.0;
pub const TARGET_SPACING: f32 = 3.0;

/// Stable body handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(u32);

/// Collider shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderDesc {
    Ball { radius: f32 },
    /// Half-space boundary: inside where `normal · p - offset > 0`
    Plane { normal: Vec3, offset: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyKind {
    Target { word: String },
    Shot { prompt: String, bounces: u32, age: f32 },
    Wall,
}

/// Builder for a body before it enters the world
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub collider: ColliderDesc,
    pub groups: CollisionGroups,
    pub linear_damping: f32,
}

impl BodyDesc {
    /// Floating target bubble labelled with a candidate answer
    pub fn target(word: impl Into<String>) -> Self {
        Self {
            kind: BodyKind::Target { word: word.into() },
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            collider: ColliderDesc::Ball {
                radius: TARGET_RADIUS,
            },
            groups: TARGET_GROUPS,
            linear_damping: 0.0,
        }
    }

    /// Shot bubble carrying the prompt, starting at the launch point
    pub fn shot(prompt: impl Into<String>) -> Self {
        Self {
            kind: BodyKind::Shot {
                prompt: prompt.into(),
                bounces: 0,
                age: 0.0,
            },
            position: LAUNCH_POSITION,
            velocity: Vec3::ZERO,
            collider: ColliderDesc::Ball { radius: SHOT_RADIUS },
            groups: SHOT_GROUPS,
            linear_damping: SHOT_LINEAR_DAMPING,
        }
    }

    /// Static boundary
    pub fn wall(normal: Vec3, offset: f32) -> Self {
        Self {
            kind: BodyKind::Wall,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            collider: ColliderDesc::Plane { normal, offset },
            groups: WALL_GROUPS,
            linear_damping: 0.0,
        }
    }

    pub fn with_position(mut self, pos: Vec3) -> Self {
        self.position = pos;
        self
    }

    pub fn with_velocity(mut self, vel: Vec3) -> Self {
        self.velocity = vel;
        self
    }

    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub collider: ColliderDesc,
    pub groups: CollisionGroups,
    pub linear_damping: f32,
}

impl Body {
    fn radius(&self) -> f32 {
        match self.collider {
            ColliderDesc::Ball { radius } => radius,
            ColliderDesc::Plane { .. } => 0.0,
        }
    }

    pub fn is_shot(&self) -> bool {
        matches!(self.kind, BodyKind::Shot { .. })
    }

    pub fn is_target(&self) -> bool {
        matches!(self.kind, BodyKind::Target { .. })
    }

    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            BodyKind::Target { word } => Some(word),
            BodyKind::Shot { prompt, .. } => Some(prompt),
            BodyKind::Wall => None,
        }
    }
}

/// How a shot's step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    /// Matching target popped together with the shot
    Matched { target: BodyId },
    /// Touched a non-matching target; only the shot is gone
    WrongTarget,
    /// Reflected off a wall and still flying
    WallBounce,
    /// Hit a wall with no bounces left
    BouncesExhausted,
    Expired,
    OutOfBounds,
}

/// The bubble arena for one session
#[derive(Debug, Clone)]
pub struct BubbleWorld<P: PhysicsBackend = EulerPhysics> {
    physics: P,
    bodies: Vec<Body>,
    next_id: u32,
    stepper: FixedStep,
    expected: String,
}

impl Default for BubbleWorld<EulerPhysics> {
    fn default() -> Self {
        Self::new(EulerPhysics)
    }
}

impl<P: PhysicsBackend> BubbleWorld<P> {
    /// Arena with left, right and top walls and no bubbles yet
    pub fn new(physics: P) -> Self {
        let mut world = Self {
            physics,
            bodies: Vec::new(),
            next_id: 0,
            stepper: FixedStep::default(),
            expected: String::new(),
        };
        world.spawn(BodyDesc::wall(Vec3::X, -ARENA_HALF_WIDTH));
        world.spawn(BodyDesc::wall(Vec3::NEG_X, -ARENA_HALF_WIDTH));
        world.spawn(BodyDesc::wall(Vec3::NEG_Y, -ARENA_TOP));
        world
    }

    /// Add a body. Depth is locked on entry.
    pub fn spawn(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        let mut position = desc.position;
        position.z = 0.0;
        let mut velocity = desc.velocity;
        velocity.z = 0.0;
        self.bodies.push(Body {
            id,
            kind: desc.kind,
            position,
            velocity,
            collider: desc.collider,
            groups: desc.groups,
            linear_damping: desc.linear_damping,
        });
        id
    }

    pub fn remove(&mut self, id: BodyId) -> bool {
        let before = self.bodies.len();
        self.bodies.retain(|b| b.id != id);
        self.bodies.len() != before
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn targets(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().filter(|b| b.is_target())
    }

    pub fn shots(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().filter(|b| b.is_shot())
    }

    pub fn has_active_shot(&self) -> bool {
        self.bodies.iter().any(Body::is_shot)
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Lay out a new round: one target per option in a centred row
    pub fn setup_round(&mut self, expected: impl Into<String>, options: &[String]) {
        self.clear_round();
        self.expected = expected.into();

        let first_x = -TARGET_SPACING * (options.len().saturating_sub(1)) as f32 * 0.5;
        for (i, word) in options.iter().enumerate() {
            let x = first_x + TARGET_SPACING * i as f32;
            self.spawn(BodyDesc::target(word.clone()).with_position(Vec3::new(x, TARGET_ROW_Y, 0.0)));
        }
        log::debug!("bubble round set up with {} targets", options.len());
    }

    /// Remove every target and shot; walls stay
    pub fn clear_round(&mut self) {
        self.bodies.retain(|b| matches!(b.kind, BodyKind::Wall));
        self.stepper.reset();
    }

    /// Remove shots only
    pub fn clear_shots(&mut self) {
        self.bodies.retain(|b| !b.is_shot());
    }

    /// Launch the prompt bubble along `aim`. Only one shot flies at a time.
    pub fn launch(&mut self, prompt: &str, aim: Vec3) -> Option<BodyId> {
        if self.has_active_shot() {
            return None;
        }
        let dir = Vec3::new(aim.x, aim.y, 0.0).normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        Some(self.spawn(BodyDesc::shot(prompt).with_velocity(dir * LAUNCH_SPEED)))
    }

    /// Advance by a frame delta. Outcomes go to `listener` and are returned.
    pub fn step(&mut self, frame_dt: f32, listener: &mut dyn OutcomeListener) -> Vec<ShotOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..self.stepper.accumulate(frame_dt) {
            self.substep(SUBSTEP_DT, listener, &mut outcomes);
        }
        outcomes
    }

    fn substep(&mut self, dt: f32, listener: &mut dyn OutcomeListener, outcomes: &mut Vec<ShotOutcome>) {
        for body in &mut self.bodies {
            if matches!(body.kind, BodyKind::Wall) {
                continue;
            }
            let (position, velocity) = self.physics.integrate(body.position, body.velocity, dt, Vec3::ZERO);
            body.velocity = velocity / (1.0 + dt * body.linear_damping);
            body.position = position;
            // Depth lock
            body.position.z = 0.0;
            body.velocity.z = 0.0;
            if let BodyKind::Shot { age, .. } = &mut body.kind {
                *age += dt;
            }
        }

        let shot_ids: Vec<BodyId> = self.shots().map(|b| b.id).collect();
        for id in shot_ids {
            let Some(outcome) = self.resolve_shot(id) else {
                continue;
            };
            match outcome {
                ShotOutcome::Matched { .. } => listener.on_match(1),
                ShotOutcome::WallBounce => {}
                _ => listener.on_miss(),
            }
            outcomes.push(outcome);
        }
    }

    fn resolve_shot(&mut self, id: BodyId) -> Option<ShotOutcome> {
        let shot = self.body(id)?.clone();
        let BodyKind::Shot { prompt, bounces, age } = &shot.kind else {
            return None;
        };

        // Nearest target in contact
        let contact = self
            .bodies
            .iter()
            .filter(|b| b.is_target() && shot.groups.interacts_with(&b.groups))
            .map(|b| (b, b.position.distance(shot.position)))
            .filter(|(b, d)| *d < shot.radius() + b.radius())
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(b, _)| (b.id, b.word() == Some(self.expected.as_str())));

        if let Some((target, is_match)) = contact {
            self.remove(id);
            if is_match {
                self.remove(target);
                log::debug!("'{}' matched", prompt);
                return Some(ShotOutcome::Matched { target });
            }
            log::debug!("'{}' touched a wrong target", prompt);
            return Some(ShotOutcome::WrongTarget);
        }

        let wall_hit = self
            .bodies
            .iter()
            .filter(|b| shot.groups.interacts_with(&b.groups))
            .find_map(|b| match b.collider {
                ColliderDesc::Plane { normal, offset } => {
                    let depth = normal.dot(shot.position) - offset;
                    (depth < shot.radius() && shot.velocity.dot(normal) < 0.0).then_some((normal, depth))
                }
                ColliderDesc::Ball { .. } => None,
            });

        if let Some((normal, depth)) = wall_hit {
            if *bounces >= MAX_BOUNCES {
                self.remove(id);
                return Some(ShotOutcome::BouncesExhausted);
            }
            let radius = shot.radius();
            if let Some(body) = self.bodies.iter_mut().find(|b| b.id == id) {
                body.velocity = reflect_damped(body.velocity, normal, WALL_RESTITUTION);
                body.position += normal * (radius - depth);
                if let BodyKind::Shot { bounces, .. } = &mut body.kind {
                    *bounces += 1;
                }
            }
            return Some(ShotOutcome::WallBounce);
        }

        if *age >= SHOT_LIFETIME_SECS {
            self.remove(id);
            return Some(ShotOutcome::Expired);
        }
        if shot.position.y < ARENA_BOTTOM {
            self.remove(id);
            return Some(ShotOutcome::OutOfBounds);
        }
        None
    }
}
