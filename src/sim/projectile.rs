//! Target-shooting subsystem
//!
//! Targets float on a forward arc in front of the launcher. The player drags
//! to aim (camera ray onto a fixed plane), holds to draw, and releases to
//! fire. While aiming, the target the predicted ballistic arc passes closest
//! to is highlighted. Flight runs in fixed substeps; the first target within
//! `HIT_RADIUS` is struck and the projectile lodges in it.

use glam::{Quat, Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::OutcomeListener;
use super::collision::{EulerPhysics, PhysicsBackend, ballistic_point, target_positions};
use super::tick::FixedStep;
use crate::consts::SUBSTEP_DT;
use crate::words::{DistractorFill, WordPair, build_options};

/// Constant downward acceleration
pub const GRAVITY: Vec3 = Vec3::new(0.0, -9.8, 0.0);
/// Launch speed at zero draw
pub const BASE_SPEED: f32 = 12.0;
/// Extra launch speed at full draw
pub const DRAW_BONUS: f32 = 14.0;
/// Hold time that reaches full draw
pub const TIME_TO_MAX_DRAW_MS: u64 = 1200;
/// A projectile this close to a target strikes it
pub const HIT_RADIUS: f32 = 0.6;
/// Discarded after travelling this far without a hit
pub const MAX_TRAVEL: f32 = 40.0;
/// Discarded below this altitude
pub const FLOOR_Y: f32 = -2.0;
/// Muzzle distance in front of the launcher pivot
pub const MUZZLE_OFFSET: f32 = 0.5;

/// Ballistic pre-selection samples and spacing
pub const PRESELECT_SAMPLES: u32 = 30;
pub const PRESELECT_DT: f32 = 0.05;

/// Target placement: distance band, half-spread (degrees) and height band
const TARGET_MIN_DISTANCE: f32 = 8.0;
const TARGET_MAX_DISTANCE: f32 = 14.0;
const TARGET_HALF_SPREAD_DEG: f32 = 40.0;
const TARGET_MIN_HEIGHT: f32 = 0.5;
const TARGET_MAX_HEIGHT: f32 = 3.0;
/// Angular jitter as a fraction of one slot
const SLOT_JITTER: f32 = 0.2;

/// One labelled target for the current round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub position: Vec3,
    pub word: String,
    pub is_correct: bool,
}

/// Build the targets for the pair at `index`: the correct `second` plus
/// up to `total - 1` distinct distractors, each in its own angular slot.
pub fn generate_targets<R: Rng>(
    pairs: &[WordPair],
    index: usize,
    total: usize,
    rng: &mut R,
) -> Vec<Target> {
    let (options, correct_slot) = build_options(pairs, index, total, DistractorFill::Distinct, rng);
    let slots = options.len().max(1) as f32;
    let slot_width = 2.0 * TARGET_HALF_SPREAD_DEG / slots;

    options
        .into_iter()
        .enumerate()
        .map(|(slot, word)| {
            let center = -TARGET_HALF_SPREAD_DEG + slot_width * (slot as f32 + 0.5);
            let jitter = rng.random_range(-SLOT_JITTER..SLOT_JITTER) * slot_width;
            let angle = (center + jitter).to_radians();
            let distance = rng.random_range(TARGET_MIN_DISTANCE..TARGET_MAX_DISTANCE);
            let height = rng.random_range(TARGET_MIN_HEIGHT..TARGET_MAX_HEIGHT);
            Target {
                position: Vec3::new(angle.sin() * distance, height, -angle.cos() * distance),
                word,
                is_correct: slot == correct_slot,
            }
        })
        .collect()
}

/// Fraction of full draw after holding for `held_ms`
#[inline]
pub fn draw_amount_for(held_ms: u64) -> f32 {
    (held_ms as f32 / TIME_TO_MAX_DRAW_MS as f32).clamp(0.0, 1.0)
}

/// Launch speed for a draw amount in [0, 1]
#[inline]
pub fn launch_speed(draw_amount: f32) -> f32 {
    BASE_SPEED + DRAW_BONUS * draw_amount.clamp(0.0, 1.0)
}

/// Orientation facing `direction` (launcher forward is -Z)
pub fn facing(direction: Vec3) -> Option<Quat> {
    let dir = direction.normalize_or_zero();
    (dir != Vec3::ZERO).then(|| Quat::from_rotation_arc(Vec3::NEG_Z, dir))
}

/// Target whose position comes closest to any sampled point of the arc
pub fn preselect_target(origin: Vec3, velocity: Vec3, gravity: Vec3, targets: &[Vec3]) -> Option<usize> {
    let samples: Vec<Vec3> = (1..=PRESELECT_SAMPLES)
        .map(|k| ballistic_point(origin, velocity, gravity, k as f32 * PRESELECT_DT))
        .collect();

    targets
        .iter()
        .enumerate()
        .map(|(i, target)| {
            let closest = samples
                .iter()
                .map(|p| p.distance_squared(*target))
                .fold(f32::INFINITY, f32::min);
            (i, closest)
        })
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

/// Pinhole camera looking down -Z
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub fov_y_radians: f32,
    pub aspect: f32,
    /// World z of the plane aim rays are projected onto
    pub aim_plane_z: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.5, 0.0),
            fov_y_radians: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            aim_plane_z: -10.0,
        }
    }
}

impl Camera {
    /// Ray direction through a pointer in normalized device coords (-1..1)
    pub fn ray(&self, ndc: Vec2) -> Vec3 {
        let half = (self.fov_y_radians * 0.5).tan();
        Vec3::new(ndc.x * half * self.aspect, ndc.y * half, -1.0).normalize()
    }

    /// Where the pointer ray meets the aim plane
    pub fn aim_point(&self, ndc: Vec2) -> Option<Vec3> {
        let dir = self.ray(ndc);
        if dir.z > -1e-6 {
            return None;
        }
        let t = (self.aim_plane_z - self.position.z) / dir.z;
        (t > 0.0).then(|| self.position + dir * t)
    }
}

/// A projectile in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlyingProjectile {
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    /// Target highlighted at release (for presentation only)
    pub bind_target: Option<usize>,
    pub alive: bool,
    pub travelled: f32,
}

/// A projectile stuck in the target it struck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodgedProjectile {
    pub position: Vec3,
    pub orientation: Quat,
    pub target: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Draw {
    started_at_ms: u64,
}

/// Aim, draw, flight and hit resolution for one launcher
#[derive(Debug, Clone)]
pub struct ProjectileRig<P: PhysicsBackend = EulerPhysics> {
    physics: P,
    camera: Camera,
    launcher: Vec3,
    orientation: Quat,
    aim_point: Option<Vec3>,
    draw: Option<Draw>,
    draw_amount: f32,
    targets: Vec<Target>,
    highlighted: Option<usize>,
    flying: Option<FlyingProjectile>,
    lodged: Vec<LodgedProjectile>,
    stepper: FixedStep,
}

impl Default for ProjectileRig<EulerPhysics> {
    fn default() -> Self {
        let camera = Camera::default();
        Self::new(EulerPhysics, camera, camera.position)
    }
}

impl<P: PhysicsBackend> ProjectileRig<P> {
    pub fn new(physics: P, camera: Camera, launcher: Vec3) -> Self {
        Self {
            physics,
            camera,
            launcher,
            orientation: Quat::IDENTITY,
            aim_point: None,
            draw: None,
            draw_amount: 0.0,
            targets: Vec::new(),
            highlighted: None,
            flying: None,
            lodged: Vec::new(),
            stepper: FixedStep::default(),
        }
    }

    /// Install a new round's targets, clearing everything from the last one
    pub fn set_targets(&mut self, targets: Vec<Target>) {
        self.reset_round();
        self.targets = targets;
    }

    /// Drop flight, lodged projectiles and aim/draw state
    pub fn reset_round(&mut self) {
        self.flying = None;
        self.lodged.clear();
        self.draw = None;
        self.draw_amount = 0.0;
        self.highlighted = None;
        self.aim_point = None;
        self.stepper.reset();
    }

    /// Drop only the shot in flight and any draw in progress
    pub fn cancel_shot(&mut self) {
        self.flying = None;
        self.draw = None;
        self.draw_amount = 0.0;
        self.highlighted = None;
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn highlighted(&self) -> Option<&Target> {
        self.highlighted.and_then(|i| self.targets.get(i))
    }

    pub fn flying(&self) -> Option<&FlyingProjectile> {
        self.flying.as_ref()
    }

    pub fn lodged(&self) -> &[LodgedProjectile] {
        &self.lodged
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn aim_point(&self) -> Option<Vec3> {
        self.aim_point
    }

    pub fn draw_amount(&self) -> f32 {
        self.draw_amount
    }

    pub fn is_drawing(&self) -> bool {
        self.draw.is_some()
    }

    fn muzzle(&self) -> Vec3 {
        self.launcher + self.orientation * (Vec3::NEG_Z * MUZZLE_OFFSET)
    }

    fn launch_velocity(&self) -> Vec3 {
        (self.orientation * Vec3::NEG_Z) * launch_speed(self.draw_amount)
    }

    /// Start drawing. Ignored while a projectile is in flight.
    pub fn begin_draw(&mut self, now_ms: u64) -> bool {
        if self.flying.is_some() || self.draw.is_some() {
            return false;
        }
        self.draw = Some(Draw { started_at_ms: now_ms });
        self.draw_amount = 0.0;
        true
    }

    /// Pointer moved: re-aim, then refresh the draw and the highlight
    pub fn aim_move(&mut self, pointer_ndc: Vec2, now_ms: u64) {
        if let Some(aim) = self.camera.aim_point(pointer_ndc) {
            self.aim_point = Some(aim);
            if let Some(q) = facing(aim - self.launcher) {
                self.orientation = q;
            }
        }
        self.refresh_draw(now_ms);
    }

    /// Recompute the draw amount and the ballistic highlight. Called every
    /// frame while drawing, since the predicted arc changes with the draw
    /// even when the pointer holds still.
    pub fn refresh_draw(&mut self, now_ms: u64) {
        let Some(draw) = self.draw else {
            return;
        };
        self.draw_amount = draw_amount_for(now_ms.saturating_sub(draw.started_at_ms));
        self.highlighted = preselect_target(
            self.muzzle(),
            self.launch_velocity(),
            GRAVITY,
            &target_positions(&self.targets),
        );
    }

    /// Fire. Returns false if no draw was in progress.
    pub fn release(&mut self, now_ms: u64) -> bool {
        if self.draw.is_none() {
            return false;
        }
        self.refresh_draw(now_ms);
        self.draw = None;
        let velocity = self.launch_velocity();
        log::debug!(
            "projectile released at draw {:.2}, speed {:.1}",
            self.draw_amount,
            velocity.length()
        );

        self.flying = Some(FlyingProjectile {
            position: self.muzzle(),
            velocity,
            orientation: self.orientation,
            bind_target: self.highlighted,
            alive: true,
            travelled: 0.0,
        });
        self.draw_amount = 0.0;
        true
    }

    /// Advance the projectile by a frame delta, reporting a hit or a miss
    pub fn step(&mut self, frame_dt: f32, listener: &mut dyn OutcomeListener) {
        if self.flying.is_none() {
            self.stepper.reset();
            return;
        }
        let positions = target_positions(&self.targets);

        for _ in 0..self.stepper.accumulate(frame_dt) {
            let Some(mut shot) = self.flying.take() else {
                return;
            };

            let (position, velocity) = self.physics.integrate(shot.position, shot.velocity, SUBSTEP_DT, GRAVITY);
            shot.travelled += position.distance(shot.position);
            shot.position = position;
            shot.velocity = velocity;
            if let Some(q) = facing(velocity) {
                shot.orientation = q;
            }

            if let Some(hit) = self
                .physics
                .detect_nearest_within_radius(shot.position, &positions, HIT_RADIUS)
            {
                shot.alive = false;
                self.lodged.push(LodgedProjectile {
                    position: shot.position,
                    orientation: shot.orientation,
                    target: hit,
                });
                let target = self.targets[hit].clone();
                log::debug!("projectile hit '{}' (correct: {})", target.word, target.is_correct);
                listener.on_hit(&target);
                return;
            }

            if shot.travelled > MAX_TRAVEL || shot.position.y < FLOOR_Y {
                log::debug!("projectile discarded after {:.1}m", shot.travelled);
                listener.on_miss();
                return;
            }

            self.flying = Some(shot);
        }
    }
}
