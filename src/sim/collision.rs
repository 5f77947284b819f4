//! Physics primitives shared by the projectile and bubble subsystems
//!
//! Both subsystems only need two things from a physics stack: advance a body
//! and find the closest candidate in range. `PhysicsBackend` is that seam;
//! `EulerPhysics` is the built-in implementation.

use glam::Vec3;

use super::projectile::Target;

/// Minimal physics interface the play subsystems are written against
pub trait PhysicsBackend {
    /// Advance one body by `dt` under constant acceleration.
    /// Returns the new (position, velocity).
    fn integrate(&self, position: Vec3, velocity: Vec3, dt: f32, gravity: Vec3) -> (Vec3, Vec3);

    /// Index of the candidate closest to `point`, if any lies within `radius`
    fn detect_nearest_within_radius(
        &self,
        point: Vec3,
        candidates: &[Vec3],
        radius: f32,
    ) -> Option<usize> {
        detect_nearest_within_radius(point, candidates, radius)
    }
}

/// Semi-implicit Euler: velocity first, then position with the new velocity
#[derive(Debug, Clone, Copy, Default)]
pub struct EulerPhysics;

impl PhysicsBackend for EulerPhysics {
    fn integrate(&self, position: Vec3, velocity: Vec3, dt: f32, gravity: Vec3) -> (Vec3, Vec3) {
        integrate(position, velocity, dt, gravity)
    }
}

/// Semi-implicit Euler step
#[inline]
pub fn integrate(position: Vec3, velocity: Vec3, dt: f32, gravity: Vec3) -> (Vec3, Vec3) {
    let velocity = velocity + gravity * dt;
    (position + velocity * dt, velocity)
}

/// Closed-form ballistic position after `t` seconds
#[inline]
pub fn ballistic_point(origin: Vec3, velocity: Vec3, gravity: Vec3, t: f32) -> Vec3 {
    origin + velocity * t + 0.5 * gravity * t * t
}

/// Nearest candidate strictly within `radius` of `point`
pub fn detect_nearest_within_radius(point: Vec3, candidates: &[Vec3], radius: f32) -> Option<usize> {
    let radius_sq = radius * radius;
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.distance_squared(point)))
        .filter(|&(_, d)| d < radius_sq)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Reflect only the component along `normal`, scaled by `restitution`.
/// The tangential component is kept as is.
#[inline]
pub fn reflect_damped(velocity: Vec3, normal: Vec3, restitution: f32) -> Vec3 {
    velocity - (1.0 + restitution) * velocity.dot(normal) * normal
}

/// Target positions in list order, for the nearest-candidate queries
pub fn target_positions(targets: &[Target]) -> Vec<Vec3> {
    targets.iter().map(|t| t.position).collect()
}

/// Collision group bitmask pair: a body is in `memberships` and accepts
/// contacts from bodies in `filter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionGroups {
    pub memberships: u32,
    pub filter: u32,
}

impl CollisionGroups {
    pub const fn new(memberships: u32, filter: u32) -> Self {
        Self {
            memberships,
            filter,
        }
    }

    /// Both sides must accept each other for a contact to be generated
    #[inline]
    pub fn interacts_with(&self, other: &CollisionGroups) -> bool {
        (self.memberships & other.filter) != 0 && (other.memberships & self.filter) != 0
    }
}
