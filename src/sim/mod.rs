//! Deterministic play-time core
//!
//! All gameplay logic lives here. This module must stay pure and deterministic:
//! - Time comes in from the caller (`now_ms`, `dt`), never from a clock
//! - Seeded RNG only
//! - Physics reports outcomes; only `SessionMachine` mutates session state
//! - No rendering or platform dependencies

pub mod bubbles;
pub mod collision;
pub mod combo;
pub mod policy;
pub mod projectile;
pub mod session;
pub mod state;
pub mod tick;

pub use bubbles::{BubbleWorld, ShotOutcome};
pub use collision::{CollisionGroups, EulerPhysics, PhysicsBackend};
pub use combo::{ComboTracker, MatchReward};
pub use policy::{GameMode, ModePolicy, Scoring, TimeoutPolicy};
pub use projectile::{FlyingProjectile, ProjectileRig, Target, generate_targets};
pub use session::{AfterWait, MistakeOutcome, PendingStep, SessionMachine, SessionSetup, Wait};
pub use state::{GameEvent, SessionState, SessionSummary, star_rating_for, start_session};
pub use tick::{FixedStep, RoundTimer};

/// Narrow callback interface physics subsystems report through.
///
/// Implementors translate contacts into state-machine transitions; the
/// physics code itself never touches `SessionState`.
pub trait OutcomeListener {
    /// A projectile struck `target`
    fn on_hit(&mut self, target: &Target);
    /// `count` bodies matched the prompt
    fn on_match(&mut self, count: u32);
    /// A shot ended without a scoring contact
    fn on_miss(&mut self);
}
