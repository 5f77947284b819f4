//! Timers driving the simulation
//!
//! The round countdown runs on its own fixed interval, independent of frame
//! rate. Physics runs in fixed substeps carved out of each frame's delta.

use crate::consts::{MAX_SUBSTEPS, ROUND_TICK_MS, SUBSTEP_DT};

/// Cancellable repeating timer (one tick per `interval_ms`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTimer {
    interval_ms: u64,
    next_tick_at: Option<u64>,
}

impl Default for RoundTimer {
    fn default() -> Self {
        Self::new(ROUND_TICK_MS)
    }
}

impl RoundTimer {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            next_tick_at: None,
        }
    }

    /// (Re)arm the timer; the first tick fires one interval from `now_ms`
    pub fn start(&mut self, now_ms: u64) {
        self.next_tick_at = Some(now_ms + self.interval_ms);
    }

    /// Tear the timer down; no ticks fire until `start` is called again
    pub fn cancel(&mut self) {
        self.next_tick_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_tick_at.is_some()
    }

    /// Number of ticks due at `now_ms`. Catches up if frames were slow.
    pub fn poll(&mut self, now_ms: u64) -> u32 {
        let Some(mut next) = self.next_tick_at else {
            return 0;
        };
        let mut ticks = 0;
        while next <= now_ms {
            ticks += 1;
            next += self.interval_ms;
        }
        self.next_tick_at = Some(next);
        ticks
    }
}

/// Splits a variable frame delta into fixed physics substeps
#[derive(Debug, Clone, Default)]
pub struct FixedStep {
    accumulator: f32,
}

impl FixedStep {
    /// Add frame time and return how many `SUBSTEP_DT` steps to run
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, 0.1);
        let mut steps = 0;
        while self.accumulator >= SUBSTEP_DT && steps < MAX_SUBSTEPS {
            self.accumulator -= SUBSTEP_DT;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS {
            // Drop the backlog rather than spiral
            self.accumulator = 0.0;
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
