//! Body Sleeping
//!
//! Bodies whose speed stays below a threshold for a run of consecutive ticks
//! are put to sleep: integration skips them and the broad-phase drops pairs
//! in which nothing is moving. Any impulse, force, setter call or contact
//! with a moving body wakes them again.

use crate::body::BodyRegistry;
use crate::math::{Fix64, Vec2Fix};

/// Sleep state for a body
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepState {
    /// Body is fully active
    Awake,
    /// Body is sleeping (skipped in simulation)
    Sleeping,
}

/// Per-body sleep tracking data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SleepData {
    /// Current sleep state
    pub state: SleepState,
    /// Number of consecutive ticks below the velocity threshold
    pub idle_ticks: u32,
}

impl SleepData {
    /// Create new awake sleep data
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SleepState::Awake,
            idle_ticks: 0,
        }
    }

    /// Check if this body is currently sleeping
    #[inline]
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.state == SleepState::Sleeping
    }

    /// Wake up this body
    #[inline]
    pub fn wake(&mut self) {
        self.state = SleepState::Awake;
        self.idle_ticks = 0;
    }

    /// Force the body to sleep
    #[inline]
    pub fn put_to_sleep(&mut self) {
        self.state = SleepState::Sleeping;
    }

    /// Feed one tick's speed sample. Returns `true` on the tick the body
    /// falls asleep.
    pub fn observe(&mut self, speed_sq: Fix64, config: &SleepConfig) -> bool {
        if self.is_sleeping() {
            return false;
        }
        let limit = config.linear_threshold * config.linear_threshold;
        if speed_sq < limit {
            self.idle_ticks = self.idle_ticks.saturating_add(1);
            if self.idle_ticks >= config.ticks_to_sleep {
                self.state = SleepState::Sleeping;
                return true;
            }
        } else {
            self.idle_ticks = 0;
        }
        false
    }
}

impl Default for SleepData {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the sleeping system
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SleepConfig {
    /// Speed below which a body counts as idle
    pub linear_threshold: Fix64,
    /// Consecutive idle ticks before the body sleeps (0 disables sleeping)
    pub ticks_to_sleep: u32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            linear_threshold: Fix64::from_ratio(1, 100), // 0.01 m/s
            ticks_to_sleep: 60,                          // 1 second at 60 Hz
        }
    }
}

/// Result of one sleep pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SleepSummary {
    /// Bodies that fell asleep this tick
    pub fell_asleep: u32,
    /// Non-static bodies still awake
    pub awake: u32,
    /// Non-static bodies asleep
    pub sleeping: u32,
}

/// Advance every body's idle counter after the solver has run.
///
/// A body that falls asleep has its velocity and pending force zeroed so
/// waking it later starts from rest.
pub fn update_sleep(bodies: &mut BodyRegistry, config: &SleepConfig) -> SleepSummary {
    let mut summary = SleepSummary::default();
    for (handle, body) in bodies.iter_mut() {
        if body.is_static() {
            continue;
        }
        if config.ticks_to_sleep > 0
            && body.is_dynamic()
            && body.sleep.observe(body.velocity.length_squared(), config)
        {
            body.velocity = Vec2Fix::ZERO;
            body.force = Vec2Fix::ZERO;
            summary.fell_asleep += 1;
            tracing::debug!(index = handle.index(), "body fell asleep");
        }
        if body.is_sleeping() {
            summary.sleeping += 1;
        } else {
            summary.awake += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyDesc};
    use crate::collider::Shape;

    fn config(ticks: u32) -> SleepConfig {
        SleepConfig {
            ticks_to_sleep: ticks,
            ..SleepConfig::default()
        }
    }

    #[test]
    fn test_sleep_after_threshold() {
        let cfg = config(3);
        let mut s = SleepData::new();
        assert!(!s.observe(Fix64::ZERO, &cfg));
        assert!(!s.observe(Fix64::ZERO, &cfg));
        assert!(s.observe(Fix64::ZERO, &cfg));
        assert!(s.is_sleeping());
        assert!(!s.observe(Fix64::ZERO, &cfg), "already asleep");
    }

    #[test]
    fn test_motion_resets_counter() {
        let cfg = config(3);
        let mut s = SleepData::new();
        s.observe(Fix64::ZERO, &cfg);
        s.observe(Fix64::ZERO, &cfg);
        s.observe(Fix64::ONE, &cfg);
        assert_eq!(s.idle_ticks, 0);
        assert!(!s.is_sleeping());
    }

    #[test]
    fn test_wake() {
        let mut s = SleepData::new();
        s.put_to_sleep();
        s.idle_ticks = 10;
        s.wake();
        assert!(!s.is_sleeping());
        assert_eq!(s.idle_ticks, 0);
    }

    #[test]
    fn test_update_sleep_registry() {
        let mut reg = BodyRegistry::new(4);
        let still = reg
            .insert(Body::from_desc(&BodyDesc::dynamic(Shape::circle(Fix64::ONE), Fix64::ONE)).unwrap())
            .unwrap();
        let moving = reg
            .insert(
                Body::from_desc(
                    &BodyDesc::dynamic(Shape::circle(Fix64::ONE), Fix64::ONE)
                        .with_velocity(Vec2Fix::from_int(1, 0)),
                )
                .unwrap(),
            )
            .unwrap();
        reg.insert(Body::from_desc(&BodyDesc::fixed(Shape::circle(Fix64::ONE))).unwrap())
            .unwrap();

        let cfg = config(2);
        let first = update_sleep(&mut reg, &cfg);
        assert_eq!(first.fell_asleep, 0);
        let second = update_sleep(&mut reg, &cfg);
        assert_eq!(second.fell_asleep, 1);
        assert_eq!(second.sleeping, 1);
        assert_eq!(second.awake, 1);
        assert!(reg.get(still).unwrap().is_sleeping());
        assert!(!reg.get(moving).unwrap().is_sleeping());
    }

    #[test]
    fn test_zero_ticks_disables_sleep() {
        let mut reg = BodyRegistry::new(1);
        let h = reg
            .insert(Body::from_desc(&BodyDesc::dynamic(Shape::circle(Fix64::ONE), Fix64::ONE)).unwrap())
            .unwrap();
        for _ in 0..10 {
            update_sleep(&mut reg, &config(0));
        }
        assert!(!reg.get(h).unwrap().is_sleeping());
    }
}
