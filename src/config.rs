//! World Configuration
//!
//! [`PhysicsConfig`] gathers every module's tunables in one value. Each
//! section defaults to the tuned gameplay constants, so a host only spells
//! out what it changes. With the `serde` feature the whole thing loads from
//! TOML; fixed-point fields are written as plain decimals.
//!
//! ```toml
//! [world]
//! fixed_dt = 0.016666666666
//! max_bodies = 128
//!
//! [balance]
//! stepping_threshold = 0.08
//! ```

use crate::balance::BalanceConfig;
use crate::collider::Aabb;
use crate::combat::CombatConfig;
use crate::error::PhysicsError;
use crate::event::EventConfig;
use crate::force::ForceFieldConfig;
use crate::integrator::IntegrationConfig;
use crate::math::{Fix64, Vec2Fix};
use crate::skeleton::SkeletonConfig;
use crate::sleeping::SleepConfig;
use crate::solver::SolverConfig;
use crate::spatial::BroadphaseConfig;

/// Timestep, arena and capacity settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorldConfig {
    /// The only timestep `step` accepts
    pub fixed_dt: Fix64,
    /// Body gravity (zero for a top-down arena)
    pub gravity: Vec2Fix,
    /// Velocity retention per tick for every dynamic body
    pub linear_damping: Fix64,
    /// Speed limit for bodies
    pub max_speed: Fix64,
    /// Arena bounds; bodies leaving it are clamped back
    pub bounds: Option<Aabb>,
    /// Maximum number of live bodies
    pub max_bodies: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let integration = IntegrationConfig::default();
        Self {
            fixed_dt: Fix64::from_ratio(1, 60),
            gravity: integration.gravity,
            linear_damping: integration.linear_damping,
            max_speed: integration.max_speed,
            bounds: integration.bounds,
            max_bodies: 256,
        }
    }
}

impl WorldConfig {
    /// Settings consumed by the integrator
    #[must_use]
    pub fn integration(&self) -> IntegrationConfig {
        IntegrationConfig {
            gravity: self.gravity,
            linear_damping: self.linear_damping,
            max_speed: self.max_speed,
            bounds: self.bounds,
        }
    }
}

/// Every tunable of a [`crate::world::PhysicsWorld`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysicsConfig {
    pub world: WorldConfig,
    pub solver: SolverConfig,
    pub broadphase: BroadphaseConfig,
    pub sleep: SleepConfig,
    pub events: EventConfig,
    pub forces: ForceFieldConfig,
    pub skeleton: SkeletonConfig,
    pub balance: BalanceConfig,
    pub combat: CombatConfig,
}

impl PhysicsConfig {
    /// Reject settings the simulation cannot run with
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let w = &self.world;
        if !w.fixed_dt.is_positive() {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "fixed_dt must be positive",
            });
        }
        if w.max_bodies == 0 || w.max_bodies > u32::MAX as usize {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "max_bodies must be in 1..=u32::MAX",
            });
        }
        if w.linear_damping.is_negative() || w.linear_damping > Fix64::ONE {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "linear_damping must lie in [0, 1]",
            });
        }
        if !w.max_speed.is_positive() {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "max_speed must be positive",
            });
        }
        if let Some(b) = w.bounds {
            if b.min.x >= b.max.x || b.min.y >= b.max.y {
                return Err(PhysicsError::InvalidConfiguration {
                    reason: "bounds min must be below max",
                });
            }
        }
        if self.solver.velocity_iterations == 0 {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "velocity_iterations must be at least 1",
            });
        }
        if self.broadphase.min_cell_size > self.broadphase.max_cell_size {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "min_cell_size must not exceed max_cell_size",
            });
        }
        if self.events.capacity == 0 {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "event capacity must be at least 1",
            });
        }
        if self.combat.max_damage.is_negative() {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "max_damage must not be negative",
            });
        }
        self.skeleton.validate()?;
        self.balance.validate()
    }

    /// Parse a TOML document and validate it
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> Result<Self, PhysicsError> {
        let config: Self = toml::from_str(text).map_err(|e| PhysicsError::ConfigParse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}
