//! # Stance Physics
//!
//! **Deterministic 2D Physics for Action Games**
//!
//! A fixed-point simulation core that advances rigid bodies, resolves their
//! collisions, reports collision events for gameplay, and drives a 26-joint
//! player skeleton that keeps itself upright on three-point feet.
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **Fix64 math** | Q32.32 fixed point, bit-identical on every platform |
//! | **Bodies** | Circles, capsules and boxes with generational handles |
//! | **Collision pipeline** | Uniform grid broad-phase, sequential-impulse solver |
//! | **Events** | Bounded queue, deterministic pair order, drained once per tick |
//! | **Skeleton** | Verlet joints, bone relaxation, ground contact with friction |
//! | **Balance** | Ankle, hip and stepping strategies, fallen trigger |
//! | **Combat bridge** | Damage, blocking, stamina and knockback from events |
//! | **Replay** | Byte snapshots, seeded RNG substreams, state checksum |
//!
//! ## Design Principles
//!
//! - **Deterministic**: no floats in the simulation path, no hash-order iteration
//! - **Fixed timestep**: `step` refuses any `dt` other than the configured one
//! - **Never panics on host input**: stale handles and bad calls return sentinels
//! - **no_std compatible**: only `alloc` is required
//!
//! ## Quick Start
//!
//! ```rust
//! use stance_physics::prelude::*;
//!
//! let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
//! let dt = world.config().world.fixed_dt;
//!
//! let player = world
//!     .create_body(&BodyDesc::dynamic(Shape::circle(Fix64::HALF), Fix64::ONE))
//!     .unwrap();
//! world.spawn_skeleton(Vec2Fix::ZERO, None).unwrap();
//!
//! world.apply_impulse(player, Vec2Fix::from_int(1, 0)).unwrap();
//! world.step(dt).unwrap();
//!
//! for event in world.drain_collision_events() {
//!     let _ = (event.body_a, event.body_b, event.impulse);
//! }
//! let head = world.get_joint_position(JointId::Head);
//! assert!(head.is_some());
//! ```
//!
//! ## Combat
//!
//! ```rust
//! use stance_physics::prelude::*;
//!
//! let mut world = PhysicsWorld::default();
//! let mut roster = CombatRoster::new();
//! let hero = world
//!     .create_body(&BodyDesc::dynamic(Shape::circle(Fix64::HALF), Fix64::ONE))
//!     .unwrap();
//! roster.insert(hero, Combatant::new(Team::Player, Fix64::from_int(100)));
//!
//! let dt = world.config().world.fixed_dt;
//! world.step(dt).unwrap();
//! let combat = world.config().combat;
//! let hits = process_events(&mut world, &mut roster, &combat);
//! assert!(hits.is_empty());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod balance;
pub mod body;
pub mod collider;
pub mod combat;
pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod force;
pub mod integrator;
pub mod joint;
pub mod math;
pub mod profiling;
pub mod rng;
pub mod skeleton;
pub mod sleeping;
pub mod snapshot;
pub mod solver;
pub mod spatial;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::balance::{BalanceAction, BalanceConfig, BalanceState, BalanceStrategy};
    pub use crate::body::{Body, BodyDesc, BodyHandle, BodyKind, BodyRegistry, Mass};
    pub use crate::collider::{Aabb, ContactManifold, Shape};
    pub use crate::combat::{
        evaluate_hit, process_events, CombatConfig, CombatRoster, Combatant, HitOutcome, HitResult, Team,
    };
    pub use crate::config::{PhysicsConfig, WorldConfig};
    pub use crate::error::PhysicsError;
    pub use crate::event::{CollisionEvent, EventConfig, EventQueue};
    pub use crate::filter::{layers, CollisionFilter};
    pub use crate::force::{ForceField, ForceFieldId, ForceFieldInstance};
    pub use crate::joint::{DistanceJoint, Joint, RangeJoint};
    pub use crate::math::{Fix64, Vec2Fix};
    pub use crate::profiling::{Diagnostics, StepStats};
    pub use crate::rng::{DeterministicRng, RngStreams};
    pub use crate::skeleton::{JointId, Side, Skeleton, SkeletonConfig};
    pub use crate::sleeping::{SleepConfig, SleepState};
    pub use crate::snapshot::{SimulationChecksum, Snapshot};
    pub use crate::solver::SolverConfig;
    pub use crate::spatial::BroadphaseConfig;
    pub use crate::world::PhysicsWorld;
}

pub use prelude::*;
