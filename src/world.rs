//! Physics World
//!
//! [`PhysicsWorld`] owns every piece of simulation state: bodies, joints,
//! force fields, the collision pipeline's scratch buffers, the event queue,
//! the skeleton and the RNG substreams. Nothing is global, so several worlds
//! (a prediction copy, a test) can run side by side.
//!
//! # Step Order
//!
//! 1. Recycle slots freed last tick, discard undrained events
//! 2. Force fields, then semi-implicit Euler integration
//! 3. Broad-phase pairs, narrow-phase manifolds
//! 4. Sequential-impulse solve, collision events
//! 5. Body joints
//! 6. Sleep bookkeeping
//! 7. Skeleton substeps and balance
//!
//! The host calls [`PhysicsWorld::step`] once per tick with the configured
//! timestep, then drains the events exactly once.

use crate::body::{Body, BodyDesc, BodyHandle, BodyRegistry};
use crate::collider::{narrow_phase, ContactManifold};
use crate::config::PhysicsConfig;
use crate::error::PhysicsError;
use crate::event::{CollisionEvent, EventQueue};
use crate::force::{apply_force_fields, ForceFieldId, ForceFieldInstance, ForceFieldSet};
use crate::integrator::integrate;
use crate::joint::{solve_joints, Joint, JointId as BodyJointId, JointSet};
use crate::math::{Fix64, Vec2Fix};
use crate::profiling::{Diagnostics, StepDiagnostics, StepStats};
use crate::rng::{stream_id, streams, RngStreams};
use crate::skeleton::{JointId, Side, Skeleton, SkeletonReport};
use crate::sleeping::{update_sleep, SleepState};
use crate::snapshot::{BodyState, SimulationChecksum, SkeletonState, Snapshot};
use crate::solver::ContactSolver;
use crate::spatial::SpatialGrid;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

const SKELETON_STREAM: u64 = stream_id(streams::SKELETON_STEP);

/// Pelvis pinned to a body, at a fixed offset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SkeletonAnchor {
    owner: BodyHandle,
    offset: Vec2Fix,
}

/// The owned simulation context
#[derive(Clone, Debug)]
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: BodyRegistry,
    joints: JointSet,
    fields: ForceFieldSet,
    grid: SpatialGrid,
    pairs: Vec<(u32, u32)>,
    manifolds: Vec<ContactManifold>,
    solver: ContactSolver,
    events: EventQueue,
    skeleton: Option<Skeleton>,
    anchor: Option<SkeletonAnchor>,
    rng: RngStreams,
    tick: u64,
    diagnostics: Diagnostics,
    last_stats: StepStats,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::build(PhysicsConfig::default(), 0)
    }
}

impl PhysicsWorld {
    /// Create an empty world. The run seed starts at 0.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self::build(config, 0))
    }

    fn build(config: PhysicsConfig, seed: u64) -> Self {
        Self {
            bodies: BodyRegistry::new(config.world.max_bodies),
            joints: JointSet::default(),
            fields: ForceFieldSet::default(),
            grid: SpatialGrid::new(),
            pairs: Vec::new(),
            manifolds: Vec::new(),
            solver: ContactSolver::new(),
            events: EventQueue::new(config.events.capacity),
            skeleton: None,
            anchor: None,
            rng: RngStreams::new(seed),
            tick: 0,
            diagnostics: Diagnostics::default(),
            last_stats: StepStats::default(),
            config,
        }
    }

    // ------------------------------------------------------------------------
    // Bodies
    // ------------------------------------------------------------------------

    /// Register a body
    pub fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, PhysicsError> {
        let body = Body::from_desc(desc)?;
        self.bodies.insert(body)
    }

    /// Remove a body. Its handle and every copy of it turn stale.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<(), PhysicsError> {
        if let Err(err) = self.bodies.remove(handle) {
            self.note_invalid(handle);
            return Err(err);
        }
        if self.anchor.is_some_and(|a| a.owner == handle) {
            self.anchor = None;
        }
        Ok(())
    }

    /// Accumulate a force for the next step. Wakes the body.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec2Fix) -> Result<(), PhysicsError> {
        self.live_body(handle)?.apply_force(force);
        Ok(())
    }

    /// Change momentum immediately. Wakes the body in the same call.
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2Fix) -> Result<(), PhysicsError> {
        self.live_body(handle)?.apply_impulse(impulse);
        Ok(())
    }

    /// Overwrite the velocity of a dynamic or kinematic body and wake it
    pub fn set_body_velocity(&mut self, handle: BodyHandle, velocity: Vec2Fix) -> Result<(), PhysicsError> {
        let body = self.live_body(handle)?;
        if !body.is_static() {
            body.velocity = velocity;
            body.sleep.wake();
        }
        Ok(())
    }

    /// Teleport a body and wake it
    pub fn set_body_position(&mut self, handle: BodyHandle, position: Vec2Fix) -> Result<(), PhysicsError> {
        let body = self.live_body(handle)?;
        body.position = position;
        body.sleep.wake();
        Ok(())
    }

    fn live_body(&mut self, handle: BodyHandle) -> Result<&mut Body, PhysicsError> {
        match self.bodies.get_mut(handle) {
            Some(body) => Ok(body),
            None => {
                self.diagnostics.invalid_handle_ops += 1;
                tracing::debug!(index = handle.index(), generation = handle.generation(), "invalid body handle");
                Err(handle.invalid_error())
            }
        }
    }

    fn note_invalid(&mut self, handle: BodyHandle) {
        self.diagnostics.invalid_handle_ops += 1;
        tracing::debug!(index = handle.index(), generation = handle.generation(), "invalid body handle");
    }

    #[must_use]
    pub fn get_body_position(&self, handle: BodyHandle) -> Option<Vec2Fix> {
        self.bodies.get(handle).map(|b| b.position)
    }

    #[must_use]
    pub fn get_body_velocity(&self, handle: BodyHandle) -> Option<Vec2Fix> {
        self.bodies.get(handle).map(|b| b.velocity)
    }

    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// All live bodies
    #[must_use]
    pub fn bodies(&self) -> &BodyRegistry {
        &self.bodies
    }

    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    #[must_use]
    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    #[must_use]
    pub fn is_body_sleeping(&self, handle: BodyHandle) -> Option<bool> {
        self.bodies.get(handle).map(Body::is_sleeping)
    }

    #[must_use]
    pub fn body_user_tag(&self, handle: BodyHandle) -> Option<u32> {
        self.bodies.get(handle).map(|b| b.user_tag)
    }

    /// Total kinetic energy of all finite-mass bodies
    #[must_use]
    pub fn kinetic_energy(&self) -> Fix64 {
        self.bodies.kinetic_energy()
    }

    // ------------------------------------------------------------------------
    // Joints and fields
    // ------------------------------------------------------------------------

    /// Link two live bodies
    pub fn add_joint(&mut self, joint: Joint) -> Result<BodyJointId, PhysicsError> {
        let (a, b) = joint.bodies();
        for handle in [a, b] {
            if !self.bodies.contains(handle) {
                self.note_invalid(handle);
                return Err(handle.invalid_error());
            }
        }
        Ok(self.joints.add(joint))
    }

    pub fn remove_joint(&mut self, id: BodyJointId) -> bool {
        self.joints.remove(id)
    }

    #[must_use]
    pub fn joints(&self) -> &JointSet {
        &self.joints
    }

    pub fn add_force_field(&mut self, field: ForceFieldInstance) -> ForceFieldId {
        self.fields.add(field)
    }

    pub fn remove_force_field(&mut self, id: ForceFieldId) -> bool {
        self.fields.remove(id)
    }

    #[must_use]
    pub fn force_fields(&self) -> &ForceFieldSet {
        &self.fields
    }

    // ------------------------------------------------------------------------
    // Step
    // ------------------------------------------------------------------------

    /// Advance bodies, joints, collisions and the skeleton by one tick.
    ///
    /// `dt` must equal `config.world.fixed_dt`; any other value is refused
    /// and nothing advances.
    pub fn step(&mut self, dt: Fix64) -> Result<StepStats, PhysicsError> {
        let expected = self.config.world.fixed_dt;
        if dt != expected {
            self.diagnostics.rejected_steps += 1;
            tracing::warn!(expected = expected.to_f64(), got = dt.to_f64(), "variable timestep rejected");
            return Err(PhysicsError::VariableTimestep {
                expected_raw: expected.raw(),
                got_raw: dt.raw(),
            });
        }

        let span = tracing::trace_span!("physics_step", tick = self.tick);
        let _enter = span.enter();

        self.bodies.recycle_retired();
        let stale = self.events.discard_stale();
        if stale > 0 {
            tracing::warn!(stale, "undrained collision events discarded");
        }

        apply_force_fields(self.fields.as_slice(), &mut self.bodies, &self.config.forces);
        integrate(&mut self.bodies, &self.config.world.integration(), dt);

        self.grid
            .find_pairs(&self.bodies, &self.config.broadphase, &mut self.pairs);
        narrow_phase(&self.bodies, &self.pairs, &mut self.manifolds);

        let solve = self.solver.solve(
            &mut self.bodies,
            &self.manifolds,
            &self.config.solver,
            self.tick,
            &mut self.events,
        );
        if solve.events_dropped > 0 {
            tracing::warn!(dropped = solve.events_dropped, "collision event queue full, oldest events dropped");
        }
        if solve.woken > 0 {
            tracing::debug!(woken = solve.woken, "sleeping bodies woken by contact");
        }
        if solve.deep_contacts > 0 {
            tracing::debug!(
                contacts = solve.deep_contacts,
                depth = solve.max_penetration.to_f64(),
                "penetration above tolerance"
            );
        }

        let pruned = solve_joints(&mut self.joints, &mut self.bodies, self.config.solver.joint_iterations);
        let sleep = update_sleep(&mut self.bodies, &self.config.sleep);
        let report = self.step_skeleton(dt);

        let stats = StepStats {
            tick: self.tick,
            broadphase_pairs: self.pairs.len() as u32,
            manifolds: self.manifolds.len() as u32,
            events_reported: solve.events_reported,
            awake_bodies: sleep.awake,
            sleeping_bodies: sleep.sleeping,
            max_penetration_raw: solve.max_penetration.raw(),
        };
        self.diagnostics.record_step(&StepDiagnostics {
            events_dropped: u64::from(solve.events_dropped),
            stale_events: stale as u64,
            bone_violations: report.map_or(0, |r| r.bone_violations),
            deep_contacts: solve.deep_contacts,
            pruned_joints: pruned,
            fell: report.is_some_and(|r| r.fell),
        });
        self.last_stats = stats;
        self.tick += 1;
        Ok(stats)
    }

    fn step_skeleton(&mut self, dt: Fix64) -> Option<SkeletonReport> {
        let target = match self.anchor {
            Some(anchor) => match self.bodies.get(anchor.owner) {
                Some(owner) => Some(owner.position + anchor.offset),
                None => {
                    tracing::debug!("skeleton anchor owner is gone, releasing pelvis");
                    self.anchor = None;
                    None
                }
            },
            None => None,
        };
        let skeleton = self.skeleton.as_mut()?;
        let rng = self.rng.stream_by_id(SKELETON_STREAM);
        Some(skeleton.step(dt, target, &self.config.balance, rng))
    }

    /// Current tick index (number of completed steps)
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Take this tick's collision events in deterministic pair order
    pub fn drain_collision_events(&mut self) -> Vec<CollisionEvent> {
        self.events.drain()
    }

    /// Events waiting to be drained
    #[must_use]
    pub fn pending_events(&self) -> &EventQueue {
        &self.events
    }

    // ------------------------------------------------------------------------
    // Skeleton
    // ------------------------------------------------------------------------

    /// Create (or replace) the skeleton with its feet centered on `origin`.
    ///
    /// With an `owner`, the pelvis follows that body at the offset it has
    /// right now.
    pub fn spawn_skeleton(&mut self, origin: Vec2Fix, owner: Option<BodyHandle>) -> Result<(), PhysicsError> {
        let skeleton = Skeleton::new(origin, self.config.skeleton);
        let anchor = match owner {
            Some(handle) => {
                let Some(body) = self.bodies.get(handle) else {
                    self.note_invalid(handle);
                    return Err(handle.invalid_error());
                };
                Some(SkeletonAnchor {
                    owner: handle,
                    offset: skeleton.joint_position(JointId::Pelvis) - body.position,
                })
            }
            None => None,
        };
        self.skeleton = Some(skeleton);
        self.anchor = anchor;
        Ok(())
    }

    /// Remove the skeleton
    pub fn despawn_skeleton(&mut self) -> Option<Skeleton> {
        self.anchor = None;
        self.skeleton.take()
    }

    /// Reset the skeleton's pose and fallen state. Returns `false` if there
    /// is no skeleton.
    pub fn respawn_skeleton(&mut self, origin: Vec2Fix) -> bool {
        match self.skeleton.as_mut() {
            Some(s) => {
                s.respawn(origin);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    pub fn skeleton_mut(&mut self) -> Option<&mut Skeleton> {
        self.skeleton.as_mut()
    }

    #[must_use]
    pub fn get_joint_position(&self, joint: JointId) -> Option<Vec2Fix> {
        self.skeleton.as_ref().map(|s| s.joint_position(joint))
    }

    /// Balance quality in `[0, 1]`; 0 without a skeleton
    #[must_use]
    pub fn get_balance_quality(&self) -> f32 {
        self.skeleton.as_ref().map_or(0.0, |s| s.balance_state().quality)
    }

    #[must_use]
    pub fn is_foot_grounded(&self, side: Side) -> bool {
        self.skeleton.as_ref().is_some_and(|s| s.is_foot_grounded(side))
    }

    // ------------------------------------------------------------------------
    // Determinism
    // ------------------------------------------------------------------------

    /// Reset every named RNG substream for a new run
    pub fn set_seed(&mut self, seed: u64) {
        self.rng.set_seed(seed);
        tracing::debug!(seed, "rng seed reset");
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Capture the replay state
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            seed: self.rng.seed(),
            rng_streams: self.rng.states().collect(),
            bodies: self
                .bodies
                .iter()
                .map(|(handle, b)| BodyState {
                    handle,
                    position: b.position,
                    velocity: b.velocity,
                    sleeping: b.is_sleeping(),
                    idle_ticks: b.sleep.idle_ticks,
                })
                .collect(),
            skeleton: self.skeleton.as_ref().map(|s| SkeletonState {
                joints: s.joints().iter().map(|j| (j.position, j.prev_position)).collect(),
                stepping_ticks: s.controller().stepping_ticks(),
                fallen: s.is_fallen(),
            }),
        }
    }

    /// Rewind to a snapshot taken from this world.
    ///
    /// The live body set and skeleton presence must match the snapshot; on a
    /// mismatch nothing is changed. Pending events and forces are cleared.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), PhysicsError> {
        if snapshot.bodies.len() != self.bodies.len()
            || !snapshot
                .bodies
                .iter()
                .zip(self.bodies.iter())
                .all(|(s, (h, _))| s.handle == h)
        {
            return Err(PhysicsError::SnapshotMismatch {
                reason: "body set differs",
            });
        }
        match (&snapshot.skeleton, &self.skeleton) {
            (None, None) => {}
            (Some(s), Some(_)) if s.joints.len() == JointId::COUNT => {}
            _ => {
                return Err(PhysicsError::SnapshotMismatch {
                    reason: "skeleton differs",
                })
            }
        }

        // Last fallible call; nothing below may fail
        if let (Some(state), Some(skeleton)) = (&snapshot.skeleton, self.skeleton.as_mut()) {
            skeleton.restore_state(&state.joints, state.stepping_ticks, state.fallen)?;
        }
        for state in &snapshot.bodies {
            if let Some(body) = self.bodies.get_mut(state.handle) {
                body.position = state.position;
                body.velocity = state.velocity;
                body.force = Vec2Fix::ZERO;
                body.sleep.state = if state.sleeping {
                    SleepState::Sleeping
                } else {
                    SleepState::Awake
                };
                body.sleep.idle_ticks = state.idle_ticks;
            }
        }
        self.rng.restore(snapshot.seed, &snapshot.rng_streams);
        self.events.drain();
        self.tick = snapshot.tick;
        Ok(())
    }

    /// Hash of the current state for desync detection
    #[must_use]
    pub fn checksum(&self) -> SimulationChecksum {
        SimulationChecksum::of_world(self)
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Counters of the most recent successful step
    #[must_use]
    pub fn last_step_stats(&self) -> &StepStats {
        &self.last_stats
    }
}
