//! Balancing Skeleton (Verlet Joint Graph)
//!
//! A 26-joint humanoid built from point masses and distance bones.
//!
//! # Structure
//!
//! - Joints live in a flat array indexed by [`JointId`]
//! - Bones reference joints by id and carry a rest length and stiffness
//! - Each foot touches the ground through heel, midfoot and toe points
//! - The torso and feet are triangulated so they hold their shape under load
//!
//! # Tick
//!
//! 1. Optional anchor pins the pelvis to its owner
//! 2. Substeps of Verlet integration, ground contact, bone relaxation and
//!    knee locking
//! 3. The [`BalanceController`] picks a strategy and its correction is applied
//! 4. A short relaxation pass settles the correction
//! 5. Bone lengths are checked against their tolerance
//!
//! Coordinates are y-up with the ground plane at `ground_y`.

use crate::balance::{support_hull, BalanceAction, BalanceConfig, BalanceController, BalanceState, FootSupport};
use crate::collider::closest_point_on_segment;
use crate::error::PhysicsError;
use crate::math::{Fix64, Vec2Fix};
use crate::rng::DeterministicRng;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

// ============================================================================
// Joint Identifiers
// ============================================================================

/// Left or right limb
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// 0 for left, 1 for right
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Named skeleton joint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum JointId {
    Head,
    Neck,
    Chest,
    MidSpine,
    LowerSpine,
    Pelvis,
    ShoulderL,
    ShoulderR,
    ElbowL,
    ElbowR,
    WristL,
    WristR,
    HandL,
    HandR,
    HipL,
    HipR,
    KneeL,
    KneeR,
    AnkleL,
    AnkleR,
    HeelL,
    HeelR,
    MidfootL,
    MidfootR,
    ToeL,
    ToeR,
}

impl JointId {
    /// Number of joints
    pub const COUNT: usize = 26;

    /// Every joint in index order
    pub const ALL: [JointId; Self::COUNT] = [
        JointId::Head,
        JointId::Neck,
        JointId::Chest,
        JointId::MidSpine,
        JointId::LowerSpine,
        JointId::Pelvis,
        JointId::ShoulderL,
        JointId::ShoulderR,
        JointId::ElbowL,
        JointId::ElbowR,
        JointId::WristL,
        JointId::WristR,
        JointId::HandL,
        JointId::HandR,
        JointId::HipL,
        JointId::HipR,
        JointId::KneeL,
        JointId::KneeR,
        JointId::AnkleL,
        JointId::AnkleR,
        JointId::HeelL,
        JointId::HeelR,
        JointId::MidfootL,
        JointId::MidfootR,
        JointId::ToeL,
        JointId::ToeR,
    ];

    /// Array index
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Joint for an array index
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Heel, midfoot or toe
    #[must_use]
    pub const fn is_foot_point(self) -> bool {
        matches!(
            self,
            JointId::HeelL | JointId::HeelR | JointId::MidfootL | JointId::MidfootR | JointId::ToeL | JointId::ToeR
        )
    }

    /// Limb side, `None` for the spine chain
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        use JointId::*;
        match self {
            ShoulderL | ElbowL | WristL | HandL | HipL | KneeL | AnkleL | HeelL | MidfootL | ToeL => Some(Side::Left),
            ShoulderR | ElbowR | WristR | HandR | HipR | KneeR | AnkleR | HeelR | MidfootR | ToeR => Some(Side::Right),
            _ => None,
        }
    }

    /// Heel, midfoot and toe of one foot
    #[must_use]
    pub const fn foot(side: Side) -> [JointId; 3] {
        match side {
            Side::Left => [JointId::HeelL, JointId::MidfootL, JointId::ToeL],
            Side::Right => [JointId::HeelR, JointId::MidfootR, JointId::ToeR],
        }
    }

    /// Hip, knee and ankle of one leg
    #[must_use]
    pub const fn leg(side: Side) -> [JointId; 3] {
        match side {
            Side::Left => [JointId::HipL, JointId::KneeL, JointId::AnkleL],
            Side::Right => [JointId::HipR, JointId::KneeR, JointId::AnkleR],
        }
    }
}

/// Rest pose in skeleton units: `(x, y, mass in tenths of a kilogram)`.
/// One unit is `0.005 * scale` meters; the origin sits between the feet on
/// the ground.
const REST_POSE: [(i32, i32, i64); JointId::COUNT] = [
    (0, 380, 8),    // Head
    (0, 350, 5),    // Neck
    (0, 320, 20),   // Chest
    (0, 280, 25),   // MidSpine
    (0, 240, 25),   // LowerSpine
    (0, 200, 30),   // Pelvis
    (-35, 330, 10), // ShoulderL
    (35, 330, 10),  // ShoulderR
    (-35, 280, 7),  // ElbowL
    (35, 280, 7),   // ElbowR
    (-35, 230, 5),  // WristL
    (35, 230, 5),   // WristR
    (-35, 210, 4),  // HandL
    (35, 210, 4),   // HandR
    (-20, 190, 15), // HipL
    (20, 190, 15),  // HipR
    (-20, 100, 12), // KneeL
    (20, 100, 12),  // KneeR
    (-20, 20, 8),   // AnkleL
    (20, 20, 8),    // AnkleR
    (-25, 0, 6),    // HeelL
    (25, 0, 6),     // HeelR
    (-15, 0, 5),    // MidfootL
    (15, 0, 5),     // MidfootR
    (-5, 0, 4),     // ToeL
    (5, 0, 4),      // ToeR
];

/// Bone topology, solved in this order: feet first, then up the body
const BONES: &[(JointId, JointId)] = {
    use JointId::*;
    &[
        // Feet
        (HeelL, MidfootL),
        (MidfootL, ToeL),
        (AnkleL, HeelL),
        (AnkleL, MidfootL),
        (HeelR, MidfootR),
        (MidfootR, ToeR),
        (AnkleR, HeelR),
        (AnkleR, MidfootR),
        // Legs, braced straight hip to ankle
        (KneeL, AnkleL),
        (KneeR, AnkleR),
        (HipL, KneeL),
        (HipL, AnkleL),
        (HipR, KneeR),
        (HipR, AnkleR),
        // Pelvis
        (Pelvis, HipL),
        (Pelvis, HipR),
        (HipL, HipR),
        // Spine with braces
        (LowerSpine, Pelvis),
        (HipL, LowerSpine),
        (HipR, LowerSpine),
        (MidSpine, LowerSpine),
        (Pelvis, MidSpine),
        (HipL, MidSpine),
        (HipR, MidSpine),
        (Chest, MidSpine),
        (LowerSpine, Chest),
        // Shoulder girdle
        (Chest, ShoulderL),
        (Chest, ShoulderR),
        (ShoulderL, ShoulderR),
        (ShoulderL, MidSpine),
        (ShoulderR, MidSpine),
        (ShoulderL, LowerSpine),
        (ShoulderR, LowerSpine),
        // Neck and head
        (Neck, Chest),
        (MidSpine, Neck),
        (Neck, ShoulderL),
        (Neck, ShoulderR),
        (Head, Neck),
        (Chest, Head),
        (Head, ShoulderL),
        (Head, ShoulderR),
        // Arms
        (ShoulderL, ElbowL),
        (ShoulderR, ElbowR),
        (ElbowL, WristL),
        (ElbowR, WristR),
        (WristL, HandL),
        (WristR, HandR),
    ]
};

// ============================================================================
// Configuration
// ============================================================================

/// Skeleton simulation configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SkeletonConfig {
    /// Size multiplier applied to the rest pose
    pub scale: Fix64,
    /// Height of the ground plane
    pub ground_y: Fix64,
    /// Downward acceleration (m/s²)
    pub gravity: Fix64,
    /// Verlet velocity retention per substep (1 = no damping)
    pub damping: Fix64,
    /// Substeps per tick
    pub substeps: u32,
    /// Bone relaxation passes per substep
    pub relax_iterations: u32,
    /// Bone relaxation passes after the balance correction
    pub post_balance_iterations: u32,
    /// Fraction of horizontal velocity removed when a joint touches ground
    pub ground_friction: Fix64,
    /// Foot points within this height of the ground count as grounded
    pub contact_threshold: Fix64,
    /// Allowed bone length error relative to rest length
    pub bone_tolerance: Fix64,
    /// Fraction of the knee's distance to the hip-ankle line removed per substep
    pub knee_lock: Fix64,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            scale: Fix64::ONE,
            ground_y: Fix64::ZERO,
            gravity: Fix64::from_ratio(49, 5),
            damping: Fix64::from_ratio(19, 20),
            substeps: 2,
            relax_iterations: 8,
            post_balance_iterations: 2,
            ground_friction: Fix64::from_ratio(17, 20),
            contact_threshold: Fix64::from_ratio(1, 1000),
            bone_tolerance: Fix64::from_ratio(1, 20),
            knee_lock: Fix64::from_ratio(3, 20),
        }
    }
}

impl SkeletonConfig {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.scale.is_positive() {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "skeleton scale must be positive",
            });
        }
        if self.substeps == 0 {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "skeleton substeps must be at least 1",
            });
        }
        let unit = |v: Fix64| !v.is_negative() && v <= Fix64::ONE;
        if !unit(self.damping) || !unit(self.ground_friction) || !unit(self.knee_lock) {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "skeleton damping, ground_friction and knee_lock must lie in [0, 1]",
            });
        }
        Ok(())
    }

    /// Meters per rest-pose unit
    fn unit(&self) -> Fix64 {
        Fix64::from_ratio(1, 200) * self.scale
    }
}

// ============================================================================
// Joints and Bones
// ============================================================================

/// Verlet point mass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkeletonJoint {
    pub position: Vec2Fix,
    pub prev_position: Vec2Fix,
    pub mass: Fix64,
    pub inv_mass: Fix64,
    /// Pinned to an external anchor; never integrated or relaxed
    pub fixed: bool,
    /// Foot point resting on the ground this substep
    pub grounded: bool,
}

impl SkeletonJoint {
    fn new(position: Vec2Fix, mass: Fix64) -> Self {
        Self {
            position,
            prev_position: position,
            mass,
            inv_mass: Fix64::ONE / mass,
            fixed: false,
            grounded: false,
        }
    }

    /// Per-tick displacement implied by the Verlet state
    #[inline]
    #[must_use]
    pub fn velocity(&self) -> Vec2Fix {
        self.position - self.prev_position
    }

    /// Inverse mass seen by bone relaxation
    #[inline]
    fn solver_weight(&self) -> Fix64 {
        if self.fixed || self.grounded {
            Fix64::ZERO
        } else {
            self.inv_mass
        }
    }

    /// Horizontal move that carries no velocity
    #[inline]
    fn shift_x(&mut self, dx: Fix64) {
        if !self.fixed {
            self.position.x += dx;
            self.prev_position.x += dx;
        }
    }
}

/// Distance constraint between two joints
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bone {
    pub a: JointId,
    pub b: JointId,
    pub rest_length: Fix64,
    /// Fraction of the error corrected per pass (0..=1)
    pub stiffness: Fix64,
}

/// Outcome of one skeleton tick
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkeletonReport {
    pub state: BalanceState,
    /// Bones outside tolerance after the final relaxation
    pub bone_violations: u32,
    /// Largest absolute bone length error
    pub max_bone_error: Fix64,
    /// The skeleton fell during this tick
    pub fell: bool,
}

// ============================================================================
// Skeleton
// ============================================================================

/// Self-balancing humanoid skeleton
#[derive(Clone, Debug)]
pub struct Skeleton {
    joints: [SkeletonJoint; JointId::COUNT],
    bones: Vec<Bone>,
    controller: BalanceController,
    config: SkeletonConfig,
    total_mass: Fix64,
}

impl Skeleton {
    /// Build the rest pose with the feet centered on `origin`
    #[must_use]
    pub fn new(origin: Vec2Fix, config: SkeletonConfig) -> Self {
        let unit = config.unit();
        let mut joints = [SkeletonJoint::new(origin, Fix64::ONE); JointId::COUNT];
        let mut total_mass = Fix64::ZERO;
        for (joint, &(x, y, tenths)) in joints.iter_mut().zip(REST_POSE.iter()) {
            let offset = Vec2Fix::new(Fix64::from_int(x) * unit, Fix64::from_int(y) * unit);
            let mass = Fix64::from_ratio(tenths, 10);
            *joint = SkeletonJoint::new(origin + offset, mass);
            total_mass += mass;
        }

        let bones = BONES
            .iter()
            .map(|&(a, b)| Bone {
                a,
                b,
                rest_length: joints[a.index()].position.distance_to(joints[b.index()].position),
                stiffness: Fix64::ONE,
            })
            .collect();

        let mut skeleton = Self {
            joints,
            bones,
            controller: BalanceController::new(),
            config,
            total_mass,
        };
        skeleton.update_contacts();
        skeleton
    }

    /// Reset pose and balance state at a new origin
    pub fn respawn(&mut self, origin: Vec2Fix) {
        *self = Self::new(origin, self.config);
    }

    #[must_use]
    pub fn config(&self) -> &SkeletonConfig {
        &self.config
    }

    #[must_use]
    pub fn joint(&self, id: JointId) -> &SkeletonJoint {
        &self.joints[id.index()]
    }

    #[must_use]
    pub fn joint_position(&self, id: JointId) -> Vec2Fix {
        self.joints[id.index()].position
    }

    /// All joints in [`JointId`] order
    #[must_use]
    pub fn joints(&self) -> &[SkeletonJoint] {
        &self.joints
    }

    #[must_use]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[must_use]
    pub fn total_mass(&self) -> Fix64 {
        self.total_mass
    }

    /// Balance state computed by the last tick
    #[must_use]
    pub fn balance_state(&self) -> &BalanceState {
        self.controller.state()
    }

    #[must_use]
    pub fn controller(&self) -> &BalanceController {
        &self.controller
    }

    #[must_use]
    pub fn is_fallen(&self) -> bool {
        self.controller.is_fallen()
    }

    /// Any point of the foot touches the ground
    #[must_use]
    pub fn is_foot_grounded(&self, side: Side) -> bool {
        JointId::foot(side).iter().any(|id| self.joints[id.index()].grounded)
    }

    /// Mass-weighted mean of all joints
    #[must_use]
    pub fn center_of_mass(&self) -> Vec2Fix {
        let (mut x, mut y) = (Fix64::ZERO, Fix64::ZERO);
        for j in &self.joints {
            x += j.position.x * j.mass;
            y += j.position.y * j.mass;
        }
        Vec2Fix::new(x.safe_div(self.total_mass), y.safe_div(self.total_mass))
    }

    /// Convex hull of the grounded foot points
    #[must_use]
    pub fn support_polygon(&self) -> Vec<Vec2Fix> {
        let points: Vec<Vec2Fix> = self
            .joints
            .iter()
            .filter(|j| j.grounded)
            .map(|j| j.position)
            .collect();
        support_hull(&points)
    }

    /// Pin the pelvis at `target`, or release it with `None`
    pub fn set_anchor(&mut self, target: Option<Vec2Fix>) {
        let pelvis = &mut self.joints[JointId::Pelvis.index()];
        match target {
            Some(t) => {
                pelvis.fixed = true;
                pelvis.position = t;
                pelvis.prev_position = t;
            }
            None => pelvis.fixed = false,
        }
    }

    /// Tilt the body sideways so the center of mass moves by `amount`.
    ///
    /// Every free joint above the ankles is displaced in proportion to its
    /// height over the ankles. Positions and previous positions move
    /// together, so no velocity is added.
    pub fn lean(&mut self, amount: Fix64) {
        let pivot = (self.joint_position(JointId::AnkleL).y + self.joint_position(JointId::AnkleR).y).half();
        let leans = |id: JointId, j: &SkeletonJoint| {
            !id.is_foot_point() && !matches!(id, JointId::AnkleL | JointId::AnkleR) && !j.fixed
        };

        let mut moment = Fix64::ZERO;
        for (id, j) in JointId::ALL.iter().zip(self.joints.iter()) {
            if leans(*id, j) {
                moment += j.mass * (j.position.y - pivot).max(Fix64::ZERO);
            }
        }
        if moment.is_zero() {
            return;
        }
        let total = amount * self.total_mass;
        for (id, j) in JointId::ALL.iter().zip(self.joints.iter_mut()) {
            if leans(*id, &*j) {
                let weighted = j.mass * (j.position.y - pivot).max(Fix64::ZERO);
                j.shift_x(weighted.mul_div(total, moment));
            }
        }
    }

    /// Restore joint state and the controller's persistent fields
    pub fn restore_state(
        &mut self,
        joints: &[(Vec2Fix, Vec2Fix)],
        stepping_ticks: u32,
        fallen: bool,
    ) -> Result<(), PhysicsError> {
        if joints.len() != JointId::COUNT {
            return Err(PhysicsError::SnapshotMismatch {
                reason: "skeleton joint count differs",
            });
        }
        for (j, &(pos, prev)) in self.joints.iter_mut().zip(joints) {
            j.position = pos;
            j.prev_position = prev;
        }
        self.controller.restore(stepping_ticks, fallen);
        self.update_contacts();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------------

    /// Advance one tick.
    ///
    /// `anchor` pins the pelvis when set. `rng` feeds the stepping jitter.
    pub fn step(
        &mut self,
        dt: Fix64,
        anchor: Option<Vec2Fix>,
        balance: &BalanceConfig,
        rng: &mut DeterministicRng,
    ) -> SkeletonReport {
        self.set_anchor(anchor);

        let substeps = self.config.substeps.max(1);
        let h = dt / Fix64::from_int(substeps as i32);
        for _ in 0..substeps {
            self.substep(h);
        }

        let was_fallen = self.controller.is_fallen();
        let feet = Side::BOTH.map(|side| FootSupport {
            grounded: self.is_foot_grounded(side),
            center_x: self.foot_center_x(side),
        });
        let hull = self.support_polygon();
        let com = self.center_of_mass();
        let action = self.controller.update(com, &hull, feet, balance, rng);
        self.apply(action, balance);

        self.relax(self.config.post_balance_iterations);
        self.resolve_ground();

        let (bone_violations, max_bone_error) = self.check_bones();
        if bone_violations > 0 {
            tracing::warn!(
                violations = bone_violations,
                max_error = max_bone_error.to_f64(),
                "skeleton bones outside tolerance"
            );
        }

        SkeletonReport {
            state: *self.controller.state(),
            bone_violations,
            max_bone_error,
            fell: !was_fallen && self.controller.is_fallen(),
        }
    }

    fn substep(&mut self, h: Fix64) {
        self.integrate(h);
        self.resolve_ground();
        self.relax(self.config.relax_iterations);
        self.lock_knees();
        self.resolve_ground();
    }

    fn integrate(&mut self, h: Fix64) {
        let drop = self.config.gravity * h * h;
        let damping = self.config.damping;
        for j in self.joints.iter_mut().filter(|j| !j.fixed) {
            let velocity = j.velocity().scale(damping);
            j.prev_position = j.position;
            j.position += velocity;
            j.position.y -= drop;
        }
    }

    /// Clamp joints above the ground plane and refresh foot contacts
    fn resolve_ground(&mut self) {
        let ground = self.config.ground_y;
        let keep = Fix64::ONE - self.config.ground_friction;
        for j in self.joints.iter_mut().filter(|j| !j.fixed) {
            if j.position.y < ground {
                j.position.y = ground;
                j.prev_position.y = ground;
                let vx = j.position.x - j.prev_position.x;
                j.prev_position.x = j.position.x - vx * keep;
            }
        }
        self.update_contacts();
    }

    fn update_contacts(&mut self) {
        let limit = self.config.ground_y + self.config.contact_threshold;
        for (id, j) in JointId::ALL.iter().zip(self.joints.iter_mut()) {
            j.grounded = id.is_foot_point() && j.position.y <= limit;
        }
    }

    /// Mass-weighted bone projection, `iterations` passes in bone order
    fn relax(&mut self, iterations: u32) {
        for _ in 0..iterations {
            for bone in &self.bones {
                let (ia, ib) = (bone.a.index(), bone.b.index());
                let (a, b) = (self.joints[ia], self.joints[ib]);
                let (wa, wb) = (a.solver_weight(), b.solver_weight());
                let w_sum = wa + wb;
                if w_sum.is_zero() {
                    continue;
                }
                let delta = b.position - a.position;
                let Some(dir) = delta.try_normalize() else {
                    continue;
                };
                let error = delta.length() - bone.rest_length;
                let correction = dir.scale(error * bone.stiffness / w_sum);
                self.joints[ia].position += correction.scale(wa);
                self.joints[ib].position -= correction.scale(wb);
            }
        }
    }

    /// Pull each planted leg's knee toward its hip-ankle line
    fn lock_knees(&mut self) {
        let strength = self.config.knee_lock;
        for side in Side::BOTH {
            if !self.is_foot_grounded(side) {
                continue;
            }
            let [hip, knee, ankle] = JointId::leg(side).map(JointId::index);
            if self.joints[knee].fixed {
                continue;
            }
            let p = self.joints[knee].position;
            let target = closest_point_on_segment(p, self.joints[hip].position, self.joints[ankle].position);
            let delta = (target - p).scale(strength);
            let j = &mut self.joints[knee];
            j.position += delta;
            j.prev_position += delta;
        }
    }

    fn foot_center_x(&self, side: Side) -> Fix64 {
        let sum = JointId::foot(side)
            .iter()
            .fold(Fix64::ZERO, |acc, id| acc + self.joints[id.index()].position.x);
        sum / Fix64::from_int(3)
    }

    /// Shift a foot and its ankle horizontally
    fn shift_foot(&mut self, side: Side, dx: Fix64) {
        let [heel, mid, toe] = JointId::foot(side);
        let ankle = JointId::leg(side)[2];
        for id in [heel, mid, toe, ankle] {
            self.joints[id.index()].shift_x(dx);
        }
    }

    fn apply(&mut self, action: BalanceAction, balance: &BalanceConfig) {
        match action {
            BalanceAction::None => {}
            BalanceAction::ShiftFeet { dx } => {
                for side in Side::BOTH {
                    if self.is_foot_grounded(side) {
                        self.shift_foot(side, dx);
                    }
                }
            }
            BalanceAction::CounterHips { dx } => {
                let chain = [
                    JointId::Pelvis,
                    JointId::LowerSpine,
                    JointId::MidSpine,
                    JointId::Chest,
                    JointId::Neck,
                    JointId::Head,
                ];
                for (id, weight) in chain.iter().zip(balance.hip_weights.iter()) {
                    self.joints[id.index()].shift_x(dx * *weight);
                }
            }
            BalanceAction::Step { side, dx } => self.shift_foot(side, dx),
        }
    }

    /// Count bones outside tolerance and report the largest error
    fn check_bones(&self) -> (u32, Fix64) {
        let mut violations = 0;
        let mut worst = Fix64::ZERO;
        for bone in &self.bones {
            let len = self.joints[bone.a.index()]
                .position
                .distance_to(self.joints[bone.b.index()].position);
            let error = (len - bone.rest_length).abs();
            worst = worst.max(error);
            if error > bone.rest_length * self.config.bone_tolerance {
                violations += 1;
            }
        }
        (violations, worst)
    }
}

// ============================================================================
// Tests
// ============================================================================
