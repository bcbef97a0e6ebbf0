//! Body Joints
//!
//! Position-based distance constraints between two registered bodies.
//!
//! # Joint Types
//!
//! - **DistanceJoint**: keeps the centers a target distance apart (tether, rod)
//! - **RangeJoint**: keeps the distance inside `[min, max]` (rope, leash)
//!
//! Joints refer to bodies by handle. When either body is destroyed the joint
//! is skipped and removed on the next solve.

use crate::body::{BodyHandle, BodyRegistry};
use crate::math::{Fix64, Vec2Fix};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Joint type enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JointType {
    Distance,
    Range,
}

/// Fixed-length link between two bodies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceJoint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Target center distance
    pub length: Fix64,
    /// Fraction of the error corrected per iteration (0..=1)
    pub stiffness: Fix64,
}

impl DistanceJoint {
    /// Rigid link of the given length
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, length: Fix64) -> Self {
        Self {
            body_a,
            body_b,
            length,
            stiffness: Fix64::ONE,
        }
    }

    #[must_use]
    pub fn with_stiffness(mut self, stiffness: Fix64) -> Self {
        self.stiffness = stiffness.clamp(Fix64::ZERO, Fix64::ONE);
        self
    }
}

/// Link that only acts outside `[min, max]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RangeJoint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub min: Fix64,
    pub max: Fix64,
}

impl RangeJoint {
    #[must_use]
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, min: Fix64, max: Fix64) -> Self {
        Self {
            body_a,
            body_b,
            min: min.min(max),
            max: max.max(min),
        }
    }
}

/// Unified joint enum for storage in the world
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Joint {
    Distance(DistanceJoint),
    Range(RangeJoint),
}

impl Joint {
    /// Handles of the two connected bodies
    #[inline]
    #[must_use]
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        match self {
            Joint::Distance(j) => (j.body_a, j.body_b),
            Joint::Range(j) => (j.body_a, j.body_b),
        }
    }

    /// Get joint type
    #[inline]
    #[must_use]
    pub fn joint_type(&self) -> JointType {
        match self {
            Joint::Distance(_) => JointType::Distance,
            Joint::Range(_) => JointType::Range,
        }
    }

    /// Allowed distance interval and correction stiffness
    fn limits(&self) -> (Fix64, Fix64, Fix64) {
        match self {
            Joint::Distance(j) => (j.length, j.length, j.stiffness),
            Joint::Range(j) => (j.min, j.max, Fix64::ONE),
        }
    }
}

/// Identifier returned when a joint is added
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub u32);

/// Joints owned by a world, solved in insertion order
#[derive(Clone, Debug, Default)]
pub struct JointSet {
    joints: Vec<(JointId, Joint)>,
    next_id: u32,
}

impl JointSet {
    /// Add a joint
    pub fn add(&mut self, joint: Joint) -> JointId {
        let id = JointId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.joints.push((id, joint));
        id
    }

    /// Remove a joint. Returns `false` for an unknown id.
    pub fn remove(&mut self, id: JointId) -> bool {
        let before = self.joints.len();
        self.joints.retain(|(jid, _)| *jid != id);
        self.joints.len() != before
    }

    /// Look up a joint
    #[must_use]
    pub fn get(&self, id: JointId) -> Option<&Joint> {
        self.joints.iter().find(|(jid, _)| *jid == id).map(|(_, j)| j)
    }

    /// Joints in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &(JointId, Joint)> + '_ {
        self.joints.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Drop joints whose bodies no longer exist. Returns how many were removed.
    pub fn prune(&mut self, bodies: &BodyRegistry) -> usize {
        let before = self.joints.len();
        self.joints.retain(|(_, j)| {
            let (a, b) = j.bodies();
            bodies.contains(a) && bodies.contains(b)
        });
        before - self.joints.len()
    }
}

/// Solve every joint `iterations` times.
///
/// Dead joints are pruned first. Returns the number pruned.
pub fn solve_joints(joints: &mut JointSet, bodies: &mut BodyRegistry, iterations: u32) -> usize {
    let pruned = joints.prune(bodies);
    if joints.is_empty() {
        return pruned;
    }
    wake_linked(joints, bodies);
    for _ in 0..iterations {
        for (_, joint) in joints.iter() {
            solve_joint(joint, bodies);
        }
    }
    pruned
}

/// A moving body drags sleeping partners awake
fn wake_linked(joints: &JointSet, bodies: &mut BodyRegistry) {
    for (_, joint) in joints.iter() {
        let (ha, hb) = joint.bodies();
        if let Some((a, b)) = bodies.pair_mut(ha.index(), hb.index()) {
            if a.is_sleeping() && b.is_moving() {
                a.sleep.wake();
            } else if b.is_sleeping() && a.is_moving() {
                b.sleep.wake();
            }
        }
    }
}

fn effective_inv_mass(body: &crate::body::Body) -> Fix64 {
    if body.is_sleeping() {
        Fix64::ZERO
    } else {
        body.inv_mass
    }
}

fn solve_joint(joint: &Joint, bodies: &mut BodyRegistry) {
    let (ha, hb) = joint.bodies();
    let Some((a, b)) = bodies.pair_mut(ha.index(), hb.index()) else {
        return;
    };
    let (min, max, stiffness) = joint.limits();

    let delta = b.position - a.position;
    let distance = delta.length();
    let error = if distance > max {
        distance - max
    } else if distance < min {
        distance - min
    } else {
        return;
    };

    let wa = effective_inv_mass(a);
    let wb = effective_inv_mass(b);
    let w_sum = wa + wb;
    if w_sum.is_zero() {
        return;
    }
    let normal = delta.try_normalize().unwrap_or(Vec2Fix::UNIT_Y);

    let lambda = error * stiffness / w_sum;
    let correction = normal.scale(lambda);
    a.position += correction.scale(wa);
    b.position -= correction.scale(wb);

    // Remove the relative velocity that would reopen the violation
    let rel = (b.velocity - a.velocity).dot(normal);
    let opening = (error.is_positive() && rel.is_positive()) || (error.is_negative() && rel.is_negative());
    if opening {
        let impulse = normal.scale(rel / w_sum);
        a.velocity += impulse.scale(wa);
        b.velocity -= impulse.scale(wb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyDesc};
    use crate::collider::Shape;

    fn ball(reg: &mut BodyRegistry, x: i32) -> BodyHandle {
        let desc = BodyDesc::dynamic(Shape::circle(Fix64::HALF), Fix64::ONE).with_position(Vec2Fix::from_int(x, 0));
        reg.insert(Body::from_desc(&desc).unwrap()).unwrap()
    }

    #[test]
    fn test_distance_joint_restores_length() {
        let mut reg = BodyRegistry::new(4);
        let a = ball(&mut reg, 0);
        let b = ball(&mut reg, 4);
        let mut set = JointSet::default();
        set.add(Joint::Distance(DistanceJoint::new(a, b, Fix64::TWO)));
        solve_joints(&mut set, &mut reg, 1);

        assert_eq!(reg.get(a).unwrap().position, Vec2Fix::from_int(1, 0));
        assert_eq!(reg.get(b).unwrap().position, Vec2Fix::from_int(3, 0));
    }

    #[test]
    fn test_range_joint_slack_inside_interval() {
        let mut reg = BodyRegistry::new(4);
        let a = ball(&mut reg, 0);
        let b = ball(&mut reg, 3);
        let mut set = JointSet::default();
        set.add(Joint::Range(RangeJoint::new(a, b, Fix64::ONE, Fix64::from_int(5))));
        solve_joints(&mut set, &mut reg, 4);
        assert_eq!(reg.get(b).unwrap().position, Vec2Fix::from_int(3, 0));
    }

    #[test]
    fn test_range_joint_stops_separation() {
        let mut reg = BodyRegistry::new(4);
        let anchor = reg
            .insert(Body::from_desc(&BodyDesc::fixed(Shape::circle(Fix64::HALF))).unwrap())
            .unwrap();
        let b = ball(&mut reg, 6);
        reg.get_mut(b).unwrap().velocity = Vec2Fix::from_int(2, 1);
        let mut set = JointSet::default();
        set.add(Joint::Range(RangeJoint::new(anchor, b, Fix64::ZERO, Fix64::from_int(5))));
        solve_joints(&mut set, &mut reg, 1);

        let body = reg.get(b).unwrap();
        assert_eq!(body.position, Vec2Fix::from_int(5, 0));
        assert_eq!(body.velocity, Vec2Fix::from_int(0, 1), "outward velocity removed");
        assert_eq!(reg.get(anchor).unwrap().position, Vec2Fix::ZERO);
    }

    #[test]
    fn test_dead_joints_pruned() {
        let mut reg = BodyRegistry::new(4);
        let a = ball(&mut reg, 0);
        let b = ball(&mut reg, 4);
        let mut set = JointSet::default();
        let id = set.add(Joint::Distance(DistanceJoint::new(a, b, Fix64::TWO)));
        assert_eq!(set.get(id).map(Joint::joint_type), Some(JointType::Distance));
        reg.remove(b).unwrap();
        assert_eq!(solve_joints(&mut set, &mut reg, 4), 1);
        assert!(set.is_empty());
        assert_eq!(reg.get(a).unwrap().position, Vec2Fix::ZERO);
    }
}
