//! Body Registry
//!
//! Flat, index-addressed storage for rigid bodies. Everything outside this
//! module refers to bodies through a [`BodyHandle`], never through a
//! reference, so bodies can be created and destroyed mid-run without
//! invalidating anything the host holds.
//!
//! # Handles
//!
//! A handle is `(slot index, generation)`. Destroying a body bumps the
//! slot's generation, which turns every outstanding handle for it stale at
//! once. The freed slot is parked until the start of the next step before it
//! can be reused, so a handle that appeared in this tick's events always
//! resolves to "destroyed" rather than to a newcomer.
//!
//! Handles order by slot index first, which is the order the collision
//! pipeline processes pairs in.

use crate::collider::Shape;
use crate::error::PhysicsError;
use crate::filter::CollisionFilter;
use crate::math::{Fix64, Vec2Fix};
use crate::sleeping::SleepData;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Stable reference to a body in a [`BodyRegistry`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    /// Slot index
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Pack into a single integer for host-side tables
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Unpack a value produced by [`BodyHandle::to_bits`]
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }

    pub(crate) fn invalid_error(self) -> PhysicsError {
        PhysicsError::InvalidHandle {
            index: self.index,
            generation: self.generation,
        }
    }
}

/// How a body takes part in the simulation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BodyKind {
    /// Moved by forces, impulses and contacts
    Dynamic,
    /// Never moves
    Static,
    /// Moves with its own velocity, unaffected by forces or contacts
    Kinematic,
}

/// Mass of a body at creation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mass {
    /// Finite mass (> 0)
    Finite(Fix64),
    /// Immovable in contacts
    Infinite,
}

/// Everything needed to create a body
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyDesc {
    /// Collision shape
    pub shape: Shape,
    /// Mass
    pub mass: Mass,
    /// Kind (an infinite-mass dynamic descriptor becomes static)
    pub kind: BodyKind,
    /// Initial position
    pub position: Vec2Fix,
    /// Initial velocity
    pub velocity: Vec2Fix,
    /// Layer and mask
    pub filter: CollisionFilter,
    /// Bounciness in [0, 1]
    pub restitution: Fix64,
    /// Coulomb friction coefficient
    pub friction: Fix64,
    /// Fraction of velocity kept per tick (1 = no drag)
    pub drag: Fix64,
    /// Multiplier on world gravity
    pub gravity_scale: Fix64,
    /// Host-defined tag, carried untouched
    pub user_tag: u32,
}

impl BodyDesc {
    fn base(shape: Shape, mass: Mass, kind: BodyKind) -> Self {
        Self {
            shape,
            mass,
            kind,
            position: Vec2Fix::ZERO,
            velocity: Vec2Fix::ZERO,
            filter: CollisionFilter::DEFAULT,
            restitution: Fix64::from_ratio(3, 10),
            friction: Fix64::from_ratio(9, 10),
            drag: Fix64::ONE,
            gravity_scale: Fix64::ONE,
            user_tag: 0,
        }
    }

    /// Dynamic body with finite mass
    #[must_use]
    pub fn dynamic(shape: Shape, mass: Fix64) -> Self {
        Self::base(shape, Mass::Finite(mass), BodyKind::Dynamic)
    }

    /// Static body (infinite mass, never moves)
    #[must_use]
    pub fn fixed(shape: Shape) -> Self {
        Self::base(shape, Mass::Infinite, BodyKind::Static)
    }

    /// Kinematic body (moves by velocity, infinite mass in contacts)
    #[must_use]
    pub fn kinematic(shape: Shape) -> Self {
        Self::base(shape, Mass::Infinite, BodyKind::Kinematic)
    }

    /// Set initial position
    #[must_use]
    pub fn with_position(mut self, position: Vec2Fix) -> Self {
        self.position = position;
        self
    }

    /// Set initial velocity
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2Fix) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set layer and mask
    #[must_use]
    pub fn with_filter(mut self, layer: u32, mask: u32) -> Self {
        self.filter = CollisionFilter::new(layer, mask);
        self
    }

    /// Set restitution
    #[must_use]
    pub fn with_restitution(mut self, restitution: Fix64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set friction
    #[must_use]
    pub fn with_friction(mut self, friction: Fix64) -> Self {
        self.friction = friction;
        self
    }

    /// Set per-tick velocity retention
    #[must_use]
    pub fn with_drag(mut self, drag: Fix64) -> Self {
        self.drag = drag;
        self
    }

    /// Set gravity multiplier
    #[must_use]
    pub fn with_gravity_scale(mut self, scale: Fix64) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Set host tag
    #[must_use]
    pub fn with_user_tag(mut self, tag: u32) -> Self {
        self.user_tag = tag;
        self
    }
}

/// A rigid body (point mass with a collision shape)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Body {
    /// Center position
    pub position: Vec2Fix,
    /// Linear velocity
    pub velocity: Vec2Fix,
    /// Force accumulated since the last step
    pub force: Vec2Fix,
    /// Mass (zero for infinite-mass bodies)
    pub mass: Fix64,
    /// Inverse mass (zero for infinite-mass bodies)
    pub inv_mass: Fix64,
    /// Kind
    pub kind: BodyKind,
    /// Collision shape
    pub shape: Shape,
    /// Layer and mask
    pub filter: CollisionFilter,
    /// Restitution
    pub restitution: Fix64,
    /// Friction
    pub friction: Fix64,
    /// Per-tick velocity retention
    pub drag: Fix64,
    /// Gravity multiplier
    pub gravity_scale: Fix64,
    /// Host-defined tag
    pub user_tag: u32,
    /// Sleep tracking
    pub sleep: SleepData,
}

impl Body {
    /// Build a body from a descriptor
    pub fn from_desc(desc: &BodyDesc) -> Result<Self, PhysicsError> {
        if !desc.shape.is_valid() {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "shape dimensions must be > 0",
            });
        }
        let (kind, mass, inv_mass) = match (desc.kind, desc.mass) {
            (BodyKind::Dynamic, Mass::Finite(m)) => {
                if !m.is_positive() {
                    return Err(PhysicsError::InvalidConfiguration {
                        reason: "dynamic body mass must be > 0",
                    });
                }
                (BodyKind::Dynamic, m, Fix64::ONE / m)
            }
            (BodyKind::Dynamic, Mass::Infinite) => (BodyKind::Static, Fix64::ZERO, Fix64::ZERO),
            (kind, _) => (kind, Fix64::ZERO, Fix64::ZERO),
        };
        let velocity = if kind == BodyKind::Static {
            Vec2Fix::ZERO
        } else {
            desc.velocity
        };
        Ok(Self {
            position: desc.position,
            velocity,
            force: Vec2Fix::ZERO,
            mass,
            inv_mass,
            kind,
            shape: desc.shape,
            filter: desc.filter,
            restitution: desc.restitution,
            friction: desc.friction,
            drag: desc.drag,
            gravity_scale: desc.gravity_scale,
            user_tag: desc.user_tag,
            sleep: SleepData::new(),
        })
    }

    /// Dynamic body check
    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    /// Static body check
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    /// Kinematic body check
    #[inline]
    #[must_use]
    pub fn is_kinematic(&self) -> bool {
        self.kind == BodyKind::Kinematic
    }

    /// Sleep check
    #[inline]
    #[must_use]
    pub fn is_sleeping(&self) -> bool {
        self.sleep.is_sleeping()
    }

    /// True for bodies that move this tick (awake dynamic or kinematic)
    #[inline]
    #[must_use]
    pub fn is_moving(&self) -> bool {
        !self.is_static() && !self.is_sleeping()
    }

    /// Apply an instantaneous impulse. Wakes the body.
    pub fn apply_impulse(&mut self, impulse: Vec2Fix) {
        if !self.is_dynamic() {
            return;
        }
        self.velocity += impulse.scale(self.inv_mass);
        self.sleep.wake();
    }

    /// Accumulate a force for the next step. Wakes the body.
    pub fn apply_force(&mut self, force: Vec2Fix) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
        self.sleep.wake();
    }

    /// Kinetic energy `m v^2 / 2` (zero for infinite mass)
    #[must_use]
    pub fn kinetic_energy(&self) -> Fix64 {
        (self.mass * self.velocity.length_squared()).half()
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Flat store of bodies addressed by [`BodyHandle`]
#[derive(Clone, Debug)]
pub struct BodyRegistry {
    slots: Vec<Slot>,
    /// Slots ready for reuse
    free: Vec<u32>,
    /// Slots freed during the current tick
    retired: Vec<u32>,
    live: usize,
    max_bodies: usize,
}

impl BodyRegistry {
    /// Create an empty registry holding at most `max_bodies` live bodies
    #[must_use]
    pub fn new(max_bodies: usize) -> Self {
        Self {
            slots: Vec::with_capacity(max_bodies.min(1024)),
            free: Vec::new(),
            retired: Vec::new(),
            live: 0,
            max_bodies,
        }
    }

    /// Store a body and return its handle
    pub fn insert(&mut self, body: Body) -> Result<BodyHandle, PhysicsError> {
        if self.live >= self.max_bodies {
            return Err(PhysicsError::CapacityExceeded {
                resource: "bodies",
                limit: self.max_bodies,
            });
        }
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    body: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.body = Some(body);
        self.live += 1;
        Ok(BodyHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Remove a body. The handle (and any copy of it) becomes stale.
    pub fn remove(&mut self, handle: BodyHandle) -> Result<Body, PhysicsError> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.body.is_some())
            .ok_or_else(|| handle.invalid_error())?;
        let body = slot.body.take().ok_or_else(|| handle.invalid_error())?;
        slot.generation = slot.generation.wrapping_add(1);
        self.retired.push(handle.index);
        self.live -= 1;
        Ok(body)
    }

    /// Make slots freed during the previous tick available again.
    ///
    /// Lowest indices are reused first.
    pub fn recycle_retired(&mut self) {
        if self.retired.is_empty() {
            return;
        }
        self.free.append(&mut self.retired);
        self.free.sort_unstable_by(|a, b| b.cmp(a));
    }

    /// Look up a body
    #[must_use]
    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_ref())
    }

    /// Look up a body mutably
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.body.as_mut())
    }

    /// True if `handle` refers to a live body
    #[must_use]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Handle of the live body in slot `index`
    #[must_use]
    pub fn handle_at(&self, index: u32) -> Option<BodyHandle> {
        self.slots.get(index as usize).and_then(|s| {
            s.body.as_ref().map(|_| BodyHandle {
                index,
                generation: s.generation,
            })
        })
    }

    /// Body in slot `index`
    #[inline]
    #[must_use]
    pub fn at(&self, index: u32) -> Option<&Body> {
        self.slots.get(index as usize).and_then(|s| s.body.as_ref())
    }

    /// Body in slot `index`, mutably
    #[inline]
    pub fn at_mut(&mut self, index: u32) -> Option<&mut Body> {
        self.slots.get_mut(index as usize).and_then(|s| s.body.as_mut())
    }

    /// Two distinct bodies by slot index, mutably
    pub fn pair_mut(&mut self, a: u32, b: u32) -> Option<(&mut Body, &mut Body)> {
        let (a, b) = (a as usize, b as usize);
        if a == b || a.max(b) >= self.slots.len() {
            return None;
        }
        let (lo, hi, swapped) = if a < b { (a, b, false) } else { (b, a, true) };
        let (left, right) = self.slots.split_at_mut(hi);
        let first = left[lo].body.as_mut()?;
        let second = right[0].body.as_mut()?;
        if swapped {
            Some((second, first))
        } else {
            Some((first, second))
        }
    }

    /// Live bodies in ascending handle order
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.body.as_ref().map(|b| {
                (
                    BodyHandle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    b,
                )
            })
        })
    }

    /// Live bodies in ascending handle order, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut Body)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            let generation = s.generation;
            s.body.as_mut().map(|b| {
                (
                    BodyHandle {
                        index: i as u32,
                        generation,
                    },
                    b,
                )
            })
        })
    }

    /// Number of live bodies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// True if no body is alive
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated (live or free)
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Maximum number of live bodies
    #[inline]
    #[must_use]
    pub fn max_bodies(&self) -> usize {
        self.max_bodies
    }

    /// Total kinetic energy of all finite-mass bodies
    #[must_use]
    pub fn kinetic_energy(&self) -> Fix64 {
        self.iter()
            .fold(Fix64::ZERO, |acc, (_, b)| acc + b.kinetic_energy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball() -> BodyDesc {
        BodyDesc::dynamic(Shape::circle(Fix64::HALF), Fix64::ONE)
    }

    #[test]
    fn test_insert_and_get() {
        let mut reg = BodyRegistry::new(8);
        let desc = ball().with_position(Vec2Fix::from_int(3, 4));
        let h = reg.insert(Body::from_desc(&desc).unwrap()).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(h).unwrap().position, Vec2Fix::from_int(3, 4));
        assert_eq!(reg.get(h).unwrap().inv_mass, Fix64::ONE);
    }

    #[test]
    fn test_stale_handle_after_remove() {
        let mut reg = BodyRegistry::new(8);
        let h = reg.insert(Body::from_desc(&ball()).unwrap()).unwrap();
        assert!(reg.remove(h).is_ok());
        assert!(reg.get(h).is_none());
        assert_eq!(
            reg.remove(h),
            Err(PhysicsError::InvalidHandle {
                index: h.index(),
                generation: h.generation()
            })
        );
    }

    #[test]
    fn test_slot_not_reused_until_recycled() {
        let mut reg = BodyRegistry::new(8);
        let a = reg.insert(Body::from_desc(&ball()).unwrap()).unwrap();
        reg.remove(a).unwrap();

        let b = reg.insert(Body::from_desc(&ball()).unwrap()).unwrap();
        assert_ne!(a.index(), b.index(), "slot reused within the same tick");

        reg.recycle_retired();
        let c = reg.insert(Body::from_desc(&ball()).unwrap()).unwrap();
        assert_eq!(c.index(), a.index());
        assert_ne!(c.generation(), a.generation());
        assert!(reg.get(a).is_none());
        assert!(reg.get(c).is_some());
    }

    #[test]
    fn test_capacity_limit() {
        let mut reg = BodyRegistry::new(2);
        reg.insert(Body::from_desc(&ball()).unwrap()).unwrap();
        reg.insert(Body::from_desc(&ball()).unwrap()).unwrap();
        let err = reg.insert(Body::from_desc(&ball()).unwrap());
        assert!(matches!(err, Err(PhysicsError::CapacityExceeded { limit: 2, .. })));
    }

    #[test]
    fn test_invalid_mass_rejected() {
        let desc = BodyDesc::dynamic(Shape::circle(Fix64::ONE), Fix64::ZERO);
        assert!(Body::from_desc(&desc).is_err());
        let desc = BodyDesc::dynamic(Shape::circle(Fix64::ZERO), Fix64::ONE);
        assert!(Body::from_desc(&desc).is_err());
    }

    #[test]
    fn test_infinite_mass_dynamic_becomes_static() {
        let mut desc = ball();
        desc.mass = Mass::Infinite;
        desc.velocity = Vec2Fix::from_int(1, 0);
        let body = Body::from_desc(&desc).unwrap();
        assert!(body.is_static());
        assert_eq!(body.inv_mass, Fix64::ZERO);
        assert_eq!(body.velocity, Vec2Fix::ZERO);
    }

    #[test]
    fn test_impulse_changes_velocity_and_wakes() {
        let mut body = Body::from_desc(&BodyDesc::dynamic(Shape::circle(Fix64::ONE), Fix64::TWO)).unwrap();
        body.sleep.put_to_sleep();
        body.apply_impulse(Vec2Fix::from_int(4, 0));
        assert_eq!(body.velocity, Vec2Fix::from_int(2, 0));
        assert!(!body.is_sleeping());

        let mut wall = Body::from_desc(&BodyDesc::fixed(Shape::circle(Fix64::ONE))).unwrap();
        wall.apply_impulse(Vec2Fix::from_int(4, 0));
        assert_eq!(wall.velocity, Vec2Fix::ZERO);
    }

    #[test]
    fn test_iteration_is_ascending() {
        let mut reg = BodyRegistry::new(8);
        let hs: Vec<_> = (0..4)
            .map(|_| reg.insert(Body::from_desc(&ball()).unwrap()).unwrap())
            .collect();
        reg.remove(hs[1]).unwrap();
        let seen: Vec<_> = reg.iter().map(|(h, _)| h).collect();
        assert_eq!(seen, vec![hs[0], hs[2], hs[3]]);
    }

    #[test]
    fn test_pair_mut() {
        let mut reg = BodyRegistry::new(8);
        let a = reg.insert(Body::from_desc(&ball()).unwrap()).unwrap();
        let b = reg.insert(Body::from_desc(&ball()).unwrap()).unwrap();
        {
            let (x, y) = reg.pair_mut(b.index(), a.index()).unwrap();
            x.velocity = Vec2Fix::from_int(1, 0);
            y.velocity = Vec2Fix::from_int(-1, 0);
        }
        assert_eq!(reg.get(b).unwrap().velocity, Vec2Fix::from_int(1, 0));
        assert_eq!(reg.get(a).unwrap().velocity, Vec2Fix::from_int(-1, 0));
        assert!(reg.pair_mut(a.index(), a.index()).is_none());
    }

    #[test]
    fn test_handle_bits_roundtrip() {
        let h = BodyHandle {
            index: 7,
            generation: 3,
        };
        assert_eq!(BodyHandle::from_bits(h.to_bits()), h);
    }
}
