//! Collision Shapes and Narrow-Phase
//!
//! Shapes are a closed tagged variant (circle, capsule, AABB). Every pair is
//! dispatched through one `match` in [`collide`], which produces a
//! [`Contact`] or `None`.
//!
//! # Conventions
//!
//! - The contact normal always points from the first shape toward the second.
//! - `depth` is positive when the shapes overlap; touching shapes report a
//!   zero-depth contact.
//! - Coincident centers have no defined direction; the normal falls back to
//!   +Y so the solver still separates them deterministically.

use crate::body::{Body, BodyHandle, BodyRegistry};
use crate::math::{Fix64, Vec2Fix};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Axis-aligned bounding box in world space
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec2Fix,
    /// Maximum corner
    pub max: Vec2Fix,
}

impl Aabb {
    /// Create from corners
    #[inline]
    #[must_use]
    pub const fn new(min: Vec2Fix, max: Vec2Fix) -> Self {
        Self { min, max }
    }

    /// Create from center and half extents
    #[inline]
    #[must_use]
    pub fn from_center(center: Vec2Fix, half_extents: Vec2Fix) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Check overlap (touching counts)
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Point containment (boundary counts)
    #[inline]
    #[must_use]
    pub fn contains(&self, p: Vec2Fix) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Closest point inside the box
    #[inline]
    #[must_use]
    pub fn clamp_point(&self, p: Vec2Fix) -> Vec2Fix {
        Vec2Fix::new(p.x.clamp(self.min.x, self.max.x), p.y.clamp(self.min.y, self.max.y))
    }

    /// Center point
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec2Fix {
        Vec2Fix::new((self.min.x + self.max.x).half(), (self.min.y + self.max.y).half())
    }
}

/// Collision shape, positioned by its owning body's center
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    /// Circle of the given radius
    Circle {
        /// Radius
        radius: Fix64,
    },
    /// Segment swept by a circle. The segment runs from
    /// `center - half_segment` to `center + half_segment`.
    Capsule {
        /// Radius around the segment
        radius: Fix64,
        /// Half of the core segment, relative to the body center
        half_segment: Vec2Fix,
    },
    /// Axis-aligned box
    Aabb {
        /// Half width and half height
        half_extents: Vec2Fix,
    },
}

impl Shape {
    /// Circle shape
    #[must_use]
    pub const fn circle(radius: Fix64) -> Self {
        Self::Circle { radius }
    }

    /// Vertical capsule with the given total segment length
    #[must_use]
    pub fn vertical_capsule(radius: Fix64, segment_length: Fix64) -> Self {
        Self::Capsule {
            radius,
            half_segment: Vec2Fix::new(Fix64::ZERO, segment_length.half()),
        }
    }

    /// Box shape
    #[must_use]
    pub const fn aabb(half_extents: Vec2Fix) -> Self {
        Self::Aabb { half_extents }
    }

    /// Radius of a circle centered on the body that encloses the shape
    #[must_use]
    pub fn bounding_radius(&self) -> Fix64 {
        match *self {
            Self::Circle { radius } => radius,
            Self::Capsule {
                radius,
                half_segment,
            } => half_segment.length() + radius,
            Self::Aabb { half_extents } => half_extents.length(),
        }
    }

    /// World-space bounds when centered at `center`
    #[must_use]
    pub fn bounds(&self, center: Vec2Fix) -> Aabb {
        let half = match *self {
            Self::Circle { radius } => Vec2Fix::new(radius, radius),
            Self::Capsule {
                radius,
                half_segment,
            } => Vec2Fix::new(half_segment.x.abs() + radius, half_segment.y.abs() + radius),
            Self::Aabb { half_extents } => half_extents,
        };
        Aabb::from_center(center, half)
    }

    /// Reject non-positive dimensions
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Circle { radius } => radius.is_positive(),
            Self::Capsule { radius, .. } => radius.is_positive(),
            Self::Aabb { half_extents } => {
                half_extents.x.is_positive() && half_extents.y.is_positive()
            }
        }
    }
}

/// Geometric contact between two shapes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    /// Contact point (world space)
    pub point: Vec2Fix,
    /// Unit normal from the first shape toward the second
    pub normal: Vec2Fix,
    /// Penetration depth (>= 0)
    pub depth: Fix64,
}

impl Contact {
    #[inline]
    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

// ============================================================================
// Segment helpers
// ============================================================================

/// Closest point to `p` on segment `a`-`b`
#[must_use]
pub fn closest_point_on_segment(p: Vec2Fix, a: Vec2Fix, b: Vec2Fix) -> Vec2Fix {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq.is_zero() {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(Fix64::ZERO, Fix64::ONE);
    a + ab.scale(t)
}

/// Closest points between segments `p1`-`q1` and `p2`-`q2`
#[must_use]
pub fn closest_points_between_segments(
    p1: Vec2Fix,
    q1: Vec2Fix,
    p2: Vec2Fix,
    q2: Vec2Fix,
) -> (Vec2Fix, Vec2Fix) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a.is_zero() && e.is_zero() {
        return (p1, p2);
    }

    let (s, t);
    if a.is_zero() {
        s = Fix64::ZERO;
        t = (f / e).clamp(Fix64::ZERO, Fix64::ONE);
    } else {
        let c = d1.dot(r);
        if e.is_zero() {
            t = Fix64::ZERO;
            s = (-c / a).clamp(Fix64::ZERO, Fix64::ONE);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            // Parallel segments: any s works, pick the start
            let s0 = if denom.is_positive() {
                ((b * f - c * e) / denom).clamp(Fix64::ZERO, Fix64::ONE)
            } else {
                Fix64::ZERO
            };
            let t0 = (b * s0 + f) / e;
            if t0.is_negative() {
                t = Fix64::ZERO;
                s = (-c / a).clamp(Fix64::ZERO, Fix64::ONE);
            } else if t0 > Fix64::ONE {
                t = Fix64::ONE;
                s = ((b - c) / a).clamp(Fix64::ZERO, Fix64::ONE);
            } else {
                t = t0;
                s = s0;
            }
        }
    }
    (p1 + d1.scale(s), p2 + d2.scale(t))
}

#[inline]
fn capsule_ends(center: Vec2Fix, half_segment: Vec2Fix) -> (Vec2Fix, Vec2Fix) {
    (center - half_segment, center + half_segment)
}

// ============================================================================
// Pair tests
// ============================================================================

/// Circle vs circle
#[must_use]
pub fn circle_vs_circle(ca: Vec2Fix, ra: Fix64, cb: Vec2Fix, rb: Fix64) -> Option<Contact> {
    let delta = cb - ca;
    let dist_sq = delta.length_squared();
    let sum = ra + rb;
    if dist_sq > sum * sum {
        return None;
    }
    let dist = delta.length();
    let normal = if dist.is_zero() {
        Vec2Fix::UNIT_Y
    } else {
        Vec2Fix::new(delta.x / dist, delta.y / dist)
    };
    Some(Contact {
        point: ca + normal.scale(ra),
        normal,
        depth: (sum - dist).max(Fix64::ZERO),
    })
}

/// Circle vs capsule
#[must_use]
pub fn circle_vs_capsule(
    c: Vec2Fix,
    r: Fix64,
    cap_center: Vec2Fix,
    cap_radius: Fix64,
    half_segment: Vec2Fix,
) -> Option<Contact> {
    let (a, b) = capsule_ends(cap_center, half_segment);
    let closest = closest_point_on_segment(c, a, b);
    circle_vs_circle(c, r, closest, cap_radius)
}

/// Capsule vs capsule
#[must_use]
pub fn capsule_vs_capsule(
    ca: Vec2Fix,
    ra: Fix64,
    ha: Vec2Fix,
    cb: Vec2Fix,
    rb: Fix64,
    hb: Vec2Fix,
) -> Option<Contact> {
    let (a0, a1) = capsule_ends(ca, ha);
    let (b0, b1) = capsule_ends(cb, hb);
    let (pa, pb) = closest_points_between_segments(a0, a1, b0, b1);
    circle_vs_circle(pa, ra, pb, rb)
}

/// Box vs circle (normal points from the box toward the circle)
#[must_use]
pub fn aabb_vs_circle(box_center: Vec2Fix, half: Vec2Fix, c: Vec2Fix, r: Fix64) -> Option<Contact> {
    let bounds = Aabb::from_center(box_center, half);
    if !bounds.contains(c) {
        let closest = bounds.clamp_point(c);
        let delta = c - closest;
        let dist_sq = delta.length_squared();
        if dist_sq > r * r {
            return None;
        }
        let dist = delta.length();
        let normal = if dist.is_zero() {
            Vec2Fix::UNIT_Y
        } else {
            Vec2Fix::new(delta.x / dist, delta.y / dist)
        };
        return Some(Contact {
            point: closest,
            normal,
            depth: (r - dist).max(Fix64::ZERO),
        });
    }

    // Center inside the box: push out through the nearest face
    let left = c.x - bounds.min.x;
    let right = bounds.max.x - c.x;
    let bottom = c.y - bounds.min.y;
    let top = bounds.max.y - c.y;
    let mut best = top;
    let mut normal = Vec2Fix::UNIT_Y;
    let mut point = Vec2Fix::new(c.x, bounds.max.y);
    if bottom < best {
        best = bottom;
        normal = -Vec2Fix::UNIT_Y;
        point = Vec2Fix::new(c.x, bounds.min.y);
    }
    if right < best {
        best = right;
        normal = Vec2Fix::UNIT_X;
        point = Vec2Fix::new(bounds.max.x, c.y);
    }
    if left < best {
        best = left;
        normal = -Vec2Fix::UNIT_X;
        point = Vec2Fix::new(bounds.min.x, c.y);
    }
    Some(Contact {
        point,
        normal,
        depth: best + r,
    })
}

/// Box vs capsule (normal points from the box toward the capsule)
///
/// The capsule core is reduced to the segment point nearest the box by two
/// alternating projections, then tested as a circle.
#[must_use]
pub fn aabb_vs_capsule(
    box_center: Vec2Fix,
    half: Vec2Fix,
    cap_center: Vec2Fix,
    cap_radius: Fix64,
    half_segment: Vec2Fix,
) -> Option<Contact> {
    let bounds = Aabb::from_center(box_center, half);
    let (a, b) = capsule_ends(cap_center, half_segment);
    let mut s = closest_point_on_segment(box_center, a, b);
    for _ in 0..2 {
        let q = bounds.clamp_point(s);
        s = closest_point_on_segment(q, a, b);
    }
    aabb_vs_circle(box_center, half, s, cap_radius)
}

/// Box vs box (normal along the axis of least overlap)
#[must_use]
pub fn aabb_vs_aabb(ca: Vec2Fix, ha: Vec2Fix, cb: Vec2Fix, hb: Vec2Fix) -> Option<Contact> {
    let delta = cb - ca;
    let overlap_x = ha.x + hb.x - delta.x.abs();
    let overlap_y = ha.y + hb.y - delta.y.abs();
    if overlap_x.is_negative() || overlap_y.is_negative() {
        return None;
    }
    let a = Aabb::from_center(ca, ha);
    let b = Aabb::from_center(cb, hb);
    let overlap_min = a.min.max(b.min);
    let overlap_max = a.max.min(b.max);
    let point = Vec2Fix::new(
        (overlap_min.x + overlap_max.x).half(),
        (overlap_min.y + overlap_max.y).half(),
    );
    let (normal, depth) = if overlap_x < overlap_y {
        let sign = if delta.x.is_negative() { Fix64::NEG_ONE } else { Fix64::ONE };
        (Vec2Fix::new(sign, Fix64::ZERO), overlap_x)
    } else {
        let sign = if delta.y.is_negative() { Fix64::NEG_ONE } else { Fix64::ONE };
        (Vec2Fix::new(Fix64::ZERO, sign), overlap_y)
    };
    Some(Contact {
        point,
        normal,
        depth,
    })
}

/// Narrow-phase dispatch for any pair of shapes
///
/// Returns `None` when the shapes are separated.
#[must_use]
pub fn collide(a: &Shape, pa: Vec2Fix, b: &Shape, pb: Vec2Fix) -> Option<Contact> {
    match (*a, *b) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_vs_circle(pa, ra, pb, rb)
        }
        (
            Shape::Circle { radius: ra },
            Shape::Capsule {
                radius: rb,
                half_segment: hb,
            },
        ) => circle_vs_capsule(pa, ra, pb, rb, hb),
        (
            Shape::Capsule {
                radius: ra,
                half_segment: ha,
            },
            Shape::Circle { radius: rb },
        ) => circle_vs_capsule(pb, rb, pa, ra, ha).map(Contact::flipped),
        (
            Shape::Capsule {
                radius: ra,
                half_segment: ha,
            },
            Shape::Capsule {
                radius: rb,
                half_segment: hb,
            },
        ) => capsule_vs_capsule(pa, ra, ha, pb, rb, hb),
        (Shape::Aabb { half_extents: ha }, Shape::Circle { radius: rb }) => {
            aabb_vs_circle(pa, ha, pb, rb)
        }
        (Shape::Circle { radius: ra }, Shape::Aabb { half_extents: hb }) => {
            aabb_vs_circle(pb, hb, pa, ra).map(Contact::flipped)
        }
        (
            Shape::Aabb { half_extents: ha },
            Shape::Capsule {
                radius: rb,
                half_segment: hb,
            },
        ) => aabb_vs_capsule(pa, ha, pb, rb, hb),
        (
            Shape::Capsule {
                radius: ra,
                half_segment: ha,
            },
            Shape::Aabb { half_extents: hb },
        ) => aabb_vs_capsule(pb, hb, pa, ra, ha).map(Contact::flipped),
        (Shape::Aabb { half_extents: ha }, Shape::Aabb { half_extents: hb }) => {
            aabb_vs_aabb(pa, ha, pb, hb)
        }
    }
}

// ============================================================================
// Contact manifolds
// ============================================================================

/// A contact between two registered bodies, rebuilt every tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactManifold {
    /// Lower-indexed body
    pub body_a: BodyHandle,
    /// Higher-indexed body
    pub body_b: BodyHandle,
    /// Contact point (world space)
    pub point: Vec2Fix,
    /// Unit normal from A toward B
    pub normal: Vec2Fix,
    /// Penetration depth when detected
    pub depth: Fix64,
    /// Combined restitution
    pub restitution: Fix64,
    /// Combined friction
    pub friction: Fix64,
}

impl ContactManifold {
    /// Build from a contact between `a` and `b`, combining their materials
    #[must_use]
    pub fn new(body_a: BodyHandle, a: &Body, body_b: BodyHandle, b: &Body, contact: Contact) -> Self {
        Self {
            body_a,
            body_b,
            point: contact.point,
            normal: contact.normal,
            depth: contact.depth,
            restitution: combine_restitution(a.restitution, b.restitution),
            friction: combine_friction(a.friction, b.friction),
        }
    }
}

/// Pair restitution: the bouncier body wins
#[inline]
#[must_use]
pub fn combine_restitution(a: Fix64, b: Fix64) -> Fix64 {
    a.max(b)
}

/// Pair friction: geometric mean
#[inline]
#[must_use]
pub fn combine_friction(a: Fix64, b: Fix64) -> Fix64 {
    (a * b).sqrt()
}

fn test_pair(bodies: &BodyRegistry, lo: u32, hi: u32) -> Option<ContactManifold> {
    let ha = bodies.handle_at(lo)?;
    let hb = bodies.handle_at(hi)?;
    let a = bodies.at(lo)?;
    let b = bodies.at(hi)?;
    let contact = collide(&a.shape, a.position, &b.shape, b.position)?;
    Some(ContactManifold::new(ha, a, hb, b, contact))
}

/// Run the shape tests for every broad-phase pair.
///
/// Manifolds come out in the same order as `pairs`. With the `parallel`
/// feature the tests run on the rayon pool; the collected order is the
/// same either way.
pub fn narrow_phase(bodies: &BodyRegistry, pairs: &[(u32, u32)], out: &mut Vec<ContactManifold>) {
    out.clear();

    #[cfg(feature = "parallel")]
    {
        let found: Vec<Option<ContactManifold>> = pairs
            .par_iter()
            .map(|&(lo, hi)| test_pair(bodies, lo, hi))
            .collect();
        out.extend(found.into_iter().flatten());
    }

    #[cfg(not(feature = "parallel"))]
    {
        out.extend(pairs.iter().filter_map(|&(lo, hi)| test_pair(bodies, lo, hi)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(v: f64) -> Fix64 {
        Fix64::from_f64(v)
    }

    fn approx(a: Fix64, b: f64) -> bool {
        (a.to_f64() - b).abs() < 1e-6
    }

    #[test]
    fn test_circle_circle_overlap() {
        let c = circle_vs_circle(
            Vec2Fix::from_f64(-0.45, 0.0),
            f(0.5),
            Vec2Fix::from_f64(0.45, 0.0),
            f(0.5),
        )
        .expect("overlapping circles");
        assert!(approx(c.depth, 0.1));
        assert!(approx(c.normal.x, 1.0));
        assert!(approx(c.normal.y, 0.0));
        assert!(approx(c.point.x, 0.05));
    }

    #[test]
    fn test_circle_circle_separated() {
        let c = circle_vs_circle(Vec2Fix::ZERO, f(0.5), Vec2Fix::from_int(2, 0), f(0.5));
        assert!(c.is_none());
    }

    #[test]
    fn test_coincident_circles_use_up_normal() {
        let c = circle_vs_circle(Vec2Fix::ZERO, Fix64::ONE, Vec2Fix::ZERO, Fix64::ONE)
            .expect("coincident circles overlap");
        assert_eq!(c.normal, Vec2Fix::UNIT_Y);
        assert_eq!(c.depth, Fix64::TWO);
    }

    #[test]
    fn test_circle_capsule_side_hit() {
        let cap = Shape::vertical_capsule(f(0.25), Fix64::TWO);
        let circle = Shape::circle(f(0.5));
        let c = collide(&circle, Vec2Fix::from_f64(-0.7, 0.5), &cap, Vec2Fix::ZERO)
            .expect("circle touches capsule side");
        assert!(approx(c.normal.x, 1.0));
        assert!(approx(c.depth, 0.05));

        // Reverse order flips the normal
        let r = collide(&cap, Vec2Fix::ZERO, &circle, Vec2Fix::from_f64(-0.7, 0.5))
            .expect("symmetric");
        assert!(approx(r.normal.x, -1.0));
    }

    #[test]
    fn test_circle_capsule_end_cap() {
        let cap = Shape::vertical_capsule(f(0.25), Fix64::TWO);
        let circle = Shape::circle(f(0.5));
        let c = collide(&circle, Vec2Fix::from_f64(0.0, 1.6), &cap, Vec2Fix::ZERO)
            .expect("circle rests on top cap");
        assert!(approx(c.normal.y, -1.0));
        assert!(approx(c.depth, 0.15));
        assert!(collide(&circle, Vec2Fix::from_f64(0.0, 2.0), &cap, Vec2Fix::ZERO).is_none());
    }

    #[test]
    fn test_capsule_capsule_parallel() {
        let a = Shape::vertical_capsule(f(0.25), Fix64::TWO);
        let b = Shape::vertical_capsule(f(0.25), Fix64::TWO);
        let c = collide(&a, Vec2Fix::ZERO, &b, Vec2Fix::from_f64(0.4, 0.5))
            .expect("parallel capsules overlap");
        assert!(approx(c.normal.x, 1.0));
        assert!(approx(c.depth, 0.1));
    }

    #[test]
    fn test_capsule_capsule_crossing() {
        let a = Shape::Capsule {
            radius: f(0.1),
            half_segment: Vec2Fix::from_int(1, 0),
        };
        let b = Shape::vertical_capsule(f(0.1), Fix64::TWO);
        let c = collide(&a, Vec2Fix::ZERO, &b, Vec2Fix::from_f64(0.0, 1.15))
            .expect("T-shaped capsules touch");
        assert!(approx(c.normal.y, 1.0));
        assert!(approx(c.depth, 0.05));
    }

    #[test]
    fn test_circle_aabb_outside() {
        let ground = Shape::aabb(Vec2Fix::from_int(5, 1));
        let ball = Shape::circle(f(0.5));
        let c = collide(&ball, Vec2Fix::from_f64(0.0, 1.4), &ground, Vec2Fix::ZERO)
            .expect("ball sinks into ground");
        // Normal from ball toward the ground
        assert!(approx(c.normal.y, -1.0));
        assert!(approx(c.depth, 0.1));
        assert!(approx(c.point.y, 1.0));
    }

    #[test]
    fn test_circle_center_inside_aabb() {
        let c = aabb_vs_circle(
            Vec2Fix::ZERO,
            Vec2Fix::from_int(1, 1),
            Vec2Fix::from_f64(0.8, 0.0),
            f(0.1),
        )
        .expect("center inside box");
        assert!(approx(c.normal.x, 1.0));
        assert!(approx(c.depth, 0.3));
    }

    #[test]
    fn test_capsule_aabb() {
        let ground = Shape::aabb(Vec2Fix::from_int(5, 1));
        let cap = Shape::vertical_capsule(f(0.25), Fix64::ONE);
        let c = collide(&cap, Vec2Fix::from_f64(0.0, 1.7), &ground, Vec2Fix::ZERO)
            .expect("capsule foot touches ground");
        assert!(approx(c.normal.y, -1.0));
        assert!(approx(c.depth, 0.05));
        assert!(collide(&cap, Vec2Fix::from_f64(0.0, 1.8), &ground, Vec2Fix::ZERO).is_none());
    }

    #[test]
    fn test_aabb_aabb() {
        let a = Shape::aabb(Vec2Fix::from_int(1, 1));
        let c = collide(&a, Vec2Fix::ZERO, &a, Vec2Fix::from_f64(1.5, 0.2))
            .expect("boxes overlap");
        assert_eq!(c.normal, Vec2Fix::UNIT_X);
        assert!(approx(c.depth, 0.5));
        assert!(collide(&a, Vec2Fix::ZERO, &a, Vec2Fix::from_int(3, 0)).is_none());
    }

    #[test]
    fn test_bounding_radius() {
        assert_eq!(Shape::circle(Fix64::ONE).bounding_radius(), Fix64::ONE);
        let cap = Shape::vertical_capsule(Fix64::HALF, Fix64::TWO);
        assert_eq!(cap.bounding_radius(), Fix64::from_ratio(3, 2));
        let b = Shape::aabb(Vec2Fix::from_int(3, 4));
        assert_eq!(b.bounding_radius(), Fix64::from_int(5));
    }

    #[test]
    fn test_shape_validity() {
        assert!(Shape::circle(Fix64::ONE).is_valid());
        assert!(!Shape::circle(Fix64::ZERO).is_valid());
        assert!(!Shape::aabb(Vec2Fix::new(Fix64::ONE, Fix64::ZERO)).is_valid());
    }

    #[test]
    fn test_segment_closest_point() {
        let p = closest_point_on_segment(
            Vec2Fix::from_int(5, 3),
            Vec2Fix::ZERO,
            Vec2Fix::from_int(2, 0),
        );
        assert_eq!(p, Vec2Fix::from_int(2, 0));
        let degenerate = closest_point_on_segment(Vec2Fix::from_int(5, 3), Vec2Fix::ZERO, Vec2Fix::ZERO);
        assert_eq!(degenerate, Vec2Fix::ZERO);
    }

    #[test]
    fn test_combined_materials() {
        assert_eq!(combine_restitution(f(0.3), f(1.0)), Fix64::ONE);
        assert!(approx(combine_friction(f(0.25), Fix64::ONE), 0.5));
    }

    #[test]
    fn test_narrow_phase_keeps_pair_order() {
        use crate::body::BodyDesc;
        let mut reg = BodyRegistry::new(8);
        let ball = |x: f64| {
            Body::from_desc(
                &BodyDesc::dynamic(Shape::circle(Fix64::HALF), Fix64::ONE)
                    .with_position(Vec2Fix::from_f64(x, 0.0)),
            )
            .unwrap()
        };
        reg.insert(ball(0.0)).unwrap();
        reg.insert(ball(0.9)).unwrap();
        reg.insert(ball(1.8)).unwrap();
        reg.insert(ball(9.0)).unwrap();

        let mut out = Vec::new();
        narrow_phase(&reg, &[(0, 1), (1, 2), (2, 3)], &mut out);
        assert_eq!(out.len(), 2, "separated pair produces no manifold");
        assert_eq!(out[0].body_a.index(), 0);
        assert_eq!(out[1].body_a.index(), 1);
        assert_eq!(out[0].normal, Vec2Fix::UNIT_X);
        assert!(approx(out[0].depth, 0.1));
        assert!(approx(out[0].restitution, 0.3));
    }
}
