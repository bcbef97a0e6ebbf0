//! Sequential-Impulse Contact Solver
//!
//! Resolves the tick's contact manifolds in three phases:
//!
//! 1. **Velocity passes**: a fixed number of sweeps over the manifolds, each
//!    applying the normal impulse that drives the relative normal velocity to
//!    its restitution target, then a Coulomb friction impulse along the
//!    tangent. Impulses are accumulated per contact and clamped, so the
//!    solver never pulls bodies together.
//! 2. **Event reporting**: contacts whose accumulated normal impulse crossed
//!    the reporting threshold become [`CollisionEvent`]s, in manifold order.
//! 3. **Position passes**: Baumgarte-style correction of the remaining
//!    penetration. Only positions move, so no energy is added.
//!
//! Manifolds arrive sorted by `(lower index, higher index)`, and every loop
//! here walks them in that order.

use crate::body::BodyRegistry;
use crate::collider::ContactManifold;
use crate::event::{CollisionEvent, EventQueue};
use crate::math::{Fix64, Vec2Fix};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

// ============================================================================
// Configuration
// ============================================================================

/// Solver configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    /// Velocity sweeps per tick
    pub velocity_iterations: u32,
    /// Positional correction sweeps per tick
    pub position_iterations: u32,
    /// Fraction of the remaining penetration removed per sweep
    pub position_correction: Fix64,
    /// Penetration left alone to keep resting contacts stable
    pub penetration_slop: Fix64,
    /// Residual penetration considered degraded (reported in step stats)
    pub penetration_tolerance: Fix64,
    /// Minimum accumulated normal impulse that produces an event
    pub impulse_report_threshold: Fix64,
    /// Approach speeds below this do not bounce
    pub restitution_velocity_threshold: Fix64,
    /// Sweeps over body joints per tick
    pub joint_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            velocity_iterations: 8,
            position_iterations: 4,
            position_correction: Fix64::from_ratio(4, 5),
            penetration_slop: Fix64::from_ratio(1, 200),
            penetration_tolerance: Fix64::from_ratio(1, 100),
            impulse_report_threshold: Fix64::from_ratio(1, 20),
            restitution_velocity_threshold: Fix64::from_ratio(1, 20),
            joint_iterations: 4,
        }
    }
}

// ============================================================================
// Solver
// ============================================================================

/// Per-contact scratch state
#[derive(Clone, Copy, Debug)]
struct ContactState {
    /// Effective inverse mass along the normal (and tangent)
    k: Fix64,
    /// Desired post-solve normal velocity
    target: Fix64,
    normal_impulse: Fix64,
    tangent_impulse: Fix64,
    /// Positions when the solve started, for depth tracking
    pa0: Vec2Fix,
    pb0: Vec2Fix,
}

/// What one solve produced
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolveSummary {
    /// Events pushed to the queue
    pub events_reported: u32,
    /// Events that displaced older ones from a full queue
    pub events_dropped: u32,
    /// Sleeping bodies woken by contact with a moving body
    pub woken: u32,
    /// Largest penetration left after the position passes
    pub max_penetration: Fix64,
    /// Contacts whose residual penetration exceeds the tolerance
    pub deep_contacts: u32,
}

/// Reusable contact solver
#[derive(Clone, Debug, Default)]
pub struct ContactSolver {
    states: Vec<ContactState>,
}

impl ContactSolver {
    /// Create a solver with no scratch state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `manifolds` and report qualifying contacts into `events`
    pub fn solve(
        &mut self,
        bodies: &mut BodyRegistry,
        manifolds: &[ContactManifold],
        config: &SolverConfig,
        tick: u64,
        events: &mut EventQueue,
    ) -> SolveSummary {
        let mut summary = SolveSummary {
            woken: wake_touched(bodies, manifolds),
            ..SolveSummary::default()
        };
        self.prepare(bodies, manifolds, config);

        for _ in 0..config.velocity_iterations {
            for (m, s) in manifolds.iter().zip(self.states.iter_mut()) {
                solve_velocity(bodies, m, s);
            }
        }

        for (m, s) in manifolds.iter().zip(self.states.iter()) {
            if s.normal_impulse >= config.impulse_report_threshold {
                let dropped = events.push(CollisionEvent {
                    body_a: m.body_a,
                    body_b: m.body_b,
                    point: m.point,
                    normal: m.normal,
                    impulse: s.normal_impulse,
                    tick,
                });
                summary.events_reported += 1;
                if dropped {
                    summary.events_dropped += 1;
                }
            }
        }

        for _ in 0..config.position_iterations {
            for (m, s) in manifolds.iter().zip(self.states.iter()) {
                correct_position(bodies, m, s, config);
            }
        }

        for (m, s) in manifolds.iter().zip(self.states.iter()) {
            let depth = current_depth(bodies, m, s);
            summary.max_penetration = summary.max_penetration.max(depth);
            if depth > config.penetration_tolerance {
                summary.deep_contacts += 1;
            }
        }
        summary
    }

    fn prepare(&mut self, bodies: &BodyRegistry, manifolds: &[ContactManifold], config: &SolverConfig) {
        self.states.clear();
        for m in manifolds {
            let state = match (bodies.at(m.body_a.index()), bodies.at(m.body_b.index())) {
                (Some(a), Some(b)) => {
                    let vn0 = (b.velocity - a.velocity).dot(m.normal);
                    let target = if vn0 < -config.restitution_velocity_threshold {
                        -(m.restitution * vn0)
                    } else {
                        Fix64::ZERO
                    };
                    ContactState {
                        k: a.inv_mass + b.inv_mass,
                        target,
                        normal_impulse: Fix64::ZERO,
                        tangent_impulse: Fix64::ZERO,
                        pa0: a.position,
                        pb0: b.position,
                    }
                }
                _ => ContactState {
                    k: Fix64::ZERO,
                    target: Fix64::ZERO,
                    normal_impulse: Fix64::ZERO,
                    tangent_impulse: Fix64::ZERO,
                    pa0: Vec2Fix::ZERO,
                    pb0: Vec2Fix::ZERO,
                },
            };
            self.states.push(state);
        }
    }
}

/// Wake sleeping bodies that a moving body is touching
fn wake_touched(bodies: &mut BodyRegistry, manifolds: &[ContactManifold]) -> u32 {
    let mut woken = 0;
    for m in manifolds {
        if let Some((a, b)) = bodies.pair_mut(m.body_a.index(), m.body_b.index()) {
            if a.is_sleeping() && b.is_moving() {
                a.sleep.wake();
                woken += 1;
            } else if b.is_sleeping() && a.is_moving() {
                b.sleep.wake();
                woken += 1;
            }
        }
    }
    woken
}

fn solve_velocity(bodies: &mut BodyRegistry, m: &ContactManifold, s: &mut ContactState) {
    if s.k.is_zero() {
        return;
    }
    let Some((a, b)) = bodies.pair_mut(m.body_a.index(), m.body_b.index()) else {
        return;
    };
    let n = m.normal;

    // Normal
    let vn = (b.velocity - a.velocity).dot(n);
    let mut d_lambda = (s.target - vn) / s.k;
    let accumulated = (s.normal_impulse + d_lambda).max(Fix64::ZERO);
    d_lambda = accumulated - s.normal_impulse;
    s.normal_impulse = accumulated;
    let impulse = n.scale(d_lambda);
    a.velocity -= impulse.scale(a.inv_mass);
    b.velocity += impulse.scale(b.inv_mass);

    // Friction
    let t = n.perpendicular();
    let vt = (b.velocity - a.velocity).dot(t);
    let limit = m.friction * s.normal_impulse;
    let accumulated = (s.tangent_impulse - vt / s.k).clamp(-limit, limit);
    let d_tangent = accumulated - s.tangent_impulse;
    s.tangent_impulse = accumulated;
    let impulse = t.scale(d_tangent);
    a.velocity -= impulse.scale(a.inv_mass);
    b.velocity += impulse.scale(b.inv_mass);
}

/// Penetration now, given how far both bodies moved since detection
fn current_depth(bodies: &BodyRegistry, m: &ContactManifold, s: &ContactState) -> Fix64 {
    match (bodies.at(m.body_a.index()), bodies.at(m.body_b.index())) {
        (Some(a), Some(b)) => {
            let separation = (b.position - s.pb0) - (a.position - s.pa0);
            m.depth - separation.dot(m.normal)
        }
        _ => Fix64::ZERO,
    }
}

fn correct_position(bodies: &mut BodyRegistry, m: &ContactManifold, s: &ContactState, config: &SolverConfig) {
    if s.k.is_zero() {
        return;
    }
    let depth = current_depth(bodies, m, s);
    let excess = (depth - config.penetration_slop).max(Fix64::ZERO);
    if excess.is_zero() {
        return;
    }
    let Some((a, b)) = bodies.pair_mut(m.body_a.index(), m.body_b.index()) else {
        return;
    };
    let push = excess * config.position_correction / s.k;
    let offset = m.normal.scale(push);
    a.position -= offset.scale(a.inv_mass);
    b.position += offset.scale(b.inv_mass);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyDesc, BodyHandle};
    use crate::collider::{narrow_phase, Shape};

    fn ball(x: f64, vx: f64, restitution: f64) -> Body {
        Body::from_desc(
            &BodyDesc::dynamic(Shape::circle(Fix64::HALF), Fix64::ONE)
                .with_position(Vec2Fix::from_f64(x, 0.0))
                .with_velocity(Vec2Fix::from_f64(vx, 0.0))
                .with_restitution(Fix64::from_f64(restitution))
                .with_friction(Fix64::ZERO),
        )
        .unwrap()
    }

    fn solve(reg: &mut BodyRegistry, pairs: &[(u32, u32)], events: &mut EventQueue) -> SolveSummary {
        let mut manifolds = Vec::new();
        narrow_phase(reg, pairs, &mut manifolds);
        ContactSolver::new().solve(reg, &manifolds, &SolverConfig::default(), 7, events)
    }

    fn h(index: u64) -> BodyHandle {
        BodyHandle::from_bits(index)
    }

    #[test]
    fn test_elastic_head_on() {
        let mut reg = BodyRegistry::new(4);
        reg.insert(ball(-0.45, 1.0, 1.0)).unwrap();
        reg.insert(ball(0.45, -1.0, 1.0)).unwrap();
        let mut events = EventQueue::new(16);
        let summary = solve(&mut reg, &[(0, 1)], &mut events);

        assert_eq!(reg.get(h(0)).unwrap().velocity, Vec2Fix::from_int(-1, 0));
        assert_eq!(reg.get(h(1)).unwrap().velocity, Vec2Fix::from_int(1, 0));
        assert_eq!(summary.events_reported, 1);
        let e = events.drain()[0];
        assert_eq!(e.impulse, Fix64::TWO);
        assert_eq!(e.tick, 7);
        assert_eq!((e.body_a, e.body_b), (h(0), h(1)));
    }

    #[test]
    fn test_inelastic_stops_approach() {
        let mut reg = BodyRegistry::new(4);
        reg.insert(ball(-0.45, 1.0, 0.0)).unwrap();
        reg.insert(ball(0.45, -1.0, 0.0)).unwrap();
        let mut events = EventQueue::new(16);
        solve(&mut reg, &[(0, 1)], &mut events);
        assert_eq!(reg.get(h(0)).unwrap().velocity, Vec2Fix::ZERO);
        assert_eq!(reg.get(h(1)).unwrap().velocity, Vec2Fix::ZERO);
    }

    #[test]
    fn test_separating_contact_untouched() {
        let mut reg = BodyRegistry::new(4);
        reg.insert(ball(-0.45, -1.0, 1.0)).unwrap();
        reg.insert(ball(0.45, 1.0, 1.0)).unwrap();
        let mut events = EventQueue::new(16);
        let summary = solve(&mut reg, &[(0, 1)], &mut events);
        assert_eq!(reg.get(h(0)).unwrap().velocity, Vec2Fix::from_int(-1, 0));
        assert_eq!(summary.events_reported, 0, "no impulse, no event");
    }

    #[test]
    fn test_resting_contact_not_reported() {
        let mut reg = BodyRegistry::new(4);
        reg.insert(ball(-0.45, 0.01, 0.3)).unwrap();
        reg.insert(ball(0.45, 0.0, 0.3)).unwrap();
        let mut events = EventQueue::new(16);
        let summary = solve(&mut reg, &[(0, 1)], &mut events);
        assert_eq!(summary.events_reported, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_position_correction_reduces_depth() {
        let mut reg = BodyRegistry::new(4);
        reg.insert(ball(-0.3, 0.0, 0.0)).unwrap();
        reg.insert(ball(0.3, 0.0, 0.0)).unwrap();
        let mut events = EventQueue::new(16);
        let summary = solve(&mut reg, &[(0, 1)], &mut events);

        let a = reg.get(h(0)).unwrap();
        let b = reg.get(h(1)).unwrap();
        let gap = b.position.x - a.position.x;
        // Started 0.4 deep; four passes at 0.8 leave well under the tolerance
        assert!(Fix64::ONE - gap < SolverConfig::default().penetration_tolerance);
        assert!(summary.max_penetration < SolverConfig::default().penetration_tolerance);
        assert_eq!(summary.deep_contacts, 0);
        assert_eq!(a.velocity, Vec2Fix::ZERO, "correction moves positions only");
    }

    #[test]
    fn test_static_body_absorbs_nothing() {
        let mut reg = BodyRegistry::new(4);
        let wall = BodyDesc::fixed(Shape::circle(Fix64::HALF)).with_restitution(Fix64::ONE);
        reg.insert(Body::from_desc(&wall).unwrap()).unwrap();
        reg.insert(ball(0.9, -2.0, 1.0)).unwrap();
        let mut events = EventQueue::new(16);
        solve(&mut reg, &[(0, 1)], &mut events);
        assert_eq!(reg.get(h(0)).unwrap().position, Vec2Fix::ZERO);
        assert_eq!(reg.get(h(1)).unwrap().velocity, Vec2Fix::from_int(2, 0));
        assert_eq!(events.drain()[0].impulse, Fix64::from_int(4));
    }

    #[test]
    fn test_friction_bounded_by_normal_impulse() {
        let mut reg = BodyRegistry::new(4);
        let floor = BodyDesc::fixed(Shape::aabb(Vec2Fix::from_int(5, 1)))
            .with_friction(Fix64::ONE)
            .with_restitution(Fix64::ZERO);
        reg.insert(Body::from_desc(&floor).unwrap()).unwrap();
        let slider = BodyDesc::dynamic(Shape::circle(Fix64::HALF), Fix64::ONE)
            .with_position(Vec2Fix::from_f64(0.0, 1.45))
            .with_velocity(Vec2Fix::from_f64(3.0, -1.0))
            .with_restitution(Fix64::ZERO)
            .with_friction(Fix64::from_f64(0.25));
        reg.insert(Body::from_desc(&slider).unwrap()).unwrap();
        let mut events = EventQueue::new(16);
        solve(&mut reg, &[(0, 1)], &mut events);

        let v = reg.get(h(1)).unwrap().velocity;
        // Normal impulse 1, friction sqrt(0.25 * 1) = 0.5 caps the tangential change
        assert!((v.y.to_f64()).abs() < 1e-6);
        assert!((v.x.to_f64() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_contact_wakes_sleeper() {
        let mut reg = BodyRegistry::new(4);
        let mut sleeper = ball(-0.45, 0.0, 0.3);
        sleeper.sleep.put_to_sleep();
        reg.insert(sleeper).unwrap();
        reg.insert(ball(0.45, -1.0, 0.3)).unwrap();
        let mut events = EventQueue::new(16);
        let summary = solve(&mut reg, &[(0, 1)], &mut events);
        assert_eq!(summary.woken, 1);
        let a = reg.get(h(0)).unwrap();
        assert!(!a.is_sleeping());
        assert!(a.velocity.x.is_negative());
    }
}
