//! Rigid-Body Integration
//!
//! Semi-implicit Euler over the body registry: velocity first (forces,
//! gravity, drag, speed limit), then position from the new velocity.
//! Sleeping and static bodies are skipped; kinematic bodies only move.

use crate::body::BodyRegistry;
use crate::collider::Aabb;
use crate::math::{Fix64, Vec2Fix};

/// Integration settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IntegrationConfig {
    /// Gravity acceleration (zero for a top-down arena)
    pub gravity: Vec2Fix,
    /// Fraction of velocity kept per tick, applied to every dynamic body
    pub linear_damping: Fix64,
    /// Speed limit
    pub max_speed: Fix64,
    /// Optional arena bounds. Bodies are clamped inside and lose the
    /// velocity component that pointed outward.
    pub bounds: Option<Aabb>,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2Fix::ZERO,
            linear_damping: Fix64::ONE,
            max_speed: Fix64::from_int(50),
            bounds: Some(Aabb::new(Vec2Fix::from_int(-10, -10), Vec2Fix::from_int(10, 10))),
        }
    }
}

/// Advance every moving body by one tick.
///
/// Accumulated forces are consumed. Returns the number of bodies that were
/// clamped by the arena bounds.
pub fn integrate(bodies: &mut BodyRegistry, config: &IntegrationConfig, dt: Fix64) -> u32 {
    let mut clamped = 0;
    for (_, body) in bodies.iter_mut() {
        if !body.is_moving() {
            body.force = Vec2Fix::ZERO;
            continue;
        }

        if body.is_dynamic() {
            let accel = body.force.scale(body.inv_mass) + config.gravity.scale(body.gravity_scale);
            let mut v = body.velocity + accel.scale(dt);
            v = v.scale(body.drag * config.linear_damping);
            body.velocity = v.clamp_length(config.max_speed);
        }
        body.force = Vec2Fix::ZERO;
        body.position += body.velocity.scale(dt);

        if let Some(bounds) = config.bounds {
            if clamp_to_bounds(body, &bounds) {
                clamped += 1;
            }
        }
    }
    clamped
}

fn clamp_to_bounds(body: &mut crate::body::Body, bounds: &Aabb) -> bool {
    let extent = body.shape.bounds(Vec2Fix::ZERO).max;
    let lo = bounds.min + extent;
    let hi = bounds.max - extent;
    let mut hit = false;

    if body.position.x < lo.x {
        body.position.x = lo.x;
        body.velocity.x = body.velocity.x.max(Fix64::ZERO);
        hit = true;
    } else if body.position.x > hi.x {
        body.position.x = hi.x;
        body.velocity.x = body.velocity.x.min(Fix64::ZERO);
        hit = true;
    }
    if body.position.y < lo.y {
        body.position.y = lo.y;
        body.velocity.y = body.velocity.y.max(Fix64::ZERO);
        hit = true;
    } else if body.position.y > hi.y {
        body.position.y = hi.y;
        body.velocity.y = body.velocity.y.min(Fix64::ZERO);
        hit = true;
    }
    if hit {
        body.sleep.wake();
    }
    hit
}
