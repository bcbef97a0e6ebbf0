//! Balance Controller
//!
//! Decides, once per tick, how the skeleton fights to stay on its feet.
//!
//! # Strategies
//!
//! The horizontal offset between the center of mass and the middle of the
//! support polygon picks one of three responses:
//!
//! - **Ankle** (`|offset| < ankle_threshold`): the planted feet shift under
//!   the body to move the pressure point. The upper body is left alone.
//! - **Hip** (`|offset| < stepping_threshold`): pelvis, spine, neck and head
//!   are displaced against the offset with decreasing weight up the spine.
//! - **Stepping** (anything larger): the trailing foot is picked up and moved
//!   toward the COM projection, crossing the other foot when the COM has
//!   already passed it. Staying in this band for more than
//!   `fall_after_ticks` consecutive ticks is terminal: the controller latches
//!   into `Fallen` and stops correcting until the skeleton is respawned.
//!
//! Every correction is a displacement of both current and previous joint
//! positions, so the controller repositions joints without injecting
//! velocity into the Verlet integration.
//!
//! The controller itself only reads positions and returns a
//! [`BalanceAction`]; the skeleton applies it.

use crate::math::{Fix64, Vec2Fix};
use crate::rng::DeterministicRng;
use crate::skeleton::Side;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

// ============================================================================
// Configuration
// ============================================================================

/// Balance tuning
///
/// The band limits and gains are gameplay constants tuned for feel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BalanceConfig {
    /// Upper bound of the ankle band (meters)
    pub ankle_threshold: Fix64,
    /// Upper bound of the hip band (meters)
    pub stepping_threshold: Fix64,
    /// Fraction of the offset the feet move per tick in the ankle band
    pub ankle_gain: Fix64,
    /// Fraction of the offset the spine moves per tick in the hip band
    pub hip_gain: Fix64,
    /// Per-joint weights: pelvis, lower spine, mid spine, chest, neck, head
    pub hip_weights: [Fix64; 6],
    /// Fraction of the distance to the step target covered per stepping tick
    pub step_gain: Fix64,
    /// Amplitude of the random step placement jitter
    pub step_jitter: Fix64,
    /// Consecutive stepping ticks tolerated before the skeleton falls
    pub fall_after_ticks: u32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            ankle_threshold: Fix64::from_ratio(1, 100),
            stepping_threshold: Fix64::from_ratio(6, 100),
            ankle_gain: Fix64::from_ratio(1, 5),
            hip_gain: Fix64::HALF,
            hip_weights: [
                Fix64::ONE,
                Fix64::from_ratio(4, 5),
                Fix64::from_ratio(3, 5),
                Fix64::from_ratio(2, 5),
                Fix64::from_ratio(1, 5),
                Fix64::from_ratio(1, 10),
            ],
            step_gain: Fix64::from_ratio(1, 10),
            step_jitter: Fix64::from_ratio(1, 500),
            fall_after_ticks: 45,
        }
    }
}

impl BalanceConfig {
    /// Check band ordering and gain ranges
    pub fn validate(&self) -> Result<(), crate::error::PhysicsError> {
        use crate::error::PhysicsError;
        if !self.ankle_threshold.is_positive() || self.stepping_threshold <= self.ankle_threshold {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "balance bands must satisfy 0 < ankle_threshold < stepping_threshold",
            });
        }
        let unit = |g: Fix64| !g.is_negative() && g <= Fix64::ONE;
        if !unit(self.ankle_gain) || !unit(self.hip_gain) || !unit(self.step_gain) {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "balance gains must lie in [0, 1]",
            });
        }
        Ok(())
    }
}

// ============================================================================
// State
// ============================================================================

/// Which response the controller chose this tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BalanceStrategy {
    /// Small offset: feet shift pressure
    Ankle,
    /// Medium offset: upper-body counter-displacement
    Hip,
    /// Large offset: trailing foot steps toward the COM
    Stepping,
    /// No foot touches the ground; nothing to push against
    Airborne,
    /// Terminal; the host decides what happens next
    Fallen,
}

/// Derived balance quantities for one tick
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BalanceState {
    /// Mass-weighted joint average
    pub center_of_mass: Vec2Fix,
    /// Middle of the support polygon's horizontal extent
    pub support_center: Fix64,
    /// `center_of_mass.x - support_center` (zero when airborne)
    pub offset: Fix64,
    /// Strategy chosen for this tick
    pub strategy: BalanceStrategy,
    /// 1 when perfectly centered, 0 at the stepping band or worse
    pub quality: f32,
    /// Ground contact per foot, indexed by [`Side::index`]
    pub grounded: [bool; 2],
}

impl Default for BalanceState {
    fn default() -> Self {
        Self {
            center_of_mass: Vec2Fix::ZERO,
            support_center: Fix64::ZERO,
            offset: Fix64::ZERO,
            strategy: BalanceStrategy::Ankle,
            quality: 1.0,
            grounded: [true, true],
        }
    }
}

/// Ground contact summary for one foot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FootSupport {
    /// Any of heel, midfoot or toe on the ground
    pub grounded: bool,
    /// Mean x of the three foot points
    pub center_x: Fix64,
}

/// Correction the skeleton must apply
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceAction {
    /// Nothing to do
    None,
    /// Shift every grounded foot (and its ankle) horizontally
    ShiftFeet { dx: Fix64 },
    /// Displace the spine chain by `dx` scaled with the hip weights
    CounterHips { dx: Fix64 },
    /// Move one foot (and its ankle) horizontally
    Step { side: Side, dx: Fix64 },
}

// ============================================================================
// Geometry
// ============================================================================

/// Convex hull of the grounded contact points (Andrew's monotone chain).
///
/// Collinear points are dropped, so contacts that all sit on a flat ground
/// line collapse to the two extreme points.
#[must_use]
pub fn support_hull(points: &[Vec2Fix]) -> Vec<Vec2Fix> {
    let mut pts: Vec<Vec2Fix> = points.to_vec();
    pts.sort_unstable();
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let turn = |o: Vec2Fix, a: Vec2Fix, b: Vec2Fix| (a - o).cross(b - o);
    let mut hull: Vec<Vec2Fix> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && !turn(hull[hull.len() - 2], hull[hull.len() - 1], p).is_positive() {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && !turn(hull[hull.len() - 2], hull[hull.len() - 1], p).is_positive() {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Middle of the hull's horizontal extent, or `None` for an empty hull
#[must_use]
pub fn support_center(hull: &[Vec2Fix]) -> Option<Fix64> {
    let first = hull.first()?;
    let (lo, hi) = hull
        .iter()
        .fold((first.x, first.x), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
    Some((lo + hi).half())
}

/// Band lookup for an offset magnitude
#[must_use]
pub fn select_strategy(magnitude: Fix64, config: &BalanceConfig) -> BalanceStrategy {
    if magnitude < config.ankle_threshold {
        BalanceStrategy::Ankle
    } else if magnitude < config.stepping_threshold {
        BalanceStrategy::Hip
    } else {
        BalanceStrategy::Stepping
    }
}

/// `clamp(1 - |offset| / stepping_threshold, 0, 1)`
#[must_use]
pub fn balance_quality(offset: Fix64, config: &BalanceConfig) -> f32 {
    let ratio = offset.abs().safe_div(config.stepping_threshold);
    (Fix64::ONE - ratio).clamp(Fix64::ZERO, Fix64::ONE).to_f32()
}

// ============================================================================
// Controller
// ============================================================================

/// Stateful part of balance: the stepping timer and the fallen latch
#[derive(Clone, Debug, Default)]
pub struct BalanceController {
    stepping_ticks: u32,
    fallen: bool,
    state: BalanceState,
}

impl BalanceController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest derived state
    #[must_use]
    pub fn state(&self) -> &BalanceState {
        &self.state
    }

    /// True once the skeleton has fallen
    #[must_use]
    pub fn is_fallen(&self) -> bool {
        self.fallen
    }

    /// Consecutive ticks spent in the stepping band
    #[must_use]
    pub fn stepping_ticks(&self) -> u32 {
        self.stepping_ticks
    }

    /// Restore the persistent part of the controller
    pub fn restore(&mut self, stepping_ticks: u32, fallen: bool) {
        self.stepping_ticks = stepping_ticks;
        self.fallen = fallen;
        if fallen {
            self.state.strategy = BalanceStrategy::Fallen;
            self.state.quality = 0.0;
        }
    }

    /// Evaluate one tick and return the correction to apply.
    ///
    /// `hull` is the support polygon of the grounded foot points; `rng`
    /// supplies the step placement jitter.
    pub fn update(
        &mut self,
        center_of_mass: Vec2Fix,
        hull: &[Vec2Fix],
        feet: [FootSupport; 2],
        config: &BalanceConfig,
        rng: &mut DeterministicRng,
    ) -> BalanceAction {
        let grounded = [feet[0].grounded, feet[1].grounded];
        let center = support_center(hull);
        let offset = center.map_or(Fix64::ZERO, |c| center_of_mass.x - c);
        self.state = BalanceState {
            center_of_mass,
            support_center: center.unwrap_or(center_of_mass.x),
            offset,
            strategy: BalanceStrategy::Fallen,
            quality: 0.0,
            grounded,
        };

        if self.fallen {
            return BalanceAction::None;
        }
        if center.is_none() {
            self.stepping_ticks = 0;
            self.state.strategy = BalanceStrategy::Airborne;
            return BalanceAction::None;
        }

        let strategy = select_strategy(offset.abs(), config);
        self.state.strategy = strategy;
        self.state.quality = balance_quality(offset, config);

        match strategy {
            BalanceStrategy::Ankle => {
                self.stepping_ticks = 0;
                BalanceAction::ShiftFeet {
                    dx: offset * config.ankle_gain,
                }
            }
            BalanceStrategy::Hip => {
                self.stepping_ticks = 0;
                BalanceAction::CounterHips {
                    dx: -(offset * config.hip_gain),
                }
            }
            _ => {
                self.stepping_ticks = self.stepping_ticks.saturating_add(1);
                if self.stepping_ticks > config.fall_after_ticks {
                    self.fallen = true;
                    self.state.strategy = BalanceStrategy::Fallen;
                    self.state.quality = 0.0;
                    tracing::info!(
                        offset = offset.to_f64(),
                        ticks = self.stepping_ticks,
                        "skeleton fell"
                    );
                    return BalanceAction::None;
                }
                plan_step(center_of_mass.x, feet, config, rng)
            }
        }
    }
}

/// Move the foot farther from the COM toward its target placement.
///
/// With the COM between the feet the target is the COM itself and the foot
/// never crosses the other one. With the COM outside the feet the foot steps
/// across to the mirror image of the other foot about the COM, which centers
/// the support under the body.
fn plan_step(com_x: Fix64, feet: [FootSupport; 2], config: &BalanceConfig, rng: &mut DeterministicRng) -> BalanceAction {
    let [left, right] = feet;
    let trailing = match (left.grounded, right.grounded) {
        (true, false) => Side::Right,
        (false, true) => Side::Left,
        _ => {
            if (com_x - right.center_x).abs() > (com_x - left.center_x).abs() {
                Side::Right
            } else {
                Side::Left
            }
        }
    };
    let foot = feet[trailing.index()];
    let other = feet[trailing.opposite().index()];

    let between = other.grounded
        && com_x >= foot.center_x.min(other.center_x)
        && com_x <= foot.center_x.max(other.center_x);
    let target = if other.grounded && !between {
        com_x + (com_x - other.center_x)
    } else {
        com_x
    };

    let mut dx = (target - foot.center_x) * config.step_gain + rng.next_signed(config.step_jitter);
    if between {
        let room = other.center_x - foot.center_x;
        if room.is_positive() {
            dx = dx.min(room);
        } else if room.is_negative() {
            dx = dx.max(room);
        } else {
            dx = Fix64::ZERO;
        }
    }
    BalanceAction::Step { side: trailing, dx }
}
