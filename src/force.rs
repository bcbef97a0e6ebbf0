//! Force Fields
//!
//! Global fields that push bodies every tick: radial attractors, radial
//! repulsors and directional wind. Field forces are accumulated into each
//! body's force before integration, exactly like host-applied forces.

use crate::body::BodyRegistry;
use crate::filter::layers;
use crate::math::{Fix64, Vec2Fix};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Force field type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ForceField {
    /// Pull toward `center` with inverse-square falloff
    Attract {
        /// Field center
        center: Vec2Fix,
        /// Force numerator: `strength / dist^2`
        strength: Fix64,
        /// No effect beyond this distance (zero = unlimited)
        radius: Fix64,
    },
    /// Push away from `center` with inverse-square falloff
    Repel {
        /// Field center
        center: Vec2Fix,
        /// Force numerator: `strength / dist^2`
        strength: Fix64,
        /// No effect beyond this distance (zero = unlimited)
        radius: Fix64,
    },
    /// Constant directional force (wind)
    Wind {
        /// Direction (normalized on use)
        direction: Vec2Fix,
        /// Force magnitude
        strength: Fix64,
    },
}

/// Identifier returned when a field is added to a world
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ForceFieldId(pub u32);

/// A field plus the bodies it applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForceFieldInstance {
    /// The force field definition
    pub field: ForceField,
    /// Only bodies on one of these layers are affected
    pub layer_mask: u32,
    /// Whether this field is active
    pub enabled: bool,
}

impl ForceFieldInstance {
    /// Field affecting every layer
    #[inline]
    #[must_use]
    pub fn new(field: ForceField) -> Self {
        Self {
            field,
            layer_mask: layers::ALL,
            enabled: true,
        }
    }

    /// Restrict the field to bodies on `mask`
    #[must_use]
    pub fn with_layer_mask(mut self, mask: u32) -> Self {
        self.layer_mask = mask;
        self
    }
}

/// Limits shared by all radial fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ForceFieldConfig {
    /// Squared distance floor, prevents the singularity at the center
    pub min_dist_sq: Fix64,
    /// Upper bound on any single radial force
    pub max_force: Fix64,
}

impl Default for ForceFieldConfig {
    fn default() -> Self {
        Self {
            min_dist_sq: Fix64::from_ratio(1, 100),
            max_force: Fix64::from_int(100),
        }
    }
}

fn radial(
    center: Vec2Fix,
    strength: Fix64,
    radius: Fix64,
    position: Vec2Fix,
    config: &ForceFieldConfig,
) -> Vec2Fix {
    let delta = center - position;
    let dist_sq = delta.length_squared();
    if radius.is_positive() && dist_sq > radius * radius {
        return Vec2Fix::ZERO;
    }
    let magnitude = (strength / dist_sq.max(config.min_dist_sq)).min(config.max_force);
    delta.normalize().scale(magnitude)
}

/// Force a field exerts on a body at `position`
#[must_use]
pub fn compute_force(field: &ForceField, position: Vec2Fix, config: &ForceFieldConfig) -> Vec2Fix {
    match *field {
        ForceField::Attract {
            center,
            strength,
            radius,
        } => radial(center, strength, radius, position, config),
        ForceField::Repel {
            center,
            strength,
            radius,
        } => -radial(center, strength, radius, position, config),
        ForceField::Wind {
            direction,
            strength,
        } => direction.normalize().scale(strength),
    }
}

/// Accumulate every enabled field into awake dynamic bodies
pub fn apply_force_fields(
    fields: &[(ForceFieldId, ForceFieldInstance)],
    bodies: &mut BodyRegistry,
    config: &ForceFieldConfig,
) {
    if fields.is_empty() {
        return;
    }
    for (_, body) in bodies.iter_mut() {
        if !body.is_dynamic() || body.is_sleeping() {
            continue;
        }
        let mut total = Vec2Fix::ZERO;
        for (_, inst) in fields {
            if inst.enabled && body.filter.on_any(inst.layer_mask) {
                total += compute_force(&inst.field, body.position, config);
            }
        }
        body.force += total;
    }
}

/// Ordered collection of fields owned by a world
#[derive(Clone, Debug, Default)]
pub struct ForceFieldSet {
    fields: Vec<(ForceFieldId, ForceFieldInstance)>,
    next_id: u32,
}

impl ForceFieldSet {
    /// Add a field, returning its id
    pub fn add(&mut self, field: ForceFieldInstance) -> ForceFieldId {
        let id = ForceFieldId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.fields.push((id, field));
        id
    }

    /// Remove a field. Returns `false` if the id is unknown.
    pub fn remove(&mut self, id: ForceFieldId) -> bool {
        let before = self.fields.len();
        self.fields.retain(|(fid, _)| *fid != id);
        self.fields.len() != before
    }

    /// Fields in insertion order
    #[must_use]
    pub fn as_slice(&self) -> &[(ForceFieldId, ForceFieldInstance)] {
        &self.fields
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if there are no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
