//! Collision Filtering (Layer/Mask System)
//!
//! Bitmask-based filtering applied by the broad-phase before any pair reaches
//! the narrow-phase.
//!
//! # Usage
//!
//! ```
//! use stance_physics::filter::{layers, CollisionFilter};
//!
//! let player = CollisionFilter::new(layers::PLAYER, layers::ENEMY | layers::ENVIRONMENT);
//! let enemy = CollisionFilter::new(layers::ENEMY, layers::PLAYER | layers::ENVIRONMENT);
//! let ghost = CollisionFilter::new(layers::PROJECTILE, layers::NONE);
//!
//! assert!(CollisionFilter::can_collide(&player, &enemy));
//! assert!(!CollisionFilter::can_collide(&player, &ghost));
//! ```

/// Collision filter using layer/mask bitmasks.
///
/// Two bodies can collide iff:
///   `(a.layer & b.mask) != 0 && (b.layer & a.mask) != 0`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollisionFilter {
    /// Which layer(s) this body belongs to (bitmask)
    pub layer: u32,
    /// Which layers this body can collide with (bitmask)
    pub mask: u32,
}

impl CollisionFilter {
    /// Default filter: default layer, collides with everything
    pub const DEFAULT: Self = Self {
        layer: layers::DEFAULT,
        mask: layers::ALL,
    };

    /// Filter that collides with nothing
    pub const NONE: Self = Self {
        layer: layers::NONE,
        mask: layers::NONE,
    };

    /// Create a new collision filter
    #[inline]
    #[must_use]
    pub const fn new(layer: u32, mask: u32) -> Self {
        Self { layer, mask }
    }

    /// Check if two filters allow collision
    #[inline]
    #[must_use]
    pub fn can_collide(a: &Self, b: &Self) -> bool {
        (a.layer & b.mask) != 0 && (b.layer & a.mask) != 0
    }

    /// True if this body sits on any layer in `mask`
    #[inline]
    #[must_use]
    pub fn on_any(&self, mask: u32) -> bool {
        self.layer & mask != 0
    }
}

impl Default for CollisionFilter {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Predefined collision layers for the arena
pub mod layers {
    /// No layer
    pub const NONE: u32 = 0;
    /// Default collision layer
    pub const DEFAULT: u32 = 1 << 0;
    /// Player body
    pub const PLAYER: u32 = 1 << 1;
    /// Hostile bodies
    pub const ENEMY: u32 = 1 << 2;
    /// Walls, ground and props
    pub const ENVIRONMENT: u32 = 1 << 3;
    /// Thrown objects
    pub const PROJECTILE: u32 = 1 << 4;
    /// All layers combined
    pub const ALL: u32 = u32::MAX;
}
