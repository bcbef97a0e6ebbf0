//! Broad-Phase Spatial Grid
//!
//! Uniform grid culling of candidate collision pairs.
//!
//! # How It Works
//!
//! The cell size is chosen every step as twice the largest bounding radius
//! (bounded below by `min_cell_size`), so two bodies that overlap always sit
//! in the same or adjacent cells. Each body is keyed by the cell of its
//! center; the keys are sorted and every body scans the 3x3 block of cells
//! around it by binary search. Bodies larger than `max_cell_size` would
//! blow the grid up for everyone else, so they skip the grid and are paired
//! against every other body directly.
//!
//! No hash map is involved: pair discovery depends only on sorted keys, and
//! the output is sorted by `(lower index, higher index)` before it leaves.

use crate::body::BodyRegistry;
use crate::filter::CollisionFilter;
use crate::math::{Fix64, Vec2Fix};

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Broad-phase tuning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BroadphaseConfig {
    /// Smallest cell edge
    pub min_cell_size: Fix64,
    /// Bodies whose diameter exceeds this bypass the grid
    pub max_cell_size: Fix64,
}

impl Default for BroadphaseConfig {
    fn default() -> Self {
        Self {
            min_cell_size: Fix64::from_ratio(1, 5),
            max_cell_size: Fix64::from_int(4),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Proxy {
    index: u32,
    center: Vec2Fix,
    radius: Fix64,
    filter: CollisionFilter,
    moving: bool,
}

/// Reusable broad-phase state
#[derive(Clone, Debug, Default)]
pub struct SpatialGrid {
    proxies: Vec<Proxy>,
    /// `(cell x, cell y, proxy)` sorted ascending
    entries: Vec<(i64, i64, usize)>,
    oversized: Vec<usize>,
    cell_size: Fix64,
}

impl SpatialGrid {
    /// Create an empty grid
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell size chosen by the last call to [`SpatialGrid::find_pairs`]
    #[must_use]
    pub fn cell_size(&self) -> Fix64 {
        self.cell_size
    }

    /// Collect candidate pairs as `(lower slot index, higher slot index)`.
    ///
    /// A pair is emitted when the filters allow it, at least one side is
    /// moving (awake dynamic or kinematic), and the bounding circles touch.
    /// `out` is cleared first and returned sorted.
    pub fn find_pairs(
        &mut self,
        bodies: &BodyRegistry,
        config: &BroadphaseConfig,
        out: &mut Vec<(u32, u32)>,
    ) {
        out.clear();
        self.proxies.clear();
        self.entries.clear();
        self.oversized.clear();

        for (handle, body) in bodies.iter() {
            self.proxies.push(Proxy {
                index: handle.index(),
                center: body.position,
                radius: body.shape.bounding_radius(),
                filter: body.filter,
                moving: body.is_moving(),
            });
        }

        let mut largest = Fix64::ZERO;
        for p in &self.proxies {
            let diameter = p.radius.double();
            if diameter <= config.max_cell_size {
                largest = largest.max(diameter);
            }
        }
        let cell = largest.max(config.min_cell_size).max(Fix64::EPSILON);
        self.cell_size = cell;

        for (i, p) in self.proxies.iter().enumerate() {
            if p.radius.double() > config.max_cell_size {
                self.oversized.push(i);
            } else {
                let cx = (p.center.x / cell).floor_int();
                let cy = (p.center.y / cell).floor_int();
                self.entries.push((cx, cy, i));
            }
        }
        self.entries.sort_unstable();

        for e in 0..self.entries.len() {
            let (cx, cy, pi) = self.entries[e];
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let key = (cx + dx, cy + dy);
                    let lo = self.entries.partition_point(|&(x, y, _)| (x, y) < key);
                    let hi = self.entries.partition_point(|&(x, y, _)| (x, y) <= key);
                    for &(_, _, pj) in &self.entries[lo..hi] {
                        if self.proxies[pi].index < self.proxies[pj].index {
                            self.consider(pi, pj, out);
                        }
                    }
                }
            }
        }

        for (k, &o) in self.oversized.iter().enumerate() {
            for &(_, _, p) in &self.entries {
                self.consider(o, p, out);
            }
            for &o2 in &self.oversized[k + 1..] {
                self.consider(o, o2, out);
            }
        }

        out.sort_unstable();
        out.dedup();
    }

    fn consider(&self, i: usize, j: usize, out: &mut Vec<(u32, u32)>) {
        let a = &self.proxies[i];
        let b = &self.proxies[j];
        if !(a.moving || b.moving) {
            return;
        }
        if !CollisionFilter::can_collide(&a.filter, &b.filter) {
            return;
        }
        let reach = a.radius + b.radius;
        if a.center.distance_squared_to(b.center) > reach * reach {
            return;
        }
        out.push((a.index.min(b.index), a.index.max(b.index)));
    }
}
