//! Deterministic Random Number Generators
//!
//! PCG (Permuted Congruential Generator) with `Fix64` output, plus a set of
//! named substreams derived from one run seed.
//!
//! Every consumer of randomness asks for its own stream by name, so adding a
//! new consumer never shifts the sequence another consumer sees. Streams are
//! created lazily and stored sorted by the hash of their name; creation order
//! has no effect on the values produced.
//!
//! # Example
//!
//! ```
//! use stance_physics::rng::RngStreams;
//!
//! let mut streams = RngStreams::new(42);
//! let a = streams.stream("skeleton.step").next_u32();
//! streams.set_seed(42);
//! assert_eq!(streams.stream("skeleton.step").next_u32(), a);
//! ```

use crate::math::Fix64;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Deterministic RNG using PCG-XSH-RR (32-bit output)
///
/// Produces identical sequences on all platforms given the same seed.
/// No floating-point operations are used internally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterministicRng {
    state: u64,
    inc: u64,
}

impl DeterministicRng {
    /// PCG multiplier
    const MULTIPLIER: u64 = 6364136223846793005;

    /// Create RNG with the given seed
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::new_with_stream(seed, seed)
    }

    /// Create RNG with seed and stream selector
    #[must_use]
    pub fn new_with_stream(seed: u64, stream: u64) -> Self {
        let mut rng = Self {
            state: 0,
            inc: (stream << 1) | 1,
        };
        rng.next_u32();
        rng.state = rng.state.wrapping_add(seed);
        rng.next_u32();
        rng
    }

    /// Rebuild from raw state (snapshot restore)
    #[must_use]
    pub const fn from_parts(state: u64, inc: u64) -> Self {
        Self {
            state,
            inc: inc | 1,
        }
    }

    /// Raw `(state, inc)` pair (snapshot capture)
    #[must_use]
    pub const fn parts(&self) -> (u64, u64) {
        (self.state, self.inc)
    }

    /// Generate next u32 value
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(self.inc);
        // XSH-RR output function
        let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Generate next u64 value (two u32s combined)
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        (hi << 32) | lo
    }

    /// Generate `Fix64` in range [0, 1)
    #[inline]
    pub fn next_fix64(&mut self) -> Fix64 {
        Fix64::from_raw(self.next_u32() as i64)
    }

    /// Generate `Fix64` in range [lo, hi)
    pub fn next_fix64_range(&mut self, lo: Fix64, hi: Fix64) -> Fix64 {
        let t = self.next_fix64();
        lo + (hi - lo) * t
    }

    /// Generate `Fix64` in range [-amplitude, amplitude)
    pub fn next_signed(&mut self, amplitude: Fix64) -> Fix64 {
        self.next_fix64_range(-amplitude, amplitude)
    }

    /// Generate random value in [0, max) as u32
    #[inline]
    pub fn next_bounded(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Rejection sampling for uniform distribution
        let threshold = max.wrapping_neg() % max;
        loop {
            let r = self.next_u32();
            if r >= threshold {
                return r % max;
            }
        }
    }
}

// ============================================================================
// Named substreams
// ============================================================================

/// Well-known stream names used inside the crate.
pub mod streams {
    /// Jitter added to stepping-strategy foot placement
    pub const SKELETON_STEP: &str = "skeleton.step";
}

/// Stable 64-bit id for a stream name (FNV-1a).
#[must_use]
pub const fn stream_id(name: &str) -> u64 {
    let bytes = name.as_bytes();
    let mut hash: u64 = 0xcbf29ce484222325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x100000001b3);
        i += 1;
    }
    hash
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct NamedStream {
    id: u64,
    rng: DeterministicRng,
}

/// Named PCG substreams derived from a single run seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RngStreams {
    seed: u64,
    /// Sorted by `id`
    streams: Vec<NamedStream>,
}

impl RngStreams {
    /// Create an empty stream set for `seed`
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            streams: Vec::new(),
        }
    }

    /// Current run seed
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reset every stream to the start of the sequence for `seed`.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        for s in &mut self.streams {
            s.rng = Self::derive(seed, s.id);
        }
    }

    fn derive(seed: u64, id: u64) -> DeterministicRng {
        DeterministicRng::new_with_stream(seed ^ id.rotate_left(29), id)
    }

    /// The generator for `name`, created on first use.
    pub fn stream(&mut self, name: &str) -> &mut DeterministicRng {
        self.stream_by_id(stream_id(name))
    }

    /// The generator for a precomputed stream id, created on first use.
    pub fn stream_by_id(&mut self, id: u64) -> &mut DeterministicRng {
        let pos = match self.streams.binary_search_by_key(&id, |s| s.id) {
            Ok(pos) => pos,
            Err(pos) => {
                self.streams.insert(
                    pos,
                    NamedStream {
                        id,
                        rng: Self::derive(self.seed, id),
                    },
                );
                pos
            }
        };
        &mut self.streams[pos].rng
    }

    /// Number of streams created so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// True if no stream has been requested yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// `(id, state, inc)` for every stream, ascending by id
    pub fn states(&self) -> impl Iterator<Item = (u64, u64, u64)> + '_ {
        self.streams.iter().map(|s| {
            let (state, inc) = s.rng.parts();
            (s.id, state, inc)
        })
    }

    /// Replace all streams with captured states.
    pub fn restore(&mut self, seed: u64, states: &[(u64, u64, u64)]) {
        self.seed = seed;
        self.streams = states
            .iter()
            .map(|&(id, state, inc)| NamedStream {
                id,
                rng: DeterministicRng::from_parts(state, inc),
            })
            .collect();
        self.streams.sort_by_key(|s| s.id);
        self.streams.dedup_by_key(|s| s.id);
    }
}
