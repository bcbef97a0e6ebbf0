//! Replay Snapshots and State Checksums
//!
//! A [`Snapshot`] holds exactly what is needed to resume a run bit-for-bit:
//! body positions, velocities and sleep counters, skeleton joint positions
//! (current and previous), the balance controller's persistent fields, the
//! RNG substream states and the tick index. Everything else is either
//! configuration or recomputed from these each tick.
//!
//! # Byte Layout (version 1, little-endian)
//!
//! ```text
//! magic "STNC" | version u16 | tick u64 | seed u64
//! stream count u32 | (id u64, state u64, inc u64)*
//! body count u32   | (handle u64, px i64, py i64, vx i64, vy i64, sleeping u8, idle u32)*
//! skeleton u8      | [joint count u32 | (px, py, prev px, prev py: i64)* | stepping u32 | fallen u8]
//! checksum u64 over everything before it
//! ```

use crate::body::BodyHandle;
use crate::error::PhysicsError;
use crate::math::{Fix64, Vec2Fix};
use crate::world::PhysicsWorld;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

const MAGIC: [u8; 4] = *b"STNC";
const VERSION: u16 = 1;

const STREAM_RECORD: usize = 24;
const BODY_RECORD: usize = 8 + 32 + 1 + 4;
const JOINT_RECORD: usize = 32;

// ============================================================================
// Snapshot
// ============================================================================

/// Captured state of one body
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyState {
    pub handle: BodyHandle,
    pub position: Vec2Fix,
    pub velocity: Vec2Fix,
    pub sleeping: bool,
    pub idle_ticks: u32,
}

/// Captured skeleton state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkeletonState {
    /// `(position, prev_position)` per joint in `JointId` order
    pub joints: Vec<(Vec2Fix, Vec2Fix)>,
    pub stepping_ticks: u32,
    pub fallen: bool,
}

/// Everything needed to resume a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub tick: u64,
    pub seed: u64,
    /// `(stream id, state, inc)` ascending by id
    pub rng_streams: Vec<(u64, u64, u64)>,
    /// Live bodies in slot order
    pub bodies: Vec<BodyState>,
    pub skeleton: Option<SkeletonState>,
}

impl Snapshot {
    /// Encode with the versioned little-endian layout
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let skeleton_len = self
            .skeleton
            .as_ref()
            .map_or(0, |s| 4 + s.joints.len() * JOINT_RECORD + 5);
        let mut out = Vec::with_capacity(
            4 + 2 + 16 + 4 + self.rng_streams.len() * STREAM_RECORD + 4 + self.bodies.len() * BODY_RECORD + 1 + skeleton_len + 8,
        );

        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&self.tick.to_le_bytes());
        out.extend_from_slice(&self.seed.to_le_bytes());

        put_u32(&mut out, self.rng_streams.len());
        for &(id, state, inc) in &self.rng_streams {
            out.extend_from_slice(&id.to_le_bytes());
            out.extend_from_slice(&state.to_le_bytes());
            out.extend_from_slice(&inc.to_le_bytes());
        }

        put_u32(&mut out, self.bodies.len());
        for b in &self.bodies {
            out.extend_from_slice(&b.handle.to_bits().to_le_bytes());
            put_vec(&mut out, b.position);
            put_vec(&mut out, b.velocity);
            out.push(u8::from(b.sleeping));
            out.extend_from_slice(&b.idle_ticks.to_le_bytes());
        }

        match &self.skeleton {
            None => out.push(0),
            Some(s) => {
                out.push(1);
                put_u32(&mut out, s.joints.len());
                for &(pos, prev) in &s.joints {
                    put_vec(&mut out, pos);
                    put_vec(&mut out, prev);
                }
                out.extend_from_slice(&s.stepping_ticks.to_le_bytes());
                out.push(u8::from(s.fallen));
            }
        }

        let sum = byte_checksum(&out);
        out.extend_from_slice(&sum.to_le_bytes());
        out
    }

    /// Decode bytes produced by [`Snapshot::to_bytes`].
    ///
    /// Truncated, corrupted or foreign data is rejected without panicking.
    pub fn from_bytes(data: &[u8]) -> Result<Self, PhysicsError> {
        if data.len() < 8 {
            return Err(corrupt("snapshot too short"));
        }
        let (body, tail) = data.split_at(data.len() - 8);
        let mut sum = [0u8; 8];
        sum.copy_from_slice(tail);
        if u64::from_le_bytes(sum) != byte_checksum(body) {
            return Err(corrupt("snapshot checksum mismatch"));
        }

        let mut r = Reader { data: body, pos: 0 };
        if r.take(4)? != MAGIC {
            return Err(corrupt("bad snapshot magic"));
        }
        if r.u16()? != VERSION {
            return Err(corrupt("unsupported snapshot version"));
        }
        let tick = r.u64()?;
        let seed = r.u64()?;

        let n = r.count(STREAM_RECORD)?;
        let mut rng_streams = Vec::with_capacity(n);
        for _ in 0..n {
            rng_streams.push((r.u64()?, r.u64()?, r.u64()?));
        }

        let n = r.count(BODY_RECORD)?;
        let mut bodies = Vec::with_capacity(n);
        for _ in 0..n {
            let handle = BodyHandle::from_bits(r.u64()?);
            let position = r.vec()?;
            let velocity = r.vec()?;
            let sleeping = r.flag()?;
            let idle_ticks = r.u32()?;
            bodies.push(BodyState {
                handle,
                position,
                velocity,
                sleeping,
                idle_ticks,
            });
        }

        let skeleton = if r.flag()? {
            let n = r.count(JOINT_RECORD)?;
            let mut joints = Vec::with_capacity(n);
            for _ in 0..n {
                joints.push((r.vec()?, r.vec()?));
            }
            Some(SkeletonState {
                joints,
                stepping_ticks: r.u32()?,
                fallen: r.flag()?,
            })
        } else {
            None
        };

        if r.pos != body.len() {
            return Err(corrupt("trailing bytes in snapshot"));
        }
        Ok(Self {
            tick,
            seed,
            rng_streams,
            bodies,
            skeleton,
        })
    }
}

fn corrupt(reason: &'static str) -> PhysicsError {
    PhysicsError::DeserializationFailed { reason }
}

fn put_u32(out: &mut Vec<u8>, n: usize) {
    out.extend_from_slice(&(n as u32).to_le_bytes());
}

fn put_vec(out: &mut Vec<u8>, v: Vec2Fix) {
    out.extend_from_slice(&v.x.raw().to_le_bytes());
    out.extend_from_slice(&v.y.raw().to_le_bytes());
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], PhysicsError> {
        let end = self.pos.checked_add(n).ok_or_else(|| corrupt("snapshot truncated"))?;
        let slice = self.data.get(self.pos..end).ok_or_else(|| corrupt("snapshot truncated"))?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], PhysicsError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u16(&mut self) -> Result<u16, PhysicsError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, PhysicsError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, PhysicsError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn vec(&mut self) -> Result<Vec2Fix, PhysicsError> {
        let x = i64::from_le_bytes(self.array()?);
        let y = i64::from_le_bytes(self.array()?);
        Ok(Vec2Fix::new(Fix64::from_raw(x), Fix64::from_raw(y)))
    }

    fn flag(&mut self) -> Result<bool, PhysicsError> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(corrupt("invalid flag byte")),
        }
    }

    /// Element count, checked against the bytes that remain
    fn count(&mut self, record: usize) -> Result<usize, PhysicsError> {
        let n = self.u32()? as usize;
        let remaining = self.data.len() - self.pos;
        if n.saturating_mul(record) > remaining {
            return Err(corrupt("snapshot count exceeds data"));
        }
        Ok(n)
    }
}

// ============================================================================
// Simulation Checksum
// ============================================================================

#[inline]
fn avalanche(mut h: u64) -> u64 {
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d049bb133111eb);
    h ^ (h >> 31)
}

fn byte_checksum(bytes: &[u8]) -> u64 {
    let mut hash = 0x5354_4e43_u64;
    for chunk in bytes.chunks(8) {
        let mut word = [0u8; 8];
        word[..chunk.len()].copy_from_slice(chunk);
        hash = avalanche(hash.rotate_left(7) ^ u64::from_le_bytes(word));
    }
    avalanche(hash ^ bytes.len() as u64)
}

/// Order-dependent hash of the simulated state, for desync detection.
///
/// Two worlds fed identical inputs from the same seed produce identical
/// checksums on every machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SimulationChecksum(pub u64);

impl SimulationChecksum {
    /// Hash bodies (slot order), skeleton joints and the tick
    #[must_use]
    pub fn of_world(world: &PhysicsWorld) -> Self {
        let mut hash = avalanche(world.tick());
        for (handle, body) in world.bodies().iter() {
            let mut h = handle.to_bits();
            h ^= (body.position.x.raw() as u64).rotate_left(5);
            h ^= (body.position.y.raw() as u64).rotate_left(17);
            h ^= (body.velocity.x.raw() as u64).rotate_left(29);
            h ^= (body.velocity.y.raw() as u64).rotate_left(41);
            h ^= u64::from(body.is_sleeping()) << 63;
            hash = hash.rotate_left(13) ^ avalanche(h);
        }
        if let Some(skeleton) = world.skeleton() {
            for (i, joint) in skeleton.joints().iter().enumerate() {
                let mut h = i as u64;
                h ^= (joint.position.x.raw() as u64).rotate_left(7);
                h ^= (joint.position.y.raw() as u64).rotate_left(19);
                h ^= (joint.prev_position.x.raw() as u64).rotate_left(31);
                h ^= (joint.prev_position.y.raw() as u64).rotate_left(43);
                hash = hash.rotate_left(13) ^ avalanche(h);
            }
            hash ^= avalanche(u64::from(skeleton.is_fallen()) | (u64::from(skeleton.controller().stepping_ticks()) << 1));
        }
        Self(hash)
    }
}
