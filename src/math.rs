//! Deterministic Fixed-Point Mathematics
//!
//! Bit-exact scalar and 2D vector arithmetic for the simulation core.
//!
//! # Overview
//!
//! Every quantity that feeds the physics step is a [`Fix64`]: a signed Q32.32
//! value stored in an `i64`. Multiplication and division widen to `i128`
//! before rescaling, square roots use integer Newton-Raphson with a fixed
//! iteration count, and nothing in this module touches IEEE 754 on the hot
//! path. The same inputs produce the same bits on x86, ARM and WASM.
//!
//! # Types
//!
//! - `Fix64` (I32F32): 32 integer bits, 32 fractional bits
//! - `Vec2Fix`: 2D vector using `Fix64` components
//!
//! # Precision
//!
//! - Range: ±2.1 × 10^9
//! - Precision: ~2.3 × 10^-10
//!
//! Overflow saturates instead of wrapping, so a runaway body pins at the
//! numeric limits rather than teleporting to the opposite edge of the world.

use core::cmp::Ordering;
use core::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

// ============================================================================
// Fix64 (I32F32) - 64-bit Fixed-Point Number
// ============================================================================

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 32;

const ONE_RAW: i64 = 1 << FRAC_BITS;

/// Newton-Raphson passes used by [`Fix64::sqrt`]. Enough for full 64-bit
/// convergence from a power-of-two initial guess.
const SQRT_ITERATIONS: usize = 12;

/// 64-bit fixed-point number (32 integer bits, 32 fractional bits)
///
/// Internal representation: `value = raw / 2^32`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Fix64(i64);

impl Fix64 {
    /// Zero constant
    pub const ZERO: Self = Self(0);

    /// One constant (1.0)
    pub const ONE: Self = Self(ONE_RAW);

    /// Negative one (-1.0)
    pub const NEG_ONE: Self = Self(-ONE_RAW);

    /// One half (0.5)
    pub const HALF: Self = Self(ONE_RAW / 2);

    /// Two (2.0)
    pub const TWO: Self = Self(2 * ONE_RAW);

    /// Largest representable value
    pub const MAX: Self = Self(i64::MAX);

    /// Smallest representable value
    pub const MIN: Self = Self(i64::MIN);

    /// Smallest positive value (one raw unit)
    pub const EPSILON: Self = Self(1);

    /// Create from integer
    #[inline]
    #[must_use]
    pub const fn from_int(n: i32) -> Self {
        Self((n as i64) << FRAC_BITS)
    }

    /// Create from raw Q32.32 bits
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw Q32.32 bits
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Create from fraction (numerator / denominator)
    ///
    /// Returns zero when `denom` is zero.
    #[must_use]
    pub const fn from_ratio(num: i64, denom: i64) -> Self {
        if denom == 0 {
            return Self::ZERO;
        }
        let scaled = ((num as i128) << FRAC_BITS) / denom as i128;
        Self(saturate(scaled))
    }

    /// Create from f64, rounding to the nearest representable value.
    ///
    /// Intended for configuration and tests. IEEE parsing and this
    /// conversion are both exact, so the result is still reproducible, but
    /// the simulation itself never converts back and forth.
    #[must_use]
    pub fn from_f64(f: f64) -> Self {
        if f.is_nan() {
            return Self::ZERO;
        }
        let scaled = f * ONE_RAW as f64;
        let rounded = if scaled >= 0.0 { scaled + 0.5 } else { scaled - 0.5 };
        // `as` saturates on out-of-range floats.
        Self(rounded as i64)
    }

    /// Convert to f64 (presentation only)
    #[inline]
    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / ONE_RAW as f64
    }

    /// Convert to f32 (presentation only)
    #[inline]
    #[must_use]
    pub fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }

    /// Integer part, rounded toward negative infinity
    #[inline]
    #[must_use]
    pub const fn floor_int(self) -> i64 {
        self.0 >> FRAC_BITS
    }

    /// Absolute value
    #[inline]
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Check if negative
    #[inline]
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Check if positive (strictly greater than zero)
    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Check if zero
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Sign as -1, 0 or 1
    #[inline]
    #[must_use]
    pub const fn signum(self) -> Self {
        if self.0 > 0 {
            Self::ONE
        } else if self.0 < 0 {
            Self::NEG_ONE
        } else {
            Self::ZERO
        }
    }

    /// Half of this value
    #[inline]
    #[must_use]
    pub const fn half(self) -> Self {
        Self(self.0 >> 1)
    }

    /// Double of this value
    #[inline]
    #[must_use]
    pub const fn double(self) -> Self {
        Self(self.0.saturating_mul(2))
    }

    /// Smaller of two values
    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Larger of two values
    #[inline]
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }

    /// Clamp into `[lo, hi]`
    #[inline]
    #[must_use]
    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        self.max(lo).min(hi)
    }

    /// Division that returns zero when `rhs` is zero.
    #[inline]
    #[must_use]
    pub fn safe_div(self, rhs: Self) -> Self {
        if rhs.0 == 0 {
            return Self::ZERO;
        }
        Self(saturate(((self.0 as i128) << FRAC_BITS) / rhs.0 as i128))
    }

    /// Division that reports a zero denominator instead of substituting zero.
    #[inline]
    #[must_use]
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.0 == 0 {
            None
        } else {
            Some(self.safe_div(rhs))
        }
    }

    /// `self * a / b` with a single rounding step. Returns zero when `b` is zero.
    #[must_use]
    pub fn mul_div(self, a: Self, b: Self) -> Self {
        if b.0 == 0 {
            return Self::ZERO;
        }
        Self(saturate((self.0 as i128 * a.0 as i128) / b.0 as i128))
    }

    /// Square root (deterministic Newton-Raphson, fixed iteration count)
    ///
    /// Negative inputs return zero. The result is the floor of the exact
    /// root at Q32.32 resolution.
    #[must_use]
    pub fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Self::ZERO;
        }
        // sqrt(raw / 2^32) * 2^32 == sqrt(raw << 32)
        Self(isqrt((self.0 as u128) << FRAC_BITS) as i64)
    }

    /// Square of this value
    #[inline]
    #[must_use]
    pub fn squared(self) -> Self {
        self * self
    }
}

/// Floor integer square root with a fixed number of Newton passes.
fn isqrt(n: u128) -> u128 {
    if n == 0 {
        return 0;
    }
    let bits = 128 - n.leading_zeros();
    let mut x: u128 = 1u128 << bits.div_ceil(2);
    for _ in 0..SQRT_ITERATIONS {
        let next = (x + n / x) >> 1;
        if next < x {
            x = next;
        }
    }
    x
}

#[inline]
const fn saturate(v: i128) -> i64 {
    if v > i64::MAX as i128 {
        i64::MAX
    } else if v < i64::MIN as i128 {
        i64::MIN
    } else {
        v as i64
    }
}

impl Add for Fix64 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Fix64 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for Fix64 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self(saturate((self.0 as i128 * rhs.0 as i128) >> FRAC_BITS))
    }
}

impl Div for Fix64 {
    type Output = Self;

    /// Division by zero yields zero (see [`Fix64::safe_div`]).
    #[inline]
    fn div(self, rhs: Self) -> Self {
        self.safe_div(rhs)
    }
}

impl Neg for Fix64 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl AddAssign for Fix64 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fix64 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Fix64 {
    #[inline]
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl core::fmt::Display for Fix64 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.6}", self.to_f64())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Fix64 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Fix64 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Self::from_f64(value))
    }
}

// ============================================================================
// Vec2Fix - 2D Vector
// ============================================================================

/// 2D vector with fixed-point components
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2Fix {
    /// X component
    pub x: Fix64,
    /// Y component
    pub y: Fix64,
}

impl Vec2Fix {
    /// Zero vector
    pub const ZERO: Self = Self {
        x: Fix64::ZERO,
        y: Fix64::ZERO,
    };

    /// Unit X
    pub const UNIT_X: Self = Self {
        x: Fix64::ONE,
        y: Fix64::ZERO,
    };

    /// Unit Y (up)
    pub const UNIT_Y: Self = Self {
        x: Fix64::ZERO,
        y: Fix64::ONE,
    };

    /// Create a new vector
    #[inline]
    #[must_use]
    pub const fn new(x: Fix64, y: Fix64) -> Self {
        Self { x, y }
    }

    /// Create from integers
    #[inline]
    #[must_use]
    pub const fn from_int(x: i32, y: i32) -> Self {
        Self {
            x: Fix64::from_int(x),
            y: Fix64::from_int(y),
        }
    }

    /// Create from f64 components (configuration and tests)
    #[must_use]
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self {
            x: Fix64::from_f64(x),
            y: Fix64::from_f64(y),
        }
    }

    /// Squared length
    #[inline]
    #[must_use]
    pub fn length_squared(self) -> Fix64 {
        self.x * self.x + self.y * self.y
    }

    /// Length
    ///
    /// Computed from the raw components in 128-bit space, so short vectors
    /// keep full precision instead of squaring away their low bits.
    #[must_use]
    pub fn length(self) -> Fix64 {
        let x = self.x.raw().unsigned_abs() as u128;
        let y = self.y.raw().unsigned_abs() as u128;
        let len = isqrt(x * x + y * y);
        Fix64::from_raw(len.min(i64::MAX as u128) as i64)
    }

    /// Unit vector in the same direction, or zero for a zero-length vector
    #[must_use]
    pub fn normalize(self) -> Self {
        self.try_normalize().unwrap_or(Self::ZERO)
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector
    #[must_use]
    pub fn try_normalize(self) -> Option<Self> {
        let len = self.length();
        if len.is_zero() {
            None
        } else {
            Some(Self::new(self.x / len, self.y / len))
        }
    }

    /// Dot product
    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> Fix64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross)
    #[inline]
    #[must_use]
    pub fn cross(self, other: Self) -> Fix64 {
        self.x * other.y - self.y * other.x
    }

    /// Counter-clockwise perpendicular
    #[inline]
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Scale by a scalar
    #[inline]
    #[must_use]
    pub fn scale(self, s: Fix64) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    /// Distance to another point
    #[inline]
    #[must_use]
    pub fn distance_to(self, other: Self) -> Fix64 {
        (self - other).length()
    }

    /// Squared distance to another point
    #[inline]
    #[must_use]
    pub fn distance_squared_to(self, other: Self) -> Fix64 {
        (self - other).length_squared()
    }

    /// Component-wise minimum
    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum
    #[inline]
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Clamp length to at most `max_len`
    #[must_use]
    pub fn clamp_length(self, max_len: Fix64) -> Self {
        let len_sq = self.length_squared();
        if len_sq <= max_len * max_len {
            return self;
        }
        self.normalize().scale(max_len)
    }

    /// Linear interpolation
    #[inline]
    #[must_use]
    pub fn lerp(self, other: Self, t: Fix64) -> Self {
        self + (other - self).scale(t)
    }
}

impl Add for Vec2Fix {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2Fix {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2Fix {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Mul<Fix64> for Vec2Fix {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Fix64) -> Self {
        self.scale(rhs)
    }
}

impl AddAssign for Vec2Fix {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec2Fix {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl PartialOrd for Vec2Fix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Vec2Fix {
    /// Lexicographic (x, then y). Used for deterministic hull construction.
    fn cmp(&self, other: &Self) -> Ordering {
        self.x.cmp(&other.x).then(self.y.cmp(&other.y))
    }
}

// ============================================================================
// Tests
// ============================================================================
