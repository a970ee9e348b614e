//! Fixed-width integers and complex numbers.

use std::fmt;

use gx_ir::IntKind;

/// An integer of a specific kind.
///
/// `bits` is normalized: signed kinds are sign-extended to 64 bits and
/// unsigned kinds are masked to their width, so equal values always have
/// equal bits and every arithmetic result wraps to the kind's width.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct IntValue {
    kind: IntKind,
    bits: u64,
}

impl IntValue {
    /// Wrap `value` into `kind`'s width.
    #[inline]
    pub fn new(kind: IntKind, value: i128) -> Self {
        IntValue {
            kind,
            bits: normalize(kind, value as u64),
        }
    }

    /// An `int`.
    #[inline]
    pub fn int(value: i64) -> Self {
        Self::new(IntKind::Int, i128::from(value))
    }

    /// Build from raw bits, wrapping into `kind`'s width.
    #[inline]
    pub fn from_bits(kind: IntKind, bits: u64) -> Self {
        IntValue {
            kind,
            bits: normalize(kind, bits),
        }
    }

    #[inline]
    pub fn kind(self) -> IntKind {
        self.kind
    }

    /// Raw two's complement bits.
    #[inline]
    pub fn bits(self) -> u64 {
        self.bits
    }

    /// Signed interpretation (unsigned values above `i64::MAX` wrap).
    #[inline]
    pub fn as_i64(self) -> i64 {
        self.bits as i64
    }

    /// Unsigned interpretation.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.bits
    }

    /// Exact mathematical value.
    #[inline]
    pub fn as_i128(self) -> i128 {
        if self.kind.is_signed() {
            i128::from(self.bits as i64)
        } else {
            i128::from(self.bits)
        }
    }

    /// Exact value as a float.
    #[inline]
    pub fn as_f64(self) -> f64 {
        if self.kind.is_signed() {
            self.as_i64() as f64
        } else {
            self.bits as f64
        }
    }

    /// Same value converted (with wrapping) to another kind.
    #[inline]
    #[must_use]
    pub fn with_kind(self, kind: IntKind) -> Self {
        Self::new(kind, self.as_i128())
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.bits == 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.kind.is_signed() && (self.bits as i64) < 0
    }
}

#[inline]
fn normalize(kind: IntKind, raw: u64) -> u64 {
    let width = kind.bits();
    if width == 64 {
        return raw;
    }
    let mask = (1u64 << width) - 1;
    let value = raw & mask;
    if kind.is_signed() && (value >> (width - 1)) & 1 == 1 {
        value | !mask
    } else {
        value
    }
}

impl fmt::Display for IntValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_signed() {
            write!(f, "{}", self.as_i64())
        } else {
            write!(f, "{}", self.bits)
        }
    }
}

/// A complex number. `complex64` values keep `f32` precision in both parts.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const fn new(re: f64, im: f64) -> Self {
        Complex { re, im }
    }

    /// Round both parts to `f32`.
    #[must_use]
    pub fn narrow(self) -> Self {
        Complex {
            re: f64::from(self.re as f32),
            im: f64::from(self.im as f32),
        }
    }

    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Complex::new(self.re + other.re, self.im + other.im)
    }

    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Complex::new(self.re - other.re, self.im - other.im)
    }

    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Complex::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    #[must_use]
    pub fn div(self, other: Self) -> Self {
        let denom = other.re * other.re + other.im * other.im;
        Complex::new(
            (self.re * other.re + self.im * other.im) / denom,
            (self.im * other.re - self.re * other.im) / denom,
        )
    }

    #[must_use]
    pub fn neg(self) -> Self {
        Complex::new(-self.re, -self.im)
    }
}
