use core::fmt;
use std::ops::{Add, Div, Mul, Rem, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// Signed integer tagged with its compile-time knowledge.
///
/// Convention:
/// - `Static(v)` → value fixed when the kernel is specialized
/// - `Dyn(v)` → value known only at runtime
///
/// Arithmetic between two static values yields a static value; anything
/// involving a dynamic operand yields a dynamic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Int {
    Static(i64),
    Dyn(i64),
}

impl Int {
    pub const ZERO: Int = Int::Static(0);
    pub const ONE: Int = Int::Static(1);

    /// Construct a compile-time-known value
    pub const fn st(v: i64) -> Self {
        Int::Static(v)
    }

    /// Construct a runtime value
    pub const fn dy(v: i64) -> Self {
        Int::Dyn(v)
    }

    /// Return the concrete value
    #[inline(always)]
    pub const fn value(&self) -> i64 {
        match *self {
            Int::Static(v) | Int::Dyn(v) => v,
        }
    }

    /// Returns true if the value is compile-time static
    #[inline(always)]
    pub const fn is_static(&self) -> bool {
        matches!(self, Int::Static(_))
    }

    /// Tag `v` with the joined staticness of `a` and `b`
    #[inline(always)]
    pub(crate) fn like(v: i64, a: Int, b: Int) -> Int {
        if a.is_static() && b.is_static() {
            Int::Static(v)
        } else {
            Int::Dyn(v)
        }
    }

    pub fn abs(self) -> Int {
        match self {
            Int::Static(v) => Int::Static(v.abs()),
            Int::Dyn(v) => Int::Dyn(v.abs()),
        }
    }

    pub fn signum(self) -> Int {
        match self {
            Int::Static(v) => Int::Static(v.signum()),
            Int::Dyn(v) => Int::Dyn(v.signum()),
        }
    }

    pub fn min(self, other: Int) -> Int {
        Int::like(self.value().min(other.value()), self, other)
    }

    pub fn max(self, other: Int) -> Int {
        Int::like(self.value().max(other.value()), self, other)
    }

    /// Truncating quotient and remainder in one step
    pub fn divrem(self, other: Int) -> (Int, Int) {
        (self / other, self % other)
    }

    /// Ceiling division, for positive operands
    pub fn ceil_div(self, other: Int) -> Int {
        let v = (self.value() + other.value() - 1) / other.value();
        Int::like(v, self, other)
    }
}

/// Integer division for shapes and strides.
///
/// Fails when both operands are static and the division is not exact.
/// Dynamic operands truncate silently; divisibility is the caller's
/// obligation there, checked only in debug builds.
pub fn shape_div(num: Int, den: Int) -> Result<Int, LayoutError> {
    if den.value() == 0 {
        return Err(LayoutError::Divisibility { num, den });
    }
    if num.is_static() && den.is_static() && num.value() % den.value() != 0 {
        return Err(LayoutError::Divisibility { num, den });
    }
    debug_assert!(
        num.value() % den.value() == 0,
        "shape_div: {} is not divisible by {}",
        num,
        den
    );
    Ok(Int::like(num.value() / den.value(), num, den))
}

impl Add for Int {
    type Output = Int;
    fn add(self, rhs: Int) -> Int {
        Int::like(self.value() + rhs.value(), self, rhs)
    }
}

impl Sub for Int {
    type Output = Int;
    fn sub(self, rhs: Int) -> Int {
        Int::like(self.value() - rhs.value(), self, rhs)
    }
}

impl Mul for Int {
    type Output = Int;
    fn mul(self, rhs: Int) -> Int {
        Int::like(self.value() * rhs.value(), self, rhs)
    }
}

impl Div for Int {
    type Output = Int;
    fn div(self, rhs: Int) -> Int {
        Int::like(self.value() / rhs.value(), self, rhs)
    }
}

impl Rem for Int {
    type Output = Int;
    fn rem(self, rhs: Int) -> Int {
        Int::like(self.value() % rhs.value(), self, rhs)
    }
}

impl From<i64> for Int {
    fn from(v: i64) -> Self {
        Int::Static(v)
    }
}

impl PartialEq<i64> for Int {
    fn eq(&self, other: &i64) -> bool {
        self.value() == *other
    }
}

/// Display format:
/// - static values are prefixed with `_`
/// - dynamic values print bare
impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Int::Static(v) => write!(f, "_{}", v),
            Int::Dyn(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_value_works() {
        let v = Int::st(32);
        assert!(v.is_static());
        assert_eq!(v.value(), 32);
        assert_eq!(format!("{}", v), "_32");
    }

    #[test]
    fn dynamic_value_works() {
        let v = Int::dy(17);
        assert!(!v.is_static());
        assert_eq!(v.value(), 17);
        assert_eq!(format!("{}", v), "17");
    }

    #[test]
    fn arithmetic_joins_staticness() {
        let a = Int::st(6);
        let b = Int::st(4);
        let c = Int::dy(4);

        assert!((a * b).is_static());
        assert!((a + b).is_static());
        assert!(!(a * c).is_static());
        assert!(!(c - b).is_static());
        assert_eq!((a * b).value(), 24);
    }

    #[test]
    fn divrem_and_helpers() {
        let (q, r) = Int::st(17).divrem(Int::st(5));
        assert_eq!(q.value(), 3);
        assert_eq!(r.value(), 2);
        assert_eq!(Int::st(17).ceil_div(Int::st(5)).value(), 4);
        assert_eq!(Int::st(-3).abs().value(), 3);
        assert_eq!(Int::st(-3).signum().value(), -1);
        assert_eq!(Int::st(3).min(Int::st(7)).value(), 3);
        assert_eq!(Int::st(3).max(Int::st(7)).value(), 7);
    }

    #[test]
    fn shape_div_static_divisibility() {
        assert_eq!(shape_div(Int::st(12), Int::st(4)).unwrap().value(), 3);
        assert!(shape_div(Int::st(12), Int::st(5)).is_err());
        // dynamic operands defer the check to the caller
        assert_eq!(shape_div(Int::dy(12), Int::st(4)).unwrap().value(), 3);
        assert!(!shape_div(Int::dy(12), Int::st(4)).unwrap().is_static());
    }
}
