//! Overflow-flagged 32-bit arithmetic.
//!
//! The loop unroller simulates a counted loop at compile time to learn its
//! trip count. That simulation runs on [`CheckedInt32`], which carries an
//! explicit overflow flag instead of wrapping or panicking, so a loop whose
//! induction variable would overflow is detected and rejected.

use std::fmt;

/// A signed 32-bit integer that remembers whether any operation producing it
/// overflowed.
///
/// Once overflowed, a value stays overflowed through every further operation
/// and its numeric payload is meaningless.
///
/// # Examples
///
/// ```rust,ignore
/// use dfg_unroll::utils::CheckedInt32;
///
/// let a = CheckedInt32::new(i32::MAX);
/// assert!(a.add(CheckedInt32::new(1)).has_overflowed());
/// assert_eq!(CheckedInt32::new(7).div(CheckedInt32::new(2)).value(), Some(3));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckedInt32 {
    value: i32,
    overflowed: bool,
}

impl CheckedInt32 {
    /// Wraps a plain value.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self {
            value,
            overflowed: false,
        }
    }

    const fn overflow() -> Self {
        Self {
            value: 0,
            overflowed: true,
        }
    }

    /// Returns true if this value is the result of an overflowing operation.
    #[must_use]
    pub const fn has_overflowed(self) -> bool {
        self.overflowed
    }

    /// Returns the value, or `None` once overflowed.
    #[must_use]
    pub const fn value(self) -> Option<i32> {
        if self.overflowed {
            None
        } else {
            Some(self.value)
        }
    }

    fn combine(self, rhs: Self, op: impl FnOnce(i32, i32) -> Option<i32>) -> Self {
        if self.overflowed || rhs.overflowed {
            return Self::overflow();
        }
        op(self.value, rhs.value).map_or(Self::overflow(), Self::new)
    }

    /// Checked addition.
    #[must_use]
    pub fn add(self, rhs: Self) -> Self {
        self.combine(rhs, i32::checked_add)
    }

    /// Checked subtraction.
    #[must_use]
    pub fn sub(self, rhs: Self) -> Self {
        self.combine(rhs, i32::checked_sub)
    }

    /// Checked multiplication.
    #[must_use]
    pub fn mul(self, rhs: Self) -> Self {
        self.combine(rhs, i32::checked_mul)
    }

    /// Checked division, truncating toward zero.
    ///
    /// Division by zero and `i32::MIN / -1` are flagged as overflow.
    #[must_use]
    pub fn div(self, rhs: Self) -> Self {
        self.combine(rhs, i32::checked_div)
    }
}

impl From<i32> for CheckedInt32 {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for CheckedInt32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.overflowed {
            write!(f, "CheckedInt32(overflow)")
        } else {
            write!(f, "CheckedInt32({})", self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(value: i32) -> CheckedInt32 {
        CheckedInt32::new(value)
    }

    #[test]
    fn test_plain_arithmetic() {
        assert_eq!(c(3).add(c(4)).value(), Some(7));
        assert_eq!(c(3).sub(c(4)).value(), Some(-1));
        assert_eq!(c(-3).mul(c(4)).value(), Some(-12));
        assert_eq!(c(-7).div(c(2)).value(), Some(-3));
    }

    #[test]
    fn test_overflow_is_flagged() {
        assert!(c(i32::MAX).add(c(1)).has_overflowed());
        assert!(c(i32::MIN).sub(c(1)).has_overflowed());
        assert!(c(1 << 16).mul(c(1 << 16)).has_overflowed());
        assert!(c(i32::MIN).div(c(-1)).has_overflowed());
        assert!(c(5).div(c(0)).has_overflowed());
    }

    #[test]
    fn test_overflow_is_sticky() {
        let poisoned = c(i32::MAX).add(c(1));
        assert_eq!(poisoned.value(), None);
        assert!(poisoned.sub(c(1)).has_overflowed());
        assert!(c(0).mul(poisoned).has_overflowed());
        assert_eq!(format!("{poisoned:?}"), "CheckedInt32(overflow)");
    }
}
