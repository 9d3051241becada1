//! Timing-safe comparison.

use subtle::ConstantTimeEq;

/// Compares two byte strings without short-circuiting on the first
/// differing byte.
///
/// Lengths are not secret: inputs of different length return `false`
/// immediately.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}
