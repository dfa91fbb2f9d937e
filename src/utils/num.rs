//! Numeric utilities: centralized integer conversions and BSON number coercion.
//!
//! Guidelines
//! - Prefer fallible conversions (returning Option<T>) when a value out of range should stop the operation.
//! - Prefer saturating conversions when best-effort is acceptable (e.g., time spans logged as u64).
//! - BSON numbers are compared by value regardless of width (Int32, Int64, Double).

use bson::Bson;

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn u128_to_u64_saturating(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn u64_to_usize(v: u64) -> Option<usize> {
    usize::try_from(v).ok()
}

/// Integer view of a BSON number. Doubles are accepted only when they hold an exact integer.
#[must_use]
pub fn bson_as_i64(v: &Bson) -> Option<i64> {
    match v {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        #[allow(clippy::cast_possible_truncation)]
        Bson::Double(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
        _ => None,
    }
}

/// Floating point view of a BSON number; `None` for non-numeric values.
#[must_use]
pub fn bson_as_f64(v: &Bson) -> Option<f64> {
    match v {
        Bson::Int32(i) => Some(f64::from(*i)),
        #[allow(clippy::cast_precision_loss)]
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

#[must_use]
pub const fn is_numeric(v: &Bson) -> bool {
    matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}
