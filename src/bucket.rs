//! Deterministic percentile bucketing for variant assignment.
//!
//! This module intentionally does **not** provide cryptographic guarantees; it
//! is a repeatable, consistent mapping from `(customer, test)` pairs to a
//! percentile in `[0, 100)`. The hash is a fixed wire-compatible policy:
//! assignments must agree with existing systems that bucket the same keys, so
//! the update rule and its 32-bit truncation are not tunable.

/// 32-bit rolling hash over the UTF-16 code units of `s`.
///
/// Update rule per unit: `h = (h << 5) - h + unit` (i.e. `h * 31 + unit`),
/// truncated to signed 32 bits on every step. UTF-16 units (rather than
/// bytes) keep parity with `charCodeAt`-style hashers for non-ASCII ids.
#[must_use]
pub fn bucket32(s: &str) -> i32 {
    let mut h: i32 = 0;
    for unit in s.encode_utf16() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32);
    }
    h
}

/// Percentile bucket in `[0, 100)` for a `(customer, test)` pair.
///
/// Hashes `"{customer_id}:{test_name}"` and reduces the absolute value
/// modulo 100. `unsigned_abs` keeps `i32::MIN` well-defined.
#[must_use]
pub fn percentile_bucket(customer_id: &str, test_name: &str) -> u32 {
    let key = format!("{customer_id}:{test_name}");
    bucket32(&key).unsigned_abs() % 100
}
