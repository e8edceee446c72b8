//! Numeric ranges for wire header fields.
//!
//! BEEP headers are decimal ASCII; every field is bounded below by zero and
//! above by either 2^31 or 2^32 (RFC 3080 section 2.2). These constants are
//! the single source of truth for validating parsed and constructed frames.

/// Exclusive upper bound for `channel`, `msgno`, and `size` fields: 2^31.
pub const U31_BOUND: u64 = 1 << 31;

/// Exclusive upper bound for `seqno`, `ansno`, `ackno`, and `window` fields: 2^32.
/// `u32::MAX + 1`, kept as `u64` so the comparison in `check_u31`/`check_u32`
/// never overflows the type being validated.
pub const U32_BOUND: u64 = 1 << 32;

/// Checks that a parsed value fits a 31-bit wire field (channel, msgno, size).
pub fn check_u31(value: u64) -> Option<u32> {
    if value < U31_BOUND {
        Some(value as u32)
    } else {
        None
    }
}

/// Checks that a parsed value fits a 32-bit wire field (seqno, ansno, ackno, window).
pub fn check_u32(value: u64) -> Option<u32> {
    if value < U32_BOUND { Some(value as u32) } else { None }
}
