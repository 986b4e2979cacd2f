//! Power-of-two helpers used by sizing and address decoding.

/// Rounds `value` up to the next power of two (`0` becomes `1`).
#[inline]
pub const fn next_power_of_two(value: u64) -> u64 {
    value.next_power_of_two()
}

/// Rounds `value` down to a power of two. Returns `0` for `0`.
#[inline]
pub const fn floor_power_of_two(value: u64) -> u64 {
    if value == 0 {
        0
    } else {
        1 << (63 - value.leading_zeros())
    }
}

/// Returns `log2(value)` when `value` is a power of two.
#[inline]
pub const fn exact_log2(value: u64) -> Option<u32> {
    if value.is_power_of_two() {
        Some(value.trailing_zeros())
    } else {
        None
    }
}

/// Expands a 4-bit bus byte-select into a lane mask positioned at `byte_offset`.
#[inline]
pub const fn lane_mask(byte_select: u8, byte_offset: usize) -> u64 {
    ((byte_select & 0xF) as u64) << byte_offset
}
