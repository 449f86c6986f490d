//! Bit-width helpers shared by every register and store cell.
//!
//! All values are held in a `u64` with only the low `width` bits
//! significant. Widths run from 1 to [`MAX_WIDTH`].

/// Widest word this crate will build.
pub const MAX_WIDTH: u32 = 63;

/// A mask covering the low `width` bits.
#[inline]
pub const fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Pack an unsigned value into `width` bits, discarding higher bits.
#[inline]
pub const fn encode_unsigned(value: u64, width: u32) -> u64 {
    value & mask(width)
}

/// Read the low `width` bits of `raw` as a plain magnitude.
#[inline]
pub const fn decode_unsigned(raw: u64, width: u32) -> u64 {
    raw & mask(width)
}

/// Pack a signed value into `width` bits as two's complement.
#[inline]
pub const fn encode_signed(value: i64, width: u32) -> u64 {
    (value as u64) & mask(width)
}

/// Read the low `width` bits of `raw` as a two's complement number.
///
/// Bit `width - 1` is the sign bit.
///
/// # Panics
/// Panics if `width` is zero or wider than 64.
pub fn interpret_signed(raw: u64, width: u32) -> i64 {
    assert!(
        (1..=64).contains(&width),
        "cannot interpret a {}-bit value as signed",
        width
    );
    let raw = raw & mask(width);
    if width == 64 {
        return raw as i64;
    }
    if raw & (1u64 << (width - 1)) != 0 {
        (raw as i128 - (1i128 << width)) as i64
    } else {
        raw as i64
    }
}

/// Whether `value` is representable as a `width`-bit two's complement number.
#[inline]
pub fn fits_signed(value: i128, width: u32) -> bool {
    let half = 1i128 << (width - 1);
    value >= -half && value < half
}
