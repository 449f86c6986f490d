//! Fixed-width binary registers.
//!
//! A [`Word`] is one register or store cell. Its width and its optional
//! sign and overflow digits are fixed when it is built; only the bit
//! pattern changes afterwards. Every mutating method re-masks so no bit
//! above the width is ever set.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::word::bits::{self, mask, MAX_WIDTH};
use crate::word::Operand;

/// A fixed-width register or store cell.
///
/// With an overflow digit, the top bit is reserved: the number lives in
/// the bits below it, and signed arithmetic sets the digit when a result
/// does not fit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word {
    width: u32,
    overflow_digit: bool,
    sign_digit: bool,
    raw: u64,
}

impl Word {
    /// Create a zeroed word.
    ///
    /// # Panics
    /// Panics if `width` is zero, wider than [`MAX_WIDTH`], or if an
    /// overflow digit would leave no bits for the number.
    pub fn new(width: u32, overflow_digit: bool, sign_digit: bool) -> Self {
        assert!(
            (1..=MAX_WIDTH).contains(&width),
            "word width {} out of range [1, {}]",
            width,
            MAX_WIDTH
        );
        assert!(
            !overflow_digit || width >= 2,
            "a {}-bit word has no room for an overflow digit",
            width
        );
        Self {
            width,
            overflow_digit,
            sign_digit,
            raw: 0,
        }
    }

    /// A plain unsigned word.
    pub fn unsigned(width: u32) -> Self {
        Self::new(width, false, false)
    }

    /// A two's complement word with no overflow digit.
    pub fn signed(width: u32) -> Self {
        Self::new(width, false, true)
    }

    /// A two's complement word whose top bit is an overflow digit.
    pub fn signed_with_overflow(width: u32) -> Self {
        Self::new(width, true, true)
    }

    /// Builder form of [`Word::set_raw`].
    pub fn with_raw(mut self, raw: u64) -> Self {
        self.set_raw(raw);
        self
    }

    /// Builder form of [`Word::set`].
    pub fn with_value(mut self, value: i64) -> Self {
        self.set(value);
        self
    }

    #[inline]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub const fn has_overflow_digit(&self) -> bool {
        self.overflow_digit
    }

    #[inline]
    pub const fn has_sign_digit(&self) -> bool {
        self.sign_digit
    }

    /// The bit pattern, never wider than `width`.
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.raw
    }

    /// Number of bits holding the value: the width less the overflow digit.
    #[inline]
    pub const fn effective_width(&self) -> u32 {
        if self.overflow_digit {
            self.width - 1
        } else {
            self.width
        }
    }

    /// Overwrite the bit pattern.
    #[inline]
    pub fn set_raw(&mut self, raw: u64) {
        self.raw = bits::encode_unsigned(raw, self.width);
    }

    /// Store a number, wrapping it to the word.
    ///
    /// For a signed word with an overflow digit, the digit records whether
    /// `value` fitted below it.
    pub fn set(&mut self, value: i64) {
        self.store_value(value as i128);
    }

    fn store_value(&mut self, value: i128) {
        if self.overflow_digit && self.sign_digit {
            let eff = self.effective_width();
            let digit = if bits::fits_signed(value, eff) {
                0
            } else {
                1u64 << eff
            };
            self.raw = (value as u64 & mask(eff)) | digit;
        } else {
            self.raw = value as u64 & mask(self.width);
        }
    }

    /// Copy the low bits of `source` into this word.
    ///
    /// The copy covers `min(width_limit.unwrap_or(source.width), self.width)`
    /// bits. When a limit narrows the copy, the bits above it keep their
    /// old value; otherwise they are cleared.
    pub fn assign(&mut self, source: &Word, width_limit: Option<u32>) {
        let moved = width_limit.unwrap_or(source.width).min(self.width);
        let low = source.raw & mask(moved);
        if width_limit.is_some() && moved < self.width {
            self.raw = (self.raw & !mask(moved)) | low;
        } else {
            self.raw = low;
        }
        self.raw &= mask(self.width);
    }

    /// Set every bit to zero.
    #[inline]
    pub fn clear(&mut self) {
        self.raw = 0;
    }

    /// Add to the word's numeric value.
    pub fn add<'a>(&mut self, x: impl Into<Operand<'a>>) {
        let x = x.into().value();
        self.store_value(self.to_number() as i128 + x as i128);
    }

    /// Subtract from the word's numeric value; the same as adding `-x`.
    pub fn subtract<'a>(&mut self, x: impl Into<Operand<'a>>) {
        let x = x.into().value();
        self.store_value(self.to_number() as i128 - x as i128);
    }

    /// Bitwise AND over the raw bits.
    pub fn and<'a>(&mut self, x: impl Into<Operand<'a>>) {
        self.raw = (self.raw & x.into().bits()) & mask(self.width);
    }

    /// Bitwise exclusive OR over the raw bits.
    pub fn xor<'a>(&mut self, x: impl Into<Operand<'a>>) {
        self.raw = (self.raw ^ x.into().bits()) & mask(self.width);
    }

    /// Exchange bit patterns with `other`. Each side keeps its own shape.
    pub fn swap(&mut self, other: &mut Word) {
        let mine = self.raw;
        self.set_raw(other.raw);
        other.set_raw(mine);
    }

    /// True if the overflow digit exists and is set.
    #[inline]
    pub fn has_overflowed(&self) -> bool {
        self.overflow_digit && self.raw >> (self.width - 1) & 1 == 1
    }

    /// The numeric value, signed when the word has a sign digit.
    #[inline]
    pub fn to_number(&self) -> i64 {
        self.to_number_as(self.sign_digit)
    }

    /// The numeric value under an explicit signedness.
    ///
    /// Unsigned reads the whole pattern, overflow digit included. Signed
    /// reads the bits below the overflow digit as two's complement.
    pub fn to_number_as(&self, signed: bool) -> i64 {
        if signed {
            bits::interpret_signed(self.raw, self.effective_width())
        } else {
            bits::decode_unsigned(self.raw, self.width) as i64
        }
    }

    /// Whether the signed reading is below zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.to_number_as(true) < 0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Word{}({:#0w$b} = {})",
            self.width,
            self.raw,
            self.to_number(),
            w = self.width as usize + 2
        )
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0w$o}", self.raw, w = self.width.div_ceil(3) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_wraparound() {
        let mut w = Word::unsigned(8).with_raw(255);
        w.add(2);
        assert_eq!(w.raw(), 1);
    }

    #[test]
    fn test_unsigned_word_reads_minus_one_only_as_signed() {
        let mut w = Word::unsigned(8).with_raw(1);
        w.subtract(2);
        assert_eq!(w.raw(), 255);
        assert_eq!(w.to_number(), 255);
        assert_eq!(w.to_number_as(true), -1);
    }

    #[test]
    fn test_signed_reading() {
        let w = Word::signed(20).with_value(-5);
        assert_eq!(w.raw(), 0xF_FFFB);
        assert_eq!(w.to_number(), -5);
        assert_eq!(w.to_number_as(false), 0xF_FFFB);
    }

    #[test]
    fn test_overflow_digit_set_on_positive_overflow() {
        let mut m = Word::signed_with_overflow(21).with_value(524287);
        assert!(!m.has_overflowed());
        m.add(1);
        assert!(m.has_overflowed());
        assert_eq!(m.to_number(), -524288);
    }

    #[test]
    fn test_overflow_digit_clear_for_negative_results() {
        let mut m = Word::signed_with_overflow(21);
        m.subtract(1);
        assert!(!m.has_overflowed());
        assert_eq!(m.to_number(), -1);
        assert_eq!(m.raw(), 0xF_FFFF);
    }

    #[test]
    fn test_add_word_operand() {
        let mut a = Word::signed(20).with_value(-7);
        let b = Word::signed(20).with_value(10);
        a.add(&b);
        assert_eq!(a.to_number(), 3);
        a.subtract(&b);
        assert_eq!(a.to_number(), -7);
    }

    #[test]
    fn test_and_xor() {
        let mut w = Word::unsigned(8).with_raw(0b1100_1100);
        w.and(0b1010_1010);
        assert_eq!(w.raw(), 0b1000_1000);
        w.xor(-1i64);
        assert_eq!(w.raw(), 0b0111_0111);
    }

    #[test]
    fn test_assign_without_limit_clears_high_bits() {
        let mut dst = Word::unsigned(20).with_raw(0xF_FFFF);
        let src = Word::unsigned(11).with_raw(0x123);
        dst.assign(&src, None);
        assert_eq!(dst.raw(), 0x123);
    }

    #[test]
    fn test_assign_with_limit_keeps_high_bits() {
        let mut dst = Word::unsigned(20).with_raw(0xF_F000);
        let src = Word::unsigned(20).with_raw(0xA_BCDE);
        dst.assign(&src, Some(11));
        assert_eq!(dst.raw(), 0xF_F000 | 0x4DE);
    }

    #[test]
    fn test_assign_truncates_to_own_width() {
        let mut b = Word::unsigned(11);
        let cell = Word::unsigned(20).with_raw(0xF_FFFF);
        b.assign(&cell, None);
        assert_eq!(b.raw(), 0x7FF);
    }

    #[test]
    fn test_swap_keeps_shapes() {
        let mut narrow = Word::unsigned(11).with_raw(5);
        let mut wide = Word::unsigned(20).with_raw(0xF_FFFF);
        narrow.swap(&mut wide);
        assert_eq!(narrow.raw(), 0x7FF);
        assert_eq!(wide.raw(), 5);
        assert_eq!(narrow.width(), 11);
    }

    #[test]
    #[should_panic]
    fn test_zero_width_rejected() {
        let _ = Word::unsigned(0);
    }
}
