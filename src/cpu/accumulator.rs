//! Double-length accumulator arithmetic and shifts.
//!
//! The accumulator is M above L. M holds a 20-bit signed value under its
//! overflow digit and L holds 19 unsigned bits, giving a 39-bit signed
//! number; with the overflow digit the register is 40 bits wide.
//!
//! Store words are 20 bits. Double-length add and subtract line the word
//! up with the bottom of L, so its sign bit lands on the lowest bit of M.
//! Only a wrap past either end of the accumulator crosses M's sign.

use serde::{Deserialize, Serialize};

use crate::cpu::registers::L_WIDTH;
use crate::word::bits::{self, mask};
use crate::word::Word;

/// Bits in the accumulator, overflow digit included.
pub const ACCUMULATOR_WIDTH: u32 = 40;
/// Bits holding the accumulator's signed value.
pub const SIGNIFICANT_WIDTH: u32 = ACCUMULATOR_WIDTH - 1;

/// The accumulator as one signed number.
pub fn value(m: &Word, l: &Word) -> i64 {
    (m.to_number() << L_WIDTH) + l.raw() as i64
}

/// Store a signed number into M:L. M's overflow digit records whether the
/// high part fitted.
pub fn set_value(m: &mut Word, l: &mut Word, value: i128) {
    m.set((value >> L_WIDTH) as i64);
    l.set_raw(value as u64);
}

/// Add a store word to M:L with carry from L into M.
///
/// The word's low 19 bits go into L and its top bit into the bottom of M.
/// Returns true when M crossed from non-negative to negative.
pub fn add_double(m: &mut Word, l: &mut Word, s: &Word) -> bool {
    let low_sum = l.raw() + (s.raw() & mask(L_WIDTH));
    let carry = (low_sum >> L_WIDTH) as i64;
    l.set_raw(low_sum);

    let before = m.to_number();
    m.add(top_bit(s) + carry);
    before >= 0 && m.to_number() < 0
}

/// Subtract a store word from M:L with borrow from M into L.
///
/// Returns true when M crossed from negative to non-negative.
pub fn subtract_double(m: &mut Word, l: &mut Word, s: &Word) -> bool {
    let low_diff = l.raw() as i64 - (s.raw() & mask(L_WIDTH)) as i64;
    let borrow = i64::from(low_diff < 0);
    l.set_raw(low_diff as u64);

    let before = m.to_number();
    m.subtract(top_bit(s) + borrow);
    before < 0 && m.to_number() >= 0
}

/// The store word's sign bit, which lines up with bit 0 of M.
fn top_bit(s: &Word) -> i64 {
    ((s.raw() >> L_WIDTH) & 1) as i64
}

/// Signed multiply of a store word by D into M:L.
///
/// Returns true if the product does not fit in the accumulator.
pub fn multiply(m: &mut Word, l: &mut Word, s: &Word, d: &Word) -> bool {
    let product = s.to_number_as(true) as i128 * d.to_number() as i128;
    set_value(m, l, product);
    m.has_overflowed()
}

/// The four shift orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shift {
    ArithmeticLeft,
    ArithmeticRight,
    LogicalLeft,
    LogicalRight,
}

impl Shift {
    /// The shift obeyed by orders 36-39.
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            36 => Some(Shift::ArithmeticLeft),
            37 => Some(Shift::ArithmeticRight),
            38 => Some(Shift::LogicalLeft),
            39 => Some(Shift::LogicalRight),
            _ => None,
        }
    }

    /// The same kind of shift in the other direction.
    pub fn reversed(self) -> Self {
        match self {
            Shift::ArithmeticLeft => Shift::ArithmeticRight,
            Shift::ArithmeticRight => Shift::ArithmeticLeft,
            Shift::LogicalLeft => Shift::LogicalRight,
            Shift::LogicalRight => Shift::LogicalLeft,
        }
    }
}

/// Overflow raised by a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftOverflow {
    /// Significant bits were lost; the program may carry on.
    Recoverable,
    /// A non-zero accumulator was shifted left past its full width.
    Irrecoverable,
}

/// Shift M:L by a signed count. A negative count shifts the other way.
pub fn shift(m: &mut Word, l: &mut Word, kind: Shift, count: i64) -> Option<ShiftOverflow> {
    let (kind, places) = if count < 0 {
        (kind.reversed(), count.unsigned_abs())
    } else {
        (kind, count as u64)
    };
    let places = places.min(ACCUMULATOR_WIDTH as u64) as u32;

    match kind {
        Shift::ArithmeticLeft => {
            let (result, overflow) = arithmetic_left(value(m, l), places);
            set_value(m, l, result as i128);
            overflow
        }
        Shift::ArithmeticRight => {
            let result = arithmetic_right(value(m, l), places);
            set_value(m, l, result as i128);
            None
        }
        Shift::LogicalLeft | Shift::LogicalRight => {
            let raw = (m.raw() << L_WIDTH) | l.raw();
            let shifted = if places >= ACCUMULATOR_WIDTH {
                0
            } else if kind == Shift::LogicalLeft {
                (raw << places) & mask(ACCUMULATOR_WIDTH)
            } else {
                raw >> places
            };
            m.set_raw(shifted >> L_WIDTH);
            l.set_raw(shifted);
            None
        }
    }
}

/// Shift left keeping the sign digit.
///
/// Overflow if any bit that leaves the significant part, or lands in the
/// top significant place, differs from the sign.
fn arithmetic_left(value: i64, places: u32) -> (i64, Option<ShiftOverflow>) {
    let negative = value < 0;
    if places >= ACCUMULATOR_WIDTH {
        let fill = if negative { -1 } else { 0 };
        let overflow = (value != 0).then_some(ShiftOverflow::Irrecoverable);
        return (fill, overflow);
    }

    let shifted = (value as i128) << places;
    let overflow = (!bits::fits_signed(shifted, SIGNIFICANT_WIDTH))
        .then_some(ShiftOverflow::Recoverable);

    let magnitude_bits = SIGNIFICANT_WIDTH - 1;
    let magnitude = (shifted as u64 & mask(magnitude_bits)) as i64;
    let result = if negative {
        magnitude - (1i64 << magnitude_bits)
    } else {
        magnitude
    };
    (result, overflow)
}

/// Shift right filling with the sign.
fn arithmetic_right(value: i64, places: u32) -> i64 {
    if places >= SIGNIFICANT_WIDTH {
        if value < 0 {
            -1
        } else {
            0
        }
    } else {
        value >> places
    }
}
