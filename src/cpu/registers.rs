//! Machine registers.
//!
//! - Counter: 11-bit order counter
//! - B0-B7: 11-bit index registers
//! - M, L: high (21-bit) and low (19-bit) halves of the accumulator
//! - D: 21-bit multiplier register
//! - S: 21-bit store-transfer register, a copy of the last store traffic
//! - C: 21-bit control register holding the current order
//! - V: 21-bit inspection register
//!
//! M, D, S and V carry an overflow digit above a 20-bit signed value.

use serde::{Deserialize, Serialize};

use crate::cpu::decode::ADDRESS_WIDTH;
use crate::word::bits::mask;
use crate::word::Word;

/// Number of B-registers.
pub const B_REGISTERS: usize = 8;
/// Width of M, D, S, C and V.
pub const LONG_WIDTH: u32 = 21;
/// Width of L, the low half of the accumulator.
pub const L_WIDTH: u32 = 19;

/// The register file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Registers {
    /// Order counter.
    pub counter: Word,
    /// Index registers B0-B7.
    pub b: [Word; B_REGISTERS],
    /// Accumulator high half; holds the accumulator's sign.
    pub m: Word,
    /// Accumulator low half, unsigned.
    pub l: Word,
    /// Multiplier register.
    pub d: Word,
    /// Store-transfer register.
    pub s: Word,
    /// Control register: the order being obeyed.
    pub c: Word,
    /// Inspection register.
    pub v: Word,
    /// One-shot modifier added to the next fetched order's address.
    pub modifier: Option<Word>,
}

impl Registers {
    /// A register file with everything zeroed.
    pub fn new() -> Self {
        Self {
            counter: Word::unsigned(ADDRESS_WIDTH),
            b: [Word::unsigned(ADDRESS_WIDTH); B_REGISTERS],
            m: Word::signed_with_overflow(LONG_WIDTH),
            l: Word::unsigned(L_WIDTH),
            d: Word::signed_with_overflow(LONG_WIDTH),
            s: Word::signed_with_overflow(LONG_WIDTH),
            c: Word::unsigned(LONG_WIDTH),
            v: Word::signed_with_overflow(LONG_WIDTH),
            modifier: None,
        }
    }

    /// Zero every register and drop any pending modifier.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Step the counter on by one, returning the old value.
    pub fn advance_counter(&mut self) -> u16 {
        let old = self.counter.raw() as u16;
        self.counter.add(1);
        old
    }

    /// Set the counter to an absolute address.
    pub fn jump(&mut self, addr: u16) {
        self.counter.set_raw(addr as u64);
    }

    /// Apply B-modification to an address field.
    ///
    /// Register 0 means no modification; any other register's contents
    /// are added, modulo 2048.
    pub fn effective_address(&self, b: u8, n: u16) -> u16 {
        if b == 0 {
            return n;
        }
        let base = self.b[(b & 0x7) as usize].raw();
        ((base + n as u64) & mask(ADDRESS_WIDTH)) as u16
    }

    /// Arm the one-shot modifier.
    pub fn set_modifier(&mut self, value: u64) {
        self.modifier = Some(Word::unsigned(ADDRESS_WIDTH).with_raw(value));
    }

    /// Add the pending modifier, if any, into the address field of C and
    /// consume it. Returns the modifier that was applied.
    pub fn apply_modifier(&mut self) -> Option<u16> {
        let modifier = self.modifier.take()?;
        let field = mask(ADDRESS_WIDTH);
        let raw = self.c.raw();
        let address = (raw + modifier.raw()) & field;
        self.c.set_raw((raw & !field) | address);
        Some(modifier.raw() as u16)
    }

    /// The accumulator as one signed number: M above L.
    pub fn accumulator(&self) -> i64 {
        crate::cpu::accumulator::value(&self.m, &self.l)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_address() {
        let mut regs = Registers::new();
        regs.b[3].set(10);

        assert_eq!(regs.effective_address(0, 50), 50);
        assert_eq!(regs.effective_address(3, 50), 60);
    }

    #[test]
    fn test_effective_address_wraps() {
        let mut regs = Registers::new();
        regs.b[1].set(2000);
        assert_eq!(regs.effective_address(1, 100), 52);
    }

    #[test]
    fn test_register_zero_is_not_used_for_modification() {
        let mut regs = Registers::new();
        regs.b[0].set(7);
        assert_eq!(regs.effective_address(0, 5), 5);
    }

    #[test]
    fn test_advance_counter() {
        let mut regs = Registers::new();
        regs.jump(10);

        let old = regs.advance_counter();
        assert_eq!(old, 10);
        assert_eq!(regs.counter.raw(), 11);
    }

    #[test]
    fn test_counter_wraps_at_eleven_bits() {
        let mut regs = Registers::new();
        regs.jump(2047);
        regs.advance_counter();
        assert_eq!(regs.counter.raw(), 0);
    }

    #[test]
    fn test_apply_modifier_is_one_shot() {
        let mut regs = Registers::new();
        regs.c.set_raw(crate::cpu::decode::encode(26, 0, 2040));
        regs.set_modifier(10);

        assert_eq!(regs.apply_modifier(), Some(10));
        assert_eq!(crate::cpu::decode::decode(regs.c.raw()).address, 2);
        assert_eq!(crate::cpu::decode::decode(regs.c.raw()).opcode, 26);
        assert_eq!(regs.apply_modifier(), None);
    }
}
