//! Order codec.
//!
//! A 20-bit store word holds one order:
//! - Bits 19-14: function (opcode), 0-63
//! - Bits 13-11: B-register index, 0-7
//! - Bits 10-0: address or immediate, 0-2047

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::word::bits::mask;

/// Width of an order word.
pub const ORDER_WIDTH: u32 = 20;
/// Width of the address field.
pub const ADDRESS_WIDTH: u32 = 11;

const OPCODE_SHIFT: u32 = 14;
const REGISTER_SHIFT: u32 = 11;

/// Named function codes.
pub struct Opcode;

impl Opcode {
    pub const STOP: u8 = 0;
    pub const STORE_B: u8 = 1;
    pub const LOAD_B: u8 = 2;
    pub const ADD_B: u8 = 3;
    pub const SUB_B: u8 = 4;
    pub const SET_B: u8 = 5;
    pub const INC_B: u8 = 6;
    pub const DEC_B: u8 = 7;
    pub const AND_B: u8 = 8;
    pub const EXCHANGE_B: u8 = 9;
    pub const READ_TAPE: u8 = 10;
    pub const JUMP_B_POSITIVE: u8 = 12;
    pub const JUMP_B_NONZERO: u8 = 13;
    pub const COUNT_1: u8 = 14;
    pub const COUNT_2: u8 = 15;
    pub const MODIFY: u8 = 16;
    pub const MODIFY_FROM_STORE: u8 = 17;
    pub const OUTPUT: u8 = 20;
    pub const JUMP_NEGATIVE: u8 = 21;
    pub const JUMP_POSITIVE: u8 = 22;
    pub const JUMP_NONZERO: u8 = 23;
    pub const JUMP_UNDERFLOW: u8 = 24;
    pub const JUMP_OVERFLOW: u8 = 25;
    pub const JUMP: u8 = 26;
    pub const JUMP_SWITCH_STORE: u8 = 27;
    pub const WIRE_CONNECT: u8 = 28;
    pub const WIRE_DISCONNECT: u8 = 29;
    pub const STORE_L: u8 = 31;
    pub const LOAD_ACCUMULATOR: u8 = 32;
    pub const ADD_DOUBLE: u8 = 33;
    pub const SUB_DOUBLE: u8 = 34;
    pub const NORMALISE: u8 = 35;
    pub const ARITH_LEFT: u8 = 36;
    pub const ARITH_RIGHT: u8 = 37;
    pub const LOGICAL_LEFT: u8 = 38;
    pub const LOGICAL_RIGHT: u8 = 39;
    pub const CLEAR_ACCUMULATOR: u8 = 40;
    pub const LOAD_M: u8 = 41;
    pub const REPLACE_M: u8 = 42;
    pub const ADD_M: u8 = 43;
    pub const SUB_M: u8 = 44;
    pub const ADD_TO_STORE: u8 = 45;
    pub const SUB_FROM_STORE: u8 = 46;
    pub const XOR_M: u8 = 47;
    pub const AND_M: u8 = 48;
    pub const EXCHANGE_M: u8 = 49;
    pub const STORE_D: u8 = 51;
    pub const LOAD_D: u8 = 52;
    pub const ADD_D: u8 = 53;
    pub const SUB_D: u8 = 54;
    pub const SET_D: u8 = 55;
    pub const MULTIPLY: u8 = 56;
    pub const DIVIDE: u8 = 58;
    pub const EXCHANGE_M_D: u8 = 59;
    pub const LOAD_V: u8 = 60;
}

/// Assembly mnemonic for a function code, if it is defined.
pub fn mnemonic(opcode: u8) -> Option<&'static str> {
    Some(match opcode {
        0 => "STOP",
        1 => "STB",
        2 => "LDB",
        3 => "ADB",
        4 => "SBB",
        5 => "SETB",
        6 => "INCB",
        7 => "DECB",
        8 => "ANDB",
        9 => "XCHB",
        10 => "READ",
        12 => "JBP",
        13 => "JBNZ",
        14 => "CNT1",
        15 => "CNT2",
        16 => "MOD",
        17 => "MODS",
        20 => "OUT",
        21 => "JAN",
        22 => "JAP",
        23 => "JANZ",
        24 => "JUF",
        25 => "JOF",
        26 => "JMP",
        27 => "JMPX",
        28 => "WCON",
        29 => "WDIS",
        31 => "STL",
        32 => "LDA",
        33 => "ADDL",
        34 => "SUBL",
        35 => "NORM",
        36 => "ASL",
        37 => "ASR",
        38 => "LSL",
        39 => "LSR",
        40 => "CLA",
        41 => "LDM",
        42 => "REPM",
        43 => "ADDM",
        44 => "SUBM",
        45 => "ADDS",
        46 => "SUBS",
        47 => "XORM",
        48 => "ANDM",
        49 => "XCHM",
        51 => "STD",
        52 => "LDD",
        53 => "ADDD",
        54 => "SUBD",
        55 => "SETD",
        56 => "MUL",
        58 => "DIV",
        59 => "XCHD",
        60 => "LDV",
        _ => return None,
    })
}

/// A decoded order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    /// Function code, 0-63.
    pub opcode: u8,
    /// B-register index, 0-7.
    pub register: u8,
    /// Address or immediate, 0-2047.
    pub address: u16,
}

impl Order {
    /// Build an order, masking each field to its width.
    pub const fn new(opcode: u8, register: u8, address: u16) -> Self {
        Self {
            opcode: opcode & 0x3F,
            register: register & 0x7,
            address: address & 0x7FF,
        }
    }

    /// Pack into a store word.
    pub const fn encode(&self) -> u64 {
        encode(self.opcode, self.register, self.address)
    }

    pub fn mnemonic(&self) -> Option<&'static str> {
        mnemonic(self.opcode)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:2} {} {:4}", self.opcode, self.register, self.address)
    }
}

/// Split a store word into its fields. Bits above 19 are ignored.
pub const fn decode(word: u64) -> Order {
    Order {
        opcode: ((word >> OPCODE_SHIFT) & 0x3F) as u8,
        register: ((word >> REGISTER_SHIFT) & 0x7) as u8,
        address: (word & mask(ADDRESS_WIDTH)) as u16,
    }
}

/// Pack order fields into a store word.
pub const fn encode(opcode: u8, register: u8, address: u16) -> u64 {
    ((opcode as u64 & 0x3F) << OPCODE_SHIFT)
        | ((register as u64 & 0x7) << REGISTER_SHIFT)
        | (address as u64 & mask(ADDRESS_WIDTH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fields() {
        let order = decode(0b111111_101_00000000011);
        assert_eq!(order.opcode, 63);
        assert_eq!(order.register, 5);
        assert_eq!(order.address, 3);
    }

    #[test]
    fn test_encode_layout() {
        assert_eq!(encode(1, 3, 10), (1 << 14) | (3 << 11) | 10);
        assert_eq!(encode(63, 7, 2047), 0xF_FFFF);
    }

    #[test]
    fn test_decode_ignores_high_bits() {
        let word = (1u64 << 20) | encode(26, 0, 5);
        assert_eq!(decode(word), Order::new(26, 0, 5));
    }

    #[test]
    fn test_new_masks_fields() {
        let order = Order::new(64 + 2, 9, 2048 + 7);
        assert_eq!(order, Order::new(2, 1, 7));
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(mnemonic(Opcode::STORE_B), Some("STB"));
        assert_eq!(mnemonic(Opcode::JUMP_SWITCH_STORE), Some("JMPX"));
        assert_eq!(mnemonic(11), None);
        assert_eq!(mnemonic(63), None);
    }
}
