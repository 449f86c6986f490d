//! The initial orders: a fixed relocating loader.
//!
//! Orders are fetched from here after a reset. The loader reads tape in
//! the format written by [`punch_tape`](crate::asm::punch_tape):
//!
//! - codes 1-16 are nibbles 0-15; five make a word, most significant first
//! - code 17 is followed by three nibbles giving the origin, which becomes
//!   both the load address (B1) and the relocation base (B5)
//! - code 18 marks the next word relocatable: B5 is added to it
//! - code 0 (end of tape) switches to the main store and jumps to B5
//!
//! Words are built in M and stored with an exchange. Cells 510 and 511
//! of the main store are used as scratch.

use crate::cpu::decode::encode;
use crate::cpu::memory::CELL_WIDTH;
use crate::word::Word;

/// Bumped whenever the table below changes.
pub const INITIAL_ORDERS_VERSION: u32 = 1;

/// Main-store cell holding the code just read.
pub const CODE_CELL: u16 = 511;
/// Main-store cell used to pass the origin and relocation base.
pub const BASE_CELL: u16 = 510;

/// The loader as (function, register, address) triples.
pub const INITIAL_ORDERS: [(u8, u8, u16); 42] = [
    (5, 1, 0),           // 0   B1 = 0, load address
    (5, 5, 0),           // 1   B5 = 0, relocation base
    (5, 6, 0),           // 2   B6 = 0, relocate next word
    (40, 0, CODE_CELL),  // 3   next word: clear M:L
    (5, 2, 5),           // 4   B2 = 5 nibbles
    (10, 3, CODE_CELL),  // 5   read a code
    (13, 3, 8),          // 6
    (27, 5, 0),          // 7   end of tape: enter the main store at B5
    (7, 3, 1),           // 8   code to nibble
    (1, 3, CODE_CELL),   // 9
    (2, 4, CODE_CELL),   // 10
    (7, 4, 16),          // 11
    (13, 4, 14),         // 12
    (26, 0, 30),         // 13  code 17: set origin
    (7, 4, 1),           // 14
    (13, 4, 18),         // 15
    (5, 6, 1),           // 16  code 18: relocate the next word
    (26, 0, 5),          // 17
    (38, 0, 4),          // 18  M:L <<= 4
    (43, 0, CODE_CELL),  // 19  M += nibble
    (14, 2, 5),          // 20
    (13, 6, 23),         // 21
    (26, 0, 26),         // 22
    (1, 5, BASE_CELL),   // 23  relocate: M += B5
    (43, 0, BASE_CELL),  // 24
    (5, 6, 0),           // 25
    (49, 1, 0),          // 26  store M at B1
    (6, 1, 1),           // 27
    (26, 0, 3),          // 28
    (0, 0, 0),           // 29
    (40, 0, CODE_CELL),  // 30  origin: three nibbles into M
    (5, 2, 3),           // 31
    (10, 3, CODE_CELL),  // 32
    (7, 3, 1),           // 33
    (1, 3, CODE_CELL),   // 34
    (38, 0, 4),          // 35
    (43, 0, CODE_CELL),  // 36
    (14, 2, 32),         // 37
    (49, 0, BASE_CELL),  // 38
    (2, 1, BASE_CELL),   // 39
    (2, 5, BASE_CELL),   // 40
    (26, 0, 3),          // 41
];

/// Build the initial order store.
pub fn initial_store() -> Vec<Word> {
    INITIAL_ORDERS
        .iter()
        .map(|&(f, b, n)| Word::unsigned(CELL_WIDTH).with_raw(encode(f, b, n)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{decode, mnemonic};

    #[test]
    fn test_table_encodes_exactly() {
        let store = initial_store();
        assert_eq!(store.len(), INITIAL_ORDERS.len());
        for (word, &(f, b, n)) in store.iter().zip(INITIAL_ORDERS.iter()) {
            let order = decode(word.raw());
            assert_eq!((order.opcode, order.register, order.address), (f, b, n));
        }
    }

    #[test]
    fn test_every_order_is_defined() {
        for &(f, _, _) in INITIAL_ORDERS.iter() {
            assert!(mnemonic(f).is_some(), "opcode {} in initial orders", f);
        }
    }

    #[test]
    fn test_jumps_stay_inside_table() {
        for &(f, b, n) in INITIAL_ORDERS.iter() {
            if matches!(f, 12..=15) || (f == 26 && b == 0) {
                assert!((n as usize) < INITIAL_ORDERS.len());
            }
        }
    }
}
