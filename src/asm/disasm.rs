//! Disassembler.
//!
//! Converts store words back to readable orders.

use crate::cpu::decode::{decode, ORDER_WIDTH};
use crate::word::bits::interpret_signed;

/// Disassemble a single word.
pub fn disassemble_word(word: u64) -> String {
    let order = decode(word);
    match order.mnemonic() {
        Some(name) => format!("{:<5} {}", name, order),
        None => format!("???   {}", order),
    }
}

/// Disassemble consecutive words loaded at `origin`.
pub fn disassemble(origin: u16, words: &[u64]) -> String {
    let mut output = String::new();
    output.push_str("; Disassembly\n");
    output.push_str("; -----------\n\n");

    for (offset, &word) in words.iter().enumerate() {
        output.push_str(&format!(
            "{:03}: {}  ; {:07o} = {}\n",
            origin as usize + offset,
            disassemble_word(word),
            word,
            interpret_signed(word, ORDER_WIDTH),
        ));
    }

    output
}
