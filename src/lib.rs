//! # Order Machine Emulator
//!
//! An emulator of a small 1950s-style single-accumulator computer with
//! 20-bit words, eight B-registers and a double-length accumulator.
//!
//! Programs enter through a fixed set of initial orders that read punched
//! tape into the main store, then fetching switches over to the main store.

pub mod asm;
pub mod cpu;
pub mod word;

// Re-export commonly used types
pub use asm::{disassemble, load_image, parse_image, punch_tape, ImageError, ProgramImage};
pub use cpu::{
    Machine, MachineConfig, MachineError, Order, Registers, Snapshot, Status, StopReason,
};
pub use word::Word;
