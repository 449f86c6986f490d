//! Host-side program tools.
//!
//! This module provides:
//! - A text image format for programs, and tape punching for the loader
//! - A disassembler (store words → readable orders)

pub mod disasm;
pub mod image;

pub use disasm::{disassemble, disassemble_word};
pub use image::{
    format_image, load_image, parse_image, punch_tape, save_image, ImageError, ImageWord,
    ProgramImage,
};
