//! Fixed-width binary word primitives.
//!
//! - [`Word`] - a register or store cell with optional sign and overflow digits
//! - [`Operand`] - an integer or word on the right of an operation
//! - [`bits`] - width, masking and two's complement helpers

pub mod bits;
mod ops;
#[allow(clippy::module_inception)]
mod word;

pub use ops::Operand;
pub use word::Word;
