//! Operands accepted by word arithmetic.
//!
//! Arithmetic and logic on a [`Word`] take either a plain integer or
//! another word. The caller picks the variant; `From` impls let call
//! sites pass `5` or `&other` directly.

use crate::word::Word;

/// The right-hand side of a word operation.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// A plain signed integer.
    Raw(i64),
    /// Another register or store cell.
    Word(&'a Word),
}

impl Operand<'_> {
    /// Numeric value: the integer itself, or the word's own reading.
    #[inline]
    pub fn value(&self) -> i64 {
        match self {
            Operand::Raw(v) => *v,
            Operand::Word(w) => w.to_number(),
        }
    }

    /// Bit pattern for logical operations.
    #[inline]
    pub fn bits(&self) -> u64 {
        match self {
            Operand::Raw(v) => *v as u64,
            Operand::Word(w) => w.raw(),
        }
    }
}

impl From<i64> for Operand<'_> {
    fn from(v: i64) -> Self {
        Operand::Raw(v)
    }
}

impl From<i32> for Operand<'_> {
    fn from(v: i32) -> Self {
        Operand::Raw(v as i64)
    }
}

impl From<u16> for Operand<'_> {
    fn from(v: u16) -> Self {
        Operand::Raw(v as i64)
    }
}

impl<'a> From<&'a Word> for Operand<'a> {
    fn from(w: &'a Word) -> Self {
        Operand::Word(w)
    }
}
