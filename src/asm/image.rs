//! Program images and punched tape.
//!
//! An image is a simple text format:
//! - `f b n` is an order (function, register, address)
//! - `=v` is a data word; negative values are stored two's complement
//! - a trailing `r` marks the word relocatable: the load origin is added
//! - `@a` moves the load address; before the first word it sets the origin
//! - `;` starts a comment, blank lines are ignored

use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use thiserror::Error;

use crate::cpu::decode::{encode, mnemonic, ORDER_WIDTH};
use crate::cpu::memory::STORE_SIZE;
use crate::word::bits::mask;

/// Tape code that introduces a three-nibble origin.
pub const ORIGIN_CODE: u8 = 17;
/// Tape code that marks the next word relocatable.
pub const RELOCATE_CODE: u8 = 18;
/// Tape code read once the tape has ended.
pub const END_CODE: u8 = 0;

const WORD_NIBBLES: u32 = 5;
const ORIGIN_NIBBLES: u32 = 3;

/// One word of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageWord {
    pub value: u64,
    pub relocatable: bool,
}

/// A program ready to be loaded at `origin`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    pub origin: u16,
    pub words: Vec<ImageWord>,
}

impl ProgramImage {
    pub fn new(origin: u16) -> Self {
        Self {
            origin,
            words: Vec::new(),
        }
    }

    /// Append a word.
    pub fn push(&mut self, value: u64, relocatable: bool) {
        self.words.push(ImageWord {
            value: value & mask(ORDER_WIDTH),
            relocatable,
        });
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The words as they sit in the store once loaded at the origin.
    pub fn resolved(&self) -> Vec<u64> {
        self.words
            .iter()
            .map(|word| {
                if word.relocatable {
                    (word.value + self.origin as u64) & mask(ORDER_WIDTH)
                } else {
                    word.value
                }
            })
            .collect()
    }
}

/// Parse image text.
pub fn parse_image(text: &str) -> Result<ProgramImage, ImageError> {
    let mut image = ProgramImage::new(0);

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let code = line.split(';').next().unwrap_or_default().trim();
        if code.is_empty() {
            continue;
        }

        let parse_error = |message: String| ImageError::ParseError {
            line: line_no,
            message,
        };

        if let Some(rest) = code.strip_prefix('@') {
            let addr: u16 = parse_number(rest.trim(), STORE_SIZE as i64 - 1)
                .map_err(parse_error)? as u16;
            if image.is_empty() {
                image.origin = addr;
            } else {
                let next = image.origin as usize + image.len();
                if (addr as usize) < next {
                    return Err(parse_error(format!(
                        "address {} is behind the load address {}",
                        addr, next
                    )));
                }
                for _ in next..addr as usize {
                    image.push(0, false);
                }
            }
            continue;
        }

        let mut fields: Vec<&str> = code.split_whitespace().collect();
        let relocatable = matches!(fields.last(), Some(&"r") | Some(&"R"));
        if relocatable {
            fields.pop();
        }

        let value = match fields.as_slice() {
            [data] if data.starts_with('=') => {
                let limit = mask(ORDER_WIDTH) as i64;
                let v = parse_signed(&data[1..], limit).map_err(parse_error)?;
                v as u64 & mask(ORDER_WIDTH)
            }
            [f, b, n] => {
                let f = parse_number(f, 63).map_err(parse_error)? as u8;
                let b = parse_number(b, 7).map_err(parse_error)? as u8;
                let n = parse_number(n, 2047).map_err(parse_error)? as u16;
                encode(f, b, n)
            }
            _ => return Err(parse_error(format!("cannot parse '{}'", code))),
        };

        image.push(value, relocatable);
    }

    if image.origin as usize + image.len() > STORE_SIZE {
        return Err(ImageError::TooLarge {
            origin: image.origin,
            size: image.len(),
        });
    }

    Ok(image)
}

fn parse_number(text: &str, max: i64) -> Result<i64, String> {
    let value: i64 = text
        .parse()
        .map_err(|_| format!("'{}' is not a number", text))?;
    if !(0..=max).contains(&value) {
        return Err(format!("{} is outside 0-{}", value, max));
    }
    Ok(value)
}

fn parse_signed(text: &str, max: i64) -> Result<i64, String> {
    let value: i64 = text
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", text))?;
    if value < -(max / 2 + 1) || value > max {
        return Err(format!("{} does not fit in a word", value));
    }
    Ok(value)
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let file =
        std::fs::File::open(path.as_ref()).map_err(|e| ImageError::IoError(e.to_string()))?;
    let mut text = String::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| ImageError::IoError(e.to_string()))?;
        text.push_str(&line);
        text.push('\n');
    }
    parse_image(&text)
}

/// Save an image to disk. Every word is written as an order triple.
pub fn save_image<P: AsRef<Path>>(path: P, image: &ProgramImage) -> Result<(), ImageError> {
    let mut file =
        std::fs::File::create(path.as_ref()).map_err(|e| ImageError::IoError(e.to_string()))?;
    file.write_all(format_image(image).as_bytes())
        .map_err(|e| ImageError::IoError(e.to_string()))
}

/// Render an image in the text format [`parse_image`] reads.
pub fn format_image(image: &ProgramImage) -> String {
    let mut text = format!("; {} words\n@{}\n", image.len(), image.origin);
    for (i, word) in image.words.iter().enumerate() {
        let order = crate::cpu::decode::decode(word.value);
        let flag = if word.relocatable { " r" } else { "" };
        text.push_str(&format!(
            "{} {} {}{} ; {:03} {}\n",
            order.opcode,
            order.register,
            order.address,
            flag,
            image.origin as usize + i,
            mnemonic(order.opcode).unwrap_or("???"),
        ));
    }
    text
}

/// Punch an image as the five-bit code stream read by the initial orders.
///
/// The stream is the origin, then each word as five nibble codes (nibble
/// plus one, most significant first) preceded by the relocation code when
/// flagged, then the end code.
pub fn punch_tape(image: &ProgramImage) -> Vec<u8> {
    let mut codes = Vec::with_capacity(4 + image.len() * 6 + 1);

    codes.push(ORIGIN_CODE);
    push_nibbles(&mut codes, image.origin as u64, ORIGIN_NIBBLES);

    for word in &image.words {
        if word.relocatable {
            codes.push(RELOCATE_CODE);
        }
        push_nibbles(&mut codes, word.value, WORD_NIBBLES);
    }

    codes.push(END_CODE);
    codes
}

fn push_nibbles(codes: &mut Vec<u8>, value: u64, count: u32) {
    for i in (0..count).rev() {
        codes.push(((value >> (4 * i)) & 0xF) as u8 + 1);
    }
}

/// Errors from reading or writing images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("image of {size} words at {origin} does not fit in the store")]
    TooLarge { origin: u16, size: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_orders_and_data() {
        let image = parse_image(
            "; demo\n\
             @100\n\
             1 3 10\n\
             =-1\n\
             26 0 2 r ; loop\n",
        )
        .unwrap();

        assert_eq!(image.origin, 100);
        assert_eq!(image.len(), 3);
        assert_eq!(image.words[0].value, encode(1, 3, 10));
        assert_eq!(image.words[1].value, 0xF_FFFF);
        assert!(image.words[2].relocatable);
        assert_eq!(image.resolved()[2], encode(26, 0, 102));
    }

    #[test]
    fn test_address_pads_forward() {
        let image = parse_image("0 0 1\n@3\n=7\n").unwrap();
        assert_eq!(image.resolved(), vec![encode(0, 0, 1), 0, 0, 7]);
    }

    #[test]
    fn test_address_behind_is_an_error() {
        let err = parse_image("=1\n=2\n@1\n").unwrap_err();
        assert!(matches!(err, ImageError::ParseError { line: 3, .. }));
    }

    #[test]
    fn test_bad_fields() {
        assert!(parse_image("64 0 0\n").is_err());
        assert!(parse_image("1 8 0\n").is_err());
        assert!(parse_image("1 0\n").is_err());
        assert!(parse_image("=2000000\n").is_err());
    }

    #[test]
    fn test_too_large() {
        let err = parse_image("@511\n=1\n=2\n").unwrap_err();
        assert_eq!(err, ImageError::TooLarge { origin: 511, size: 2 });
    }

    #[test]
    fn test_format_parses_back() {
        let mut image = ProgramImage::new(40);
        image.push(encode(26, 0, 3), true);
        image.push(encode(0, 0, 1), false);
        assert_eq!(parse_image(&format_image(&image)).unwrap(), image);
    }

    #[test]
    fn test_punch_tape_layout() {
        let mut image = ProgramImage::new(0x123);
        image.push(0xABCDE, false);
        image.push(encode(26, 0, 0), true);

        let tape = punch_tape(&image);
        assert_eq!(&tape[..4], &[ORIGIN_CODE, 2, 3, 4]);
        assert_eq!(&tape[4..9], &[11, 12, 13, 14, 15]);
        assert_eq!(tape[9], RELOCATE_CODE);
        assert_eq!(tape.len(), 4 + 5 + 6 + 1);
        assert_eq!(tape.last(), Some(&END_CODE));
    }

    #[test]
    fn test_empty_image_tape() {
        assert_eq!(punch_tape(&ProgramImage::new(0)), vec![ORIGIN_CODE, 1, 1, 1, END_CODE]);
    }
}
