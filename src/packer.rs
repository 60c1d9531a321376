//! Bit packing for device register writes.
//!
//! Fields are unsigned integers of a declared width. Each field's bits go
//! out least-significant first into an accumulator; every `word_bits` bits
//! the accumulator is emitted as one output word. A trailing partial word is
//! zero-padded in its high bits. With [`WordOrder::BigEndian`] the finished
//! word sequence is reversed, so the last word packed is sent first.
//!
//! Example: `0..10` at 5 bits each into 8-bit words gives
//! `20 88 41 ...` (value 1 starts at bit 5 of the first byte).

use crate::error::{BeamError, Result};

/// Narrowest field the device accepts.
pub const MIN_FIELD_BITS: u8 = 4;

/// Widest field the device accepts.
pub const MAX_FIELD_BITS: u8 = 16;

/// Widest output word (words are emitted as bytes).
pub const MAX_WORD_BITS: u8 = 8;

/// Order of output words on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WordOrder {
    /// First packed word first.
    #[default]
    LittleEndian,
    /// Word sequence reversed after packing.
    BigEndian,
}

/// One register field: an unsigned value and the number of bits it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub value: u16,
    pub width: u8,
}

impl Field {
    pub fn new(value: u16, width: u8) -> Self {
        Self { value, width }
    }
}

// ---------------------------------------------------------------------------
// Packing
// ---------------------------------------------------------------------------

/// Incremental LSB-first bit packer.
#[derive(Debug, Clone)]
pub struct BitPacker {
    word_bits: u8,
    current: u8,
    filled: u8,
    words: Vec<u8>,
    fields: usize,
}

impl BitPacker {
    pub fn new(word_bits: u8) -> Result<Self> {
        check_word_bits(word_bits)?;
        Ok(Self { word_bits, current: 0, filled: 0, words: Vec::new(), fields: 0 })
    }

    /// Append one field. Rejects unsupported widths and values that do not
    /// fit; nothing is appended on error.
    pub fn push(&mut self, field: Field) -> Result<()> {
        check_field_bits(field.width)?;
        if u32::from(field.value) >> field.width != 0 {
            return Err(BeamError::FieldOverflow {
                index: self.fields,
                value: field.value,
                width: field.width,
            });
        }
        for i in 0..field.width {
            let bit = ((field.value >> i) & 1) as u8;
            self.current |= bit << self.filled;
            self.filled += 1;
            if self.filled == self.word_bits {
                self.words.push(self.current);
                self.current = 0;
                self.filled = 0;
            }
        }
        self.fields += 1;
        Ok(())
    }

    /// Total bits pushed so far.
    pub fn bit_len(&self) -> usize {
        self.words.len() * usize::from(self.word_bits) + usize::from(self.filled)
    }

    /// Flush any partial word and return the words in `order`.
    pub fn finish(mut self, order: WordOrder) -> Vec<u8> {
        if self.filled != 0 {
            self.words.push(self.current);
        }
        if order == WordOrder::BigEndian {
            self.words.reverse();
        }
        self.words
    }
}

/// Pack `fields` into output words of `word_bits` bits each.
pub fn pack(fields: &[Field], word_bits: u8, order: WordOrder) -> Result<Vec<u8>> {
    let mut packer = BitPacker::new(word_bits)?;
    for &field in fields {
        packer.push(field)?;
    }
    Ok(packer.finish(order))
}

/// Pack values that all share one field width.
pub fn pack_uniform(values: &[u16], width: u8, word_bits: u8, order: WordOrder) -> Result<Vec<u8>> {
    let fields: Vec<Field> = values.iter().map(|&v| Field::new(v, width)).collect();
    pack(&fields, word_bits, order)
}

// ---------------------------------------------------------------------------
// Unpacking
// ---------------------------------------------------------------------------

/// Reads fields back out of words produced by [`BitPacker`].
#[derive(Debug, Clone)]
pub struct BitUnpacker<'a> {
    words: &'a [u8],
    word_bits: u8,
    order: WordOrder,
    pos: usize,
}

impl<'a> BitUnpacker<'a> {
    pub fn new(words: &'a [u8], word_bits: u8, order: WordOrder) -> Result<Self> {
        check_word_bits(word_bits)?;
        Ok(Self { words, word_bits, order, pos: 0 })
    }

    fn total_bits(&self) -> usize {
        self.words.len() * usize::from(self.word_bits)
    }

    fn bit(&self, n: usize) -> u16 {
        let wb = usize::from(self.word_bits);
        let idx = n / wb;
        let word = match self.order {
            WordOrder::LittleEndian => self.words[idx],
            WordOrder::BigEndian => self.words[self.words.len() - 1 - idx],
        };
        u16::from((word >> (n % wb)) & 1)
    }

    /// Read the next `width`-bit field.
    pub fn read(&mut self, width: u8) -> Result<u16> {
        check_field_bits(width)?;
        let need = self.pos + usize::from(width);
        if need > self.total_bits() {
            return Err(BeamError::Truncated { need, got: self.total_bits() });
        }
        let value = (0..usize::from(width)).fold(0u16, |acc, i| acc | (self.bit(self.pos + i) << i));
        self.pos = need;
        Ok(value)
    }

    /// Bits not yet read, including trailing padding.
    pub fn remaining_bits(&self) -> usize {
        self.total_bits() - self.pos
    }
}

/// Inverse of [`pack`]: read one field per entry of `widths`.
pub fn unpack(words: &[u8], widths: &[u8], word_bits: u8, order: WordOrder) -> Result<Vec<u16>> {
    let mut reader = BitUnpacker::new(words, word_bits, order)?;
    widths.iter().map(|&w| reader.read(w)).collect()
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn check_field_bits(width: u8) -> Result<()> {
    if (MIN_FIELD_BITS..=MAX_FIELD_BITS).contains(&width) {
        Ok(())
    } else {
        Err(BeamError::FieldWidth { width, min: MIN_FIELD_BITS, max: MAX_FIELD_BITS })
    }
}

fn check_word_bits(width: u8) -> Result<()> {
    if (1..=MAX_WORD_BITS).contains(&width) {
        Ok(())
    } else {
        Err(BeamError::WordWidth { width })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
