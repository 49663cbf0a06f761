//! MSB-first bit buffers used to build and parse symbol bit streams.

use crate::error::{BarcodeError, Result};

/// Growable MSB-first bit sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitWriter {
    bits: Vec<bool>,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `count` bits of `value`, most significant first
    pub fn push(&mut self, value: u32, count: usize) {
        for i in (0..count).rev() {
            self.bits.push((value >> i) & 1 == 1);
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Take the bits without copying
    pub fn into_bits(self) -> Vec<bool> {
        self.bits
    }

    /// Pack into `width`-bit words, zero-filling the last one
    pub fn to_words(&self, width: usize) -> Vec<u16> {
        self.bits
            .chunks(width)
            .map(|chunk| {
                let mut word = 0u16;
                for i in 0..width {
                    word = (word << 1) | u16::from(chunk.get(i).copied().unwrap_or(false));
                }
                word
            })
            .collect()
    }

    /// Pack into bytes, zero-filling the last one
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_words(8).into_iter().map(|w| w as u8).collect()
    }
}

/// Cursor over an MSB-first bit sequence
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a [bool],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bits: &'a [bool]) -> Self {
        Self { bits, position: 0 }
    }

    /// Bits not yet consumed
    pub fn available(&self) -> usize {
        self.bits.len() - self.position
    }

    /// Bits consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Read `count` bits as an unsigned integer
    pub fn read(&mut self, count: usize) -> Result<u32> {
        if count > self.available() {
            return Err(BarcodeError::malformed(format!(
                "needed {} bits at offset {}, only {} left",
                count,
                self.position,
                self.available()
            )));
        }
        let value = self.peek(count);
        self.position += count;
        Ok(value)
    }

    /// Up to `count` bits without consuming, zero-filled past the end
    pub fn peek(&self, count: usize) -> u32 {
        (0..count).fold(0u32, |acc, i| {
            let bit = self.bits.get(self.position + i).copied().unwrap_or(false);
            (acc << 1) | u32::from(bit)
        })
    }
}

/// Expand bytes into MSB-first bits
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&b| (0..8).rev().map(move |i| (b >> i) & 1 == 1))
        .collect()
}
