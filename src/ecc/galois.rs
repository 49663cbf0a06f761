//! Binary extension fields GF(2^m) backed by log/antilog tables.

use super::field::Field;
use crate::error::{BarcodeError, Result};
use std::sync::OnceLock;

struct Tables {
    exp: Vec<u16>,
    log: Vec<u16>,
}

/// GF(2^m) defined by a primitive polynomial.
///
/// Tables are built on first use and shared by every caller afterwards.
pub struct GaloisField {
    primitive: u32,
    size: usize,
    generator_base: usize,
    tables: OnceLock<Tables>,
}

/// QR Code, x^8 + x^4 + x^3 + x^2 + 1, roots from α^0
pub static QR_CODE_FIELD_256: GaloisField = GaloisField::new(0x011D, 256, 0);
/// Data Matrix and 8-bit Aztec words, x^8 + x^5 + x^3 + x^2 + 1
pub static DATA_MATRIX_FIELD_256: GaloisField = GaloisField::new(0x012D, 256, 1);
/// Aztec mode message, x^4 + x + 1
pub static AZTEC_PARAM: GaloisField = GaloisField::new(0x13, 16, 1);
/// Aztec 6-bit data words, x^6 + x + 1
pub static AZTEC_DATA_6: GaloisField = GaloisField::new(0x43, 64, 1);
/// Aztec 10-bit data words, x^10 + x^3 + 1
pub static AZTEC_DATA_10: GaloisField = GaloisField::new(0x409, 1024, 1);
/// Aztec 12-bit data words, x^12 + x^6 + x^5 + x^3 + 1
pub static AZTEC_DATA_12: GaloisField = GaloisField::new(0x1069, 4096, 1);

impl GaloisField {
    /// Field of `size` elements reduced by `primitive`
    pub const fn new(primitive: u32, size: usize, generator_base: usize) -> Self {
        Self {
            primitive,
            size,
            generator_base,
            tables: OnceLock::new(),
        }
    }

    fn tables(&self) -> &Tables {
        self.tables.get_or_init(|| {
            let mut exp = vec![0u16; self.size * 2];
            let mut log = vec![0u16; self.size];
            let mut x: u32 = 1;
            for slot in exp.iter_mut().take(self.size) {
                *slot = x as u16;
                x <<= 1;
                if x as usize >= self.size {
                    x ^= self.primitive;
                    x &= (self.size - 1) as u32;
                }
            }
            for i in 0..self.size - 1 {
                log[exp[i] as usize] = i as u16;
            }
            for i in self.size..self.size * 2 {
                exp[i] = exp[i - (self.size - 1)];
            }
            Tables { exp, log }
        })
    }

    /// Primitive polynomial as an integer
    pub fn primitive(&self) -> u32 {
        self.primitive
    }

    /// Width of one symbol in bits
    pub fn symbol_bits(&self) -> usize {
        self.size.trailing_zeros() as usize
    }
}

impl Field for GaloisField {
    fn order(&self) -> usize {
        self.size
    }

    fn generator_base(&self) -> usize {
        self.generator_base
    }

    fn add(&self, a: u16, b: u16) -> u16 {
        a ^ b
    }

    fn sub(&self, a: u16, b: u16) -> u16 {
        a ^ b
    }

    fn exp(&self, n: usize) -> u16 {
        self.tables().exp[n % (self.size - 1)]
    }

    fn log(&self, a: u16) -> Result<usize> {
        if a == 0 || a as usize >= self.size {
            return Err(BarcodeError::DivisionByZero);
        }
        Ok(self.tables().log[a as usize] as usize)
    }

    fn scale(&self, n: usize, a: u16) -> u16 {
        if n % 2 == 1 { a } else { 0 }
    }

    fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        let t = self.tables();
        t.exp[t.log[a as usize] as usize + t.log[b as usize] as usize]
    }
}

/// Byte-oriented arithmetic over the QR Code field
pub struct Gf256;

impl Gf256 {
    /// `a · b` in GF(256)
    pub fn multiply(a: u8, b: u8) -> u8 {
        QR_CODE_FIELD_256.mul(a as u16, b as u16) as u8
    }

    /// `a / b` in GF(256); fails with `DivisionByZero` when `b == 0`
    pub fn divide(a: u8, b: u8) -> Result<u8> {
        Ok(QR_CODE_FIELD_256.div(a as u16, b as u16)? as u8)
    }

    /// `2^n`
    pub fn exp(n: usize) -> u8 {
        QR_CODE_FIELD_256.exp(n) as u8
    }

    /// Discrete logarithm base 2
    pub fn log(a: u8) -> Result<usize> {
        QR_CODE_FIELD_256.log(a as u16)
    }
}
