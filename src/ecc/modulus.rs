//! Prime field GF(929) for PDF417 error correction.

use super::field::Field;
use crate::error::{BarcodeError, Result};
use std::sync::OnceLock;

struct Tables {
    exp: Vec<u16>,
    log: Vec<u16>,
}

/// Integers modulo a prime with a fixed primitive root
pub struct PrimeField {
    modulus: u32,
    generator: u32,
    tables: OnceLock<Tables>,
}

/// PDF417 codewords, generator 3
pub static PDF417_FIELD: PrimeField = PrimeField::new(929, 3);

impl PrimeField {
    /// Field of `modulus` elements with primitive root `generator`
    pub const fn new(modulus: u32, generator: u32) -> Self {
        Self {
            modulus,
            generator,
            tables: OnceLock::new(),
        }
    }

    fn tables(&self) -> &Tables {
        self.tables.get_or_init(|| {
            let p = self.modulus as usize;
            let mut exp = vec![0u16; p];
            let mut log = vec![0u16; p];
            let mut x: u32 = 1;
            for slot in exp.iter_mut() {
                *slot = x as u16;
                x = (x * self.generator) % self.modulus;
            }
            for (i, &e) in exp.iter().enumerate().take(p - 1) {
                log[e as usize] = i as u16;
            }
            Tables { exp, log }
        })
    }
}

impl Field for PrimeField {
    fn order(&self) -> usize {
        self.modulus as usize
    }

    fn generator_base(&self) -> usize {
        1
    }

    fn add(&self, a: u16, b: u16) -> u16 {
        ((a as u32 + b as u32) % self.modulus) as u16
    }

    fn sub(&self, a: u16, b: u16) -> u16 {
        ((self.modulus + a as u32 - b as u32 % self.modulus) % self.modulus) as u16
    }

    fn exp(&self, n: usize) -> u16 {
        self.tables().exp[n % (self.modulus as usize - 1)]
    }

    fn log(&self, a: u16) -> Result<usize> {
        if a == 0 || a as u32 >= self.modulus {
            return Err(BarcodeError::DivisionByZero);
        }
        Ok(self.tables().log[a as usize] as usize)
    }

    fn scale(&self, n: usize, a: u16) -> u16 {
        let n = (n % self.modulus as usize) as u32;
        ((n * a as u32) % self.modulus) as u16
    }

    fn mul(&self, a: u16, b: u16) -> u16 {
        ((a as u32 * b as u32) % self.modulus) as u16
    }
}
