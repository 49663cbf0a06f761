//! Reed-Solomon encoder and decoder generic over [`Field`].
//!
//! Codewords are handled highest-degree first: position `j` of an `n`-symbol
//! block is the coefficient of `x^(n-1-j)`. The generator polynomial is
//! `∏ (x - α^(base+i))` for `i` in `0..ecc_count`.

use super::field::{Field, eval_ascending, eval_descending};
use crate::error::{BarcodeError, Result};
use log::trace;

/// Reed-Solomon codec bound to one field
#[derive(Clone, Copy)]
pub struct ReedSolomon<'f> {
    field: &'f dyn Field,
}

impl<'f> ReedSolomon<'f> {
    /// Codec over `field`
    pub fn new(field: &'f dyn Field) -> Self {
        Self { field }
    }

    /// Generator polynomial of degree `ecc_count`, leading coefficient first
    pub fn generator(&self, ecc_count: usize) -> Vec<u16> {
        let f = self.field;
        let base = f.generator_base();
        let mut gen_poly = vec![1u16];
        for i in 0..ecc_count {
            let root = f.exp(base + i);
            let mut next = vec![0u16; gen_poly.len() + 1];
            for (j, &c) in gen_poly.iter().enumerate() {
                next[j] = f.add(next[j], c);
                next[j + 1] = f.sub(next[j + 1], f.mul(c, root));
            }
            gen_poly = next;
        }
        gen_poly
    }

    /// Parity symbols for `data`, to be appended after it
    pub fn encode(&self, data: &[u16], ecc_count: usize) -> Vec<u16> {
        if ecc_count == 0 {
            return Vec::new();
        }
        let f = self.field;
        let gen_poly = self.generator(ecc_count);
        let mut remainder = vec![0u16; ecc_count];
        for &d in data {
            let factor = f.add(d, remainder[0]);
            remainder.rotate_left(1);
            remainder[ecc_count - 1] = 0;
            if factor != 0 {
                for (r, &g) in remainder.iter_mut().zip(&gen_poly[1..]) {
                    *r = f.sub(*r, f.mul(factor, g));
                }
            }
        }
        remainder.iter().map(|&r| f.neg(r)).collect()
    }

    /// Byte convenience wrapper around [`ReedSolomon::encode`]
    pub fn encode_bytes(&self, data: &[u8], ecc_count: usize) -> Vec<u8> {
        let words: Vec<u16> = data.iter().map(|&b| b as u16).collect();
        self.encode(&words, ecc_count)
            .into_iter()
            .map(|w| w as u8)
            .collect()
    }

    /// Correct `codewords` (data followed by `ecc_count` parity symbols) in
    /// place, returning the number of symbols repaired.
    pub fn decode(&self, codewords: &mut [u16], ecc_count: usize) -> Result<usize> {
        let f = self.field;
        let n = codewords.len();
        if n >= f.order() {
            return Err(BarcodeError::uncorrectable(format!(
                "block of {} symbols exceeds field of order {}",
                n,
                f.order()
            )));
        }
        if codewords.iter().any(|&c| !f.contains(c)) {
            return Err(BarcodeError::uncorrectable("symbol outside field"));
        }
        if ecc_count == 0 {
            return Ok(0);
        }

        let syndromes = self.syndromes(codewords, ecc_count);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(0);
        }

        let sigma = self.error_locator(&syndromes)?;
        let degree = sigma.len() - 1;
        if degree == 0 || degree > ecc_count / 2 {
            return Err(BarcodeError::uncorrectable(format!(
                "error locator degree {} exceeds capacity {}",
                degree,
                ecc_count / 2
            )));
        }

        let positions = self.error_positions(&sigma, n);
        if positions.len() != degree {
            return Err(BarcodeError::uncorrectable(format!(
                "found {} error positions for locator degree {}",
                positions.len(),
                degree
            )));
        }

        let values = self.error_values(&sigma, &syndromes, &positions, n)?;
        for (&pos, &value) in positions.iter().zip(&values) {
            codewords[pos] = f.sub(codewords[pos], value);
        }

        if self.syndromes(codewords, ecc_count).iter().any(|&s| s != 0) {
            return Err(BarcodeError::uncorrectable("residual syndrome after correction"));
        }
        trace!("corrected {} symbol errors in block of {}", positions.len(), n);
        Ok(positions.len())
    }

    /// Byte convenience wrapper around [`ReedSolomon::decode`]
    pub fn decode_bytes(&self, codewords: &mut [u8], ecc_count: usize) -> Result<usize> {
        let mut words: Vec<u16> = codewords.iter().map(|&b| b as u16).collect();
        let corrected = self.decode(&mut words, ecc_count)?;
        for (dst, w) in codewords.iter_mut().zip(words) {
            *dst = w as u8;
        }
        Ok(corrected)
    }

    fn syndromes(&self, codewords: &[u16], ecc_count: usize) -> Vec<u16> {
        let base = self.field.generator_base();
        (0..ecc_count)
            .map(|i| eval_descending(self.field, codewords, self.field.exp(base + i)))
            .collect()
    }

    /// Berlekamp-Massey; returns Λ constant term first, trimmed to its degree
    fn error_locator(&self, syndromes: &[u16]) -> Result<Vec<u16>> {
        let f = self.field;
        let mut sigma = vec![1u16];
        let mut prev = vec![1u16];
        let mut prev_delta: u16 = 1;
        let mut l = 0usize;
        let mut m = 1usize;

        for k in 0..syndromes.len() {
            let mut delta = syndromes[k];
            for i in 1..=l.min(sigma.len() - 1) {
                delta = f.add(delta, f.mul(sigma[i], syndromes[k - i]));
            }

            if delta == 0 {
                m += 1;
                continue;
            }

            let coef = f.div(delta, prev_delta)?;
            let snapshot = sigma.clone();
            if sigma.len() < prev.len() + m {
                sigma.resize(prev.len() + m, 0);
            }
            for (j, &b) in prev.iter().enumerate() {
                sigma[j + m] = f.sub(sigma[j + m], f.mul(coef, b));
            }

            if 2 * l <= k {
                l = k + 1 - l;
                prev = snapshot;
                prev_delta = delta;
                m = 1;
            } else {
                m += 1;
            }
        }

        sigma.truncate(l + 1);
        while sigma.len() > 1 && sigma.last() == Some(&0) {
            sigma.pop();
        }
        Ok(sigma)
    }

    /// Chien search over the `n` codeword positions
    fn error_positions(&self, sigma: &[u16], n: usize) -> Vec<usize> {
        let f = self.field;
        let period = f.order() - 1;
        (0..n)
            .filter(|&j| {
                let x_inv = f.exp(period - (n - 1 - j) % period);
                eval_ascending(f, sigma, x_inv) == 0
            })
            .collect()
    }

    /// Forney: e = -X^(1-base) · Ω(X⁻¹) / Λ'(X⁻¹)
    fn error_values(
        &self,
        sigma: &[u16],
        syndromes: &[u16],
        positions: &[usize],
        n: usize,
    ) -> Result<Vec<u16>> {
        let f = self.field;
        let period = f.order() - 1;
        let base = f.generator_base();

        let mut omega = vec![0u16; syndromes.len()];
        for (i, slot) in omega.iter_mut().enumerate() {
            for j in 0..=i.min(sigma.len() - 1) {
                *slot = f.add(*slot, f.mul(sigma[j], syndromes[i - j]));
            }
        }

        let derivative: Vec<u16> = sigma
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, &c)| f.scale(i, c))
            .collect();

        positions
            .iter()
            .map(|&pos| {
                let power = (n - 1 - pos) % period;
                let x_inv = f.exp(period - power);
                let numerator = eval_ascending(f, &omega, x_inv);
                let denominator = eval_ascending(f, &derivative, x_inv);
                if denominator == 0 {
                    return Err(BarcodeError::uncorrectable("locator derivative vanished"));
                }
                // X^(1-base) computed as α^(power·(1-base)) modulo the period
                let x_factor = f.exp((power + period * base - power * base % period) % period);
                let magnitude = f.mul(x_factor, f.div(numerator, denominator)?);
                Ok(f.neg(magnitude))
            })
            .collect()
    }
}
