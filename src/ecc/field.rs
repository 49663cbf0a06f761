use crate::error::{BarcodeError, Result};

/// Arithmetic over a finite field whose elements are stored as `u16`.
///
/// Implemented by the binary extension fields used by QR, Data Matrix and
/// Aztec and by the prime field used by PDF417, so one Reed-Solomon codec
/// serves all of them.
pub trait Field: Send + Sync {
    /// Number of elements in the field
    fn order(&self) -> usize;

    /// Exponent of the first generator root, `α^base`
    fn generator_base(&self) -> usize;

    /// `a + b`
    fn add(&self, a: u16, b: u16) -> u16;

    /// `a - b`
    fn sub(&self, a: u16, b: u16) -> u16;

    /// `α^n`, with `n` reduced modulo the multiplicative order
    fn exp(&self, n: usize) -> u16;

    /// Discrete logarithm of a non-zero element
    fn log(&self, a: u16) -> Result<usize>;

    /// `n · a`, the integer multiple used by formal derivatives
    fn scale(&self, n: usize, a: u16) -> u16;

    /// `a · b`
    fn mul(&self, a: u16, b: u16) -> u16 {
        if a == 0 || b == 0 {
            return 0;
        }
        match (self.log(a), self.log(b)) {
            (Ok(la), Ok(lb)) => self.exp(la + lb),
            _ => 0,
        }
    }

    /// Multiplicative inverse
    fn inverse(&self, a: u16) -> Result<u16> {
        if a == 0 {
            return Err(BarcodeError::DivisionByZero);
        }
        let period = self.order() - 1;
        let la = self.log(a)?;
        Ok(self.exp(period - la % period))
    }

    /// `a / b`
    fn div(&self, a: u16, b: u16) -> Result<u16> {
        let inv = self.inverse(b)?;
        Ok(self.mul(a, inv))
    }

    /// `-a`
    fn neg(&self, a: u16) -> u16 {
        self.sub(0, a)
    }

    /// True if `value` is an element of the field
    fn contains(&self, value: u16) -> bool {
        (value as usize) < self.order()
    }
}

/// Evaluate a polynomial given highest-degree coefficient first
pub(crate) fn eval_descending(field: &dyn Field, coefficients: &[u16], x: u16) -> u16 {
    coefficients
        .iter()
        .fold(0u16, |acc, &c| field.add(field.mul(acc, x), c))
}

/// Evaluate a polynomial given constant term first
pub(crate) fn eval_ascending(field: &dyn Field, coefficients: &[u16], x: u16) -> u16 {
    coefficients
        .iter()
        .rev()
        .fold(0u16, |acc, &c| field.add(field.mul(acc, x), c))
}
