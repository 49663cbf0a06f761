use crate::error::{BarcodeError, Result};
use crate::models::BitMatrix;

/// State of one module cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Module {
    /// Not yet assigned by the encoder
    #[default]
    Unset,
    /// Light (space) module
    Light,
    /// Dark (bar) module
    Dark,
}

impl Module {
    pub(crate) fn from_dark(dark: bool) -> Self {
        if dark { Module::Dark } else { Module::Light }
    }
}

/// Grid of modules produced by an encoder.
///
/// Encoders fill cells through the crate-private setters and call
/// [`ModuleMatrix::finish`], after which the matrix is only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMatrix {
    width: usize,
    height: usize,
    cells: Vec<Module>,
    quiet_zone: usize,
}

impl ModuleMatrix {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Module::Unset; width * height],
            quiet_zone: 0,
        }
    }

    /// Build a linear symbol: `row` repeated `height` times
    pub(crate) fn linear(row: &[bool], height: usize) -> Self {
        let height = height.max(1);
        let mut cells = Vec::with_capacity(row.len() * height);
        for _ in 0..height {
            cells.extend(row.iter().map(|&d| Module::from_dark(d)));
        }
        Self {
            width: row.len(),
            height,
            cells,
            quiet_zone: 0,
        }
    }

    /// Matrix width in modules
    pub fn width(&self) -> usize {
        self.width
    }

    /// Matrix height in modules
    pub fn height(&self) -> usize {
        self.height
    }

    /// Quiet zone required around the symbol, in modules
    pub fn quiet_zone(&self) -> usize {
        self.quiet_zone
    }

    /// Module at (x, y); out of range reads as light
    pub fn get(&self, x: usize, y: usize) -> Module {
        if x >= self.width || y >= self.height {
            return Module::Light;
        }
        self.cells[y * self.width + x]
    }

    /// True if the module at (x, y) is dark
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.get(x, y) == Module::Dark
    }

    /// One row of dark flags
    pub fn row(&self, y: usize) -> Vec<bool> {
        (0..self.width).map(|x| self.is_dark(x, y)).collect()
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, dark: bool) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = Module::from_dark(dark);
        }
    }

    pub(crate) fn with_quiet_zone(mut self, modules: usize) -> Self {
        self.quiet_zone = modules;
        self
    }

    /// Fail if any cell is still unset
    pub(crate) fn finish(self) -> Result<Self> {
        if let Some(idx) = self.cells.iter().position(|&m| m == Module::Unset) {
            return Err(BarcodeError::malformed(format!(
                "module ({}, {}) left unset",
                idx % self.width,
                idx / self.width
            )));
        }
        Ok(self)
    }

    /// Packed copy with dark = true
    pub fn to_bit_matrix(&self) -> BitMatrix {
        let mut bits = BitMatrix::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_dark(x, y) {
                    bits.set(x, y, true);
                }
            }
        }
        bits
    }

    pub(crate) fn from_bit_matrix(bits: &BitMatrix) -> Self {
        let mut matrix = Self::new(bits.width(), bits.height());
        for y in 0..bits.height() {
            for x in 0..bits.width() {
                matrix.set(x, y, bits.get(x, y));
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_rejects_unset() {
        let mut m = ModuleMatrix::new(2, 2);
        m.set(0, 0, true);
        m.set(1, 0, false);
        m.set(0, 1, false);
        assert!(m.clone().finish().is_err());
        m.set(1, 1, true);
        let m = m.finish().unwrap();
        assert!(m.is_dark(0, 0));
        assert!(!m.is_dark(1, 0));
        assert_eq!(m.get(5, 5), Module::Light);
    }

    #[test]
    fn test_linear_repeats_row() {
        let m = ModuleMatrix::linear(&[true, false, true], 4);
        assert_eq!(m.width(), 3);
        assert_eq!(m.height(), 4);
        assert_eq!(m.row(3), vec![true, false, true]);
    }
}
