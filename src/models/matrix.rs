/// Compact bit matrix for binarized images and sampled module grids.
/// true = dark, false = light.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// Create a new bit matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Square matrix
    pub fn square(size: usize) -> Self {
        Self::new(size, size)
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get bit at (x, y)
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        (self.data[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Get bit at signed coordinates; outside reads as light
    pub fn get_i(&self, x: isize, y: isize) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.get(x as usize, y as usize)
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        if value {
            self.data[index / 8] |= 1 << (index % 8);
        } else {
            self.data[index / 8] &= !(1 << (index % 8));
        }
    }

    /// Toggle bit at (x, y)
    pub fn toggle(&mut self, x: usize, y: usize) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        self.data[index / 8] ^= 1 << (index % 8);
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Copy rotated 90 degrees clockwise
    pub fn rotated_cw(&self) -> Self {
        let mut out = Self::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    out.set(self.height - 1 - y, x, true);
                }
            }
        }
        out
    }

    /// Copy mirrored along the main diagonal
    pub fn transposed(&self) -> Self {
        let mut out = Self::new(self.height, self.width);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x, y) {
                    out.set(y, x, true);
                }
            }
        }
        out
    }

    /// Run lengths of row `y` as (is_dark, start, length)
    pub fn row_runs(&self, y: usize) -> Vec<(bool, usize, usize)> {
        let mut runs = Vec::new();
        if y >= self.height || self.width == 0 {
            return runs;
        }
        let mut start = 0;
        let mut color = self.get(0, y);
        for x in 1..self.width {
            let c = self.get(x, y);
            if c != color {
                runs.push((color, start, x - start));
                start = x;
                color = c;
            }
        }
        runs.push((color, start, self.width - start));
        runs
    }

    /// Get raw data as bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_matrix() {
        let mut matrix = BitMatrix::new(8, 8);
        assert_eq!(matrix.width(), 8);
        assert_eq!(matrix.height(), 8);

        matrix.set(3, 4, true);
        assert!(matrix.get(3, 4));
        assert!(!matrix.get(3, 3));
        assert_eq!(matrix.count_ones(), 1);

        matrix.toggle(3, 4);
        assert!(!matrix.get(3, 4));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut matrix = BitMatrix::new(8, 8);
        matrix.set(10, 10, true); // Should not panic
        assert!(!matrix.get(10, 10));
        assert!(!matrix.get_i(-1, 2));
    }

    #[test]
    fn test_rotation_and_transpose() {
        let mut m = BitMatrix::new(3, 2);
        m.set(0, 0, true);
        m.set(2, 1, true);
        let r = m.rotated_cw();
        assert_eq!((r.width(), r.height()), (2, 3));
        assert!(r.get(1, 0));
        assert!(r.get(0, 2));
        let four = r.rotated_cw().rotated_cw().rotated_cw();
        assert_eq!(four, m);
        let t = m.transposed();
        assert!(t.get(0, 0));
        assert!(t.get(1, 2));
    }

    #[test]
    fn test_row_runs() {
        let mut m = BitMatrix::new(6, 1);
        m.set(1, 0, true);
        m.set(2, 0, true);
        m.set(5, 0, true);
        assert_eq!(
            m.row_runs(0),
            vec![(false, 0, 1), (true, 1, 2), (false, 3, 2), (true, 5, 1)]
        );
    }
}
