//! Data Matrix ECC200 symbol sizes, module placement and codeword values.

use crate::models::BitMatrix;

/// Longest payload any symbol holds (digit pairs in 144x144)
pub const MAX_PAYLOAD_LEN: usize = 3116;

/// First pad codeword
pub const PAD: u8 = 129;
/// Latch to C40 encodation
pub const LATCH_C40: u8 = 230;
/// Latch to Base 256 encodation
pub const LATCH_BASE256: u8 = 231;
/// FNC1
pub const FNC1: u8 = 232;
/// Structured append header
pub const STRUCTURED_APPEND: u8 = 233;
/// Reader programming
pub const READER_PROGRAMMING: u8 = 234;
/// Next character is byte value + 128
pub const UPPER_SHIFT: u8 = 235;
/// 05 macro header
pub const MACRO_05: u8 = 236;
/// 06 macro header
pub const MACRO_06: u8 = 237;
/// Latch to ANSI X12 encodation
pub const LATCH_X12: u8 = 238;
/// Latch to Text encodation
pub const LATCH_TEXT: u8 = 239;
/// Latch to EDIFACT encodation
pub const LATCH_EDIFACT: u8 = 240;
/// Extended channel interpretation
pub const ECI: u8 = 241;
/// Return to ASCII from C40, Text and X12
pub const UNLATCH: u8 = 254;

/// One ECC200 symbol size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolInfo {
    /// Symbol rows including finder and timing patterns
    pub rows: usize,
    /// Symbol columns including finder and timing patterns
    pub cols: usize,
    /// Data rows inside one region
    pub region_rows: usize,
    /// Data columns inside one region
    pub region_cols: usize,
    /// Data codewords
    pub data_codewords: usize,
    ecc_codewords: usize,
    blocks: usize,
}

const fn symbol(
    rows: usize,
    cols: usize,
    region_rows: usize,
    region_cols: usize,
    data_codewords: usize,
    ecc_codewords: usize,
    blocks: usize,
) -> SymbolInfo {
    SymbolInfo {
        rows,
        cols,
        region_rows,
        region_cols,
        data_codewords,
        ecc_codewords,
        blocks,
    }
}

/// Every ECC200 size, by data capacity ascending (squares first on ties)
pub const SYMBOLS: [SymbolInfo; 30] = [
    symbol(10, 10, 8, 8, 3, 5, 1),
    symbol(12, 12, 10, 10, 5, 7, 1),
    symbol(8, 18, 6, 16, 5, 7, 1),
    symbol(14, 14, 12, 12, 8, 10, 1),
    symbol(8, 32, 6, 14, 10, 11, 1),
    symbol(16, 16, 14, 14, 12, 12, 1),
    symbol(12, 26, 10, 24, 16, 14, 1),
    symbol(18, 18, 16, 16, 18, 14, 1),
    symbol(20, 20, 18, 18, 22, 18, 1),
    symbol(12, 36, 10, 16, 22, 18, 1),
    symbol(22, 22, 20, 20, 30, 20, 1),
    symbol(16, 36, 14, 16, 32, 24, 1),
    symbol(24, 24, 22, 22, 36, 24, 1),
    symbol(26, 26, 24, 24, 44, 28, 1),
    symbol(16, 48, 14, 22, 49, 28, 1),
    symbol(32, 32, 14, 14, 62, 36, 1),
    symbol(36, 36, 16, 16, 86, 42, 1),
    symbol(40, 40, 18, 18, 114, 48, 1),
    symbol(44, 44, 20, 20, 144, 56, 1),
    symbol(48, 48, 22, 22, 174, 68, 1),
    symbol(52, 52, 24, 24, 204, 84, 2),
    symbol(64, 64, 14, 14, 280, 112, 2),
    symbol(72, 72, 16, 16, 368, 144, 4),
    symbol(80, 80, 18, 18, 456, 192, 4),
    symbol(88, 88, 20, 20, 576, 224, 4),
    symbol(96, 96, 22, 22, 696, 272, 4),
    symbol(104, 104, 24, 24, 816, 336, 6),
    symbol(120, 120, 18, 18, 1050, 408, 6),
    symbol(132, 132, 20, 20, 1304, 496, 8),
    symbol(144, 144, 22, 22, 1558, 620, 10),
];

impl SymbolInfo {
    /// Error correction codewords over all blocks
    pub fn ecc_codewords(&self) -> usize {
        self.ecc_codewords
    }

    /// Interleaved Reed-Solomon blocks
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Parity codewords in each block
    pub fn ecc_per_block(&self) -> usize {
        self.ecc_codewords / self.blocks
    }

    /// Data codewords in block `b`; codeword `i` belongs to block `i % blocks`
    pub fn block_data_len(&self, b: usize) -> usize {
        self.data_codewords / self.blocks + usize::from(b < self.data_codewords % self.blocks)
    }

    /// Data regions stacked vertically
    pub fn regions_v(&self) -> usize {
        self.rows / (self.region_rows + 2)
    }

    /// Data regions side by side
    pub fn regions_h(&self) -> usize {
        self.cols / (self.region_cols + 2)
    }

    /// Rows of the placement grid (all regions without their borders)
    pub fn mapping_rows(&self) -> usize {
        self.regions_v() * self.region_rows
    }

    /// Columns of the placement grid
    pub fn mapping_cols(&self) -> usize {
        self.regions_h() * self.region_cols
    }

    /// Symbol coordinates (x, y) of placement cell (row, col)
    pub fn to_symbol(&self, row: usize, col: usize) -> (usize, usize) {
        let x = col / self.region_cols * (self.region_cols + 2) + 1 + col % self.region_cols;
        let y = row / self.region_rows * (self.region_rows + 2) + 1 + row % self.region_rows;
        (x, y)
    }
}

/// Symbol with the given module dimensions
pub fn symbol_for_size(rows: usize, cols: usize) -> Option<&'static SymbolInfo> {
    SYMBOLS.iter().find(|s| s.rows == rows && s.cols == cols)
}

/// Smallest symbol holding `codewords` data codewords
pub fn smallest_symbol(codewords: usize) -> Option<&'static SymbolInfo> {
    SYMBOLS.iter().find(|s| s.data_codewords >= codewords)
}

/// Finder L and timing edges of every region; data cells stay light
pub fn draw_function_patterns(info: &SymbolInfo) -> BitMatrix {
    let mut m = BitMatrix::new(info.cols, info.rows);
    let block_h = info.region_rows + 2;
    let block_w = info.region_cols + 2;
    for by in (0..info.rows).step_by(block_h) {
        for bx in (0..info.cols).step_by(block_w) {
            for y in 0..block_h {
                m.set(bx, by + y, true);
                m.set(bx + block_w - 1, by + y, y % 2 == 1);
            }
            for x in 0..block_w {
                m.set(bx + x, by + block_h - 1, true);
                m.set(bx + x, by, x % 2 == 0);
            }
        }
    }
    m
}

/// Placement cell of one codeword bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitCell {
    /// Placement row
    pub row: usize,
    /// Placement column
    pub col: usize,
}

/// Result of the ECC200 placement walk
#[derive(Debug, Clone)]
pub struct Placement {
    /// Eight cells per codeword, most significant bit first
    pub codewords: Vec<[BitCell; 8]>,
    /// Bottom-right 2x2 left over by the walk, filled with a fixed pattern
    pub fixed_corner: bool,
}

struct Walker {
    rows: isize,
    cols: isize,
    used: Vec<bool>,
    codewords: Vec<[BitCell; 8]>,
}

impl Walker {
    fn cell(&mut self, mut row: isize, mut col: isize) -> BitCell {
        if row < 0 {
            row += self.rows;
            col += 4 - ((self.rows + 4) % 8);
        }
        if col < 0 {
            col += self.cols;
            row += 4 - ((self.cols + 4) % 8);
        }
        self.used[(row * self.cols + col) as usize] = true;
        BitCell {
            row: row as usize,
            col: col as usize,
        }
    }

    fn place(&mut self, cells: [(isize, isize); 8]) {
        let placed = cells.map(|(r, c)| self.cell(r, c));
        self.codewords.push(placed);
    }

    fn utah(&mut self, r: isize, c: isize) {
        self.place([
            (r - 2, c - 2),
            (r - 2, c - 1),
            (r - 1, c - 2),
            (r - 1, c - 1),
            (r - 1, c),
            (r, c - 2),
            (r, c - 1),
            (r, c),
        ]);
    }

    fn is_free(&self, r: isize, c: isize) -> bool {
        !self.used[(r * self.cols + c) as usize]
    }
}

/// Walk the placement grid diagonally, assigning cells to codewords
pub fn placement(rows: usize, cols: usize) -> Placement {
    let (nr, nc) = (rows as isize, cols as isize);
    let mut w = Walker {
        rows: nr,
        cols: nc,
        used: vec![false; rows * cols],
        codewords: Vec::new(),
    };
    let (mut r, mut c) = (4isize, 0isize);
    loop {
        if r == nr && c == 0 {
            w.place([
                (nr - 1, 0),
                (nr - 1, 1),
                (nr - 1, 2),
                (0, nc - 2),
                (0, nc - 1),
                (1, nc - 1),
                (2, nc - 1),
                (3, nc - 1),
            ]);
        }
        if r == nr - 2 && c == 0 && nc % 4 != 0 {
            w.place([
                (nr - 3, 0),
                (nr - 2, 0),
                (nr - 1, 0),
                (0, nc - 4),
                (0, nc - 3),
                (0, nc - 2),
                (0, nc - 1),
                (1, nc - 1),
            ]);
        }
        if r == nr - 2 && c == 0 && nc % 8 == 4 {
            w.place([
                (nr - 3, 0),
                (nr - 2, 0),
                (nr - 1, 0),
                (0, nc - 2),
                (0, nc - 1),
                (1, nc - 1),
                (2, nc - 1),
                (3, nc - 1),
            ]);
        }
        if r == nr + 4 && c == 2 && nc % 8 == 0 {
            w.place([
                (nr - 1, 0),
                (nr - 1, nc - 1),
                (0, nc - 3),
                (0, nc - 2),
                (0, nc - 1),
                (1, nc - 3),
                (1, nc - 2),
                (1, nc - 1),
            ]);
        }
        // Up and to the right
        loop {
            if r < nr && c >= 0 && w.is_free(r, c) {
                w.utah(r, c);
            }
            r -= 2;
            c += 2;
            if !(r >= 0 && c < nc) {
                break;
            }
        }
        r += 1;
        c += 3;
        // Down and to the left
        loop {
            if r >= 0 && c < nc && w.is_free(r, c) {
                w.utah(r, c);
            }
            r += 2;
            c -= 2;
            if !(r < nr && c >= 0) {
                break;
            }
        }
        r += 3;
        c += 1;
        if !(r < nr || c < nc) {
            break;
        }
    }
    let fixed_corner = w.is_free(nr - 1, nc - 1);
    Placement {
        codewords: w.codewords,
        fixed_corner,
    }
}

/// Pad codeword for 1-based position `position` after the first pad
pub fn randomized_pad(position: usize) -> u8 {
    let pseudo = (149 * position) % 253 + 1;
    let value = PAD as usize + pseudo;
    (if value <= 254 { value } else { value - 254 }) as u8
}

/// Undo the 255-state randomisation applied to Base 256 bytes
pub fn unrandomize_255(value: u8, position: usize) -> u8 {
    let pseudo = (149 * position) % 255 + 1;
    let v = value as isize - pseudo as isize;
    (if v >= 0 { v } else { v + 256 }) as u8
}

/// Apply the 255-state randomisation to a Base 256 byte
pub fn randomize_255(value: u8, position: usize) -> u8 {
    let pseudo = (149 * position) % 255 + 1;
    let v = value as usize + pseudo;
    (if v <= 255 { v } else { v - 256 }) as u8
}

/// C40 basic set values 3-39 (shift 0)
pub const C40_BASIC: &[u8; 40] = b"\0\0\0 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Text basic set values 3-39 (shift 0)
pub const TEXT_BASIC: &[u8; 40] = b"\0\0\0 0123456789abcdefghijklmnopqrstuvwxyz";
/// Shift 2 punctuation shared by C40 and Text
pub const SHIFT2_SET: &[u8; 27] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_";
/// Text shift 3 set
pub const TEXT_SHIFT3: &[u8; 32] = b"`ABCDEFGHIJKLMNOPQRSTUVWXYZ{|}~\x7f";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_tile_into_regions() {
        for s in SYMBOLS {
            assert_eq!(s.regions_v() * (s.region_rows + 2), s.rows);
            assert_eq!(s.regions_h() * (s.region_cols + 2), s.cols);
            assert_eq!(s.ecc_codewords % s.blocks, 0);
            let total: usize = (0..s.blocks).map(|b| s.block_data_len(b)).sum();
            assert_eq!(total, s.data_codewords);
        }
    }

    #[test]
    fn test_placement_covers_every_codeword() {
        for s in SYMBOLS {
            let p = placement(s.mapping_rows(), s.mapping_cols());
            assert_eq!(
                p.codewords.len(),
                s.data_codewords + s.ecc_codewords,
                "{}x{}",
                s.rows,
                s.cols
            );
            let free = s.mapping_rows() * s.mapping_cols() - p.codewords.len() * 8;
            assert_eq!(free, if p.fixed_corner { 4 } else { 0 });
        }
    }

    #[test]
    fn test_fixed_corner_sizes() {
        let corner: Vec<usize> = SYMBOLS
            .iter()
            .filter(|s| placement(s.mapping_rows(), s.mapping_cols()).fixed_corner)
            .map(|s| s.rows)
            .collect();
        assert_eq!(corner, vec![12, 16, 20, 24]);
    }

    #[test]
    fn test_block_split_of_largest_symbol() {
        let s = symbol_for_size(144, 144).unwrap();
        assert_eq!(s.block_data_len(0), 156);
        assert_eq!(s.block_data_len(9), 155);
        assert_eq!(s.ecc_per_block(), 62);
    }

    #[test]
    fn test_function_patterns() {
        let m = draw_function_patterns(&SYMBOLS[0]);
        for i in 0..10 {
            assert!(m.get(0, i));
            assert!(m.get(i, 9));
            assert_eq!(m.get(i, 0), i % 2 == 0);
            assert_eq!(m.get(9, i), i % 2 == 1);
        }
        assert!(!m.get(4, 4));
    }

    #[test]
    fn test_pads_and_randomisation() {
        assert_eq!(randomized_pad(2), 129 + (298 % 253 + 1) as u8);
        for v in [0u8, 17, 200, 255] {
            assert_eq!(unrandomize_255(randomize_255(v, 5), 5), v);
        }
        assert_eq!(smallest_symbol(4).map(|s| s.rows), Some(12));
        assert_eq!(smallest_symbol(6).map(|s| s.rows), Some(14));
        assert_eq!(smallest_symbol(1559), None);
    }
}
