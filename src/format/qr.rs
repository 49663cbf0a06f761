//! QR Code (model 2) layout tables: error correction blocks, function
//! patterns, format and version information, data module order.

use crate::models::{BitMatrix, ECLevel, MaskPattern, Version};

/// Longest payload any symbol holds (numeric mode, version 40, level L)
pub const MAX_PAYLOAD_LEN: usize = 7089;

// Index: [ec_level][version]
const ECC_CODEWORDS_PER_BLOCK: [[u8; 41]; 4] = [
    [
        0, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28,
        30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        0, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        0, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30,
        30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        0, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

const NUM_ERROR_CORRECTION_BLOCKS: [[u8; 41]; 4] = [
    [
        0, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13,
        14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        0, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        0, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27,
        29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        0, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32,
        35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// Block structure of one version and level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcBlocks {
    /// Number of RS blocks
    pub num_blocks: usize,
    /// Parity codewords in every block
    pub ecc_per_block: usize,
    /// Data plus parity codewords in the symbol
    pub total_codewords: usize,
}

impl EcBlocks {
    /// Data codewords in the symbol
    pub fn data_codewords(&self) -> usize {
        self.total_codewords - self.num_blocks * self.ecc_per_block
    }

    /// Blocks that carry one data codeword fewer than the rest
    pub fn short_blocks(&self) -> usize {
        self.num_blocks - self.total_codewords % self.num_blocks
    }

    /// Data codewords of a short block
    pub fn short_block_data(&self) -> usize {
        self.total_codewords / self.num_blocks - self.ecc_per_block
    }

    /// Data codewords of block `index`
    pub fn block_data_len(&self, index: usize) -> usize {
        self.short_block_data() + usize::from(index >= self.short_blocks())
    }
}

/// Error correction blocks for `version` at `level`
pub fn ec_blocks(version: Version, level: ECLevel) -> Option<EcBlocks> {
    let v = version.number() as usize;
    let ecc = ECC_CODEWORDS_PER_BLOCK[level.ordinal()][v] as usize;
    let blocks = NUM_ERROR_CORRECTION_BLOCKS[level.ordinal()][v] as usize;
    if ecc == 0 || blocks == 0 {
        return None;
    }
    Some(EcBlocks {
        num_blocks: blocks,
        ecc_per_block: ecc,
        total_codewords: raw_data_modules(version) / 8,
    })
}

/// Modules left for data and parity once function patterns are drawn
pub fn raw_data_modules(version: Version) -> usize {
    let v = version.number() as usize;
    let mut result = (16 * v + 128) * v + 64;
    if v >= 2 {
        let num_align = v / 7 + 2;
        result -= (25 * num_align - 10) * num_align - 55;
        if v >= 7 {
            result -= 36;
        }
    }
    result
}

/// Alignment pattern centre coordinates, shared by both axes
pub fn alignment_positions(version: Version) -> Vec<usize> {
    let v = version.number() as usize;
    if v == 1 {
        return Vec::new();
    }
    let num_align = v / 7 + 2;
    let step = (v * 8 + num_align * 3 + 5) / (num_align * 4 - 4) * 2;
    let mut positions = vec![6usize; num_align];
    let mut pos = version.size() - 7;
    for slot in positions.iter_mut().skip(1).rev() {
        *slot = pos;
        pos -= step;
    }
    positions
}

/// Alignment centres that do not collide with a finder pattern
pub fn alignment_centers(version: Version) -> Vec<(usize, usize)> {
    let positions = alignment_positions(version);
    let last = positions.len().saturating_sub(1);
    let mut centers = Vec::new();
    for (i, &x) in positions.iter().enumerate() {
        for (j, &y) in positions.iter().enumerate() {
            let corner = (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0);
            if !corner {
                centers.push((x, y));
            }
        }
    }
    centers
}

/// Modules that hold function patterns (true) rather than data
pub fn function_mask(version: Version) -> BitMatrix {
    let size = version.size();
    let mut mask = BitMatrix::square(size);

    // Finders with separators, plus the format areas beside them
    for (x0, y0) in [(0, 0), (size - 8, 0), (0, size - 8)] {
        for y in y0..y0 + 8 {
            for x in x0..x0 + 8 {
                mask.set(x, y, true);
            }
        }
    }
    for i in 0..size {
        mask.set(6, i, true);
        mask.set(i, 6, true);
    }
    for (cx, cy) in alignment_centers(version) {
        for y in cy - 2..=cy + 2 {
            for x in cx - 2..=cx + 2 {
                mask.set(x, y, true);
            }
        }
    }
    for (x, y) in format_positions(size).iter().flatten() {
        mask.set(*x, *y, true);
    }
    mask.set(8, size - 8, true);
    if version.number() >= 7 {
        for (x, y) in version_positions(size).iter().flatten() {
            mask.set(*x, *y, true);
        }
    }
    mask
}

/// Coordinates of format bit `i` (LSB first) in both copies
pub fn format_positions(size: usize) -> [[(usize, usize); 15]; 2] {
    let mut first = [(0, 0); 15];
    let mut second = [(0, 0); 15];
    for (i, slot) in first.iter_mut().enumerate() {
        *slot = match i {
            0..=5 => (8, i),
            6 => (8, 7),
            7 => (8, 8),
            8 => (7, 8),
            _ => (14 - i, 8),
        };
    }
    for (i, slot) in second.iter_mut().enumerate() {
        *slot = if i < 8 {
            (size - 1 - i, 8)
        } else {
            (8, size - 15 + i)
        };
    }
    [first, second]
}

/// Coordinates of version bit `i` (LSB first) in both copies
pub fn version_positions(size: usize) -> [[(usize, usize); 18]; 2] {
    let mut top_right = [(0, 0); 18];
    let mut bottom_left = [(0, 0); 18];
    for i in 0..18 {
        let a = size - 11 + i % 3;
        let b = i / 3;
        top_right[i] = (a, b);
        bottom_left[i] = (b, a);
    }
    [top_right, bottom_left]
}

const FORMAT_GENERATOR: u32 = 0x537;
const FORMAT_MASK: u32 = 0x5412;
const VERSION_GENERATOR: u32 = 0x1F25;

/// 15-bit masked BCH(15,5) word for `level` and `mask`
pub fn format_bits(level: ECLevel, mask: MaskPattern) -> u32 {
    let data = (level.bits() as u32) << 3 | mask.bits() as u32;
    let mut rem = data;
    for _ in 0..10 {
        rem = (rem << 1) ^ ((rem >> 9) * FORMAT_GENERATOR);
    }
    ((data << 10) | rem) ^ FORMAT_MASK
}

/// Nearest valid format word to `bits` within three bit errors
pub fn decode_format(bits: u32) -> Option<(ECLevel, MaskPattern)> {
    let mut best: Option<(u32, ECLevel, MaskPattern)> = None;
    for level in ECLevel::ALL {
        for mask in MaskPattern::ALL {
            let distance = (format_bits(level, mask) ^ bits).count_ones();
            if best.is_none_or(|(d, _, _)| distance < d) {
                best = Some((distance, level, mask));
            }
        }
    }
    best.filter(|&(d, _, _)| d <= 3).map(|(_, l, m)| (l, m))
}

/// 18-bit BCH(18,6) version word
pub fn version_bits(version: Version) -> u32 {
    let v = version.number() as u32;
    let mut rem = v;
    for _ in 0..12 {
        rem = (rem << 1) ^ ((rem >> 11) * VERSION_GENERATOR);
    }
    (v << 12) | rem
}

/// Nearest version (7-40) to `bits` within three bit errors
pub fn decode_version(bits: u32) -> Option<Version> {
    (7..=40u8)
        .filter_map(Version::new)
        .map(|v| ((version_bits(v) ^ bits).count_ones(), v))
        .min_by_key(|&(d, _)| d)
        .filter(|&(d, _)| d <= 3)
        .map(|(_, v)| v)
}

/// Data modules in placement order: two-column zig-zag from the bottom right
pub fn data_positions(function: &BitMatrix) -> Vec<(usize, usize)> {
    let size = function.width();
    let mut order = Vec::with_capacity(size * size);
    let mut right = size as isize - 1;
    while right >= 1 {
        if right == 6 {
            right = 5;
        }
        let upward = ((right + 1) & 2) == 0;
        for vert in 0..size {
            let y = if upward { size - 1 - vert } else { vert };
            for j in 0..2 {
                let x = (right - j) as usize;
                if !function.get(x, y) {
                    order.push((x, y));
                }
            }
        }
        right -= 2;
    }
    order
}

/// Segment modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Digits, three per 10 bits
    Numeric,
    /// [`ALPHANUMERIC`] characters, two per 11 bits
    Alphanumeric,
    /// 8-bit bytes
    Byte,
    /// Shift JIS double-byte characters, 13 bits each
    Kanji,
}

impl Mode {
    /// Four-bit mode indicator
    pub fn indicator(self) -> u32 {
        match self {
            Mode::Numeric => 0x1,
            Mode::Alphanumeric => 0x2,
            Mode::Byte => 0x4,
            Mode::Kanji => 0x8,
        }
    }

    /// Width of the character count field
    pub fn count_bits(self, version: Version) -> usize {
        let idx = match version.number() {
            1..=9 => 0,
            10..=26 => 1,
            _ => 2,
        };
        let widths = match self {
            Mode::Numeric => [10, 12, 14],
            Mode::Alphanumeric => [9, 11, 13],
            Mode::Byte => [8, 16, 16],
            Mode::Kanji => [8, 10, 12],
        };
        widths[idx]
    }
}

/// Alphanumeric mode character set in value order
pub const ALPHANUMERIC: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Value of `byte` in alphanumeric mode
pub fn alphanumeric_value(byte: u8) -> Option<u32> {
    ALPHANUMERIC.iter().position(|&c| c == byte).map(|v| v as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u8) -> Version {
        Version::new(n).unwrap()
    }

    #[test]
    fn test_block_totals() {
        let b = ec_blocks(v(1), ECLevel::M).unwrap();
        assert_eq!(b.total_codewords, 26);
        assert_eq!(b.data_codewords(), 16);
        let b = ec_blocks(v(5), ECLevel::Q).unwrap();
        assert_eq!(b.total_codewords, 134);
        assert_eq!(b.num_blocks, 4);
        assert_eq!(b.short_blocks(), 2);
        assert_eq!(b.block_data_len(0), 15);
        assert_eq!(b.block_data_len(3), 16);
        let b = ec_blocks(Version::MAX, ECLevel::L).unwrap();
        assert_eq!(b.data_codewords(), 2956);
    }

    #[test]
    fn test_function_mask_leaves_raw_modules() {
        for n in [1u8, 2, 7, 14, 32, 40] {
            let mask = function_mask(v(n));
            let size = v(n).size();
            let free = size * size - mask.count_ones();
            assert_eq!(free, raw_data_modules(v(n)), "version {n}");
            assert_eq!(data_positions(&mask).len(), free);
        }
    }

    #[test]
    fn test_alignment_positions() {
        assert!(alignment_positions(v(1)).is_empty());
        assert_eq!(alignment_positions(v(2)), vec![6, 18]);
        assert_eq!(alignment_positions(v(7)), vec![6, 22, 38]);
        assert_eq!(alignment_positions(v(32)), vec![6, 34, 60, 86, 112, 138]);
    }

    #[test]
    fn test_format_bits_known_value() {
        // Level M, mask 0
        assert_eq!(format_bits(ECLevel::M, MaskPattern::Pattern0), 0x5412);
        assert_eq!(format_bits(ECLevel::L, MaskPattern::Pattern4), 0x662F);
        let bits = format_bits(ECLevel::Q, MaskPattern::Pattern6) ^ 0b101;
        assert_eq!(decode_format(bits), Some((ECLevel::Q, MaskPattern::Pattern6)));
    }

    #[test]
    fn test_version_bits_known_value() {
        assert_eq!(version_bits(v(7)), 0x07C94);
        assert_eq!(decode_version(version_bits(v(21)) ^ 0b1001), Some(v(21)));
        assert_eq!(decode_version(0), None);
    }
}
