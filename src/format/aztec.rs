//! Aztec layout: layer geometry, bullseye and reference grid, the mode
//! message ring, the data spiral and the character mode tables.

use super::SizeClass;
use crate::ecc::{AZTEC_DATA_6, AZTEC_DATA_10, AZTEC_DATA_12, DATA_MATRIX_FIELD_256, GaloisField};
use crate::models::BitMatrix;

/// Longest payload any symbol holds (digits, 32 full layers)
pub const MAX_PAYLOAD_LEN: usize = 3832;

/// Data words a compact mode message can count
pub const COMPACT_MAX_DATA_WORDS: usize = 64;

/// Parity share used for the published size classes
const DEFAULT_ECC_PERCENT: usize = 33;

/// Layer count and symbol kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Compact symbols have a two-ring bullseye and no reference grid
    pub compact: bool,
    /// Data layers around the core
    pub layers: usize,
}

impl Layout {
    /// Layout with `layers` data layers, if that count exists for the form
    pub fn new(compact: bool, layers: usize) -> Option<Self> {
        let range = if compact { 1..=4 } else { 1..=32 };
        range.contains(&layers).then_some(Self { compact, layers })
    }

    /// Candidates in encoder order: compact 1-4, then full 4-32
    pub fn all() -> impl Iterator<Item = Layout> {
        (1..=4)
            .map(|layers| Layout { compact: true, layers })
            .chain((4..=32).map(|layers| Layout { compact: false, layers }))
    }

    /// Side of the symbol without the reference grid
    fn base_size(&self) -> usize {
        (if self.compact { 11 } else { 14 }) + 4 * self.layers
    }

    /// Side of the symbol in modules
    pub fn size(&self) -> usize {
        let base = self.base_size();
        if self.compact {
            base
        } else {
            base + 1 + 2 * ((base / 2 - 1) / 15)
        }
    }

    /// Bits per codeword
    pub fn word_size(&self) -> usize {
        match self.layers {
            0..=2 => 6,
            3..=8 => 8,
            9..=22 => 10,
            _ => 12,
        }
    }

    /// Data-spiral bits, including the unused leading remainder
    pub fn total_bits(&self) -> usize {
        let per_layer = if self.compact { 88 } else { 112 };
        (per_layer + 16 * self.layers) * self.layers
    }

    /// Codewords the data spiral holds
    pub fn total_words(&self) -> usize {
        self.total_bits() / self.word_size()
    }

    /// Radius of the core square: bullseye plus mode message ring
    pub fn core_radius(&self) -> usize {
        core_radius(self.compact)
    }

    /// Galois field of the data codewords
    pub fn field(&self) -> &'static GaloisField {
        match self.word_size() {
            6 => &AZTEC_DATA_6,
            8 => &DATA_MATRIX_FIELD_256,
            10 => &AZTEC_DATA_10,
            _ => &AZTEC_DATA_12,
        }
    }

    /// Largest number of data words that still leaves `percent`% + 3 parity
    /// words
    pub fn data_capacity(&self, percent: usize) -> usize {
        let total = self.total_words();
        let limit = if self.compact {
            COMPACT_MAX_DATA_WORDS
        } else {
            usize::MAX
        };
        (0..=total.min(limit))
            .rev()
            .find(|&d| d + min_ecc_words(d, percent) <= total)
            .unwrap_or(0)
    }

    /// Symbol coordinate of each line of the layout before grid lines are
    /// inserted
    fn alignment_map(&self) -> Vec<usize> {
        let base = self.base_size();
        if self.compact {
            return (0..base).collect();
        }
        let mut map = vec![0; base];
        let half = base / 2;
        let center = self.size() / 2;
        for i in 0..half {
            let offset = i + i / 15;
            map[half - i - 1] = center - offset - 1;
            map[half + i] = center + offset + 1;
        }
        map
    }

    /// `(x, y)` of every data-spiral bit, in stream order.
    ///
    /// Layers run from the outside in; each layer is four two-module-wide
    /// arms, top-left going down, then bottom, right and top.
    pub fn data_positions(&self) -> Vec<(usize, usize)> {
        let map = self.alignment_map();
        let base = self.base_size();
        let mut positions = vec![(0, 0); self.total_bits()];
        let mut row_offset = 0;
        for i in 0..self.layers {
            let row_size = (self.layers - i) * 4 + if self.compact { 9 } else { 12 };
            let low = i * 2;
            let high = base - 1 - low;
            for j in 0..row_size {
                let column = j * 2;
                for k in 0..2 {
                    positions[row_offset + column + k] = (map[low + k], map[low + j]);
                    positions[row_offset + 2 * row_size + column + k] = (map[low + j], map[high - k]);
                    positions[row_offset + 4 * row_size + column + k] = (map[high - k], map[high - j]);
                    positions[row_offset + 6 * row_size + column + k] = (map[high - j], map[low + k]);
                }
            }
            row_offset += row_size * 8;
        }
        positions
    }

    /// Bullseye, orientation marks and (full symbols) the reference grid
    pub fn function_patterns(&self) -> BitMatrix {
        let size = self.size();
        let center = size / 2;
        let mut m = BitMatrix::square(size);
        if !self.compact {
            for offset in (0..=center).step_by(16) {
                for k in (center % 2..size).step_by(2) {
                    m.set(center - offset, k, true);
                    m.set(center + offset, k, true);
                    m.set(k, center - offset, true);
                    m.set(k, center + offset, true);
                }
            }
        }
        draw_core(&mut m, center, self.compact);
        m
    }
}

fn core_radius(compact: bool) -> usize {
    if compact { 5 } else { 7 }
}

/// `percent`% of the data words, rounded up, plus three
pub fn min_ecc_words(data_words: usize, percent: usize) -> usize {
    (data_words * percent).div_ceil(100) + 3
}

/// Bullseye rings and orientation marks centred on `center`; the rest of
/// the core square is cleared
pub fn draw_core(m: &mut BitMatrix, center: usize, compact: bool) {
    let r = core_radius(compact);
    for y in center - r..=center + r {
        for x in center - r..=center + r {
            let ring = x.abs_diff(center).max(y.abs_diff(center));
            m.set(x, y, ring < r && ring % 2 == 0);
        }
    }
    for (x, y) in orientation_marks(center, compact) {
        m.set(x, y, true);
    }
}

/// The six dark orientation modules: three at top-left, two at top-right,
/// one at bottom-right
pub fn orientation_marks(center: usize, compact: bool) -> [(usize, usize); 6] {
    let r = core_radius(compact);
    let (lo, hi) = (center - r, center + r);
    [
        (lo, lo),
        (lo + 1, lo),
        (lo, lo + 1),
        (hi, lo),
        (hi, lo + 1),
        (hi, hi - 1),
    ]
}

/// Corner-adjacent cells of the mode ring that orientation marks leave light
pub fn orientation_gaps(center: usize, compact: bool) -> [(usize, usize); 6] {
    let r = core_radius(compact);
    let (lo, hi) = (center - r, center + r);
    [
        (hi - 1, lo),
        (hi, hi),
        (hi - 1, hi),
        (lo, hi),
        (lo + 1, hi),
        (lo, hi - 1),
    ]
}

/// Mode message bits in the mode ring (28 compact, 40 full), clockwise from
/// the top-left
pub fn mode_positions(center: usize, compact: bool) -> Vec<(usize, usize)> {
    if compact {
        let mut pos = vec![(0, 0); 28];
        for i in 0..7 {
            let o = center - 3 + i;
            pos[i] = (o, center - 5);
            pos[i + 7] = (center + 5, o);
            pos[20 - i] = (o, center + 5);
            pos[27 - i] = (center - 5, o);
        }
        pos
    } else {
        let mut pos = vec![(0, 0); 40];
        for i in 0..10 {
            let o = center - 5 + i + i / 5;
            pos[i] = (o, center - 7);
            pos[i + 10] = (center + 7, o);
            pos[29 - i] = (o, center + 7);
            pos[39 - i] = (center - 7, o);
        }
        pos
    }
}

/// Mode message words: data (2 compact, 4 full) then GF(16) parity
pub fn mode_message_words(compact: bool) -> (usize, usize) {
    if compact { (2, 5) } else { (4, 6) }
}

/// Capacity of each layout at the default parity share, ascending.
///
/// Word sizes vary with the layer count, so capacities are counted in
/// bytes.
pub fn size_classes() -> Vec<SizeClass> {
    Layout::all()
        .map(|layout| {
            let w = layout.word_size();
            let data = layout.data_capacity(DEFAULT_ECC_PERCENT);
            SizeClass {
                cols: layout.size(),
                rows: layout.size(),
                data_codewords: data * w / 8,
                ecc_codewords: (layout.total_words() - data) * w / 8,
            }
        })
        .collect()
}

/// Character modes of the high-level bit stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Capital letters and space
    Upper,
    /// Small letters and space
    Lower,
    /// Control characters and symbols
    Mixed,
    /// Punctuation and two-character pairs
    Punct,
    /// Digits, comma and full stop, in four-bit codes
    Digit,
}

/// Meaning of one code in a mode table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// One payload byte
    Byte(u8),
    /// Two payload bytes in one code
    Pair(&'static [u8]),
    /// Switch to a mode until the next latch
    Latch(Mode),
    /// Switch to a mode for one code
    Shift(Mode),
    /// Raw bytes follow, counted by a length prefix
    BinaryShift,
    /// FLG(n): FNC1 or an ECI designator
    Flag,
}

/// Codes 2..=27 of the mixed table
const MIXED: &[u8; 26] =
    b"\x01\x02\x03\x04\x05\x06\x07\x08\t\n\x0b\x0c\r\x1b\x1c\x1d\x1e\x1f@\\^_`|~\x7f";
/// Codes 6..=30 of the punctuation table
const PUNCT: &[u8; 25] = b"!\"#$%&'()*+,-./:;<=>?[]{}";
/// Codes 2..=5 of the punctuation table
const PUNCT_PAIRS: [&[u8]; 4] = [b"\r\n", b". ", b", ", b": "];

impl Mode {
    /// Width of one code
    pub fn bits(self) -> usize {
        if self == Mode::Digit { 4 } else { 5 }
    }

    /// Decode one code
    pub fn entry(self, code: u8) -> Option<Entry> {
        let e = match (self, code) {
            (Mode::Punct, 0) => Entry::Flag,
            (Mode::Punct, 1) => Entry::Byte(b'\r'),
            (Mode::Punct, 2..=5) => Entry::Pair(PUNCT_PAIRS[code as usize - 2]),
            (Mode::Punct, 6..=30) => Entry::Byte(PUNCT[code as usize - 6]),
            (Mode::Punct, 31) => Entry::Latch(Mode::Upper),
            (_, 0) => Entry::Shift(Mode::Punct),
            (_, 1) => Entry::Byte(b' '),
            (Mode::Upper, 2..=27) => Entry::Byte(b'A' + code - 2),
            (Mode::Lower, 2..=27) => Entry::Byte(b'a' + code - 2),
            (Mode::Mixed, 2..=27) => Entry::Byte(MIXED[code as usize - 2]),
            (Mode::Upper, 28) | (Mode::Mixed, 28) => Entry::Latch(Mode::Lower),
            (Mode::Lower, 28) => Entry::Shift(Mode::Upper),
            (Mode::Upper, 29) | (Mode::Lower, 29) => Entry::Latch(Mode::Mixed),
            (Mode::Mixed, 29) => Entry::Latch(Mode::Upper),
            (Mode::Upper, 30) | (Mode::Lower, 30) => Entry::Latch(Mode::Digit),
            (Mode::Mixed, 30) => Entry::Latch(Mode::Punct),
            (Mode::Upper | Mode::Lower | Mode::Mixed, 31) => Entry::BinaryShift,
            (Mode::Digit, 2..=11) => Entry::Byte(b'0' + code - 2),
            (Mode::Digit, 12) => Entry::Byte(b','),
            (Mode::Digit, 13) => Entry::Byte(b'.'),
            (Mode::Digit, 14) => Entry::Latch(Mode::Upper),
            (Mode::Digit, 15) => Entry::Shift(Mode::Upper),
            _ => return None,
        };
        Some(e)
    }

    /// Code of a single byte in this mode's table
    pub fn code_of(self, byte: u8) -> Option<u8> {
        let position = |table: &[u8]| table.iter().position(|&b| b == byte).map(|p| p as u8);
        match self {
            Mode::Upper | Mode::Lower | Mode::Mixed | Mode::Digit if byte == b' ' => Some(1),
            Mode::Upper => byte.is_ascii_uppercase().then(|| byte - b'A' + 2),
            Mode::Lower => byte.is_ascii_lowercase().then(|| byte - b'a' + 2),
            Mode::Mixed => position(MIXED).map(|p| p + 2),
            Mode::Punct if byte == b'\r' => Some(1),
            Mode::Punct => position(PUNCT).map(|p| p + 6),
            Mode::Digit => match byte {
                b'0'..=b'9' => Some(byte - b'0' + 2),
                b',' => Some(12),
                b'.' => Some(13),
                _ => None,
            },
        }
    }

    /// Code latching directly from this mode to `to`
    pub fn latch_code(self, to: Mode) -> Option<u8> {
        (0..32).find(|&c| self.entry(c) == Some(Entry::Latch(to)))
    }
}
