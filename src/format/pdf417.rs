//! PDF417 layout: symbol character patterns, start and stop patterns, row
//! indicators, error correction levels and text compaction tables.

use super::SizeClass;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Longest payload any symbol holds (numeric compaction, level 0)
pub const MAX_PAYLOAD_LEN: usize = 2710;

/// Module rows drawn for each codeword row
pub const ROW_HEIGHT: usize = 3;

/// Codewords in the largest symbol
pub const MAX_CODEWORDS: usize = 928;
/// Fewest codeword rows in a symbol
pub const MIN_ROWS: usize = 3;
/// Most codeword rows in a symbol
pub const MAX_ROWS: usize = 90;
/// Most data columns in a symbol
pub const MAX_COLS: usize = 30;

/// Modules in one symbol character
pub const CODEWORD_MODULES: usize = 17;

/// Start pattern bar/space widths
pub const START: [u8; 8] = [8, 1, 1, 1, 1, 1, 1, 3];
/// Stop pattern bar/space widths, ending in a one-module bar
pub const STOP: [u8; 9] = [7, 1, 1, 3, 1, 1, 1, 2, 1];

/// Latch to text compaction
pub const TEXT_LATCH: u16 = 900;
/// Latch to byte compaction
pub const BYTE_LATCH: u16 = 901;
/// Latch to numeric compaction
pub const NUMERIC_LATCH: u16 = 902;
/// One byte inside text compaction
pub const BYTE_SHIFT: u16 = 913;
/// Byte compaction of a multiple of six bytes
pub const BYTE_LATCH_6: u16 = 924;
/// Filler codeword after the data
pub const PAD: u16 = 900;

/// Space in the alpha, lower and mixed submodes
pub const SPACE: u8 = 26;
/// Alpha or mixed to lower
pub const LATCH_LOWER: u8 = 27;
/// Lower to alpha for one character
pub const ALPHA_SHIFT: u8 = 27;
/// Alpha or lower to mixed
pub const LATCH_MIXED: u8 = 28;
/// Mixed to alpha
pub const LATCH_ALPHA: u8 = 28;
/// Punctuation for one character
pub const PUNCT_SHIFT: u8 = 29;
/// Mixed to punctuation
pub const PUNCT_LATCH: u8 = 25;
/// Punctuation back to alpha
pub const PUNCT_TO_ALPHA: u8 = 29;

/// Mixed submode characters for values 0..25
pub const MIXED_CHARS: &[u8; 25] = b"0123456789&\r\t,:#-.$/+%*=^";
/// Punctuation submode characters for values 0..29
pub const PUNCT_CHARS: &[u8; 29] = b";<>@[\\]_`~!\r\t,:\n-.$/\"|*()?{}'";

mod patterns;

use patterns::SYMBOL_PATTERNS;

/// Codewords per cluster
const CLUSTER_SIZE: usize = 929;

/// Bar/space widths of every symbol character in the three clusters
pub struct PatternTable {
    patterns: [Vec<[u8; 8]>; 3],
    lookup: HashMap<[u8; 8], (usize, u16)>,
}

impl PatternTable {
    fn build() -> Self {
        let patterns: [Vec<[u8; 8]>; 3] =
            std::array::from_fn(|cluster| SYMBOL_PATTERNS[cluster].iter().map(|&bits| pattern_widths(bits)).collect());
        let mut lookup = HashMap::with_capacity(3 * CLUSTER_SIZE);
        for (index, table) in patterns.iter().enumerate() {
            for (value, w) in table.iter().enumerate() {
                lookup.insert(*w, (index, value as u16));
            }
        }
        Self { patterns, lookup }
    }

    /// Widths of `value` in cluster index `cluster` (0, 1, 2 for clusters 0, 3, 6)
    pub fn widths(&self, cluster: usize, value: u16) -> Option<[u8; 8]> {
        self.patterns[cluster % 3].get(value as usize).copied()
    }

    /// Cluster index and value of a width pattern
    pub fn lookup(&self, widths: &[u8; 8]) -> Option<(usize, u16)> {
        self.lookup.get(widths).copied()
    }
}

/// Run lengths of a 17-module pattern, starting with its first bar
fn pattern_widths(bits: u32) -> [u8; 8] {
    let mut widths = [0u8; 8];
    let mut element = 0;
    let mut previous = true;
    for i in (0..CODEWORD_MODULES).rev() {
        let dark = (bits >> i) & 1 == 1;
        if dark != previous {
            element += 1;
            previous = dark;
        }
        if let Some(w) = widths.get_mut(element) {
            *w += 1;
        }
    }
    widths
}

/// Cluster number (0..9) from the bar widths
pub fn cluster_of(w: &[u8; 8]) -> usize {
    (w[0] as usize + w[4] as usize + 18 - w[2] as usize - w[6] as usize) % 9
}

/// Shared pattern table, built on first use
pub fn patterns() -> &'static PatternTable {
    static TABLE: OnceLock<PatternTable> = OnceLock::new();
    TABLE.get_or_init(PatternTable::build)
}

/// Parity codewords at `level`
pub fn ecc_count(level: u8) -> usize {
    2 << level
}

/// Level recommended for `data` data codewords
pub fn default_level(data: usize) -> u8 {
    match data {
        0..=40 => 2,
        41..=160 => 3,
        161..=320 => 4,
        _ => 5,
    }
}

/// Narrowest grid holding `total` codewords whose height, in modules, does
/// not exceed its width
pub fn dimensions(total: usize) -> Option<(usize, usize)> {
    if total > MAX_CODEWORDS {
        return None;
    }
    (1..=MAX_COLS).find_map(|cols| {
        let rows = total.div_ceil(cols).max(MIN_ROWS);
        let width = CODEWORD_MODULES * (cols + 4) + 1;
        (rows <= MAX_ROWS && rows * ROW_HEIGHT <= width).then_some((cols, rows))
    })
}

/// Symbol width in modules for `cols` data columns
pub fn symbol_width(cols: usize) -> usize {
    CODEWORD_MODULES * (cols + 4) + 1
}

/// Left and right row indicator values of `row`
pub fn row_indicators(row: usize, rows: usize, cols: usize, level: u8) -> (u16, u16) {
    let base = 30 * (row / 3);
    let rows_high = (rows - 1) / 3;
    let level_rows_low = level as usize * 3 + (rows - 1) % 3;
    let cols_field = cols - 1;
    let (left, right) = match row % 3 {
        0 => (rows_high, cols_field),
        1 => (level_rows_low, rows_high),
        _ => (cols_field, level_rows_low),
    };
    ((base + left) as u16, (base + right) as u16)
}

/// Symbol geometry carried by one row indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorField {
    /// `(rows - 1) / 3`
    RowsHigh(usize),
    /// Error correction level and `(rows - 1) % 3`
    LevelRowsLow(u8, usize),
    /// `cols - 1`
    Cols(usize),
}

/// Row number and geometry field of an indicator read in cluster index
/// `cluster`
pub fn parse_indicator(value: u16, cluster: usize, left: bool) -> (usize, IndicatorField) {
    let value = value as usize;
    let row = 3 * (value / 30) + cluster;
    let field = value % 30;
    let kind = if left { cluster } else { (cluster + 2) % 3 };
    let parsed = match kind {
        0 => IndicatorField::RowsHigh(field),
        1 => IndicatorField::LevelRowsLow((field / 3) as u8, field % 3),
        _ => IndicatorField::Cols(field),
    };
    (row, parsed)
}

/// Best-case capacity per column count at the default level
pub fn size_classes() -> Vec<SizeClass> {
    (1..=MAX_COLS)
        .map(|cols| {
            let total = (cols * MAX_ROWS).min(MAX_CODEWORDS);
            let data = (1..total)
                .rev()
                .find(|&d| 1 + d + ecc_count(default_level(d)) <= total)
                .unwrap_or(0);
            SizeClass {
                cols: symbol_width(cols),
                rows: MAX_ROWS * ROW_HEIGHT,
                data_codewords: data,
                ecc_codewords: ecc_count(default_level(data)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_patterns() {
        let table = patterns();
        assert_eq!(table.widths(0, 0), Some([3, 1, 1, 1, 1, 1, 3, 6]));
        assert_eq!(table.widths(1, 0), Some([5, 1, 1, 1, 1, 1, 2, 5]));
        assert_eq!(table.widths(2, 0), Some([2, 1, 1, 1, 1, 1, 5, 5]));
        assert_eq!(table.widths(0, 928), Some([2, 1, 5, 1, 4, 1, 1, 2]));
        assert_eq!(table.lookup(&[2, 3, 5, 2, 1, 2, 1, 1]), Some((2, 900)));
    }

    #[test]
    fn test_pattern_table_is_complete() {
        let table = patterns();
        for cluster in 0..3 {
            assert_eq!(table.patterns[cluster].len(), CLUSTER_SIZE);
            for value in [0u16, 1, 500, 928] {
                let w = table.widths(cluster, value).unwrap();
                assert_eq!(w.iter().map(|&x| x as usize).sum::<usize>(), CODEWORD_MODULES);
                assert_eq!(cluster_of(&w), cluster * 3);
                assert_eq!(table.lookup(&w), Some((cluster, value)));
            }
        }
        assert_eq!(table.lookup(&START), None);
        assert_eq!(table.widths(0, 929), None);
    }

    #[test]
    fn test_levels_and_dimensions() {
        assert_eq!(default_level(40), 2);
        assert_eq!(default_level(41), 3);
        assert_eq!(default_level(863), 5);
        assert_eq!(ecc_count(2), 8);
        assert_eq!(ecc_count(8), 512);
        assert_eq!(dimensions(10), Some((1, 10)));
        let (cols, rows) = dimensions(928).unwrap();
        assert!(cols * rows >= 928 && rows <= MAX_ROWS);
        assert_eq!(dimensions(929), None);
        assert_eq!(symbol_width(1), 86);
    }

    #[test]
    fn test_row_indicators_parse_back() {
        let (rows, cols, level) = (13, 4, 3);
        for row in 0..rows {
            let cluster = row % 3;
            let (left, right) = row_indicators(row, rows, cols, level);
            let (r, l) = parse_indicator(left, cluster, true);
            let (r2, rf) = parse_indicator(right, cluster, false);
            assert_eq!((r, r2), (row, row));
            for field in [l, rf] {
                match field {
                    IndicatorField::RowsHigh(v) => assert_eq!(v, (rows - 1) / 3),
                    IndicatorField::LevelRowsLow(lv, lo) => assert_eq!((lv, lo), (level, (rows - 1) % 3)),
                    IndicatorField::Cols(c) => assert_eq!(c, cols - 1),
                }
            }
        }
    }
}
