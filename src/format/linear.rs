//! Character tables and check digits for the linear symbologies.

/// Drawn height of linear symbols, in modules
pub const BAR_HEIGHT: usize = 50;

/// Longest Code 128 payload accepted
pub const CODE128_MAX_LEN: usize = 80;
/// Longest Code 39 payload accepted
pub const CODE39_MAX_LEN: usize = 43;
/// ITF-14 width between the outer edges of start and stop
pub const ITF14_MODULES: usize = 135;
/// Longest Codabar payload accepted, start and stop characters included
pub const CODABAR_MAX_LEN: usize = 60;
/// Module width of a wide Code 39, Codabar or ITF element
pub const WIDE: usize = 3;

/// EAN/UPC left-hand odd parity (set A) patterns
pub const EAN_L: [[u8; 7]; 10] = [
    [0, 0, 0, 1, 1, 0, 1],
    [0, 0, 1, 1, 0, 0, 1],
    [0, 0, 1, 0, 0, 1, 1],
    [0, 1, 1, 1, 1, 0, 1],
    [0, 1, 0, 0, 0, 1, 1],
    [0, 1, 1, 0, 0, 0, 1],
    [0, 1, 0, 1, 1, 1, 1],
    [0, 1, 1, 1, 0, 1, 1],
    [0, 1, 1, 0, 1, 1, 1],
    [0, 0, 0, 1, 0, 1, 1],
];

/// Parity of left digits 2-7 selected by the leading digit (true = G set)
pub const EAN_FIRST_DIGIT_PARITY: [[bool; 6]; 10] = [
    [false, false, false, false, false, false],
    [false, false, true, false, true, true],
    [false, false, true, true, false, true],
    [false, false, true, true, true, false],
    [false, true, false, false, true, true],
    [false, true, true, false, false, true],
    [false, true, true, true, false, false],
    [false, true, false, true, false, true],
    [false, true, false, true, true, false],
    [false, true, true, false, true, false],
];

/// EAN start and end guard
pub const EAN_EDGE_GUARD: [bool; 3] = [true, false, true];
/// EAN centre guard
pub const EAN_CENTER_GUARD: [bool; 5] = [false, true, false, true, false];

/// Seven modules of `digit` in set L, G or R
pub fn ean_digit_modules(digit: u8, set: EanSet) -> [bool; 7] {
    let l = EAN_L[digit as usize % 10];
    let mut out = [false; 7];
    for i in 0..7 {
        out[i] = match set {
            EanSet::L => l[i] == 1,
            EanSet::R => l[i] == 0,
            // G is R reversed
            EanSet::G => l[6 - i] == 0,
        };
    }
    out
}

/// EAN digit encoding sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EanSet {
    /// Left odd parity
    L,
    /// Left even parity
    G,
    /// Right hand
    R,
}

/// GTIN check digit of `digits` (values 0-9), the rightmost weighted 3
pub fn gtin_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| d as u32 * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Code 128 bar/space widths for symbol values 0-106 (106 is the stop)
pub const CODE128_PATTERNS: [&str; 107] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232", "2331112",
];

/// Start code A
pub const CODE128_START_A: u8 = 103;
/// Start code B
pub const CODE128_START_B: u8 = 104;
/// Start code C
pub const CODE128_START_C: u8 = 105;
/// Stop pattern
pub const CODE128_STOP: u8 = 106;
/// Switch to code set A (from B or C)
pub const CODE128_CODE_A: u8 = 101;
/// Switch to code set B (from A or C)
pub const CODE128_CODE_B: u8 = 100;
/// Switch to code set C (from A or B)
pub const CODE128_CODE_C: u8 = 99;
/// Single-character shift between A and B
pub const CODE128_SHIFT: u8 = 98;

/// Widths of a Code 128 symbol value as integers
pub fn code128_widths(value: u8) -> Vec<usize> {
    CODE128_PATTERNS[value as usize]
        .bytes()
        .map(|b| (b - b'0') as usize)
        .collect()
}

/// Symbol value whose widths equal `widths`
pub fn code128_value(widths: &[usize]) -> Option<u8> {
    CODE128_PATTERNS.iter().position(|p| {
        p.len() == widths.len() && p.bytes().zip(widths).all(|(b, &w)| (b - b'0') as usize == w)
    }).map(|v| v as u8)
}

/// Code 39 characters in value order with their wide-element masks
/// (nine elements, bar first; 1 = wide)
pub const CODE39_CHARS: [(u8, &str); 44] = [
    (b'0', "000110100"),
    (b'1', "100100001"),
    (b'2', "001100001"),
    (b'3', "101100000"),
    (b'4', "000110001"),
    (b'5', "100110000"),
    (b'6', "001110000"),
    (b'7', "000100101"),
    (b'8', "100100100"),
    (b'9', "001100100"),
    (b'A', "100001001"),
    (b'B', "001001001"),
    (b'C', "101001000"),
    (b'D', "000011001"),
    (b'E', "100011000"),
    (b'F', "001011000"),
    (b'G', "000001101"),
    (b'H', "100001100"),
    (b'I', "001001100"),
    (b'J', "000011100"),
    (b'K', "100000011"),
    (b'L', "001000011"),
    (b'M', "101000010"),
    (b'N', "000010011"),
    (b'O', "100010010"),
    (b'P', "001010010"),
    (b'Q', "000000111"),
    (b'R', "100000110"),
    (b'S', "001000110"),
    (b'T', "000010110"),
    (b'U', "110000001"),
    (b'V', "011000001"),
    (b'W', "111000000"),
    (b'X', "010010001"),
    (b'Y', "110010000"),
    (b'Z', "011010000"),
    (b'-', "010000101"),
    (b'.', "110000100"),
    (b' ', "011000100"),
    (b'$', "010101000"),
    (b'/', "010100010"),
    (b'+', "010001010"),
    (b'%', "000101010"),
    (b'*', "010010100"),
];

/// Modules per Code 39 character including the trailing gap
pub const CODE39_CHAR_MODULES: usize = 16;

/// Index of a Code 39 data character; lowercase folds to uppercase, `*` excluded
pub fn code39_value(byte: u8) -> Option<usize> {
    let upper = byte.to_ascii_uppercase();
    if upper == b'*' {
        return None;
    }
    CODE39_CHARS.iter().position(|&(c, _)| c == upper)
}

/// Fifteen modules of a Code 39 character (no gap)
pub fn code39_modules(index: usize) -> Vec<bool> {
    let mut out = Vec::with_capacity(15);
    for (i, wide) in CODE39_CHARS[index].1.bytes().enumerate() {
        let width = if wide == b'1' { WIDE } else { 1 };
        out.extend(std::iter::repeat_n(i % 2 == 0, width));
    }
    out
}

/// Codabar characters with their wide-element masks (seven elements, bar
/// first; 1 = wide). A to D only start and stop a symbol.
pub const CODABAR_CHARS: [(u8, &str); 20] = [
    (b'0', "0000011"),
    (b'1', "0000110"),
    (b'2', "0001001"),
    (b'3', "1100000"),
    (b'4', "0010010"),
    (b'5', "1000010"),
    (b'6', "0100001"),
    (b'7', "0100100"),
    (b'8', "0110000"),
    (b'9', "1001000"),
    (b'-', "0001100"),
    (b'$', "0011000"),
    (b':', "1000101"),
    (b'/', "1010001"),
    (b'.', "1010100"),
    (b'+', "0010101"),
    (b'A', "0011010"),
    (b'B', "0101001"),
    (b'C', "0001011"),
    (b'D', "0001110"),
];

/// Index of `A`, the start and stop of payloads given without either
pub const CODABAR_A: usize = 16;

/// Index of a Codabar character; lowercase start/stop letters fold to uppercase
pub fn codabar_value(byte: u8) -> Option<usize> {
    let upper = byte.to_ascii_uppercase();
    CODABAR_CHARS.iter().position(|&(c, _)| c == upper)
}

/// True for the start/stop characters A to D
pub fn is_codabar_guard(index: usize) -> bool {
    CODABAR_CHARS
        .get(index)
        .is_some_and(|&(c, _)| matches!(c, b'A'..=b'D'))
}

/// Modules of a Codabar character (no gap)
pub fn codabar_modules(index: usize) -> Vec<bool> {
    let mut out = Vec::with_capacity(13);
    for (i, wide) in CODABAR_CHARS[index].1.bytes().enumerate() {
        let width = if wide == b'1' { WIDE } else { 1 };
        out.extend(std::iter::repeat_n(i % 2 == 0, width));
    }
    out
}

/// ITF wide-element masks for digits 0-9 (five elements, 1 = wide)
pub const ITF_PATTERNS: [[u8; 5]; 10] = [
    [0, 0, 1, 1, 0],
    [1, 0, 0, 0, 1],
    [0, 1, 0, 0, 1],
    [1, 1, 0, 0, 0],
    [0, 0, 1, 0, 1],
    [1, 0, 1, 0, 0],
    [0, 1, 1, 0, 0],
    [0, 0, 0, 1, 1],
    [1, 0, 0, 1, 0],
    [0, 1, 0, 1, 0],
];

/// ITF start pattern (narrow bar, space, bar, space)
pub const ITF_START: [bool; 4] = [true, false, true, false];
/// ITF stop pattern (wide bar, narrow space, narrow bar)
pub const ITF_STOP: [bool; 5] = [true, true, true, false, true];

/// Digit whose ITF mask equals `mask`
pub fn itf_digit(mask: &[u8]) -> Option<u8> {
    ITF_PATTERNS
        .iter()
        .position(|p| p[..] == *mask)
        .map(|d| d as u8)
}
