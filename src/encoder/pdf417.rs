//! PDF417 encoder: text, byte and numeric compaction, Reed-Solomon parity
//! over GF(929) and row drawing with cluster patterns and row indicators.

use crate::config::EncodeOptions;
use crate::ecc::{PDF417_FIELD, ReedSolomon};
use crate::error::{BarcodeError, Result};
use crate::format::FormatSpec;
use crate::format::pdf417::{
    ALPHA_SHIFT, BYTE_LATCH, BYTE_LATCH_6, BYTE_SHIFT, LATCH_ALPHA, LATCH_LOWER, LATCH_MIXED,
    MAX_CODEWORDS, MIXED_CHARS, NUMERIC_LATCH, PAD, PUNCT_CHARS, PUNCT_LATCH, PUNCT_SHIFT,
    PUNCT_TO_ALPHA, ROW_HEIGHT, SPACE, START, STOP, TEXT_LATCH, default_level, dimensions,
    ecc_count, patterns, row_indicators, symbol_width,
};
use crate::models::{BitMatrix, ModuleMatrix};
use log::debug;

/// Digit run length that switches to numeric compaction
const MIN_NUMERIC_RUN: usize = 13;
/// Text run length worth a latch out of byte compaction
const MIN_TEXT_RUN: usize = 5;
/// Digits packed into one numeric group
const NUMERIC_GROUP: usize = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compaction {
    Text,
    Byte,
    Numeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Submode {
    Alpha,
    Lower,
    Mixed,
    Punct,
}

/// Build a PDF417 symbol for `payload`
pub fn encode(payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
    spec.check_length(payload.len())?;
    let data = high_level(payload);
    let level = options
        .pdf417_ec_level
        .unwrap_or_else(|| default_level(data.len()));
    let ecc = ecc_count(level);
    let too_large = || BarcodeError::PayloadTooLarge {
        symbology: spec.symbology,
        len: data.len(),
        max: MAX_CODEWORDS.saturating_sub(1 + ecc),
    };
    let (cols, rows) = dimensions(1 + data.len() + ecc).ok_or_else(too_large)?;
    let data_len = rows * cols - ecc;
    debug!(
        "pdf417: {} data codewords, level {level}, {rows} rows x {cols} cols",
        data.len()
    );

    let mut codewords = Vec::with_capacity(rows * cols);
    codewords.push(data_len as u16);
    codewords.extend_from_slice(&data);
    codewords.resize(data_len, PAD);
    let parity = ReedSolomon::new(&PDF417_FIELD).encode(&codewords, ecc);
    codewords.extend(parity);

    let m = draw(&codewords, rows, cols, level)?;
    ModuleMatrix::from_bit_matrix(&m)
        .with_quiet_zone(spec.quiet_zone)
        .finish()
}

fn draw(codewords: &[u16], rows: usize, cols: usize, level: u8) -> Result<BitMatrix> {
    let table = patterns();
    let mut m = BitMatrix::new(symbol_width(cols), rows * ROW_HEIGHT);
    for row in 0..rows {
        let cluster = row % 3;
        let (left, right) = row_indicators(row, rows, cols, level);
        let mut elements: Vec<u8> = START.to_vec();
        let values = std::iter::once(left)
            .chain(codewords[row * cols..(row + 1) * cols].iter().copied())
            .chain(std::iter::once(right));
        for value in values {
            let widths = table
                .widths(cluster, value)
                .ok_or_else(|| BarcodeError::malformed(format!("codeword {value} out of range")))?;
            elements.extend_from_slice(&widths);
        }
        elements.extend_from_slice(&STOP);

        let mut x = 0;
        for (i, &w) in elements.iter().enumerate() {
            if i % 2 == 0 {
                for dx in 0..w as usize {
                    for dy in 0..ROW_HEIGHT {
                        m.set(x + dx, row * ROW_HEIGHT + dy, true);
                    }
                }
            }
            x += w as usize;
        }
    }
    Ok(m)
}

fn is_text(b: u8) -> bool {
    matches!(b, b' '..=b'~' | b'\t' | b'\n' | b'\r')
}

fn is_upper(b: u8) -> bool {
    b == b' ' || b.is_ascii_uppercase()
}

fn is_lower(b: u8) -> bool {
    b == b' ' || b.is_ascii_lowercase()
}

fn mixed_value(b: u8) -> Option<u8> {
    if b == b' ' {
        return Some(SPACE);
    }
    MIXED_CHARS.iter().position(|&c| c == b).map(|p| p as u8)
}

fn punct_value(b: u8) -> Option<u8> {
    PUNCT_CHARS.iter().position(|&c| c == b).map(|p| p as u8)
}

fn alpha_value(b: u8, base: u8) -> u8 {
    if b == b' ' { SPACE } else { b - base }
}

fn digit_run(s: &[u8]) -> usize {
    s.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Text characters ahead of the next long digit run
fn text_run(s: &[u8]) -> usize {
    let mut i = 0;
    while i < s.len() && is_text(s[i]) && digit_run(&s[i..]) < MIN_NUMERIC_RUN {
        i += 1;
    }
    i
}

/// Bytes ahead of the next long digit or text run
fn binary_run(s: &[u8]) -> usize {
    let mut i = 0;
    while i < s.len() {
        let text_ahead = s[i..].iter().take(MIN_TEXT_RUN).take_while(|&&b| is_text(b)).count();
        if digit_run(&s[i..]) >= MIN_NUMERIC_RUN || text_ahead >= MIN_TEXT_RUN {
            break;
        }
        i += 1;
    }
    i
}

/// Data codewords for `payload`, starting in text compaction
pub(crate) fn high_level(payload: &[u8]) -> Vec<u16> {
    let mut out = Vec::new();
    let mut mode = Compaction::Text;
    let mut submode = Submode::Alpha;
    let mut p = 0;
    while p < payload.len() {
        let rest = &payload[p..];
        let digits = digit_run(rest);
        if digits >= MIN_NUMERIC_RUN {
            out.push(NUMERIC_LATCH);
            mode = Compaction::Numeric;
            encode_numeric(&rest[..digits], &mut out);
            p += digits;
            continue;
        }
        let text = text_run(rest);
        if text >= MIN_TEXT_RUN || (text > 0 && text == rest.len()) {
            if mode != Compaction::Text {
                out.push(TEXT_LATCH);
                mode = Compaction::Text;
                submode = Submode::Alpha;
            }
            submode = encode_text(&rest[..text], submode, &mut out);
            p += text;
            continue;
        }
        let bytes = binary_run(rest).max(1);
        if bytes == 1 && mode == Compaction::Text {
            out.push(BYTE_SHIFT);
            out.push(rest[0].into());
        } else {
            encode_bytes(&rest[..bytes], &mut out);
            mode = Compaction::Byte;
        }
        p += bytes;
    }
    out
}

/// Text compaction: submode values packed two per codeword. Returns the
/// submode in force at the end.
fn encode_text(text: &[u8], mut submode: Submode, out: &mut Vec<u16>) -> Submode {
    let mut values: Vec<u8> = Vec::with_capacity(text.len() * 2);
    let mut i = 0;
    while i < text.len() {
        let ch = text[i];
        match submode {
            Submode::Alpha => {
                if is_upper(ch) {
                    values.push(alpha_value(ch, b'A'));
                    i += 1;
                } else if is_lower(ch) {
                    values.push(LATCH_LOWER);
                    submode = Submode::Lower;
                } else if mixed_value(ch).is_some() {
                    values.push(LATCH_MIXED);
                    submode = Submode::Mixed;
                } else {
                    push_punct_shift(ch, &mut values);
                    i += 1;
                }
            }
            Submode::Lower => {
                if is_lower(ch) {
                    values.push(alpha_value(ch, b'a'));
                    i += 1;
                } else if is_upper(ch) {
                    values.push(ALPHA_SHIFT);
                    values.push(alpha_value(ch, b'A'));
                    i += 1;
                } else if mixed_value(ch).is_some() {
                    values.push(LATCH_MIXED);
                    submode = Submode::Mixed;
                } else {
                    push_punct_shift(ch, &mut values);
                    i += 1;
                }
            }
            Submode::Mixed => {
                if let Some(v) = mixed_value(ch) {
                    values.push(v);
                    i += 1;
                } else if is_upper(ch) {
                    values.push(LATCH_ALPHA);
                    submode = Submode::Alpha;
                } else if is_lower(ch) {
                    values.push(LATCH_LOWER);
                    submode = Submode::Lower;
                } else if text.get(i + 1).is_some_and(|&n| punct_value(n).is_some()) {
                    values.push(PUNCT_LATCH);
                    submode = Submode::Punct;
                } else {
                    push_punct_shift(ch, &mut values);
                    i += 1;
                }
            }
            Submode::Punct => {
                if let Some(v) = punct_value(ch) {
                    values.push(v);
                    i += 1;
                } else {
                    values.push(PUNCT_TO_ALPHA);
                    submode = Submode::Alpha;
                }
            }
        }
    }
    if values.len() % 2 == 1 {
        // In the punctuation submode the filler doubles as the latch to alpha
        if submode == Submode::Punct {
            submode = Submode::Alpha;
        }
        values.push(PUNCT_SHIFT);
    }
    out.extend(
        values
            .chunks(2)
            .map(|pair| 30 * u16::from(pair[0]) + u16::from(pair[1])),
    );
    submode
}

fn push_punct_shift(ch: u8, values: &mut Vec<u8>) {
    if let Some(v) = punct_value(ch) {
        values.push(PUNCT_SHIFT);
        values.push(v);
    }
}

/// Byte compaction: six bytes to five base-900 codewords, leftovers one
/// codeword each
fn encode_bytes(bytes: &[u8], out: &mut Vec<u16>) {
    out.push(if bytes.len() % 6 == 0 {
        BYTE_LATCH_6
    } else {
        BYTE_LATCH
    });
    for chunk in bytes.chunks(6) {
        if chunk.len() == 6 {
            let mut value = chunk.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
            let mut group = [0u16; 5];
            for slot in group.iter_mut().rev() {
                *slot = (value % 900) as u16;
                value /= 900;
            }
            out.extend_from_slice(&group);
        } else {
            out.extend(chunk.iter().map(|&b| u16::from(b)));
        }
    }
}

/// Numeric compaction: groups of up to 44 digits, each prefixed with 1 and
/// converted to base 900
fn encode_numeric(digits: &[u8], out: &mut Vec<u16>) {
    for chunk in digits.chunks(NUMERIC_GROUP) {
        let mut decimal: Vec<u32> = std::iter::once(1)
            .chain(chunk.iter().map(|&d| u32::from(d - b'0')))
            .collect();
        let mut group = Vec::new();
        while !decimal.is_empty() {
            let mut remainder = 0u32;
            for d in decimal.iter_mut() {
                let current = remainder * 10 + *d;
                *d = current / 900;
                remainder = current % 900;
            }
            group.push(remainder as u16);
            let leading = decimal.iter().take_while(|&&d| d == 0).count();
            decimal.drain(..leading);
        }
        out.extend(group.into_iter().rev());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::format::lookup;
    use crate::format::pdf417::{CODEWORD_MODULES, MAX_ROWS};
    use crate::models::Symbology;

    #[test]
    fn test_text_pairs() {
        // "AB": 0, 1
        assert_eq!(high_level(b"AB"), vec![1]);
        // "Ab": A, LL, b, PS filler
        assert_eq!(high_level(b"Ab"), vec![27, 30 + 29]);
        // "ab1": LL a, b ML, 1 PS
        assert_eq!(high_level(b"ab1"), vec![27 * 30, 30 + 28, 30 + 29]);
    }

    #[test]
    fn test_alpha_shift_and_punctuation() {
        // "aB": LL a, AS B
        assert_eq!(high_level(b"aB"), vec![27 * 30, 27 * 30 + 1]);
        // "A;": A PS, ; PS filler
        assert_eq!(high_level(b"A;"), vec![29, 29]);
    }

    #[test]
    fn test_numeric_compaction() {
        let cw = high_level(b"0000000000000");
        assert_eq!(cw[0], NUMERIC_LATCH);
        // 10^13 in base 900
        let value = cw[1..].iter().fold(0u64, |acc, &c| acc * 900 + u64::from(c));
        assert_eq!(value, 10u64.pow(13));
    }

    #[test]
    fn test_byte_compaction() {
        let mut out = Vec::new();
        encode_bytes(&[0, 0, 0, 0, 1, 0], &mut out);
        assert_eq!(out, vec![BYTE_LATCH_6, 0, 0, 0, 0, 256]);
        let mut out = Vec::new();
        encode_bytes(&[0xFF, 0x80], &mut out);
        assert_eq!(out, vec![BYTE_LATCH, 255, 128]);
    }

    #[test]
    fn test_byte_shift_inside_text() {
        let cw = high_level(b"Hello\x80World");
        assert!(cw.contains(&BYTE_SHIFT));
        assert!(!cw.contains(&BYTE_LATCH));
    }

    #[test]
    fn test_symbol_geometry() {
        let spec = lookup(Symbology::Pdf417);
        let m = encode(b"PDF417 test", spec, &EncodeOptions::default()).unwrap();
        assert_eq!(m.quiet_zone(), 2);
        assert_eq!((m.width() - 1) % CODEWORD_MODULES, 0);
        assert_eq!(m.height() % ROW_HEIGHT, 0);
        let rows = m.height() / ROW_HEIGHT;
        assert!((3..=MAX_ROWS).contains(&rows));
        // Start pattern: eight dark modules then a light one
        let bits = m.to_bit_matrix();
        assert!((0..8).all(|x| bits.get(x, 0)));
        assert!(!bits.get(8, 0));
    }

    #[test]
    fn test_explicit_level_and_too_large() {
        let spec = lookup(Symbology::Pdf417);
        let opts = EncodeOptions {
            pdf417_ec_level: Some(8),
            ..EncodeOptions::default()
        };
        let err = encode(&[0xAB; 600], spec, &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
        let err = encode(&[0xAB; 1200], spec, &EncodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
        let err = encode(b"", spec, &EncodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    }
}
