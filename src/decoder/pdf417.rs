//! PDF417 decoder: symbol characters from scan-line runs, row assembly by
//! row indicator, Reed-Solomon correction and the compaction modes.

use crate::config::DecodeConfig;
use crate::ecc::{PDF417_FIELD, ReedSolomon};
use crate::error::{BarcodeError, Result};
use crate::format::pdf417::{
    BYTE_LATCH, BYTE_LATCH_6, BYTE_SHIFT, CODEWORD_MODULES, IndicatorField, MAX_COLS, MAX_ROWS,
    MIN_ROWS, MIXED_CHARS, NUMERIC_LATCH, PUNCT_CHARS, PatternTable, START, TEXT_LATCH, ecc_count,
    parse_indicator, patterns,
};
use crate::models::{BitMatrix, DecodeResult, SymbolSize, Symbology};
use crate::sampler::{Sampled, SampledLine, SamplingGrid, sample};
use log::{debug, trace};
use std::collections::HashMap;

/// Bar width, in modules, above which a run starts the stop pattern
const STOP_BAR: f32 = 6.5;
/// Codewords per numeric compaction group
const NUMERIC_GROUP_CODEWORDS: usize = 15;

/// Sample the scan lines of `grid` and decode the symbol
pub fn decode(binary: &BitMatrix, grid: &SamplingGrid, _config: &DecodeConfig) -> Result<DecodeResult> {
    let Sampled::Stacked(lines) = sample(binary, grid) else {
        return Err(BarcodeError::malformed("pdf417 decoder needs scan lines"));
    };
    decode_lines(&lines)
}

/// Symbol characters read along one scan line
#[derive(Debug, Clone, PartialEq)]
struct LineRead {
    row: usize,
    cluster: usize,
    fields: Vec<IndicatorField>,
    data: Vec<Option<u16>>,
}

/// Module widths of eight runs scaled to one symbol character
fn normalise(runs: &[usize]) -> Option<[u8; 8]> {
    let total: usize = runs.iter().sum();
    if total == 0 {
        return None;
    }
    let unit = total as f32 / CODEWORD_MODULES as f32;
    let mut widths = [0u8; 8];
    for (w, &r) in widths.iter_mut().zip(runs) {
        *w = (r as f32 / unit).round().clamp(1.0, 8.0) as u8;
    }
    let sum: usize = widths.iter().map(|&w| w as usize).sum();
    (sum == CODEWORD_MODULES).then_some(widths)
}

fn read_line(line: &SampledLine, table: &PatternTable) -> Option<LineRead> {
    let runs = &line.runs;
    if runs.len() < 8 || normalise(&runs[..8]) != Some(START) {
        return None;
    }
    let mut chars: Vec<Option<(usize, u16)>> = Vec::new();
    let mut i = 8;
    while i + 8 <= runs.len() {
        if runs[i] as f32 / line.unit >= STOP_BAR {
            break;
        }
        chars.push(normalise(&runs[i..i + 8]).and_then(|w| table.lookup(&w)));
        i += 8;
    }
    if chars.len() < 3 {
        return None;
    }

    let mut counts = [0usize; 3];
    for (cluster, _) in chars.iter().flatten() {
        counts[*cluster] += 1;
    }
    let cluster = (0..3).max_by_key(|&c| counts[c])?;
    let in_cluster = |c: &Option<(usize, u16)>| c.filter(|(k, _)| *k == cluster).map(|(_, v)| v);

    let left = in_cluster(&chars[0]);
    let right = in_cluster(&chars[chars.len() - 1]);
    let mut row = None;
    let mut fields = Vec::with_capacity(2);
    for (value, is_left) in [(left, true), (right, false)] {
        if let Some(v) = value {
            let (r, field) = parse_indicator(v, cluster, is_left);
            row.get_or_insert(r);
            if row == Some(r) {
                fields.push(field);
            }
        }
    }
    let data = chars[1..chars.len() - 1].iter().map(in_cluster).collect();
    Some(LineRead {
        row: row?,
        cluster,
        fields,
        data,
    })
}

fn most_common<T: Copy + Eq + std::hash::Hash>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_default() += 1;
    }
    counts.into_iter().max_by_key(|&(_, n)| n).map(|(v, _)| v)
}

/// Assemble codeword rows from scan lines, correct and decode them
fn decode_lines(lines: &[SampledLine]) -> Result<DecodeResult> {
    let table = patterns();
    let reads: Vec<LineRead> = lines.iter().filter_map(|l| read_line(l, table)).collect();
    if reads.is_empty() {
        return Err(BarcodeError::malformed("no readable pdf417 rows"));
    }

    let fields: Vec<IndicatorField> = reads.iter().flat_map(|r| r.fields.iter().copied()).collect();
    let rows_high = most_common(fields.iter().filter_map(|f| match f {
        IndicatorField::RowsHigh(v) => Some(*v),
        _ => None,
    }));
    let level_low = most_common(fields.iter().filter_map(|f| match f {
        IndicatorField::LevelRowsLow(l, v) => Some((*l, *v)),
        _ => None,
    }));
    let cols = most_common(fields.iter().filter_map(|f| match f {
        IndicatorField::Cols(v) => Some(*v + 1),
        _ => None,
    }))
    .or_else(|| most_common(reads.iter().map(|r| r.data.len())));
    let (Some(rows_high), Some((level, rows_low)), Some(cols)) = (rows_high, level_low, cols) else {
        return Err(BarcodeError::malformed("row indicators incomplete"));
    };
    let rows = rows_high * 3 + rows_low + 1;
    if !(MIN_ROWS..=MAX_ROWS).contains(&rows) || !(1..=MAX_COLS).contains(&cols) || level > 8 {
        return Err(BarcodeError::malformed(format!(
            "row indicators give {rows} rows, {cols} columns, level {level}"
        )));
    }
    trace!("pdf417: {rows} rows x {cols} cols, level {level}, {} lines", reads.len());

    let mut codewords = vec![0u16; rows * cols];
    let mut missing = 0;
    for row in 0..rows {
        let row_reads: Vec<&LineRead> = reads
            .iter()
            .filter(|r| r.row == row && r.cluster == row % 3 && r.data.len() == cols)
            .collect();
        for col in 0..cols {
            match most_common(row_reads.iter().filter_map(|r| r.data[col])) {
                Some(v) => codewords[row * cols + col] = v,
                None => missing += 1,
            }
        }
    }

    let ecc = ecc_count(level);
    if ecc >= codewords.len() {
        return Err(BarcodeError::malformed(format!(
            "{ecc} parity codewords in a {}-codeword symbol",
            codewords.len()
        )));
    }
    let corrected = ReedSolomon::new(&PDF417_FIELD).decode(&mut codewords, ecc)?;
    let length = codewords[0] as usize;
    if length == 0 || length > codewords.len() - ecc {
        return Err(BarcodeError::malformed(format!(
            "length descriptor {length} outside 1..={}",
            codewords.len() - ecc
        )));
    }
    let payload = decode_codewords(&codewords[1..length])?;
    debug!(
        "pdf417: {} bytes, {corrected} codewords corrected, {missing} unread",
        payload.len()
    );
    Ok(DecodeResult::new(
        Symbology::Pdf417,
        payload,
        SymbolSize::Pdf417 {
            rows,
            cols,
            ec_level: level,
        },
    )
    .with_errors(corrected))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Submode {
    Alpha,
    Lower,
    Mixed,
    Punct,
    AlphaShift,
    PunctShift,
}

/// Text compaction state carried across byte shifts
#[derive(Debug, Clone, Copy)]
struct TextState {
    submode: Submode,
    prior: Submode,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            submode: Submode::Alpha,
            prior: Submode::Alpha,
        }
    }
}

impl TextState {
    fn shift(&mut self, to: Submode) {
        self.prior = self.submode;
        self.submode = to;
    }

    fn push(&mut self, value: u8, out: &mut Vec<u8>) {
        match (self.submode, value) {
            (Submode::Alpha, 0..=25) => out.push(b'A' + value),
            (Submode::Lower, 0..=25) => out.push(b'a' + value),
            (Submode::Mixed, 0..=24) => out.push(MIXED_CHARS[value as usize]),
            (Submode::Alpha | Submode::Lower | Submode::Mixed, 26) => out.push(b' '),
            (Submode::Alpha, 27) | (Submode::Mixed, 27) => self.submode = Submode::Lower,
            (Submode::Alpha, 28) | (Submode::Lower, 28) => self.submode = Submode::Mixed,
            (Submode::Mixed, 28) => self.submode = Submode::Alpha,
            (Submode::Mixed, 25) => self.submode = Submode::Punct,
            (Submode::Lower, 27) => self.shift(Submode::AlphaShift),
            (Submode::Alpha | Submode::Lower | Submode::Mixed, 29) => self.shift(Submode::PunctShift),
            (Submode::Punct, 0..=28) => out.push(PUNCT_CHARS[value as usize]),
            (Submode::Punct, _) => self.submode = Submode::Alpha,
            (Submode::AlphaShift, _) => {
                self.submode = self.prior;
                match value {
                    0..=25 => out.push(b'A' + value),
                    26 => out.push(b' '),
                    _ => {}
                }
            }
            (Submode::PunctShift, _) => {
                self.submode = self.prior;
                match value {
                    0..=28 => out.push(PUNCT_CHARS[value as usize]),
                    _ => self.submode = Submode::Alpha,
                }
            }
            _ => {}
        }
    }

    /// A punctuation shift directly before a byte shift is padding
    fn byte_shift(&mut self) {
        if self.submode == Submode::PunctShift {
            self.submode = self.prior;
        }
    }
}

/// Index of the next mode codeword at or after `from`
fn run_end(data: &[u16], from: usize) -> usize {
    data[from..]
        .iter()
        .position(|&c| c >= TEXT_LATCH)
        .map_or(data.len(), |p| from + p)
}

/// Run the compaction modes over the data codewords
fn decode_codewords(data: &[u16]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut text = TextState::default();
    let mut i = 0;
    while i < data.len() {
        let cw = data[i];
        match cw {
            0..=899 => {
                text.push((cw / 30) as u8, &mut out);
                text.push((cw % 30) as u8, &mut out);
                i += 1;
            }
            TEXT_LATCH => {
                text = TextState::default();
                i += 1;
            }
            BYTE_LATCH | BYTE_LATCH_6 => {
                let end = run_end(data, i + 1);
                decode_bytes(&data[i + 1..end], cw == BYTE_LATCH_6, &mut out)?;
                i = end;
            }
            NUMERIC_LATCH => {
                let end = run_end(data, i + 1);
                decode_numeric(&data[i + 1..end], &mut out)?;
                i = end;
            }
            BYTE_SHIFT => {
                let value = *data
                    .get(i + 1)
                    .ok_or_else(|| BarcodeError::malformed("byte shift at end of data"))?;
                let byte = u8::try_from(value)
                    .map_err(|_| BarcodeError::malformed(format!("shifted byte {value}")))?;
                text.byte_shift();
                out.push(byte);
                i += 2;
            }
            // ECI designators: one or two parameter codewords, ignored
            925 | 927 => i += 2,
            926 => i += 3,
            _ => {
                return Err(BarcodeError::malformed(format!(
                    "unsupported codeword {cw} at {i}"
                )));
            }
        }
    }
    Ok(out)
}

/// Byte compaction run. With codeword 901 the final group (up to five
/// codewords) carries one byte per codeword.
fn decode_bytes(run: &[u16], multiple_of_six: bool, out: &mut Vec<u8>) -> Result<()> {
    let groups = if multiple_of_six {
        if run.len() % 5 != 0 {
            return Err(BarcodeError::malformed(format!(
                "{} codewords after byte latch 924",
                run.len()
            )));
        }
        run.len() / 5
    } else {
        run.len().saturating_sub(1) / 5
    };
    for group in run[..groups * 5].chunks(5) {
        let value = group.iter().fold(0u64, |acc, &c| acc * 900 + u64::from(c));
        if value >= 1 << 48 {
            return Err(BarcodeError::malformed("byte group exceeds six bytes"));
        }
        out.extend((0..6).rev().map(|i| (value >> (8 * i)) as u8));
    }
    for &c in &run[groups * 5..] {
        let byte = u8::try_from(c).map_err(|_| BarcodeError::malformed(format!("byte codeword {c}")))?;
        out.push(byte);
    }
    Ok(())
}

/// Numeric compaction run: base-900 groups back to decimal, dropping the
/// leading 1 of each
fn decode_numeric(run: &[u16], out: &mut Vec<u8>) -> Result<()> {
    for group in run.chunks(NUMERIC_GROUP_CODEWORDS) {
        // Little-endian decimal digits
        let mut decimal: Vec<u32> = Vec::new();
        for &c in group {
            let mut carry = u32::from(c);
            for d in decimal.iter_mut() {
                let v = *d * 900 + carry;
                *d = v % 10;
                carry = v / 10;
            }
            while carry > 0 {
                decimal.push(carry % 10);
                carry /= 10;
            }
        }
        if decimal.last() != Some(&1) {
            return Err(BarcodeError::malformed("numeric group without leading 1"));
        }
        out.extend(decimal.iter().rev().skip(1).map(|&d| b'0' + d as u8));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncodeOptions;
    use crate::encoder::pdf417::high_level;
    use crate::error::ErrorKind;
    use crate::format::lookup;
    use crate::format::pdf417::ROW_HEIGHT;
    use crate::sampler::ScanLine;

    fn symbol(payload: &[u8], options: &EncodeOptions) -> BitMatrix {
        let spec = lookup(Symbology::Pdf417);
        spec.codec.encode(payload, spec, options).unwrap().to_bit_matrix()
    }

    /// Scaled copy with a light margin and one scan line per pixel row
    fn scanned(m: &BitMatrix, scale: usize) -> (BitMatrix, SamplingGrid) {
        let margin = 4;
        let mut img = BitMatrix::new((m.width() + 2 * margin) * scale, (m.height() + 2 * margin) * scale);
        for y in 0..img.height() {
            for x in 0..img.width() {
                let (mx, my) = (x / scale, y / scale);
                if mx >= margin && my >= margin && m.get(mx - margin, my - margin) {
                    img.set(x, y, true);
                }
            }
        }
        let lines = (margin * scale..(margin + m.height()) * scale)
            .map(|y| ScanLine {
                y,
                x_start: margin * scale,
                unit: scale as f32,
            })
            .collect();
        (img, SamplingGrid::Stacked { lines })
    }

    fn round_trip(payload: &[u8]) -> DecodeResult {
        let m = symbol(payload, &EncodeOptions::default());
        let (img, grid) = scanned(&m, 2);
        decode(&img, &grid, &DecodeConfig::default()).unwrap()
    }

    #[test]
    fn test_round_trips() {
        let payloads: [&[u8]; 6] = [
            b"PDF417",
            b"Hello, World! mixed Case 123 (ok?)",
            b"\x00\x01\x02\xfe\xff binary and text",
            b"12345678901234567890123456789012345678901234567890",
            b"Tab\there\r\nnew line; {braces} 'quotes' \"double\"",
            b"abc\x80def",
        ];
        for payload in payloads {
            assert_eq!(round_trip(payload).payload, payload);
        }
    }

    #[test]
    fn test_reports_geometry() {
        let result = round_trip(b"geometry");
        let SymbolSize::Pdf417 { rows, cols, ec_level } = result.size else {
            panic!("{:?}", result.size);
        };
        assert_eq!(ec_level, 2);
        assert!(rows >= 3 && cols >= 1);
    }

    #[test]
    fn test_level_option() {
        let opts = EncodeOptions {
            pdf417_ec_level: Some(5),
            ..EncodeOptions::default()
        };
        let m = symbol(b"level five", &opts);
        let (img, grid) = scanned(&m, 1);
        let result = decode(&img, &grid, &DecodeConfig::default()).unwrap();
        assert_eq!(result.payload, b"level five");
        assert!(matches!(result.size, SymbolSize::Pdf417 { ec_level: 5, .. }));
    }

    #[test]
    fn test_corrects_damaged_row() {
        let mut m = symbol(b"damage on one row", &EncodeOptions::default());
        // Swap bar and space inside the first data codeword of row 0
        for y in 0..ROW_HEIGHT {
            for x in 34..40 {
                m.toggle(x, y);
            }
        }
        let (img, grid) = scanned(&m, 2);
        let result = decode(&img, &grid, &DecodeConfig::default()).unwrap();
        assert_eq!(result.payload, b"damage on one row");
        assert!(result.errors_corrected >= 1);
    }

    #[test]
    fn test_text_state_machine() {
        let decode_text = |payload: &[u8]| decode_codewords(&high_level(payload)).unwrap();
        assert_eq!(decode_text(b"aB"), b"aB");
        assert_eq!(decode_text(b"A;"), b"A;");
        assert_eq!(decode_text(b"x1;;;y"), b"x1;;;y");
        assert_eq!(decode_text(b"Hello\x80World"), b"Hello\x80World");
    }

    #[test]
    fn test_byte_groups() {
        let mut out = Vec::new();
        decode_bytes(&[0, 0, 0, 0, 256], true, &mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0, 1, 0]);
        let mut out = Vec::new();
        decode_bytes(&[1, 2, 3, 4, 5], false, &mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
        let err = decode_bytes(&[1, 2, 3], true, &mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBitstream);
    }

    #[test]
    fn test_numeric_group() {
        // 1 followed by "00": 100
        let mut out = Vec::new();
        decode_numeric(&[100], &mut out).unwrap();
        assert_eq!(out, b"00");
        let err = decode_numeric(&[200], &mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBitstream);
    }

    #[test]
    fn test_macro_codewords_rejected() {
        let err = decode_codewords(&[928, 1, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBitstream);
    }
}
