//! QR Code encoder: single-segment bit stream, block interleaving, module
//! placement and mask selection.

use crate::config::EncodeOptions;
use crate::ecc::{QR_CODE_FIELD_256, ReedSolomon};
use crate::error::{BarcodeError, Result};
use crate::format::FormatSpec;
use crate::format::qr::{
    Mode, alignment_centers, alphanumeric_value, data_positions, ec_blocks, format_bits,
    format_positions, function_mask, version_bits, version_positions,
};
use crate::models::{BitMatrix, ECLevel, MaskPattern, ModuleMatrix, Version};
use crate::utils::bits::BitWriter;
use log::debug;

/// Build the QR symbol for `payload`
pub fn encode(payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
    spec.check_length(payload.len())?;
    let level = options.qr_ec_level;
    let mode = choose_mode(payload);
    let min_version = options.qr_min_version.unwrap_or(Version::MIN);

    let version = (min_version.number()..=Version::MAX.number())
        .filter_map(Version::new)
        .find(|&v| fits(mode, payload.len(), v, level))
        .ok_or_else(|| BarcodeError::PayloadTooLarge {
            symbology: spec.symbology,
            len: payload.len(),
            max: capacity(mode, Version::MAX, level),
        })?;
    debug!(
        "qr: {} bytes as {:?} in version {} level {:?}",
        payload.len(),
        mode,
        version.number(),
        level
    );

    let data = data_codewords(payload, mode, version, level)?;
    let codewords = add_error_correction(&data, version, level)?;
    let symbol = build_symbol(&codewords, version, level);
    ModuleMatrix::from_bit_matrix(&symbol)
        .with_quiet_zone(spec.quiet_zone)
        .finish()
}

/// Most compact single mode that covers every byte
pub(crate) fn choose_mode(payload: &[u8]) -> Mode {
    if payload.iter().all(u8::is_ascii_digit) {
        Mode::Numeric
    } else if payload.iter().all(|&b| alphanumeric_value(b).is_some()) {
        Mode::Alphanumeric
    } else {
        Mode::Byte
    }
}

fn data_bits(mode: Mode, len: usize) -> usize {
    match mode {
        Mode::Numeric => 10 * (len / 3) + [0, 4, 7][len % 3],
        Mode::Alphanumeric => 11 * (len / 2) + 6 * (len % 2),
        Mode::Byte => 8 * len,
        Mode::Kanji => 13 * len,
    }
}

fn fits(mode: Mode, len: usize, version: Version, level: ECLevel) -> bool {
    let Some(blocks) = ec_blocks(version, level) else {
        return false;
    };
    let count_bits = mode.count_bits(version);
    len < (1 << count_bits) && 4 + count_bits + data_bits(mode, len) <= blocks.data_codewords() * 8
}

/// Characters of `mode` that fit in `version` at `level`
fn capacity(mode: Mode, version: Version, level: ECLevel) -> usize {
    let Some(blocks) = ec_blocks(version, level) else {
        return 0;
    };
    let bits = (blocks.data_codewords() * 8).saturating_sub(4 + mode.count_bits(version));
    match mode {
        Mode::Numeric => bits / 10 * 3 + [0, 0, 0, 0, 1, 1, 1, 2, 2, 2][bits % 10],
        Mode::Alphanumeric => bits / 11 * 2 + usize::from(bits % 11 >= 6),
        Mode::Byte => bits / 8,
        Mode::Kanji => bits / 13,
    }
}

fn data_codewords(payload: &[u8], mode: Mode, version: Version, level: ECLevel) -> Result<Vec<u8>> {
    let capacity_bits = ec_blocks(version, level)
        .map(|b| b.data_codewords() * 8)
        .ok_or_else(|| BarcodeError::malformed("no block table for version"))?;

    let mut bits = BitWriter::new();
    bits.push(mode.indicator(), 4);
    bits.push(payload.len() as u32, mode.count_bits(version));
    match mode {
        Mode::Numeric => {
            for chunk in payload.chunks(3) {
                let value = chunk
                    .iter()
                    .fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0'));
                bits.push(value, chunk.len() * 3 + 1);
            }
        }
        Mode::Alphanumeric => {
            for chunk in payload.chunks(2) {
                let value = chunk
                    .iter()
                    .filter_map(|&b| alphanumeric_value(b))
                    .fold(0u32, |acc, v| acc * 45 + v);
                bits.push(value, if chunk.len() == 2 { 11 } else { 6 });
            }
        }
        Mode::Byte | Mode::Kanji => {
            for &b in payload {
                bits.push(u32::from(b), 8);
            }
        }
    }

    let terminator = (capacity_bits - bits.len()).min(4);
    bits.push(0, terminator);
    let pad = (8 - bits.len() % 8) % 8;
    bits.push(0, pad);

    let mut codewords = bits.to_bytes();
    for pad in [0xEC, 0x11].into_iter().cycle() {
        if codewords.len() * 8 >= capacity_bits {
            break;
        }
        codewords.push(pad);
    }
    Ok(codewords)
}

/// Split into blocks, append parity and interleave
fn add_error_correction(data: &[u8], version: Version, level: ECLevel) -> Result<Vec<u8>> {
    let blocks = ec_blocks(version, level)
        .ok_or_else(|| BarcodeError::malformed("no block table for version"))?;
    let rs = ReedSolomon::new(&QR_CODE_FIELD_256);

    let mut data_blocks = Vec::with_capacity(blocks.num_blocks);
    let mut ecc_blocks = Vec::with_capacity(blocks.num_blocks);
    let mut offset = 0;
    for b in 0..blocks.num_blocks {
        let len = blocks.block_data_len(b);
        let block = &data[offset..offset + len];
        ecc_blocks.push(rs.encode_bytes(block, blocks.ecc_per_block));
        data_blocks.push(block);
        offset += len;
    }

    let mut out = Vec::with_capacity(blocks.total_codewords);
    for i in 0..blocks.short_block_data() + 1 {
        for block in &data_blocks {
            if let Some(&cw) = block.get(i) {
                out.push(cw);
            }
        }
    }
    for i in 0..blocks.ecc_per_block {
        for block in &ecc_blocks {
            out.push(block[i]);
        }
    }
    Ok(out)
}

fn build_symbol(codewords: &[u8], version: Version, level: ECLevel) -> BitMatrix {
    let size = version.size();
    let function = function_mask(version);
    let mut modules = BitMatrix::square(size);
    draw_function_patterns(&mut modules, version);

    let total_bits = codewords.len() * 8;
    for (i, &(x, y)) in data_positions(&function).iter().enumerate() {
        let dark = i < total_bits && (codewords[i / 8] >> (7 - i % 8)) & 1 == 1;
        modules.set(x, y, dark);
    }

    let mut best: Option<(u32, BitMatrix)> = None;
    for mask in MaskPattern::ALL {
        let mut candidate = modules.clone();
        apply_mask(&mut candidate, &function, mask);
        draw_format(&mut candidate, level, mask);
        let score = penalty(&candidate);
        if best.as_ref().is_none_or(|(s, _)| score < *s) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, m)| m).unwrap_or(modules)
}

fn draw_function_patterns(modules: &mut BitMatrix, version: Version) {
    let size = version.size();
    for i in 0..size {
        modules.set(6, i, i % 2 == 0);
        modules.set(i, 6, i % 2 == 0);
    }
    for (cx, cy) in [(3isize, 3isize), (size as isize - 4, 3), (3, size as isize - 4)] {
        for dy in -4isize..=4 {
            for dx in -4isize..=4 {
                let (x, y) = (cx + dx, cy + dy);
                if x < 0 || y < 0 {
                    continue;
                }
                let ring = dx.abs().max(dy.abs());
                modules.set(x as usize, y as usize, ring != 2 && ring != 4);
            }
        }
    }
    for (cx, cy) in alignment_centers(version) {
        for dy in -2isize..=2 {
            for dx in -2isize..=2 {
                let x = (cx as isize + dx) as usize;
                let y = (cy as isize + dy) as usize;
                modules.set(x, y, dx.abs().max(dy.abs()) != 1);
            }
        }
    }
    modules.set(8, size - 8, true);
    if version.number() >= 7 {
        let bits = version_bits(version);
        for copy in version_positions(size) {
            for (i, (x, y)) in copy.into_iter().enumerate() {
                modules.set(x, y, (bits >> i) & 1 == 1);
            }
        }
    }
}

fn draw_format(modules: &mut BitMatrix, level: ECLevel, mask: MaskPattern) {
    let bits = format_bits(level, mask);
    for copy in format_positions(modules.width()) {
        for (i, (x, y)) in copy.into_iter().enumerate() {
            modules.set(x, y, (bits >> i) & 1 == 1);
        }
    }
}

/// XOR `mask` onto every data module
pub(crate) fn apply_mask(modules: &mut BitMatrix, function: &BitMatrix, mask: MaskPattern) {
    for y in 0..modules.height() {
        for x in 0..modules.width() {
            if !function.get(x, y) && mask.is_masked(y, x) {
                modules.toggle(x, y);
            }
        }
    }
}

/// Dark-light-dark 1:1:3:1:1 core of a finder pattern
const FINDER_CORE: [bool; 7] = [true, false, true, true, true, false, true];

/// True if `len` modules from `start` are light; modules outside the line
/// are the light quiet zone
fn light_span(line: &[bool], start: isize, len: isize) -> bool {
    (start..start + len).all(|i| {
        usize::try_from(i)
            .ok()
            .and_then(|i| line.get(i))
            .is_none_or(|&dark| !dark)
    })
}

fn line_penalty(line: &[bool]) -> u32 {
    let mut score = 0;
    let mut run = 1;
    for i in 1..=line.len() {
        if i < line.len() && line[i] == line[i - 1] {
            run += 1;
            continue;
        }
        if run >= 5 {
            score += 3 + (run - 5) as u32;
        }
        run = 1;
    }
    // Finder look-alikes with four light modules on either side
    for (i, window) in line.windows(FINDER_CORE.len()).enumerate() {
        if window != FINDER_CORE {
            continue;
        }
        let start = i as isize;
        if light_span(line, start - 4, 4) || light_span(line, start + 7, 4) {
            score += 40;
        }
    }
    score
}

/// Mask penalty: runs, 2x2 blocks, finder look-alikes and dark balance
fn penalty(modules: &BitMatrix) -> u32 {
    let size = modules.width();
    let mut score = 0;
    for y in 0..size {
        let row: Vec<bool> = (0..size).map(|x| modules.get(x, y)).collect();
        score += line_penalty(&row);
    }
    for x in 0..size {
        let col: Vec<bool> = (0..size).map(|y| modules.get(x, y)).collect();
        score += line_penalty(&col);
    }
    for y in 0..size - 1 {
        for x in 0..size - 1 {
            let c = modules.get(x, y);
            if c == modules.get(x + 1, y)
                && c == modules.get(x, y + 1)
                && c == modules.get(x + 1, y + 1)
            {
                score += 3;
            }
        }
    }
    let total = size * size;
    let dark = modules.count_ones();
    let k = (((dark * 20).abs_diff(total * 10) + total - 1) / total).saturating_sub(1);
    score + 10 * k as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::lookup;
    use crate::models::Symbology;

    #[test]
    fn test_finder_penalty_counts_quiet_zone() {
        // Alone on the line, both sides are quiet zone
        assert_eq!(line_penalty(&FINDER_CORE), 40);

        let mut line = vec![true, false];
        line.extend(FINDER_CORE);
        line.extend([false; 4]);
        line.push(true);
        assert_eq!(line_penalty(&line), 40);

        let mut boxed = vec![true, true];
        boxed.extend(FINDER_CORE);
        boxed.extend([true, true]);
        assert_eq!(line_penalty(&boxed), 0);
    }

    #[test]
    fn test_mode_selection() {
        assert_eq!(choose_mode(b"0123"), Mode::Numeric);
        assert_eq!(choose_mode(b"HELLO WORLD"), Mode::Alphanumeric);
        assert_eq!(choose_mode(b"hello"), Mode::Byte);
    }

    #[test]
    fn test_known_data_codewords() {
        // "01234567" at 1-M
        let v = Version::new(1).unwrap();
        let data = data_codewords(b"01234567", Mode::Numeric, v, ECLevel::M).unwrap();
        assert_eq!(
            data,
            vec![
                0x10, 0x20, 0x0C, 0x56, 0x61, 0x80, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC,
                0x11, 0xEC, 0x11
            ]
        );
        let all = add_error_correction(&data, v, ECLevel::M).unwrap();
        assert_eq!(
            &all[16..],
            &[0xA5, 0x24, 0xD4, 0xC1, 0xED, 0x36, 0xC7, 0x87, 0x2C, 0x55]
        );
    }

    #[test]
    fn test_smallest_version_chosen() {
        let spec = lookup(Symbology::QrCode);
        let m = encode(b"https://example.com", spec, &EncodeOptions::default()).unwrap();
        assert_eq!(m.width(), 25);
        assert_eq!(m.quiet_zone(), 4);
        let options = EncodeOptions {
            qr_min_version: Version::new(5),
            ..EncodeOptions::default()
        };
        let m = encode(b"A", spec, &options).unwrap();
        assert_eq!(m.width(), 37);
    }

    #[test]
    fn test_finder_patterns_drawn() {
        let spec = lookup(Symbology::QrCode);
        let m = encode(b"12345", spec, &EncodeOptions::default()).unwrap();
        for i in 0..7 {
            assert!(m.is_dark(i, 0));
            assert!(m.is_dark(0, i));
            assert!(m.is_dark(20 - i, 0));
        }
        assert!(!m.is_dark(1, 1));
        assert!(m.is_dark(3, 3));
        assert!(!m.is_dark(7, 0));
    }

    #[test]
    fn test_capacity_overflow() {
        let spec = lookup(Symbology::QrCode);
        let payload = vec![b'x'; 2400];
        let err = encode(&payload, spec, &EncodeOptions::default()).unwrap_err();
        match err {
            BarcodeError::PayloadTooLarge { max, .. } => assert_eq!(max, 2331),
            other => panic!("unexpected {other:?}"),
        }
    }
}
