//! Aztec encoder: character-mode bit stream, bit stuffing, layer selection,
//! Reed-Solomon parity and placement around the bullseye.

use crate::config::EncodeOptions;
use crate::ecc::{AZTEC_PARAM, ReedSolomon};
use crate::error::{BarcodeError, Result};
use crate::format::FormatSpec;
use crate::format::aztec::{Layout, Mode, mode_message_words, mode_positions};
use crate::models::{BitMatrix, ModuleMatrix};
use crate::utils::bits::BitWriter;
use log::debug;

/// Longest byte run a single binary shift carries
const MAX_BINARY_RUN: usize = 2047 + 31;

/// Build the smallest Aztec symbol holding `payload`
pub fn encode(payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
    spec.check_length(payload.len())?;
    let bits = high_level_bits(payload);
    let Some((layout, words)) = choose_layout(bits.bits(), options.aztec_ecc_percent) else {
        let largest = Layout {
            compact: false,
            layers: 32,
        };
        return Err(BarcodeError::PayloadTooLarge {
            symbology: spec.symbology,
            len: stuff_bits(bits.bits(), largest.word_size()).len(),
            max: largest.data_capacity(options.aztec_ecc_percent),
        });
    };
    debug!(
        "aztec: {} bits in {} {} layers, {} of {} words",
        bits.len(),
        if layout.compact { "compact" } else { "full" },
        layout.layers,
        words.len(),
        layout.total_words()
    );
    let matrix = build_symbol(layout, &words);
    ModuleMatrix::from_bit_matrix(&matrix)
        .with_quiet_zone(spec.quiet_zone)
        .finish()
}

/// First mode whose table holds `byte`
fn home_mode(byte: u8) -> Option<Mode> {
    [Mode::Upper, Mode::Lower, Mode::Mixed, Mode::Punct, Mode::Digit]
        .into_iter()
        .find(|m| m.code_of(byte).is_some())
}

/// Greedy mode stream: stay in the latched mode while it covers the input,
/// shift for lone punctuation and capitals, binary-shift bytes no table has
pub(crate) fn high_level_bits(payload: &[u8]) -> BitWriter {
    let mut out = BitWriter::new();
    let mut mode = Mode::Upper;
    let mut i = 0;
    while i < payload.len() {
        let b = payload[i];
        if let Some(code) = mode.code_of(b) {
            out.push(code.into(), mode.bits());
            i += 1;
            continue;
        }
        let Some(home) = home_mode(b) else {
            let run = payload[i..]
                .iter()
                .take(MAX_BINARY_RUN)
                .take_while(|&&b| home_mode(b).is_none())
                .count();
            mode = binary_shift(&mut out, mode, &payload[i..i + run]);
            i += run;
            continue;
        };
        if home == Mode::Punct {
            if let Some(code) = Mode::Punct.code_of(b) {
                out.push(0, mode.bits());
                out.push(code.into(), Mode::Punct.bits());
            }
            i += 1;
            continue;
        }
        if home == Mode::Upper && matches!(mode, Mode::Lower | Mode::Digit) {
            let next_needs_upper = payload
                .get(i + 1)
                .is_some_and(|&n| mode.code_of(n).is_none() && Mode::Upper.code_of(n).is_some());
            if !next_needs_upper {
                let shift = if mode == Mode::Lower { 28 } else { 15 };
                out.push(shift, mode.bits());
                if let Some(code) = Mode::Upper.code_of(b) {
                    out.push(code.into(), Mode::Upper.bits());
                }
                i += 1;
                continue;
            }
        }
        mode = latch(&mut out, mode, home);
    }
    out
}

/// Emit latch codes from `from` to `to`, returning the new mode
fn latch(out: &mut BitWriter, mut from: Mode, to: Mode) -> Mode {
    while from != to {
        let step = if from.latch_code(to).is_some() {
            to
        } else {
            match from {
                Mode::Lower => Mode::Digit,
                Mode::Upper => Mode::Mixed,
                _ => Mode::Upper,
            }
        };
        let Some(code) = from.latch_code(step) else {
            break;
        };
        out.push(code.into(), from.bits());
        from = step;
    }
    from
}

fn binary_shift(out: &mut BitWriter, mode: Mode, bytes: &[u8]) -> Mode {
    let mode = match mode {
        Mode::Digit | Mode::Punct => latch(out, mode, Mode::Upper),
        other => other,
    };
    out.push(31, mode.bits());
    if bytes.len() <= 31 {
        out.push(bytes.len() as u32, 5);
    } else {
        out.push(0, 5);
        out.push((bytes.len() - 31) as u32, 11);
    }
    for &b in bytes {
        out.push(b.into(), 8);
    }
    mode
}

/// Split into `width`-bit words, padding with ones. A word whose first
/// `width - 1` bits are all equal gets the complement as its last bit and the
/// displaced bit starts the next word.
pub(crate) fn stuff_bits(bits: &[bool], width: usize) -> Vec<u16> {
    let mask: u16 = (1 << width) - 2;
    let mut out = Vec::with_capacity(bits.len() / width + 2);
    let mut i = 0;
    while i < bits.len() {
        let mut word = 0u16;
        for j in 0..width {
            if bits.get(i + j).is_none_or(|&b| b) {
                word |= 1 << (width - 1 - j);
            }
        }
        if word & mask == mask {
            out.push(word & mask);
            i += width - 1;
        } else if word & mask == 0 {
            out.push(word | 1);
            i += width - 1;
        } else {
            out.push(word);
            i += width;
        }
    }
    out
}

/// First layout whose capacity holds the stuffed words
fn choose_layout(bits: &[bool], ecc_percent: usize) -> Option<(Layout, Vec<u16>)> {
    let mut stuffed: Option<(usize, Vec<u16>)> = None;
    for layout in Layout::all() {
        let width = layout.word_size();
        if stuffed.as_ref().is_none_or(|(w, _)| *w != width) {
            stuffed = Some((width, stuff_bits(bits, width)));
        }
        let words = stuffed.as_ref().map_or(0, |(_, words)| words.len());
        if words <= layout.data_capacity(ecc_percent) {
            return stuffed.map(|(_, words)| (layout, words));
        }
    }
    None
}

/// Layer count and data word count, protected over GF(16)
pub(crate) fn mode_message(layout: Layout, data_words: usize) -> Vec<bool> {
    let (data_len, ecc_len) = mode_message_words(layout.compact);
    let value = if layout.compact {
        ((layout.layers - 1) << 6) | (data_words - 1)
    } else {
        ((layout.layers - 1) << 11) | (data_words - 1)
    };
    let mut words: Vec<u16> = (0..data_len)
        .rev()
        .map(|i| ((value >> (4 * i)) & 0xF) as u16)
        .collect();
    let parity = ReedSolomon::new(&AZTEC_PARAM).encode(&words, ecc_len);
    words.extend(parity);
    let mut bits = BitWriter::new();
    for w in words {
        bits.push(w.into(), 4);
    }
    bits.into_bits()
}

fn build_symbol(layout: Layout, data: &[u16]) -> BitMatrix {
    let width = layout.word_size();
    let total = layout.total_words();
    let parity = ReedSolomon::new(layout.field()).encode(data, total - data.len());

    let mut stream = BitWriter::new();
    stream.push(0, layout.total_bits() % width);
    for &w in data.iter().chain(&parity) {
        stream.push(w.into(), width);
    }

    let mut m = layout.function_patterns();
    let center = layout.size() / 2;
    let mode_bits = mode_message(layout, data.len());
    for (&bit, (x, y)) in mode_bits.iter().zip(mode_positions(center, layout.compact)) {
        m.set(x, y, bit);
    }
    for (&bit, (x, y)) in stream.bits().iter().zip(layout.data_positions()) {
        m.set(x, y, bit);
    }
    m
}
