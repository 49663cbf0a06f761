//! Data Matrix ECC200 decoding: codeword extraction, block correction and
//! the six encodation schemes.

use crate::config::DecodeConfig;
use crate::ecc::{DATA_MATRIX_FIELD_256, ReedSolomon};
use crate::error::{BarcodeError, ErrorKind, Result};
use crate::format::datamatrix::{
    C40_BASIC, ECI, FNC1, LATCH_BASE256, LATCH_C40, LATCH_EDIFACT, LATCH_TEXT, LATCH_X12,
    MACRO_05, MACRO_06, PAD, READER_PROGRAMMING, SHIFT2_SET, STRUCTURED_APPEND, SymbolInfo,
    TEXT_BASIC, TEXT_SHIFT3, UNLATCH, UPPER_SHIFT, placement, symbol_for_size, unrandomize_255,
};
use crate::models::{BitMatrix, DecodeResult, SymbolSize, Symbology};
use log::{debug, trace};

const GROUP_SEPARATOR: u8 = 0x1D;

/// Decode a sampled symbol, retrying it mirrored when allowed
pub fn decode_grid(modules: &BitMatrix, config: &DecodeConfig) -> Result<DecodeResult> {
    match decode_oriented(modules) {
        Ok(result) => Ok(result),
        Err(err) if config.try_mirrored && modules.width() == modules.height() => {
            trace!("datamatrix: {err}, retrying mirrored");
            decode_oriented(&modules.transposed()).map_err(|mirrored| {
                if err.kind() == ErrorKind::MalformedBitstream {
                    mirrored
                } else {
                    err
                }
            })
        }
        Err(err) => Err(err),
    }
}

fn decode_oriented(modules: &BitMatrix) -> Result<DecodeResult> {
    let (rows, cols) = (modules.height(), modules.width());
    let info = symbol_for_size(rows, cols)
        .ok_or_else(|| BarcodeError::malformed(format!("{rows}x{cols} is not an ECC200 size")))?;
    let codewords = read_codewords(modules, info);
    let (data, corrected) = correct_blocks(&codewords, info)?;
    let payload = decode_codewords(&data)?;
    debug!("datamatrix: {rows}x{cols}, {corrected} errors corrected");
    Ok(DecodeResult::new(
        Symbology::DataMatrix,
        payload,
        SymbolSize::DataMatrix { rows, cols },
    )
    .with_errors(corrected))
}

fn read_codewords(modules: &BitMatrix, info: &SymbolInfo) -> Vec<u8> {
    placement(info.mapping_rows(), info.mapping_cols())
        .codewords
        .iter()
        .map(|cells| {
            cells.iter().fold(0u8, |acc, cell| {
                let (x, y) = info.to_symbol(cell.row, cell.col);
                (acc << 1) | u8::from(modules.get(x, y))
            })
        })
        .collect()
}

fn correct_blocks(codewords: &[u8], info: &SymbolInfo) -> Result<(Vec<u8>, usize)> {
    let blocks = info.blocks();
    let ecc_len = info.ecc_per_block();
    let data_len = info.data_codewords;
    let rs = ReedSolomon::new(&DATA_MATRIX_FIELD_256);
    let mut data = codewords[..data_len].to_vec();
    let mut corrected = 0;
    for b in 0..blocks {
        let mut block: Vec<u8> = codewords[..data_len].iter().skip(b).step_by(blocks).copied().collect();
        let n = block.len();
        block.extend((0..ecc_len).map(|j| codewords[data_len + j * blocks + b]));
        corrected += rs
            .decode_bytes(&mut block, ecc_len)
            .map_err(|e| BarcodeError::uncorrectable(format!("block {b}: {e}")))?;
        for (i, &value) in block[..n].iter().enumerate() {
            data[b + i * blocks] = value;
        }
    }
    Ok((data, corrected))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Ascii,
    C40,
    Text,
    X12,
    Edifact,
    Base256,
}

struct Output {
    bytes: Vec<u8>,
    upper_shift: bool,
    trailer: &'static [u8],
}

impl Output {
    fn push(&mut self, byte: u8) {
        if self.upper_shift {
            self.bytes.push(byte.wrapping_add(128));
            self.upper_shift = false;
        } else {
            self.bytes.push(byte);
        }
    }
}

/// Decode corrected data codewords into payload bytes
pub(crate) fn decode_codewords(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Output {
        bytes: Vec::with_capacity(data.len()),
        upper_shift: false,
        trailer: b"",
    };
    let mut pos = 0;
    let mut scheme = Scheme::Ascii;
    while pos < data.len() {
        scheme = match scheme {
            Scheme::Ascii => match decode_ascii(data, &mut pos, &mut out)? {
                Some(next) => next,
                None => break,
            },
            Scheme::C40 | Scheme::Text => decode_c40_text(data, &mut pos, &mut out, scheme)?,
            Scheme::X12 => decode_x12(data, &mut pos, &mut out)?,
            Scheme::Edifact => decode_edifact(data, &mut pos, &mut out),
            Scheme::Base256 => decode_base256(data, &mut pos, &mut out)?,
        };
    }
    out.bytes.extend_from_slice(out.trailer);
    Ok(out.bytes)
}

/// ASCII codewords until a latch (returned) or the end of data (`None`)
fn decode_ascii(data: &[u8], pos: &mut usize, out: &mut Output) -> Result<Option<Scheme>> {
    while *pos < data.len() {
        let c = data[*pos];
        *pos += 1;
        match c {
            0 => return Err(BarcodeError::malformed("codeword 0 in ASCII encodation")),
            1..=128 => out.push(c - 1),
            PAD => return Ok(None),
            130..=229 => {
                let v = c - 130;
                out.push(b'0' + v / 10);
                out.push(b'0' + v % 10);
            }
            LATCH_C40 => return Ok(Some(Scheme::C40)),
            LATCH_BASE256 => return Ok(Some(Scheme::Base256)),
            FNC1 => out.bytes.push(GROUP_SEPARATOR),
            STRUCTURED_APPEND => *pos += 3,
            READER_PROGRAMMING => {}
            UPPER_SHIFT => out.upper_shift = true,
            MACRO_05 | MACRO_06 => {
                out.bytes.extend_from_slice(b"[)>\x1E");
                out.bytes.extend_from_slice(if c == MACRO_05 { b"05\x1D" } else { b"06\x1D" });
                out.trailer = b"\x1E\x04";
            }
            LATCH_X12 => return Ok(Some(Scheme::X12)),
            LATCH_TEXT => return Ok(Some(Scheme::Text)),
            LATCH_EDIFACT => return Ok(Some(Scheme::Edifact)),
            ECI => {
                // Designator of one to three codewords; bytes pass through unchanged
                let first = data.get(*pos).copied().unwrap_or(0);
                *pos += match first {
                    0..=127 => 1,
                    128..=191 => 2,
                    _ => 3,
                };
            }
            UNLATCH => {}
            _ => return Err(BarcodeError::malformed(format!("codeword {c} invalid in ASCII"))),
        }
    }
    Ok(None)
}

/// Three values packed into a codeword pair, or `None` on unlatch / end
fn read_triple(data: &[u8], pos: &mut usize) -> Option<[u8; 3]> {
    if data.get(*pos) == Some(&UNLATCH) {
        *pos += 1;
        return None;
    }
    // A lone trailing codeword is ASCII
    if *pos + 1 >= data.len() {
        return None;
    }
    let v = (data[*pos] as u32 * 256 + data[*pos + 1] as u32).saturating_sub(1);
    *pos += 2;
    Some([(v / 1600) as u8, ((v / 40) % 40) as u8, (v % 40) as u8])
}

fn decode_c40_text(data: &[u8], pos: &mut usize, out: &mut Output, scheme: Scheme) -> Result<Scheme> {
    let basic = if scheme == Scheme::C40 { C40_BASIC } else { TEXT_BASIC };
    let mut shift = 0u8;
    while let Some(values) = read_triple(data, pos) {
        for v in values {
            match shift {
                0 => match v {
                    0..=2 => shift = v + 1,
                    _ => out.push(*basic.get(v as usize).ok_or_else(|| {
                        BarcodeError::malformed(format!("basic set value {v}"))
                    })?),
                },
                1 => {
                    out.push(v);
                    shift = 0;
                }
                2 => {
                    match v {
                        0..=26 => out.push(SHIFT2_SET[v as usize]),
                        27 => out.bytes.push(GROUP_SEPARATOR),
                        30 => out.upper_shift = true,
                        _ => {
                            return Err(BarcodeError::malformed(format!("shift 2 value {v}")));
                        }
                    }
                    shift = 0;
                }
                _ => {
                    let c = if scheme == Scheme::C40 {
                        v + 96
                    } else {
                        *TEXT_SHIFT3
                            .get(v as usize)
                            .ok_or_else(|| BarcodeError::malformed(format!("shift 3 value {v}")))?
                    };
                    out.push(c);
                    shift = 0;
                }
            }
        }
    }
    Ok(Scheme::Ascii)
}

fn decode_x12(data: &[u8], pos: &mut usize, out: &mut Output) -> Result<Scheme> {
    while let Some(values) = read_triple(data, pos) {
        for v in values {
            let c = match v {
                0 => b'\r',
                1 => b'*',
                2 => b'>',
                3 => b' ',
                4..=13 => b'0' + v - 4,
                14..=39 => b'A' + v - 14,
                _ => return Err(BarcodeError::malformed(format!("X12 value {v}"))),
            };
            out.push(c);
        }
    }
    Ok(Scheme::Ascii)
}

/// Four 6-bit values per three codewords; 0x1F returns to ASCII
fn decode_edifact(data: &[u8], pos: &mut usize, out: &mut Output) -> Scheme {
    while *pos < data.len() {
        let group = &data[*pos..(*pos + 3).min(data.len())];
        let bits = group
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32)
            << (8 * (3 - group.len()));
        *pos += group.len();
        for k in 0..4 {
            let v = ((bits >> (18 - 6 * k)) & 0x3F) as u8;
            if v == 0x1F {
                // Unlatch; the rest of this group is padding
                return Scheme::Ascii;
            }
            out.push(if v & 0x20 == 0 { v | 0x40 } else { v });
        }
    }
    Scheme::Ascii
}

fn decode_base256(data: &[u8], pos: &mut usize, out: &mut Output) -> Result<Scheme> {
    fn next(data: &[u8], pos: &mut usize) -> Result<u8> {
        let value = *data
            .get(*pos)
            .ok_or_else(|| BarcodeError::malformed("Base 256 field runs past the data"))?;
        *pos += 1;
        Ok(unrandomize_255(value, *pos))
    }
    let d1 = next(data, pos)? as usize;
    let len = match d1 {
        0 => usize::MAX,
        1..=249 => d1,
        _ => (d1 - 249) * 250 + next(data, pos)? as usize,
    };
    let mut read = 0;
    while read < len && *pos < data.len() {
        let b = next(data, pos)?;
        out.bytes.push(b);
        read += 1;
    }
    if len != usize::MAX && read < len {
        return Err(BarcodeError::malformed(format!("Base 256 field of {len} bytes truncated")));
    }
    Ok(Scheme::Ascii)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::datamatrix::randomize_255;
    use crate::format::lookup;
    use crate::config::EncodeOptions;

    fn symbol(payload: &[u8]) -> BitMatrix {
        let spec = lookup(Symbology::DataMatrix);
        spec.codec
            .encode(payload, spec, &EncodeOptions::default())
            .unwrap()
            .to_bit_matrix()
    }

    #[test]
    fn test_clean_round_trip() {
        for payload in [&b"123456"[..], b"Hello World", b"ABCDEFGHI", &[0x00, 0xFF, 0x80, b'7']] {
            let result = decode_grid(&symbol(payload), &DecodeConfig::default()).unwrap();
            assert_eq!(result.payload, payload);
            assert_eq!(result.errors_corrected, 0);
        }
    }

    #[test]
    fn test_multi_block_symbol() {
        let payload: Vec<u8> = (0..400u32).map(|i| b'a' + (i % 26) as u8).collect();
        let m = symbol(&payload);
        assert_eq!(m.width(), 80);
        let result = decode_grid(&m, &DecodeConfig::default()).unwrap();
        assert_eq!(result.payload, payload);
    }

    #[test]
    fn test_corrects_module_damage() {
        let mut m = symbol(b"Hello World");
        for i in 2..6 {
            m.toggle(i, i);
        }
        let result = decode_grid(&m, &DecodeConfig::default()).unwrap();
        assert_eq!(result.payload, b"Hello World");
        assert!(result.errors_corrected > 0);
    }

    #[test]
    fn test_c40_segment() {
        // "AIM" is 14, 22, 26 in the basic set
        let v: u16 = 1600 * 14 + 40 * 22 + 26 + 1;
        let data = [LATCH_C40, (v >> 8) as u8, v as u8, UNLATCH, b'!' + 1];
        assert_eq!(decode_codewords(&data).unwrap(), b"AIM!");
    }

    #[test]
    fn test_text_and_x12_segments() {
        // Text "aim" uses the same values as C40 "AIM"
        let v: u16 = 1600 * 14 + 40 * 22 + 26 + 1;
        let data = [LATCH_TEXT, (v >> 8) as u8, v as u8];
        assert_eq!(decode_codewords(&data).unwrap(), b"aim");
        // X12 values 14, 3, 4 -> "A 0": 1600*14 + 40*3 + 4 + 1 = 22525
        let data = [LATCH_X12, (22525 >> 8) as u8, (22525 & 0xFF) as u8];
        assert_eq!(decode_codewords(&data).unwrap(), b"A 0");
    }

    #[test]
    fn test_edifact_segment() {
        // "AB" then unlatch: 000001 000010 011111 000000
        let bits: u32 = (0x01 << 18) | (0x02 << 12) | (0x1F << 6);
        let data = [
            LATCH_EDIFACT,
            (bits >> 16) as u8,
            (bits >> 8) as u8,
            bits as u8,
            b'z' + 1,
        ];
        assert_eq!(decode_codewords(&data).unwrap(), b"ABz");
    }

    #[test]
    fn test_base256_segment() {
        let payload = [0xDEu8, 0xAD, 0xBE, 0xEF];
        let mut data = vec![LATCH_BASE256, randomize_255(4, 2)];
        for (i, &b) in payload.iter().enumerate() {
            data.push(randomize_255(b, 3 + i));
        }
        assert_eq!(decode_codewords(&data).unwrap(), payload);
    }

    #[test]
    fn test_invalid_codeword_is_malformed() {
        let err = decode_codewords(&[250]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBitstream);
    }
}
