//! Data Matrix ECC200 encoder: ASCII encodation, padding, interleaved
//! Reed-Solomon blocks and diagonal module placement.

use crate::config::EncodeOptions;
use crate::ecc::{DATA_MATRIX_FIELD_256, ReedSolomon};
use crate::error::{BarcodeError, Result};
use crate::format::FormatSpec;
use crate::format::datamatrix::{
    PAD, SYMBOLS, SymbolInfo, UPPER_SHIFT, draw_function_patterns, placement, randomized_pad,
    smallest_symbol,
};
use crate::models::{BitMatrix, ModuleMatrix};
use log::debug;

/// Build the smallest Data Matrix symbol holding `payload`
pub fn encode(payload: &[u8], spec: &FormatSpec, _options: &EncodeOptions) -> Result<ModuleMatrix> {
    spec.check_length(payload.len())?;
    let mut codewords = ascii_codewords(payload);
    let max = SYMBOLS[SYMBOLS.len() - 1].data_codewords;
    let info = smallest_symbol(codewords.len()).ok_or(BarcodeError::PayloadTooLarge {
        symbology: spec.symbology,
        len: codewords.len(),
        max,
    })?;
    debug!(
        "datamatrix: {} data codewords in {}x{}",
        codewords.len(),
        info.rows,
        info.cols
    );
    pad(&mut codewords, info.data_codewords);
    let all = add_error_correction(&codewords, info);
    let bits = place_modules(&all, info);
    ModuleMatrix::from_bit_matrix(&bits)
        .with_quiet_zone(spec.quiet_zone)
        .finish()
}

/// ASCII encodation: digit pairs share a codeword, bytes above 127 take an
/// upper shift
pub(crate) fn ascii_codewords(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    let mut i = 0;
    while i < payload.len() {
        let b = payload[i];
        match payload.get(i + 1) {
            Some(&next) if b.is_ascii_digit() && next.is_ascii_digit() => {
                out.push(130 + (b - b'0') * 10 + (next - b'0'));
                i += 2;
                continue;
            }
            _ => {}
        }
        if b >= 128 {
            out.push(UPPER_SHIFT);
            out.push(b - 128 + 1);
        } else {
            out.push(b + 1);
        }
        i += 1;
    }
    out
}

fn pad(codewords: &mut Vec<u8>, capacity: usize) {
    if codewords.len() < capacity {
        codewords.push(PAD);
    }
    while codewords.len() < capacity {
        codewords.push(randomized_pad(codewords.len() + 1));
    }
}

/// Data followed by the interleaved parity of every block
pub(crate) fn add_error_correction(data: &[u8], info: &SymbolInfo) -> Vec<u8> {
    let blocks = info.blocks();
    let ecc_len = info.ecc_per_block();
    let rs = ReedSolomon::new(&DATA_MATRIX_FIELD_256);
    let mut out = data.to_vec();
    out.resize(data.len() + info.ecc_codewords(), 0);
    for b in 0..blocks {
        let block: Vec<u8> = data.iter().skip(b).step_by(blocks).copied().collect();
        let parity = rs.encode_bytes(&block, ecc_len);
        for (j, &p) in parity.iter().enumerate() {
            out[data.len() + j * blocks + b] = p;
        }
    }
    out
}

fn place_modules(codewords: &[u8], info: &SymbolInfo) -> BitMatrix {
    let mut m = draw_function_patterns(info);
    let layout = placement(info.mapping_rows(), info.mapping_cols());
    for (cells, &word) in layout.codewords.iter().zip(codewords) {
        for (bit, cell) in cells.iter().enumerate() {
            let (x, y) = info.to_symbol(cell.row, cell.col);
            m.set(x, y, word & (0x80 >> bit) != 0);
        }
    }
    if layout.fixed_corner {
        let (r, c) = (info.mapping_rows(), info.mapping_cols());
        for (row, col, dark) in [
            (r - 1, c - 1, true),
            (r - 2, c - 2, true),
            (r - 1, c - 2, false),
            (r - 2, c - 1, false),
        ] {
            let (x, y) = info.to_symbol(row, col);
            m.set(x, y, dark);
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::format::datamatrix::symbol_for_size;
    use crate::format::lookup;
    use crate::models::Symbology;

    #[test]
    fn test_ascii_codewords() {
        assert_eq!(ascii_codewords(b"123456"), vec![142, 164, 186]);
        assert_eq!(ascii_codewords(b"A1"), vec![66, 50]);
        assert_eq!(ascii_codewords(&[0xE9]), vec![UPPER_SHIFT, 0x6A]);
    }

    #[test]
    fn test_known_parity() {
        let info = symbol_for_size(10, 10).unwrap();
        let all = add_error_correction(&[142, 164, 186], info);
        assert_eq!(all, vec![142, 164, 186, 114, 25, 5, 88, 102]);
    }

    #[test]
    fn test_padding() {
        let mut cw = vec![66];
        pad(&mut cw, 5);
        assert_eq!(cw[1], PAD);
        assert_eq!(cw.len(), 5);
        assert_eq!(cw[2], randomized_pad(3));
    }

    #[test]
    fn test_symbol_sizes() {
        let spec = lookup(Symbology::DataMatrix);
        let m = encode(b"123456", spec, &EncodeOptions::default()).unwrap();
        assert_eq!((m.width(), m.height()), (10, 10));
        assert_eq!(m.quiet_zone(), 1);
        let m = encode(b"Hello World", spec, &EncodeOptions::default()).unwrap();
        assert_eq!((m.width(), m.height()), (16, 16));
        let m = encode(b"ABCDEFGHI", spec, &EncodeOptions::default()).unwrap();
        assert_eq!((m.width(), m.height()), (32, 8));
    }

    #[test]
    fn test_too_large() {
        let spec = lookup(Symbology::DataMatrix);
        let err = encode(&[b'x'; 1600], spec, &EncodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
        let err = encode(b"", spec, &EncodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    }
}
