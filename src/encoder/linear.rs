//! Encoders for the one-dimensional symbologies.

use crate::config::EncodeOptions;
use crate::error::{BarcodeError, Result};
use crate::format::FormatSpec;
use crate::format::linear::{
    CODABAR_A, CODE39_CHARS, CODE128_CODE_A, CODE128_CODE_B, CODE128_CODE_C, CODE128_START_A,
    CODE128_START_B, CODE128_START_C, CODE128_STOP, EAN_CENTER_GUARD, EAN_EDGE_GUARD,
    EAN_FIRST_DIGIT_PARITY, EanSet, ITF14_MODULES, ITF_PATTERNS, ITF_START, ITF_STOP, WIDE, code39_modules,
    codabar_modules, codabar_value, code39_value, code128_widths, ean_digit_modules, gtin_check_digit,
    is_codabar_guard,
};
use crate::models::ModuleMatrix;
use log::debug;

fn finish(row: &[bool], spec: &FormatSpec) -> Result<ModuleMatrix> {
    ModuleMatrix::linear(row, spec.bar_height)
        .with_quiet_zone(spec.quiet_zone)
        .finish()
}

/// Payload with spaces and hyphens removed
pub(crate) fn strip_separators(payload: &[u8]) -> Vec<u8> {
    payload
        .iter()
        .copied()
        .filter(|&b| b != b' ' && b != b'-')
        .collect()
}

/// Validate a GTIN-style digit string and return it with its check digit.
///
/// `len_without_check` digits get a computed check digit appended; one more
/// digit is taken as a supplied check digit and verified when `validate` is set.
pub(crate) fn gtin_digits(
    payload: &[u8],
    spec: &FormatSpec,
    len_without_check: usize,
    validate: bool,
) -> Result<Vec<u8>> {
    let cleaned = strip_separators(payload);
    spec.check_length(cleaned.len())?;
    spec.check_alphabet(&cleaned)?;
    let mut digits: Vec<u8> = cleaned.iter().map(|b| b - b'0').collect();
    let computed = gtin_check_digit(&digits[..len_without_check]);
    if digits.len() == len_without_check {
        digits.push(computed);
    } else if validate && digits[len_without_check] != computed {
        return Err(BarcodeError::invalid(
            spec.symbology,
            format!(
                "check digit {} does not match computed {}",
                digits[len_without_check], computed
            ),
        ));
    }
    Ok(digits)
}

/// Modules of a 13-digit EAN symbol
pub(crate) fn ean13_modules(digits: &[u8]) -> Vec<bool> {
    let parity = EAN_FIRST_DIGIT_PARITY[digits[0] as usize];
    let mut row = Vec::with_capacity(95);
    row.extend_from_slice(&EAN_EDGE_GUARD);
    for (i, &d) in digits[1..7].iter().enumerate() {
        let set = if parity[i] { EanSet::G } else { EanSet::L };
        row.extend_from_slice(&ean_digit_modules(d, set));
    }
    row.extend_from_slice(&EAN_CENTER_GUARD);
    for &d in &digits[7..13] {
        row.extend_from_slice(&ean_digit_modules(d, EanSet::R));
    }
    row.extend_from_slice(&EAN_EDGE_GUARD);
    row
}

/// EAN-13 from 12 digits (check digit computed) or 13
pub fn encode_ean13(payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
    let digits = gtin_digits(payload, spec, 12, options.validate_check_digit)?;
    finish(&ean13_modules(&digits), spec)
}

/// UPC-A from 11 digits (check digit computed) or 12
pub fn encode_upca(payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
    let mut digits = vec![0u8];
    digits.extend(gtin_digits(payload, spec, 11, options.validate_check_digit)?);
    finish(&ean13_modules(&digits), spec)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

fn leading_digits(payload: &[u8]) -> usize {
    payload.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn value_in(set: CodeSet, byte: u8) -> u8 {
    match set {
        CodeSet::A if byte < 32 => byte + 64,
        _ => byte - 32,
    }
}

fn fits_set(set: CodeSet, byte: u8) -> bool {
    match set {
        CodeSet::A => byte < 96,
        CodeSet::B => byte >= 32,
        CodeSet::C => false,
    }
}

/// Symbol values for `payload`, start code first, checksum and stop excluded
pub(crate) fn code128_values(payload: &[u8]) -> Vec<u8> {
    let mut values = Vec::with_capacity(payload.len() + 2);
    let mut current: Option<CodeSet> = None;
    let mut i = 0;
    while i < payload.len() {
        let run = leading_digits(&payload[i..]);
        let use_c = run >= 4 || (run >= 2 && run == payload.len() - i && current == Some(CodeSet::C));
        if use_c {
            if current != Some(CodeSet::C) {
                values.push(match current {
                    None => CODE128_START_C,
                    Some(_) => CODE128_CODE_C,
                });
                current = Some(CodeSet::C);
            }
            for pair in payload[i..i + run / 2 * 2].chunks(2) {
                values.push((pair[0] - b'0') * 10 + (pair[1] - b'0'));
            }
            i += run / 2 * 2;
            continue;
        }

        let byte = payload[i];
        let set = match current {
            Some(set @ (CodeSet::A | CodeSet::B)) if fits_set(set, byte) => set,
            _ if byte < 32 => CodeSet::A,
            _ => CodeSet::B,
        };
        if current != Some(set) {
            values.push(match (current, set) {
                (None, CodeSet::A) => CODE128_START_A,
                (None, _) => CODE128_START_B,
                (Some(_), CodeSet::A) => CODE128_CODE_A,
                (Some(_), _) => CODE128_CODE_B,
            });
            current = Some(set);
        }
        values.push(value_in(set, byte));
        i += 1;
    }
    values
}

/// Weighted modulo 103 checksum over start and data values
pub(crate) fn code128_checksum(values: &[u8]) -> u8 {
    let sum: usize = values
        .iter()
        .enumerate()
        .map(|(i, &v)| v as usize * i.max(1))
        .sum();
    (sum % 103) as u8
}

/// Code 128 with automatic code set selection
pub fn encode_code128(payload: &[u8], spec: &FormatSpec, _options: &EncodeOptions) -> Result<ModuleMatrix> {
    spec.check_length(payload.len())?;
    spec.check_alphabet(payload)?;
    let mut values = code128_values(payload);
    values.push(code128_checksum(&values));
    values.push(CODE128_STOP);
    debug!("code128: {} symbol values", values.len());

    let mut row = Vec::with_capacity(values.len() * 11 + 2);
    for &v in &values {
        for (k, w) in code128_widths(v).into_iter().enumerate() {
            row.extend(std::iter::repeat_n(k % 2 == 0, w));
        }
    }
    finish(&row, spec)
}

/// Code 39 between `*` delimiters, no check character
pub fn encode_code39(payload: &[u8], spec: &FormatSpec, _options: &EncodeOptions) -> Result<ModuleMatrix> {
    spec.check_length(payload.len())?;
    spec.check_alphabet(payload)?;
    let star = CODE39_CHARS.len() - 1;
    let mut indices = vec![star];
    indices.extend(payload.iter().filter_map(|&b| code39_value(b)));
    indices.push(star);

    let mut row = Vec::new();
    for (n, &index) in indices.iter().enumerate() {
        if n > 0 {
            row.push(false);
        }
        row.extend(code39_modules(index));
    }
    finish(&row, spec)
}

/// Codabar character indices for `payload`. A payload with start/stop
/// letters at both ends keeps them; one with neither is framed by `A`.
pub(crate) fn codabar_indices(payload: &[u8], spec: &FormatSpec) -> Result<Vec<usize>> {
    spec.check_length(payload.len())?;
    spec.check_alphabet(payload)?;
    let indices: Vec<usize> = payload.iter().filter_map(|&b| codabar_value(b)).collect();
    let last = indices.len() - 1;
    let framed = (is_codabar_guard(indices[0]), is_codabar_guard(indices[last]));
    let inner = match framed {
        (true, true) if last > 0 => &indices[1..last],
        (false, false) => &indices[..],
        _ => {
            return Err(BarcodeError::invalid(
                spec.symbology,
                "start and stop characters (A-D) must appear at both ends or neither",
            ));
        }
    };
    if inner.iter().any(|&i| is_codabar_guard(i)) {
        return Err(BarcodeError::invalid(spec.symbology, "A-D only start or stop a symbol"));
    }
    if framed.0 {
        return Ok(indices);
    }
    let mut out = Vec::with_capacity(indices.len() + 2);
    out.push(CODABAR_A);
    out.extend(indices);
    out.push(CODABAR_A);
    Ok(out)
}

/// Codabar with narrow inter-character gaps, no check character
pub fn encode_codabar(payload: &[u8], spec: &FormatSpec, _options: &EncodeOptions) -> Result<ModuleMatrix> {
    let indices = codabar_indices(payload, spec)?;
    debug!("codabar: {} characters", indices.len());
    let mut row = Vec::new();
    for (n, &index) in indices.iter().enumerate() {
        if n > 0 {
            row.push(false);
        }
        row.extend(codabar_modules(index));
    }
    finish(&row, spec)
}

/// ITF-14 from 13 digits (check digit computed) or 14
pub fn encode_itf14(payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
    let digits = gtin_digits(payload, spec, 13, options.validate_check_digit)?;
    let mut row = Vec::with_capacity(135);
    row.extend_from_slice(&ITF_START);
    for pair in digits.chunks(2) {
        let bars = ITF_PATTERNS[pair[0] as usize];
        let spaces = ITF_PATTERNS[pair[1] as usize];
        for k in 0..5 {
            let bar = if bars[k] == 1 { WIDE } else { 1 };
            let space = if spaces[k] == 1 { WIDE } else { 1 };
            row.extend(std::iter::repeat_n(true, bar));
            row.extend(std::iter::repeat_n(false, space));
        }
    }
    row.extend_from_slice(&ITF_STOP);
    if row.len() != ITF14_MODULES {
        return Err(BarcodeError::malformed(format!("itf14 row of {} modules", row.len())));
    }
    finish(&row, spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::format::lookup;
    use crate::models::Symbology;

    fn opts() -> EncodeOptions {
        EncodeOptions::default()
    }

    #[test]
    fn test_ean13_layout() {
        let spec = lookup(Symbology::Ean13);
        let m = encode_ean13(b"123456789012", spec, &opts()).unwrap();
        assert_eq!(m.width(), 95);
        assert_eq!(m.height(), spec.bar_height);
        assert_eq!(m.quiet_zone(), 11);
        let row = m.row(0);
        assert_eq!(&row[..3], &[true, false, true]);
        assert_eq!(&row[45..50], &[false, true, false, true, false]);
        // Second digit 2 in set L (first digit 1 gives LLGLGG)
        assert_eq!(&row[3..10], &[false, false, true, false, false, true, true]);
    }

    #[test]
    fn test_ean13_check_digit_validation() {
        let spec = lookup(Symbology::Ean13);
        let err = encode_ean13(b"1234567890125", spec, &opts()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
        let lenient = EncodeOptions {
            validate_check_digit: false,
            ..opts()
        };
        assert!(encode_ean13(b"1234567890125", spec, &lenient).is_ok());
        assert!(encode_ean13(b"123-456-789-012", spec, &opts()).is_ok());
        let err = encode_ean13(b"12345678901A", spec, &opts()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    }

    #[test]
    fn test_upca_matches_ean13_with_leading_zero() {
        let upc = encode_upca(b"03600029145", lookup(Symbology::UpcA), &opts()).unwrap();
        let ean = encode_ean13(b"0036000291452", lookup(Symbology::Ean13), &opts()).unwrap();
        assert_eq!(upc.row(0), ean.row(0));
    }

    #[test]
    fn test_code128_code_sets() {
        assert_eq!(code128_values(b"AB")[0], CODE128_START_B);
        assert_eq!(code128_values(b"123456"), vec![CODE128_START_C, 12, 34, 56]);
        assert_eq!(code128_values(b"\tA")[..2], [CODE128_START_A, 73]);
        let mixed = code128_values(b"AB1234");
        assert_eq!(mixed, vec![CODE128_START_B, 33, 34, CODE128_CODE_C, 12, 34]);
        let odd = code128_values(b"12345");
        assert_eq!(odd, vec![CODE128_START_C, 12, 34, CODE128_CODE_B, 21]);
    }

    #[test]
    fn test_code128_checksum_and_width() {
        // 104 + 48 + 2*42 + 3*42 + 4*17 + 5*18 + 6*19 + 7*35 = 879
        let values = code128_values(b"PJJ123C");
        assert_eq!(code128_checksum(&values), (879u32 % 103) as u8);
        let m = encode_code128(b"PJJ123C", lookup(Symbology::Code128), &opts()).unwrap();
        assert_eq!(m.width() % 11, 2);
    }

    #[test]
    fn test_code39_width() {
        let m = encode_code39(b"code39", lookup(Symbology::Code39), &opts()).unwrap();
        assert_eq!(m.width(), 8 * 16 - 1);
        let err = encode_code39(b"a!b", lookup(Symbology::Code39), &opts()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    }

    #[test]
    fn test_codabar_framing() {
        let spec = lookup(Symbology::Codabar);
        assert_eq!(codabar_indices(b"a12c", spec).unwrap(), vec![16, 1, 2, 18]);
        assert_eq!(codabar_indices(b"12", spec).unwrap(), vec![16, 1, 2, 16]);
        assert_eq!(codabar_indices(b"AB", spec).unwrap(), vec![16, 17]);
        for bad in [&b"A123"[..], b"123D", b"A1B2C", b"A", b"A1X2B"] {
            let err = codabar_indices(bad, spec).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPayload, "{bad:?}");
        }
    }

    #[test]
    fn test_codabar_width() {
        // A (13) 1 (11) 2 (11) B (13) plus three gaps
        let m = encode_codabar(b"A12B", lookup(Symbology::Codabar), &opts()).unwrap();
        assert_eq!(m.width(), 13 + 11 + 11 + 13 + 3);
        let err = encode_codabar(b"", lookup(Symbology::Codabar), &opts()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    }

    #[test]
    fn test_itf14_width() {
        let m = encode_itf14(b"1540014128876", lookup(Symbology::Itf14), &opts()).unwrap();
        assert_eq!(m.width(), 135);
        assert_eq!(&m.row(0)[..4], &[true, false, true, false]);
    }
}
