//! Decoders for the linear symbologies, working on a sampled module row.

use crate::error::{BarcodeError, Result};
use crate::format::linear::{
    CODABAR_CHARS, CODE39_CHAR_MODULES, CODE39_CHARS, CODE128_CODE_A, CODE128_CODE_B, CODE128_CODE_C,
    CODE128_SHIFT, CODE128_START_A, CODE128_START_B, CODE128_START_C, CODE128_STOP,
    EAN_CENTER_GUARD, EAN_EDGE_GUARD, EAN_FIRST_DIGIT_PARITY, EanSet, ITF_START, ITF_STOP, WIDE,
    code128_value, ean_digit_modules, gtin_check_digit, is_codabar_guard, itf_digit,
};
use crate::models::{DecodeResult, SymbolSize, Symbology};
use log::debug;

/// Run lengths of a module row, starting with the first module's colour
fn module_runs(modules: &[bool]) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = None;
    for &m in modules {
        if Some(m) == current {
            if let Some(last) = runs.last_mut() {
                *last += 1;
            }
        } else {
            runs.push(1);
            current = Some(m);
        }
    }
    runs
}

/// Decode `modules`, retrying the row reversed for symbols read upside down
pub fn decode_row(symbology: Symbology, modules: &[bool]) -> Result<DecodeResult> {
    decode_forward(symbology, modules).or_else(|err| {
        let reversed: Vec<bool> = modules.iter().rev().copied().collect();
        decode_forward(symbology, &reversed).map_err(|_| err)
    })
}

fn decode_forward(symbology: Symbology, modules: &[bool]) -> Result<DecodeResult> {
    let payload = match symbology {
        Symbology::Ean13 => decode_ean13(modules)?,
        Symbology::UpcA => {
            let digits = decode_ean13(modules)?;
            if digits[0] != b'0' {
                return Err(BarcodeError::malformed("leading digit is not 0, not a UPC-A symbol"));
            }
            digits[1..].to_vec()
        }
        Symbology::Code128 => decode_code128(modules)?,
        Symbology::Code39 => decode_code39(modules)?,
        Symbology::Itf14 => decode_itf14(modules)?,
        Symbology::Codabar => decode_codabar(modules)?,
        other => {
            return Err(BarcodeError::UnsupportedFormat(format!("{other} is not linear")));
        }
    };
    debug!("{symbology}: {} modules, {} bytes", modules.len(), payload.len());
    Ok(DecodeResult::new(
        symbology,
        payload,
        SymbolSize::Linear {
            modules: modules.len(),
        },
    ))
}

fn verify_gtin(digits: &[u8]) -> Result<()> {
    let (body, check) = digits.split_at(digits.len() - 1);
    let expected = gtin_check_digit(body);
    if expected != check[0] {
        return Err(BarcodeError::ChecksumMismatch {
            expected: expected as u32,
            found: check[0] as u32,
        });
    }
    Ok(())
}

fn ascii_digits(digits: &[u8]) -> Vec<u8> {
    digits.iter().map(|d| d + b'0').collect()
}

/// Thirteen ASCII digits of an EAN-13 module row
pub(crate) fn decode_ean13(modules: &[bool]) -> Result<Vec<u8>> {
    if modules.len() != 95 {
        return Err(BarcodeError::malformed(format!("{} modules, EAN needs 95", modules.len())));
    }
    if modules[..3] != EAN_EDGE_GUARD
        || modules[45..50] != EAN_CENTER_GUARD
        || modules[92..] != EAN_EDGE_GUARD
    {
        return Err(BarcodeError::malformed("EAN guard patterns missing"));
    }

    let mut digits = vec![0u8];
    let mut parity = [false; 6];
    for (i, chunk) in modules[3..45].chunks(7).enumerate() {
        let (digit, is_g) = (0..10u8)
            .find_map(|d| {
                if chunk == ean_digit_modules(d, EanSet::L) {
                    Some((d, false))
                } else if chunk == ean_digit_modules(d, EanSet::G) {
                    Some((d, true))
                } else {
                    None
                }
            })
            .ok_or_else(|| BarcodeError::malformed(format!("left digit {} unreadable", i + 1)))?;
        digits.push(digit);
        parity[i] = is_g;
    }
    digits[0] = EAN_FIRST_DIGIT_PARITY
        .iter()
        .position(|p| *p == parity)
        .ok_or_else(|| BarcodeError::malformed("parity pattern matches no leading digit"))?
        as u8;
    for (i, chunk) in modules[50..92].chunks(7).enumerate() {
        let digit = (0..10u8)
            .find(|&d| chunk == ean_digit_modules(d, EanSet::R))
            .ok_or_else(|| BarcodeError::malformed(format!("right digit {} unreadable", i + 1)))?;
        digits.push(digit);
    }
    verify_gtin(&digits)?;
    Ok(ascii_digits(&digits))
}

/// Character of symbol value `value` in code set A or B
fn code128_char(set_a: bool, value: u8) -> u8 {
    if set_a && value >= 64 {
        value - 64
    } else {
        value + 32
    }
}

fn decode_code128(modules: &[bool]) -> Result<Vec<u8>> {
    if modules.len() < 35 || modules.len() % 11 != 2 {
        return Err(BarcodeError::malformed(format!(
            "{} modules is not a Code 128 width",
            modules.len()
        )));
    }
    let (body, stop) = modules.split_at(modules.len() - 13);
    if code128_value(&module_runs(stop)) != Some(CODE128_STOP) {
        return Err(BarcodeError::malformed("stop pattern missing"));
    }
    let mut values = Vec::with_capacity(body.len() / 11);
    for (i, chunk) in body.chunks(11).enumerate() {
        let value = code128_value(&module_runs(chunk))
            .ok_or_else(|| BarcodeError::malformed(format!("symbol {i} unreadable")))?;
        values.push(value);
    }
    let found = values.pop().unwrap_or_default();
    let checksum = values
        .iter()
        .enumerate()
        .map(|(i, &v)| v as usize * i.max(1))
        .sum::<usize>()
        % 103;
    if checksum != found as usize {
        return Err(BarcodeError::ChecksumMismatch {
            expected: checksum as u32,
            found: found as u32,
        });
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Set {
        A,
        B,
        C,
    }
    let mut set = match values.first() {
        Some(&CODE128_START_A) => Set::A,
        Some(&CODE128_START_B) => Set::B,
        Some(&CODE128_START_C) => Set::C,
        _ => return Err(BarcodeError::malformed("no start code")),
    };
    let mut out = Vec::new();
    let mut shifted = false;
    for &v in &values[1..] {
        let active = if shifted {
            if set == Set::A { Set::B } else { Set::A }
        } else {
            set
        };
        shifted = false;
        match (active, v) {
            (_, CODE128_START_A..=CODE128_STOP) => {
                return Err(BarcodeError::malformed(format!("start code {v} inside data")));
            }
            (Set::C, 0..=99) => {
                out.push(b'0' + v / 10);
                out.push(b'0' + v % 10);
            }
            (Set::C, CODE128_CODE_B) => set = Set::B,
            (Set::C, CODE128_CODE_A) => set = Set::A,
            (Set::A | Set::B, 0..=95) => out.push(code128_char(active == Set::A, v)),
            (Set::A | Set::B, CODE128_SHIFT) => shifted = true,
            (Set::A | Set::B, CODE128_CODE_C) => set = Set::C,
            (Set::A, CODE128_CODE_B) => set = Set::B,
            (Set::B, CODE128_CODE_A) => set = Set::A,
            // FNC1-FNC4 carry no payload bytes
            _ => {}
        }
    }
    Ok(out)
}

fn decode_code39(modules: &[bool]) -> Result<Vec<u8>> {
    let n = modules.len() + 1;
    if n % CODE39_CHAR_MODULES != 0 || n / CODE39_CHAR_MODULES < 3 {
        return Err(BarcodeError::malformed(format!(
            "{} modules is not a Code 39 width",
            modules.len()
        )));
    }
    let star = CODE39_CHARS.len() - 1;
    let mut indices = Vec::with_capacity(n / CODE39_CHAR_MODULES);
    for (i, chunk) in modules.chunks(CODE39_CHAR_MODULES).enumerate() {
        let char_modules = &chunk[..CODE39_CHAR_MODULES - 1];
        if chunk.len() == CODE39_CHAR_MODULES && chunk[CODE39_CHAR_MODULES - 1] {
            return Err(BarcodeError::malformed(format!("gap after character {i} is dark")));
        }
        let mask: String = module_runs(char_modules)
            .iter()
            .map(|&w| if w == WIDE { '1' } else { '0' })
            .collect();
        let index = CODE39_CHARS
            .iter()
            .position(|&(_, p)| p == mask)
            .ok_or_else(|| BarcodeError::malformed(format!("character {i} unreadable")))?;
        indices.push(index);
    }
    let last = indices.len() - 1;
    if indices[0] != star || indices[last] != star {
        return Err(BarcodeError::malformed("Code 39 delimiters missing"));
    }
    indices[1..last]
        .iter()
        .map(|&i| {
            if i == star {
                Err(BarcodeError::malformed("delimiter inside data"))
            } else {
                Ok(CODE39_CHARS[i].0)
            }
        })
        .collect()
}

/// Characters of seven elements split by narrow gaps, framed by A-D. The
/// start and stop letters are part of the payload.
fn decode_codabar(modules: &[bool]) -> Result<Vec<u8>> {
    let runs = module_runs(modules);
    if modules.first() != Some(&true) || (runs.len() + 1) % 8 != 0 || runs.len() < 15 {
        return Err(BarcodeError::malformed(format!(
            "{} elements is not a Codabar symbol",
            runs.len()
        )));
    }
    let mut indices = Vec::with_capacity(runs.len().div_ceil(8));
    for (i, chunk) in runs.chunks(8).enumerate() {
        let mut mask = String::with_capacity(7);
        for &w in &chunk[..7] {
            match w {
                1 => mask.push('0'),
                WIDE => mask.push('1'),
                _ => return Err(BarcodeError::malformed(format!("character {i} has a {w}-module element"))),
            }
        }
        let index = CODABAR_CHARS
            .iter()
            .position(|&(_, p)| p == mask)
            .ok_or_else(|| BarcodeError::malformed(format!("character {i} unreadable")))?;
        indices.push(index);
    }
    let last = indices.len() - 1;
    if !is_codabar_guard(indices[0]) || !is_codabar_guard(indices[last]) {
        return Err(BarcodeError::malformed("Codabar start or stop character missing"));
    }
    if indices[1..last].iter().any(|&i| is_codabar_guard(i)) {
        return Err(BarcodeError::malformed("start/stop character inside data"));
    }
    Ok(indices.iter().map(|&i| CODABAR_CHARS[i].0).collect())
}

fn decode_itf14(modules: &[bool]) -> Result<Vec<u8>> {
    if modules.len() != 135 || modules[..4] != ITF_START || modules[130..] != ITF_STOP {
        return Err(BarcodeError::malformed("ITF-14 start or stop pattern missing"));
    }
    let mut digits = Vec::with_capacity(14);
    for (p, chunk) in modules[4..130].chunks(18).enumerate() {
        let runs = module_runs(chunk);
        if runs.len() != 10 {
            return Err(BarcodeError::malformed(format!("digit pair {p} has {} elements", runs.len())));
        }
        let mask = |parity: usize| -> Vec<u8> {
            runs.iter()
                .skip(parity)
                .step_by(2)
                .map(|&w| u8::from(w == WIDE))
                .collect()
        };
        for parity in 0..2 {
            let digit = itf_digit(&mask(parity))
                .ok_or_else(|| BarcodeError::malformed(format!("digit pair {p} unreadable")))?;
            digits.push(digit);
        }
    }
    verify_gtin(&digits)?;
    Ok(ascii_digits(&digits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncodeOptions;
    use crate::error::ErrorKind;
    use crate::format::lookup;

    fn modules(symbology: Symbology, payload: &[u8], options: &EncodeOptions) -> Vec<bool> {
        let spec = lookup(symbology);
        spec.codec.encode(payload, spec, options).unwrap().row(0)
    }

    #[test]
    fn test_module_runs() {
        assert_eq!(module_runs(&[true, true, false, true]), vec![2, 1, 1]);
        assert!(module_runs(&[]).is_empty());
    }

    #[test]
    fn test_ean13_decodes_with_check_digit() {
        let row = modules(Symbology::Ean13, b"123456789012", &EncodeOptions::default());
        let result = decode_row(Symbology::Ean13, &row).unwrap();
        assert_eq!(result.payload, b"1234567890128");
        assert_eq!(result.size, SymbolSize::Linear { modules: 95 });
    }

    #[test]
    fn test_ean13_reversed_row() {
        let mut row = modules(Symbology::Ean13, b"4006381333931", &EncodeOptions::default());
        row.reverse();
        assert_eq!(decode_row(Symbology::Ean13, &row).unwrap().payload, b"4006381333931");
    }

    #[test]
    fn test_wrong_check_digit_is_checksum_mismatch() {
        let options = EncodeOptions {
            validate_check_digit: false,
            ..EncodeOptions::default()
        };
        let row = modules(Symbology::Ean13, b"1234567890125", &options);
        let err = decode_row(Symbology::Ean13, &row).unwrap_err();
        assert_eq!(err, BarcodeError::ChecksumMismatch { expected: 8, found: 5 });
    }

    #[test]
    fn test_upca() {
        let row = modules(Symbology::UpcA, b"03600029145", &EncodeOptions::default());
        assert_eq!(decode_row(Symbology::UpcA, &row).unwrap().payload, b"036000291452");
        let row = modules(Symbology::Ean13, b"123456789012", &EncodeOptions::default());
        assert!(decode_row(Symbology::UpcA, &row).is_err());
    }

    #[test]
    fn test_code128_sets_round_trip() {
        for payload in [&b"Hello, World!"[..], b"1234567890", b"AB12345", b"\tTAB\x7f"] {
            let row = modules(Symbology::Code128, payload, &EncodeOptions::default());
            assert_eq!(decode_row(Symbology::Code128, &row).unwrap().payload, payload);
        }
    }

    #[test]
    fn test_code128_bad_checksum() {
        let mut row = modules(Symbology::Code128, b"ABC", &EncodeOptions::default());
        // Replace 'B' (value 34) with 'C' (value 35) in the second data symbol
        let c: Vec<bool> = crate::format::linear::code128_widths(35)
            .into_iter()
            .enumerate()
            .flat_map(|(k, w)| std::iter::repeat_n(k % 2 == 0, w))
            .collect();
        row.splice(22..33, c);
        let err = decode_forward(Symbology::Code128, &row).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    }

    #[test]
    fn test_code39_and_itf14() {
        let row = modules(Symbology::Code39, b"code-39", &EncodeOptions::default());
        assert_eq!(decode_row(Symbology::Code39, &row).unwrap().payload, b"CODE-39");
        let row = modules(Symbology::Itf14, b"1540014128876", &EncodeOptions::default());
        assert_eq!(decode_row(Symbology::Itf14, &row).unwrap().payload, b"15400141288763");
    }

    #[test]
    fn test_codabar() {
        let row = modules(Symbology::Codabar, b"a40156b", &EncodeOptions::default());
        assert_eq!(decode_row(Symbology::Codabar, &row).unwrap().payload, b"A40156B");
        let row = modules(Symbology::Codabar, b"-$:/.+", &EncodeOptions::default());
        assert_eq!(decode_row(Symbology::Codabar, &row).unwrap().payload, b"A-$:/.+A");
    }

    #[test]
    fn test_codabar_without_stop_is_malformed() {
        let mut row = modules(Symbology::Codabar, b"C123D", &EncodeOptions::default());
        // Drop the gap and stop character
        row.truncate(row.len() - 14);
        let err = decode_row(Symbology::Codabar, &row).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBitstream);
    }

    #[test]
    fn test_garbage_row_is_malformed() {
        let row = vec![true; 95];
        let err = decode_row(Symbology::Ean13, &row).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBitstream);
    }
}
