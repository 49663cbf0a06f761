//! Decode pipeline: grayscale and binarization, then location and decoding
//! across the registry.

use crate::config::DecodeConfig;
use crate::error::{BarcodeError, Result};
use crate::format::{FormatSpec, lookup, priority};
use crate::models::{BitMatrix, DecodeResult, PixelBuffer, Symbology};
use crate::utils::binarization::{adaptive_binarize, despeckle};
use crate::utils::grayscale::to_grayscale;
use log::{debug, trace};
use rayon::prelude::*;

/// Grayscale conversion and block-adaptive thresholding
pub fn binarize(buffer: &PixelBuffer, config: &DecodeConfig) -> Result<BitMatrix> {
    if buffer.is_empty() {
        return Err(BarcodeError::EmptyImage);
    }
    let (width, height) = (buffer.width(), buffer.height());
    let gray = to_grayscale(buffer);
    let binary = adaptive_binarize(&gray, width, height);
    debug!(
        "binarized {width}x{height} {:?}, {} dark pixels",
        buffer.format(),
        binary.count_ones()
    );
    Ok(if config.despeckle {
        despeckle(&binary)
    } else {
        binary
    })
}

/// Decode the first symbol found in `buffer`.
///
/// With a hint only that symbology is tried. Without one every symbology is
/// tried in priority order; when candidates were located but none decoded,
/// the first decode error is returned rather than `SymbolNotFound`.
pub fn decode(buffer: &PixelBuffer, hint: Option<Symbology>, config: &DecodeConfig) -> Result<DecodeResult> {
    let binary = binarize(buffer, config)?;
    decode_binary(&binary, hint, config)
}

/// Decode from an already binarized image
pub fn decode_binary(binary: &BitMatrix, hint: Option<Symbology>, config: &DecodeConfig) -> Result<DecodeResult> {
    let mut first_error: Option<BarcodeError> = None;
    let specs: Vec<&'static FormatSpec> = match hint {
        Some(symbology) => vec![lookup(symbology)],
        None => priority().collect(),
    };
    for spec in specs {
        match decode_spec(binary, spec, config) {
            Ok(Some(result)) => return Ok(report_as(result, hint)),
            Ok(None) => {}
            Err(err) => {
                debug!("{}: {err}", spec.symbology);
                first_error.get_or_insert(err);
            }
        }
    }
    Err(first_error.unwrap_or(BarcodeError::SymbolNotFound))
}

/// Try every candidate of one symbology. `Ok(None)` when nothing was located.
fn decode_spec(binary: &BitMatrix, spec: &FormatSpec, config: &DecodeConfig) -> Result<Option<DecodeResult>> {
    let grids = spec.codec.locate(binary, config);
    trace!("{}: {} candidates", spec.symbology, grids.len());
    let mut first_error = None;
    for grid in &grids {
        match spec.codec.decode(binary, grid, spec, config) {
            Ok(result) => {
                debug!(
                    "{}: decoded {} bytes, {} errors corrected",
                    spec.symbology,
                    result.payload.len(),
                    result.errors_corrected
                );
                return Ok(Some(result));
            }
            Err(err) => {
                trace!("{}: candidate failed: {err}", spec.symbology);
                first_error.get_or_insert(err);
            }
        }
    }
    first_error.map_or(Ok(None), Err)
}

/// Decode every symbol found in `buffer`.
///
/// Each symbology's candidates are decoded independently, results come back
/// in priority order, and a symbol read by two codecs (EAN-13 and UPC-A) is
/// reported once. When nothing decodes the error matches [`decode`].
pub fn decode_all(buffer: &PixelBuffer, config: &DecodeConfig) -> Result<Vec<DecodeResult>> {
    let binary = binarize(buffer, config)?;
    let specs: Vec<&'static FormatSpec> = priority().collect();
    let outcomes: Vec<(Vec<DecodeResult>, Option<BarcodeError>)> = specs
        .par_iter()
        .map(|spec| decode_every(&binary, spec, config))
        .collect();

    let mut results: Vec<DecodeResult> = Vec::new();
    let mut first_error = None;
    for (found, err) in outcomes {
        for result in found {
            let seen = results
                .iter()
                .any(|r| r.symbology == result.symbology && r.payload == result.payload);
            if !seen {
                results.push(result);
            }
        }
        if let Some(err) = err {
            first_error.get_or_insert(err);
        }
    }
    debug!("decode_all: {} symbols", results.len());
    if results.is_empty() {
        return Err(first_error.unwrap_or(BarcodeError::SymbolNotFound));
    }
    Ok(results)
}

/// Every decodable candidate of one symbology, with the first failure
fn decode_every(
    binary: &BitMatrix,
    spec: &FormatSpec,
    config: &DecodeConfig,
) -> (Vec<DecodeResult>, Option<BarcodeError>) {
    let mut found = Vec::new();
    let mut first_error = None;
    for grid in spec.codec.locate(binary, config) {
        match spec.codec.decode(binary, &grid, spec, config) {
            Ok(result) => found.push(report_as(result, None)),
            Err(err) => {
                trace!("{}: candidate failed: {err}", spec.symbology);
                first_error.get_or_insert(err);
            }
        }
    }
    (found, first_error)
}

/// EAN-13 symbols with a leading zero are UPC-A unless EAN-13 was asked for
fn report_as(mut result: DecodeResult, hint: Option<Symbology>) -> DecodeResult {
    let upc = result.symbology == Symbology::Ean13
        && hint != Some(Symbology::Ean13)
        && result.payload.first() == Some(&b'0');
    if upc {
        result.symbology = Symbology::UpcA;
        result.payload.remove(0);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncodeOptions;
    use crate::error::ErrorKind;
    use crate::models::{PixelFormat, SymbolSize};
    use crate::render::render;

    fn rendered(symbology: Symbology, payload: &[u8]) -> PixelBuffer {
        let spec = lookup(symbology);
        let m = spec.codec.encode(payload, spec, &EncodeOptions::default()).unwrap();
        render(&m, 3, spec.quiet_zone).unwrap()
    }

    #[test]
    fn test_empty_image() {
        let buffer = PixelBuffer::new(0, 0, PixelFormat::Gray8, Vec::new()).unwrap();
        let err = decode(&buffer, None, &DecodeConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyImage);
    }

    #[test]
    fn test_uniform_gray_finds_nothing() {
        let buffer = PixelBuffer::filled(120, 90, 128);
        let err = decode(&buffer, None, &DecodeConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
    }

    #[test]
    fn test_unhinted_qr() {
        let result = decode(&rendered(Symbology::QrCode, b"pipeline"), None, &DecodeConfig::default()).unwrap();
        assert_eq!(result.symbology, Symbology::QrCode);
        assert_eq!(result.payload, b"pipeline");
    }

    #[test]
    fn test_leading_zero_ean_reported_as_upc() {
        let buffer = rendered(Symbology::Ean13, b"001234567890");
        let result = decode(&buffer, None, &DecodeConfig::default()).unwrap();
        assert_eq!(result.symbology, Symbology::UpcA);
        assert_eq!(result.payload, b"012345678905");

        let hinted = decode(&buffer, Some(Symbology::Ean13), &DecodeConfig::default()).unwrap();
        assert_eq!(hinted.symbology, Symbology::Ean13);
        assert_eq!(hinted.payload, b"0012345678905");
    }

    #[test]
    fn test_hint_restricts_search() {
        let buffer = rendered(Symbology::QrCode, b"only qr");
        let err = decode(&buffer, Some(Symbology::Code39), &DecodeConfig::default()).unwrap_err();
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_report_as_keeps_other_results() {
        let result = DecodeResult::new(Symbology::Ean13, b"4006381333931".to_vec(), SymbolSize::Linear { modules: 95 });
        let reported = report_as(result.clone(), None);
        assert_eq!(reported, result);
    }

    #[test]
    fn test_decode_all_single_symbol() {
        let results = decode_all(&rendered(Symbology::Aztec, b"all of them"), &DecodeConfig::default()).unwrap();
        assert_eq!(results[0].symbology, Symbology::Aztec);
        assert_eq!(results[0].payload, b"all of them");
    }

    #[test]
    fn test_decode_all_upc_reported_once() {
        let results = decode_all(&rendered(Symbology::UpcA, b"03600029145"), &DecodeConfig::default()).unwrap();
        assert_eq!(results.iter().filter(|r| r.symbology == Symbology::UpcA).count(), 1);
        assert!(results.iter().all(|r| r.symbology != Symbology::Ean13));
        assert_eq!(results[0].symbology, Symbology::UpcA);
        assert_eq!(results[0].payload, b"036000291452");
    }

    #[test]
    fn test_decode_all_finds_nothing() {
        let buffer = PixelBuffer::filled(120, 90, 128);
        let err = decode_all(&buffer, &DecodeConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
    }

    #[test]
    fn test_despeckle_option() {
        let config = DecodeConfig {
            despeckle: true,
            ..DecodeConfig::default()
        };
        let result = decode(&rendered(Symbology::DataMatrix, b"clean"), None, &config).unwrap();
        assert_eq!(result.payload, b"clean");
    }
}
