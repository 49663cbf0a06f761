//! Rejections on encode and failures on decode, including the limits of
//! error correction.

use quickcodes::format::aztec::Layout;
use quickcodes::format::datamatrix::{placement, symbol_for_size};
use quickcodes::format::pdf417::{CODEWORD_MODULES, ROW_HEIGHT, ecc_count, patterns};
use quickcodes::format::qr::{data_positions, function_mask};
use quickcodes::{
    BarcodeError, EncodeOptions, ErrorKind, ModuleMatrix, PixelBuffer, PixelFormat, SymbolSize,
    Symbology, Version, decode, decode_with_hint, encode, generate, generate_to_file, generate_with,
    lookup_name, read_from_image,
};

#[test]
fn test_empty_payload_rejected_everywhere() {
    for symbology in Symbology::ALL {
        let err = generate(symbology, b"").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload, "{symbology}");
        assert!(!err.is_decode_failure());
    }
}

#[test]
fn test_oversized_payloads() {
    let cases: [(Symbology, Vec<u8>); 7] = [
        (Symbology::QrCode, vec![b'x'; 3000]),
        (Symbology::DataMatrix, vec![b'x'; 1600]),
        (Symbology::Aztec, vec![b'x'; 3000]),
        (Symbology::Pdf417, vec![0xA5; 1200]),
        (Symbology::Ean13, b"12345678901234".to_vec()),
        (Symbology::Code128, vec![b'a'; 81]),
        (Symbology::Code39, vec![b'A'; 44]),
    ];
    for (symbology, payload) in cases {
        let err = generate(symbology, &payload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge, "{symbology}");
        assert!(matches!(err, BarcodeError::PayloadTooLarge { .. }));
    }
}

#[test]
fn test_invalid_characters() {
    let err = generate(Symbology::Ean13, b"12345678901a").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    let err = generate(Symbology::Code128, "caf\u{e9}".as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    let err = generate(Symbology::Code39, b"A*B").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayload);
    let err = generate(Symbology::Ean13, b"1234567890123").unwrap_err();
    assert!(err.to_string().contains("check digit"));
}

#[test]
fn test_unknown_names_and_extensions() {
    assert_eq!(lookup_name("maxicode").unwrap_err().kind(), ErrorKind::UnsupportedFormat);
    let path = std::env::temp_dir().join("quickcodes-error-test.unknownext");
    let err = generate_to_file(Symbology::QrCode, b"x", &path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
}

#[test]
fn test_uniform_gray_image() {
    let image = PixelBuffer::filled(200, 150, 128);
    let err = read_from_image(&image).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
    assert!(err.is_decode_failure());
}

#[test]
fn test_zero_area_image() {
    let image = PixelBuffer::new(0, 10, PixelFormat::Gray8, Vec::new()).unwrap();
    assert_eq!(decode(&image).unwrap_err().kind(), ErrorKind::EmptyImage);
}

#[test]
fn test_wrong_ean_check_digit_detected_on_decode() {
    let options = EncodeOptions {
        validate_check_digit: false,
        ..EncodeOptions::default()
    };
    // Correct check digit is 8
    let image = generate_with(Symbology::Ean13, b"1234567890123", &options).unwrap();
    let err = decode_with_hint(&image, Some(Symbology::Ean13)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    assert!(matches!(err, BarcodeError::ChecksumMismatch { expected: 8, found: 3 }));
    assert_eq!(decode(&image).unwrap_err().kind(), ErrorKind::ChecksumMismatch);
}

/// Modules holding the most significant bit of the first seven codewords of
/// a version 1 symbol
const CODEWORD_MSB: [(usize, usize); 7] = [
    (20, 20),
    (20, 16),
    (20, 12),
    (18, 9),
    (18, 13),
    (18, 17),
    (16, 20),
];

/// Paint module (`x`, `y`) of a symbol rendered at `scale` with `margin`
/// quiet modules
fn paint(image: &mut PixelBuffer, (x, y): (usize, usize), dark: bool, scale: usize, margin: usize) {
    let width = image.width();
    let pixels = image.pixels_mut();
    for dy in 0..scale {
        for dx in 0..scale {
            pixels[((y + margin) * scale + dy) * width + (x + margin) * scale + dx] = if dark { 0 } else { 255 };
        }
    }
}

/// Render `payload` and invert the listed modules
fn with_inverted(symbology: Symbology, payload: &[u8], options: &EncodeOptions, modules: &[(usize, usize)]) -> PixelBuffer {
    let matrix = encode(symbology, payload, options).unwrap();
    let mut image = generate_with(symbology, payload, options).unwrap();
    for &(x, y) in modules {
        paint(&mut image, (x, y), !matrix.is_dark(x, y), options.scale, matrix.quiet_zone());
    }
    image
}

/// Version 1-M QR with `flips` codewords damaged
fn damaged_qr(flips: usize) -> PixelBuffer {
    let options = EncodeOptions::default();
    let matrix = encode(Symbology::QrCode, b"01234567", &options).unwrap();
    assert_eq!(matrix.width(), 21);
    with_inverted(Symbology::QrCode, b"01234567", &options, &CODEWORD_MSB[..flips])
}

/// Decode at `capacity` damaged codewords, fail at one more
fn assert_capacity(symbology: Symbology, payload: &[u8], capacity: usize, damaged: impl Fn(usize) -> PixelBuffer) {
    let result = decode_with_hint(&damaged(capacity), Some(symbology)).unwrap();
    assert_eq!(result.payload, payload, "{symbology}");
    assert_eq!(result.errors_corrected, capacity, "{symbology}");

    let err = decode_with_hint(&damaged(capacity + 1), Some(symbology)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UncorrectableError, "{symbology}");
}

#[test]
fn test_qr_correction_capacity() {
    // 1-M carries 10 parity codewords: five errors are correctable
    let result = decode_with_hint(&damaged_qr(5), Some(Symbology::QrCode)).unwrap();
    assert_eq!(result.payload, b"01234567");
    assert_eq!(result.errors_corrected, 5);

    let err = decode_with_hint(&damaged_qr(6), Some(Symbology::QrCode)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UncorrectableError);
}

#[test]
fn test_qr_version_2_correction_capacity() {
    // 2-M: one block of 28 data and 16 parity codewords
    let payload = b"https://example.com";
    let options = EncodeOptions::default();
    let matrix = encode(Symbology::QrCode, payload, &options).unwrap();
    let version = Version::new(2).unwrap();
    assert_eq!(matrix.width(), version.size());
    let positions = data_positions(&function_mask(version));
    let msb: Vec<(usize, usize)> = (0..9).map(|i| positions[i * 8]).collect();

    assert_capacity(Symbology::QrCode, payload, 8, |flips| {
        with_inverted(Symbology::QrCode, payload, &options, &msb[..flips])
    });
}

#[test]
fn test_datamatrix_correction_capacity() {
    let payload = b"DataMatrix!!";
    let options = EncodeOptions::default();
    let matrix = encode(Symbology::DataMatrix, payload, &options).unwrap();
    let info = symbol_for_size(matrix.height(), matrix.width()).unwrap();
    assert_eq!(info.blocks(), 1);
    let capacity = info.ecc_codewords() / 2;
    let msb: Vec<(usize, usize)> = placement(info.mapping_rows(), info.mapping_cols())
        .codewords
        .iter()
        .take(capacity + 1)
        .map(|cells| info.to_symbol(cells[0].row, cells[0].col))
        .collect();

    assert_capacity(Symbology::DataMatrix, payload, capacity, |flips| {
        with_inverted(Symbology::DataMatrix, payload, &options, &msb[..flips])
    });
}

#[test]
fn test_aztec_correction_capacity() {
    // One data word in a compact single layer symbol of 17 six-bit words
    let payload = b"A";
    let options = EncodeOptions::default();
    let result = decode_with_hint(&generate(Symbology::Aztec, payload).unwrap(), Some(Symbology::Aztec)).unwrap();
    assert_eq!(result.size, SymbolSize::Aztec { compact: true, layers: 1 });

    let layout = Layout::new(true, 1).unwrap();
    let width = layout.word_size();
    let offset = layout.total_bits() % width;
    let positions = layout.data_positions();
    let capacity = (layout.total_words() - 1) / 2;
    let first_bits: Vec<(usize, usize)> = (0..=capacity).map(|i| positions[offset + i * width]).collect();

    assert_capacity(Symbology::Aztec, payload, capacity, |flips| {
        with_inverted(Symbology::Aztec, payload, &options, &first_bits[..flips])
    });
}

/// Bar and space widths of the 17 modules starting at column `x` of `row`
fn character_widths(matrix: &ModuleMatrix, x: usize, row: usize) -> [u8; 8] {
    let mut widths = [0u8; 8];
    let mut run = 0;
    for i in 0..CODEWORD_MODULES {
        if i > 0 && matrix.is_dark(x + i, row) != matrix.is_dark(x + i - 1, row) {
            run += 1;
        }
        widths[run] += 1;
    }
    widths
}

/// PDF417 with the first `count` codewords replaced by their successor in
/// the same cluster
fn damaged_pdf417(payload: &[u8], options: &EncodeOptions, count: usize) -> PixelBuffer {
    let matrix = encode(Symbology::Pdf417, payload, options).unwrap();
    let mut image = generate_with(Symbology::Pdf417, payload, options).unwrap();
    let table = patterns();
    let cols = (matrix.width() - 1) / CODEWORD_MODULES - 4;
    for k in 0..count {
        let (row, col) = (k / cols, k % cols);
        let x = CODEWORD_MODULES * (col + 2);
        let y = row * ROW_HEIGHT;
        let (cluster, value) = table.lookup(&character_widths(&matrix, x, y)).unwrap();
        let widths = table.widths(cluster, (value + 1) % 929).unwrap();
        let modules = widths
            .iter()
            .enumerate()
            .flat_map(|(run, &w)| std::iter::repeat_n(run % 2 == 0, w as usize));
        for (i, dark) in modules.enumerate() {
            for dy in 0..ROW_HEIGHT {
                paint(&mut image, (x + i, y + dy), dark, options.scale, matrix.quiet_zone());
            }
        }
    }
    image
}

#[test]
fn test_pdf417_correction_capacity() {
    let payload = b"PDF417 capacity";
    let options = EncodeOptions {
        pdf417_ec_level: Some(2),
        ..EncodeOptions::default()
    };
    let capacity = ecc_count(2) / 2;
    assert_capacity(Symbology::Pdf417, payload, capacity, |count| {
        damaged_pdf417(payload, &options, count)
    });
}

#[test]
fn test_invalid_options() {
    let options = EncodeOptions {
        aztec_ecc_percent: 99,
        ..EncodeOptions::default()
    };
    let err = generate_with(Symbology::Aztec, b"x", &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOptions);
}
