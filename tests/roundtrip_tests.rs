//! Generate-then-read round trips through the public API: rendering,
//! binarization, location, sampling and decoding for every symbology.

use quickcodes::{
    Codec, DecodeConfig, EncodeOptions, ErrorKind, PixelBuffer, PixelFormat, SymbolSize, Symbology,
    decode, decode_all, decode_with_hint, generate, generate_to_file, generate_with, read_all_from_file,
    read_from_file, read_from_image,
};

fn round_trip(symbology: Symbology, payload: &[u8]) -> Vec<u8> {
    let image = generate(symbology, payload).unwrap();
    let result = decode_with_hint(&image, Some(symbology)).unwrap();
    assert_eq!(result.symbology, symbology);
    result.payload
}

#[test]
fn test_ean13_check_digit_appended() {
    let image = generate(Symbology::Ean13, b"123456789012").unwrap();
    assert_eq!(read_from_image(&image).unwrap(), b"1234567890128");
}

#[test]
fn test_qr_url() {
    let image = generate(Symbology::QrCode, b"https://example.com").unwrap();
    let result = decode(&image).unwrap();
    assert_eq!(result.symbology, Symbology::QrCode);
    assert_eq!(result.payload, b"https://example.com");
    assert_eq!(result.errors_corrected, 0);
}

#[test]
fn test_linear_round_trips() {
    assert_eq!(round_trip(Symbology::Ean13, b"4006381333931"), b"4006381333931");
    assert_eq!(round_trip(Symbology::UpcA, b"03600029145"), b"036000291452");
    assert_eq!(round_trip(Symbology::Code128, b"Hello, Code 128!"), b"Hello, Code 128!");
    assert_eq!(round_trip(Symbology::Code128, b"1234567890"), b"1234567890");
    assert_eq!(round_trip(Symbology::Code39, b"code-39 $/+%"), b"CODE-39 $/+%");
    assert_eq!(round_trip(Symbology::Itf14, b"1234567890123"), b"12345678901231");
    assert_eq!(round_trip(Symbology::Codabar, b"A1234567890B"), b"A1234567890B");
    assert_eq!(round_trip(Symbology::Codabar, b"c-$:/.+d"), b"C-$:/.+D");
}

#[test]
fn test_codabar_read_without_hint() {
    let image = generate(Symbology::Codabar, b"31117013206375").unwrap();
    let result = decode(&image).unwrap();
    assert_eq!(result.symbology, Symbology::Codabar);
    assert_eq!(result.payload, b"A31117013206375A");
}

#[test]
fn test_separators_stripped() {
    assert_eq!(round_trip(Symbology::Ean13, b"400-6381 33393-1"), b"4006381333931");
}

#[test]
fn test_upc_read_without_hint() {
    let image = generate(Symbology::UpcA, b"036000291452").unwrap();
    let result = decode(&image).unwrap();
    assert_eq!(result.symbology, Symbology::UpcA);
    assert_eq!(result.payload, b"036000291452");
}

#[test]
fn test_matrix_round_trips() {
    let payloads: [&[u8]; 3] = [
        b"Hello DataMatrix 2024",
        b"0123456789012345678901234567890123456789",
        b"\x00binary\xffbytes\x80",
    ];
    for symbology in [Symbology::QrCode, Symbology::DataMatrix, Symbology::Aztec, Symbology::Pdf417] {
        for payload in payloads {
            assert_eq!(round_trip(symbology, payload), payload, "{symbology}");
        }
    }
}

#[test]
fn test_unhinted_finds_each_two_dimensional_symbol() {
    for symbology in [Symbology::QrCode, Symbology::DataMatrix, Symbology::Aztec, Symbology::Pdf417] {
        let image = generate(symbology, b"which one?").unwrap();
        let result = decode(&image).unwrap();
        assert_eq!(result.symbology, symbology);
        assert_eq!(result.payload, b"which one?");
    }
}

#[test]
fn test_size_descriptors() {
    let image = generate(Symbology::QrCode, b"01234567").unwrap();
    assert_eq!(decode(&image).unwrap().size, SymbolSize::QrVersion(1));

    let image = generate(Symbology::DataMatrix, b"A").unwrap();
    assert_eq!(
        decode(&image).unwrap().size,
        SymbolSize::DataMatrix { rows: 10, cols: 10 }
    );

    let image = generate(Symbology::Aztec, b"A").unwrap();
    assert_eq!(
        decode(&image).unwrap().size,
        SymbolSize::Aztec {
            compact: true,
            layers: 1
        }
    );
}

#[test]
fn test_rgb_input() {
    let gray = generate(Symbology::QrCode, b"rgb").unwrap();
    let rgb: Vec<u8> = gray.pixels().iter().flat_map(|&v| [v, v, v]).collect();
    let image = PixelBuffer::new(gray.width(), gray.height(), PixelFormat::Rgb8, rgb).unwrap();
    assert_eq!(read_from_image(&image).unwrap(), b"rgb");
}

#[test]
fn test_options_change_the_symbol() {
    let high = EncodeOptions {
        qr_ec_level: quickcodes::ECLevel::H,
        scale: 3,
        ..EncodeOptions::default()
    };
    let image = generate_with(Symbology::QrCode, b"high level", &high).unwrap();
    let default = generate(Symbology::QrCode, b"high level").unwrap();
    assert!(image.width() / 3 > default.width() / 4);
    assert_eq!(read_from_image(&image).unwrap(), b"high level");

    let pdf = EncodeOptions {
        pdf417_ec_level: Some(6),
        ..EncodeOptions::default()
    };
    let image = generate_with(Symbology::Pdf417, b"level six", &pdf).unwrap();
    let result = decode(&image).unwrap();
    assert!(matches!(result.size, SymbolSize::Pdf417 { ec_level: 6, .. }));
}

#[test]
fn test_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("quickcodes-roundtrip-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("symbol.png");
    generate_to_file(Symbology::DataMatrix, b"on disk", &path).unwrap();
    let payload = read_from_file(&path).unwrap();
    std::fs::remove_dir_all(&dir).ok();
    assert_eq!(payload, b"on disk");
}

/// Two grayscale images next to each other on a white canvas
fn side_by_side(left: &PixelBuffer, right: &PixelBuffer) -> PixelBuffer {
    let width = left.width() + right.width();
    let height = left.height().max(right.height());
    let mut pixels = vec![255u8; width * height];
    for (offset, part) in [(0, left), (left.width(), right)] {
        for (y, row) in part.pixels().chunks(part.width()).enumerate() {
            let start = y * width + offset;
            pixels[start..start + part.width()].copy_from_slice(row);
        }
    }
    PixelBuffer::new(width, height, PixelFormat::Gray8, pixels).unwrap()
}

#[test]
fn test_decode_all_reads_two_symbols() {
    let qr = generate(Symbology::QrCode, b"left symbol").unwrap();
    let dm = generate(Symbology::DataMatrix, b"right symbol").unwrap();
    let image = side_by_side(&qr, &dm);

    let results = decode_all(&image).unwrap();
    assert_eq!(results[0].symbology, Symbology::QrCode);
    assert_eq!(results[0].payload, b"left symbol");
    assert!(
        results
            .iter()
            .any(|r| r.symbology == Symbology::DataMatrix && r.payload == b"right symbol")
    );
    // The first-symbol API still stops at the highest priority
    assert_eq!(read_from_image(&image).unwrap(), b"left symbol");
}

#[test]
fn test_read_all_from_file() {
    let dir = std::env::temp_dir().join(format!("quickcodes-read-all-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("two.png");
    let image = side_by_side(
        &generate(Symbology::Aztec, b"first").unwrap(),
        &generate(Symbology::Pdf417, b"second").unwrap(),
    );
    quickcodes::io::save(&image, &path).unwrap();
    let payloads = read_all_from_file(&path).unwrap();
    std::fs::remove_dir_all(&dir).ok();
    assert!(payloads.contains(&b"first".to_vec()));
    assert!(payloads.contains(&b"second".to_vec()));
}

#[test]
fn test_decode_all_blank_image() {
    let err = decode_all(&PixelBuffer::filled(64, 64, 255)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
}

#[test]
fn test_codec_with_settings() {
    let codec = Codec::new(
        EncodeOptions::with_scale(2),
        DecodeConfig {
            linear_scan_lines: 5,
            ..DecodeConfig::default()
        },
    );
    let image = codec.generate(Symbology::Code128, b"codec").unwrap();
    assert_eq!(codec.read_from_image(&image).unwrap(), b"codec");
}
