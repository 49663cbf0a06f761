//! Symbol construction: payload to module matrix for every symbology

/// Aztec Code (compact and full-range)
pub mod aztec;
/// Data Matrix ECC200, ASCII encodation
pub mod datamatrix;
/// EAN-13, UPC-A, Code 128, Code 39 and ITF-14
pub mod linear;
/// PDF417 with text, byte and numeric compaction
pub mod pdf417;
/// QR Code model 2
pub mod qr;
