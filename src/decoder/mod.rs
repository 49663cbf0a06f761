//! Payload recovery from sampled symbols
//!
//! Matrix decoders work on a module grid, the linear decoder on one module
//! row, the PDF417 decoder on scan-line runs and the Aztec decoder samples
//! its own grid once the mode message gives the symbol size.

/// Aztec mode message, layers and high-level decoding
pub mod aztec;
/// Data Matrix codeword placement, blocks and encodation schemes
pub mod datamatrix;
/// Module-row decoders for the linear symbologies
pub mod linear;
/// PDF417 row assembly and compaction modes
pub mod pdf417;
/// QR format/version information, unmasking and segments
pub mod qr;
