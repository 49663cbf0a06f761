//! Symbol location in binarized images
//!
//! Each locator turns a binary image into candidate sampling grids:
//! - QR finder pattern triples mapped through a perspective transform
//! - Data Matrix L-shaped finder and timing edges
//! - Aztec bullseye rings
//! - PDF417 start pattern columns
//! - Linear guard patterns along scan lines

/// Aztec bullseye locator
pub mod aztec;
/// Data Matrix finder and timing edges
pub mod datamatrix;
/// QR finder pattern detection using 1:1:3:1:1 ratio scanning
pub mod finder;
/// Linear start/stop pattern scanning
pub mod linear;
/// PDF417 start pattern scanning
pub mod pdf417;
/// QR finder grouping and grid construction
pub mod qr;
