//! Utility functions for image processing and bit handling
//!
//! - Grayscale conversion (RGB/RGBA to luminance)
//! - Binarization (block-adaptive, Otsu and fixed threshold)
//! - Geometry (perspective transforms)
//! - MSB-first bit buffers

pub mod binarization;
pub mod bits;
pub mod geometry;
pub mod grayscale;
