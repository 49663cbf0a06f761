/// Luminance conversion for decode input.
/// Y = 0.299*R + 0.587*G + 0.114*B
/// Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8
use crate::models::{PixelBuffer, PixelFormat};
use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8).min(255) as u8
}

/// Grayscale plane of any pixel buffer; Gray8 input is copied as-is
pub fn to_grayscale(buffer: &PixelBuffer) -> Vec<u8> {
    let (width, height) = (buffer.width(), buffer.height());
    match buffer.format() {
        PixelFormat::Gray8 => buffer.pixels().to_vec(),
        PixelFormat::Rgb8 => interleaved_to_grayscale(buffer.pixels(), width, height, 3),
        PixelFormat::Rgba8 => interleaved_to_grayscale(buffer.pixels(), width, height, 4),
    }
}

/// Convert RGB to grayscale, processing rows in parallel
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    interleaved_to_grayscale(rgb, width, height, 3)
}

/// Convert RGBA to grayscale (ignores alpha channel)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    interleaved_to_grayscale(rgba, width, height, 4)
}

fn interleaved_to_grayscale(src: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * channels;
        let src_row = &src[row_start..row_start + width * channels];
        for (dst, px) in row.iter_mut().zip(src_row.chunks_exact(channels)) {
            *dst = luma(px[0], px[1], px[2]);
        }
    });

    gray
}
