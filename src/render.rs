//! Raster rendering of module matrices.

use crate::error::{BarcodeError, Result};
use crate::models::{ModuleMatrix, PixelBuffer, PixelFormat};
use rayon::prelude::*;

/// Gray value of dark modules
pub const DARK: u8 = 0;
/// Gray value of light modules and margins
pub const LIGHT: u8 = 255;

/// Draw `matrix` with each module as a `scale` x `scale` block and `margin`
/// light modules on every side.
pub fn render(matrix: &ModuleMatrix, scale: usize, margin: usize) -> Result<PixelBuffer> {
    if scale == 0 {
        return Err(BarcodeError::InvalidOptions(
            "scale must be at least 1".into(),
        ));
    }

    let width = (matrix.width() + 2 * margin) * scale;
    let height = (matrix.height() + 2 * margin) * scale;
    let mut pixels = vec![LIGHT; width * height];
    if width == 0 {
        return PixelBuffer::new(0, height, PixelFormat::Gray8, pixels);
    }

    pixels.par_chunks_mut(width).enumerate().for_each(|(py, row)| {
        let my = py / scale;
        if my < margin || my >= margin + matrix.height() {
            return;
        }
        let y = my - margin;
        for x in 0..matrix.width() {
            if matrix.is_dark(x, y) {
                let start = (x + margin) * scale;
                row[start..start + scale].fill(DARK);
            }
        }
    });

    PixelBuffer::new(width, height, PixelFormat::Gray8, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_scales_and_pads() {
        let matrix = ModuleMatrix::linear(&[true, false, true], 1);
        let buf = render(&matrix, 2, 1).unwrap();
        assert_eq!(buf.width(), 10);
        assert_eq!(buf.height(), 6);
        assert_eq!(buf.luma(0, 2), Some(LIGHT));
        assert_eq!(buf.luma(2, 2), Some(DARK));
        assert_eq!(buf.luma(3, 3), Some(DARK));
        assert_eq!(buf.luma(4, 2), Some(LIGHT));
        assert_eq!(buf.luma(6, 3), Some(DARK));
        assert_eq!(buf.luma(6, 1), Some(LIGHT));
    }

    #[test]
    fn test_zero_scale_is_rejected() {
        let matrix = ModuleMatrix::linear(&[true], 1);
        let err = render(&matrix, 0, 4).unwrap_err();
        assert!(matches!(err, BarcodeError::InvalidOptions(_)));
    }
}
