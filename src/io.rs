//! Image files at the crate boundary, through the `image` crate.

use crate::error::{BarcodeError, Result};
use crate::models::{PixelBuffer, PixelFormat};
use image::{ColorType, DynamicImage, ImageFormat};
use log::debug;
use std::path::Path;

fn dimension(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| BarcodeError::InvalidOptions(format!("image dimension {value} exceeds u32")))
}

/// Write `buffer` to `path`, the file format chosen by the extension
pub fn save(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .map_err(|_| BarcodeError::UnsupportedFormat(format!("no image format for {}", path.display())))?;
    let color = match buffer.format() {
        PixelFormat::Gray8 => ColorType::L8,
        PixelFormat::Rgb8 => ColorType::Rgb8,
        PixelFormat::Rgba8 => ColorType::Rgba8,
    };
    image::save_buffer_with_format(
        path,
        buffer.pixels(),
        dimension(buffer.width())?,
        dimension(buffer.height())?,
        color,
        format,
    )?;
    debug!("wrote {}x{} {format:?} to {}", buffer.width(), buffer.height(), path.display());
    Ok(())
}

/// Read an image file into a pixel buffer
pub fn load(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path)?;
    let (width, height) = (img.width() as usize, img.height() as usize);
    debug!("read {width}x{height} {:?} from {}", img.color(), path.display());
    match img {
        DynamicImage::ImageLuma8(gray) => PixelBuffer::new(width, height, PixelFormat::Gray8, gray.into_raw()),
        DynamicImage::ImageRgba8(rgba) => PixelBuffer::new(width, height, PixelFormat::Rgba8, rgba.into_raw()),
        other => PixelBuffer::new(width, height, PixelFormat::Rgb8, other.to_rgb8().into_raw()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("quickcodes-io-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_png_round_trip() {
        let data: Vec<u8> = (0..48u8).map(|v| v * 5).collect();
        let buffer = PixelBuffer::new(8, 6, PixelFormat::Gray8, data).unwrap();
        let path = temp_path("gray.png");
        save(&buffer, &path).unwrap();
        let loaded = load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, buffer);
    }

    #[test]
    fn test_rgb_round_trip() {
        let data: Vec<u8> = (0..4 * 3 * 3).map(|v| v as u8).collect();
        let buffer = PixelBuffer::new(4, 3, PixelFormat::Rgb8, data).unwrap();
        let path = temp_path("rgb.png");
        save(&buffer, &path).unwrap();
        let loaded = load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, buffer);
    }

    #[test]
    fn test_unknown_extension() {
        let buffer = PixelBuffer::filled(4, 4, 255);
        let err = save(&buffer, &temp_path("symbol.xyz")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_missing_file() {
        let err = load(&temp_path("does-not-exist.png")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Image);
    }
}
