use crate::error::{BarcodeError, Result};

/// Sample layout of a [`PixelBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// One luminance byte per pixel
    Gray8,
    /// Three bytes per pixel
    Rgb8,
    /// Four bytes per pixel, alpha ignored
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Owned raster image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw samples, checking the length against the dimensions
    pub fn new(width: usize, height: usize, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width * height * format.channels();
        if data.len() != expected {
            return Err(BarcodeError::InvalidOptions(format!(
                "pixel data has {} bytes, {}x{} {:?} needs {}",
                data.len(),
                width,
                height,
                format,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Grayscale buffer filled with one value
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Gray8,
            data: vec![value; width * height],
        }
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Sample layout
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// True when width or height is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw samples
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw samples
    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume into raw samples
    pub fn into_pixels(self) -> Vec<u8> {
        self.data
    }

    /// Gray value at (x, y) for a Gray8 buffer
    pub fn luma(&self, x: usize, y: usize) -> Option<u8> {
        if self.format != PixelFormat::Gray8 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }
}
