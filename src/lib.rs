//! QuickCodes - native multi-symbology barcode encoder and decoder
//!
//! Encodes payloads into EAN-13, UPC-A, Code 128, Code 39, ITF-14, Codabar,
//! QR Code, Data Matrix, PDF417 and Aztec symbols, renders them to pixel
//! buffers and reads them back from images.
//!
//! ```no_run
//! use quickcodes::{Symbology, generate, read_from_image};
//!
//! let image = generate(Symbology::QrCode, b"https://example.com")?;
//! assert_eq!(read_from_image(&image)?, b"https://example.com");
//! # Ok::<(), quickcodes::BarcodeError>(())
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Encode options and decode configuration
pub mod config;
/// Payload recovery from sampled symbols
pub mod decoder;
/// Symbol location in binarized images
pub mod detector;
/// Finite fields and Reed-Solomon
pub mod ecc;
/// Payload to module matrix, per symbology
pub mod encoder;
/// Error taxonomy
pub mod error;
/// Format registry and symbology layouts
pub mod format;
/// Image file reading and writing
pub mod io;
/// Core data structures (BitMatrix, ModuleMatrix, PixelBuffer, ...)
pub mod models;
/// Preprocessing and the decode search
pub mod pipeline;
/// Module matrix to pixel buffer
pub mod render;
/// Majority-vote module reads along sampling grids
pub mod sampler;
/// Utility functions (grayscale, binarization, geometry, bit buffers)
pub mod utils;

pub use config::{DecodeConfig, EncodeOptions};
pub use error::{BarcodeError, ErrorKind, Result};
pub use format::{FormatSpec, lookup, lookup_name};
pub use models::{
    BitMatrix, DecodeResult, ECLevel, Module, ModuleMatrix, PixelBuffer, PixelFormat, Point,
    SymbolSize, Symbology, Version,
};

use log::debug;
use std::path::Path;

/// Encoder and decoder with fixed settings
///
/// The free functions of this crate use `Codec::default()`; build one when
/// the defaults do not fit.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    options: EncodeOptions,
    config: DecodeConfig,
}

impl Codec {
    /// Codec with the given encode options and decode configuration
    pub fn new(options: EncodeOptions, config: DecodeConfig) -> Self {
        Self { options, config }
    }

    /// Codec whose decode configuration comes from the `QUICKCODES_*`
    /// environment variables
    pub fn from_env() -> Self {
        Self::new(EncodeOptions::default(), DecodeConfig::from_env())
    }

    /// Replace the encode options
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the decode configuration
    pub fn with_config(mut self, config: DecodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Encode options in use
    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Decode configuration in use
    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// Build the module matrix of `data`
    pub fn encode(&self, symbology: Symbology, data: &[u8]) -> Result<ModuleMatrix> {
        self.options.validate()?;
        let spec = lookup(symbology);
        let matrix = spec.codec.encode(data, spec, &self.options)?;
        debug!(
            "{symbology}: {} bytes as {}x{} modules",
            data.len(),
            matrix.width(),
            matrix.height()
        );
        Ok(matrix)
    }

    /// Encode and render `data`
    pub fn generate(&self, symbology: Symbology, data: &[u8]) -> Result<PixelBuffer> {
        let matrix = self.encode(symbology, data)?;
        let margin = self.options.margin.unwrap_or(matrix.quiet_zone());
        render::render(&matrix, self.options.scale, margin)
    }

    /// Encode, render and write `data` to `path`
    pub fn generate_to_file(&self, symbology: Symbology, data: &[u8], path: impl AsRef<Path>) -> Result<()> {
        let buffer = self.generate(symbology, data)?;
        io::save(&buffer, path.as_ref())
    }

    /// Decode the first symbol of any supported symbology
    pub fn decode(&self, image: &PixelBuffer) -> Result<DecodeResult> {
        pipeline::decode(image, None, &self.config)
    }

    /// Decode, trying only `hint` when given
    pub fn decode_with_hint(&self, image: &PixelBuffer, hint: Option<Symbology>) -> Result<DecodeResult> {
        pipeline::decode(image, hint, &self.config)
    }

    /// Decode every symbol found in `image`, in priority order
    pub fn decode_all(&self, image: &PixelBuffer) -> Result<Vec<DecodeResult>> {
        pipeline::decode_all(image, &self.config)
    }

    /// Payload of the first symbol found in `image`
    pub fn read_from_image(&self, image: &PixelBuffer) -> Result<Vec<u8>> {
        self.decode(image).map(|result| result.payload)
    }

    /// Payload of the first symbol found in the image file at `path`
    pub fn read_from_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let image = io::load(path.as_ref())?;
        self.read_from_image(&image)
    }

    /// Payloads of every symbol found in the image file at `path`
    pub fn read_all_from_file(&self, path: impl AsRef<Path>) -> Result<Vec<Vec<u8>>> {
        let image = io::load(path.as_ref())?;
        let results = self.decode_all(&image)?;
        Ok(results.into_iter().map(|r| r.payload).collect())
    }
}

/// Module matrix of `data` with custom options
pub fn encode(symbology: Symbology, data: &[u8], options: &EncodeOptions) -> Result<ModuleMatrix> {
    Codec::default().with_options(options.clone()).encode(symbology, data)
}

/// Render `data` as a `symbology` symbol with default options
pub fn generate(symbology: Symbology, data: &[u8]) -> Result<PixelBuffer> {
    Codec::default().generate(symbology, data)
}

/// Render `data` with custom options
pub fn generate_with(symbology: Symbology, data: &[u8], options: &EncodeOptions) -> Result<PixelBuffer> {
    Codec::default().with_options(options.clone()).generate(symbology, data)
}

/// Render `data` and write it to `path` (format from the extension)
pub fn generate_to_file(symbology: Symbology, data: &[u8], path: impl AsRef<Path>) -> Result<()> {
    Codec::default().generate_to_file(symbology, data, path)
}

/// Payload of the first symbol found in `image`
pub fn read_from_image(image: &PixelBuffer) -> Result<Vec<u8>> {
    Codec::default().read_from_image(image)
}

/// Payload of the first symbol found in the image file at `path`
pub fn read_from_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    Codec::default().read_from_file(path)
}

/// Payloads of every symbol found in the image file at `path`
pub fn read_all_from_file(path: impl AsRef<Path>) -> Result<Vec<Vec<u8>>> {
    Codec::default().read_all_from_file(path)
}

/// Decode every symbol found in `image`
pub fn decode_all(image: &PixelBuffer) -> Result<Vec<DecodeResult>> {
    Codec::default().decode_all(image)
}

/// Decode the first symbol found in `image`
pub fn decode(image: &PixelBuffer) -> Result<DecodeResult> {
    Codec::default().decode(image)
}

/// Decode, trying only `hint` when given
pub fn decode_with_hint(image: &PixelBuffer, hint: Option<Symbology>) -> Result<DecodeResult> {
    Codec::default().decode_with_hint(image, hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_defaults_to_quiet_zone() {
        let codec = Codec::default();
        let matrix = codec.encode(Symbology::QrCode, b"margin").unwrap();
        let image = codec.generate(Symbology::QrCode, b"margin").unwrap();
        assert_eq!(image.width(), (matrix.width() + 2 * matrix.quiet_zone()) * 4);
    }

    #[test]
    fn test_custom_margin_and_scale() {
        let options = EncodeOptions {
            scale: 2,
            margin: Some(0),
            ..EncodeOptions::default()
        };
        let matrix = encode(Symbology::DataMatrix, b"dm", &options).unwrap();
        let image = generate_with(Symbology::DataMatrix, b"dm", &options).unwrap();
        assert_eq!(image.width(), matrix.width() * 2);
        assert_eq!(image.height(), matrix.height() * 2);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let err = generate_with(Symbology::QrCode, b"x", &EncodeOptions::with_scale(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOptions);
    }

    #[test]
    fn test_codec_round_trip() {
        let codec = Codec::default().with_config(DecodeConfig {
            try_mirrored: false,
            ..DecodeConfig::default()
        });
        let image = codec.generate(Symbology::Aztec, b"codec").unwrap();
        let result = codec.decode_with_hint(&image, Some(Symbology::Aztec)).unwrap();
        assert_eq!(result.payload, b"codec");
        assert!(!codec.config().try_mirrored);
    }
}
