//! Encode options and decode configuration.
//!
//! Decode defaults can be overridden through `QUICKCODES_*` environment
//! variables, read once per process.

use crate::error::{BarcodeError, Result};
use crate::models::{ECLevel, Version};
use std::sync::OnceLock;

/// Settings for symbol construction and rendering
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    /// Pixels per module edge
    pub scale: usize,
    /// Light modules around the symbol; `None` uses the symbology's quiet zone
    pub margin: Option<usize>,
    /// QR error correction level
    pub qr_ec_level: ECLevel,
    /// Smallest QR version to consider
    pub qr_min_version: Option<Version>,
    /// Aztec error correction share of the symbol, in percent
    pub aztec_ecc_percent: usize,
    /// PDF417 error correction level (0-8); `None` picks it from the data size
    pub pdf417_ec_level: Option<u8>,
    /// Reject EAN/UPC/ITF input whose supplied check digit is wrong
    pub validate_check_digit: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            scale: 4,
            margin: None,
            qr_ec_level: ECLevel::M,
            qr_min_version: None,
            aztec_ecc_percent: 33,
            pdf417_ec_level: None,
            validate_check_digit: true,
        }
    }
}

impl EncodeOptions {
    /// Options with the given module scale
    pub fn with_scale(scale: usize) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.scale == 0 {
            return Err(BarcodeError::InvalidOptions("scale must be at least 1".into()));
        }
        if !(5..=95).contains(&self.aztec_ecc_percent) {
            return Err(BarcodeError::InvalidOptions(format!(
                "aztec_ecc_percent {} outside 5..=95",
                self.aztec_ecc_percent
            )));
        }
        if let Some(level) = self.pdf417_ec_level.filter(|&l| l > 8) {
            return Err(BarcodeError::InvalidOptions(format!(
                "pdf417_ec_level {} outside 0..=8",
                level
            )));
        }
        Ok(())
    }
}

/// Settings for the decode pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeConfig {
    /// Candidates scoring below this (0.0-1.0) are discarded by the locators
    pub min_confidence: f32,
    /// Rows sampled per band when scanning for linear symbols
    pub linear_scan_lines: usize,
    /// Remove isolated pixels after binarization
    pub despeckle: bool,
    /// Retry matrix symbols read mirror-image
    pub try_mirrored: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            linear_scan_lines: 15,
            despeckle: false,
            try_mirrored: true,
        }
    }
}

impl DecodeConfig {
    /// Defaults overridden by `QUICKCODES_MIN_CONFIDENCE`,
    /// `QUICKCODES_SCAN_LINES`, `QUICKCODES_DESPECKLE` and
    /// `QUICKCODES_TRY_MIRRORED`
    pub fn from_env() -> Self {
        Self {
            min_confidence: env_min_confidence(),
            linear_scan_lines: env_scan_lines(),
            despeckle: env_despeckle(),
            try_mirrored: env_try_mirrored(),
        }
    }
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

static MIN_CONFIDENCE: OnceLock<f32> = OnceLock::new();

fn env_min_confidence() -> f32 {
    *MIN_CONFIDENCE.get_or_init(|| {
        parse_env_f32(
            "QUICKCODES_MIN_CONFIDENCE",
            DecodeConfig::default().min_confidence,
        )
        .clamp(0.0, 1.0)
    })
}

static SCAN_LINES: OnceLock<usize> = OnceLock::new();

fn env_scan_lines() -> usize {
    *SCAN_LINES.get_or_init(|| {
        parse_env_usize(
            "QUICKCODES_SCAN_LINES",
            DecodeConfig::default().linear_scan_lines,
        )
        .clamp(1, 64)
    })
}

static DESPECKLE: OnceLock<bool> = OnceLock::new();

fn env_despeckle() -> bool {
    *DESPECKLE.get_or_init(|| parse_env_bool_u8("QUICKCODES_DESPECKLE", false))
}

static TRY_MIRRORED: OnceLock<bool> = OnceLock::new();

fn env_try_mirrored() -> bool {
    *TRY_MIRRORED.get_or_init(|| parse_env_bool_u8("QUICKCODES_TRY_MIRRORED", true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EncodeOptions::default();
        assert_eq!(options.scale, 4);
        assert_eq!(options.qr_ec_level, ECLevel::M);
        assert!(options.validate().is_ok());
        let config = DecodeConfig::default();
        assert!(config.try_mirrored);
        assert!(!config.despeckle);
    }

    #[test]
    fn test_zero_scale_rejected() {
        let err = EncodeOptions::with_scale(0).validate().unwrap_err();
        assert!(matches!(err, BarcodeError::InvalidOptions(_)));
    }

    #[test]
    fn test_out_of_range_levels_rejected() {
        let options = EncodeOptions {
            pdf417_ec_level: Some(9),
            ..EncodeOptions::default()
        };
        assert!(options.validate().is_err());
        let options = EncodeOptions {
            aztec_ecc_percent: 0,
            ..EncodeOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
