//! Format registry: one immutable [`FormatSpec`] per symbology, each carrying
//! the codec that encodes, locates and decodes it.

pub mod aztec;
mod codecs;
pub mod datamatrix;
pub mod linear;
pub mod pdf417;
pub mod qr;

use crate::config::{DecodeConfig, EncodeOptions};
use crate::ecc::{
    AZTEC_DATA_12, DATA_MATRIX_FIELD_256, Field, PDF417_FIELD, QR_CODE_FIELD_256,
};
use crate::error::{BarcodeError, Result};
use crate::models::{BitMatrix, DecodeResult, ECLevel, ModuleMatrix, Symbology, Version};
use crate::sampler::SamplingGrid;
use std::ops::RangeInclusive;
use std::sync::OnceLock;

/// Encode, locate and decode behaviour of one symbology
pub trait SymbolCodec: Send + Sync {
    /// Build the module matrix for `payload`
    fn encode(
        &self,
        payload: &[u8],
        spec: &FormatSpec,
        options: &EncodeOptions,
    ) -> Result<ModuleMatrix>;

    /// Candidate sampling grids found in a binarized image, best first
    fn locate(&self, binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid>;

    /// Sample `grid` and recover the payload
    fn decode(
        &self,
        binary: &BitMatrix,
        grid: &SamplingGrid,
        spec: &FormatSpec,
        config: &DecodeConfig,
    ) -> Result<DecodeResult>;
}

/// Geometry family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// One row of bars
    Linear,
    /// Square or rectangular module grid
    Matrix,
    /// Rows of linear codewords
    Stacked,
}

/// Characters a payload may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// ASCII digits only
    Digits,
    /// Bytes 0..=127
    Ascii,
    /// Code 39 character set
    Code39,
    /// Codabar digits, `-$:/.+` and the start/stop letters A-D
    Codabar,
    /// Any byte
    Bytes,
}

impl Alphabet {
    /// True if `byte` belongs to the alphabet
    pub fn contains(self, byte: u8) -> bool {
        match self {
            Alphabet::Digits => byte.is_ascii_digit(),
            Alphabet::Ascii => byte.is_ascii(),
            Alphabet::Code39 => linear::code39_value(byte).is_some(),
            Alphabet::Codabar => linear::codabar_value(byte).is_some(),
            Alphabet::Bytes => true,
        }
    }
}

/// Integrity check carried by the symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumRule {
    /// No check character
    None,
    /// GTIN weighted 3/1 modulo 10
    Gtin,
    /// Weighted modulo 103
    Mod103,
    /// Reed-Solomon codewords
    ReedSolomon,
}

/// Error correction block layout
#[derive(Clone, Copy)]
pub enum ErrorCorrection {
    /// Checksum only
    None,
    /// Reed-Solomon over `field`; `description` names the block rule
    ReedSolomon {
        /// Field of the parity symbols
        field: &'static dyn Field,
        /// How parity is sized and split into blocks
        description: &'static str,
    },
}

impl std::fmt::Debug for ErrorCorrection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCorrection::None => write!(f, "None"),
            ErrorCorrection::ReedSolomon { field, description } => f
                .debug_struct("ReedSolomon")
                .field("order", &field.order())
                .field("description", description)
                .finish(),
        }
    }
}

/// One size a symbology can be drawn at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClass {
    /// Width in modules
    pub cols: usize,
    /// Height in modules (1 for linear symbols)
    pub rows: usize,
    /// Data codewords (or characters for linear symbols)
    pub data_codewords: usize,
    /// Error correction codewords at the default level
    pub ecc_codewords: usize,
}

/// Static description of a symbology
pub struct FormatSpec {
    /// Symbology described
    pub symbology: Symbology,
    /// Geometry family
    pub dimension: Dimension,
    /// Accepted payload lengths before encoding; the upper bound is the best
    /// case, the encoder checks the actual fit
    pub payload_len: RangeInclusive<usize>,
    /// Accepted payload characters
    pub alphabet: Alphabet,
    /// Integrity check
    pub checksum: ChecksumRule,
    /// Error correction layout
    pub error_correction: ErrorCorrection,
    /// Size classes ordered by capacity ascending
    pub size_classes: Vec<SizeClass>,
    /// Light border required on every side, in modules
    pub quiet_zone: usize,
    /// Rows a linear symbol is drawn with (module units)
    pub bar_height: usize,
    /// Codec implementation
    pub codec: &'static dyn SymbolCodec,
}

impl std::fmt::Debug for FormatSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatSpec")
            .field("symbology", &self.symbology)
            .field("dimension", &self.dimension)
            .field("payload_len", &self.payload_len)
            .field("alphabet", &self.alphabet)
            .field("checksum", &self.checksum)
            .field("error_correction", &self.error_correction)
            .field("size_classes", &self.size_classes.len())
            .field("quiet_zone", &self.quiet_zone)
            .finish()
    }
}

impl FormatSpec {
    /// Reject empty payloads and payloads beyond the largest size class
    pub(crate) fn check_length(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(BarcodeError::invalid(self.symbology, "payload is empty"));
        }
        let max = *self.payload_len.end();
        if len > max {
            return Err(BarcodeError::PayloadTooLarge {
                symbology: self.symbology,
                len,
                max,
            });
        }
        if len < *self.payload_len.start() {
            return Err(BarcodeError::invalid(
                self.symbology,
                format!(
                    "payload has {} characters, at least {} required",
                    len,
                    self.payload_len.start()
                ),
            ));
        }
        Ok(())
    }

    /// Reject bytes outside the alphabet, naming the first offender
    pub(crate) fn check_alphabet(&self, payload: &[u8]) -> Result<()> {
        if let Some((i, &b)) = payload
            .iter()
            .enumerate()
            .find(|&(_, &b)| !self.alphabet.contains(b))
        {
            return Err(BarcodeError::invalid(
                self.symbology,
                format!("byte {:#04x} at offset {} is not in the {:?} alphabet", b, i, self.alphabet),
            ));
        }
        Ok(())
    }
}

/// Decode order used when no symbology is hinted
pub const PRIORITY: [Symbology; 10] = [
    Symbology::QrCode,
    Symbology::DataMatrix,
    Symbology::Aztec,
    Symbology::Pdf417,
    Symbology::Code128,
    Symbology::Ean13,
    Symbology::UpcA,
    Symbology::Code39,
    Symbology::Itf14,
    Symbology::Codabar,
];

static REGISTRY: OnceLock<Vec<FormatSpec>> = OnceLock::new();

fn registry() -> &'static [FormatSpec] {
    REGISTRY.get_or_init(build_registry)
}

/// Registry entry of `symbology`
pub fn lookup(symbology: Symbology) -> &'static FormatSpec {
    // Registry is built in declaration order, matching the discriminants
    &registry()[symbology as usize]
}

/// Registry entry by name, e.g. `"qr"` or `"ean-13"`
pub fn lookup_name(name: &str) -> Result<&'static FormatSpec> {
    let symbology: Symbology = name.parse()?;
    Ok(lookup(symbology))
}

/// Specs in unhinted decode order
pub fn priority() -> impl Iterator<Item = &'static FormatSpec> {
    PRIORITY.iter().map(|&s| lookup(s))
}

fn linear_classes(modules: usize, characters: usize) -> Vec<SizeClass> {
    vec![SizeClass {
        cols: modules,
        rows: 1,
        data_codewords: characters,
        ecc_codewords: 0,
    }]
}

fn build_registry() -> Vec<FormatSpec> {
    Symbology::ALL.iter().map(|&s| build_spec(s)).collect()
}

fn build_spec(symbology: Symbology) -> FormatSpec {
    match symbology {
        Symbology::QrCode => FormatSpec {
            symbology,
            dimension: Dimension::Matrix,
            payload_len: 1..=qr::MAX_PAYLOAD_LEN,
            alphabet: Alphabet::Bytes,
            checksum: ChecksumRule::ReedSolomon,
            error_correction: ErrorCorrection::ReedSolomon {
                field: &QR_CODE_FIELD_256,
                description: "per-version block table, level L/M/Q/H",
            },
            size_classes: (1..=40u8)
                .filter_map(Version::new)
                .filter_map(|v| {
                    let blocks = qr::ec_blocks(v, ECLevel::M)?;
                    Some(SizeClass {
                        cols: v.size(),
                        rows: v.size(),
                        data_codewords: blocks.data_codewords(),
                        ecc_codewords: blocks.ecc_per_block * blocks.num_blocks,
                    })
                })
                .collect(),
            quiet_zone: 4,
            bar_height: 0,
            codec: &codecs::QR,
        },
        Symbology::DataMatrix => FormatSpec {
            symbology,
            dimension: Dimension::Matrix,
            payload_len: 1..=datamatrix::MAX_PAYLOAD_LEN,
            alphabet: Alphabet::Bytes,
            checksum: ChecksumRule::ReedSolomon,
            error_correction: ErrorCorrection::ReedSolomon {
                field: &DATA_MATRIX_FIELD_256,
                description: "ECC200 fixed parity per symbol size, interleaved blocks",
            },
            size_classes: datamatrix::SYMBOLS
                .iter()
                .map(|s| SizeClass {
                    cols: s.cols,
                    rows: s.rows,
                    data_codewords: s.data_codewords,
                    ecc_codewords: s.ecc_codewords(),
                })
                .collect(),
            quiet_zone: 1,
            bar_height: 0,
            codec: &codecs::DATA_MATRIX,
        },
        Symbology::Aztec => FormatSpec {
            symbology,
            dimension: Dimension::Matrix,
            payload_len: 1..=aztec::MAX_PAYLOAD_LEN,
            alphabet: Alphabet::Bytes,
            checksum: ChecksumRule::ReedSolomon,
            error_correction: ErrorCorrection::ReedSolomon {
                field: &AZTEC_DATA_12,
                description: "GF(2^6..2^12) by layer count, 33% + 3 words by default",
            },
            size_classes: aztec::size_classes(),
            quiet_zone: 1,
            bar_height: 0,
            codec: &codecs::AZTEC,
        },
        Symbology::Pdf417 => FormatSpec {
            symbology,
            dimension: Dimension::Stacked,
            payload_len: 1..=pdf417::MAX_PAYLOAD_LEN,
            alphabet: Alphabet::Bytes,
            checksum: ChecksumRule::ReedSolomon,
            error_correction: ErrorCorrection::ReedSolomon {
                field: &PDF417_FIELD,
                description: "2^(level+1) parity codewords, level by data size",
            },
            size_classes: pdf417::size_classes(),
            quiet_zone: 2,
            bar_height: pdf417::ROW_HEIGHT,
            codec: &codecs::PDF417,
        },
        Symbology::Code128 => FormatSpec {
            symbology,
            dimension: Dimension::Linear,
            payload_len: 1..=linear::CODE128_MAX_LEN,
            alphabet: Alphabet::Ascii,
            checksum: ChecksumRule::Mod103,
            error_correction: ErrorCorrection::None,
            size_classes: Vec::new(),
            quiet_zone: 10,
            bar_height: linear::BAR_HEIGHT,
            codec: &codecs::CODE128,
        },
        Symbology::Ean13 => FormatSpec {
            symbology,
            dimension: Dimension::Linear,
            payload_len: 12..=13,
            alphabet: Alphabet::Digits,
            checksum: ChecksumRule::Gtin,
            error_correction: ErrorCorrection::None,
            size_classes: linear_classes(95, 13),
            quiet_zone: 11,
            bar_height: linear::BAR_HEIGHT,
            codec: &codecs::EAN13,
        },
        Symbology::UpcA => FormatSpec {
            symbology,
            dimension: Dimension::Linear,
            payload_len: 11..=12,
            alphabet: Alphabet::Digits,
            checksum: ChecksumRule::Gtin,
            error_correction: ErrorCorrection::None,
            size_classes: linear_classes(95, 12),
            quiet_zone: 9,
            bar_height: linear::BAR_HEIGHT,
            codec: &codecs::UPC_A,
        },
        Symbology::Code39 => FormatSpec {
            symbology,
            dimension: Dimension::Linear,
            payload_len: 1..=linear::CODE39_MAX_LEN,
            alphabet: Alphabet::Code39,
            checksum: ChecksumRule::None,
            error_correction: ErrorCorrection::None,
            size_classes: Vec::new(),
            quiet_zone: 10,
            bar_height: linear::BAR_HEIGHT,
            codec: &codecs::CODE39,
        },
        Symbology::Itf14 => FormatSpec {
            symbology,
            dimension: Dimension::Linear,
            payload_len: 13..=14,
            alphabet: Alphabet::Digits,
            checksum: ChecksumRule::Gtin,
            error_correction: ErrorCorrection::None,
            size_classes: linear_classes(linear::ITF14_MODULES, 14),
            quiet_zone: 10,
            bar_height: linear::BAR_HEIGHT,
            codec: &codecs::ITF14,
        },
        Symbology::Codabar => FormatSpec {
            symbology,
            dimension: Dimension::Linear,
            payload_len: 1..=linear::CODABAR_MAX_LEN,
            alphabet: Alphabet::Codabar,
            checksum: ChecksumRule::None,
            error_correction: ErrorCorrection::None,
            size_classes: Vec::new(),
            quiet_zone: 10,
            bar_height: linear::BAR_HEIGHT,
            codec: &codecs::CODABAR,
        },
    }
}
