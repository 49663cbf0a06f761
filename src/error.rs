//! Error taxonomy shared by every encode and decode stage.

use crate::models::Symbology;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BarcodeError>;

/// Failure of an encode or decode operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarcodeError {
    /// Data violates the symbology's constraints (length, alphabet, check digit)
    #[error("invalid payload for {symbology}: {reason}")]
    InvalidPayload {
        /// Symbology the payload was validated against
        symbology: Symbology,
        /// Constraint that was violated
        reason: String,
    },

    /// Unknown symbology identifier or file format
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Payload does not fit the largest size class
    #[error("payload too large for {symbology}: {len} units, maximum {max}")]
    PayloadTooLarge {
        /// Symbology that was asked to hold the payload
        symbology: Symbology,
        /// Size of the payload in the symbology's own units
        len: usize,
        /// Largest size the symbology accepts
        max: usize,
    },

    /// Decode input has zero area
    #[error("image has zero area")]
    EmptyImage,

    /// No finder or guard pattern was located
    #[error("no barcode symbol found")]
    SymbolNotFound,

    /// A 1-D check digit or checksum did not verify
    #[error("checksum mismatch: expected {expected}, found {found}")]
    ChecksumMismatch {
        /// Value computed from the decoded data
        expected: u32,
        /// Value read from the symbol
        found: u32,
    },

    /// Reed-Solomon correction capacity was exceeded
    #[error("uncorrectable error: {0}")]
    UncorrectableError(String),

    /// Corrected data is internally inconsistent
    #[error("malformed bitstream: {0}")]
    MalformedBitstream(String),

    /// Finite-field division by zero
    #[error("division by zero in finite field arithmetic")]
    DivisionByZero,

    /// Caller supplied unusable options (e.g. zero scale)
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Image file codec or I/O failure at the crate boundary
    #[error("image I/O error: {0}")]
    Image(String),
}

/// Discriminant of [`BarcodeError`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`BarcodeError::InvalidPayload`]
    InvalidPayload,
    /// See [`BarcodeError::UnsupportedFormat`]
    UnsupportedFormat,
    /// See [`BarcodeError::PayloadTooLarge`]
    PayloadTooLarge,
    /// See [`BarcodeError::EmptyImage`]
    EmptyImage,
    /// See [`BarcodeError::SymbolNotFound`]
    SymbolNotFound,
    /// See [`BarcodeError::ChecksumMismatch`]
    ChecksumMismatch,
    /// See [`BarcodeError::UncorrectableError`]
    UncorrectableError,
    /// See [`BarcodeError::MalformedBitstream`]
    MalformedBitstream,
    /// See [`BarcodeError::DivisionByZero`]
    DivisionByZero,
    /// See [`BarcodeError::InvalidOptions`]
    InvalidOptions,
    /// See [`BarcodeError::Image`]
    Image,
}

impl BarcodeError {
    /// Kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BarcodeError::InvalidPayload { .. } => ErrorKind::InvalidPayload,
            BarcodeError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            BarcodeError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            BarcodeError::EmptyImage => ErrorKind::EmptyImage,
            BarcodeError::SymbolNotFound => ErrorKind::SymbolNotFound,
            BarcodeError::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            BarcodeError::UncorrectableError(_) => ErrorKind::UncorrectableError,
            BarcodeError::MalformedBitstream(_) => ErrorKind::MalformedBitstream,
            BarcodeError::DivisionByZero => ErrorKind::DivisionByZero,
            BarcodeError::InvalidOptions(_) => ErrorKind::InvalidOptions,
            BarcodeError::Image(_) => ErrorKind::Image,
        }
    }

    /// True for failures that can only arise while reading an image.
    ///
    /// Callers use this to decide between retrying with a clearer capture and
    /// rejecting the input data.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::EmptyImage
                | ErrorKind::SymbolNotFound
                | ErrorKind::ChecksumMismatch
                | ErrorKind::UncorrectableError
                | ErrorKind::MalformedBitstream
        )
    }

    pub(crate) fn invalid(symbology: Symbology, reason: impl Into<String>) -> Self {
        BarcodeError::InvalidPayload {
            symbology,
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        BarcodeError::MalformedBitstream(reason.into())
    }

    pub(crate) fn uncorrectable(reason: impl Into<String>) -> Self {
        BarcodeError::UncorrectableError(reason.into())
    }
}

impl From<image::ImageError> for BarcodeError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => BarcodeError::UnsupportedFormat(e.to_string()),
            other => BarcodeError::Image(other.to_string()),
        }
    }
}

impl From<std::io::Error> for BarcodeError {
    fn from(err: std::io::Error) -> Self {
        BarcodeError::Image(err.to_string())
    }
}
