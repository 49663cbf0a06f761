use super::Symbology;
use std::fmt;

/// Size class a decoded symbol was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSize {
    /// Linear symbol of the given module width
    Linear {
        /// Modules between the outer guard edges
        modules: usize,
    },
    /// QR version
    QrVersion(u8),
    /// Data Matrix rows x columns
    DataMatrix {
        /// Symbol rows
        rows: usize,
        /// Symbol columns
        cols: usize,
    },
    /// PDF417 grid
    Pdf417 {
        /// Codeword rows
        rows: usize,
        /// Data columns
        cols: usize,
        /// Error correction level
        ec_level: u8,
    },
    /// Aztec layers
    Aztec {
        /// Compact (true) or full-range symbol
        compact: bool,
        /// Data layers
        layers: usize,
    },
}

/// Payload recovered from an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult {
    /// Symbology the payload was read from
    pub symbology: Symbology,
    /// Decoded bytes
    pub payload: Vec<u8>,
    /// Codeword errors repaired by error correction
    pub errors_corrected: usize,
    /// Size class of the symbol
    pub size: SymbolSize,
}

impl DecodeResult {
    pub(crate) fn new(symbology: Symbology, payload: Vec<u8>, size: SymbolSize) -> Self {
        Self {
            symbology,
            payload,
            errors_corrected: 0,
            size,
        }
    }

    pub(crate) fn with_errors(mut self, errors_corrected: usize) -> Self {
        self.errors_corrected = errors_corrected;
        self
    }

    /// Payload as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

impl fmt::Display for DecodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.symbology, self.text())
    }
}
