use crate::error::BarcodeError;
use std::fmt;
use std::str::FromStr;

/// Barcode symbologies understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbology {
    /// QR Code (ISO/IEC 18004, model 2)
    QrCode,
    /// EAN-13
    Ean13,
    /// UPC-A
    UpcA,
    /// Code 128
    Code128,
    /// Data Matrix ECC200
    DataMatrix,
    /// PDF417
    Pdf417,
    /// Aztec Code
    Aztec,
    /// Code 39
    Code39,
    /// ITF-14
    Itf14,
    /// Codabar (NW-7)
    Codabar,
}

impl Symbology {
    /// Every supported symbology
    pub const ALL: [Symbology; 10] = [
        Symbology::QrCode,
        Symbology::Ean13,
        Symbology::UpcA,
        Symbology::Code128,
        Symbology::DataMatrix,
        Symbology::Pdf417,
        Symbology::Aztec,
        Symbology::Code39,
        Symbology::Itf14,
        Symbology::Codabar,
    ];

    /// Canonical lowercase identifier
    pub fn name(self) -> &'static str {
        match self {
            Symbology::QrCode => "qrcode",
            Symbology::Ean13 => "ean13",
            Symbology::UpcA => "upca",
            Symbology::Code128 => "code128",
            Symbology::DataMatrix => "datamatrix",
            Symbology::Pdf417 => "pdf417",
            Symbology::Aztec => "aztec",
            Symbology::Code39 => "code39",
            Symbology::Itf14 => "itf14",
            Symbology::Codabar => "codabar",
        }
    }

    /// True for 2-D (matrix or stacked) symbologies
    pub fn is_two_dimensional(self) -> bool {
        matches!(
            self,
            Symbology::QrCode | Symbology::DataMatrix | Symbology::Pdf417 | Symbology::Aztec
        )
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symbology {
    type Err = BarcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "qr" | "qrcode" => Ok(Symbology::QrCode),
            "ean13" => Ok(Symbology::Ean13),
            "upca" | "upc" => Ok(Symbology::UpcA),
            "code128" => Ok(Symbology::Code128),
            "datamatrix" | "dm" => Ok(Symbology::DataMatrix),
            "pdf417" => Ok(Symbology::Pdf417),
            "aztec" => Ok(Symbology::Aztec),
            "code39" => Ok(Symbology::Code39),
            "itf14" | "itf" => Ok(Symbology::Itf14),
            "codabar" | "nw7" => Ok(Symbology::Codabar),
            _ => Err(BarcodeError::UnsupportedFormat(s.to_string())),
        }
    }
}
