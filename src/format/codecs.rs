//! [`SymbolCodec`] implementations tying each symbology's encoder, locator
//! and decoder together.

use super::{FormatSpec, SymbolCodec};
use crate::config::{DecodeConfig, EncodeOptions};
use crate::error::{BarcodeError, Result};
use crate::models::{BitMatrix, DecodeResult, ModuleMatrix, Symbology};
use crate::sampler::{Sampled, SamplingGrid, sample};
use crate::{decoder, detector, encoder};

pub(super) struct QrCodec;
pub(super) struct DataMatrixCodec;
pub(super) struct AztecCodec;
pub(super) struct Pdf417Codec;

/// Linear symbologies share one locator and row decoder
pub(super) struct LinearCodec {
    symbology: Symbology,
    encode: fn(&[u8], &FormatSpec, &EncodeOptions) -> Result<ModuleMatrix>,
}

pub(super) static QR: QrCodec = QrCodec;
pub(super) static DATA_MATRIX: DataMatrixCodec = DataMatrixCodec;
pub(super) static AZTEC: AztecCodec = AztecCodec;
pub(super) static PDF417: Pdf417Codec = Pdf417Codec;
pub(super) static CODE128: LinearCodec = LinearCodec {
    symbology: Symbology::Code128,
    encode: encoder::linear::encode_code128,
};
pub(super) static EAN13: LinearCodec = LinearCodec {
    symbology: Symbology::Ean13,
    encode: encoder::linear::encode_ean13,
};
pub(super) static UPC_A: LinearCodec = LinearCodec {
    symbology: Symbology::UpcA,
    encode: encoder::linear::encode_upca,
};
pub(super) static CODE39: LinearCodec = LinearCodec {
    symbology: Symbology::Code39,
    encode: encoder::linear::encode_code39,
};
pub(super) static ITF14: LinearCodec = LinearCodec {
    symbology: Symbology::Itf14,
    encode: encoder::linear::encode_itf14,
};
pub(super) static CODABAR: LinearCodec = LinearCodec {
    symbology: Symbology::Codabar,
    encode: encoder::linear::encode_codabar,
};

fn sampled_matrix(binary: &BitMatrix, grid: &SamplingGrid, spec: &FormatSpec) -> Result<BitMatrix> {
    match sample(binary, grid) {
        Sampled::Matrix(modules) => Ok(modules),
        _ => Err(BarcodeError::malformed(format!(
            "{} decoder needs a module grid",
            spec.symbology
        ))),
    }
}

impl SymbolCodec for QrCodec {
    fn encode(&self, payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
        encoder::qr::encode(payload, spec, options)
    }

    fn locate(&self, binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid> {
        detector::qr::locate(binary, config)
    }

    fn decode(
        &self,
        binary: &BitMatrix,
        grid: &SamplingGrid,
        spec: &FormatSpec,
        config: &DecodeConfig,
    ) -> Result<DecodeResult> {
        decoder::qr::decode_grid(&sampled_matrix(binary, grid, spec)?, config)
    }
}

impl SymbolCodec for DataMatrixCodec {
    fn encode(&self, payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
        encoder::datamatrix::encode(payload, spec, options)
    }

    fn locate(&self, binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid> {
        detector::datamatrix::locate(binary, config)
    }

    fn decode(
        &self,
        binary: &BitMatrix,
        grid: &SamplingGrid,
        spec: &FormatSpec,
        config: &DecodeConfig,
    ) -> Result<DecodeResult> {
        decoder::datamatrix::decode_grid(&sampled_matrix(binary, grid, spec)?, config)
    }
}

impl SymbolCodec for AztecCodec {
    fn encode(&self, payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
        encoder::aztec::encode(payload, spec, options)
    }

    fn locate(&self, binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid> {
        detector::aztec::locate(binary, config)
    }

    fn decode(
        &self,
        binary: &BitMatrix,
        grid: &SamplingGrid,
        _spec: &FormatSpec,
        config: &DecodeConfig,
    ) -> Result<DecodeResult> {
        decoder::aztec::decode(binary, grid, config)
    }
}

impl SymbolCodec for Pdf417Codec {
    fn encode(&self, payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
        encoder::pdf417::encode(payload, spec, options)
    }

    fn locate(&self, binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid> {
        detector::pdf417::locate(binary, config)
    }

    fn decode(
        &self,
        binary: &BitMatrix,
        grid: &SamplingGrid,
        _spec: &FormatSpec,
        config: &DecodeConfig,
    ) -> Result<DecodeResult> {
        decoder::pdf417::decode(binary, grid, config)
    }
}

impl SymbolCodec for LinearCodec {
    fn encode(&self, payload: &[u8], spec: &FormatSpec, options: &EncodeOptions) -> Result<ModuleMatrix> {
        (self.encode)(payload, spec, options)
    }

    fn locate(&self, binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid> {
        detector::linear::locate(binary, config, self.symbology)
    }

    fn decode(
        &self,
        binary: &BitMatrix,
        grid: &SamplingGrid,
        _spec: &FormatSpec,
        _config: &DecodeConfig,
    ) -> Result<DecodeResult> {
        match sample(binary, grid) {
            Sampled::Linear(modules) => decoder::linear::decode_row(self.symbology, &modules),
            _ => Err(BarcodeError::malformed(format!(
                "{} decoder needs a scan line",
                self.symbology
            ))),
        }
    }
}
