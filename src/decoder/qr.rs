//! QR Code decoding from a sampled module grid: format and version
//! information, unmasking, de-interleaving, Reed-Solomon and segment parsing.

use crate::config::DecodeConfig;
use crate::ecc::{QR_CODE_FIELD_256, ReedSolomon};
use crate::encoder::qr::apply_mask;
use crate::error::{BarcodeError, ErrorKind, Result};
use crate::format::qr::{
    ALPHANUMERIC, EcBlocks, Mode, data_positions, decode_format, decode_version, ec_blocks,
    format_positions, function_mask, version_positions,
};
use crate::models::{BitMatrix, DecodeResult, ECLevel, MaskPattern, SymbolSize, Symbology, Version};
use crate::utils::bits::{BitReader, bytes_to_bits};
use log::{debug, trace};

/// Decode a sampled QR grid, retrying it mirrored when allowed
pub fn decode_grid(modules: &BitMatrix, config: &DecodeConfig) -> Result<DecodeResult> {
    match decode_oriented(modules) {
        Ok(result) => Ok(result),
        Err(err) if config.try_mirrored => {
            trace!("qr: {err}, retrying mirrored");
            decode_oriented(&modules.transposed()).map_err(|mirrored_err| {
                // Report whichever attempt got further
                if err.kind() == ErrorKind::MalformedBitstream
                    && mirrored_err.kind() != ErrorKind::MalformedBitstream
                {
                    mirrored_err
                } else {
                    err
                }
            })
        }
        Err(err) => Err(err),
    }
}

fn decode_oriented(modules: &BitMatrix) -> Result<DecodeResult> {
    let size = modules.width();
    let version = Version::from_dimension(size)
        .ok_or_else(|| BarcodeError::malformed(format!("{size} modules is not a QR size")))?;
    let (level, mask) = read_format(modules)?;
    if version.number() >= 7 {
        if let Some(read) = read_version(modules).filter(|&v| v != version) {
            debug!(
                "qr: version info says {} but grid is version {}",
                read.number(),
                version.number()
            );
        }
    }

    let function = function_mask(version);
    let mut unmasked = modules.clone();
    apply_mask(&mut unmasked, &function, mask);

    let blocks = ec_blocks(version, level)
        .ok_or_else(|| BarcodeError::malformed("no block table for version"))?;
    let positions = data_positions(&function);
    let mut codewords = vec![0u8; blocks.total_codewords];
    for (i, &(x, y)) in positions.iter().take(blocks.total_codewords * 8).enumerate() {
        if unmasked.get(x, y) {
            codewords[i / 8] |= 0x80 >> (i % 8);
        }
    }

    let (data, corrected) = correct_blocks(&codewords, &blocks)?;
    let payload = parse_segments(&data, version)?;
    debug!(
        "qr: version {} level {:?} mask {}, {} errors corrected",
        version.number(),
        level,
        mask.bits(),
        corrected
    );
    Ok(
        DecodeResult::new(Symbology::QrCode, payload, SymbolSize::QrVersion(version.number()))
            .with_errors(corrected),
    )
}

fn read_format(modules: &BitMatrix) -> Result<(ECLevel, MaskPattern)> {
    format_positions(modules.width())
        .iter()
        .find_map(|copy| {
            let bits = copy
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, &(x, y))| acc | (u32::from(modules.get(x, y)) << i));
            decode_format(bits)
        })
        .ok_or_else(|| BarcodeError::malformed("format information unreadable"))
}

fn read_version(modules: &BitMatrix) -> Option<Version> {
    version_positions(modules.width()).iter().find_map(|copy| {
        let bits = copy
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, &(x, y))| acc | (u32::from(modules.get(x, y)) << i));
        decode_version(bits)
    })
}

/// Version announced by the version information blocks of a sampled grid
pub(crate) fn version_from_grid(modules: &BitMatrix) -> Option<Version> {
    read_version(modules)
}

/// De-interleave, correct each block and concatenate the data codewords
fn correct_blocks(codewords: &[u8], blocks: &EcBlocks) -> Result<(Vec<u8>, usize)> {
    let n = blocks.num_blocks;
    let mut split: Vec<Vec<u8>> = (0..n)
        .map(|b| Vec::with_capacity(blocks.block_data_len(b) + blocks.ecc_per_block))
        .collect();

    let mut idx = 0;
    for i in 0..blocks.short_block_data() + 1 {
        for (b, block) in split.iter_mut().enumerate() {
            if i < blocks.block_data_len(b) {
                block.push(codewords[idx]);
                idx += 1;
            }
        }
    }
    for _ in 0..blocks.ecc_per_block {
        for block in split.iter_mut() {
            block.push(codewords[idx]);
            idx += 1;
        }
    }

    let rs = ReedSolomon::new(&QR_CODE_FIELD_256);
    let mut data = Vec::with_capacity(blocks.data_codewords());
    let mut corrected = 0;
    for (b, block) in split.iter_mut().enumerate() {
        corrected += rs
            .decode_bytes(block, blocks.ecc_per_block)
            .map_err(|e| BarcodeError::uncorrectable(format!("block {b}: {e}")))?;
        data.extend_from_slice(&block[..blocks.block_data_len(b)]);
    }
    Ok((data, corrected))
}

/// Concatenated payload of every segment in the data codewords
pub(crate) fn parse_segments(data: &[u8], version: Version) -> Result<Vec<u8>> {
    let bits = bytes_to_bits(data);
    let mut reader = BitReader::new(&bits);
    let mut out = Vec::new();

    while reader.available() >= 4 {
        match reader.read(4)? {
            0x0 => break,
            0x1 => read_numeric(&mut reader, version, &mut out)?,
            0x2 => read_alphanumeric(&mut reader, version, &mut out)?,
            0x4 => {
                let count = reader.read(Mode::Byte.count_bits(version))? as usize;
                for _ in 0..count {
                    out.push(reader.read(8)? as u8);
                }
            }
            0x8 => read_kanji(&mut reader, version, &mut out)?,
            0x7 => {
                // ECI designator, 1 to 3 bytes; the payload is passed through as is
                let first = reader.read(8)?;
                if first & 0x80 != 0 {
                    let extra = if first & 0xC0 == 0x80 { 8 } else { 16 };
                    reader.read(extra)?;
                }
            }
            0x3 => {
                // Structured append: sequence and parity
                reader.read(16)?;
            }
            0x5 => {}
            0x9 => {
                reader.read(8)?;
            }
            mode => {
                return Err(BarcodeError::malformed(format!("unknown mode indicator {mode:#x}")));
            }
        }
    }
    Ok(out)
}

fn read_numeric(reader: &mut BitReader<'_>, version: Version, out: &mut Vec<u8>) -> Result<()> {
    let mut remaining = reader.read(Mode::Numeric.count_bits(version))? as usize;
    while remaining > 0 {
        let digits = remaining.min(3);
        let value = reader.read(digits * 3 + 1)?;
        if value >= 10u32.pow(digits as u32) {
            return Err(BarcodeError::malformed(format!("numeric group {value} too large")));
        }
        out.extend(format!("{value:0digits$}").bytes());
        remaining -= digits;
    }
    Ok(())
}

fn read_alphanumeric(reader: &mut BitReader<'_>, version: Version, out: &mut Vec<u8>) -> Result<()> {
    let mut remaining = reader.read(Mode::Alphanumeric.count_bits(version))? as usize;
    while remaining >= 2 {
        let value = reader.read(11)? as usize;
        if value >= 45 * 45 {
            return Err(BarcodeError::malformed(format!("alphanumeric pair {value} too large")));
        }
        out.push(ALPHANUMERIC[value / 45]);
        out.push(ALPHANUMERIC[value % 45]);
        remaining -= 2;
    }
    if remaining == 1 {
        let value = reader.read(6)? as usize;
        let c = ALPHANUMERIC
            .get(value)
            .ok_or_else(|| BarcodeError::malformed(format!("alphanumeric value {value}")))?;
        out.push(*c);
    }
    Ok(())
}

/// Kanji characters come back as their Shift JIS byte pairs
fn read_kanji(reader: &mut BitReader<'_>, version: Version, out: &mut Vec<u8>) -> Result<()> {
    let count = reader.read(Mode::Kanji.count_bits(version))? as usize;
    for _ in 0..count {
        let value = reader.read(13)?;
        let assembled = ((value / 0xC0) << 8) | (value % 0xC0);
        let sjis = if assembled < 0x1F00 {
            assembled + 0x8140
        } else {
            assembled + 0xC140
        };
        out.push((sjis >> 8) as u8);
        out.push(sjis as u8);
    }
    Ok(())
}
