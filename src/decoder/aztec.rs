//! Aztec decoder: orientation from the corner marks, mode message, data
//! spiral extraction, Reed-Solomon correction, unstuffing and the
//! character-mode state machine.

use crate::config::DecodeConfig;
use crate::ecc::{AZTEC_PARAM, ReedSolomon};
use crate::error::{BarcodeError, Result};
use crate::format::aztec::{
    Entry, Layout, Mode, mode_message_words, mode_positions, orientation_gaps, orientation_marks,
};
use crate::models::{BitMatrix, DecodeResult, Point, SymbolSize, Symbology};
use crate::sampler::{Sampled, SamplingGrid, sample, sample_matrix};
use crate::utils::bits::BitReader;
use crate::utils::geometry::PerspectiveTransform;
use log::{debug, trace};

/// Group separator emitted for FLG(0)
const FNC1: u8 = 0x1D;

/// Orientation modules that must agree before the mode message is read
const MIN_MARK_MATCHES: usize = 11;

/// Sample the symbol around a located bullseye and decode it
pub fn decode(binary: &BitMatrix, grid: &SamplingGrid, config: &DecodeConfig) -> Result<DecodeResult> {
    let SamplingGrid::Bullseye {
        center,
        module_x,
        module_y,
        compact,
    } = *grid
    else {
        return Err(BarcodeError::malformed("aztec decoder needs a bullseye grid"));
    };
    let Sampled::Matrix(core) = sample(binary, grid) else {
        return Err(BarcodeError::malformed("bullseye grid sampled no core"));
    };
    let (mirrored, rotations) = orientation(&core, compact, config.try_mirrored)?;
    let upright_core = orient(&core, mirrored, rotations);
    let (layout, _, _) = read_mode_message(&upright_core, compact)?;
    let size = layout.size();
    trace!(
        "aztec: {} layers, {size}x{size}, mirrored {mirrored}, {rotations} turns",
        layout.layers
    );

    let half = (size / 2) as f32 + 0.5;
    let origin = Point::new(center.x - half * module_x, center.y - half * module_y);
    let transform = PerspectiveTransform::affine(
        origin,
        Point::new(module_x, 0.0),
        Point::new(0.0, module_y),
    );
    let modules = orient(&sample_matrix(binary, &transform, size, size), mirrored, rotations);
    decode_matrix(&modules, compact)
}

fn orient(m: &BitMatrix, mirrored: bool, rotations: usize) -> BitMatrix {
    let mut out = if mirrored { m.transposed() } else { m.clone() };
    for _ in 0..rotations {
        out = out.rotated_cw();
    }
    out
}

/// Mirror flag and clockwise quarter turns that bring the marks upright
fn orientation(core: &BitMatrix, compact: bool, try_mirrored: bool) -> Result<(bool, usize)> {
    let center = core.width() / 2;
    let mirrors: &[bool] = if try_mirrored { &[false, true] } else { &[false] };
    let mut best = (0, false, 0);
    for &mirrored in mirrors {
        for rotations in 0..4 {
            let m = orient(core, mirrored, rotations);
            let score = orientation_marks(center, compact)
                .iter()
                .filter(|&&(x, y)| m.get(x, y))
                .count()
                + orientation_gaps(center, compact)
                    .iter()
                    .filter(|&&(x, y)| !m.get(x, y))
                    .count();
            if score > best.0 {
                best = (score, mirrored, rotations);
            }
        }
    }
    if best.0 < MIN_MARK_MATCHES {
        return Err(BarcodeError::malformed(format!(
            "orientation marks unreadable, best match {}/12",
            best.0
        )));
    }
    Ok((best.1, best.2))
}

/// Layout and data word count from the mode ring of an upright symbol or
/// core; also returns the corrected nibble count
fn read_mode_message(m: &BitMatrix, compact: bool) -> Result<(Layout, usize, usize)> {
    let center = m.width() / 2;
    let bits: Vec<bool> = mode_positions(center, compact)
        .into_iter()
        .map(|(x, y)| m.get(x, y))
        .collect();
    let mut words: Vec<u16> = bits
        .chunks(4)
        .map(|c| c.iter().fold(0u16, |acc, &b| (acc << 1) | u16::from(b)))
        .collect();
    let (data_len, ecc_len) = mode_message_words(compact);
    let corrected = ReedSolomon::new(&AZTEC_PARAM)
        .decode(&mut words, ecc_len)
        .map_err(|e| BarcodeError::uncorrectable(format!("mode message: {e}")))?;
    let value = words[..data_len]
        .iter()
        .fold(0usize, |acc, &w| (acc << 4) | w as usize);
    let (layers, data_words) = if compact {
        ((value >> 6) + 1, (value & 0x3F) + 1)
    } else {
        ((value >> 11) + 1, (value & 0x7FF) + 1)
    };
    let layout = Layout::new(compact, layers)
        .ok_or_else(|| BarcodeError::malformed(format!("{layers} layers")))?;
    Ok((layout, data_words, corrected))
}

/// Decode an upright module grid of a whole symbol
pub fn decode_matrix(m: &BitMatrix, compact: bool) -> Result<DecodeResult> {
    let (layout, data_words, mode_errors) = read_mode_message(m, compact)?;
    if layout.size() != m.width() || layout.size() != m.height() {
        return Err(BarcodeError::malformed(format!(
            "mode message gives {0}x{0}, grid is {1}x{2}",
            layout.size(),
            m.width(),
            m.height()
        )));
    }
    let width = layout.word_size();
    let total = layout.total_words();
    if data_words >= total {
        return Err(BarcodeError::malformed(format!(
            "{data_words} data words in a {total}-word symbol"
        )));
    }

    let raw: Vec<bool> = layout
        .data_positions()
        .into_iter()
        .map(|(x, y)| m.get(x, y))
        .collect();
    let mut words: Vec<u16> = raw[layout.total_bits() % width..]
        .chunks(width)
        .map(|c| c.iter().fold(0u16, |acc, &b| (acc << 1) | u16::from(b)))
        .collect();
    let corrected = ReedSolomon::new(layout.field()).decode(&mut words, total - data_words)?;
    let bits = unstuff(&words[..data_words], width)?;
    let payload = decode_bits(&bits)?;
    debug!(
        "aztec: {} bytes from {} layers, {} words corrected",
        payload.len(),
        layout.layers,
        corrected
    );
    Ok(DecodeResult::new(
        Symbology::Aztec,
        payload,
        SymbolSize::Aztec {
            compact,
            layers: layout.layers,
        },
    )
    .with_errors(corrected + mode_errors))
}

/// Undo bit stuffing: a word ending in the complement of its uniform prefix
/// carries one bit fewer
fn unstuff(words: &[u16], width: usize) -> Result<Vec<bool>> {
    let full: u16 = (1 << width) - 1;
    let mut bits = Vec::with_capacity(words.len() * width);
    for &w in words {
        if w == 0 || w == full {
            return Err(BarcodeError::malformed(format!("invalid stuffed word {w:#x}")));
        }
        if w == 1 || w == full - 1 {
            bits.extend(std::iter::repeat_n(w > 1, width - 1));
        } else {
            bits.extend((0..width).rev().map(|i| (w >> i) & 1 == 1));
        }
    }
    Ok(bits)
}

/// Run the mode state machine over the unstuffed stream. Trailing padding
/// ends the stream wherever a code no longer fits.
fn decode_bits(bits: &[bool]) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(bits);
    let mut out = Vec::new();
    let mut latched = Mode::Upper;
    let mut shifted: Option<Mode> = None;
    'stream: loop {
        let mode = shifted.take().unwrap_or(latched);
        let Ok(code) = reader.read(mode.bits()) else {
            break;
        };
        let Some(entry) = mode.entry(code as u8) else {
            return Err(BarcodeError::malformed(format!("code {code} in {mode:?} mode")));
        };
        match entry {
            Entry::Byte(b) => out.push(b),
            Entry::Pair(pair) => out.extend_from_slice(pair),
            Entry::Latch(m) => latched = m,
            Entry::Shift(m) => shifted = Some(m),
            Entry::BinaryShift => {
                let Ok(mut len) = reader.read(5) else {
                    break;
                };
                if len == 0 {
                    let Ok(long) = reader.read(11) else {
                        break;
                    };
                    len = long + 31;
                }
                for _ in 0..len {
                    let Ok(b) = reader.read(8) else {
                        break 'stream;
                    };
                    out.push(b as u8);
                }
            }
            Entry::Flag => {
                let Ok(n) = reader.read(3) else {
                    break;
                };
                match n {
                    0 => out.push(FNC1),
                    7 => return Err(BarcodeError::malformed("FLG(7) is reserved")),
                    // ECI designator digits; the payload stays raw bytes
                    _ => {
                        for _ in 0..n {
                            if reader.read(4).is_err() {
                                break 'stream;
                            }
                        }
                    }
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncodeOptions;
    use crate::encoder::aztec::high_level_bits;
    use crate::error::ErrorKind;
    use crate::format::lookup;

    fn symbol(payload: &[u8]) -> BitMatrix {
        let spec = lookup(Symbology::Aztec);
        spec.codec
            .encode(payload, spec, &EncodeOptions::default())
            .unwrap()
            .to_bit_matrix()
    }

    fn bits(s: &str) -> Vec<bool> {
        s.chars().filter(|c| !c.is_whitespace()).map(|c| c == '1').collect()
    }

    /// Scaled copy with a margin, and the bullseye grid for it
    fn image(m: &BitMatrix, scale: usize, compact: bool) -> (BitMatrix, SamplingGrid) {
        let margin = 3;
        let side = (m.width() + 2 * margin) * scale;
        let mut img = BitMatrix::square(side);
        for y in 0..side {
            for x in 0..side {
                let (mx, my) = (x / scale, y / scale);
                if mx >= margin && my >= margin && m.get(mx - margin, my - margin) {
                    img.set(x, y, true);
                }
            }
        }
        let c = side as f32 / 2.0;
        let grid = SamplingGrid::Bullseye {
            center: Point::new(c, c),
            module_x: scale as f32,
            module_y: scale as f32,
            compact,
        };
        (img, grid)
    }

    #[test]
    fn test_round_trips() {
        let payloads: [&[u8]; 7] = [
            b"A",
            b"Hello World",
            b"hello WORLD 123, ok.",
            b"MiXeD\tTabs\r\n~@|",
            b"\x00\x80\xff binary",
            &[b'a'; 300],
            b"https://example.com/aztec?id=42",
        ];
        for payload in payloads {
            let m = symbol(payload);
            let compact = m.width() <= 27;
            let result = decode_matrix(&m, compact).unwrap();
            assert_eq!(result.payload, payload);
            assert_eq!(result.errors_corrected, 0);
        }
    }

    #[test]
    fn test_all_bytes_round_trip() {
        let payload: Vec<u8> = (0..=255).collect();
        let m = symbol(&payload);
        assert_eq!(decode_matrix(&m, false).unwrap().payload, payload);
    }

    #[test]
    fn test_symbol_size_reported() {
        let result = decode_matrix(&symbol(b"A"), true).unwrap();
        assert_eq!(
            result.size,
            SymbolSize::Aztec {
                compact: true,
                layers: 1
            }
        );
    }

    #[test]
    fn test_corrects_damage() {
        let mut m = symbol(b"Hello World");
        // Outermost layer, top arm
        for x in [0, 3, 6] {
            m.toggle(x, 0);
        }
        let result = decode_matrix(&m, true).unwrap();
        assert_eq!(result.payload, b"Hello World");
        assert!(result.errors_corrected > 0);
    }

    #[test]
    fn test_mode_message_damage() {
        let mut m = symbol(b"mode");
        let c = m.width() / 2;
        let (x, y) = mode_positions(c, true)[3];
        m.toggle(x, y);
        assert_eq!(decode_matrix(&m, true).unwrap().payload, b"mode");
    }

    #[test]
    fn test_decode_from_image() {
        let m = symbol(b"image");
        let (img, grid) = image(&m, 3, true);
        let result = decode(&img, &grid, &DecodeConfig::default()).unwrap();
        assert_eq!(result.payload, b"image");
    }

    #[test]
    fn test_rotated_and_mirrored() {
        let m = symbol(b"Turn around");
        let (img, grid) = image(&m, 2, true);
        let mut rotated = img.clone();
        for _ in 0..3 {
            rotated = rotated.rotated_cw();
            let result = decode(&rotated, &grid, &DecodeConfig::default()).unwrap();
            assert_eq!(result.payload, b"Turn around");
        }
        let mirrored = img.transposed();
        let result = decode(&mirrored, &grid, &DecodeConfig::default()).unwrap();
        assert_eq!(result.payload, b"Turn around");
    }

    #[test]
    fn test_full_symbol_from_image() {
        let payload = [b'z'; 120];
        let m = symbol(&payload);
        assert!(m.width() > 27);
        let (img, grid) = image(&m, 2, false);
        assert_eq!(
            decode(&img, &grid, &DecodeConfig::default()).unwrap().payload,
            payload
        );
    }

    #[test]
    fn test_mode_machine() {
        assert_eq!(decode_bits(high_level_bits(b"aB").bits()).unwrap(), b"aB");
        // P/S then ". " pair
        assert_eq!(decode_bits(&bits("00010 00000 00011")).unwrap(), b"A. ");
        // Trailing ones are padding
        assert_eq!(decode_bits(&bits("00010 11111 111")).unwrap(), b"A");
    }

    #[test]
    fn test_flags() {
        // FLG(0) is FNC1
        assert_eq!(decode_bits(&bits("00000 00000 000 00010")).unwrap(), b"\x1dA");
        // FLG(1) carries one ECI digit, skipped
        assert_eq!(decode_bits(&bits("00000 00000 001 0101 00010")).unwrap(), b"A");
        let err = decode_bits(&bits("00000 00000 111")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBitstream);
    }

    #[test]
    fn test_unstuff() {
        assert_eq!(unstuff(&[0b111110], 6).unwrap(), vec![true; 5]);
        assert_eq!(unstuff(&[0b000001], 6).unwrap(), vec![false; 5]);
        assert_eq!(unstuff(&[0], 6).unwrap_err().kind(), ErrorKind::MalformedBitstream);
        assert_eq!(unstuff(&[63], 6).unwrap_err().kind(), ErrorKind::MalformedBitstream);
    }
}
