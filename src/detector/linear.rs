//! Locators for the linear symbologies.
//!
//! Each scan line is split into runs; a candidate starts at a dark run behind
//! a quiet zone and must show the symbology's start and stop patterns before
//! the next quiet zone. The module count comes from the number of elements,
//! so the module width is measured over the whole symbol. Confidence is how
//! closely every element lands on a whole number of modules.

use crate::config::DecodeConfig;
use crate::format::linear::{
    CODABAR_CHARS, CODE39_CHARS, CODE128_START_A, CODE128_START_C, WIDE, code128_value, is_codabar_guard,
};
use crate::models::{BitMatrix, Symbology};
use crate::sampler::SamplingGrid;
use log::trace;

/// Light space, in modules, accepted as a quiet zone by the locators
const MIN_QUIET: f32 = 3.0;
/// Rows on each side of a scan line that vote during sampling
const BAND: usize = 2;

/// One dark or light run of a scan line
#[derive(Debug, Clone, Copy)]
struct Run {
    start: usize,
    len: usize,
}

/// Elements and modules of a symbol matched at the start of a run slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extent {
    elements: usize,
    modules: usize,
}

/// Sampling grids for every `symbology` symbol crossed by the scan lines
pub fn locate(binary: &BitMatrix, config: &DecodeConfig, symbology: Symbology) -> Vec<SamplingGrid> {
    let mut grids: Vec<SamplingGrid> = Vec::new();
    for y in scan_rows(binary.height(), config.linear_scan_lines) {
        let runs = binary.row_runs(y);
        for grid in scan_line(&runs, y, binary.width(), symbology, config.min_confidence) {
            if !grids.iter().any(|g| same_symbol(g, &grid)) {
                grids.push(grid);
            }
        }
    }
    trace!("{symbology}: {} linear candidates", grids.len());
    grids
}

/// Rows from the middle of the image outwards
fn scan_rows(height: usize, lines: usize) -> Vec<usize> {
    if height == 0 {
        return Vec::new();
    }
    let lines = lines.max(1);
    let step = (height / (lines + 1)).max(1);
    let mid = height / 2;
    let mut rows = vec![mid];
    for k in 1..=lines / 2 + 1 {
        if rows.len() >= lines {
            break;
        }
        if mid >= k * step {
            rows.push(mid - k * step);
        }
        if rows.len() < lines && mid + k * step < height {
            rows.push(mid + k * step);
        }
    }
    rows
}

fn same_symbol(a: &SamplingGrid, b: &SamplingGrid) -> bool {
    match (a, b) {
        (
            SamplingGrid::Linear {
                x_start: xa,
                unit: ua,
                modules: ma,
                ..
            },
            SamplingGrid::Linear {
                x_start: xb,
                modules: mb,
                ..
            },
        ) => ma == mb && (xa - xb).abs() < ua * 2.0,
        _ => false,
    }
}

fn scan_line(
    raw: &[(bool, usize, usize)],
    y: usize,
    width: usize,
    symbology: Symbology,
    min_confidence: f32,
) -> Vec<SamplingGrid> {
    let runs: Vec<Run> = raw
        .iter()
        .map(|&(_, start, len)| Run { start, len })
        .collect();
    let Some(first_dark) = raw.iter().position(|r| r.0) else {
        return Vec::new();
    };

    let mut grids = Vec::new();
    let mut i = first_dark;
    while i < runs.len() {
        let lengths: Vec<usize> = runs[i..].iter().map(|r| r.len).collect();
        let matched = match symbology {
            Symbology::Ean13 | Symbology::UpcA => match_ean(&lengths),
            Symbology::Code128 => match_code128(&lengths),
            Symbology::Code39 => match_code39(&lengths),
            Symbology::Itf14 => match_itf(&lengths),
            Symbology::Codabar => match_codabar(&lengths),
            _ => None,
        };
        if let Some(extent) = matched {
            let end = i + extent.elements;
            let pixels: usize = lengths[..extent.elements].iter().sum();
            let unit = pixels as f32 / extent.modules as f32;
            let before = if i == 0 { runs[i].start } else { runs[i - 1].len };
            let after = match runs.get(end) {
                Some(run) => run.len,
                None => width.saturating_sub(runs[end - 1].start + runs[end - 1].len),
            };
            let quiet_before = before as f32 >= unit * MIN_QUIET || i == 0;
            let quiet_after = after as f32 >= unit * MIN_QUIET || end == runs.len();
            if quiet_before && quiet_after {
                let confidence = element_fit(&lengths[..extent.elements], unit);
                if confidence >= min_confidence {
                    grids.push(SamplingGrid::Linear {
                        y,
                        band: BAND,
                        x_start: runs[i].start as f32,
                        unit,
                        modules: extent.modules,
                    });
                    i = end + 1;
                    continue;
                }
                trace!("{symbology}: candidate at x={} dropped, confidence {confidence:.2}", runs[i].start);
            }
        }
        // Next dark run
        i += 2;
    }
    grids
}

/// 1 when every element is a whole number of modules, falling to 0 when
/// they sit half a module off on average
fn element_fit(lengths: &[usize], unit: f32) -> f32 {
    if lengths.is_empty() || unit <= 0.0 {
        return 0.0;
    }
    let off: f32 = lengths
        .iter()
        .map(|&len| {
            let m = len as f32 / unit;
            (m - m.round()).abs()
        })
        .sum();
    (1.0 - 2.0 * off / lengths.len() as f32).max(0.0)
}

/// Width of `len` pixels in modules of `unit`, rounded
fn modules_of(len: usize, unit: f32) -> usize {
    (len as f32 / unit).round() as usize
}

/// Guard bars, centre guard and seven-module digits over 59 elements
fn match_ean(runs: &[usize]) -> Option<Extent> {
    const ELEMENTS: usize = 59;
    if runs.len() < ELEMENTS {
        return None;
    }
    let total: usize = runs[..ELEMENTS].iter().sum();
    let unit = total as f32 / 95.0;
    let guard_ok = |range: std::ops::Range<usize>| {
        runs[range].iter().all(|&len| modules_of(len, unit) == 1)
    };
    if !guard_ok(0..3) || !guard_ok(27..32) || !guard_ok(56..59) {
        return None;
    }
    let digits_ok = (0..12).all(|d| {
        let first = if d < 6 { 3 + d * 4 } else { 32 + (d - 6) * 4 };
        let sum: usize = runs[first..first + 4].iter().sum();
        modules_of(sum, unit) == 7
    });
    digits_ok.then_some(Extent {
        elements: ELEMENTS,
        modules: 95,
    })
}

fn widths(runs: &[usize], unit: f32) -> Vec<usize> {
    runs.iter().map(|&len| modules_of(len, unit).clamp(1, 4)).collect()
}

/// Start code, then six-element symbols up to the 2331112 stop
fn match_code128(runs: &[usize]) -> Option<Extent> {
    if runs.len() < 6 + 6 + 7 {
        return None;
    }
    let unit = runs[..6].iter().sum::<usize>() as f32 / 11.0;
    let start = code128_value(&widths(&runs[..6], unit))?;
    if !(CODE128_START_A..=CODE128_START_C).contains(&start) {
        return None;
    }
    let mut n = 12;
    while n + 7 <= runs.len() {
        let tail = &runs[n..n + 7];
        let stop_unit = tail.iter().sum::<usize>() as f32 / 13.0;
        let quiet_after = runs
            .get(n + 7)
            .is_none_or(|&len| len as f32 >= stop_unit * MIN_QUIET);
        if quiet_after && widths(tail, stop_unit) == [2, 3, 3, 1, 1, 1, 2] {
            return Some(Extent {
                elements: n + 7,
                modules: n / 6 * 11 + 13,
            });
        }
        // A quiet zone before the stop ends the search
        if runs[n + 5] as f32 >= unit * 5.0 {
            return None;
        }
        n += 6;
    }
    None
}

fn code39_mask(runs: &[usize]) -> Vec<bool> {
    let narrow_total: f32 = runs.iter().sum::<usize>() as f32 / (6 + 3 * WIDE) as f32;
    runs.iter().map(|&len| len as f32 >= narrow_total * 2.0).collect()
}

fn is_code39_star(runs: &[usize]) -> bool {
    let star = CODE39_CHARS[CODE39_CHARS.len() - 1].1;
    code39_mask(runs)
        .iter()
        .zip(star.bytes())
        .all(|(&wide, b)| wide == (b == b'1'))
}

/// `*` start, characters of nine elements plus a gap, `*` stop
fn match_code39(runs: &[usize]) -> Option<Extent> {
    if runs.len() < 19 || !is_code39_star(&runs[..9]) {
        return None;
    }
    let unit = runs[..9].iter().sum::<usize>() as f32 / 15.0;
    let mut chars = 2;
    let mut n = 10;
    while n + 9 <= runs.len() {
        let quiet_after = runs
            .get(n + 9)
            .is_none_or(|&len| len as f32 >= unit * MIN_QUIET);
        if quiet_after && is_code39_star(&runs[n..n + 9]) {
            return Some(Extent {
                elements: n + 9,
                modules: chars * 16 - 1,
            });
        }
        if runs.get(n + 9).is_some_and(|&gap| gap as f32 >= unit * 5.0) {
            return None;
        }
        chars += 1;
        n += 10;
    }
    None
}

/// Codabar character of seven elements, wide meaning at least two `unit`s
fn codabar_char(runs: &[usize], unit: f32) -> Option<usize> {
    let mask: String = runs
        .iter()
        .map(|&len| if len as f32 >= unit * 2.0 { '1' } else { '0' })
        .collect();
    CODABAR_CHARS.iter().position(|&(_, p)| p == mask)
}

/// Modules of a Codabar character
fn codabar_width(index: usize) -> usize {
    CODABAR_CHARS[index]
        .1
        .bytes()
        .map(|b| if b == b'1' { WIDE } else { 1 })
        .sum()
}

/// A-D start, characters of seven elements plus a gap, A-D stop
fn match_codabar(runs: &[usize]) -> Option<Extent> {
    if runs.len() < 15 {
        return None;
    }
    // Start and stop characters carry three wide elements
    let unit = runs[..7].iter().sum::<usize>() as f32 / (7 + 3 * (WIDE - 1)) as f32;
    let start = codabar_char(&runs[..7], unit).filter(|&i| is_codabar_guard(i))?;
    let mut modules = codabar_width(start);
    let mut n = 8;
    while n + 7 <= runs.len() {
        if runs[n - 1] as f32 >= unit * 5.0 {
            return None;
        }
        let index = codabar_char(&runs[n..n + 7], unit)?;
        modules += 1 + codabar_width(index);
        if is_codabar_guard(index) {
            let quiet_after = runs
                .get(n + 7)
                .is_none_or(|&len| len as f32 >= unit * MIN_QUIET);
            return quiet_after.then_some(Extent {
                elements: n + 7,
                modules,
            });
        }
        n += 8;
    }
    None
}

/// Narrow 1111 start, seven digit pairs, wide-narrow-narrow stop
fn match_itf(runs: &[usize]) -> Option<Extent> {
    const ELEMENTS: usize = 4 + 70 + 3;
    if runs.len() < ELEMENTS {
        return None;
    }
    let total: usize = runs[..ELEMENTS].iter().sum();
    let unit = total as f32 / 135.0;
    let start_ok = runs[..4].iter().all(|&len| modules_of(len, unit) == 1);
    let stop = widths(&runs[74..77], unit);
    let pairs_ok = (0..7).all(|p| {
        let sum: usize = runs[4 + p * 10..14 + p * 10].iter().sum();
        modules_of(sum, unit) == 18
    });
    (start_ok && pairs_ok && stop == [WIDE, 1, 1]).then_some(Extent {
        elements: ELEMENTS,
        modules: 135,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncodeOptions;
    use crate::format::lookup;

    fn rendered(symbology: Symbology, payload: &[u8], scale: usize) -> BitMatrix {
        let spec = lookup(symbology);
        let m = spec
            .codec
            .encode(payload, spec, &EncodeOptions::default())
            .unwrap();
        let q = m.quiet_zone();
        let mut out = BitMatrix::new((m.width() + 2 * q) * scale, 20);
        for y in 0..20 {
            for x in 0..m.width() {
                if m.is_dark(x, 0) {
                    for dx in 0..scale {
                        out.set((x + q) * scale + dx, y, true);
                    }
                }
            }
        }
        out
    }

    fn single(grids: &[SamplingGrid]) -> (f32, f32, usize) {
        assert_eq!(grids.len(), 1, "{grids:?}");
        match grids[0] {
            SamplingGrid::Linear {
                x_start,
                unit,
                modules,
                ..
            } => (x_start, unit, modules),
            _ => panic!("not a linear grid"),
        }
    }

    #[test]
    fn test_scan_rows_start_in_middle() {
        let rows = scan_rows(100, 5);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], 50);
        assert!(rows.iter().all(|&r| r < 100));
    }

    #[test]
    fn test_locates_ean13() {
        let binary = rendered(Symbology::Ean13, b"123456789012", 2);
        let (x, unit, modules) = single(&locate(&binary, &DecodeConfig::default(), Symbology::Ean13));
        assert_eq!(modules, 95);
        assert!((unit - 2.0).abs() < 0.01);
        assert_eq!(x, 22.0);
    }

    #[test]
    fn test_locates_code128_and_code39() {
        let binary = rendered(Symbology::Code128, b"Hello 128", 3);
        let (_, unit, modules) = single(&locate(&binary, &DecodeConfig::default(), Symbology::Code128));
        assert_eq!(modules % 11, 2);
        assert!((unit - 3.0).abs() < 0.01);

        let binary = rendered(Symbology::Code39, b"CODE-39", 2);
        let (_, _, modules) = single(&locate(&binary, &DecodeConfig::default(), Symbology::Code39));
        assert_eq!(modules, 9 * 16 - 1);
    }

    #[test]
    fn test_locates_codabar() {
        let binary = rendered(Symbology::Codabar, b"A40156B", 2);
        let (x, unit, modules) = single(&locate(&binary, &DecodeConfig::default(), Symbology::Codabar));
        assert_eq!(modules, 13 + 5 * 11 + 13 + 6);
        assert!((unit - 2.0).abs() < 0.01);
        assert_eq!(x, 20.0);
    }

    #[test]
    fn test_locates_itf14() {
        let binary = rendered(Symbology::Itf14, b"1540014128876", 2);
        let (_, _, modules) = single(&locate(&binary, &DecodeConfig::default(), Symbology::Itf14));
        assert_eq!(modules, 135);
    }

    #[test]
    fn test_wrong_symbology_not_located() {
        let binary = rendered(Symbology::Ean13, b"123456789012", 2);
        assert!(locate(&binary, &DecodeConfig::default(), Symbology::Code128).is_empty());
        assert!(locate(&binary, &DecodeConfig::default(), Symbology::Itf14).is_empty());
    }

    #[test]
    fn test_element_fit() {
        assert!((element_fit(&[2, 4, 2, 6], 2.0) - 1.0).abs() < 1e-3);
        assert!(element_fit(&[3, 3], 2.0).abs() < 1e-3);
        assert!((element_fit(&[4, 5], 4.0) - 0.75).abs() < 1e-3);
        assert_eq!(element_fit(&[], 2.0), 0.0);
    }

    #[test]
    fn test_min_confidence_filters_candidates() {
        let binary = rendered(Symbology::Ean13, b"123456789012", 2);
        let strict = DecodeConfig {
            min_confidence: 1.5,
            ..DecodeConfig::default()
        };
        assert!(locate(&binary, &strict, Symbology::Ean13).is_empty());
        assert_eq!(locate(&binary, &DecodeConfig::default(), Symbology::Ean13).len(), 1);
    }

    #[test]
    fn test_blank_row_has_no_candidates() {
        let binary = BitMatrix::new(200, 10);
        assert!(locate(&binary, &DecodeConfig::default(), Symbology::Code39).is_empty());
    }
}
