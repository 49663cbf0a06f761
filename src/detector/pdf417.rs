//! PDF417 locator: start-pattern hits on every pixel row, grouped into one
//! column of scan lines per symbol.

use crate::config::DecodeConfig;
use crate::format::pdf417::{CODEWORD_MODULES, START};
use crate::models::BitMatrix;
use crate::sampler::{SamplingGrid, ScanLine};
use log::trace;

/// Light space, in modules, required in front of the start pattern
const MIN_QUIET: f32 = 2.0;
/// Scan lines needed before a column of hits counts as a symbol
const MIN_LINES: usize = 3;

/// Start pattern found on one pixel row
#[derive(Debug, Clone, Copy)]
struct Hit {
    line: ScanLine,
    /// 1 for exact module multiples, falling to 0 at half a module off
    fit: f32,
}

/// Stacked grids for every start pattern column in the image whose
/// confidence reaches `config.min_confidence`
pub fn locate(binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid> {
    let mut groups: Vec<Vec<Hit>> = Vec::new();
    for y in 0..binary.height() {
        let runs = binary.row_runs(y);
        for hit in start_patterns(&runs, y) {
            let open = groups.iter_mut().find(|g| {
                g.last().is_some_and(|last| {
                    y - last.line.y <= 2
                        && (last.line.x_start as f32 - hit.line.x_start as f32).abs() <= 2.0 * last.line.unit
                })
            });
            match open {
                Some(group) => group.push(hit),
                None => groups.push(vec![hit]),
            }
        }
    }
    groups
        .into_iter()
        .filter(|g| g.len() >= MIN_LINES)
        .filter_map(|hits| {
            let confidence = group_confidence(&hits);
            let first = hits[0].line;
            if confidence < config.min_confidence {
                trace!("pdf417: column at x={} dropped, confidence {confidence:.2}", first.x_start);
                return None;
            }
            trace!(
                "pdf417: {} scan lines from y={} at x={}, confidence {confidence:.2}",
                hits.len(),
                first.y,
                first.x_start
            );
            Some(SamplingGrid::Stacked {
                lines: hits.into_iter().map(|h| h.line).collect(),
            })
        })
        .collect()
}

/// Mean pattern fit scaled by the share of pixel rows in the column's span
/// that hold a hit
fn group_confidence(hits: &[Hit]) -> f32 {
    let (Some(first), Some(last)) = (hits.first(), hits.last()) else {
        return 0.0;
    };
    let span = (last.line.y - first.line.y + 1) as f32;
    let fit = hits.iter().map(|h| h.fit).sum::<f32>() / hits.len() as f32;
    fit * (hits.len() as f32 / span).min(1.0)
}

/// Start patterns along one pixel row
fn start_patterns(runs: &[(bool, usize, usize)], y: usize) -> Vec<Hit> {
    let mut found = Vec::new();
    if runs.len() < START.len() {
        return found;
    }
    for i in 0..=runs.len() - START.len() {
        if !runs[i].0 {
            continue;
        }
        let window = &runs[i..i + START.len()];
        let total: usize = window.iter().map(|r| r.2).sum();
        let unit = total as f32 / CODEWORD_MODULES as f32;
        if unit < 1.0 {
            continue;
        }
        // The leading bar is wider than any codeword bar
        let lead = (window[0].2 as f32 / unit).round() as u8;
        let fits = lead == START[0]
            && window.iter().zip(START).all(|(r, expected)| {
                let e = expected as f32;
                (r.2 as f32 / unit - e).abs() <= 0.5 + 0.05 * e
            });
        let quiet = i == 0 || runs[i - 1].2 as f32 >= MIN_QUIET * unit;
        if fits && quiet {
            let error: f32 = window
                .iter()
                .zip(START)
                .map(|(r, expected)| (r.2 as f32 / unit - expected as f32).abs())
                .sum();
            found.push(Hit {
                line: ScanLine {
                    y,
                    x_start: runs[i].1,
                    unit,
                },
                fit: (1.0 - 2.0 * error / START.len() as f32).max(0.0),
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncodeOptions;
    use crate::format::lookup;
    use crate::models::Symbology;

    fn rendered(payload: &[u8], scale: usize, margin: usize) -> BitMatrix {
        let spec = lookup(Symbology::Pdf417);
        let m = spec
            .codec
            .encode(payload, spec, &EncodeOptions::default())
            .unwrap()
            .to_bit_matrix();
        let mut img = BitMatrix::new((m.width() + 2 * margin) * scale, (m.height() + 2 * margin) * scale);
        for y in 0..img.height() {
            for x in 0..img.width() {
                let (mx, my) = (x / scale, y / scale);
                if mx >= margin && my >= margin && m.get(mx - margin, my - margin) {
                    img.set(x, y, true);
                }
            }
        }
        img
    }

    #[test]
    fn test_start_pattern_in_row() {
        // quiet, start pattern at two pixels per module, then a bar
        let widths = [6usize, 16, 2, 2, 2, 2, 2, 2, 6, 4];
        let mut x = 0;
        let runs: Vec<(bool, usize, usize)> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let run = (i % 2 == 1, x, w);
                x += w;
                run
            })
            .collect();
        let hits = start_patterns(&runs, 7);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].line.x_start, 6);
        assert!((hits[0].line.unit - 2.0).abs() < 1e-3);
        assert!((hits[0].fit - 1.0).abs() < 1e-3);
    }

    fn hit(y: usize, fit: f32) -> Hit {
        Hit {
            line: ScanLine { y, x_start: 10, unit: 2.0 },
            fit,
        }
    }

    #[test]
    fn test_group_confidence() {
        let solid: Vec<Hit> = (0..6).map(|y| hit(y, 1.0)).collect();
        assert!((group_confidence(&solid) - 1.0).abs() < 1e-3);
        // Every other row, half fit
        let sparse: Vec<Hit> = (0..6).map(|y| hit(y * 2, 0.5)).collect();
        assert!((group_confidence(&sparse) - 0.5 * 6.0 / 11.0).abs() < 1e-3);
        assert_eq!(group_confidence(&[]), 0.0);
    }

    #[test]
    fn test_min_confidence_filters_columns() {
        let img = rendered(b"locate me", 2, 4);
        let strict = DecodeConfig {
            min_confidence: 1.5,
            ..DecodeConfig::default()
        };
        assert!(locate(&img, &strict).is_empty());
        assert_eq!(locate(&img, &DecodeConfig::default()).len(), 1);
    }

    #[test]
    fn test_locates_symbol() {
        let img = rendered(b"locate me", 2, 4);
        let grids = locate(&img, &DecodeConfig::default());
        assert_eq!(grids.len(), 1);
        let SamplingGrid::Stacked { lines } = &grids[0] else {
            panic!("{:?}", grids[0]);
        };
        assert!(lines.len() >= 9 * 2);
        assert!(lines.iter().all(|l| l.x_start == 8));
    }

    #[test]
    fn test_stop_pattern_not_taken_for_start() {
        let img = rendered(b"only one column", 1, 3);
        assert_eq!(locate(&img, &DecodeConfig::default()).len(), 1);
    }

    #[test]
    fn test_blank_image() {
        assert!(locate(&BitMatrix::new(80, 40), &DecodeConfig::default()).is_empty());
    }
}
