//! Aztec bullseye locator: 1:1:1:1:1:1:1:1:1 ring scan along rows with a
//! vertical cross-check through each hit.

use crate::config::DecodeConfig;
use crate::models::{BitMatrix, Point};
use crate::sampler::SamplingGrid;
use log::trace;

/// Allowed deviation of an inner ring from the module width
const TOL: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
struct RingMatch {
    unit: f32,
    deviation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bullseye {
    center: Point,
    module_x: f32,
    module_y: f32,
    full: bool,
    confidence: f32,
}

impl Bullseye {
    fn near(&self, x: f32, y: f32) -> bool {
        let reach = 4.0 * self.module_x.max(self.module_y);
        (self.center.x - x).abs() < reach && (self.center.y - y).abs() < reach
    }

    fn grid(&self, compact: bool) -> SamplingGrid {
        SamplingGrid::Bullseye {
            center: self.center,
            module_x: self.module_x,
            module_y: self.module_y,
            compact,
        }
    }
}

/// Bullseye candidates, each as a full-range grid (when the third ring is
/// present) followed by a compact one
pub fn locate(binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid> {
    let mut found: Vec<Bullseye> = Vec::new();
    for y in 0..binary.height() {
        let runs = binary.row_runs(y);
        if runs.len() < 9 {
            continue;
        }
        for i in 4..runs.len() - 4 {
            if ring_match(&runs, i, 4).is_none() {
                continue;
            }
            let cx = runs[i].1 as f32 + runs[i].2 as f32 / 2.0;
            if found.iter().any(|b| b.near(cx, y as f32)) {
                continue;
            }
            let Some(bullseye) = cross_check(binary, cx as usize, y) else {
                continue;
            };
            if bullseye.confidence < config.min_confidence {
                trace!("aztec: weak bullseye {bullseye:?}");
                continue;
            }
            trace!("aztec: bullseye {bullseye:?}");
            found.push(bullseye);
        }
    }
    found
        .iter()
        .flat_map(|b| {
            let mut grids = Vec::with_capacity(2);
            if b.full {
                grids.push(b.grid(false));
            }
            grids.push(b.grid(true));
            grids
        })
        .collect()
}

/// Runs `center - half ..= center + half` as concentric rings around a dark
/// centre. The outermost pair only needs to be present: it merges with the
/// mode ring when the neighbouring module is dark.
fn ring_match(runs: &[(bool, usize, usize)], center: usize, half: usize) -> Option<RingMatch> {
    if center < half || center + half >= runs.len() || !runs[center].0 {
        return None;
    }
    let inner = &runs[center + 1 - half..center + half];
    let total: usize = inner.iter().map(|r| r.2).sum();
    let unit = total as f32 / inner.len() as f32;
    if unit < 1.0 {
        return None;
    }
    let mut deviation = 0.0;
    for r in inner {
        let d = (r.2 as f32 / unit - 1.0).abs();
        if d > TOL {
            return None;
        }
        deviation += d;
    }
    let outer_ok = [runs[center - half].2, runs[center + half].2]
        .iter()
        .all(|&len| len as f32 >= unit * (1.0 - TOL));
    outer_ok.then_some(RingMatch {
        unit,
        deviation: deviation / inner.len() as f32,
    })
}

fn column_runs(binary: &BitMatrix, x: usize) -> Vec<(bool, usize, usize)> {
    let mut runs: Vec<(bool, usize, usize)> = Vec::new();
    for y in 0..binary.height() {
        let dark = binary.get(x, y);
        match runs.last_mut() {
            Some(run) if run.0 == dark => run.2 += 1,
            _ => runs.push((dark, y, 1)),
        }
    }
    runs
}

fn run_containing(runs: &[(bool, usize, usize)], at: usize) -> Option<usize> {
    runs.iter().position(|r| r.1 <= at && at < r.1 + r.2)
}

/// Confirm a row hit along column `x`, then re-centre along the row through
/// the vertical centre
fn cross_check(binary: &BitMatrix, x: usize, y: usize) -> Option<Bullseye> {
    let column = column_runs(binary, x);
    let vi = run_containing(&column, y)?;
    let vertical = ring_match(&column, vi, 4)?;
    let cy = column[vi].1 as f32 + column[vi].2 as f32 / 2.0;

    let row = binary.row_runs(cy as usize);
    let hi = run_containing(&row, x)?;
    let horizontal = ring_match(&row, hi, 4)?;
    let cx = row[hi].1 as f32 + row[hi].2 as f32 / 2.0;

    let ratio = horizontal.unit / vertical.unit;
    if !(0.5..=2.0).contains(&ratio) {
        return None;
    }

    let full_h = ring_match(&row, hi, 6);
    let full_v = ring_match(&column, vi, 6);
    let (h, v, full) = match (full_h, full_v) {
        (Some(h), Some(v)) => (h, v, true),
        _ => (horizontal, vertical, false),
    };
    Some(Bullseye {
        center: Point::new(cx, cy),
        module_x: h.unit,
        module_y: v.unit,
        full,
        confidence: 1.0 - (h.deviation + v.deviation),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncodeOptions;
    use crate::format::lookup;
    use crate::models::Symbology;

    fn rendered(payload: &[u8], scale: usize) -> (BitMatrix, usize) {
        let spec = lookup(Symbology::Aztec);
        let m = spec
            .codec
            .encode(payload, spec, &EncodeOptions::default())
            .unwrap()
            .to_bit_matrix();
        let margin = 4;
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
        (img, m.width())
    }

    fn bullseye(grid: &SamplingGrid) -> (Point, f32, bool) {
        match grid {
            SamplingGrid::Bullseye {
                center,
                module_x,
                compact,
                ..
            } => (*center, *module_x, *compact),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_ring_match() {
        let runs: Vec<(bool, usize, usize)> = [3, 2, 2, 2, 2, 2, 2, 2, 5]
            .iter()
            .scan(0, |x, &len| {
                let start = *x;
                *x += len;
                Some((start, len))
            })
            .enumerate()
            .map(|(i, (start, len))| (i % 2 == 0, start, len))
            .collect();
        let m = ring_match(&runs, 4, 4).unwrap();
        assert_eq!(m.unit, 2.0);
        assert!(ring_match(&runs, 3, 4).is_none());
        assert!(ring_match(&runs, 4, 6).is_none());
    }

    #[test]
    fn test_locates_compact_symbol() {
        let (img, size) = rendered(b"Hello World", 3);
        let grids = locate(&img, &DecodeConfig::default());
        assert!(!grids.is_empty());
        let (center, module, compact) = bullseye(grids.last().unwrap());
        let expected = ((4 + size / 2) * 3) as f32 + 1.5;
        assert!((center.x - expected).abs() < 1.0, "{center:?}");
        assert!((center.y - expected).abs() < 1.0, "{center:?}");
        assert!((module - 3.0).abs() < 0.5);
        assert!(compact);
    }

    #[test]
    fn test_locates_full_symbol() {
        let (img, _) = rendered(&[b'z'; 120], 2);
        let grids = locate(&img, &DecodeConfig::default());
        let (_, module, compact) = bullseye(&grids[0]);
        assert!(!compact);
        assert!((module - 2.0).abs() < 0.5);
    }

    #[test]
    fn test_blank_image() {
        assert!(locate(&BitMatrix::new(60, 60), &DecodeConfig::default()).is_empty());
    }
}
