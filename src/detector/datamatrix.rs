//! Data Matrix locator for upright or right-angle-rotated symbols.
//!
//! Each connected dark region large enough to be a finder L is boxed and the
//! box scanned along its four edges: two adjacent solid edges form the L,
//! the other two alternate (timing) and give the module counts, snapped to
//! the nearest ECC200 size. The L corner fixes the rotation.

use crate::config::DecodeConfig;
use crate::format::datamatrix::{SYMBOLS, SymbolInfo};
use crate::models::{BitMatrix, Point};
use crate::sampler::SamplingGrid;
use crate::utils::geometry::PerspectiveTransform;
use log::trace;

/// Dark share above which an edge counts as solid
const SOLID: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    left: usize,
    top: usize,
    right: usize,
    bottom: usize,
}

impl Bounds {
    fn width(&self) -> usize {
        self.right + 1 - self.left
    }

    fn height(&self) -> usize {
        self.bottom + 1 - self.top
    }

    /// Corners clockwise from top-left, in continuous pixel coordinates
    fn corners(&self) -> [Point; 4] {
        let (l, t) = (self.left as f32, self.top as f32);
        let (r, b) = ((self.right + 1) as f32, (self.bottom + 1) as f32);
        [Point::new(l, t), Point::new(r, t), Point::new(r, b), Point::new(l, b)]
    }
}

/// Bounding boxes of 4-connected dark regions at least `min_side` pixels
/// wide and high
fn dark_regions(binary: &BitMatrix, min_side: usize) -> Vec<Bounds> {
    let (w, h) = (binary.width(), binary.height());
    let mut seen = vec![false; w * h];
    let mut stack = Vec::new();
    let mut regions = Vec::new();
    for start in 0..w * h {
        if seen[start] || !binary.get(start % w, start / w) {
            continue;
        }
        seen[start] = true;
        stack.push(start);
        let mut b = Bounds {
            left: start % w,
            top: start / w,
            right: start % w,
            bottom: start / w,
        };
        while let Some(i) = stack.pop() {
            let (x, y) = (i % w, i / w);
            b.left = b.left.min(x);
            b.right = b.right.max(x);
            b.top = b.top.min(y);
            b.bottom = b.bottom.max(y);
            let neighbours = [
                (x > 0).then(|| i - 1),
                (x + 1 < w).then(|| i + 1),
                (y > 0).then(|| i - w),
                (y + 1 < h).then(|| i + w),
            ];
            for n in neighbours.into_iter().flatten() {
                if !seen[n] && binary.get(n % w, n / w) {
                    seen[n] = true;
                    stack.push(n);
                }
            }
        }
        if b.width() >= min_side && b.height() >= min_side {
            regions.push(b);
        }
    }
    regions
}

/// Pixels along side `side` (0 top, 1 right, 2 bottom, 3 left), `inset` pixels in
fn edge_samples(binary: &BitMatrix, b: &Bounds, side: usize, inset: usize) -> Vec<bool> {
    match side {
        0 => (b.left..=b.right).map(|x| binary.get(x, b.top + inset)).collect(),
        1 => (b.top..=b.bottom).map(|y| binary.get(b.right - inset, y)).collect(),
        2 => (b.left..=b.right).map(|x| binary.get(x, b.bottom - inset)).collect(),
        _ => (b.top..=b.bottom).map(|y| binary.get(b.left + inset, y)).collect(),
    }
}

fn dark_share(samples: &[bool]) -> f32 {
    samples.iter().filter(|&&d| d).count() as f32 / samples.len().max(1) as f32
}

/// Run lengths along a sample line, folding runs shorter than `min_run`
/// into the run before them
fn runs(samples: &[bool], min_run: usize) -> Vec<usize> {
    let mut raw: Vec<(bool, usize)> = Vec::new();
    for &s in samples {
        match raw.last_mut() {
            Some((color, len)) if *color == s => *len += 1,
            _ => raw.push((s, 1)),
        }
    }
    let mut merged: Vec<(bool, usize)> = Vec::new();
    for (color, len) in raw {
        match merged.last_mut() {
            Some((c, l)) if *c == color || len < min_run => *l += len,
            _ => merged.push((color, len)),
        }
    }
    merged.into_iter().map(|(_, len)| len).collect()
}

/// Modules along a timing line. Each run counts as its length over the
/// median run, so a damaged module that joins three runs still counts
/// three.
fn module_count(lengths: &[usize]) -> usize {
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable();
    let median = match sorted.len() {
        0 => return 0,
        n if n % 2 == 0 => (sorted[n / 2 - 1] + sorted[n / 2]) as f32 / 2.0,
        n => sorted[n / 2] as f32,
    };
    lengths
        .iter()
        .map(|&l| ((l as f32 / median).round() as usize).max(1))
        .sum()
}

/// ECC200 size nearest to the counted dimensions, within two modules in all
fn snap_size(rows: usize, cols: usize) -> Option<&'static SymbolInfo> {
    let distance = |s: &SymbolInfo| s.rows.abs_diff(rows) + s.cols.abs_diff(cols);
    SYMBOLS
        .iter()
        .min_by_key(|s| distance(s))
        .filter(|s| distance(s) <= 2)
}

/// Sampling grids of every symbol whose finder L is a separate dark region
pub fn locate(binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid> {
    dark_regions(binary, 8)
        .iter()
        .filter_map(|bounds| locate_in(binary, bounds, config))
        .collect()
}

/// Sampling grid of the symbol filling `bounds`, if its edges show an L
/// and two timing patterns
fn locate_in(binary: &BitMatrix, bounds: &Bounds, config: &DecodeConfig) -> Option<SamplingGrid> {
    let outer: Vec<Vec<bool>> = (0..4).map(|s| edge_samples(binary, bounds, s, 0)).collect();
    let shares: Vec<f32> = outer.iter().map(|s| dark_share(s)).collect();
    let solid: Vec<bool> = shares.iter().map(|&s| s >= SOLID).collect();
    // The L corner sits between side k-1 and side k: corner k of [TL, TR, BR, BL]
    let Some(corner) = (0..4).find(|&k| solid[(k + 3) % 4] && solid[k] && !solid[(k + 1) % 4] && !solid[(k + 2) % 4])
    else {
        trace!("datamatrix: no finder L in {bounds:?}, edge shares {shares:?}");
        return None;
    };

    let timing_a = (corner + 1) % 4;
    let timing_b = (corner + 2) % 4;
    let mut counts = [0usize; 2];
    let mut timing_score = 0.0;
    for (slot, side) in [timing_a, timing_b].into_iter().enumerate() {
        let length = outer[side].len();
        let rough = runs(&outer[side], 1).len().max(1);
        let module = length as f32 / rough as f32;
        let inset = (module / 2.0) as usize;
        let line = edge_samples(binary, bounds, side, inset);
        counts[slot] = module_count(&runs(&line, ((module / 3.0) as usize).max(1)));
        timing_score += 1.0 - (dark_share(&line) - 0.5).abs() * 2.0;
    }
    // The side after the L corner is the upright top edge
    let (cols, rows) = (counts[0], counts[1]);
    let Some(info) = snap_size(rows, cols) else {
        trace!("datamatrix: {rows}x{cols} from timing edges is not near a symbol size");
        return None;
    };
    if (info.rows, info.cols) != (rows, cols) {
        trace!("datamatrix: timing counts {rows}x{cols} snapped to {}x{}", info.rows, info.cols);
    }
    let (rows, cols) = (info.rows, info.cols);

    let solid_score = (shares[(corner + 3) % 4] + shares[corner]) / 2.0;
    let confidence = solid_score * timing_score / 2.0;
    if confidence < config.min_confidence {
        return None;
    }

    let image = bounds.corners();
    // Upright TL, TR, BR, BL follow the L corner clockwise
    let dst = [
        image[(corner + 1) % 4],
        image[(corner + 2) % 4],
        image[(corner + 3) % 4],
        image[corner],
    ];
    let src = [
        Point::new(0.0, 0.0),
        Point::new(cols as f32, 0.0),
        Point::new(cols as f32, rows as f32),
        Point::new(0.0, rows as f32),
    ];
    let transform = PerspectiveTransform::from_points(&src, &dst)?;
    let module_size = dst[0].distance(&dst[1]) / cols as f32;
    trace!("datamatrix: {rows}x{cols}, L corner {corner}, confidence {confidence:.2}");
    Some(SamplingGrid::Matrix {
        transform,
        cols,
        rows,
        module_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncodeOptions;
    use crate::format::lookup;
    use crate::models::Symbology;
    use crate::sampler::{Sampled, sample};

    fn rendered(payload: &[u8], scale: usize) -> (BitMatrix, BitMatrix) {
        let spec = lookup(Symbology::DataMatrix);
        let m = spec
            .codec
            .encode(payload, spec, &EncodeOptions::default())
            .unwrap()
            .to_bit_matrix();
        let margin = 2;
        let mut img = BitMatrix::new((m.width() + 2 * margin) * scale, (m.height() + 2 * margin) * scale);
        for y in 0..img.height() {
            for x in 0..img.width() {
                let (mx, my) = (x / scale, y / scale);
                if mx >= margin && my >= margin && m.get_i((mx - margin) as isize, (my - margin) as isize) {
                    img.set(x, y, true);
                }
            }
        }
        (m, img)
    }

    fn sampled(binary: &BitMatrix) -> BitMatrix {
        let grids = locate(binary, &DecodeConfig::default());
        assert_eq!(grids.len(), 1);
        match sample(binary, &grids[0]) {
            Sampled::Matrix(m) => m,
            other => panic!("{other:?}"),
        }
    }

    /// Invert module (`mx`, `my`) of an image from `rendered`
    fn toggle_module(img: &mut BitMatrix, mx: usize, my: usize, scale: usize) {
        for y in (my + 2) * scale..(my + 3) * scale {
            for x in (mx + 2) * scale..(mx + 3) * scale {
                img.toggle(x, y);
            }
        }
    }

    #[test]
    fn test_runs_merge_noise() {
        let line = [true, true, true, false, true, true, false, false, false];
        assert_eq!(runs(&line, 1), vec![3, 1, 2, 3]);
        assert_eq!(runs(&line, 2), vec![6, 3]);
    }

    #[test]
    fn test_module_count_spans_joined_runs() {
        assert_eq!(module_count(&[4, 4, 4, 4]), 4);
        assert_eq!(module_count(&[4, 4, 4, 12, 4, 4]), 8);
        assert_eq!(module_count(&[3, 4, 3, 4, 3, 4]), 6);
        assert_eq!(module_count(&[]), 0);
    }

    #[test]
    fn test_snap_size() {
        assert_eq!(snap_size(10, 10).map(|s| (s.rows, s.cols)), Some((10, 10)));
        assert_eq!(snap_size(16, 17).map(|s| (s.rows, s.cols)), Some((16, 16)));
        assert_eq!(snap_size(8, 31).map(|s| (s.rows, s.cols)), Some((8, 32)));
        assert!(snap_size(2, 2).is_none());
    }

    #[test]
    fn test_damaged_timing_module() {
        let (m, mut img) = rendered(b"Hello World", 4);
        let edge = m.width() - 1;
        toggle_module(&mut img, edge, 6, 4);
        let mut expected = m.clone();
        expected.toggle(edge, 6);
        assert_eq!(sampled(&img), expected);
    }

    #[test]
    fn test_ignores_stray_dark_pixels() {
        let (m, mut img) = rendered(b"Hello World", 4);
        let (w, h) = (img.width(), img.height());
        img.set(1, 1, true);
        img.set(w - 2, h - 2, true);
        img.set(w - 2, 1, true);
        assert_eq!(sampled(&img), m);
    }

    #[test]
    fn test_two_symbols() {
        let (a, left) = rendered(b"left", 3);
        let (b, right) = rendered(b"right side", 3);
        let mut img = BitMatrix::new(left.width() + right.width(), left.height().max(right.height()));
        for (offset, part) in [(0, &left), (left.width(), &right)] {
            for y in 0..part.height() {
                for x in 0..part.width() {
                    img.set(offset + x, y, part.get(x, y));
                }
            }
        }
        let grids = locate(&img, &DecodeConfig::default());
        let found: Vec<BitMatrix> = grids
            .iter()
            .filter_map(|g| match sample(&img, g) {
                Sampled::Matrix(m) => Some(m),
                _ => None,
            })
            .collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&a));
        assert!(found.contains(&b));
    }

    #[test]
    fn test_locates_upright_symbol() {
        let (m, img) = rendered(b"Hello World", 4);
        assert_eq!(sampled(&img), m);
    }

    #[test]
    fn test_locates_rotated_symbols() {
        let (m, img) = rendered(b"rotate me", 3);
        let mut rotated = img;
        for _ in 0..3 {
            rotated = rotated.rotated_cw();
            assert_eq!(sampled(&rotated), m);
        }
    }

    #[test]
    fn test_rectangular_symbol() {
        let (m, img) = rendered(b"ABCDEFGHI", 3);
        assert_eq!((m.width(), m.height()), (32, 8));
        assert_eq!(sampled(&img), m);
    }

    #[test]
    fn test_blank_image() {
        assert!(locate(&BitMatrix::new(50, 50), &DecodeConfig::default()).is_empty());
    }
}
