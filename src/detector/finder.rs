//! Finder pattern detection using 1:1:3:1:1 ratio scanning with a vertical
//! cross-check through each horizontal hit.

use crate::models::{BitMatrix, Point};

/// One QR finder pattern candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderPattern {
    /// Centre of the 3x3 dark core, in pixels
    pub center: Point,
    /// Module width estimated from the pattern runs
    pub module_size: f32,
    /// Scan rows that confirmed this pattern
    pub hits: usize,
}

impl FinderPattern {
    /// Candidate confirmed by a single scan row
    pub fn new(x: f32, y: f32, module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            module_size,
            hits: 1,
        }
    }
}

/// Row scanner for QR finder patterns
pub struct FinderDetector;

impl FinderDetector {
    /// Merged finder candidates in `matrix`, most confirmed first
    pub fn detect(matrix: &BitMatrix) -> Vec<FinderPattern> {
        let mut candidates = Vec::new();
        for y in 0..matrix.height() {
            if !Self::has_significant_edges(matrix, y) {
                continue;
            }
            candidates.extend(Self::scan_row(matrix, y));
        }
        let mut merged = Self::merge_candidates(candidates);
        merged.sort_by(|a, b| b.hits.cmp(&a.hits));
        merged
    }

    /// Check if row has enough edge transitions to potentially contain patterns
    fn has_significant_edges(matrix: &BitMatrix, y: usize) -> bool {
        let mut transitions = 0;
        let mut prev_color = matrix.get(0, y);
        for x in 1..matrix.width() {
            let color = matrix.get(x, y);
            if color != prev_color {
                transitions += 1;
                prev_color = color;
                if transitions >= 4 {
                    return true;
                }
            }
        }
        false
    }

    fn scan_row(matrix: &BitMatrix, y: usize) -> Vec<FinderPattern> {
        let mut candidates = Vec::new();
        let runs = matrix.row_runs(y);
        for window in runs.windows(5) {
            let colors = [window[0].0, window[1].0, window[2].0, window[3].0, window[4].0];
            if colors != [true, false, true, false, true] {
                continue;
            }
            let lengths = [window[0].2, window[1].2, window[2].2, window[3].2, window[4].2];
            if !Self::quick_ratio_check(&lengths) {
                continue;
            }
            let Some(horizontal) = Self::check_pattern(&lengths, window[4].1 + window[4].2, y)
            else {
                continue;
            };
            let total: usize = lengths.iter().sum();
            if let Some((center_y, vertical_unit)) =
                Self::cross_check_vertical(matrix, horizontal.center.x as usize, y, total)
            {
                let module_size = (horizontal.module_size + vertical_unit) / 2.0;
                candidates.push(FinderPattern::new(horizontal.center.x, center_y, module_size));
            }
        }
        candidates
    }

    /// Quick ratio validation - rough check before expensive floating-point math
    fn quick_ratio_check(lengths: &[usize]) -> bool {
        let b1 = lengths[0];
        let w1 = lengths[1];
        let b2 = lengths[2];
        let w2 = lengths[3];
        let b3 = lengths[4];
        let total = b1 + w1 + b2 + w2 + b3;
        if total < 7 {
            return false;
        }

        // Centre black roughly three times the outer blacks
        let b2_min = b1.min(b3).max(1);
        if b2 < b2_min * 2 || b2 > b2_min * 5 {
            return false;
        }

        let outer_avg = ((b1 + b3 + w1 + w2) / 4).max(1);
        let w1_ok = w1 * 2 >= outer_avg && w1 <= outer_avg * 2;
        let w2_ok = w2 * 2 >= outer_avg && w2 <= outer_avg * 2;
        w1_ok && w2_ok
    }

    fn ratios_match(lengths: &[usize]) -> Option<f32> {
        let total: usize = lengths.iter().sum();
        let unit = total as f32 / 7.0;
        const TOL: f32 = 0.5;
        let expected = [1.0, 1.0, 3.0, 1.0, 1.0];
        let ok = lengths
            .iter()
            .zip(expected)
            .all(|(&len, e)| (len as f32 / unit - e).abs() <= TOL * e.max(1.0));
        ok.then_some(unit)
    }

    fn check_pattern(lengths: &[usize], end_x: usize, y: usize) -> Option<FinderPattern> {
        let unit = Self::ratios_match(lengths)?;
        let (b2, w2, b3) = (lengths[2], lengths[3], lengths[4]);
        let center_x = end_x as f32 - b3 as f32 - w2 as f32 - b2 as f32 / 2.0;
        Some(FinderPattern::new(center_x, y as f32 + 0.5, unit))
    }

    /// Walk column `x` up and down from row `y` and check the same ratios.
    /// Returns the vertical centre and module size.
    fn cross_check_vertical(
        matrix: &BitMatrix,
        x: usize,
        y: usize,
        horizontal_total: usize,
    ) -> Option<(f32, f32)> {
        let height = matrix.height();
        if !matrix.get(x, y) {
            return None;
        }
        let mut counts = [0usize; 5];

        // Upwards: centre black, white, outer black
        let mut row = y as isize;
        for (state, dark) in [(2usize, true), (1, false), (0, true)] {
            while row >= 0 && matrix.get(x, row as usize) == dark {
                counts[state] += 1;
                row -= 1;
            }
            if counts[state] == 0 {
                return None;
            }
        }

        // Downwards from just below the start row
        let mut row = y + 1;
        for (state, dark) in [(2usize, true), (3, false), (4, true)] {
            while row < height && matrix.get(x, row) == dark {
                counts[state] += 1;
                row += 1;
            }
            if state != 2 && counts[state] == 0 {
                return None;
            }
        }

        let total: usize = counts.iter().sum();
        if total * 5 < horizontal_total * 3 || total * 3 > horizontal_total * 5 {
            return None;
        }
        let unit = Self::ratios_match(&counts)?;
        let end = row as f32;
        let center = end - counts[4] as f32 - counts[3] as f32 - counts[2] as f32 / 2.0;
        Some((center, unit))
    }

    fn merge_candidates(candidates: Vec<FinderPattern>) -> Vec<FinderPattern> {
        let mut merged: Vec<FinderPattern> = Vec::new();
        for candidate in candidates {
            let existing = merged.iter_mut().find(|existing| {
                let limit = existing.module_size.max(candidate.module_size) * 2.0;
                existing.center.distance_squared(&candidate.center) < limit * limit
            });
            match existing {
                Some(existing) => {
                    let n = existing.hits as f32;
                    existing.center = existing.center.lerp(candidate.center, 1.0 / (n + 1.0));
                    existing.module_size =
                        (existing.module_size * n + candidate.module_size) / (n + 1.0);
                    existing.hits += 1;
                }
                None => merged.push(candidate),
            }
        }
        merged
    }
}
