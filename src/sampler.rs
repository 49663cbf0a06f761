//! Module sampling along the grids produced by the locators.

use crate::models::{BitMatrix, Point};
use crate::utils::geometry::PerspectiveTransform;

/// Where a located symbol's modules lie in the image
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingGrid {
    /// Module grid mapped into the image by a perspective transform whose
    /// source space is module units, (0, 0) being the symbol's top-left corner
    Matrix {
        /// Module space to image space
        transform: PerspectiveTransform,
        /// Modules per row
        cols: usize,
        /// Module rows
        rows: usize,
        /// Estimated module pitch in pixels
        module_size: f32,
    },
    /// Horizontal run of modules on a band of rows
    Linear {
        /// Centre row of the band
        y: usize,
        /// Rows on each side of `y` that vote
        band: usize,
        /// Left edge of the first module in pixels
        x_start: f32,
        /// Module width in pixels
        unit: f32,
        /// Modules to read
        modules: usize,
    },
    /// Scan lines through a stacked symbol, one per row cluster
    Stacked {
        /// Lines from top to bottom
        lines: Vec<ScanLine>,
    },
    /// Bullseye centre of an Aztec symbol
    Bullseye {
        /// Centre of the innermost module
        center: Point,
        /// Module pitch along the image x axis
        module_x: f32,
        /// Module pitch along the image y axis
        module_y: f32,
        /// Compact (two dark rings) or full-range (three)
        compact: bool,
    },
}

/// One horizontal scan line through a stacked symbol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanLine {
    /// Row in the image
    pub y: usize,
    /// First pixel of the start pattern
    pub x_start: usize,
    /// Module width in pixels
    pub unit: f32,
}

/// Run lengths read along a [`ScanLine`]
#[derive(Debug, Clone, PartialEq)]
pub struct SampledLine {
    /// Row in the image
    pub y: usize,
    /// Module width in pixels
    pub unit: f32,
    /// Alternating run widths in pixels, starting with a dark run
    pub runs: Vec<usize>,
}

/// Modules read from a grid
#[derive(Debug, Clone, PartialEq)]
pub enum Sampled {
    /// Module grid
    Matrix(BitMatrix),
    /// One row of modules
    Linear(Vec<bool>),
    /// Run lengths per scan line
    Stacked(Vec<SampledLine>),
}

/// Read every module of `grid` by majority vote
pub fn sample(binary: &BitMatrix, grid: &SamplingGrid) -> Sampled {
    match grid {
        SamplingGrid::Matrix {
            transform,
            cols,
            rows,
            ..
        } => Sampled::Matrix(sample_matrix(binary, transform, *cols, *rows)),
        SamplingGrid::Linear {
            y,
            band,
            x_start,
            unit,
            modules,
        } => Sampled::Linear(sample_linear(binary, *y, *band, *x_start, *unit, *modules)),
        SamplingGrid::Stacked { lines } => Sampled::Stacked(
            lines
                .iter()
                .map(|line| sample_line(binary, line))
                .collect(),
        ),
        SamplingGrid::Bullseye {
            center,
            module_x,
            module_y,
            ..
        } => {
            // Core square around the bullseye, enough for the mode message
            let half = 7.5f32;
            let origin = Point::new(
                center.x - half * module_x,
                center.y - half * module_y,
            );
            let transform = PerspectiveTransform::affine(
                origin,
                Point::new(*module_x, 0.0),
                Point::new(0.0, *module_y),
            );
            Sampled::Matrix(sample_matrix(binary, &transform, 15, 15))
        }
    }
}

const VOTE_OFFSETS: [f64; 3] = [-0.25, 0.0, 0.25];

/// 3x3 vote at ±¼ module around each module centre
pub fn sample_matrix(
    binary: &BitMatrix,
    transform: &PerspectiveTransform,
    cols: usize,
    rows: usize,
) -> BitMatrix {
    let mut out = BitMatrix::new(cols, rows);
    for r in 0..rows {
        for c in 0..cols {
            let mut dark = 0;
            for dy in VOTE_OFFSETS {
                for dx in VOTE_OFFSETS {
                    let (x, y) =
                        transform.transform_f64(c as f64 + 0.5 + dx, r as f64 + 0.5 + dy);
                    if pixel(binary, x, y) {
                        dark += 1;
                    }
                }
            }
            if dark >= 5 {
                out.set(c, r, true);
            }
        }
    }
    out
}

fn pixel(binary: &BitMatrix, x: f64, y: f64) -> bool {
    if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
        return false;
    }
    binary.get(x.floor() as usize, y.floor() as usize)
}

/// Vote each module across the rows `y - band ..= y + band`
pub fn sample_linear(
    binary: &BitMatrix,
    y: usize,
    band: usize,
    x_start: f32,
    unit: f32,
    modules: usize,
) -> Vec<bool> {
    let top = y.saturating_sub(band);
    let bottom = (y + band).min(binary.height().saturating_sub(1));
    (0..modules)
        .map(|i| {
            let mut dark = 0usize;
            let mut total = 0usize;
            for row in top..=bottom {
                for dx in VOTE_OFFSETS {
                    let x = x_start as f64 + (i as f64 + 0.5 + dx) * unit as f64;
                    total += 1;
                    if pixel(binary, x, row as f64) {
                        dark += 1;
                    }
                }
            }
            dark * 2 > total
        })
        .collect()
}

/// Runs along a scan line, each pixel voted over the rows above and below
pub fn sample_line(binary: &BitMatrix, line: &ScanLine) -> SampledLine {
    let y = line.y;
    let mut runs = Vec::new();
    let mut current = true;
    let mut length = 0usize;
    let mut light_streak = 0usize;
    // Stop after a light stretch longer than any symbol element
    let stop_after = (line.unit * 10.0).ceil() as usize + 1;

    for x in line.x_start..binary.width() {
        let votes = [y.wrapping_sub(1), y, y + 1]
            .iter()
            .filter(|&&row| row < binary.height() && binary.get(x, row))
            .count();
        let dark = votes >= 2;
        if dark == current {
            length += 1;
        } else {
            runs.push(length);
            current = dark;
            length = 1;
        }
        light_streak = if dark { 0 } else { light_streak + 1 };
        if light_streak >= stop_after {
            break;
        }
    }
    if length > 0 && current {
        runs.push(length);
    }

    SampledLine {
        y,
        unit: line.unit,
        runs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped(width: usize, height: usize, pattern: &[bool], scale: usize) -> BitMatrix {
        let mut m = BitMatrix::new(width, height);
        for y in 0..height {
            for (i, &d) in pattern.iter().enumerate() {
                for x in i * scale..(i + 1) * scale {
                    m.set(x, y, d);
                }
            }
        }
        m
    }

    #[test]
    fn test_sample_matrix_reads_checkerboard() {
        let mut binary = BitMatrix::new(40, 40);
        for y in 0..40 {
            for x in 0..40 {
                binary.set(x, y, (x / 4 + y / 4) % 2 == 0);
            }
        }
        let t = PerspectiveTransform::affine(
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 4.0),
        );
        let m = sample_matrix(&binary, &t, 10, 10);
        for r in 0..10 {
            for c in 0..10 {
                assert_eq!(m.get(c, r), (c + r) % 2 == 0);
            }
        }
    }

    #[test]
    fn test_sample_linear_votes_over_band() {
        let pattern = [true, false, true, true, false];
        let mut binary = striped(15, 5, &pattern, 3);
        binary.toggle(1, 2);
        let row = sample_linear(&binary, 2, 2, 0.0, 3.0, 5);
        assert_eq!(row, pattern.to_vec());
    }

    #[test]
    fn test_sample_line_runs() {
        let pattern = [true, true, false, true, false, false, false];
        let mut binary = striped(60, 3, &pattern, 2);
        binary.set(20, 1, true);
        let line = ScanLine {
            y: 1,
            x_start: 0,
            unit: 2.0,
        };
        let sampled = sample_line(&binary, &line);
        // The isolated pixel at x = 20 is outvoted by the rows around it
        assert_eq!(sampled.runs, vec![4, 2, 2]);
    }
}
