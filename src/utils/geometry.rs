/// Geometry utilities for perspective transformations and calculations
use crate::models::Point;

/// Perspective transformation matrix (3x3), mapping module space to image
/// space for the matrix samplers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveTransform {
    a11: f64,
    a12: f64,
    a13: f64,
    a21: f64,
    a22: f64,
    a23: f64,
    a31: f64,
    a32: f64,
    a33: f64,
}

impl PerspectiveTransform {
    /// Create transform from 4 source points to 4 destination points
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        // Direct linear transform with a33 fixed to 1
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (sx, sy) = (src[i].x as f64, src[i].y as f64);
            let (dx, dy) = (dst[i].x as f64, dst[i].y as f64);

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        solve_linear_system(&a, &b).map(|s| Self {
            a11: s[0],
            a12: s[1],
            a13: s[2],
            a21: s[3],
            a22: s[4],
            a23: s[5],
            a31: s[6],
            a32: s[7],
            a33: 1.0,
        })
    }

    /// Affine map taking module (0,0) to `origin` with per-axis steps
    pub fn affine(origin: Point, step_x: Point, step_y: Point) -> Self {
        Self {
            a11: step_x.x as f64,
            a12: step_y.x as f64,
            a13: origin.x as f64,
            a21: step_x.y as f64,
            a22: step_y.y as f64,
            a23: origin.y as f64,
            a31: 0.0,
            a32: 0.0,
            a33: 1.0,
        }
    }

    /// Transform a point using this perspective matrix
    pub fn transform(&self, p: &Point) -> Point {
        let (x, y) = self.transform_f64(p.x as f64, p.y as f64);
        Point::new(x as f32, y as f32)
    }

    /// Transform raw coordinates
    pub fn transform_f64(&self, x: f64, y: f64) -> (f64, f64) {
        let denominator = self.a31 * x + self.a32 * y + self.a33;
        if denominator.abs() < 1e-12 {
            return (f64::NAN, f64::NAN);
        }
        (
            (self.a11 * x + self.a12 * y + self.a13) / denominator,
            (self.a21 * x + self.a22 * y + self.a23) / denominator,
        )
    }
}

/// Solve 8x8 linear system using Gaussian elimination
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(a: &[[f64; 8]; 8], b: &[f64; 8]) -> Option<[f64; 8]> {
    let mut a = *a;
    let mut b = *b;
    let n = 8;

    for i in 0..n {
        // Partial pivoting
        let mut max_val = a[i][i].abs();
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > max_val {
                max_val = a[k][i].abs();
                max_row = k;
            }
        }

        if max_val < 1e-12 {
            return None;
        }

        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }

        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perspective_transform() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        let dst = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 50.0),
            Point::new(0.0, 50.0),
        ];

        let t = PerspectiveTransform::from_points(&src, &dst).unwrap();
        let p = t.transform(&Point::new(50.0, 50.0));
        assert!((p.x - 25.0).abs() < 1e-3);
        assert!((p.y - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_affine_matches_points() {
        let t = PerspectiveTransform::affine(
            Point::new(10.0, 20.0),
            Point::new(4.0, 0.0),
            Point::new(0.0, 3.0),
        );
        let p = t.transform(&Point::new(2.5, 1.0));
        assert!((p.x - 20.0).abs() < 1e-4);
        assert!((p.y - 23.0).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_points_fail() {
        let p = Point::new(1.0, 1.0);
        assert!(PerspectiveTransform::from_points(&[p; 4], &[p; 4]).is_none());
    }
}
