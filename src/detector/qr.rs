//! QR locator: groups finder patterns into symbol candidates and maps each
//! to a perspective sampling grid, refined by the bottom-right alignment
//! pattern when the version has one.

use super::finder::{FinderDetector, FinderPattern};
use crate::config::DecodeConfig;
use crate::decoder::qr::version_from_grid;
use crate::format::qr::alignment_centers;
use crate::models::{BitMatrix, Point, Version};
use crate::sampler::{SamplingGrid, sample_matrix};
use crate::utils::geometry::PerspectiveTransform;
use log::{debug, trace};

/// Candidates kept per image
const MAX_GROUPS: usize = 8;
/// Finder patterns considered for grouping, most confirmed first
const MAX_PATTERNS: usize = 24;

/// Sampling grids for QR candidates in `binary`, best first
pub fn locate(binary: &BitMatrix, config: &DecodeConfig) -> Vec<SamplingGrid> {
    let mut patterns = FinderDetector::detect(binary);
    patterns.truncate(MAX_PATTERNS);
    debug!("qr: {} finder patterns", patterns.len());
    if patterns.len() < 3 {
        return Vec::new();
    }

    let mut groups = group_finder_patterns(&patterns);
    groups.retain(|g| g.confidence >= config.min_confidence);
    groups.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    groups.truncate(MAX_GROUPS);

    groups
        .iter()
        .filter_map(|g| {
            let [a, b, c] = g.members.map(|i| &patterns[i]);
            let (tl, tr, bl, module_size, dimension) = order_finder_patterns(a, b, c)?;
            trace!(
                "qr: group tl=({:.1},{:.1}) tr=({:.1},{:.1}) bl=({:.1},{:.1}) dim={}",
                tl.x, tl.y, tr.x, tr.y, bl.x, bl.y, dimension
            );
            build_grid(binary, &tl, &tr, &bl, module_size, dimension)
        })
        .collect()
}

struct Group {
    members: [usize; 3],
    confidence: f32,
}

/// Triples of similarly sized patterns with a near right angle
fn group_finder_patterns(patterns: &[FinderPattern]) -> Vec<Group> {
    let mut groups = Vec::new();
    let n = patterns.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                if let Some(confidence) = group_confidence(&patterns[i], &patterns[j], &patterns[k])
                {
                    groups.push(Group {
                        members: [i, j, k],
                        confidence,
                    });
                }
            }
        }
    }
    groups
}

/// 1.0 for an ideal isosceles right triangle of equal patterns
fn group_confidence(a: &FinderPattern, b: &FinderPattern, c: &FinderPattern) -> Option<f32> {
    let sizes = [a.module_size, b.module_size, c.module_size];
    let min_size = sizes.iter().fold(f32::INFINITY, |m, &s| m.min(s));
    let max_size = sizes.iter().fold(0.0f32, |m, &s| m.max(s));
    if min_size <= 0.0 || max_size / min_size > 1.5 {
        return None;
    }

    let d_ab = a.center.distance(&b.center);
    let d_ac = a.center.distance(&c.center);
    let d_bc = b.center.distance(&c.center);
    let avg_module = (sizes[0] + sizes[1] + sizes[2]) / 3.0;
    let min_d = d_ab.min(d_ac).min(d_bc);
    if min_d < avg_module * 10.0 {
        return None;
    }

    // Right angle sits opposite the longest side
    let (hyp, leg1, leg2) = if d_bc >= d_ab && d_bc >= d_ac {
        (d_bc, d_ab, d_ac)
    } else if d_ac >= d_ab {
        (d_ac, d_ab, d_bc)
    } else {
        (d_ab, d_ac, d_bc)
    };
    let cos = ((leg1 * leg1 + leg2 * leg2 - hyp * hyp) / (2.0 * leg1 * leg2)).abs();
    if cos > 0.3 {
        return None;
    }
    let legs = leg1.min(leg2) / leg1.max(leg2);
    if legs < 0.5 {
        return None;
    }
    Some((1.0 - cos) * (min_size / max_size) * legs.sqrt())
}

/// Top-left, top-right, bottom-left, module size and snapped dimension
fn order_finder_patterns(
    a: &FinderPattern,
    b: &FinderPattern,
    c: &FinderPattern,
) -> Option<(Point, Point, Point, f32, usize)> {
    let patterns = [a, b, c];

    // Find the right-angle corner (top-left)
    let mut best_idx = 0usize;
    let mut best_cos = f32::INFINITY;
    for i in 0..3 {
        let p = &patterns[i].center;
        let p1 = &patterns[(i + 1) % 3].center;
        let p2 = &patterns[(i + 2) % 3].center;
        let (v1x, v1y) = (p1.x - p.x, p1.y - p.y);
        let (v2x, v2y) = (p2.x - p.x, p2.y - p.y);
        let denom = (v1x * v1x + v1y * v1y).sqrt() * (v2x * v2x + v2y * v2y).sqrt();
        if denom == 0.0 {
            continue;
        }
        let cos = ((v1x * v2x + v1y * v2y) / denom).abs();
        if cos < best_cos {
            best_cos = cos;
            best_idx = i;
        }
    }

    let tl = patterns[best_idx];
    let p1 = patterns[(best_idx + 1) % 3];
    let p2 = patterns[(best_idx + 2) % 3];
    let cross = (p1.center.x - tl.center.x) * (p2.center.y - tl.center.y)
        - (p1.center.y - tl.center.y) * (p2.center.x - tl.center.x);
    let (tr, bl) = if cross > 0.0 { (p1, p2) } else { (p2, p1) };

    let avg_module = (tl.module_size + tr.module_size + bl.module_size) / 3.0;
    let d_tr = tl.center.distance(&tr.center);
    let d_bl = tl.center.distance(&bl.center);
    let dim1 = estimate_dimension_from_distance(d_tr, avg_module)?;
    let dim2 = estimate_dimension_from_distance(d_bl, avg_module)?;
    let dim = if dim1 == dim2 {
        dim1
    } else if dim1.abs_diff(dim2) <= 4 {
        Version::from_dimension(((dim1 + dim2) / 2 - 17) / 4 * 4 + 17)?.size()
    } else {
        return None;
    };

    let module_size = (d_tr + d_bl) / 2.0 / (dim as f32 - 7.0);
    let module_ratio = module_size / avg_module;
    if !(0.8..=1.2).contains(&module_ratio) {
        return None;
    }
    Some((tl.center, tr.center, bl.center, module_size, dim))
}

fn estimate_dimension_from_distance(distance: f32, module_size: f32) -> Option<usize> {
    if module_size <= 0.0 {
        return None;
    }
    let raw_dim = distance / module_size + 7.0;
    if raw_dim < 19.0 {
        return None;
    }
    let version = ((raw_dim - 17.0) / 4.0).round().max(1.0) as u8;
    Version::new(version).map(|v| v.size())
}

fn build_grid(
    binary: &BitMatrix,
    tl: &Point,
    tr: &Point,
    bl: &Point,
    module_size: f32,
    dimension: usize,
) -> Option<SamplingGrid> {
    let mut dimension = dimension;
    let mut transform = corner_transform(tl, tr, bl, dimension)?;
    if dimension >= 45 {
        // Trust the version blocks over the distance estimate
        let preliminary = sample_matrix(binary, &transform, dimension, dimension);
        if let Some(version) = version_from_grid(&preliminary) {
            if version.size() != dimension {
                debug!("qr: dimension {} corrected to {}", dimension, version.size());
                dimension = version.size();
                transform = corner_transform(tl, tr, bl, dimension)?;
            }
        }
    }
    let version = Version::from_dimension(dimension)?;
    if let Some(refined) =
        refine_transform_with_alignment(binary, &transform, version, module_size, tl, tr, bl)
    {
        transform = refined;
    }
    Some(SamplingGrid::Matrix {
        transform,
        cols: dimension,
        rows: dimension,
        module_size,
    })
}

/// Affine-consistent transform from the three finder centres
fn corner_transform(
    tl: &Point,
    tr: &Point,
    bl: &Point,
    dimension: usize,
) -> Option<PerspectiveTransform> {
    let br = *tr + *bl - *tl;
    let far = dimension as f32 - 3.5;
    let src = [
        Point::new(3.5, 3.5),
        Point::new(far, 3.5),
        Point::new(3.5, far),
        Point::new(far, far),
    ];
    PerspectiveTransform::from_points(&src, &[*tl, *tr, *bl, br])
}

fn refine_transform_with_alignment(
    binary: &BitMatrix,
    transform: &PerspectiveTransform,
    version: Version,
    module_size: f32,
    top_left: &Point,
    top_right: &Point,
    bottom_left: &Point,
) -> Option<PerspectiveTransform> {
    if module_size < 1.0 {
        return None;
    }
    let (ax, ay) = alignment_centers(version)
        .into_iter()
        .max_by_key(|(x, y)| x + y)?;
    let align_src = Point::new(ax as f32 + 0.5, ay as f32 + 0.5);
    let predicted = transform.transform(&align_src);
    let found = find_alignment_center(binary, predicted, module_size)?;
    trace!(
        "qr: alignment predicted ({:.1},{:.1}) found ({:.1},{:.1})",
        predicted.x, predicted.y, found.x, found.y
    );

    let far = version.size() as f32 - 3.5;
    let src = [
        Point::new(3.5, 3.5),
        Point::new(far, 3.5),
        Point::new(3.5, far),
        align_src,
    ];
    PerspectiveTransform::from_points(&src, &[*top_left, *top_right, *bottom_left, found])
}

fn find_alignment_center(binary: &BitMatrix, predicted: Point, module_size: f32) -> Option<Point> {
    if !predicted.x.is_finite() || !predicted.y.is_finite() {
        return None;
    }
    let radius = (module_size * 4.0).max(4.0);
    let min_x = (predicted.x - radius).floor().max(0.0) as isize;
    let max_x = (predicted.x + radius).ceil() as isize;
    let min_y = (predicted.y - radius).floor().max(0.0) as isize;
    let max_y = (predicted.y + radius).ceil() as isize;

    let mut candidates = Vec::new();
    let mut best: Option<(Point, usize, f32)> = None;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            let Some(mismatch) = alignment_pattern_mismatch(binary, &center, module_size) else {
                continue;
            };
            let offset = center.distance_squared(&predicted);
            let better = match best {
                Some((_, m, d)) => mismatch < m || (mismatch == m && offset < d),
                None => true,
            };
            if better {
                best = Some((center, mismatch, offset));
            }
            candidates.push((center, mismatch));
        }
    }

    let (anchor, mismatch, _) = best?;
    if mismatch > 2 {
        return None;
    }
    // Every pixel inside the centre module scores the same; their mean is the
    // module centre rather than its top-left pixel
    let (sum, count) = candidates
        .iter()
        .filter(|(c, m)| *m == mismatch && c.distance(&anchor) <= module_size * 1.5)
        .fold((Point::new(0.0, 0.0), 0.0f32), |(sum, n), (c, _)| (sum + *c, n + 1.0));
    Some(Point::new(sum.x / count, sum.y / count))
}

fn alignment_pattern_mismatch(binary: &BitMatrix, center: &Point, module_size: f32) -> Option<usize> {
    let mut mismatches = 0usize;
    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            let expected_black = dx.abs() == 2 || dy.abs() == 2 || (dx == 0 && dy == 0);
            let sx = (center.x + dx as f32 * module_size).floor();
            let sy = (center.y + dy as f32 * module_size).floor();
            if sx < 0.0 || sy < 0.0 || sx as usize >= binary.width() || sy as usize >= binary.height()
            {
                return None;
            }
            if binary.get(sx as usize, sy as usize) != expected_black {
                mismatches += 1;
            }
        }
    }
    Some(mismatches)
}
