//! Global and block-adaptive thresholding. All functions return a BitMatrix
//! where true = dark.

use crate::models::BitMatrix;

const BLOCK_SIZE_POWER: usize = 3;
const BLOCK_SIZE: usize = 1 << BLOCK_SIZE_POWER;
const MIN_DYNAMIC_RANGE: u32 = 24;

/// Images smaller than this on either side use Otsu instead of local blocks
pub const MIN_ADAPTIVE_DIMENSION: usize = BLOCK_SIZE * 5;

/// Convert grayscale image to binary using Otsu's thresholding method
pub fn otsu_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    let threshold = calculate_otsu_threshold(gray);
    threshold_binarize(gray, width, height, threshold)
}

/// Calculate Otsu's optimal threshold
pub fn calculate_otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total = gray.len() as f64;
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    // A single-valued image has no dark class
    let mut max_variance = 0.0;
    let mut optimal_threshold = 0u8;
    let mut class1_pixels = 0.0;
    let mut class1_sum = 0.0;

    // Pixels strictly below `threshold` form the dark class
    for threshold in 1..=255usize {
        class1_pixels += histogram[threshold - 1] as f64;
        class1_sum += (threshold - 1) as f64 * histogram[threshold - 1] as f64;
        let class2_pixels = total - class1_pixels;
        if class1_pixels == 0.0 || class2_pixels == 0.0 {
            continue;
        }

        let class1_mean = class1_sum / class1_pixels;
        let class2_mean = (total_sum - class1_sum) / class2_pixels;
        let weight1 = class1_pixels / total;
        let weight2 = class2_pixels / total;
        let variance = weight1 * weight2 * (class1_mean - class2_mean).powi(2);

        if variance > max_variance {
            max_variance = variance;
            optimal_threshold = threshold as u8;
        }
    }

    optimal_threshold
}

/// Simple global threshold binarization
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);

    for y in 0..height {
        for x in 0..width {
            binary.set(x, y, gray[y * width + x] < threshold);
        }
    }

    binary
}

/// Local thresholding over 8x8 blocks.
///
/// Each block's black point is its mean luminance, or half its minimum when
/// the block is nearly flat (then lifted towards already computed neighbours).
/// A pixel is dark when it is at or below the mean black point of the 5x5
/// block neighbourhood around its block.
pub fn adaptive_binarize(gray: &[u8], width: usize, height: usize) -> BitMatrix {
    if width < MIN_ADAPTIVE_DIMENSION || height < MIN_ADAPTIVE_DIMENSION {
        return otsu_binarize(gray, width, height);
    }

    let sub_width = width.div_ceil(BLOCK_SIZE);
    let sub_height = height.div_ceil(BLOCK_SIZE);
    let black_points = black_points(gray, width, height, sub_width, sub_height);

    let mut binary = BitMatrix::new(width, height);
    let max_x = width - BLOCK_SIZE;
    let max_y = height - BLOCK_SIZE;

    for by in 0..sub_height {
        let y_offset = (by << BLOCK_SIZE_POWER).min(max_y);
        let top = by.clamp(2, sub_height - 3);
        for bx in 0..sub_width {
            let x_offset = (bx << BLOCK_SIZE_POWER).min(max_x);
            let left = bx.clamp(2, sub_width - 3);

            let mut sum = 0u32;
            for row in &black_points[top - 2..=top + 2] {
                sum += row[left - 2..=left + 2].iter().sum::<u32>();
            }
            let threshold = sum / 25;

            for y in y_offset..y_offset + BLOCK_SIZE {
                let line = &gray[y * width..(y + 1) * width];
                for x in x_offset..x_offset + BLOCK_SIZE {
                    if line[x] as u32 <= threshold {
                        binary.set(x, y, true);
                    }
                }
            }
        }
    }

    binary
}

fn black_points(
    gray: &[u8],
    width: usize,
    height: usize,
    sub_width: usize,
    sub_height: usize,
) -> Vec<Vec<u32>> {
    let max_x = width - BLOCK_SIZE;
    let max_y = height - BLOCK_SIZE;
    let mut points = vec![vec![0u32; sub_width]; sub_height];

    for by in 0..sub_height {
        let y_offset = (by << BLOCK_SIZE_POWER).min(max_y);
        for bx in 0..sub_width {
            let x_offset = (bx << BLOCK_SIZE_POWER).min(max_x);
            let mut sum = 0u32;
            let mut min = u32::MAX;
            let mut max = 0u32;
            for y in y_offset..y_offset + BLOCK_SIZE {
                for &p in &gray[y * width + x_offset..y * width + x_offset + BLOCK_SIZE] {
                    let p = p as u32;
                    sum += p;
                    min = min.min(p);
                    max = max.max(p);
                }
            }

            let mut average = sum >> (BLOCK_SIZE_POWER * 2);
            if max - min <= MIN_DYNAMIC_RANGE {
                average = min / 2;
                if by > 0 && bx > 0 {
                    let neighbours = (points[by - 1][bx]
                        + 2 * points[by][bx - 1]
                        + points[by - 1][bx - 1])
                        / 4;
                    if min < neighbours {
                        average = neighbours;
                    }
                }
            }
            points[by][bx] = average;
        }
    }

    points
}

/// Flip pixels whose four direct neighbours all have the opposite colour
pub fn despeckle(binary: &BitMatrix) -> BitMatrix {
    let mut out = binary.clone();
    let (w, h) = (binary.width(), binary.height());
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let v = binary.get(x, y);
            if binary.get(x - 1, y) != v
                && binary.get(x + 1, y) != v
                && binary.get(x, y - 1) != v
                && binary.get(x, y + 1) != v
            {
                out.set(x, y, !v);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarize() {
        let gray = vec![100, 150, 200, 50]; // 2x2 image
        let binary = threshold_binarize(&gray, 2, 2, 128);

        assert!(binary.get(0, 0)); // 100 < 128
        assert!(!binary.get(1, 0)); // 150 >= 128
        assert!(!binary.get(0, 1)); // 200 >= 128
        assert!(binary.get(1, 1)); // 50 < 128
    }

    #[test]
    fn test_otsu_binarize() {
        let mut gray = vec![50u8; 50]; // Dark class
        gray.extend(vec![200u8; 50]); // Light class

        let binary = otsu_binarize(&gray, 10, 10);
        assert!(binary.get(0, 0));
        assert!(!binary.get(0, 7));
    }

    #[test]
    fn test_adaptive_uniform_is_light() {
        let gray = vec![128u8; 64 * 64];
        let binary = adaptive_binarize(&gray, 64, 64);
        assert_eq!(binary.count_ones(), 0);
    }

    #[test]
    fn test_adaptive_follows_illumination_gradient() {
        // Dark squares on a background that brightens from left to right
        let (w, h) = (96, 64);
        let mut gray = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let background = 120 + (x * 120 / w) as u8;
                let dark = (x / 6 + y / 6) % 2 == 0;
                gray[y * w + x] = if dark { background - 90 } else { background };
            }
        }
        let binary = adaptive_binarize(&gray, w, h);
        for y in 0..h {
            for x in 0..w {
                assert_eq!(binary.get(x, y), (x / 6 + y / 6) % 2 == 0, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_small_images_use_otsu() {
        let mut gray = vec![240u8; 20 * 20];
        gray[0] = 10;
        let binary = adaptive_binarize(&gray, 20, 20);
        assert!(binary.get(0, 0));
        assert_eq!(binary.count_ones(), 1);
    }

    #[test]
    fn test_despeckle_removes_isolated_pixels() {
        let mut m = BitMatrix::new(5, 5);
        m.set(2, 2, true);
        let cleaned = despeckle(&m);
        assert_eq!(cleaned.count_ones(), 0);

        m.set(3, 2, true);
        let kept = despeckle(&m);
        assert_eq!(kept.count_ones(), 2);
    }
}
