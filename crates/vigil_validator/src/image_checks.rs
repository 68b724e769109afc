//! Pixel-level image heuristics.

use crate::ValidatorConfig;
use image::{Rgba, RgbaImage};
use tracing::trace;
use vigil_core::{IssueCategory, ValidationIssue};

const UNIFORMITY_GRID: u32 = 10;
const BALANCE_GRID: u32 = 20;
const BLOCK_PERIOD: u32 = 8;
const BLOCK_JUMP: f64 = 60.0;
const BLOCK_FLAT: f64 = 10.0;

/// Euclidean distance between two pixels in RGB space.
pub(crate) fn rgb_distance(a: &Rgba<u8>, b: &Rgba<u8>) -> f64 {
    let dr = f64::from(a[0]) - f64::from(b[0]);
    let dg = f64::from(a[1]) - f64::from(b[1]);
    let db = f64::from(a[2]) - f64::from(b[2]);
    (dr * dr + dg * dg + db * db).sqrt()
}

fn luminance(p: &Rgba<u8>) -> f64 {
    0.299 * f64::from(p[0]) + 0.587 * f64::from(p[1]) + 0.114 * f64::from(p[2])
}

/// Cell-centre coordinates of an `n`-cell grid over `len` pixels.
fn grid_points(len: u32, n: u32) -> impl Iterator<Item = u32> {
    let n = n.min(len).max(1);
    (0..n).map(move |i| ((2 * i + 1) * len / (2 * n)).min(len - 1))
}

/// Run every image check. A dimension failure short-circuits the rest.
pub(crate) fn check_image(image: &RgbaImage, config: &ValidatorConfig) -> Vec<ValidationIssue> {
    let (width, height) = image.dimensions();
    let floor = *config.min_image_dimension();
    if width < floor || height < floor {
        return vec![ValidationIssue::critical(
            IssueCategory::ImageQuality,
            format!("image too small: {width}x{height}, minimum is {floor}x{floor}"),
        )];
    }

    let mut issues = Vec::new();

    let uniformity = uniformity_score(image);
    trace!(uniformity, "Uniformity score");
    if uniformity > *config.max_uniformity() {
        issues.push(ValidationIssue::major(
            IssueCategory::ImageQuality,
            format!("excessive uniform areas (uniformity {uniformity:.2})"),
        ));
    }

    let blocks = block_boundary_density(image);
    trace!(blocks, "Compression block density");
    if blocks > *config.max_block_density() {
        issues.push(ValidationIssue::minor(
            IssueCategory::ImageArtifact,
            format!("possible compression block artifacts (density {blocks:.2})"),
        ));
    }

    let [r, g, b] = channel_means(image);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max > *config.channel_high() && min < *config.channel_low() {
        issues.push(ValidationIssue::minor(
            IssueCategory::ImageArtifact,
            format!("color channel imbalance (r {r:.0}, g {g:.0}, b {b:.0})"),
        ));
    }

    let edges = edge_density(image, *config.edge_region(), *config.edge_distance());
    let (low, high) = *config.edge_density_range();
    trace!(edges, "Edge density");
    if edges < low {
        issues.push(ValidationIssue::minor(
            IssueCategory::ImageArtifact,
            format!("very few edges, image may be blurry (density {edges:.2})"),
        ));
    } else if edges > high {
        issues.push(ValidationIssue::minor(
            IssueCategory::ImageArtifact,
            format!("excessive edges, image may be noisy (density {edges:.2})"),
        ));
    }

    issues
}

/// `1 - stddev / 127.5` of luminance over a coarse sample grid, in `[0, 1]`.
pub(crate) fn uniformity_score(image: &RgbaImage) -> f64 {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return 1.0;
    }
    let samples: Vec<f64> = grid_points(height, UNIFORMITY_GRID)
        .flat_map(|y| grid_points(width, UNIFORMITY_GRID).map(move |x| (x, y)))
        .map(|(x, y)| luminance(image.get_pixel(x, y)))
        .collect();
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance.sqrt() / 127.5).clamp(0.0, 1.0)
}

/// Fraction of 8-pixel column boundaries, on every eighth row, where a sharp
/// jump sits between two flat neighbours.
pub(crate) fn block_boundary_density(image: &RgbaImage) -> f64 {
    let (width, height) = image.dimensions();
    if width < BLOCK_PERIOD * 2 {
        return 0.0;
    }
    let mut boundaries = 0u32;
    let mut breaks = 0u32;
    for y in (0..height).step_by(BLOCK_PERIOD as usize) {
        let mut x = BLOCK_PERIOD;
        while x + 1 < width {
            let left = image.get_pixel(x - 1, y);
            let right = image.get_pixel(x, y);
            let jump = rgb_distance(left, right);
            let flat_left = rgb_distance(image.get_pixel(x - 2, y), left) < BLOCK_FLAT;
            let flat_right = rgb_distance(right, image.get_pixel(x + 1, y)) < BLOCK_FLAT;
            boundaries += 1;
            if jump > BLOCK_JUMP && flat_left && flat_right {
                breaks += 1;
            }
            x += BLOCK_PERIOD;
        }
    }
    if boundaries == 0 {
        0.0
    } else {
        f64::from(breaks) / f64::from(boundaries)
    }
}

/// Mean of each RGB channel over a 20x20 sample grid.
pub(crate) fn channel_means(image: &RgbaImage) -> [f64; 3] {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return [0.0; 3];
    }
    let mut sums = [0.0f64; 3];
    let mut count = 0.0;
    for y in grid_points(height, BALANCE_GRID) {
        for x in grid_points(width, BALANCE_GRID) {
            let p = image.get_pixel(x, y);
            for (sum, channel) in sums.iter_mut().zip(p.0.iter()) {
                *sum += f64::from(*channel);
            }
            count += 1.0;
        }
    }
    sums.map(|s| s / count)
}

/// Share of right and down neighbour pairs in a central square of side at
/// most `region` whose RGB distance exceeds `threshold`.
pub(crate) fn edge_density(image: &RgbaImage, region: u32, threshold: f64) -> f64 {
    let (width, height) = image.dimensions();
    let side_x = region.min(width);
    let side_y = region.min(height);
    if side_x < 2 || side_y < 2 {
        return 0.0;
    }
    let x0 = (width - side_x) / 2;
    let y0 = (height - side_y) / 2;
    let mut pairs = 0u32;
    let mut edges = 0u32;
    for y in y0..y0 + side_y {
        for x in x0..x0 + side_x {
            let p = image.get_pixel(x, y);
            if x + 1 < x0 + side_x {
                pairs += 1;
                if rgb_distance(p, image.get_pixel(x + 1, y)) > threshold {
                    edges += 1;
                }
            }
            if y + 1 < y0 + side_y {
                pairs += 1;
                if rgb_distance(p, image.get_pixel(x, y + 1)) > threshold {
                    edges += 1;
                }
            }
        }
    }
    f64::from(edges) / f64::from(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_image_is_uniform() {
        let image = RgbaImage::from_pixel(200, 200, Rgba([120, 120, 120, 255]));
        assert!((uniformity_score(&image) - 1.0).abs() < 1e-9);
        assert_eq!(edge_density(&image, 50, 30.0), 0.0);
    }

    #[test]
    fn test_checkerboard_has_dense_edges() {
        let image = RgbaImage::from_fn(200, 200, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        assert!(edge_density(&image, 50, 30.0) > 0.99);
        assert!(uniformity_score(&image) < 0.5);
    }

    #[test]
    fn test_blocky_image_has_boundary_breaks() {
        let image = RgbaImage::from_fn(256, 64, |x, _| {
            if (x / 8) % 2 == 0 {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([220, 220, 220, 255])
            }
        });
        assert!(block_boundary_density(&image) > 0.9);
    }

    #[test]
    fn test_red_image_is_imbalanced() {
        let image = RgbaImage::from_pixel(150, 150, Rgba([250, 10, 10, 255]));
        let [r, g, b] = channel_means(&image);
        assert!(r > 200.0 && g < 50.0 && b < 50.0);
    }

    #[test]
    fn test_grid_points_stay_in_bounds() {
        assert!(grid_points(7, 10).all(|p| p < 7));
        assert_eq!(grid_points(100, 10).count(), 10);
    }
}
