//! Bright-region extraction from grayscale frames.
//!
//! A frame is cut to a binary mask at a fixed brightness cutoff, then
//! 8-connected regions are collected with their pixel areas and centroids.

use ndarray::{Array2, ArrayView2};
use shared::PixelPoint;

/// One connected bright region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Number of mask pixels in the region.
    pub area: usize,
    /// Unweighted centroid of the region's pixels, in (x, y) pixel space.
    pub centroid: PixelPoint,
}

/// Binary bright mask: true where the pixel exceeds the cutoff.
pub fn threshold_mask(frame: ArrayView2<u8>, cutoff: u8) -> Array2<bool> {
    frame.mapv(|p| p > cutoff)
}

/// Collect 8-connected regions of the mask with area and centroid.
///
/// Flood fill over the mask; each region accumulates its pixel count and
/// coordinate sums in one pass.
pub fn extract_regions(mask: ArrayView2<bool>) -> Vec<Region> {
    let (rows, cols) = mask.dim();
    let mut visited = Array2::from_elem((rows, cols), false);
    let mut regions = Vec::new();

    let neighbors = [
        (-1isize, -1isize),
        (-1, 0),
        (-1, 1),
        (0, -1),
        (0, 1),
        (1, -1),
        (1, 0),
        (1, 1),
    ];

    for i in 0..rows {
        for j in 0..cols {
            if !mask[[i, j]] || visited[[i, j]] {
                continue;
            }

            let mut area = 0usize;
            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            let mut stack = vec![(i, j)];
            visited[[i, j]] = true;

            while let Some((y, x)) = stack.pop() {
                area += 1;
                sum_x += x as f64;
                sum_y += y as f64;

                for &(dy, dx) in &neighbors {
                    let ny = y as isize + dy;
                    let nx = x as isize + dx;
                    if ny < 0 || ny >= rows as isize || nx < 0 || nx >= cols as isize {
                        continue;
                    }
                    let (ny, nx) = (ny as usize, nx as usize);
                    if mask[[ny, nx]] && !visited[[ny, nx]] {
                        visited[[ny, nx]] = true;
                        stack.push((ny, nx));
                    }
                }
            }

            regions.push(Region {
                area,
                centroid: PixelPoint::new(sum_x / area as f64, sum_y / area as f64),
            });
        }
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Paint a filled square of the given brightness onto a frame.
    fn paint_square(frame: &mut Array2<u8>, x: usize, y: usize, size: usize, level: u8) {
        for dy in 0..size {
            for dx in 0..size {
                frame[[y + dy, x + dx]] = level;
            }
        }
    }

    #[test]
    fn test_threshold_is_strictly_greater() {
        let mut frame = Array2::zeros((2, 3));
        frame[[0, 0]] = 140;
        frame[[0, 1]] = 141;
        let mask = threshold_mask(frame.view(), 140);
        assert!(!mask[[0, 0]]);
        assert!(mask[[0, 1]]);
    }

    #[test]
    fn test_two_separated_blobs() {
        let mut frame = Array2::zeros((40, 60));
        paint_square(&mut frame, 5, 10, 3, 255);
        paint_square(&mut frame, 40, 25, 4, 255);

        let mask = threshold_mask(frame.view(), 140);
        let mut regions = extract_regions(mask.view());
        regions.sort_by(|a, b| a.centroid.x.total_cmp(&b.centroid.x));

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].area, 9);
        assert_relative_eq!(regions[0].centroid.x, 6.0);
        assert_relative_eq!(regions[0].centroid.y, 11.0);
        assert_eq!(regions[1].area, 16);
        assert_relative_eq!(regions[1].centroid.x, 41.5);
        assert_relative_eq!(regions[1].centroid.y, 26.5);
    }

    #[test]
    fn test_diagonal_pixels_join_one_region() {
        let mut mask = Array2::from_elem((4, 4), false);
        mask[[0, 0]] = true;
        mask[[1, 1]] = true;
        mask[[2, 2]] = true;
        let regions = extract_regions(mask.view());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 3);
    }

    #[test]
    fn test_empty_mask_has_no_regions() {
        let mask = Array2::from_elem((8, 8), false);
        assert!(extract_regions(mask.view()).is_empty());
    }
}
