//! Separable Gaussian smoothing of 2D grids.
//!
//! Kernel sizing follows the usual computer-vision convention
//! (`ksize = round(8σ + 1) | 1`). Convolution runs through `imageproc` on a
//! single-channel float image, which replicates edge cells at the borders.

use crate::utils::safe_cast::usize_to_u32;
use image::{ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;
use ndarray::Array2;

/// Single-channel float image with one pixel per grid cell
pub type GridImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Copy a row-major grid into a `cols`×`rows` float image
#[must_use]
pub fn grid_to_image(grid: &Array2<f32>) -> Option<GridImage> {
    let cols = usize_to_u32(grid.ncols()).ok()?;
    let rows = usize_to_u32(grid.nrows()).ok()?;
    GridImage::from_raw(cols, rows, grid.iter().copied().collect())
}

/// Copy a float image back into a grid with one row per image row
#[must_use]
pub fn image_to_grid(image: GridImage) -> Option<Array2<f32>> {
    let rows = usize::try_from(image.height()).ok()?;
    let cols = usize::try_from(image.width()).ok()?;
    Array2::from_shape_vec((rows, cols), image.into_raw()).ok()
}

/// Kernel size derived from sigma for single-precision grids
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Sigma values are small and positive
#[allow(clippy::cast_sign_loss)] // Rounded value is non-negative for sigma > 0
pub fn kernel_size_for_sigma(sigma: f64) -> usize {
    let size = (sigma * 8.0 + 1.0).round().max(1.0) as usize;
    size | 1
}

/// Sigma implied by a kernel size when none is given explicitly
#[must_use]
#[allow(clippy::cast_precision_loss)] // Kernel sizes are tiny
pub fn sigma_for_kernel_size(ksize: usize) -> f64 {
    0.3f64.mul_add((ksize as f64 - 1.0) * 0.5 - 1.0, 0.8)
}

/// Normalized 1D Gaussian kernel of odd length `ksize`
#[must_use]
#[allow(clippy::cast_precision_loss)] // Kernel sizes are tiny
#[allow(clippy::cast_possible_truncation)] // Weights are stored as f32
pub fn gaussian_kernel(sigma: f64, ksize: usize) -> Vec<f32> {
    let center = (ksize as f64 - 1.0) / 2.0;
    let denom = 2.0 * sigma * sigma;

    let weights: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();

    weights.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Blur a grid with a Gaussian of the given sigma (kernel size derived from sigma)
#[must_use]
pub fn gaussian_blur(grid: &Array2<f32>, sigma: f64) -> Array2<f32> {
    let kernel = gaussian_kernel(sigma, kernel_size_for_sigma(sigma));
    separable_convolve(grid, &kernel)
}

/// Blur a grid with an odd kernel size (sigma derived from the size)
#[must_use]
pub fn gaussian_blur_ksize(grid: &Array2<f32>, ksize: usize) -> Array2<f32> {
    let ksize = ksize.max(1) | 1;
    let kernel = gaussian_kernel(sigma_for_kernel_size(ksize), ksize);
    separable_convolve(grid, &kernel)
}

fn separable_convolve(grid: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    if grid.is_empty() {
        return grid.clone();
    }
    grid_to_image(grid)
        .map(|image| separable_filter_equal(&image, kernel))
        .and_then(image_to_grid)
        .unwrap_or_else(|| grid.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_size_for_sigma() {
        assert_eq!(kernel_size_for_sigma(1.0), 9);
        assert_eq!(kernel_size_for_sigma(0.2), 3);
        assert_eq!(kernel_size_for_sigma(0.01), 1);
    }

    #[test]
    fn test_kernel_normalized_and_symmetric() {
        let kernel = gaussian_kernel(1.5, 13);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..kernel.len() / 2 {
            assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_grid_image_layout() {
        let grid = Array2::from_shape_fn((2, 3), |(r, c)| (r * 10 + c) as f32);
        let image = grid_to_image(&grid).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1)[0], 12.0);
        assert_eq!(image_to_grid(image).unwrap(), grid);
    }

    #[test]
    fn test_blur_replicates_edges() {
        // Left edge sees its own value outside the grid
        let mut grid = Array2::<f32>::zeros((1, 5));
        grid[[0, 0]] = 1.0;
        let kernel = gaussian_kernel(sigma_for_kernel_size(3), 3);
        let blurred = gaussian_blur_ksize(&grid, 3);

        assert!((blurred[[0, 0]] - (kernel[0] + kernel[1])).abs() < 1e-6);
        assert!((blurred[[0, 1]] - kernel[2]).abs() < 1e-6);
        assert_eq!(blurred[[0, 3]], 0.0);
    }

    #[test]
    fn test_blur_preserves_constant_grid() {
        let grid = Array2::<f32>::from_elem((6, 8), 0.5);
        let blurred = gaussian_blur(&grid, 2.0);
        for &v in &blurred {
            assert!((v - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_blur_spreads_impulse() {
        // Kernel footprint stays clear of the borders
        let mut grid = Array2::<f32>::zeros((15, 15));
        grid[[7, 7]] = 1.0;
        let blurred = gaussian_blur(&grid, 1.0);

        assert!(blurred[[7, 7]] < 1.0);
        assert!(blurred[[7, 8]] > 0.0);
        assert!((blurred[[7, 6]] - blurred[[7, 8]]).abs() < 1e-7);
        assert!((blurred[[6, 7]] - blurred[[8, 7]]).abs() < 1e-7);
        let total: f32 = blurred.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_blur_ksize_even_rounds_up() {
        let mut grid = Array2::<f32>::zeros((7, 7));
        grid[[3, 3]] = 1.0;
        let even = gaussian_blur_ksize(&grid, 4);
        let odd = gaussian_blur_ksize(&grid, 5);
        assert_eq!(even, odd);
    }
}
