//! Spatial attention heatmap.
//!
//! Gaze points are binned into a fixed grid, addressed either in physical
//! millimetres on the drawing surface or in pixels of a scene frame (a coarse
//! "pixel proxy" grid that is smoothed and upscaled for display).
//!
//! Smoothing is always applied to the source grid before any resizing, so a
//! rendered overlay and an exported heightfield are derived from the same
//! data ([`HeatmapAccumulator::smoothed_for_blur`]).

use crate::{
    config::HeatmapConfig,
    constants::{
        BLUR_DIAMETER_PER_SIGMA, BLUR_REFERENCE_WIDTH, MIN_BLUR_SIGMA, PROXY_CELL_PX, PROXY_MAX_COLS,
        PROXY_MAX_ROWS, PROXY_MIN_COLS, PROXY_MIN_ROWS,
    },
    utils::{
        safe_cast::{f64_to_cell, f64_to_usize_ceil, unit_to_u8},
        smoothing::{gaussian_blur, gaussian_blur_ksize, grid_to_image},
    },
    Error, Result,
};
use image::{imageops, imageops::FilterType, Rgba, RgbImage, RgbaImage};
use log::{debug, info};
use ndarray::Array2;
use std::path::Path;

/// How incoming coordinates address grid cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridAddressing {
    /// Millimetres on a physical surface, one cell per `resolution_mm`
    Physical {
        /// Surface width (mm)
        width_mm: f64,
        /// Surface height (mm)
        height_mm: f64,
        /// Cell edge length (mm)
        resolution_mm: f64,
    },
    /// Pixels of a scene frame, scaled onto a coarse proxy grid
    PixelProxy {
        /// Frame width (px)
        frame_width: u32,
        /// Frame height (px)
        frame_height: u32,
    },
}

/// Accumulates gaze points into a 2D grid
#[derive(Debug, Clone)]
pub struct HeatmapAccumulator {
    addressing: GridAddressing,
    grid: Array2<f32>,
}

impl HeatmapAccumulator {
    /// Create a physical-mode accumulator
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` unless all dimensions are positive and finite
    pub fn new(width_mm: f64, height_mm: f64, resolution_mm: f64) -> Result<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(width_mm) && valid(height_mm) && valid(resolution_mm)) {
            return Err(Error::InvalidInput(format!(
                "Invalid heatmap dimensions {width_mm}x{height_mm} at {resolution_mm}mm"
            )));
        }

        let cols = f64_to_usize_ceil(width_mm / resolution_mm)?.max(1);
        let rows = f64_to_usize_ceil(height_mm / resolution_mm)?.max(1);
        debug!("Heatmap grid {}x{} cells", cols, rows);

        Ok(Self {
            addressing: GridAddressing::Physical {
                width_mm,
                height_mm,
                resolution_mm,
            },
            grid: Array2::zeros((rows, cols)),
        })
    }

    /// Create a physical-mode accumulator sized from configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for non-positive dimensions or resolution
    pub fn from_config(width_mm: f64, height_mm: f64, config: &HeatmapConfig) -> Result<Self> {
        Self::new(width_mm, height_mm, config.resolution_mm)
    }

    /// Switch to pixel-proxy addressing for a scene frame; the grid is cleared
    pub fn set_frame_size(&mut self, width: u32, height: u32) {
        let cols = (width / PROXY_CELL_PX) as usize;
        let rows = (height / PROXY_CELL_PX) as usize;
        let cols = cols.clamp(PROXY_MIN_COLS, PROXY_MAX_COLS);
        let rows = rows.clamp(PROXY_MIN_ROWS, PROXY_MAX_ROWS);

        self.addressing = GridAddressing::PixelProxy {
            frame_width: width,
            frame_height: height,
        };
        self.grid = Array2::zeros((rows, cols));
        debug!("Heatmap switched to {}x{} proxy grid for {}x{} frames", cols, rows, width, height);
    }

    /// Current addressing mode
    #[must_use]
    pub const fn addressing(&self) -> GridAddressing {
        self.addressing
    }

    /// Grid width in cells
    #[must_use]
    pub fn cols(&self) -> usize {
        self.grid.ncols()
    }

    /// Grid height in cells
    #[must_use]
    pub fn rows(&self) -> usize {
        self.grid.nrows()
    }

    /// Add a unit-weight point in millimetres
    pub fn add_point(&mut self, x_mm: f64, y_mm: f64) {
        self.add_weighted_point(x_mm, y_mm, 1.0);
    }

    /// Add a weighted point in millimetres
    ///
    /// Ignored outside the surface, in pixel-proxy mode, or for a negative or
    /// non-finite weight.
    pub fn add_weighted_point(&mut self, x_mm: f64, y_mm: f64, weight: f64) {
        let GridAddressing::Physical {
            width_mm,
            height_mm,
            resolution_mm,
        } = self.addressing
        else {
            return;
        };
        if !(x_mm >= 0.0 && x_mm < width_mm && y_mm >= 0.0 && y_mm < height_mm) {
            return;
        }
        let cell = (x_mm / resolution_mm, y_mm / resolution_mm);
        self.deposit(cell, weight);
    }

    /// Add a unit-weight point in scene pixels
    pub fn add_point_px(&mut self, x_px: f64, y_px: f64) {
        self.add_weighted_point_px(x_px, y_px, 1.0);
    }

    /// Add a weighted point in scene pixels
    ///
    /// Ignored outside the frame, in physical mode, or for a negative or
    /// non-finite weight.
    pub fn add_weighted_point_px(&mut self, x_px: f64, y_px: f64, weight: f64) {
        let GridAddressing::PixelProxy {
            frame_width,
            frame_height,
        } = self.addressing
        else {
            return;
        };
        let (fw, fh) = (f64::from(frame_width), f64::from(frame_height));
        if !(x_px >= 0.0 && x_px < fw && y_px >= 0.0 && y_px < fh) {
            return;
        }
        #[allow(clippy::cast_precision_loss)] // Proxy grids have at most 128 columns
        let cell = (x_px * self.cols() as f64 / fw, y_px * self.rows() as f64 / fh);
        self.deposit(cell, weight);
    }

    #[allow(clippy::cast_possible_truncation)] // Cell weights are stored as f32
    fn deposit(&mut self, cell: (f64, f64), weight: f64) {
        if !(weight.is_finite() && weight >= 0.0) {
            return;
        }
        let (Some(col), Some(row)) = (
            f64_to_cell(cell.0, self.cols()),
            f64_to_cell(cell.1, self.rows()),
        ) else {
            return;
        };
        self.grid[[row, col]] += weight as f32;
    }

    /// Largest cell value
    #[must_use]
    pub fn max_value(&self) -> f32 {
        self.grid.fold(0.0, |acc, &v| acc.max(v))
    }

    /// Raw accumulated counts
    #[must_use]
    pub const fn raw_grid(&self) -> &Array2<f32> {
        &self.grid
    }

    /// Grid scaled so the maximum cell is 1.0; an empty grid is returned as-is
    #[must_use]
    pub fn normalized_grid(&self) -> Array2<f32> {
        let max = self.max_value();
        if max > 0.0 {
            &self.grid / max
        } else {
            self.grid.clone()
        }
    }

    /// Normalized grid blurred by a Gaussian with an odd kernel of about
    /// `blur_size` cells, clamped to the grid's smaller dimension
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Blur sizes are small slider values
    #[allow(clippy::cast_sign_loss)] // Only positive sizes reach the cast
    pub fn smoothed_grid(&self, blur_size: f64) -> Array2<f32> {
        let normalized = self.normalized_grid();
        if !(blur_size > 0.0) {
            return normalized;
        }

        let mut ksize = (blur_size as usize).max(1) | 1;
        let mut max_k = self.cols().min(self.rows());
        if max_k % 2 == 0 {
            max_k -= 1;
        }
        ksize = ksize.min(max_k);

        if ksize > 1 {
            gaussian_blur_ksize(&normalized, ksize)
        } else {
            normalized
        }
    }

    /// Normalized grid blurred by a Gaussian of the given sigma (in cells)
    ///
    /// Sigmas at or below 0.1 leave the grid unblurred.
    #[must_use]
    pub fn smoothed_grid_sigma(&self, sigma: f64) -> Array2<f32> {
        let normalized = self.normalized_grid();
        if sigma > MIN_BLUR_SIGMA {
            gaussian_blur(&normalized, sigma)
        } else {
            normalized
        }
    }

    /// Grid-space sigma for a blur diameter given in reference display pixels
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Column counts are small
    pub fn blur_sigma(&self, blur_size: f64) -> f64 {
        let scale = self.cols() as f64 / BLUR_REFERENCE_WIDTH;
        blur_size / BLUR_DIAMETER_PER_SIGMA * scale
    }

    /// Smoothed grid shared by overlays and heightfield exports
    #[must_use]
    pub fn smoothed_for_blur(&self, blur_size: f64) -> Array2<f32> {
        self.smoothed_grid_sigma(self.blur_sigma(blur_size))
    }

    /// Render a JET-coloured RGBA overlay of the given size
    ///
    /// Per-pixel opacity follows intensity, so cells without data are fully
    /// transparent.
    #[must_use]
    pub fn render_overlay(&self, width: u32, height: u32, alpha: f64, blur_size: f64) -> RgbaImage {
        if width == 0 || height == 0 {
            return RgbaImage::new(width, height);
        }
        render_grid(&self.smoothed_for_blur(blur_size), width, height, alpha)
    }

    /// Render the overlay and save it as a transparent PNG
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be encoded or written
    pub fn save_png<P: AsRef<Path>>(
        &self,
        path: P,
        width: u32,
        height: u32,
        alpha: f64,
        blur_size: f64,
    ) -> Result<()> {
        let overlay = self.render_overlay(width, height, alpha, blur_size);
        overlay.save(&path)?;
        info!("Heatmap saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Alpha-blend the overlay onto a background image of any size
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Clamped to [0, 255] before the cast
    #[allow(clippy::cast_sign_loss)] // Clamped to non-negative before the cast
    pub fn composite(&self, background: &RgbImage, alpha: f64, blur_size: f64) -> RgbImage {
        let overlay = self.render_overlay(background.width(), background.height(), alpha, blur_size);
        let mut combined = background.clone();

        for (dst, src) in combined.pixels_mut().zip(overlay.pixels()) {
            let a = f32::from(src[3]) / 255.0;
            for c in 0..3 {
                let blended = f32::from(src[c]).mul_add(a, f32::from(dst[c]) * (1.0 - a));
                dst[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
        }
        combined
    }

    /// Blend the overlay onto a background image and save it
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be encoded or written
    pub fn save_combined<P: AsRef<Path>>(
        &self,
        path: P,
        background: &RgbImage,
        alpha: f64,
        blur_size: f64,
    ) -> Result<()> {
        self.composite(background, alpha, blur_size).save(&path)?;
        info!("Combined heatmap saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Zero every cell, keeping shape and addressing mode
    pub fn reset(&mut self) {
        self.grid.fill(0.0);
    }
}

/// Resize a smoothed grid and colour it as an RGBA overlay
///
/// The resized grid is re-normalized to its own maximum before colouring.
#[must_use]
pub fn render_grid(grid: &Array2<f32>, width: u32, height: u32, alpha: f64) -> RgbaImage {
    let Some(source) = grid_to_image(grid) else {
        return RgbaImage::new(width, height);
    };
    if width == 0 || height == 0 || source.width() == 0 || source.height() == 0 {
        return RgbaImage::new(width, height);
    }

    let resized = imageops::resize(&source, width, height, FilterType::Triangle);
    let max = resized.pixels().fold(0.0f32, |acc, p| acc.max(p[0]));

    #[allow(clippy::cast_possible_truncation)] // Opacity is in [0, 1]
    let alpha = alpha as f32;
    RgbaImage::from_fn(width, height, |x, y| {
        let raw = resized.get_pixel(x, y)[0];
        let v = if max > 0.0 { raw / max } else { raw };
        let [r, g, b] = jet(unit_to_u8(v));
        Rgba([r, g, b, unit_to_u8(v * alpha)])
    })
}

/// JET colour ramp (blue → cyan → yellow → red) for an 8-bit intensity
#[must_use]
pub fn jet(value: u8) -> [u8; 3] {
    let v = f32::from(value) / 255.0;
    let channel = |offset: f32| unit_to_u8(1.5 - 4.0f32.mul_add(v, -offset).abs());
    [channel(3.0), channel(2.0), channel(1.0)]
}
