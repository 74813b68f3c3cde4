//! Configuration management for the gaze estimation pipeline

use crate::constants::{
    AUTO_FIT_TIMEOUT_SECS, CALIBRATION_SAMPLES_PER_POINT, DEFAULT_BETA, DEFAULT_BLUR_SIZE,
    DEFAULT_CANVAS_HEIGHT_MM, DEFAULT_CANVAS_WIDTH_MM, DEFAULT_D_CUTOFF, DEFAULT_EYE_FRAME_HEIGHT,
    DEFAULT_EYE_FRAME_WIDTH, DEFAULT_HEATMAP_RESOLUTION_MM, DEFAULT_MAD_THRESHOLD,
    DEFAULT_MIN_ANGLE_DIFF, DEFAULT_MIN_CUTOFF, DEFAULT_OVERLAY_ALPHA, DEFAULT_PHYSICAL_HEIGHT_MM,
    DEFAULT_PHYSICAL_WIDTH_MM, DEFAULT_RIDGE_LAMBDA, DEFAULT_ROI, INTERSECTION_MARGIN_PX, MAX_AXIS_RATIO,
    MAX_INTERSECTIONS, MAX_RAYS, MIN_AXIS_PX, MIN_CALIBRATION_POINTS, MIN_PUPIL_CONFIDENCE,
    READY_MIN_COVERAGE, READY_MIN_RAYS,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Polynomial calibration configuration
    pub calibration: CalibrationConfig,

    /// Gaze smoothing filter configuration
    pub filter: FilterConfig,

    /// Eye globe auto-fit configuration
    pub globe: GlobeConfig,

    /// Scene region of interest and its physical size
    pub roi: RoiConfig,

    /// Heatmap accumulation and rendering configuration
    pub heatmap: HeatmapConfig,
}

/// Polynomial calibration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Ridge penalty added to the normal-equations diagonal
    pub ridge_lambda: f64,

    /// Minimum calibration pairs before a model is fitted
    pub min_points: usize,

    /// Drawing surface width (mm)
    pub width_mm: f64,

    /// Drawing surface height (mm)
    pub height_mm: f64,

    /// Pupil samples averaged for each calibration target
    pub samples_per_point: usize,
}

/// One-euro filter parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Cutoff frequency at rest (Hz)
    pub min_cutoff: f64,

    /// Speed coefficient
    pub beta: f64,

    /// Derivative cutoff frequency (Hz)
    pub d_cutoff: f64,
}

/// Eye globe auto-fit parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeConfig {
    /// Minimum detector confidence for an observation to be used
    pub min_confidence: f64,

    /// Minimum ellipse axis length (px)
    pub min_axis_px: f64,

    /// Maximum minor/major ratio; rounder pupils have unreliable orientation
    pub max_axis_ratio: f64,

    /// Minimum orientation difference between paired rays (degrees)
    pub min_angle_diff: f64,

    /// MAD multiples beyond which an intersection is rejected
    pub mad_threshold: f64,

    /// Margin around the eye frame inside which intersections are kept (px)
    pub intersection_margin: f64,

    /// Observation ring capacity
    pub max_rays: usize,

    /// Intersection ring capacity
    pub max_intersections: usize,

    /// Rays needed before the fit reports ready
    pub ready_min_rays: usize,

    /// Angular coverage (%) needed before the fit reports ready
    pub ready_min_coverage: f64,

    /// Eye camera frame width (px)
    pub frame_width: f64,

    /// Eye camera frame height (px)
    pub frame_height: f64,

    /// Auto-fit stops after this many seconds even when not ready
    pub timeout_secs: f64,
}

/// Scene region of interest mapped onto the physical canvas
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Left edge in scene pixels
    pub x: f64,

    /// Top edge in scene pixels
    pub y: f64,

    /// Width in scene pixels
    pub width: f64,

    /// Height in scene pixels
    pub height: f64,

    /// Physical width of the region (mm)
    pub physical_width_mm: f64,

    /// Physical height of the region (mm)
    pub physical_height_mm: f64,
}

/// Heatmap parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Physical cell size (mm)
    pub resolution_mm: f64,

    /// Visual blur diameter in pixels at a 1280 px wide display
    pub blur_size: f64,

    /// Overlay opacity (0.0-1.0)
    pub overlay_alpha: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            ridge_lambda: DEFAULT_RIDGE_LAMBDA,
            min_points: MIN_CALIBRATION_POINTS,
            width_mm: DEFAULT_CANVAS_WIDTH_MM,
            height_mm: DEFAULT_CANVAS_HEIGHT_MM,
            samples_per_point: CALIBRATION_SAMPLES_PER_POINT,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_cutoff: DEFAULT_MIN_CUTOFF,
            beta: DEFAULT_BETA,
            d_cutoff: DEFAULT_D_CUTOFF,
        }
    }
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            min_confidence: MIN_PUPIL_CONFIDENCE,
            min_axis_px: MIN_AXIS_PX,
            max_axis_ratio: MAX_AXIS_RATIO,
            min_angle_diff: DEFAULT_MIN_ANGLE_DIFF,
            mad_threshold: DEFAULT_MAD_THRESHOLD,
            intersection_margin: INTERSECTION_MARGIN_PX,
            max_rays: MAX_RAYS,
            max_intersections: MAX_INTERSECTIONS,
            ready_min_rays: READY_MIN_RAYS,
            ready_min_coverage: READY_MIN_COVERAGE,
            frame_width: DEFAULT_EYE_FRAME_WIDTH,
            frame_height: DEFAULT_EYE_FRAME_HEIGHT,
            timeout_secs: AUTO_FIT_TIMEOUT_SECS,
        }
    }
}

impl Default for RoiConfig {
    fn default() -> Self {
        let (x, y, width, height) = DEFAULT_ROI;
        Self {
            x,
            y,
            width,
            height,
            physical_width_mm: DEFAULT_PHYSICAL_WIDTH_MM,
            physical_height_mm: DEFAULT_PHYSICAL_HEIGHT_MM,
        }
    }
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            resolution_mm: DEFAULT_HEATMAP_RESOLUTION_MM,
            blur_size: DEFAULT_BLUR_SIZE,
            overlay_alpha: DEFAULT_OVERLAY_ALPHA,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        // Calibration
        if !(self.calibration.ridge_lambda >= 0.0) {
            return Err(Error::ConfigError("Ridge lambda must be non-negative".to_string()));
        }
        if self.calibration.min_points < MIN_CALIBRATION_POINTS {
            return Err(Error::ConfigError(format!(
                "Calibration needs at least {MIN_CALIBRATION_POINTS} points"
            )));
        }
        if !(self.calibration.width_mm > 0.0 && self.calibration.height_mm > 0.0) {
            return Err(Error::ConfigError("Canvas dimensions must be positive".to_string()));
        }
        if self.calibration.samples_per_point == 0 {
            return Err(Error::ConfigError(
                "Samples per calibration point must be greater than 0".to_string(),
            ));
        }

        // Filter
        if !(self.filter.min_cutoff > 0.0) {
            return Err(Error::ConfigError("Minimum cutoff must be positive".to_string()));
        }
        if !(self.filter.beta >= 0.0) {
            return Err(Error::ConfigError("Beta must be non-negative".to_string()));
        }
        if !(self.filter.d_cutoff > 0.0) {
            return Err(Error::ConfigError("Derivative cutoff must be positive".to_string()));
        }

        // Globe fitting
        if !(0.0..=1.0).contains(&self.globe.min_confidence) {
            return Err(Error::ConfigError(
                "Minimum confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.globe.max_axis_ratio) {
            return Err(Error::ConfigError(
                "Maximum axis ratio must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(self.globe.mad_threshold > 0.0) {
            return Err(Error::ConfigError("MAD threshold must be positive".to_string()));
        }
        if !(self.globe.min_angle_diff >= 0.0) {
            return Err(Error::ConfigError(
                "Minimum ray angle difference must be non-negative".to_string(),
            ));
        }
        if self.globe.max_rays == 0 || self.globe.max_intersections == 0 {
            return Err(Error::ConfigError(
                "Globe ring capacities must be greater than 0".to_string(),
            ));
        }
        if !(self.globe.frame_width > 0.0 && self.globe.frame_height > 0.0) {
            return Err(Error::ConfigError("Eye frame size must be positive".to_string()));
        }

        // Region of interest
        if !(self.roi.width > 0.0 && self.roi.height > 0.0) {
            return Err(Error::ConfigError("ROI size must be positive".to_string()));
        }
        if !(self.roi.physical_width_mm > 0.0 && self.roi.physical_height_mm > 0.0) {
            return Err(Error::ConfigError("ROI physical size must be positive".to_string()));
        }

        // Heatmap
        if !(self.heatmap.resolution_mm > 0.0) {
            return Err(Error::ConfigError("Heatmap resolution must be positive".to_string()));
        }
        if !(self.heatmap.blur_size >= 0.0) {
            return Err(Error::ConfigError("Blur size must be non-negative".to_string()));
        }
        if !(0.0..=1.0).contains(&self.heatmap.overlay_alpha) {
            return Err(Error::ConfigError(
                "Overlay alpha must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Gaze Estimation Configuration

# Polynomial gaze calibration
calibration:
  ridge_lambda: 0.001
  min_points: 6
  width_mm: 297.0
  height_mm: 210.0
  samples_per_point: 10

# One-euro smoothing of mapped gaze
filter:
  min_cutoff: 0.5
  beta: 0.1
  d_cutoff: 1.0

# Eye globe auto-fit
globe:
  min_confidence: 0.65
  min_axis_px: 3.0
  max_axis_ratio: 0.85
  min_angle_diff: 10.0
  mad_threshold: 2.0
  intersection_margin: 500.0
  max_rays: 300
  max_intersections: 3000
  ready_min_rays: 50
  ready_min_coverage: 60.0
  frame_width: 640.0
  frame_height: 480.0
  timeout_secs: 7.0

# Scene region mapped onto the physical canvas
roi:
  x: 0.0
  y: 0.0
  width: 640.0
  height: 480.0
  physical_width_mm: 420.0
  physical_height_mm: 297.0

# Heatmap
heatmap:
  resolution_mm: 1.0
  blur_size: 31.0
  overlay_alpha: 0.6
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.globe.max_rays, defaults.globe.max_rays);
        assert_eq!(parsed.globe.mad_threshold, defaults.globe.mad_threshold);
        assert_eq!(parsed.filter.min_cutoff, defaults.filter.min_cutoff);
        assert_eq!(parsed.roi.physical_width_mm, defaults.roi.physical_width_mm);
        assert_eq!(parsed.heatmap.blur_size, defaults.heatmap.blur_size);
        parsed.validate().unwrap();
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed = Config::from_yaml("globe:\n  mad_threshold: 3.0\n").unwrap();
        assert_eq!(parsed.globe.mad_threshold, 3.0);
        assert_eq!(parsed.globe.min_angle_diff, DEFAULT_MIN_ANGLE_DIFF);
        assert_eq!(parsed.calibration.min_points, MIN_CALIBRATION_POINTS);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.globe.min_confidence = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.filter.min_cutoff = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calibration.min_points = 3;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.heatmap.resolution_mm = f64::NAN;
        assert!(config.validate().is_err());
    }
}
