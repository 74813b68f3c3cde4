//! Gaze estimation library for eye-tracking driven attention mapping.
//!
//! This library provides the geometric and statistical core of an eye
//! tracker:
//! - Eye globe auto-fitting from pupil ellipses with MAD outlier rejection
//! - Quadratic pupil-to-world calibration by ridge-regularized least squares
//! - One-euro adaptive filtering of gaze coordinates
//! - Scene-to-canvas mapping and a spatial heatmap accumulator
//!
//! The per-frame pipeline consists of:
//! 1. A pupil ellipse from an external detector
//! 2. Globe fitting while the user looks around (auto-calibration)
//! 3. Calibrated, smoothed mapping into scene coordinates
//! 4. Conversion to physical canvas millimetres and heatmap accumulation
//!
//! # Examples
//!
//! ## Calibration
//!
//! ```
//! use gaze_estimation::calibration::CalibrationModel;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut model = CalibrationModel::new();
//!
//! // Pupil positions recorded while looking at nine known targets
//! for &px in &[100.0, 150.0, 200.0] {
//!     for &py in &[80.0, 110.0, 140.0] {
//!         model.add_point((px, py), (px * 2.0, py * 3.0));
//!     }
//! }
//!
//! let rmse = model.compute_model()?;
//! let world = model.map_point((150.0, 110.0));
//! println!("RMSE {rmse:.3}, center maps to {world:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Globe Fitting
//!
//! ```
//! use gaze_estimation::{globe_fitting::GlobeFitter, observation::PupilObservation};
//!
//! let mut fitter = GlobeFitter::new();
//!
//! // Pupil ellipses seen while the eye rotates about (320, 240)
//! for i in 0..36 {
//!     let phi = f64::from(i) * 5.0;
//!     let (sin, cos) = phi.to_radians().sin_cos();
//!     let center = (320.0 + 80.0 * cos, 240.0 + 80.0 * sin);
//!     fitter.add_observation(PupilObservation::new(center, (12.0, 20.0), phi - 90.0, 0.9));
//! }
//!
//! if let Some(globe) = fitter.fit_globe(640.0, 480.0) {
//!     println!("Globe at {:?}, radius {:.1}px", globe.center, globe.radius);
//! }
//! println!("Coverage: {:.0}%", fitter.angular_coverage());
//! ```
//!
//! ## Complete Pipeline Example
//!
//! ```no_run
//! use gaze_estimation::{
//!     calibration::CalibrationModel,
//!     gaze_mapping::GazeMapper,
//!     heatmap::HeatmapAccumulator,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut model = CalibrationModel::new();
//! model.load("calibration.json")?;
//!
//! let mut mapper = GazeMapper::new(&model);
//! let mut heatmap = HeatmapAccumulator::new(420.0, 297.0, 1.0)?;
//!
//! let frames = [(0.0, Some((120.0, 95.0))), (0.033, None), (0.066, Some((122.0, 96.0)))];
//! for (t, pupil) in frames {
//!     let scene = mapper.map_to_scene(pupil, t);
//!     if let Some((x, y)) = mapper.map_scene_to_canvas(scene) {
//!         heatmap.add_point(x, y);
//!     }
//! }
//!
//! heatmap.save_png("heatmap.png", 1280, 905, 0.6, 31.0)?;
//! # Ok(())
//! # }
//! ```

/// Quadratic pupil-to-world calibration model
pub mod calibration;

/// Pupil ellipse observations from an external detector
pub mod observation;

/// Eye globe auto-fitting from pupil rays
pub mod globe_fitting;

/// Coordinate mapping from pupil to scene to canvas
pub mod gaze_mapping;

/// Spatial heatmap accumulation and overlay rendering
pub mod heatmap;

/// Guided calibration and auto-fit sessions
pub mod session;

/// Signal filtering algorithms for smoothing gaze coordinates
pub mod filters;

/// Numeric utilities: statistics, smoothing and safe casts
pub mod utils;

/// Error types and result handling
pub mod error;

/// Recording replay application
pub mod app;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
