//! Polynomial gaze calibration.
//!
//! Maps raw pupil coordinates to world coordinates with a second-order
//! polynomial per axis:
//!
//! ```text
//! world = c0 + c1·x + c2·y + c3·xy + c4·x² + c5·y²
//! ```
//!
//! The quadratic terms absorb the non-linear pupil-to-angle response of an
//! off-axis eye camera. Coefficients are fitted by ridge-regularized least
//! squares so that the minimum of six to nine calibration targets still
//! gives a stable inversion.

use crate::{
    config::CalibrationConfig,
    constants::{DEFAULT_CANVAS_HEIGHT_MM, DEFAULT_CANVAS_WIDTH_MM, MIN_CALIBRATION_POINTS, POLY_TERMS},
    utils::distance,
    Error, Result,
};
use log::{info, warn};
use nalgebra::{Matrix6, Vector6};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fitted coefficients for both output axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Coefficients producing the world x coordinate
    pub x: Vector6<f64>,
    /// Coefficients producing the world y coordinate
    pub y: Vector6<f64>,
}

impl Coefficients {
    /// Evaluate both polynomials at a pupil position
    #[must_use]
    pub fn evaluate(&self, pupil: (f64, f64)) -> (f64, f64) {
        let features = basis(pupil);
        (features.dot(&self.x), features.dot(&self.y))
    }
}

/// Calibration state: either unfitted or ready to map points
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    /// No usable model
    Uncalibrated,
    /// Model fitted or restored
    Ready(Coefficients),
}

/// Persisted form of a fitted calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Coefficients for the world x coordinate
    pub coeffs_x: [f64; POLY_TERMS],
    /// Coefficients for the world y coordinate
    pub coeffs_y: [f64; POLY_TERMS],
    /// Drawing surface width (mm)
    #[serde(default = "default_width_mm")]
    pub width_mm: f64,
    /// Drawing surface height (mm)
    #[serde(default = "default_height_mm")]
    pub height_mm: f64,
    /// Training RMSE at the time of fitting
    #[serde(default)]
    pub rmse: f64,
}

const fn default_width_mm() -> f64 {
    DEFAULT_CANVAS_WIDTH_MM
}

const fn default_height_mm() -> f64 {
    DEFAULT_CANVAS_HEIGHT_MM
}

/// Quadratic feature vector [1, x, y, xy, x², y²]
#[must_use]
pub fn basis(pupil: (f64, f64)) -> Vector6<f64> {
    let (x, y) = pupil;
    Vector6::new(1.0, x, y, x * y, x * x, y * y)
}

/// Quadratic pupil-to-world calibration model
#[derive(Debug, Clone)]
pub struct CalibrationModel {
    pupil_points: Vec<(f64, f64)>,
    world_points: Vec<(f64, f64)>,
    state: CalibrationState,
    width_mm: f64,
    height_mm: f64,
    rmse: f64,
    ridge_lambda: f64,
    min_points: usize,
}

impl Default for CalibrationModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationModel {
    /// Create an empty model with default parameters
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&CalibrationConfig::default())
    }

    /// Create an empty model from configuration
    ///
    /// `min_points` below the six basis terms is raised to six.
    #[must_use]
    pub fn with_config(config: &CalibrationConfig) -> Self {
        Self {
            pupil_points: Vec::new(),
            world_points: Vec::new(),
            state: CalibrationState::Uncalibrated,
            width_mm: config.width_mm,
            height_mm: config.height_mm,
            rmse: 0.0,
            ridge_lambda: config.ridge_lambda,
            min_points: config.min_points.max(MIN_CALIBRATION_POINTS),
        }
    }

    /// Set the drawing surface dimensions (mm)
    pub fn set_dimensions(&mut self, width_mm: f64, height_mm: f64) {
        self.width_mm = width_mm;
        self.height_mm = height_mm;
    }

    /// Drawing surface dimensions (mm)
    #[must_use]
    pub const fn dimensions(&self) -> (f64, f64) {
        (self.width_mm, self.height_mm)
    }

    /// Remove all calibration pairs and invalidate the model
    pub fn clear_points(&mut self) {
        self.pupil_points.clear();
        self.world_points.clear();
        self.state = CalibrationState::Uncalibrated;
    }

    /// Add a calibration pair: pupil (x, y) -> world (x, y)
    pub fn add_point(&mut self, pupil_xy: (f64, f64), world_xy: (f64, f64)) {
        self.pupil_points.push(pupil_xy);
        self.world_points.push(world_xy);
    }

    /// Number of calibration pairs collected
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.pupil_points.len()
    }

    /// Collected calibration pairs
    pub fn points(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        self.pupil_points.iter().copied().zip(self.world_points.iter().copied())
    }

    /// Whether the model can map points
    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Ready(_))
    }

    /// Current calibration state
    #[must_use]
    pub const fn state(&self) -> &CalibrationState {
        &self.state
    }

    /// Training RMSE of the last fit or restored record
    #[must_use]
    pub const fn rmse(&self) -> f64 {
        self.rmse
    }

    /// Fit the quadratic model to the collected pairs
    ///
    /// On success the model becomes ready and the training RMSE is returned.
    /// On failure the model is left uncalibrated.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` with fewer than the minimum number of pairs,
    /// or `SingularMatrix` if the normal equations cannot be solved.
    pub fn compute_model(&mut self) -> Result<f64> {
        let count = self.point_count();
        if count < self.min_points {
            warn!(
                "Need at least {} points for calibration (preferably 9), have {}",
                self.min_points, count
            );
            self.state = CalibrationState::Uncalibrated;
            return Err(Error::InsufficientData {
                what: "calibration",
                needed: self.min_points,
                available: count,
            });
        }

        match self.solve() {
            Ok(coefficients) => {
                self.state = CalibrationState::Ready(coefficients);
                self.rmse = self.compute_rmse();
                info!("Calibration successful: {} points, RMSE {:.2}", count, self.rmse);
                Ok(self.rmse)
            }
            Err(e) => {
                warn!("Calibration failed: {}", e);
                self.state = CalibrationState::Uncalibrated;
                Err(e)
            }
        }
    }

    /// Solve (XᵀX + λI)⁻¹ Xᵀw for both axes
    fn solve(&self) -> Result<Coefficients> {
        let mut normal = Matrix6::<f64>::zeros();
        let mut rhs_x = Vector6::<f64>::zeros();
        let mut rhs_y = Vector6::<f64>::zeros();

        for (&pupil, &world) in self.pupil_points.iter().zip(&self.world_points) {
            let features = basis(pupil);
            normal += features * features.transpose();
            rhs_x += features * world.0;
            rhs_y += features * world.1;
        }
        normal += Matrix6::identity() * self.ridge_lambda;

        let inverse = normal
            .try_inverse()
            .ok_or_else(|| Error::SingularMatrix("normal equations are not invertible".to_string()))?;

        let coefficients = Coefficients {
            x: inverse * rhs_x,
            y: inverse * rhs_y,
        };

        if coefficients.x.iter().chain(coefficients.y.iter()).all(|c| c.is_finite()) {
            Ok(coefficients)
        } else {
            Err(Error::SingularMatrix("coefficients are not finite".to_string()))
        }
    }

    /// Map a pupil point to world coordinates, `None` when uncalibrated
    #[must_use]
    pub fn map_point(&self, pupil_xy: (f64, f64)) -> Option<(f64, f64)> {
        match &self.state {
            CalibrationState::Ready(coefficients) => Some(coefficients.evaluate(pupil_xy)),
            CalibrationState::Uncalibrated => None,
        }
    }

    /// Root mean square distance between predictions and training targets
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Point counts are small
    pub fn compute_rmse(&self) -> f64 {
        let squared: Vec<f64> = self
            .points()
            .filter_map(|(pupil, target)| self.map_point(pupil).map(|p| distance(p, target).powi(2)))
            .collect();

        if squared.is_empty() {
            return 0.0;
        }
        (squared.iter().sum::<f64>() / squared.len() as f64).sqrt()
    }

    /// Persistable record of the fitted model, `None` when uncalibrated
    #[must_use]
    pub fn to_record(&self) -> Option<CalibrationRecord> {
        match &self.state {
            CalibrationState::Ready(c) => Some(CalibrationRecord {
                coeffs_x: c.x.into(),
                coeffs_y: c.y.into(),
                width_mm: self.width_mm,
                height_mm: self.height_mm,
                rmse: self.rmse,
            }),
            CalibrationState::Uncalibrated => None,
        }
    }

    /// Restore a fitted model from a record; collected pairs are kept
    pub fn apply_record(&mut self, record: &CalibrationRecord) {
        self.state = CalibrationState::Ready(Coefficients {
            x: Vector6::from(record.coeffs_x),
            y: Vector6::from(record.coeffs_y),
        });
        self.width_mm = record.width_mm;
        self.height_mm = record.height_mm;
        self.rmse = record.rmse;
    }

    /// Create a ready model from a record
    #[must_use]
    pub fn from_record(record: &CalibrationRecord) -> Self {
        let mut model = Self::new();
        model.apply_record(record);
        model
    }

    /// Save the fitted model as JSON
    ///
    /// # Errors
    ///
    /// Returns `NotCalibrated` for an unfitted model, or an I/O or JSON error
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let record = self.to_record().ok_or(Error::NotCalibrated)?;
        let content = serde_json::to_string_pretty(&record)?;
        std::fs::write(&path, content)?;
        info!("Calibration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Load a fitted model from JSON
    ///
    /// The model is left untouched if loading fails.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a JSON error if it
    /// is not a valid calibration record
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let content = std::fs::read_to_string(&path)?;
        let record: CalibrationRecord = serde_json::from_str(&content)?;
        self.apply_record(&record);
        info!(
            "Calibration loaded from {} (RMSE: {:.2})",
            path.as_ref().display(),
            self.rmse
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn affine_world(p: (f64, f64)) -> (f64, f64) {
        (2.0 * p.0 + 10.0, 3.0 * p.1 - 5.0)
    }

    fn grid_points() -> Vec<(f64, f64)> {
        let mut points = Vec::new();
        for &x in &[1.0, 2.0, 3.0] {
            for &y in &[1.0, 2.0, 3.0] {
                points.push((x, y));
            }
        }
        points
    }

    #[test]
    fn test_basis() {
        let b = basis((2.0, 3.0));
        assert_eq!(b, Vector6::new(1.0, 2.0, 3.0, 6.0, 4.0, 9.0));
    }

    #[test]
    fn test_uncalibrated_maps_nothing() {
        let model = CalibrationModel::new();
        assert!(!model.is_calibrated());
        assert_eq!(model.map_point((1.0, 1.0)), None);
        assert_eq!(model.compute_rmse(), 0.0);
        assert!(model.to_record().is_none());
    }

    #[test]
    fn test_too_few_points() {
        let mut model = CalibrationModel::new();
        for p in grid_points().into_iter().take(5) {
            model.add_point(p, affine_world(p));
        }
        let result = model.compute_model();
        assert!(matches!(
            result,
            Err(Error::InsufficientData { needed: 6, available: 5, .. })
        ));
        assert!(!model.is_calibrated());
    }

    #[test]
    fn test_fits_affine_mapping() {
        let mut model = CalibrationModel::new();
        for p in grid_points() {
            model.add_point(p, affine_world(p));
        }
        let rmse = model.compute_model().unwrap();
        assert!(rmse >= 0.0);
        assert!(rmse < 0.05);

        let (x, y) = model.map_point((2.5, 1.5)).unwrap();
        let (ex, ey) = affine_world((2.5, 1.5));
        assert!((x - ex).abs() < 0.1);
        assert!((y - ey).abs() < 0.1);
    }

    #[test]
    fn test_clear_invalidates() {
        let mut model = CalibrationModel::new();
        for p in grid_points() {
            model.add_point(p, affine_world(p));
        }
        model.compute_model().unwrap();
        model.clear_points();
        assert!(!model.is_calibrated());
        assert_eq!(model.point_count(), 0);
    }

    #[test]
    fn test_non_finite_input_fails_cleanly() {
        let mut model = CalibrationModel::new();
        for p in grid_points() {
            model.add_point(p, affine_world(p));
        }
        model.add_point((f64::NAN, 1.0), (0.0, 0.0));
        assert!(model.compute_model().is_err());
        assert!(!model.is_calibrated());
    }

    #[test]
    fn test_record_defaults() {
        let json = r#"{"coeffs_x":[0,1,0,0,0,0],"coeffs_y":[0,0,1,0,0,0]}"#;
        let record: CalibrationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.width_mm, 297.0);
        assert_eq!(record.height_mm, 210.0);
        assert_eq!(record.rmse, 0.0);

        let model = CalibrationModel::from_record(&record);
        assert_eq!(model.map_point((4.0, 7.0)), Some((4.0, 7.0)));
    }
}
