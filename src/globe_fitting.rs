//! Eye globe auto-fitting from pupil ellipse observations.
//!
//! When the eye rotates, the projected pupil becomes an ellipse whose minor
//! axis points along the gaze direction projected onto the image plane.
//! Extending that axis as a line from each pupil center gives a family of
//! rays that, for a spherical eye, all pass through the projected rotation
//! center of the globe. The fitter collects rays while the user looks
//! around, intersects every sufficiently divergent pair, and takes a robust
//! (MAD-filtered, median) estimate of where they meet.

use crate::{
    config::GlobeConfig,
    constants::{
        ANGLE_SECTORS, MAX_GLOBE_RADIUS_PX, MIN_GLOBE_RADIUS_PX, MIN_INTERSECTIONS, MIN_RAYS,
        MIN_SECTOR_SAMPLES, OVERSIZED_GLOBE_RADIUS_PX, PARALLEL_EPSILON, SECTOR_WIDTH_DEG,
    },
    observation::PupilObservation,
    utils::{
        distance,
        stats::{mad_filter, median_point},
    },
};
use log::{debug, info};
use nalgebra::{Matrix2, Vector2};
use std::collections::VecDeque;

/// Snapshot of auto-fit progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityMetrics {
    /// Accepted observations currently buffered
    pub ray_count: usize,
    /// Intersections currently buffered
    pub intersection_count: usize,
    /// Percentage of angular sectors with enough samples
    pub angular_coverage: f64,
    /// Per-sector sample counts
    pub sectors: [u32; ANGLE_SECTORS],
    /// Enough rays and coverage to stop collecting
    pub is_ready: bool,
}

/// Fitted eye globe in eye-camera pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeGlobe {
    /// Projected rotation center (px)
    pub center: (f64, f64),
    /// Largest pupil distance from the center (px)
    pub radius: f64,
}

impl EyeGlobe {
    /// Radius falls inside the range a real eye can produce
    #[must_use]
    pub fn is_plausible(&self) -> bool {
        self.radius > MIN_GLOBE_RADIUS_PX && self.radius < MAX_GLOBE_RADIUS_PX
    }

    /// Radius is plausible but large enough to suggest a poor fit
    #[must_use]
    pub fn is_oversized(&self) -> bool {
        self.radius > OVERSIZED_GLOBE_RADIUS_PX
    }

    /// Offset from the globe center to a pupil position
    ///
    /// Captured while the user looks straight ahead, this is the zero
    /// reference for [`EyeGlobe::gaze_vector`].
    #[must_use]
    pub fn zero_vector(&self, pupil: (f64, f64)) -> (f64, f64) {
        (pupil.0 - self.center.0, pupil.1 - self.center.1)
    }

    /// Pupil offset from the globe center relative to a zero reference
    #[must_use]
    pub fn gaze_vector(&self, pupil: (f64, f64), zero: (f64, f64)) -> (f64, f64) {
        let (vx, vy) = self.zero_vector(pupil);
        (vx - zero.0, vy - zero.1)
    }
}

/// Accumulates pupil rays and triangulates the globe center
#[derive(Debug, Clone)]
pub struct GlobeFitter {
    config: GlobeConfig,
    rays: VecDeque<PupilObservation>,
    intersections: VecDeque<(f64, f64)>,
    sectors: [u32; ANGLE_SECTORS],
}

impl Default for GlobeFitter {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobeFitter {
    /// Create a fitter with default thresholds
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GlobeConfig::default())
    }

    /// Create a fitter with custom thresholds
    ///
    /// Ring capacities are at least one entry.
    #[must_use]
    pub fn with_config(mut config: GlobeConfig) -> Self {
        config.max_rays = config.max_rays.max(1);
        config.max_intersections = config.max_intersections.max(1);
        Self {
            rays: VecDeque::with_capacity(config.max_rays),
            intersections: VecDeque::with_capacity(config.max_intersections),
            sectors: [0; ANGLE_SECTORS],
            config,
        }
    }

    /// Active thresholds
    #[must_use]
    pub const fn config(&self) -> &GlobeConfig {
        &self.config
    }

    /// Sector index for a major-axis angle, using the gaze (minor) axis
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Result of floor is within [0, 8]
    #[allow(clippy::cast_sign_loss)] // rem_euclid keeps the value non-negative
    pub fn sector_for_angle(angle: f64) -> usize {
        let gaze_angle = (angle + 90.0).rem_euclid(360.0);
        ((gaze_angle / SECTOR_WIDTH_DEG).floor() as usize) % ANGLE_SECTORS
    }

    /// Add an observation, returning whether it was accepted
    ///
    /// Low-confidence, tiny and near-circular ellipses carry no usable
    /// direction and are dropped.
    pub fn add_observation(&mut self, obs: PupilObservation) -> bool {
        if !(obs.confidence >= self.config.min_confidence) {
            debug!("Rejected observation: confidence {:.2}", obs.confidence);
            return false;
        }
        if !(obs.minor_axis() >= self.config.min_axis_px) {
            debug!("Rejected observation: axes {:?} too small", obs.axes);
            return false;
        }
        match obs.axis_ratio() {
            Some(ratio) if ratio <= self.config.max_axis_ratio => {}
            _ => {
                debug!("Rejected observation: ellipse too circular");
                return false;
            }
        }
        let values = [obs.angle, obs.center.0, obs.center.1, obs.axes.0, obs.axes.1];
        if !values.iter().all(|v| v.is_finite()) {
            debug!("Rejected observation: non-finite geometry");
            return false;
        }

        if self.rays.len() >= self.config.max_rays {
            self.rays.pop_front();
        }
        self.rays.push_back(obs);
        self.sectors[Self::sector_for_angle(obs.angle)] += 1;
        true
    }

    /// Percentage of sectors holding at least three samples
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // At most eight sectors
    pub fn angular_coverage(&self) -> f64 {
        let covered = self
            .sectors
            .iter()
            .filter(|&&count| count >= MIN_SECTOR_SAMPLES)
            .count();
        100.0 * covered as f64 / ANGLE_SECTORS as f64
    }

    /// Current collection statistics
    #[must_use]
    pub fn quality_metrics(&self) -> QualityMetrics {
        let angular_coverage = self.angular_coverage();
        QualityMetrics {
            ray_count: self.rays.len(),
            intersection_count: self.intersections.len(),
            angular_coverage,
            sectors: self.sectors,
            is_ready: self.rays.len() >= self.config.ready_min_rays
                && angular_coverage >= self.config.ready_min_coverage,
        }
    }

    /// Intersect the gaze-axis lines of two observations
    ///
    /// Returns `None` when the lines are (nearly) parallel.
    #[must_use]
    pub fn line_intersection(a: &PupilObservation, b: &PupilObservation) -> Option<(f64, f64)> {
        let da = direction(a.gaze_axis_angle());
        let db = direction(b.gaze_axis_angle());

        // a.center + t·da = b.center + s·db
        let system = Matrix2::new(da.x, -db.x, da.y, -db.y);
        if system.determinant().abs() < PARALLEL_EPSILON {
            return None;
        }
        let rhs = Vector2::new(b.center.0 - a.center.0, b.center.1 - a.center.1);
        let params = system.try_inverse()? * rhs;

        let t = params.x;
        Some((da.x.mul_add(t, a.center.0), da.y.mul_add(t, a.center.1)))
    }

    /// Robust estimate of the point where the collected rays converge
    ///
    /// Every pair of rays whose orientations differ by at least the configured
    /// angle is intersected; intersections within a margin around the
    /// `width`×`height` eye frame join a bounded history that persists across
    /// calls. The result is the per-axis median of the MAD-filtered history.
    pub fn average_intersection(&mut self, width: f64, height: f64) -> Option<(f64, f64)> {
        if self.rays.len() < MIN_RAYS {
            return None;
        }

        let margin = self.config.intersection_margin;
        let x_range = -margin..width + margin;
        let y_range = -margin..height + margin;

        let mut added = 0usize;
        for (i, a) in self.rays.iter().enumerate() {
            for b in self.rays.iter().skip(i + 1) {
                if (a.angle - b.angle).abs() < self.config.min_angle_diff {
                    continue;
                }
                let Some(point) = Self::line_intersection(a, b) else {
                    continue;
                };
                if x_range.contains(&point.0) && y_range.contains(&point.1) {
                    if self.intersections.len() >= self.config.max_intersections {
                        self.intersections.pop_front();
                    }
                    self.intersections.push_back(point);
                    added += 1;
                }
            }
        }
        debug!(
            "Added {} intersections from {} rays ({} stored)",
            added,
            self.rays.len(),
            self.intersections.len()
        );

        if self.intersections.len() < MIN_INTERSECTIONS {
            return None;
        }

        let history: Vec<(f64, f64)> = self.intersections.iter().copied().collect();
        let filtered = mad_filter(&history, self.config.mad_threshold);
        if filtered.len() < history.len() {
            debug!(
                "MAD filter kept {}/{} intersections",
                filtered.len(),
                history.len()
            );
        }
        median_point(&filtered)
    }

    /// Fit the globe: center from ray intersections, radius from pupil spread
    pub fn fit_globe(&mut self, width: f64, height: f64) -> Option<EyeGlobe> {
        let center = self.average_intersection(width, height)?;
        let radius = self
            .rays
            .iter()
            .map(|obs| distance(obs.center, center))
            .fold(0.0, f64::max);

        let metrics = self.quality_metrics();
        info!(
            "Globe fit: center ({:.1}, {:.1}), radius {:.1}px, {} rays, {} intersections, coverage {:.0}%",
            center.0,
            center.1,
            radius,
            metrics.ray_count,
            metrics.intersection_count,
            metrics.angular_coverage
        );

        Some(EyeGlobe { center, radius })
    }

    /// Buffered observations, oldest first
    pub fn rays(&self) -> impl Iterator<Item = &PupilObservation> {
        self.rays.iter()
    }

    /// Buffered intersections, oldest first
    pub fn intersections(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.intersections.iter()
    }

    /// Clear rays, intersections and coverage
    pub fn reset(&mut self) {
        self.rays.clear();
        self.intersections.clear();
        self.sectors = [0; ANGLE_SECTORS];
    }
}

fn direction(degrees: f64) -> Vector2<f64> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vector2::new(cos, sin)
}
