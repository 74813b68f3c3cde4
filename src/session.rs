//! Guided capture sessions driving the calibration model and globe fitter.
//!
//! Both sessions are fed one sample at a time by the caller's frame loop and
//! report progress after every sample. Time is taken from sample timestamps,
//! never from a wall clock, so recorded sessions replay identically.

use crate::{
    calibration::CalibrationModel,
    config::{CalibrationConfig, GlobeConfig},
    constants::{CALIBRATION_TARGET_FRACTIONS, MIN_INTERSECTIONS},
    globe_fitting::{EyeGlobe, GlobeFitter, QualityMetrics},
    observation::PupilObservation,
    utils::mean_point,
    Error, Result,
};
use log::{debug, info, warn};

/// Progress of a calibration capture after one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureProgress {
    /// Buffering samples for the current target
    Collecting {
        /// Index of the target being captured
        target: usize,
        /// Samples buffered so far
        samples: usize,
    },
    /// A target was captured and the averaged pair added to the model
    PointAdded {
        /// Index of the captured target
        target: usize,
        /// Averaged pupil position
        pupil: (f64, f64),
        /// World position of the target
        world: (f64, f64),
    },
    /// All targets captured and the model fitted
    Complete {
        /// Training RMSE of the fitted model
        rmse: f64,
    },
}

/// Nine-target calibration capture
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    model: CalibrationModel,
    targets: Vec<(f64, f64)>,
    current: usize,
    buffer: Vec<(f64, f64)>,
    samples_per_point: usize,
}

impl CalibrationSession {
    /// Create a session over a `width`×`height` target surface
    #[must_use]
    pub fn new(width: f64, height: f64, config: &CalibrationConfig) -> Self {
        let targets = CALIBRATION_TARGET_FRACTIONS
            .iter()
            .flat_map(|&fy| {
                CALIBRATION_TARGET_FRACTIONS
                    .iter()
                    .map(move |&fx| (fx * width, fy * height))
            })
            .collect();

        Self::with_targets(targets, config)
    }

    /// Create a session over explicit world targets
    #[must_use]
    pub fn with_targets(targets: Vec<(f64, f64)>, config: &CalibrationConfig) -> Self {
        Self {
            model: CalibrationModel::with_config(config),
            targets,
            current: 0,
            buffer: Vec::with_capacity(config.samples_per_point),
            samples_per_point: config.samples_per_point.max(1),
        }
    }

    /// World targets in capture order
    #[must_use]
    pub fn targets(&self) -> &[(f64, f64)] {
        &self.targets
    }

    /// Target currently being captured, `None` once all are done
    #[must_use]
    pub fn current_target(&self) -> Option<(f64, f64)> {
        self.targets.get(self.current).copied()
    }

    /// Whether every target has been captured
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current >= self.targets.len()
    }

    /// Feed one pupil sample for the current target
    ///
    /// Non-finite samples are skipped. Samples after completion are ignored.
    ///
    /// # Errors
    ///
    /// Returns the model's error if fitting fails after the last target
    pub fn add_sample(&mut self, pupil: (f64, f64)) -> Result<CaptureProgress> {
        let Some(world) = self.current_target() else {
            return Ok(CaptureProgress::Complete {
                rmse: self.model.rmse(),
            });
        };

        if pupil.0.is_finite() && pupil.1.is_finite() {
            self.buffer.push(pupil);
        }
        if self.buffer.len() < self.samples_per_point {
            return Ok(CaptureProgress::Collecting {
                target: self.current,
                samples: self.buffer.len(),
            });
        }

        let Some(averaged) = mean_point(&self.buffer) else {
            return Ok(CaptureProgress::Collecting {
                target: self.current,
                samples: 0,
            });
        };
        self.buffer.clear();
        self.model.add_point(averaged, world);
        let target = self.current;
        self.current += 1;
        debug!(
            "Captured target {} at ({:.1}, {:.1}) -> pupil ({:.1}, {:.1})",
            target, world.0, world.1, averaged.0, averaged.1
        );

        if self.is_complete() {
            let rmse = self.model.compute_model()?;
            return Ok(CaptureProgress::Complete { rmse });
        }

        Ok(CaptureProgress::PointAdded {
            target,
            pupil: averaged,
            world,
        })
    }

    /// Discard captured pairs and start over from the first target
    pub fn restart(&mut self) {
        self.model.clear_points();
        self.buffer.clear();
        self.current = 0;
    }

    /// Model being calibrated
    #[must_use]
    pub const fn model(&self) -> &CalibrationModel {
        &self.model
    }

    /// Consume the session, returning the model
    #[must_use]
    pub fn into_model(self) -> CalibrationModel {
        self.model
    }
}

/// Progress of a globe auto-fit after one observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitProgress {
    /// Still gathering rays
    Collecting(QualityMetrics),
    /// Collection should stop; call [`GlobeFitSession::finish`]
    Finished {
        /// Metrics at the time collection stopped
        metrics: QualityMetrics,
        /// Stopped on the timeout rather than on readiness
        timed_out: bool,
    },
}

/// Time-bounded globe auto-fit
#[derive(Debug, Clone)]
pub struct GlobeFitSession {
    fitter: GlobeFitter,
    started_at: Option<f64>,
    timeout_secs: f64,
    frame_size: (f64, f64),
}

impl GlobeFitSession {
    /// Create a session with the given thresholds
    #[must_use]
    pub fn new(config: GlobeConfig) -> Self {
        Self {
            timeout_secs: config.timeout_secs,
            frame_size: (config.frame_width, config.frame_height),
            fitter: GlobeFitter::with_config(config),
            started_at: None,
        }
    }

    /// Feed one observation stamped with its capture time (s)
    pub fn add_observation(&mut self, obs: PupilObservation, timestamp: f64) -> FitProgress {
        let start = *self.started_at.get_or_insert(timestamp);
        self.fitter.add_observation(obs);

        let metrics = self.fitter.quality_metrics();
        let timed_out = timestamp - start >= self.timeout_secs;
        if metrics.is_ready || timed_out {
            FitProgress::Finished {
                metrics,
                timed_out: !metrics.is_ready,
            }
        } else {
            FitProgress::Collecting(metrics)
        }
    }

    /// Fit the globe from everything collected
    ///
    /// The fitted center is returned even when the radius falls outside the
    /// plausible range; check [`EyeGlobe::is_plausible`] before adopting the
    /// radius.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientData` if the rays do not converge
    pub fn finish(&mut self) -> Result<EyeGlobe> {
        let (width, height) = self.frame_size;
        let Some(globe) = self.fitter.fit_globe(width, height) else {
            let metrics = self.fitter.quality_metrics();
            warn!(
                "Globe fit failed: no convergence ({} rays, {} intersections)",
                metrics.ray_count, metrics.intersection_count
            );
            return Err(Error::InsufficientData {
                what: "globe intersections",
                needed: MIN_INTERSECTIONS,
                available: metrics.intersection_count,
            });
        };

        if !globe.is_plausible() {
            warn!(
                "Globe radius {:.1}px is implausible; keeping center ({:.0}, {:.0}) only",
                globe.radius, globe.center.0, globe.center.1
            );
        } else if globe.is_oversized() {
            warn!(
                "Globe radius {:.0}px is very large; wider eye movements may improve the fit",
                globe.radius
            );
        } else {
            info!(
                "Globe fitted at ({:.0}, {:.0}) with radius {:.0}px",
                globe.center.0, globe.center.1, globe.radius
            );
        }
        Ok(globe)
    }

    /// Discard collected data and restart the timeout
    pub fn reset(&mut self) {
        self.fitter.reset();
        self.started_at = None;
    }

    /// Underlying fitter
    #[must_use]
    pub const fn fitter(&self) -> &GlobeFitter {
        &self.fitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nine_targets_row_major() {
        let session = CalibrationSession::new(100.0, 200.0, &CalibrationConfig::default());
        let targets = session.targets();
        assert_eq!(targets.len(), 9);
        assert_eq!(targets[0], (10.0, 20.0));
        assert_eq!(targets[1], (50.0, 20.0));
        assert_eq!(targets[8], (90.0, 180.0));
    }

    #[test]
    fn test_samples_averaged_per_target() {
        let config = CalibrationConfig {
            samples_per_point: 2,
            ..CalibrationConfig::default()
        };
        let mut session = CalibrationSession::new(100.0, 100.0, &config);

        assert_eq!(
            session.add_sample((1.0, 1.0)).unwrap(),
            CaptureProgress::Collecting { target: 0, samples: 1 }
        );
        // Non-finite samples do not count
        assert_eq!(
            session.add_sample((f64::NAN, 1.0)).unwrap(),
            CaptureProgress::Collecting { target: 0, samples: 1 }
        );
        assert_eq!(
            session.add_sample((3.0, 5.0)).unwrap(),
            CaptureProgress::PointAdded {
                target: 0,
                pupil: (2.0, 3.0),
                world: (10.0, 10.0)
            }
        );
        assert_eq!(session.current_target(), Some((50.0, 10.0)));
        assert_eq!(session.model().point_count(), 1);

        session.restart();
        assert_eq!(session.model().point_count(), 0);
        assert_eq!(session.current_target(), Some((10.0, 10.0)));
    }

    #[test]
    fn test_globe_session_times_out() {
        let config = GlobeConfig {
            timeout_secs: 1.0,
            ..GlobeConfig::default()
        };
        let mut session = GlobeFitSession::new(config);
        let obs = PupilObservation::new((320.0, 240.0), (10.0, 20.0), 30.0, 0.9);

        assert!(matches!(session.add_observation(obs, 5.0), FitProgress::Collecting(_)));
        assert!(matches!(session.add_observation(obs, 5.5), FitProgress::Collecting(_)));
        assert!(matches!(
            session.add_observation(obs, 6.0),
            FitProgress::Finished { timed_out: true, .. }
        ));
        // All rays parallel: nothing converges
        assert!(matches!(session.finish(), Err(Error::InsufficientData { .. })));
    }
}
