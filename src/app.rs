//! Replay application: runs recorded pupil data through the estimation core.
//!
//! Recordings are JSON lines, one sample per line, so they can be produced by
//! any detector front-end and replayed deterministically.

use crate::{
    calibration::CalibrationModel,
    config::Config,
    gaze_mapping::GazeMapper,
    globe_fitting::{EyeGlobe, QualityMetrics},
    heatmap::HeatmapAccumulator,
    observation::PupilObservation,
    session::{FitProgress, GlobeFitSession},
    Error, Result,
};
use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};

/// One recorded pupil ellipse with its capture time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Capture time (s)
    pub t: f64,
    /// Detected ellipse
    #[serde(flatten)]
    pub observation: PupilObservation,
}

/// One recorded pupil position, `null` when detection failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PupilSample {
    /// Capture time (s)
    pub t: f64,
    /// Pupil center (px)
    pub pupil: Option<(f64, f64)>,
}

/// Calibration pair as read from a pairs file
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationPair {
    /// Pupil position (px)
    pub pupil: (f64, f64),
    /// Target position (world units)
    pub world: (f64, f64),
}

/// Mapped output for one sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MappedSample {
    /// Capture time (s)
    pub t: f64,
    /// Smoothed scene position
    pub scene: Option<(f64, f64)>,
    /// Physical canvas position (mm)
    pub canvas: Option<(f64, f64)>,
}

/// Result of a globe auto-fit replay
#[derive(Debug, Clone, Copy)]
pub struct GlobeFitReport {
    /// Metrics when collection stopped
    pub metrics: QualityMetrics,
    /// Whether the timeout ended collection
    pub timed_out: bool,
    /// Fitted globe, if the rays converged; the radius may be implausible
    pub globe: Option<EyeGlobe>,
}

/// Heatmap overlay output settings
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// Output PNG path
    pub path: String,
    /// Output width (px); height follows the canvas aspect ratio
    pub width: u32,
}

/// Replay application bound to a configuration
#[derive(Debug, Clone, Default)]
pub struct ReplayApp {
    config: Config,
}

impl ReplayApp {
    /// Create the application, validating the configuration
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the configuration is invalid
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Replay pupil ellipses through a globe auto-fit
    ///
    /// # Errors
    ///
    /// Returns an error if the recording cannot be read
    pub fn fit_globe<P: AsRef<Path>>(&self, input: P, width: f64, height: f64) -> Result<GlobeFitReport> {
        let records: Vec<ObservationRecord> = read_json_lines(input)?;
        info!("Replaying {} observations", records.len());

        let mut globe_config = self.config.globe.clone();
        globe_config.frame_width = width;
        globe_config.frame_height = height;
        let mut session = GlobeFitSession::new(globe_config);

        let mut progress = None;
        for record in &records {
            match session.add_observation(record.observation, record.t) {
                FitProgress::Collecting(metrics) => progress = Some((metrics, false)),
                FitProgress::Finished { metrics, timed_out } => {
                    progress = Some((metrics, timed_out));
                    break;
                }
            }
        }

        let (metrics, timed_out) = progress.unwrap_or((session.fitter().quality_metrics(), false));
        let globe = match session.finish() {
            Ok(globe) => Some(globe),
            Err(e) => {
                warn!("No globe fitted: {}", e);
                None
            }
        };

        Ok(GlobeFitReport {
            metrics,
            timed_out,
            globe,
        })
    }

    /// Fit a calibration from a JSON array of pairs and save it
    ///
    /// # Errors
    ///
    /// Returns an error if the pairs cannot be read, the fit fails, or the
    /// result cannot be written
    pub fn calibrate<P: AsRef<Path>, Q: AsRef<Path>>(&self, pairs: P, output: Q) -> Result<f64> {
        let content = std::fs::read_to_string(pairs)?;
        let pairs: Vec<CalibrationPair> = serde_json::from_str(&content)?;

        let mut model = CalibrationModel::with_config(&self.config.calibration);
        for pair in &pairs {
            model.add_point(pair.pupil, pair.world);
        }
        let rmse = model.compute_model()?;
        model.save(output)?;
        Ok(rmse)
    }

    /// Map recorded pupil samples to scene and canvas space
    ///
    /// Mapped samples are written as JSON lines to `out`. With an overlay
    /// requested, canvas points are accumulated and rendered to a PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if the calibration or recording cannot be read, or
    /// output cannot be written
    pub fn map<P: AsRef<Path>, Q: AsRef<Path>, W: Write>(
        &self,
        calibration: P,
        input: Q,
        overlay: Option<&OverlayOptions>,
        out: &mut W,
    ) -> Result<usize> {
        let mut model = CalibrationModel::with_config(&self.config.calibration);
        model.load(calibration)?;

        let samples: Vec<PupilSample> = read_json_lines(input)?;
        let mut mapper = GazeMapper::from_config(&model, &self.config);
        let mut heatmap = HeatmapAccumulator::from_config(
            self.config.roi.physical_width_mm,
            self.config.roi.physical_height_mm,
            &self.config.heatmap,
        )?;

        let mut mapped = 0usize;
        for sample in &samples {
            let scene = mapper.map_to_scene(sample.pupil, sample.t);
            let canvas = mapper.map_scene_to_canvas(scene);
            if let Some((x, y)) = canvas {
                heatmap.add_point(x, y);
                mapped += 1;
            }

            let line = serde_json::to_string(&MappedSample {
                t: sample.t,
                scene,
                canvas,
            })?;
            writeln!(out, "{line}")?;
        }
        info!("Mapped {}/{} samples", mapped, samples.len());

        if let Some(options) = overlay {
            let height = overlay_height(
                options.width,
                self.config.roi.physical_width_mm,
                self.config.roi.physical_height_mm,
            )?;
            heatmap.save_png(
                &options.path,
                options.width,
                height,
                self.config.heatmap.overlay_alpha,
                self.config.heatmap.blur_size,
            )?;
        }

        Ok(mapped)
    }
}

#[allow(clippy::cast_possible_truncation)] // Bounded by the check below
#[allow(clippy::cast_sign_loss)] // Aspect ratio is positive
fn overlay_height(width: u32, physical_width: f64, physical_height: f64) -> Result<u32> {
    let height = (f64::from(width) * physical_height / physical_width).round();
    if height.is_finite() && height >= 1.0 && height <= f64::from(u32::MAX) {
        Ok(height as u32)
    } else {
        Err(Error::InvalidInput(format!("Invalid overlay height {height}")))
    }
}

/// Read a JSON-lines file, skipping blank and malformed lines
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read
pub fn read_json_lines<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => debug!("Skipping line {}: {}", index + 1, e),
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observation_record_flattened() {
        let json = r#"{"t":0.5,"center":[1.0,2.0],"axes":[10.0,20.0],"angle":15.0,"confidence":0.9}"#;
        let record: ObservationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.t, 0.5);
        assert_eq!(record.observation.center, (1.0, 2.0));
        assert_eq!(record.observation.angle, 15.0);
    }

    #[test]
    fn test_pupil_sample_null() {
        let sample: PupilSample = serde_json::from_str(r#"{"t":1.0,"pupil":null}"#).unwrap();
        assert!(sample.pupil.is_none());
    }

    #[test]
    fn test_overlay_height_follows_aspect() {
        assert_eq!(overlay_height(420, 420.0, 297.0).unwrap(), 297);
        assert!(overlay_height(0, 420.0, 297.0).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.filter.min_cutoff = 0.0;
        assert!(ReplayApp::new(config).is_err());
    }
}
