//! Pupil ellipse observations produced by an external detector.

use serde::{Deserialize, Serialize};

/// One fitted pupil ellipse in eye-camera pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PupilObservation {
    /// Ellipse center (px)
    pub center: (f64, f64),
    /// Ellipse axes (px), in either order
    pub axes: (f64, f64),
    /// Major-axis orientation in degrees, nominally [0, 180)
    pub angle: f64,
    /// Detector confidence in [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

const fn default_confidence() -> f64 {
    1.0
}

impl PupilObservation {
    /// Create a new observation
    #[must_use]
    pub const fn new(center: (f64, f64), axes: (f64, f64), angle: f64, confidence: f64) -> Self {
        Self {
            center,
            axes,
            angle,
            confidence,
        }
    }

    /// Shorter of the two axes
    #[must_use]
    pub fn minor_axis(&self) -> f64 {
        self.axes.0.min(self.axes.1)
    }

    /// Longer of the two axes
    #[must_use]
    pub fn major_axis(&self) -> f64 {
        self.axes.0.max(self.axes.1)
    }

    /// Minor/major axis ratio; 1.0 is a circle, `None` for a zero major axis
    #[must_use]
    pub fn axis_ratio(&self) -> Option<f64> {
        let major = self.major_axis();
        (major > 0.0).then(|| self.minor_axis() / major)
    }

    /// Orientation of the projected gaze axis (minor axis) in degrees
    #[must_use]
    pub fn gaze_axis_angle(&self) -> f64 {
        self.angle + 90.0
    }
}
