//! Temporal smoothing filters for mapped gaze coordinates.
//!
//! Gaze samples arrive at irregular intervals, so filters here take an
//! explicit timestamp with every sample instead of assuming a fixed rate.

/// One-euro adaptive low-pass filter
pub mod one_euro;

pub use one_euro::{OneEuroFilter, OneEuroParams};

/// Pair of one-euro filters smoothing the x and y channels independently
#[derive(Debug, Clone)]
pub struct AxisFilters {
    x: OneEuroFilter,
    y: OneEuroFilter,
}

impl AxisFilters {
    /// Create both channel filters seeded at the first sample
    #[must_use]
    pub const fn seeded(timestamp: f64, point: (f64, f64), params: OneEuroParams) -> Self {
        Self {
            x: OneEuroFilter::new(timestamp, point.0, params),
            y: OneEuroFilter::new(timestamp, point.1, params),
        }
    }

    /// Filter one 2D sample
    pub fn apply(&mut self, timestamp: f64, point: (f64, f64)) -> (f64, f64) {
        (self.x.filter(timestamp, point.0), self.y.filter(timestamp, point.1))
    }
}
