use crate::config::FilterConfig;
use crate::constants::{DEFAULT_BETA, DEFAULT_D_CUTOFF, DEFAULT_MIN_CUTOFF};
use std::f64::consts::PI;

/// Tuning parameters for [`OneEuroFilter`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneEuroParams {
    /// Cutoff frequency at rest (Hz); lower means smoother and laggier
    pub min_cutoff: f64,
    /// Speed coefficient; higher means less lag during fast motion
    pub beta: f64,
    /// Cutoff used to smooth the derivative estimate (Hz)
    pub d_cutoff: f64,
}

impl Default for OneEuroParams {
    fn default() -> Self {
        Self {
            min_cutoff: DEFAULT_MIN_CUTOFF,
            beta: DEFAULT_BETA,
            d_cutoff: DEFAULT_D_CUTOFF,
        }
    }
}

impl From<&FilterConfig> for OneEuroParams {
    fn from(config: &FilterConfig) -> Self {
        Self {
            min_cutoff: config.min_cutoff,
            beta: config.beta,
            d_cutoff: config.d_cutoff,
        }
    }
}

/// One-euro adaptive low-pass filter for a single scalar channel
///
/// The cutoff frequency rises with the smoothed speed of the signal, so slow
/// fixations are heavily smoothed while fast saccades pass with little lag.
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    params: OneEuroParams,
    t_prev: f64,
    x_prev: f64,
    dx_prev: f64,
}

impl OneEuroFilter {
    /// Create a filter seeded with a first sample
    #[must_use]
    pub const fn new(t0: f64, x0: f64, params: OneEuroParams) -> Self {
        Self {
            params,
            t_prev: t0,
            x_prev: x0,
            dx_prev: 0.0,
        }
    }

    /// Exponential smoothing coefficient for a time step and cutoff
    #[must_use]
    pub fn smoothing_factor(te: f64, cutoff: f64) -> f64 {
        let r = 2.0 * PI * cutoff * te;
        r / (r + 1.0)
    }

    fn exponential_smoothing(a: f64, x: f64, x_prev: f64) -> f64 {
        a.mul_add(x, (1.0 - a) * x_prev)
    }

    /// Filter one sample; timestamps are in seconds and must not decrease
    pub fn filter(&mut self, t: f64, x: f64) -> f64 {
        let te = t - self.t_prev;

        let a_d = Self::smoothing_factor(te, self.params.d_cutoff);
        let dx = if te > 0.0 { (x - self.x_prev) / te } else { 0.0 };
        let dx_hat = Self::exponential_smoothing(a_d, dx, self.dx_prev);

        let cutoff = self.params.beta.mul_add(dx_hat.abs(), self.params.min_cutoff);
        let a = Self::smoothing_factor(te, cutoff);
        let x_hat = Self::exponential_smoothing(a, x, self.x_prev);

        self.x_prev = x_hat;
        self.dx_prev = dx_hat;
        self.t_prev = t;

        x_hat
    }

    /// Last filtered value
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.x_prev
    }

    /// Current smoothed derivative estimate
    #[must_use]
    pub const fn derivative(&self) -> f64 {
        self.dx_prev
    }

    /// Filter parameters
    #[must_use]
    pub const fn params(&self) -> OneEuroParams {
        self.params
    }
}
