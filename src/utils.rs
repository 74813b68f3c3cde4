//! Numeric helpers shared by the estimation components.

/// Checked conversions between floats, indices and pixel values
pub mod safe_cast;

/// Medians and MAD-based outlier rejection
pub mod stats;

/// Separable Gaussian smoothing for heatmap grids
pub mod smoothing;

/// Euclidean distance between two points
#[must_use]
pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Component-wise mean of a point set, `None` when empty
#[must_use]
#[allow(clippy::cast_precision_loss)] // Sample counts are small
pub fn mean_point(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    Some((sx / n, sy / n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        assert!((distance((0.0, 0.0), (3.0, 4.0)) - 5.0).abs() < 1e-12);
        assert_eq!(distance((1.0, 1.0), (1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_mean_point() {
        let points = [(0.0, 0.0), (2.0, 4.0), (4.0, 8.0)];
        assert_eq!(mean_point(&points), Some((2.0, 4.0)));
        assert_eq!(mean_point(&[]), None);
    }
}
