//! Robust statistics over point clouds: medians and MAD outlier rejection.

use crate::constants::{MAD_FLOOR, MIN_MAD_SURVIVORS};

/// Median of a slice, averaging the two middle values for even lengths
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median absolute deviation around a given center, floored at [`MAD_FLOOR`]
#[must_use]
pub fn mad(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|&v| (v - center).abs()).collect();
    match median(&deviations) {
        Some(m) if m > 0.0 => m,
        _ => MAD_FLOOR,
    }
}

/// Per-axis median of a point set
#[must_use]
pub fn median_point(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    Some((median(&xs)?, median(&ys)?))
}

/// Keep points within `threshold` MADs of the median on both axes
///
/// Sets smaller than four points are returned as-is. If fewer than
/// [`MIN_MAD_SURVIVORS`] points survive, the unfiltered set is returned.
#[must_use]
pub fn mad_filter(points: &[(f64, f64)], threshold: f64) -> Vec<(f64, f64)> {
    if points.len() < 4 {
        return points.to_vec();
    }

    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();

    // Non-empty here, so both medians exist
    let (Some(median_x), Some(median_y)) = (median(&xs), median(&ys)) else {
        return points.to_vec();
    };
    let mad_x = mad(&xs, median_x);
    let mad_y = mad(&ys, median_y);

    let filtered: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|&(x, y)| {
            (x - median_x).abs() / mad_x <= threshold && (y - median_y).abs() / mad_y <= threshold
        })
        .collect();

    if filtered.len() >= MIN_MAD_SURVIVORS {
        filtered
    } else {
        points.to_vec()
    }
}
