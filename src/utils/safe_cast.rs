//! Safe casting utilities for grid indexing and pixel conversion

use crate::{Error, Result};

/// Safely convert usize to u32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds u32::MAX
pub fn usize_to_u32(value: usize) -> Result<u32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in u32")))
}

/// Safely convert a non-negative f64 to usize, rounding up
///
/// # Errors
///
/// Returns an error if the value is not finite, negative, or outside usize range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
#[allow(clippy::cast_sign_loss)] // Sign checked before the cast
#[allow(clippy::cast_precision_loss)] // MAX bound checking is approximate
pub fn f64_to_usize_ceil(value: f64) -> Result<usize> {
    let ceiled = value.ceil();
    if ceiled.is_finite() && ceiled >= 0.0 && ceiled <= usize::MAX as f64 {
        Ok(ceiled as usize)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to usize"
        )))
    }
}

/// Map a coordinate already scaled to cell units onto a cell index
///
/// Returns `None` for non-finite, negative, or out-of-range values.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Range checked before the cast
#[allow(clippy::cast_sign_loss)] // Sign checked before the cast
#[allow(clippy::cast_precision_loss)] // Cell counts are far below 2^52
pub fn f64_to_cell(value: f64, cells: usize) -> Option<usize> {
    if !value.is_finite() || value < 0.0 || value >= cells as f64 {
        return None;
    }
    let index = value.floor() as usize;
    (index < cells).then_some(index)
}

/// Convert a unit-range intensity to an 8-bit channel value
///
/// Values are clamped to [0, 1] and truncated like a float-to-byte array cast.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamped to [0, 255] before the cast
#[allow(clippy::cast_sign_loss)] // Clamped to non-negative before the cast
pub fn unit_to_u8(value: f32) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0) as u8
}
