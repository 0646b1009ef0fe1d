//! Pointwise remapping of noise fields.

use crate::error::{Result, TerrainError};
use crate::field::Field;

/// Exposure sharpness used for the island's cloud layers
pub const DEFAULT_CLOUD_SHARPNESS: f32 = 4.0;

/// Linearly rescale a field so its minimum maps to `min` and maximum to `max`
///
/// A flat field has no range to stretch and becomes constant `min`.
pub fn normalize<F: Field + ?Sized>(field: &mut F, min: f32, max: f32) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(TerrainError::invalid(format!(
            "normalize bounds must be finite, got [{min}, {max}]"
        )));
    }
    let (lo, hi) = field.range();
    if !lo.is_finite() || !hi.is_finite() {
        return Err(TerrainError::invalid("field contains non-finite samples"));
    }

    if hi <= lo {
        field.values_mut().fill(min);
        return Ok(());
    }
    // f64 keeps wide spans finite; dividing first puts the extremes exactly on min and max
    let (lo, span) = (lo as f64, hi as f64 - lo as f64);
    let (min, range) = (min as f64, max as f64 - min as f64);
    for v in field.values_mut() {
        *v = (min + (*v as f64 - lo) / span * range) as f32;
    }
    Ok(())
}

/// The cloud exposure curve: `(e^(k*v) - 1) / (e^k - 1)`
///
/// Strictly increasing on [0, 1] with f(0) = 0 and f(1) = 1. Inputs are
/// clamped to [0, 1] first.
pub fn exp_curve(v: f32, sharpness: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    ((sharpness * v).exp_m1() / sharpness.exp_m1()).clamp(0.0, 1.0)
}

/// Push low densities towards clear sky and keep dense cloud bright
///
/// Expects a field already normalised to [0, 1]. This is a one-shot remap:
/// applying it twice compounds the contrast.
pub fn apply_exp_curve<F: Field + ?Sized>(field: &mut F, sharpness: f32) -> Result<()> {
    if !(sharpness.is_finite() && sharpness > 0.0) {
        return Err(TerrainError::invalid(format!(
            "curve sharpness must be positive, got {sharpness}"
        )));
    }
    for v in field.values_mut() {
        *v = exp_curve(*v, sharpness);
    }
    Ok(())
}
