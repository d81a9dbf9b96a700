//! Common utilities for model calculations.

use ams_core::numeric::ensure_finite;

use crate::error::{ModelError, ModelResult};

/// Irradiance below this is treated as dark.
pub const EPSILON_IRRADIANCE: f64 = 1e-6;

/// Ensure a value is finite, returning ModelError if not.
pub fn check_finite(value: f64, what: &'static str) -> ModelResult<()> {
    ensure_finite(value, what).map_err(|_| ModelError::NonPhysical { what })?;
    Ok(())
}

/// Cubic Hermite blend coefficients.
///
/// For a span from `(0, y0)` with slope `m0` to `(h, y1)` with slope `m1`,
/// returns `(a, b)` such that `y(dx) = y0 + m0*dx + a*dx^2 + b*dx^3`
/// matches both endpoint values and derivatives.
pub fn hermite_coeffs(h: f64, y0: f64, m0: f64, y1: f64, m1: f64) -> (f64, f64) {
    let d = y1 - y0;
    let a = (3.0 * d - (2.0 * m0 + m1) * h) / (h * h);
    let b = ((m0 + m1) * h - 2.0 * d) / (h * h * h);
    (a, b)
}

/// Sufficient monotonicity condition for a Hermite span: both endpoint
/// slopes lie in `[0, 3]` times the secant slope.
pub fn hermite_is_monotone(h: f64, y0: f64, m0: f64, y1: f64, m1: f64) -> bool {
    let delta = (y1 - y0) / h;
    if delta == 0.0 {
        return m0 == 0.0 && m1 == 0.0;
    }
    let a = m0 / delta;
    let b = m1 / delta;
    (0.0..=3.0).contains(&a) && (0.0..=3.0).contains(&b)
}

/// Evaluate a Hermite span at offset `dx` from its start.
#[inline]
pub fn hermite_eval(y0: f64, m0: f64, a: f64, b: f64, dx: f64) -> f64 {
    y0 + m0 * dx + a * dx * dx + b * dx * dx * dx
}
