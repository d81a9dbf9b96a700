use crate::AmsError;

/// Floating point type used throughout the engine.
pub type Real = f64;

/// One tolerance pair for everything.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, AmsError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(AmsError::NonFinite { what, value: v })
    }
}

/// Linear interpolation between `a` (at u = 0) and `b` (at u = 1).
#[inline]
pub fn lerp(a: Real, b: Real, u: Real) -> Real {
    a + (b - a) * u
}
