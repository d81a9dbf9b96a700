//! Finite difference Jacobian computation.
//!
//! Device models expose residuals, not derivatives, so the Newton loop
//! differences the assembled residual vector column by column. Forward
//! differences serve the transient loop; the operating point uses central
//! differences for the extra accuracy.

use nalgebra::{DMatrix, DVector};

use crate::error::SolverResult;

/// Perturbation scale used by the solve drivers.
pub const DEFAULT_EPSILON: f64 = 1e-7;

/// Forward-difference Jacobian: column j is (f(x + dx_j) - f(x)) / dx_j
/// with dx_j = epsilon * max(|x_j|, 1).
pub fn finite_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let mut x_perturbed = x.clone();
        let dx = epsilon * x[j].abs().max(1.0);
        x_perturbed[j] += dx;

        let f_perturbed = f(&x_perturbed)?;
        let df = (f_perturbed - &f_x) / dx;

        for i in 0..m {
            jac[(i, j)] = df[i];
        }
    }

    Ok(jac)
}

/// Central-difference Jacobian, second-order accurate at twice the
/// evaluation cost.
pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let dx = epsilon * x[j].abs().max(1.0);

        let mut x_plus = x.clone();
        x_plus[j] += dx;
        let f_plus = f(&x_plus)?;

        let mut x_minus = x.clone();
        x_minus[j] -= dx;
        let f_minus = f(&x_minus)?;

        let df = (f_plus - f_minus) / (2.0 * dx);

        for i in 0..m {
            jac[(i, j)] = df[i];
        }
    }

    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_difference_on_a_conductance_row() {
        // f(v, i) = v - 1000*i, a resistive branch equation
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] - 1000.0 * x[1]))
        };

        let x = DVector::from_vec(vec![5.0, 5e-3]);
        let jac = finite_difference_jacobian(&x, f, 1e-7).unwrap();

        assert!((jac[(0, 0)] - 1.0).abs() < 1e-5);
        assert!((jac[(0, 1)] + 1000.0).abs() < 1e-2);
    }

    #[test]
    fn central_difference_on_a_coupled_pair() {
        // f0 = x0^2 + x1, f1 = x0 * x1
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0] * x[0] + x[1], x[0] * x[1]]))
        };

        let x = DVector::from_vec(vec![3.0, 2.0]);
        let jac = central_difference_jacobian(&x, f, 1e-6).unwrap();

        assert!((jac[(0, 0)] - 6.0).abs() < 1e-6);
        assert!((jac[(0, 1)] - 1.0).abs() < 1e-6);
        assert!((jac[(1, 0)] - 2.0).abs() < 1e-6);
        assert!((jac[(1, 1)] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn central_beats_forward_on_curvature() {
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0].exp()))
        };

        let x = DVector::from_element(1, 1.0);
        let exact = 1.0_f64.exp();
        let fwd = finite_difference_jacobian(&x, f, 1e-5).unwrap();
        let ctr = central_difference_jacobian(&x, f, 1e-5).unwrap();

        assert!((ctr[(0, 0)] - exact).abs() < (fwd[(0, 0)] - exact).abs());
    }
}
