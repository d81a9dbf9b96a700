//! Damped Newton iteration with a backtracking line search.

use nalgebra::DVector;

use crate::error::{SolverError, SolverResult};

/// Newton solver configuration.
#[derive(Clone, Debug)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: f64,
    /// Relative tolerance for residual norm
    pub rel_tol: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-6,
            rel_tol: 1e-6,
            line_search_beta: 0.5,
            max_line_search_iters: 20,
        }
    }
}

/// Newton iteration result.
#[derive(Clone, Debug)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<f64>,
    /// Final residual norm
    pub residual_norm: f64,
    /// Number of iterations
    pub iterations: usize,
    /// Converged flag
    pub converged: bool,
}

/// Newton solver with a backtracking line search.
///
/// A trial point whose residual fails to evaluate (a model rejecting a
/// non-physical excursion) or comes back non-finite counts as an invalid
/// candidate and the step is shortened, so the iteration stays inside the
/// region the models accept. The starting point itself must evaluate.
pub fn newton_solve<F, J>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: Fn(&DVector<f64>) -> SolverResult<nalgebra::DMatrix<f64>>,
{
    let mut x = x0;
    let mut r = residual_fn(&x)?;
    let mut r_norm = r.norm();
    let r0_norm = r_norm;

    for iter in 0..config.max_iterations {
        // Check convergence
        if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                converged: true,
            });
        }

        // Compute Jacobian
        let jac = jacobian_fn(&x)?;

        // Solve J * dx = -r
        let dx = jac
            .lu()
            .solve(&(-r.clone()))
            .ok_or_else(|| SolverError::Numeric {
                what: "Jacobian solve failed".to_string(),
            })?;

        // Line search: accept the first reduction, keep the last valid
        // point otherwise
        let mut alpha = 1.0;
        let mut candidate: Option<(DVector<f64>, DVector<f64>, f64)> = None;
        for _ in 0..config.max_line_search_iters {
            let x_try = &x + alpha * &dx;
            if let Ok(r_try) = residual_fn(&x_try) {
                let try_norm = r_try.norm();
                if try_norm.is_finite() {
                    let improved = try_norm < r_norm;
                    candidate = Some((x_try, r_try, try_norm));
                    if improved {
                        break;
                    }
                }
            }

            // Backtrack
            alpha *= config.line_search_beta;
        }

        let Some((x_new, r_new, r_new_norm)) = candidate else {
            return Err(SolverError::Nonconvergence {
                what: format!("line search found no valid point at iteration {iter}"),
            });
        };

        // Update solution
        x = x_new;
        r = r_new;
        r_norm = r_new_norm;

        // Check for stagnation
        if alpha < 1e-10 {
            return Err(SolverError::Nonconvergence {
                what: format!("line search stagnated at iteration {iter}"),
            });
        }
    }

    Err(SolverError::Nonconvergence {
        what: format!(
            "maximum iterations {} reached, residual = {}",
            config.max_iterations, r_norm
        ),
    })
}
