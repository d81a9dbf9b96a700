//! Operating-point (quiescent) solve.
//!
//! All derivatives are pinned to zero and sources report their DC values.
//! Piecewise models make this a small fixed-point problem on top of
//! Newton: solve under the committed segment choices, recompute the guard
//! outcomes at the solution, and repeat until the choices stop changing.

use ams_models::ModeVector;
use nalgebra::DVector;
use tracing::{debug, warn};

use crate::error::SolverResult;
use crate::jacobian::{DEFAULT_EPSILON, central_difference_jacobian};
use crate::newton::{NewtonConfig, newton_solve};
use crate::problem::{EvalInputs, SystemProblem};

/// Guard-refresh passes before the operating point is accepted as-is.
const MAX_MODE_PASSES: usize = 8;

/// Converged operating point.
#[derive(Clone, Debug)]
pub struct DcSolution {
    /// State vector at the operating point.
    pub x: DVector<f64>,
    /// Guard outcomes committed at the operating point.
    pub modes: Vec<ModeVector>,
    /// Residual norm of the final solve.
    pub residual_norm: f64,
    /// Newton iterations summed over all refresh passes.
    pub iterations: usize,
}

/// Solve for the operating point.
///
/// An unsettled segment selection after [`MAX_MODE_PASSES`] is accepted
/// with a warning rather than failing the run; a chattering guard at the
/// operating point usually means the bias sits exactly on a breakpoint.
pub fn solve_dc(problem: &SystemProblem<'_>, config: &NewtonConfig) -> SolverResult<DcSolution> {
    problem.validate()?;

    let drives = problem.initial_drives()?;
    let x0 = problem.initial_guess();
    let mut x = x0.clone();

    // Guards never read the committed modes, so a provisional all-false
    // table seeds the first refresh
    let mut modes = problem.default_modes()?;
    {
        let inputs = quiescent_inputs(&x0, &modes, &drives);
        modes = problem.guards_at(&x, &inputs)?;
    }

    let mut iterations = 0;
    let mut residual_norm = f64::INFINITY;
    for pass in 0..MAX_MODE_PASSES {
        let inputs = quiescent_inputs(&x0, &modes, &drives);
        let residual_fn = |xc: &DVector<f64>| problem.assemble_residuals(xc, &inputs);
        let jacobian_fn =
            |xc: &DVector<f64>| central_difference_jacobian(xc, &residual_fn, DEFAULT_EPSILON);

        let result = newton_solve(x.clone(), &residual_fn, &jacobian_fn, config)?;
        iterations += result.iterations;
        residual_norm = result.residual_norm;
        x = result.x;

        let fresh = problem.guards_at(&x, &inputs)?;
        if fresh == modes {
            return Ok(DcSolution {
                x,
                modes,
                residual_norm,
                iterations,
            });
        }
        debug!(pass, "guard outcomes changed at the operating point, re-solving");
        modes = fresh;
    }

    warn!(
        passes = MAX_MODE_PASSES,
        "operating-point segment selection did not settle, keeping the last solve"
    );
    Ok(DcSolution {
        x,
        modes,
        residual_norm,
        iterations,
    })
}

fn quiescent_inputs<'a>(
    x_prev: &'a DVector<f64>,
    modes: &'a [ModeVector],
    drives: &'a [Vec<f64>],
) -> EvalInputs<'a> {
    EvalInputs {
        t: 0.0,
        inv_dt: 0.0,
        quiescent: true,
        x_prev,
        modes,
        drives,
    }
}
