//! Newton-based DAE solver for mixed-signal networks.
//!
//! This crate assembles a netlist plus its bound device models into a
//! square residual system (model equations followed by per-node
//! conservation rows), differentiates it by finite differences, and solves
//! it with a damped Newton iteration. The operating-point driver layers a
//! mode fixed point on top so piecewise models settle on consistent
//! segment choices before any transient starts.

pub mod dc;
pub mod error;
pub mod jacobian;
pub mod newton;
pub mod problem;

pub use dc::{DcSolution, solve_dc};
pub use error::{SolverError, SolverResult};
pub use jacobian::{DEFAULT_EPSILON, central_difference_jacobian, finite_difference_jacobian};
pub use newton::{NewtonConfig, NewtonResult, newton_solve};
pub use problem::{EvalInputs, SystemProblem};
