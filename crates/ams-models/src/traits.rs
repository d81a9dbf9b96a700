//! Core trait for branch models.

use ams_core::Real;
use ams_net::Domain;

use crate::error::{ModelError, ModelResult};

/// Per-instance mode: the ordered tuple of committed guard outcomes.
///
/// Only the breakpoint detector rewrites this, and only at committed step
/// boundaries.
pub type ModeVector = Vec<bool>;

/// Consistent values for one branch at the evaluation point.
#[derive(Clone, Copy, Debug)]
pub struct BranchView {
    pub across: Real,
    pub through: Real,
    pub across_dot: Real,
    pub through_dot: Real,
}

/// Everything a model may read during one residual evaluation.
///
/// Branch views appear in the instance's branch registration order. All
/// fields are borrowed snapshots; evaluation cannot observe partial updates.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    /// Simulation time of the evaluation point.
    pub t: Real,
    /// True during the operating-point solve: derivatives are zero and
    /// sources sit at their DC values.
    pub quiescent: bool,
    pub branches: &'a [BranchView],
    /// Free (internal) quantity values, in registration order.
    pub frees: &'a [Real],
    pub free_dots: &'a [Real],
    /// Committed guard outcomes; empty for guard-free models.
    pub mode: &'a [bool],
    /// Scheduler-held drive samples for this instance.
    pub drives: &'a [Real],
}

impl<'a> EvalContext<'a> {
    pub fn branch(&self, i: usize) -> ModelResult<&BranchView> {
        self.branches.get(i).ok_or(ModelError::ContextMismatch {
            what: "missing branch view",
        })
    }

    pub fn mode_bit(&self, i: usize) -> ModelResult<bool> {
        self.mode.get(i).copied().ok_or(ModelError::ContextMismatch {
            what: "missing mode bit",
        })
    }

    pub fn drive(&self, i: usize) -> ModelResult<Real> {
        self.drives.get(i).copied().ok_or(ModelError::ContextMismatch {
            what: "missing drive sample",
        })
    }
}

/// Trait for branch models.
///
/// Models are deterministic functions of the evaluation context: the same
/// context yields bitwise-identical residuals. Parameters are bound at
/// construction and immutable afterwards; the only mutation path is
/// `apply_drive_event`, which the engine calls between committed steps.
pub trait DeviceModel: std::fmt::Debug + Send + Sync {
    /// Instance name for diagnostics.
    fn name(&self) -> &str;

    /// Domains of the model's branches, in registration order. The problem
    /// layer checks the wiring against this.
    fn branch_domains(&self) -> Vec<Domain>;

    /// Number of branches (one residual each).
    fn branch_count(&self) -> usize {
        self.branch_domains().len()
    }

    /// Number of free (internal) quantities (one residual each).
    fn free_count(&self) -> usize {
        0
    }

    /// Fill `residuals` (length `branch_count() + free_count()`): branch
    /// equations first, then free-quantity equations. A converged solution
    /// drives every entry to zero.
    fn evaluate(&self, ctx: &EvalContext<'_>, residuals: &mut [Real]) -> ModelResult<()>;

    /// Number of guard predicates.
    fn guard_count(&self) -> usize {
        0
    }

    /// Fresh guard outcomes at the context state. The committed outcomes
    /// live in `ctx.mode`; this recomputes them for crossing detection.
    fn guards(&self, _ctx: &EvalContext<'_>) -> ModelResult<Vec<bool>> {
        Ok(Vec::new())
    }

    /// For-information outputs sampled at committed steps.
    fn observables(&self, _ctx: &EvalContext<'_>) -> Vec<(&'static str, Real)> {
        Vec::new()
    }

    /// Number of scheduler-held drive slots.
    fn drive_count(&self) -> usize {
        0
    }

    /// Initial drive values (quiescent).
    fn initial_drives(&self) -> Vec<Real> {
        Vec::new()
    }

    /// Next event time for a drive slot strictly after `after` (which may
    /// be `-inf` to ask for the first). The engine lands a step exactly
    /// there.
    fn next_drive_event(&self, _slot: usize, _after: Real) -> Option<Real> {
        None
    }

    /// Advance source state at a due event. Returns the new held value if
    /// the drive changes (noise resample), None for a pure forced-step
    /// corner.
    fn apply_drive_event(&mut self, _slot: usize, _t: Real) -> Option<Real> {
        None
    }
}
