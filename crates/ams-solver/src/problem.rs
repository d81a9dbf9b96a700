//! Problem definition: netlist plus device models, assembled into residuals.
//!
//! Residual layout: every instance contributes one row per branch equation
//! followed by one row per free-quantity equation, instances in
//! registration order; after all model rows comes one conservation row per
//! non-reference node (sum of signed throughs). The resulting system is
//! square against the unknown layout in [`UnknownMap`].

use std::collections::HashMap;

use ams_core::{InstanceId, NodeId, celsius_to_kelvin};
use ams_models::{BranchView, DeviceModel, EvalContext, ModeVector};
use ams_net::{Domain, Instance, Netlist, UnknownKind, UnknownMap};
use nalgebra::DVector;
use rayon::prelude::*;

use crate::error::{SolverError, SolverResult};

/// Instances at or above this count evaluate in parallel; below it the
/// fork/join overhead outweighs the work.
const MIN_INSTANCES_FOR_PARALLEL: usize = 4;

/// Ambient temperature the initial guess puts on thermal nodes (kelvin).
fn ambient_kelvin() -> f64 {
    celsius_to_kelvin(20.0)
}

/// Fixed inputs for one residual assembly.
///
/// `inv_dt` is the reciprocal step size for the implicit-Euler difference
/// quotients; the operating point passes zero so every derivative vanishes.
#[derive(Clone, Copy)]
pub struct EvalInputs<'a> {
    /// Evaluation time.
    pub t: f64,
    /// Reciprocal step size; zero for the operating point.
    pub inv_dt: f64,
    /// Operating-point flag: sources report their DC value.
    pub quiescent: bool,
    /// State at the last committed step.
    pub x_prev: &'a DVector<f64>,
    /// Committed guard outcomes per instance.
    pub modes: &'a [ModeVector],
    /// Held drive samples per instance.
    pub drives: &'a [Vec<f64>],
}

/// A netlist with a model bound to each instance.
pub struct SystemProblem<'a> {
    netlist: &'a Netlist,
    unknowns: UnknownMap,
    models: HashMap<InstanceId, Box<dyn DeviceModel>>,

    /// First residual row of each instance's model equations.
    row_offsets: Vec<usize>,
    /// Row index where the conservation rows start.
    conservation_base: usize,
}

impl<'a> SystemProblem<'a> {
    pub fn new(netlist: &'a Netlist) -> Self {
        let unknowns = UnknownMap::from_netlist(netlist);
        let mut row_offsets = Vec::with_capacity(netlist.instances().len());
        let mut row = 0;
        for inst in netlist.instances() {
            row_offsets.push(row);
            row += inst.branches.len() + inst.frees.len();
        }
        Self {
            netlist,
            unknowns,
            models: HashMap::new(),
            row_offsets,
            conservation_base: row,
        }
    }

    pub fn netlist(&self) -> &Netlist {
        self.netlist
    }

    pub fn unknowns(&self) -> &UnknownMap {
        &self.unknowns
    }

    pub fn unknown_count(&self) -> usize {
        self.unknowns.unknown_count()
    }

    /// Bind the model implementing an instance's equations.
    pub fn add_model(
        &mut self,
        instance: InstanceId,
        model: Box<dyn DeviceModel>,
    ) -> SolverResult<()> {
        if instance.index() as usize >= self.netlist.instances().len() {
            return Err(SolverError::ProblemSetup {
                what: format!("instance {instance} is not in the netlist"),
            });
        }
        if self.models.contains_key(&instance) {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "instance {} already has a model",
                    self.netlist.instance_name(instance)
                ),
            });
        }
        self.models.insert(instance, model);
        Ok(())
    }

    pub fn model(&self, instance: InstanceId) -> SolverResult<&dyn DeviceModel> {
        self.models
            .get(&instance)
            .map(|m| m.as_ref())
            .ok_or_else(|| SolverError::ProblemSetup {
                what: format!(
                    "instance {} has no model",
                    self.netlist.instance_name(instance)
                ),
            })
    }

    pub fn model_mut(&mut self, instance: InstanceId) -> SolverResult<&mut dyn DeviceModel> {
        if !self.models.contains_key(&instance) {
            return Err(SolverError::ProblemSetup {
                what: format!(
                    "instance {} has no model",
                    self.netlist.instance_name(instance)
                ),
            });
        }
        Ok(self.models.get_mut(&instance).unwrap().as_mut())
    }

    /// Check every instance has a model whose shape matches the wiring.
    pub fn validate(&self) -> SolverResult<()> {
        for inst in self.netlist.instances() {
            let model = self.model(inst.id)?;

            let domains = model.branch_domains();
            if domains.len() != inst.branches.len() {
                return Err(SolverError::ProblemSetup {
                    what: format!(
                        "instance {}: model declares {} branches, netlist wires {}",
                        inst.name,
                        domains.len(),
                        inst.branches.len()
                    ),
                });
            }
            for (k, (&bid, &expected)) in inst.branches.iter().zip(domains.iter()).enumerate() {
                let wired = self.netlist.branch(bid).domain;
                if wired != expected {
                    return Err(SolverError::ProblemSetup {
                        what: format!(
                            "instance {} branch {k}: model expects {expected}, wired as {wired}",
                            inst.name
                        ),
                    });
                }
            }

            if model.free_count() != inst.frees.len() {
                return Err(SolverError::ProblemSetup {
                    what: format!(
                        "instance {}: model declares {} free quantities, netlist registers {}",
                        inst.name,
                        model.free_count(),
                        inst.frees.len()
                    ),
                });
            }

            if model.initial_drives().len() != model.drive_count() {
                return Err(SolverError::ProblemSetup {
                    what: format!(
                        "instance {}: initial drives do not cover {} slots",
                        inst.name,
                        model.drive_count()
                    ),
                });
            }
        }
        Ok(())
    }

    /// All-false mode table in the right shape. Refresh against fresh
    /// guard outcomes before the first solve.
    pub fn default_modes(&self) -> SolverResult<Vec<ModeVector>> {
        self.netlist
            .instances()
            .iter()
            .map(|inst| Ok(vec![false; self.model(inst.id)?.guard_count()]))
            .collect()
    }

    /// Per-instance drive tables at their DC values.
    pub fn initial_drives(&self) -> SolverResult<Vec<Vec<f64>>> {
        self.netlist
            .instances()
            .iter()
            .map(|inst| Ok(self.model(inst.id)?.initial_drives()))
            .collect()
    }

    /// Starting point for the operating-point solve: thermal node
    /// potentials at ambient so temperature-dependent models evaluate,
    /// everything else at zero.
    pub fn initial_guess(&self) -> DVector<f64> {
        let mut x = DVector::zeros(self.unknowns.unknown_count());
        for node in self.netlist.nodes() {
            if node.domain == Domain::Thermal {
                if let Some(u) = self.unknowns.node_unknown(node.id) {
                    x[u] = ambient_kelvin();
                }
            }
        }
        x
    }

    fn potential(&self, x: &DVector<f64>, node: NodeId) -> f64 {
        match self.unknowns.node_unknown(node) {
            Some(u) => x[u],
            None => 0.0,
        }
    }

    /// Branch views and free slices an instance's model evaluates against.
    fn instance_state(
        &self,
        inst: &Instance,
        x: &DVector<f64>,
        inputs: &EvalInputs<'_>,
    ) -> SolverResult<(Vec<BranchView>, Vec<f64>, Vec<f64>)> {
        let mut branches = Vec::with_capacity(inst.branches.len());
        for &bid in &inst.branches {
            let branch = self.netlist.branch(bid);
            let across = self.potential(x, branch.from) - self.potential(x, branch.to);
            let across_prev = self.potential(inputs.x_prev, branch.from)
                - self.potential(inputs.x_prev, branch.to);
            let tu = self.unknowns.through_unknown(bid);
            branches.push(BranchView {
                across,
                through: x[tu],
                across_dot: (across - across_prev) * inputs.inv_dt,
                through_dot: (x[tu] - inputs.x_prev[tu]) * inputs.inv_dt,
            });
        }

        let mut frees = Vec::with_capacity(inst.frees.len());
        let mut free_dots = Vec::with_capacity(inst.frees.len());
        for &q in &inst.frees {
            let u = self
                .unknowns
                .free_unknown(q)
                .ok_or_else(|| SolverError::ProblemSetup {
                    what: format!("free quantity {q} of instance {} is not indexed", inst.name),
                })?;
            frees.push(x[u]);
            free_dots.push((x[u] - inputs.x_prev[u]) * inputs.inv_dt);
        }

        Ok((branches, frees, free_dots))
    }

    /// One instance's model rows.
    fn eval_instance(
        &self,
        inst: &Instance,
        x: &DVector<f64>,
        inputs: &EvalInputs<'_>,
    ) -> SolverResult<Vec<f64>> {
        let model = self.model(inst.id)?;
        let (branches, frees, free_dots) = self.instance_state(inst, x, inputs)?;
        let idx = inst.id.index() as usize;
        let ctx = EvalContext {
            t: inputs.t,
            quiescent: inputs.quiescent,
            branches: &branches,
            frees: &frees,
            free_dots: &free_dots,
            mode: &inputs.modes[idx],
            drives: &inputs.drives[idx],
        };
        let mut rows = vec![0.0; inst.branches.len() + inst.frees.len()];
        model
            .evaluate(&ctx, &mut rows)
            .map_err(|source| SolverError::ModelEval {
                instance: inst.name.clone(),
                source,
            })?;
        Ok(rows)
    }

    /// Assemble the full residual vector at candidate state `x`.
    ///
    /// Evaluation is read-only over the shared state; the scatter into the
    /// output vector stays serial.
    pub fn assemble_residuals(
        &self,
        x: &DVector<f64>,
        inputs: &EvalInputs<'_>,
    ) -> SolverResult<DVector<f64>> {
        self.check_shapes(x, inputs)?;

        let insts = self.netlist.instances();
        let locals: Vec<SolverResult<Vec<f64>>> = if insts.len() >= MIN_INSTANCES_FOR_PARALLEL {
            insts
                .par_iter()
                .map(|inst| self.eval_instance(inst, x, inputs))
                .collect()
        } else {
            insts
                .iter()
                .map(|inst| self.eval_instance(inst, x, inputs))
                .collect()
        };

        let mut r = DVector::zeros(self.unknowns.unknown_count());
        for (inst, local) in insts.iter().zip(locals) {
            let row = self.row_offsets[inst.id.index() as usize];
            for (k, value) in local?.into_iter().enumerate() {
                r[row + k] = value;
            }
        }

        // Conservation rows: signed throughs sum to zero at every
        // non-reference node
        for node in self.netlist.nodes() {
            let Some(u) = self.unknowns.node_unknown(node.id) else {
                continue;
            };
            let mut sum = 0.0;
            for &(bid, sign) in self.netlist.node_branches(node.id) {
                sum += f64::from(sign) * x[self.unknowns.through_unknown(bid)];
            }
            r[self.conservation_base + u] = sum;
        }

        Ok(r)
    }

    /// Fresh guard outcomes of every instance at state `x`.
    ///
    /// Unlike evaluation, guards never read the committed modes, so this
    /// is safe to call with a provisional mode table.
    pub fn guards_at(
        &self,
        x: &DVector<f64>,
        inputs: &EvalInputs<'_>,
    ) -> SolverResult<Vec<ModeVector>> {
        self.check_shapes(x, inputs)?;
        self.netlist
            .instances()
            .iter()
            .map(|inst| {
                let model = self.model(inst.id)?;
                let (branches, frees, free_dots) = self.instance_state(inst, x, inputs)?;
                let idx = inst.id.index() as usize;
                let ctx = EvalContext {
                    t: inputs.t,
                    quiescent: inputs.quiescent,
                    branches: &branches,
                    frees: &frees,
                    free_dots: &free_dots,
                    mode: &inputs.modes[idx],
                    drives: &inputs.drives[idx],
                };
                let guards = model.guards(&ctx).map_err(|source| SolverError::ModelEval {
                    instance: inst.name.clone(),
                    source,
                })?;
                if guards.len() != model.guard_count() {
                    return Err(SolverError::ProblemSetup {
                        what: format!(
                            "instance {}: model reported {} guards, declares {}",
                            inst.name,
                            guards.len(),
                            model.guard_count()
                        ),
                    });
                }
                Ok(guards)
            })
            .collect()
    }

    /// Named observable outputs of every instance at state `x`, keyed
    /// `instance.observable`.
    pub fn observables_at(
        &self,
        x: &DVector<f64>,
        inputs: &EvalInputs<'_>,
    ) -> SolverResult<Vec<(String, f64)>> {
        self.check_shapes(x, inputs)?;
        let mut out = Vec::new();
        for inst in self.netlist.instances() {
            let model = self.model(inst.id)?;
            let (branches, frees, free_dots) = self.instance_state(inst, x, inputs)?;
            let idx = inst.id.index() as usize;
            let ctx = EvalContext {
                t: inputs.t,
                quiescent: inputs.quiescent,
                branches: &branches,
                frees: &frees,
                free_dots: &free_dots,
                mode: &inputs.modes[idx],
                drives: &inputs.drives[idx],
            };
            for (key, value) in model.observables(&ctx) {
                out.push((format!("{}.{}", inst.name, key), value));
            }
        }
        Ok(out)
    }

    /// Owner of the largest-magnitude residual row, for diagnostics.
    pub fn worst_residual_site(&self, r: &DVector<f64>) -> String {
        if r.is_empty() {
            return "empty system".to_string();
        }
        let mut worst = 0;
        for i in 1..r.len() {
            if r[i].abs() > r[worst].abs() {
                worst = i;
            }
        }

        if worst >= self.conservation_base {
            let u = worst - self.conservation_base;
            if let UnknownKind::NodePotential(node) = self.unknowns.kind(u) {
                return format!("conservation at node {}", self.netlist.node(node).name);
            }
            return "conservation row".to_string();
        }
        for inst in self.netlist.instances() {
            let start = self.row_offsets[inst.id.index() as usize];
            let end = start + inst.branches.len() + inst.frees.len();
            if (start..end).contains(&worst) {
                return format!("equations of instance {}", inst.name);
            }
        }
        "unmapped row".to_string()
    }

    fn check_shapes(&self, x: &DVector<f64>, inputs: &EvalInputs<'_>) -> SolverResult<()> {
        let n = self.unknowns.unknown_count();
        if x.len() != n || inputs.x_prev.len() != n {
            return Err(SolverError::ProblemSetup {
                what: format!("state length {} does not match {n} unknowns", x.len()),
            });
        }
        let count = self.netlist.instances().len();
        if inputs.modes.len() != count || inputs.drives.len() != count {
            return Err(SolverError::ProblemSetup {
                what: format!("mode/drive tables do not cover all {count} instances"),
            });
        }
        Ok(())
    }
}
