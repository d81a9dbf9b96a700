//! Transient runner and result recording.
//!
//! Each step poses the implicit-Euler system at the step end and hands it
//! to the Newton solver. Steps land exactly on scheduled source corners
//! and on `t_end`; rejected solves shrink the step and retry; a fresh
//! guard outcome disagreeing with its committed value bisects the step
//! until the crossing is pinned inside `crossing_tol`, then commits there
//! and flips exactly that bit.

use ams_models::ModeVector;
use ams_solver::{
    DEFAULT_EPSILON, DcSolution, EvalInputs, NewtonConfig, SolverError, SolverResult,
    SystemProblem, finite_difference_jacobian, newton_solve,
};
use ams_net::{Netlist, StateVector, UnknownMap};
use ams_sources::EventSchedule;
use nalgebra::DVector;
use tracing::debug;

use crate::breakpoint::ModeTracker;
use crate::error::{SimError, SimResult};

/// Options for transient runs.
#[derive(Clone, Debug)]
pub struct TransientOptions {
    /// Nominal time step (seconds)
    pub dt: f64,
    /// Smallest step cutback may reach (seconds)
    pub dt_min: f64,
    /// Final simulation time (seconds)
    pub t_end: f64,
    /// Step width below which a located crossing commits (seconds)
    pub crossing_tol: f64,
    /// Rejected solves tolerated per step before the run fails
    pub max_retries: usize,
    /// Step shrink factor on a rejected solve
    pub cutback_factor: f64,
    /// Step growth factor after a committed step
    pub grow_factor: f64,
    /// Record every N-th step (decimation)
    pub record_every: usize,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Settings for the per-step Newton solves
    pub newton: NewtonConfig,
}

impl Default for TransientOptions {
    fn default() -> Self {
        Self {
            dt: 1e-3,
            dt_min: 1e-12,
            t_end: 1.0,
            crossing_tol: 1e-9,
            max_retries: 8,
            cutback_factor: 0.5,
            grow_factor: 1.5,
            record_every: 1,
            max_steps: 1_000_000,
            newton: NewtonConfig::default(),
        }
    }
}

impl TransientOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !self.dt_min.is_finite() || self.dt_min <= 0.0 || self.dt_min > self.dt {
            return Err(SimError::InvalidArg {
                what: "dt_min must be positive and no larger than dt",
            });
        }
        if !self.t_end.is_finite() || self.t_end < 0.0 {
            return Err(SimError::InvalidArg {
                what: "t_end must be non-negative",
            });
        }
        if !self.crossing_tol.is_finite() || self.crossing_tol <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "crossing_tol must be positive",
            });
        }
        if !self.cutback_factor.is_finite()
            || self.cutback_factor <= 0.0
            || self.cutback_factor >= 1.0
        {
            return Err(SimError::InvalidArg {
                what: "cutback_factor must lie in (0, 1)",
            });
        }
        if !self.grow_factor.is_finite() || self.grow_factor < 1.0 {
            return Err(SimError::InvalidArg {
                what: "grow_factor must be at least 1",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        Ok(())
    }
}

/// One committed guard crossing.
#[derive(Clone, Debug)]
pub struct CrossingRecord {
    /// Commit time of the crossing step (seconds)
    pub t: f64,
    /// Name of the owning instance
    pub instance: String,
    /// Guard index within the instance
    pub guard: usize,
}

/// Record of a transient run.
#[derive(Clone, Debug)]
pub struct TranRecord {
    /// Committed times of the recorded points (seconds)
    pub t: Vec<f64>,
    /// State snapshots at the recorded points
    pub states: Vec<DVector<f64>>,
    /// Observable samples per recorded point, keyed `instance.name`
    pub observables: Vec<Vec<(String, f64)>>,
    /// Located crossings, in commit order
    pub crossings: Vec<CrossingRecord>,
    /// Committed steps taken
    pub steps: usize,
    /// Newton iterations summed over all solves
    pub newton_iterations: usize,
    /// Guard bits flipped
    pub mode_flips: usize,
    /// True when the progress callback stopped the run early
    pub aborted: bool,
}

impl TranRecord {
    /// Time series of one observable, keyed `instance.name`. None when
    /// any recorded point lacks the key.
    pub fn observable_series(&self, key: &str) -> Option<Vec<(f64, f64)>> {
        let mut series = Vec::with_capacity(self.t.len());
        for (t, samples) in self.t.iter().zip(&self.observables) {
            let (_, value) = samples.iter().find(|(k, _)| k == key)?;
            series.push((*t, *value));
        }
        Some(series)
    }

    /// Quantity view of recorded point `index`, readable by id.
    ///
    /// Derivatives come from the difference quotient against the previous
    /// recorded point; the first point reports them as zero.
    pub fn quantities_at(
        &self,
        index: usize,
        net: &Netlist,
        map: &UnknownMap,
    ) -> Option<StateVector> {
        let x = self.states.get(index)?;
        let mut sv = StateVector::new(net);
        if index == 0 {
            sv.scatter_solution(net, map, x.as_slice(), x.as_slice(), 0.0);
        } else {
            let inv_dt = 1.0 / (self.t[index] - self.t[index - 1]);
            sv.scatter_solution(
                net,
                map,
                x.as_slice(),
                self.states[index - 1].as_slice(),
                inv_dt,
            );
        }
        Some(sv)
    }
}

/// Progress stream emitted while a run advances. The callback's return
/// value is a keep-going flag.
#[derive(Clone, Debug)]
pub enum SimProgressEvent {
    /// A step committed at `t`.
    StepCommitted {
        t: f64,
        dt: f64,
        newton_iterations: usize,
    },
    /// A rejected solve shrank the pending step to `dt`.
    StepCutBack { t: f64, dt: f64 },
    /// A located crossing flipped one guard bit at `t`.
    ModeFlip {
        t: f64,
        instance: String,
        guard: usize,
    },
}

/// Run a transient analysis from a solved operating point.
pub fn run_transient(
    problem: &mut SystemProblem<'_>,
    dc: &DcSolution,
    opts: &TransientOptions,
) -> SimResult<TranRecord> {
    run_transient_with_progress(problem, dc, opts, |_| true)
}

/// Run a transient analysis, streaming progress events.
///
/// Returning false from `on_step` stops the run between committed steps;
/// the record up to the last commit comes back with `aborted` set. A
/// candidate step in flight when the callback declines is discarded, never
/// exposed.
pub fn run_transient_with_progress(
    problem: &mut SystemProblem<'_>,
    dc: &DcSolution,
    opts: &TransientOptions,
    mut on_step: impl FnMut(&SimProgressEvent) -> bool,
) -> SimResult<TranRecord> {
    opts.validate()?;
    problem.validate()?;

    let mut modes = ModeTracker::new(dc.modes.clone());
    let mut drives = problem.initial_drives()?;
    let mut x = dc.x.clone();
    let mut t = 0.0;

    // Arm the first event of every drive slot
    let mut schedule = EventSchedule::new();
    for inst in problem.netlist().instances() {
        let model = problem.model(inst.id)?;
        for slot in 0..model.drive_count() {
            if let Some(first) = model.next_drive_event(slot, f64::NEG_INFINITY) {
                schedule.schedule(first, inst.id, slot);
            }
        }
    }
    // Sources firing at the origin (a noise generator's first sample, a
    // corner at zero) apply before the first step
    apply_due_events(problem, &mut schedule, &mut drives, t)?;

    let mut record = TranRecord {
        t: Vec::new(),
        states: Vec::new(),
        observables: Vec::new(),
        crossings: Vec::new(),
        steps: 0,
        newton_iterations: 0,
        mode_flips: 0,
        aborted: false,
    };

    {
        let inputs = EvalInputs {
            t,
            inv_dt: 0.0,
            quiescent: false,
            x_prev: &x,
            modes: modes.committed(),
            drives: &drives,
        };
        record.t.push(t);
        record.states.push(x.clone());
        record.observables.push(problem.observables_at(&x, &inputs)?);
    }

    let mut dt = opts.dt;
    let mut step: usize = 0;
    let mut skipped_last: Option<(f64, DVector<f64>, Vec<(String, f64)>)> = None;

    'outer: while t < opts.t_end && step < opts.max_steps {
        // Plan the step: nominal size, clamped so it lands exactly on
        // t_end or the next scheduled event
        let mut dt_step = dt;
        let mut land: Option<f64> = None;
        if t + dt_step >= opts.t_end {
            dt_step = opts.t_end - t;
            land = Some(opts.t_end);
        }
        if let Some(ev) = schedule.next_time() {
            if ev > t && ev <= t + dt_step {
                dt_step = ev - t;
                land = Some(ev);
            }
        }

        let mut retries: usize = 0;
        let mut shrunk = false;

        let (candidate, crossing) = 'attempt: loop {
            let t_next = land.unwrap_or(t + dt_step);
            match attempt_step(
                problem,
                &x,
                modes.committed(),
                &drives,
                t_next,
                1.0 / dt_step,
                &opts.newton,
            ) {
                Ok(c) => {
                    record.newton_iterations += c.iterations;
                    match modes.first_crossing(&c.fresh) {
                        Some(_) if dt_step > opts.crossing_tol => {
                            // A guard flips inside the step: bisect toward
                            // the earliest crossing
                            dt_step *= 0.5;
                            land = None;
                            shrunk = true;
                            continue 'attempt;
                        }
                        maybe => break 'attempt (c, maybe),
                    }
                }
                Err(e) if e.is_retryable() => {
                    retries += 1;
                    let smaller = dt_step * opts.cutback_factor;
                    if retries > opts.max_retries || smaller < opts.dt_min {
                        return Err(SimError::StepFloorExceeded {
                            time: t,
                            instance: floor_site(
                                problem,
                                &e,
                                &x,
                                modes.committed(),
                                &drives,
                                t_next,
                                1.0 / dt_step,
                            ),
                        });
                    }
                    debug!(t, dt = smaller, "step rejected, cutting back");
                    dt_step = smaller;
                    land = None;
                    shrunk = true;
                    if !on_step(&SimProgressEvent::StepCutBack { t, dt: dt_step }) {
                        record.aborted = true;
                        break 'outer;
                    }
                    continue 'attempt;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let landed = land.is_some();
        t = land.unwrap_or(t + dt_step);
        x = candidate.x;
        let iterations = candidate.iterations;
        step += 1;

        let mut keep_going = true;

        if let Some(c) = crossing {
            modes.flip(&c);
            let instance = problem.netlist().instances()[c.instance_index].name.clone();
            debug!(t, instance = %instance, guard = c.guard, "guard crossing committed");
            record.crossings.push(CrossingRecord {
                t,
                instance: instance.clone(),
                guard: c.guard,
            });
            keep_going &= on_step(&SimProgressEvent::ModeFlip {
                t,
                instance,
                guard: c.guard,
            });
        }

        apply_due_events(problem, &mut schedule, &mut drives, t)?;

        // Decimation never skips a landing or a crossing
        if landed || crossing.is_some() || step % opts.record_every == 0 {
            record.t.push(t);
            record.states.push(x.clone());
            record.observables.push(candidate.observables);
            skipped_last = None;
        } else {
            skipped_last = Some((t, x.clone(), candidate.observables));
        }

        if shrunk {
            dt = dt_step;
        }
        dt = (dt * opts.grow_factor).min(opts.dt);

        keep_going &= on_step(&SimProgressEvent::StepCommitted {
            t,
            dt: dt_step,
            newton_iterations: iterations,
        });
        if !keep_going {
            record.aborted = true;
            break;
        }
    }

    // Always record the last committed point
    if let Some((ts, xs, obs)) = skipped_last {
        record.t.push(ts);
        record.states.push(xs);
        record.observables.push(obs);
    }
    record.steps = step;
    record.mode_flips = modes.flip_count();
    Ok(record)
}

/// Accepted solve at one trial step size.
struct StepCandidate {
    x: DVector<f64>,
    iterations: usize,
    fresh: Vec<ModeVector>,
    observables: Vec<(String, f64)>,
}

fn attempt_step(
    problem: &SystemProblem<'_>,
    x_prev: &DVector<f64>,
    modes: &[ModeVector],
    drives: &[Vec<f64>],
    t_next: f64,
    inv_dt: f64,
    newton: &NewtonConfig,
) -> SolverResult<StepCandidate> {
    let inputs = EvalInputs {
        t: t_next,
        inv_dt,
        quiescent: false,
        x_prev,
        modes,
        drives,
    };
    let residual_fn = |xc: &DVector<f64>| problem.assemble_residuals(xc, &inputs);
    let jacobian_fn =
        |xc: &DVector<f64>| finite_difference_jacobian(xc, &residual_fn, DEFAULT_EPSILON);
    let result = newton_solve(x_prev.clone(), &residual_fn, &jacobian_fn, newton)?;
    let fresh = problem.guards_at(&result.x, &inputs)?;
    let observables = problem.observables_at(&result.x, &inputs)?;
    Ok(StepCandidate {
        x: result.x,
        iterations: result.iterations,
        fresh,
        observables,
    })
}

/// Pop every event due at `t`, advance its source, fold any new held
/// sample into the drive table, and re-arm the next occurrence.
fn apply_due_events(
    problem: &mut SystemProblem<'_>,
    schedule: &mut EventSchedule,
    drives: &mut [Vec<f64>],
    t: f64,
) -> SimResult<()> {
    while let Some(event) = schedule.pop_due(t) {
        let model = problem.model_mut(event.instance)?;
        if let Some(sample) = model.apply_drive_event(event.slot, event.time) {
            drives[event.instance.index() as usize][event.slot] = sample;
        }
        if let Some(next) = model.next_drive_event(event.slot, event.time) {
            schedule.schedule(next, event.instance, event.slot);
        }
    }
    Ok(())
}

/// Site description for the step-floor diagnostic: the rejecting instance
/// when a model refused the step, otherwise the worst residual row at the
/// step start.
fn floor_site(
    problem: &SystemProblem<'_>,
    err: &SolverError,
    x: &DVector<f64>,
    modes: &[ModeVector],
    drives: &[Vec<f64>],
    t_next: f64,
    inv_dt: f64,
) -> String {
    if let SolverError::ModelEval { instance, .. } = err {
        return format!("instance {instance}");
    }
    let inputs = EvalInputs {
        t: t_next,
        inv_dt,
        quiescent: false,
        x_prev: x,
        modes,
        drives,
    };
    match problem.assemble_residuals(x, &inputs) {
        Ok(r) => problem.worst_residual_site(&r),
        Err(e) => e.to_string(),
    }
}
