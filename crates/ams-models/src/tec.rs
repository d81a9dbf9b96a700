//! Thermoelectric cooler.

use ams_core::{Real, Resistance};
use ams_net::Domain;

use crate::error::{ModelError, ModelResult};
use crate::traits::{DeviceModel, EvalContext};

/// Peltier element pumping heat between two thermal nodes.
///
/// Terminals p, n (electrical), th_absorbing (cold side), th_emitting (hot
/// side). Branches in order:
/// 1. electrical p->n,
/// 2. pump th_absorbing->th_emitting carrying the cold-side heat draw,
/// 3. dump thermal reference->th_emitting carrying the electrical power.
///
/// Thermal node potentials are absolute kelvin, so the side temperatures
/// are recovered from the across values. The hot side receives the pumped
/// heat plus `v * i`, which is exactly the cold-side draw plus the input
/// power.
#[derive(Debug, Clone)]
pub struct Tec {
    name: String,
    sp: f64,
    r_el: f64,
    k_th: f64,
}

impl Tec {
    /// `sp` is the Seebeck coefficient in V/K, `k_th` the parasitic thermal
    /// conductance between the sides in W/K.
    pub fn new(
        name: impl Into<String>,
        sp: f64,
        r_el: Resistance,
        k_th: f64,
    ) -> ModelResult<Self> {
        let r = {
            use uom::si::electrical_resistance::ohm;
            r_el.get::<ohm>()
        };
        fn constraint(what: &'static str) -> ModelError {
            ModelError::ParameterConstraint {
                model: "tec",
                what,
            }
        }
        if !sp.is_finite() || sp <= 0.0 {
            return Err(constraint("seebeck coefficient must be positive"));
        }
        if !r.is_finite() || r <= 0.0 {
            return Err(constraint("electrical resistance must be positive"));
        }
        if !k_th.is_finite() || k_th < 0.0 {
            return Err(constraint("thermal conductance must be non-negative"));
        }
        Ok(Self {
            name: name.into(),
            sp,
            r_el: r,
            k_th,
        })
    }

    /// Cold-side heat draw at side temperatures `t_cold`, `t_hot` and
    /// current `i`.
    fn cold_side_heat(&self, t_cold: f64, i: f64, dt: f64) -> f64 {
        self.sp * t_cold * i - 0.5 * i * i * self.r_el - self.k_th * dt
    }
}

impl DeviceModel for Tec {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_domains(&self) -> Vec<Domain> {
        vec![Domain::Electrical, Domain::Thermal, Domain::Thermal]
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, residuals: &mut [Real]) -> ModelResult<()> {
        let el = ctx.branch(0)?;
        let pump = ctx.branch(1)?;
        let dump = ctx.branch(2)?;

        let t_hot = -dump.across;
        let t_cold = t_hot + pump.across;
        if !(t_hot > 0.0) || !(t_cold > 0.0) {
            return Err(ModelError::NonPhysical {
                what: "tec side temperature must be above absolute zero",
            });
        }

        let i = el.through;
        let dt = t_hot - t_cold;

        residuals[0] = el.across - self.sp * dt - i * self.r_el;
        residuals[1] = pump.through - self.cold_side_heat(t_cold, i, dt);
        residuals[2] = dump.through - el.across * i;
        Ok(())
    }

    fn observables(&self, ctx: &EvalContext<'_>) -> Vec<(&'static str, Real)> {
        match (ctx.branch(0), ctx.branch(1)) {
            (Ok(el), Ok(pump)) => vec![
                ("heat_absorbed", pump.through),
                ("electrical_power", el.across * el.through),
            ],
            _ => Vec::new(),
        }
    }
}
