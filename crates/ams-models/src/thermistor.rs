//! NTC thermistor with self-heating.

use ams_core::{Real, Resistance, Temperature};
use ams_net::Domain;

use crate::common::check_finite;
use crate::error::{ModelError, ModelResult};
use crate::traits::{DeviceModel, EvalContext};

/// Beta-model NTC thermistor coupled to a thermal node.
///
/// Terminals p, n (electrical) and th (thermal case node). Branches:
/// electrical p->n, and a thermal branch th->thermal reference whose across
/// is the absolute case temperature in kelvin. Electrical dissipation is
/// injected into the case node, so the resistance and the thermal network
/// solve together.
#[derive(Debug, Clone)]
pub struct Thermistor {
    name: String,
    r_ref: f64,
    beta: f64,
    t_ref: f64,
}

impl Thermistor {
    /// `beta` is the B-parameter in kelvin; `r_ref` is the resistance at
    /// `t_ref` (the usual datasheet point is 25 degC).
    pub fn new(
        name: impl Into<String>,
        r_ref: Resistance,
        beta: f64,
        t_ref: Temperature,
    ) -> ModelResult<Self> {
        let (r, t) = {
            use uom::si::electrical_resistance::ohm;
            use uom::si::thermodynamic_temperature::kelvin;
            (r_ref.get::<ohm>(), t_ref.get::<kelvin>())
        };
        fn constraint(what: &'static str) -> ModelError {
            ModelError::ParameterConstraint {
                model: "thermistor",
                what,
            }
        }
        if !r.is_finite() || r <= 0.0 {
            return Err(constraint("reference resistance must be positive"));
        }
        if !beta.is_finite() || beta <= 0.0 {
            return Err(constraint("beta must be positive"));
        }
        if !t.is_finite() || t <= 0.0 {
            return Err(constraint("reference temperature must be positive"));
        }
        Ok(Self {
            name: name.into(),
            r_ref: r,
            beta,
            t_ref: t,
        })
    }

    /// Resistance at absolute temperature `t_kelvin`.
    pub fn resistance_at(&self, t_kelvin: f64) -> ModelResult<f64> {
        if !(t_kelvin > 0.0) {
            return Err(ModelError::NonPhysical {
                what: "thermistor temperature must be above absolute zero",
            });
        }
        let r = self.r_ref * (self.beta * (1.0 / t_kelvin - 1.0 / self.t_ref)).exp();
        // exp overflows for temperatures far below the reference; reject
        // the trial point rather than hand a non-finite row to the solver
        check_finite(r, "thermistor resistance overflowed")?;
        Ok(r)
    }
}

impl DeviceModel for Thermistor {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_domains(&self) -> Vec<Domain> {
        vec![Domain::Electrical, Domain::Thermal]
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, residuals: &mut [Real]) -> ModelResult<()> {
        let el = ctx.branch(0)?;
        let th = ctx.branch(1)?;
        let r = self.resistance_at(th.across)?;
        residuals[0] = el.across - el.through * r;
        // Dissipated power flows into the case node
        residuals[1] = th.through + el.across * el.through;
        Ok(())
    }

    fn observables(&self, ctx: &EvalContext<'_>) -> Vec<(&'static str, Real)> {
        match (ctx.branch(0), ctx.branch(1)) {
            (Ok(el), Ok(th)) => {
                let mut out = vec![("power_dissipated", el.across * el.through)];
                if let Ok(r) = self.resistance_at(th.across) {
                    out.push(("resistance", r));
                }
                out
            }
            _ => Vec::new(),
        }
    }
}
