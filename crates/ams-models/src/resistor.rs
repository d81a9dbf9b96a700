//! Linear resistor.

use ams_core::{Real, Resistance};
use ams_net::Domain;

use crate::error::{ModelError, ModelResult};
use crate::traits::{DeviceModel, EvalContext};

/// Linear resistive branch: `v = i * R`.
///
/// Terminals p, n; one electrical branch p->n.
#[derive(Debug, Clone)]
pub struct Resistor {
    name: String,
    resistance: f64,
}

impl Resistor {
    pub fn new(name: impl Into<String>, resistance: Resistance) -> ModelResult<Self> {
        let r = {
            use uom::si::electrical_resistance::ohm;
            resistance.get::<ohm>()
        };
        if !r.is_finite() || r <= 0.0 {
            return Err(ModelError::ParameterConstraint {
                model: "resistor",
                what: "resistance must be positive and finite",
            });
        }
        Ok(Self {
            name: name.into(),
            resistance: r,
        })
    }

    pub fn resistance_ohm(&self) -> f64 {
        self.resistance
    }
}

impl DeviceModel for Resistor {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_domains(&self) -> Vec<Domain> {
        vec![Domain::Electrical]
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, residuals: &mut [Real]) -> ModelResult<()> {
        let b = ctx.branch(0)?;
        residuals[0] = b.across - b.through * self.resistance;
        Ok(())
    }
}
