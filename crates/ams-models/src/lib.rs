//! ams-models: device model library for amsim.
//!
//! Provides piecewise-continuous branch models:
//! - Linear elements (resistor, capacitor)
//! - Waveform-driven source
//! - Solar panel with a blended piecewise I-V curve
//! - Mechanical stop with a contact gap
//! - NTC thermistor with self-heating
//! - Op-amp with saturation rails and a single pole
//! - Thermoelectric cooler
//!
//! All models implement the `DeviceModel` trait: deterministic residual
//! functions of an evaluation context, suitable for parallel evaluation and
//! implicit solving. Segment choices come from the committed mode vector;
//! fresh guard outcomes are reported separately for the breakpoint detector.

pub mod capacitor;
pub mod common;
pub mod error;
pub mod opamp;
pub mod resistor;
pub mod solar;
pub mod stop;
pub mod tec;
pub mod thermistor;
pub mod traits;
pub mod vsource;

// Re-exports
pub use capacitor::Capacitor;
pub use error::{ModelError, ModelResult};
pub use opamp::OpAmp;
pub use resistor::Resistor;
pub use solar::{SolarPanel, SolarPanelParams};
pub use stop::Stop;
pub use tec::Tec;
pub use thermistor::Thermistor;
pub use traits::{BranchView, DeviceModel, EvalContext, ModeVector};
pub use vsource::{VSource, VSourceSpec};
