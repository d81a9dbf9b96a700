//! ams-core: stable foundation for amsim.
//!
//! Contains:
//! - units (uom SI types + constructors for the electrical/thermal/mechanical set)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for network/model objects)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{AmsError, AmsResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
