//! ams-net: network/quantity layer for amsim.
//!
//! Provides:
//! - Core network data structures (Node, Branch, Instance, Quantity, Netlist)
//! - Incremental netlist builder with validation
//! - Stable unknown indexing for solver integration
//! - The aggregated state vector with bound-quantity tracking
//!
//! # Example
//!
//! ```
//! use ams_net::{Domain, NetlistBuilder};
//!
//! let mut builder = NetlistBuilder::new();
//! let gnd = builder.ground(Domain::Electrical);
//! let n1 = builder.node(Domain::Electrical, "out");
//! let r1 = builder.instance("R1");
//! builder.branch(r1, Domain::Electrical, n1, gnd);
//! let net = builder.build().unwrap();
//!
//! assert_eq!(net.nodes().len(), 2);
//! assert_eq!(net.branches().len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod indexing;
pub mod netlist;
pub mod state;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::NetlistBuilder;
pub use error::{NetError, NetResult};
pub use indexing::{UnknownKind, UnknownMap};
pub use netlist::{Branch, Domain, Instance, Netlist, Node, Quantity, QuantityKind};
pub use state::StateVector;
