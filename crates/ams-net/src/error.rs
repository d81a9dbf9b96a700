//! Network-specific error types.

use ams_core::{AmsError, BranchId, InstanceId, NodeId, QuantityId};
use thiserror::Error;

use crate::netlist::Domain;

/// Netlist construction, validation, and state-access errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetError {
    /// A branch endpoint refers to a node that doesn't exist.
    #[error("Branch {branch} endpoint refers to non-existent node {node}")]
    InvalidNodeRef { branch: BranchId, node: NodeId },

    /// A branch refers to an instance that doesn't exist.
    #[error("Branch {branch} refers to non-existent instance {instance}")]
    InvalidInstanceRef {
        branch: BranchId,
        instance: InstanceId,
    },

    /// A branch endpoint lives in a different domain than the branch.
    #[error("Branch {branch} is {expected} but touches a {actual} node")]
    DomainMismatch {
        branch: BranchId,
        expected: Domain,
        actual: Domain,
    },

    /// A branch connects a node to itself.
    #[error("Branch {branch} connects node {node} to itself")]
    SelfLoop { branch: BranchId, node: NodeId },

    /// A domain carries branches but declares no reference node.
    #[error("Domain {domain} has branches but no reference node")]
    MissingGround { domain: Domain },

    /// A non-reference node has no incident branch.
    #[error("Node {node} ({name}) has no incident branch")]
    DanglingNode { node: NodeId, name: String },

    /// The netlist has no branches at all.
    #[error("Netlist has no branches")]
    Empty,

    /// A quantity was read before any model bound a value to it.
    #[error("Quantity {quantity} read before it was bound")]
    UnboundQuantity { quantity: QuantityId },
}

pub type NetResult<T> = Result<T, NetError>;

impl From<NetError> for AmsError {
    fn from(err: NetError) -> Self {
        AmsError::Invariant {
            what: Box::leak(err.to_string().into_boxed_str()),
        }
    }
}
