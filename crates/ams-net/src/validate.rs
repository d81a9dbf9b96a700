//! Netlist validation logic.

use std::collections::HashMap;

use ams_core::{AmsResult, BranchId, NodeId};

use crate::error::NetError;
use crate::netlist::{Branch, Domain, Instance, Node};

/// Validate the netlist structure: all references exist, domains line up,
/// every used domain has its reference node.
pub(crate) fn validate_structure(
    nodes: &[Node],
    branches: &[Branch],
    instances: &[Instance],
    grounds: &HashMap<Domain, NodeId>,
) -> AmsResult<()> {
    if branches.is_empty() {
        return Err(NetError::Empty.into());
    }

    for branch in branches {
        // Endpoints must exist
        for node_id in [branch.from, branch.to] {
            if node_id.index() as usize >= nodes.len() {
                return Err(NetError::InvalidNodeRef {
                    branch: branch.id,
                    node: node_id,
                }
                .into());
            }
        }

        // No self-loops
        if branch.from == branch.to {
            return Err(NetError::SelfLoop {
                branch: branch.id,
                node: branch.from,
            }
            .into());
        }

        // Endpoints must live in the branch's domain
        for node_id in [branch.from, branch.to] {
            let node = &nodes[node_id.index() as usize];
            if node.domain != branch.domain {
                return Err(NetError::DomainMismatch {
                    branch: branch.id,
                    expected: branch.domain,
                    actual: node.domain,
                }
                .into());
            }
        }

        // Owning instance must exist
        if branch.instance.index() as usize >= instances.len() {
            return Err(NetError::InvalidInstanceRef {
                branch: branch.id,
                instance: branch.instance,
            }
            .into());
        }

        // Every used domain needs its reference node
        if !grounds.contains_key(&branch.domain) {
            return Err(NetError::MissingGround {
                domain: branch.domain,
            }
            .into());
        }
    }

    Ok(())
}

/// Validate incidence lists: offsets well-formed, every non-reference node
/// touched by at least one branch.
pub(crate) fn validate_incidence(
    nodes: &[Node],
    offsets: &[usize],
    flat: &[(BranchId, i8)],
) -> AmsResult<()> {
    debug_assert_eq!(offsets.len(), nodes.len() + 1);
    debug_assert_eq!(*offsets.last().unwrap_or(&0), flat.len());

    for (i, node) in nodes.iter().enumerate() {
        let degree = offsets[i + 1] - offsets[i];
        if degree == 0 && !node.is_reference {
            return Err(NetError::DanglingNode {
                node: node.id,
                name: node.name.clone(),
            }
            .into());
        }
    }

    Ok(())
}
