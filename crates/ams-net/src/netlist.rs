//! Core network data structures.
//!
//! A netlist is a frozen description of the system topology: nodes grouped
//! by physical domain, two-terminal branches owning an across/through
//! quantity pair, and named model instances owning branches plus any free
//! (internal) quantities.

use core::fmt;

use ams_core::{BranchId, InstanceId, NodeId, QuantityId};

/// Physical domain of a node or branch.
///
/// The domain fixes what an across/through pair means: voltage/current,
/// temperature/heat flow, displacement/force, or a dimensionless
/// value/flow pair for internal signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    Electrical,
    Thermal,
    Mechanical,
    Real,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Electrical => "electrical",
            Domain::Thermal => "thermal",
            Domain::Mechanical => "mechanical",
            Domain::Real => "real",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a quantity measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantityKind {
    /// Potential difference across a branch.
    Across { branch: BranchId },
    /// Flow through a branch.
    Through { branch: BranchId },
    /// Free internal variable of an instance.
    Free { instance: InstanceId },
}

/// A continuous variable with a tracked first derivative.
#[derive(Clone, Debug)]
pub struct Quantity {
    pub id: QuantityId,
    pub kind: QuantityKind,
    pub domain: Domain,
    pub name: String,
}

/// A connection point in one domain.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub domain: Domain,
    /// Reference nodes pin the domain's potential to zero.
    pub is_reference: bool,
}

/// A two-terminal branch owning one across/through quantity pair.
///
/// Orientation: `across = potential(from) - potential(to)`, and a positive
/// through value flows from `from` to `to`.
#[derive(Clone, Debug)]
pub struct Branch {
    pub id: BranchId,
    pub instance: InstanceId,
    pub domain: Domain,
    pub from: NodeId,
    pub to: NodeId,
    pub across: QuantityId,
    pub through: QuantityId,
}

/// A named occurrence of a model.
///
/// Branch order here is the order the model sees its `BranchView`s in.
#[derive(Clone, Debug)]
pub struct Instance {
    pub id: InstanceId,
    pub name: String,
    pub branches: Vec<BranchId>,
    pub frees: Vec<QuantityId>,
}

/// Frozen, validated netlist.
///
/// Construct via [`crate::NetlistBuilder`]. All slices are index-aligned
/// with their id spaces (`id.index()` indexes the slice).
#[derive(Clone, Debug)]
pub struct Netlist {
    pub(crate) nodes: Vec<Node>,
    pub(crate) branches: Vec<Branch>,
    pub(crate) instances: Vec<Instance>,
    pub(crate) quantities: Vec<Quantity>,

    /// Offset-based incidence: node i's incident branches are
    /// `node_branches[node_branch_offsets[i]..node_branch_offsets[i+1]]`.
    pub(crate) node_branch_offsets: Vec<usize>,
    /// Flat incidence list: branch id plus sign (+1 leaving via `from`,
    /// -1 arriving via `to`).
    pub(crate) node_branches: Vec<(BranchId, i8)>,
}

impl Netlist {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn quantities(&self) -> &[Quantity] {
        &self.quantities
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index() as usize]
    }

    pub fn branch(&self, id: BranchId) -> &Branch {
        &self.branches[id.index() as usize]
    }

    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index() as usize]
    }

    pub fn quantity(&self, id: QuantityId) -> &Quantity {
        &self.quantities[id.index() as usize]
    }

    pub fn instance_name(&self, id: InstanceId) -> &str {
        &self.instances[id.index() as usize].name
    }

    /// Incident branches of a node with signs for conservation sums.
    pub fn node_branches(&self, node: NodeId) -> &[(BranchId, i8)] {
        let i = node.index() as usize;
        let start = self.node_branch_offsets[i];
        let end = self.node_branch_offsets[i + 1];
        &self.node_branches[start..end]
    }

    pub fn quantity_count(&self) -> usize {
        self.quantities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetlistBuilder;

    #[test]
    fn domain_display() {
        assert_eq!(Domain::Electrical.to_string(), "electrical");
        assert_eq!(Domain::Mechanical.as_str(), "mechanical");
    }

    #[test]
    fn incidence_signs() {
        let mut nb = NetlistBuilder::new();
        let gnd = nb.ground(Domain::Electrical);
        let n1 = nb.node(Domain::Electrical, "n1");
        let r1 = nb.instance("R1");
        let b = nb.branch(r1, Domain::Electrical, n1, gnd);
        let net = nb.build().unwrap();

        let inc_n1 = net.node_branches(n1);
        assert_eq!(inc_n1, &[(b, 1)]);
        let inc_gnd = net.node_branches(gnd);
        assert_eq!(inc_gnd, &[(b, -1)]);
    }
}
