//! Stable unknown indexing for solver integration.
//!
//! Maps the netlist's solvable variables to a contiguous 0..N range:
//! first the non-reference node potentials, then branch throughs, then
//! free quantities. Provides O(1) bidirectional lookup.

use ams_core::{BranchId, NodeId, QuantityId};

use crate::netlist::Netlist;

/// What a solver unknown stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnknownKind {
    NodePotential(NodeId),
    BranchThrough(BranchId),
    Free(QuantityId),
}

/// Bidirectional map between netlist variables and contiguous unknowns.
#[derive(Debug, Clone)]
pub struct UnknownMap {
    /// Unknown index -> what it stands for.
    kinds: Vec<UnknownKind>,

    /// NodeId index -> unknown index (None for reference nodes).
    node_to_unknown: Vec<Option<usize>>,

    /// BranchId index -> unknown index of the branch through.
    through_to_unknown: Vec<usize>,

    /// QuantityId index -> unknown index (None for across/through quantities;
    /// across values are derived from node potentials, throughs map via
    /// their branch).
    free_to_unknown: Vec<Option<usize>>,
}

impl UnknownMap {
    /// Build the unknown map from a frozen netlist.
    pub fn from_netlist(net: &Netlist) -> Self {
        let mut kinds = Vec::new();
        let mut node_to_unknown = vec![None; net.nodes().len()];
        let mut through_to_unknown = vec![usize::MAX; net.branches().len()];
        let mut free_to_unknown = vec![None; net.quantity_count()];

        for node in net.nodes() {
            if node.is_reference {
                continue;
            }
            node_to_unknown[node.id.index() as usize] = Some(kinds.len());
            kinds.push(UnknownKind::NodePotential(node.id));
        }

        for branch in net.branches() {
            through_to_unknown[branch.id.index() as usize] = kinds.len();
            kinds.push(UnknownKind::BranchThrough(branch.id));
        }

        for inst in net.instances() {
            for &q in &inst.frees {
                free_to_unknown[q.index() as usize] = Some(kinds.len());
                kinds.push(UnknownKind::Free(q));
            }
        }

        Self {
            kinds,
            node_to_unknown,
            through_to_unknown,
            free_to_unknown,
        }
    }

    /// Total number of solver unknowns.
    pub fn unknown_count(&self) -> usize {
        self.kinds.len()
    }

    /// What unknown `i` stands for.
    pub fn kind(&self, i: usize) -> UnknownKind {
        self.kinds[i]
    }

    /// Unknown index of a node potential; None for the reference node.
    pub fn node_unknown(&self, node: NodeId) -> Option<usize> {
        self.node_to_unknown[node.index() as usize]
    }

    /// Unknown index of a branch's through quantity.
    pub fn through_unknown(&self, branch: BranchId) -> usize {
        self.through_to_unknown[branch.index() as usize]
    }

    /// Unknown index of a free quantity, if it is one.
    pub fn free_unknown(&self, quantity: QuantityId) -> Option<usize> {
        self.free_to_unknown[quantity.index() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NetlistBuilder;
    use crate::netlist::Domain;

    #[test]
    fn unknown_layout_nodes_then_throughs_then_frees() {
        let mut nb = NetlistBuilder::new();
        let gnd = nb.ground(Domain::Electrical);
        let n1 = nb.node(Domain::Electrical, "n1");
        let n2 = nb.node(Domain::Electrical, "n2");
        let inst = nb.instance("X1");
        let b1 = nb.branch(inst, Domain::Electrical, n1, n2);
        let b2 = nb.branch(inst, Domain::Electrical, n2, gnd);
        let q = nb.free_quantity(inst, "x");
        let net = nb.build().unwrap();

        let map = UnknownMap::from_netlist(&net);
        // 2 non-reference nodes + 2 throughs + 1 free
        assert_eq!(map.unknown_count(), 5);
        assert_eq!(map.node_unknown(gnd), None);
        assert_eq!(map.node_unknown(n1), Some(0));
        assert_eq!(map.node_unknown(n2), Some(1));
        assert_eq!(map.through_unknown(b1), 2);
        assert_eq!(map.through_unknown(b2), 3);
        assert_eq!(map.free_unknown(q), Some(4));
        assert_eq!(map.kind(4), UnknownKind::Free(q));
    }
}
