//! Incremental netlist builder.

use std::collections::HashMap;

use ams_core::{AmsResult, BranchId, InstanceId, NodeId, QuantityId};

use crate::netlist::{Branch, Domain, Instance, Netlist, Node, Quantity, QuantityKind};
use crate::validate;

/// Builder for constructing a netlist incrementally.
///
/// Use `ground`/`node`/`instance`/`branch` to build up the topology, then
/// call `build()` to validate and freeze it into an immutable [`Netlist`].
#[derive(Debug, Default)]
pub struct NetlistBuilder {
    nodes: Vec<Node>,
    branches: Vec<Branch>,
    instances: Vec<Instance>,
    quantities: Vec<Quantity>,
    grounds: HashMap<Domain, NodeId>,
    next_node_id: u32,
    next_branch_id: u32,
    next_instance_id: u32,
    next_quantity_id: u32,
}

impl NetlistBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference node of a domain, created on first request.
    ///
    /// Each domain has exactly one; repeated calls return the same id.
    pub fn ground(&mut self, domain: Domain) -> NodeId {
        if let Some(&id) = self.grounds.get(&domain) {
            return id;
        }
        let id = NodeId::from_index(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.push(Node {
            id,
            name: format!("{domain}_ref"),
            domain,
            is_reference: true,
        });
        self.grounds.insert(domain, id);
        id
    }

    /// Add a node and return its ID.
    pub fn node(&mut self, domain: Domain, name: impl Into<String>) -> NodeId {
        let id = NodeId::from_index(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.push(Node {
            id,
            name: name.into(),
            domain,
            is_reference: false,
        });
        id
    }

    /// Register a model instance and return its ID.
    pub fn instance(&mut self, name: impl Into<String>) -> InstanceId {
        let id = InstanceId::from_index(self.next_instance_id);
        self.next_instance_id += 1;
        self.instances.push(Instance {
            id,
            name: name.into(),
            branches: Vec::new(),
            frees: Vec::new(),
        });
        id
    }

    /// Add a branch between two nodes, owned by `instance`.
    ///
    /// Allocates the branch's across and through quantities. Branch order
    /// per instance is the order the owning model sees its views in.
    pub fn branch(
        &mut self,
        instance: InstanceId,
        domain: Domain,
        from: NodeId,
        to: NodeId,
    ) -> BranchId {
        let id = BranchId::from_index(self.next_branch_id);
        self.next_branch_id += 1;

        let across = QuantityId::from_index(self.next_quantity_id);
        self.next_quantity_id += 1;
        let through = QuantityId::from_index(self.next_quantity_id);
        self.next_quantity_id += 1;

        let inst_name = self
            .instances
            .get(instance.index() as usize)
            .map(|i| i.name.clone())
            .unwrap_or_default();
        self.quantities.push(Quantity {
            id: across,
            kind: QuantityKind::Across { branch: id },
            domain,
            name: format!("{inst_name}.b{}.across", id.index()),
        });
        self.quantities.push(Quantity {
            id: through,
            kind: QuantityKind::Through { branch: id },
            domain,
            name: format!("{inst_name}.b{}.through", id.index()),
        });

        self.branches.push(Branch {
            id,
            instance,
            domain,
            from,
            to,
            across,
            through,
        });
        if let Some(inst) = self.instances.get_mut(instance.index() as usize) {
            inst.branches.push(id);
        }
        id
    }

    /// Add a free (internal) quantity owned by `instance`.
    pub fn free_quantity(&mut self, instance: InstanceId, name: impl Into<String>) -> QuantityId {
        let id = QuantityId::from_index(self.next_quantity_id);
        self.next_quantity_id += 1;
        self.quantities.push(Quantity {
            id,
            kind: QuantityKind::Free { instance },
            domain: Domain::Real,
            name: name.into(),
        });
        if let Some(inst) = self.instances.get_mut(instance.index() as usize) {
            inst.frees.push(id);
        }
        id
    }

    /// Build and validate the netlist, returning an immutable [`Netlist`].
    pub fn build(self) -> AmsResult<Netlist> {
        validate::validate_structure(&self.nodes, &self.branches, &self.instances, &self.grounds)?;

        let (node_branch_offsets, node_branches) =
            Self::build_incidence(&self.nodes, &self.branches);

        validate::validate_incidence(&self.nodes, &node_branch_offsets, &node_branches)?;

        Ok(Netlist {
            nodes: self.nodes,
            branches: self.branches,
            instances: self.instances,
            quantities: self.quantities,
            node_branch_offsets,
            node_branches,
        })
    }

    /// Build compact incidence lists: for each node, its incident branches
    /// with conservation signs.
    fn build_incidence(nodes: &[Node], branches: &[Branch]) -> (Vec<usize>, Vec<(BranchId, i8)>) {
        let mut node_to_branches: HashMap<NodeId, Vec<(BranchId, i8)>> = HashMap::new();
        for branch in branches {
            node_to_branches
                .entry(branch.from)
                .or_default()
                .push((branch.id, 1));
            node_to_branches
                .entry(branch.to)
                .or_default()
                .push((branch.id, -1));
        }

        // Sort each node's list for determinism
        for list in node_to_branches.values_mut() {
            list.sort_by_key(|(b, _)| b.index());
        }

        let mut offsets = Vec::with_capacity(nodes.len() + 1);
        let mut flat = Vec::new();
        offsets.push(0);

        for node in nodes {
            if let Some(list) = node_to_branches.get(&node.id) {
                flat.extend_from_slice(list);
            }
            offsets.push(flat.len());
        }

        (offsets, flat)
    }
}
