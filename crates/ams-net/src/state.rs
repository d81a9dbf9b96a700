//! Aggregated state vector with bound-quantity tracking.

use ams_core::{NodeId, QuantityId, Real};

use crate::error::{NetError, NetResult};
use crate::indexing::UnknownMap;
use crate::netlist::Netlist;

/// Values and first derivatives for every quantity in a netlist.
///
/// Slots start unbound; reading an unbound slot (or an id the netlist never
/// registered) is a [`NetError::UnboundQuantity`]. Readers hold the vector
/// behind a shared borrow during residual evaluation, so one evaluation
/// always sees a consistent snapshot.
#[derive(Clone, Debug)]
pub struct StateVector {
    values: Vec<Real>,
    derivs: Vec<Real>,
    bound: Vec<bool>,
}

impl StateVector {
    /// A state vector sized for `net`, all slots unbound.
    pub fn new(net: &Netlist) -> Self {
        let n = net.quantity_count();
        Self {
            values: vec![0.0; n],
            derivs: vec![0.0; n],
            bound: vec![false; n],
        }
    }

    fn slot(&self, q: QuantityId) -> NetResult<usize> {
        let i = q.index() as usize;
        if i >= self.values.len() || !self.bound[i] {
            return Err(NetError::UnboundQuantity { quantity: q });
        }
        Ok(i)
    }

    /// Current value of a quantity.
    pub fn get(&self, q: QuantityId) -> NetResult<Real> {
        Ok(self.values[self.slot(q)?])
    }

    /// Current first derivative of a quantity.
    pub fn get_derivative(&self, q: QuantityId) -> NetResult<Real> {
        Ok(self.derivs[self.slot(q)?])
    }

    /// Bind a value (derivative defaults to zero until set).
    pub fn set(&mut self, q: QuantityId, value: Real) {
        let i = q.index() as usize;
        if i < self.values.len() {
            self.values[i] = value;
            self.bound[i] = true;
        }
    }

    /// Set a derivative; also binds the slot.
    pub fn set_derivative(&mut self, q: QuantityId, deriv: Real) {
        let i = q.index() as usize;
        if i < self.derivs.len() {
            self.derivs[i] = deriv;
            self.bound[i] = true;
        }
    }

    /// Bind every quantity from a committed solver solution.
    ///
    /// Across values come from the node potential differences, throughs
    /// and frees from their unknown slots, derivatives from the step's
    /// difference quotient against `x_prev`. Pass `inv_dt = 0` for a
    /// quiescent point.
    pub fn scatter_solution(
        &mut self,
        net: &Netlist,
        map: &UnknownMap,
        x: &[Real],
        x_prev: &[Real],
        inv_dt: Real,
    ) {
        let pot = |node: NodeId, x: &[Real]| map.node_unknown(node).map_or(0.0, |i| x[i]);
        for branch in net.branches() {
            let v = pot(branch.from, x) - pot(branch.to, x);
            let v_prev = pot(branch.from, x_prev) - pot(branch.to, x_prev);
            self.set(branch.across, v);
            self.set_derivative(branch.across, (v - v_prev) * inv_dt);

            let i = map.through_unknown(branch.id);
            self.set(branch.through, x[i]);
            self.set_derivative(branch.through, (x[i] - x_prev[i]) * inv_dt);
        }
        for inst in net.instances() {
            for &q in &inst.frees {
                if let Some(i) = map.free_unknown(q) {
                    self.set(q, x[i]);
                    self.set_derivative(q, (x[i] - x_prev[i]) * inv_dt);
                }
            }
        }
    }

    /// Whether a quantity has been bound.
    pub fn is_bound(&self, q: QuantityId) -> bool {
        let i = q.index() as usize;
        i < self.bound.len() && self.bound[i]
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
