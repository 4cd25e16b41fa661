//! Stack order: a topological sort of the receiver forest without recursion.
//!
//! The order runs outlets → ridges: every baselevel node first, then donors
//! breadth-first, so a receiver always precedes all of its donors. Accumulation
//! walks it backwards.

use std::collections::VecDeque;

use crate::error::{FlowError, FlowResult};
use crate::graph::DonorIndex;

/// Breadth-first walk upstream from `baselevel`, donors enumerated in ascending id.
///
/// Every node reachable from an outlet is emitted exactly once. If some nodes are
/// never reached the receivers contain a cycle, e.g. two neighbours coded to point
/// at each other, and the order is rejected rather than returned short.
pub fn build_order(baselevel: &[usize], donors: &DonorIndex) -> FlowResult<Vec<usize>> {
    let n = donors.num_nodes();
    let mut order = Vec::with_capacity(n);
    let mut queue: VecDeque<usize> = baselevel.iter().copied().collect();

    while let Some(node) = queue.pop_front() {
        order.push(node);
        queue.extend(donors.donors_of(node).iter().copied());
    }

    if order.len() != n {
        return Err(FlowError::CyclicReceivers { unvisited: n - order.len() });
    }
    Ok(order)
}

/// Convenience wrapper deriving the baselevel set and donor index on the fly.
pub fn topological_order(receivers: &[usize]) -> FlowResult<Vec<usize>> {
    let donors = DonorIndex::from_receivers(receivers)?;
    let baselevel = super::receivers::baselevel_nodes(receivers);
    build_order(&baselevel, &donors)
}
