//! Compressed Sparse Row (CSR) donor index: the inverse of the receiver array.

use crate::error::{FlowError, FlowResult};

/// For every node, the nodes that drain directly into it.
///
/// `donors[delta[n]..delta[n + 1]]` is node `n`'s donor slice, ascending by id.
/// Self-loops (baselevel nodes) never appear as their own donor, so
/// `delta[N] == N - baselevel_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorIndex {
    pub donor_counts: Vec<usize>,
    pub delta: Vec<usize>,
    pub donors: Vec<usize>,
}

impl DonorIndex {
    /// Counting-sort build: one pass to count, one pass to place.
    pub fn from_receivers(receivers: &[usize]) -> FlowResult<Self> {
        let num_nodes = receivers.len();
        let mut donor_counts = vec![0usize; num_nodes];
        for (donor, &recv) in receivers.iter().enumerate() {
            FlowError::check_node(recv, num_nodes)?;
            if recv != donor {
                donor_counts[recv] += 1;
            }
        }

        let mut delta = Vec::with_capacity(num_nodes + 1);
        let mut offset = 0usize;
        delta.push(0);
        for &c in donor_counts.iter() {
            offset += c;
            delta.push(offset);
        }

        let mut donors = vec![0usize; offset];
        let mut write_pos = delta[..num_nodes].to_vec();
        // Ascending donor ids fall out of iterating donors in order.
        for (donor, &recv) in receivers.iter().enumerate() {
            if recv != donor {
                donors[write_pos[recv]] = donor;
                write_pos[recv] += 1;
            }
        }

        Ok(Self { donor_counts, delta, donors })
    }

    #[inline]
    pub fn donors_of(&self, node: usize) -> &[usize] {
        &self.donors[self.delta[node]..self.delta[node + 1]]
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.donor_counts.len()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.donors.len()
    }
}
