//! Drainage network derived from a D8 grid, and flow accumulation over it.
//!
//! Pipeline: codes → receivers → donor index → stack order. All four arrays are
//! built once per grid and never mutated; accumulation is a pure function of them
//! plus a weight vector.

pub mod order;
pub mod receivers;

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::error::{FlowError, FlowResult};
use crate::graph::DonorIndex;
use crate::grid::FlowGrid;

pub use order::{build_order, topological_order};
pub use receivers::{baselevel_nodes, resolve_receivers};

/// Cached topology for one direction grid.
#[derive(Debug, Clone)]
pub struct FlowNetwork {
    pub rows: usize,
    pub cols: usize,
    pub receivers: Vec<usize>,
    pub baselevel: Vec<usize>,
    /// Outlets → ridges; a receiver always comes before its donors.
    pub stack: Vec<usize>,
    pub donors: DonorIndex,
}

impl FlowNetwork {
    pub fn from_grid(grid: &FlowGrid) -> FlowResult<Self> {
        let (rows, cols) = grid.shape();
        let receivers = resolve_receivers(grid);
        let mut net = Self::from_receivers(receivers)?;
        net.rows = rows;
        net.cols = cols;
        log::debug!(
            "built drainage network: {}x{} nodes, {} outlets, {} edges",
            rows,
            cols,
            net.baselevel.len(),
            net.donors.num_edges()
        );
        Ok(net)
    }

    /// Build from an explicit receiver array, treated as a single-row grid.
    pub fn from_receivers(receivers: Vec<usize>) -> FlowResult<Self> {
        let donors = DonorIndex::from_receivers(&receivers)?;
        let baselevel = baselevel_nodes(&receivers);
        let stack = build_order(&baselevel, &donors)?;
        Ok(Self {
            rows: 1,
            cols: receivers.len(),
            receivers,
            baselevel,
            stack,
            donors,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    #[inline]
    pub fn is_baselevel(&self, node: usize) -> bool {
        self.receivers[node] == node
    }

    /// Accumulate `weights` (ones if `None`) down the network.
    pub fn accumulate(&self, weights: Option<&[f64]>) -> FlowResult<Vec<f64>> {
        accumulate(&self.receivers, &self.stack, weights)
    }

    /// Grid-shaped variant: weights and result share the direction grid's shape.
    pub fn accumulate_grid(&self, weights: Option<ArrayView2<f64>>) -> FlowResult<Array2<f64>> {
        let strided: Vec<f64>;
        let flat: Option<&[f64]> = match weights {
            Some(w) => {
                if w.dim() != (self.rows, self.cols) {
                    return Err(FlowError::shape_mismatch("weights", self.len(), w.len()));
                }
                // Row-major views are read in place; only strided views are gathered.
                match w.to_slice() {
                    Some(s) => Some(s),
                    None => {
                        strided = w.iter().copied().collect();
                        Some(strided.as_slice())
                    }
                }
            }
            None => None,
        };
        let acc = self.accumulate(flat)?;
        Array2::from_shape_vec((self.rows, self.cols), acc)
            .map_err(|e| FlowError::invalid_shape(e.to_string()))
    }

    /// Independent weight vectors against the same read-only topology, in parallel.
    pub fn accumulate_many(&self, weight_sets: &[Vec<f64>]) -> FlowResult<Vec<Vec<f64>>> {
        weight_sets
            .par_iter()
            .map(|w| self.accumulate(Some(w)))
            .collect()
    }
}

/// Sum each node's weight with the weights of everything upstream of it.
///
/// `stack` must list receivers before donors (see [`order::build_order`]); it is
/// walked in reverse so a node is complete before it is added to its receiver.
pub fn accumulate(receivers: &[usize], stack: &[usize], weights: Option<&[f64]>) -> FlowResult<Vec<f64>> {
    let n = receivers.len();
    FlowError::check_len("stack", n, stack.len())?;
    let mut acc = match weights {
        Some(w) => {
            FlowError::check_len("weights", n, w.len())?;
            w.to_vec()
        }
        None => vec![1.0; n],
    };

    for &node in stack.iter().rev() {
        let recv = receivers[node];
        if recv != node {
            acc[recv] += acc[node];
        }
    }
    Ok(acc)
}
