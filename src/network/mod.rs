//! Queries over a built drainage network: channel segments, downstream profiles,
//! and upstream catchments.

use std::collections::VecDeque;

use crate::error::{FlowError, FlowResult};
use crate::flow::FlowNetwork;

/// Node ids along a flow path, ordered upstream → downstream, with distance
/// measured upstream from the mouth (the last node sits at 0).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    pub nodes: Vec<usize>,
    pub distance: Vec<f64>,
}

impl Profile {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Outlet the path ends at.
    pub fn mouth(&self) -> Option<usize> {
        self.nodes.last().copied()
    }

    /// Total path length from the start node to the mouth.
    pub fn length(&self) -> f64 {
        self.distance.first().copied().unwrap_or(0.0)
    }
}

/// Split the network into channel segments where `field > threshold`.
///
/// Starts at every qualifying baselevel node and walks upstream depth-first
/// through qualifying donors. A segment ends at a channel head or at a
/// confluence; each branch leaving a confluence opens a new segment that begins
/// with the confluence node, so segments chain into continuous lines.
/// Segments are ordered downstream → upstream. Equal-to-threshold nodes are
/// excluded.
pub fn channel_segments(net: &FlowNetwork, field: &[f64], threshold: f64) -> FlowResult<Vec<Vec<usize>>> {
    FlowError::check_len("field", net.len(), field.len())?;
    let above = |n: usize| field[n] > threshold;

    let mut segments = Vec::new();
    let mut pending: Vec<(usize, Option<usize>)> = Vec::new();
    let mut branch: Vec<usize> = Vec::new();

    for &outlet in net.baselevel.iter().filter(|&&b| above(b)) {
        pending.push((outlet, None));

        while let Some((start, confluence)) = pending.pop() {
            let mut segment: Vec<usize> = confluence.into_iter().collect();
            let mut node = start;
            loop {
                segment.push(node);
                branch.clear();
                branch.extend(net.donors.donors_of(node).iter().copied().filter(|&d| above(d)));
                match branch.len() {
                    0 => break,
                    1 => node = branch[0],
                    _ => {
                        // Reverse so the lowest id is walked first.
                        pending.extend(branch.iter().rev().map(|&d| (d, Some(node))));
                        break;
                    }
                }
            }
            segments.push(segment);
        }
    }
    Ok(segments)
}

/// Downstream profile from `start` to its outlet.
///
/// Step length between a node and its receiver is the Euclidean offset using
/// cell width `dx` and height `dy` (sign ignored). A baselevel start gives a
/// single-node profile at distance 0.
pub fn profile(net: &FlowNetwork, start: usize, dx: f64, dy: f64) -> FlowResult<Profile> {
    FlowError::check_node(start, net.len())?;
    let (dx, dy) = (dx.abs(), dy.abs());
    let cols = net.cols;

    let mut nodes = vec![start];
    let mut travelled = vec![0.0];
    let mut node = start;
    let mut total = 0.0;
    while !net.is_baselevel(node) {
        let recv = net.receivers[node];
        let dr = (recv / cols) as f64 - (node / cols) as f64;
        let dc = (recv % cols) as f64 - (node % cols) as f64;
        total += ((dr * dy).powi(2) + (dc * dx).powi(2)).sqrt();
        nodes.push(recv);
        travelled.push(total);
        node = recv;
    }

    if nodes.len() == 1 {
        log::debug!("profile from node {start} is a single outlet node");
    }

    let distance = travelled.iter().map(|t| total - t).collect();
    Ok(Profile { nodes, distance })
}

/// Node ids from `start` down to its outlet, inclusive.
pub fn downstream_path(net: &FlowNetwork, start: usize) -> FlowResult<Vec<usize>> {
    FlowError::check_node(start, net.len())?;
    let mut path = vec![start];
    let mut node = start;
    while !net.is_baselevel(node) {
        node = net.receivers[node];
        path.push(node);
    }
    Ok(path)
}

/// Every node draining to `node`, the node itself included, breadth-first.
pub fn upstream_nodes(net: &FlowNetwork, node: usize) -> FlowResult<Vec<usize>> {
    FlowError::check_node(node, net.len())?;
    let mut found = Vec::new();
    let mut queue = VecDeque::from([node]);
    while let Some(n) = queue.pop_front() {
        found.push(n);
        queue.extend(net.donors.donors_of(n).iter().copied());
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodePolicy;
    use crate::grid::{D8Convention, FlowGrid};
    use ndarray::{array, Array2};

    fn network(codes: Array2<i64>) -> FlowNetwork {
        let grid = FlowGrid::from_raw(&codes, D8Convention::Esri, CodePolicy::Strict).unwrap();
        FlowNetwork::from_grid(&grid).unwrap()
    }

    /// Y-shaped river leaving through the bottom edge:
    ///
    /// ```text
    ///  .  a  .  b  .      a=(0,1) SE, b=(0,3) SW
    ///  .  .  ↓  .  .      confluence (1,2)
    ///  .  .  ↓  .  .
    ///  .  .  o  .  .      outlet (3,2)
    /// ```
    fn y_river() -> FlowNetwork {
        network(array![
            [0, 2, 0, 8, 0],
            [0, 0, 4, 0, 0],
            [0, 0, 4, 0, 0],
            [0, 0, 0, 0, 0],
        ])
    }

    #[test]
    fn test_y_river_receivers() {
        let net = y_river();
        assert_eq!(net.receivers[1], 7);
        assert_eq!(net.receivers[3], 7);
        assert_eq!(net.receivers[7], 12);
        assert_eq!(net.receivers[12], 17);
        assert!(net.is_baselevel(17));
    }

    #[test]
    fn test_segments_split_at_confluence() {
        let net = y_river();
        let acc = net.accumulate(None).unwrap();
        let segs = channel_segments(&net, &acc, 0.5).unwrap();
        // Every other cell is a lone sink and forms a one-node segment.
        let river: Vec<_> = segs.iter().filter(|s| s.len() > 1).cloned().collect();
        assert_eq!(river, vec![vec![17, 12, 7], vec![7, 1], vec![7, 3]]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let net = y_river();
        let acc = net.accumulate(None).unwrap();
        // acc[7] == 3.0: with threshold 3 the confluence itself is excluded.
        assert_eq!(acc[7], 3.0);
        let segs = channel_segments(&net, &acc, 3.0).unwrap();
        assert_eq!(segs, vec![vec![17, 12]]);
        // Just below 3 it is included.
        let segs = channel_segments(&net, &acc, 2.999).unwrap();
        assert_eq!(segs, vec![vec![17, 12, 7]]);
    }

    #[test]
    fn test_no_outlet_above_threshold() {
        let net = y_river();
        let acc = net.accumulate(None).unwrap();
        assert!(channel_segments(&net, &acc, 100.0).unwrap().is_empty());
        assert!(channel_segments(&net, &acc[..3], 0.0).is_err());
    }

    #[test]
    fn test_profile_distances() {
        let net = y_river();
        let p = profile(&net, 1, 10.0, -10.0).unwrap();
        assert_eq!(p.nodes, vec![1, 7, 12, 17]);
        let diag = (200.0f64).sqrt();
        let expected = [diag + 20.0, 20.0, 10.0, 0.0];
        for (d, e) in p.distance.iter().zip(expected.iter()) {
            assert!((d - e).abs() < 1e-9);
        }
        assert_eq!(p.mouth(), Some(17));
        assert!((p.length() - (diag + 20.0)).abs() < 1e-9);
    }

    #[test]
    fn test_profile_from_outlet() {
        let net = y_river();
        let p = profile(&net, 17, 10.0, 10.0).unwrap();
        assert_eq!(p.nodes, vec![17]);
        assert_eq!(p.distance, vec![0.0]);
    }

    #[test]
    fn test_profile_rejects_bad_start() {
        let net = y_river();
        assert_eq!(
            profile(&net, 20, 1.0, 1.0),
            Err(FlowError::NodeOutOfRange { node: 20, len: 20 })
        );
    }

    #[test]
    fn test_upstream_and_downstream() {
        let net = y_river();
        assert_eq!(upstream_nodes(&net, 12).unwrap(), vec![12, 7, 1, 3]);
        assert_eq!(upstream_nodes(&net, 0).unwrap(), vec![0]);
        assert_eq!(downstream_path(&net, 3).unwrap(), vec![3, 7, 12, 17]);
        assert!(upstream_nodes(&net, 99).is_err());
    }
}
