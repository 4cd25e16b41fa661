//! Point sources (active discharges) propagated down the drainage network.
//!
//! Each located source contributes an indicator weight of 1 at its node; the
//! accumulated field then counts, at every cell, how many active sources lie
//! upstream. Cells with a count above zero are "impacted".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FlowResult;
use crate::flow::FlowNetwork;
use crate::geo::GeoTransform;
use crate::network;

/// A discharge location in map coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSource {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl PointSource {
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self { name: name.into(), x, y }
    }
}

/// A source already resolved to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedSource<'a> {
    pub source: &'a PointSource,
    pub node: usize,
}

/// Per-node summary of what drains through an impacted cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactInfo {
    pub node: usize,
    pub coord: (f64, f64),
    pub upstream_sources: f64,
    /// Upstream source cells per km² of drainage area, for grids in metres.
    pub sources_per_km2: f64,
    pub source_names: Vec<String>,
}

/// Resolve sources to nodes; anything outside the raster is logged and dropped.
pub fn locate_sources<'a>(
    sources: &'a [PointSource],
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
) -> Vec<LocatedSource<'a>> {
    sources
        .iter()
        .filter_map(|source| match transform.coord_to_node(source.x, source.y, rows, cols) {
            Ok(node) => Some(LocatedSource { source, node }),
            Err(e) => {
                log::warn!("skipping out of bounds source {}: {e}", source.name);
                None
            }
        })
        .collect()
}

/// Indicator weights: 1.0 at every located source node, 0.0 elsewhere.
///
/// Two sources in one cell still mark it once, so counts are per cell.
pub fn source_weights(located: &[LocatedSource<'_>], len: usize) -> Vec<f64> {
    let mut weights = vec![0.0; len];
    for s in located {
        weights[s.node] = 1.0;
    }
    weights
}

/// Number of upstream source cells at every node.
pub fn downstream_impact(net: &FlowNetwork, located: &[LocatedSource<'_>]) -> FlowResult<Vec<f64>> {
    net.accumulate(Some(&source_weights(located, net.len())))
}

/// Impact divided by upstream drainage area (`cell_area` per node).
pub fn impact_per_area(net: &FlowNetwork, impact: &[f64], cell_area: f64) -> FlowResult<Vec<f64>> {
    let area = net.accumulate(Some(&vec![cell_area; net.len()]))?;
    Ok(impact.iter().zip(area.iter()).map(|(i, a)| i / a).collect())
}

const M2_PER_KM2: f64 = 1.0e6;

/// Detail for every impacted node, keyed by node id.
pub fn downstream_info(
    net: &FlowNetwork,
    located: &[LocatedSource<'_>],
    transform: &GeoTransform,
) -> FlowResult<BTreeMap<usize, ImpactInfo>> {
    let impact = downstream_impact(net, located)?;
    let per_area = impact_per_area(net, &impact, transform.cell_area())?;

    let mut info: BTreeMap<usize, ImpactInfo> = impact
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > 0.0)
        .map(|(node, &v)| {
            let entry = ImpactInfo {
                node,
                coord: transform.node_to_coord(node, net.cols),
                upstream_sources: v,
                sources_per_km2: per_area[node] * M2_PER_KM2,
                source_names: Vec::new(),
            };
            (node, entry)
        })
        .collect();

    for s in located {
        for node in network::downstream_path(net, s.node)? {
            if let Some(entry) = info.get_mut(&node) {
                entry.source_names.push(s.source.name.clone());
            }
        }
    }
    Ok(info)
}

/// Sources whose node drains through `node`.
pub fn upstream_sources<'a>(
    net: &FlowNetwork,
    located: &[LocatedSource<'a>],
    node: usize,
) -> FlowResult<Vec<&'a PointSource>> {
    let mut upstream = vec![false; net.len()];
    for n in network::upstream_nodes(net, node)? {
        upstream[n] = true;
    }
    Ok(located.iter().filter(|s| upstream[s.node]).map(|s| s.source).collect())
}

/// `(count, count per map unit²)` of sources upstream of `node`.
pub fn count_upstream_sources(
    net: &FlowNetwork,
    located: &[LocatedSource<'_>],
    node: usize,
    cell_area: f64,
) -> FlowResult<(usize, f64)> {
    let upstream_area = network::upstream_nodes(net, node)?.len() as f64 * cell_area;
    let count = upstream_sources(net, located, node)?.len();
    Ok((count, count as f64 / upstream_area))
}

/// Snap `(x, y)` to the nearest pixel centre whose drainage area exceeds
/// `area_threshold`. `None` if no cell is large enough.
pub fn snap_to_drainage(
    net: &FlowNetwork,
    transform: &GeoTransform,
    x: f64,
    y: f64,
    area_threshold: f64,
) -> FlowResult<Option<(f64, f64)>> {
    let area = net.accumulate(Some(&vec![transform.cell_area(); net.len()]))?;
    let nearest = area
        .iter()
        .enumerate()
        .filter(|(_, &a)| a > area_threshold)
        .map(|(node, _)| {
            let (cx, cy) = transform.node_to_coord(node, net.cols);
            ((cx - x).powi(2) + (cy - y).powi(2), (cx, cy))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, coord)| coord);
    Ok(nearest)
}
