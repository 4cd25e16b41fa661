// ============================================================================
// D8Accumulator — the grid, its cached drainage network, and optional georef
//
// Owns one direction grid and everything derived from it. Derivation is eager:
// construction and `set_codes` both rebuild receivers, outlets, stack order and
// donors before returning, so no query can ever observe a stale network.
// ============================================================================

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};

use crate::config::{AccumulatorConfig, ImpactConfig};
use crate::error::{FlowError, FlowResult};
use crate::flow::FlowNetwork;
use crate::geo::GeoTransform;
use crate::grid::FlowGrid;
use crate::network::{self, Profile};
use crate::sources::{self, ImpactInfo, PointSource};

pub struct D8Accumulator {
    pub config: AccumulatorConfig,
    grid: FlowGrid,
    network: FlowNetwork,
    transform: Option<GeoTransform>,
}

impl D8Accumulator {
    /// Plain-array accumulator with no georeferencing.
    pub fn from_array<T>(codes: &Array2<T>, config: AccumulatorConfig) -> FlowResult<Self>
    where
        T: Copy + Into<i64>,
    {
        let grid = FlowGrid::from_raw(codes, config.convention, config.code_policy)?;
        let network = FlowNetwork::from_grid(&grid)?;
        Ok(Self { config, grid, network, transform: None })
    }

    /// Georeferenced accumulator, as built from a raster reader's output.
    pub fn with_geotransform<T>(
        codes: &Array2<T>,
        transform: GeoTransform,
        config: AccumulatorConfig,
    ) -> FlowResult<Self>
    where
        T: Copy + Into<i64>,
    {
        let mut acc = Self::from_array(codes, config)?;
        acc.transform = Some(transform);
        Ok(acc)
    }

    /// Replace the direction grid and rebuild every derived array.
    ///
    /// The geotransform belonged to the old raster and is dropped.
    pub fn set_codes<T>(&mut self, codes: &Array2<T>) -> FlowResult<()>
    where
        T: Copy + Into<i64>,
    {
        let grid = FlowGrid::from_raw(codes, self.config.convention, self.config.code_policy)?;
        let network = FlowNetwork::from_grid(&grid)?;
        if self.transform.take().is_some() {
            log::warn!("direction grid replaced; geospatial information discarded");
        }
        self.grid = grid;
        self.network = network;
        Ok(())
    }

    // --- Accessors ---

    pub fn grid(&self) -> &FlowGrid {
        &self.grid
    }

    pub fn network(&self) -> &FlowNetwork {
        &self.network
    }

    pub fn codes(&self) -> &Array2<u8> {
        self.grid.codes()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    pub fn receivers(&self) -> &[usize] {
        &self.network.receivers
    }

    pub fn baselevel_nodes(&self) -> &[usize] {
        &self.network.baselevel
    }

    /// Outlets first, then upstream breadth-first.
    pub fn order(&self) -> &[usize] {
        &self.network.stack
    }

    pub fn transform(&self) -> Option<&GeoTransform> {
        self.transform.as_ref()
    }

    fn require_transform(&self) -> FlowResult<&GeoTransform> {
        self.transform.as_ref().ok_or(FlowError::MissingGeoTransform)
    }

    pub fn dx(&self) -> FlowResult<f64> {
        Ok(self.require_transform()?.dx())
    }

    pub fn dy(&self) -> FlowResult<f64> {
        Ok(self.require_transform()?.dy())
    }

    pub fn extent(&self) -> FlowResult<[f64; 4]> {
        let (rows, cols) = self.shape();
        Ok(self.require_transform()?.extent(rows, cols))
    }

    // --- Accumulation ---

    /// Accumulated weights shaped like the grid; all-ones weights if `None`.
    pub fn accumulate(&self, weights: Option<ArrayView2<f64>>) -> FlowResult<Array2<f64>> {
        self.network.accumulate_grid(weights)
    }

    /// Drainage area in map units squared.
    pub fn drainage_area(&self) -> FlowResult<Array2<f64>> {
        let area = Array2::from_elem(self.shape(), self.require_transform()?.cell_area());
        self.accumulate(Some(area.view()))
    }

    // --- Network queries ---

    /// Channel segments where `field > threshold`, as node ids.
    pub fn channel_segments(&self, field: ArrayView2<f64>, threshold: f64) -> FlowResult<Vec<Vec<usize>>> {
        if field.dim() != self.shape() {
            return Err(FlowError::shape_mismatch("field", self.grid.len(), field.len()));
        }
        let flat: Vec<f64> = field.iter().copied().collect();
        network::channel_segments(&self.network, &flat, threshold)
    }

    /// Channel segments as coordinate polylines; needs a geotransform.
    pub fn channel_polylines(&self, field: ArrayView2<f64>, threshold: f64) -> FlowResult<Vec<Vec<(f64, f64)>>> {
        let transform = *self.require_transform()?;
        let segments = self.channel_segments(field, threshold)?;
        Ok(transform.segments_to_polylines(&segments, self.grid.cols()))
    }

    /// Downstream profile from `start`, using the geotransform's cell size.
    pub fn profile(&self, start: usize) -> FlowResult<Profile> {
        let t = self.require_transform()?;
        network::profile(&self.network, start, t.dx(), t.dy())
    }

    /// Profile with an explicit cell size, for plain-array accumulators.
    pub fn profile_with_cell_size(&self, start: usize, dx: f64, dy: f64) -> FlowResult<Profile> {
        network::profile(&self.network, start, dx, dy)
    }

    pub fn upstream_nodes(&self, node: usize) -> FlowResult<Vec<usize>> {
        network::upstream_nodes(&self.network, node)
    }

    pub fn node_to_rowcol(&self, node: usize) -> FlowResult<(usize, usize)> {
        self.grid.node_to_rowcol(node)
    }

    pub fn rowcol_to_node(&self, row: usize, col: usize) -> FlowResult<usize> {
        self.grid.rowcol_to_node(row, col)
    }

    pub fn node_to_coord(&self, node: usize) -> FlowResult<(f64, f64)> {
        let t = self.require_transform()?;
        FlowError::check_node(node, self.grid.len())?;
        Ok(t.node_to_coord(node, self.grid.cols()))
    }

    pub fn coord_to_node(&self, x: f64, y: f64) -> FlowResult<usize> {
        let (rows, cols) = self.shape();
        self.require_transform()?.coord_to_node(x, y, rows, cols)
    }

    // --- Point-source impact ---

    /// Count of upstream active sources at every cell.
    pub fn downstream_impact(&self, sources: &[PointSource]) -> FlowResult<Array2<f64>> {
        let (rows, cols) = self.shape();
        let located = sources::locate_sources(sources, self.require_transform()?, rows, cols);
        let impact = sources::downstream_impact(&self.network, &located)?;
        Array2::from_shape_vec((rows, cols), impact).map_err(|e| FlowError::invalid_shape(e.to_string()))
    }

    /// Channel segments (node ids) of every reach below an active source.
    pub fn impacted_segments(&self, sources: &[PointSource], cfg: &ImpactConfig) -> FlowResult<Vec<Vec<usize>>> {
        cfg.validate()?;
        let impact = self.downstream_impact(sources)?;
        self.channel_segments(impact.view(), cfg.channel_threshold)
    }

    /// `impacted_segments` as coordinate polylines.
    pub fn impacted_channels(&self, sources: &[PointSource], cfg: &ImpactConfig) -> FlowResult<Vec<Vec<(f64, f64)>>> {
        let transform = *self.require_transform()?;
        let segments = self.impacted_segments(sources, cfg)?;
        Ok(transform.segments_to_polylines(&segments, self.grid.cols()))
    }

    pub fn downstream_info(&self, sources: &[PointSource]) -> FlowResult<BTreeMap<usize, ImpactInfo>> {
        let (rows, cols) = self.shape();
        let t = self.require_transform()?;
        let located = sources::locate_sources(sources, t, rows, cols);
        sources::downstream_info(&self.network, &located, t)
    }

    /// Sources upstream of the cell containing `(x, y)`.
    pub fn upstream_sources<'a>(&self, sources: &'a [PointSource], x: f64, y: f64) -> FlowResult<Vec<&'a PointSource>> {
        let (rows, cols) = self.shape();
        let t = self.require_transform()?;
        let node = t.coord_to_node(x, y, rows, cols)?;
        let located = sources::locate_sources(sources, t, rows, cols);
        sources::upstream_sources(&self.network, &located, node)
    }

    /// `(count, count per unit upstream area)` at `(x, y)`.
    pub fn count_upstream_sources(&self, sources: &[PointSource], x: f64, y: f64) -> FlowResult<(usize, f64)> {
        let (rows, cols) = self.shape();
        let t = self.require_transform()?;
        let node = t.coord_to_node(x, y, rows, cols)?;
        let located = sources::locate_sources(sources, t, rows, cols);
        sources::count_upstream_sources(&self.network, &located, node, t.cell_area())
    }

    pub fn snap_to_drainage(&self, x: f64, y: f64, cfg: &ImpactConfig) -> FlowResult<Option<(f64, f64)>> {
        cfg.validate()?;
        sources::snap_to_drainage(&self.network, self.require_transform()?, x, y, cfg.snap_area_threshold)
    }
}
