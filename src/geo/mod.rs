//! Optional georeferencing layered on top of node ids.
//!
//! A north-up affine transform (no rotation terms), in the same layout a raster
//! reader reports: origin at the upper-left corner of the upper-left pixel,
//! `pixel_height` negative for north-up rasters. Nothing in `flow` depends on it.

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, FlowResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> FlowResult<Self> {
        if pixel_width == 0.0 || pixel_height == 0.0 || !pixel_width.is_finite() || !pixel_height.is_finite() {
            return Err(FlowError::invalid_config("pixel size must be finite and non-zero"));
        }
        Ok(Self { origin_x, origin_y, pixel_width, pixel_height })
    }

    /// Six-term GDAL layout `[ulx, dx, rot, uly, rot, dy]`; rotation terms must be 0.
    pub fn from_gdal(gt: [f64; 6]) -> FlowResult<Self> {
        if gt[2] != 0.0 || gt[4] != 0.0 {
            return Err(FlowError::invalid_config("rotated geotransforms are not supported"));
        }
        Self::new(gt[0], gt[3], gt[1], gt[5])
    }

    #[inline]
    pub fn dx(&self) -> f64 {
        self.pixel_width.abs()
    }

    #[inline]
    pub fn dy(&self) -> f64 {
        self.pixel_height.abs()
    }

    #[inline]
    pub fn cell_area(&self) -> f64 {
        self.dx() * self.dy()
    }

    /// Centre of the pixel at `node` in a grid with `cols` columns.
    pub fn node_to_coord(&self, node: usize, cols: usize) -> (f64, f64) {
        let col = (node % cols) as f64;
        let row = (node / cols) as f64;
        (
            self.origin_x + self.pixel_width * (col + 0.5),
            self.origin_y + self.pixel_height * (row + 0.5),
        )
    }

    /// Pixel containing `(x, y)`. Points left of or above the raster, even by a
    /// fraction of a pixel, are out of range.
    pub fn coord_to_node(&self, x: f64, y: f64, rows: usize, cols: usize) -> FlowResult<usize> {
        let col = ((x - self.origin_x) / self.pixel_width).floor();
        let row = ((y - self.origin_y) / self.pixel_height).floor();
        if !(col >= 0.0 && row >= 0.0 && (col as usize) < cols && (row as usize) < rows) {
            return Err(FlowError::CoordinateOutOfRange { x, y });
        }
        Ok(row as usize * cols + col as usize)
    }

    pub fn nodes_to_coords(&self, nodes: &[usize], cols: usize) -> Vec<(f64, f64)> {
        nodes.iter().map(|&n| self.node_to_coord(n, cols)).collect()
    }

    /// `[xmin, xmax, ymin, ymax]` of a `rows`×`cols` raster.
    pub fn extent(&self, rows: usize, cols: usize) -> [f64; 4] {
        let x0 = self.origin_x;
        let x1 = self.origin_x + self.pixel_width * cols as f64;
        let y0 = self.origin_y;
        let y1 = self.origin_y + self.pixel_height * rows as f64;
        [x0.min(x1), x0.max(x1), y0.min(y1), y0.max(y1)]
    }

    /// Node-id segments to coordinate polylines (one vertex per pixel centre).
    pub fn segments_to_polylines(&self, segments: &[Vec<usize>], cols: usize) -> Vec<Vec<(f64, f64)>> {
        segments.iter().map(|s| self.nodes_to_coords(s, cols)).collect()
    }
}
