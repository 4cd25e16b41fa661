//! Error type shared by every stage of the drainage pipeline.
//!
//! All failures are local and deterministic: a bad grid or a bad index stays bad,
//! so nothing here is retryable.

use thiserror::Error;

pub type FlowResult<T> = Result<T, FlowError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// Direction grid is not a non-empty 2D array.
    #[error("invalid grid shape: {message}")]
    InvalidShape { message: String },

    /// A per-node array does not line up with the node count.
    #[error("size mismatch: {name} expected {expected} values, got {actual}")]
    ShapeMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid D8 direction code {code} at row {row}, col {col}")]
    InvalidDirectionCode { row: usize, col: usize, code: i64 },

    #[error("node {node} out of range 0..{len}")]
    NodeOutOfRange { node: usize, len: usize },

    #[error("cell ({row}, {col}) out of range for {rows}x{cols} grid")]
    CellOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("coordinate ({x}, {y}) lies outside the grid")]
    CoordinateOutOfRange { x: f64, y: f64 },

    /// Some nodes never drain to a baselevel node.
    #[error("receivers contain a cycle: {unvisited} nodes unreachable from any outlet")]
    CyclicReceivers { unvisited: usize },

    #[error("operation requires a geotransform but none is attached")]
    MissingGeoTransform,

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl FlowError {
    pub fn invalid_shape(message: impl Into<String>) -> Self {
        Self::InvalidShape { message: message.into() }
    }

    pub fn shape_mismatch(name: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch { name, expected, actual }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// Guard used wherever a caller hands in a per-node array.
    pub(crate) fn check_len(name: &'static str, expected: usize, actual: usize) -> FlowResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::shape_mismatch(name, expected, actual))
        }
    }

    pub(crate) fn check_node(node: usize, len: usize) -> FlowResult<()> {
        if node < len {
            Ok(())
        } else {
            Err(Self::NodeOutOfRange { node, len })
        }
    }
}
