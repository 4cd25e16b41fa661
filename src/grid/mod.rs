//! D8 direction grid: the raster every other stage is derived from.
//!
//! Codes live in a single `Array2<u8>`; node ids are row-major flat indices
//! (`n = row * cols + col`). There is no per-node object.

use ndarray::{Array2, ArrayD};
use serde::{Deserialize, Serialize};

use crate::config::CodePolicy;
use crate::error::{FlowError, FlowResult};

/// Sink / no-flow code, shared by every supported convention.
pub const SINK: u8 = 0;

/// The eight single-bit D8 codes in ascending order.
pub const D8_CODES: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// (d_row, d_col) for each code in `D8_CODES`, ESRI layout: E, SE, S, SW, W, NW, N, NE.
const ESRI_OFFSETS: [(isize, isize); 8] = [
    (0, 1), (1, 1), (1, 0), (1, -1),
    (0, -1), (-1, -1), (-1, 0), (-1, 1),
];

/// Whitebox layout: NE, E, SE, S, SW, W, NW, N.
const WHITEBOX_OFFSETS: [(isize, isize); 8] = [
    (-1, 1), (0, 1), (1, 1), (1, 0),
    (1, -1), (0, -1), (-1, -1), (-1, 0),
];

/// Which bit means which neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum D8Convention {
    /// 1 E, 2 SE, 4 S, 8 SW, 16 W, 32 NW, 64 N, 128 NE.
    #[default]
    Esri,
    /// 1 NE, 2 E, 4 SE, 8 S, 16 SW, 32 W, 64 NW, 128 N.
    Whitebox,
}

impl D8Convention {
    fn offsets(self) -> &'static [(isize, isize); 8] {
        match self {
            Self::Esri => &ESRI_OFFSETS,
            Self::Whitebox => &WHITEBOX_OFFSETS,
        }
    }

    /// 256-entry code → offset table. Entry 0 and every invalid code map to (0, 0).
    pub fn offset_table(self) -> [(isize, isize); 256] {
        let mut table = [(0isize, 0isize); 256];
        for (code, &offset) in D8_CODES.iter().zip(self.offsets().iter()) {
            table[*code as usize] = offset;
        }
        table
    }
}

#[inline]
pub fn is_valid_code(code: i64) -> bool {
    code == 0 || (code > 0 && code <= 128 && (code & (code - 1)) == 0)
}

fn check_dims((rows, cols): (usize, usize)) -> FlowResult<(usize, usize)> {
    if rows == 0 || cols == 0 {
        return Err(FlowError::invalid_shape(format!("grid is {rows}x{cols}")));
    }
    Ok((rows, cols))
}

fn report_rewritten(count: usize) {
    if count > 0 {
        log::warn!("{count} cells carried unknown D8 codes; treated as sinks");
    }
}

/// Direction codes plus the convention that interprets them.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowGrid {
    codes: Array2<u8>,
    convention: D8Convention,
}

impl FlowGrid {
    /// Wrap an already-typed code array, validated in place under `policy`.
    pub fn new(mut codes: Array2<u8>, convention: D8Convention, policy: CodePolicy) -> FlowResult<Self> {
        check_dims(codes.dim())?;
        let mut rewritten = 0usize;
        for ((r, c), code) in codes.indexed_iter_mut() {
            if is_valid_code(i64::from(*code)) {
                continue;
            }
            match policy {
                CodePolicy::Strict => {
                    return Err(FlowError::InvalidDirectionCode { row: r, col: c, code: i64::from(*code) });
                }
                CodePolicy::Lenient => {
                    *code = SINK;
                    rewritten += 1;
                }
            }
        }
        report_rewritten(rewritten);
        Ok(Self { codes, convention })
    }

    /// Build from any integer raster, e.g. an `i32` band handed over by a reader.
    pub fn from_raw<T>(raw: &Array2<T>, convention: D8Convention, policy: CodePolicy) -> FlowResult<Self>
    where
        T: Copy + Into<i64>,
    {
        let (rows, cols) = check_dims(raw.dim())?;
        let mut rewritten = 0usize;
        let mut codes = Array2::<u8>::zeros((rows, cols));
        for ((r, c), &value) in raw.indexed_iter() {
            let code: i64 = value.into();
            if is_valid_code(code) {
                codes[[r, c]] = code as u8;
                continue;
            }
            match policy {
                CodePolicy::Strict => {
                    return Err(FlowError::InvalidDirectionCode { row: r, col: c, code });
                }
                CodePolicy::Lenient => rewritten += 1,
            }
        }
        report_rewritten(rewritten);
        Ok(Self { codes, convention })
    }

    /// Build from a flat row-major buffer.
    pub fn from_shape_vec(
        rows: usize,
        cols: usize,
        codes: Vec<i64>,
        convention: D8Convention,
        policy: CodePolicy,
    ) -> FlowResult<Self> {
        if codes.len() != rows * cols {
            return Err(FlowError::invalid_shape(format!(
                "{} codes cannot fill a {rows}x{cols} grid",
                codes.len()
            )));
        }
        let raw = Array2::from_shape_vec((rows, cols), codes)
            .map_err(|e| FlowError::invalid_shape(e.to_string()))?;
        Self::from_raw(&raw, convention, policy)
    }

    /// Build from an array of unknown dimensionality; anything but 2D is rejected.
    pub fn from_dyn(raw: ArrayD<i64>, convention: D8Convention, policy: CodePolicy) -> FlowResult<Self> {
        if raw.ndim() != 2 {
            return Err(FlowError::invalid_shape(format!(
                "D8 array must be 2D, got {} dimensions",
                raw.ndim()
            )));
        }
        let raw = raw
            .into_dimensionality::<ndarray::Ix2>()
            .map_err(|e| FlowError::invalid_shape(e.to_string()))?;
        Self::from_raw(&raw, convention, policy)
    }

    #[inline]
    pub fn codes(&self) -> &Array2<u8> {
        &self.codes
    }

    #[inline]
    pub fn convention(&self) -> D8Convention {
        self.convention
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.codes.nrows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.codes.ncols()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.codes.dim()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows() && col < self.cols()
    }

    pub fn node_to_rowcol(&self, node: usize) -> FlowResult<(usize, usize)> {
        FlowError::check_node(node, self.len())?;
        Ok((node / self.cols(), node % self.cols()))
    }

    pub fn rowcol_to_node(&self, row: usize, col: usize) -> FlowResult<usize> {
        if !self.contains(row, col) {
            return Err(FlowError::CellOutOfRange {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(row * self.cols() + col)
    }

    /// Flat row-major copy of the codes.
    pub fn flat_codes(&self) -> Vec<u8> {
        self.codes.iter().copied().collect()
    }
}
