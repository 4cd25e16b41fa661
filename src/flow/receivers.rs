//! D8 codes → receiver array.

use rayon::prelude::*;

use crate::grid::FlowGrid;

/// Resolve every cell's receiver through a precomputed offset table.
///
/// A sink code, or a code pointing off the grid, yields a self-loop. Boundary
/// cells therefore never route flow out of the raster.
pub fn resolve_receivers(grid: &FlowGrid) -> Vec<usize> {
    let (rows, cols) = grid.shape();
    let table = grid.convention().offset_table();
    let codes = grid.codes();

    (0..rows * cols)
        .into_par_iter()
        .map(|i| {
            let r = i / cols;
            let c = i % cols;
            let (dr, dc) = table[codes[[r, c]] as usize];
            let nr = r as isize + dr;
            let nc = c as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                i
            } else {
                nr as usize * cols + nc as usize
            }
        })
        .collect()
}

/// Self-receivers in ascending id order.
pub fn baselevel_nodes(receivers: &[usize]) -> Vec<usize> {
    receivers
        .iter()
        .enumerate()
        .filter(|(i, &r)| *i == r)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodePolicy;
    use crate::grid::D8Convention;
    use ndarray::array;

    fn grid(codes: ndarray::Array2<i64>, convention: D8Convention) -> FlowGrid {
        FlowGrid::from_raw(&codes, convention, CodePolicy::Strict).unwrap()
    }

    #[test]
    fn test_each_direction_from_centre() {
        let expected = [(1, 5), (2, 8), (4, 7), (8, 6), (16, 3), (32, 0), (64, 1), (128, 2)];
        for (code, target) in expected {
            let mut codes = ndarray::Array2::<i64>::zeros((3, 3));
            codes[[1, 1]] = code;
            let receivers = resolve_receivers(&grid(codes, D8Convention::Esri));
            assert_eq!(receivers[4], target, "code {code}");
        }
    }

    #[test]
    fn test_whitebox_convention() {
        let mut codes = ndarray::Array2::<i64>::zeros((3, 3));
        codes[[1, 1]] = 1; // NE under Whitebox
        let receivers = resolve_receivers(&grid(codes, D8Convention::Whitebox));
        assert_eq!(receivers[4], 2);
    }

    #[test]
    fn test_outward_boundary_codes_become_sinks() {
        // Top row points N, right column points E, bottom-left points SW.
        let codes = array![[64, 64, 1], [4, 4, 1], [8, 1, 0]];
        let receivers = resolve_receivers(&grid(codes, D8Convention::Esri));
        assert_eq!(receivers, vec![0, 1, 2, 6, 7, 5, 6, 8, 8]);
        assert_eq!(baselevel_nodes(&receivers), vec![0, 1, 2, 5, 6, 8]);
    }

    #[test]
    fn test_self_loop_iff_baselevel() {
        let codes = array![[2, 4, 8], [1, 0, 16], [128, 64, 32]];
        let receivers = resolve_receivers(&grid(codes, D8Convention::Esri));
        assert!(receivers.iter().enumerate().all(|(i, &r)| r == 4 || i == 4));
        assert_eq!(baselevel_nodes(&receivers), vec![4]);
    }
}
