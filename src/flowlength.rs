use log::{debug, warn};
use rayon::prelude::*;

use crate::direction::{self, DRAIN, PAD, SINK, UPSTREAM, step_len};
use crate::error::GridError;
use crate::grid::Grid;
use crate::weights;

/// Unvisited marker in the distance grid. Sinks keep it by definition;
/// non-sink cells keep it only when the drainage graph is defective.
pub const UNRESOLVED: f32 = -1.0;

/// Output of the weighted flow-length engine.
#[derive(Debug)]
pub struct FlowLength {
    /// Weighted distance to the nearest outlet, original grid dimensions.
    pub distance: Grid<f32>,
    /// Non-sink cells the wavefront never reached, implying a cyclic or
    /// disconnected direction grid. Reported, not fatal: real drainage grids
    /// carry small defects at region edges.
    pub unresolved: usize,
    /// Wavefront layers finalized, the seed ring included.
    pub layers: usize,
}

/// Distance rule for the layer being finalized.
///
/// Cells draining straight into an outlet carry distance 0, and so does the
/// next ring upstream of them: flow length measures from the outlet ring,
/// the pour points themselves accumulate nothing (TauDEM convention). A
/// fixed rule, not something the recurrence yields.
#[derive(Clone, Copy, PartialEq)]
enum Ring {
    First,
    Interior,
}

/// Weighted flow length to the nearest sink for every cell of a
/// single-flow-direction grid.
///
/// `directions` uses raw routing-tool codes (non-positive = outlet/no-data),
/// `slope_pct` is percent slope, `weight` the user weighting field. The
/// traversal cost per step is the mean routing weight of the two cells
/// travelled, times cell size, times sqrt(2) on diagonals.
pub fn compute_weighted_flow_length(
    directions: &Grid<i32>,
    weight: &Grid<f32>,
    slope_pct: &Grid<f32>,
    cell_size: f32,
) -> Result<FlowLength, GridError> {
    let dirs = direction::sanitize(directions)?;
    if !dirs.same_dims(weight) {
        return Err(GridError::DimensionMismatch {
            expected: (dirs.w, dirs.h),
            got: (weight.w, weight.h),
        });
    }
    let slope = weights::normalize_slope(slope_pct);
    let rw = weights::routing_weight(weight, &slope)?;

    let dirs = direction::pad(&dirs);
    let rw = rw.embed(PAD, 0.0);
    let (dist, unresolved, layers) = propagate(&dirs, &rw, cell_size)?;

    if unresolved > 0 {
        warn!("{unresolved} cells never reached by the wavefront (cyclic or disconnected drainage)");
    }
    debug!("flow length finalized in {layers} layers");

    Ok(FlowLength {
        distance: dist.strip(PAD),
        unresolved,
        layers,
    })
}

/// Multi-source reverse BFS over the padded grids.
///
/// A cell enters the frontier exactly once: it is discovered only through
/// its unique drain target, and each target is itself in the frontier for
/// exactly one layer. Within a layer every discovered cell reads only
/// already-finalized distances, so the layer is a data-parallel map; the
/// serial apply pass after the collect is the layer barrier.
fn propagate(
    dirs: &Grid<u8>,
    rw: &Grid<f32>,
    cell_size: f32,
) -> Result<(Grid<f32>, usize, usize), GridError> {
    let w = dirs.w;
    let h = dirs.h;
    let mut dist = Grid::filled(w, h, UNRESOLVED);

    // Seed ring: cells draining directly into a sink. For sink s and code d,
    // the neighbor at UPSTREAM[d - 1] drains into s iff it carries d. The
    // outer border row/column is skipped; it only exists so these probes
    // stay in bounds.
    let mut frontier: Vec<usize> = Vec::new();
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if dirs.get(x, y) != SINK {
                continue;
            }
            for (d, &(ux, uy)) in UPSTREAM.iter().enumerate() {
                let nx = (x as i32 + ux) as usize;
                let ny = (y as i32 + uy) as usize;
                if dirs.get(nx, ny) == d as u8 + 1 {
                    dist.set(nx, ny, 0.0);
                    frontier.push(ny * w + nx);
                }
            }
        }
    }

    let cap = w * h;
    let mut layers = usize::from(!frontier.is_empty());
    let mut ring = Ring::First;

    while !frontier.is_empty() {
        if layers > cap {
            let i = frontier[0];
            return Err(GridError::IterationCapExceeded {
                layers,
                x: (i % w).saturating_sub(PAD),
                y: (i / w).saturating_sub(PAD),
            });
        }

        // Discover the next ring: a neighbor joins iff its own drain code
        // points back at a frontier cell.
        let next: Vec<usize> = frontier
            .par_iter()
            .flat_map_iter(|&i| {
                let x = i % w;
                let y = i / w;
                UPSTREAM.iter().enumerate().filter_map(move |(d, &(ux, uy))| {
                    let nx = (x as i32 + ux) as usize;
                    let ny = (y as i32 + uy) as usize;
                    (dirs.get(nx, ny) == d as u8 + 1).then_some(ny * w + nx)
                })
            })
            .collect();

        let resolved: Vec<(usize, f32)> = match ring {
            Ring::First => next.par_iter().map(|&i| (i, 0.0)).collect(),
            Ring::Interior => next
                .par_iter()
                .map(|&i| {
                    let x = i % w;
                    let y = i / w;
                    let code = dirs.data[i];
                    let (dx, dy) = DRAIN[code as usize - 1];
                    let j = ((y as i32 + dy) as usize) * w + (x as i32 + dx) as usize;
                    let step = step_len(code) * cell_size;
                    (i, dist.data[j] + step * (rw.data[i] + rw.data[j]) * 0.5)
                })
                .collect(),
        };
        for (i, v) in resolved {
            dist.data[i] = v;
        }

        if !next.is_empty() {
            layers += 1;
        }
        ring = Ring::Interior;
        frontier = next;
    }

    let mut unresolved = 0usize;
    for y in PAD..h - PAD {
        for x in PAD..w - PAD {
            if dirs.get(x, y) != SINK && dist.get(x, y) == UNRESOLVED {
                unresolved += 1;
            }
        }
    }

    Ok((dist, unresolved, layers))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: f32 = 10.0;

    /// weight 1, slope 50% everywhere -> routing weight 1/(1*0.5) = 2.
    fn uniform_inputs(w: usize, h: usize) -> (Grid<f32>, Grid<f32>) {
        (Grid::filled(w, h, 1.0), Grid::filled(w, h, 50.0))
    }

    #[test]
    fn straight_path_arithmetic() {
        // Middle row drains east; (2,1) pours off the east edge. Ring cells
        // (2,1) and (1,1) are 0, then one orthogonal step at weight average
        // (2+2)/2 = 2: 10 * 2 = 20.
        let mut dirs = Grid::filled(3, 3, 0i32);
        dirs.set(0, 1, 1);
        dirs.set(1, 1, 1);
        dirs.set(2, 1, 1);
        let (weight, slope) = uniform_inputs(3, 3);

        let fl = compute_weighted_flow_length(&dirs, &weight, &slope, CELL).unwrap();
        assert_eq!(fl.distance.get(2, 1), 0.0);
        assert_eq!(fl.distance.get(1, 1), 0.0);
        assert_eq!(fl.distance.get(0, 1), 20.0);
        assert_eq!(fl.unresolved, 0);
        assert_eq!(fl.layers, 3);
    }

    #[test]
    fn diagonal_chain_scales_by_sqrt2() {
        // (0,0) -> (1,1) -> (2,2) -> off the corner. The first-ring rule
        // zeroes (2,2) and (1,1); (0,0) takes one diagonal step.
        let mut dirs = Grid::filled(3, 3, 0i32);
        dirs.set(0, 0, 8);
        dirs.set(1, 1, 8);
        dirs.set(2, 2, 8);
        let (weight, slope) = uniform_inputs(3, 3);

        let fl = compute_weighted_flow_length(&dirs, &weight, &slope, CELL).unwrap();
        assert_eq!(fl.distance.get(2, 2), 0.0);
        assert_eq!(fl.distance.get(1, 1), 0.0);
        let expected = CELL * std::f32::consts::SQRT_2 * 2.0;
        assert!((fl.distance.get(0, 0) - expected).abs() < 1e-4);
    }

    #[test]
    fn two_cycle_stays_unresolved() {
        // (1, 2) and (2, 2) drain into each other; neither can ever be
        // discovered, both must keep the sentinel and be reported.
        let mut dirs = Grid::filled(5, 5, 0i32);
        dirs.set(1, 2, 1);
        dirs.set(2, 2, 5);
        let (weight, slope) = uniform_inputs(5, 5);

        let fl = compute_weighted_flow_length(&dirs, &weight, &slope, CELL).unwrap();
        assert_eq!(fl.unresolved, 2);
        assert_eq!(fl.distance.get(1, 2), UNRESOLVED);
        assert_eq!(fl.distance.get(2, 2), UNRESOLVED);
    }

    #[test]
    fn runs_are_bit_identical() {
        let mut dirs = Grid::filled(4, 4, 0i32);
        // two short tributaries meeting a southbound trunk
        dirs.set(1, 0, 7);
        dirs.set(1, 1, 7);
        dirs.set(1, 2, 7);
        dirs.set(1, 3, 7);
        dirs.set(0, 1, 1);
        dirs.set(2, 2, 5);
        let weight = Grid::filled(4, 4, 0.7);
        let slope = Grid::filled(4, 4, 35.0);

        let a = compute_weighted_flow_length(&dirs, &weight, &slope, CELL).unwrap();
        let b = compute_weighted_flow_length(&dirs, &weight, &slope, CELL).unwrap();
        assert_eq!(a.distance.data, b.distance.data);
        assert_eq!(a.layers, b.layers);
    }

    #[test]
    fn sinks_keep_the_sentinel() {
        let mut dirs = Grid::filled(3, 3, 0i32);
        dirs.set(1, 1, 1);
        let (weight, slope) = uniform_inputs(3, 3);
        let fl = compute_weighted_flow_length(&dirs, &weight, &slope, CELL).unwrap();
        assert_eq!(fl.distance.get(0, 0), UNRESOLVED);
        assert_eq!(fl.distance.get(1, 1), 0.0);
        assert_eq!(fl.unresolved, 0);
    }

    #[test]
    fn mismatched_weight_grid_rejected() {
        let dirs = Grid::filled(3, 3, 0i32);
        let weight = Grid::filled(2, 2, 1.0);
        let slope = Grid::filled(3, 3, 50.0);
        let err = compute_weighted_flow_length(&dirs, &weight, &slope, CELL).unwrap_err();
        assert_eq!(
            err,
            GridError::DimensionMismatch {
                expected: (3, 3),
                got: (2, 2)
            }
        );
    }
}
