pub mod config;
pub mod direction;
pub mod error;
pub mod flowlength;
pub mod grid;
pub mod render;
pub mod routing;
pub mod sdr;
pub mod terrain;
pub mod weights;

use std::time::Instant;

use log::info;

use config::Params;
use error::GridError;
use flowlength::FlowLength;
use grid::Grid;

/// Everything one SDR run produces, intermediate grids included; the demo
/// binaries render most of them as diagnostic layers.
#[derive(Debug)]
pub struct SdrMap {
    pub w: usize,
    pub h: usize,
    pub dem: Grid<f32>,
    pub slope_pct: Grid<f32>,
    pub directions: Grid<i32>,
    pub acc: Grid<f32>,
    pub flow_length: FlowLength,
    pub ic: Grid<f32>,
    pub sdr: Grid<f32>,
}

#[derive(Debug)]
pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// Full SDR pipeline on a DEM and a weight field:
/// fill → slope → D8 directions → 3× accumulation → weighted flow length →
/// connectivity assembly.
pub fn compute_sdr(
    dem: &Grid<f32>,
    weight: &Grid<f32>,
    cell_size: f32,
    params: &Params,
) -> Result<(SdrMap, Vec<Timing>), GridError> {
    if !dem.same_dims(weight) {
        return Err(GridError::DimensionMismatch {
            expected: (dem.w, dem.h),
            got: (weight.w, weight.h),
        });
    }

    let mut timings = Vec::new();
    let total_start = Instant::now();

    // 1. Depression filling so every cell has a path off the raster
    let t = Instant::now();
    let mut dem = dem.clone();
    routing::fill_depressions(&mut dem);
    timings.push(Timing {
        name: "fill",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    // 2. Percent slope
    let t = Instant::now();
    let slope_pct = routing::slope_percent(&dem, cell_size);
    timings.push(Timing {
        name: "slope",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    // 3. D8 drainage directions
    let t = Instant::now();
    let directions = routing::flow_directions(&dem);
    timings.push(Timing {
        name: "flow_dir",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    // 4. Accumulation: plain (upslope count), weighted, slope-weighted
    let t = Instant::now();
    let slope_norm = weights::normalize_slope(&slope_pct);
    let ones = Grid::filled(dem.w, dem.h, 1.0);
    let acc = routing::accumulate(&dem, &directions, &ones);
    let acc_w = routing::accumulate(&dem, &directions, weight);
    let acc_s = routing::accumulate(&dem, &directions, &slope_norm);
    timings.push(Timing {
        name: "accumulation",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    // 5. Weighted flow length (D_down)
    let t = Instant::now();
    let flow_length =
        flowlength::compute_weighted_flow_length(&directions, weight, &slope_pct, cell_size)?;
    timings.push(Timing {
        name: "flow_length",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });
    info!(
        "flow length: {} layers, {} unresolved cells",
        flow_length.layers, flow_length.unresolved
    );

    // 6. Connectivity index + SDR
    let t = Instant::now();
    let grids = sdr::assemble_sdr(
        &acc,
        &acc_w,
        &acc_s,
        weight,
        &slope_norm,
        &flow_length.distance,
        cell_size,
        params,
    )?;
    timings.push(Timing {
        name: "sdr",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    timings.push(Timing {
        name: "TOTAL",
        ms: total_start.elapsed().as_secs_f64() * 1000.0,
    });

    let map = SdrMap {
        w: dem.w,
        h: dem.h,
        dem,
        slope_pct,
        directions,
        acc,
        flow_length,
        ic: grids.ic,
        sdr: grids.sdr,
    };

    Ok((map, timings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DRAIN;
    use crate::flowlength::UNRESOLVED;

    fn small_run() -> SdrMap {
        let params = Params::default();
        let dem = terrain::synthetic_dem(48, 48, 1234, &params);
        let weight = terrain::synthetic_weight(48, 48, 1234);
        let (map, _) = compute_sdr(&dem, &weight, 10.0, &params).unwrap();
        map
    }

    #[test]
    fn pipeline_resolves_every_draining_cell() {
        // Steepest-descent directions are strictly downhill, so the drainage
        // graph is acyclic and the wavefront must reach every non-sink cell.
        let map = small_run();
        assert_eq!(map.flow_length.unresolved, 0);
        for y in 0..map.h {
            for x in 0..map.w {
                if map.directions.get(x, y) > 0 {
                    assert!(map.flow_length.distance.get(x, y) >= 0.0, "({x},{y})");
                }
            }
        }
    }

    #[test]
    fn flow_length_decreases_downstream() {
        let map = small_run();
        let dist = &map.flow_length.distance;
        for y in 0..map.h {
            for x in 0..map.w {
                let code = map.directions.get(x, y);
                if code <= 0 {
                    continue;
                }
                let (dx, dy) = DRAIN[code as usize - 1];
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || nx >= map.w as i32 || ny < 0 || ny >= map.h as i32 {
                    continue;
                }
                let down = dist.get(nx as usize, ny as usize);
                if down == UNRESOLVED {
                    continue; // drains into a sink
                }
                assert!(
                    dist.get(x, y) + 1e-3 >= down,
                    "distance must not shrink upstream at ({x},{y})"
                );
            }
        }
    }

    #[test]
    fn mismatched_inputs_rejected() {
        let params = Params::default();
        let dem = terrain::synthetic_dem(16, 16, 1, &params);
        let weight = terrain::synthetic_weight(8, 8, 1);
        let err = compute_sdr(&dem, &weight, 10.0, &params).unwrap_err();
        assert_eq!(
            err,
            GridError::DimensionMismatch {
                expected: (16, 16),
                got: (8, 8)
            }
        );
    }
}
