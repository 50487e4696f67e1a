use rayon::prelude::*;

use crate::config::Params;
use crate::error::GridError;
use crate::grid::Grid;

/// Connectivity index and sediment delivery ratio, elementwise outputs.
#[derive(Debug)]
pub struct SdrGrids {
    pub ic: Grid<f32>,
    pub sdr: Grid<f32>,
}

/// Combine the accumulation grids and the weighted flow length (D_down)
/// into the connectivity index and its logistic SDR transform:
///
/// ```text
/// C_mean = (AccW + W) / AccFinal
/// S_mean = (AccS + S) / AccFinal
/// D_up   = C_mean × S_mean × sqrt(AccFinal × cell²)
/// IC     = log10(D_up / D_down)
/// SDR    = SDRmax / (1 + exp((IC0 − IC) / k))
/// ```
///
/// Outlet-ring cells carry flow length 0; they are remapped to 1 before the
/// ratio so the logarithm stays finite. Unresolved flow-length cells (−1)
/// poison their IC/SDR to NaN, matching their no-data meaning.
pub fn assemble_sdr(
    acc_final: &Grid<f32>,
    acc_w: &Grid<f32>,
    acc_s: &Grid<f32>,
    weight: &Grid<f32>,
    slope_norm: &Grid<f32>,
    d_down: &Grid<f32>,
    cell_size: f32,
    params: &Params,
) -> Result<SdrGrids, GridError> {
    if acc_final.w == 0 || acc_final.h == 0 {
        return Err(GridError::Degenerate {
            w: acc_final.w,
            h: acc_final.h,
        });
    }
    for other in [
        (acc_w.w, acc_w.h),
        (acc_s.w, acc_s.h),
        (weight.w, weight.h),
        (slope_norm.w, slope_norm.h),
        (d_down.w, d_down.h),
    ] {
        if other != (acc_final.w, acc_final.h) {
            return Err(GridError::DimensionMismatch {
                expected: (acc_final.w, acc_final.h),
                got: other,
            });
        }
    }

    let w = acc_final.w;
    let h = acc_final.h;
    let cell_area = cell_size * cell_size;

    let mut ic = Grid::new(w, h);
    ic.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let i = y * w + x;
            let af = acc_final.data[i];
            let c_mean = (acc_w.data[i] + weight.data[i]) / af;
            let s_mean = (acc_s.data[i] + slope_norm.data[i]) / af;
            let d_up = c_mean * s_mean * (af * cell_area).sqrt();
            let dd = if d_down.data[i] == 0.0 {
                1.0
            } else {
                d_down.data[i]
            };
            row[x] = (d_up / dd).log10();
        }
    });

    let mut sdr = Grid::new(w, h);
    sdr.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let icv = ic.data[y * w + x];
            row[x] = params.sdr_max / (1.0 + ((params.ic0 - icv) / params.k).exp());
        }
    });

    Ok(SdrGrids { ic, sdr })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(v: f32) -> Grid<f32> {
        Grid::filled(1, 1, v)
    }

    /// IC exactly at IC0 must land on the logistic midpoint SDRmax/2 = 0.4.
    #[test]
    fn logistic_midpoint_is_half_sdrmax() {
        // AccFinal=1, AccW=0, W=1, AccS=0, S=1, cell=10 -> D_up = 10.
        // D_down = 10 / 10^0.5 makes IC = 0.5 = IC0.
        let d_down = single(10.0 / 10.0f32.sqrt());
        let grids = assemble_sdr(
            &single(1.0),
            &single(0.0),
            &single(0.0),
            &single(1.0),
            &single(1.0),
            &d_down,
            10.0,
            &Params::default(),
        )
        .unwrap();
        assert!((grids.ic.get(0, 0) - 0.5).abs() < 1e-6);
        assert!((grids.sdr.get(0, 0) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn zero_flow_length_is_remapped_before_the_ratio() {
        let grids = assemble_sdr(
            &single(1.0),
            &single(0.0),
            &single(0.0),
            &single(1.0),
            &single(1.0),
            &single(0.0),
            10.0,
            &Params::default(),
        )
        .unwrap();
        // D_up = 10, D_down remapped to 1 -> IC = 1 exactly
        assert!((grids.ic.get(0, 0) - 1.0).abs() < 1e-6);
        assert!(grids.sdr.get(0, 0).is_finite());
    }

    #[test]
    fn mismatched_inputs_rejected() {
        let err = assemble_sdr(
            &single(1.0),
            &Grid::filled(2, 1, 0.0),
            &single(0.0),
            &single(1.0),
            &single(1.0),
            &single(1.0),
            10.0,
            &Params::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GridError::DimensionMismatch {
                expected: (1, 1),
                got: (2, 1)
            }
        );
    }
}
