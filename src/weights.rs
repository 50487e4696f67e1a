use rayon::prelude::*;

use crate::error::GridError;
use crate::grid::Grid;

/// Replacement for exact-zero weights so the reciprocal stays finite.
pub const WEIGHT_EPS: f32 = 1e-10;

/// Clamp range for the normalized slope.
pub const SLOPE_MIN: f32 = 0.005;
pub const SLOPE_MAX: f32 = 1.0;

/// No-data marker carried through from negative input slopes.
pub const SLOPE_NODATA: f32 = -1.0;

/// Percent slope -> normalized [0, 1], clamped to [0.005, 1].
/// Negative input (no-data) collapses to the -1 sentinel.
pub fn normalize_slope(slope_pct: &Grid<f32>) -> Grid<f32> {
    let w = slope_pct.w;
    let mut out = Grid::new(w, slope_pct.h);
    out.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let s = slope_pct.get(x, y) / 100.0;
            row[x] = if s < 0.0 {
                SLOPE_NODATA
            } else {
                s.clamp(SLOPE_MIN, SLOPE_MAX)
            };
        }
    });
    out
}

/// Per-cell routing cost 1 / (weight × slope), the denominator of the
/// downslope component.
///
/// No-data slope cells carry NaN. They coincide with SINK cells in the
/// direction grid and never participate in the traversal; an explicit NaN
/// beats the historical trick of NaN-ing whatever the grid minimum is.
pub fn routing_weight(weight: &Grid<f32>, slope_norm: &Grid<f32>) -> Result<Grid<f32>, GridError> {
    if weight.w == 0 || weight.h == 0 {
        return Err(GridError::Degenerate {
            w: weight.w,
            h: weight.h,
        });
    }
    if !weight.same_dims(slope_norm) {
        return Err(GridError::DimensionMismatch {
            expected: (weight.w, weight.h),
            got: (slope_norm.w, slope_norm.h),
        });
    }

    let w = weight.w;
    let mut out = Grid::new(w, weight.h);
    out.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let s = slope_norm.get(x, y);
            row[x] = if s < 0.0 {
                f32::NAN
            } else {
                1.0 / (weight.get(x, y).max(WEIGHT_EPS) * s)
            };
        }
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(v: f32) -> Grid<f32> {
        Grid::filled(1, 1, v)
    }

    #[test]
    fn slope_normalization_clamps_and_keeps_nodata() {
        let mut pct = Grid::new(4, 1);
        pct.set(0, 0, 50.0);
        pct.set(1, 0, 0.1);
        pct.set(2, 0, 250.0);
        pct.set(3, 0, -5.0);
        let s = normalize_slope(&pct);
        assert_eq!(s.get(0, 0), 0.5);
        assert_eq!(s.get(1, 0), SLOPE_MIN);
        assert_eq!(s.get(2, 0), SLOPE_MAX);
        assert_eq!(s.get(3, 0), SLOPE_NODATA);
    }

    #[test]
    fn routing_weight_is_reciprocal_of_product() {
        let rw = routing_weight(&single(1.0), &single(0.5)).unwrap();
        assert_eq!(rw.get(0, 0), 2.0);
    }

    #[test]
    fn zero_weight_replaced_by_epsilon() {
        let rw = routing_weight(&single(0.0), &single(1.0)).unwrap();
        assert_eq!(rw.get(0, 0), 1.0 / WEIGHT_EPS);
    }

    #[test]
    fn nodata_slope_marks_cell_invalid() {
        let rw = routing_weight(&single(1.0), &single(SLOPE_NODATA)).unwrap();
        assert!(rw.get(0, 0).is_nan());
    }

    #[test]
    fn mismatched_dims_rejected() {
        let err = routing_weight(&Grid::filled(2, 2, 1.0), &single(0.5)).unwrap_err();
        assert_eq!(
            err,
            GridError::DimensionMismatch {
                expected: (2, 2),
                got: (1, 1)
            }
        );
    }
}
