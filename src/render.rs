use rayon::prelude::*;

use crate::flowlength::UNRESOLVED;
use crate::grid::Grid;

// Hypsometric ramp for the demo DEM
const LAND_LOW: [u8; 4] = [70, 130, 62, 255];
const LAND_MID: [u8; 4] = [140, 180, 100, 255];
const LAND_HIGH: [u8; 4] = [190, 170, 120, 255];
const MOUNTAIN: [u8; 4] = [220, 220, 215, 255];

// Flow length: short paths (well connected) bright, long paths dark
const FLOW_NEAR: [u8; 4] = [235, 245, 255, 255];
const FLOW_FAR: [u8; 4] = [15, 40, 140, 255];
const NODATA_GRAY: [u8; 4] = [40, 40, 40, 255];

// Diverging IC ramp: negative blue, zero white, positive red
const IC_NEG: [u8; 4] = [40, 80, 200, 255];
const IC_ZERO: [u8; 4] = [245, 245, 245, 255];
const IC_POS: [u8; 4] = [200, 40, 40, 255];

// SDR ramp, 0 -> SDRmax
const SDR_LOW: [u8; 4] = [250, 240, 180, 255];
const SDR_MID: [u8; 4] = [230, 140, 50, 255];
const SDR_HIGH: [u8; 4] = [150, 20, 30, 255];

#[inline]
fn lerp_color(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t).round() as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t).round() as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t).round() as u8,
        255,
    ]
}

/// Hypsometric DEM render, normalized to the grid's own range.
pub fn render_dem(dem: &Grid<f32>) -> Vec<u8> {
    let min_e = dem.data.iter().cloned().fold(f32::INFINITY, f32::min);
    let max_e = dem.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let range = (max_e - min_e).max(1.0);
    let w = dem.w;
    let mut rgba = vec![0u8; w * dem.h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let t = (dem.get(x, y) - min_e) / range;
            let color = if t < 0.35 {
                lerp_color(LAND_LOW, LAND_MID, t / 0.35)
            } else if t < 0.7 {
                lerp_color(LAND_MID, LAND_HIGH, (t - 0.35) / 0.35)
            } else {
                lerp_color(LAND_HIGH, MOUNTAIN, (t - 0.7) / 0.3)
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

/// Grayscale percent-slope render, normalized to the observed maximum.
pub fn render_slope(slope_pct: &Grid<f32>) -> Vec<u8> {
    let max_s = slope_pct.data.iter().cloned().fold(0.0f32, f32::max).max(1.0);
    let w = slope_pct.w;
    let mut rgba = vec![0u8; w * slope_pct.h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let v = ((slope_pct.get(x, y) / max_s) * 255.0).clamp(0.0, 255.0) as u8;
            row[x * 4..x * 4 + 4].copy_from_slice(&[v, v, v, 255]);
        }
    });

    rgba
}

/// Weighted flow length, log-scaled (path lengths span orders of magnitude).
/// Unresolved cells and sinks render dark gray.
pub fn render_flow_length(dist: &Grid<f32>) -> Vec<u8> {
    let max_d = dist.data.iter().cloned().fold(0.0f32, f32::max).max(1.0);
    let log_max = (1.0 + max_d).ln();
    let w = dist.w;
    let mut rgba = vec![0u8; w * dist.h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let d = dist.get(x, y);
            let color = if d == UNRESOLVED || !d.is_finite() {
                NODATA_GRAY
            } else {
                let t = (1.0 + d).ln() / log_max;
                lerp_color(FLOW_NEAR, FLOW_FAR, t)
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

/// Diverging connectivity-index render, clamped to ±3 around zero.
pub fn render_ic(ic: &Grid<f32>) -> Vec<u8> {
    let w = ic.w;
    let mut rgba = vec![0u8; w * ic.h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let v = ic.get(x, y);
            let color = if !v.is_finite() {
                NODATA_GRAY
            } else if v < 0.0 {
                lerp_color(IC_ZERO, IC_NEG, (-v / 3.0).min(1.0))
            } else {
                lerp_color(IC_ZERO, IC_POS, (v / 3.0).min(1.0))
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}

/// SDR render over the delivery-ratio range [0, sdr_max].
pub fn render_sdr(sdr: &Grid<f32>, sdr_max: f32) -> Vec<u8> {
    let w = sdr.w;
    let scale = sdr_max.max(1e-6);
    let mut rgba = vec![0u8; w * sdr.h * 4];

    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let v = sdr.get(x, y);
            let color = if !v.is_finite() {
                NODATA_GRAY
            } else {
                let t = (v / scale).clamp(0.0, 1.0);
                if t < 0.5 {
                    lerp_color(SDR_LOW, SDR_MID, t / 0.5)
                } else {
                    lerp_color(SDR_MID, SDR_HIGH, (t - 0.5) / 0.5)
                }
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}
