//! Synthetic inputs for the demo harness: a drainable DEM and a cover
//! weight field. Real deployments feed measured rasters instead; this keeps
//! the binaries runnable without any data download.

use rayon::prelude::*;

use crate::config::Params;
use crate::grid::Grid;

const SALT_DEM: u64 = 0xD33D_0001_CAFE_0001;
const SALT_WEIGHT: u64 = 0xC0FE_0002_BEEF_0002;

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[inline]
fn seed_u32(seed: u64, salt: u64) -> u32 {
    splitmix64(seed ^ salt) as u32
}

#[inline]
fn hash2(ix: i32, iy: i32, seed: u32) -> u32 {
    let mut h = seed ^ 0x9E3779B9;
    h ^= (ix as u32).wrapping_mul(0x85EBCA6B);
    h = h.wrapping_mul(0x7FEB352D);
    h ^= (iy as u32).wrapping_mul(0xC2B2AE35);
    h = h.wrapping_mul(0x846CA68B);
    h ^ (h >> 16)
}

#[inline]
fn smootherstep(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Lattice value in [-1, 1).
#[inline]
fn corner(ix: i32, iy: i32, seed: u32) -> f32 {
    (hash2(ix, iy, seed) >> 8) as f32 / 8_388_608.0 - 1.0
}

/// 2D value noise, smootherstep-blended.
#[inline]
fn value_noise(x: f32, y: f32, seed: u32) -> f32 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let fx = x - ix as f32;
    let fy = y - iy as f32;
    let sx = smootherstep(fx);
    let sy = smootherstep(fy);

    let a = lerp(corner(ix, iy, seed), corner(ix + 1, iy, seed), sx);
    let b = lerp(corner(ix, iy + 1, seed), corner(ix + 1, iy + 1, seed), sx);
    lerp(a, b, sy)
}

/// Fractal Brownian Motion, normalized to roughly [-1, 1].
fn fbm(x: f32, y: f32, seed: u32, octaves: u32, lac: f32, gain: f32) -> f32 {
    let mut sum = 0.0;
    let mut amp = 1.0;
    let mut freq = 1.0;
    let mut norm = 0.0;
    for i in 0..octaves {
        sum += value_noise(x * freq, y * freq, seed.wrapping_add(i)) * amp;
        norm += amp;
        amp *= gain;
        freq *= lac;
    }
    if norm > 0.0 { sum / norm } else { 0.0 }
}

/// Synthetic DEM: fBM relief over a coastward tilt. The south edge is the
/// outlet coast, so every drainage path has somewhere to go.
pub fn synthetic_dem(w: usize, h: usize, seed: u64, params: &Params) -> Grid<f32> {
    let noise_seed = seed_u32(seed, SALT_DEM);
    let mut dem = Grid::new(w, h);

    dem.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let ny = y as f32 / h as f32;
        for x in 0..w {
            let nx = x as f32 / w as f32;
            let n = fbm(nx * 5.0, ny * 5.0, noise_seed, 5, 2.0, 0.5);
            let base = (1.0 - ny) * params.tilt;
            let detail = params.detail_amp * (n * 0.5 + 0.5);
            row[x] = params.relief * (base + detail) + 1.0;
        }
    });

    dem
}

/// Synthetic cover/management weight in (0, 1], C-factor-like: low on
/// "vegetated" noise highs, near 1 on bare ground.
pub fn synthetic_weight(w: usize, h: usize, seed: u64) -> Grid<f32> {
    let noise_seed = seed_u32(seed, SALT_WEIGHT);
    let mut weight = Grid::new(w, h);

    weight.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        let ny = y as f32 / h as f32;
        for x in 0..w {
            let nx = x as f32 / w as f32;
            let n = fbm(nx * 8.0, ny * 8.0, noise_seed, 4, 2.0, 0.5) * 0.5 + 0.5;
            row[x] = 0.05 + 0.95 * n.clamp(0.0, 1.0);
        }
    });

    weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dem_is_deterministic_and_positive() {
        let p = Params::default();
        let a = synthetic_dem(32, 32, 7, &p);
        let b = synthetic_dem(32, 32, 7, &p);
        assert_eq!(a.data, b.data);
        assert!(a.data.iter().all(|&e| e > 0.0));
    }

    #[test]
    fn weight_stays_in_unit_range() {
        let w = synthetic_weight(32, 32, 7);
        assert!(w.data.iter().all(|&v| v > 0.0 && v <= 1.0));
    }
}
