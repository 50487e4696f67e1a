//! Stand-in for the hydrological routing toolchain the SDR workflow
//! normally shells out to: depression filling, percent slope, D8 drainage
//! directions, and load-carrying flow accumulation. Enough to run the
//! connectivity pipeline end-to-end from a bare DEM.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;

use crate::direction::{DRAIN, step_len};
use crate::grid::Grid;

/// Entry for the priority-flood min-heap (inverted for BinaryHeap max behavior).
#[derive(Clone, Copy)]
struct FloodEntry {
    elev: f32,
    idx: u32,
}

impl PartialEq for FloodEntry {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}
impl Eq for FloodEntry {}

impl PartialOrd for FloodEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for FloodEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: reverse ordering so lowest elevation is popped first
        other.elev.partial_cmp(&self.elev).unwrap_or(Ordering::Equal)
    }
}

/// Barnes et al. priority-flood depression filling (in-place).
/// Seeds from the raster edge so every interior cell drains off the grid.
pub fn fill_depressions(elev: &mut Grid<f32>) {
    let w = elev.w;
    let h = elev.h;
    if w < 3 || h < 3 {
        return;
    }

    let mut visited = vec![false; w * h];
    let mut heap = BinaryHeap::new();

    for y in 0..h {
        for x in 0..w {
            if x == 0 || y == 0 || x == w - 1 || y == h - 1 {
                let i = y * w + x;
                visited[i] = true;
                heap.push(FloodEntry {
                    elev: elev.data[i],
                    idx: i as u32,
                });
            }
        }
    }

    while let Some(cell) = heap.pop() {
        let ci = cell.idx as usize;
        let cx = ci % w;
        let cy = ci / w;

        for &(dx, dy) in &DRAIN {
            let nx = cx as i32 + dx;
            let ny = cy as i32 + dy;
            if nx < 0 || nx >= w as i32 || ny < 0 || ny >= h as i32 {
                continue;
            }
            let ni = ny as usize * w + nx as usize;

            if visited[ni] {
                continue;
            }
            visited[ni] = true;

            // Raise to at least the spill elevation, plus a tiny epsilon so
            // filled flats still offer D8 a downhill direction.
            if elev.data[ni] < cell.elev {
                elev.data[ni] = cell.elev + 1e-5;
            }
            heap.push(FloodEntry {
                elev: elev.data[ni],
                idx: ni as u32,
            });
        }
    }
}

/// Steepest-descent slope in percent: 100 × drop / run over the 8-neighbor
/// stencil. Cells with no downhill neighbor get 0.
pub fn slope_percent(elev: &Grid<f32>, cell_size: f32) -> Grid<f32> {
    let w = elev.w;
    let h = elev.h;
    let mut out = Grid::new(w, h);

    out.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let e = elev.get(x, y);
            let mut best = 0.0f32;
            for (d, &(dx, dy)) in DRAIN.iter().enumerate() {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || nx >= w as i32 || ny < 0 || ny >= h as i32 {
                    continue;
                }
                let run = step_len(d as u8 + 1) * cell_size;
                let s = (e - elev.get(nx as usize, ny as usize)) / run;
                if s > best {
                    best = s;
                }
            }
            row[x] = best * 100.0;
        }
    });

    out
}

/// Steepest-descent D8 drainage directions in the 1..=8 code convention
/// (1 = east, counterclockwise). 0 where no in-bounds neighbor is lower:
/// pits, flats, and cells pouring off the raster edge; exactly the
/// outlet/no-data marker the sanitizer expects.
pub fn flow_directions(elev: &Grid<f32>) -> Grid<i32> {
    let w = elev.w;
    let h = elev.h;
    let mut dirs = Grid::new(w, h);

    dirs.data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let e = elev.get(x, y);
            let mut best_code = 0i32;
            let mut best_slope = 0.0f32;

            for (d, &(dx, dy)) in DRAIN.iter().enumerate() {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || nx >= w as i32 || ny < 0 || ny >= h as i32 {
                    continue;
                }
                let slope =
                    (e - elev.get(nx as usize, ny as usize)) / step_len(d as u8 + 1);
                if slope > best_slope {
                    best_slope = slope;
                    best_code = d as i32 + 1;
                }
            }

            row[x] = best_code;
        }
    });

    dirs
}

/// Argsort cell indices by elevation, highest first.
fn argsort_descending(elev: &Grid<f32>) -> Vec<u32> {
    let mut indices: Vec<u32> = (0..elev.data.len() as u32).collect();
    indices.par_sort_unstable_by(|&a, &b| {
        elev.data[b as usize]
            .partial_cmp(&elev.data[a as usize])
            .unwrap_or(Ordering::Equal)
    });
    indices
}

/// Flow accumulation: traverse highest-to-lowest, each cell passing its own
/// load plus everything received from upstream to its drain target. With a
/// unit load this is the upslope cell count; with the weight or slope field
/// it is the weighted accumulation the connectivity index needs.
pub fn accumulate(elev: &Grid<f32>, dirs: &Grid<i32>, load: &Grid<f32>) -> Grid<f32> {
    debug_assert!(elev.same_dims(dirs) && elev.same_dims(load));
    let w = elev.w;
    let h = elev.h;

    let mut flow = Grid {
        data: load.data.clone(),
        w,
        h,
    };

    for &idx in &argsort_descending(elev) {
        let i = idx as usize;
        let code = dirs.data[i];
        if !(1..=8).contains(&code) {
            continue;
        }
        let (dx, dy) = DRAIN[code as usize - 1];
        let nx = (i % w) as i32 + dx;
        let ny = (i / w) as i32 + dy;
        if nx < 0 || nx >= w as i32 || ny < 0 || ny >= h as i32 {
            continue;
        }
        let ni = ny as usize * w + nx as usize;
        flow.data[ni] += flow.data[i];
    }

    flow
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x1 staircase falling east: 3 2 1 0.
    fn staircase() -> Grid<f32> {
        let mut g = Grid::new(4, 1);
        for x in 0..4 {
            g.set(x, 0, 3.0 - x as f32);
        }
        g
    }

    #[test]
    fn directions_follow_the_fall_line() {
        let dirs = flow_directions(&staircase());
        assert_eq!(dirs.get(0, 0), 1);
        assert_eq!(dirs.get(1, 0), 1);
        assert_eq!(dirs.get(2, 0), 1);
        // toe of the staircase: nothing lower in bounds
        assert_eq!(dirs.get(3, 0), 0);
    }

    #[test]
    fn accumulation_counts_upslope_cells() {
        let dem = staircase();
        let dirs = flow_directions(&dem);
        let acc = accumulate(&dem, &dirs, &Grid::filled(4, 1, 1.0));
        assert_eq!(acc.data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn slope_is_drop_over_run_in_percent() {
        let s = slope_percent(&staircase(), 10.0);
        // one meter drop over a 10 m orthogonal step
        assert!((s.get(1, 0) - 10.0).abs() < 1e-5);
        assert_eq!(s.get(3, 0), 0.0);
    }

    #[test]
    fn depression_filling_raises_the_pit() {
        let mut dem = Grid::filled(5, 5, 10.0);
        dem.set(2, 2, 1.0);
        fill_depressions(&mut dem);
        assert!(dem.get(2, 2) >= 10.0);
        // filled cell still drains: epsilon keeps it above the spill level
        let dirs = flow_directions(&dem);
        assert_ne!(dirs.get(2, 2), 0);
    }
}
