use log::warn;

use crate::error::GridError;
use crate::grid::Grid;

/// Marker for cells with no outgoing flow: true outlets, no-data cells,
/// and the padding border.
pub const SINK: u8 = 0;

/// Border width around engine grids. The inner ring acts as boundary sinks;
/// the outer ring keeps neighbor probes of inner-ring cells in bounds.
pub const PAD: usize = 2;

/// Flow direction codes use the r.watershed layout, 1 = east, going
/// counterclockwise:
///
/// ```text
///   4 3 2
///   5 . 1
///   6 7 8
/// ```
///
/// Odd codes are orthogonal steps, even codes diagonal. `DRAIN[d - 1]` is
/// the (dx, dy) offset a cell with code d sends its flow along (y grows
/// southward, image convention).
pub const DRAIN: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Reverse probe: the neighbor at `UPSTREAM[d - 1]` drains into me iff its
/// own code is d. Always the exact negation of `DRAIN`; a transcription
/// slip here silently corrupts every distance, hence the exhaustive test
/// below.
pub const UPSTREAM: [(i32, i32); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

/// Step length multiplier per code: 1 for the orthogonal four, sqrt(2) for
/// the diagonal four.
#[inline]
pub fn step_len(code: u8) -> f32 {
    if code % 2 == 1 {
        1.0
    } else {
        std::f32::consts::SQRT_2
    }
}

/// Normalize a raw drainage grid into explicit codes.
///
/// Upstream routing tools emit negative codes for cells possibly receiving
/// runoff from outside the region; both those and zero collapse into SINK.
/// The historical convention of reinterpreting the grid's post-clamp global
/// minimum as no-data misfires when every cell carries a legitimate code,
/// so SINK is an explicit value here and that situation only warns.
pub fn sanitize(raw: &Grid<i32>) -> Result<Grid<u8>, GridError> {
    if raw.w == 0 || raw.h == 0 {
        return Err(GridError::Degenerate { w: raw.w, h: raw.h });
    }

    let mut out = Grid::new(raw.w, raw.h);
    let mut sinks = 0usize;
    for y in 0..raw.h {
        for x in 0..raw.w {
            let code = raw.get(x, y);
            if code <= 0 {
                sinks += 1;
                // already SINK
            } else if code <= 8 {
                out.set(x, y, code as u8);
            } else {
                return Err(GridError::InvalidDirectionCode { code, x, y });
            }
        }
    }

    if sinks == 0 {
        warn!(
            "direction grid has no outlet or no-data cell; only the raster edge will drain"
        );
    }
    Ok(out)
}

/// Embed a sanitized direction grid in the SINK border.
pub fn pad(dirs: &Grid<u8>) -> Grid<u8> {
    dirs.embed(PAD, SINK)
}
