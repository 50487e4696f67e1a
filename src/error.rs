use thiserror::Error;

/// Errors surfaced by grid preparation and the flow-length engine.
///
/// All variants are fatal data or configuration defects: the traversal is
/// deterministic, so nothing here is worth retrying. Cells the wavefront
/// never reaches are NOT an error; they are counted in
/// [`crate::flowlength::FlowLength::unresolved`].
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("grid dimensions {got:?} do not match expected {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("degenerate grid: {w}x{h}")]
    Degenerate { w: usize, h: usize },

    #[error("invalid flow direction code {code} at ({x}, {y})")]
    InvalidDirectionCode { code: i32, x: usize, y: usize },

    #[error("wavefront exceeded {layers} layers, frontier at ({x}, {y}); direction grid is cyclic")]
    IterationCapExceeded { layers: usize, x: usize, y: usize },
}
