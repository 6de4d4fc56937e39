//! Error types for SIM raw-data analysis.

use thiserror::Error;

/// Errors raised by index arithmetic and by the pre-flight checks of the
/// analysis pipelines.
///
/// Per-plane measurement failures (no sideband pair, too few unbroken phase
/// samples) are not errors; they surface as NaN or `None` in the results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Position {position} on axis {axis} is outside of range 1-{size}")]
    InvalidCoordinate {
        axis: usize,
        position: usize,
        size: usize,
    },

    #[error("Linear index {index} is outside of range 1-{total}")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("Invalid range {first}-{last} on axis {axis} of size {size}")]
    InvalidRange {
        axis: usize,
        size: usize,
        first: usize,
        last: usize,
    },

    #[error(
        "Raw SI stack of {slices} slices is not a multiple of phases*angles ({phases}*{angles})"
    )]
    InvalidDimensions {
        slices: usize,
        phases: usize,
        angles: usize,
    },

    #[error("Raw SI stack contains no slices")]
    EmptyStack,
}

pub type Result<T> = std::result::Result<T, Error>;
