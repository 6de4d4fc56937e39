pub mod buffer2;
pub mod log_setup;

pub use buffer2::Buffer2;

/// Tolerance for comparing floating-point results of the analysis routines.
pub const EPSILON: f64 = 1e-6;
