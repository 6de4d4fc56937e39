//! Spectral primitives shared by the modulation-contrast and calibration
//! pipelines.
//!
//! - [`Dft1d`]: direct DFT of arbitrary length along the plane axis
//! - [`Fft2d`]: 2D forward FFT to centered amplitude/phase fields
//! - [`find_maxima`]: local-maximum finder for peak detection
//! - Gaussian smoothing and the soft masks built from it


#[cfg(feature = "bench")]
pub mod bench;

mod dft;
mod fft2d;
mod filter;
mod maxima;

pub use dft::Dft1d;
pub use fft2d::{Fft2d, Spectrum, padded_size, phase_angle, swap_quadrants};
pub use filter::{
    apply_edge_taper, edge_taper_window, gaussian_blur, gaussian_kernel_1d, low_frequency_mask,
};
pub use maxima::{FrequencyPeak, find_maxima};
