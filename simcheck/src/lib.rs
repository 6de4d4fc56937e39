//! simcheck - Quality control of structured-illumination microscopy raw data.
//!
//! This library analyzes raw SIM acquisitions (channel, phase, z, angle, time
//! hyperstacks) before reconstruction:
//! - Index arithmetic between 5D plane coordinates and linear storage order
//! - Modulation contrast-to-noise ratio (MCNR) maps from a per-pixel DFT over
//!   the phase axis
//! - Illumination pattern calibration: sideband detection, phase unwrapping,
//!   phase-step and peak-position stability
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use simcheck::{ModContrastAnalyzer, ModContrastConfig, RawStack, RunControl};
//!
//! let stack = RawStack::new(channels, slices, frames, planes);
//! let analyzer = ModContrastAnalyzer::new(ModContrastConfig::default());
//! let result = analyzer.analyze(&stack, &RunControl::new())?;
//!
//! for summary in result.channel_summaries() {
//!     println!("C{}: MCNR {:.1}", summary.channel, summary.feature_mcnr);
//! }
//! ```

pub mod calibration;
pub mod error;
pub mod index;
pub mod math;
pub mod mod_contrast;
pub mod progress;
pub mod raw;
pub mod spectral;

#[cfg(test)]
pub mod testing;

// ============================================================================
// Core types
// ============================================================================

pub use error::{Error, Result};
pub use raw::{PixelSize, PlanePosition, RawData, RawStack, SimDimensions};

// ============================================================================
// Index arithmetic
// ============================================================================

pub use index::{AxisRange, SliceList, axis_positions, linear_index, slice_list};

// ============================================================================
// Modulation contrast
// ============================================================================

pub use mod_contrast::{
    ChannelMcnrSummary, McnrMap, McnrResult, ModContrastAnalyzer, ModContrastConfig,
    PhaseFourierPlanes, PhaseFourierResult,
};

// ============================================================================
// Pattern calibration
// ============================================================================

pub use calibration::{
    CalibrationConfig, CalibrationResult, CalibrationStat, PatternCalibrator, PeakPair,
    PeakSearchConfig, PlaneMeasurement, ZRange,
};

// ============================================================================
// Progress and cancellation
// ============================================================================

pub use progress::{CancelToken, ProgressCallback, RunControl, RunStatus, ScanProgress, ScanStage};
