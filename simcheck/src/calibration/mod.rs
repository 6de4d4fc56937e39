//! Illumination-pattern calibration from phase-stepped raw planes.
//!
//! Each plane of the selected z range is edge-tapered, optionally padded to a
//! square power of two and transformed. The amplitude spectrum is masked
//! around the zero order, then searched for the pair of first-order
//! sidebands. From the positive sideband the run records the raw phase, the
//! pattern line spacing and angle. Per angle and channel the phase series is
//! unwrapped within each cycle and reduced to stability statistics.


mod config;
mod peaks;
mod phases;

pub use config::{CalibrationConfig, PeakSearchConfig, ZRange};
pub use peaks::{
    PeakPair, filter_peak_pair, filter_peaks_radial, find_peak_pair, fourier_radius, is_peak_pair,
    peak_threshold,
};
pub use phases::{
    UnwrapReport, expected_phase_step, longest_valid_run, median_position, peak_position_stdevs,
    phase_step_stdev, position_stdev, unwrap_phase_steps,
};

use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::{AxisRange, SliceList};
use crate::math::statistics::nan_mean;
use crate::progress::{RunControl, RunStatus, ScanStage};
use crate::raw::{PixelSize, PlanePosition, RawData, SimDimensions};
use crate::spectral::{
    Fft2d, FrequencyPeak, Spectrum, apply_edge_taper, low_frequency_mask, padded_size,
};

/// Sideband measurement of one raw plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneMeasurement {
    pub channel: usize,
    pub phase: usize,
    pub z: usize,
    pub angle: usize,
    pub peak_pair: Option<PeakPair>,
    /// Spectrum phase at the positive peak; NaN without a pair.
    pub raw_phase: f64,
    /// NaN without a pair or without a pixel size.
    pub line_spacing: f64,
    /// NaN without a pair.
    pub pattern_angle: f64,
}

impl PlaneMeasurement {
    fn missing(pos: PlanePosition) -> Self {
        Self {
            channel: pos.channel,
            phase: pos.phase,
            z: pos.z,
            angle: pos.angle,
            peak_pair: None,
            raw_phase: f64::NAN,
            line_spacing: f64::NAN,
            pattern_angle: f64::NAN,
        }
    }
}

/// Calibration statistics for one angle and channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStat {
    pub angle: usize,
    pub channel: usize,
    /// Mean magnitude of the per-cycle position stdevs.
    pub peak_position_stdev: f64,
    /// False if any cycle's median peak drifted beyond tolerance.
    pub position_within_tolerance: bool,
    /// Per-cycle position stdevs; negative when out of tolerance.
    pub cycle_position_stdevs: Vec<f64>,
    /// Stdev of the unwrapped within-cycle phase steps.
    pub phase_step_stdev: f64,
    /// NaN-ignoring mean over the planes.
    pub line_spacing: f64,
    /// NaN-ignoring mean over the planes.
    pub pattern_angle: f64,
    pub unwrapped_phases: Vec<f64>,
    pub out_of_range_steps: Vec<usize>,
}

/// Output of [`PatternCalibrator::calibrate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub dimensions: SimDimensions,
    pub z_range: ZRange,
    /// Size of the transformed planes (after padding).
    pub transform_size: (usize, usize),
    /// Planes in angle, z, phase, channel order.
    pub measurements: Vec<PlaneMeasurement>,
    /// Statistics in angle, channel order, for every completed angle.
    pub stats: Vec<CalibrationStat>,
    pub status: RunStatus,
}

impl CalibrationResult {
    pub fn stat(&self, angle: usize, channel: usize) -> Option<&CalibrationStat> {
        self.stats
            .iter()
            .find(|s| s.angle == angle && s.channel == channel)
    }
}

/// FFT-based illumination pattern calibrator.
#[derive(Debug, Clone)]
pub struct PatternCalibrator {
    config: CalibrationConfig,
}

impl PatternCalibrator {
    /// # Panics
    /// If the configuration is invalid, see [`CalibrationConfig::validate`].
    pub fn new(config: CalibrationConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Measure the sideband of every plane in the z range and reduce the
    /// series of each angle and channel to [`CalibrationStat`]s.
    ///
    /// Slice-count, z-range and frame errors are returned before any plane
    /// is read.
    pub fn calibrate<R: RawData + ?Sized>(
        &self,
        raw: &R,
        control: &RunControl,
    ) -> Result<CalibrationResult> {
        let config = &self.config;
        let dims = SimDimensions::from_raw(raw, config.phases, config.angles)?;
        let z_range = config
            .z_range
            .unwrap_or_else(|| ZRange::centered(dims.z_planes));

        // Validates the z range and frame against the stack.
        let planes = SliceList::new(&[
            AxisRange::full(dims.channels),
            AxisRange::full(dims.phases),
            AxisRange::new(dims.z_planes, z_range.first, z_range.last),
            AxisRange::full(dims.angles),
            AxisRange::single(dims.frames, config.frame),
        ])?;
        let total = planes.total();

        let (width, height) = self.transform_size(raw.width(), raw.height());
        let pixel_width = raw.pixel_size().and_then(PixelSize::width_microns);
        if pixel_width.is_none() {
            tracing::warn!(
                unit = raw.pixel_size().map(|p| p.unit.as_str()),
                "No length calibration; radial band filter disabled and line spacing unavailable"
            );
        }

        tracing::info!(
            z_first = z_range.first,
            z_last = z_range.last,
            width,
            height,
            planes = total,
            "Calibrating illumination pattern"
        );

        let fft = Fft2d::new(width, height);
        let mask = low_frequency_mask(
            width,
            height,
            config.low_freq_radius,
            config.stripe_half_width,
        );

        let mut measurements = Vec::with_capacity(total);
        let mut stats = Vec::with_capacity(dims.angles * dims.channels);
        let mut status = RunStatus::Completed;

        'angles: for angle in 1..=dims.angles {
            let first_of_angle = measurements.len();
            for z in z_range.first..=z_range.last {
                for phase in 1..=dims.phases {
                    for channel in 1..=dims.channels {
                        if control.is_cancelled() {
                            status = RunStatus::Cancelled;
                            break 'angles;
                        }
                        let pos = PlanePosition {
                            channel,
                            phase,
                            z,
                            angle,
                            frame: config.frame,
                        };
                        let plane = dims.plane(raw, pos)?;
                        let spectrum = self.plane_spectrum(&fft, &mask, plane);
                        measurements.push(self.measure(pos, &spectrum, pixel_width));
                        control.report(measurements.len(), total, ScanStage::PatternCalibration);
                    }
                }
            }

            let angle_measurements = &measurements[first_of_angle..];
            for channel in 1..=dims.channels {
                stats.push(self.channel_stat(angle, channel, angle_measurements));
            }
        }

        if status == RunStatus::Cancelled {
            tracing::info!(planes = measurements.len(), "Pattern calibration cancelled");
        }

        Ok(CalibrationResult {
            dimensions: dims,
            z_range,
            transform_size: (width, height),
            measurements,
            stats,
            status,
        })
    }

    /// Transform size for a `width × height` plane.
    pub fn transform_size(&self, width: usize, height: usize) -> (usize, usize) {
        if self.config.pad_to_power_of_two {
            let size = padded_size(width, height);
            (size, size)
        } else {
            (width, height)
        }
    }

    /// Tapered, padded transform of one plane with the zero-order mask
    /// applied to its amplitude.
    pub fn plane_spectrum(
        &self,
        fft: &Fft2d,
        mask: &Buffer2<f32>,
        plane: &Buffer2<f32>,
    ) -> Spectrum {
        let (width, height) = fft.dimensions();
        let tapered = apply_edge_taper(plane, self.config.edge_taper_fraction);
        let input = if tapered.dimensions() == (width, height) {
            tapered
        } else {
            tapered.padded(width, height)
        };

        let mut spectrum = fft.spectrum(&input);
        spectrum.amplitude = spectrum.amplitude.zip_map(mask, |a, m| a * m);
        spectrum
    }

    fn measure(
        &self,
        pos: PlanePosition,
        spectrum: &Spectrum,
        pixel_width: Option<f64>,
    ) -> PlaneMeasurement {
        let (width, height) = (spectrum.width(), spectrum.height());
        let Some(pair) = find_peak_pair(&spectrum.amplitude, pixel_width, &self.config.peak) else {
            tracing::debug!(?pos, "No sideband pair");
            return PlaneMeasurement::missing(pos);
        };

        let plus = pair.positive();
        PlaneMeasurement {
            channel: pos.channel,
            phase: pos.phase,
            z: pos.z,
            angle: pos.angle,
            peak_pair: Some(pair),
            raw_phase: spectrum.phase[(plus.x, plus.y)] as f64,
            line_spacing: pixel_width.map_or(f64::NAN, |pw| {
                pair.line_spacing(width, height, pw, self.config.peak.order)
            }),
            pattern_angle: pair.pattern_angle(width, height),
        }
    }

    fn channel_stat(
        &self,
        angle: usize,
        channel: usize,
        measurements: &[PlaneMeasurement],
    ) -> CalibrationStat {
        let phases = self.config.phases;
        let series: Vec<&PlaneMeasurement> = measurements
            .iter()
            .filter(|m| m.channel == channel)
            .collect();

        let raw_phases: Vec<f64> = series.iter().map(|m| m.raw_phase).collect();
        let report = unwrap_phase_steps(&raw_phases, phases);
        let phase_step_stdev = phase_step_stdev(&report.phases, phases);

        let positives: Vec<Option<FrequencyPeak>> = series
            .iter()
            .map(|m| m.peak_pair.map(|pair| pair.positive()))
            .collect();
        let cycle_position_stdevs =
            peak_position_stdevs(&positives, phases, self.config.peak.position_tolerance);
        let magnitudes: Vec<f64> = cycle_position_stdevs.iter().map(|s| s.abs()).collect();

        let line_spacings: Vec<f64> = series.iter().map(|m| m.line_spacing).collect();
        let angles: Vec<f64> = series.iter().map(|m| m.pattern_angle).collect();

        let stat = CalibrationStat {
            angle,
            channel,
            peak_position_stdev: nan_mean(&magnitudes),
            position_within_tolerance: cycle_position_stdevs
                .iter()
                .all(|s| s.is_nan() || *s >= 0.0),
            cycle_position_stdevs,
            phase_step_stdev,
            line_spacing: nan_mean(&line_spacings),
            pattern_angle: nan_mean(&angles),
            unwrapped_phases: report.phases,
            out_of_range_steps: report.out_of_range,
        };

        tracing::info!(
            angle,
            channel,
            phase_step_stdev = stat.phase_step_stdev,
            peak_position_stdev = stat.peak_position_stdev,
            line_spacing = stat.line_spacing,
            pattern_angle = stat.pattern_angle,
            "Calibration statistics"
        );
        stat
    }
}
