//! Sliding-window modulation contrast-to-noise ratio (MCNR).
//!
//! For every output z-plane the phases of a small z neighbourhood are stacked
//! into one sample vector per pixel. After variance stabilization and
//! per-plane intensity equalization a direct DFT along that vector separates
//! the illumination orders:
//!
//! - order 1 at bin `vlen / P`, order 2 at bin `2·vlen / P`
//! - bin `vlen / 2` is taken as noise
//!
//! `MCNR = sqrt(o1² + o2²) / stdev(noise bin over all pixels)`, computed per
//! angle and averaged across angles.

#[cfg(test)]
mod tests;

mod config;

pub use config::ModContrastConfig;

use std::collections::HashMap;

use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::{AxisRange, SliceList};
use crate::math::statistics::{mean, population_variance_f32, triangle_threshold};
use crate::progress::{RunControl, RunStatus, ScanStage};
use crate::raw::{RawData, SimDimensions};
use crate::spectral::Dft1d;

/// MCNR map for one channel, z-plane and frame (1-based), averaged over angles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McnrMap {
    pub channel: usize,
    pub z: usize,
    pub frame: usize,
    pub map: Buffer2<f32>,
}

/// Feature MCNR of one channel and the Wiener setting it suggests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelMcnrSummary {
    pub channel: usize,
    pub feature_mcnr: f64,
    pub wiener_estimate: f64,
}

/// Output of [`ModContrastAnalyzer::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McnrResult {
    pub dimensions: SimDimensions,
    /// Maps in frame, channel, z order. Cancelled runs hold a prefix.
    pub maps: Vec<McnrMap>,
    pub status: RunStatus,
}

impl McnrResult {
    pub fn map(&self, channel: usize, z: usize, frame: usize) -> Option<&McnrMap> {
        self.maps
            .iter()
            .find(|m| m.channel == channel && m.z == z && m.frame == frame)
    }

    /// Feature MCNR per channel, averaged over its z-planes and frames.
    pub fn channel_summaries(&self) -> Vec<ChannelMcnrSummary> {
        (1..=self.dimensions.channels)
            .filter_map(|channel| {
                let features: Vec<f64> = self
                    .maps
                    .iter()
                    .filter(|m| m.channel == channel)
                    .map(|m| feature_mean(&m.map))
                    .collect();
                if features.is_empty() {
                    return None;
                }
                let feature_mcnr = mean(&features);
                Some(ChannelMcnrSummary {
                    channel,
                    feature_mcnr,
                    wiener_estimate: estimate_wiener(feature_mcnr),
                })
            })
            .collect()
    }
}

/// Frequency planes of the central z window for one channel, angle and frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseFourierPlanes {
    pub channel: usize,
    pub angle: usize,
    pub frame: usize,
    pub z_first: usize,
    pub z_last: usize,
    /// DFT amplitude planes, bin 0 first.
    pub planes: Vec<Buffer2<f32>>,
}

/// Output of [`ModContrastAnalyzer::raw_phase_fourier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseFourierResult {
    pub dimensions: SimDimensions,
    /// Entries in frame, channel, angle order.
    pub entries: Vec<PhaseFourierPlanes>,
    pub status: RunStatus,
}

impl PhaseFourierResult {
    pub fn entry(&self, channel: usize, angle: usize, frame: usize) -> Option<&PhaseFourierPlanes> {
        self.entries
            .iter()
            .find(|e| e.channel == channel && e.angle == angle && e.frame == frame)
    }
}

/// Modulation-contrast analyzer for raw SIM stacks.
#[derive(Debug, Clone)]
pub struct ModContrastAnalyzer {
    config: ModContrastConfig,
}

impl ModContrastAnalyzer {
    /// # Panics
    /// If the configuration is invalid, see [`ModContrastConfig::validate`].
    pub fn new(config: ModContrastConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &ModContrastConfig {
        &self.config
    }

    /// Compute one angle-averaged MCNR map per channel, z-plane and frame.
    ///
    /// Fails with `InvalidDimensions` before reading any plane if the slice
    /// count does not split into phases × z × angles.
    pub fn analyze<R: RawData + ?Sized>(
        &self,
        raw: &R,
        control: &RunControl,
    ) -> Result<McnrResult> {
        let dims = SimDimensions::from_raw(raw, self.config.phases, self.config.angles)?;
        let (width, height) = (raw.width(), raw.height());
        let total = dims.frames * dims.channels * dims.angles * dims.z_planes;

        tracing::info!(
            channels = dims.channels,
            z_planes = dims.z_planes,
            frames = dims.frames,
            z_half_width = self.config.z_half_width,
            "Computing modulation contrast-to-noise ratio"
        );

        let mut dfts: HashMap<usize, Dft1d> = HashMap::new();
        let mut maps = Vec::with_capacity(dims.frames * dims.channels * dims.z_planes);
        let mut step = 0;
        let mut status = RunStatus::Completed;

        'frames: for frame in 1..=dims.frames {
            for channel in 1..=dims.channels {
                let mut sums: Vec<Buffer2<f32>> = (0..dims.z_planes)
                    .map(|_| Buffer2::new_default(width, height))
                    .collect();

                for angle in 1..=dims.angles {
                    for z in 1..=dims.z_planes {
                        if control.is_cancelled() {
                            status = RunStatus::Cancelled;
                            break 'frames;
                        }

                        let (z_first, z_last) =
                            z_window(z, dims.z_planes, self.config.z_half_width);
                        let planes =
                            window_planes(raw, &dims, channel, angle, frame, z_first, z_last)?;
                        let planes = preprocess_window(planes);
                        let dft = dfts
                            .entry(planes.len())
                            .or_insert_with(|| Dft1d::new(planes.len()));
                        let freq = dft.amplitude_planes(&planes);
                        let mcnr = modulation_contrast(&freq, dims.phases);

                        let sum = &mut sums[z - 1];
                        for (s, &v) in sum.iter_mut().zip(mcnr.iter()) {
                            *s += v;
                        }

                        step += 1;
                        control.report(step, total, ScanStage::ModulationContrast);
                    }
                }

                let angles = dims.angles as f32;
                for (z, sum) in sums.into_iter().enumerate() {
                    maps.push(McnrMap {
                        channel,
                        z: z + 1,
                        frame,
                        map: sum.map(|&v| v / angles),
                    });
                }
            }
        }

        if status == RunStatus::Cancelled {
            tracing::info!(maps = maps.len(), "Modulation contrast cancelled");
        } else {
            tracing::debug!(maps = maps.len(), "Modulation contrast complete");
        }

        Ok(McnrResult {
            dimensions: dims,
            maps,
            status,
        })
    }

    /// Frequency planes of the phase DFT over the central z window, without
    /// reducing them to MCNR. Every angle is reported separately.
    pub fn raw_phase_fourier<R: RawData + ?Sized>(
        &self,
        raw: &R,
        control: &RunControl,
    ) -> Result<PhaseFourierResult> {
        let dims = SimDimensions::from_raw(raw, self.config.phases, self.config.angles)?;
        let (z_first, z_last) = central_z_window(dims.z_planes, self.config.z_half_width);
        let total = dims.frames * dims.channels * dims.angles;

        tracing::info!(z_first, z_last, "Computing raw phase Fourier transforms");

        let dft = Dft1d::new(dims.phases * (z_last - z_first + 1));
        let mut entries = Vec::with_capacity(total);
        let mut status = RunStatus::Completed;

        'frames: for frame in 1..=dims.frames {
            for channel in 1..=dims.channels {
                for angle in 1..=dims.angles {
                    if control.is_cancelled() {
                        status = RunStatus::Cancelled;
                        break 'frames;
                    }
                    let planes = window_planes(raw, &dims, channel, angle, frame, z_first, z_last)?;
                    let planes = preprocess_window(planes);
                    entries.push(PhaseFourierPlanes {
                        channel,
                        angle,
                        frame,
                        z_first,
                        z_last,
                        planes: dft.amplitude_planes(&planes),
                    });
                    control.report(entries.len(), total, ScanStage::PhaseFourier);
                }
            }
        }

        Ok(PhaseFourierResult {
            dimensions: dims,
            entries,
            status,
        })
    }
}

/// Z range `[max(1, z − w), min(Z, z + w)]` sampled for output plane `z`.
pub fn z_window(z: usize, z_planes: usize, half_width: usize) -> (usize, usize) {
    debug_assert!((1..=z_planes).contains(&z));
    (
        z.saturating_sub(half_width).max(1),
        (z + half_width).min(z_planes),
    )
}

/// Z range `[Z/2 + 1 − w, Z/2 + 1 + w]` clamped to the stack.
pub fn central_z_window(z_planes: usize, half_width: usize) -> (usize, usize) {
    z_window((z_planes / 2 + 1).min(z_planes), z_planes, half_width)
}

/// Bin index of illumination order `order` in a length-`vlen` DFT covering
/// `vlen / phases` full pattern cycles.
#[inline]
pub fn order_position(order: usize, vlen: usize, phases: usize) -> usize {
    vlen * order / phases
}

/// Anscombe variance-stabilizing transform `2·sqrt(x) + 3/8`.
///
/// Negative inputs (offset-subtracted noise) are treated as zero.
#[inline]
pub fn anscombe(x: f32) -> f32 {
    2.0 * x.max(0.0).sqrt() + 0.375
}

/// Rescale each plane so its mean equals the average of all plane means.
///
/// Planes with zero mean are left unchanged.
pub fn normalize_ratio(planes: &mut [Buffer2<f32>]) {
    let means: Vec<f64> = planes.iter().map(Buffer2::mean).collect();
    let target = mean(&means);
    for (plane, &m) in planes.iter_mut().zip(&means) {
        if m == 0.0 {
            continue;
        }
        let scale = (target / m) as f32;
        for v in plane.iter_mut() {
            *v *= scale;
        }
    }
}

/// Anscombe transform followed by ratio correction.
pub fn preprocess_window(planes: Vec<Buffer2<f32>>) -> Vec<Buffer2<f32>> {
    let mut planes: Vec<Buffer2<f32>> = planes
        .into_iter()
        .map(|mut p| {
            for v in p.iter_mut() {
                *v = anscombe(*v);
            }
            p
        })
        .collect();
    normalize_ratio(&mut planes);
    planes
}

/// MCNR map from the DFT amplitude planes of one window.
pub fn modulation_contrast(freq_planes: &[Buffer2<f32>], phases: usize) -> Buffer2<f32> {
    let vlen = freq_planes.len();
    assert!(vlen >= phases, "window shorter than one phase cycle");

    let order1 = &freq_planes[order_position(1, vlen, phases)];
    let order2 = &freq_planes[order_position(2, vlen, phases)];
    let noise_stdev = population_variance_f32(&freq_planes[vlen / 2]).sqrt() as f32;
    if noise_stdev == 0.0 {
        tracing::warn!(vlen, "Noise bin has zero variance; MCNR is undefined");
    }

    order1.zip_map(order2, |&a, &b| (a * a + b * b).sqrt() / noise_stdev)
}

/// Suggested Wiener filter setting for a feature MCNR.
#[inline]
pub fn estimate_wiener(mcnr: f64) -> f64 {
    0.170 / (mcnr * mcnr)
}

/// Mean of the pixels above the triangle auto-threshold of `map`.
///
/// Falls back to the plain mean of finite values when the map has no
/// contrast to threshold.
pub fn feature_mean(map: &Buffer2<f32>) -> f64 {
    let threshold = triangle_threshold(map.pixels()).unwrap_or(f32::NEG_INFINITY);
    let (sum, count) = map
        .iter()
        .filter(|v| v.is_finite() && **v > threshold)
        .fold((0.0f64, 0usize), |(s, n), &v| (s + v as f64, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Planes of one channel/angle/frame over `z_first..=z_last`, phases varying
/// fastest.
fn window_planes<R: RawData + ?Sized>(
    raw: &R,
    dims: &SimDimensions,
    channel: usize,
    angle: usize,
    frame: usize,
    z_first: usize,
    z_last: usize,
) -> Result<Vec<Buffer2<f32>>> {
    let slices = SliceList::new(&[
        AxisRange::single(dims.channels, channel),
        AxisRange::full(dims.phases),
        AxisRange::new(dims.z_planes, z_first, z_last),
        AxisRange::single(dims.angles, angle),
        AxisRange::single(dims.frames, frame),
    ])?;
    Ok(slices.map(|index| raw.plane(index).clone()).collect())
}
