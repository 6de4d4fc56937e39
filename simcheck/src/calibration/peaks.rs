//! Sideband peak selection on a centered amplitude spectrum.

use common::Buffer2;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::config::PeakSearchConfig;
use crate::math::statistics::{median_f32_mut, population_variance_f32};
use crate::spectral::{FrequencyPeak, find_maxima, phase_angle};

/// Two sideband peaks symmetric about the spectrum center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakPair {
    pub first: FrequencyPeak,
    pub second: FrequencyPeak,
}

impl PeakPair {
    /// The peak with positive x frequency, or positive y frequency when
    /// both sit on the vertical axis.
    ///
    /// Independent of peak order, so conjugate peaks of equal brightness
    /// always resolve to the same sideband.
    pub fn positive(&self) -> FrequencyPeak {
        if (self.first.x, self.first.y) > (self.second.x, self.second.y) {
            self.first
        } else {
            self.second
        }
    }

    /// Pattern line spacing from the mean Fourier radius of both peaks.
    ///
    /// First-order peaks sit at half the pattern frequency, so their radius
    /// is halved; any order other than 1 or 2 yields NaN.
    pub fn line_spacing(&self, width: usize, height: usize, pixel_width: f64, order: usize) -> f64 {
        let r = (fourier_radius(self.first.x, self.first.y, width, height, pixel_width)
            + fourier_radius(self.second.x, self.second.y, width, height, pixel_width))
            / 2.0;
        match order {
            1 => r / 2.0,
            2 => r,
            _ => f64::NAN,
        }
    }

    /// Angle of the positive peak about the center, radians in `[-π, π]`.
    pub fn pattern_angle(&self, width: usize, height: usize) -> f64 {
        let peak = self.positive();
        let xc = peak.x as f64 - (width / 2) as f64;
        let yc = peak.y as f64 - (height / 2) as f64;
        phase_angle(xc, yc)
    }
}

/// Real-space period, in physical units, of the spectrum pixel `(x, y)`.
///
/// `r = (width / max(d, 1)) · pixel_width` with `d` the distance from
/// `(width/2, height/2)`.
pub fn fourier_radius(x: usize, y: usize, width: usize, height: usize, pixel_width: f64) -> f64 {
    let offset = DVec2::new(x as f64, y as f64) - DVec2::new(width as f64, height as f64) / 2.0;
    (width as f64 / offset.length().max(1.0)) * pixel_width
}

/// Keep peaks whose Fourier radius lies in `[r_min, r_max]`.
pub fn filter_peaks_radial(
    peaks: &[FrequencyPeak],
    width: usize,
    height: usize,
    pixel_width: f64,
    (r_min, r_max): (f64, f64),
) -> Vec<FrequencyPeak> {
    peaks
        .iter()
        .filter(|p| {
            let r = fourier_radius(p.x, p.y, width, height, pixel_width);
            r >= r_min && r <= r_max
        })
        .copied()
        .collect()
}

/// Whether two peaks lie on a line through the center and at equal
/// distances from it, both within `tolerance` pixels.
pub fn is_peak_pair(
    a: &FrequencyPeak,
    b: &FrequencyPeak,
    width: usize,
    height: usize,
    tolerance: f64,
) -> bool {
    let center = DVec2::new((width / 2) as f64, (height / 2) as f64);
    let pa = DVec2::new(a.x as f64, a.y as f64);
    let pb = DVec2::new(b.x as f64, b.y as f64);

    let direction = pb - pa;
    let length = direction.length();
    if length == 0.0 {
        return false;
    }
    // Perpendicular distance of the center from the line a-b.
    let off_line = direction.perp_dot(center - pa).abs() / length;
    let asymmetry = (pa.distance(center) - pb.distance(center)).abs();

    off_line <= tolerance && asymmetry <= tolerance
}

/// The two brightest peaks, if they form a [`PeakPair`].
///
/// Only the top two are tried; fewer than two candidates or a failed pair
/// check gives `None`.
pub fn filter_peak_pair(
    peaks: &[FrequencyPeak],
    width: usize,
    height: usize,
    tolerance: f64,
) -> Option<PeakPair> {
    let mut order: Vec<&FrequencyPeak> = peaks.iter().collect();
    order.sort_by(|a, b| b.value.total_cmp(&a.value));
    let (first, second) = match order.as_slice() {
        [first, second, ..] => (**first, **second),
        _ => return None,
    };
    is_peak_pair(&first, &second, width, height, tolerance).then_some(PeakPair { first, second })
}

/// Detection threshold: background median plus `sigma` population standard
/// deviations of the field.
pub fn peak_threshold(amplitude: &Buffer2<f32>, sigma: f64) -> f32 {
    let stdev = population_variance_f32(amplitude.pixels()).sqrt();
    let mut values = amplitude.pixels().to_vec();
    let median = median_f32_mut(&mut values);
    median + (sigma * stdev) as f32
}

/// Full search on a masked, centered amplitude field.
///
/// Without a pixel size the radial band cannot be evaluated and every
/// maximum above threshold competes for the pair.
pub fn find_peak_pair(
    amplitude: &Buffer2<f32>,
    pixel_width: Option<f64>,
    config: &PeakSearchConfig,
) -> Option<PeakPair> {
    let (width, height) = amplitude.dimensions();
    let threshold = peak_threshold(amplitude, config.threshold_sigma);
    let mut maxima = find_maxima(amplitude, threshold, true);
    if let Some(pixel_width) = pixel_width {
        maxima = filter_peaks_radial(&maxima, width, height, pixel_width, config.band());
    }
    filter_peak_pair(&maxima, width, height, config.position_tolerance)
}
