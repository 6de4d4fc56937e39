//! Configuration for illumination-pattern calibration.

use serde::{Deserialize, Serialize};

/// Closed, 1-based range of z-planes to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZRange {
    pub first: usize,
    pub last: usize,
}

impl ZRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    /// `[Z/2 − 2, Z/2 + 2]` clamped to `[1, Z]`.
    pub fn centered(z_planes: usize) -> Self {
        let center = z_planes / 2;
        let first = center.saturating_sub(2).max(1);
        let last = (center + 2).min(z_planes).max(first);
        Self { first, last }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.last + 1 - self.first
    }
}

/// Sideband peak search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSearchConfig {
    /// Peaks must exceed the background median by this many standard
    /// deviations of the masked amplitude.
    pub threshold_sigma: f64,
    /// Radial band in physical frequency units, scaled by `2 / order`.
    pub band_min: f64,
    pub band_max: f64,
    /// Allowed deviation from an ideal peak pair or the median peak
    /// position, in pixels.
    pub position_tolerance: f64,
    /// Illumination order searched for (1 or 2).
    pub order: usize,
}

impl Default for PeakSearchConfig {
    fn default() -> Self {
        Self {
            threshold_sigma: 6.0,
            band_min: 0.14,
            band_max: 0.29,
            position_tolerance: 6.0,
            order: 1,
        }
    }
}

impl PeakSearchConfig {
    /// Radial band `[band_min·2/order, band_max·2/order]`.
    pub fn band(&self) -> (f64, f64) {
        let scale = 2.0 / self.order as f64;
        (self.band_min * scale, self.band_max * scale)
    }

    /// # Panics
    /// On a negative threshold or tolerance, an empty band, or an order
    /// other than 1 or 2.
    pub fn validate(&self) {
        assert!(
            self.threshold_sigma >= 0.0,
            "Peak threshold must be non-negative"
        );
        assert!(
            self.band_min > 0.0 && self.band_min < self.band_max,
            "Radial band must satisfy 0 < band_min < band_max"
        );
        assert!(
            self.position_tolerance >= 0.0,
            "Position tolerance must be non-negative"
        );
        assert!(
            self.order == 1 || self.order == 2,
            "Only first and second order peaks are supported"
        );
    }
}

/// Parameters of the pattern calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub phases: usize,
    pub angles: usize,
    /// Z-planes to analyze; `None` uses [`ZRange::centered`].
    pub z_range: Option<ZRange>,
    /// Time point analyzed (1-based).
    pub frame: usize,
    /// Fraction of width/height tapered at each image border.
    pub edge_taper_fraction: f64,
    /// Zero-pad non-square or non-power-of-two images before the transform.
    pub pad_to_power_of_two: bool,
    /// Radius of the suppressed zero-order disc, in units of width.
    pub low_freq_radius: f64,
    /// Half-width of the suppressed axis stripes, in units of width.
    pub stripe_half_width: f64,
    pub peak: PeakSearchConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            phases: 5,
            angles: 3,
            z_range: None,
            frame: 1,
            edge_taper_fraction: 0.08,
            pad_to_power_of_two: true,
            low_freq_radius: 0.08,
            stripe_half_width: 0.005,
            peak: PeakSearchConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Default settings restricted to the given z-planes.
    pub fn with_z_range(first: usize, last: usize) -> Self {
        Self {
            z_range: Some(ZRange::new(first, last)),
            ..Default::default()
        }
    }

    /// Validate configuration parameters.
    ///
    /// Ranges that depend on the stack extents (z range, frame) are checked
    /// against the data when the run starts.
    ///
    /// # Panics
    /// On invalid phase/angle counts or out-of-range fractions.
    pub fn validate(&self) {
        assert!(self.phases >= 2, "At least 2 phases are required");
        assert!(self.angles > 0, "Angles must be at least 1");
        assert!(self.frame > 0, "Frame is 1-based");
        assert!(
            (0.0..0.5).contains(&self.edge_taper_fraction),
            "Edge taper fraction must be in [0, 0.5)"
        );
        assert!(
            self.low_freq_radius >= 0.0 && self.stripe_half_width >= 0.0,
            "Low-frequency mask sizes must be non-negative"
        );
        self.peak.validate();
    }
}
