//! Configuration for modulation-contrast analysis.

use serde::{Deserialize, Serialize};

/// Parameters of the sliding-window modulation-contrast analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModContrastConfig {
    /// Illumination phases per angle.
    pub phases: usize,
    /// Illumination pattern angles.
    pub angles: usize,
    /// Z neighbours taken on each side of the output plane. 0 uses the
    /// plane's own phases only.
    pub z_half_width: usize,
}

impl Default for ModContrastConfig {
    fn default() -> Self {
        Self {
            phases: 5,
            angles: 3,
            z_half_width: 0,
        }
    }
}

impl ModContrastConfig {
    /// Default layout with a wider z window.
    pub fn with_z_half_width(z_half_width: usize) -> Self {
        Self {
            z_half_width,
            ..Default::default()
        }
    }

    /// Validate configuration parameters.
    ///
    /// # Panics
    ///
    /// Panics if fewer than 3 phases (the second order would alias the zero
    /// order) or no angles are configured.
    pub fn validate(&self) {
        assert!(
            self.phases >= 3,
            "At least 3 phases are required to resolve the second order"
        );
        assert!(self.angles > 0, "Angles must be at least 1");
    }
}
