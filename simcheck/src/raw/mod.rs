//! Read-only view of a raw SIM acquisition.
//!
//! A raw stack is a hyperstack of `channels × slices × frames` planes where
//! every slice axis interleaves phases, z-planes and angles (PZA order), so
//! the full storage order is CPZAT with channel varying fastest.


use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::{axis_positions, linear_index};

/// Physical size of one pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: f64,
    pub height: f64,
    pub unit: String,
}

impl PixelSize {
    pub fn new(width: f64, height: f64, unit: impl Into<String>) -> Self {
        Self {
            width,
            height,
            unit: unit.into(),
        }
    }

    /// Square pixels in micrometres.
    pub fn microns(size: f64) -> Self {
        Self::new(size, size, "micron")
    }

    /// Pixel width converted to micrometres.
    ///
    /// `None` when the unit is not a length (e.g. "pixel" or empty) or the
    /// width is not a positive number.
    pub fn width_microns(&self) -> Option<f64> {
        let unit = self.unit.trim().to_lowercase();
        let scale = match unit.strip_suffix('s').unwrap_or(unit.as_str()) {
            "nm" | "nanometer" | "nanometre" => 1e-3,
            "um" | "µm" | "μm" | "micron" | "micrometer" | "micrometre" => 1.0,
            "mm" | "millimeter" | "millimetre" => 1e3,
            _ => return None,
        };
        let width = self.width * scale;
        (width.is_finite() && width > 0.0).then_some(width)
    }
}

/// Indexable raw acquisition.
///
/// `slices` counts all planes of one channel and frame, i.e. phases × z × angles.
/// Planes are addressed by their 1-based CPZAT linear index.
pub trait RawData {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn channels(&self) -> usize;
    fn slices(&self) -> usize;
    fn frames(&self) -> usize;

    /// Plane at a 1-based linear index.
    fn plane(&self, index: usize) -> &Buffer2<f32>;

    /// Physical calibration, if the acquisition carries one.
    fn pixel_size(&self) -> Option<&PixelSize> {
        None
    }

    fn plane_count(&self) -> usize {
        self.channels() * self.slices() * self.frames()
    }
}

/// In-memory raw stack.
#[derive(Debug, Clone)]
pub struct RawStack {
    channels: usize,
    slices: usize,
    frames: usize,
    planes: Vec<Buffer2<f32>>,
    pixel_size: Option<PixelSize>,
}

impl RawStack {
    /// Build a stack from planes in CPZAT storage order.
    ///
    /// # Panics
    /// If the plane count does not match the extents or planes differ in size.
    pub fn new(channels: usize, slices: usize, frames: usize, planes: Vec<Buffer2<f32>>) -> Self {
        assert_eq!(
            planes.len(),
            channels * slices * frames,
            "plane count must equal channels * slices * frames"
        );
        if let Some(first) = planes.first() {
            let dims = first.dimensions();
            assert!(
                planes.iter().all(|p| p.dimensions() == dims),
                "all planes must have the same dimensions"
            );
        }
        Self {
            channels,
            slices,
            frames,
            planes,
            pixel_size: None,
        }
    }

    pub fn with_pixel_size(mut self, pixel_size: PixelSize) -> Self {
        self.pixel_size = Some(pixel_size);
        self
    }
}

impl RawData for RawStack {
    fn width(&self) -> usize {
        self.planes.first().map_or(0, Buffer2::width)
    }

    fn height(&self) -> usize {
        self.planes.first().map_or(0, Buffer2::height)
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn slices(&self) -> usize {
        self.slices
    }

    fn frames(&self) -> usize {
        self.frames
    }

    fn plane(&self, index: usize) -> &Buffer2<f32> {
        &self.planes[index - 1]
    }

    fn pixel_size(&self) -> Option<&PixelSize> {
        self.pixel_size.as_ref()
    }
}

/// 1-based coordinates of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanePosition {
    pub channel: usize,
    pub phase: usize,
    pub z: usize,
    pub angle: usize,
    pub frame: usize,
}

/// The five SIM axes of a raw stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimDimensions {
    pub channels: usize,
    pub phases: usize,
    pub z_planes: usize,
    pub angles: usize,
    pub frames: usize,
}

impl SimDimensions {
    /// Derive the SIM axes of `raw` for the given phase and angle counts.
    ///
    /// Only the extents are inspected; no plane is read.
    pub fn from_raw<R: RawData + ?Sized>(raw: &R, phases: usize, angles: usize) -> Result<Self> {
        assert!(
            phases > 0 && angles > 0,
            "phases and angles must be positive"
        );

        let slices = raw.slices();
        if slices == 0 {
            return Err(Error::EmptyStack);
        }
        if slices % (phases * angles) != 0 {
            return Err(Error::InvalidDimensions {
                slices,
                phases,
                angles,
            });
        }

        Ok(Self {
            channels: raw.channels(),
            phases,
            z_planes: slices / (phases * angles),
            angles,
            frames: raw.frames(),
        })
    }

    fn sizes(&self) -> [usize; 5] {
        [
            self.channels,
            self.phases,
            self.z_planes,
            self.angles,
            self.frames,
        ]
    }

    pub fn total_planes(&self) -> usize {
        self.sizes().iter().product()
    }

    /// Linear CPZAT index of a plane.
    pub fn plane_index(&self, pos: PlanePosition) -> Result<usize> {
        linear_index(&[
            (pos.channel, self.channels),
            (pos.phase, self.phases),
            (pos.z, self.z_planes),
            (pos.angle, self.angles),
            (pos.frame, self.frames),
        ])
    }

    /// Coordinates of a linear CPZAT index.
    pub fn position_of(&self, index: usize) -> Result<PlanePosition> {
        let p = axis_positions(index, &self.sizes())?;
        Ok(PlanePosition {
            channel: p[0],
            phase: p[1],
            z: p[2],
            angle: p[3],
            frame: p[4],
        })
    }

    /// Plane at the given coordinates. Coordinates must be valid.
    pub(crate) fn plane<'a, R: RawData + ?Sized>(
        &self,
        raw: &'a R,
        pos: PlanePosition,
    ) -> Result<&'a Buffer2<f32>> {
        Ok(raw.plane(self.plane_index(pos)?))
    }
}
