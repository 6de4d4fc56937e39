//! 2D forward FFT producing centered amplitude and phase fields.

use std::f64::consts::PI;
use std::sync::Arc;

use common::Buffer2;
use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Amplitude and phase of a 2D spectrum, zero frequency at `(w/2, h/2)`.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub amplitude: Buffer2<f32>,
    pub phase: Buffer2<f32>,
}

impl Spectrum {
    #[inline]
    pub fn width(&self) -> usize {
        self.amplitude.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.amplitude.height()
    }
}

/// Row-column 2D FFT with plans cached for one image size.
pub struct Fft2d {
    width: usize,
    height: usize,
    row_fft: Arc<dyn Fft<f64>>,
    col_fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for Fft2d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fft2d")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Fft2d {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "FFT size must be positive");

        let mut planner = FftPlanner::new();
        let row_fft = planner.plan_fft_forward(width);
        let col_fft = planner.plan_fft_forward(height);

        Self {
            width,
            height,
            row_fft,
            col_fft,
        }
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Unshifted complex transform of a real image.
    pub fn forward(&self, image: &Buffer2<f32>) -> Buffer2<Complex<f64>> {
        assert_eq!(
            image.dimensions(),
            (self.width, self.height),
            "image size must match FFT size"
        );
        let (w, h) = (self.width, self.height);
        let mut data: Vec<Complex<f64>> =
            image.iter().map(|&v| Complex::new(v as f64, 0.0)).collect();

        // Rows
        for row in data.chunks_exact_mut(w) {
            self.row_fft.process(row);
        }

        // Columns, gathered into a scratch line
        let mut column = vec![Complex::new(0.0, 0.0); h];
        for x in 0..w {
            for (y, c) in column.iter_mut().enumerate() {
                *c = data[y * w + x];
            }
            self.col_fft.process(&mut column);
            for (y, c) in column.iter().enumerate() {
                data[y * w + x] = *c;
            }
        }

        Buffer2::new(w, h, data)
    }

    /// Centered amplitude and phase fields of a real image.
    pub fn spectrum(&self, image: &Buffer2<f32>) -> Spectrum {
        let complex = self.forward(image);
        let (w, h) = complex.dimensions();

        let mut amplitude = complex.map(|c| c.norm() as f32);
        let mut phase = complex.map(|c| phase_angle(c.re, c.im) as f32);
        swap_quadrants(&mut amplitude, w, h);
        swap_quadrants(&mut phase, w, h);

        Spectrum { amplitude, phase }
    }
}

/// Move the zero-frequency term from `(0, 0)` to `(w/2, h/2)`.
///
/// # Panics
/// If `data.len() != width * height`.
pub fn swap_quadrants<T: Copy>(data: &mut [T], width: usize, height: usize) {
    assert_eq!(
        data.len(),
        width * height,
        "data length must equal width * height"
    );
    let source = data.to_vec();
    let (hw, hh) = (width / 2, height / 2);
    for y in 0..height {
        let dst_row = ((y + hh) % height) * width;
        for x in 0..width {
            data[dst_row + (x + hw) % width] = source[y * width + x];
        }
    }
}

/// Four-quadrant phase angle of `re + i·im` in `[-π, π]`.
///
/// The `re == 0` cases are resolved explicitly: `±π/2` by the sign of `im`,
/// and `0` at the origin.
pub fn phase_angle(re: f64, im: f64) -> f64 {
    if re > 0.0 {
        (im / re).atan()
    } else if re < 0.0 && im >= 0.0 {
        (im / re).atan() + PI
    } else if re < 0.0 {
        (im / re).atan() - PI
    } else if im > 0.0 {
        PI / 2.0
    } else if im < 0.0 {
        -PI / 2.0
    } else {
        0.0
    }
}

/// Smallest power of two (at least 2) not below the larger image side.
pub fn padded_size(width: usize, height: usize) -> usize {
    width.max(height).max(2).next_power_of_two()
}
