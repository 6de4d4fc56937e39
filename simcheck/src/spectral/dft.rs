//! Direct discrete Fourier transform along the plane axis.

use std::f64::consts::PI;

use common::Buffer2;
use rustfft::num_complex::Complex;

/// O(n²) DFT of arbitrary length with cached twiddle factors.
///
/// Lengths are products of the phase count and the z window, so they are
/// rarely powers of two and small enough for the direct sum.
/// Output is unnormalized, lowest frequency at bin 0.
#[derive(Debug, Clone)]
pub struct Dft1d {
    len: usize,
    cos: Vec<f64>,
    sin: Vec<f64>,
}

impl Dft1d {
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "DFT length must be positive");

        // cos/sin(2π·t·k/n) depends only on (t·k) mod n.
        let (cos, sin) = (0..len)
            .map(|m| {
                let theta = 2.0 * PI * m as f64 / len as f64;
                (theta.cos(), theta.sin())
            })
            .unzip();

        Self { len, cos, sin }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn twiddle(&self, t: usize, k: usize) -> (f64, f64) {
        let m = (t * k) % self.len;
        (self.cos[m], self.sin[m])
    }

    /// Forward transform of a real sequence: `X_k = Σ_t x_t · e^{-2πi·tk/n}`.
    pub fn transform(&self, input: &[f64]) -> Vec<Complex<f64>> {
        assert_eq!(input.len(), self.len, "input length must equal DFT length");

        (0..self.len)
            .map(|k| {
                let mut re = 0.0;
                let mut im = 0.0;
                for (t, &x) in input.iter().enumerate() {
                    let (c, s) = self.twiddle(t, k);
                    re += x * c;
                    im -= x * s;
                }
                Complex::new(re, im)
            })
            .collect()
    }

    /// Amplitude spectrum `|X_k|` written into `out`.
    pub fn amplitudes_into(&self, input: &[f64], out: &mut [f64]) {
        assert_eq!(input.len(), self.len, "input length must equal DFT length");
        assert_eq!(out.len(), self.len, "output length must equal DFT length");

        for (k, o) in out.iter_mut().enumerate() {
            let mut re = 0.0;
            let mut im = 0.0;
            for (t, &x) in input.iter().enumerate() {
                let (c, s) = self.twiddle(t, k);
                re += x * c;
                im -= x * s;
            }
            *o = (re * re + im * im).sqrt();
        }
    }

    /// Per-pixel amplitude spectrum of a plane sequence.
    ///
    /// Pixel `i` of output plane `k` holds `|X_k|` of the sequence formed by
    /// pixel `i` of every input plane.
    pub fn amplitude_planes(&self, planes: &[Buffer2<f32>]) -> Vec<Buffer2<f32>> {
        assert_eq!(planes.len(), self.len, "plane count must equal DFT length");
        let (width, height) = planes[0].dimensions();
        let mut out: Vec<Buffer2<f32>> = (0..self.len)
            .map(|_| Buffer2::new_default(width, height))
            .collect();

        let mut samples = vec![0.0f64; self.len];
        let mut spectrum = vec![0.0f64; self.len];
        for i in 0..width * height {
            for (s, plane) in samples.iter_mut().zip(planes) {
                *s = plane.pixels()[i] as f64;
            }
            self.amplitudes_into(&samples, &mut spectrum);
            for (plane, &a) in out.iter_mut().zip(&spectrum) {
                plane.pixels_mut()[i] = a as f32;
            }
        }
        out
    }
}
