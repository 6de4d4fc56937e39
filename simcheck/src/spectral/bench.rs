//! Benchmark module for the spectral primitives.
//! Run with: cargo bench -p simcheck --features bench --bench spectral

use std::hint::black_box;

use common::Buffer2;
use criterion::{BenchmarkId, Criterion, Throughput};

use super::{Dft1d, Fft2d, low_frequency_mask};
use crate::mod_contrast::{modulation_contrast, preprocess_window};

/// Register spectral benchmarks with Criterion.
pub fn benchmarks(c: &mut Criterion) {
    benchmark_phase_dft(c);
    benchmark_mcnr_window(c);
    benchmark_fft2d(c);
}

fn phase_planes(size: usize, count: usize) -> Vec<Buffer2<f32>> {
    (0..count)
        .map(|p| {
            Buffer2::from_fn(size, size, |x, y| {
                let t = 2.0 * std::f32::consts::PI * p as f32 / 5.0;
                100.0 + 40.0 * (0.3 * x as f32 + 0.2 * y as f32 + t).cos()
            })
        })
        .collect()
}

/// Per-pixel DFT along the plane axis for typical window lengths.
fn benchmark_phase_dft(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase_dft");
    let size = 256;

    for len in [5, 15, 25] {
        let planes = phase_planes(size, len);
        let dft = Dft1d::new(len);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_function(BenchmarkId::new("amplitude_planes", len), |b| {
            b.iter(|| black_box(dft.amplitude_planes(black_box(&planes))))
        });
    }

    group.finish();
}

/// One full MCNR window: stabilization, ratio correction, DFT, reduction.
fn benchmark_mcnr_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("mcnr_window");
    let size = 256;
    let dft = Dft1d::new(15);
    let planes = phase_planes(size, 15);

    group.throughput(Throughput::Elements((size * size) as u64));
    group.bench_function("w1_p5", |b| {
        b.iter(|| {
            let window = preprocess_window(black_box(planes.clone()));
            let freq = dft.amplitude_planes(&window);
            black_box(modulation_contrast(&freq, 5))
        })
    });

    group.finish();
}

/// Forward 2D transform plus zero-order masking of calibration planes.
fn benchmark_fft2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("fft2d");

    for size in [256, 512] {
        let fft = Fft2d::new(size, size);
        let mask = low_frequency_mask(size, size, 0.08, 0.005);
        let plane = phase_planes(size, 1).remove(0);
        group.bench_function(BenchmarkId::new("spectrum_masked", size), |b| {
            b.iter(|| {
                let spectrum = fft.spectrum(black_box(&plane));
                black_box(spectrum.amplitude.zip_map(&mask, |a, m| a * m))
            })
        });
    }

    group.finish();
}
