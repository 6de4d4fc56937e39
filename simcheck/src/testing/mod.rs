//! Testing utilities: tracing setup and synthetic raw SIM stacks.

#![allow(dead_code)]

use std::f64::consts::PI;

use common::Buffer2;
use rand::Rng;
use rand::rngs::StdRng;

use crate::raw::{PlanePosition, RawData, RawStack, SimDimensions};

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// SIM axes with the given extents.
pub fn dims(
    channels: usize,
    phases: usize,
    z_planes: usize,
    angles: usize,
    frames: usize,
) -> SimDimensions {
    SimDimensions {
        channels,
        phases,
        z_planes,
        angles,
        frames,
    }
}

/// Build a CPZAT stack by evaluating `f(position, x, y)` for every pixel.
pub fn stack_from_fn<F>(width: usize, height: usize, dims: SimDimensions, mut f: F) -> RawStack
where
    F: FnMut(PlanePosition, usize, usize) -> f32,
{
    let planes = (1..=dims.total_planes())
        .map(|index| {
            let pos = dims.position_of(index).unwrap();
            Buffer2::from_fn(width, height, |x, y| f(pos, x, y))
        })
        .collect();
    RawStack::new(
        dims.channels,
        dims.phases * dims.z_planes * dims.angles,
        dims.frames,
        planes,
    )
}

/// Phase-stepped stripe pattern on a square image.
///
/// Angle `a` uses `frequencies[a - 1]` (cycles per image along x and y);
/// phase `p` shifts the pattern by `2π(p − 1)/P`.
pub fn stripe_stack(
    size: usize,
    dims: SimDimensions,
    frequencies: &[(f64, f64)],
    offset: f32,
    amplitude: f32,
) -> RawStack {
    assert_eq!(frequencies.len(), dims.angles);
    stack_from_fn(size, size, dims, |pos, x, y| {
        let (kx, ky) = frequencies[pos.angle - 1];
        let spatial = 2.0 * PI * (kx * x as f64 + ky * y as f64) / size as f64;
        let phase = 2.0 * PI * (pos.phase - 1) as f64 / dims.phases as f64;
        offset + amplitude * (spatial + phase).cos() as f32
    })
}

/// Poisson sample by Knuth's multiplication method.
pub fn poisson(rng: &mut StdRng, lambda: f64) -> u32 {
    let limit = (-lambda).exp();
    let mut k = 0;
    let mut p = 1.0;
    loop {
        p *= rng.random::<f64>();
        if p <= limit {
            return k;
        }
        k += 1;
    }
}

/// Raw data whose extents are readable but whose planes must never be read.
#[derive(Debug, Clone)]
pub struct UnreadableRaw {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
}

impl RawData for UnreadableRaw {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
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
        panic!("plane {} read before dimension check", index)
    }
}
