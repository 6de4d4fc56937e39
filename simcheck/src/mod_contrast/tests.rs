//! Tests for modulation-contrast analysis.

use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::error::Error;
use crate::progress::CancelToken;
use crate::raw::{PlanePosition, RawStack};
use crate::testing::{UnreadableRaw, dims, init_tracing, poisson, stack_from_fn};

/// Poisson-sampled phase-stepped stripes. `modulation` 0 gives a flat field.
fn noisy_stack(size: usize, d: SimDimensions, modulation: f64, seed: u64) -> RawStack {
    let mut rng = StdRng::seed_from_u64(seed);
    stack_from_fn(size, size, d, |pos, x, _y| {
        let phase = 2.0 * PI * (pos.phase - 1) as f64 / d.phases as f64;
        let lambda = 100.0 * (1.0 + modulation * (0.9 * x as f64 + phase).cos());
        poisson(&mut rng, lambda) as f32
    })
}

fn mean_of(map: &Buffer2<f32>) -> f64 {
    map.mean()
}

// ============================================================================
// Window geometry
// ============================================================================

#[test]
fn test_z_window_zero_half_width() {
    for z in 1..=4 {
        assert_eq!(z_window(z, 4, 0), (z, z));
    }
}

#[test]
fn test_z_window_grows_then_shrinks() {
    let windows: Vec<_> = (1..=6).map(|z| z_window(z, 6, 2)).collect();
    assert_eq!(
        windows,
        vec![(1, 3), (1, 4), (1, 5), (2, 6), (3, 6), (4, 6)]
    );
}

#[test]
fn test_z_window_never_leaves_stack() {
    assert_eq!(z_window(2, 3, 5), (1, 3));
    assert_eq!(z_window(1, 1, 1), (1, 1));
}

#[test]
fn test_central_z_window() {
    assert_eq!(central_z_window(7, 1), (3, 5));
    assert_eq!(central_z_window(4, 0), (3, 3));
    assert_eq!(central_z_window(1, 2), (1, 1));
}

#[test]
fn test_order_position() {
    assert_eq!(order_position(0, 15, 5), 0);
    assert_eq!(order_position(1, 15, 5), 3);
    assert_eq!(order_position(1, 10, 5), 2);
    assert_eq!(order_position(2, 15, 5), 6);
    assert_eq!(order_position(2, 10, 5), 4);
}

// ============================================================================
// Pre-processing
// ============================================================================

#[test]
fn test_anscombe_values() {
    assert!((anscombe(0.0) - 0.375).abs() < 1e-7);
    assert!((anscombe(4.0) - 4.375).abs() < 1e-6);
    assert!((anscombe(-3.0) - 0.375).abs() < 1e-7);
}

#[test]
fn test_anscombe_stabilizes_poisson_noise() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut raw_stdevs = Vec::new();
    let mut stabilized_stdevs = Vec::new();

    for lambda in [5.0, 50.0, 500.0] {
        let samples: Vec<f32> = (0..4000)
            .map(|_| poisson(&mut rng, lambda) as f32)
            .collect();
        let stabilized: Vec<f32> = samples.iter().map(|&v| anscombe(v)).collect();
        raw_stdevs.push(population_variance_f32(&samples).sqrt());
        stabilized_stdevs.push(population_variance_f32(&stabilized).sqrt());
    }

    let spread = |v: &[f64]| {
        let max = v.iter().cloned().fold(f64::MIN, f64::max);
        let min = v.iter().cloned().fold(f64::MAX, f64::min);
        max / min
    };
    // Raw noise grows like sqrt(mean); stabilized noise stays near 1.
    assert!(spread(&raw_stdevs) > 5.0, "raw {:?}", raw_stdevs);
    assert!(
        spread(&stabilized_stdevs) < 1.3,
        "stabilized {:?}",
        stabilized_stdevs
    );
    for s in &stabilized_stdevs {
        assert!((0.8..1.25).contains(s), "stabilized stdev {}", s);
    }
}

#[test]
fn test_normalize_ratio_equalizes_means() {
    let mut planes = vec![
        Buffer2::new(2, 1, vec![1.0f32, 1.0]),
        Buffer2::new(2, 1, vec![2.0f32, 4.0]),
    ];
    normalize_ratio(&mut planes);
    assert!((planes[0].mean() - 2.0).abs() < 1e-6);
    assert!((planes[1].mean() - 2.0).abs() < 1e-6);
    // Shape within a plane is preserved.
    assert!((planes[1][(1, 0)] / planes[1][(0, 0)] - 2.0).abs() < 1e-6);
}

#[test]
fn test_normalize_ratio_skips_zero_mean_plane() {
    let mut planes = vec![
        Buffer2::new(2, 1, vec![0.0f32, 0.0]),
        Buffer2::new(2, 1, vec![2.0f32, 2.0]),
    ];
    normalize_ratio(&mut planes);
    assert_eq!(planes[0].pixels(), &[0.0, 0.0]);
    assert!((planes[1].mean() - 1.0).abs() < 1e-6);
}

// ============================================================================
// MCNR metric
// ============================================================================

#[test]
fn test_modulation_contrast_closed_form() {
    // Pixel 0: pure first order of amplitude A. Pixel 1: pure second order of
    // amplitude B. With P = 5 the noise bin (5/2 = 2) coincides with order 2,
    // so noise = stdev{0, 5B/2} = 5B/4 and MCNR(pixel 0) = (5A/2)/(5B/4) = 2A/B.
    let (a, b) = (3.0, 1.0);
    let planes: Vec<Buffer2<f32>> = (0..5)
        .map(|p| {
            let t = 2.0 * PI * p as f64 / 5.0;
            Buffer2::new(
                2,
                1,
                vec![(a * t.cos()) as f32, (b * (2.0 * t).cos()) as f32],
            )
        })
        .collect();
    let freq = Dft1d::new(5).amplitude_planes(&planes);
    let mcnr = modulation_contrast(&freq, 5);

    assert!((mcnr[(0, 0)] - 6.0).abs() < 1e-4, "got {}", mcnr[(0, 0)]);
    assert!((mcnr[(1, 0)] - 2.0).abs() < 1e-4, "got {}", mcnr[(1, 0)]);
}

#[test]
fn test_estimate_wiener() {
    assert!((estimate_wiener(2.0) - 0.0425).abs() < 1e-12);
    assert!((estimate_wiener(10.0) - 0.0017).abs() < 1e-12);
}

#[test]
fn test_feature_mean_uses_bright_region() {
    let map = Buffer2::from_fn(30, 30, |x, y| {
        let i = y * 30 + x;
        if i < 20 {
            10.0
        } else {
            (i % 100) as f32 / 100.0
        }
    });
    assert!((feature_mean(&map) - 10.0).abs() < 1e-9);
}

#[test]
fn test_feature_mean_flat_map() {
    let map = Buffer2::new(3, 1, vec![4.0f32, 4.0, 4.0]);
    assert!((feature_mean(&map) - 4.0).abs() < 1e-12);
}

// ============================================================================
// Analyzer
// ============================================================================

#[test]
fn test_analyze_rejects_indivisible_stack_before_reading_planes() {
    let raw = UnreadableRaw {
        width: 4,
        height: 4,
        channels: 1,
        slices: 44,
        frames: 1,
    };
    let analyzer = ModContrastAnalyzer::new(ModContrastConfig::default());
    let err = analyzer.analyze(&raw, &RunControl::new()).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidDimensions {
            slices: 44,
            phases: 5,
            angles: 3
        }
    );
    assert!(analyzer.raw_phase_fourier(&raw, &RunControl::new()).is_err());
}

#[test]
fn test_analyze_produces_one_map_per_channel_z_frame() {
    init_tracing();
    let d = dims(2, 5, 3, 3, 2);
    let stack = noisy_stack(8, d, 0.5, 1);
    let result = ModContrastAnalyzer::new(ModContrastConfig::default())
        .analyze(&stack, &RunControl::new())
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.dimensions, d);
    assert_eq!(result.maps.len(), 2 * 3 * 2);
    for map in &result.maps {
        assert_eq!(map.map.dimensions(), (8, 8));
        assert!(map.map.iter().all(|v| v.is_finite() && *v >= 0.0));
    }
    assert!(result.map(2, 3, 2).is_some());
    assert!(result.map(3, 1, 1).is_none());
    // Frame, channel, z order.
    let order: Vec<(usize, usize, usize)> = result
        .maps
        .iter()
        .map(|m| (m.frame, m.channel, m.z))
        .collect();
    assert_eq!(order[0], (1, 1, 1));
    assert_eq!(order[3], (1, 2, 1));
    assert_eq!(order[6], (2, 1, 1));
}

#[test]
fn test_modulated_stack_scores_higher_than_flat() {
    let d = dims(1, 5, 1, 3, 1);
    let analyzer = ModContrastAnalyzer::new(ModContrastConfig::default());
    let modulated = analyzer
        .analyze(&noisy_stack(16, d, 0.5, 2), &RunControl::new())
        .unwrap();
    let flat = analyzer
        .analyze(&noisy_stack(16, d, 0.0, 3), &RunControl::new())
        .unwrap();

    let m = mean_of(&modulated.maps[0].map);
    let f = mean_of(&flat.maps[0].map);
    assert!(m > 2.0 * f, "modulated {} vs flat {}", m, f);
}

#[test]
fn test_analyze_averages_angles() {
    let d = dims(1, 5, 1, 2, 1);
    let stack = noisy_stack(6, d, 0.4, 4);
    let result = ModContrastAnalyzer::new(ModContrastConfig {
        phases: 5,
        angles: 2,
        z_half_width: 0,
    })
    .analyze(&stack, &RunControl::new())
    .unwrap();

    let dft = Dft1d::new(5);
    let per_angle: Vec<Buffer2<f32>> = (1..=2)
        .map(|angle| {
            let planes: Vec<Buffer2<f32>> = (1..=5)
                .map(|phase| {
                    let pos = PlanePosition {
                        channel: 1,
                        phase,
                        z: 1,
                        angle,
                        frame: 1,
                    };
                    stack.plane(d.plane_index(pos).unwrap()).clone()
                })
                .collect();
            modulation_contrast(&dft.amplitude_planes(&preprocess_window(planes)), 5)
        })
        .collect();
    let expected = per_angle[0].zip_map(&per_angle[1], |a, b| (a + b) / 2.0);

    let map = &result.maps[0].map;
    for (got, want) in map.iter().zip(expected.iter()) {
        assert!((got - want).abs() < 1e-4 * want.abs().max(1.0));
    }
}

#[test]
fn test_analyze_with_z_window() {
    let d = dims(1, 5, 4, 3, 1);
    let stack = noisy_stack(8, d, 0.5, 5);
    let result = ModContrastAnalyzer::new(ModContrastConfig::with_z_half_width(1))
        .analyze(&stack, &RunControl::new())
        .unwrap();
    assert_eq!(result.maps.len(), 4);
    assert!(
        result
            .maps
            .iter()
            .all(|m| m.map.iter().all(|v| v.is_finite()))
    );
}

#[test]
fn test_analyze_reports_progress_and_honours_cancel() {
    let d = dims(2, 5, 2, 3, 1);
    let stack = noisy_stack(4, d, 0.5, 6);
    let token = CancelToken::new();
    let steps = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&steps);
    let cancel = token.clone();
    let control = RunControl::new()
        .with_cancel_token(token)
        .with_progress(move |p| {
            sink.lock().unwrap().push((p.current, p.total));
            // Cancel once the first channel's windows are done.
            if p.current == 6 {
                cancel.cancel();
            }
        });

    let result = ModContrastAnalyzer::new(ModContrastConfig::default())
        .analyze(&stack, &control)
        .unwrap();

    assert_eq!(result.status, RunStatus::Cancelled);
    assert_eq!(result.maps.len(), 2);
    assert!(result.maps.iter().all(|m| m.channel == 1));
    let steps = steps.lock().unwrap();
    assert_eq!(steps.len(), 6);
    assert_eq!(steps[0], (1, 12));
}

#[test]
fn test_analyze_cancelled_before_start() {
    let d = dims(1, 5, 1, 3, 1);
    let stack = noisy_stack(4, d, 0.5, 8);
    let token = CancelToken::new();
    token.cancel();
    let result = ModContrastAnalyzer::new(ModContrastConfig::default())
        .analyze(&stack, &RunControl::new().with_cancel_token(token))
        .unwrap();
    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(result.maps.is_empty());
}

#[test]
fn test_channel_summaries() {
    let d = dims(2, 5, 2, 3, 1);
    let stack = noisy_stack(12, d, 0.5, 9);
    let result = ModContrastAnalyzer::new(ModContrastConfig::default())
        .analyze(&stack, &RunControl::new())
        .unwrap();
    let summaries = result.channel_summaries();
    assert_eq!(summaries.len(), 2);
    for s in &summaries {
        assert!(s.feature_mcnr.is_finite() && s.feature_mcnr > 0.0);
        assert!((s.wiener_estimate - estimate_wiener(s.feature_mcnr)).abs() < 1e-12);
    }
    assert_eq!(summaries[1].channel, 2);
}

// ============================================================================
// Raw phase Fourier
// ============================================================================

#[test]
fn test_raw_phase_fourier_central_window() {
    let d = dims(1, 5, 3, 3, 1);
    // Noise-free first-order modulation.
    let stack = stack_from_fn(8, 8, d, |pos, x, _| {
        let phase = 2.0 * PI * (pos.phase - 1) as f64 / 5.0;
        (100.0 * (1.0 + 0.5 * (0.9 * x as f64 + phase).cos())) as f32
    });
    let result = ModContrastAnalyzer::new(ModContrastConfig::default())
        .raw_phase_fourier(&stack, &RunControl::new())
        .unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.entries.len(), 3);
    let entry = result.entry(1, 2, 1).unwrap();
    assert_eq!((entry.z_first, entry.z_last), (2, 2));
    assert_eq!(entry.planes.len(), 5);

    let first_order = entry.planes[order_position(1, 5, 5)].mean();
    let noise_bin = entry.planes[2].mean();
    assert!(first_order > 5.0 * noise_bin);
}

#[test]
fn test_raw_phase_fourier_wider_window() {
    let d = dims(1, 5, 3, 3, 1);
    let stack = noisy_stack(4, d, 0.5, 10);
    let result = ModContrastAnalyzer::new(ModContrastConfig::with_z_half_width(1))
        .raw_phase_fourier(&stack, &RunControl::new())
        .unwrap();
    let entry = &result.entries[0];
    assert_eq!((entry.z_first, entry.z_last), (1, 3));
    assert_eq!(entry.planes.len(), 15);
}
