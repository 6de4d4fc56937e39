//! Phase-series unwrapping and stability statistics.
//!
//! A series holds one sample per (z, phase) pair, phase varying fastest, so
//! every run of `phases` consecutive samples is one phase-stepping cycle.
//! Missing samples are NaN (phases) or `None` (peak positions).

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::math::statistics::{integer_median, population_stdev};
use crate::spectral::FrequencyPeak;

/// Added to every cycle position stdev so a perfect cycle (stdev 0) keeps
/// its sign when flagged as out of tolerance.
const POSITION_STDEV_OFFSET: f64 = 1e-4;

/// Ideal phase increment `2π / P`.
#[inline]
pub fn expected_phase_step(phases: usize) -> f64 {
    TAU / phases as f64
}

/// Unwrapped series plus the samples whose step stayed out of range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnwrapReport {
    pub phases: Vec<f64>,
    /// Indices whose step to the previous sample is still outside
    /// `[0.5, 1.5]·2π/P` after correction.
    pub out_of_range: Vec<usize>,
}

/// Unwrap 2π jumps within each cycle.
///
/// For every non-first sample of a cycle the step from the (already
/// corrected) previous sample is computed. A step whose magnitude lies
/// outside `[0.5, 1.5]` times the expected step is shifted by 2π towards
/// zero, and the sample with it. Each correction is local: later samples are
/// not shifted along. Steps touching a missing sample are left alone.
pub fn unwrap_phase_steps(raw: &[f64], phases: usize) -> UnwrapReport {
    assert!(phases > 0, "phases must be positive");

    let expected = expected_phase_step(phases);
    let in_range = |step: f64| (0.5 * expected..=1.5 * expected).contains(&step.abs());

    let mut unwrapped = raw.to_vec();
    let mut out_of_range = Vec::new();
    for i in 1..unwrapped.len() {
        if i % phases == 0 {
            continue;
        }
        let step = unwrapped[i] - unwrapped[i - 1];
        if step.is_nan() || in_range(step) {
            continue;
        }
        let shift = if step < 0.0 { TAU } else { -TAU };
        unwrapped[i] += shift;
        if !in_range(step + shift) {
            tracing::warn!(
                sample = i,
                step = step + shift,
                expected,
                "Phase step outside 0.5-1.5 times the expected step"
            );
            out_of_range.push(i);
        }
    }

    UnwrapReport {
        phases: unwrapped,
        out_of_range,
    }
}

/// Length of the longest run of consecutive non-NaN samples.
pub fn longest_valid_run(values: &[f64]) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for v in values {
        if v.is_nan() {
            run = 0;
        } else {
            run += 1;
            longest = longest.max(run);
        }
    }
    longest
}

/// Standard deviation of the within-cycle steps of an unwrapped series.
///
/// Only steps where both samples are present count. NaN unless the series
/// contains an unbroken run of at least two cycles.
pub fn phase_step_stdev(unwrapped: &[f64], phases: usize) -> f64 {
    if longest_valid_run(unwrapped) < 2 * phases {
        return f64::NAN;
    }
    let steps: Vec<f64> = (1..unwrapped.len())
        .filter(|i| i % phases != 0)
        .map(|i| unwrapped[i] - unwrapped[i - 1])
        .filter(|step| !step.is_nan())
        .collect();
    population_stdev(&steps)
}

/// Positional standard deviation `sqrt(Σ((x−x̄)² + (y−ȳ)²) / 2n)`.
/// NaN for no points.
pub fn position_stdev(points: &[(f64, f64)]) -> f64 {
    if points.is_empty() {
        return f64::NAN;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    let (mx, my) = (sx / n, sy / n);
    let sum: f64 = points
        .iter()
        .map(|&(x, y)| (x - mx).powi(2) + (y - my).powi(2))
        .sum();
    (sum / (2.0 * n)).sqrt()
}

/// Per-axis integer median of the present peaks.
pub fn median_position(peaks: &[Option<FrequencyPeak>]) -> Option<(i64, i64)> {
    let (mut xs, mut ys): (Vec<i64>, Vec<i64>) = peaks
        .iter()
        .flatten()
        .map(|p| (p.x as i64, p.y as i64))
        .unzip();
    if xs.is_empty() {
        return None;
    }
    Some((integer_median(&mut xs), integer_median(&mut ys)))
}

/// Position stdev of every cycle's peaks, plus a small offset.
///
/// A cycle whose median position lies farther than `tolerance` pixels from
/// the median of the whole series is reported negated. Missing peaks are
/// skipped; a cycle with none is NaN.
pub fn peak_position_stdevs(
    peaks: &[Option<FrequencyPeak>],
    phases: usize,
    tolerance: f64,
) -> Vec<f64> {
    let Some((gx, gy)) = median_position(peaks) else {
        return vec![f64::NAN; peaks.len() / phases];
    };

    peaks
        .chunks_exact(phases)
        .map(|cycle| {
            let points: Vec<(f64, f64)> = cycle
                .iter()
                .flatten()
                .map(|p| (p.x as f64, p.y as f64))
                .collect();
            let Some((cx, cy)) = median_position(cycle) else {
                return f64::NAN;
            };
            let stdev = position_stdev(&points) + POSITION_STDEV_OFFSET;
            let drift = (((cx - gx).pow(2) + (cy - gy).pow(2)) as f64).sqrt();
            if drift > tolerance { -stdev } else { stdev }
        })
        .collect()
}
