//! Tests for statistical functions.

use super::*;

// ---------------------------------------------------------------------------
// Mean / variance tests
// ---------------------------------------------------------------------------

#[test]
fn test_mean() {
    assert!((mean(&[1.0, 2.0, 6.0]) - 3.0).abs() < 1e-12);
    assert!(mean(&[]).is_nan());
}

#[test]
fn test_nan_mean_skips_missing() {
    assert!((nan_mean(&[1.0, f64::NAN, 3.0]) - 2.0).abs() < 1e-12);
    assert!(nan_mean(&[f64::NAN, f64::NAN]).is_nan());
    assert!(nan_mean(&[]).is_nan());
}

#[test]
fn test_population_variance_divides_by_n() {
    let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    assert!((population_variance(&values) - 4.0).abs() < 1e-12);
    assert!((population_stdev(&values) - 2.0).abs() < 1e-12);
    assert!(population_variance(&[]).is_nan());
}

#[test]
fn test_population_variance_f32_matches_f64() {
    let values = [0.0f32, 2.5, 2.5, 0.0];
    let wide: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    assert!((population_variance_f32(&values) - population_variance(&wide)).abs() < 1e-12);
    assert!((population_variance_f32(&values) - 1.5625).abs() < 1e-12);
}

// ---------------------------------------------------------------------------
// Median tests
// ---------------------------------------------------------------------------

#[test]
fn test_median_odd() {
    let mut values = [1.0f32, 3.0, 2.0, 5.0, 4.0];
    assert!((median_f32_mut(&mut values) - 3.0).abs() < f32::EPSILON);
}

#[test]
fn test_median_even() {
    let mut values = [1.0f32, 2.0, 3.0, 4.0];
    assert!((median_f32_mut(&mut values) - 2.5).abs() < f32::EPSILON);
}

#[test]
fn test_median_f32_single() {
    let mut values = [42.0f32];
    assert!((median_f32_mut(&mut values) - 42.0).abs() < f32::EPSILON);
}

#[test]
fn test_integer_median() {
    assert_eq!(integer_median(&mut [44, 40, 47]), 44);
    // Even count: integer average of the middle pair.
    assert_eq!(integer_median(&mut [1, 4, 2, 3]), 2);
    assert_eq!(integer_median(&mut [41, 44]), 42);
}

// ---------------------------------------------------------------------------
// Triangle threshold tests
// ---------------------------------------------------------------------------

#[test]
fn test_triangle_threshold_separates_bright_features() {
    let mut values: Vec<f32> = (0..900).map(|i| i as f32 / 900.0).collect();
    values.extend(std::iter::repeat_n(10.0f32, 20));
    let threshold = triangle_threshold(&values).unwrap();
    assert!(
        threshold > 0.999,
        "threshold {} inside background",
        threshold
    );
    assert!(threshold < 10.0, "threshold {} above features", threshold);
}

#[test]
fn test_triangle_threshold_ignores_nan() {
    let mut values: Vec<f32> = (0..900).map(|i| i as f32 / 900.0).collect();
    values.extend(std::iter::repeat_n(10.0f32, 20));
    let clean = triangle_threshold(&values);
    values.push(f32::NAN);
    assert_eq!(triangle_threshold(&values), clean);
}

#[test]
fn test_triangle_threshold_degenerate() {
    assert_eq!(triangle_threshold(&[]), None);
    assert_eq!(triangle_threshold(&[3.0, 3.0, 3.0]), None);
    assert_eq!(triangle_threshold(&[f32::NAN]), None);
}
