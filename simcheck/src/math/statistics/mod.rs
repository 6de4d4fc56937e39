//! Statistical functions: means, population variance, medians and the
//! triangle auto-threshold.

#[cfg(test)]
mod tests;

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean over the non-NaN values. NaN if there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population variance (divides by `n`). NaN for an empty slice.
pub fn population_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Population variance of f32 samples, accumulated in f64.
pub fn population_variance_f32(values: &[f32]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let m = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    values
        .iter()
        .map(|&v| {
            let d = v as f64 - m;
            d * d
        })
        .sum::<f64>()
        / n
}

/// Population standard deviation.
#[inline]
pub fn population_stdev(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// Calculate the median of f32 values in-place.
///
/// Mutates the input buffer (partial sort via quickselect).
pub fn median_f32_mut(data: &mut [f32]) -> f32 {
    debug_assert!(!data.is_empty());

    let len = data.len();
    let mid = len / 2;

    let (left_part, median, _) = data.select_nth_unstable_by(mid, f32::total_cmp);
    let right = *median;
    if len & 1 == 1 {
        return right;
    }
    let left = left_part.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    (left + right) * 0.5
}

/// Median of integer coordinates; the even case averages the middle pair
/// with integer division.
pub fn integer_median(values: &mut [i64]) -> i64 {
    debug_assert!(!values.is_empty());

    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2
    }
}

const TRIANGLE_BINS: usize = 256;

/// Triangle auto-threshold for bright features on a dark background.
///
/// Values are binned into a 256-bin histogram over their range. A line is
/// drawn from the histogram peak to the far end of the longer tail; the bin
/// farthest below that line is the threshold. Returns the upper edge of that
/// bin: features are values strictly above it. NaNs are ignored.
///
/// Returns `None` when there are no finite values or all values are equal.
pub fn triangle_threshold(values: &[f32]) -> Option<f32> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max <= min {
        return None;
    }

    let bin_width = (max - min) / TRIANGLE_BINS as f32;
    let mut histogram = [0usize; TRIANGLE_BINS];
    for &v in values.iter().filter(|v| v.is_finite()) {
        let bin = (((v - min) / bin_width) as usize).min(TRIANGLE_BINS - 1);
        histogram[bin] += 1;
    }

    let peak = histogram
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
        .map_or(0, |(i, _)| i);
    let first = histogram.iter().position(|&h| h > 0).unwrap_or(0);
    let last = histogram.iter().rposition(|&h| h > 0).unwrap_or(0);

    // Work on the longer tail; mirror if it lies below the peak.
    let flip = peak - first > last - peak;
    let hist = |i: usize| -> f64 {
        if flip {
            histogram[TRIANGLE_BINS - 1 - i] as f64
        } else {
            histogram[i] as f64
        }
    };
    let (start, end) = if flip {
        (TRIANGLE_BINS - 1 - peak, TRIANGLE_BINS - 1 - first)
    } else {
        (peak, last)
    };

    // Line from the peak to the first empty bin past the tail.
    let (x1, y1) = (start as f64, hist(start));
    let (x2, y2) = if end + 1 < TRIANGLE_BINS {
        ((end + 1) as f64, 0.0)
    } else {
        (end as f64, hist(end))
    };
    let mut best = start;
    let mut best_dist = f64::NEG_INFINITY;
    for i in start..=end {
        // Positive below the line; the common normalization is dropped.
        let dist = (y2 - y1) * i as f64 - (x2 - x1) * hist(i) + x2 * y1 - y2 * x1;
        if dist > best_dist {
            best_dist = dist;
            best = i;
        }
    }

    let level = if flip { TRIANGLE_BINS - 1 - best } else { best };
    Some(min + (level + 1) as f32 * bin_width)
}
