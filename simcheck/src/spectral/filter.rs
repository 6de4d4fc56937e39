//! Gaussian smoothing and the soft masks built from it.

use common::{Buffer2, EPSILON};

/// Normalized 1D Gaussian kernel of radius `ceil(3σ)`.
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    assert!(sigma > 0.0, "Sigma must be positive");

    let radius = (3.0 * sigma).ceil() as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..2 * radius + 1)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Reflect an out-of-range coordinate back into `0..n` (edge pixel not repeated).
#[inline]
fn mirror(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - m) as usize
    }
}

/// Separable Gaussian blur with mirror boundaries.
///
/// An axis whose sigma is not positive is left untouched.
pub fn gaussian_blur(image: &Buffer2<f32>, sigma_x: f32, sigma_y: f32) -> Buffer2<f32> {
    let (width, height) = image.dimensions();
    let mut out = image.clone();

    if sigma_x > 0.0 {
        let kernel = gaussian_kernel_1d(sigma_x);
        let radius = kernel.len() as isize / 2;
        for y in 0..height {
            let src = image.row(y);
            let dst = out.row_mut(y);
            for (x, d) in dst.iter_mut().enumerate() {
                *d = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, &kv)| src[mirror(x as isize + k as isize - radius, width)] * kv)
                    .sum();
            }
        }
    }

    if sigma_y > 0.0 {
        let kernel = gaussian_kernel_1d(sigma_y);
        let radius = kernel.len() as isize / 2;
        let src = out.clone();
        for y in 0..height {
            for x in 0..width {
                out[(x, y)] = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, &kv)| src[(x, mirror(y as isize + k as isize - radius, height))] * kv)
                    .sum();
            }
        }
    }

    out
}

/// Soft window that is 1 in the interior and falls to 0 at the borders.
///
/// A binary pass region excluding `fraction` of the width/height at each
/// border is blurred with σ = a quarter of the excluded margin.
pub fn edge_taper_window(width: usize, height: usize, fraction: f64) -> Buffer2<f32> {
    assert!(
        (0.0..0.5).contains(&fraction),
        "edge taper fraction must be in [0, 0.5)"
    );
    let margin_x = (fraction * width as f64) as usize;
    let margin_y = (fraction * height as f64) as usize;

    let pass = Buffer2::from_fn(width, height, |x, y| {
        let inside = x >= margin_x
            && x < width - margin_x
            && y >= margin_y
            && y < height - margin_y;
        if inside { 1.0f32 } else { 0.0 }
    });

    gaussian_blur(&pass, 0.25 * margin_x as f32, 0.25 * margin_y as f32)
}

/// Multiply an image by [`edge_taper_window`]. A negligible fraction is a no-op.
pub fn apply_edge_taper(image: &Buffer2<f32>, fraction: f64) -> Buffer2<f32> {
    if fraction.abs() <= EPSILON {
        return image.clone();
    }
    let window = edge_taper_window(image.width(), image.height(), fraction);
    image.zip_map(&window, |v, w| v * w)
}

/// Soft mask suppressing the zero order and the axis artifacts of a centered
/// spectrum.
///
/// Zeroes a central disc of radius `radius_fraction · width` and, when
/// `stripe_fraction > 0`, the horizontal and vertical stripes through the
/// center of half-width `stripe_fraction · width`. The binary mask is blurred
/// with σ = 3.
pub fn low_frequency_mask(
    width: usize,
    height: usize,
    radius_fraction: f64,
    stripe_fraction: f64,
) -> Buffer2<f32> {
    const MASK_SIGMA: f32 = 3.0;

    let (cx, cy) = ((width / 2) as isize, (height / 2) as isize);
    let radius = (radius_fraction * width as f64) as isize;
    let stripe = (stripe_fraction * width as f64) as isize;

    let mask = Buffer2::from_fn(width, height, |x, y| {
        let dx = x as isize - cx;
        let dy = y as isize - cy;
        let in_disc = dx * dx + dy * dy <= radius * radius;
        let in_stripe = stripe > 0 && (dx.abs() <= stripe || dy.abs() <= stripe);
        if in_disc || in_stripe { 0.0f32 } else { 1.0 }
    });

    gaussian_blur(&mask, MASK_SIGMA, MASK_SIGMA)
}
