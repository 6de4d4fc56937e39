//! Local-maximum search on 2D fields.

use common::Buffer2;
use serde::{Deserialize, Serialize};

/// Integer pixel position of a spectral peak and its intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPeak {
    pub x: usize,
    pub y: usize,
    pub value: f32,
}

/// Find 8-neighbour local maxima strictly above `threshold`.
///
/// On plateaus only the first pixel in row-major order is reported: a pixel
/// must exceed its earlier neighbours and be at least as high as its later
/// ones. With `exclude_edges` border pixels are never reported.
///
/// Peaks are returned brightest first; equal values keep row-major order.
pub fn find_maxima(
    field: &Buffer2<f32>,
    threshold: f32,
    exclude_edges: bool,
) -> Vec<FrequencyPeak> {
    let (width, height) = field.dimensions();
    let mut peaks = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let on_edge = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            if exclude_edges && on_edge {
                continue;
            }
            let value = field[(x, y)];
            if value.is_nan() || value <= threshold {
                continue;
            }
            if is_local_max(field, x, y, value) {
                peaks.push(FrequencyPeak { x, y, value });
            }
        }
    }

    peaks.sort_by(|a, b| b.value.total_cmp(&a.value));
    peaks
}

fn is_local_max(field: &Buffer2<f32>, x: usize, y: usize, value: f32) -> bool {
    let (width, height) = field.dimensions();
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as isize + dx;
            let ny = y as isize + dy;
            if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                continue;
            }
            let neighbour = field[(nx as usize, ny as usize)];
            let earlier = dy < 0 || (dy == 0 && dx < 0);
            if earlier && neighbour >= value {
                return false;
            }
            if !earlier && neighbour > value {
                return false;
            }
        }
    }
    true
}
