use std::ops::{Deref, DerefMut, Index, IndexMut};

use serde::{Deserialize, Serialize};

/// Row-major 2D buffer, `width` pixels per row.
///
/// Used for raw image planes, spectral amplitude/phase fields and
/// per-pixel result maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buffer2<T> {
    pixels: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2<T> {
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel in row-major order.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        &mut self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Apply `f` to every pixel, producing a buffer of the same shape.
    pub fn map<U, F>(&self, f: F) -> Buffer2<U>
    where
        F: FnMut(&T) -> U,
    {
        Buffer2 {
            pixels: self.pixels.iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Combine two same-shaped buffers pixel by pixel.
    pub fn zip_map<U, V, F>(&self, other: &Buffer2<U>, mut f: F) -> Buffer2<V>
    where
        F: FnMut(&T, &U) -> V,
    {
        assert_eq!(self.width, other.width, "width mismatch");
        assert_eq!(self.height, other.height, "height mismatch");
        Buffer2 {
            pixels: self
                .pixels
                .iter()
                .zip(other.pixels.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
            width: self.width,
            height: self.height,
        }
    }
}

impl<T: Copy + Default> Buffer2<T> {
    pub fn new_default(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![T::default(); width * height],
            width,
            height,
        }
    }

    /// Copy into the top-left corner of a larger zero-initialized buffer.
    pub fn padded(&self, width: usize, height: usize) -> Self {
        assert!(
            width >= self.width && height >= self.height,
            "padded size {}x{} smaller than buffer {}x{}",
            width,
            height,
            self.width,
            self.height
        );
        let mut out = Self::new_default(width, height);
        for y in 0..self.height {
            out.row_mut(y)[..self.width].copy_from_slice(self.row(y));
        }
        out
    }
}

impl Buffer2<f32> {
    /// Mean pixel value accumulated in f64.
    pub fn mean(&self) -> f64 {
        if self.pixels.is_empty() {
            return 0.0;
        }
        self.pixels.iter().map(|&v| v as f64).sum::<f64>() / self.pixels.len() as f64
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

impl<T> Deref for Buffer2<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}

impl<T> DerefMut for Buffer2<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stores_dimensions() {
        let buf = Buffer2::new(3, 2, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(buf.dimensions(), (3, 2));
        assert_eq!(buf.len(), 6);
    }

    #[test]
    #[should_panic(expected = "pixels length must equal width * height")]
    fn test_new_panics_on_size_mismatch() {
        Buffer2::new(3, 2, vec![1, 2, 3]);
    }

    #[test]
    fn test_from_fn_is_row_major() {
        let buf = Buffer2::from_fn(3, 2, |x, y| y * 10 + x);
        assert_eq!(buf.pixels(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(buf[(2, 1)], 12);
        assert_eq!(buf.row(1), &[10, 11, 12]);
    }

    #[test]
    fn test_map_and_zip_map() {
        let a = Buffer2::new(2, 1, vec![1.0f32, 4.0]);
        let b = Buffer2::new(2, 1, vec![2.0f32, 2.0]);
        let sq = a.map(|v| v.sqrt());
        assert_eq!(sq.pixels(), &[1.0, 2.0]);
        let ratio = a.zip_map(&b, |x, y| x / y);
        assert_eq!(ratio.pixels(), &[0.5, 2.0]);
    }

    #[test]
    #[should_panic(expected = "width mismatch")]
    fn test_zip_map_panics_on_shape_mismatch() {
        let a = Buffer2::new(2, 1, vec![1.0f32, 4.0]);
        let b = Buffer2::new(1, 2, vec![2.0f32, 2.0]);
        let _ = a.zip_map(&b, |x, y| x + y);
    }

    #[test]
    fn test_padded_keeps_top_left() {
        let buf = Buffer2::new(2, 2, vec![1.0f32, 2.0, 3.0, 4.0]);
        let padded = buf.padded(4, 4);
        assert_eq!(padded.dimensions(), (4, 4));
        assert_eq!(padded.row(0), &[1.0, 2.0, 0.0, 0.0]);
        assert_eq!(padded.row(1), &[3.0, 4.0, 0.0, 0.0]);
        assert!(padded.row(3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mean() {
        let buf = Buffer2::new(3, 1, vec![1.0f32, 5.0, 3.0]);
        assert!((buf.mean() - 3.0).abs() < 1e-12);
        let empty: Buffer2<f32> = Buffer2::new(0, 0, Vec::new());
        assert_eq!(empty.mean(), 0.0);
    }
}
