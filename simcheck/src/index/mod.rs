//! Hyperstack index arithmetic.
//!
//! Planes of a multi-dimensional acquisition are stored as one flat sequence,
//! fastest-varying axis first. Positions and indices are 1-based, matching the
//! way microscope stacks are numbered.
//!
//! - [`linear_index`] maps `(position, size)` pairs to a plane index
//! - [`axis_positions`] is its inverse
//! - [`SliceList`] lazily enumerates the plane indices of a Cartesian product
//!   of closed per-axis ranges, in storage order


use crate::error::{Error, Result};

/// Map `(position, size)` pairs, fastest-varying axis first, to a 1-based
/// linear index:
///
/// `index = pos₁ + Σ_{k≥2} (posₖ − 1) · Π_{j<k} sizeⱼ`
pub fn linear_index(axes: &[(usize, usize)]) -> Result<usize> {
    assert!(!axes.is_empty(), "at least one axis is required");

    let mut index = 1;
    let mut stride = 1;
    for (axis, &(position, size)) in axes.iter().enumerate() {
        if position < 1 || position > size {
            return Err(Error::InvalidCoordinate {
                axis,
                position,
                size,
            });
        }
        index += (position - 1) * stride;
        stride *= size;
    }
    Ok(index)
}

/// Inverse of [`linear_index`]: recover the 1-based position on every axis.
pub fn axis_positions(index: usize, sizes: &[usize]) -> Result<Vec<usize>> {
    assert!(!sizes.is_empty(), "at least one axis is required");

    let total: usize = sizes.iter().product();
    if index < 1 || index > total {
        return Err(Error::IndexOutOfRange { index, total });
    }

    let mut remainder = index - 1;
    let positions = sizes
        .iter()
        .map(|&size| {
            let position = remainder % size + 1;
            remainder /= size;
            position
        })
        .collect();
    Ok(positions)
}

/// Closed range `first..=last` on one axis of `size` planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub size: usize,
    pub first: usize,
    pub last: usize,
}

impl AxisRange {
    pub fn new(size: usize, first: usize, last: usize) -> Self {
        Self { size, first, last }
    }

    /// A single position on the axis.
    pub fn single(size: usize, position: usize) -> Self {
        Self::new(size, position, position)
    }

    /// The whole axis.
    pub fn full(size: usize) -> Self {
        Self::new(size, 1, size)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.last + 1 - self.first
    }

    #[inline]
    pub fn is_single(&self) -> bool {
        self.first == self.last
    }

    fn validate(&self, axis: usize) -> Result<()> {
        if self.first < 1 || self.last > self.size || self.first > self.last {
            return Err(Error::InvalidRange {
                axis,
                size: self.size,
                first: self.first,
                last: self.last,
            });
        }
        Ok(())
    }
}

/// Iterator over the linear indices covered by a set of axis ranges.
///
/// Enumerates in storage order: the slowest-varying open axis is outermost,
/// the fastest innermost. Single-position axes only contribute a fixed offset.
/// The iterator is restartable via [`SliceList::reset`].
#[derive(Debug, Clone)]
pub struct SliceList {
    ranges: Vec<AxisRange>,
    strides: Vec<usize>,
    cursor: Vec<usize>,
    remaining: usize,
}

impl SliceList {
    /// Validate the ranges (fastest-varying axis first) and build the iterator.
    pub fn new(ranges: &[AxisRange]) -> Result<Self> {
        assert!(!ranges.is_empty(), "at least one axis range is required");

        for (axis, range) in ranges.iter().enumerate() {
            range.validate(axis)?;
        }

        let mut strides = Vec::with_capacity(ranges.len());
        let mut stride = 1;
        for range in ranges {
            strides.push(stride);
            stride *= range.size;
        }

        let mut list = Self {
            ranges: ranges.to_vec(),
            strides,
            cursor: Vec::new(),
            remaining: 0,
        };
        list.reset();
        Ok(list)
    }

    /// Rewind to the first index.
    pub fn reset(&mut self) {
        self.cursor = self.ranges.iter().map(|r| r.first).collect();
        self.remaining = self.ranges.iter().map(AxisRange::len).product();
    }

    /// Number of indices in the full enumeration.
    pub fn total(&self) -> usize {
        self.ranges.iter().map(AxisRange::len).product()
    }

    fn current_index(&self) -> usize {
        1 + self
            .cursor
            .iter()
            .zip(&self.strides)
            .map(|(&pos, &stride)| (pos - 1) * stride)
            .sum::<usize>()
    }

    fn advance(&mut self) {
        // Odometer increment over open axes only, fastest first.
        for (axis, range) in self.ranges.iter().enumerate() {
            if range.is_single() {
                continue;
            }
            if self.cursor[axis] < range.last {
                self.cursor[axis] += 1;
                return;
            }
            self.cursor[axis] = range.first;
        }
    }
}

impl Iterator for SliceList {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.current_index();
        self.remaining -= 1;
        if self.remaining > 0 {
            self.advance();
        }
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SliceList {}

/// Collect the plane indices for the given ranges.
pub fn slice_list(ranges: &[AxisRange]) -> Result<Vec<usize>> {
    Ok(SliceList::new(ranges)?.collect())
}
