use crate::{dimension::Dimension, Error, Result};
use std::ops::AddAssign;

/// Dense multidimensional array of accumulated signal and squared error.
///
/// Bins are stored flattened with axis 0 varying fastest: the bin `[i0, i1, i2]` of a histogram
/// with dimensions `[n0, n1, n2]` is at `i0 + n0 * (i1 + n1 * i2)`. This is the reverse of a
/// row-major (last axis fastest) layout; use [`indices`](Self::indices) and
/// [`linear_index`](Self::linear_index) to convert. Empty bins hold zero.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseHistogram {
    axes: Vec<Dimension>,
    dims: Vec<usize>,
    signals: Vec<f64>,
    errors_squared: Vec<f64>,
    event_counts: Vec<u64>,
}

impl DenseHistogram {
    /// Creates an empty [`DenseHistogram`] with the given axes.
    pub fn new(axes: Vec<Dimension>) -> Result<Self> {
        for (index, axis) in axes.iter().enumerate() {
            axis.validate(index)?;
        }

        let dims: Vec<_> = axes.iter().map(|axis| axis.bins).collect();
        let mut len = 1usize;
        for (index, &bins) in dims.iter().enumerate() {
            len = len.checked_mul(bins).ok_or_else(|| Error::InvalidAxis {
                index,
                reason: "total number of bins overflows usize".to_string(),
            })?;
        }
        Ok(Self {
            axes,
            dims,
            signals: vec![0.0; len],
            errors_squared: vec![0.0; len],
            event_counts: vec![0; len],
        })
    }

    /// Creates an empty [`DenseHistogram`] with the same axes as this one.
    #[inline]
    pub fn zeros_like(&self) -> Self {
        Self {
            axes: self.axes.clone(),
            dims: self.dims.clone(),
            signals: vec![0.0; self.len()],
            errors_squared: vec![0.0; self.len()],
            event_counts: vec![0; self.len()],
        }
    }

    /// Returns the axes of the histogram.
    #[inline]
    pub fn axes(&self) -> &[Dimension] {
        &self.axes
    }

    /// Returns the number of bins along each axis.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the total number of bins.
    #[inline]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns `true` if the histogram has no bins.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Returns the signal of every bin.
    #[inline]
    pub fn signals(&self) -> &[f64] {
        &self.signals
    }

    /// Returns the squared error of every bin.
    #[inline]
    pub fn errors_squared(&self) -> &[f64] {
        &self.errors_squared
    }

    /// Returns the number of events accumulated in every bin.
    #[inline]
    pub fn event_counts(&self) -> &[u64] {
        &self.event_counts
    }

    /// Returns the error (square root of the squared error) of a bin.
    #[inline]
    pub fn error(&self, index: usize) -> f64 {
        self.errors_squared[index].sqrt()
    }

    /// Returns the flattened index of the bin with the given index along each axis.
    pub fn linear_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.dims.len() {
            return None;
        }

        let mut linear = 0;
        for (&index, &n) in indices.iter().zip(&self.dims).rev() {
            if index >= n {
                return None;
            }
            linear = linear * n + index;
        }
        Some(linear)
    }

    /// Returns the index along each axis of the bin at the flattened index.
    pub fn indices(&self, mut linear: usize) -> Vec<usize> {
        self.dims
            .iter()
            .map(|&n| {
                let index = linear % n;
                linear /= n;
                index
            })
            .collect()
    }

    /// Returns the flattened index of the bin containing the position in histogram
    /// coordinates, or `None` if it lies outside any axis.
    #[inline]
    pub fn bin_of(&self, position: &[f64]) -> Option<usize> {
        let mut linear = 0;
        for (axis, &value) in self.axes.iter().zip(position).rev() {
            linear = linear * axis.bins + axis.bin_of(value)?;
        }
        Some(linear)
    }

    /// Adds the given signal, squared error and number of events to a bin.
    #[inline]
    pub fn add(&mut self, index: usize, signal: f64, error_squared: f64, events: u64) {
        self.signals[index] += signal;
        self.errors_squared[index] += error_squared;
        self.event_counts[index] += events;
    }

    /// Returns the sum of the signal of every bin.
    #[inline]
    pub fn total_signal(&self) -> f64 {
        self.signals.iter().sum()
    }

    /// Returns the sum of the squared error of every bin.
    #[inline]
    pub fn total_error_squared(&self) -> f64 {
        self.errors_squared.iter().sum()
    }

    /// Returns the number of events accumulated in the histogram.
    #[inline]
    pub fn total_events(&self) -> u64 {
        self.event_counts.iter().sum()
    }

    /// Consumes the histogram, returning its signals and squared errors.
    #[inline]
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.signals, self.errors_squared)
    }
}

impl AddAssign<&DenseHistogram> for DenseHistogram {
    /// Adds every bin of `rhs` to this histogram. Both must have the same dimensions.
    #[inline]
    fn add_assign(&mut self, rhs: &DenseHistogram) {
        debug_assert_eq!(self.dims, rhs.dims, "histograms with different dimensions");
        for (lhs, rhs) in self.signals.iter_mut().zip(&rhs.signals) {
            *lhs += rhs;
        }
        for (lhs, rhs) in self.errors_squared.iter_mut().zip(&rhs.errors_squared) {
            *lhs += rhs;
        }
        for (lhs, rhs) in self.event_counts.iter_mut().zip(&rhs.event_counts) {
            *lhs += rhs;
        }
    }
}
