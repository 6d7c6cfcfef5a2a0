use crate::{Error, Result};

/// An axis of a workspace or of a histogram.
///
/// The axis covers the half-open range `[min, max)` cut into `bins` bins of equal width.
#[derive(Clone, Debug, PartialEq)]
pub struct Dimension {
    /// Name of the axis.
    pub name: String,
    /// Units of the coordinates along the axis.
    pub units: String,
    /// Lower bound of the axis.
    pub min: f64,
    /// Upper bound of the axis.
    pub max: f64,
    /// Number of bins along the axis.
    pub bins: usize,
}

impl Dimension {
    /// Creates a new [`Dimension`].
    #[inline]
    pub fn new(
        name: impl Into<String>,
        units: impl Into<String>,
        min: f64,
        max: f64,
        bins: usize,
    ) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            min,
            max,
            bins,
        }
    }

    /// Returns the width of one bin.
    #[inline]
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins as f64
    }

    /// Returns the lower edge of bin `k`. Edge `bins` is exactly `max`.
    #[inline]
    pub fn edge(&self, k: usize) -> f64 {
        if k >= self.bins {
            self.max
        } else {
            self.min + k as f64 * self.bin_width()
        }
    }

    /// Returns the bin containing `value`, or `None` if it lies outside `[min, max)` or is NaN.
    ///
    /// A value exactly on an edge belongs to the bin starting at that edge.
    #[inline]
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        if !(value >= self.min && value < self.max) {
            return None;
        }

        let guess = ((value - self.min) / self.bin_width()).floor();
        let mut k = if guess < 0.0 {
            0
        } else {
            (guess as usize).min(self.bins - 1)
        };

        // Rounding can leave the guess one bin off the exact edges.
        if k > 0 && value < self.edge(k) {
            k -= 1;
        } else if k + 1 < self.bins && value >= self.edge(k + 1) {
            k += 1;
        }
        Some(k)
    }

    /// Checks that the axis has bins and finite, non-empty extents.
    pub fn validate(&self, index: usize) -> Result<()> {
        let reason = if self.bins == 0 {
            "no bins"
        } else if !self.min.is_finite() || !self.max.is_finite() {
            "non-finite extents"
        } else if self.min >= self.max {
            "minimum is not below maximum"
        } else {
            return Ok(());
        };

        Err(Error::InvalidAxis {
            index,
            reason: format!("{reason} (`{}`: [{}, {}) in {} bins)", self.name, self.min, self.max, self.bins),
        })
    }
}
