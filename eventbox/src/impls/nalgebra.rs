use crate::{transform::CoordinateTransform, Point, Result};
use nalgebra::{SMatrix, SVector};

impl<const D: usize> Point<D> for SVector<f64, D> {
    #[inline]
    fn to_coordinates(&self) -> [f64; D] {
        (*self).into()
    }
}

impl<const D: usize> Point<D> for &SVector<f64, D> {
    #[inline]
    fn to_coordinates(&self) -> [f64; D] {
        (**self).into()
    }
}

impl<const IN: usize, const OUT: usize> CoordinateTransform<IN, OUT> {
    /// Creates a transform from a matrix whose rows are the basis vectors of the output axes.
    #[inline]
    pub fn from_matrix(matrix: &SMatrix<f64, OUT, IN>, origin: impl Point<OUT>) -> Result<Self> {
        Self::new(
            std::array::from_fn(|j| std::array::from_fn(|i| matrix[(j, i)])),
            origin.to_coordinates(),
        )
    }
}
