use crate::{tree::BoundingBox, Error, Result};

/// Linear map from `IN`-dimensional workspace coordinates to `OUT`-dimensional histogram
/// coordinates, `output[j] = origin[j] + Σ basis[j][i] * input[i]`.
///
/// Transforms hold no mutable state and can be shared freely between threads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CoordinateTransform<const IN: usize, const OUT: usize> {
    /// Every output axis is one input axis, scaled and shifted.
    Aligned {
        /// Input axis read by each output axis.
        dimensions: [usize; OUT],
        /// Factor applied to the input coordinate.
        scale: [f64; OUT],
        /// Output coordinate of the input origin.
        origin: [f64; OUT],
    },
    /// Dense basis, one row of `IN` coefficients per output axis.
    Affine {
        /// Basis vectors of the output axes, expressed in input coordinates.
        basis: [[f64; IN]; OUT],
        /// Output coordinate of the input origin.
        origin: [f64; OUT],
    },
}

fn check_dimensions(expected: usize, found: usize, context: &'static str) -> Result<()> {
    if expected != found {
        return Err(Error::InvalidDimensionality {
            context,
            expected,
            found,
        });
    }
    Ok(())
}

impl<const IN: usize, const OUT: usize> CoordinateTransform<IN, OUT> {
    fn check_output() -> Result<()> {
        if OUT > IN || OUT == 0 {
            return Err(Error::InvalidDimensionality {
                context: "output dimensions of a transform (at most the input dimensions)",
                expected: IN,
                found: OUT,
            });
        }
        Ok(())
    }

    /// Creates an aligned transform reading the given input axes without scaling.
    #[inline]
    pub fn aligned(dimensions: [usize; OUT]) -> Result<Self> {
        Self::aligned_scaled(dimensions, [1.0; OUT], [0.0; OUT])
    }

    /// Creates an aligned transform reading the given input axes with a scale and origin for
    /// each output axis.
    pub fn aligned_scaled(
        dimensions: [usize; OUT],
        scale: [f64; OUT],
        origin: [f64; OUT],
    ) -> Result<Self> {
        let transform = Self::Aligned {
            dimensions,
            scale,
            origin,
        };
        transform.check()?;
        Ok(transform)
    }

    /// Checks that the output is not larger than the input and that every input axis read by an
    /// aligned transform exists.
    pub(crate) fn check(&self) -> Result<()> {
        Self::check_output()?;
        if let Self::Aligned { dimensions, .. } = self {
            if let Some(&d) = dimensions.iter().find(|&&d| d >= IN) {
                return Err(Error::InvalidDimensionality {
                    context: "input axis read by an aligned transform",
                    expected: IN,
                    found: d + 1,
                });
            }
        }
        Ok(())
    }

    /// Creates a transform from its basis vectors and origin.
    ///
    /// The aligned representation is chosen when every basis vector has exactly one nonzero
    /// component; that component becomes the scale of the axis.
    pub fn new(basis: [[f64; IN]; OUT], origin: [f64; OUT]) -> Result<Self> {
        Self::check_output()?;

        let mut dimensions = [0; OUT];
        let mut scale = [0.0; OUT];
        for (j, row) in basis.iter().enumerate() {
            let mut nonzero = (0..IN).filter(|&i| row[i] != 0.0);
            match (nonzero.next(), nonzero.next()) {
                (Some(i), None) => {
                    dimensions[j] = i;
                    scale[j] = row[i];
                }
                _ => return Ok(Self::Affine { basis, origin }),
            }
        }

        Ok(Self::Aligned {
            dimensions,
            scale,
            origin,
        })
    }

    /// Creates a transform from basis vectors and origin of runtime size, checking them against
    /// `IN` and `OUT`.
    pub fn from_basis(basis: &[Vec<f64>], origin: &[f64]) -> Result<Self> {
        check_dimensions(OUT, basis.len(), "number of basis vectors")?;
        check_dimensions(OUT, origin.len(), "length of the origin")?;
        for row in basis {
            check_dimensions(IN, row.len(), "length of a basis vector")?;
        }

        Self::new(
            std::array::from_fn(|j| std::array::from_fn(|i| basis[j][i])),
            std::array::from_fn(|j| origin[j]),
        )
    }

    /// Returns `true` if the transform uses the aligned representation.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        matches!(self, Self::Aligned { .. })
    }

    /// Returns the output coordinates of the input origin.
    #[inline]
    pub fn origin(&self) -> [f64; OUT] {
        match self {
            Self::Aligned { origin, .. } | Self::Affine { origin, .. } => *origin,
        }
    }

    /// Returns the dense basis of the transform.
    pub fn basis(&self) -> [[f64; IN]; OUT] {
        match self {
            Self::Aligned {
                dimensions, scale, ..
            } => std::array::from_fn(|j| {
                let mut row = [0.0; IN];
                row[dimensions[j]] = scale[j];
                row
            }),
            Self::Affine { basis, .. } => *basis,
        }
    }

    /// Maps input coordinates to output coordinates.
    #[inline]
    pub fn forward(&self, input: &[f64; IN]) -> [f64; OUT] {
        match self {
            Self::Aligned {
                dimensions,
                scale,
                origin,
            } => std::array::from_fn(|j| origin[j] + scale[j] * input[dimensions[j]]),
            Self::Affine { basis, origin } => std::array::from_fn(|j| {
                let row = &basis[j];
                origin[j]
                    + (0..IN).fold(0.0, |sum, i| {
                        if row[i] == 0.0 {
                            sum
                        } else {
                            sum + row[i] * input[i]
                        }
                    })
            }),
        }
    }

    /// Returns the smallest box enclosing the image of the closed input box.
    ///
    /// Every point `x` of `extents` maps to a point of the result when computed with
    /// [`forward`](Self::forward), rounding included.
    pub fn map_extents(&self, extents: &BoundingBox<[f64; IN]>) -> BoundingBox<[f64; OUT]> {
        let interval = |coefficient: f64, i: usize| {
            let a = coefficient * extents.min[i];
            let b = coefficient * extents.max[i];
            (a.min(b), a.max(b))
        };

        match self {
            Self::Aligned {
                dimensions,
                scale,
                origin,
            } => {
                let mut result = BoundingBox::new([0.0; OUT], [0.0; OUT]);
                for j in 0..OUT {
                    let (low, high) = interval(scale[j], dimensions[j]);
                    result.min[j] = origin[j] + low;
                    result.max[j] = origin[j] + high;
                }
                result
            }
            Self::Affine { basis, origin } => {
                let mut result = BoundingBox::new([0.0; OUT], [0.0; OUT]);
                for j in 0..OUT {
                    let (low, high) = (0..IN).fold((0.0, 0.0), |(low, high), i| {
                        if basis[j][i] == 0.0 {
                            return (low, high);
                        }
                        let (a, b) = interval(basis[j][i], i);
                        (low + a, high + b)
                    });
                    result.min[j] = origin[j] + low;
                    result.max[j] = origin[j] + high;
                }
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_is_selected_automatically() {
        let aligned = CoordinateTransform::<3, 2>::new(
            [[0.0, 0.0, 2.0], [1.0, 0.0, 0.0]],
            [1.0, -1.0],
        )
        .unwrap();
        assert_eq!(
            aligned,
            CoordinateTransform::Aligned {
                dimensions: [2, 0],
                scale: [2.0, 1.0],
                origin: [1.0, -1.0],
            }
        );
        assert_eq!(aligned.forward(&[3.0, 4.0, 5.0]), [11.0, 2.0]);

        let oblique = CoordinateTransform::<2, 1>::new([[1.0, 1.0]], [0.0]).unwrap();
        assert!(!oblique.is_aligned());
        assert_eq!(oblique.forward(&[3.0, 4.0]), [7.0]);
    }

    #[test]
    fn both_representations_agree() {
        let basis = [[0.5, 0.0, 0.0], [0.0, 0.0, -3.0]];
        let aligned = CoordinateTransform::<3, 2>::new(basis, [0.25, 1.0]).unwrap();
        let affine = CoordinateTransform::Affine {
            basis,
            origin: [0.25, 1.0],
        };

        assert_eq!(aligned.basis(), basis);
        for input in [[1.0, 2.0, 3.0], [-4.0, 0.0, 0.5], [0.0, 0.0, 0.0]] {
            assert_eq!(aligned.forward(&input), affine.forward(&input));
        }

        let extents = BoundingBox::new([0.0, 0.0, -1.0], [2.0, 1.0, 1.0]);
        assert_eq!(aligned.map_extents(&extents), affine.map_extents(&extents));
        assert_eq!(
            aligned.map_extents(&extents),
            BoundingBox::new([0.25, -2.0], [1.25, 4.0])
        );
    }

    #[test]
    fn mapped_extents_enclose_mapped_points() {
        let transform = CoordinateTransform::<2, 1>::new([[0.6, -0.8]], [0.1]).unwrap();
        let extents = BoundingBox::new([-1.0, 2.0], [3.0, 5.0]);
        let mapped = transform.map_extents(&extents);

        for x in [-1.0, 0.0, 1.7, 3.0] {
            for y in [2.0, 2.5, 4.9, 5.0] {
                assert!(mapped.contains_closed(&transform.forward(&[x, y])));
            }
        }
    }

    #[test]
    fn dimensionality_is_checked() {
        assert!(matches!(
            CoordinateTransform::<1, 2>::aligned([0, 0]),
            Err(Error::InvalidDimensionality { .. })
        ));
        assert!(CoordinateTransform::<2, 1>::aligned([2]).is_err());
        let built = CoordinateTransform::<2, 1>::Aligned {
            dimensions: [5],
            scale: [1.0],
            origin: [0.0],
        };
        assert!(matches!(built.check(), Err(Error::InvalidDimensionality { found: 6, .. })));
        assert!(CoordinateTransform::<2, 1>::aligned([1]).unwrap().check().is_ok());
        assert!(CoordinateTransform::<2, 1>::from_basis(&[vec![1.0, 0.0, 0.0]], &[0.0]).is_err());
        assert!(CoordinateTransform::<2, 1>::from_basis(&[vec![1.0, 0.0]], &[]).is_err());
        assert!(CoordinateTransform::<2, 1>::from_basis(&[vec![1.0, 2.0]], &[0.0]).is_ok());
    }
}
