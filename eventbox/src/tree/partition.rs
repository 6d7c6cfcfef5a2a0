/// An axis-aligned bounding box using arrays.
///
/// Boxes are half-open: a coordinate `x` lies inside along an axis when `min <= x < max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox<A> {
    /// Minimum corner of the box.
    pub min: A,
    /// Maximum corner of the box.
    pub max: A,
}

impl<A> BoundingBox<A> {
    /// Creates a new [`BoundingBox`] with the given min and max values.
    #[inline]
    pub const fn new(min: A, max: A) -> Self {
        Self { min, max }
    }
}

impl<const D: usize> Default for BoundingBox<[f64; D]> {
    /// The unbounded box, covering all of space.
    #[inline]
    fn default() -> Self {
        Self::new([f64::NEG_INFINITY; D], [f64::INFINITY; D])
    }
}

#[allow(clippy::needless_range_loop)]
impl<const D: usize> BoundingBox<[f64; D]> {
    /// Creates a new [`BoundingBox`] from a `(min, max)` pair for each axis.
    #[inline]
    pub fn from_extents(extents: [(f64, f64); D]) -> Self {
        Self::new(extents.map(|(min, _)| min), extents.map(|(_, max)| max))
    }

    /// Returns `true` if every axis satisfies `min <= max` and both bounds are not NaN.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| self.min[i] <= self.max[i])
    }

    /// Returns `true` if the box is bounded along every axis.
    #[inline]
    pub fn is_finite(&self) -> bool {
        (0..D).all(|i| self.min[i].is_finite() && self.max[i].is_finite())
    }

    /// Returns `true` if the position lies in the half-open box.
    #[inline]
    pub fn contains(&self, position: &[f64; D]) -> bool {
        (0..D).all(|i| self.min[i] <= position[i] && position[i] < self.max[i])
    }

    /// Returns `true` if the position lies in the closed box.
    #[inline]
    pub fn contains_closed(&self, position: &[f64; D]) -> bool {
        (0..D).all(|i| self.min[i] <= position[i] && position[i] <= self.max[i])
    }

    /// Returns `true` if `other` lies entirely within this box.
    #[inline]
    pub fn encloses(&self, other: &Self) -> bool {
        (0..D).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    /// Returns `true` if this half-open box shares at least one point with the closed
    /// `region`.
    #[inline]
    pub fn intersects(&self, region: &Self) -> bool {
        (0..D).all(|i| self.min[i] <= region.max[i] && region.min[i] < self.max[i])
    }

    /// Returns the intersection of two boxes. The result may be invalid if they are disjoint.
    #[inline]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut result = *self;
        for i in 0..D {
            result.min[i] = self.min[i].max(other.min[i]);
            result.max[i] = self.max[i].min(other.max[i]);
        }
        result
    }

    /// Returns the center of the [`BoundingBox`].
    #[inline]
    pub fn center(&self) -> [f64; D] {
        std::array::from_fn(|i| (self.min[i] + self.max[i]) / 2.0)
    }

    /// Returns the size of the [`BoundingBox`].
    #[inline]
    pub fn size(&self) -> [f64; D] {
        std::array::from_fn(|i| self.max[i] - self.min[i])
    }

    /// Returns the product of the sizes of the box.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.size().into_iter().product()
    }

    /// Returns the squared distance from the position to the closest point of the box.
    #[inline]
    pub fn distance_squared_to(&self, position: &[f64; D]) -> f64 {
        (0..D)
            .map(|i| {
                let d = (self.min[i] - position[i])
                    .max(position[i] - self.max[i])
                    .max(0.0);
                d * d
            })
            .sum()
    }

    /// Returns the squared distance from the position to the farthest corner of the box.
    #[inline]
    pub fn farthest_squared_from(&self, position: &[f64; D]) -> f64 {
        (0..D)
            .map(|i| {
                let d = (position[i] - self.min[i])
                    .abs()
                    .max((self.max[i] - position[i]).abs());
                d * d
            })
            .sum()
    }

    /// Moves the position onto the nearest point inside the half-open box.
    #[inline]
    pub fn clip(&self, position: &[f64; D]) -> [f64; D] {
        std::array::from_fn(|i| {
            if position[i] < self.min[i] {
                self.min[i]
            } else if position[i] >= self.max[i] {
                next_below(self.max[i]).max(self.min[i])
            } else {
                position[i]
            }
        })
    }

    /// Returns the lower edge of the `k`-th of `splits` equal slices along `axis`.
    ///
    /// The last edge is exactly `max` so that slices tile the box without gaps.
    #[inline]
    pub fn edge(&self, axis: usize, k: usize, splits: usize) -> f64 {
        if k >= splits {
            self.max[axis]
        } else {
            self.min[axis] + (self.max[axis] - self.min[axis]) * k as f64 / splits as f64
        }
    }

    /// Returns the index of the slice along `axis` that contains `x`, out of `splits` equal
    /// slices. Values outside the box are clamped to the first or last slice.
    #[inline]
    pub fn slice_of(&self, axis: usize, x: f64, splits: usize) -> usize {
        let size = self.max[axis] - self.min[axis];
        let guess = ((x - self.min[axis]) / size * splits as f64).floor();
        let mut k = if guess.is_nan() || guess < 0.0 {
            0
        } else {
            (guess as usize).min(splits - 1)
        };

        // Rounding can leave the guess one slice off the exact edges.
        if k > 0 && x < self.edge(axis, k, splits) {
            k -= 1;
        } else if k + 1 < splits && x >= self.edge(axis, k + 1, splits) {
            k += 1;
        }
        k
    }

    /// Subdivides this [`BoundingBox`] into `splits^D` boxes, axis 0 varying fastest.
    pub fn subdivide(&self, splits: usize) -> Vec<Self> {
        let count = splits.pow(D as u32);
        (0..count)
            .map(|index| {
                let mut child = *self;
                let mut rest = index;
                for axis in 0..D {
                    let k = rest % splits;
                    rest /= splits;
                    child.min[axis] = self.edge(axis, k, splits);
                    child.max[axis] = self.edge(axis, k + 1, splits);
                }
                child
            })
            .collect()
    }

    /// Returns the flattened index of the child of a `splits^D` subdivision containing the
    /// position, consistent with [`subdivide`](Self::subdivide).
    #[inline]
    pub fn child_index(&self, position: &[f64; D], splits: usize) -> usize {
        (0..D).rev().fold(0, |index, axis| {
            index * splits + self.slice_of(axis, position[axis], splits)
        })
    }
}

/// Returns the largest `f64` strictly smaller than `x`.
#[inline]
pub fn next_below(x: f64) -> f64 {
    if x.is_nan() || x == f64::NEG_INFINITY {
        x
    } else if x == 0.0 {
        -f64::from_bits(1)
    } else if x > 0.0 {
        f64::from_bits(x.to_bits() - 1)
    } else {
        f64::from_bits(x.to_bits() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subdivision_tiles_the_box() {
        let bbox = BoundingBox::new([0.0, -1.0], [10.0, 1.0]);
        let children = bbox.subdivide(3);

        assert_eq!(children.len(), 9);
        assert_eq!(children[0].min, [0.0, -1.0]);
        assert!((children[0].max[0] - 10.0 / 3.0).abs() < 1e-12);
        assert!((children[0].max[1] + 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(children[8].max, [10.0, 1.0]);

        let volume: f64 = children.iter().map(BoundingBox::volume).sum();
        assert!((volume - bbox.volume()).abs() < 1e-12);
        assert!(children.iter().all(|child| bbox.encloses(child)));
    }

    #[test]
    fn child_index_matches_subdivision() {
        let bbox = BoundingBox::new([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        let children = bbox.subdivide(2);

        for position in [[0.1, 0.1, 0.1], [0.9, 0.1, 2.9], [0.5, 1.0, 1.5], [0.0, 1.99, 0.0]] {
            let index = bbox.child_index(&position, 2);
            assert!(children[index].contains(&position), "{position:?}");
        }
    }

    #[test]
    fn edges_belong_to_the_upper_slice() {
        let bbox = BoundingBox::new([0.0], [1.0]);
        for k in 0..10 {
            let edge = bbox.edge(0, k, 10);
            assert_eq!(bbox.slice_of(0, edge, 10), k);
        }
        assert_eq!(bbox.slice_of(0, 1.0, 10), 9);
        assert_eq!(bbox.slice_of(0, -4.0, 10), 0);
    }

    #[test]
    fn clip_stays_inside() {
        let bbox = BoundingBox::new([0.0, 0.0], [10.0, 10.0]);
        let clipped = bbox.clip(&[-5.0, 10.0]);

        assert_eq!(clipped[0], 0.0);
        assert!(clipped[1] < 10.0);
        assert!(bbox.contains(&clipped));
    }

    #[test]
    fn intersection_with_closed_region() {
        let bbox = BoundingBox::new([0.0, 0.0], [1.0, 1.0]);

        assert!(bbox.intersects(&BoundingBox::new([-1.0, -1.0], [0.0, 0.0])));
        assert!(!bbox.intersects(&BoundingBox::new([1.0, 0.0], [2.0, 1.0])));
        assert!(bbox.intersects(&BoundingBox::default()));
    }

    #[test]
    fn distances() {
        let bbox = BoundingBox::new([0.0, 0.0], [2.0, 2.0]);

        assert_eq!(bbox.distance_squared_to(&[1.0, 1.0]), 0.0);
        assert_eq!(bbox.distance_squared_to(&[3.0, 1.0]), 1.0);
        assert_eq!(bbox.farthest_squared_from(&[1.0, 1.0]), 2.0);
    }
}
