use crate::{tree::BoundingBox, Point};

/// Side of a hyperplane a [`Constraint::HalfSpace`] keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sense {
    /// Points with `normal · x >= offset`.
    Above,
    /// Points with `normal · x < offset`.
    Below,
}

/// How a box relates to a spatial predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Containment {
    /// No point of the box satisfies the predicate.
    Outside,
    /// Every point of the box satisfies the predicate.
    Inside,
    /// The box may contain points on both sides.
    Touching,
}

/// A single predicate of an [`ImplicitFunction`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constraint<const D: usize> {
    /// One side of a hyperplane.
    HalfSpace {
        /// Normal of the hyperplane.
        normal: [f64; D],
        /// Value of `normal · x` on the hyperplane.
        offset: f64,
        /// Side of the hyperplane that is kept.
        sense: Sense,
    },
    /// Open ball, keeping points strictly closer to `center` than the radius.
    Sphere {
        /// Center of the ball.
        center: [f64; D],
        /// Square of the radius of the ball.
        radius_squared: f64,
    },
}

#[inline]
fn dot<const D: usize>(normal: &[f64; D], position: &[f64; D]) -> f64 {
    (0..D).fold(0.0, |sum, i| sum + normal[i] * position[i])
}

impl<const D: usize> Constraint<D> {
    /// Creates a [`Constraint::HalfSpace`].
    #[inline]
    pub fn half_space(normal: impl Point<D>, offset: f64, sense: Sense) -> Self {
        Self::HalfSpace {
            normal: normal.to_coordinates(),
            offset,
            sense,
        }
    }

    /// Creates a [`Constraint::Sphere`] from its center and radius.
    #[inline]
    pub fn sphere(center: impl Point<D>, radius: f64) -> Self {
        Self::Sphere {
            center: center.to_coordinates(),
            radius_squared: radius * radius,
        }
    }

    /// Returns `true` if the position satisfies the constraint.
    #[inline]
    pub fn contains(&self, position: &[f64; D]) -> bool {
        match self {
            Self::HalfSpace {
                normal,
                offset,
                sense: Sense::Above,
            } => dot(normal, position) >= *offset,
            Self::HalfSpace {
                normal,
                offset,
                sense: Sense::Below,
            } => dot(normal, position) < *offset,
            Self::Sphere {
                center,
                radius_squared,
            } => {
                let distance_squared = (0..D).fold(0.0, |sum, i| {
                    let d = position[i] - center[i];
                    sum + d * d
                });
                distance_squared < *radius_squared
            }
        }
    }

    /// Classifies the closed box against the constraint.
    ///
    /// [`Containment::Inside`] and [`Containment::Outside`] are exact for every point the box
    /// can hold, [`Containment::Touching`] is returned whenever neither can be guaranteed.
    pub fn classify(&self, extents: &BoundingBox<[f64; D]>) -> Containment {
        match self {
            Self::HalfSpace {
                normal,
                offset,
                sense,
            } => {
                // Range of `normal · x` over the box, summed in the same order as `dot`.
                let (low, high) = (0..D).fold((0.0, 0.0), |(low, high), i| {
                    if normal[i] == 0.0 {
                        return (low, high);
                    }
                    let a = normal[i] * extents.min[i];
                    let b = normal[i] * extents.max[i];
                    (low + a.min(b), high + a.max(b))
                });

                match sense {
                    Sense::Above if low >= *offset => Containment::Inside,
                    Sense::Above if !(high >= *offset) => Containment::Outside,
                    Sense::Below if high < *offset => Containment::Inside,
                    Sense::Below if !(low < *offset) => Containment::Outside,
                    _ => Containment::Touching,
                }
            }
            Self::Sphere {
                center,
                radius_squared,
            } => {
                if extents.farthest_squared_from(center) < *radius_squared {
                    Containment::Inside
                } else if extents.distance_squared_to(center) >= *radius_squared {
                    Containment::Outside
                } else {
                    Containment::Touching
                }
            }
        }
    }

    /// Returns a box enclosing every point satisfying the constraint. Unbounded axes span the
    /// whole real line.
    pub fn bounds(&self) -> BoundingBox<[f64; D]> {
        let mut bounds = BoundingBox::default();
        match self {
            Self::HalfSpace {
                normal,
                offset,
                sense,
            } => {
                // Only a unit normal along a single axis gives an exact bound.
                let mut axes = (0..D).filter(|&i| normal[i] != 0.0);
                if let (Some(axis), None) = (axes.next(), axes.next()) {
                    match (normal[axis], sense) {
                        (n, Sense::Above) if n == 1.0 => bounds.min[axis] = *offset,
                        (n, Sense::Below) if n == 1.0 => bounds.max[axis] = *offset,
                        (n, Sense::Above) if n == -1.0 => bounds.max[axis] = -*offset,
                        (n, Sense::Below) if n == -1.0 => bounds.min[axis] = -*offset,
                        _ => {}
                    }
                }
            }
            Self::Sphere {
                center,
                radius_squared,
            } => {
                let radius = radius_squared.sqrt();
                for i in 0..D {
                    let pad = radius + (center[i].abs() + radius) * 1e-12;
                    bounds.min[i] = center[i] - pad;
                    bounds.max[i] = center[i] + pad;
                }
            }
        }
        bounds
    }
}

/// Region of space defined as the intersection of [`Constraint`]s.
///
/// A point is contained when it satisfies every constraint; an empty function contains all of
/// space. The function holds no mutable state and can be shared freely between threads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImplicitFunction<const D: usize> {
    constraints: Vec<Constraint<D>>,
}

impl<const D: usize> ImplicitFunction<D> {
    /// Creates an [`ImplicitFunction`] without constraints.
    #[inline]
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    /// Creates an [`ImplicitFunction`] from the given constraints.
    #[inline]
    pub fn from_constraints(constraints: impl IntoIterator<Item = Constraint<D>>) -> Self {
        Self {
            constraints: constraints.into_iter().collect(),
        }
    }

    /// Creates an [`ImplicitFunction`] keeping the half-open box `[min, max)` as `2 * D`
    /// half-spaces.
    pub fn from_box(extents: &BoundingBox<[f64; D]>) -> Self {
        let axis = |i: usize| std::array::from_fn::<f64, D, _>(|j| f64::from(u8::from(i == j)));
        Self::from_constraints((0..D).flat_map(|i| {
            [
                Constraint::half_space(axis(i), extents.min[i], Sense::Above),
                Constraint::half_space(axis(i), extents.max[i], Sense::Below),
            ]
        }))
    }

    /// Adds a constraint.
    #[inline]
    pub fn with(mut self, constraint: Constraint<D>) -> Self {
        self.push(constraint);
        self
    }

    /// Adds a constraint.
    #[inline]
    pub fn push(&mut self, constraint: Constraint<D>) {
        self.constraints.push(constraint);
    }

    /// Returns the constraints of the function.
    #[inline]
    pub fn constraints(&self) -> &[Constraint<D>] {
        &self.constraints
    }

    /// Returns `true` if the function has no constraints.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Returns `true` if the position satisfies every constraint.
    #[inline]
    pub fn contains(&self, position: &[f64; D]) -> bool {
        self.constraints.iter().all(|c| c.contains(position))
    }

    /// Classifies the box against every constraint.
    ///
    /// The box is outside as soon as one constraint excludes it and inside only when every
    /// constraint includes it.
    pub fn classify(&self, extents: &BoundingBox<[f64; D]>) -> Containment {
        let mut result = Containment::Inside;
        for constraint in &self.constraints {
            match constraint.classify(extents) {
                Containment::Outside => return Containment::Outside,
                Containment::Touching => result = Containment::Touching,
                Containment::Inside => {}
            }
        }
        result
    }

    /// Returns `true` if no point of the box satisfies the function.
    #[inline]
    pub fn box_is_fully_outside(&self, extents: &BoundingBox<[f64; D]>) -> bool {
        self.classify(extents) == Containment::Outside
    }

    /// Returns `true` if every point of the box satisfies the function.
    #[inline]
    pub fn box_is_fully_inside(&self, extents: &BoundingBox<[f64; D]>) -> bool {
        self.classify(extents) == Containment::Inside
    }

    /// Returns a box enclosing every point contained by the function.
    pub fn bounds(&self) -> BoundingBox<[f64; D]> {
        self.constraints
            .iter()
            .fold(BoundingBox::default(), |bounds, c| bounds.intersection(&c.bounds()))
    }
}

impl<const D: usize> FromIterator<Constraint<D>> for ImplicitFunction<D> {
    #[inline]
    fn from_iter<I: IntoIterator<Item = Constraint<D>>>(iter: I) -> Self {
        Self::from_constraints(iter)
    }
}
