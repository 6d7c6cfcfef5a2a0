use crate::{
    controller::BoxController,
    dimension::Dimension,
    event::LeanEvent,
    workspace::{EventWorkspace, InsertReport, TreeStats},
    Error, Result,
};

/// [`EventWorkspace`] of [`LeanEvent`] whose number of dimensions is only known at runtime.
///
/// Loaders reading the dimensionality from a file build one of these and dispatch on the
/// variant once to get back statically sized code.
///
/// There is no binning entry point here: a [`BinRequest`](crate::binning::BinRequest) is typed
/// by the number of input dimensions, so binning goes through the [`EventWorkspace`] obtained
/// with [`TryFrom`] (or by matching on the variant).
///
/// ```
/// use eventbox::prelude::*;
///
/// let dimensions = vec![
///     Dimension::new("h", "rlu", -2.0, 2.0, 40),
///     Dimension::new("k", "rlu", -2.0, 2.0, 40),
///     Dimension::new("l", "rlu", -2.0, 2.0, 40),
/// ];
/// let mut workspace = AnyEventWorkspace::new(dimensions, BoxController::default()).unwrap();
/// assert_eq!(workspace.num_dims(), 3);
///
/// let report = workspace
///     .insert_flat(&[0.0, 0.5, 1.0, -1.0, -0.5, 0.0], &[1.0, 2.0], &[1.0, 4.0])
///     .unwrap();
/// assert_eq!(report.inserted, 2);
/// assert_eq!(workspace.signal(), 3.0);
///
/// let typed = EventWorkspace::<3, LeanEvent<3>>::try_from(workspace).unwrap();
/// let request = BinRequest::new(
///     CoordinateTransform::aligned([0]).unwrap(),
///     vec![Dimension::new("h", "rlu", -2.0, 2.0, 4)],
/// );
/// let output = typed.bin(&request).unwrap();
/// assert_eq!(output.histogram.event_counts(), &[0, 1, 1, 0]);
/// ```
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub enum AnyEventWorkspace {
    D1(EventWorkspace<1, LeanEvent<1>>),
    D2(EventWorkspace<2, LeanEvent<2>>),
    D3(EventWorkspace<3, LeanEvent<3>>),
    D4(EventWorkspace<4, LeanEvent<4>>),
    D5(EventWorkspace<5, LeanEvent<5>>),
    D6(EventWorkspace<6, LeanEvent<6>>),
    D7(EventWorkspace<7, LeanEvent<7>>),
    D8(EventWorkspace<8, LeanEvent<8>>),
    D9(EventWorkspace<9, LeanEvent<9>>),
}

macro_rules! dispatch {
    ($self: expr, $workspace: ident => $body: expr) => {
        match $self {
            AnyEventWorkspace::D1($workspace) => $body,
            AnyEventWorkspace::D2($workspace) => $body,
            AnyEventWorkspace::D3($workspace) => $body,
            AnyEventWorkspace::D4($workspace) => $body,
            AnyEventWorkspace::D5($workspace) => $body,
            AnyEventWorkspace::D6($workspace) => $body,
            AnyEventWorkspace::D7($workspace) => $body,
            AnyEventWorkspace::D8($workspace) => $body,
            AnyEventWorkspace::D9($workspace) => $body,
        }
    };
}

macro_rules! impl_conversions {
    ($($variant: ident => $dim: literal),*) => {$(
        impl From<EventWorkspace<$dim, LeanEvent<$dim>>> for AnyEventWorkspace {
            #[inline]
            fn from(workspace: EventWorkspace<$dim, LeanEvent<$dim>>) -> Self {
                Self::$variant(workspace)
            }
        }

        impl TryFrom<AnyEventWorkspace> for EventWorkspace<$dim, LeanEvent<$dim>> {
            type Error = Error;

            #[inline]
            fn try_from(workspace: AnyEventWorkspace) -> Result<Self> {
                match workspace {
                    AnyEventWorkspace::$variant(workspace) => Ok(workspace),
                    other => Err(Error::InvalidDimensionality {
                        context: "dimensions of a runtime workspace",
                        expected: $dim,
                        found: other.num_dims(),
                    }),
                }
            }
        }
    )*};
}

impl_conversions!(D1 => 1, D2 => 2, D3 => 3, D4 => 4, D5 => 5, D6 => 6, D7 => 7, D8 => 8, D9 => 9);

fn build<const D: usize>(
    dimensions: Vec<Dimension>,
    controller: BoxController,
) -> Result<EventWorkspace<D, LeanEvent<D>>> {
    let dimensions: [Dimension; D] =
        dimensions
            .try_into()
            .map_err(|dimensions: Vec<_>| Error::InvalidDimensionality {
                context: "dimensions of a runtime workspace",
                expected: D,
                found: dimensions.len(),
            })?;
    EventWorkspace::new(dimensions, controller)
}

fn insert<const D: usize>(
    workspace: &mut EventWorkspace<D, LeanEvent<D>>,
    coordinates: &[f64],
    signals: &[f64],
    errors_squared: &[f64],
) -> InsertReport {
    let events = coordinates
        .chunks_exact(D)
        .zip(signals.iter().zip(errors_squared))
        .map(|(center, (&signal, &error_squared))| LeanEvent {
            center: std::array::from_fn(|i| center[i]),
            signal,
            error_squared,
        });
    workspace.insert(events)
}

impl AnyEventWorkspace {
    /// Creates an empty workspace with one dimension per element of `dimensions`.
    ///
    /// Returns [`Error::UnsupportedDimensionality`] unless there are 1 to 9 dimensions.
    pub fn new(dimensions: Vec<Dimension>, controller: BoxController) -> Result<Self> {
        Ok(match dimensions.len() {
            1 => Self::D1(build(dimensions, controller)?),
            2 => Self::D2(build(dimensions, controller)?),
            3 => Self::D3(build(dimensions, controller)?),
            4 => Self::D4(build(dimensions, controller)?),
            5 => Self::D5(build(dimensions, controller)?),
            6 => Self::D6(build(dimensions, controller)?),
            7 => Self::D7(build(dimensions, controller)?),
            8 => Self::D8(build(dimensions, controller)?),
            9 => Self::D9(build(dimensions, controller)?),
            n => return Err(Error::UnsupportedDimensionality(n)),
        })
    }

    /// Returns the number of dimensions of the workspace.
    #[inline]
    pub fn num_dims(&self) -> usize {
        dispatch!(self, w => w.dimensions().len())
    }

    /// Returns the dimensions of the workspace.
    #[inline]
    pub fn dimensions(&self) -> &[Dimension] {
        dispatch!(self, w => w.dimensions().as_slice())
    }

    /// Returns the controller ruling how boxes split.
    #[inline]
    pub fn controller(&self) -> &BoxController {
        dispatch!(self, w => w.controller())
    }

    /// Inserts events given as flat coordinates, `num_dims` values per event, with one signal
    /// and one squared error per event.
    pub fn insert_flat(
        &mut self,
        coordinates: &[f64],
        signals: &[f64],
        errors_squared: &[f64],
    ) -> Result<InsertReport> {
        let dims = self.num_dims();
        let count = signals.len();
        if errors_squared.len() != count {
            return Err(Error::InvalidDimensionality {
                context: "number of squared errors",
                expected: count,
                found: errors_squared.len(),
            });
        }
        if coordinates.len() != count * dims {
            return Err(Error::InvalidDimensionality {
                context: "number of coordinates",
                expected: count * dims,
                found: coordinates.len(),
            });
        }

        Ok(dispatch!(self, w => insert(w, coordinates, signals, errors_squared)))
    }

    /// Returns the number of stored events.
    #[inline]
    pub fn num_events(&self) -> u64 {
        dispatch!(self, w => w.num_events())
    }

    /// Returns the total signal of the stored events.
    #[inline]
    pub fn signal(&self) -> f64 {
        dispatch!(self, w => w.signal())
    }

    /// Returns the total squared error of the stored events.
    #[inline]
    pub fn error_squared(&self) -> f64 {
        dispatch!(self, w => w.error_squared())
    }

    /// Returns statistics about the tree of the workspace.
    #[inline]
    pub fn stats(&self) -> TreeStats {
        dispatch!(self, w => w.stats())
    }

    /// Returns the total signal and squared error of the events strictly inside the sphere.
    pub fn integrate_sphere(&self, center: &[f64], radius: f64) -> Result<(f64, f64)> {
        self.check_point(center)?;
        Ok(dispatch!(self, w => w.integrate_sphere(std::array::from_fn(|i| center[i]), radius)))
    }

    fn check_point(&self, point: &[f64]) -> Result<()> {
        let dims = self.num_dims();
        if point.len() != dims {
            return Err(Error::InvalidDimensionality {
                context: "coordinates of a point",
                expected: dims,
                found: point.len(),
            });
        }
        Ok(())
    }
}
