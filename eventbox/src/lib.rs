#![warn(missing_docs)]
//! # Eventbox
//!
//! Eventbox is a crate to store large amounts of weighted point events in N dimensions and
//! rasterize any region of them into dense histograms.
//!
//! ## Goals
//!
//! Events are observations with coordinates, a signal and a squared error. They are kept in a
//! recursive box tree that splits its leaves whenever they hold too many events, so that any
//! region of space can later be visited without scanning every event. Binning then walks the
//! tree, skips boxes that cannot contribute, adds whole boxes at once when they fall in a single
//! output bin, and only looks at individual events where it has to.
//!
//! Eventbox does not read or write files and does not know anything about instruments: events
//! come in through [`EventWorkspace::insert`] and histograms come out as plain vectors.
//!
//! Eventbox uses [rayon](https://github.com/rayon-rs/rayon) for parallel binning. Enable the
//! `parallel` feature to access the [`parallel`] engine.
//!
//! ## Using Eventbox
//!
//! ### Storing events
//!
//! An [`EventWorkspace`] is created from the [`Dimension`] of each axis and a
//! [`BoxController`] defining how boxes split.
//!
//! ```
//! use eventbox::prelude::*;
//!
//! let mut workspace = EventWorkspace::<2, LeanEvent<2>>::new(
//!     [Dimension::new("x", "m", 0.0, 10.0, 10), Dimension::new("y", "m", 0.0, 10.0, 10)],
//!     BoxController::default().with_leaf_capacity(4),
//! )
//! .unwrap();
//!
//! let events = (0..100).map(|i| LeanEvent::unit([(i % 10) as f64 + 0.5, (i / 10) as f64]));
//! let report = workspace.insert(events);
//!
//! assert_eq!(report.inserted, 100);
//! assert_eq!(workspace.num_events(), 100);
//! assert_eq!(workspace.signal(), 100.0);
//! ```
//!
//! ### Binning events
//!
//! A [`BinRequest`] combines a [`CoordinateTransform`] from the workspace coordinates to the
//! histogram coordinates, an optional [`ImplicitFunction`] restricting the region, and the
//! axes of the output histogram.
//!
//! ```
//! # use eventbox::prelude::*;
//! # let mut workspace = EventWorkspace::<2, LeanEvent<2>>::new(
//! #     [Dimension::new("x", "m", 0.0, 10.0, 10), Dimension::new("y", "m", 0.0, 10.0, 10)],
//! #     BoxController::default().with_leaf_capacity(4),
//! # )
//! # .unwrap();
//! # workspace.insert((0..100).map(|i| LeanEvent::unit([(i % 10) as f64 + 0.5, (i / 10) as f64])));
//! // Project onto the x axis, keeping only events with y < 5.
//! let transform = CoordinateTransform::<2, 1>::aligned([0]).unwrap();
//! let region = ImplicitFunction::new().with(Constraint::half_space([0.0, 1.0], 5.0, Sense::Below));
//! let request = BinRequest::new(transform, vec![Dimension::new("x", "m", 0.0, 10.0, 5)])
//!     .with_implicit_function(region);
//!
//! let output = workspace.bin(&request).unwrap();
//! assert_eq!(output.histogram.dims(), &[5]);
//! assert_eq!(output.histogram.total_signal(), 50.0);
//! ```
//!
//! <details>
//! <summary><h4>Custom events</h4></summary>
//!
//! Any struct with a `center` array and `signal` and `error_squared` fields can derive
//! [`Event`] and be stored in a workspace. Other fields are moved along with the event.
//!
//! ```
//! use eventbox::prelude::*;
//!
//! #[derive(Clone, Debug, Event)]
//! struct Neutron {
//!     center: [f64; 3],
//!     signal: f64,
//!     error_squared: f64,
//!     time_of_flight: f32,
//! }
//!
//! let neutron = Neutron { center: [0.1, 0.2, 0.3], signal: 1.0, error_squared: 1.0, time_of_flight: 4.5 };
//! assert_eq!(neutron.center(), [0.1, 0.2, 0.3]);
//! ```
//! </details>
//!
//! [`EventWorkspace`]: workspace::EventWorkspace
//! [`EventWorkspace::insert`]: workspace::EventWorkspace::insert
//! [`Dimension`]: dimension::Dimension
//! [`BoxController`]: controller::BoxController
//! [`BinRequest`]: binning::BinRequest
//! [`CoordinateTransform`]: transform::CoordinateTransform
//! [`ImplicitFunction`]: implicit::ImplicitFunction

/// Structured requests and results of binning operations.
pub mod binning;
/// Configuration of box splitting.
pub mod controller;
/// Axes of workspaces and histograms.
pub mod dimension;
/// Error type of fallible operations.
pub mod error;
/// Built-in event types.
pub mod event;
/// Workspaces with a dimensionality chosen at runtime.
pub mod factory;
/// Dense multidimensional histograms.
pub mod histogram;
/// Spatial predicates restricting traversal and binning.
pub mod implicit;
/// Depth-first traversal of box trees.
pub mod iterator;
/// Binning using multiple CPU threads.
#[cfg(feature = "parallel")]
pub mod parallel;
/// Binning using one CPU thread.
pub mod sequential;
/// Linear maps from workspace coordinates to histogram coordinates.
pub mod transform;
/// Box tree and space partitioning implementation.
pub mod tree;
/// Event workspaces owning a box tree.
pub mod workspace;

mod impls;

pub use binning::{BinMethod, BinOutput, BinReport, BinRequest, CancellationToken};
pub use error::{Error, Result};
pub use eventbox_derive::Event;
pub use workspace::EventWorkspace;

/// Trait for a weighted point observation in `D` dimensions.
///
/// You can derive this trait if your type has fields named `center`, `signal` and
/// `error_squared`.
pub trait Event<const D: usize>: Clone + Send + Sync {
    /// Returns the coordinates of the event.
    fn center(&self) -> [f64; D];

    /// Returns the signal (weight) of the event.
    fn signal(&self) -> f64;

    /// Returns the squared error on the signal of the event.
    fn error_squared(&self) -> f64;

    /// Returns a copy of this event placed at the given coordinates.
    fn relocated(&self, center: [f64; D]) -> Self;

    /// Returns `true` if the coordinates, signal and error of the event are all finite.
    #[inline]
    fn is_finite(&self) -> bool {
        self.center().iter().all(|x| x.is_finite())
            && self.signal().is_finite()
            && self.error_squared().is_finite()
    }
}

/// Trait for types that can be converted to coordinates in `D` dimensions.
///
/// Implemented for arrays, and for vector types of `glam` and `nalgebra` when the respective
/// features are enabled.
pub trait Point<const D: usize> {
    /// Returns the coordinates of the point.
    fn to_coordinates(&self) -> [f64; D];
}

impl<const D: usize> Point<D> for [f64; D] {
    #[inline]
    fn to_coordinates(&self) -> [f64; D] {
        *self
    }
}

impl<const D: usize> Point<D> for &[f64; D] {
    #[inline]
    fn to_coordinates(&self) -> [f64; D] {
        **self
    }
}

/// Commonly used types, re-exported.
pub mod prelude {
    pub use crate::{
        binning::{BinMethod, BinOutput, BinReport, BinRequest, CancellationToken},
        controller::{BoxController, OutOfRangePolicy},
        dimension::Dimension,
        event::{LeanEvent, MdEvent},
        factory::AnyEventWorkspace,
        histogram::DenseHistogram,
        implicit::{Constraint, Containment, ImplicitFunction, Sense},
        transform::CoordinateTransform,
        workspace::{EventWorkspace, InsertReport, TreeStats},
        Error, Event, Point,
    };

    #[cfg(feature = "parallel")]
    pub use crate::parallel::Parallel;
    pub use crate::sequential::Sequential;
}
