use crate::{Event, Point};

/// Lightweight event carrying only its coordinates and weight.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Event)]
pub struct LeanEvent<const D: usize> {
    /// Coordinates of the event.
    pub center: [f64; D],
    /// Signal (weight) of the event.
    pub signal: f64,
    /// Squared error on the signal.
    pub error_squared: f64,
}

impl<const D: usize> LeanEvent<D> {
    /// Creates a new [`LeanEvent`] at the given position.
    #[inline]
    pub fn new(center: impl Point<D>, signal: f64, error_squared: f64) -> Self {
        Self {
            center: center.to_coordinates(),
            signal,
            error_squared,
        }
    }

    /// Creates a new [`LeanEvent`] with unit signal and unit squared error.
    #[inline]
    pub fn unit(center: impl Point<D>) -> Self {
        Self::new(center, 1.0, 1.0)
    }
}

/// Event that also records which run and which detector pixel it was measured by.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Event)]
pub struct MdEvent<const D: usize> {
    /// Coordinates of the event.
    pub center: [f64; D],
    /// Signal (weight) of the event.
    pub signal: f64,
    /// Squared error on the signal.
    pub error_squared: f64,
    /// Index of the run this event belongs to in the loader's list of runs.
    pub run_index: u16,
    /// Identifier of the detector pixel that measured this event.
    pub detector_id: i32,
}

impl<const D: usize> MdEvent<D> {
    /// Creates a new [`MdEvent`] at the given position.
    #[inline]
    pub fn new(
        center: impl Point<D>,
        signal: f64,
        error_squared: f64,
        run_index: u16,
        detector_id: i32,
    ) -> Self {
        Self {
            center: center.to_coordinates(),
            signal,
            error_squared,
            run_index,
            detector_id,
        }
    }
}

impl<const D: usize> From<MdEvent<D>> for LeanEvent<D> {
    #[inline]
    fn from(event: MdEvent<D>) -> Self {
        Self {
            center: event.center,
            signal: event.signal,
            error_squared: event.error_squared,
        }
    }
}
