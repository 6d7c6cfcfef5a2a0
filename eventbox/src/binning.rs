use crate::{
    dimension::Dimension,
    histogram::DenseHistogram,
    implicit::{Containment, ImplicitFunction},
    transform::CoordinateTransform,
    tree::{BoundingBox, BoxTree, Node, NodeID},
    Error, Event, Result,
};
use std::{
    ops::{Add, AddAssign},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Shared flag used to stop a binning operation early.
///
/// Clones refer to the same flag: cancel any of them from another thread and the operation
/// holding one stops at the next box it visits, returning [`Error::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a new [`CancellationToken`] that is not cancelled.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every operation observing this token.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` if cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Parameters of a binning operation from a `D`-dimensional workspace to an `OUT`-dimensional
/// histogram.
#[derive(Clone, Debug)]
pub struct BinRequest<const D: usize, const OUT: usize> {
    /// Map from workspace coordinates to histogram coordinates.
    pub transform: CoordinateTransform<D, OUT>,
    /// Region of the workspace to bin. Empty by default, keeping everything.
    pub function: ImplicitFunction<D>,
    /// Axes of the output histogram, in histogram coordinates.
    pub axes: Vec<Dimension>,
    /// Whether boxes fully inside the function and mapping to a single bin are added at once
    /// instead of event by event. Enabled by default.
    pub coarse_path: bool,
    /// Token observed while binning.
    pub cancellation: Option<CancellationToken>,
}

impl<const D: usize, const OUT: usize> BinRequest<D, OUT> {
    /// Creates a new [`BinRequest`] keeping every event.
    #[inline]
    pub fn new(transform: CoordinateTransform<D, OUT>, axes: Vec<Dimension>) -> Self {
        Self {
            transform,
            function: ImplicitFunction::new(),
            axes,
            coarse_path: true,
            cancellation: None,
        }
    }

    /// Restricts binning to the events contained by the function.
    #[inline]
    pub fn with_implicit_function(mut self, function: ImplicitFunction<D>) -> Self {
        self.function = function;
        self
    }

    /// Enables or disables adding whole boxes to single bins.
    #[inline]
    pub fn with_coarse_path(mut self, coarse_path: bool) -> Self {
        self.coarse_path = coarse_path;
        self
    }

    /// Observes the given token while binning.
    #[inline]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Checks the request and returns an empty histogram with its axes.
    pub fn validate(&self) -> Result<DenseHistogram> {
        if self.axes.len() != OUT {
            return Err(Error::InvalidDimensionality {
                context: "number of output axes",
                expected: OUT,
                found: self.axes.len(),
            });
        }
        self.transform.check()?;
        DenseHistogram::new(self.axes.clone())
    }

    #[inline]
    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Counters describing how a binning operation went through the tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BinReport {
    /// Number of boxes visited.
    pub boxes_visited: usize,
    /// Number of visited boxes skipped without looking at their events.
    pub boxes_skipped: usize,
    /// Number of boxes added at once to a single bin.
    pub coarse_boxes: usize,
    /// Number of events looked at individually.
    pub events_scanned: u64,
    /// Number of events added to the histogram, through whole boxes or individually.
    pub events_binned: u64,
    /// Number of scanned events outside the function or the histogram.
    pub events_discarded: u64,
}

impl Add for BinReport {
    type Output = Self;

    #[inline]
    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for BinReport {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.boxes_visited += rhs.boxes_visited;
        self.boxes_skipped += rhs.boxes_skipped;
        self.coarse_boxes += rhs.coarse_boxes;
        self.events_scanned += rhs.events_scanned;
        self.events_binned += rhs.events_binned;
        self.events_discarded += rhs.events_discarded;
    }
}

/// Histogram produced by a binning operation along with its [`BinReport`].
#[derive(Clone, Debug, PartialEq)]
pub struct BinOutput {
    /// Accumulated histogram.
    pub histogram: DenseHistogram,
    /// Traversal counters.
    pub report: BinReport,
}

/// Trait to bin the events of a tree using different engines.
///
/// Every engine produces the same histogram up to floating-point summation order.
pub trait BinMethod {
    /// Bins the events of the tree described by the request.
    fn bin<const D: usize, const OUT: usize, E: Event<D>>(
        &mut self,
        tree: &BoxTree<D, E>,
        request: &BinRequest<D, OUT>,
    ) -> Result<BinOutput>;
}

/// What the traversal does with a box.
pub(crate) enum Visit<'a, E> {
    /// The box cannot contribute.
    Skip,
    /// Every event of the box lands in the given bin.
    Coarse(usize),
    /// The box must be refined into its children.
    Descend(&'a [NodeID]),
    /// The events of the leaf must be binned individually.
    Scan(&'a [E]),
}

/// Per-box decisions shared by every engine.
pub(crate) struct Binner<'a, const D: usize, const OUT: usize, E> {
    tree: &'a BoxTree<D, E>,
    request: &'a BinRequest<D, OUT>,
    output: BoundingBox<[f64; OUT]>,
}

impl<'a, const D: usize, const OUT: usize, E: Event<D>> Binner<'a, D, OUT, E> {
    /// Creates a [`Binner`] for a request already validated against `histogram`.
    pub(crate) fn new(
        tree: &'a BoxTree<D, E>,
        request: &'a BinRequest<D, OUT>,
        histogram: &DenseHistogram,
    ) -> Self {
        let axes = histogram.axes();
        Self {
            tree,
            request,
            output: BoundingBox::new(
                std::array::from_fn(|j| axes[j].min),
                std::array::from_fn(|j| axes[j].max),
            ),
        }
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.request.is_cancelled()
    }

    /// Decides how to handle the box `id`, updating the box counters of the report.
    pub(crate) fn visit(
        &self,
        id: NodeID,
        histogram: &DenseHistogram,
        report: &mut BinReport,
    ) -> Visit<'a, E> {
        let tree = self.tree;
        let data = &tree.data[id as usize];
        report.boxes_visited += 1;

        if data.event_count == 0 {
            report.boxes_skipped += 1;
            return Visit::Skip;
        }

        let containment = self.request.function.classify(&data.extents);
        if containment == Containment::Outside {
            report.boxes_skipped += 1;
            return Visit::Skip;
        }

        let mapped = self.request.transform.map_extents(&data.extents);
        if !self.output.intersects(&mapped) {
            report.boxes_skipped += 1;
            return Visit::Skip;
        }

        if self.request.coarse_path && containment == Containment::Inside {
            if let Some(bin) = histogram.bin_of(&mapped.min) {
                if histogram.bin_of(&mapped.max) == Some(bin) {
                    report.coarse_boxes += 1;
                    return Visit::Coarse(bin);
                }
            }
        }

        match &tree.nodes[id as usize] {
            Node::Grid(children) => Visit::Descend(children),
            Node::Leaf(events) => Visit::Scan(events),
        }
    }

    /// Adds every event of the box `id` to a single bin.
    #[inline]
    pub(crate) fn add_box(
        &self,
        id: NodeID,
        bin: usize,
        histogram: &mut DenseHistogram,
        report: &mut BinReport,
    ) {
        let data = &self.tree.data[id as usize];
        histogram.add(bin, data.signal, data.error_squared, data.event_count);
        report.events_binned += data.event_count;
    }

    /// Bins events one by one.
    pub(crate) fn scan(&self, events: &[E], histogram: &mut DenseHistogram, report: &mut BinReport) {
        let function = &self.request.function;
        let transform = &self.request.transform;

        for event in events {
            let center = event.center();
            let bin = if function.contains(&center) {
                histogram.bin_of(&transform.forward(&center))
            } else {
                None
            };

            match bin {
                Some(bin) => {
                    histogram.add(bin, event.signal(), event.error_squared(), 1);
                    report.events_binned += 1;
                }
                None => report.events_discarded += 1,
            }
        }
        report.events_scanned += events.len() as u64;
    }

    /// Bins the subtree rooted at `start` depth first. Returns `false` if it stopped because of
    /// cancellation.
    ///
    /// Walks its own stack with the pruning of [`BoxIterator`](crate::iterator::BoxIterator)
    /// restated in [`Binner::visit`].
    pub(crate) fn bin_subtree(
        &self,
        start: NodeID,
        histogram: &mut DenseHistogram,
        report: &mut BinReport,
    ) -> bool {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if self.is_cancelled() {
                return false;
            }

            match self.visit(id, histogram, report) {
                Visit::Skip => {}
                Visit::Coarse(bin) => self.add_box(id, bin, histogram, report),
                Visit::Descend(children) => stack.extend(children.iter().rev()),
                Visit::Scan(events) => self.scan(events, histogram, report),
            }
        }
        true
    }

    /// Builds the cancellation error carrying what was accumulated so far.
    #[inline]
    pub(crate) fn cancelled(histogram: DenseHistogram, report: &BinReport) -> Error {
        tracing::debug!(boxes_visited = report.boxes_visited, "binning cancelled");
        Error::Cancelled {
            partial: Box::new(histogram),
            boxes_visited: report.boxes_visited,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{
        binning::{BinMethod, BinRequest, CancellationToken},
        controller::{BoxController, OutOfRangePolicy},
        dimension::Dimension,
        event::LeanEvent,
        implicit::{Constraint, ImplicitFunction, Sense},
        transform::CoordinateTransform,
        workspace::EventWorkspace,
        Error,
    };
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn square(bins: usize) -> [Dimension; 2] {
        [
            Dimension::new("x", "", 0.0, 10.0, bins),
            Dimension::new("y", "", 0.0, 10.0, bins),
        ]
    }

    fn uniform_workspace(
        seed: u64,
        count: usize,
        controller: BoxController,
    ) -> (EventWorkspace<2, LeanEvent<2>>, Vec<LeanEvent<2>>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let events: Vec<_> = (0..count)
            .map(|_| {
                LeanEvent::new(
                    [rng.gen_range(0.0..10.0), rng.gen_range(0.0..10.0)],
                    rng.gen_range(0.5..1.5),
                    rng.gen_range(0.1..0.3),
                )
            })
            .collect();

        let mut workspace = EventWorkspace::new(square(10), controller).unwrap();
        workspace.insert(events.iter().copied());
        (workspace, events)
    }

    fn identity() -> CoordinateTransform<2, 2> {
        CoordinateTransform::aligned([0, 1]).unwrap()
    }

    pub fn totals_are_conserved<M: BinMethod>(mut method: M) {
        let (workspace, events) = uniform_workspace(0, 1000, BoxController::new(2, 100));
        let request = BinRequest::new(identity(), square(10).to_vec());

        let output = method.bin(workspace.tree(), &request).unwrap();
        let histogram = &output.histogram;
        let signal: f64 = events.iter().map(|e| e.signal).sum();
        let error_squared: f64 = events.iter().map(|e| e.error_squared).sum();

        assert_eq!(histogram.dims(), &[10, 10]);
        assert_eq!(histogram.total_events(), 1000);
        assert_eq!(output.report.events_binned, 1000);
        assert_relative_eq!(histogram.total_signal(), signal, max_relative = 1e-12);
        assert_relative_eq!(histogram.total_error_squared(), error_squared, max_relative = 1e-12);

        for (bin, &count) in histogram.event_counts().iter().enumerate() {
            let indices = histogram.indices(bin);
            let expected = events
                .iter()
                .filter(|e| {
                    e.center[0].floor() as usize == indices[0]
                        && e.center[1].floor() as usize == indices[1]
                })
                .count();
            assert_eq!(count, expected as u64);
        }
    }

    pub fn circle_matches_brute_force<M: BinMethod>(mut method: M) {
        let (workspace, events) = uniform_workspace(1, 5000, BoxController::new(2, 50));
        let circle = ImplicitFunction::new().with(Constraint::sphere([5.0, 5.0], 3.0));
        let request = BinRequest::new(identity(), square(10).to_vec())
            .with_implicit_function(circle.clone());

        let output = method.bin(workspace.tree(), &request).unwrap();
        let inside: Vec<_> = events.iter().filter(|e| circle.contains(&e.center)).collect();
        let signal: f64 = inside.iter().map(|e| e.signal).sum();

        assert_eq!(output.histogram.total_events(), inside.len() as u64);
        assert_relative_eq!(output.histogram.total_signal(), signal, max_relative = 1e-12);
        assert!(output.report.boxes_skipped > 0);
    }

    pub fn empty_region_is_zero<M: BinMethod>(mut method: M) {
        let (workspace, _) = uniform_workspace(2, 500, BoxController::new(2, 20));
        let nowhere = ImplicitFunction::new()
            .with(Constraint::half_space([1.0, 0.0], 20.0, Sense::Above));
        let request =
            BinRequest::new(identity(), square(4).to_vec()).with_implicit_function(nowhere);

        let output = method.bin(workspace.tree(), &request).unwrap();
        assert_eq!(output.histogram.len(), 16);
        assert!(output.histogram.signals().iter().all(|&s| s == 0.0));
        assert_eq!(output.report.boxes_visited, 1);
        assert_eq!(output.report.events_scanned, 0);

        // Output range disjoint from the workspace.
        let request = BinRequest::new(
            identity(),
            vec![
                Dimension::new("x", "", 20.0, 30.0, 2),
                Dimension::new("y", "", 0.0, 10.0, 2),
            ],
        );
        let output = method.bin(workspace.tree(), &request).unwrap();
        assert_eq!(output.histogram.total_events(), 0);
        assert_eq!(output.report.boxes_visited, 1);
    }

    pub fn out_of_range_policies<M: BinMethod>(mut method: M) {
        let events = [
            LeanEvent::new([-5.0, 5.0], 3.0, 1.0),
            LeanEvent::new([5.0, 5.0], 1.0, 1.0),
        ];
        let request = BinRequest::new(identity(), square(10).to_vec());

        let mut dropping = EventWorkspace::new(square(10), BoxController::default()).unwrap();
        dropping.insert(events);
        let output = method.bin(dropping.tree(), &request).unwrap();
        assert_eq!(output.histogram.total_signal(), 1.0);

        let mut clipping = EventWorkspace::new(
            square(10),
            BoxController::default().with_out_of_range(OutOfRangePolicy::Clip),
        )
        .unwrap();
        clipping.insert(events);
        let output = method.bin(clipping.tree(), &request).unwrap();
        let histogram = &output.histogram;
        assert_eq!(histogram.total_signal(), 4.0);
        assert_eq!(histogram.signals()[histogram.linear_index(&[0, 5]).unwrap()], 3.0);
    }

    pub fn edges_belong_to_upper_bin<M: BinMethod>(mut method: M) {
        let mut workspace = EventWorkspace::new(square(10), BoxController::new(2, 2)).unwrap();
        workspace.insert((0..10).map(|k| LeanEvent::unit([k as f64, 0.5])));

        // Width 10 / 4 = 2.5, so events at 0, 5 land on the lower edge of bins 0 and 2.
        let request = BinRequest::new(
            CoordinateTransform::<2, 1>::aligned([0]).unwrap(),
            vec![Dimension::new("x", "", 0.0, 10.0, 4)],
        );
        let output = method.bin(workspace.tree(), &request).unwrap();
        assert_eq!(output.histogram.event_counts(), &[3, 2, 3, 2]);

        // Mapped values falling exactly on 3, 6, 9.
        let request = BinRequest::new(
            CoordinateTransform::<2, 1>::aligned_scaled([0], [3.0], [0.0]).unwrap(),
            vec![Dimension::new("x", "", 0.0, 12.0, 4)],
        );
        let output = method.bin(workspace.tree(), &request).unwrap();
        assert_eq!(output.histogram.event_counts(), &[1, 1, 1, 1]);
    }

    pub fn coarse_path_is_exact<M: BinMethod>(mut method: M) {
        let (workspace, _) = uniform_workspace(3, 4000, BoxController::new(3, 8));
        let mut rng = StdRng::seed_from_u64(4);

        let mut coarse_boxes = 0;
        for _ in 0..8 {
            let bins = rng.gen_range(1..6);
            let function = ImplicitFunction::new().with(Constraint::half_space(
                [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)],
                rng.gen_range(-5.0..5.0),
                Sense::Below,
            ));
            let request = BinRequest::new(identity(), square(bins).to_vec())
                .with_implicit_function(function);

            let coarse = method.bin(workspace.tree(), &request).unwrap();
            let fine = method
                .bin(workspace.tree(), &request.clone().with_coarse_path(false))
                .unwrap();

            assert_eq!(coarse.histogram.event_counts(), fine.histogram.event_counts());
            assert_eq!(fine.report.coarse_boxes, 0);
            assert_eq!(coarse.report.events_binned, fine.report.events_binned);
            coarse_boxes += coarse.report.coarse_boxes;
            for (&a, &b) in coarse.histogram.signals().iter().zip(fine.histogram.signals()) {
                assert_relative_eq!(a, b, epsilon = 1e-9, max_relative = 1e-12);
            }
        }
        assert!(coarse_boxes > 0, "whole boxes were never added at once");

        // A single output bin reaching past the workspace takes the root at once.
        let request = BinRequest::new(
            identity(),
            vec![Dimension::new("x", "", 0.0, 20.0, 1), Dimension::new("y", "", 0.0, 20.0, 1)],
        );
        let output = method.bin(workspace.tree(), &request).unwrap();
        assert_eq!(output.report.coarse_boxes, 1);
        assert_eq!(output.report.boxes_visited, 1);
        assert_eq!(output.report.events_scanned, 0);
        assert_eq!(output.histogram.total_events(), 4000);
    }

    pub fn binning_is_idempotent<M: BinMethod>(mut method: M) {
        let (workspace, _) = uniform_workspace(5, 2000, BoxController::new(2, 30));
        let request = BinRequest::new(identity(), square(7).to_vec())
            .with_implicit_function(ImplicitFunction::new().with(Constraint::sphere([3.0, 4.0], 4.0)));

        let first = method.bin(workspace.tree(), &request).unwrap();
        let second = method.bin(workspace.tree(), &request).unwrap();
        assert_eq!(first.report, second.report);
        assert_eq!(first.histogram.event_counts(), second.histogram.event_counts());
        for (&a, &b) in first.histogram.signals().iter().zip(second.histogram.signals()) {
            assert_relative_eq!(a, b, epsilon = 1e-9, max_relative = 1e-12);
        }
    }

    pub fn cancellation_stops_binning<M: BinMethod>(mut method: M) {
        let (workspace, _) = uniform_workspace(6, 1000, BoxController::new(2, 10));
        let token = CancellationToken::new();
        let request =
            BinRequest::new(identity(), square(10).to_vec()).with_cancellation(token.clone());

        token.cancel();
        match method.bin(workspace.tree(), &request) {
            Err(Error::Cancelled { partial, .. }) => {
                assert_eq!(partial.dims(), &[10, 10]);
                assert!(partial.total_events() < 1000);
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
    }

    pub fn affine_matches_brute_force<M: BinMethod>(mut method: M) {
        let (workspace, events) = uniform_workspace(7, 3000, BoxController::new(2, 40));
        let transform = CoordinateTransform::<2, 1>::new([[0.6, 0.8]], [-1.0]).unwrap();
        let axis = Dimension::new("u", "", 0.0, 12.0, 6);
        let request = BinRequest::new(transform, vec![axis.clone()]);

        let output = method.bin(workspace.tree(), &request).unwrap();
        let mut expected = vec![0u64; 6];
        for event in &events {
            if let Some(bin) = axis.bin_of(transform.forward(&event.center)[0]) {
                expected[bin] += 1;
            }
        }
        assert_eq!(output.histogram.event_counts(), expected.as_slice());
        assert_eq!(output.report.events_binned, expected.iter().sum::<u64>());
    }

    pub fn invalid_requests<M: BinMethod>(mut method: M) {
        let (workspace, _) = uniform_workspace(8, 10, BoxController::default());

        let request = BinRequest::new(identity(), vec![Dimension::new("x", "", 0.0, 1.0, 1)]);
        assert!(matches!(
            method.bin(workspace.tree(), &request),
            Err(Error::InvalidDimensionality { .. })
        ));

        let request = BinRequest::new(
            identity(),
            vec![Dimension::new("x", "", 0.0, 1.0, 1), Dimension::new("y", "", 1.0, 1.0, 1)],
        );
        assert!(matches!(
            method.bin(workspace.tree(), &request),
            Err(Error::InvalidAxis { index: 1, .. })
        ));

        // Built directly, reading an input axis that does not exist.
        let request = BinRequest::new(
            CoordinateTransform::<2, 1>::Aligned {
                dimensions: [5],
                scale: [1.0],
                origin: [0.0],
            },
            vec![Dimension::new("x", "", 0.0, 10.0, 4)],
        );
        assert!(matches!(
            method.bin(workspace.tree(), &request),
            Err(Error::InvalidDimensionality { expected: 2, found: 6, .. })
        ));

        let request = BinRequest::new(
            CoordinateTransform::<1, 2>::Affine {
                basis: [[1.0], [1.0]],
                origin: [0.0, 0.0],
            },
            square(4).to_vec(),
        );
        let mut line = EventWorkspace::<1, LeanEvent<1>>::new(
            [Dimension::new("x", "", 0.0, 10.0, 4)],
            BoxController::default(),
        )
        .unwrap();
        line.insert([LeanEvent::unit([1.0])]);
        assert!(matches!(
            method.bin(line.tree(), &request),
            Err(Error::InvalidDimensionality { .. })
        ));
    }
}
