use crate::{
    binning::{BinMethod, BinOutput, BinRequest},
    controller::{BoxController, OutOfRangePolicy},
    dimension::Dimension,
    implicit::{Constraint, Containment},
    iterator::BoxIterator,
    tree::{BoundingBox, BoxTree, Node, ROOT},
    sequential::Sequential,
    Error, Event, Point, Result,
};

/// Outcome of inserting a batch of events in an [`EventWorkspace`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// Number of events stored in the tree, clipped events included.
    pub inserted: u64,
    /// Number of events discarded because they were outside the workspace.
    pub dropped_out_of_range: u64,
    /// Number of events moved inside the workspace before being stored.
    pub clipped: u64,
    /// Number of events discarded because of a NaN or infinite coordinate, signal or error.
    pub dropped_non_finite: u64,
    /// Number of leaf boxes split.
    pub splits: usize,
    /// Number of leaf boxes left above capacity because they could not usefully split.
    pub degenerate_leaves: usize,
}

/// Size and shape of the tree of a workspace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of boxes, grids and leaves.
    pub boxes: usize,
    /// Number of leaf boxes.
    pub leaves: usize,
    /// Number of stored events.
    pub events: u64,
    /// Depth of the deepest box, 0 when only the root exists.
    pub max_depth: u32,
}

/// Collection of events in `D` dimensions organised in a [`BoxTree`].
///
/// Insertion requires exclusive access and may restructure the tree; every read-only operation,
/// binning included, can run concurrently once insertion is done.
#[derive(Clone, Debug)]
pub struct EventWorkspace<const D: usize, E> {
    dimensions: [Dimension; D],
    controller: BoxController,
    tree: BoxTree<D, E>,
}

impl<const D: usize, E: Event<D>> EventWorkspace<D, E> {
    /// Creates a new empty [`EventWorkspace`] covering the extents of the given dimensions.
    pub fn new(dimensions: [Dimension; D], controller: BoxController) -> Result<Self> {
        if D == 0 {
            return Err(Error::UnsupportedDimensionality(D));
        }
        for (index, dimension) in dimensions.iter().enumerate() {
            dimension.validate(index)?;
        }
        controller.validate(D)?;

        let extents = BoundingBox::new(
            std::array::from_fn(|i| dimensions[i].min),
            std::array::from_fn(|i| dimensions[i].max),
        );

        Ok(Self {
            dimensions,
            controller,
            tree: BoxTree::with_root(extents),
        })
    }

    /// Returns the dimensions of the workspace.
    #[inline]
    pub fn dimensions(&self) -> &[Dimension; D] {
        &self.dimensions
    }

    /// Returns the controller ruling how boxes split.
    #[inline]
    pub fn controller(&self) -> &BoxController {
        &self.controller
    }

    /// Returns the tree of boxes.
    #[inline]
    pub fn tree(&self) -> &BoxTree<D, E> {
        &self.tree
    }

    /// Returns the extents of the workspace, equal to those of its root box.
    #[inline]
    pub fn extents(&self) -> &BoundingBox<[f64; D]> {
        &self.tree.root_data().extents
    }

    /// Returns the number of stored events.
    #[inline]
    pub fn num_events(&self) -> u64 {
        self.tree.root_data().event_count
    }

    /// Returns the total signal of the stored events.
    #[inline]
    pub fn signal(&self) -> f64 {
        self.tree.root_data().signal
    }

    /// Returns the total squared error of the stored events.
    #[inline]
    pub fn error_squared(&self) -> f64 {
        self.tree.root_data().error_squared
    }

    /// Returns statistics about the tree.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            boxes: self.tree.len(),
            leaves: self.tree.leaf_count(),
            events: self.num_events(),
            max_depth: self.tree.depth(),
        }
    }

    /// Returns an iterator over every box of the tree.
    #[inline]
    pub fn boxes(&self) -> BoxIterator<'_, D, E> {
        self.tree.boxes()
    }

    /// Returns an iterator over every leaf box of the tree.
    #[inline]
    pub fn leaves(&self) -> BoxIterator<'_, D, E> {
        self.tree.leaves()
    }

    /// Inserts a batch of events, then splits every leaf left holding more events than the
    /// capacity of the controller.
    ///
    /// Events outside the workspace are handled according to the controller's
    /// [`OutOfRangePolicy`], events with non-finite values are discarded. Both are counted in the
    /// returned report.
    pub fn insert<I>(&mut self, events: I) -> InsertReport
    where
        I: IntoIterator<Item = E>,
    {
        let extents = *self.extents();
        let capacity = self.controller.leaf_capacity;
        let mut report = InsertReport::default();
        let mut overflowing = Vec::new();

        for event in events {
            if !event.is_finite() {
                report.dropped_non_finite += 1;
                continue;
            }

            let center = event.center();
            let event = if extents.contains(&center) {
                event
            } else {
                match self.controller.out_of_range {
                    OutOfRangePolicy::Drop => {
                        report.dropped_out_of_range += 1;
                        continue;
                    }
                    OutOfRangePolicy::Clip => {
                        report.clipped += 1;
                        event.relocated(extents.clip(&center))
                    }
                }
            };

            let leaf = self.tree.push_event(event, self.controller.split_into);
            if self.tree.nodes[leaf as usize].events().len() > capacity {
                overflowing.push(leaf);
            }
            report.inserted += 1;
        }

        let split = self.tree.split_overflowing(overflowing, &self.controller);
        report.splits = split.splits;
        report.degenerate_leaves = split.degenerate;

        let rejected = report.dropped_out_of_range + report.clipped + report.dropped_non_finite;
        if rejected > 0 {
            tracing::warn!(
                dropped_out_of_range = report.dropped_out_of_range,
                clipped = report.clipped,
                dropped_non_finite = report.dropped_non_finite,
                "events outside the workspace or with non-finite values"
            );
        }
        if split.degenerate > 0 {
            tracing::warn!(
                leaves = split.degenerate,
                max_depth = self.controller.max_depth,
                "leaf boxes above capacity could not be split"
            );
        }
        tracing::debug!(
            inserted = report.inserted,
            splits = report.splits,
            boxes = self.tree.len(),
            "inserted events"
        );

        report
    }

    /// Bins the events of the workspace on the calling thread.
    ///
    /// Refer to [`Sequential`] for more information.
    #[inline]
    pub fn bin<const OUT: usize>(&self, request: &BinRequest<D, OUT>) -> Result<BinOutput> {
        Sequential.bin(&self.tree, request)
    }

    /// Bins the events of the workspace using every thread of the rayon pool.
    ///
    /// Refer to [`Parallel`](crate::parallel::Parallel) for more information.
    #[cfg(feature = "parallel")]
    #[inline]
    pub fn par_bin<const OUT: usize>(&self, request: &BinRequest<D, OUT>) -> Result<BinOutput> {
        crate::parallel::Parallel::default().bin(&self.tree, request)
    }

    /// Bins the events of the workspace with the given engine.
    #[inline]
    pub fn bin_with<M, const OUT: usize>(
        &self,
        method: &mut M,
        request: &BinRequest<D, OUT>,
    ) -> Result<BinOutput>
    where
        M: BinMethod,
    {
        method.bin(&self.tree, request)
    }

    /// Returns the total signal and squared error of the events strictly inside the sphere.
    ///
    /// Boxes fully inside the sphere contribute their cached totals without visiting their
    /// events.
    pub fn integrate_sphere(&self, center: impl Point<D>, radius: f64) -> (f64, f64) {
        let sphere = Constraint::sphere(center, radius);
        let (mut signal, mut error_squared) = (0.0, 0.0);

        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let data = &self.tree.data[id as usize];
            match sphere.classify(&data.extents) {
                Containment::Outside => {}
                Containment::Inside => {
                    signal += data.signal;
                    error_squared += data.error_squared;
                }
                Containment::Touching => match &self.tree.nodes[id as usize] {
                    Node::Grid(children) => stack.extend_from_slice(children),
                    Node::Leaf(events) => {
                        for event in events.iter().filter(|e| sphere.contains(&e.center())) {
                            signal += event.signal();
                            error_squared += event.error_squared();
                        }
                    }
                },
            }
        }

        (signal, error_squared)
    }

    /// Returns the signal-weighted mean position of the events strictly inside the sphere and
    /// their total signal, or `None` if that signal is zero.
    pub fn centroid_sphere(&self, center: impl Point<D>, radius: f64) -> Option<([f64; D], f64)> {
        let sphere = Constraint::sphere(center, radius);
        let mut weighted = [0.0; D];
        let mut signal = 0.0;

        for leaf in BoxIterator::new(&self.tree).leaves_only() {
            if sphere.classify(&leaf.data.extents) == Containment::Outside {
                continue;
            }
            for event in leaf.events().iter().filter(|e| sphere.contains(&e.center())) {
                let position = event.center();
                for i in 0..D {
                    weighted[i] += position[i] * event.signal();
                }
                signal += event.signal();
            }
        }

        (signal != 0.0).then(|| (weighted.map(|w| w / signal), signal))
    }
}
