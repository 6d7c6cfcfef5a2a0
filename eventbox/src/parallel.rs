use crate::{
    binning::{BinMethod, BinOutput, BinReport, BinRequest, Binner, Visit},
    histogram::DenseHistogram,
    tree::{BoxTree, NodeID, ROOT},
    Event, Result,
};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::collections::VecDeque;

/// Binning engine splitting the tree between the threads of the rayon pool.
///
/// The top of the tree is expanded breadth first on the calling thread until there are enough
/// independent subtrees to keep every thread busy. Each worker then bins its subtrees into a
/// private histogram like [`Sequential`](crate::sequential::Sequential) does, and the partial
/// histograms are summed. Results match the sequential engine up to floating-point summation
/// order.
#[derive(Clone, Copy, Debug)]
pub struct Parallel {
    /// Number of subtrees to hand out per thread of the pool.
    pub subtrees_per_thread: usize,
}

impl Default for Parallel {
    #[inline]
    fn default() -> Self {
        Self {
            subtrees_per_thread: 4,
        }
    }
}

impl Parallel {
    /// Creates a new [`Parallel`] engine handing out the given number of subtrees per thread.
    #[inline]
    pub fn new(subtrees_per_thread: usize) -> Self {
        Self {
            subtrees_per_thread,
        }
    }
}

enum Task<'a, E> {
    Subtree(NodeID),
    Events(&'a [E]),
}

impl BinMethod for Parallel {
    fn bin<const D: usize, const OUT: usize, E: Event<D>>(
        &mut self,
        tree: &BoxTree<D, E>,
        request: &BinRequest<D, OUT>,
    ) -> Result<BinOutput> {
        let mut histogram = request.validate()?;
        let mut report = BinReport::default();
        let binner = Binner::new(tree, request, &histogram);

        let target = rayon::current_num_threads() * self.subtrees_per_thread.max(1);
        let mut tasks = Vec::with_capacity(target);
        let mut queue = VecDeque::from([ROOT]);
        while let Some(id) = queue.pop_front() {
            if queue.len() + tasks.len() >= target {
                tasks.push(Task::Subtree(id));
                tasks.extend(queue.drain(..).map(Task::Subtree));
                break;
            }
            if binner.is_cancelled() {
                return Err(Binner::<D, OUT, E>::cancelled(histogram, &report));
            }

            match binner.visit(id, &histogram, &mut report) {
                Visit::Skip => {}
                Visit::Coarse(bin) => binner.add_box(id, bin, &mut histogram, &mut report),
                Visit::Descend(children) => queue.extend(children),
                Visit::Scan(events) => tasks.push(Task::Events(events)),
            }
        }

        tracing::trace!(tasks = tasks.len(), target, "expanded top of the tree");

        let empty = || (histogram.zeros_like(), BinReport::default(), true);
        let (partial, partial_report, completed) = tasks
            .par_iter()
            .fold(empty, |(mut partial, mut report, completed), task| {
                let completed = completed
                    && match task {
                        Task::Subtree(id) => binner.bin_subtree(*id, &mut partial, &mut report),
                        Task::Events(events) if !binner.is_cancelled() => {
                            binner.scan(events, &mut partial, &mut report);
                            true
                        }
                        Task::Events(_) => false,
                    };
                (partial, report, completed)
            })
            .reduce(empty, merge);

        histogram += &partial;
        report += partial_report;

        if !completed {
            return Err(Binner::<D, OUT, E>::cancelled(histogram, &report));
        }

        tracing::debug!(
            visited = report.boxes_visited,
            skipped = report.boxes_skipped,
            coarse = report.coarse_boxes,
            scanned = report.events_scanned,
            binned = report.events_binned,
            "parallel binning done"
        );
        Ok(BinOutput { histogram, report })
    }
}

#[inline]
fn merge(
    (mut lhs, lhs_report, lhs_completed): (DenseHistogram, BinReport, bool),
    (rhs, rhs_report, rhs_completed): (DenseHistogram, BinReport, bool),
) -> (DenseHistogram, BinReport, bool) {
    lhs += &rhs;
    (lhs, lhs_report + rhs_report, lhs_completed && rhs_completed)
}
