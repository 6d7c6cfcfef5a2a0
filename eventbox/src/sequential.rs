use crate::{
    binning::{BinMethod, BinOutput, BinReport, BinRequest, Binner},
    tree::{BoxTree, ROOT},
    Event, Result,
};

/// Binning engine walking the tree on the calling thread.
///
/// The tree is traversed depth first from the root with an explicit stack. Boxes outside the
/// implicit function or mapping outside the histogram are skipped with everything below them,
/// boxes fully inside the function and mapping to a single bin are added at once, and the events
/// of the remaining leaves are binned one by one.
///
/// The pruning is the one [`BoxIterator::with_function`](crate::iterator::BoxIterator::with_function)
/// applies, plus the rejection of boxes mapping outside the histogram. It is evaluated once per
/// box on a private stack rather than through the iterator, since the same classification also
/// decides whether the box can be added at once.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sequential;

impl BinMethod for Sequential {
    fn bin<const D: usize, const OUT: usize, E: Event<D>>(
        &mut self,
        tree: &BoxTree<D, E>,
        request: &BinRequest<D, OUT>,
    ) -> Result<BinOutput> {
        let mut histogram = request.validate()?;
        let mut report = BinReport::default();
        let binner = Binner::new(tree, request, &histogram);

        if !binner.bin_subtree(ROOT, &mut histogram, &mut report) {
            return Err(Binner::<D, OUT, E>::cancelled(histogram, &report));
        }

        tracing::debug!(
            visited = report.boxes_visited,
            skipped = report.boxes_skipped,
            coarse = report.coarse_boxes,
            scanned = report.events_scanned,
            binned = report.events_binned,
            "sequential binning done"
        );
        Ok(BinOutput { histogram, report })
    }
}
