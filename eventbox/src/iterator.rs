use crate::{
    implicit::ImplicitFunction,
    tree::{BoundingBox, BoxData, Node, NodeID, Tree, ROOT},
};

/// Reference to a box of a tree, as yielded by a [`BoxIterator`].
#[derive(Debug)]
pub struct BoxRef<'a, const D: usize, E> {
    /// Index of the box in its tree.
    pub id: NodeID,
    /// Structure of the box.
    pub node: &'a Node<E>,
    /// Extents and statistics of the box.
    pub data: &'a BoxData<D>,
}

impl<const D: usize, E> Clone for BoxRef<'_, D, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<const D: usize, E> Copy for BoxRef<'_, D, E> {}

impl<'a, const D: usize, E> BoxRef<'a, D, E> {
    /// Returns `true` if the box holds events directly.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.node.is_leaf()
    }

    /// Returns the events of a leaf box, or an empty slice for a grid box.
    #[inline]
    pub fn events(&self) -> &'a [E] {
        self.node.events()
    }
}

/// Lazy depth-first traversal of the boxes of a tree.
///
/// Boxes are visited in pre-order, a grid box before its children and children in index order.
/// The traversal never mutates the tree, so any number of iterators can run at once and a new
/// one is cheap to create.
///
/// Subtrees can be pruned with a bounding region or an [`ImplicitFunction`]: a box is skipped,
/// along with everything below it, when it does not intersect the region or lies fully outside
/// the function.
#[must_use = "iterators are lazy and do nothing unless consumed"]
#[derive(Clone, Debug)]
pub struct BoxIterator<'a, const D: usize, E> {
    tree: &'a Tree<Node<E>, BoxData<D>>,
    stack: Vec<NodeID>,
    region: Option<BoundingBox<[f64; D]>>,
    function: Option<&'a ImplicitFunction<D>>,
    leaves_only: bool,
    max_depth: Option<u32>,
}

impl<'a, const D: usize, E> BoxIterator<'a, D, E> {
    /// Creates a [`BoxIterator`] over every box of the tree.
    #[inline]
    pub fn new(tree: &'a Tree<Node<E>, BoxData<D>>) -> Self {
        Self::from_box(tree, ROOT)
    }

    /// Creates a [`BoxIterator`] over the box `id` and every box below it.
    #[inline]
    pub fn from_box(tree: &'a Tree<Node<E>, BoxData<D>>, id: NodeID) -> Self {
        let mut stack = Vec::with_capacity(64);
        if (id as usize) < tree.nodes.len() {
            stack.push(id);
        }

        Self {
            tree,
            stack,
            region: None,
            function: None,
            leaves_only: false,
            max_depth: None,
        }
    }

    /// Skips subtrees whose extents do not intersect the closed region.
    #[inline]
    pub fn with_region(mut self, region: BoundingBox<[f64; D]>) -> Self {
        self.region = Some(region);
        self
    }

    /// Skips subtrees lying fully outside the function.
    #[inline]
    pub fn with_function(mut self, function: &'a ImplicitFunction<D>) -> Self {
        self.function = Some(function);
        self
    }

    /// Only yields boxes that are not descended into: leaves, and grid boxes at the maximum
    /// depth if one is set.
    #[inline]
    pub fn leaves_only(mut self) -> Self {
        self.leaves_only = true;
        self
    }

    /// Does not descend below the given depth.
    #[inline]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    #[inline]
    fn is_pruned(&self, data: &BoxData<D>) -> bool {
        self.region
            .as_ref()
            .is_some_and(|region| !data.extents.intersects(region))
            || self
                .function
                .is_some_and(|function| function.box_is_fully_outside(&data.extents))
    }
}

impl<'a, const D: usize, E> Iterator for BoxIterator<'a, D, E> {
    type Item = BoxRef<'a, D, E>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = &self.tree.nodes[id as usize];
            let data = &self.tree.data[id as usize];

            if self.is_pruned(data) {
                continue;
            }

            let descend = self.max_depth.map_or(true, |max_depth| data.depth < max_depth);
            let children = node.children();
            if descend {
                self.stack.extend(children.iter().rev());
            }

            if !self.leaves_only || !descend || children.is_empty() {
                return Some(BoxRef { id, node, data });
            }
        }

        None
    }
}

impl<const D: usize, E> Tree<Node<E>, BoxData<D>> {
    /// Returns an iterator over every box of the tree.
    #[inline]
    pub fn boxes(&self) -> BoxIterator<'_, D, E> {
        BoxIterator::new(self)
    }

    /// Returns an iterator over every leaf box of the tree.
    #[inline]
    pub fn leaves(&self) -> BoxIterator<'_, D, E> {
        BoxIterator::new(self).leaves_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::LeanEvent,
        implicit::{Constraint, Sense},
        tree::BoxTree,
    };

    // Root split in four, the first quadrant split again in four.
    fn tree() -> BoxTree<2, LeanEvent<2>> {
        let mut tree = BoxTree::with_root(BoundingBox::new([0.0, 0.0], [4.0, 4.0]));
        for position in [[0.5, 0.5], [1.5, 1.5], [3.0, 3.0], [3.0, 1.0]] {
            tree.push_event(LeanEvent::unit(position), 2);
        }
        tree.split(ROOT, 2);
        tree.split(1, 2);
        tree
    }

    #[test]
    fn depth_first_pre_order() {
        let tree = tree();
        let ids: Vec<_> = tree.boxes().map(|b| b.id).collect();

        assert_eq!(ids, vec![0, 1, 5, 6, 7, 8, 2, 3, 4]);
    }

    #[test]
    fn leaves_only() {
        let tree = tree();
        let ids: Vec<_> = tree.leaves().map(|b| b.id).collect();
        let events: usize = tree.leaves().map(|b| b.events().len()).sum();

        assert_eq!(ids, vec![5, 6, 7, 8, 2, 3, 4]);
        assert_eq!(events, 4);
    }

    #[test]
    fn max_depth() {
        let tree = tree();
        let ids: Vec<_> = BoxIterator::new(&tree)
            .with_max_depth(1)
            .leaves_only()
            .map(|b| b.id)
            .collect();

        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn region_pruning() {
        let tree = tree();
        let ids: Vec<_> = tree
            .boxes()
            .with_region(BoundingBox::new([2.5, 0.0], [4.0, 1.5]))
            .map(|b| b.id)
            .collect();

        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn function_pruning() {
        let tree = tree();
        let function =
            ImplicitFunction::new().with(Constraint::half_space([1.0, 1.0], 1.5, Sense::Below));
        let ids: Vec<_> = tree.leaves().with_function(&function).map(|b| b.id).collect();

        assert_eq!(ids, vec![5, 6, 7]);
    }

    #[test]
    fn restartable_subtree() {
        let tree = tree();

        assert_eq!(BoxIterator::from_box(&tree, 1).count(), 5);
        assert_eq!(BoxIterator::from_box(&tree, 1).count(), 5);
        assert_eq!(BoxIterator::from_box(&tree, 42).count(), 0);
    }
}
