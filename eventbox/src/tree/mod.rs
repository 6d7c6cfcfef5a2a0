/// Bounding box related types.
pub mod partition;

use crate::{controller::BoxController, Event};

pub use partition::*;

/// Index of a [`Node`] in a [`Tree`].
pub type NodeID = u32;

/// Index of the root box of every [`BoxTree`].
pub const ROOT: NodeID = 0;

/// Generic tree data structure.
#[derive(Clone, Debug)]
pub struct Tree<Node, Data> {
    /// Vector of `Node` objects that define the structure of the tree.
    pub nodes: Vec<Node>,

    /// Vector of generic `Data` objects that contain information about the associated `Node`.
    ///
    /// The `data` vector is parallel to the `nodes` vector, so the `i`-th element of the `data`
    /// vector corresponds to the `i`-th element of the `nodes` vector.
    pub data: Vec<Data>,
}

impl<Node, Data> Tree<Node, Data> {
    /// Creates a new empty [`Tree`].
    #[inline]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Creates a new empty [`Tree`] with at least the specified capacity in the `nodes` and
    /// `data` vectors.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            data: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a node and its data, returning its [`NodeID`].
    #[inline]
    pub fn push(&mut self, node: Node, data: Data) -> NodeID {
        let id = self.nodes.len() as NodeID;
        self.nodes.push(node);
        self.data.push(data);
        id
    }
}

impl<Node, Data> Default for Tree<Node, Data> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Box that either holds events directly or is partitioned into child boxes.
#[derive(Clone, Debug, PartialEq)]
pub enum Node<E> {
    /// Box storing its events.
    Leaf(Vec<E>),
    /// Box cut into a regular grid of `split_into^D` children, axis 0 varying fastest.
    Grid(Vec<NodeID>),
}

impl<E> Node<E> {
    /// Returns `true` if the node is a [`Node::Leaf`].
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Returns the events of a leaf, or an empty slice for a grid.
    #[inline]
    pub fn events(&self) -> &[E] {
        match self {
            Self::Leaf(events) => events,
            Self::Grid(_) => &[],
        }
    }

    /// Returns the children of a grid, or an empty slice for a leaf.
    #[inline]
    pub fn children(&self) -> &[NodeID] {
        match self {
            Self::Leaf(_) => &[],
            Self::Grid(children) => children,
        }
    }
}

/// Extents and cached statistics of a box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxData<const D: usize> {
    /// Region of space covered by the box.
    pub extents: BoundingBox<[f64; D]>,
    /// Sum of the signal of every event in the box.
    pub signal: f64,
    /// Sum of the squared error of every event in the box.
    pub error_squared: f64,
    /// Number of events in the box.
    pub event_count: u64,
    /// Distance from the root box.
    pub depth: u32,
    /// Box this box is a child of, `None` for the root.
    pub parent: Option<NodeID>,
}

impl<const D: usize> BoxData<D> {
    /// Creates the data of an empty box.
    #[inline]
    pub const fn empty(extents: BoundingBox<[f64; D]>, depth: u32, parent: Option<NodeID>) -> Self {
        Self {
            extents,
            signal: 0.0,
            error_squared: 0.0,
            event_count: 0,
            depth,
            parent,
        }
    }

    /// Adds an event to the cached statistics.
    #[inline]
    pub fn add<E: Event<D>>(&mut self, event: &E) {
        self.signal += event.signal();
        self.error_squared += event.error_squared();
        self.event_count += 1;
    }
}

/// Tree of boxes holding events of type `E` in `D` dimensions.
pub type BoxTree<const D: usize, E> = Tree<Node<E>, BoxData<D>>;

/// Why a leaf box holding more events than its capacity was not split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Degenerate {
    /// The leaf is at the maximum depth allowed by the controller.
    MaxDepth,
    /// Every event of the leaf has the same coordinates.
    Coincident,
}

/// Outcome of splitting the overflowing leaves of a tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SplitReport {
    /// Number of leaves converted into grids.
    pub splits: usize,
    /// Number of overflowing leaves left unsplit.
    pub degenerate: usize,
}

impl<const D: usize, E: Event<D>> Tree<Node<E>, BoxData<D>> {
    /// Creates a new [`BoxTree`] made of a single empty leaf covering `extents`.
    #[inline]
    pub fn with_root(extents: BoundingBox<[f64; D]>) -> Self {
        let mut tree = Self::new();
        tree.push(Node::Leaf(Vec::new()), BoxData::empty(extents, 0, None));
        tree
    }

    /// Returns the [`BoxData`] of the root box.
    #[inline]
    pub fn root_data(&self) -> &BoxData<D> {
        &self.data[ROOT as usize]
    }

    /// Returns the leaf whose extents contain the position, descending from the root.
    ///
    /// Positions outside the root are attributed to the nearest leaf along each axis.
    pub fn leaf_for(&self, position: &[f64; D], split_into: usize) -> NodeID {
        let mut id = ROOT;
        while let Node::Grid(children) = &self.nodes[id as usize] {
            let extents = &self.data[id as usize].extents;
            id = children[extents.child_index(position, split_into)];
        }
        id
    }

    /// Adds an event to the leaf containing it and to the statistics of every box above that
    /// leaf, returning the leaf.
    ///
    /// The event must lie inside the root box.
    pub fn push_event(&mut self, event: E, split_into: usize) -> NodeID {
        let position = event.center();
        let mut id = ROOT;
        loop {
            self.data[id as usize].add(&event);
            match &mut self.nodes[id as usize] {
                Node::Grid(children) => {
                    let extents = &self.data[id as usize].extents;
                    id = children[extents.child_index(&position, split_into)];
                }
                Node::Leaf(events) => {
                    events.push(event);
                    return id;
                }
            }
        }
    }

    /// Converts the leaf `id` into a grid of `split_into^D` new leaves and moves its events into
    /// them. Returns the children, or `None` if `id` is not a leaf.
    ///
    /// The statistics of the split box are left untouched.
    pub fn split(&mut self, id: NodeID, split_into: usize) -> Option<&[NodeID]> {
        let events = match &mut self.nodes[id as usize] {
            Node::Leaf(events) => std::mem::take(events),
            Node::Grid(_) => return None,
        };

        let parent = self.data[id as usize];
        let extents = parent.extents.subdivide(split_into);
        let mut buckets: Vec<Vec<E>> = extents.iter().map(|_| Vec::new()).collect();
        for event in events {
            let index = parent.extents.child_index(&event.center(), split_into);
            buckets[index].push(event);
        }

        let children = std::iter::zip(extents, buckets)
            .map(|(extents, events)| {
                let mut data = BoxData::empty(extents, parent.depth + 1, Some(id));
                events.iter().for_each(|event| data.add(event));
                self.push(Node::Leaf(events), data)
            })
            .collect();

        self.nodes[id as usize] = Node::Grid(children);
        Some(self.nodes[id as usize].children())
    }

    /// Splits every leaf among `candidates` holding more events than the capacity of the
    /// controller, and recursively the new leaves that still overflow.
    pub fn split_overflowing<I>(&mut self, candidates: I, controller: &BoxController) -> SplitReport
    where
        I: IntoIterator<Item = NodeID>,
    {
        let mut report = SplitReport::default();
        let mut stack = candidates.into_iter().collect::<Vec<_>>();
        stack.sort_unstable();
        stack.dedup();

        while let Some(id) = stack.pop() {
            let data = &self.data[id as usize];
            let events = match &self.nodes[id as usize] {
                Node::Leaf(events) if events.len() > controller.leaf_capacity => events,
                _ => continue,
            };

            let degenerate = if data.depth >= controller.max_depth {
                Some(Degenerate::MaxDepth)
            } else if events.windows(2).all(|e| e[0].center() == e[1].center()) {
                Some(Degenerate::Coincident)
            } else {
                None
            };

            if let Some(reason) = degenerate {
                tracing::trace!(id, depth = data.depth, events = events.len(), ?reason, "leaf left unsplit");
                report.degenerate += 1;
                continue;
            }

            tracing::trace!(id, depth = data.depth, events = events.len(), "splitting leaf");
            if let Some(children) = self.split(id, controller.split_into) {
                stack.extend_from_slice(children);
                report.splits += 1;
            }
        }

        report
    }

    /// Returns the number of leaf boxes.
    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Returns the depth of the deepest box.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.data.iter().map(|data| data.depth).max().unwrap_or(0)
    }
}
