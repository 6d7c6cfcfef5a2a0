use crate::histogram::DenseHistogram;

/// Errors returned by fallible operations of this crate.
///
/// Problems with individual events are never reported as errors; they are counted in
/// [`InsertReport`](crate::workspace::InsertReport) and [`BinReport`](crate::BinReport).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Dimension counts of a transform, workspace or histogram do not agree.
    #[error("invalid dimensionality for {context}: expected {expected}, found {found}")]
    InvalidDimensionality {
        /// What was being checked.
        context: &'static str,
        /// Number of dimensions required.
        expected: usize,
        /// Number of dimensions supplied.
        found: usize,
    },

    /// An axis is malformed or makes the histogram too large to index.
    #[error("invalid axis {index}: {reason}")]
    InvalidAxis {
        /// Index of the offending axis.
        index: usize,
        /// Description of the problem.
        reason: String,
    },

    /// The box controller cannot build a tree.
    #[error("invalid box controller: {0}")]
    InvalidController(String),

    /// Workspaces can only be created with 1 to 9 dimensions at runtime.
    #[error("unsupported number of dimensions: {0} (supported: 1 to 9)")]
    UnsupportedDimensionality(usize),

    /// Binning observed its cancellation token and stopped early.
    #[error("binning cancelled after visiting {boxes_visited} boxes")]
    Cancelled {
        /// Histogram accumulated before cancellation was observed.
        partial: Box<DenseHistogram>,
        /// Number of boxes visited before stopping.
        boxes_visited: usize,
    },
}

/// Result type of fallible operations of this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
