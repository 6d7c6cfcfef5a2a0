use crate::{Error, Result};

/// What happens to events inserted outside the extents of a workspace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutOfRangePolicy {
    /// The event is discarded and counted as dropped.
    #[default]
    Drop,
    /// The event is moved onto the nearest point inside the workspace and counted as clipped.
    Clip,
}

/// Parameters ruling how the boxes of a workspace split.
///
/// Configured once when the workspace is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxController {
    /// Number of slices each axis of a box is cut into when it splits. A split box has
    /// `split_into^D` children.
    pub split_into: usize,
    /// Number of events a leaf box can hold before it splits.
    pub leaf_capacity: usize,
    /// Depth at which leaf boxes stop splitting, regardless of how many events they hold.
    pub max_depth: u32,
    /// Handling of events outside the workspace extents.
    pub out_of_range: OutOfRangePolicy,
}

impl Default for BoxController {
    #[inline]
    fn default() -> Self {
        Self {
            split_into: 2,
            leaf_capacity: 1000,
            max_depth: 20,
            out_of_range: OutOfRangePolicy::Drop,
        }
    }
}

impl BoxController {
    /// Creates a new [`BoxController`] with the given split factor and leaf capacity.
    #[inline]
    pub fn new(split_into: usize, leaf_capacity: usize) -> Self {
        Self {
            split_into,
            leaf_capacity,
            ..Self::default()
        }
    }

    /// Sets the number of slices each axis is cut into.
    #[inline]
    pub fn with_split_into(mut self, split_into: usize) -> Self {
        self.split_into = split_into;
        self
    }

    /// Sets the number of events a leaf can hold before it splits.
    #[inline]
    pub fn with_leaf_capacity(mut self, leaf_capacity: usize) -> Self {
        self.leaf_capacity = leaf_capacity;
        self
    }

    /// Sets the depth at which boxes stop splitting.
    #[inline]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the handling of events outside the workspace extents.
    #[inline]
    pub fn with_out_of_range(mut self, policy: OutOfRangePolicy) -> Self {
        self.out_of_range = policy;
        self
    }

    /// Returns the number of children of a split box in `dimensions` dimensions.
    #[inline]
    pub fn children_count(&self, dimensions: usize) -> usize {
        self.split_into.pow(dimensions as u32)
    }

    /// Checks that the parameters can build a tree in `dimensions` dimensions.
    pub fn validate(&self, dimensions: usize) -> Result<()> {
        if self.split_into < 2 {
            return Err(Error::InvalidController(format!(
                "boxes must split into at least 2 slices per axis, got {}",
                self.split_into
            )));
        }
        if self.leaf_capacity == 0 {
            return Err(Error::InvalidController(
                "leaf capacity must be at least 1".to_owned(),
            ));
        }
        if self
            .split_into
            .checked_pow(dimensions as u32)
            .map_or(true, |count| count > u32::MAX as usize)
        {
            return Err(Error::InvalidController(format!(
                "splitting into {} slices in {dimensions} dimensions creates too many children",
                self.split_into
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let controller = BoxController::new(3, 50)
            .with_max_depth(4)
            .with_out_of_range(OutOfRangePolicy::Clip);

        assert_eq!(controller.split_into, 3);
        assert_eq!(controller.leaf_capacity, 50);
        assert_eq!(controller.max_depth, 4);
        assert_eq!(controller.out_of_range, OutOfRangePolicy::Clip);
        assert_eq!(controller.children_count(3), 27);
    }

    #[test]
    fn validation() {
        assert!(BoxController::default().validate(9).is_ok());
        assert!(BoxController::new(1, 10).validate(2).is_err());
        assert!(BoxController::new(2, 0).validate(2).is_err());
        assert!(BoxController::new(64, 10).validate(9).is_err());
    }
}
