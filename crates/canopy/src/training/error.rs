//! Errors returned by tree build, update and strip.

/// Errors from [`TreeBuilder`](super::TreeBuilder) operations.
///
/// Failing to find a useful split is never an error; the node simply becomes
/// a leaf. Every variant here is raised before the tree is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// `build` was called with no instances.
    #[error("training data is empty")]
    EmptyTrainingData,

    /// The tree keeps no row indices: it was built without `updatable`, or
    /// has been stripped.
    #[error("tree is not updatable")]
    NotUpdatable,

    /// A row index does not point into the training data.
    #[error("row {row} out of range for training data of length {len}")]
    RowOutOfRange { row: usize, len: usize },

    /// Row indices are stored as `u32`.
    #[error("training data of length {len} exceeds the supported row count")]
    TooManyRows { len: usize },

    /// A new row is already recorded in the tree, or repeated in the batch.
    #[error("row {row} is already part of the tree")]
    DuplicateRow { row: usize },

    /// Instance weights must be finite and non-negative.
    #[error("row {row} has invalid weight {weight}")]
    InvalidWeight { row: usize, weight: f64 },
}
