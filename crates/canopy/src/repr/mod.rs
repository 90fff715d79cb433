//! Tree representation.
//!
//! - [`ClassificationCounter`]: weighted label histogram stored at leaves
//! - [`Node`]: leaf, numeric branch or categorical branch
//! - [`Tree`]: arena of nodes with prediction and validation

mod counter;
mod node;
mod tree;

pub use counter::ClassificationCounter;
pub use node::{
    Branch, BranchTest, CategoricalBranch, CategoricalTest, Leaf, Node, NodeId, NumericBranch,
    NumericTest, NO_CHILD,
};
pub use tree::{Tree, TreeMode, TreeValidationError};
