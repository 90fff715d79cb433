//! canopy: decision-tree induction with incremental updates.
//!
//! Grows binary classification trees over weighted instances with mixed
//! numeric and categorical attributes, and extends built trees with new data
//! without a full rebuild.
//!
//! # Key Types
//!
//! - [`Instance`] / [`Value`] - Training data
//! - [`TreeBuilder`] / [`TreeConfig`] - Build, update and strip trees
//! - [`Tree`] - Built tree: prediction, statistics, validation
//! - [`ClassificationCounter`] - Weighted label histogram stored at leaves
//!
//! # Example
//!
//! ```
//! use canopy::{Instance, TreeBuilder, TreeConfig, Value};
//! use canopy::training::MseScorer;
//!
//! let mut data: Vec<Instance> = (1..=20)
//!     .map(|x| Instance::new(x > 12).with("x", x))
//!     .collect();
//!
//! let config = TreeConfig::builder().updatable(true).build().unwrap();
//! let builder = TreeBuilder::new(MseScorer::default(), config);
//! let mut tree = builder.build(&data).unwrap();
//!
//! // Later: more data arrives.
//! data.push(Instance::new(true).with("x", 30));
//! builder.update(&mut tree, &data, [20], true).unwrap();
//!
//! // No further updates expected.
//! builder.strip(&mut tree).unwrap();
//!
//! let probe = Instance::new(false).with("x", 25);
//! assert_eq!(tree.classify(probe.attributes()), Some(&Value::from(true)));
//! ```

// Re-export approx traits for users who want to compare counters
pub use approx;

pub mod data;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use data::{Attributes, Instance, Value};
pub use repr::{ClassificationCounter, Tree, TreeMode};
pub use training::{Scorer, TreeBuilder, TreeConfig, TreeError};
pub use utils::{run_with_threads, Parallelism};
