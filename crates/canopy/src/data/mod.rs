//! Training data model.
//!
//! - [`Value`]: attribute value or class label
//! - [`Attributes`]: ordered attribute name → value mapping
//! - [`Instance`]: one weighted, labeled example

mod instance;
mod value;

pub use instance::{Attributes, Instance};
pub use value::Value;
