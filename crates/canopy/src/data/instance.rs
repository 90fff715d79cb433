//! Weighted, labeled training instances.

use std::collections::BTreeMap;

use super::value::Value;

/// Attribute name → value, ordered by name.
pub type Attributes = BTreeMap<String, Value>;

/// One weighted, labeled training example.
///
/// Instances are owned by the caller; the engine only ever reads them through
/// a slice and refers to them by row index.
///
/// # Example
///
/// ```
/// use canopy::data::{Instance, Value};
///
/// let instance = Instance::new(true)
///     .with("x", 3.5)
///     .with("color", "red")
///     .weighted(2.0);
///
/// assert_eq!(instance.attribute("x"), Some(&Value::Number(3.5)));
/// assert_eq!(instance.weight(), 2.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    attributes: Attributes,
    label: Value,
    weight: f64,
}

impl Instance {
    /// An instance with no attributes and weight 1.
    pub fn new(label: impl Into<Value>) -> Self {
        Self {
            attributes: Attributes::new(),
            label: label.into(),
            weight: 1.0,
        }
    }

    /// An instance from prepared parts.
    pub fn from_parts(attributes: Attributes, label: impl Into<Value>, weight: f64) -> Self {
        Self {
            attributes,
            label: label.into(),
            weight,
        }
    }

    /// Set an attribute, replacing any previous value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the instance weight.
    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    #[inline]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    #[inline]
    pub fn label(&self) -> &Value {
        &self.label
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }
}
