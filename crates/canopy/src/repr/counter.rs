//! Weighted label histograms.

use std::collections::BTreeMap;
use std::fmt;

use approx::AbsDiffEq;

use crate::data::{Instance, Value};

/// Immutable weighted histogram mapping label → accumulated weight.
///
/// Describes the label distribution of an instance subset without
/// materializing the subset. All combining operations return new counters.
/// Labels iterate in [`Value`] order.
///
/// # Example
///
/// ```
/// use canopy::data::Instance;
/// use canopy::repr::ClassificationCounter;
///
/// let data = vec![Instance::new("a"), Instance::new("b").weighted(2.0)];
/// let counts = ClassificationCounter::count_all(&data);
///
/// assert_eq!(counts.total_weight(), 3.0);
/// assert_eq!(counts.count(&"b".into()), 2.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassificationCounter {
    counts: BTreeMap<Value, f64>,
    total: f64,
}

impl ClassificationCounter {
    /// An empty counter.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter holding a single instance.
    pub fn of(instance: &Instance) -> Self {
        let mut counts = BTreeMap::new();
        counts.insert(instance.label().clone(), instance.weight());
        Self {
            counts,
            total: instance.weight(),
        }
    }

    /// Weighted label histogram of `instances`.
    pub fn count_all<'a, I>(instances: I) -> Self
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        let mut counter = Self::new();
        for instance in instances {
            counter.accumulate(instance);
        }
        counter
    }

    /// Aggregate histogram plus one histogram per value of `attribute`, in one
    /// pass.
    ///
    /// Instances lacking the attribute count towards the aggregate only.
    pub fn count_all_by_attribute_value<'a, I>(
        instances: I,
        attribute: &str,
    ) -> (Self, BTreeMap<Value, Self>)
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        let mut total = Self::new();
        let mut by_value: BTreeMap<Value, Self> = BTreeMap::new();
        for instance in instances {
            total.accumulate(instance);
            if let Some(value) = instance.attribute(attribute) {
                by_value.entry(value.clone()).or_default().accumulate(instance);
            }
        }
        (total, by_value)
    }

    fn accumulate(&mut self, instance: &Instance) {
        *self.counts.entry(instance.label().clone()).or_insert(0.0) += instance.weight();
        self.total += instance.weight();
    }

    /// Sum of two histograms.
    pub fn add(&self, other: &Self) -> Self {
        let mut counts = self.counts.clone();
        for (label, weight) in &other.counts {
            *counts.entry(label.clone()).or_insert(0.0) += weight;
        }
        Self {
            counts,
            total: self.total + other.total,
        }
    }

    /// Difference of two histograms.
    ///
    /// Labels whose weight drops to zero or below are removed.
    pub fn subtract(&self, other: &Self) -> Self {
        let mut counts = self.counts.clone();
        for (label, weight) in &other.counts {
            if let Some(current) = counts.get_mut(label) {
                *current -= weight;
                if *current <= 0.0 {
                    counts.remove(label);
                }
            }
        }
        let total = counts.values().sum();
        Self { counts, total }
    }

    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.total
    }

    /// Weight recorded for `label` (0 when absent).
    #[inline]
    pub fn count(&self, label: &Value) -> f64 {
        self.counts.get(label).copied().unwrap_or(0.0)
    }

    /// Share of the total weight carried by `label` (0 for an empty counter).
    pub fn probability(&self, label: &Value) -> f64 {
        if self.total > 0.0 {
            self.count(label) / self.total
        } else {
            0.0
        }
    }

    /// Label with the largest weight; the smallest label wins ties.
    pub fn most_popular(&self) -> Option<(&Value, f64)> {
        self.counts
            .iter()
            .fold(None, |best: Option<(&Value, f64)>, (label, &weight)| match best {
                Some((_, w)) if w >= weight => best,
                _ => Some((label, weight)),
            })
    }

    /// Smallest per-label weight among the labels present.
    pub fn min_label_weight(&self) -> Option<f64> {
        self.counts.values().copied().reduce(f64::min)
    }

    #[inline]
    pub fn labels(&self) -> impl Iterator<Item = &Value> {
        self.counts.keys()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&Value, f64)> {
        self.counts.iter().map(|(label, &weight)| (label, weight))
    }

    /// Number of distinct labels present.
    #[inline]
    pub fn n_labels(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl AbsDiffEq for ClassificationCounter {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    /// Labels missing on one side compare as weight 0.
    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.total.abs_diff_eq(&other.total, epsilon)
            && self
                .labels()
                .chain(other.labels())
                .all(|label| self.count(label).abs_diff_eq(&other.count(label), epsilon))
    }
}

impl fmt::Display for ClassificationCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (label, weight)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}: {weight}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn data() -> Vec<Instance> {
        vec![
            Instance::new("a").with("color", "red"),
            Instance::new("a").with("color", "blue").weighted(2.0),
            Instance::new("b").with("color", "red"),
            Instance::new("b"),
        ]
    }

    #[test]
    fn empty_input_yields_zero_counter() {
        let counter = ClassificationCounter::count_all(&Vec::<Instance>::new());
        assert!(counter.is_empty());
        assert_eq!(counter.total_weight(), 0.0);
        assert!(counter.most_popular().is_none());
        assert_eq!(counter.probability(&"a".into()), 0.0);
    }

    #[test]
    fn count_all_weights_labels() {
        let counter = ClassificationCounter::count_all(&data());
        assert_eq!(counter.count(&"a".into()), 3.0);
        assert_eq!(counter.count(&"b".into()), 2.0);
        assert_eq!(counter.total_weight(), 5.0);
        assert_eq!(counter.most_popular(), Some((&Value::from("a"), 3.0)));
    }

    #[test]
    fn by_attribute_value_partitions_present_values() {
        let data = data();
        let (total, by_value) = ClassificationCounter::count_all_by_attribute_value(&data, "color");
        assert_eq!(total, ClassificationCounter::count_all(&data));
        assert_eq!(by_value.len(), 2);

        let red = &by_value[&Value::from("red")];
        assert_eq!(red.count(&"a".into()), 1.0);
        assert_eq!(red.count(&"b".into()), 1.0);

        // The instance without a color contributes to the aggregate only.
        let summed = by_value.values().fold(ClassificationCounter::new(), |acc, c| acc.add(c));
        assert_abs_diff_eq!(summed.total_weight(), total.total_weight() - 1.0);
    }

    #[test]
    fn add_then_subtract_restores_parent() {
        let data = data();
        let (left, right) = data.split_at(2);
        let parent = ClassificationCounter::count_all(&data);
        let in_counts = ClassificationCounter::count_all(left);
        let out_counts = ClassificationCounter::count_all(right);

        assert_abs_diff_eq!(in_counts.add(&out_counts), parent, epsilon = 1e-12);
        assert_abs_diff_eq!(parent.subtract(&in_counts), out_counts, epsilon = 1e-12);
    }

    #[test]
    fn subtract_drops_exhausted_labels() {
        let a = ClassificationCounter::of(&Instance::new("a").weighted(2.0));
        let diff = a.subtract(&a);
        assert!(diff.is_empty());
        assert_eq!(diff.total_weight(), 0.0);
    }

    #[test]
    fn min_label_weight_ignores_absent_labels() {
        let counter = ClassificationCounter::count_all(&data());
        assert_eq!(counter.min_label_weight(), Some(2.0));
        assert_eq!(ClassificationCounter::new().min_label_weight(), None);
    }
}
