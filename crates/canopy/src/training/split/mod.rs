//! Split search.
//!
//! Per-attribute evaluation is a pure function of a [`NodeView`] (the rows
//! reaching a node), the numeric [`SplitTable`] and the scorer, so attributes
//! can be scored on separate threads. All randomness (reservoir sampling,
//! attribute skipping) happens in the caller before the parallel region.
//!
//! - [`numeric`]: reservoir-sampled quantile thresholds and threshold scans
//! - [`categorical`]: greedy in-set selection
//! - [`reservoir`]: bounded-memory uniform sampling

mod categorical;
mod numeric;
mod reservoir;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::data::{Instance, Value};
use crate::repr::{BranchTest, CategoricalTest, NumericTest};
use crate::training::config::TreeConfig;
use crate::training::scorer::Scorer;
use crate::utils::Parallelism;

pub(crate) use categorical::best_categorical_split;
pub(crate) use numeric::{best_numeric_split, compute_split_table, distinct_thresholds, sample_thresholds};
pub use numeric::quantile_thresholds;
pub use reservoir::ReservoirSampler;

/// Attribute name → candidate numeric thresholds.
pub type SplitTable = HashMap<String, Vec<f64>>;

// =============================================================================
// NodeView
// =============================================================================

/// The instances reaching a node, by row index.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NodeView<'a> {
    data: &'a [Instance],
    rows: &'a [u32],
}

impl<'a> NodeView<'a> {
    pub(crate) fn new(data: &'a [Instance], rows: &'a [u32]) -> Self {
        Self { data, rows }
    }

    pub(crate) fn instances(&self) -> impl Iterator<Item = &'a Instance> + '_ {
        let data = self.data;
        self.rows.iter().map(move |&row| &data[row as usize])
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }
}

// =============================================================================
// Candidates
// =============================================================================

/// A test chosen for a node, before it becomes a branch.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SplitTest {
    Numeric(NumericTest),
    Categorical(CategoricalTest),
}

impl SplitTest {
    #[inline]
    pub(crate) fn decide(&self, value: Option<&Value>) -> bool {
        match self {
            SplitTest::Numeric(test) => test.decide(value),
            SplitTest::Categorical(test) => test.decide(value),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SplitCandidate {
    pub attribute: String,
    pub test: SplitTest,
    pub score: f64,
}

/// Attributes observed at the node, with whether every observed value is a
/// number. Missing values do not count either way.
pub(crate) fn survey_attributes(view: &NodeView<'_>) -> BTreeMap<String, bool> {
    let mut survey: BTreeMap<String, bool> = BTreeMap::new();
    for instance in view.instances() {
        for (name, value) in instance.attributes() {
            let numeric = value.is_number();
            survey
                .entry(name.clone())
                .and_modify(|all| *all &= numeric)
                .or_insert(numeric);
        }
    }
    survey
}

/// Best split on one attribute.
///
/// The numeric candidate is considered only when every observed value is a
/// number, and beats the categorical candidate only if strictly better.
/// Nodes with at most `small_training_set_limit` rows scan their distinct
/// values instead of the table's quantile thresholds.
pub(crate) fn evaluate_attribute(
    view: &NodeView<'_>,
    attribute: &str,
    all_numeric: bool,
    splits: &SplitTable,
    config: &TreeConfig,
    scorer: &dyn Scorer,
) -> Option<SplitCandidate> {
    let numeric = if all_numeric {
        let thresholds: Option<Cow<'_, [f64]>> = if view.len() <= config.small_training_set_limit {
            Some(Cow::Owned(distinct_thresholds(view, attribute)))
        } else {
            splits.get(attribute).map(|t| Cow::Borrowed(t.as_slice()))
        };
        thresholds.and_then(|t| best_numeric_split(view, attribute, &t, scorer))
    } else {
        None
    };

    let categorical = best_categorical_split(
        view,
        attribute,
        config.min_categorical_attribute_value_occurrences,
        scorer,
    );

    let (test, score) = match (numeric, categorical) {
        (Some((threshold, n)), Some((_, c))) if n > c => {
            (SplitTest::Numeric(NumericTest { threshold }), n)
        }
        (_, Some((in_set, c))) => (SplitTest::Categorical(CategoricalTest { in_set }), c),
        (Some((threshold, n)), None) => (SplitTest::Numeric(NumericTest { threshold }), n),
        (None, None) => return None,
    };

    Some(SplitCandidate {
        attribute: attribute.to_owned(),
        test,
        score,
    })
}

/// Score `attributes` (in parallel when allowed) and keep the first strictly
/// best candidate in attribute order.
pub(crate) fn find_best_split(
    view: &NodeView<'_>,
    attributes: Vec<(String, bool)>,
    splits: &SplitTable,
    config: &TreeConfig,
    scorer: &dyn Scorer,
    parallelism: Parallelism,
) -> Option<SplitCandidate> {
    let view = *view;
    let candidates = parallelism.maybe_par_map(attributes, |(name, all_numeric)| {
        evaluate_attribute(&view, &name, all_numeric, splits, config, scorer)
    });

    candidates
        .into_iter()
        .flatten()
        .fold(None, |best: Option<SplitCandidate>, candidate| match best {
            Some(b) if b.score >= candidate.score => Some(b),
            _ => Some(candidate),
        })
}
