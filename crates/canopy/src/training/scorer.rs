//! Split scoring rules.
//!
//! A [`Scorer`] rates a candidate partition of a node's instances into an
//! "in" and an "out" side. Higher is better and `0` means no gain over the
//! unsplit node.

use crate::repr::ClassificationCounter;

/// Rates a binary partition.
///
/// Scorers run on the split-search workers, so they must be `Send + Sync`.
/// Any matching closure is a scorer:
///
/// ```
/// use canopy::repr::ClassificationCounter;
/// use canopy::training::Scorer;
///
/// let balanced = |a: &ClassificationCounter, b: &ClassificationCounter| {
///     -(a.total_weight() - b.total_weight()).abs()
/// };
/// let empty = ClassificationCounter::new();
/// assert_eq!(balanced.score_split(&empty, &empty), 0.0);
/// ```
pub trait Scorer: Send + Sync {
    fn score_split(&self, in_counts: &ClassificationCounter, out_counts: &ClassificationCounter) -> f64;
}

impl<F> Scorer for F
where
    F: Fn(&ClassificationCounter, &ClassificationCounter) -> f64 + Send + Sync,
{
    #[inline]
    fn score_split(&self, in_counts: &ClassificationCounter, out_counts: &ClassificationCounter) -> f64 {
        self(in_counts, out_counts)
    }
}

// =============================================================================
// MSE
// =============================================================================

/// Reduction in squared probability error, normalized by the parent weight.
///
/// For a side with total weight `W`, its error is
/// `Σ_l w_l · (1 - w_l / (W + k))²`, with `k = 1` under cross-validation
/// correction and `0` otherwise. The correction inflates the error of thin
/// sides, so splits that isolate a handful of instances score lower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MseScorer {
    pub cross_validation_correction: bool,
}

impl MseScorer {
    pub fn new(cross_validation_correction: bool) -> Self {
        Self {
            cross_validation_correction,
        }
    }

    fn error(&self, counts: &ClassificationCounter) -> f64 {
        let k = if self.cross_validation_correction { 1.0 } else { 0.0 };
        let denom = counts.total_weight() + k;
        if denom <= 0.0 {
            return 0.0;
        }
        counts
            .iter()
            .map(|(_, w)| {
                let miss = 1.0 - w / denom;
                w * miss * miss
            })
            .sum()
    }
}

impl Default for MseScorer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Scorer for MseScorer {
    fn score_split(&self, in_counts: &ClassificationCounter, out_counts: &ClassificationCounter) -> f64 {
        let parent = in_counts.add(out_counts);
        let total = parent.total_weight();
        if total <= 0.0 {
            return 0.0;
        }
        (self.error(&parent) - self.error(in_counts) - self.error(out_counts)) / total
    }
}

// =============================================================================
// Gini / entropy
// =============================================================================

fn weighted_decrease(
    in_counts: &ClassificationCounter,
    out_counts: &ClassificationCounter,
    impurity: impl Fn(&ClassificationCounter) -> f64,
) -> f64 {
    let parent = in_counts.add(out_counts);
    let total = parent.total_weight();
    if total <= 0.0 {
        return 0.0;
    }
    let w_in = in_counts.total_weight() / total;
    let w_out = out_counts.total_weight() / total;
    impurity(&parent) - w_in * impurity(in_counts) - w_out * impurity(out_counts)
}

/// Weighted Gini impurity decrease.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GiniImpurityScorer;

impl GiniImpurityScorer {
    fn gini(counts: &ClassificationCounter) -> f64 {
        let total = counts.total_weight();
        if total <= 0.0 {
            return 0.0;
        }
        1.0 - counts
            .iter()
            .map(|(_, w)| (w / total).powi(2))
            .sum::<f64>()
    }
}

impl Scorer for GiniImpurityScorer {
    fn score_split(&self, in_counts: &ClassificationCounter, out_counts: &ClassificationCounter) -> f64 {
        weighted_decrease(in_counts, out_counts, Self::gini)
    }
}

/// Weighted entropy decrease, in bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InformationGainScorer;

impl InformationGainScorer {
    fn entropy(counts: &ClassificationCounter) -> f64 {
        let total = counts.total_weight();
        if total <= 0.0 {
            return 0.0;
        }
        -counts
            .iter()
            .filter(|&(_, w)| w > 0.0)
            .map(|(_, w)| {
                let p = w / total;
                p * p.log2()
            })
            .sum::<f64>()
    }
}

impl Scorer for InformationGainScorer {
    fn score_split(&self, in_counts: &ClassificationCounter, out_counts: &ClassificationCounter) -> f64 {
        weighted_decrease(in_counts, out_counts, Self::entropy)
    }
}
