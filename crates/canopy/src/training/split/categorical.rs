//! Greedy forward selection of categorical in-sets.

use std::collections::BTreeSet;

use crate::data::Value;
use crate::repr::ClassificationCounter;
use crate::training::scorer::Scorer;

use super::NodeView;

/// Best in-set for `attribute`: `(in_set, score)`.
///
/// Starts from an empty in-set with every instance "out". Each round tries
/// moving every remaining value in (in [`Value`] order), keeps the best (first
/// on ties), and commits it only if it strictly beats the running best score,
/// which starts at 0. Committed values are never reconsidered.
///
/// Values whose smallest per-label weight is below `min_occurrences` are
/// never candidates. Instances missing the attribute always stay out.
pub(crate) fn best_categorical_split(
    view: &NodeView<'_>,
    attribute: &str,
    min_occurrences: f64,
    scorer: &dyn Scorer,
) -> Option<(BTreeSet<Value>, f64)> {
    let (total, by_value) =
        ClassificationCounter::count_all_by_attribute_value(view.instances(), attribute);

    let mut remaining: Vec<(Value, ClassificationCounter)> = by_value
        .into_iter()
        .filter(|(_, counts)| counts.min_label_weight().is_some_and(|w| w >= min_occurrences))
        .collect();

    let mut in_set = BTreeSet::new();
    let mut in_counts = ClassificationCounter::new();
    let mut out_counts = total;
    let mut best_score = 0.0;

    loop {
        let mut round: Option<(usize, f64, ClassificationCounter, ClassificationCounter)> = None;
        for (i, (_, counts)) in remaining.iter().enumerate() {
            let next_in = in_counts.add(counts);
            let next_out = out_counts.subtract(counts);
            if next_in.total_weight() <= 0.0 || next_out.total_weight() <= 0.0 {
                continue;
            }
            let score = scorer.score_split(&next_in, &next_out);
            if round.as_ref().map_or(true, |(_, s, _, _)| score > *s) {
                round = Some((i, score, next_in, next_out));
            }
        }

        match round {
            Some((i, score, next_in, next_out)) if score > best_score => {
                let (value, _) = remaining.remove(i);
                in_set.insert(value);
                in_counts = next_in;
                out_counts = next_out;
                best_score = score;
            }
            _ => break,
        }
    }

    (!in_set.is_empty()).then_some((in_set, best_score))
}
