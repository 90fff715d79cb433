//! Numeric threshold generation and scanning.

use std::collections::BTreeSet;

use rand::Rng;

use crate::data::{Instance, Value};
use crate::repr::ClassificationCounter;
use crate::training::scorer::Scorer;

use super::reservoir::ReservoirSampler;
use super::{NodeView, SplitTable};

/// The value a numeric test sees: missing and non-numeric read as `0.0`.
#[inline]
pub(crate) fn numeric_value(instance: &Instance, attribute: &str) -> f64 {
    instance
        .attribute(attribute)
        .and_then(Value::as_number)
        .unwrap_or(0.0)
}

/// `k - 1` quantile cut points of `samples`.
///
/// With `step = len / k`, threshold `x` is `sorted[(x + 1) * step]`.
/// Duplicates are kept; the scan skips consecutive repeats.
pub fn quantile_thresholds(mut samples: Vec<f64>, k: usize) -> Vec<f64> {
    if samples.is_empty() || k == 0 {
        return Vec::new();
    }
    samples.sort_by(f64::total_cmp);
    let step = samples.len() / k;
    (0..k - 1).map(|x| samples[(x + 1) * step]).collect()
}

/// Reservoir-sampled quantile thresholds of `attribute` over `rows`.
pub(crate) fn sample_thresholds<R: Rng + ?Sized>(
    data: &[Instance],
    rows: &[u32],
    attribute: &str,
    reservoir_size: usize,
    k: usize,
    rng: &mut R,
) -> Vec<f64> {
    let mut sampler = ReservoirSampler::new(reservoir_size);
    for &row in rows {
        sampler.add(numeric_value(&data[row as usize], attribute), rng);
    }
    quantile_thresholds(sampler.into_samples(), k)
}

/// Thresholds for every attribute that takes a numeric value in `rows`.
///
/// Attributes are sampled in name order so RNG consumption is reproducible.
pub(crate) fn compute_split_table<R: Rng + ?Sized>(
    data: &[Instance],
    rows: &[u32],
    reservoir_size: usize,
    k: usize,
    rng: &mut R,
) -> SplitTable {
    let numeric: BTreeSet<&str> = rows
        .iter()
        .flat_map(|&row| data[row as usize].attributes())
        .filter(|(_, value)| value.is_number())
        .map(|(name, _)| name.as_str())
        .collect();

    numeric
        .into_iter()
        .map(|name| {
            let thresholds = sample_thresholds(data, rows, name, reservoir_size, k, rng);
            (name.to_owned(), thresholds)
        })
        .collect()
}

/// Every distinct numeric value of `attribute` present at the node, ascending.
pub(crate) fn distinct_thresholds(view: &NodeView<'_>, attribute: &str) -> Vec<f64> {
    let mut values: Vec<f64> = view
        .instances()
        .filter_map(|instance| instance.attribute(attribute).and_then(Value::as_number))
        .collect();
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| a.total_cmp(b).is_eq());
    values
}

/// Best `value > threshold` split over `thresholds`: `(threshold, score)`.
///
/// A threshold must strictly beat every earlier one (and 0) to be chosen.
/// Thresholds leaving either side without weight are skipped.
pub(crate) fn best_numeric_split(
    view: &NodeView<'_>,
    attribute: &str,
    thresholds: &[f64],
    scorer: &dyn Scorer,
) -> Option<(f64, f64)> {
    let values: Vec<(f64, &Instance)> = view
        .instances()
        .map(|instance| (numeric_value(instance, attribute), instance))
        .collect();

    let mut best = None;
    let mut best_score = 0.0;
    let mut previous: Option<f64> = None;
    for &threshold in thresholds {
        if previous == Some(threshold) {
            continue;
        }
        previous = Some(threshold);

        let in_counts = ClassificationCounter::count_all(
            values.iter().filter(|(v, _)| *v > threshold).map(|&(_, i)| i),
        );
        let out_counts = ClassificationCounter::count_all(
            values.iter().filter(|(v, _)| !(*v > threshold)).map(|&(_, i)| i),
        );
        if in_counts.total_weight() <= 0.0 || out_counts.total_weight() <= 0.0 {
            continue;
        }

        let score = scorer.score_split(&in_counts, &out_counts);
        if score > best_score {
            best_score = score;
            best = Some((threshold, score));
        }
    }
    best
}
