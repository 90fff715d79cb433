//! Test fixtures and invariant checks shared by unit tests, integration
//! tests and benchmarks.
//!
//! The `assert_*` helpers panic with a description of the first violation.

use std::collections::BTreeMap;

use approx::abs_diff_eq;
use rand::prelude::*;

use crate::data::{Instance, Value};
use crate::repr::{ClassificationCounter, Node, NodeId, Tree};

// =============================================================================
// Fixtures
// =============================================================================

/// `x = 1..=n`, labelled `x > cut`.
pub fn separable_line(n: i32, cut: i32) -> Vec<Instance> {
    (1..=n).map(|x| Instance::new(x > cut).with("x", x)).collect()
}

/// `n` instances of each color; `"red"` is labelled `true`, the rest `false`.
pub fn colors(n: usize, palette: &[&str]) -> Vec<Instance> {
    palette
        .iter()
        .flat_map(|&color| {
            (0..n).map(move |_| Instance::new(color == "red").with("color", color))
        })
        .collect()
}

/// Random mixed-type data with a learnable label.
///
/// Attributes: `a` and `b` uniform in [0, 10), `c` one of four colors, and
/// `d` present on roughly half the rows. The label is `"hi"` when
/// `a + b > 10` or `c == "red"`, with 5% noise. Weights are 1 or 2.
pub fn random_mixed(n: usize, seed: u64) -> Vec<Instance> {
    const PALETTE: [&str; 4] = ["red", "green", "blue", "gray"];
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let a: f64 = rng.gen_range(0.0..10.0);
            let b: f64 = rng.gen_range(0.0..10.0);
            let c = PALETTE[rng.gen_range(0..PALETTE.len())];
            let mut hi = a + b > 10.0 || c == "red";
            if rng.gen_bool(0.05) {
                hi = !hi;
            }
            let mut instance = Instance::new(if hi { "hi" } else { "lo" })
                .with("a", a)
                .with("b", b)
                .with("c", c)
                .weighted(if rng.gen_bool(0.25) { 2.0 } else { 1.0 });
            if rng.gen_bool(0.5) {
                instance = instance.with("d", rng.gen_range(-5..5));
            }
            instance
        })
        .collect()
}

// =============================================================================
// Invariant checks
// =============================================================================

/// Sum of leaf counts below `id`.
pub fn subtree_counts(tree: &Tree, id: NodeId) -> ClassificationCounter {
    match tree.node(id) {
        Node::Leaf(leaf) => leaf.counts().clone(),
        node => match node.children() {
            Some((t, f)) => subtree_counts(tree, t).add(&subtree_counts(tree, f)),
            None => ClassificationCounter::new(),
        },
    }
}

/// Every leaf's counts equal the histogram of exactly the `rows` routed to it.
///
/// Implies the partition invariant at every branch: a branch's subtree
/// counts are the sum of its children's.
pub fn assert_counts_match_routing(
    tree: &Tree,
    data: &[Instance],
    rows: impl IntoIterator<Item = usize>,
) {
    let mut routed: BTreeMap<NodeId, Vec<&Instance>> = BTreeMap::new();
    for row in rows {
        let instance = &data[row];
        routed
            .entry(tree.leaf_for(instance.attributes()))
            .or_default()
            .push(instance);
    }

    for (id, leaf) in tree.leaves() {
        let expected = routed
            .get(&id)
            .map(|instances| ClassificationCounter::count_all(instances.iter().copied()))
            .unwrap_or_default();
        assert!(
            abs_diff_eq!(leaf.counts(), &expected, epsilon = 1e-9),
            "leaf {id}: counts {} but routed instances give {expected}",
            leaf.counts()
        );
    }
}

/// In an updatable tree, every leaf's recorded rows are exactly the rows
/// routed to it.
pub fn assert_rows_match_routing(
    tree: &Tree,
    data: &[Instance],
    rows: impl IntoIterator<Item = usize>,
) {
    let mut routed: BTreeMap<NodeId, Vec<u32>> = BTreeMap::new();
    for row in rows {
        routed
            .entry(tree.leaf_for(data[row].attributes()))
            .or_default()
            .push(row as u32);
    }

    for (id, leaf) in tree.leaves() {
        let mut recorded = leaf.rows().map(<[u32]>::to_vec).unwrap_or_default();
        recorded.sort_unstable();
        let mut expected = routed.remove(&id).unwrap_or_default();
        expected.sort_unstable();
        assert_eq!(recorded, expected, "leaf {id}: recorded rows differ from routing");
    }
}

/// No node is deeper than `max_depth`, and depths follow the structure.
pub fn assert_depth_bound(tree: &Tree, max_depth: u32) {
    if let Err(err) = tree.validate() {
        panic!("invalid tree: {err}");
    }
    assert!(
        tree.max_depth() <= max_depth,
        "max depth {} exceeds {max_depth}",
        tree.max_depth()
    );
}

/// Predicted labels for `data`, in order.
pub fn classify_all(tree: &Tree, data: &[Instance]) -> Vec<Option<Value>> {
    data.iter()
        .map(|instance| tree.classify(instance.attributes()).cloned())
        .collect()
}

/// Weighted share of `data` whose label the tree predicts.
pub fn accuracy(tree: &Tree, data: &[Instance]) -> f64 {
    let (hit, total) = data.iter().fold((0.0, 0.0), |(hit, total), instance| {
        let correct = tree.classify(instance.attributes()) == Some(instance.label());
        let w = instance.weight();
        (if correct { hit + w } else { hit }, total + w)
    });
    if total > 0.0 {
        hit / total
    } else {
        0.0
    }
}
