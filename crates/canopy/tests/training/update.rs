//! Incremental update and strip integration tests.

use std::collections::BTreeSet;

use canopy::repr::{ClassificationCounter, NodeId};
use canopy::testing::{
    assert_counts_match_routing, assert_rows_match_routing, classify_all, random_mixed,
    separable_line, subtree_counts,
};
use canopy::training::MseScorer;
use canopy::{Instance, Tree, TreeBuilder, TreeConfig, TreeError, TreeMode};

fn updatable(max_depth: Option<u32>) -> TreeBuilder {
    let config = TreeConfig::builder()
        .updatable(true)
        .maybe_max_depth(max_depth)
        .build()
        .unwrap();
    TreeBuilder::new(MseScorer::default(), config)
}

fn majority_weight(counts: &ClassificationCounter) -> f64 {
    counts.most_popular().map_or(0.0, |(_, w)| w)
}

/// Lower bound on the leaves' total majority weight after a resplit.
///
/// Sibling leaves are rebuilt together, so they contribute the majority of
/// their combined counts; every other leaf contributes its own.
fn resplit_floor(tree: &Tree) -> f64 {
    let mut combined: BTreeSet<NodeId> = BTreeSet::new();
    let mut floor = 0.0;
    for (id, leaf) in tree.leaves() {
        let Some(parent) = tree.node(id).parent() else {
            floor += majority_weight(leaf.counts());
            continue;
        };
        let (t, f) = tree.node(parent).children().unwrap();
        if tree.node(t).is_leaf() && tree.node(f).is_leaf() {
            if combined.insert(parent) {
                floor += majority_weight(&subtree_counts(tree, parent));
            }
        } else {
            floor += majority_weight(leaf.counts());
        }
    }
    floor
}

#[test]
fn update_without_split_routes_new_rows() {
    let data = random_mixed(25, 7);
    let builder = updatable(None);
    let mut tree = builder.build(&data[..20]).unwrap();
    let shape: Vec<_> = tree.nodes().iter().map(|n| n.children()).collect();

    builder.update(&mut tree, &data, 20..25, false).unwrap();

    let after: Vec<_> = tree.nodes().iter().map(|n| n.children()).collect();
    assert_eq!(shape, after, "structure must not change without split_nodes");
    tree.validate().unwrap();
    assert_counts_match_routing(&tree, &data, 0..25);
    assert_rows_match_routing(&tree, &data, 0..25);
    approx::assert_abs_diff_eq!(
        subtree_counts(&tree, tree.root()),
        ClassificationCounter::count_all(&data),
        epsilon = 1e-9
    );
}

#[test]
fn update_with_split_keeps_partition() {
    let data = random_mixed(300, 13);
    let builder = updatable(None);
    let mut tree = builder.build(&data[..200]).unwrap();

    builder.update(&mut tree, &data, 200..300, true).unwrap();

    assert_eq!(tree.mode(), TreeMode::Updatable);
    tree.validate().unwrap();
    assert_counts_match_routing(&tree, &data, 0..300);
    assert_rows_match_routing(&tree, &data, 0..300);
}

#[test]
fn repeated_updates_keep_partition() {
    let data = random_mixed(240, 4);
    let builder = updatable(Some(5));
    let mut tree = builder.build(&data[..60]).unwrap();

    for (i, batch) in [60..120, 120..180, 180..240].into_iter().enumerate() {
        let end = batch.end;
        builder.update(&mut tree, &data[..end], batch, i % 2 == 0).unwrap();
        tree.validate().unwrap();
        assert!(tree.max_depth() <= 5);
        assert_counts_match_routing(&tree, &data, 0..end);
        assert_rows_match_routing(&tree, &data, 0..end);
    }
}

#[test]
fn resplit_refines_leaves() {
    let data = random_mixed(300, 29);
    let builder = updatable(Some(4));
    let mut routed = builder.build(&data[..150]).unwrap();
    builder.update(&mut routed, &data, 150..300, false).unwrap();

    let mut refined = builder.build(&data[..150]).unwrap();
    builder.update(&mut refined, &data, 150..300, true).unwrap();

    let purity: f64 = refined
        .leaves()
        .map(|(_, leaf)| majority_weight(leaf.counts()))
        .sum();
    assert!(purity >= resplit_floor(&routed) - 1e-9);

    // Rows in a leaf that was rebuilt on its own land at least as deep.
    for instance in &data {
        let old = routed.leaf_for(instance.attributes());
        let Some(parent) = routed.node(old).parent() else {
            continue;
        };
        let (t, f) = routed.node(parent).children().unwrap();
        if routed.node(t).is_leaf() && routed.node(f).is_leaf() {
            continue;
        }
        let new = refined.leaf_for(instance.attributes());
        assert!(refined.node(new).depth() >= routed.node(old).depth());
    }
}

#[test]
fn strip_keeps_predictions() {
    let data = random_mixed(120, 31);
    let builder = updatable(None);
    let mut tree = builder.build(&data[..100]).unwrap();
    builder.update(&mut tree, &data, 100..120, true).unwrap();
    let before = classify_all(&tree, &data);

    builder.strip(&mut tree).unwrap();
    assert_eq!(tree.mode(), TreeMode::Stripped);
    assert!(tree.leaves().all(|(_, leaf)| leaf.rows().is_none()));
    assert_eq!(classify_all(&tree, &data), before);

    let once = tree.clone();
    builder.strip(&mut tree).unwrap();
    assert_eq!(tree, once);
    tree.validate().unwrap();
}

#[test]
fn stripped_tree_rejects_update() {
    let data = separable_line(8, 5);
    let builder = updatable(None);
    let mut tree = builder.build(&data).unwrap();
    builder.strip(&mut tree).unwrap();
    assert_eq!(
        builder.update(&mut tree, &data, [0], true),
        Err(TreeError::NotUpdatable)
    );
}

#[test]
fn invalid_new_weight_is_rejected_before_routing() {
    let mut data = separable_line(8, 5);
    let builder = updatable(None);
    let mut tree = builder.build(&data).unwrap();
    let before = tree.clone();

    data.push(Instance::new(true).with("x", 9).weighted(-1.0));
    let result = builder.update(&mut tree, &data, [8], false);
    assert!(matches!(result, Err(TreeError::InvalidWeight { row: 8, .. })));
    assert_eq!(tree, before);
}

#[test]
fn passing_the_whole_range_again_is_rejected() {
    let data = random_mixed(25, 7);
    let builder = updatable(None);
    let mut tree = builder.build(&data[..20]).unwrap();
    let before = tree.clone();

    let result = builder.update(&mut tree, &data, 0..25, true);
    assert_eq!(result, Err(TreeError::DuplicateRow { row: 0 }));
    assert_eq!(tree, before);

    builder.update(&mut tree, &data, 20..25, false).unwrap();
    assert_counts_match_routing(&tree, &data, 0..25);
    assert_rows_match_routing(&tree, &data, 0..25);
}

#[test]
fn empty_update_without_split_is_noop() {
    let data = random_mixed(50, 9);
    let builder = updatable(None);
    let mut tree = builder.build(&data).unwrap();
    let before = tree.clone();
    builder.update(&mut tree, &data, [], false).unwrap();
    assert_eq!(tree, before);
}

#[test]
fn update_then_build_agree_on_counts() {
    // Leaf counts only depend on routing, so the root histogram after an
    // update equals that of a fresh build over the same rows.
    let data = random_mixed(80, 17);
    let builder = updatable(None);
    let mut tree = builder.build(&data[..40]).unwrap();
    builder.update(&mut tree, &data, 40..80, true).unwrap();
    let fresh = builder.build(&data).unwrap();

    approx::assert_abs_diff_eq!(
        subtree_counts(&tree, tree.root()),
        subtree_counts(&fresh, fresh.root()),
        epsilon = 1e-9
    );
}
