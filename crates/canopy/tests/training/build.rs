//! Tree induction integration tests.
//!
//! Focused on observable tree shape and structural invariants.

use std::collections::BTreeSet;

use approx::assert_abs_diff_eq;
use rstest::rstest;

use canopy::repr::{ClassificationCounter, Node};
use canopy::testing::{
    accuracy, assert_counts_match_routing, assert_depth_bound, classify_all, colors,
    random_mixed, separable_line, subtree_counts,
};
use canopy::training::{GiniImpurityScorer, InformationGainScorer, MseScorer, Verbosity};
use canopy::{Instance, TreeBuilder, TreeConfig, TreeError, Value};

fn builder(config: TreeConfig) -> TreeBuilder {
    TreeBuilder::new(MseScorer::default(), config)
}

fn leaf_is_pure(node: &Node) -> bool {
    node.as_leaf().is_some_and(|leaf| leaf.counts().n_labels() == 1)
}

#[test]
fn separable_numeric_attribute_gives_single_branch() {
    let data = separable_line(8, 5);
    let tree = TreeBuilder::default().build(&data).unwrap();

    let Node::NumericBranch(branch) = tree.node(tree.root()) else {
        panic!("expected a numeric branch at the root:\n{tree}");
    };
    assert_eq!(branch.attribute(), "x");
    assert_eq!(branch.threshold(), 5.0);

    let true_leaf = tree.node(branch.true_child());
    let false_leaf = tree.node(branch.false_child());
    assert!(leaf_is_pure(true_leaf));
    assert!(leaf_is_pure(false_leaf));
    assert_eq!(true_leaf.as_leaf().unwrap().counts().count(&Value::from(true)), 3.0);
    assert_eq!(false_leaf.as_leaf().unwrap().counts().count(&Value::from(false)), 5.0);
    assert_eq!(tree.n_nodes(), 3);
}

#[test]
fn separable_categorical_attribute_isolates_value() {
    let data = colors(6, &["red", "green", "blue"]);
    let tree = TreeBuilder::default().build(&data).unwrap();

    let Node::CategoricalBranch(branch) = tree.node(tree.root()) else {
        panic!("expected a categorical branch at the root:\n{tree}");
    };
    assert_eq!(branch.attribute(), "color");
    assert_eq!(branch.in_set(), &BTreeSet::from([Value::from("red")]));
    assert!(leaf_is_pure(tree.node(branch.true_child())));
    assert!(leaf_is_pure(tree.node(branch.false_child())));
}

#[test]
fn too_few_instances_for_any_split_gives_single_leaf() {
    let data = separable_line(8, 5);
    let config = TreeConfig::builder().min_leaf_instances(10).build().unwrap();
    let tree = builder(config).build(&data).unwrap();

    assert_eq!(tree.n_nodes(), 1);
    let leaf = tree.node(tree.root()).as_leaf().unwrap();
    assert_eq!(leaf.counts(), &ClassificationCounter::count_all(&data));
}

#[test]
fn empty_training_data_is_rejected() {
    let result = TreeBuilder::default().build(&[]);
    assert_eq!(result.unwrap_err(), TreeError::EmptyTrainingData);
}

#[test]
fn non_finite_weight_is_rejected() {
    let mut data = separable_line(8, 5);
    data[2] = data[2].clone().weighted(f64::INFINITY);
    let result = TreeBuilder::default().build(&data);
    assert!(matches!(result, Err(TreeError::InvalidWeight { row: 2, .. })));
}

#[test]
fn leaf_counts_partition_training_data() {
    let data = random_mixed(300, 11);
    let tree = TreeBuilder::default().build(&data).unwrap();

    tree.validate().expect("built tree should be structurally valid");
    assert_counts_match_routing(&tree, &data, 0..data.len());
    assert_abs_diff_eq!(
        subtree_counts(&tree, tree.root()),
        ClassificationCounter::count_all(&data),
        epsilon = 1e-9
    );
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(4)]
fn max_depth_bounds_every_leaf(#[case] max_depth: u32) {
    let data = random_mixed(200, 5);
    let config = TreeConfig::builder().max_depth(max_depth).build().unwrap();
    let tree = builder(config).build(&data).unwrap();
    assert_depth_bound(&tree, max_depth);
}

#[test]
fn build_is_deterministic_for_a_seed() {
    let data = random_mixed(200, 8);
    let config = TreeConfig::builder()
        .ignore_attribute_at_node_probability(0.3)
        .reservoir_size(50)
        .seed(99)
        .build()
        .unwrap();
    let first = builder(config.clone()).build(&data).unwrap();
    let second = builder(config).build(&data).unwrap();
    assert_eq!(first, second);
    assert_eq!(classify_all(&first, &data), classify_all(&second, &data));
}

#[test]
fn thread_count_does_not_change_the_tree() {
    let data = random_mixed(250, 21);
    let trees: Vec<_> = [1, 2, 4]
        .into_iter()
        .map(|n_threads| {
            let config = TreeConfig::builder().n_threads(n_threads).build().unwrap();
            builder(config).build(&data).unwrap()
        })
        .collect();
    assert_eq!(trees[0], trees[1]);
    assert_eq!(trees[0], trees[2]);
}

#[test]
fn routing_is_deterministic() {
    let data = random_mixed(150, 2);
    let tree = TreeBuilder::default().build(&data).unwrap();
    for instance in &data {
        let first = tree.leaf_for(instance.attributes());
        let second = tree.leaf_for(instance.attributes());
        assert_eq!(first, second);
        assert!(tree.node(first).is_leaf());
    }
}

#[test]
fn learns_mixed_data() {
    let data = random_mixed(500, 42);
    let tree = TreeBuilder::default().build(&data).unwrap();
    let acc = accuracy(&tree, &data);
    assert!(acc > 0.8, "training accuracy {acc}");
}

#[test]
fn missing_attribute_routes_like_zero() {
    let mut data: Vec<Instance> = [-4, -3, -2, -1, 0, 2, 3, 4, 5]
        .into_iter()
        .map(|x| Instance::new(x > 0).with("x", x))
        .collect();
    data.push(Instance::new(false));
    let tree = TreeBuilder::default().build(&data).unwrap();

    let missing = Instance::new(false);
    let zero = Instance::new(false).with("x", 0);
    assert_eq!(
        tree.leaf_for(missing.attributes()),
        tree.leaf_for(zero.attributes())
    );
    assert_eq!(tree.classify(missing.attributes()), Some(&Value::from(false)));
}

#[rstest]
#[case::gini(TreeBuilder::new(GiniImpurityScorer, TreeConfig::default()).build(&separable_line(8, 5)))]
#[case::entropy(TreeBuilder::new(InformationGainScorer, TreeConfig::default()).build(&separable_line(8, 5)))]
fn alternative_scorers_find_the_cut(#[case] tree: Result<canopy::Tree, TreeError>) {
    let tree = tree.unwrap();
    let Node::NumericBranch(branch) = tree.node(tree.root()) else {
        panic!("expected a numeric branch at the root:\n{tree}");
    };
    assert_eq!(branch.threshold(), 5.0);
}

#[test]
fn closure_scorer_is_used() {
    // A scorer that never sees gain keeps the root a leaf.
    let never = |_: &ClassificationCounter, _: &ClassificationCounter| 0.0;
    let tree = TreeBuilder::new(never, TreeConfig::default())
        .build(&separable_line(8, 5))
        .unwrap();
    assert_eq!(tree.n_nodes(), 1);
}

#[test]
fn verbose_build_logs_without_changing_result() {
    let _ = env_logger::builder().is_test(true).try_init();
    let data = random_mixed(100, 1);
    let quiet = TreeBuilder::default().build(&data).unwrap();
    let config = TreeConfig::builder().verbosity(Verbosity::Debug).build().unwrap();
    let loud = builder(config).build(&data).unwrap();
    assert_eq!(quiet, loud);
}

#[test]
fn display_shows_every_node() {
    let tree = TreeBuilder::default().build(&separable_line(8, 5)).unwrap();
    let dump = tree.to_string();
    assert_eq!(dump.lines().count(), tree.n_nodes());
    assert!(dump.contains("x > 5"));
}
