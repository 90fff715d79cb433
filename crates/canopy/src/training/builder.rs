//! Recursive tree induction.
//!
//! [`TreeBuilder::build`] computes quantile thresholds for every numeric
//! attribute over the whole training set, then grows the tree top-down:
//!
//! 1. count the labels of the rows reaching the node
//! 2. stop at `max_depth`
//! 3. score every (non-skipped) attribute and keep the best candidate
//! 4. stop if the candidate is weak or leaves a side too small or weightless
//! 5. otherwise branch, refresh the branch attribute's thresholds for each
//!    child (numeric branches only) and recurse
//!
//! Update and strip live in [`super::update`].

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::Instance;
use crate::repr::{Branch, ClassificationCounter, Leaf, Node, NodeId, Tree, TreeMode};
use crate::utils::{run_with_threads, Parallelism};

use super::config::TreeConfig;
use super::error::TreeError;
use super::logger::TrainingLogger;
use super::scorer::{MseScorer, Scorer};
use super::split::{
    compute_split_table, find_best_split, sample_thresholds, survey_attributes, NodeView,
    SplitCandidate, SplitTable, SplitTest,
};

// =============================================================================
// TreeBuilder
// =============================================================================

/// Builds, updates and strips decision trees.
///
/// # Example
///
/// ```
/// use canopy::data::{Instance, Value};
/// use canopy::training::TreeBuilder;
///
/// let data: Vec<Instance> = (1..=8)
///     .map(|x| Instance::new(x > 5).with("x", x))
///     .collect();
///
/// let tree = TreeBuilder::default().build(&data).unwrap();
/// let probe = Instance::new(false).with("x", 7);
/// assert_eq!(tree.classify(probe.attributes()), Some(&Value::from(true)));
/// ```
#[derive(Clone, Debug)]
pub struct TreeBuilder<S = MseScorer> {
    pub(crate) scorer: S,
    pub(crate) config: TreeConfig,
}

impl Default for TreeBuilder<MseScorer> {
    fn default() -> Self {
        Self::new(MseScorer::default(), TreeConfig::default())
    }
}

impl<S: Scorer> TreeBuilder<S> {
    pub fn new(scorer: S, config: TreeConfig) -> Self {
        Self { scorer, config }
    }

    #[inline]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    #[inline]
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Grow a tree over all of `training_data`.
    ///
    /// With `config.updatable` the leaves record their row indices so the
    /// tree can later be passed to [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// - [`TreeError::EmptyTrainingData`] for an empty slice
    /// - [`TreeError::TooManyRows`] if row indices would not fit in `u32`
    /// - [`TreeError::InvalidWeight`] for a negative or non-finite weight
    pub fn build(&self, training_data: &[Instance]) -> Result<Tree, TreeError> {
        if training_data.is_empty() {
            return Err(TreeError::EmptyTrainingData);
        }
        check_row_count(training_data.len())?;
        for row in 0..training_data.len() {
            check_weight(training_data, row)?;
        }

        let mut logger = TrainingLogger::new(self.config.verbosity);
        let rows: Vec<u32> = (0..training_data.len() as u32).collect();
        let n_attributes = survey_attributes(&NodeView::new(training_data, &rows)).len();
        logger.start_build(rows.len(), n_attributes);
        if self.config.ignore_attribute_at_node_probability >= 1.0 {
            logger.warn("every attribute is ignored at every node; the tree will be a single leaf");
        }

        let mode = if self.config.updatable {
            TreeMode::Updatable
        } else {
            TreeMode::Static
        };

        let tree = run_with_threads(self.config.n_threads, |parallelism| {
            let mut grower = Grower::new(
                training_data,
                &self.config,
                &self.scorer,
                parallelism,
                &logger,
                self.config.updatable,
            );
            grower.splits = compute_split_table(
                training_data,
                &rows,
                self.config.reservoir_size,
                self.config.ordinal_test_splits,
                &mut grower.rng,
            );

            let mut tree = Tree::empty(mode);
            let root = grower.grow(&mut tree, rows, None, 0);
            tree.set_root(root);
            tree
        });

        logger.finish_build(&tree);
        Ok(tree)
    }
}

pub(crate) fn check_row_count(len: usize) -> Result<(), TreeError> {
    if len > u32::MAX as usize {
        return Err(TreeError::TooManyRows { len });
    }
    Ok(())
}

pub(crate) fn check_weight(training_data: &[Instance], row: usize) -> Result<(), TreeError> {
    let weight = training_data[row].weight();
    if !weight.is_finite() || weight < 0.0 {
        return Err(TreeError::InvalidWeight { row, weight });
    }
    Ok(())
}

// =============================================================================
// Grower
// =============================================================================

/// A chosen split with the rows it sends each way.
struct Partition {
    candidate: SplitCandidate,
    in_rows: Vec<u32>,
    out_rows: Vec<u32>,
}

/// State for one build or update call.
///
/// Owns the RNG and the current [`SplitTable`]; nodes are appended to the
/// tree passed to [`grow`](Self::grow).
pub(crate) struct Grower<'a> {
    data: &'a [Instance],
    config: &'a TreeConfig,
    scorer: &'a dyn Scorer,
    parallelism: Parallelism,
    logger: &'a TrainingLogger,
    updatable: bool,
    pub(crate) rng: Xoshiro256PlusPlus,
    pub(crate) splits: SplitTable,
}

impl<'a> Grower<'a> {
    pub(crate) fn new(
        data: &'a [Instance],
        config: &'a TreeConfig,
        scorer: &'a dyn Scorer,
        parallelism: Parallelism,
        logger: &'a TrainingLogger,
        updatable: bool,
    ) -> Self {
        Self {
            data,
            config,
            scorer,
            parallelism,
            logger,
            updatable,
            rng: Xoshiro256PlusPlus::seed_from_u64(config.seed),
            splits: SplitTable::new(),
        }
    }

    /// Grow a subtree over `rows` with thresholds recomputed from `rows`.
    pub(crate) fn regrow(
        &mut self,
        tree: &mut Tree,
        rows: Vec<u32>,
        parent: Option<NodeId>,
        depth: u32,
    ) -> NodeId {
        self.splits = compute_split_table(
            self.data,
            &rows,
            self.config.reservoir_size,
            self.config.ordinal_test_splits,
            &mut self.rng,
        );
        self.grow(tree, rows, parent, depth)
    }

    /// Grow a subtree over `rows` and return its root.
    pub(crate) fn grow(
        &mut self,
        tree: &mut Tree,
        rows: Vec<u32>,
        parent: Option<NodeId>,
        depth: u32,
    ) -> NodeId {
        let data = self.data;
        let counts = ClassificationCounter::count_all(rows.iter().map(|&r| &data[r as usize]));

        let Partition {
            candidate,
            in_rows,
            out_rows,
        } = match self.split_node(&rows, depth) {
            Some(partition) => partition,
            None => {
                return tree.push(Node::Leaf(Leaf {
                    parent,
                    depth,
                    counts,
                    rows: self.updatable.then_some(rows),
                }))
            }
        };

        self.logger.log_split(
            depth,
            &candidate.attribute,
            candidate.score,
            in_rows.len(),
            out_rows.len(),
        );

        let attribute = candidate.attribute;
        let (node, numeric) = match candidate.test {
            SplitTest::Numeric(test) => (
                Node::NumericBranch(Branch::new(parent, depth, attribute.clone(), test)),
                true,
            ),
            SplitTest::Categorical(test) => (
                Node::CategoricalBranch(Branch::new(parent, depth, attribute.clone(), test)),
                false,
            ),
        };
        let id = tree.push(node);

        let (true_child, false_child) = if numeric {
            let thresholds = self.child_thresholds(&in_rows, &attribute);
            let previous = self.splits.insert(attribute.clone(), thresholds);
            let true_child = self.grow(tree, in_rows, Some(id), depth + 1);

            let thresholds = self.child_thresholds(&out_rows, &attribute);
            self.splits.insert(attribute.clone(), thresholds);
            let false_child = self.grow(tree, out_rows, Some(id), depth + 1);

            match previous {
                Some(previous) => {
                    self.splits.insert(attribute, previous);
                }
                None => {
                    self.splits.remove(&attribute);
                }
            }
            (true_child, false_child)
        } else {
            let true_child = self.grow(tree, in_rows, Some(id), depth + 1);
            let false_child = self.grow(tree, out_rows, Some(id), depth + 1);
            (true_child, false_child)
        };

        tree.node_mut(id).set_children(true_child, false_child);
        id
    }

    fn child_thresholds(&mut self, rows: &[u32], attribute: &str) -> Vec<f64> {
        sample_thresholds(
            self.data,
            rows,
            attribute,
            self.config.reservoir_size,
            self.config.ordinal_test_splits,
            &mut self.rng,
        )
    }

    /// The split to apply at a node, or `None` if it should be a leaf.
    fn split_node(&mut self, rows: &[u32], depth: u32) -> Option<Partition> {
        if self.config.max_depth.is_some_and(|max| depth >= max) {
            return None;
        }

        let view = NodeView::new(self.data, rows);
        let skip = self.config.ignore_attribute_at_node_probability;
        let rng = &mut self.rng;
        let attributes: Vec<(String, bool)> = survey_attributes(&view)
            .into_iter()
            .filter(|_| !(skip > 0.0 && rng.gen_bool(skip)))
            .collect();

        let candidate = find_best_split(
            &view,
            attributes,
            &self.splits,
            self.config,
            self.scorer,
            self.parallelism,
        )?;
        if candidate.score < self.config.minimum_score {
            return None;
        }

        let data = self.data;
        let (in_rows, out_rows): (Vec<u32>, Vec<u32>) = rows
            .iter()
            .copied()
            .partition(|&r| candidate.test.decide(data[r as usize].attribute(&candidate.attribute)));

        let min = self.config.min_leaf_instances;
        if in_rows.len() < min || out_rows.len() < min {
            return None;
        }
        let weight = |rows: &[u32]| rows.iter().map(|&r| data[r as usize].weight()).sum::<f64>();
        if weight(&in_rows) <= 0.0 || weight(&out_rows) <= 0.0 {
            return None;
        }

        Some(Partition {
            candidate,
            in_rows,
            out_rows,
        })
    }
}
