//! Incremental update and stripping of built trees.
//!
//! An updatable tree keeps, in every leaf, the row indices of the training
//! instances routed there. [`TreeBuilder::update`] routes new rows into the
//! existing leaves and can then re-grow the affected parts of the tree from
//! the recorded rows. [`TreeBuilder::strip`] drops the rows once no further
//! updates are expected.

use std::collections::HashSet;

use crate::data::Instance;
use crate::repr::{ClassificationCounter, NodeId, Tree, TreeMode};
use crate::utils::run_with_threads;

use super::builder::{check_row_count, check_weight, Grower, TreeBuilder};
use super::error::TreeError;
use super::logger::{TrainingLogger, UpdateStats};
use super::scorer::Scorer;

impl<S: Scorer> TreeBuilder<S> {
    /// Add `new_rows` of `training_data` to an updatable tree.
    ///
    /// `training_data` is the full training set so far: rows recorded when
    /// the tree was built (or last updated) must still index into it.
    ///
    /// Each new row is routed from the root to a leaf, which records the row
    /// and folds the instance into its counts. With `split_nodes`, the tree
    /// is then walked depth-first: a branch whose children are both leaves is
    /// rebuilt from their combined rows; otherwise each leaf child is rebuilt
    /// from its own rows. A root that is a leaf is left as is.
    ///
    /// # Errors
    ///
    /// All checks happen before the tree is modified:
    /// - [`TreeError::NotUpdatable`] unless the tree is in
    ///   [`TreeMode::Updatable`]
    /// - [`TreeError::RowOutOfRange`] for a new or recorded row outside
    ///   `training_data`
    /// - [`TreeError::TooManyRows`] if row indices would not fit in `u32`
    /// - [`TreeError::InvalidWeight`] for a new row with a negative or
    ///   non-finite weight
    /// - [`TreeError::DuplicateRow`] for a new row the tree already holds,
    ///   or one listed twice
    pub fn update(
        &self,
        tree: &mut Tree,
        training_data: &[Instance],
        new_rows: impl IntoIterator<Item = usize>,
        split_nodes: bool,
    ) -> Result<(), TreeError> {
        if !tree.is_updatable() {
            return Err(TreeError::NotUpdatable);
        }
        let len = training_data.len();
        check_row_count(len)?;

        let mut recorded: HashSet<u32> = tree.recorded_rows().collect();
        if let Some(&max) = recorded.iter().max() {
            if max as usize >= len {
                return Err(TreeError::RowOutOfRange {
                    row: max as usize,
                    len,
                });
            }
        }

        let new_rows: Vec<usize> = new_rows.into_iter().collect();
        for &row in &new_rows {
            if row >= len {
                return Err(TreeError::RowOutOfRange { row, len });
            }
            check_weight(training_data, row)?;
            if !recorded.insert(row as u32) {
                return Err(TreeError::DuplicateRow { row });
            }
        }

        let mut logger = TrainingLogger::new(self.config.verbosity);
        logger.start_update(new_rows.len(), split_nodes);
        let mut stats = UpdateStats::default();

        for &row in &new_rows {
            let instance = &training_data[row];
            let id = tree.leaf_for(instance.attributes());
            if let Some(leaf) = tree.node_mut(id).as_leaf_mut() {
                leaf.counts = leaf.counts.add(&ClassificationCounter::of(instance));
                if let Some(rows) = leaf.rows.as_mut() {
                    rows.push(row as u32);
                }
                stats.routed += 1;
            }
        }

        if split_nodes {
            run_with_threads(self.config.n_threads, |parallelism| {
                let mut grower = Grower::new(
                    training_data,
                    &self.config,
                    &self.scorer,
                    parallelism,
                    &logger,
                    true,
                );
                resplit(&mut grower, tree, &mut stats);
            });
            tree.compact();
        }

        logger.finish_update(tree, &stats);
        Ok(())
    }

    /// Drop the row indices from every leaf of an updatable tree.
    ///
    /// Counts and predictions are unchanged. Stripping an already stripped
    /// tree is a no-op.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotUpdatable`] if the tree was built without `updatable`.
    pub fn strip(&self, tree: &mut Tree) -> Result<(), TreeError> {
        match tree.mode() {
            TreeMode::Static => Err(TreeError::NotUpdatable),
            TreeMode::Stripped => Ok(()),
            TreeMode::Updatable => {
                tree.drop_rows();
                tree.set_mode(TreeMode::Stripped);
                TrainingLogger::new(self.config.verbosity).log_strip(tree.n_leaves());
                Ok(())
            }
        }
    }
}

/// Take the recorded rows out of a leaf.
fn take_rows(tree: &mut Tree, id: NodeId) -> Vec<u32> {
    tree.node_mut(id)
        .as_leaf_mut()
        .and_then(|leaf| leaf.rows.take())
        .unwrap_or_default()
}

/// Depth-first re-split over the nodes present when the walk starts.
///
/// Replaced subtrees stay in the arena, detached, until the caller compacts.
fn resplit(grower: &mut Grower<'_>, tree: &mut Tree, stats: &mut UpdateStats) {
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let Some((true_child, false_child)) = tree.node(id).children() else {
            continue;
        };

        if tree.node(true_child).is_leaf() && tree.node(false_child).is_leaf() {
            let mut rows = take_rows(tree, true_child);
            rows.extend(take_rows(tree, false_child));
            let parent = tree.node(id).parent();
            let depth = tree.node(id).depth();
            let new = grower.regrow(tree, rows, parent, depth);
            tree.replace_subtree(parent, id, new);
            stats.combined += 1;
            continue;
        }

        for child in [true_child, false_child] {
            if tree.node(child).is_leaf() {
                let rows = take_rows(tree, child);
                let depth = tree.node(child).depth();
                let new = grower.regrow(tree, rows, Some(id), depth);
                tree.replace_subtree(Some(id), child, new);
                stats.resplit += 1;
            }
        }
        // true side first
        stack.push(false_child);
        stack.push(true_child);
    }
}
