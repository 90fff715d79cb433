//! Arena tree storage, prediction and structural validation.
//!
//! This module provides:
//! - [`Tree`]: arena of [`Node`]s reachable from a single root
//! - [`TreeMode`]: whether leaves carry row indices for later updates
//! - [`TreeValidationError`]: structural validation errors

use std::fmt;

use crate::data::{Attributes, Value};

use super::counter::ClassificationCounter;
use super::node::{Leaf, Node, NodeId, NO_CHILD};

// ============================================================================
// TreeMode
// ============================================================================

/// Lifecycle state of a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeMode {
    /// Built without row tracking. Cannot be updated.
    Static,
    /// Leaves keep their row indices; `update` and `strip` are allowed.
    Updatable,
    /// Was updatable, row indices have been dropped. Cannot be updated.
    Stripped,
}

// ============================================================================
// TreeValidationError
// ============================================================================

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,
    #[error("node {node}: {side} child {child} out of bounds ({n_nodes} nodes)")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },
    #[error("node {node} references itself as a child")]
    SelfLoop { node: NodeId },
    #[error("node {node} reached by more than one path")]
    DuplicateVisit { node: NodeId },
    #[error("cycle detected at node {node}")]
    CycleDetected { node: NodeId },
    #[error("node {node} is not reachable from the root")]
    UnreachableNode { node: NodeId },
    #[error("node {node}: parent link {found:?}, expected {expected:?}")]
    ParentMismatch {
        node: NodeId,
        expected: Option<NodeId>,
        found: Option<NodeId>,
    },
    #[error("node {node}: depth {found}, expected {expected}")]
    DepthMismatch {
        node: NodeId,
        expected: u32,
        found: u32,
    },
    #[error("leaf {node} has no rows in an updatable tree")]
    MissingRows { node: NodeId },
    #[error("leaf {node} keeps rows in a {mode:?} tree")]
    UnexpectedRows { node: NodeId, mode: TreeMode },
}

// ============================================================================
// Tree
// ============================================================================

/// A built decision tree.
///
/// Nodes are stored in an arena and addressed by [`NodeId`]. After every
/// public operation each slot is reachable from [`Tree::root`].
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    mode: TreeMode,
}

impl Tree {
    /// An empty arena; the builder fills it and sets the root.
    pub(crate) fn empty(mode: TreeMode) -> Self {
        Self {
            nodes: Vec::new(),
            root: NO_CHILD,
            mode,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn mode(&self) -> TreeMode {
        self.mode
    }

    #[inline]
    pub fn is_updatable(&self) -> bool {
        self.mode == TreeMode::Updatable
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// All leaves, in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeId, &Leaf)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.as_leaf().map(|leaf| (i as NodeId, leaf)))
    }

    pub fn n_leaves(&self) -> usize {
        self.leaves().count()
    }

    /// Depth of the deepest leaf.
    pub fn max_depth(&self) -> u32 {
        self.leaves().map(|(_, leaf)| leaf.depth).max().unwrap_or(0)
    }

    /// Leaf depth averaged by leaf weight.
    pub fn mean_depth(&self) -> f64 {
        let (weighted, total) = self.leaves().fold((0.0, 0.0), |(d, w), (_, leaf)| {
            let weight = leaf.counts.total_weight();
            (d + weight * leaf.depth as f64, w + weight)
        });
        if total > 0.0 {
            weighted / total
        } else {
            0.0
        }
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// The leaf an attribute mapping is routed to.
    pub fn leaf_for(&self, attributes: &Attributes) -> NodeId {
        let mut id = self.root;
        while let Some(next) = self.node(id).child_for(attributes) {
            id = next;
        }
        id
    }

    /// Label distribution of the leaf `attributes` is routed to.
    pub fn predict(&self, attributes: &Attributes) -> &ClassificationCounter {
        let leaf = self.leaf_for(attributes);
        match self.node(leaf) {
            Node::Leaf(leaf) => &leaf.counts,
            // leaf_for only stops at leaves
            _ => unreachable!(),
        }
    }

    /// Most popular label at the leaf, `None` for an empty leaf.
    pub fn classify(&self, attributes: &Attributes) -> Option<&Value> {
        self.predict(attributes).most_popular().map(|(label, _)| label)
    }

    /// Share of leaf weight carried by `label`.
    pub fn probability(&self, attributes: &Attributes, label: &Value) -> f64 {
        self.predict(attributes).probability(label)
    }

    // =========================================================================
    // Arena mutation (crate-internal)
    // =========================================================================

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub(crate) fn set_mode(&mut self, mode: TreeMode) {
        self.mode = mode;
    }

    /// Hang `new` where `old` was: under `parent`, or as the root.
    pub(crate) fn replace_subtree(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        match parent {
            Some(p) => {
                let replaced = self.node_mut(p).replace_child(old, new);
                debug_assert!(replaced, "node {old} is not a child of {p}");
            }
            None => self.root = new,
        }
        self.node_mut(new).set_parent(parent);
    }

    /// Row indices recorded in the leaves, in arena order.
    pub(crate) fn recorded_rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.leaves()
            .filter_map(|(_, leaf)| leaf.rows.as_ref())
            .flat_map(|rows| rows.iter().copied())
    }

    /// Drop every leaf's row indices.
    pub(crate) fn drop_rows(&mut self) {
        for node in &mut self.nodes {
            if let Some(leaf) = node.as_leaf_mut() {
                leaf.rows = None;
            }
        }
    }

    /// Renumber reachable nodes in pre-order and drop detached ones.
    pub(crate) fn compact(&mut self) {
        let mut old: Vec<Option<Node>> = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(Some)
            .collect();

        let mut remap = vec![NO_CHILD; old.len()];
        let mut order = Vec::with_capacity(old.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            remap[id as usize] = order.len() as NodeId;
            order.push(id);
            if let Some((t, f)) = old[id as usize].as_ref().and_then(Node::children) {
                stack.push(f);
                stack.push(t);
            }
        }

        let mut nodes = Vec::with_capacity(order.len());
        for id in order {
            if let Some(mut node) = old[id as usize].take() {
                node.remap(|i| remap[i as usize]);
                nodes.push(node);
            }
        }
        self.nodes = nodes;
        self.root = 0;
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Validate structural invariants: a strict binary tree rooted at
    /// [`Tree::root`], consistent parent links and depths, every slot
    /// reachable, and leaf rows present exactly in updatable mode.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        if self.root as usize >= n_nodes {
            return Err(TreeValidationError::ChildOutOfBounds {
                node: self.root,
                side: "root",
                child: self.root,
                n_nodes,
            });
        }

        // 0 = unvisited, 1 = visiting, 2 = done
        let mut color = vec![0u8; n_nodes];
        // (node, expected parent, expected depth, phase)
        let mut stack: Vec<(NodeId, Option<NodeId>, u32, u8)> = vec![(self.root, None, 0, 0)];

        while let Some((id, parent, depth, phase)) = stack.pop() {
            let idx = id as usize;
            if phase == 1 {
                color[idx] = 2;
                continue;
            }
            match color[idx] {
                0 => {}
                1 => return Err(TreeValidationError::CycleDetected { node: id }),
                _ => return Err(TreeValidationError::DuplicateVisit { node: id }),
            }
            color[idx] = 1;
            stack.push((id, parent, depth, 1));

            let node = self.node(id);
            if node.parent() != parent {
                return Err(TreeValidationError::ParentMismatch {
                    node: id,
                    expected: parent,
                    found: node.parent(),
                });
            }
            if node.depth() != depth {
                return Err(TreeValidationError::DepthMismatch {
                    node: id,
                    expected: depth,
                    found: node.depth(),
                });
            }

            match node {
                Node::Leaf(leaf) => match (self.mode, leaf.rows.is_some()) {
                    (TreeMode::Updatable, false) => {
                        return Err(TreeValidationError::MissingRows { node: id })
                    }
                    (TreeMode::Static | TreeMode::Stripped, true) => {
                        return Err(TreeValidationError::UnexpectedRows {
                            node: id,
                            mode: self.mode,
                        })
                    }
                    _ => {}
                },
                _ => {
                    let (t, f) = node.children().unwrap_or((NO_CHILD, NO_CHILD));
                    for (side, child) in [("false", f), ("true", t)] {
                        if child == id {
                            return Err(TreeValidationError::SelfLoop { node: id });
                        }
                        if child as usize >= n_nodes {
                            return Err(TreeValidationError::ChildOutOfBounds {
                                node: id,
                                side,
                                child,
                                n_nodes,
                            });
                        }
                        stack.push((child, Some(id), depth + 1, 0));
                    }
                }
            }
        }

        if let Some(i) = color.iter().position(|&c| c == 0) {
            return Err(TreeValidationError::UnreachableNode { node: i as NodeId });
        }
        Ok(())
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, prefix: &str) -> fmt::Result {
        let indent = "  ".repeat(self.node(id).depth() as usize);
        match self.node(id) {
            Node::Leaf(leaf) => writeln!(f, "{indent}{prefix}{}", leaf.counts),
            Node::NumericBranch(b) => {
                writeln!(f, "{indent}{prefix}{} > {}", b.attribute(), b.threshold())?;
                self.fmt_children(f, b.true_child(), b.false_child())
            }
            Node::CategoricalBranch(b) => {
                let values: Vec<String> = b.in_set().iter().map(ToString::to_string).collect();
                writeln!(f, "{indent}{prefix}{} in [{}]", b.attribute(), values.join(", "))?;
                self.fmt_children(f, b.true_child(), b.false_child())
            }
        }
    }

    fn fmt_children(&self, f: &mut fmt::Formatter<'_>, t: NodeId, fc: NodeId) -> fmt::Result {
        self.fmt_node(f, t, "T: ")?;
        self.fmt_node(f, fc, "F: ")
    }
}

/// Indented dump, one node per line.
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return writeln!(f, "<empty>");
        }
        self.fmt_node(f, self.root, "")
    }
}
