//! Tree node types.
//!
//! Nodes live in the [`Tree`](super::Tree) arena and refer to each other by
//! [`NodeId`]. A branch owns its two children through the arena; the `parent`
//! link is a plain index used by the update path to walk upwards.

use std::collections::BTreeSet;

use crate::data::{Attributes, Value};

use super::counter::ClassificationCounter;

/// Index of a node in its tree's arena.
pub type NodeId = u32;

/// Sentinel for a child slot that has not been filled yet.
pub const NO_CHILD: NodeId = u32::MAX;

// =============================================================================
// Branch tests
// =============================================================================

/// The in/out predicate a branch applies to its attribute's value.
pub trait BranchTest {
    /// `true` routes to the true child. `value` is `None` when the attribute
    /// is missing.
    fn decide(&self, value: Option<&Value>) -> bool;
}

/// `value > threshold`. Missing and non-numeric values read as `0.0`.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericTest {
    pub threshold: f64,
}

impl BranchTest for NumericTest {
    #[inline]
    fn decide(&self, value: Option<&Value>) -> bool {
        value.and_then(Value::as_number).unwrap_or(0.0) > self.threshold
    }
}

/// `value ∈ in_set`. A missing value is never in the set.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoricalTest {
    pub in_set: BTreeSet<Value>,
}

impl BranchTest for CategoricalTest {
    #[inline]
    fn decide(&self, value: Option<&Value>) -> bool {
        value.is_some_and(|v| self.in_set.contains(v))
    }
}

// =============================================================================
// Branch / Leaf
// =============================================================================

/// Internal node testing one attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch<T> {
    pub(crate) parent: Option<NodeId>,
    pub(crate) depth: u32,
    pub(crate) attribute: String,
    pub(crate) test: T,
    pub(crate) true_child: NodeId,
    pub(crate) false_child: NodeId,
}

pub type NumericBranch = Branch<NumericTest>;
pub type CategoricalBranch = Branch<CategoricalTest>;

impl<T: BranchTest> Branch<T> {
    /// A branch whose children are not allocated yet.
    pub(crate) fn new(parent: Option<NodeId>, depth: u32, attribute: String, test: T) -> Self {
        Self {
            parent,
            depth,
            attribute,
            test,
            true_child: NO_CHILD,
            false_child: NO_CHILD,
        }
    }

    /// Apply the test to an attribute mapping.
    #[inline]
    pub fn decide(&self, attributes: &Attributes) -> bool {
        self.test.decide(attributes.get(&self.attribute))
    }

    /// The child an attribute mapping is routed to.
    #[inline]
    pub fn child_for(&self, attributes: &Attributes) -> NodeId {
        if self.decide(attributes) {
            self.true_child
        } else {
            self.false_child
        }
    }

    #[inline]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[inline]
    pub fn test(&self) -> &T {
        &self.test
    }

    #[inline]
    pub fn true_child(&self) -> NodeId {
        self.true_child
    }

    #[inline]
    pub fn false_child(&self) -> NodeId {
        self.false_child
    }
}

impl NumericBranch {
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.test.threshold
    }
}

impl CategoricalBranch {
    #[inline]
    pub fn in_set(&self) -> &BTreeSet<Value> {
        &self.test.in_set
    }
}

/// Terminal node holding the label distribution of the rows routed to it.
///
/// An updatable leaf also keeps the row indices of those instances so it can
/// be re-split later; a plain leaf keeps the counter only.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub(crate) parent: Option<NodeId>,
    pub(crate) depth: u32,
    pub(crate) counts: ClassificationCounter,
    pub(crate) rows: Option<Vec<u32>>,
}

impl Leaf {
    #[inline]
    pub fn counts(&self) -> &ClassificationCounter {
        &self.counts
    }

    /// Recorded row indices, for updatable leaves.
    #[inline]
    pub fn rows(&self) -> Option<&[u32]> {
        self.rows.as_deref()
    }

    #[inline]
    pub fn is_updatable(&self) -> bool {
        self.rows.is_some()
    }
}

// =============================================================================
// Node
// =============================================================================

/// A tree node: a leaf or one of the two branch kinds.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Leaf(Leaf),
    NumericBranch(NumericBranch),
    CategoricalBranch(CategoricalBranch),
}

impl Node {
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Leaf(leaf) => leaf.parent,
            Node::NumericBranch(branch) => branch.parent,
            Node::CategoricalBranch(branch) => branch.parent,
        }
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        match self {
            Node::Leaf(leaf) => leaf.depth,
            Node::NumericBranch(branch) => branch.depth,
            Node::CategoricalBranch(branch) => branch.depth,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    #[inline]
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn as_leaf_mut(&mut self) -> Option<&mut Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// `(true_child, false_child)` for branches.
    #[inline]
    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self {
            Node::Leaf(_) => None,
            Node::NumericBranch(branch) => Some((branch.true_child, branch.false_child)),
            Node::CategoricalBranch(branch) => Some((branch.true_child, branch.false_child)),
        }
    }

    /// Tested attribute, for branches.
    #[inline]
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Node::Leaf(_) => None,
            Node::NumericBranch(branch) => Some(branch.attribute()),
            Node::CategoricalBranch(branch) => Some(branch.attribute()),
        }
    }

    /// Next node on the routing path, `None` at a leaf.
    #[inline]
    pub fn child_for(&self, attributes: &Attributes) -> Option<NodeId> {
        match self {
            Node::Leaf(_) => None,
            Node::NumericBranch(branch) => Some(branch.child_for(attributes)),
            Node::CategoricalBranch(branch) => Some(branch.child_for(attributes)),
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        match self {
            Node::Leaf(leaf) => leaf.parent = parent,
            Node::NumericBranch(branch) => branch.parent = parent,
            Node::CategoricalBranch(branch) => branch.parent = parent,
        }
    }

    /// Point the child slot currently holding `old` at `new`.
    ///
    /// Returns `false` if `old` is not a child of this node.
    pub(crate) fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let (t, f) = match self {
            Node::Leaf(_) => return false,
            Node::NumericBranch(b) => (&mut b.true_child, &mut b.false_child),
            Node::CategoricalBranch(b) => (&mut b.true_child, &mut b.false_child),
        };
        if *t == old {
            *t = new;
            true
        } else if *f == old {
            *f = new;
            true
        } else {
            false
        }
    }

    pub(crate) fn set_children(&mut self, true_child: NodeId, false_child: NodeId) {
        match self {
            Node::Leaf(_) => {}
            Node::NumericBranch(b) => {
                b.true_child = true_child;
                b.false_child = false_child;
            }
            Node::CategoricalBranch(b) => {
                b.true_child = true_child;
                b.false_child = false_child;
            }
        }
    }

    /// Rewrite every id this node stores through `map`.
    pub(crate) fn remap(&mut self, map: impl Fn(NodeId) -> NodeId) {
        let parent = self.parent().map(&map);
        self.set_parent(parent);
        if let Some((t, f)) = self.children() {
            self.set_children(map(t), map(f));
        }
    }
}
