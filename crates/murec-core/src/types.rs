//! Core block tree types
//!
//! A block tree is an owned tree of [`BlockNode`]s, each holding an
//! ordered list of named [`Slot`]s. Structural edits never mutate a tree
//! in place; they rebuild the edited path and return a fresh root
//! (see the `tree` module).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Integer value type for inputs and results.
pub type Value = i64;

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a block node.
///
/// Assigned from a process-wide counter on creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

impl BlockId {
    /// Allocate a fresh, process-unique id.
    pub fn fresh() -> Self {
        Self(NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operator kinds of the mu-recursive calculus, plus user-defined macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Zero,
    Successor,
    Projection,
    Composition,
    PrimitiveRecursion,
    Minimization,
    Custom,
}

impl BlockKind {
    /// Human-readable operator label.
    pub fn label(&self) -> &'static str {
        match self {
            BlockKind::Zero => "Zero",
            BlockKind::Successor => "Successor",
            BlockKind::Projection => "Projection",
            BlockKind::Composition => "Composition",
            BlockKind::PrimitiveRecursion => "Primitive Recursion",
            BlockKind::Minimization => "Minimization",
            BlockKind::Custom => "Custom",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a slot derives its child's arity from the parent's arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArityRule {
    /// Child arity = parent arity.
    Inherit,
    /// Child arity = n, regardless of parent (Composition's `f` slot).
    Fixed(usize),
    /// Child arity = parent arity + n, saturating at 0.
    Delta(i32),
}

impl ArityRule {
    /// Derive the child arity from the parent arity.
    pub fn apply(&self, parent_arity: usize) -> usize {
        match self {
            ArityRule::Inherit => parent_arity,
            ArityRule::Fixed(n) => *n,
            ArityRule::Delta(d) => (parent_arity as i64 + *d as i64).max(0) as usize,
        }
    }

    /// Describe the derived arity for a parent of the given arity, the
    /// way slot headers present it.
    pub fn describe(&self, parent_arity: usize) -> String {
        format!("{} inputs", self.apply(parent_arity))
    }
}

/// A named integer parameter on a node (e.g. Projection's `i`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamValue {
    pub name: String,
    pub value: Value,
}

/// A named attachment point holding at most one child.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: String,
    pub rule: ArityRule,
    pub child: Option<BlockNode>,
}

impl Slot {
    pub fn empty(name: impl Into<String>, rule: ArityRule) -> Self {
        Self {
            name: name.into(),
            rule,
            child: None,
        }
    }
}

/// One node of a block tree.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Set only on instances of a named custom-block definition.
    pub display_name: Option<String>,
    pub slots: Vec<Slot>,
    pub params: Vec<ParamValue>,
    /// Number of inputs this node is evaluated with. Derived top-down
    /// from the root's declared input count; settable only at the root.
    pub arity: usize,
    /// True for every node inside a custom definition's body.
    pub locked: bool,
}

impl BlockNode {
    /// Look up a slot by name.
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Look up a parameter value by name.
    pub fn param(&self, name: &str) -> Option<Value> {
        self.params.iter().find(|p| p.name == name).map(|p| p.value)
    }

    /// The node's display label (custom-definition name, or operator label).
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.kind.label())
    }

    /// Number of nodes in this subtree, counting this node.
    pub fn node_count(&self) -> usize {
        1 + self
            .slots
            .iter()
            .filter_map(|s| s.child.as_ref())
            .map(BlockNode::node_count)
            .sum::<usize>()
    }
}
