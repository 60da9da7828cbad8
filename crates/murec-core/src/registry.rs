//! Operator registry
//!
//! Static descriptions of every operator kind: slot templates, parameter
//! schemas, and the dynamic-slot rebuild used by Composition. The
//! registry is pure data plus pure functions; evaluation itself lives in
//! the `eval` and `step` modules.

use crate::types::{ArityRule, BlockId, BlockKind, BlockNode, ParamValue, Slot};

/// Slot template entry: name plus the arity rule its child derives from.
#[derive(Debug, Clone, Copy)]
pub struct SlotSpec {
    pub name: &'static str,
    pub rule: ArityRule,
}

/// Parameter schema entry.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: i64,
    pub min: i64,
}

/// Static description of one operator kind.
#[derive(Debug, Clone, Copy)]
pub struct OperatorSpec {
    pub kind: BlockKind,
    pub slots: &'static [SlotSpec],
    pub params: &'static [ParamSpec],
    /// Set only for kinds whose slot list depends on a parameter
    /// (Composition). Rebuilds the full slot list from the node's
    /// current parameters, with empty children.
    pub dynamic_slots: Option<fn(&BlockNode) -> Vec<Slot>>,
}

/// Slot name for the base case of primitive recursion.
pub const SLOT_BASE_CASE: &str = "Base Case";
/// Slot name for the recursive case of primitive recursion.
pub const SLOT_RECURSIVE_CASE: &str = "Recursive Case";
/// Slot name for the outer function of composition and minimization.
pub const SLOT_F: &str = "f";
/// Slot name holding a custom block's definition body.
pub const SLOT_DEFINITION: &str = "Definition";

/// Parameter name for Projection's 1-based input index.
pub const PARAM_INDEX: &str = "i";
/// Parameter name for Composition's inner-function count.
pub const PARAM_INNER_COUNT: &str = "m";

const OPERATORS: [OperatorSpec; 7] = [
    OperatorSpec {
        kind: BlockKind::Zero,
        slots: &[],
        params: &[],
        dynamic_slots: None,
    },
    OperatorSpec {
        kind: BlockKind::Successor,
        slots: &[],
        params: &[],
        dynamic_slots: None,
    },
    OperatorSpec {
        kind: BlockKind::Projection,
        slots: &[],
        params: &[ParamSpec {
            name: PARAM_INDEX,
            default: 1,
            min: 1,
        }],
        dynamic_slots: None,
    },
    OperatorSpec {
        kind: BlockKind::Composition,
        slots: &[],
        params: &[ParamSpec {
            name: PARAM_INNER_COUNT,
            default: 1,
            min: 1,
        }],
        dynamic_slots: Some(composition_slots),
    },
    OperatorSpec {
        kind: BlockKind::PrimitiveRecursion,
        slots: &[
            SlotSpec {
                name: SLOT_BASE_CASE,
                rule: ArityRule::Delta(-1),
            },
            SlotSpec {
                name: SLOT_RECURSIVE_CASE,
                rule: ArityRule::Delta(1),
            },
        ],
        params: &[],
        dynamic_slots: None,
    },
    OperatorSpec {
        kind: BlockKind::Minimization,
        slots: &[SlotSpec {
            name: SLOT_F,
            rule: ArityRule::Delta(1),
        }],
        params: &[],
        dynamic_slots: None,
    },
    OperatorSpec {
        kind: BlockKind::Custom,
        slots: &[SlotSpec {
            name: SLOT_DEFINITION,
            rule: ArityRule::Inherit,
        }],
        params: &[],
        dynamic_slots: None,
    },
];

/// Look up the spec for an operator kind.
pub fn spec(kind: BlockKind) -> &'static OperatorSpec {
    OPERATORS
        .iter()
        .find(|s| s.kind == kind)
        .expect("every BlockKind has a registry entry")
}

/// Rebuild a Composition node's slot list from its `m` parameter:
/// one `f` slot fixed to `m` inputs, then `g1..gm` inheriting the
/// parent arity. Children are left empty; callers re-home survivors.
fn composition_slots(node: &BlockNode) -> Vec<Slot> {
    let m = node.param(PARAM_INNER_COUNT).unwrap_or(1).max(1) as usize;
    let mut slots = Vec::with_capacity(1 + m);
    slots.push(Slot::empty(SLOT_F, ArityRule::Fixed(m)));
    for i in 1..=m {
        slots.push(Slot::empty(format!("g{}", i), ArityRule::Inherit));
    }
    slots
}

/// Regenerate a node's slot list if its kind has dynamic slots.
/// Returns `None` for kinds with a fixed template.
pub fn dynamic_slots(node: &BlockNode) -> Option<Vec<Slot>> {
    spec(node.kind).dynamic_slots.map(|f| f(node))
}

/// Default parameter values for a kind, from the schema.
pub fn default_params(kind: BlockKind) -> Vec<ParamValue> {
    spec(kind)
        .params
        .iter()
        .map(|p| ParamValue {
            name: p.name.to_string(),
            value: p.default,
        })
        .collect()
}

/// Clamp a parameter value to its schema minimum.
/// Unknown parameters pass through unchanged.
pub fn clamp_param(kind: BlockKind, name: &str, value: i64) -> i64 {
    spec(kind)
        .params
        .iter()
        .find(|p| p.name == name)
        .map(|p| value.max(p.min))
        .unwrap_or(value)
}

/// Build a fresh node from the operator's default template, the way a
/// palette drop does. Slots are empty, parameters at their defaults,
/// arity zero until propagation runs.
pub fn default_node(kind: BlockKind) -> BlockNode {
    let mut node = BlockNode {
        id: BlockId::fresh(),
        kind,
        display_name: None,
        slots: spec(kind)
            .slots
            .iter()
            .map(|s| Slot::empty(s.name, s.rule))
            .collect(),
        params: default_params(kind),
        arity: 0,
        locked: false,
    };
    if let Some(slots) = dynamic_slots(&node) {
        node.slots = slots;
    }
    node
}
