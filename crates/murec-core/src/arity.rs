//! Arity propagation
//!
//! A node's arity is derived, never set directly: the root carries the
//! declared input count, and every slot's rule maps the parent arity to
//! its child's. Propagation is a single top-down walk, re-run after
//! every structural edit and every declared-input-count change.

use crate::types::BlockNode;

/// Re-derive the arity of `node` and all of its descendants, with `arity`
/// as the value this subtree's root receives.
pub fn propagate(node: &mut BlockNode, arity: usize) {
    node.arity = arity;
    for slot in &mut node.slots {
        let child_arity = slot.rule.apply(arity);
        if let Some(child) = slot.child.as_mut() {
            propagate(child, child_arity);
        }
    }
}
