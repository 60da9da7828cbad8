//! Block tree edits
//!
//! Structural operations over an owned tree. Each operation takes the
//! current root by reference and returns a fresh root on success; on
//! failure the caller's tree is untouched. Arity propagation re-runs
//! over the whole tree after every successful edit.

use tracing::debug;

use crate::arity;
use crate::error::{Error, Result};
use crate::registry;
use crate::types::{BlockId, BlockKind, BlockNode};

/// Find a node by id anywhere in the subtree.
pub fn find(node: &BlockNode, id: BlockId) -> Option<&BlockNode> {
    if node.id == id {
        return Some(node);
    }
    node.slots
        .iter()
        .filter_map(|s| s.child.as_ref())
        .find_map(|child| find(child, id))
}

fn find_mut(node: &mut BlockNode, id: BlockId) -> Option<&mut BlockNode> {
    if node.id == id {
        return Some(node);
    }
    node.slots
        .iter_mut()
        .filter_map(|s| s.child.as_mut())
        .find_map(|child| find_mut(child, id))
}

/// True if `candidate` occurs strictly below `node`.
pub fn is_descendant(node: &BlockNode, candidate: BlockId) -> bool {
    node.slots.iter().filter_map(|s| s.child.as_ref()).any(|c| {
        c.id == candidate || is_descendant(c, candidate)
    })
}

/// Structural edits are forbidden on locked nodes and on custom-block
/// wrappers (an instance can only be replaced wholesale).
fn check_editable(node: &BlockNode) -> Result<()> {
    if node.locked || node.kind == BlockKind::Custom {
        return Err(Error::LockedSubtree);
    }
    Ok(())
}

/// Attach `child` into the named slot of the node `parent_id`.
///
/// Fails with [`Error::LockedSubtree`] on locked parents,
/// [`Error::CyclicAttachment`] if `child` is (or contains) the parent,
/// and [`Error::SlotOccupied`] if the slot already holds a block.
pub fn attach(
    root: &BlockNode,
    parent_id: BlockId,
    slot_name: &str,
    child: BlockNode,
    declared_arity: usize,
) -> Result<BlockNode> {
    {
        let parent = find(root, parent_id).ok_or(Error::UnknownNode(parent_id))?;
        check_editable(parent)?;
        let slot = parent
            .slot(slot_name)
            .ok_or_else(|| Error::UnknownSlot(slot_name.to_string()))?;
        if slot.child.is_some() {
            return Err(Error::SlotOccupied(slot_name.to_string()));
        }
        if child.id == parent_id || is_descendant(&child, parent_id) {
            return Err(Error::CyclicAttachment);
        }
    }

    debug!(parent = %parent_id, slot = slot_name, kind = %child.kind, "attach");
    let mut next = root.clone();
    let parent = find_mut(&mut next, parent_id).ok_or(Error::UnknownNode(parent_id))?;
    let slot = parent
        .slots
        .iter_mut()
        .find(|s| s.name == slot_name)
        .ok_or_else(|| Error::UnknownSlot(slot_name.to_string()))?;
    slot.child = Some(child);
    arity::propagate(&mut next, declared_arity);
    Ok(next)
}

/// Clear the named slot of the node `parent_id`. Clearing an already
/// empty slot is a no-op that still returns a fresh root.
pub fn detach(
    root: &BlockNode,
    parent_id: BlockId,
    slot_name: &str,
    declared_arity: usize,
) -> Result<BlockNode> {
    {
        let parent = find(root, parent_id).ok_or(Error::UnknownNode(parent_id))?;
        check_editable(parent)?;
        parent
            .slot(slot_name)
            .ok_or_else(|| Error::UnknownSlot(slot_name.to_string()))?;
    }

    debug!(parent = %parent_id, slot = slot_name, "detach");
    let mut next = root.clone();
    let parent = find_mut(&mut next, parent_id).ok_or(Error::UnknownNode(parent_id))?;
    if let Some(slot) = parent.slots.iter_mut().find(|s| s.name == slot_name) {
        slot.child = None;
    }
    arity::propagate(&mut next, declared_arity);
    Ok(next)
}

/// Set a parameter on the node `node_id`, clamping to the schema
/// minimum. Changing Composition's `m` regenerates the slot list,
/// keeping children whose slot name survives and discarding the rest.
pub fn set_parameter(
    root: &BlockNode,
    node_id: BlockId,
    param_name: &str,
    value: i64,
    declared_arity: usize,
) -> Result<BlockNode> {
    {
        let node = find(root, node_id).ok_or(Error::UnknownNode(node_id))?;
        if node.locked {
            return Err(Error::LockedSubtree);
        }
        node.params
            .iter()
            .find(|p| p.name == param_name)
            .ok_or_else(|| Error::UnknownParameter(param_name.to_string()))?;
    }

    let mut next = root.clone();
    let node = find_mut(&mut next, node_id).ok_or(Error::UnknownNode(node_id))?;
    let clamped = registry::clamp_param(node.kind, param_name, value);
    debug!(node = %node_id, param = param_name, value = clamped, "set parameter");
    if let Some(p) = node.params.iter_mut().find(|p| p.name == param_name) {
        p.value = clamped;
    }

    if let Some(mut slots) = registry::dynamic_slots(node) {
        // Re-home surviving children by slot name; anything whose slot
        // disappeared is dropped with the old list.
        let old = std::mem::take(&mut node.slots);
        for prev in old {
            if let Some(child) = prev.child {
                if let Some(slot) = slots.iter_mut().find(|s| s.name == prev.name) {
                    slot.child = Some(child);
                }
            }
        }
        node.slots = slots;
    }

    arity::propagate(&mut next, declared_arity);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{default_node, PARAM_INDEX, PARAM_INNER_COUNT, SLOT_BASE_CASE, SLOT_F};
    use crate::types::BlockKind;

    fn propagated(kind: BlockKind, arity: usize) -> BlockNode {
        let mut node = default_node(kind);
        arity::propagate(&mut node, arity);
        node
    }

    #[test]
    fn test_attach_fills_slot_and_propagates() {
        let root = propagated(BlockKind::PrimitiveRecursion, 2);
        let child = default_node(BlockKind::Projection);
        let next = attach(&root, root.id, SLOT_BASE_CASE, child, 2).unwrap();
        let attached = next.slot(SLOT_BASE_CASE).unwrap().child.as_ref().unwrap();
        assert_eq!(attached.kind, BlockKind::Projection);
        assert_eq!(attached.arity, 1);
        // original root untouched
        assert!(root.slot(SLOT_BASE_CASE).unwrap().child.is_none());
    }

    #[test]
    fn test_attach_occupied_slot_fails() {
        let root = propagated(BlockKind::Minimization, 1);
        let next = attach(&root, root.id, SLOT_F, default_node(BlockKind::Zero), 1).unwrap();
        let err = attach(&next, next.id, SLOT_F, default_node(BlockKind::Zero), 1).unwrap_err();
        assert_eq!(err, Error::SlotOccupied(SLOT_F.to_string()));
    }

    #[test]
    fn test_attach_unknown_slot_fails() {
        let root = propagated(BlockKind::PrimitiveRecursion, 1);
        let err = attach(&root, root.id, "nope", default_node(BlockKind::Zero), 1).unwrap_err();
        assert_eq!(err, Error::UnknownSlot("nope".to_string()));
    }

    #[test]
    fn test_cyclic_attachment_rejected() {
        let root = propagated(BlockKind::PrimitiveRecursion, 2);
        let next = attach(
            &root,
            root.id,
            SLOT_BASE_CASE,
            default_node(BlockKind::Minimization),
            2,
        )
        .unwrap();
        let inner = next.slot(SLOT_BASE_CASE).unwrap().child.as_ref().unwrap();

        // a clone of the whole tree contains the inner node
        let err = attach(&next, inner.id, SLOT_F, next.clone(), 2).unwrap_err();
        assert_eq!(err, Error::CyclicAttachment);
        // self-attach
        let err = attach(&next, inner.id, SLOT_F, inner.clone(), 2).unwrap_err();
        assert_eq!(err, Error::CyclicAttachment);
    }

    #[test]
    fn test_detach_empty_slot_is_noop() {
        let root = propagated(BlockKind::Minimization, 1);
        let next = detach(&root, root.id, SLOT_F, 1).unwrap();
        assert!(next.slot(SLOT_F).unwrap().child.is_none());
    }

    #[test]
    fn test_locked_subtree_rejects_edits() {
        let mut root = propagated(BlockKind::PrimitiveRecursion, 2);
        root.locked = true;
        let err = attach(&root, root.id, SLOT_BASE_CASE, default_node(BlockKind::Zero), 2)
            .unwrap_err();
        assert_eq!(err, Error::LockedSubtree);
        let err = detach(&root, root.id, SLOT_BASE_CASE, 2).unwrap_err();
        assert_eq!(err, Error::LockedSubtree);
    }

    #[test]
    fn test_custom_wrapper_rejects_slot_edits() {
        let root = propagated(BlockKind::Custom, 2);
        let err = attach(
            &root,
            root.id,
            crate::registry::SLOT_DEFINITION,
            default_node(BlockKind::Zero),
            2,
        )
        .unwrap_err();
        assert_eq!(err, Error::LockedSubtree);
    }

    #[test]
    fn test_set_parameter_clamps_to_minimum() {
        let root = propagated(BlockKind::Projection, 2);
        let next = set_parameter(&root, root.id, PARAM_INDEX, -3, 2).unwrap();
        assert_eq!(next.param(PARAM_INDEX), Some(1));
    }

    #[test]
    fn test_composition_m_shrink_keeps_valid_children() {
        let mut root = default_node(BlockKind::Composition);
        root.params[0].value = 2;
        root.slots = registry::dynamic_slots(&root).unwrap();
        arity::propagate(&mut root, 1);

        let root = attach(&root, root.id, SLOT_F, default_node(BlockKind::Successor), 1).unwrap();
        let root = attach(&root, root.id, "g1", default_node(BlockKind::Zero), 1).unwrap();
        let root = attach(&root, root.id, "g2", default_node(BlockKind::Projection), 1).unwrap();
        let g1_id = root.slot("g1").unwrap().child.as_ref().unwrap().id;

        let shrunk = set_parameter(&root, root.id, PARAM_INNER_COUNT, 1, 1).unwrap();
        assert_eq!(shrunk.slots.len(), 2);
        assert!(shrunk.slot("g2").is_none());
        assert_eq!(shrunk.slot("g1").unwrap().child.as_ref().unwrap().id, g1_id);
        assert!(shrunk.slot(SLOT_F).unwrap().child.is_some());

        // growing back yields an empty g2, not the discarded subtree
        let grown = set_parameter(&shrunk, shrunk.id, PARAM_INNER_COUNT, 2, 1).unwrap();
        assert!(grown.slot("g2").unwrap().child.is_none());
        assert_eq!(grown.slot("g1").unwrap().child.as_ref().unwrap().id, g1_id);
    }

    #[test]
    fn test_is_descendant() {
        let root = propagated(BlockKind::PrimitiveRecursion, 2);
        let child = default_node(BlockKind::Zero);
        let child_id = child.id;
        let next = attach(&root, root.id, SLOT_BASE_CASE, child, 2).unwrap();
        assert!(is_descendant(&next, child_id));
        assert!(!is_descendant(&next, next.id));
        assert!(!is_descendant(&next, BlockId::fresh()));
    }
}
