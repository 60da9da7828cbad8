//! Persistence forms
//!
//! [`BlockSave`] is the persistence-safe shape of a block subtree: kind,
//! parameters, and named children only. Transient state (ids, arity,
//! locked) is dropped on save and rebuilt on load from the operator
//! registry and arity propagation. The same form is used for file
//! save/load ([`WorkspaceDocument`]) and for custom-block library
//! entries.

use serde::{Deserialize, Serialize};

use crate::arity;
use crate::error::{Error, Result};
use crate::registry;
use crate::types::{BlockKind, BlockNode, Value};

/// Version tag written into every saved document. Loads reject anything
/// else.
pub const FILE_VERSION: &str = "MUREC_WORKSPACE_V1";

/// Persistence-safe form of one block subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSave {
    /// Custom-definition name, present only on library entries and
    /// their instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: BlockKind,
    #[serde(default)]
    pub children: Vec<SavedSlot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<SavedParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSlot {
    pub slot_name: String,
    pub child: Option<BlockSave>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedParam {
    pub name: String,
    pub value: i64,
}

/// Convert a live subtree to its persistence form.
pub fn serialize(node: &BlockNode) -> BlockSave {
    BlockSave {
        name: node.display_name.clone(),
        kind: node.kind,
        children: node
            .slots
            .iter()
            .map(|slot| SavedSlot {
                slot_name: slot.name.clone(),
                child: slot.child.as_ref().map(serialize),
            })
            .collect(),
        parameters: node
            .params
            .iter()
            .map(|p| SavedParam {
                name: p.name.clone(),
                value: p.value,
            })
            .collect(),
    }
}

/// Rebuild a live subtree from its persistence form.
///
/// Fresh ids are assigned throughout; parameters are clamped to their
/// schema minimums; Composition slot lists are regenerated from `m`
/// before children are re-attached; everything below a Custom node is
/// locked (and `forced_locked` locks the whole subtree). Arity is
/// re-propagated with `declared_arity` at this subtree's root.
pub fn deserialize(save: &BlockSave, declared_arity: usize, forced_locked: bool) -> BlockNode {
    let mut root = deserialize_inner(save, forced_locked);
    arity::propagate(&mut root, declared_arity);
    root
}

fn deserialize_inner(save: &BlockSave, locked: bool) -> BlockNode {
    let mut node = registry::default_node(save.kind);
    node.display_name = save.name.clone();
    node.locked = locked;

    for saved in &save.parameters {
        if let Some(p) = node.params.iter_mut().find(|p| p.name == saved.name) {
            p.value = registry::clamp_param(save.kind, &saved.name, saved.value);
        }
    }

    // Parameter-dependent slot shapes must exist before children land.
    if let Some(slots) = registry::dynamic_slots(&node) {
        node.slots = slots;
    }

    // Crossing a Custom node locks everything beneath it.
    let child_locked = locked || save.kind == BlockKind::Custom;
    for saved in &save.children {
        if let Some(slot) = node.slots.iter_mut().find(|s| s.name == saved.slot_name) {
            slot.child = saved
                .child
                .as_ref()
                .map(|c| deserialize_inner(c, child_locked));
        }
    }

    node
}

/// Everything a saved workspace file holds: the root tree, the declared
/// inputs, and the custom-block library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDocument {
    pub file_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_definition: Option<BlockSave>,
    pub declared_inputs: Vec<Value>,
    pub declared_arity: usize,
    #[serde(default)]
    pub library_entries: Vec<BlockSave>,
}

/// Parse and validate a workspace document.
///
/// Rejects malformed JSON, version mismatches, and structurally invalid
/// fields before any of the content is trusted.
pub fn parse_document(json: &str) -> Result<WorkspaceDocument> {
    let doc: WorkspaceDocument =
        serde_json::from_str(json).map_err(|e| Error::InvalidDocument(e.to_string()))?;
    if doc.file_version != FILE_VERSION {
        return Err(Error::InvalidDocument(format!(
            "unsupported file version '{}', expected '{}'",
            doc.file_version, FILE_VERSION
        )));
    }
    Ok(doc)
}

/// Render a document to pretty-printed JSON.
pub fn document_to_json(doc: &WorkspaceDocument) -> Result<String> {
    serde_json::to_string_pretty(doc).map_err(|e| Error::InvalidDocument(e.to_string()))
}
