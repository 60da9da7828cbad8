//! Editing session
//!
//! Owns everything a single editor surface works against: the root
//! tree, the declared input count and input values, and the
//! custom-block library. Collaborators (UI, CLI) issue structural edits
//! and evaluation requests here and never touch nodes directly.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::eval;
use crate::library::{BlockLibrary, OverwritePolicy};
use crate::registry;
use crate::save::{self, WorkspaceDocument, FILE_VERSION};
use crate::step::{HaltHandle, StepTrace};
use crate::tree;
use crate::types::{BlockId, BlockKind, BlockNode, Value};
use crate::arity;

/// Input count a fresh session starts with.
pub const DEFAULT_INPUT_COUNT: usize = 2;

/// One editing session: root tree, declared inputs, and library.
#[derive(Debug, Clone)]
pub struct Session {
    root: Option<BlockNode>,
    declared_arity: usize,
    declared_inputs: Vec<Value>,
    library: BlockLibrary,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            root: None,
            declared_arity: DEFAULT_INPUT_COUNT,
            declared_inputs: vec![0; DEFAULT_INPUT_COUNT],
            library: BlockLibrary::new(),
        }
    }

    pub fn root(&self) -> Option<&BlockNode> {
        self.root.as_ref()
    }

    pub fn declared_arity(&self) -> usize {
        self.declared_arity
    }

    pub fn inputs(&self) -> &[Value] {
        &self.declared_inputs
    }

    pub fn library(&self) -> &BlockLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut BlockLibrary {
        &mut self.library
    }

    fn require_root(&self) -> Result<&BlockNode> {
        self.root
            .as_ref()
            .ok_or_else(|| Error::IncompleteDefinition("Root".to_string()))
    }

    /// Replace the root tree wholesale and re-propagate arity.
    pub fn set_root(&mut self, mut node: BlockNode) {
        arity::propagate(&mut node, self.declared_arity);
        self.root = Some(node);
    }

    /// Place a fresh default node of `kind` as the root.
    pub fn place_root(&mut self, kind: BlockKind) -> BlockId {
        let node = registry::default_node(kind);
        let id = node.id;
        self.set_root(node);
        id
    }

    pub fn clear_root(&mut self) {
        self.root = None;
    }

    /// Attach a fresh default node of `kind` into a slot.
    pub fn attach_new(&mut self, parent: BlockId, slot: &str, kind: BlockKind) -> Result<BlockId> {
        let child = registry::default_node(kind);
        let id = child.id;
        self.attach(parent, slot, child)?;
        Ok(id)
    }

    pub fn attach(&mut self, parent: BlockId, slot: &str, child: BlockNode) -> Result<()> {
        let root = self.require_root()?;
        self.root = Some(tree::attach(root, parent, slot, child, self.declared_arity)?);
        Ok(())
    }

    pub fn detach(&mut self, parent: BlockId, slot: &str) -> Result<()> {
        let root = self.require_root()?;
        self.root = Some(tree::detach(root, parent, slot, self.declared_arity)?);
        Ok(())
    }

    pub fn set_parameter(&mut self, node: BlockId, param: &str, value: i64) -> Result<()> {
        let root = self.require_root()?;
        self.root = Some(tree::set_parameter(
            root,
            node,
            param,
            value,
            self.declared_arity,
        )?);
        Ok(())
    }

    /// Change the declared input count: resizes the input vector
    /// (padding with zeros) and re-propagates the whole tree.
    pub fn set_declared_arity(&mut self, arity: usize) {
        debug!(arity, "declared input count changed");
        self.declared_arity = arity;
        self.declared_inputs.resize(arity, 0);
        if let Some(root) = self.root.as_mut() {
            arity::propagate(root, arity);
        }
    }

    pub fn set_input(&mut self, index: usize, value: Value) -> Result<()> {
        let slot = self
            .declared_inputs
            .get_mut(index)
            .ok_or(Error::ParameterOutOfRange {
                name: format!("input {}", index + 1),
                value: index as i64,
                actual: self.declared_arity,
            })?;
        *slot = value;
        Ok(())
    }

    /// Evaluate the root tree on the declared inputs.
    pub fn evaluate(&self) -> Result<Value> {
        eval::evaluate(self.require_root()?, &self.declared_inputs)
    }

    /// Begin a step trace over the root tree on the declared inputs.
    pub fn trace(&self) -> Result<StepTrace<'_>> {
        self.trace_with_halt(HaltHandle::new())
    }

    pub fn trace_with_halt(&self, halt: HaltHandle) -> Result<StepTrace<'_>> {
        Ok(crate::step::step_with_halt(
            self.require_root()?,
            &self.declared_inputs,
            halt,
        ))
    }

    /// Save the current root tree into the library under `name`.
    pub fn promote(&mut self, name: &str, policy: OverwritePolicy) -> Result<()> {
        let root = self.require_root()?.clone();
        self.library.promote(&root, name, policy)
    }

    /// Instantiate a library entry as the new root, at the declared
    /// input count.
    pub fn instantiate_root(&mut self, name: &str) -> Result<BlockId> {
        let instance = self.library.instantiate(name, self.declared_arity)?;
        let id = instance.id;
        self.set_root(instance);
        Ok(id)
    }

    /// Instantiate a library entry into a slot, with the arity that
    /// slot derives from its parent.
    pub fn instantiate_at(&mut self, parent: BlockId, slot: &str, name: &str) -> Result<BlockId> {
        let target_arity = {
            let root = self.require_root()?;
            let parent_node = tree::find(root, parent).ok_or(Error::UnknownNode(parent))?;
            let slot_ref = parent_node
                .slot(slot)
                .ok_or_else(|| Error::UnknownSlot(slot.to_string()))?;
            slot_ref.rule.apply(parent_node.arity)
        };
        let instance = self.library.instantiate(name, target_arity)?;
        let id = instance.id;
        self.attach(parent, slot, instance)?;
        Ok(id)
    }

    /// Snapshot the session into its persistence form.
    pub fn to_document(&self) -> WorkspaceDocument {
        WorkspaceDocument {
            file_version: FILE_VERSION.to_string(),
            root_definition: self.root.as_ref().map(save::serialize),
            declared_inputs: self.declared_inputs.clone(),
            declared_arity: self.declared_arity,
            library_entries: self.library.entries().cloned().collect(),
        }
    }

    pub fn save_json(&self) -> Result<String> {
        save::document_to_json(&self.to_document())
    }

    /// Load a validated document into this session: replaces the root,
    /// inputs, and declared arity; merges library entries, keeping
    /// existing names. A validation failure leaves the session
    /// untouched.
    pub fn load_document(&mut self, doc: WorkspaceDocument) {
        info!(
            arity = doc.declared_arity,
            entries = doc.library_entries.len(),
            "loading workspace document"
        );
        self.declared_arity = doc.declared_arity;
        self.declared_inputs = doc.declared_inputs;
        self.declared_inputs.resize(doc.declared_arity, 0);
        self.root = doc
            .root_definition
            .as_ref()
            .map(|saved| save::deserialize(saved, doc.declared_arity, false));
        self.library.merge_from(doc.library_entries);
    }

    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let doc = save::parse_document(json)?;
        self.load_document(doc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{PARAM_INDEX, SLOT_BASE_CASE, SLOT_RECURSIVE_CASE};

    /// Build h(x, n) = x + n through the edit API.
    fn addition_session() -> Session {
        let mut session = Session::new();
        let root = session.place_root(BlockKind::PrimitiveRecursion);
        session
            .attach_new(root, SLOT_BASE_CASE, BlockKind::Projection)
            .unwrap();
        let comp = session
            .attach_new(root, SLOT_RECURSIVE_CASE, BlockKind::Composition)
            .unwrap();
        session
            .attach_new(comp, "f", BlockKind::Successor)
            .unwrap();
        let proj = session.attach_new(comp, "g1", BlockKind::Projection).unwrap();
        session.set_parameter(proj, PARAM_INDEX, 3).unwrap();
        session
    }

    #[test]
    fn test_edit_and_evaluate() {
        let mut session = addition_session();
        session.set_input(0, 3).unwrap();
        session.set_input(1, 4).unwrap();
        assert_eq!(session.evaluate().unwrap(), 7);
    }

    #[test]
    fn test_set_input_out_of_range() {
        let mut session = Session::new();
        assert!(session.set_input(2, 1).is_err());
    }

    #[test]
    fn test_declared_arity_resizes_inputs_and_repropagates() {
        let mut session = addition_session();
        session.set_declared_arity(3);
        assert_eq!(session.inputs(), &[0, 0, 0]);
        assert_eq!(session.root().unwrap().arity, 3);

        // base case follows with delta(-1)
        let base = session
            .root()
            .unwrap()
            .slot(SLOT_BASE_CASE)
            .unwrap()
            .child
            .as_ref()
            .unwrap();
        assert_eq!(base.arity, 2);
    }

    #[test]
    fn test_failed_edit_leaves_session_intact() {
        let mut session = addition_session();
        let root_id = session.root().unwrap().id;
        let before = session.root().unwrap().clone();
        let err = session
            .attach_new(root_id, SLOT_BASE_CASE, BlockKind::Zero)
            .unwrap_err();
        assert_eq!(err, Error::SlotOccupied(SLOT_BASE_CASE.to_string()));
        assert_eq!(session.root().unwrap(), &before);
    }

    #[test]
    fn test_promote_instantiate_and_evaluate() {
        let mut session = addition_session();
        session.promote("add", OverwritePolicy::Reject).unwrap();
        session.instantiate_root("add").unwrap();
        assert_eq!(session.root().unwrap().kind, BlockKind::Custom);
        session.set_input(0, 2).unwrap();
        session.set_input(1, 5).unwrap();
        assert_eq!(session.evaluate().unwrap(), 7);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut session = addition_session();
        session.set_input(0, 3).unwrap();
        session.set_input(1, 4).unwrap();
        session.promote("add", OverwritePolicy::Reject).unwrap();
        let json = session.save_json().unwrap();

        let mut restored = Session::new();
        restored.load_json(&json).unwrap();
        assert_eq!(restored.declared_arity(), 2);
        assert_eq!(restored.inputs(), &[3, 4]);
        assert_eq!(restored.evaluate().unwrap(), 7);
        assert!(restored.library().get("add").is_some());
    }

    #[test]
    fn test_load_failure_leaves_session_untouched() {
        let mut session = addition_session();
        let before = session.save_json().unwrap();
        assert!(session.load_json("{\"fileVersion\":\"WRONG\"}").is_err());
        assert_eq!(session.save_json().unwrap(), before);
    }

    #[test]
    fn test_trace_final_matches_evaluate() {
        let mut session = addition_session();
        session.set_input(0, 1).unwrap();
        session.set_input(1, 2).unwrap();
        let expected = session.evaluate().unwrap();
        let mut trace = session.trace().unwrap();
        for item in &mut trace {
            item.unwrap();
        }
        assert_eq!(trace.final_result(), Some(expected));
    }
}
