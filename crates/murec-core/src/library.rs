//! Custom block library
//!
//! A named, insertion-ordered collection of saved definitions. The
//! library is an explicit object owned by the editing session, not
//! shared global state; instantiating an entry produces an independent
//! deep copy, so removing the entry later never touches live trees.

use indexmap::IndexMap;
use tracing::debug;

use crate::arity;
use crate::error::{Error, Result};
use crate::registry::{self, SLOT_DEFINITION};
use crate::save::{self, BlockSave};
use crate::types::{BlockKind, BlockNode};

/// What `promote` does when the name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Fail with [`Error::NameCollision`].
    Reject,
    /// Replace the stored definition.
    Overwrite,
}

/// Name-keyed store of custom-block definitions.
#[derive(Debug, Clone, Default)]
pub struct BlockLibrary {
    entries: IndexMap<String, BlockSave>,
}

impl BlockLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a tree as a named definition.
    ///
    /// A Custom root is unwrapped to its definition body first, so
    /// promoting an instance re-saves the definition rather than
    /// nesting wrappers.
    pub fn promote(
        &mut self,
        root: &BlockNode,
        name: impl Into<String>,
        policy: OverwritePolicy,
    ) -> Result<()> {
        let name = name.into();
        if policy == OverwritePolicy::Reject && self.entries.contains_key(&name) {
            return Err(Error::NameCollision(name));
        }

        let definition = match root.kind {
            BlockKind::Custom => root
                .slot(SLOT_DEFINITION)
                .and_then(|s| s.child.as_ref())
                .ok_or_else(|| Error::IncompleteDefinition(SLOT_DEFINITION.to_string()))?,
            _ => root,
        };

        let mut saved = save::serialize(definition);
        saved.name = Some(name.clone());
        debug!(name = %name, "promoted definition to library");
        self.entries.insert(name, saved);
        Ok(())
    }

    /// Build a fresh instance of a stored definition: an unlocked Custom
    /// wrapper holding the locked definition body, propagated to
    /// `target_arity`.
    pub fn instantiate(&self, name: &str, target_arity: usize) -> Result<BlockNode> {
        let saved = self
            .entries
            .get(name)
            .ok_or_else(|| Error::UnknownDefinition(name.to_string()))?;

        let mut wrapper = registry::default_node(BlockKind::Custom);
        wrapper.display_name = Some(name.to_string());
        wrapper.slots[0].child = Some(save::deserialize(saved, target_arity, true));
        arity::propagate(&mut wrapper, target_arity);
        Ok(wrapper)
    }

    /// Delete an entry. Existing instances are unaffected.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.shift_remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&BlockSave> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &BlockSave> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Absorb saved entries, skipping names already present (document
    /// load behavior).
    pub fn merge_from(&mut self, entries: impl IntoIterator<Item = BlockSave>) {
        for entry in entries {
            let Some(name) = entry.name.clone() else {
                continue;
            };
            self.entries.entry(name).or_insert(entry);
        }
    }
}
