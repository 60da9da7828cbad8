//! Core errors

use thiserror::Error;

use crate::types::BlockId;

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by tree edits, evaluation, and persistence.
///
/// Every variant is recoverable: a failed edit leaves the tree unchanged,
/// a failed evaluation leaves the tree intact, and a failed document load
/// leaves the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("node not found: {0}")]
    UnknownNode(BlockId),

    #[error("no slot named '{0}' on target node")]
    UnknownSlot(String),

    #[error("no parameter named '{0}' on target node")]
    UnknownParameter(String),

    #[error("slot '{0}' already holds a block; detach it first")]
    SlotOccupied(String),

    #[error("cannot attach a block inside itself or its own descendants")]
    CyclicAttachment,

    #[error("subtree is locked; custom block definitions cannot be edited in place")]
    LockedSubtree,

    #[error("{kind} expects {expected} input(s), got {actual}")]
    ArityMismatch {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("parameter '{name}' = {value} is out of range for {actual} input(s)")]
    ParameterOutOfRange {
        name: String,
        value: i64,
        actual: usize,
    },

    #[error("slot '{0}' is empty; the definition is incomplete")]
    IncompleteDefinition(String),

    #[error("minimization exhausted the search bound ({0}) without reaching zero")]
    DivergenceBound(i64),

    #[error("no library definition named '{0}'")]
    UnknownDefinition(String),

    #[error("library already contains a definition named '{0}'")]
    NameCollision(String),

    #[error("invalid workspace document: {0}")]
    InvalidDocument(String),
}
