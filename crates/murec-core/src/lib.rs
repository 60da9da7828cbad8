//! murec-core
//!
//! Core model for a block-based editor of mu-recursive functions:
//! typed tree nodes for the six operator kinds plus user-defined custom
//! blocks, top-down arity propagation, an instant evaluator and a
//! pull-based stepper, and a JSON persistence format with a reusable
//! custom-block library.

pub mod arity;
pub mod error;
pub mod eval;
pub mod library;
pub mod registry;
pub mod save;
pub mod session;
pub mod step;
pub mod tree;
pub mod types;

pub use error::{Error, Result};
pub use eval::{evaluate, MINIMIZATION_BOUND};
pub use library::{BlockLibrary, OverwritePolicy};
pub use save::{BlockSave, WorkspaceDocument, FILE_VERSION};
pub use session::{Session, DEFAULT_INPUT_COUNT};
pub use step::{step, HaltHandle, StepEvent, StepTrace};
pub use types::{ArityRule, BlockId, BlockKind, BlockNode, ParamValue, Slot, Value};
