//! jsonedit-core — the document model behind a browser JSON editor.
//!
//! An immutable, identity-preserving annotated tree over arbitrary JSON,
//! plus the machinery an editing UI needs around it:
//!
//! - [`tree`] — the annotated node model and the synchronization algorithm
//!   that rebuilds a tree from a new value while keeping per-node identity
//!   and UI state;
//! - [`immutable`] — structural-sharing get/set/update/delete helpers over
//!   that tree;
//! - [`patch`] — ordered JSON-Patch-style operations with faithful revert
//!   generation, in a generic and a tree-aware variant;
//! - [`actions`] — builders turning user intents (rename, convert,
//!   duplicate, sort, insert, remove) into patch operations;
//! - [`search`] / [`selection`] — text search and selection-range
//!   resolution, layered onto the tree as annotations;
//! - [`history`] — the bounded undo/redo buffer;
//! - [`editor`] — the facade the view layer talks to.
//!
//! Everything is single-threaded and pure: operations take snapshots and
//! return new ones, sharing unchanged subtrees by reference. The only
//! mutable piece is the id source, which is injected explicitly
//! (see [`id`]).

pub mod actions;
pub mod editor;
pub mod history;
pub mod id;
pub mod immutable;
pub mod patch;
pub mod search;
pub mod selection;
pub mod tree;

pub use editor::{Editor, PatchSummary};
pub use history::{History, HistoryEntry, MAX_HISTORY_ITEMS};
pub use id::{IdSource, NodeId, RandomIds, SequentialIds};
pub use immutable::PathError;
pub use patch::{
    apply_patch, apply_patch_tree, from_json_patch, to_json_patch, OpMeta, PatchError, PatchOp,
    PatchResult, TestFailure, TreePatchResult,
};
pub use search::{SearchArea, SearchMatch, SearchResults};
pub use selection::{resolve_range, Selection, SelectionRange};
pub use tree::{DocNode, NodeContent, NodeKind, SchemaError, SearchState, SelectionFlags};
