//! The editor facade: the contract exposed to the (out-of-scope) view
//! layer. Owns the annotated tree, the undo/redo history, the active
//! search and the injected id source; every mutation rebuilds the tree
//! through the patch engine or the sync/expand helpers.

use std::sync::Arc;

use serde_json::Value;

use jsonedit_json_pointer::PathKey;

use crate::history::{History, HistoryEntry};
use crate::id::{IdSource, SequentialIds};
use crate::immutable::exists_in;
use crate::patch::apply_tree::apply_patch_tree;
use crate::patch::op::{PatchError, PatchOp};
use crate::search::{self, SearchResults};
use crate::tree::errors::apply_errors;
use crate::tree::expand::{expand_by, expand_one, expand_path, is_expanded};
use crate::tree::node::{DocNode, SchemaError};
use crate::tree::sync::sync;

/// Outcome of [`Editor::patch`]: the ops as applied, the computed revert,
/// and the error when the batch was rejected.
#[derive(Debug, Clone)]
pub struct PatchSummary {
    pub patch: Vec<PatchOp>,
    pub revert: Vec<PatchOp>,
    pub error: Option<PatchError>,
}

/// An in-memory JSON document with undo/redo, search and expand state.
pub struct Editor {
    tree: Arc<DocNode>,
    history: History,
    ids: Box<dyn IdSource>,
    search: Option<SearchResults>,
    error_paths: Vec<jsonedit_json_pointer::Path>,
}

impl Editor {
    /// Open a document with the default (sequential) id source.
    pub fn new(json: &Value) -> Self {
        Self::with_ids(json, Box::new(SequentialIds::new()))
    }

    /// Open a document with an explicit id source.
    pub fn with_ids(json: &Value, mut ids: Box<dyn IdSource>) -> Self {
        let tree = sync(json, None, ids.as_mut());
        Editor {
            tree,
            history: History::new(),
            ids,
            search: None,
            error_paths: Vec::new(),
        }
    }

    /// The plain JSON value of the document.
    pub fn get(&self) -> Value {
        self.tree.to_value()
    }

    /// Replace the document. The new value is synchronized against the
    /// current tree, so identity and expand state survive where shapes
    /// overlap; the edit history is reset.
    pub fn set(&mut self, json: &Value) {
        self.tree = sync(json, Some(&self.tree), self.ids.as_mut());
        self.history.clear();
        self.search = None;
    }

    /// The current annotated tree.
    pub fn tree(&self) -> &Arc<DocNode> {
        &self.tree
    }

    /// Apply a patch through the tree-aware engine, recording it in the
    /// history when it succeeds.
    pub fn patch(&mut self, ops: &[PatchOp]) -> PatchSummary {
        let result = apply_patch_tree(&self.tree, ops, self.ids.as_mut());
        if let Some(error) = result.error {
            return PatchSummary {
                patch: ops.to_vec(),
                revert: Vec::new(),
                error: Some(error),
            };
        }
        self.tree = result.tree;
        self.history.push(HistoryEntry {
            redo: ops.to_vec(),
            undo: result.revert.clone(),
        });
        PatchSummary {
            patch: ops.to_vec(),
            revert: result.revert,
            error: None,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Re-apply the newest entry's undo patch. The revert the engine
    /// produces for it is discarded; the paired redo ops stay in place.
    pub fn undo(&mut self) -> bool {
        let Some(ops) = self.history.undo() else {
            return false;
        };
        self.apply_history_ops(&ops)
    }

    /// Re-apply the most recently undone entry's redo patch.
    pub fn redo(&mut self) -> bool {
        let Some(ops) = self.history.redo() else {
            return false;
        };
        self.apply_history_ops(&ops)
    }

    fn apply_history_ops(&mut self, ops: &[PatchOp]) -> bool {
        let result = apply_patch_tree(&self.tree, ops, self.ids.as_mut());
        if result.error.is_some() {
            return false;
        }
        self.tree = result.tree;
        true
    }

    // ── Expand state ──────────────────────────────────────────────────────

    pub fn expand(&mut self, path: &[PathKey], expanded: bool) {
        self.tree = expand_one(&self.tree, path, expanded);
    }

    pub fn collapse(&mut self, path: &[PathKey]) {
        self.expand(path, false);
    }

    /// Make the node at `path` visible by expanding every ancestor.
    pub fn expand_to(&mut self, path: &[PathKey]) {
        self.tree = expand_path(&self.tree, path, true);
    }

    /// Apply an expand predicate to every container (`None` leaves a node
    /// untouched).
    pub fn expand_where(&mut self, predicate: &dyn Fn(&[PathKey]) -> Option<bool>) {
        self.tree = expand_by(&self.tree, predicate);
    }

    pub fn is_expanded(&self, path: &[PathKey]) -> bool {
        is_expanded(&self.tree, path)
    }

    pub fn exists(&self, path: &[PathKey]) -> bool {
        exists_in(&self.tree, path)
    }

    // ── Search ────────────────────────────────────────────────────────────

    /// Run a text search, annotating the tree. Returns the match list.
    pub fn search(&mut self, text: &str) -> &SearchResults {
        let (tree, results) = search::search(&self.tree, text);
        self.tree = tree;
        self.search.insert(results)
    }

    pub fn search_results(&self) -> Option<&SearchResults> {
        self.search.as_ref()
    }

    /// Move the active match forward, wrapping at the end.
    pub fn next_result(&mut self) -> Option<&SearchResults> {
        let current = self.search.take()?;
        let (tree, results) = search::next_result(&self.tree, &current);
        self.tree = tree;
        Some(self.search.insert(results))
    }

    /// Move the active match backward, wrapping at the start.
    pub fn previous_result(&mut self) -> Option<&SearchResults> {
        let current = self.search.take()?;
        let (tree, results) = search::previous_result(&self.tree, &current);
        self.tree = tree;
        Some(self.search.insert(results))
    }

    // ── Schema errors ─────────────────────────────────────────────────────

    /// Merge a validator's error objects onto the tree, clearing stamps
    /// that are no longer reported.
    pub fn apply_errors(&mut self, errors: &[SchemaError]) {
        let (tree, stamped) = apply_errors(&self.tree, errors, &self.error_paths);
        self.tree = tree;
        self.error_paths = stamped;
    }
}
