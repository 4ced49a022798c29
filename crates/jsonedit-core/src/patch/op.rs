//! Patch operation and result types.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use jsonedit_json_pointer::Path;

use crate::immutable::PathError;
use crate::tree::node::{DocNode, NodeKind};

/// Non-standard extension data carried by `add` and `move` operations so
/// that reverts restore content *and* position/state faithfully.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpMeta {
    /// Kind of the node this value stood for when it was captured.
    pub kind: Option<NodeKind>,
    /// Name of the object property the value is (re)inserted before.
    pub before: Option<String>,
    /// Expand state to restore on the re-created node.
    pub expanded: Option<bool>,
}

impl OpMeta {
    pub fn before(name: impl Into<String>) -> Self {
        OpMeta {
            before: Some(name.into()),
            ..OpMeta::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.before.is_none() && self.expanded.is_none()
    }
}

/// One ordered patch operation.
///
/// The enum is closed: an unknown operation name or a `copy`/`move`
/// without `from` cannot be represented here and is rejected by the wire
/// codec instead.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    Add {
        path: Path,
        value: Value,
        meta: Option<OpMeta>,
    },
    Remove {
        path: Path,
    },
    Replace {
        path: Path,
        value: Value,
    },
    Copy {
        path: Path,
        from: Path,
        meta: Option<OpMeta>,
    },
    Move {
        path: Path,
        from: Path,
        meta: Option<OpMeta>,
    },
    Test {
        path: Path,
        /// `None` when the wire form carried no value; the engine fails
        /// such a test.
        value: Option<Value>,
    },
}

impl PatchOp {
    pub fn add(path: Path, value: Value) -> Self {
        PatchOp::Add {
            path,
            value,
            meta: None,
        }
    }

    pub fn remove(path: Path) -> Self {
        PatchOp::Remove { path }
    }

    pub fn replace(path: Path, value: Value) -> Self {
        PatchOp::Replace { path, value }
    }

    pub fn test(path: Path, value: Value) -> Self {
        PatchOp::Test {
            path,
            value: Some(value),
        }
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            PatchOp::Add { .. } => "add",
            PatchOp::Remove { .. } => "remove",
            PatchOp::Replace { .. } => "replace",
            PatchOp::Copy { .. } => "copy",
            PatchOp::Move { .. } => "move",
            PatchOp::Test { .. } => "test",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            PatchOp::Add { path, .. } => path,
            PatchOp::Remove { path } => path,
            PatchOp::Replace { path, .. } => path,
            PatchOp::Copy { path, .. } => path,
            PatchOp::Move { path, .. } => path,
            PatchOp::Test { path, .. } => path,
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────

/// Why a `test` operation failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TestFailure {
    #[error("no value provided")]
    NoValueProvided,
    #[error("path does not exist: '{0}'")]
    PathNotFound(String),
    #[error("value mismatch at '{0}'")]
    ValueMismatch(String),
}

/// Document-level patch failures. The engine returns these; it never
/// panics across its boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    #[error("path does not exist: '{0}'")]
    PathNotFound(String),
    #[error("invalid array index in '{0}'")]
    InvalidIndex(String),
    #[error("cannot move '{from}' into its own child '{to}'")]
    MoveIntoChild { from: String, to: String },
    #[error("test operation failed: {0}")]
    TestFailed(#[from] TestFailure),
    #[error("unknown operation '{0}'")]
    UnknownOp(String),
    #[error("missing 'from' field in '{0}' operation")]
    MissingFrom(String),
    #[error("invalid patch operation: {0}")]
    InvalidOp(String),
    #[error(transparent)]
    Path(#[from] PathError),
}

// ── Results ───────────────────────────────────────────────────────────────

/// Outcome of applying a patch to a plain JSON value.
///
/// On success `doc` is the patched document and `revert` undoes the whole
/// batch when applied in its own order. On error `doc` is the unmodified
/// input and `revert` is empty; nothing is partially committed.
#[derive(Debug, Clone)]
pub struct PatchResult {
    pub doc: Value,
    pub revert: Vec<PatchOp>,
    pub error: Option<PatchError>,
}

/// Outcome of applying a patch to an annotated tree; same contract as
/// [`PatchResult`].
#[derive(Debug, Clone)]
pub struct TreePatchResult {
    pub tree: Arc<DocNode>,
    pub revert: Vec<PatchOp>,
    pub error: Option<PatchError>,
}
