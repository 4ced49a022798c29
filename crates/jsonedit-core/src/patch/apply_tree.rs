//! The tree-aware patch engine: the same ordered operations as the
//! generic engine, applied to the annotated tree.
//!
//! On top of the generic semantics this variant re-synchronizes inserted
//! and replaced JSON values into annotated nodes and manages identity:
//! replacing in place keeps the node's id (per the sync rules), `move`
//! reuses the removed node, and `copy` mints a fresh id only at the copied
//! subtree's root while sharing the descendants with the source.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use jsonedit_json_pointer::{compile_json_pointer, is_child, Path, PathKey};
use jsonedit_util::deep_equal;

use crate::id::IdSource;
use crate::immutable::{delete_in, get_in, set_in, PathError};
use crate::patch::op::{OpMeta, PatchError, PatchOp, TestFailure, TreePatchResult};
use crate::tree::node::{DocNode, NodeContent};
use crate::tree::sync::sync;

/// Apply `ops` to `tree`, strictly in order. Same all-or-nothing contract
/// as the generic engine; on error the original tree comes back untouched.
pub fn apply_patch_tree(
    tree: &Arc<DocNode>,
    ops: &[PatchOp],
    ids: &mut dyn IdSource,
) -> TreePatchResult {
    let mut working = Arc::clone(tree);
    let mut revert: Vec<PatchOp> = Vec::new();
    for op in ops {
        match apply_op_tree(&working, op, ids) {
            Ok((next, mut rev)) => {
                working = next;
                rev.extend(revert);
                revert = rev;
            }
            Err(error) => {
                return TreePatchResult {
                    tree: Arc::clone(tree),
                    revert: Vec::new(),
                    error: Some(error),
                };
            }
        }
    }
    TreePatchResult {
        tree: working,
        revert,
        error: None,
    }
}

type OpOutcome = (Arc<DocNode>, Vec<PatchOp>);

fn apply_op_tree(
    tree: &Arc<DocNode>,
    op: &PatchOp,
    ids: &mut dyn IdSource,
) -> Result<OpOutcome, PatchError> {
    match op {
        PatchOp::Add { path, value, meta } => apply_add(tree, path, value, meta.as_ref(), ids),
        PatchOp::Remove { path } => {
            let (next, removed) = remove_node(tree, path)?;
            Ok((next, vec![removed.into_revert(path)]))
        }
        PatchOp::Replace { path, value } => apply_replace(tree, path, value, ids),
        PatchOp::Copy { path, from, meta } => apply_copy(tree, path, from, meta.as_ref(), ids),
        PatchOp::Move { path, from, meta } => apply_move(tree, path, from, meta.as_ref()),
        PatchOp::Test { path, value } => {
            apply_test(tree, path, value.as_ref())?;
            Ok((Arc::clone(tree), Vec::new()))
        }
    }
}

// ── add / replace ─────────────────────────────────────────────────────────

fn apply_add(
    tree: &Arc<DocNode>,
    path: &[PathKey],
    value: &Value,
    meta: Option<&OpMeta>,
    ids: &mut dyn IdSource,
) -> Result<OpOutcome, PatchError> {
    if path.is_empty() {
        return apply_replace(tree, path, value, ids);
    }
    // Adding over an existing object key replaces in place and keeps the
    // node's identity, exactly like an explicit replace. Array indices are
    // always true insertions.
    let (key, parent_path) = path.split_last().expect("non-empty path");
    if let Some(parent) = get_in(tree, parent_path) {
        if matches!(parent.content, NodeContent::Object(_)) && parent.child(key).is_some() {
            return apply_replace(tree, path, value, ids);
        }
    }
    let node = with_meta_state(sync(value, None, ids), meta);
    let before = meta.and_then(|m| m.before.as_deref());
    let (next, revert) = insert_node(tree, path, node, before)?;
    Ok((next, vec![revert]))
}

fn apply_replace(
    tree: &Arc<DocNode>,
    path: &[PathKey],
    value: &Value,
    ids: &mut dyn IdSource,
) -> Result<OpOutcome, PatchError> {
    let existing = get_in(tree, path)
        .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(path)))?;
    let old = existing.to_value();
    let node = sync(value, Some(existing), ids);
    let next = set_in(tree, path, node)?;
    Ok((next, vec![PatchOp::replace(path.to_vec(), old)]))
}

// ── remove ────────────────────────────────────────────────────────────────

struct RemovedNode {
    node: Arc<DocNode>,
    before: Option<String>,
}

impl RemovedNode {
    fn into_revert(self, path: &[PathKey]) -> PatchOp {
        let meta = OpMeta {
            kind: Some(self.node.kind()),
            before: self.before,
            expanded: self.node.is_container().then_some(self.node.expanded),
        };
        PatchOp::Add {
            path: path.to_vec(),
            value: self.node.to_value(),
            meta: Some(meta),
        }
    }
}

fn remove_node(
    tree: &Arc<DocNode>,
    path: &[PathKey],
) -> Result<(Arc<DocNode>, RemovedNode), PatchError> {
    let Some((key, parent_path)) = path.split_last() else {
        return Err(PatchError::PathNotFound(String::new()));
    };
    let parent = get_in(tree, parent_path)
        .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(parent_path)))?;
    let node = parent
        .child(key)
        .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(path)))?;
    let before = match &parent.content {
        NodeContent::Object(children) => key_after(children, key.as_str().as_ref()),
        _ => None,
    };
    let removed = RemovedNode {
        node: Arc::clone(node),
        before,
    };
    Ok((delete_in(tree, path), removed))
}

// ── copy / move ───────────────────────────────────────────────────────────

fn apply_copy(
    tree: &Arc<DocNode>,
    path: &[PathKey],
    from: &[PathKey],
    meta: Option<&OpMeta>,
    ids: &mut dyn IdSource,
) -> Result<OpOutcome, PatchError> {
    let source = get_in(tree, from)
        .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(from)))?;
    // Fresh id at the copied root only; descendants stay shared with the
    // source, ids included.
    let mut root = (**source).clone();
    root.id = ids.next_id();
    let node = with_meta_state(Arc::new(root), meta);
    let before = meta.and_then(|m| m.before.as_deref());
    let (next, revert) = insert_node(tree, path, node, before)?;
    Ok((next, vec![revert]))
}

fn apply_move(
    tree: &Arc<DocNode>,
    path: &[PathKey],
    from: &[PathKey],
    meta: Option<&OpMeta>,
) -> Result<OpOutcome, PatchError> {
    if is_child(from, path) {
        return Err(PatchError::MoveIntoChild {
            from: compile_json_pointer(from),
            to: compile_json_pointer(path),
        });
    }

    let before_source = from.split_last().and_then(|(key, parent_path)| {
        get_in(tree, parent_path).and_then(|parent| match &parent.content {
            NodeContent::Object(children) => key_after(children, key.as_str().as_ref()),
            _ => None,
        })
    });

    let (removed_tree, removed) = remove_node(tree, from)?;
    // The moved node keeps its identity.
    let node = with_meta_state(removed.node, meta);
    let before = meta.and_then(|m| m.before.as_deref());
    let (next, insert_revert) = insert_node(&removed_tree, path, node, before)?;

    match insert_revert {
        PatchOp::Replace { value: old, .. } => Ok((
            next,
            vec![
                PatchOp::Move {
                    from: path.to_vec(),
                    path: from.to_vec(),
                    meta: None,
                },
                PatchOp::add(path.to_vec(), old),
            ],
        )),
        PatchOp::Remove { path: resolved } => Ok((
            next,
            vec![PatchOp::Move {
                from: resolved,
                path: from.to_vec(),
                meta: before_source.map(OpMeta::before),
            }],
        )),
        other => Err(PatchError::InvalidOp(format!(
            "unexpected insert revert for move: {other:?}"
        ))),
    }
}

// ── test ──────────────────────────────────────────────────────────────────

fn apply_test(
    tree: &Arc<DocNode>,
    path: &[PathKey],
    value: Option<&Value>,
) -> Result<(), PatchError> {
    let expected = value.ok_or(TestFailure::NoValueProvided)?;
    let node = get_in(tree, path)
        .ok_or_else(|| TestFailure::PathNotFound(compile_json_pointer(path)))?;
    if !deep_equal(&node.to_value(), expected) {
        return Err(TestFailure::ValueMismatch(compile_json_pointer(path)).into());
    }
    Ok(())
}

// ── insertion helpers ─────────────────────────────────────────────────────

/// Place a prebuilt node at `path`, replacing an existing object value or
/// inserting a new child (`before` positions new object properties).
/// Returns the new tree and the op that reverts the insertion.
fn insert_node(
    tree: &Arc<DocNode>,
    path: &[PathKey],
    node: Arc<DocNode>,
    before: Option<&str>,
) -> Result<(Arc<DocNode>, PatchOp), PatchError> {
    if path.is_empty() {
        let old = tree.to_value();
        return Ok((node, PatchOp::replace(Vec::new(), old)));
    }
    let (key, parent_path) = path.split_last().expect("non-empty path");
    let parent = get_in(tree, parent_path)
        .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(parent_path)))?;
    match &parent.content {
        NodeContent::Object(children) => {
            let name = key.as_str().into_owned();
            if let Some(existing) = children.get(&name) {
                let old = existing.to_value();
                let next = set_in(tree, path, node)?;
                return Ok((next, PatchOp::replace(path.to_vec(), old)));
            }
            let mut next_children = children.clone();
            match before.and_then(|b| next_children.get_index_of(b)) {
                Some(position) => {
                    next_children.shift_insert(position, name, node);
                }
                None => {
                    next_children.insert(name, node);
                }
            }
            let next = set_in(
                tree,
                parent_path,
                Arc::new(parent.with_object_children(next_children)),
            )?;
            Ok((next, PatchOp::remove(path.to_vec())))
        }
        NodeContent::Array(children) => {
            let index = if key.is_append() {
                children.len()
            } else {
                key.array_index()
                    .filter(|i| *i <= children.len())
                    .ok_or_else(|| PatchError::InvalidIndex(compile_json_pointer(path)))?
            };
            let mut next_children = children.clone();
            next_children.insert(index, node);
            let next = set_in(
                tree,
                parent_path,
                Arc::new(parent.with_array_children(next_children)),
            )?;
            let mut resolved: Path = parent_path.to_vec();
            resolved.push(PathKey::Index(index));
            Ok((next, PatchOp::remove(resolved)))
        }
        NodeContent::Value(_) => {
            Err(PathError::NotAContainer(compile_json_pointer(parent_path)).into())
        }
    }
}

/// Restore captured node state (the expand flag) onto a rebuilt node.
fn with_meta_state(node: Arc<DocNode>, meta: Option<&OpMeta>) -> Arc<DocNode> {
    let Some(expanded) = meta.and_then(|m| m.expanded) else {
        return node;
    };
    if !node.is_container() || node.expanded == expanded {
        return node;
    }
    let mut next = (*node).clone();
    next.expanded = expanded;
    Arc::new(next)
}

fn key_after(children: &IndexMap<String, Arc<DocNode>>, name: &str) -> Option<String> {
    let index = children.get_index_of(name)?;
    children.get_index(index + 1).map(|(key, _)| key.clone())
}
