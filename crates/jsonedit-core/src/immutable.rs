//! Structural-sharing update helpers over the annotated tree.
//!
//! Every operation returns a new root and leaves its input untouched;
//! ancestors of a change are shallow-cloned, everything else is shared.
//! When an operation turns out to change nothing, the original `Arc` comes
//! back unchanged (observable with `Arc::ptr_eq`), propagated bottom-up.

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use jsonedit_json_pointer::{compile_json_pointer, PathKey};

use crate::tree::node::{DocNode, NodeContent};

/// Failures of the low-level helpers. Stepping through a leaf or past the
/// end of an array with `set_in`/`update_in`/`insert_at` is a programmer
/// error of the caller; the read-side helpers no-op instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path does not exist: '{0}'")]
    PathDoesNotExist(String),
    #[error("cannot step into a value node at '{0}'")]
    NotAContainer(String),
    #[error("expected an array at '{0}'")]
    NotAnArray(String),
    #[error("index {index} out of bounds at '{pointer}'")]
    IndexOutOfBounds { pointer: String, index: usize },
}

fn pointer_of(path: &[PathKey], len: usize) -> String {
    compile_json_pointer(&path[..len])
}

/// Resolve `path` to a node, or `None` when any step is absent or goes
/// through a leaf.
pub fn get_in<'a>(node: &'a Arc<DocNode>, path: &[PathKey]) -> Option<&'a Arc<DocNode>> {
    let mut current = node;
    for key in path {
        current = current.child(key)?;
    }
    Some(current)
}

/// True when `path` resolves; the root always exists.
pub fn exists_in(node: &Arc<DocNode>, path: &[PathKey]) -> bool {
    get_in(node, path).is_some()
}

/// Place `new` at `path`, creating a missing final object key or appending
/// at a final array index equal to the length. Returns the original root
/// when `new` is pointer-identical to what is already there.
pub fn set_in(
    node: &Arc<DocNode>,
    path: &[PathKey],
    new: Arc<DocNode>,
) -> Result<Arc<DocNode>, PathError> {
    set_in_at(node, path, 0, new)
}

fn set_in_at(
    node: &Arc<DocNode>,
    path: &[PathKey],
    depth: usize,
    new: Arc<DocNode>,
) -> Result<Arc<DocNode>, PathError> {
    if depth == path.len() {
        if Arc::ptr_eq(node, &new) {
            return Ok(Arc::clone(node));
        }
        return Ok(new);
    }
    let key = &path[depth];
    let last = depth + 1 == path.len();
    match &node.content {
        NodeContent::Array(children) => {
            let index = key
                .array_index()
                .ok_or_else(|| PathError::PathDoesNotExist(pointer_of(path, depth + 1)))?;
            if index < children.len() {
                let child = set_in_at(&children[index], path, depth + 1, new)?;
                if Arc::ptr_eq(&child, &children[index]) {
                    return Ok(Arc::clone(node));
                }
                let mut next = children.clone();
                next[index] = child;
                Ok(Arc::new(node.with_array_children(next)))
            } else if last && index == children.len() {
                let mut next = children.clone();
                next.push(new);
                Ok(Arc::new(node.with_array_children(next)))
            } else {
                Err(PathError::PathDoesNotExist(pointer_of(path, depth + 1)))
            }
        }
        NodeContent::Object(children) => {
            let name = key.as_str();
            match children.get(name.as_ref()) {
                Some(existing) => {
                    let child = set_in_at(existing, path, depth + 1, new)?;
                    if Arc::ptr_eq(&child, existing) {
                        return Ok(Arc::clone(node));
                    }
                    let mut next = children.clone();
                    next.insert(name.into_owned(), child);
                    Ok(Arc::new(node.with_object_children(next)))
                }
                None if last => {
                    let mut next = children.clone();
                    next.insert(name.into_owned(), new);
                    Ok(Arc::new(node.with_object_children(next)))
                }
                None => Err(PathError::PathDoesNotExist(pointer_of(path, depth + 1))),
            }
        }
        NodeContent::Value(_) => Err(PathError::NotAContainer(pointer_of(path, depth))),
    }
}

/// Replace the node at `path` with `f(old)`, sharing unchanged ancestors.
/// The path must exist.
pub fn update_in(
    node: &Arc<DocNode>,
    path: &[PathKey],
    f: impl FnOnce(&Arc<DocNode>) -> Arc<DocNode>,
) -> Result<Arc<DocNode>, PathError> {
    let old = get_in(node, path)
        .ok_or_else(|| PathError::PathDoesNotExist(compile_json_pointer(path)))?;
    let new = f(old);
    if Arc::ptr_eq(&new, old) {
        return Ok(Arc::clone(node));
    }
    set_in(node, path, new)
}

/// Remove the node at `path`. A path that does not resolve, or the root
/// path, is a no-op returning the original root.
pub fn delete_in(node: &Arc<DocNode>, path: &[PathKey]) -> Arc<DocNode> {
    if path.is_empty() {
        return Arc::clone(node);
    }
    delete_in_at(node, path, 0)
}

fn delete_in_at(node: &Arc<DocNode>, path: &[PathKey], depth: usize) -> Arc<DocNode> {
    let key = &path[depth];
    let last = depth + 1 == path.len();
    match &node.content {
        NodeContent::Array(children) => {
            let Some(index) = key.array_index().filter(|i| *i < children.len()) else {
                return Arc::clone(node);
            };
            if last {
                let mut next = children.clone();
                next.remove(index);
                Arc::new(node.with_array_children(next))
            } else {
                let child = delete_in_at(&children[index], path, depth + 1);
                if Arc::ptr_eq(&child, &children[index]) {
                    return Arc::clone(node);
                }
                let mut next = children.clone();
                next[index] = child;
                Arc::new(node.with_array_children(next))
            }
        }
        NodeContent::Object(children) => {
            let name = key.as_str();
            let Some(existing) = children.get(name.as_ref()) else {
                return Arc::clone(node);
            };
            if last {
                let mut next = children.clone();
                next.shift_remove(name.as_ref());
                Arc::new(node.with_object_children(next))
            } else {
                let child = delete_in_at(existing, path, depth + 1);
                if Arc::ptr_eq(&child, existing) {
                    return Arc::clone(node);
                }
                let mut next = children.clone();
                next.insert(name.into_owned(), child);
                Arc::new(node.with_object_children(next))
            }
        }
        NodeContent::Value(_) => Arc::clone(node),
    }
}

/// Splice `new` into the array addressed by `path`'s parent, at `path`'s
/// trailing index (which may equal the current length).
pub fn insert_at(
    node: &Arc<DocNode>,
    path: &[PathKey],
    new: Arc<DocNode>,
) -> Result<Arc<DocNode>, PathError> {
    let (parent_path, key) = path
        .split_last()
        .map(|(key, parent)| (parent, key))
        .ok_or_else(|| PathError::PathDoesNotExist(String::new()))?;
    let parent = get_in(node, parent_path)
        .ok_or_else(|| PathError::PathDoesNotExist(compile_json_pointer(parent_path)))?;
    let NodeContent::Array(children) = &parent.content else {
        return Err(PathError::NotAnArray(compile_json_pointer(parent_path)));
    };
    let index = key
        .array_index()
        .ok_or_else(|| PathError::NotAnArray(compile_json_pointer(path)))?;
    if index > children.len() {
        return Err(PathError::IndexOutOfBounds {
            pointer: compile_json_pointer(parent_path),
            index,
        });
    }
    let mut next = children.clone();
    next.insert(index, new);
    let replacement = Arc::new(parent.with_array_children(next));
    set_in(node, parent_path, replacement)
}

/// Recursive bottom-up map. `f` sees every node with its path; returning a
/// different node replaces that subtree (its children are not visited),
/// returning the same `Arc` recurses. Ancestors are cloned only when a
/// descendant actually changed.
pub fn transform(
    node: &Arc<DocNode>,
    f: &mut dyn FnMut(&[PathKey], &Arc<DocNode>) -> Arc<DocNode>,
) -> Arc<DocNode> {
    let mut path = Vec::new();
    transform_at(node, f, &mut path)
}

fn transform_at(
    node: &Arc<DocNode>,
    f: &mut dyn FnMut(&[PathKey], &Arc<DocNode>) -> Arc<DocNode>,
    path: &mut Vec<PathKey>,
) -> Arc<DocNode> {
    let replaced = f(path, node);
    if !Arc::ptr_eq(&replaced, node) {
        return replaced;
    }
    match &node.content {
        NodeContent::Value(_) => Arc::clone(node),
        NodeContent::Array(children) => {
            let mut changed = false;
            let mut next = Vec::with_capacity(children.len());
            for (index, child) in children.iter().enumerate() {
                path.push(PathKey::Index(index));
                let mapped = transform_at(child, f, path);
                path.pop();
                if !Arc::ptr_eq(&mapped, child) {
                    changed = true;
                }
                next.push(mapped);
            }
            if changed {
                Arc::new(node.with_array_children(next))
            } else {
                Arc::clone(node)
            }
        }
        NodeContent::Object(children) => {
            let mut changed = false;
            let mut next = IndexMap::with_capacity(children.len());
            for (name, child) in children {
                path.push(PathKey::Name(name.clone()));
                let mapped = transform_at(child, f, path);
                path.pop();
                if !Arc::ptr_eq(&mapped, child) {
                    changed = true;
                }
                next.insert(name.clone(), mapped);
            }
            if changed {
                Arc::new(node.with_object_children(next))
            } else {
                Arc::clone(node)
            }
        }
    }
}

/// Bottom-up counterpart of [`transform`]: children are mapped first, then
/// `f` sees every (possibly rebuilt) node. Used by annotation passes that
/// must visit a node and its descendants in one sweep.
pub(crate) fn map_nodes(
    node: &Arc<DocNode>,
    f: &mut dyn FnMut(&[PathKey], &Arc<DocNode>) -> Arc<DocNode>,
) -> Arc<DocNode> {
    let mut path = Vec::new();
    map_nodes_at(node, f, &mut path)
}

fn map_nodes_at(
    node: &Arc<DocNode>,
    f: &mut dyn FnMut(&[PathKey], &Arc<DocNode>) -> Arc<DocNode>,
    path: &mut Vec<PathKey>,
) -> Arc<DocNode> {
    let rebuilt = match &node.content {
        NodeContent::Value(_) => Arc::clone(node),
        NodeContent::Array(children) => {
            let mut changed = false;
            let mut next = Vec::with_capacity(children.len());
            for (index, child) in children.iter().enumerate() {
                path.push(PathKey::Index(index));
                let mapped = map_nodes_at(child, f, path);
                path.pop();
                if !Arc::ptr_eq(&mapped, child) {
                    changed = true;
                }
                next.push(mapped);
            }
            if changed {
                Arc::new(node.with_array_children(next))
            } else {
                Arc::clone(node)
            }
        }
        NodeContent::Object(children) => {
            let mut changed = false;
            let mut next = IndexMap::with_capacity(children.len());
            for (name, child) in children {
                path.push(PathKey::Name(name.clone()));
                let mapped = map_nodes_at(child, f, path);
                path.pop();
                if !Arc::ptr_eq(&mapped, child) {
                    changed = true;
                }
                next.insert(name.clone(), mapped);
            }
            if changed {
                Arc::new(node.with_object_children(next))
            } else {
                Arc::clone(node)
            }
        }
    };
    f(path, &rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{IdSource, SequentialIds};
    use crate::tree::sync::build;
    use jsonedit_json_pointer::parse_json_pointer;
    use serde_json::json;

    fn tree(doc: serde_json::Value) -> (Arc<DocNode>, SequentialIds) {
        let mut ids = SequentialIds::new();
        let tree = build(&doc, &mut ids);
        (tree, ids)
    }

    #[test]
    fn get_in_resolves() {
        let (root, _) = tree(json!({"a": {"b": [1, 2]}}));
        let node = get_in(&root, &parse_json_pointer("/a/b/1")).unwrap();
        assert_eq!(node.value(), Some(&json!(2)));
        assert!(get_in(&root, &parse_json_pointer("/a/c")).is_none());
        assert!(get_in(&root, &parse_json_pointer("/a/b/1/x")).is_none());
    }

    #[test]
    fn set_in_shares_untouched_branches() {
        let (root, mut ids) = tree(json!({"a": {"x": 1}, "b": {"y": 2}}));
        let leaf = Arc::new(DocNode::leaf(ids.next_id(), json!(99)));
        let updated = set_in(&root, &parse_json_pointer("/a/x"), leaf).unwrap();

        assert_eq!(updated.to_value(), json!({"a": {"x": 99}, "b": {"y": 2}}));
        let old_b = get_in(&root, &parse_json_pointer("/b")).unwrap();
        let new_b = get_in(&updated, &parse_json_pointer("/b")).unwrap();
        assert!(Arc::ptr_eq(old_b, new_b));
    }

    #[test]
    fn set_in_same_reference_is_identity() {
        let (root, _) = tree(json!({"a": 1}));
        let existing = Arc::clone(get_in(&root, &parse_json_pointer("/a")).unwrap());
        let updated = set_in(&root, &parse_json_pointer("/a"), existing).unwrap();
        assert!(Arc::ptr_eq(&updated, &root));
    }

    #[test]
    fn set_in_through_leaf_fails() {
        let (root, mut ids) = tree(json!({"a": 1}));
        let leaf = Arc::new(DocNode::leaf(ids.next_id(), json!(2)));
        let err = set_in(&root, &parse_json_pointer("/a/b"), leaf).unwrap_err();
        assert_eq!(err, PathError::NotAContainer("/a".to_string()));
    }

    #[test]
    fn set_in_appends_new_object_key() {
        let (root, mut ids) = tree(json!({"a": 1}));
        let leaf = Arc::new(DocNode::leaf(ids.next_id(), json!(2)));
        let updated = set_in(&root, &parse_json_pointer("/b"), leaf).unwrap();
        assert_eq!(updated.to_value(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn update_in_missing_path_fails() {
        let (root, _) = tree(json!({"a": 1}));
        let err = update_in(&root, &parse_json_pointer("/zz"), Arc::clone).unwrap_err();
        assert_eq!(err, PathError::PathDoesNotExist("/zz".to_string()));
    }

    #[test]
    fn delete_in_removes_and_noops() {
        let (root, _) = tree(json!({"a": [1, 2, 3], "b": 2}));
        let removed = delete_in(&root, &parse_json_pointer("/a/1"));
        assert_eq!(removed.to_value(), json!({"a": [1, 3], "b": 2}));

        let untouched = delete_in(&root, &parse_json_pointer("/zz/1"));
        assert!(Arc::ptr_eq(&untouched, &root));
        let through_leaf = delete_in(&root, &parse_json_pointer("/b/c"));
        assert!(Arc::ptr_eq(&through_leaf, &root));
    }

    #[test]
    fn insert_at_splices_arrays_only() {
        let (root, mut ids) = tree(json!({"a": [1, 3], "o": {}}));
        let leaf = Arc::new(DocNode::leaf(ids.next_id(), json!(2)));
        let updated = insert_at(&root, &parse_json_pointer("/a/1"), leaf).unwrap();
        assert_eq!(updated.to_value(), json!({"a": [1, 2, 3], "o": {}}));

        let leaf = Arc::new(DocNode::leaf(ids.next_id(), json!(0)));
        let err = insert_at(&root, &parse_json_pointer("/o/0"), leaf).unwrap_err();
        assert_eq!(err, PathError::NotAnArray("/o".to_string()));

        let leaf = Arc::new(DocNode::leaf(ids.next_id(), json!(0)));
        let err = insert_at(&root, &parse_json_pointer("/a/9"), leaf).unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfBounds { index: 9, .. }));
    }

    #[test]
    fn exists_in_root() {
        let (root, _) = tree(json!(null));
        assert!(exists_in(&root, &[]));
    }

    #[test]
    fn transform_shares_unchanged() {
        let (root, _) = tree(json!({"a": {"x": 1}, "b": {"y": 2}}));
        // identity transform returns the very same root
        let same = transform(&root, &mut |_, node| Arc::clone(node));
        assert!(Arc::ptr_eq(&same, &root));

        // rewriting one leaf clones its ancestors only
        let rewritten = transform(&root, &mut |path, node| {
            if path == parse_json_pointer("/a/x") {
                Arc::new(DocNode::leaf(node.id, json!(42)))
            } else {
                Arc::clone(node)
            }
        });
        assert_eq!(rewritten.to_value(), json!({"a": {"x": 42}, "b": {"y": 2}}));
        let old_b = get_in(&root, &parse_json_pointer("/b")).unwrap();
        let new_b = get_in(&rewritten, &parse_json_pointer("/b")).unwrap();
        assert!(Arc::ptr_eq(old_b, new_b));
    }
}
