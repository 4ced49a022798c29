//! Expand/collapse state operations.

use std::sync::Arc;

use jsonedit_json_pointer::PathKey;

use crate::immutable::{get_in, update_in};
use crate::tree::node::{DocNode, NodeContent};

/// Apply an expand predicate to every container node. `Some(flag)` sets
/// the node's expand state, `None` leaves it alone. Untouched subtrees are
/// shared.
pub fn expand_by(
    tree: &Arc<DocNode>,
    predicate: &dyn Fn(&[PathKey]) -> Option<bool>,
) -> Arc<DocNode> {
    let mut path = Vec::new();
    expand_at(tree, predicate, &mut path)
}

fn expand_at(
    node: &Arc<DocNode>,
    predicate: &dyn Fn(&[PathKey]) -> Option<bool>,
    path: &mut Vec<PathKey>,
) -> Arc<DocNode> {
    match &node.content {
        NodeContent::Value(_) => Arc::clone(node),
        NodeContent::Array(children) => {
            let mut changed = false;
            let mut next = Vec::with_capacity(children.len());
            for (index, child) in children.iter().enumerate() {
                path.push(PathKey::Index(index));
                let mapped = expand_at(child, predicate, path);
                path.pop();
                if !Arc::ptr_eq(&mapped, child) {
                    changed = true;
                }
                next.push(mapped);
            }
            let expanded = predicate(path).unwrap_or(node.expanded);
            if !changed && expanded == node.expanded {
                return Arc::clone(node);
            }
            let mut rebuilt = node.with_array_children(next);
            rebuilt.expanded = expanded;
            Arc::new(rebuilt)
        }
        NodeContent::Object(children) => {
            let mut changed = false;
            let mut next = indexmap::IndexMap::with_capacity(children.len());
            for (name, child) in children {
                path.push(PathKey::Name(name.clone()));
                let mapped = expand_at(child, predicate, path);
                path.pop();
                if !Arc::ptr_eq(&mapped, child) {
                    changed = true;
                }
                next.insert(name.clone(), mapped);
            }
            let expanded = predicate(path).unwrap_or(node.expanded);
            if !changed && expanded == node.expanded {
                return Arc::clone(node);
            }
            let mut rebuilt = node.with_object_children(next);
            rebuilt.expanded = expanded;
            Arc::new(rebuilt)
        }
    }
}

/// Set the expand state of the single container at `path`. Missing paths
/// and leaves are a no-op.
pub fn expand_one(tree: &Arc<DocNode>, path: &[PathKey], expanded: bool) -> Arc<DocNode> {
    update_in(tree, path, |node| {
        if !node.is_container() || node.expanded == expanded {
            return Arc::clone(node);
        }
        let mut next = (**node).clone();
        next.expanded = expanded;
        Arc::new(next)
    })
    .unwrap_or_else(|_| Arc::clone(tree))
}

/// Set the expand state of every container along `path`, the target
/// included, so the target becomes visible.
pub fn expand_path(tree: &Arc<DocNode>, path: &[PathKey], expanded: bool) -> Arc<DocNode> {
    let mut current = Arc::clone(tree);
    for len in 0..=path.len() {
        current = expand_one(&current, &path[..len], expanded);
    }
    current
}

/// Expand state of the node at `path`; false for leaves and missing paths.
pub fn is_expanded(tree: &Arc<DocNode>, path: &[PathKey]) -> bool {
    get_in(tree, path).map(|node| node.expanded).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;
    use crate::tree::sync::build;
    use jsonedit_json_pointer::parse_json_pointer;
    use serde_json::json;

    #[test]
    fn expand_one_toggles_containers_only() {
        let mut ids = SequentialIds::new();
        let tree = build(&json!({"a": {"b": 1}}), &mut ids);

        let opened = expand_one(&tree, &parse_json_pointer("/a"), true);
        assert!(is_expanded(&opened, &parse_json_pointer("/a")));

        // a leaf path is a no-op
        let same = expand_one(&opened, &parse_json_pointer("/a/b"), true);
        assert!(Arc::ptr_eq(&same, &opened));
        // missing path is a no-op
        let same = expand_one(&opened, &parse_json_pointer("/zz"), true);
        assert!(Arc::ptr_eq(&same, &opened));
    }

    #[test]
    fn expand_one_is_identity_when_already_set() {
        let mut ids = SequentialIds::new();
        let tree = build(&json!({"a": {}}), &mut ids);
        let same = expand_one(&tree, &parse_json_pointer("/a"), false);
        assert!(Arc::ptr_eq(&same, &tree));
    }

    #[test]
    fn expand_path_opens_ancestors() {
        let mut ids = SequentialIds::new();
        let tree = build(&json!({"a": {"b": {"c": 1}}}), &mut ids);
        let opened = expand_path(&tree, &parse_json_pointer("/a/b"), true);
        assert!(is_expanded(&opened, &[]));
        assert!(is_expanded(&opened, &parse_json_pointer("/a")));
        assert!(is_expanded(&opened, &parse_json_pointer("/a/b")));
    }

    #[test]
    fn expand_by_predicate() {
        let mut ids = SequentialIds::new();
        let tree = build(&json!({"a": {"b": {}}, "c": []}), &mut ids);

        // expand everything below the root, leave the root alone
        let opened = expand_by(&tree, &|path| {
            if path.is_empty() {
                None
            } else {
                Some(true)
            }
        });
        assert!(!is_expanded(&opened, &[]));
        assert!(is_expanded(&opened, &parse_json_pointer("/a")));
        assert!(is_expanded(&opened, &parse_json_pointer("/a/b")));
        assert!(is_expanded(&opened, &parse_json_pointer("/c")));

        // a predicate that changes nothing returns the same tree
        let same = expand_by(&opened, &|_| None);
        assert!(Arc::ptr_eq(&same, &opened));
    }
}
