//! Selection model and range resolution.
//!
//! A selection is either a point marker (a caret after a node, or before
//! the children of a container) or a two-endpoint range. The resolver
//! turns the two endpoints into a concrete ordered index span over the
//! shared parent's children, which duplicate/cut/copy/paste operate on.

use std::sync::Arc;

use jsonedit_json_pointer::{common_prefix, Path, PathKey};

use crate::immutable::{get_in, map_nodes, update_in};
use crate::tree::node::{DocNode, SelectionFlags};

/// The user's selection inside the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Caret sitting after the node at the path.
    After(Path),
    /// Caret sitting inside a container, before its children.
    Inside(Path),
    /// Multi-selection anchored by two endpoint paths sharing a parent.
    Range { start: Path, end: Path },
}

impl Selection {
    pub fn single(path: Path) -> Self {
        Selection::Range {
            start: path.clone(),
            end: path,
        }
    }
}

/// A resolved range: the shared parent, the inclusive child-index span,
/// and the concrete child paths inside it, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRange {
    pub parent: Path,
    pub min_index: usize,
    pub max_index: usize,
    pub paths: Vec<Path>,
}

/// Resolve two endpoint paths to their shared parent and index span.
///
/// The parent is the longest common prefix of the endpoints, trimmed by
/// one segment when both endpoints address the same node. The span covers
/// both endpoints regardless of the order they were given in. Returns
/// `None` when an endpoint does not resolve to a child of the parent
/// (including a selected root, which has no parent).
pub fn resolve_range(
    tree: &Arc<DocNode>,
    start: &[PathKey],
    end: &[PathKey],
) -> Option<SelectionRange> {
    let mut shared = common_prefix(start, end);
    if shared.len() == start.len() && shared.len() == end.len() {
        if shared.is_empty() {
            return None;
        }
        shared = &shared[..shared.len() - 1];
    }
    let parent = get_in(tree, shared)?;
    let start_index = endpoint_index(parent, shared.len(), start)?;
    let end_index = endpoint_index(parent, shared.len(), end)?;
    let (min_index, max_index) = if start_index <= end_index {
        (start_index, end_index)
    } else {
        (end_index, start_index)
    };

    let mut paths = Vec::with_capacity(max_index - min_index + 1);
    for index in min_index..=max_index {
        let mut path = shared.to_vec();
        path.push(parent.key_at(index)?);
        paths.push(path);
    }
    Some(SelectionRange {
        parent: shared.to_vec(),
        min_index,
        max_index,
        paths,
    })
}

fn endpoint_index(parent: &Arc<DocNode>, depth: usize, endpoint: &[PathKey]) -> Option<usize> {
    parent.child_index(endpoint.get(depth)?)
}

// ── Stamping ──────────────────────────────────────────────────────────────

/// Stamp selection flags for `selection` onto the tree. Existing flags are
/// left in place; call [`clear_selection`] first to replace a selection.
pub fn apply_selection(tree: &Arc<DocNode>, selection: &Selection) -> Arc<DocNode> {
    match selection {
        Selection::After(path) => stamp(tree, path, SelectionFlags::AFTER),
        Selection::Inside(path) => stamp(tree, path, SelectionFlags::BEFORE_CHILDREN),
        Selection::Range { start, end } => {
            let Some(range) = resolve_range(tree, start, end) else {
                return Arc::clone(tree);
            };
            let start_index = endpoint_index(
                get_in(tree, &range.parent).expect("range parent resolved"),
                range.parent.len(),
                start,
            );
            let mut current = Arc::clone(tree);
            for (offset, path) in range.paths.iter().enumerate() {
                let index = range.min_index + offset;
                let mut flags = SelectionFlags::SELECTED;
                if index == range.min_index {
                    flags |= SelectionFlags::FIRST;
                }
                if index == range.max_index {
                    flags |= SelectionFlags::LAST;
                }
                let is_start = start_index == Some(index);
                let is_boundary = index == range.min_index || index == range.max_index;
                if is_start {
                    flags |= SelectionFlags::START;
                }
                // with distinct endpoints the non-start boundary is the end
                if is_boundary && (range.min_index == range.max_index || !is_start) {
                    flags |= SelectionFlags::END;
                }
                if !is_boundary {
                    flags |= SelectionFlags::INSIDE;
                }
                current = stamp(&current, path, flags);
            }
            current
        }
    }
}

/// Remove every selection flag from the tree, sharing untouched subtrees.
pub fn clear_selection(tree: &Arc<DocNode>) -> Arc<DocNode> {
    map_nodes(tree, &mut |_, node| {
        if node.selection.is_empty() {
            return Arc::clone(node);
        }
        let mut next = (**node).clone();
        next.selection = SelectionFlags::empty();
        Arc::new(next)
    })
}

fn stamp(tree: &Arc<DocNode>, path: &[PathKey], flags: SelectionFlags) -> Arc<DocNode> {
    update_in(tree, path, |node| {
        if node.selection.contains(flags) {
            return Arc::clone(node);
        }
        let mut next = (**node).clone();
        next.selection |= flags;
        Arc::new(next)
    })
    .unwrap_or_else(|_| Arc::clone(tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;
    use crate::tree::sync::build;
    use jsonedit_json_pointer::parse_json_pointer;
    use serde_json::json;

    fn p(s: &str) -> Path {
        parse_json_pointer(s)
    }

    fn setup(doc: serde_json::Value) -> Arc<DocNode> {
        let mut ids = SequentialIds::new();
        build(&doc, &mut ids)
    }

    #[test]
    fn resolves_object_range_in_property_order() {
        let tree = setup(json!({"a": 1, "b": 2, "c": 3, "d": 4}));
        let range = resolve_range(&tree, &p("/c"), &p("/b")).unwrap();
        assert_eq!(range.parent, p(""));
        assert_eq!((range.min_index, range.max_index), (1, 2));
        assert_eq!(range.paths, vec![p("/b"), p("/c")]);
    }

    #[test]
    fn resolves_array_range_regardless_of_endpoint_order() {
        let tree = setup(json!([10, 20, 30, 40]));
        let range = resolve_range(&tree, &p("/3"), &p("/1")).unwrap();
        assert_eq!((range.min_index, range.max_index), (1, 3));
        assert_eq!(range.paths, vec![p("/1"), p("/2"), p("/3")]);
    }

    #[test]
    fn equal_endpoints_trim_to_parent() {
        let tree = setup(json!({"a": {"x": 1, "y": 2}}));
        let range = resolve_range(&tree, &p("/a/y"), &p("/a/y")).unwrap();
        assert_eq!(range.parent, p("/a"));
        assert_eq!(range.paths, vec![p("/a/y")]);
    }

    #[test]
    fn deep_endpoints_resolve_to_shared_parent_children() {
        let tree = setup(json!({"a": {"x": 1}, "b": {"y": 2}, "c": 3}));
        let range = resolve_range(&tree, &p("/a/x"), &p("/b/y")).unwrap();
        assert_eq!(range.parent, p(""));
        assert_eq!(range.paths, vec![p("/a"), p("/b")]);
    }

    #[test]
    fn root_selection_does_not_resolve() {
        let tree = setup(json!({"a": 1}));
        assert!(resolve_range(&tree, &p(""), &p("")).is_none());
        assert!(resolve_range(&tree, &p("/zz"), &p("/a")).is_none());
    }

    #[test]
    fn range_stamps_boundaries_and_inside() {
        let tree = setup(json!([0, 1, 2, 3]));
        let selection = Selection::Range {
            start: p("/3"),
            end: p("/1"),
        };
        let stamped = apply_selection(&tree, &selection);

        let flags_at = |ptr: &str| get_in(&stamped, &p(ptr)).unwrap().selection;
        assert!(flags_at("/1").contains(SelectionFlags::SELECTED | SelectionFlags::FIRST | SelectionFlags::END));
        assert!(flags_at("/2").contains(SelectionFlags::SELECTED | SelectionFlags::INSIDE));
        assert!(flags_at("/3").contains(SelectionFlags::SELECTED | SelectionFlags::LAST | SelectionFlags::START));
        assert!(flags_at("/0").is_empty());
    }

    #[test]
    fn point_markers_stamp_single_nodes() {
        let tree = setup(json!({"a": {"x": 1}}));
        let stamped = apply_selection(&tree, &Selection::After(p("/a/x")));
        assert!(get_in(&stamped, &p("/a/x"))
            .unwrap()
            .selection
            .contains(SelectionFlags::AFTER));

        let stamped = apply_selection(&stamped, &Selection::Inside(p("/a")));
        assert!(get_in(&stamped, &p("/a"))
            .unwrap()
            .selection
            .contains(SelectionFlags::BEFORE_CHILDREN));
    }

    #[test]
    fn clear_selection_resets_all_flags() {
        let tree = setup(json!([0, 1, 2]));
        let stamped = apply_selection(&tree, &Selection::single(p("/1")));
        let cleared = clear_selection(&stamped);
        for ptr in ["/0", "/1", "/2"] {
            assert!(get_in(&cleared, &p(ptr)).unwrap().selection.is_empty());
        }
        // clearing an unstamped tree is the identity
        let same = clear_selection(&cleared);
        assert!(Arc::ptr_eq(&same, &cleared));
    }
}
