//! Tree synchronization: rebuild an annotated tree from a new JSON value
//! while reusing unchanged subtrees of the previous tree by reference.
//!
//! Identity rules:
//! - container ids and expand flags follow the position/key, not the
//!   content, as long as the kind (array vs object) is unchanged;
//! - leaf ids survive value changes while the kind stays `value`;
//! - any kind change mints a fresh id and collapses the node;
//! - a subtree in which nothing changed comes back as the same `Arc`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::id::IdSource;
use crate::tree::node::{DocNode, NodeContent, NodeKind};

/// Build a fresh annotated tree for `json`.
pub fn build(json: &Value, ids: &mut dyn IdSource) -> Arc<DocNode> {
    sync(json, None, ids)
}

/// Synchronize `json` against a previously built tree.
///
/// Returns `previous` itself (same `Arc`) whenever the value under it is
/// unchanged; otherwise a new node reusing ids and expand state per the
/// rules above. `previous` is never mutated.
pub fn sync(json: &Value, previous: Option<&Arc<DocNode>>, ids: &mut dyn IdSource) -> Arc<DocNode> {
    match json {
        Value::Array(items) => sync_array(items, previous, ids),
        Value::Object(props) => sync_object(props, previous, ids),
        leaf => sync_leaf(leaf, previous, ids),
    }
}

fn sync_array(
    items: &[Value],
    previous: Option<&Arc<DocNode>>,
    ids: &mut dyn IdSource,
) -> Arc<DocNode> {
    let prev_same = previous.filter(|node| node.kind() == NodeKind::Array);
    let prev_children = prev_same.map(|node| match &node.content {
        NodeContent::Array(children) => children,
        _ => unreachable!("kind checked above"),
    });

    let mut changed = match prev_children {
        Some(children) => children.len() != items.len(),
        None => true,
    };
    let mut children = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let prev_child = prev_children.and_then(|c| c.get(index));
        let child = sync(item, prev_child, ids);
        if let Some(prev_child) = prev_child {
            if !Arc::ptr_eq(&child, prev_child) {
                changed = true;
            }
        }
        children.push(child);
    }

    if !changed {
        // prev_same is present whenever nothing changed
        return Arc::clone(prev_same.expect("unchanged array implies a previous array node"));
    }

    let node = match prev_same {
        Some(prev) => {
            let mut node = DocNode::array(prev.id, children);
            node.expanded = prev.expanded;
            node
        }
        None => DocNode::array(ids.next_id(), children),
    };
    Arc::new(node)
}

fn sync_object(
    props: &serde_json::Map<String, Value>,
    previous: Option<&Arc<DocNode>>,
    ids: &mut dyn IdSource,
) -> Arc<DocNode> {
    let prev_same = previous.filter(|node| node.kind() == NodeKind::Object);
    let prev_children = prev_same.map(|node| match &node.content {
        NodeContent::Object(children) => children,
        _ => unreachable!("kind checked above"),
    });

    let mut changed = match prev_children {
        Some(children) => children.len() != props.len(),
        None => true,
    };
    let mut children = IndexMap::with_capacity(props.len());
    for (position, (name, value)) in props.iter().enumerate() {
        // Children match up by name, so ids survive property reordering;
        // the reorder itself still counts as a change to the container.
        let prev_child = prev_children.and_then(|c| c.get(name));
        if let Some(prev_children) = prev_children {
            match prev_children.get_index(position) {
                Some((prev_name, _)) if prev_name == name => {}
                _ => changed = true,
            }
        }
        let child = sync(value, prev_child, ids);
        if let Some(prev_child) = prev_child {
            if !Arc::ptr_eq(&child, prev_child) {
                changed = true;
            }
        } else {
            changed = true;
        }
        children.insert(name.clone(), child);
    }

    if !changed {
        return Arc::clone(prev_same.expect("unchanged object implies a previous object node"));
    }

    let node = match prev_same {
        Some(prev) => {
            let mut node = DocNode::object(prev.id, children);
            node.expanded = prev.expanded;
            node
        }
        None => DocNode::object(ids.next_id(), children),
    };
    Arc::new(node)
}

fn sync_leaf(
    value: &Value,
    previous: Option<&Arc<DocNode>>,
    ids: &mut dyn IdSource,
) -> Arc<DocNode> {
    let prev_same = previous.filter(|node| node.kind() == NodeKind::Value);
    if let Some(prev) = prev_same {
        if prev.value() == Some(value) {
            return Arc::clone(prev);
        }
        return Arc::new(DocNode::leaf(prev.id, value.clone()));
    }
    Arc::new(DocNode::leaf(ids.next_id(), value.clone()))
}
