//! Action builders: turn user intents into patch operations.
//!
//! Every function is pure; it reads the current tree only to disambiguate
//! (unique property names, sibling ordering) and returns the ops for the
//! patch engine. Nothing here mutates anything.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::{json, Value};

use jsonedit_json_pointer::{parent, Path, PathKey};
use jsonedit_util::{find_unique_name, str_cmp, value_cmp, value_to_display_string};

use crate::immutable::get_in;
use crate::patch::op::{OpMeta, PatchOp};
use crate::selection::{resolve_range, Selection};
use crate::tree::node::{DocNode, NodeContent};

/// Target type for [`change_type`]: the editor distinguishes parsed values
/// from verbatim strings on top of the two container shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Auto-parsed leaf: strings are re-read as null/bool/number when they
    /// look like one.
    Value,
    /// Verbatim string leaf.
    String,
    Array,
    Object,
}

/// A new entry for the insert/append builders: an optional property name
/// (objects only) and the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: Option<String>,
    pub value: Value,
}

impl Entry {
    pub fn value(value: Value) -> Self {
        Entry { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Entry {
            name: Some(name.into()),
            value,
        }
    }
}

/// Sort direction for [`sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

// ── Simple edits ──────────────────────────────────────────────────────────

/// Replace the value at `path`.
pub fn change_value(path: &[PathKey], value: Value) -> Vec<PatchOp> {
    vec![PatchOp::replace(path.to_vec(), value)]
}

/// Rename a property, uniquifying the new name against its siblings and
/// keeping the property's position stable across revert.
pub fn change_property(
    tree: &Arc<DocNode>,
    parent_path: &[PathKey],
    old_name: &str,
    new_name: &str,
) -> Vec<PatchOp> {
    let Some(parent) = get_in(tree, parent_path) else {
        return Vec::new();
    };
    let NodeContent::Object(children) = &parent.content else {
        return Vec::new();
    };
    if !children.contains_key(old_name) {
        return Vec::new();
    }
    let siblings = children.keys().filter(|name| *name != old_name);
    let unique = find_unique_name(new_name, siblings.map(String::as_str));
    if unique == old_name {
        return Vec::new();
    }
    let before = children
        .get_index_of(old_name)
        .and_then(|index| children.get_index(index + 1))
        .map(|(name, _)| name.clone());

    let mut from = parent_path.to_vec();
    from.push(PathKey::Name(old_name.to_string()));
    let mut path = parent_path.to_vec();
    path.push(PathKey::Name(unique));
    vec![PatchOp::Move {
        from,
        path,
        meta: before.map(OpMeta::before),
    }]
}

/// Convert the value at `path` to another type.
pub fn change_type(tree: &Arc<DocNode>, path: &[PathKey], target: ValueType) -> Vec<PatchOp> {
    let Some(node) = get_in(tree, path) else {
        return Vec::new();
    };
    let converted = convert_value(&node.to_value(), target);
    vec![PatchOp::replace(path.to_vec(), converted)]
}

/// Type-conversion rules: value ↔ string re-parse/stringify, array → object
/// turns indices into keys, object → array keeps values in property order.
/// Converting a leaf into a container yields an empty container.
pub fn convert_value(value: &Value, target: ValueType) -> Value {
    match target {
        ValueType::String => match value {
            Value::String(_) => value.clone(),
            other => Value::String(value_to_display_string(other)),
        },
        ValueType::Value => match value {
            Value::String(text) => parse_string_value(text),
            other => other.clone(),
        },
        ValueType::Array => match value {
            Value::Array(_) => value.clone(),
            Value::Object(props) => Value::Array(props.values().cloned().collect()),
            _ => json!([]),
        },
        ValueType::Object => match value {
            Value::Object(_) => value.clone(),
            Value::Array(items) => Value::Object(
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| (index.to_string(), item.clone()))
                    .collect(),
            ),
            _ => json!({}),
        },
    }
}

/// The string-parse heuristics of [`ValueType::Value`]: empty stays a
/// string, literals re-read as null/bool, strict JSON numbers as numbers,
/// anything else stays the unchanged string.
pub fn parse_string_value(text: &str) -> Value {
    match text {
        "" => Value::String(String::new()),
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match serde_json::from_str::<Value>(text) {
            Ok(number @ Value::Number(_)) => number,
            _ => Value::String(text.to_string()),
        },
    }
}

// ── Duplicate / insert / append ───────────────────────────────────────────

/// One `copy` per selected path, inserted right after the selection's end;
/// object property copies get uniquified names.
pub fn duplicate(tree: &Arc<DocNode>, selection: &Selection) -> Vec<PatchOp> {
    let Selection::Range { start, end } = selection else {
        return Vec::new();
    };
    let Some(range) = resolve_range(tree, start, end) else {
        return Vec::new();
    };
    let Some(parent_node) = get_in(tree, &range.parent) else {
        return Vec::new();
    };

    match &parent_node.content {
        NodeContent::Array(_) => range
            .paths
            .iter()
            .enumerate()
            .map(|(offset, from)| {
                let mut path = range.parent.clone();
                path.push(PathKey::Index(range.max_index + 1 + offset));
                PatchOp::Copy {
                    path,
                    from: from.clone(),
                    meta: None,
                }
            })
            .collect(),
        NodeContent::Object(children) => {
            let before = children
                .get_index(range.max_index + 1)
                .map(|(name, _)| name.clone());
            let mut taken: Vec<String> = children.keys().cloned().collect();
            range
                .paths
                .iter()
                .map(|from| {
                    let name = match from.last() {
                        Some(PathKey::Name(name)) => name.clone(),
                        Some(PathKey::Index(index)) => index.to_string(),
                        None => String::new(),
                    };
                    let unique = find_unique_name(&name, taken.iter().map(String::as_str));
                    taken.push(unique.clone());
                    let mut path = range.parent.clone();
                    path.push(PathKey::Name(unique));
                    PatchOp::Copy {
                        path,
                        from: from.clone(),
                        meta: before.clone().map(OpMeta::before),
                    }
                })
                .collect()
        }
        NodeContent::Value(_) => Vec::new(),
    }
}

/// Insert `entries` immediately before the node at `path`.
pub fn insert_before(tree: &Arc<DocNode>, path: &[PathKey], entries: &[Entry]) -> Vec<PatchOp> {
    let Some(parent_path) = parent(path) else {
        return Vec::new();
    };
    let Some(last) = path.last() else {
        return Vec::new();
    };
    insert_entries(tree, parent_path, entries, InsertPosition::Before(last))
}

/// Insert `entries` immediately after the node at `path`.
pub fn insert_after(tree: &Arc<DocNode>, path: &[PathKey], entries: &[Entry]) -> Vec<PatchOp> {
    let Some(parent_path) = parent(path) else {
        return Vec::new();
    };
    let Some(last) = path.last() else {
        return Vec::new();
    };
    insert_entries(tree, parent_path, entries, InsertPosition::After(last))
}

/// Insert `entries` as the first children of the container at `path`.
pub fn insert_inside(tree: &Arc<DocNode>, path: &[PathKey], entries: &[Entry]) -> Vec<PatchOp> {
    insert_entries(tree, path, entries, InsertPosition::First)
}

enum InsertPosition<'a> {
    Before(&'a PathKey),
    After(&'a PathKey),
    First,
}

fn insert_entries(
    tree: &Arc<DocNode>,
    parent_path: &[PathKey],
    entries: &[Entry],
    position: InsertPosition<'_>,
) -> Vec<PatchOp> {
    let Some(parent_node) = get_in(tree, parent_path) else {
        return Vec::new();
    };
    match &parent_node.content {
        NodeContent::Array(children) => {
            let base = match position {
                InsertPosition::Before(key) => key.array_index().unwrap_or(0),
                InsertPosition::After(key) => match key.array_index() {
                    Some(index) => index + 1,
                    None => children.len(),
                },
                InsertPosition::First => 0,
            };
            entries
                .iter()
                .enumerate()
                .map(|(offset, entry)| {
                    let mut path = parent_path.to_vec();
                    path.push(PathKey::Index(base + offset));
                    PatchOp::add(path, entry.value.clone())
                })
                .collect()
        }
        NodeContent::Object(children) => {
            let before: Option<String> = match position {
                InsertPosition::Before(key) => Some(key.as_str().into_owned()),
                InsertPosition::After(key) => children
                    .get_index_of(key.as_str().as_ref())
                    .and_then(|index| children.get_index(index + 1))
                    .map(|(name, _)| name.clone()),
                InsertPosition::First => children.keys().next().cloned(),
            };
            let mut taken: Vec<String> = children.keys().cloned().collect();
            entries
                .iter()
                .map(|entry| {
                    let name = entry.name.clone().unwrap_or_default();
                    let unique = find_unique_name(&name, taken.iter().map(String::as_str));
                    taken.push(unique.clone());
                    let mut path = parent_path.to_vec();
                    path.push(PathKey::Name(unique));
                    PatchOp::Add {
                        path,
                        value: entry.value.clone(),
                        meta: before.clone().map(OpMeta::before),
                    }
                })
                .collect()
        }
        NodeContent::Value(_) => Vec::new(),
    }
}

/// Append one blank entry of the given type to the container at
/// `parent_path`.
pub fn append(tree: &Arc<DocNode>, parent_path: &[PathKey], target: ValueType) -> Vec<PatchOp> {
    let Some(parent_node) = get_in(tree, parent_path) else {
        return Vec::new();
    };
    let value = blank_value(target);
    match &parent_node.content {
        NodeContent::Array(_) => {
            let mut path = parent_path.to_vec();
            path.push(PathKey::Name("-".to_string()));
            vec![PatchOp::add(path, value)]
        }
        NodeContent::Object(children) => {
            let unique = find_unique_name("", children.keys().map(String::as_str));
            let mut path = parent_path.to_vec();
            path.push(PathKey::Name(unique));
            vec![PatchOp::add(path, value)]
        }
        NodeContent::Value(_) => Vec::new(),
    }
}

fn blank_value(target: ValueType) -> Value {
    match target {
        ValueType::Value | ValueType::String => json!(""),
        ValueType::Array => json!([]),
        ValueType::Object => json!({}),
    }
}

// ── Remove ────────────────────────────────────────────────────────────────

/// Remove the node at `path`.
pub fn remove(path: &[PathKey]) -> Vec<PatchOp> {
    vec![PatchOp::remove(path.to_vec())]
}

/// Remove several nodes. Ops are emitted in reverse document order so an
/// earlier removal cannot invalidate a later array index.
pub fn remove_all(paths: &[Path]) -> Vec<PatchOp> {
    let mut sorted: Vec<&Path> = paths.iter().collect();
    sorted.sort_by(|a, b| path_cmp(a, b));
    sorted
        .into_iter()
        .rev()
        .map(|path| PatchOp::remove(path.clone()))
        .collect()
}

fn path_cmp(a: &[PathKey], b: &[PathKey]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let step = match (x, y) {
            (PathKey::Index(i), PathKey::Index(j)) => i.cmp(j),
            _ => x.as_str().cmp(&y.as_str()),
        };
        if step != Ordering::Equal {
            return step;
        }
    }
    a.len().cmp(&b.len())
}

// ── Sort ──────────────────────────────────────────────────────────────────

/// Reorder an array by value or an object by key with a minimal list of
/// `move` ops, derived selection-sort style. Without an explicit order the
/// sort is ascending, toggling to descending when ascending is already in
/// effect (zero moves).
pub fn sort(tree: &Arc<DocNode>, path: &[PathKey], order: Option<SortOrder>) -> Vec<PatchOp> {
    let Some(node) = get_in(tree, path) else {
        return Vec::new();
    };
    match &node.content {
        NodeContent::Array(children) => {
            let items: Vec<Value> = children.iter().map(|child| child.to_value()).collect();
            let build = |order: SortOrder| {
                let mut target = items.clone();
                target.sort_by(|a, b| directed(value_cmp(a, b), order));
                sort_moves(&items, &target)
                    .into_iter()
                    .map(|m| {
                        let mut from = path.to_vec();
                        from.push(PathKey::Index(m.from));
                        let mut to = path.to_vec();
                        to.push(PathKey::Index(m.to));
                        PatchOp::Move {
                            from,
                            path: to,
                            meta: None,
                        }
                    })
                    .collect::<Vec<_>>()
            };
            with_toggle(order, build)
        }
        NodeContent::Object(children) => {
            let keys: Vec<String> = children.keys().cloned().collect();
            let build = |order: SortOrder| {
                let mut target = keys.clone();
                target.sort_by(|a, b| directed(str_cmp(a, b), order));
                sort_moves(&keys, &target)
                    .into_iter()
                    .map(|m| {
                        let mut location = path.to_vec();
                        location.push(PathKey::Name(m.item));
                        PatchOp::Move {
                            from: location.clone(),
                            path: location,
                            meta: Some(OpMeta::before(m.displaced)),
                        }
                    })
                    .collect::<Vec<_>>()
            };
            with_toggle(order, build)
        }
        NodeContent::Value(_) => Vec::new(),
    }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

fn with_toggle(
    order: Option<SortOrder>,
    build: impl Fn(SortOrder) -> Vec<PatchOp>,
) -> Vec<PatchOp> {
    match order {
        Some(order) => build(order),
        None => {
            let ascending = build(SortOrder::Ascending);
            if ascending.is_empty() {
                build(SortOrder::Descending)
            } else {
                ascending
            }
        }
    }
}

struct SortMove<T> {
    item: T,
    from: usize,
    to: usize,
    /// The element displaced from the target position, captured before the
    /// move; object reordering inserts the moved key before it.
    displaced: T,
}

/// Selection-sort simulation: for each position take the item that belongs
/// there, recording a move only when it is not already in place.
fn sort_moves<T: Clone + PartialEq>(current: &[T], target: &[T]) -> Vec<SortMove<T>> {
    let mut working: Vec<T> = current.to_vec();
    let mut moves = Vec::new();
    for position in 0..target.len() {
        if working[position] == target[position] {
            continue;
        }
        let found = working[position..]
            .iter()
            .position(|item| *item == target[position])
            .map(|offset| position + offset)
            .expect("target is a permutation of current");
        let displaced = working[position].clone();
        let item = working.remove(found);
        working.insert(position, item.clone());
        moves.push(SortMove {
            item,
            from: found,
            to: position,
            displaced,
        });
    }
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;
    use crate::patch::apply::apply_patch;
    use crate::patch::apply_tree::apply_patch_tree;
    use crate::tree::sync::build;
    use jsonedit_json_pointer::parse_json_pointer;

    fn p(s: &str) -> Path {
        parse_json_pointer(s)
    }

    fn setup(doc: Value) -> (Arc<DocNode>, SequentialIds) {
        let mut ids = SequentialIds::new();
        let tree = build(&doc, &mut ids);
        (tree, ids)
    }

    fn run(doc: Value, ops: &[PatchOp]) -> Value {
        let result = apply_patch(&doc, ops);
        assert!(result.error.is_none(), "patch failed: {:?}", result.error);
        result.doc
    }

    #[test]
    fn change_value_builds_replace() {
        let ops = change_value(&p("/a"), json!(2));
        assert_eq!(ops, vec![PatchOp::replace(p("/a"), json!(2))]);
    }

    #[test]
    fn change_property_renames_and_keeps_order() {
        let doc = json!({"a": 1, "b": 2, "c": 3});
        let (tree, _) = setup(doc.clone());
        let ops = change_property(&tree, &[], "b", "renamed");
        let result = run(doc, &ops);
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "renamed", "c"]);
    }

    #[test]
    fn change_property_uniquifies_against_siblings() {
        let (tree, _) = setup(json!({"a": 1, "b": 2}));
        let ops = change_property(&tree, &[], "b", "a");
        match &ops[0] {
            PatchOp::Move { path, .. } => {
                assert_eq!(path, &p("/a (copy)"));
            }
            other => panic!("unexpected op {other:?}"),
        }
        // renaming to the current name is a no-op
        assert!(change_property(&tree, &[], "b", "b").is_empty());
    }

    #[test]
    fn string_parse_heuristics() {
        assert_eq!(parse_string_value(""), json!(""));
        assert_eq!(parse_string_value("null"), json!(null));
        assert_eq!(parse_string_value("true"), json!(true));
        assert_eq!(parse_string_value("false"), json!(false));
        assert_eq!(parse_string_value("2.5"), json!(2.5));
        assert_eq!(parse_string_value("-12"), json!(-12));
        assert_eq!(parse_string_value("1e3"), json!(1e3));
        assert_eq!(parse_string_value("hello"), json!("hello"));
        assert_eq!(parse_string_value("12px"), json!("12px"));
    }

    #[test]
    fn convert_between_kinds() {
        assert_eq!(convert_value(&json!(2.5), ValueType::String), json!("2.5"));
        assert_eq!(convert_value(&json!("42"), ValueType::Value), json!(42));
        assert_eq!(
            convert_value(&json!(["x", "y"]), ValueType::Object),
            json!({"0": "x", "1": "y"})
        );
        assert_eq!(
            convert_value(&json!({"a": 1, "b": 2}), ValueType::Array),
            json!([1, 2])
        );
        assert_eq!(convert_value(&json!("x"), ValueType::Array), json!([]));
    }

    #[test]
    fn duplicate_array_range() {
        let doc = json!([1, 2, 3]);
        let (tree, _) = setup(doc.clone());
        let selection = Selection::Range {
            start: p("/0"),
            end: p("/1"),
        };
        let result = run(doc, &duplicate(&tree, &selection));
        assert_eq!(result, json!([1, 2, 1, 2, 3]));
    }

    #[test]
    fn duplicate_object_property_uniquifies() {
        let doc = json!({"a": 1, "b": 2});
        let (tree, _) = setup(doc.clone());
        let result = run(doc, &duplicate(&tree, &Selection::single(p("/a"))));
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "a (copy)", "b"]);
        assert_eq!(result["a (copy)"], json!(1));
    }

    #[test]
    fn insert_after_array_element() {
        let doc = json!([1, 4]);
        let (tree, _) = setup(doc.clone());
        let entries = [Entry::value(json!(2)), Entry::value(json!(3))];
        let result = run(doc, &insert_after(&tree, &p("/0"), &entries));
        assert_eq!(result, json!([1, 2, 3, 4]));
    }

    #[test]
    fn insert_before_object_property() {
        let doc = json!({"a": 1, "c": 3});
        let (tree, _) = setup(doc.clone());
        let entries = [Entry::named("b", json!(2))];
        let result = run(doc, &insert_before(&tree, &p("/c"), &entries));
        let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn insert_inside_becomes_first_child() {
        let doc = json!({"a": {"x": 1}});
        let (tree, _) = setup(doc.clone());
        let entries = [Entry::named("first", json!(0))];
        let result = run(doc, &insert_inside(&tree, &p("/a"), &entries));
        let keys: Vec<&String> = result["a"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["first", "x"]);

        let doc = json!([2, 3]);
        let (tree, _) = setup(doc.clone());
        let result = run(doc, &insert_inside(&tree, &[], &[Entry::value(json!(1))]));
        assert_eq!(result, json!([1, 2, 3]));
    }

    #[test]
    fn append_blank_entries() {
        let doc = json!({"arr": [1]});
        let (tree, _) = setup(doc.clone());
        let result = run(doc, &append(&tree, &p("/arr"), ValueType::Value));
        assert_eq!(result, json!({"arr": [1, ""]}));

        let doc = json!({"": 1});
        let (tree, _) = setup(doc.clone());
        let result = run(doc, &append(&tree, &[], ValueType::Object));
        assert_eq!(result[" (copy)"], json!({}));
    }

    #[test]
    fn remove_all_is_reverse_ordered() {
        let doc = json!([0, 1, 2, 3]);
        let paths = vec![p("/1"), p("/3")];
        let ops = remove_all(&paths);
        assert_eq!(ops, vec![PatchOp::remove(p("/3")), PatchOp::remove(p("/1"))]);
        assert_eq!(run(doc, &ops), json!([0, 2]));
    }

    #[test]
    fn sort_array_ascending_by_default() {
        let doc = json!([1, 3, 2]);
        let (tree, _) = setup(doc.clone());
        let ops = sort(&tree, &[], None);
        assert_eq!(run(doc, &ops), json!([1, 2, 3]));
    }

    #[test]
    fn sort_toggles_to_descending_when_sorted() {
        let doc = json!([1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let (tree, _) = setup(doc.clone());
        let ops = sort(&tree, &[], None);
        assert!(!ops.is_empty());
        assert_eq!(run(doc, &ops), json!([9, 8, 7, 6, 5, 4, 3, 2, 1]));
    }

    #[test]
    fn sort_emits_minimal_moves() {
        // one element out of place needs exactly one move
        let doc = json!([2, 3, 4, 1]);
        let (tree, _) = setup(doc.clone());
        let ops = sort(&tree, &[], None);
        assert_eq!(ops.len(), 1);
        assert_eq!(run(doc, &ops), json!([1, 2, 3, 4]));
    }

    #[test]
    fn sort_object_keys() {
        let doc = json!({"c": 3, "a": 1, "b": 2});
        let (tree, mut ids) = setup(doc.clone());
        let ops = sort(&tree, &[], None);
        let result = apply_patch_tree(&tree, &ops, &mut ids);
        assert!(result.error.is_none());
        assert_eq!(result.tree.property_names(), ["a", "b", "c"]);

        // generic engine agrees
        let keys_after: Vec<String> = run(doc, &ops)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys_after, ["a", "b", "c"]);
    }

    #[test]
    fn sort_explicit_descending() {
        let doc = json!({"a": 1, "b": 2});
        let (tree, _) = setup(doc.clone());
        let ops = sort(&tree, &[], Some(SortOrder::Descending));
        let keys_after: Vec<String> = run(doc, &ops)
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys_after, ["b", "a"]);
    }

    #[test]
    fn sort_nested_array() {
        let doc = json!({"list": ["b", "a", "c"]});
        let (tree, _) = setup(doc.clone());
        let ops = sort(&tree, &p("/list"), None);
        assert_eq!(run(doc, &ops), json!({"list": ["a", "b", "c"]}));
    }
}
