//! The generic patch engine: ordered operations over a plain JSON value,
//! producing the patched document plus the revert patch.
//!
//! Each operation prepends its own revert ops to the accumulated list, so
//! the final list undoes the batch when applied front to back. Any failure
//! aborts the whole batch: the caller gets the original document, an empty
//! revert and the error.

use serde_json::{Map, Value};

use jsonedit_json_pointer::{
    compile_json_pointer, get, get_mut, is_child, Path, PathKey,
};
use jsonedit_util::deep_equal;

use crate::immutable::PathError;
use crate::patch::op::{OpMeta, PatchError, PatchOp, PatchResult, TestFailure};
use crate::tree::node::NodeKind;

/// Apply `ops` to `doc`, strictly in order.
pub fn apply_patch(doc: &Value, ops: &[PatchOp]) -> PatchResult {
    let mut working = doc.clone();
    let mut revert: Vec<PatchOp> = Vec::new();
    for op in ops {
        match apply_op(&mut working, op) {
            Ok(mut rev) => {
                rev.extend(revert);
                revert = rev;
            }
            Err(error) => {
                return PatchResult {
                    doc: doc.clone(),
                    revert: Vec::new(),
                    error: Some(error),
                };
            }
        }
    }
    PatchResult {
        doc: working,
        revert,
        error: None,
    }
}

fn apply_op(doc: &mut Value, op: &PatchOp) -> Result<Vec<PatchOp>, PatchError> {
    match op {
        PatchOp::Add { path, value, meta } => apply_add(doc, path, value.clone(), meta.as_ref()),
        PatchOp::Remove { path } => apply_remove(doc, path).map(|removed| vec![removed.revert]),
        PatchOp::Replace { path, value } => apply_replace(doc, path, value.clone()),
        PatchOp::Copy { path, from, meta } => apply_copy(doc, path, from, meta.as_ref()),
        PatchOp::Move { path, from, meta } => apply_move(doc, path, from, meta.as_ref()),
        PatchOp::Test { path, value } => {
            apply_test(doc, path, value.as_ref())?;
            Ok(Vec::new())
        }
    }
}

// ── add ───────────────────────────────────────────────────────────────────

fn apply_add(
    doc: &mut Value,
    path: &[PathKey],
    value: Value,
    meta: Option<&OpMeta>,
) -> Result<Vec<PatchOp>, PatchError> {
    if path.is_empty() {
        let old = std::mem::replace(doc, value);
        return Ok(vec![PatchOp::replace(Vec::new(), old)]);
    }
    let (key, parent_path) = path.split_last().expect("non-empty path");
    let parent = get_mut(doc, parent_path)
        .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(parent_path)))?;
    match parent {
        Value::Object(props) => {
            let name = key.as_str().into_owned();
            if props.contains_key(&name) {
                // Adding over an existing key is effectively a replace and
                // keeps the property's position.
                let old = props
                    .insert(name, value)
                    .expect("key presence checked above");
                Ok(vec![PatchOp::replace(path.to_vec(), old)])
            } else {
                let before = meta.and_then(|m| m.before.as_deref());
                insert_object_entry(props, name, value, before);
                Ok(vec![PatchOp::remove(path.to_vec())])
            }
        }
        Value::Array(items) => {
            let index = if key.is_append() {
                items.len()
            } else {
                key.array_index()
                    .filter(|i| *i <= items.len())
                    .ok_or_else(|| PatchError::InvalidIndex(compile_json_pointer(path)))?
            };
            items.insert(index, value);
            let mut resolved: Path = parent_path.to_vec();
            resolved.push(PathKey::Index(index));
            Ok(vec![PatchOp::remove(resolved)])
        }
        _ => Err(PathError::NotAContainer(compile_json_pointer(parent_path)).into()),
    }
}

// ── remove ────────────────────────────────────────────────────────────────

struct Removed {
    value: Value,
    revert: PatchOp,
}

fn apply_remove(doc: &mut Value, path: &[PathKey]) -> Result<Removed, PatchError> {
    let Some((key, parent_path)) = path.split_last() else {
        return Err(PatchError::PathNotFound(String::new()));
    };
    let parent = get_mut(doc, parent_path)
        .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(parent_path)))?;
    match parent {
        Value::Object(props) => {
            let name = key.as_str();
            let before = key_after(props, name.as_ref());
            let old = props
                .shift_remove(name.as_ref())
                .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(path)))?;
            let meta = OpMeta {
                kind: Some(NodeKind::of_value(&old)),
                before,
                expanded: None,
            };
            Ok(Removed {
                revert: PatchOp::Add {
                    path: path.to_vec(),
                    value: old.clone(),
                    meta: Some(meta),
                },
                value: old,
            })
        }
        Value::Array(items) => {
            let index = key
                .array_index()
                .filter(|i| *i < items.len())
                .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(path)))?;
            let old = items.remove(index);
            Ok(Removed {
                revert: PatchOp::add(path.to_vec(), old.clone()),
                value: old,
            })
        }
        _ => Err(PatchError::PathNotFound(compile_json_pointer(path))),
    }
}

// ── replace ───────────────────────────────────────────────────────────────

fn apply_replace(
    doc: &mut Value,
    path: &[PathKey],
    value: Value,
) -> Result<Vec<PatchOp>, PatchError> {
    let target = get_mut(doc, path)
        .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(path)))?;
    let old = std::mem::replace(target, value);
    Ok(vec![PatchOp::replace(path.to_vec(), old)])
}

// ── copy ──────────────────────────────────────────────────────────────────

fn apply_copy(
    doc: &mut Value,
    path: &[PathKey],
    from: &[PathKey],
    meta: Option<&OpMeta>,
) -> Result<Vec<PatchOp>, PatchError> {
    let source = get(doc, from)
        .ok_or_else(|| PatchError::PathNotFound(compile_json_pointer(from)))?
        .clone();
    apply_add(doc, path, source, meta)
}

// ── move ──────────────────────────────────────────────────────────────────

fn apply_move(
    doc: &mut Value,
    path: &[PathKey],
    from: &[PathKey],
    meta: Option<&OpMeta>,
) -> Result<Vec<PatchOp>, PatchError> {
    if is_child(from, path) {
        return Err(PatchError::MoveIntoChild {
            from: compile_json_pointer(from),
            to: compile_json_pointer(path),
        });
    }

    // Ordering info for the reverse move: the sibling that followed the
    // source property.
    let before_source = from.split_last().and_then(|(key, parent_path)| {
        get(doc, parent_path)
            .and_then(Value::as_object)
            .and_then(|props| key_after(props, key.as_str().as_ref()))
    });

    let removed = apply_remove(doc, from)?;
    let add_revert = apply_add(doc, path, removed.value, meta)?;

    match add_revert.into_iter().next() {
        // Destination key existed: its old value was clobbered. Reverting
        // takes two ops: move back, then restore the clobbered sibling.
        Some(PatchOp::Replace { value: old, .. }) => Ok(vec![
            PatchOp::Move {
                from: path.to_vec(),
                path: from.to_vec(),
                meta: None,
            },
            PatchOp::add(path.to_vec(), old),
        ]),
        Some(PatchOp::Remove { path: resolved }) => Ok(vec![PatchOp::Move {
            from: resolved,
            path: from.to_vec(),
            meta: before_source.map(OpMeta::before),
        }]),
        other => Err(PatchError::InvalidOp(format!(
            "unexpected add revert for move: {other:?}"
        ))),
    }
}

// ── test ──────────────────────────────────────────────────────────────────

fn apply_test(doc: &Value, path: &[PathKey], value: Option<&Value>) -> Result<(), PatchError> {
    let expected = value.ok_or(TestFailure::NoValueProvided)?;
    let actual = get(doc, path)
        .ok_or_else(|| TestFailure::PathNotFound(compile_json_pointer(path)))?;
    if !deep_equal(actual, expected) {
        return Err(TestFailure::ValueMismatch(compile_json_pointer(path)).into());
    }
    Ok(())
}

// ── ordered-object helpers ────────────────────────────────────────────────

/// The property name that follows `name`, if any.
pub(crate) fn key_after(props: &Map<String, Value>, name: &str) -> Option<String> {
    let mut seen = false;
    for key in props.keys() {
        if seen {
            return Some(key.clone());
        }
        seen = key == name;
    }
    None
}

/// Insert a new entry, positioned immediately before `before` when that
/// sibling exists, appended otherwise. `name` must not already be present.
pub(crate) fn insert_object_entry(
    props: &mut Map<String, Value>,
    name: String,
    value: Value,
    before: Option<&str>,
) {
    let Some(before) = before.filter(|b| props.contains_key(*b)) else {
        props.insert(name, value);
        return;
    };
    let mut pending = Some((name, value));
    let entries: Vec<(String, Value)> = std::mem::take(props).into_iter().collect();
    for (key, existing) in entries {
        if key == before {
            if let Some((name, value)) = pending.take() {
                props.insert(name, value);
            }
        }
        props.insert(key, existing);
    }
    if let Some((name, value)) = pending {
        props.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonedit_json_pointer::parse_json_pointer;
    use serde_json::json;

    fn p(s: &str) -> Path {
        parse_json_pointer(s)
    }

    fn roundtrip(doc: Value, ops: Vec<PatchOp>) -> PatchResult {
        let result = apply_patch(&doc, &ops);
        assert!(result.error.is_none(), "patch failed: {:?}", result.error);
        let restored = apply_patch(&result.doc, &result.revert);
        assert!(restored.error.is_none(), "revert failed: {:?}", restored.error);
        assert!(
            deep_equal(&restored.doc, &doc),
            "revert mismatch: {} vs {}",
            restored.doc,
            doc
        );
        result
    }

    #[test]
    fn add_to_object() {
        let result = roundtrip(json!({"a": 1}), vec![PatchOp::add(p("/b"), json!(2))]);
        assert_eq!(result.doc, json!({"a": 1, "b": 2}));
        assert_eq!(result.revert, vec![PatchOp::remove(p("/b"))]);
    }

    #[test]
    fn add_existing_key_is_replace() {
        let result = roundtrip(json!({"a": 1}), vec![PatchOp::add(p("/a"), json!(2))]);
        assert_eq!(result.doc, json!({"a": 2}));
        assert_eq!(result.revert, vec![PatchOp::replace(p("/a"), json!(1))]);
    }

    #[test]
    fn add_honors_before() {
        let ops = vec![PatchOp::Add {
            path: p("/x"),
            value: json!(0),
            meta: Some(OpMeta::before("b")),
        }];
        let result = roundtrip(json!({"a": 1, "b": 2}), ops);
        let keys: Vec<&String> = result.doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "x", "b"]);
    }

    #[test]
    fn add_append_sentinel() {
        let result = roundtrip(
            json!({"arr": [1, 2, 3]}),
            vec![PatchOp::add(p("/arr/-"), json!(4))],
        );
        assert_eq!(result.doc, json!({"arr": [1, 2, 3, 4]}));
        assert_eq!(result.revert, vec![PatchOp::remove(p("/arr/3"))]);
    }

    #[test]
    fn add_array_insert() {
        let result = roundtrip(json!([1, 3]), vec![PatchOp::add(p("/1"), json!(2))]);
        assert_eq!(result.doc, json!([1, 2, 3]));
    }

    #[test]
    fn add_array_out_of_bounds() {
        let result = apply_patch(&json!([1]), &[PatchOp::add(p("/5"), json!(9))]);
        assert!(matches!(result.error, Some(PatchError::InvalidIndex(_))));
        assert_eq!(result.doc, json!([1]));
        assert!(result.revert.is_empty());
    }

    #[test]
    fn add_at_root_replaces_document() {
        let result = roundtrip(json!({"a": 1}), vec![PatchOp::add(p(""), json!([1, 2]))]);
        assert_eq!(result.doc, json!([1, 2]));
        assert_eq!(result.revert, vec![PatchOp::replace(p(""), json!({"a": 1}))]);
    }

    #[test]
    fn remove_restores_position() {
        let result = roundtrip(
            json!({"a": 1, "b": 2, "c": 3}),
            vec![PatchOp::remove(p("/b"))],
        );
        assert_eq!(result.doc, json!({"a": 1, "c": 3}));
        match &result.revert[0] {
            PatchOp::Add { meta: Some(meta), .. } => {
                assert_eq!(meta.before.as_deref(), Some("c"));
                assert_eq!(meta.kind, Some(NodeKind::Value));
            }
            other => panic!("unexpected revert {other:?}"),
        }
    }

    #[test]
    fn remove_missing_fails_whole_batch() {
        let doc = json!({"a": 1});
        let ops = vec![
            PatchOp::add(p("/b"), json!(2)),
            PatchOp::remove(p("/zz")),
        ];
        let result = apply_patch(&doc, &ops);
        assert!(matches!(result.error, Some(PatchError::PathNotFound(_))));
        assert_eq!(result.doc, doc);
        assert!(result.revert.is_empty());
    }

    #[test]
    fn replace_value() {
        let result = roundtrip(json!({"a": 1}), vec![PatchOp::replace(p("/a"), json!("x"))]);
        assert_eq!(result.doc, json!({"a": "x"}));
        assert_eq!(result.revert, vec![PatchOp::replace(p("/a"), json!(1))]);
    }

    #[test]
    fn copy_subtree() {
        let result = roundtrip(
            json!({"a": {"x": 1}}),
            vec![PatchOp::Copy {
                path: p("/b"),
                from: p("/a"),
                meta: None,
            }],
        );
        assert_eq!(result.doc, json!({"a": {"x": 1}, "b": {"x": 1}}));
        assert_eq!(result.revert, vec![PatchOp::remove(p("/b"))]);
    }

    #[test]
    fn move_rename_keeps_order() {
        let ops = vec![PatchOp::Move {
            from: p("/b"),
            path: p("/b2"),
            meta: None,
        }];
        let result = roundtrip(json!({"a": 1, "b": 2, "c": 3}), ops);
        // the rename appends; revert carries before info to restore order
        match &result.revert[0] {
            PatchOp::Move { meta: Some(meta), .. } => {
                assert_eq!(meta.before.as_deref(), Some("c"));
            }
            other => panic!("unexpected revert {other:?}"),
        }
    }

    #[test]
    fn move_with_collision() {
        let result = apply_patch(
            &json!({"a": 2, "b": 3}),
            &[PatchOp::Move {
                from: p("/a"),
                path: p("/b"),
                meta: None,
            }],
        );
        assert!(result.error.is_none());
        assert_eq!(result.doc, json!({"b": 2}));
        assert_eq!(
            result.revert,
            vec![
                PatchOp::Move {
                    from: p("/b"),
                    path: p("/a"),
                    meta: None,
                },
                PatchOp::add(p("/b"), json!(3)),
            ]
        );
        let restored = apply_patch(&result.doc, &result.revert);
        assert_eq!(restored.doc, json!({"a": 2, "b": 3}));
    }

    #[test]
    fn move_into_own_child_fails() {
        let result = apply_patch(
            &json!({"a": {"b": 1}}),
            &[PatchOp::Move {
                from: p("/a"),
                path: p("/a/b"),
                meta: None,
            }],
        );
        assert!(matches!(result.error, Some(PatchError::MoveIntoChild { .. })));
    }

    #[test]
    fn move_array_element() {
        let result = roundtrip(
            json!([1, 2, 3]),
            vec![PatchOp::Move {
                from: p("/0"),
                path: p("/2"),
                meta: None,
            }],
        );
        assert_eq!(result.doc, json!([2, 3, 1]));
    }

    #[test]
    fn test_op_passes_and_fails() {
        let doc = json!({"a": 42});
        let ok = apply_patch(&doc, &[PatchOp::test(p("/a"), json!(42))]);
        assert!(ok.error.is_none());

        let mismatch = apply_patch(&doc, &[PatchOp::test(p("/a"), json!(41))]);
        assert!(matches!(
            mismatch.error,
            Some(PatchError::TestFailed(TestFailure::ValueMismatch(_)))
        ));

        let missing = apply_patch(&doc, &[PatchOp::test(p("/zz"), json!(1))]);
        assert!(matches!(
            missing.error,
            Some(PatchError::TestFailed(TestFailure::PathNotFound(_)))
        ));

        let no_value = apply_patch(
            &doc,
            &[PatchOp::Test {
                path: p("/a"),
                value: None,
            }],
        );
        assert!(matches!(
            no_value.error,
            Some(PatchError::TestFailed(TestFailure::NoValueProvided))
        ));
    }

    #[test]
    fn failing_test_discards_earlier_ops() {
        let doc = json!({"a": 1});
        let ops = vec![
            PatchOp::replace(p("/a"), json!(2)),
            PatchOp::test(p("/a"), json!(999)),
        ];
        let result = apply_patch(&doc, &ops);
        assert!(result.error.is_some());
        assert_eq!(result.doc, doc);
        assert!(result.revert.is_empty());
    }

    #[test]
    fn batch_revert_is_reverse_ordered() {
        let doc = json!({"a": 1});
        let ops = vec![
            PatchOp::add(p("/b"), json!(2)),
            PatchOp::replace(p("/a"), json!(10)),
        ];
        let result = roundtrip(doc, ops);
        // replace's revert first, then the add's
        assert_eq!(
            result.revert,
            vec![
                PatchOp::replace(p("/a"), json!(1)),
                PatchOp::remove(p("/b")),
            ]
        );
    }

    #[test]
    fn key_after_walks_order() {
        let doc = json!({"a": 1, "b": 2, "c": 3});
        let props = doc.as_object().unwrap();
        assert_eq!(key_after(props, "a").as_deref(), Some("b"));
        assert_eq!(key_after(props, "c"), None);
        assert_eq!(key_after(props, "zz"), None);
    }
}
