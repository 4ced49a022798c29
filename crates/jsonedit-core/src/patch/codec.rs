//! JSON wire codec for patch operations.
//!
//! Converts [`PatchOp`] to and from the RFC 6902 object format, extended
//! with the non-standard `meta` field (`{kind?, before?, expanded?}`).
//! This is the boundary where untyped input enters the system, so the
//! unknown-op and missing-field errors live here: the typed enum cannot
//! represent them.

use serde_json::{json, Map, Value};

use jsonedit_json_pointer::{compile_json_pointer, parse_json_pointer, Path};

use crate::patch::op::{OpMeta, PatchError, PatchOp};
use crate::tree::node::NodeKind;

// ── Serialization ─────────────────────────────────────────────────────────

/// Serialize one operation to its wire object.
pub fn to_json(op: &PatchOp) -> Value {
    match op {
        PatchOp::Add { path, value, meta } => {
            let mut obj = op_object("add", path);
            obj.insert("value".into(), value.clone());
            encode_meta(&mut obj, meta.as_ref());
            Value::Object(obj)
        }
        PatchOp::Remove { path } => Value::Object(op_object("remove", path)),
        PatchOp::Replace { path, value } => {
            let mut obj = op_object("replace", path);
            obj.insert("value".into(), value.clone());
            Value::Object(obj)
        }
        PatchOp::Copy { path, from, meta } => {
            let mut obj = op_object("copy", path);
            obj.insert("from".into(), encode_path(from));
            encode_meta(&mut obj, meta.as_ref());
            Value::Object(obj)
        }
        PatchOp::Move { path, from, meta } => {
            let mut obj = op_object("move", path);
            obj.insert("from".into(), encode_path(from));
            encode_meta(&mut obj, meta.as_ref());
            Value::Object(obj)
        }
        PatchOp::Test { path, value } => {
            let mut obj = op_object("test", path);
            if let Some(value) = value {
                obj.insert("value".into(), value.clone());
            }
            Value::Object(obj)
        }
    }
}

/// Serialize a whole patch to a JSON array.
pub fn to_json_patch(ops: &[PatchOp]) -> Value {
    Value::Array(ops.iter().map(to_json).collect())
}

fn op_object(name: &str, path: &Path) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("op".into(), json!(name));
    obj.insert("path".into(), encode_path(path));
    obj
}

fn encode_path(path: &Path) -> Value {
    Value::String(compile_json_pointer(path))
}

fn encode_meta(obj: &mut Map<String, Value>, meta: Option<&OpMeta>) {
    let Some(meta) = meta.filter(|m| !m.is_empty()) else {
        return;
    };
    let mut out = Map::new();
    if let Some(kind) = meta.kind {
        out.insert("kind".into(), json!(kind.as_str()));
    }
    if let Some(before) = &meta.before {
        out.insert("before".into(), json!(before));
    }
    if let Some(expanded) = meta.expanded {
        out.insert("expanded".into(), json!(expanded));
    }
    obj.insert("meta".into(), Value::Object(out));
}

// ── Deserialization ───────────────────────────────────────────────────────

/// Deserialize one wire object into an operation.
pub fn from_json(value: &Value) -> Result<PatchOp, PatchError> {
    let obj = value
        .as_object()
        .ok_or_else(|| PatchError::InvalidOp("operation must be an object".into()))?;
    let op_name = obj
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::InvalidOp("missing 'op' field".into()))?;
    let path = decode_path(obj, "path")?
        .ok_or_else(|| PatchError::InvalidOp(format!("{op_name} requires 'path'")))?;

    match op_name {
        "add" => Ok(PatchOp::Add {
            path,
            value: required_value(obj, "add")?,
            meta: decode_meta(obj)?,
        }),
        "remove" => Ok(PatchOp::Remove { path }),
        "replace" => Ok(PatchOp::Replace {
            path,
            value: required_value(obj, "replace")?,
        }),
        "copy" => Ok(PatchOp::Copy {
            path,
            from: required_from(obj, "copy")?,
            meta: decode_meta(obj)?,
        }),
        "move" => Ok(PatchOp::Move {
            path,
            from: required_from(obj, "move")?,
            meta: decode_meta(obj)?,
        }),
        // A test without a value decodes, and fails in the engine.
        "test" => Ok(PatchOp::Test {
            path,
            value: obj.get("value").cloned(),
        }),
        other => Err(PatchError::UnknownOp(other.to_string())),
    }
}

/// Deserialize a JSON array into a patch.
pub fn from_json_patch(value: &Value) -> Result<Vec<PatchOp>, PatchError> {
    let items = value
        .as_array()
        .ok_or_else(|| PatchError::InvalidOp("patch must be an array".into()))?;
    items.iter().map(from_json).collect()
}

fn decode_path(obj: &Map<String, Value>, field: &str) -> Result<Option<Path>, PatchError> {
    match obj.get(field) {
        None => Ok(None),
        Some(value) => {
            let pointer = value
                .as_str()
                .ok_or_else(|| PatchError::InvalidOp(format!("'{field}' must be a string")))?;
            Ok(Some(parse_json_pointer(pointer)))
        }
    }
}

fn required_from(obj: &Map<String, Value>, op: &str) -> Result<Path, PatchError> {
    decode_path(obj, "from")?.ok_or_else(|| PatchError::MissingFrom(op.to_string()))
}

fn required_value(obj: &Map<String, Value>, op: &str) -> Result<Value, PatchError> {
    obj.get("value")
        .cloned()
        .ok_or_else(|| PatchError::InvalidOp(format!("{op} requires 'value'")))
}

fn decode_meta(obj: &Map<String, Value>) -> Result<Option<OpMeta>, PatchError> {
    let Some(value) = obj.get("meta") else {
        return Ok(None);
    };
    let meta = value
        .as_object()
        .ok_or_else(|| PatchError::InvalidOp("'meta' must be an object".into()))?;
    let kind = match meta.get("kind") {
        None => None,
        Some(kind) => {
            let name = kind
                .as_str()
                .ok_or_else(|| PatchError::InvalidOp("'meta.kind' must be a string".into()))?;
            Some(NodeKind::from_name(name).ok_or_else(|| {
                PatchError::InvalidOp(format!("unknown meta kind '{name}'"))
            })?)
        }
    };
    let before = match meta.get("before") {
        None => None,
        Some(before) => Some(
            before
                .as_str()
                .ok_or_else(|| PatchError::InvalidOp("'meta.before' must be a string".into()))?
                .to_string(),
        ),
    };
    let expanded = match meta.get("expanded") {
        None => None,
        Some(expanded) => Some(expanded.as_bool().ok_or_else(|| {
            PatchError::InvalidOp("'meta.expanded' must be a boolean".into())
        })?),
    };
    Ok(Some(OpMeta {
        kind,
        before,
        expanded,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(op: PatchOp) -> PatchOp {
        from_json(&to_json(&op)).expect("roundtrip failed")
    }

    #[test]
    fn roundtrip_basic_ops() {
        let ops = vec![
            PatchOp::add(parse_json_pointer("/a"), json!(1)),
            PatchOp::remove(parse_json_pointer("/a/0")),
            PatchOp::replace(parse_json_pointer(""), json!({"x": 1})),
            PatchOp::Copy {
                path: parse_json_pointer("/b"),
                from: parse_json_pointer("/a"),
                meta: None,
            },
            PatchOp::Move {
                from: parse_json_pointer("/a"),
                path: parse_json_pointer("/b"),
                meta: Some(OpMeta::before("c")),
            },
            PatchOp::test(parse_json_pointer("/a"), json!(null)),
        ];
        for op in ops {
            assert_eq!(roundtrip(op.clone()), op);
        }
    }

    #[test]
    fn roundtrip_full_meta() {
        let op = PatchOp::Add {
            path: parse_json_pointer("/a"),
            value: json!({"x": 1}),
            meta: Some(OpMeta {
                kind: Some(NodeKind::Object),
                before: Some("b".to_string()),
                expanded: Some(true),
            }),
        };
        assert_eq!(roundtrip(op.clone()), op);
    }

    #[test]
    fn empty_meta_is_omitted() {
        let op = PatchOp::Add {
            path: parse_json_pointer("/a"),
            value: json!(1),
            meta: Some(OpMeta::default()),
        };
        let encoded = to_json(&op);
        assert!(encoded.get("meta").is_none());
    }

    #[test]
    fn decodes_rfc6902_wire_format() {
        let wire = json!([
            {"op": "add", "path": "/foo", "value": 1},
            {"op": "remove", "path": "/bar"},
            {"op": "test", "path": "/baz", "value": [1, 2]},
        ]);
        let ops = from_json_patch(&wire).unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].op_name(), "add");
        assert_eq!(ops[2].op_name(), "test");
    }

    #[test]
    fn unknown_op_is_rejected() {
        let err = from_json(&json!({"op": "explode", "path": "/a"})).unwrap_err();
        assert_eq!(err, PatchError::UnknownOp("explode".to_string()));
    }

    #[test]
    fn move_without_from_is_rejected() {
        let err = from_json(&json!({"op": "move", "path": "/a"})).unwrap_err();
        assert_eq!(err, PatchError::MissingFrom("move".to_string()));
    }

    #[test]
    fn test_without_value_decodes() {
        let op = from_json(&json!({"op": "test", "path": "/a"})).unwrap();
        assert_eq!(
            op,
            PatchOp::Test {
                path: parse_json_pointer("/a"),
                value: None,
            }
        );
    }

    #[test]
    fn escaped_pointers_roundtrip() {
        let op = PatchOp::remove(parse_json_pointer("/a~0b/c~1d"));
        let encoded = to_json(&op);
        assert_eq!(encoded["path"], "/a~0b/c~1d");
        assert_eq!(roundtrip(op.clone()), op);
    }
}
