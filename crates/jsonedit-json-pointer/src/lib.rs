//! JSON Pointer (RFC 6901) codec and typed path utilities.
//!
//! A pointer string is parsed into a [`Path`] of typed segments
//! ([`PathKey::Index`] / [`PathKey::Name`]) and compiled back losslessly:
//! `compile_json_pointer(&parse_json_pointer(s)) == s` for any
//! syntactically valid pointer. Malformed pointers are out of scope; this
//! is deliberately not a complete RFC implementation.
//!
//! # Example
//!
//! ```
//! use jsonedit_json_pointer::{parse_json_pointer, compile_json_pointer, PathKey};
//!
//! let path = parse_json_pointer("/foo/2/a~1b");
//! assert_eq!(path, vec![
//!     PathKey::name("foo"),
//!     PathKey::index(2),
//!     PathKey::name("a/b"),
//! ]);
//! assert_eq!(compile_json_pointer(&path), "/foo/2/a~1b");
//! ```

use serde_json::Value;

pub mod types;
pub use types::{Path, PathKey};

/// Unescapes a pointer segment: `~1` becomes `/`, then `~0` becomes `~`.
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // Order matters: ~1 before ~0
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a pointer segment: `~` becomes `~0`, then `/` becomes `~1`.
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    // Order matters: ~ before /
    component.replace('~', "~0").replace('/', "~1")
}

/// Check whether a string is a valid array index: digits only, no leading
/// zero (except `"0"` itself).
pub fn is_valid_index(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    let bytes = segment.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

fn classify_segment(segment: String) -> PathKey {
    if is_valid_index(&segment) {
        // Parse cannot fail after is_valid_index, but very long digit runs
        // can overflow usize; those stay names and round-trip as such.
        match segment.parse() {
            Ok(index) => PathKey::Index(index),
            Err(_) => PathKey::Name(segment),
        }
    } else {
        PathKey::Name(segment)
    }
}

/// Parse a JSON Pointer string into a [`Path`].
///
/// The empty pointer is the root path. The leading `/` is dropped, each
/// segment is unescaped and classified as index or name.
///
/// ```
/// use jsonedit_json_pointer::{parse_json_pointer, PathKey};
///
/// assert_eq!(parse_json_pointer(""), Vec::<PathKey>::new());
/// assert_eq!(parse_json_pointer("/a~0b"), vec![PathKey::name("a~b")]);
/// ```
pub fn parse_json_pointer(pointer: &str) -> Path {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer[1..]
        .split('/')
        .map(|segment| classify_segment(unescape_component(segment)))
        .collect()
}

/// Compile a [`Path`] back into a JSON Pointer string.
///
/// The root path compiles to the empty string.
///
/// ```
/// use jsonedit_json_pointer::{compile_json_pointer, PathKey};
///
/// assert_eq!(compile_json_pointer(&[]), "");
/// assert_eq!(
///     compile_json_pointer(&[PathKey::name("a/b"), PathKey::index(0)]),
///     "/a~1b/0"
/// );
/// ```
pub fn compile_json_pointer(path: &[PathKey]) -> String {
    if path.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for key in path {
        out.push('/');
        match key {
            PathKey::Index(i) => out.push_str(&i.to_string()),
            PathKey::Name(name) => out.push_str(&escape_component(name)),
        }
    }
    out
}

// ── Path relations ────────────────────────────────────────────────────────

/// True for the root path.
pub fn is_root(path: &[PathKey]) -> bool {
    path.is_empty()
}

/// The parent of a path, or `None` for the root.
pub fn parent(path: &[PathKey]) -> Option<&[PathKey]> {
    if path.is_empty() {
        None
    } else {
        Some(&path[..path.len() - 1])
    }
}

/// The last segment of a path, or `None` for the root.
pub fn last(path: &[PathKey]) -> Option<&PathKey> {
    path.last()
}

/// True when `child` is strictly below `parent_path`.
pub fn is_child(parent_path: &[PathKey], child: &[PathKey]) -> bool {
    parent_path.len() < child.len() && starts_with(child, parent_path)
}

/// Segment-wise path equality.
pub fn is_path_equal(a: &[PathKey], b: &[PathKey]) -> bool {
    a == b
}

/// True when `path` begins with every segment of `prefix`.
pub fn starts_with(path: &[PathKey], prefix: &[PathKey]) -> bool {
    prefix.len() <= path.len() && path[..prefix.len()] == prefix[..]
}

/// The longest shared prefix of two paths.
pub fn common_prefix<'a>(a: &'a [PathKey], b: &[PathKey]) -> &'a [PathKey] {
    let len = a
        .iter()
        .zip(b.iter())
        .take_while(|(x, y)| x == y)
        .count();
    &a[..len]
}

// ── Value navigation ──────────────────────────────────────────────────────

/// Get a reference into a JSON value by path.
///
/// Segments coerce by the container they address: names that look like
/// indices step into arrays, indices step into objects by their string
/// form. Returns `None` for absent paths, the `-` sentinel, and any step
/// through a primitive.
///
/// ```
/// use jsonedit_json_pointer::{get, parse_json_pointer};
/// use serde_json::json;
///
/// let doc = json!({"a": {"b": [1, 2, 3]}});
/// assert_eq!(get(&doc, &parse_json_pointer("/a/b/1")), Some(&json!(2)));
/// assert_eq!(get(&doc, &parse_json_pointer("/a/missing")), None);
/// ```
pub fn get<'a>(doc: &'a Value, path: &[PathKey]) -> Option<&'a Value> {
    let mut current = doc;
    for key in path {
        match current {
            Value::Array(items) => {
                current = items.get(key.array_index()?)?;
            }
            Value::Object(props) => {
                current = props.get(key.as_str().as_ref())?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Mutable counterpart of [`get`].
pub fn get_mut<'a>(doc: &'a mut Value, path: &[PathKey]) -> Option<&'a mut Value> {
    let mut current = doc;
    for key in path {
        match current {
            Value::Array(items) => {
                current = items.get_mut(key.array_index()?)?;
            }
            Value::Object(props) => {
                current = props.get_mut(key.as_str().as_ref())?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// True when `path` addresses an existing location in `doc`.
///
/// The root path always exists.
pub fn exists(doc: &Value, path: &[PathKey]) -> bool {
    get(doc, path).is_some()
}
