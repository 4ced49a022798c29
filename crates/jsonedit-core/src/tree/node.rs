//! The annotated node type.
//!
//! A [`DocNode`] mirrors the shape of a JSON value and carries the per-node
//! state the renderer needs but plain JSON cannot hold: a stable identity,
//! the expand flag, a schema error stamp, and search/selection markers.
//! Children are `Arc`-shared; rebuilding a tree reuses every unchanged
//! subtree by reference.

use std::sync::Arc;

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use jsonedit_json_pointer::PathKey;

use crate::id::NodeId;

/// The three shapes an annotated node can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Array,
    Object,
    Value,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Array => "array",
            NodeKind::Object => "object",
            NodeKind::Value => "value",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "array" => Some(NodeKind::Array),
            "object" => Some(NodeKind::Object),
            "value" => Some(NodeKind::Value),
            _ => None,
        }
    }

    /// The kind a plain JSON value maps to.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Array(_) => NodeKind::Array,
            Value::Object(_) => NodeKind::Object,
            _ => NodeKind::Value,
        }
    }
}

bitflags! {
    /// Selection markers stamped onto nodes by the selection resolver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SelectionFlags: u16 {
        const SELECTED = 1;
        const START = 1 << 1;
        const END = 1 << 2;
        const FIRST = 1 << 3;
        const LAST = 1 << 4;
        const INSIDE = 1 << 5;
        const AFTER = 1 << 6;
        const BEFORE_CHILDREN = 1 << 7;
    }
}

/// Search annotation on a property name or a leaf value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Normal,
    Active,
}

/// A schema-validator error object, consumed as-is and stamped onto the
/// node its `dataPath` addresses. This core never validates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaError {
    #[serde(rename = "dataPath")]
    pub data_path: String,
    pub message: String,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Node content: a leaf JSON value or ordered children.
#[derive(Debug, Clone)]
pub enum NodeContent {
    /// Leaf: null, bool, number or string. Never an array or object.
    Value(Value),
    Array(Vec<Arc<DocNode>>),
    Object(IndexMap<String, Arc<DocNode>>),
}

/// One node of the annotated tree.
#[derive(Debug, Clone)]
pub struct DocNode {
    pub id: NodeId,
    pub content: NodeContent,
    pub expanded: bool,
    pub error: Option<SchemaError>,
    pub search_property: Option<SearchState>,
    pub search_value: Option<SearchState>,
    pub selection: SelectionFlags,
}

impl DocNode {
    pub fn leaf(id: NodeId, value: Value) -> Self {
        debug_assert!(
            !value.is_array() && !value.is_object(),
            "leaf nodes hold primitives only"
        );
        DocNode {
            id,
            content: NodeContent::Value(value),
            expanded: false,
            error: None,
            search_property: None,
            search_value: None,
            selection: SelectionFlags::empty(),
        }
    }

    pub fn array(id: NodeId, children: Vec<Arc<DocNode>>) -> Self {
        DocNode {
            id,
            content: NodeContent::Array(children),
            expanded: false,
            error: None,
            search_property: None,
            search_value: None,
            selection: SelectionFlags::empty(),
        }
    }

    pub fn object(id: NodeId, children: IndexMap<String, Arc<DocNode>>) -> Self {
        DocNode {
            id,
            content: NodeContent::Object(children),
            expanded: false,
            error: None,
            search_property: None,
            search_value: None,
            selection: SelectionFlags::empty(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.content {
            NodeContent::Value(_) => NodeKind::Value,
            NodeContent::Array(_) => NodeKind::Array,
            NodeContent::Object(_) => NodeKind::Object,
        }
    }

    pub fn is_container(&self) -> bool {
        !matches!(self.content, NodeContent::Value(_))
    }

    /// The leaf value, for `kind() == Value` nodes.
    pub fn value(&self) -> Option<&Value> {
        match &self.content {
            NodeContent::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Number of direct children; zero for leaves.
    pub fn child_count(&self) -> usize {
        match &self.content {
            NodeContent::Value(_) => 0,
            NodeContent::Array(children) => children.len(),
            NodeContent::Object(children) => children.len(),
        }
    }

    /// Child addressed by a path segment, coerced by this node's kind.
    pub fn child(&self, key: &PathKey) -> Option<&Arc<DocNode>> {
        match &self.content {
            NodeContent::Value(_) => None,
            NodeContent::Array(children) => children.get(key.array_index()?),
            NodeContent::Object(children) => children.get(key.as_str().as_ref()),
        }
    }

    /// Position of the child addressed by `key` among this node's ordered
    /// children.
    pub fn child_index(&self, key: &PathKey) -> Option<usize> {
        match &self.content {
            NodeContent::Value(_) => None,
            NodeContent::Array(children) => {
                let index = key.array_index()?;
                (index < children.len()).then_some(index)
            }
            NodeContent::Object(children) => children.get_index_of(key.as_str().as_ref()),
        }
    }

    /// The path segment addressing the child at `index`.
    pub fn key_at(&self, index: usize) -> Option<PathKey> {
        match &self.content {
            NodeContent::Value(_) => None,
            NodeContent::Array(children) => {
                (index < children.len()).then_some(PathKey::Index(index))
            }
            NodeContent::Object(children) => children
                .get_index(index)
                .map(|(name, _)| PathKey::Name(name.clone())),
        }
    }

    /// Property names in declaration order; empty for non-objects.
    pub fn property_names(&self) -> Vec<&str> {
        match &self.content {
            NodeContent::Object(children) => children.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Extract the plain JSON value this subtree represents.
    pub fn to_value(&self) -> Value {
        match &self.content {
            NodeContent::Value(v) => v.clone(),
            NodeContent::Array(children) => {
                Value::Array(children.iter().map(|c| c.to_value()).collect())
            }
            NodeContent::Object(children) => Value::Object(
                children
                    .iter()
                    .map(|(name, c)| (name.clone(), c.to_value()))
                    .collect(),
            ),
        }
    }

    /// Shallow copy with different array children, keeping id and state.
    pub(crate) fn with_array_children(&self, children: Vec<Arc<DocNode>>) -> DocNode {
        let mut node = self.clone();
        node.content = NodeContent::Array(children);
        node
    }

    /// Shallow copy with different object children, keeping id and state.
    pub(crate) fn with_object_children(&self, children: IndexMap<String, Arc<DocNode>>) -> DocNode {
        let mut node = self.clone();
        node.content = NodeContent::Object(children);
        node
    }
}
