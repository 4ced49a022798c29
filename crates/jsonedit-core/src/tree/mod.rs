//! The annotated document tree: node model, synchronization, expand state
//! and schema-error stamping.

pub mod errors;
pub mod expand;
pub mod node;
pub mod sync;

pub use errors::apply_errors;
pub use expand::{expand_by, expand_one, expand_path, is_expanded};
pub use node::{DocNode, NodeContent, NodeKind, SchemaError, SearchState, SelectionFlags};
pub use sync::{build, sync};
