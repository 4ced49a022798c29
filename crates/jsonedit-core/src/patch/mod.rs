//! The patch engine: ordered JSON-Patch-style operations with revert
//! generation, in a generic (plain JSON) and a tree-aware variant.

pub mod apply;
pub mod apply_tree;
pub mod codec;
pub mod op;

pub use apply::apply_patch;
pub use apply_tree::apply_patch_tree;
pub use codec::{from_json, from_json_patch, to_json, to_json_patch};
pub use op::{OpMeta, PatchError, PatchOp, PatchResult, TestFailure, TreePatchResult};
