//! Merging schema-validator errors onto the tree.
//!
//! The validator is an external collaborator; this module only stamps its
//! error objects onto the nodes their `dataPath` addresses and clears
//! stamps that are no longer reported. Clearing is diffed against the set
//! of previously stamped paths, not done by a full rebuild.

use std::sync::Arc;

use jsonedit_json_pointer::{parse_json_pointer, Path};

use crate::immutable::update_in;
use crate::tree::node::{DocNode, SchemaError};

/// Stamp `errors` onto the tree and clear stale stamps.
///
/// `previous` is the path set returned by the last call (empty on the
/// first). Returns the updated tree and the new stamped-path set. Errors
/// whose path does not resolve are skipped.
pub fn apply_errors(
    tree: &Arc<DocNode>,
    errors: &[SchemaError],
    previous: &[Path],
) -> (Arc<DocNode>, Vec<Path>) {
    let mut current = Arc::clone(tree);
    let mut stamped: Vec<Path> = Vec::with_capacity(errors.len());

    for error in errors {
        let path = parse_json_pointer(&error.data_path);
        let result = update_in(&current, &path, |node| {
            if node.error.as_ref() == Some(error) {
                return Arc::clone(node);
            }
            let mut next = (**node).clone();
            next.error = Some(error.clone());
            Arc::new(next)
        });
        if let Ok(updated) = result {
            current = updated;
            stamped.push(path);
        }
    }

    for old in previous {
        if stamped.iter().any(|path| path == old) {
            continue;
        }
        let result = update_in(&current, old, |node| {
            if node.error.is_none() {
                return Arc::clone(node);
            }
            let mut next = (**node).clone();
            next.error = None;
            Arc::new(next)
        });
        if let Ok(updated) = result {
            current = updated;
        }
    }

    (current, stamped)
}
