//! Full-tree text search.
//!
//! Traverses every node in document order; object property names match
//! when they contain the query case-insensitively (array indices never
//! match), leaf values match on their display string. At one node the
//! property match precedes the value match. Matches are annotated onto
//! the tree, the first one as the active match; `next_result` and
//! `previous_result` move the active marker, re-tagging only the two
//! entries involved.

use std::collections::HashMap;
use std::sync::Arc;

use jsonedit_json_pointer::{Path, PathKey};

use crate::immutable::{map_nodes, update_in};
use crate::tree::node::{DocNode, NodeContent, SearchState};

/// Where a match was found: the property name or the (leaf) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchArea {
    Property,
    Value,
}

/// One search match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub path: Path,
    pub area: SearchArea,
}

/// The result of a search: the ordered match list and the active index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub text: String,
    pub matches: Vec<SearchMatch>,
    pub active: Option<usize>,
}

impl SearchResults {
    pub fn active_match(&self) -> Option<&SearchMatch> {
        self.matches.get(self.active?)
    }
}

/// Search the tree for `text` and annotate every match.
///
/// An empty query clears all search annotations and yields no matches.
pub fn search(tree: &Arc<DocNode>, text: &str) -> (Arc<DocNode>, SearchResults) {
    let mut matches = Vec::new();
    if !text.is_empty() {
        let mut path = Vec::new();
        collect_matches(tree, text, &mut path, &mut matches);
    }
    let active = if matches.is_empty() { None } else { Some(0) };
    let results = SearchResults {
        text: text.to_string(),
        matches,
        active,
    };
    (annotate(tree, &results), results)
}

/// Clear every search annotation, sharing untouched subtrees.
pub fn clear_search(tree: &Arc<DocNode>) -> Arc<DocNode> {
    let empty = SearchResults {
        text: String::new(),
        matches: Vec::new(),
        active: None,
    };
    annotate(tree, &empty)
}

/// Move the active marker to the next match, wrapping at the end.
pub fn next_result(
    tree: &Arc<DocNode>,
    results: &SearchResults,
) -> (Arc<DocNode>, SearchResults) {
    step_active(tree, results, 1)
}

/// Move the active marker to the previous match, wrapping at the start.
pub fn previous_result(
    tree: &Arc<DocNode>,
    results: &SearchResults,
) -> (Arc<DocNode>, SearchResults) {
    step_active(tree, results, -1)
}

fn step_active(
    tree: &Arc<DocNode>,
    results: &SearchResults,
    step: isize,
) -> (Arc<DocNode>, SearchResults) {
    let count = results.matches.len();
    let Some(active) = results.active.filter(|_| count > 0) else {
        return (Arc::clone(tree), results.clone());
    };
    let next = (active as isize + step).rem_euclid(count as isize) as usize;
    if next == active {
        return (Arc::clone(tree), results.clone());
    }
    // re-tag only the outgoing and incoming active matches
    let outgoing = &results.matches[active];
    let incoming = &results.matches[next];
    let tree = set_match_state(tree, outgoing, Some(SearchState::Normal));
    let tree = set_match_state(&tree, incoming, Some(SearchState::Active));
    let mut updated = results.clone();
    updated.active = Some(next);
    (tree, updated)
}

// ── Traversal ─────────────────────────────────────────────────────────────

fn collect_matches(
    node: &Arc<DocNode>,
    text: &str,
    path: &mut Vec<PathKey>,
    out: &mut Vec<SearchMatch>,
) {
    match &node.content {
        NodeContent::Value(value) => {
            if jsonedit_util::contains_ci(&jsonedit_util::value_to_display_string(value), text) {
                out.push(SearchMatch {
                    path: path.clone(),
                    area: SearchArea::Value,
                });
            }
        }
        NodeContent::Array(children) => {
            // indices never match
            for (index, child) in children.iter().enumerate() {
                path.push(PathKey::Index(index));
                collect_matches(child, text, path, out);
                path.pop();
            }
        }
        NodeContent::Object(children) => {
            for (name, child) in children {
                path.push(PathKey::Name(name.clone()));
                if jsonedit_util::contains_ci(name, text) {
                    out.push(SearchMatch {
                        path: path.clone(),
                        area: SearchArea::Property,
                    });
                }
                collect_matches(child, text, path, out);
                path.pop();
            }
        }
    }
}

// ── Annotation ────────────────────────────────────────────────────────────

fn annotate(tree: &Arc<DocNode>, results: &SearchResults) -> Arc<DocNode> {
    let mut states: HashMap<&[PathKey], (Option<SearchState>, Option<SearchState>)> =
        HashMap::new();
    for (index, m) in results.matches.iter().enumerate() {
        let state = if results.active == Some(index) {
            SearchState::Active
        } else {
            SearchState::Normal
        };
        let entry = states.entry(m.path.as_slice()).or_default();
        match m.area {
            SearchArea::Property => entry.0 = Some(state),
            SearchArea::Value => entry.1 = Some(state),
        }
    }

    map_nodes(tree, &mut |path, node| {
        let (property, value) = states.get(path).copied().unwrap_or((None, None));
        if node.search_property == property && node.search_value == value {
            return Arc::clone(node);
        }
        let mut next = (**node).clone();
        next.search_property = property;
        next.search_value = value;
        Arc::new(next)
    })
}

fn set_match_state(
    tree: &Arc<DocNode>,
    m: &SearchMatch,
    state: Option<SearchState>,
) -> Arc<DocNode> {
    update_in(tree, &m.path, |node| {
        let mut next = (**node).clone();
        match m.area {
            SearchArea::Property => next.search_property = state,
            SearchArea::Value => next.search_value = state,
        }
        Arc::new(next)
    })
    .unwrap_or_else(|_| Arc::clone(tree))
}
