//! Node identity and the injectable id source.
//!
//! Every annotated node carries an opaque [`NodeId`] that survives edits
//! according to the synchronization rules. Ids come from an explicit
//! [`IdSource`] threaded through sync and patch calls, so tests can pin a
//! deterministic sequence and nothing hides behind a global counter.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Opaque, stable per-node identity token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Build an id from a raw value. Intended for tests and codecs; normal
    /// code obtains ids from an [`IdSource`].
    pub fn from_raw(raw: u64) -> Self {
        NodeId(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of fresh node ids.
pub trait IdSource {
    fn next_id(&mut self) -> NodeId;
}

/// Monotonic counter source. Deterministic; the default for editors.
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        SequentialIds { next: 1 }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// Random source backed by [`rand`]; useful when node ids must not be
/// guessable across documents.
pub struct RandomIds {
    rng: StdRng,
}

impl RandomIds {
    pub fn new() -> Self {
        RandomIds {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        RandomIds {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for RandomIds {
    fn next_id(&mut self) -> NodeId {
        NodeId(self.rng.gen())
    }
}
