//! Typed path segments.

use std::borrow::Cow;
use std::fmt;

/// One segment of a [`Path`]: an array index or an object property name.
///
/// Pointer parsing classifies digit-only segments without leading zeros as
/// `Index`; everything else (including the `-` append sentinel and `"01"`)
/// stays a `Name`. Resolution against a concrete container coerces by the
/// container's kind, see [`PathKey::array_index`] and [`PathKey::as_str`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Index(usize),
    Name(String),
}

/// A parsed JSON Pointer: an ordered sequence of segments from the root.
pub type Path = Vec<PathKey>;

impl PathKey {
    pub fn name(name: impl Into<String>) -> Self {
        PathKey::Name(name.into())
    }

    pub fn index(index: usize) -> Self {
        PathKey::Index(index)
    }

    /// The segment interpreted as an array index.
    ///
    /// `Name` segments that hold a valid index (digits, no leading zero)
    /// coerce; the `-` sentinel and non-numeric names do not.
    pub fn array_index(&self) -> Option<usize> {
        match self {
            PathKey::Index(i) => Some(*i),
            PathKey::Name(name) => {
                if crate::is_valid_index(name) {
                    name.parse().ok()
                } else {
                    None
                }
            }
        }
    }

    /// True for the `-` append sentinel.
    pub fn is_append(&self) -> bool {
        matches!(self, PathKey::Name(name) if name == "-")
    }

    /// The segment interpreted as an object property name.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            PathKey::Index(i) => Cow::Owned(i.to_string()),
            PathKey::Name(name) => Cow::Borrowed(name),
        }
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Index(i) => write!(f, "{i}"),
            PathKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

impl From<&str> for PathKey {
    fn from(name: &str) -> Self {
        PathKey::Name(name.to_string())
    }
}

impl From<String> for PathKey {
    fn from(name: String) -> Self {
        PathKey::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_index_coercion() {
        assert_eq!(PathKey::Index(3).array_index(), Some(3));
        assert_eq!(PathKey::name("3").array_index(), Some(3));
        assert_eq!(PathKey::name("03").array_index(), None);
        assert_eq!(PathKey::name("-").array_index(), None);
        assert_eq!(PathKey::name("foo").array_index(), None);
    }

    #[test]
    fn append_sentinel() {
        assert!(PathKey::name("-").is_append());
        assert!(!PathKey::Index(0).is_append());
        assert!(!PathKey::name("--").is_append());
    }

    #[test]
    fn as_str_coercion() {
        assert_eq!(PathKey::Index(7).as_str(), "7");
        assert_eq!(PathKey::name("foo").as_str(), "foo");
    }
}
