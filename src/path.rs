//! Locations inside a [`Value`](crate::Value) tree.
//!
//! A [`Path`] is the sequence of object keys and array indices leading from
//! the root of a tree to one of its nodes. The resolver records one path per
//! token it discovers and uses it both to rebuild the tree and to report
//! where a failure happened.
//!
//! ## Examples
//!
//! ```rust
//! use serde_dataref::{Path, PathSegment};
//!
//! let path: Path = vec![
//!     PathSegment::Key("items".to_string()),
//!     PathSegment::Index(2),
//! ]
//! .into();
//!
//! assert_eq!(path.to_string(), "$.items[2]");
//! assert_eq!(path.len(), 2);
//! ```

use std::fmt;

/// One step of a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// A key in an object.
    Key(String),
    /// A position in an array.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => {
                if is_plain_key(key) {
                    write!(f, ".{}", key)
                } else {
                    write!(f, "[{:?}]", key)
                }
            }
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A path from the root of a tree to one of its nodes.
///
/// The empty path designates the root itself and displays as `$`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<PathSegment>);

impl Path {
    /// Creates the root path.
    #[must_use]
    pub fn root() -> Self {
        Path(Vec::new())
    }

    /// Returns the segments of this path, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path extended by `segment`.
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Path(segments)
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Path(segments)
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<T: IntoIterator<Item = PathSegment>>(iter: T) -> Self {
        Path(iter.into_iter().collect())
    }
}
