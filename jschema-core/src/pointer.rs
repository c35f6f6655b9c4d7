//! JSON-pointer locations for schema and instance positions
//!
//! Both the dynamic keyword location and the instance location of every
//! result-tree node are tracked as JSON pointers (RFC 6901). `Location` is a
//! cheap clone-and-extend value so the executor can hand each recursion its
//! own location without push/pop bookkeeping.

use std::fmt;

/// Escape a single reference token per RFC 6901
#[must_use]
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// A JSON-pointer location built up during traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    segments: Vec<String>,
}

impl Location {
    /// The root location (empty pointer)
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Extend with a property name or keyword token
    #[must_use]
    pub fn push(&self, token: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(token.into());
        Self { segments }
    }

    /// Extend with an array index
    #[must_use]
    pub fn push_index(&self, index: usize) -> Self {
        self.push(index.to_string())
    }

    /// Whether this is the root location
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Render as a JSON pointer string (`""` at root, `/a/0` otherwise)
    #[must_use]
    pub fn as_pointer(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            out.push_str(&escape_token(segment));
        }
        out
    }

    /// Render as a URI fragment (`#`, `#/a/0`)
    #[must_use]
    pub fn as_fragment(&self) -> String {
        format!("#{}", self.as_pointer())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_pointer())
    }
}
