//! JSON Schema draft identification and per-draft behavior flags

use serde::{Deserialize, Serialize};
use std::fmt;

/// A versioned edition of the JSON Schema specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Draft {
    /// Draft 4 (`http://json-schema.org/draft-04/schema#`)
    Draft4,
    /// Draft 6 (`http://json-schema.org/draft-06/schema#`)
    Draft6,
    /// Draft 7 (`http://json-schema.org/draft-07/schema#`)
    Draft7,
    /// Draft 2019-09 (`https://json-schema.org/draft/2019-09/schema`)
    Draft201909,
    /// Draft 2020-12 (`https://json-schema.org/draft/2020-12/schema`)
    Draft202012,
}

impl Draft {
    /// The latest built-in draft, used when neither the schema nor the
    /// configuration names a meta-schema
    pub const LATEST: Draft = Draft::Draft202012;

    /// All built-in drafts, oldest first
    pub const ALL: [Draft; 5] = [
        Draft::Draft4,
        Draft::Draft6,
        Draft::Draft7,
        Draft::Draft201909,
        Draft::Draft202012,
    ];

    /// The canonical meta-schema URI for this draft
    #[must_use]
    pub fn uri(self) -> &'static str {
        match self {
            Draft::Draft4 => "http://json-schema.org/draft-04/schema",
            Draft::Draft6 => "http://json-schema.org/draft-06/schema",
            Draft::Draft7 => "http://json-schema.org/draft-07/schema",
            Draft::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
            Draft::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
        }
    }

    /// Identify a draft from a `$schema` URI
    ///
    /// Tolerates a trailing empty fragment (`...#`) and an `https`/`http`
    /// scheme mismatch, both of which appear in the wild.
    #[must_use]
    pub fn from_schema_uri(uri: &str) -> Option<Draft> {
        let trimmed = uri.trim_end_matches('#');
        let normalized = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))?;
        Draft::ALL.into_iter().find(|draft| {
            let canonical = draft.uri();
            canonical
                .strip_prefix("https://")
                .or_else(|| canonical.strip_prefix("http://"))
                == Some(normalized)
        })
    }

    /// The keyword naming embedded-resource identifiers: `id` in draft 4,
    /// `$id` afterwards
    #[must_use]
    pub fn id_keyword(self) -> &'static str {
        match self {
            Draft::Draft4 => "id",
            _ => "$id",
        }
    }

    /// Whether `exclusiveMaximum`/`exclusiveMinimum` are boolean modifiers of
    /// `maximum`/`minimum` (draft 4) rather than standalone numeric keywords
    #[must_use]
    pub fn exclusive_bounds_are_modifiers(self) -> bool {
        self == Draft::Draft4
    }

    /// Whether a `$ref` keyword suppresses all sibling keywords
    /// (drafts 4 through 7)
    #[must_use]
    pub fn ref_ignores_siblings(self) -> bool {
        self < Draft::Draft201909
    }

    /// Whether the draft defines `unevaluatedProperties`/`unevaluatedItems`
    #[must_use]
    pub fn supports_unevaluated(self) -> bool {
        self >= Draft::Draft201909
    }

    /// Whether the draft defines `$anchor` (before 2019-09, plain-fragment
    /// `$id`/`id` values play the anchor role)
    #[must_use]
    pub fn supports_anchor(self) -> bool {
        self >= Draft::Draft201909
    }

    /// Whether `contentEncoding`/`contentMediaType` assert by default; from
    /// 2019-09 on they are annotation-only
    #[must_use]
    pub fn content_asserts(self) -> bool {
        self == Draft::Draft7
    }
}

impl fmt::Display for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_schema_uri() {
        assert_eq!(
            Draft::from_schema_uri("https://json-schema.org/draft/2020-12/schema"),
            Some(Draft::Draft202012)
        );
        assert_eq!(
            Draft::from_schema_uri("http://json-schema.org/draft-04/schema#"),
            Some(Draft::Draft4)
        );
        assert_eq!(
            Draft::from_schema_uri("http://json-schema.org/draft-07/schema"),
            Some(Draft::Draft7)
        );
        assert_eq!(Draft::from_schema_uri("https://example.com/dialect"), None);
    }

    #[test]
    fn test_behavior_flags() {
        assert!(Draft::Draft4.exclusive_bounds_are_modifiers());
        assert!(!Draft::Draft6.exclusive_bounds_are_modifiers());
        assert!(Draft::Draft7.ref_ignores_siblings());
        assert!(!Draft::Draft201909.ref_ignores_siblings());
        assert!(Draft::Draft202012.supports_unevaluated());
        assert!(!Draft::Draft7.supports_unevaluated());
    }

    #[test]
    fn test_ordering_tracks_publication() {
        assert!(Draft::Draft4 < Draft::Draft6);
        assert!(Draft::Draft7 < Draft::Draft201909);
        assert_eq!(Draft::LATEST, Draft::Draft202012);
    }
}
