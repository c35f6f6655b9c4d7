//! The error/annotation tree and the standardized output shapes
//!
//! One `ResultNode` tree is the single result type threaded from the
//! validation executor to the output formatter. Formatters are pure
//! projections of a completed tree; nothing here re-runs validation.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Selector for the standardized output shapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Flat, caller-legible list preserving historical message wording
    #[default]
    Classic,
    /// `{"valid": bool}` only
    Flag,
    /// Flat list of failing units, the 2019-09 "Basic" output shape
    Basic,
    /// Tree mirroring the schema structure, pruned to failing branches
    Detailed,
    /// Like detailed but retaining passing branches and their annotations
    Verbose,
}

/// One node of the error/annotation tree
///
/// The root corresponds to the top-level schema/instance pair; each evaluated
/// keyword contributes a labeled child. Structural keywords nest the
/// sub-results of their subschemas.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultNode {
    /// Whether this (sub)schema application succeeded
    pub valid: bool,
    /// The keyword that produced this node, `None` for whole-schema nodes
    pub keyword: Option<String>,
    /// Dynamic keyword location: JSON pointer through the evaluation path,
    /// including `$ref` hops (`/properties/a/$ref/type`)
    pub keyword_location: String,
    /// Canonical URI of the schema location (`https://...#/properties/a`)
    pub absolute_keyword_location: Option<String>,
    /// JSON pointer into the instance
    pub instance_location: String,
    /// Human-readable error message when invalid
    pub error: Option<String>,
    /// Keyword-specific detail payload (expected vs. actual bound, ...)
    pub detail: Option<Value>,
    /// Annotation value contributed by a non-asserting keyword
    pub annotation: Option<Value>,
    /// Sub-results from structural keywords
    pub children: Vec<ResultNode>,
}

impl ResultNode {
    /// Create a passing node
    #[must_use]
    pub fn passed(keyword_location: impl Into<String>, instance_location: impl Into<String>) -> Self {
        Self {
            valid: true,
            keyword: None,
            keyword_location: keyword_location.into(),
            absolute_keyword_location: None,
            instance_location: instance_location.into(),
            error: None,
            detail: None,
            annotation: None,
            children: Vec::new(),
        }
    }

    /// Create a failing node with an error message
    #[must_use]
    pub fn failed(
        keyword_location: impl Into<String>,
        instance_location: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            ..Self::passed(keyword_location, instance_location)
        }
    }

    /// Label the node with the keyword that produced it
    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Attach the canonical URI of the schema location
    #[must_use]
    pub fn with_absolute_location(mut self, uri: impl Into<String>) -> Self {
        self.absolute_keyword_location = Some(uri.into());
        self
    }

    /// Attach a keyword-specific detail payload
    #[must_use]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Attach an annotation value
    #[must_use]
    pub fn with_annotation(mut self, annotation: Value) -> Self {
        self.annotation = Some(annotation);
        self
    }

    /// Append a child sub-result
    pub fn push_child(&mut self, child: ResultNode) {
        self.children.push(child);
    }

    /// Count failing nodes in the whole subtree, this node included
    #[must_use]
    pub fn failure_count(&self) -> usize {
        let own = usize::from(!self.valid && self.error.is_some());
        own + self.children.iter().map(ResultNode::failure_count).sum::<usize>()
    }

    /// Depth-first iteration over every node carrying an error message
    pub fn failures(&self) -> Vec<&ResultNode> {
        let mut out = Vec::new();
        self.collect_failures(&mut out);
        out
    }

    fn collect_failures<'a>(&'a self, out: &mut Vec<&'a ResultNode>) {
        if !self.valid && self.error.is_some() {
            out.push(self);
        }
        for child in &self.children {
            child.collect_failures(out);
        }
    }
}

impl fmt::Display for ResultNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "valid at {}", self.instance_location)
        } else {
            let failures = self.failures();
            writeln!(f, "{} validation failure(s):", failures.len())?;
            for failure in failures {
                writeln!(
                    f,
                    "  {} at {}: {}",
                    failure.keyword.as_deref().unwrap_or("schema"),
                    failure.instance_location,
                    failure.error.as_deref().unwrap_or_default()
                )?;
            }
            Ok(())
        }
    }
}

/// Properties and array items claimed by applicators within one schema
/// object's evaluation of one instance location
///
/// `unevaluatedProperties`/`unevaluatedItems` consult the merged coverage of
/// all sibling applicators, including those reached through `$ref` and the
/// in-place combinators, before deciding what is left over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Property names evaluated at this instance location
    pub properties: BTreeSet<String>,
    /// Array indices evaluated at this instance location
    pub items: BTreeSet<usize>,
}

impl Coverage {
    /// Merge another coverage set into this one
    pub fn merge(&mut self, other: &Coverage) {
        self.properties.extend(other.properties.iter().cloned());
        self.items.extend(other.items.iter().copied());
    }
}

/// A unit of the standardized structured output shapes
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutputUnit {
    /// Whether this unit passed
    pub valid: bool,
    /// Dynamic keyword location
    #[serde(rename = "keywordLocation")]
    pub keyword_location: String,
    /// Canonical schema URI, when it differs from the dynamic path
    #[serde(rename = "absoluteKeywordLocation", skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    /// JSON pointer into the instance
    #[serde(rename = "instanceLocation")]
    pub instance_location: String,
    /// Error message, for failing units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Annotation value, for passing units in verbose output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Value>,
    /// Nested failing units
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OutputUnit>,
    /// Nested passing units, retained by verbose output only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<OutputUnit>,
}

impl OutputUnit {
    /// A minimal unit carrying locations and validity
    #[must_use]
    pub fn new(valid: bool, keyword_location: String, instance_location: String) -> Self {
        Self {
            valid,
            keyword_location,
            absolute_keyword_location: None,
            instance_location,
            error: None,
            annotation: None,
            errors: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

/// One entry of the legacy flat ("classic") output
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassicError {
    /// Historical human-readable message
    pub error: String,
    /// The keyword that failed
    pub keyword: String,
    /// JSON pointer to the failing keyword within the schema
    pub schema_pointer: String,
    /// JSON pointer into the instance
    pub instance_pointer: String,
}
