//! Pre-walked schema documents
//!
//! A `SchemaDocument` is the raw JSON of one retrievable schema plus the
//! indexes a single compile-time walk extracts from it: the base URI and
//! draft in effect at every subschema position, every embedded-resource
//! identifier, every anchor (plain, dynamic, and recursive), every reference
//! site, and every pattern. The walk only descends through positions the
//! draft grammar defines as subschemas, so `enum`/`const` payloads and other
//! arbitrary JSON are never misread as schemas.
//!
//! Everything downstream (resolution, compilation checks, evaluation) works
//! against these indexes instead of re-discovering structure at runtime.

use indexmap::IndexMap;
use jschema_core::draft::Draft;
use jschema_core::error::{Result, SchemaError};
use jschema_core::pointer;
use serde_json::Value;
use url::Url;

/// Base URI and draft in effect at one subschema position
#[derive(Debug, Clone)]
pub struct LocationInfo {
    pub base: Url,
    pub draft: Draft,
}

/// One `$ref`/`$recursiveRef`/`$dynamicRef` occurrence, recorded for
/// compile-time resolution
#[derive(Debug, Clone)]
pub struct RefSite {
    /// JSON Pointer to the schema object carrying the keyword
    pub pointer: String,
    /// The reference keyword itself
    pub keyword: String,
    /// Raw reference text, unresolved
    pub target: String,
    /// Base URI in effect at the site
    pub base: Url,
}

/// An unrecognized `$schema` value and where it appeared
#[derive(Debug, Clone)]
pub struct UnknownDialect {
    pub pointer: String,
    pub uri: String,
}

/// One raw JSON schema document with its compile-time indexes
#[derive(Debug)]
pub struct SchemaDocument {
    /// Canonical URI the document is registered under
    pub uri: Url,
    /// The raw schema JSON
    pub root: Value,
    /// Draft governing the document root
    pub draft: Draft,
    /// Pointer -> base URI and draft, for every walked position
    pub locations: IndexMap<String, LocationInfo>,
    /// (resource base URI, anchor name) -> pointer
    pub anchors: IndexMap<(String, String), String>,
    /// (resource base URI, anchor name) -> pointer, for `$dynamicAnchor`
    pub dynamic_anchors: IndexMap<(String, String), String>,
    /// Pointers of resource roots carrying `$recursiveAnchor: true`, keyed by
    /// resource base URI
    pub recursive_roots: IndexMap<String, String>,
    /// Absolute embedded-resource URI -> pointer
    pub ids: IndexMap<String, String>,
    /// Every reference site, in document order
    pub refs: Vec<RefSite>,
    /// Every `pattern` value and `patternProperties` key, with its pointer
    pub patterns: Vec<(String, String)>,
    /// `$schema` values the engine does not recognize
    pub unknown_dialects: Vec<UnknownDialect>,
}

/// Keywords whose value is a map of subschemas
const MAP_OF_SCHEMAS: &[&str] = &[
    "properties",
    "patternProperties",
    "definitions",
    "$defs",
    "dependentSchemas",
];

/// Keywords whose value is an array of subschemas
const LIST_OF_SCHEMAS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

/// Keywords whose value is a single subschema
const SINGLE_SCHEMA: &[&str] = &[
    "additionalProperties",
    "additionalItems",
    "unevaluatedItems",
    "unevaluatedProperties",
    "contains",
    "propertyNames",
    "not",
    "if",
    "then",
    "else",
    "contentSchema",
];

impl SchemaDocument {
    /// Walk a raw schema document and build its indexes
    ///
    /// `default_draft` applies when the root carries no recognized `$schema`.
    pub fn build(uri: Url, root: Value, default_draft: Draft) -> Result<Self> {
        let mut doc = SchemaDocument {
            uri: uri.clone(),
            draft: default_draft,
            root,
            locations: IndexMap::new(),
            anchors: IndexMap::new(),
            dynamic_anchors: IndexMap::new(),
            recursive_roots: IndexMap::new(),
            ids: IndexMap::new(),
            refs: Vec::new(),
            patterns: Vec::new(),
            unknown_dialects: Vec::new(),
        };

        let root = doc.root.clone();
        doc.walk(&root, String::new(), uri, default_draft, true)?;
        doc.draft = doc
            .locations
            .get("")
            .map_or(default_draft, |info| info.draft);
        Ok(doc)
    }

    /// The base URI and draft in effect at a pointer
    ///
    /// Falls back to the nearest walked ancestor, so pointers into positions
    /// outside the schema grammar (a `$ref` into an `examples` entry, say)
    /// still inherit sensible context.
    #[must_use]
    pub fn info_for(&self, pointer: &str) -> Option<&LocationInfo> {
        if let Some(info) = self.locations.get(pointer) {
            return Some(info);
        }
        let mut prefix = pointer;
        while let Some(cut) = prefix.rfind('/') {
            prefix = &prefix[..cut];
            if let Some(info) = self.locations.get(prefix) {
                return Some(info);
            }
        }
        self.locations.get("")
    }

    /// The raw JSON value at a pointer
    #[must_use]
    pub fn value_at(&self, pointer: &str) -> Option<&Value> {
        self.root.pointer(pointer)
    }

    /// Pointer registered for a plain anchor under a resource base
    #[must_use]
    pub fn anchor_pointer(&self, base: &str, name: &str) -> Option<&str> {
        self.anchors
            .get(&(base.to_string(), name.to_string()))
            .map(String::as_str)
    }

    /// Pointer registered for a dynamic anchor under a resource base
    #[must_use]
    pub fn dynamic_anchor_pointer(&self, base: &str, name: &str) -> Option<&str> {
        self.dynamic_anchors
            .get(&(base.to_string(), name.to_string()))
            .map(String::as_str)
    }

    fn walk(
        &mut self,
        value: &Value,
        pointer: String,
        mut base: Url,
        mut draft: Draft,
        resource_root: bool,
    ) -> Result<()> {
        let Value::Object(schema) = value else {
            // Boolean schemas carry no structure but still have a location
            self.locations.insert(pointer, LocationInfo { base, draft });
            return Ok(());
        };

        // $schema switches the draft, but only at resource roots (the
        // document root or an embedded schema carrying its own identifier)
        let resource_root =
            resource_root || schema.contains_key("$id") || schema.contains_key("id");
        if resource_root {
            if let Some(dialect) = schema.get("$schema") {
                let Some(dialect) = dialect.as_str() else {
                    return Err(SchemaError::invalid_schema_at(
                        "$schema must be a string",
                        &pointer,
                    ));
                };
                match Draft::from_schema_uri(dialect) {
                    Some(found) => draft = found,
                    None => self.unknown_dialects.push(UnknownDialect {
                        pointer: pointer.clone(),
                        uri: dialect.to_string(),
                    }),
                }
            }
        }

        // id / $id establishes a new resource base, except plain fragments in
        // the old drafts, which are anchors
        if let Some(id) = schema.get(draft.id_keyword()) {
            let Some(id) = id.as_str() else {
                return Err(SchemaError::invalid_schema_at(
                    format!("{} must be a string", draft.id_keyword()),
                    &pointer,
                ));
            };
            if let Some(anchor) = id.strip_prefix('#') {
                if draft.supports_anchor() {
                    return Err(SchemaError::invalid_schema_at(
                        "$id must not contain a fragment",
                        &pointer,
                    ));
                }
                if !anchor.is_empty() {
                    self.anchors.insert(
                        (base.as_str().to_string(), anchor.to_string()),
                        pointer.clone(),
                    );
                }
            } else {
                let mut resolved = base.join(id).map_err(|err| SchemaError::InvalidUri {
                    uri: id.to_string(),
                    message: err.to_string(),
                })?;
                let fragment = resolved.fragment().map(str::to_string);
                resolved.set_fragment(None);
                if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
                    if draft.supports_anchor() {
                        return Err(SchemaError::invalid_schema_at(
                            "$id must not contain a fragment",
                            &pointer,
                        ));
                    }
                    self.anchors.insert(
                        (resolved.as_str().to_string(), fragment),
                        pointer.clone(),
                    );
                }
                base = resolved;
                self.ids.insert(base.as_str().to_string(), pointer.clone());
            }
        }

        if draft.supports_anchor() {
            if let Some(anchor) = schema.get("$anchor") {
                let Some(anchor) = anchor.as_str() else {
                    return Err(SchemaError::invalid_schema_at(
                        "$anchor must be a string",
                        &pointer,
                    ));
                };
                self.anchors.insert(
                    (base.as_str().to_string(), anchor.to_string()),
                    pointer.clone(),
                );
            }
        }
        if draft == Draft::Draft202012 {
            if let Some(anchor) = schema.get("$dynamicAnchor") {
                let Some(anchor) = anchor.as_str() else {
                    return Err(SchemaError::invalid_schema_at(
                        "$dynamicAnchor must be a string",
                        &pointer,
                    ));
                };
                // A dynamic anchor is also addressable as a plain anchor
                self.anchors.insert(
                    (base.as_str().to_string(), anchor.to_string()),
                    pointer.clone(),
                );
                self.dynamic_anchors.insert(
                    (base.as_str().to_string(), anchor.to_string()),
                    pointer.clone(),
                );
            }
        }
        if draft == Draft::Draft201909 {
            if schema.get("$recursiveAnchor") == Some(&Value::Bool(true)) {
                self.recursive_roots
                    .insert(base.as_str().to_string(), pointer.clone());
            }
        }

        for keyword in ["$ref", "$recursiveRef", "$dynamicRef"] {
            if let Some(target) = schema.get(keyword) {
                let Some(target) = target.as_str() else {
                    return Err(SchemaError::invalid_schema_at(
                        format!("{keyword} must be a string"),
                        &pointer,
                    ));
                };
                self.refs.push(RefSite {
                    pointer: pointer.clone(),
                    keyword: keyword.to_string(),
                    target: target.to_string(),
                    base: base.clone(),
                });
            }
        }

        if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
            self.patterns.push((
                pattern.to_string(),
                format!("{pointer}/pattern"),
            ));
        }

        self.locations.insert(
            pointer.clone(),
            LocationInfo {
                base: base.clone(),
                draft,
            },
        );

        let child = |pointer: &str, token: &str| {
            format!("{pointer}/{}", pointer::escape_token(token))
        };

        for keyword in MAP_OF_SCHEMAS {
            if let Some(Value::Object(map)) = schema.get(*keyword) {
                let map_pointer = child(&pointer, keyword);
                if *keyword == "patternProperties" {
                    for key in map.keys() {
                        self.patterns.push((key.clone(), map_pointer.clone()));
                    }
                }
                for (key, subschema) in map {
                    self.walk(subschema, child(&map_pointer, key), base.clone(), draft, false)?;
                }
            }
        }

        for keyword in LIST_OF_SCHEMAS {
            if let Some(Value::Array(list)) = schema.get(*keyword) {
                let list_pointer = child(&pointer, keyword);
                for (index, subschema) in list.iter().enumerate() {
                    self.walk(
                        subschema,
                        format!("{list_pointer}/{index}"),
                        base.clone(),
                        draft,
                        false,
                    )?;
                }
            }
        }

        for keyword in SINGLE_SCHEMA {
            if let Some(subschema) = schema.get(*keyword) {
                if subschema.is_object() || subschema.is_boolean() {
                    self.walk(subschema, child(&pointer, keyword), base.clone(), draft, false)?;
                }
            }
        }

        // items is a single schema, or in the old drafts an array form
        if let Some(items) = schema.get("items") {
            let items_pointer = child(&pointer, "items");
            match items {
                Value::Array(list) => {
                    for (index, subschema) in list.iter().enumerate() {
                        self.walk(
                            subschema,
                            format!("{items_pointer}/{index}"),
                            base.clone(),
                            draft,
                            false,
                        )?;
                    }
                }
                Value::Object(_) | Value::Bool(_) => {
                    self.walk(items, items_pointer, base.clone(), draft, false)?;
                }
                _ => {}
            }
        }

        // dependencies values are either schemas or arrays of property names
        if let Some(Value::Object(deps)) = schema.get("dependencies") {
            let deps_pointer = child(&pointer, "dependencies");
            for (key, dependent) in deps {
                if dependent.is_object() || dependent.is_boolean() {
                    self.walk(
                        dependent,
                        child(&deps_pointer, key),
                        base.clone(),
                        draft,
                        false,
                    )?;
                }
            }
        }

        Ok(())
    }
}
