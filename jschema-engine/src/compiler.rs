//! Schema compilation
//!
//! Compilation turns a raw schema value plus a configuration snapshot into a
//! `CompiledSchema` the executor can run repeatedly. All fail-fast checks
//! live here: every pattern must compile under the configured dialect, every
//! statically reachable reference must resolve, the dialect of every reached
//! document must be recognized, and the active keyword tables must be
//! constructible under the configured vocabulary map. A schema that compiles
//! never aborts mid-validation for a structural reason.

use crate::document::SchemaDocument;
use crate::pattern;
use crate::registry::{self, Keyword};
use crate::resolver::Resolver;
use indexmap::IndexMap;
use jschema_core::config::{Configuration, MetaSchema};
use jschema_core::draft::Draft;
use jschema_core::error::{Result, SchemaError};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// A validated, indexed schema ready for evaluation
pub struct CompiledSchema {
    /// The walked root document
    pub root: Arc<SchemaDocument>,
    /// Session-wide document store
    pub resolver: Arc<Resolver>,
    /// Configuration snapshot taken at compile time
    pub config: Arc<Configuration>,
    /// Draft governing the root document
    pub draft: Draft,
    /// Active keyword tables, indexed in `Draft::ALL` order
    tables: [IndexMap<&'static str, Keyword>; 5],
    /// Materialized `enum` value lists by schema pointer, when the
    /// configuration asks for compile-time enumerator resolution
    pub enumerators: IndexMap<String, Arc<Vec<Value>>>,
}

impl CompiledSchema {
    /// The active keyword table for a draft
    #[must_use]
    pub fn table_for(&self, draft: Draft) -> &IndexMap<&'static str, Keyword> {
        let index = Draft::ALL
            .iter()
            .position(|candidate| *candidate == draft)
            .unwrap_or(Draft::ALL.len() - 1);
        &self.tables[index]
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("uri", &self.root.uri.as_str())
            .field("draft", &self.draft)
            .finish_non_exhaustive()
    }
}

/// Compile a raw schema under a configuration snapshot
pub fn compile(schema: Value, config: Configuration) -> Result<CompiledSchema> {
    let default_draft = default_draft(&config)?;
    let root = Arc::new(SchemaDocument::build(
        config.base_uri.clone(),
        schema,
        default_draft,
    )?);
    debug!(uri = %root.uri, draft = %root.draft, "compiling schema");

    let resolver = Arc::new(Resolver::new(config.ref_resolver.clone(), default_draft));
    resolver.register(&root);
    if let MetaSchema::Document(meta) = &config.meta_schema {
        register_meta_document(&resolver, meta, default_draft)?;
    }

    let tables = build_tables(&config)?;
    check_reachable(&resolver, &root, &config)?;

    let enumerators = if config.resolve_enumerators {
        materialize_enumerators(&root)
    } else {
        IndexMap::new()
    };

    let draft = root.draft;
    Ok(CompiledSchema {
        root,
        resolver,
        config: Arc::new(config),
        draft,
        tables,
        enumerators,
    })
}

/// The draft the configuration's meta-schema selects
fn default_draft(config: &Configuration) -> Result<Draft> {
    match &config.meta_schema {
        MetaSchema::Uri(uri) => Draft::from_schema_uri(uri)
            .ok_or_else(|| SchemaError::unsupported_vocabulary(uri.clone())),
        MetaSchema::Document(doc) => Ok(doc
            .get("$schema")
            .and_then(Value::as_str)
            .and_then(Draft::from_schema_uri)
            .unwrap_or(Draft::LATEST)),
    }
}

fn register_meta_document(
    resolver: &Resolver,
    meta: &Arc<Value>,
    default_draft: Draft,
) -> Result<()> {
    let id = meta
        .get("$id")
        .or_else(|| meta.get("id"))
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::config("meta-schema document must carry an identifier"))?;
    let uri = url::Url::parse(id).map_err(|err| SchemaError::InvalidUri {
        uri: id.to_string(),
        message: err.to_string(),
    })?;
    let document = Arc::new(SchemaDocument::build(
        uri,
        meta.as_ref().clone(),
        default_draft,
    )?);
    resolver.register(&document);
    Ok(())
}

fn build_tables(config: &Configuration) -> Result<[IndexMap<&'static str, Keyword>; 5]> {
    let mut tables: [IndexMap<&'static str, Keyword>; 5] = Default::default();
    for (index, draft) in Draft::ALL.into_iter().enumerate() {
        tables[index] = registry::active_table(draft, config)?;
    }
    Ok(tables)
}

/// Walk every statically reachable document, validating dialects, patterns,
/// and references as each one is first reached
fn check_reachable(
    resolver: &Resolver,
    root: &Arc<SchemaDocument>,
    config: &Configuration,
) -> Result<()> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut worklist: Vec<Arc<SchemaDocument>> = vec![Arc::clone(root)];

    while let Some(document) = worklist.pop() {
        if !seen.insert(document.uri.as_str().to_string()) {
            continue;
        }

        if let Some(unknown) = document.unknown_dialects.first() {
            return Err(SchemaError::unsupported_vocabulary(unknown.uri.clone()));
        }
        check_vocabulary(&document)?;

        for (source, pointer) in &document.patterns {
            pattern::compile(source, config.regex_dialect).map_err(|err| match err {
                SchemaError::InvalidPattern { pattern, message } => SchemaError::InvalidPattern {
                    pattern,
                    message: format!("{message} (at {pointer})"),
                },
                other => other,
            })?;
        }

        for site in &document.refs {
            let (target, _) = resolver
                .resolve_target(&site.base, &site.target)
                .map_err(|err| match err {
                    SchemaError::UnknownRef { uri, .. } => {
                        SchemaError::unknown_ref_at(uri, site.pointer.clone())
                    }
                    other => other,
                })?;
            if !seen.contains(target.uri.as_str()) {
                worklist.push(target);
            }
        }
    }

    Ok(())
}

/// Reject documents whose `$vocabulary` requires something the engine does
/// not implement
fn check_vocabulary(document: &SchemaDocument) -> Result<()> {
    let Some(Value::Object(vocabulary)) = document.root.get("$vocabulary") else {
        return Ok(());
    };
    for (uri, required) in vocabulary {
        if *required == Value::Bool(true) && !registry::vocabulary_known(uri) {
            return Err(SchemaError::unsupported_vocabulary(uri.clone()));
        }
    }
    Ok(())
}

/// Collect `enum` value lists so repeated validations share one allocation
fn materialize_enumerators(document: &SchemaDocument) -> IndexMap<String, Arc<Vec<Value>>> {
    let mut out = IndexMap::new();
    for pointer in document.locations.keys() {
        let Some(Value::Object(schema)) = document.value_at(pointer) else {
            continue;
        };
        if let Some(Value::Array(values)) = schema.get("enum") {
            out.insert(pointer.clone(), Arc::new(values.clone()));
        }
    }
    out
}
