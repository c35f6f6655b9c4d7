//! Configuration for schema compilation and validation
//!
//! A `Configuration` is an immutable snapshot read at validation start. The
//! process-wide default is one such value held behind a lock; it is read when
//! a validator is built and updated only through the serialized [`configure`]
//! operation, so per-call overrides never retroactively affect runs already
//! in progress.

use crate::draft::Draft;
use crate::report::OutputFormat;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Predicate for a named `format`
pub type FormatValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Decoder for a named `contentEncoding`; `None` marks an invalid encoding
pub type ContentEncodingDecoder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Decoder for a named `contentMediaType`; `None` marks an undecodable value
pub type ContentMediaTypeDecoder = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;

/// Custom keyword predicate: (instance value, raw schema fragment at the
/// keyword, instance pointer) -> pass/fail
pub type KeywordValidator = Arc<dyn Fn(&Value, &Value, &str) -> bool + Send + Sync>;

/// Hook invoked around each property's evaluation: (object, property name,
/// property schema, instance pointer) -> pass/fail
pub type PropertyHook = Arc<dyn Fn(&Map<String, Value>, &str, &Value, &str) -> bool + Send + Sync>;

/// Resolver for a missing property's default value: (object, property name,
/// property schema) -> value to insert, or `None` to skip
pub type PropertyDefaultResolver =
    Arc<dyn Fn(&Map<String, Value>, &str, &Value) -> Option<Value> + Send + Sync>;

/// Caller-supplied resolver for external reference URIs
pub type RefResolver = Arc<dyn Fn(&Url) -> Option<Value> + Send + Sync>;

/// Which regular-expression semantics the `pattern` keywords use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RegexDialect {
    /// The `regex` crate's semantics (Unicode character classes)
    #[default]
    Native,
    /// ECMA-262 semantics: ASCII `\d`/`\w`, ECMA whitespace for `\s`
    Ecma262,
}

/// Access mode consulted by `readOnly`/`writeOnly`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Reading: `writeOnly` values must be absent
    Read,
    /// Writing: `readOnly` values must be absent
    Write,
}

/// The default meta-schema: a URI naming a built-in draft, or a resolved
/// document supplied by the caller
#[derive(Clone)]
pub enum MetaSchema {
    /// Meta-schema named by URI
    Uri(String),
    /// Already-resolved meta-schema document
    Document(Arc<Value>),
}

impl MetaSchema {
    /// The draft this meta-schema selects, when it names a built-in one
    #[must_use]
    pub fn draft(&self) -> Option<Draft> {
        match self {
            MetaSchema::Uri(uri) => Draft::from_schema_uri(uri),
            MetaSchema::Document(doc) => doc
                .get("$schema")
                .and_then(Value::as_str)
                .and_then(Draft::from_schema_uri),
        }
    }
}

impl fmt::Debug for MetaSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaSchema::Uri(uri) => f.debug_tuple("Uri").field(uri).finish(),
            MetaSchema::Document(_) => f.debug_tuple("Document").field(&"<schema>").finish(),
        }
    }
}

/// Flat configuration record read by the engine
///
/// Written only by the caller; the engine takes a snapshot per run.
#[derive(Clone)]
pub struct Configuration {
    /// Base URI assigned to documents registered without one
    pub base_uri: Url,
    /// Default meta-schema when a document carries no `$schema`
    pub meta_schema: MetaSchema,
    /// Vocabulary URI -> required flag, merged over the dialect's own set
    pub vocabulary: Option<IndexMap<String, bool>>,
    /// Whether `format` asserts (fails) rather than only annotating
    pub format: bool,
    /// Format name -> predicate, merged over the built-in formats
    pub formats: IndexMap<String, FormatValidator>,
    /// Content encoding name -> decoder, merged over the built-ins
    pub content_encodings: IndexMap<String, ContentEncodingDecoder>,
    /// Content media type -> decoder, merged over the built-ins
    pub content_media_types: IndexMap<String, ContentMediaTypeDecoder>,
    /// Custom keyword name -> predicate; overrides a standard keyword of the
    /// same name
    pub keywords: IndexMap<String, KeywordValidator>,
    /// Hooks invoked before each property's evaluation, in declared order
    pub before_property_validation: Vec<PropertyHook>,
    /// Hooks invoked after each property's evaluation, in declared order
    pub after_property_validation: Vec<PropertyHook>,
    /// Whether missing object properties are filled from schema defaults on
    /// a working copy of the instance
    pub insert_property_defaults: bool,
    /// Resolver consulted for default insertion; `None` uses the property
    /// schema's `default` keyword
    pub property_default_resolver: Option<PropertyDefaultResolver>,
    /// Resolver for external references; `None` fails with `UnknownRef`
    /// except for built-in meta-schema URIs
    pub ref_resolver: Option<RefResolver>,
    /// Regular-expression dialect for `pattern`/`patternProperties`
    pub regex_dialect: RegexDialect,
    /// Output shape produced by [`Schema::output`]
    pub output_format: OutputFormat,
    /// Access mode consulted by `readOnly`/`writeOnly`; `None` disables both
    pub access_mode: Option<AccessMode>,
    /// Whether bounded value-domain keywords (`enum`, `const`) are
    /// materialized at compile time
    pub resolve_enumerators: bool,
}

impl Configuration {
    /// Synthetic base URI for documents registered without one
    pub const DEFAULT_BASE_URI: &'static str = "jschema://schema";

    /// Replace the default meta-schema by URI
    #[must_use]
    pub fn with_meta_schema(mut self, uri: impl Into<String>) -> Self {
        self.meta_schema = MetaSchema::Uri(uri.into());
        self
    }

    /// Replace the default meta-schema with a resolved document
    #[must_use]
    pub fn with_meta_schema_document(mut self, document: Arc<Value>) -> Self {
        self.meta_schema = MetaSchema::Document(document);
        self
    }

    /// Toggle format assertion
    #[must_use]
    pub fn with_format(mut self, format: bool) -> Self {
        self.format = format;
        self
    }

    /// Register a format predicate
    #[must_use]
    pub fn with_format_validator(
        mut self,
        name: impl Into<String>,
        validator: FormatValidator,
    ) -> Self {
        self.formats.insert(name.into(), validator);
        self
    }

    /// Register a custom keyword
    #[must_use]
    pub fn with_keyword(mut self, name: impl Into<String>, validator: KeywordValidator) -> Self {
        self.keywords.insert(name.into(), validator);
        self
    }

    /// Install a reference resolver
    #[must_use]
    pub fn with_ref_resolver(mut self, resolver: RefResolver) -> Self {
        self.ref_resolver = Some(resolver);
        self
    }

    /// Select the regex dialect
    #[must_use]
    pub fn with_regex_dialect(mut self, dialect: RegexDialect) -> Self {
        self.regex_dialect = dialect;
        self
    }

    /// Select the output shape
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Select the access mode
    #[must_use]
    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = Some(mode);
        self
    }

    /// Toggle default-value insertion
    #[must_use]
    pub fn with_insert_property_defaults(mut self, insert: bool) -> Self {
        self.insert_property_defaults = insert;
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        let base_uri = Url::parse(Self::DEFAULT_BASE_URI)
            .unwrap_or_else(|_| unreachable!("default base URI is well-formed"));
        Self {
            base_uri,
            meta_schema: MetaSchema::Uri(Draft::LATEST.uri().to_string()),
            vocabulary: None,
            format: true,
            formats: IndexMap::new(),
            content_encodings: IndexMap::new(),
            content_media_types: IndexMap::new(),
            keywords: IndexMap::new(),
            before_property_validation: Vec::new(),
            after_property_validation: Vec::new(),
            insert_property_defaults: false,
            property_default_resolver: None,
            ref_resolver: None,
            regex_dialect: RegexDialect::default(),
            output_format: OutputFormat::default(),
            access_mode: None,
            resolve_enumerators: false,
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("base_uri", &self.base_uri.as_str())
            .field("meta_schema", &self.meta_schema)
            .field("vocabulary", &self.vocabulary)
            .field("format", &self.format)
            .field("formats", &self.formats.keys().collect::<Vec<_>>())
            .field(
                "content_encodings",
                &self.content_encodings.keys().collect::<Vec<_>>(),
            )
            .field(
                "content_media_types",
                &self.content_media_types.keys().collect::<Vec<_>>(),
            )
            .field("keywords", &self.keywords.keys().collect::<Vec<_>>())
            .field(
                "before_property_validation",
                &self.before_property_validation.len(),
            )
            .field(
                "after_property_validation",
                &self.after_property_validation.len(),
            )
            .field("insert_property_defaults", &self.insert_property_defaults)
            .field(
                "property_default_resolver",
                &self.property_default_resolver.is_some(),
            )
            .field("ref_resolver", &self.ref_resolver.is_some())
            .field("regex_dialect", &self.regex_dialect)
            .field("output_format", &self.output_format)
            .field("access_mode", &self.access_mode)
            .field("resolve_enumerators", &self.resolve_enumerators)
            .finish()
    }
}

static GLOBAL: Lazy<RwLock<Configuration>> = Lazy::new(|| RwLock::new(Configuration::default()));

/// Snapshot the process-wide default configuration
#[must_use]
pub fn global() -> Configuration {
    GLOBAL.read().clone()
}

/// Update the process-wide default configuration under a lock
///
/// Validators already constructed keep the snapshot they were built with.
pub fn configure<F>(f: F)
where
    F: FnOnce(&mut Configuration),
{
    f(&mut GLOBAL.write());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();
        assert_eq!(config.base_uri.as_str(), "jschema://schema");
        assert!(config.format);
        assert!(!config.insert_property_defaults);
        assert!(config.ref_resolver.is_none());
        assert_eq!(config.meta_schema.draft(), Some(Draft::Draft202012));
        assert_eq!(config.output_format, OutputFormat::Classic);
    }

    #[test]
    fn test_builder_overrides() {
        let config = Configuration::default()
            .with_meta_schema("http://json-schema.org/draft-04/schema#")
            .with_format(false)
            .with_regex_dialect(RegexDialect::Ecma262)
            .with_access_mode(AccessMode::Write);
        assert_eq!(config.meta_schema.draft(), Some(Draft::Draft4));
        assert!(!config.format);
        assert_eq!(config.regex_dialect, RegexDialect::Ecma262);
        assert_eq!(config.access_mode, Some(AccessMode::Write));
    }

    #[test]
    fn test_configure_updates_global_without_touching_snapshots() {
        let snapshot = global();
        configure(|config| config.format = false);
        assert!(snapshot.format);
        assert!(!global().format);
        configure(|config| config.format = true);
        assert!(global().format);
    }

    #[test]
    fn test_meta_schema_document_draft_detection() {
        let doc = Arc::new(serde_json::json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://example.com/custom-meta"
        }));
        let meta = MetaSchema::Document(doc);
        assert_eq!(meta.draft(), Some(Draft::Draft201909));
    }
}
