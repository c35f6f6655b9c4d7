//! # jschema engine
//!
//! JSON Schema validation for drafts 4, 6, 7, 2019-09, and 2020-12: schema
//! compilation with fail-fast structural checks, reference resolution across
//! documents (including `$dynamicRef`/`$recursiveRef` dynamic scoping),
//! draft- and vocabulary-aware keyword dispatch, and the standardized output
//! shapes plus the legacy flat error list.
//!
//! ```
//! use jschema_engine::Schema;
//! use serde_json::json;
//!
//! let schema = Schema::compile(json!({
//!     "type": "object",
//!     "properties": {"name": {"type": "string"}},
//!     "required": ["name"]
//! })).expect("valid schema");
//!
//! assert!(schema.valid(&json!({"name": "x"})).expect("runs"));
//! assert!(!schema.valid(&json!({})).expect("runs"));
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Exact decimal semantics for numeric keywords
pub mod number;

/// Pattern compilation with dialect translation and a process-wide cache
pub mod pattern;

/// Built-in `format` predicates
pub mod formats;

/// Built-in content encoding and media-type decoders
pub mod content;

/// Per-draft keyword tables and vocabulary filtering
pub mod registry;

/// Schema document walking: identifiers, anchors, reference sites
pub mod document;

/// Bundled meta-schema documents for the supported drafts
pub mod metaschemas;

/// Reference resolution across schema documents
pub mod resolver;

/// Schema compilation and fail-fast checks
pub mod compiler;

/// Keyword evaluation
pub mod executor;

/// Output projections of a completed result tree
pub mod output;

/// Meta-validation of schema documents
pub mod meta;

use jschema_core::config;
use jschema_core::error::Result;
use serde_json::Value;

pub use compiler::CompiledSchema;
pub use jschema_core::config::{
    configure, global, AccessMode, MetaSchema, RefResolver, RegexDialect,
};
pub use jschema_core::draft::Draft;
pub use jschema_core::error::SchemaError;
pub use jschema_core::pointer::Location;
pub use jschema_core::report::{ClassicError, Coverage, OutputFormat, OutputUnit, ResultNode};
pub use jschema_core::Configuration;

/// A compiled, reusable validator
///
/// Compilation snapshots the configuration it was built with; later changes
/// to the process-wide default do not affect an existing `Schema`.
#[derive(Debug)]
pub struct Schema {
    compiled: CompiledSchema,
}

impl Schema {
    /// Compile a schema under the process-wide default configuration
    pub fn compile(schema: Value) -> Result<Schema> {
        Schema::compile_with(schema, config::global())
    }

    /// Compile a schema under an explicit configuration snapshot
    pub fn compile_with(schema: Value, config: Configuration) -> Result<Schema> {
        Ok(Schema {
            compiled: compiler::compile(schema, config)?,
        })
    }

    /// The draft governing the schema's root document
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.compiled.draft
    }

    /// The configuration snapshot this schema was compiled with
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.compiled.config
    }

    /// Whether an instance conforms
    pub fn valid(&self, instance: &Value) -> Result<bool> {
        Ok(self.run(instance, false)?.valid)
    }

    /// Evaluate an instance and return the full result tree
    pub fn validate(&self, instance: &Value) -> Result<ResultNode> {
        let verbose = self.compiled.config.output_format == OutputFormat::Verbose;
        self.run(instance, verbose)
    }

    /// Evaluate an instance and render the configured output shape
    pub fn output(&self, instance: &Value) -> Result<Value> {
        let format = self.compiled.config.output_format;
        let node = self.run(instance, format == OutputFormat::Verbose)?;
        Ok(output::render(&node, format))
    }

    /// Evaluate an instance and render a specific output shape
    pub fn output_as(&self, instance: &Value, format: OutputFormat) -> Result<Value> {
        let node = self.run(instance, format == OutputFormat::Verbose)?;
        Ok(output::render(&node, format))
    }

    /// The flat legacy error list for an instance
    pub fn errors(&self, instance: &Value) -> Result<Vec<ClassicError>> {
        Ok(output::classic_errors(&self.run(instance, false)?))
    }

    /// Evaluate and fill missing properties from schema defaults in place
    ///
    /// Returns whether the (possibly modified) instance conforms. The
    /// instance is only written when default insertion is enabled in the
    /// configuration and at least one default applied.
    pub fn insert_defaults(&self, instance: &mut Value) -> Result<bool> {
        let outcome = executor::evaluate(&self.compiled, instance, false)?;
        if let Some(defaulted) = outcome.defaulted_instance {
            *instance = defaulted;
        }
        Ok(outcome.node.valid)
    }

    fn run(&self, instance: &Value, verbose: bool) -> Result<ResultNode> {
        Ok(executor::evaluate(&self.compiled, instance, verbose)?.node)
    }
}

/// One-shot conformance check under the process-wide default configuration
pub fn valid(schema: Value, instance: &Value) -> Result<bool> {
    Schema::compile(schema)?.valid(instance)
}

/// One-shot evaluation returning the full result tree
pub fn validate(schema: Value, instance: &Value) -> Result<ResultNode> {
    Schema::compile(schema)?.validate(instance)
}

/// Whether a schema document conforms to its meta-schema
pub fn valid_schema(schema: &Value) -> Result<bool> {
    meta::valid_schema(schema, &config::global())
}

/// Validate a schema document against its meta-schema
pub fn validate_schema(schema: &Value) -> Result<ResultNode> {
    meta::validate_schema(schema, &config::global())
}

/// Configuration preset selecting draft 4
#[must_use]
pub fn draft4() -> Configuration {
    Configuration::default().with_meta_schema(Draft::Draft4.uri())
}

/// Configuration preset selecting draft 6
#[must_use]
pub fn draft6() -> Configuration {
    Configuration::default().with_meta_schema(Draft::Draft6.uri())
}

/// Configuration preset selecting draft 7
#[must_use]
pub fn draft7() -> Configuration {
    Configuration::default().with_meta_schema(Draft::Draft7.uri())
}

/// Configuration preset selecting draft 2019-09
#[must_use]
pub fn draft201909() -> Configuration {
    Configuration::default().with_meta_schema(Draft::Draft201909.uri())
}

/// Configuration preset selecting draft 2020-12
#[must_use]
pub fn draft202012() -> Configuration {
    Configuration::default().with_meta_schema(Draft::Draft202012.uri())
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Schema, valid, valid_schema, validate, validate_schema};
    pub use jschema_core::prelude::*;
}
