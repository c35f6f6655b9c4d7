//! Meta-validation: checking a schema document against its meta-schema
//!
//! The schema under test is treated as a plain instance and evaluated against
//! the meta-schema its `$schema` names, falling back to the configured
//! default. Bundled meta-schemas cover the five supported drafts; anything
//! else goes through the configured reference resolver.

use crate::compiler::compile;
use crate::executor;
use crate::metaschemas;
use jschema_core::config::{Configuration, MetaSchema};
use jschema_core::error::{Result, SchemaError};
use jschema_core::report::ResultNode;
use serde_json::Value;
use url::Url;

/// Validate a schema document against its meta-schema
pub fn validate_schema(schema: &Value, config: &Configuration) -> Result<ResultNode> {
    let meta_value = match schema.get("$schema").and_then(Value::as_str) {
        Some(uri) => fetch(uri, config)?,
        None => match &config.meta_schema {
            MetaSchema::Uri(uri) => fetch(uri, config)?,
            MetaSchema::Document(doc) => doc.as_ref().clone(),
        },
    };
    let compiled = compile(meta_value, config.clone())?;
    let outcome = executor::evaluate(&compiled, schema, false)?;
    Ok(outcome.node)
}

/// Whether a schema document conforms to its meta-schema
pub fn valid_schema(schema: &Value, config: &Configuration) -> Result<bool> {
    Ok(validate_schema(schema, config)?.valid)
}

fn fetch(uri: &str, config: &Configuration) -> Result<Value> {
    if let Some(raw) = metaschemas::lookup(uri) {
        return serde_json::from_str(raw)
            .map_err(|err| SchemaError::invalid_schema(format!("bundled meta-schema: {err}")));
    }
    if let Some(resolver) = &config.ref_resolver {
        let parsed = Url::parse(uri).map_err(|err| SchemaError::InvalidUri {
            uri: uri.to_string(),
            message: err.to_string(),
        })?;
        if let Some(value) = resolver(&parsed) {
            return Ok(value);
        }
    }
    Err(SchemaError::unknown_ref(uri))
}
