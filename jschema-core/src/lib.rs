//! # jschema core
//!
//! Core types for JSON Schema validation in Rust: error types, the
//! configuration record and process-wide default, draft identification, JSON
//! pointer locations, and the error/annotation tree with its output shapes.
//!
//! The validation engine itself lives in the `jschema-engine` crate; this
//! crate carries the vocabulary shared between the engine and its callers.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Error types for schema compilation and validation
pub mod error;

/// Draft identification and per-draft behavior flags
pub mod draft;

/// Configuration record and process-wide default
pub mod config;

/// JSON-pointer locations
pub mod pointer;

/// Error/annotation tree and output shapes
pub mod report;

// Re-export commonly used types
pub use config::{
    configure, global, AccessMode, Configuration, MetaSchema, RefResolver, RegexDialect,
};
pub use draft::Draft;
pub use error::{Result, SchemaError};
pub use pointer::Location;
pub use report::{ClassicError, Coverage, OutputFormat, OutputUnit, ResultNode};
pub use serde_json::Value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AccessMode, Configuration, MetaSchema, RegexDialect};
    pub use crate::draft::Draft;
    pub use crate::error::{Result, SchemaError};
    pub use crate::pointer::Location;
    pub use crate::report::{ClassicError, Coverage, OutputFormat, OutputUnit, ResultNode};
}
