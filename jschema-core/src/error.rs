//! Error types for schema compilation and validation

use thiserror::Error;

/// Main error type for schema operations
///
/// Compilation errors are fatal to producing a validator for a schema and are
/// surfaced immediately. Validation *failures* are not errors; they are
/// first-class results carried in the error/annotation tree.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A reference could not be resolved to a schema document
    #[error("unresolvable reference '{uri}'")]
    UnknownRef {
        /// The reference URI that failed to resolve
        uri: String,
        /// Schema location of the referencing keyword, if known
        location: Option<String>,
    },

    /// A required vocabulary is not recognized by the engine
    #[error("unsupported vocabulary '{uri}'")]
    UnsupportedVocabulary {
        /// The vocabulary or meta-schema URI that is not recognized
        uri: String,
    },

    /// Malformed schema structure detected during compilation
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Error message
        message: String,
        /// Schema location of the malformed construct, if known
        location: Option<String>,
    },

    /// A `pattern` or `patternProperties` regular expression failed to compile
    #[error("invalid regex pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Error message from the regex engine
        message: String,
    },

    /// A URI in the schema or configuration could not be parsed
    #[error("invalid URI '{uri}': {message}")]
    InvalidUri {
        /// The offending URI
        uri: String,
        /// Error message from the URI parser
        message: String,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

impl SchemaError {
    /// Create a new unresolvable-reference error
    #[must_use]
    pub fn unknown_ref(uri: impl Into<String>) -> Self {
        Self::UnknownRef {
            uri: uri.into(),
            location: None,
        }
    }

    /// Create a new unresolvable-reference error with a schema location
    #[must_use]
    pub fn unknown_ref_at(uri: impl Into<String>, location: impl Into<String>) -> Self {
        Self::UnknownRef {
            uri: uri.into(),
            location: Some(location.into()),
        }
    }

    /// Create a new unsupported-vocabulary error
    #[must_use]
    pub fn unsupported_vocabulary(uri: impl Into<String>) -> Self {
        Self::UnsupportedVocabulary { uri: uri.into() }
    }

    /// Create a new invalid-schema error
    #[must_use]
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
            location: None,
        }
    }

    /// Create a new invalid-schema error with a schema location
    #[must_use]
    pub fn invalid_schema_at(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
            location: Some(location.into()),
        }
    }

    /// Create a new invalid-pattern error
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<url::ParseError> for SchemaError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUri {
            uri: String::new(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = SchemaError::unknown_ref("https://example.com/missing");
        assert!(matches!(err, SchemaError::UnknownRef { .. }));

        let err = SchemaError::unknown_ref_at("urn:none", "/properties/a/$ref");
        match err {
            SchemaError::UnknownRef { location, .. } => {
                assert_eq!(location.as_deref(), Some("/properties/a/$ref"));
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_error_display() {
        let err = SchemaError::unsupported_vocabulary("https://example.com/vocab/custom");
        let display = err.to_string();
        assert!(display.contains("unsupported vocabulary"));
        assert!(display.contains("https://example.com/vocab/custom"));
    }

    #[test]
    fn test_invalid_pattern_display() {
        let err = SchemaError::invalid_pattern("[", "unclosed character class");
        assert!(err.to_string().contains('['));
        assert!(err.to_string().contains("unclosed"));
    }
}
