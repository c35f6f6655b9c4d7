//! Pattern compilation for the `pattern` and `patternProperties` keywords
//!
//! Two dialects are supported. `Native` compiles the pattern as-is with the
//! `regex` crate's Unicode semantics. `Ecma262` rewrites the perl-style
//! character classes to their ECMA-262 definitions (`\d` is ASCII, `\s` is
//! the ECMA whitespace set) before compiling, which is the behavior JSON
//! Schema specifies for interoperable patterns.
//!
//! Compiled patterns are cached process-wide keyed by (source, dialect);
//! matching is always an unanchored search, as JSON Schema requires.

use jschema_core::config::RegexDialect;
use jschema_core::error::{Result, SchemaError};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// ECMA-262 whitespace, expressed as a character-class body
const ECMA_WHITESPACE: &str = "\\t\\n\\x0B\\x0C\\r \u{00A0}\u{1680}\u{2000}-\u{200A}\u{2028}\u{2029}\u{202F}\u{205F}\u{3000}\u{FEFF}";

static CACHE: Lazy<Mutex<HashMap<(String, RegexDialect), Arc<Regex>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Compile a pattern under the given dialect, memoized process-wide
pub fn compile(pattern: &str, dialect: RegexDialect) -> Result<Arc<Regex>> {
    let key = (pattern.to_string(), dialect);
    if let Some(compiled) = CACHE.lock().get(&key) {
        return Ok(Arc::clone(compiled));
    }

    let source = match dialect {
        RegexDialect::Native => pattern.to_string(),
        RegexDialect::Ecma262 => translate_ecma(pattern),
    };
    let regex = Regex::new(&source)
        .map_err(|err| SchemaError::invalid_pattern(pattern, err.to_string()))?;

    let compiled = Arc::new(regex);
    CACHE
        .lock()
        .insert(key, Arc::clone(&compiled));
    Ok(compiled)
}

/// Unanchored match under the given dialect
pub fn is_match(pattern: &str, dialect: RegexDialect, value: &str) -> Result<bool> {
    Ok(compile(pattern, dialect)?.is_match(value))
}

/// Rewrite perl-style classes to their ECMA-262 ASCII definitions
fn translate_ecma(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = false;

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek().copied() {
                Some('d') => {
                    chars.next();
                    out.push_str(if in_class { "0-9" } else { "[0-9]" });
                }
                Some('D') if !in_class => {
                    chars.next();
                    out.push_str("[^0-9]");
                }
                Some('w') => {
                    chars.next();
                    out.push_str(if in_class { "A-Za-z0-9_" } else { "[A-Za-z0-9_]" });
                }
                Some('W') if !in_class => {
                    chars.next();
                    out.push_str("[^A-Za-z0-9_]");
                }
                Some('s') => {
                    chars.next();
                    if in_class {
                        out.push_str(ECMA_WHITESPACE);
                    } else {
                        out.push('[');
                        out.push_str(ECMA_WHITESPACE);
                        out.push(']');
                    }
                }
                Some('S') if !in_class => {
                    chars.next();
                    out.push_str("[^");
                    out.push_str(ECMA_WHITESPACE);
                    out.push(']');
                }
                Some(other) => {
                    chars.next();
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            if ch == '[' && !in_class {
                in_class = true;
            } else if ch == ']' && in_class {
                in_class = false;
            }
            out.push(ch);
        }
    }

    out
}
