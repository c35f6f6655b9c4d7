//! Built-in `contentEncoding` and `contentMediaType` decoders
//!
//! Decoders return `None` for undecodable values. A failing decode fails the
//! keyword (in drafts where content keywords assert) but never aborts sibling
//! keyword evaluation; the executor records the failure and moves on.

use base64::Engine as _;
use serde_json::Value;

/// Look up a built-in content-encoding decoder by name
#[must_use]
pub fn encoding(name: &str) -> Option<fn(&str) -> Option<String>> {
    match name {
        "base64" => Some(decode_base64),
        _ => None,
    }
}

/// Look up a built-in media-type decoder by name
#[must_use]
pub fn media_type(name: &str) -> Option<fn(&str) -> Option<Value>> {
    match name {
        "application/json" => Some(decode_json),
        _ => None,
    }
}

fn decode_base64(value: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(value).ok()?;
    String::from_utf8(bytes).ok()
}

fn decode_json(value: &str) -> Option<Value> {
    serde_json::from_str(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_base64_round_trip() {
        let decode = encoding("base64").expect("built-in");
        assert_eq!(decode("aGVsbG8="), Some("hello".to_string()));
        assert_eq!(decode("not base64!"), None);
    }

    #[test]
    fn test_json_media_type() {
        let decode = media_type("application/json").expect("built-in");
        assert_eq!(decode(r#"{"a":1}"#), Some(json!({"a": 1})));
        assert_eq!(decode("{"), None);
    }

    #[test]
    fn test_unknown_names() {
        assert!(encoding("base32").is_none());
        assert!(media_type("text/xml").is_none());
    }
}
