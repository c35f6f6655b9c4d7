//! Bundled meta-schema documents
//!
//! The canonical meta-schemas for every supported draft ship inside the
//! binary, so `$schema` detection, meta-validation, and references into the
//! `meta/*` vocabulary documents never touch the network. Lookup tolerates
//! the `http`/`https` mismatch and a trailing empty fragment, matching how
//! `$schema` URIs appear in the wild.

/// The raw JSON for a bundled meta-schema, by URI
#[must_use]
pub fn lookup(uri: &str) -> Option<&'static str> {
    let trimmed = uri.trim_end_matches('#');
    let path = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))?;
    match path {
        "json-schema.org/draft-04/schema" => Some(include_str!("metaschemas/draft4.json")),
        "json-schema.org/draft-06/schema" => Some(include_str!("metaschemas/draft6.json")),
        "json-schema.org/draft-07/schema" => Some(include_str!("metaschemas/draft7.json")),
        "json-schema.org/draft/2019-09/schema" => {
            Some(include_str!("metaschemas/draft2019/schema.json"))
        }
        "json-schema.org/draft/2019-09/meta/core" => {
            Some(include_str!("metaschemas/draft2019/core.json"))
        }
        "json-schema.org/draft/2019-09/meta/applicator" => {
            Some(include_str!("metaschemas/draft2019/applicator.json"))
        }
        "json-schema.org/draft/2019-09/meta/validation" => {
            Some(include_str!("metaschemas/draft2019/validation.json"))
        }
        "json-schema.org/draft/2019-09/meta/meta-data" => {
            Some(include_str!("metaschemas/draft2019/meta-data.json"))
        }
        "json-schema.org/draft/2019-09/meta/format" => {
            Some(include_str!("metaschemas/draft2019/format.json"))
        }
        "json-schema.org/draft/2019-09/meta/content" => {
            Some(include_str!("metaschemas/draft2019/content.json"))
        }
        "json-schema.org/draft/2020-12/schema" => {
            Some(include_str!("metaschemas/draft2020/schema.json"))
        }
        "json-schema.org/draft/2020-12/meta/core" => {
            Some(include_str!("metaschemas/draft2020/core.json"))
        }
        "json-schema.org/draft/2020-12/meta/applicator" => {
            Some(include_str!("metaschemas/draft2020/applicator.json"))
        }
        "json-schema.org/draft/2020-12/meta/unevaluated" => {
            Some(include_str!("metaschemas/draft2020/unevaluated.json"))
        }
        "json-schema.org/draft/2020-12/meta/validation" => {
            Some(include_str!("metaschemas/draft2020/validation.json"))
        }
        "json-schema.org/draft/2020-12/meta/meta-data" => {
            Some(include_str!("metaschemas/draft2020/meta-data.json"))
        }
        "json-schema.org/draft/2020-12/meta/format-annotation" => {
            Some(include_str!("metaschemas/draft2020/format-annotation.json"))
        }
        "json-schema.org/draft/2020-12/meta/content" => {
            Some(include_str!("metaschemas/draft2020/content.json"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jschema_core::draft::Draft;

    #[test]
    fn test_every_draft_uri_is_bundled() {
        for draft in Draft::ALL {
            assert!(lookup(draft.uri()).is_some(), "missing {draft}");
        }
    }

    #[test]
    fn test_lookup_tolerates_scheme_and_fragment() {
        assert!(lookup("http://json-schema.org/draft-07/schema#").is_some());
        assert!(lookup("https://json-schema.org/draft-07/schema").is_some());
        assert!(lookup("https://example.com/not-a-draft").is_none());
    }

    #[test]
    fn test_bundled_documents_parse() {
        for draft in Draft::ALL {
            let raw = lookup(draft.uri()).expect("bundled");
            let value: serde_json::Value = serde_json::from_str(raw).expect("valid JSON");
            assert!(value.is_object());
        }
    }
}
