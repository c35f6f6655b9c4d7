//! Per-draft keyword tables and vocabulary handling
//!
//! Each draft maps to a fixed, ordered table of `(keyword name, evaluator
//! tag, vocabulary)` entries. The evaluator tag is a plain enum; the executor
//! dispatches on it with a `match`, so dialect selection is a table lookup
//! built once at startup rather than a runtime class hierarchy.
//!
//! Ordering is part of the contract: reference keywords come first (they can
//! fail fast on resolution), cheap scalar assertions come before structural
//! applicators so short-circuitable failures surface first in flat output
//! shapes, and the `unevaluated*` keywords always run last because they
//! consult the coverage left behind by every sibling applicator.

use indexmap::IndexMap;
use jschema_core::config::Configuration;
use jschema_core::draft::Draft;
use jschema_core::error::{Result, SchemaError};
use once_cell::sync::Lazy;

/// Evaluator tag for a keyword; dispatch happens in the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Ref,
    RecursiveRef,
    DynamicRef,
    Type,
    Enum,
    Const,
    MultipleOf,
    Maximum,
    ExclusiveMaximum,
    Minimum,
    ExclusiveMinimum,
    MaxLength,
    MinLength,
    Pattern,
    MaxItems,
    MinItems,
    UniqueItems,
    MaxProperties,
    MinProperties,
    Required,
    DependentRequired,
    Format,
    ContentEncoding,
    ContentMediaType,
    ReadOnly,
    WriteOnly,
    Title,
    Description,
    Default,
    Deprecated,
    Examples,
    AllOf,
    AnyOf,
    OneOf,
    Not,
    If,
    Dependencies,
    DependentSchemas,
    Properties,
    PatternProperties,
    AdditionalProperties,
    PropertyNames,
    PrefixItems,
    Items,
    AdditionalItems,
    Contains,
    UnevaluatedItems,
    UnevaluatedProperties,
}

/// Vocabulary a keyword belongs to, for per-dialect enable/disable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocab {
    Core,
    Applicator,
    Validation,
    MetaData,
    Format,
    Content,
    Unevaluated,
}

/// One row of a draft's keyword table
#[derive(Debug, Clone, Copy)]
pub struct KeywordSpec {
    pub name: &'static str,
    pub keyword: Keyword,
    pub vocab: Vocab,
}

fn spec(name: &'static str, keyword: Keyword, vocab: Vocab) -> KeywordSpec {
    KeywordSpec {
        name,
        keyword,
        vocab,
    }
}

fn scalar_assertions() -> Vec<KeywordSpec> {
    vec![
        spec("type", Keyword::Type, Vocab::Validation),
        spec("enum", Keyword::Enum, Vocab::Validation),
        spec("multipleOf", Keyword::MultipleOf, Vocab::Validation),
        spec("maximum", Keyword::Maximum, Vocab::Validation),
        spec("minimum", Keyword::Minimum, Vocab::Validation),
        spec("maxLength", Keyword::MaxLength, Vocab::Validation),
        spec("minLength", Keyword::MinLength, Vocab::Validation),
        spec("pattern", Keyword::Pattern, Vocab::Validation),
        spec("maxItems", Keyword::MaxItems, Vocab::Validation),
        spec("minItems", Keyword::MinItems, Vocab::Validation),
        spec("uniqueItems", Keyword::UniqueItems, Vocab::Validation),
        spec("maxProperties", Keyword::MaxProperties, Vocab::Validation),
        spec("minProperties", Keyword::MinProperties, Vocab::Validation),
        spec("required", Keyword::Required, Vocab::Validation),
    ]
}

fn numeric_exclusive_bounds() -> Vec<KeywordSpec> {
    vec![
        spec("exclusiveMaximum", Keyword::ExclusiveMaximum, Vocab::Validation),
        spec("exclusiveMinimum", Keyword::ExclusiveMinimum, Vocab::Validation),
    ]
}

fn combinators() -> Vec<KeywordSpec> {
    vec![
        spec("allOf", Keyword::AllOf, Vocab::Applicator),
        spec("anyOf", Keyword::AnyOf, Vocab::Applicator),
        spec("oneOf", Keyword::OneOf, Vocab::Applicator),
        spec("not", Keyword::Not, Vocab::Applicator),
    ]
}

fn annotations() -> Vec<KeywordSpec> {
    vec![
        spec("title", Keyword::Title, Vocab::MetaData),
        spec("description", Keyword::Description, Vocab::MetaData),
        spec("default", Keyword::Default, Vocab::MetaData),
    ]
}

fn content_and_access() -> Vec<KeywordSpec> {
    vec![
        spec("contentEncoding", Keyword::ContentEncoding, Vocab::Content),
        spec("contentMediaType", Keyword::ContentMediaType, Vocab::Content),
        spec("readOnly", Keyword::ReadOnly, Vocab::Validation),
        spec("writeOnly", Keyword::WriteOnly, Vocab::Validation),
    ]
}

fn object_applicators() -> Vec<KeywordSpec> {
    vec![
        spec("properties", Keyword::Properties, Vocab::Applicator),
        spec("patternProperties", Keyword::PatternProperties, Vocab::Applicator),
        spec("additionalProperties", Keyword::AdditionalProperties, Vocab::Applicator),
    ]
}

fn legacy_array_applicators() -> Vec<KeywordSpec> {
    vec![
        spec("items", Keyword::Items, Vocab::Applicator),
        spec("additionalItems", Keyword::AdditionalItems, Vocab::Applicator),
    ]
}

static DRAFT4: Lazy<Vec<KeywordSpec>> = Lazy::new(|| {
    let mut table = vec![spec("$ref", Keyword::Ref, Vocab::Core)];
    table.extend(scalar_assertions());
    table.push(spec("format", Keyword::Format, Vocab::Format));
    table.extend(annotations());
    table.extend(combinators());
    table.extend(object_applicators());
    table.extend(legacy_array_applicators());
    table.push(spec("dependencies", Keyword::Dependencies, Vocab::Applicator));
    table
});

static DRAFT6: Lazy<Vec<KeywordSpec>> = Lazy::new(|| {
    let mut table = vec![spec("$ref", Keyword::Ref, Vocab::Core)];
    table.extend(scalar_assertions());
    table.push(spec("const", Keyword::Const, Vocab::Validation));
    table.extend(numeric_exclusive_bounds());
    table.push(spec("format", Keyword::Format, Vocab::Format));
    table.extend(annotations());
    table.push(spec("examples", Keyword::Examples, Vocab::MetaData));
    table.extend(combinators());
    table.extend(object_applicators());
    table.push(spec("propertyNames", Keyword::PropertyNames, Vocab::Applicator));
    table.extend(legacy_array_applicators());
    table.push(spec("contains", Keyword::Contains, Vocab::Applicator));
    table.push(spec("dependencies", Keyword::Dependencies, Vocab::Applicator));
    table
});

static DRAFT7: Lazy<Vec<KeywordSpec>> = Lazy::new(|| {
    let mut table = vec![spec("$ref", Keyword::Ref, Vocab::Core)];
    table.extend(scalar_assertions());
    table.push(spec("const", Keyword::Const, Vocab::Validation));
    table.extend(numeric_exclusive_bounds());
    table.push(spec("format", Keyword::Format, Vocab::Format));
    table.extend(content_and_access());
    table.extend(annotations());
    table.push(spec("examples", Keyword::Examples, Vocab::MetaData));
    table.extend(combinators());
    table.push(spec("if", Keyword::If, Vocab::Applicator));
    table.extend(object_applicators());
    table.push(spec("propertyNames", Keyword::PropertyNames, Vocab::Applicator));
    table.extend(legacy_array_applicators());
    table.push(spec("contains", Keyword::Contains, Vocab::Applicator));
    table.push(spec("dependencies", Keyword::Dependencies, Vocab::Applicator));
    table
});

static DRAFT2019: Lazy<Vec<KeywordSpec>> = Lazy::new(|| {
    let mut table = vec![
        spec("$ref", Keyword::Ref, Vocab::Core),
        spec("$recursiveRef", Keyword::RecursiveRef, Vocab::Core),
    ];
    table.extend(scalar_assertions());
    table.push(spec("const", Keyword::Const, Vocab::Validation));
    table.push(spec("dependentRequired", Keyword::DependentRequired, Vocab::Validation));
    table.extend(numeric_exclusive_bounds());
    table.push(spec("format", Keyword::Format, Vocab::Format));
    table.extend(content_and_access());
    table.push(spec("deprecated", Keyword::Deprecated, Vocab::MetaData));
    table.extend(annotations());
    table.push(spec("examples", Keyword::Examples, Vocab::MetaData));
    table.extend(combinators());
    table.push(spec("if", Keyword::If, Vocab::Applicator));
    table.push(spec("dependentSchemas", Keyword::DependentSchemas, Vocab::Applicator));
    table.extend(object_applicators());
    table.push(spec("propertyNames", Keyword::PropertyNames, Vocab::Applicator));
    table.extend(legacy_array_applicators());
    table.push(spec("contains", Keyword::Contains, Vocab::Applicator));
    table.push(spec("unevaluatedItems", Keyword::UnevaluatedItems, Vocab::Applicator));
    table.push(spec(
        "unevaluatedProperties",
        Keyword::UnevaluatedProperties,
        Vocab::Applicator,
    ));
    table
});

static DRAFT2020: Lazy<Vec<KeywordSpec>> = Lazy::new(|| {
    let mut table = vec![
        spec("$ref", Keyword::Ref, Vocab::Core),
        spec("$dynamicRef", Keyword::DynamicRef, Vocab::Core),
    ];
    table.extend(scalar_assertions());
    table.push(spec("const", Keyword::Const, Vocab::Validation));
    table.push(spec("dependentRequired", Keyword::DependentRequired, Vocab::Validation));
    table.extend(numeric_exclusive_bounds());
    table.push(spec("format", Keyword::Format, Vocab::Format));
    table.extend(content_and_access());
    table.push(spec("deprecated", Keyword::Deprecated, Vocab::MetaData));
    table.extend(annotations());
    table.push(spec("examples", Keyword::Examples, Vocab::MetaData));
    table.extend(combinators());
    table.push(spec("if", Keyword::If, Vocab::Applicator));
    table.push(spec("dependentSchemas", Keyword::DependentSchemas, Vocab::Applicator));
    table.extend(object_applicators());
    table.push(spec("propertyNames", Keyword::PropertyNames, Vocab::Applicator));
    table.push(spec("prefixItems", Keyword::PrefixItems, Vocab::Applicator));
    table.push(spec("items", Keyword::Items, Vocab::Applicator));
    table.push(spec("contains", Keyword::Contains, Vocab::Applicator));
    table.push(spec("unevaluatedItems", Keyword::UnevaluatedItems, Vocab::Unevaluated));
    table.push(spec(
        "unevaluatedProperties",
        Keyword::UnevaluatedProperties,
        Vocab::Unevaluated,
    ));
    table
});

/// The full keyword table for a draft, in evaluation order
#[must_use]
pub fn table(draft: Draft) -> &'static [KeywordSpec] {
    match draft {
        Draft::Draft4 => &DRAFT4,
        Draft::Draft6 => &DRAFT6,
        Draft::Draft7 => &DRAFT7,
        Draft::Draft201909 => &DRAFT2019,
        Draft::Draft202012 => &DRAFT2020,
    }
}

/// Vocabulary URIs the engine recognizes for a draft
#[must_use]
pub fn vocabulary_uris(draft: Draft) -> &'static [(&'static str, Vocab)] {
    match draft {
        Draft::Draft201909 => &[
            ("https://json-schema.org/draft/2019-09/vocab/core", Vocab::Core),
            ("https://json-schema.org/draft/2019-09/vocab/applicator", Vocab::Applicator),
            ("https://json-schema.org/draft/2019-09/vocab/validation", Vocab::Validation),
            ("https://json-schema.org/draft/2019-09/vocab/meta-data", Vocab::MetaData),
            ("https://json-schema.org/draft/2019-09/vocab/format", Vocab::Format),
            ("https://json-schema.org/draft/2019-09/vocab/content", Vocab::Content),
        ],
        Draft::Draft202012 => &[
            ("https://json-schema.org/draft/2020-12/vocab/core", Vocab::Core),
            ("https://json-schema.org/draft/2020-12/vocab/applicator", Vocab::Applicator),
            ("https://json-schema.org/draft/2020-12/vocab/unevaluated", Vocab::Unevaluated),
            ("https://json-schema.org/draft/2020-12/vocab/validation", Vocab::Validation),
            ("https://json-schema.org/draft/2020-12/vocab/meta-data", Vocab::MetaData),
            (
                "https://json-schema.org/draft/2020-12/vocab/format-annotation",
                Vocab::Format,
            ),
            ("https://json-schema.org/draft/2020-12/vocab/content", Vocab::Content),
        ],
        _ => &[],
    }
}

/// Whether a vocabulary URI is recognized for any built-in draft
#[must_use]
pub fn vocabulary_known(uri: &str) -> bool {
    Draft::ALL
        .into_iter()
        .any(|draft| vocabulary_uris(draft).iter().any(|(known, _)| *known == uri))
}

/// The active keyword table for a draft under a configuration
///
/// Required-but-unknown vocabularies fail with `UnsupportedVocabulary`;
/// vocabularies mapped to `false` have their keywords removed from the table.
/// Custom keywords in the configuration shadow standard keywords of the same
/// name (the executor consults the custom map first), so they are not listed
/// here.
pub fn active_table(
    draft: Draft,
    config: &Configuration,
) -> Result<IndexMap<&'static str, Keyword>> {
    let mut disabled: Vec<Vocab> = Vec::new();
    if let Some(vocabulary) = &config.vocabulary {
        for (uri, required) in vocabulary {
            let known = vocabulary_uris(draft)
                .iter()
                .find(|(known, _)| known == uri)
                .map(|(_, vocab)| *vocab);
            match known {
                Some(vocab) => {
                    if !*required {
                        disabled.push(vocab);
                    }
                }
                None if *required && !vocabulary_known(uri) => {
                    return Err(SchemaError::unsupported_vocabulary(uri));
                }
                None => {}
            }
        }
    }

    Ok(table(draft)
        .iter()
        .filter(|entry| !disabled.contains(&entry.vocab))
        .map(|entry| (entry.name, entry.keyword))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_assertions_precede_applicators() {
        for draft in Draft::ALL {
            let table = table(draft);
            let type_pos = table.iter().position(|s| s.name == "type").expect("type");
            let props_pos = table
                .iter()
                .position(|s| s.name == "properties")
                .expect("properties");
            assert!(type_pos < props_pos, "draft {draft}: type before properties");
        }
    }

    #[test]
    fn test_unevaluated_runs_last() {
        let table = table(Draft::Draft202012);
        assert_eq!(table[table.len() - 1].name, "unevaluatedProperties");
        assert_eq!(table[table.len() - 2].name, "unevaluatedItems");
    }

    #[test]
    fn test_draft4_has_no_modern_keywords() {
        let names: Vec<&str> = table(Draft::Draft4).iter().map(|s| s.name).collect();
        assert!(!names.contains(&"const"));
        assert!(!names.contains(&"exclusiveMaximum"));
        assert!(!names.contains(&"if"));
        assert!(names.contains(&"dependencies"));
    }

    #[test]
    fn test_draft2020_drops_legacy_keywords() {
        let names: Vec<&str> = table(Draft::Draft202012).iter().map(|s| s.name).collect();
        assert!(!names.contains(&"dependencies"));
        assert!(!names.contains(&"additionalItems"));
        assert!(!names.contains(&"$recursiveRef"));
        assert!(names.contains(&"prefixItems"));
        assert!(names.contains(&"$dynamicRef"));
    }

    #[test]
    fn test_unknown_required_vocabulary_rejected() {
        let mut config = Configuration::default();
        let mut vocabulary = IndexMap::new();
        vocabulary.insert("https://example.com/vocab/custom".to_string(), true);
        config.vocabulary = Some(vocabulary);

        let err = active_table(Draft::Draft202012, &config).expect_err("must fail");
        assert!(matches!(err, SchemaError::UnsupportedVocabulary { .. }));
    }

    #[test]
    fn test_disabled_vocabulary_removes_keywords() {
        let mut config = Configuration::default();
        let mut vocabulary = IndexMap::new();
        vocabulary.insert(
            "https://json-schema.org/draft/2020-12/vocab/format-annotation".to_string(),
            false,
        );
        config.vocabulary = Some(vocabulary);

        let active = active_table(Draft::Draft202012, &config).expect("table");
        assert!(!active.contains_key("format"));
        assert!(active.contains_key("type"));
    }
}
