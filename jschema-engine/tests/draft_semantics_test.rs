//! Cross-draft keyword semantics exercised through the public API

use jschema_engine::{Schema, draft4, draft6, draft7, draft201909, draft202012};
use serde_json::json;

#[test]
fn test_draft_detection_from_schema_keyword() {
    let schema = Schema::compile(json!({
        "$schema": "http://json-schema.org/draft-06/schema#",
        "const": 5
    }))
    .expect("compiles");
    assert_eq!(schema.draft(), jschema_engine::Draft::Draft6);
}

#[test]
fn test_configured_default_draft_applies_without_schema_keyword() {
    let schema = Schema::compile_with(json!({"maximum": 10}), draft4()).expect("compiles");
    assert_eq!(schema.draft(), jschema_engine::Draft::Draft4);
}

#[test]
fn test_draft4_boolean_exclusive_bounds() {
    let schema = Schema::compile_with(
        json!({"maximum": 10, "exclusiveMaximum": true}),
        draft4(),
    )
    .expect("compiles");
    assert!(schema.valid(&json!(9)).expect("runs"));
    assert!(!schema.valid(&json!(10)).expect("runs"));

    let inclusive = Schema::compile_with(json!({"maximum": 10}), draft4()).expect("compiles");
    assert!(inclusive.valid(&json!(10)).expect("runs"));
}

#[test]
fn test_boolean_exclusive_maximum_is_schema_invalid_in_modern_drafts() {
    // drafts since 6 make exclusiveMaximum a number; the draft-4 boolean
    // modifier form no longer meta-validates
    for uri in [
        "https://json-schema.org/draft/2020-12/schema",
        "https://json-schema.org/draft/2019-09/schema",
    ] {
        let boolean_form = json!({
            "$schema": uri,
            "maximum": 1,
            "exclusiveMaximum": true
        });
        assert!(
            !jschema_engine::valid_schema(&boolean_form).expect("runs"),
            "{uri}"
        );

        let numeric_form = json!({"$schema": uri, "exclusiveMaximum": 1});
        assert!(jschema_engine::valid_schema(&numeric_form).expect("runs"), "{uri}");
    }

    let draft4_form = json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "maximum": 1,
        "exclusiveMaximum": true
    });
    assert!(jschema_engine::valid_schema(&draft4_form).expect("runs"));
}

#[test]
fn test_draft4_integer_is_lexical() {
    let schema = Schema::compile_with(json!({"type": "integer"}), draft4()).expect("compiles");
    assert!(schema.valid(&json!(1)).expect("runs"));
    assert!(!schema.valid(&json!(1.0)).expect("runs"));

    let modern = Schema::compile_with(json!({"type": "integer"}), draft6()).expect("compiles");
    assert!(modern.valid(&json!(1.0)).expect("runs"));
    assert!(!modern.valid(&json!(1.5)).expect("runs"));
}

#[test]
fn test_multiple_of_exact_decimal_arithmetic() {
    let schema = Schema::compile(json!({"multipleOf": 0.01})).expect("compiles");
    assert!(schema.valid(&json!(19.99)).expect("runs"));
    assert!(schema.valid(&json!(1.0e8)).expect("runs"));
    assert!(!schema.valid(&json!(0.005)).expect("runs"));
}

#[test]
fn test_dependencies_split_into_dependent_keywords() {
    // draft 7 spells both forms through one keyword
    let legacy = Schema::compile_with(
        json!({"dependencies": {
            "a": ["b"],
            "c": {"minProperties": 2}
        }}),
        draft7(),
    )
    .expect("compiles");
    assert!(legacy.valid(&json!({"a": 1, "b": 2})).expect("runs"));
    assert!(!legacy.valid(&json!({"a": 1})).expect("runs"));
    assert!(!legacy.valid(&json!({"c": 1})).expect("runs"));

    // 2019-09 splits them
    let modern = Schema::compile_with(
        json!({
            "dependentRequired": {"a": ["b"]},
            "dependentSchemas": {"c": {"minProperties": 2}}
        }),
        draft201909(),
    )
    .expect("compiles");
    assert!(!modern.valid(&json!({"a": 1})).expect("runs"));
    assert!(!modern.valid(&json!({"c": 1})).expect("runs"));
    assert!(modern.valid(&json!({"a": 1, "b": 2})).expect("runs"));
}

#[test]
fn test_tuple_items_then_prefix_items() {
    let legacy = Schema::compile_with(
        json!({
            "items": [{"type": "integer"}],
            "additionalItems": {"type": "string"}
        }),
        draft7(),
    )
    .expect("compiles");
    assert!(legacy.valid(&json!([1, "a", "b"])).expect("runs"));
    assert!(!legacy.valid(&json!([1, 2])).expect("runs"));

    let modern = Schema::compile_with(
        json!({
            "prefixItems": [{"type": "integer"}],
            "items": {"type": "string"}
        }),
        draft202012(),
    )
    .expect("compiles");
    assert!(modern.valid(&json!([1, "a", "b"])).expect("runs"));
    assert!(!modern.valid(&json!([1, 2])).expect("runs"));
}

#[test]
fn test_unevaluated_properties_sees_through_in_place_applicators() {
    let schema = Schema::compile(json!({
        "allOf": [
            {"properties": {"a": {"type": "integer"}}},
            {"properties": {"b": {"type": "integer"}}}
        ],
        "unevaluatedProperties": false
    }))
    .expect("compiles");
    assert!(schema.valid(&json!({"a": 1, "b": 2})).expect("runs"));
    assert!(!schema.valid(&json!({"a": 1, "extra": 2})).expect("runs"));
}

#[test]
fn test_unevaluated_items_after_contains() {
    let schema = Schema::compile(json!({
        "contains": {"type": "integer"},
        "unevaluatedItems": {"type": "string"}
    }))
    .expect("compiles");
    assert!(schema.valid(&json!([1, "a", 2])).expect("runs"));
    assert!(!schema.valid(&json!([1, true])).expect("runs"));
}

#[test]
fn test_min_max_contains() {
    let schema = Schema::compile(json!({
        "contains": {"type": "integer"},
        "minContains": 2,
        "maxContains": 3
    }))
    .expect("compiles");
    assert!(!schema.valid(&json!([1])).expect("runs"));
    assert!(schema.valid(&json!([1, 2, "x"])).expect("runs"));
    assert!(!schema.valid(&json!([1, 2, 3, 4])).expect("runs"));

    // pre-2019 drafts ignore the bounds entirely
    let legacy = Schema::compile_with(
        json!({"contains": {"type": "integer"}, "minContains": 2}),
        draft7(),
    )
    .expect("compiles");
    assert!(legacy.valid(&json!([1])).expect("runs"));
}

#[test]
fn test_content_keywords_assert_only_in_draft7() {
    let legacy = Schema::compile_with(
        json!({"contentEncoding": "base64", "contentMediaType": "application/json"}),
        draft7(),
    )
    .expect("compiles");
    assert!(legacy.valid(&json!("eyJhIjoxfQ==")).expect("runs"));
    assert!(!legacy.valid(&json!("!!!")).expect("runs"));

    let modern = Schema::compile(json!({"contentEncoding": "base64"})).expect("compiles");
    assert!(modern.valid(&json!("!!!")).expect("runs"));
}

#[test]
fn test_const_unavailable_in_draft4() {
    // draft 4 has no const keyword; it is ignored rather than enforced
    let schema = Schema::compile_with(json!({"const": 5}), draft4()).expect("compiles");
    assert!(schema.valid(&json!(99)).expect("runs"));
}

#[test]
fn test_enum_and_const_numeric_equality() {
    let schema = Schema::compile(json!({"enum": [1, {"a": 2}]})).expect("compiles");
    assert!(schema.valid(&json!(1.0)).expect("runs"));
    assert!(schema.valid(&json!({"a": 2.0})).expect("runs"));
    assert!(!schema.valid(&json!("1")).expect("runs"));
}

#[test]
fn test_property_names_and_propagated_failures() {
    let schema = Schema::compile(json!({"propertyNames": {"maxLength": 3}})).expect("compiles");
    assert!(schema.valid(&json!({"abc": 1})).expect("runs"));
    assert!(!schema.valid(&json!({"abcd": 1})).expect("runs"));
}

#[test]
fn test_unicode_length_counts_characters() {
    let schema = Schema::compile(json!({"maxLength": 3})).expect("compiles");
    assert!(schema.valid(&json!("日本語")).expect("runs"));
    assert!(!schema.valid(&json!("long")).expect("runs"));
}
