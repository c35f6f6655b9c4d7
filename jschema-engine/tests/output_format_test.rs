//! The five output shapes, projected from one validation run

use jschema_engine::{OutputFormat, Schema};
use pretty_assertions::assert_eq;
use serde_json::json;

fn person_schema() -> Schema {
    Schema::compile(json!({
        "$id": "https://example.com/person",
        "type": "object",
        "title": "Person",
        "required": ["name"],
        "properties": {
            "name": {"type": "string"},
            "age": {"type": "integer", "minimum": 0}
        }
    }))
    .expect("compiles")
}

#[test]
fn test_flag_output() {
    let schema = person_schema();
    assert_eq!(
        schema
            .output_as(&json!({"name": "x"}), OutputFormat::Flag)
            .expect("runs"),
        json!({"valid": true})
    );
    assert_eq!(
        schema.output_as(&json!({}), OutputFormat::Flag).expect("runs"),
        json!({"valid": false})
    );
}

#[test]
fn test_classic_errors_carry_pointers() {
    let schema = person_schema();
    let errors = schema
        .errors(&json!({"name": 1, "age": -3}))
        .expect("runs");

    let keywords: Vec<&str> = errors.iter().map(|e| e.keyword.as_str()).collect();
    assert!(keywords.contains(&"type"));
    assert!(keywords.contains(&"minimum"));

    let minimum = errors.iter().find(|e| e.keyword == "minimum").expect("present");
    assert_eq!(minimum.instance_pointer, "/age");
}

#[test]
fn test_basic_output_is_flat() {
    let schema = person_schema();
    let output = schema
        .output_as(&json!({"age": -1}), OutputFormat::Basic)
        .expect("runs");
    assert_eq!(output["valid"], json!(false));

    let errors = output["errors"].as_array().expect("errors");
    // every unit is a leaf record; nesting is never emitted in basic form
    assert!(errors.iter().all(|unit| unit.get("errors").is_none()));
    assert!(errors
        .iter()
        .any(|unit| unit["instanceLocation"] == json!("/age")));
}

#[test]
fn test_detailed_output_nests_failures() {
    let schema = person_schema();
    let output = schema
        .output_as(&json!({"name": 1}), OutputFormat::Detailed)
        .expect("runs");
    assert_eq!(output["valid"], json!(false));

    let top = output["errors"].as_array().expect("children");
    // the passing `required` branch is pruned
    assert!(top
        .iter()
        .all(|unit| unit["keywordLocation"] != json!("/required")));
    let properties = top
        .iter()
        .find(|unit| unit["keywordLocation"] == json!("/properties"))
        .expect("properties branch");
    assert!(properties["errors"].as_array().is_some());
}

#[test]
fn test_verbose_output_keeps_annotations() {
    let schema = person_schema();
    let output = schema
        .output_as(&json!({"name": "x"}), OutputFormat::Verbose)
        .expect("runs");
    assert_eq!(output["valid"], json!(true));

    let annotations = output["annotations"].as_array().expect("annotations");
    let title = annotations
        .iter()
        .find(|unit| unit["keywordLocation"] == json!("/title"))
        .expect("title annotation");
    assert_eq!(title["annotation"], json!("Person"));
}

#[test]
fn test_absolute_keyword_location_uses_canonical_uri() {
    let schema = person_schema();
    let output = schema
        .output_as(&json!({"name": 1}), OutputFormat::Basic)
        .expect("runs");
    let errors = output["errors"].as_array().expect("errors");
    assert!(errors.iter().any(|unit| {
        unit["absoluteKeywordLocation"]
            == json!("https://example.com/person#/properties/name/type")
    }));
}

#[test]
fn test_keyword_location_tracks_ref_hops() {
    let schema = Schema::compile(json!({
        "$defs": {"name": {"type": "string"}},
        "properties": {"name": {"$ref": "#/$defs/name"}}
    }))
    .expect("compiles");
    let node = schema.validate(&json!({"name": 1})).expect("runs");
    let failures = node.failures();
    // the dynamic path goes through the $ref, the canonical URI does not
    assert!(failures
        .iter()
        .any(|f| f.keyword_location.contains("/$ref/")));
}

#[test]
fn test_output_uses_configured_format() {
    let schema = Schema::compile_with(
        json!({"type": "integer"}),
        jschema_engine::Configuration::default().with_output_format(OutputFormat::Flag),
    )
    .expect("compiles");
    assert_eq!(schema.output(&json!("x")).expect("runs"), json!({"valid": false}));
}
