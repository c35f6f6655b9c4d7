//! The configuration surface: builders, global default, hooks, custom
//! formats/keywords, access modes, and default insertion

use jschema_engine::{
    AccessMode, Configuration, OutputFormat, RegexDialect, Schema, draft4, draft201909,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

#[test]
fn test_defaults() {
    let config = Configuration::default();
    assert_eq!(config.base_uri.as_str(), "jschema://schema");
    assert!(config.format);
    assert!(!config.insert_property_defaults);
    assert_eq!(config.output_format, OutputFormat::Classic);
    assert_eq!(config.regex_dialect, RegexDialect::Native);
    assert!(config.access_mode.is_none());
}

#[test]
fn test_global_configure_does_not_affect_existing_snapshots() {
    let before = jschema_engine::global();
    jschema_engine::configure(|config| config.format = false);
    assert!(before.format);
    assert!(!jschema_engine::global().format);
    jschema_engine::configure(|config| config.format = true);
}

#[test]
fn test_meta_schema_accessors_select_drafts() {
    assert_eq!(draft4().meta_schema.draft(), Some(jschema_engine::Draft::Draft4));
    assert_eq!(
        draft201909().meta_schema.draft(),
        Some(jschema_engine::Draft::Draft201909)
    );
}

#[test]
fn test_meta_schema_document() {
    let meta = Arc::new(json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://example.com/my-meta"
    }));
    let schema = Schema::compile_with(
        json!({"type": "integer"}),
        Configuration::default().with_meta_schema_document(meta),
    )
    .expect("compiles");
    assert_eq!(schema.draft(), jschema_engine::Draft::Draft202012);
    assert!(schema.valid(&json!(3)).expect("runs"));
}

#[test]
fn test_format_assertion_toggle() {
    let asserting =
        Schema::compile_with(json!({"format": "ipv4"}), Configuration::default())
            .expect("compiles");
    assert!(!asserting.valid(&json!("999.1.1.1")).expect("runs"));
    assert!(asserting.valid(&json!("127.0.0.1")).expect("runs"));

    let annotating = Schema::compile_with(
        json!({"format": "ipv4"}),
        Configuration::default().with_format(false),
    )
    .expect("compiles");
    assert!(annotating.valid(&json!("999.1.1.1")).expect("runs"));
}

#[test]
fn test_custom_format_validator() {
    let config = Configuration::default().with_format_validator(
        "even-length",
        Arc::new(|value: &str| value.len() % 2 == 0),
    );
    let schema = Schema::compile_with(json!({"format": "even-length"}), config)
        .expect("compiles");
    assert!(schema.valid(&json!("ab")).expect("runs"));
    assert!(!schema.valid(&json!("abc")).expect("runs"));
}

#[test]
fn test_unknown_format_annotates_and_passes() {
    let schema = Schema::compile(json!({"format": "no-such-format"})).expect("compiles");
    assert!(schema.valid(&json!("anything")).expect("runs"));
}

#[test]
fn test_custom_keyword() {
    let config = Configuration::default().with_keyword(
        "divisibleByThree",
        Arc::new(|instance: &Value, _fragment: &Value, _location: &str| {
            instance.as_u64().is_some_and(|n| n % 3 == 0)
        }),
    );
    let schema = Schema::compile_with(json!({"divisibleByThree": true}), config)
        .expect("compiles");
    assert!(schema.valid(&json!(9)).expect("runs"));
    assert!(!schema.valid(&json!(10)).expect("runs"));
}

#[test]
fn test_access_modes() {
    let schema = json!({
        "properties": {
            "id": {"readOnly": true},
            "password": {"writeOnly": true}
        }
    });

    let write = Schema::compile_with(
        schema.clone(),
        Configuration::default().with_access_mode(AccessMode::Write),
    )
    .expect("compiles");
    assert!(!write.valid(&json!({"id": 1})).expect("runs"));
    assert!(write.valid(&json!({"password": "s"})).expect("runs"));

    let read = Schema::compile_with(
        schema.clone(),
        Configuration::default().with_access_mode(AccessMode::Read),
    )
    .expect("compiles");
    assert!(read.valid(&json!({"id": 1})).expect("runs"));
    assert!(!read.valid(&json!({"password": "s"})).expect("runs"));

    // without a mode both are plain annotations
    let neutral = Schema::compile(schema).expect("compiles");
    assert!(neutral.valid(&json!({"id": 1, "password": "s"})).expect("runs"));
}

#[test]
fn test_insert_property_defaults() {
    let schema = Schema::compile_with(
        json!({
            "properties": {
                "mode": {"type": "string", "default": "auto"},
                "level": {"type": "integer"}
            },
            "required": ["mode"]
        }),
        Configuration::default().with_insert_property_defaults(true),
    )
    .expect("compiles");

    let mut instance = json!({"level": 3});
    assert!(schema.insert_defaults(&mut instance).expect("runs"));
    assert_eq!(instance, json!({"level": 3, "mode": "auto"}));

    // a second pass finds nothing missing and changes nothing
    assert!(!schema.insert_defaults(&mut instance).expect("runs"));
    assert_eq!(instance, json!({"level": 3, "mode": "auto"}));
}

#[test]
fn test_property_default_resolver() {
    let mut config = Configuration::default().with_insert_property_defaults(true);
    config.property_default_resolver = Some(Arc::new(
        |_object: &serde_json::Map<String, Value>, property: &str, _schema: &Value| {
            (property == "source").then(|| json!("resolver"))
        },
    ));
    let schema = Schema::compile_with(
        json!({"properties": {"source": {"type": "string"}}}),
        config,
    )
    .expect("compiles");

    let mut instance = json!({});
    assert!(schema.insert_defaults(&mut instance).expect("runs"));
    assert_eq!(instance, json!({"source": "resolver"}));
}

#[test]
fn test_property_validation_hooks() {
    let mut config = Configuration::default();
    config.before_property_validation.push(Arc::new(
        |_object: &serde_json::Map<String, Value>, property: &str, _schema: &Value, _loc: &str| {
            property != "forbidden"
        },
    ));
    let schema = Schema::compile_with(
        json!({"properties": {"allowed": true, "forbidden": true}}),
        config,
    )
    .expect("compiles");
    assert!(schema.valid(&json!({"allowed": 1})).expect("runs"));
    assert!(!schema.valid(&json!({"forbidden": 1})).expect("runs"));
}

#[test]
fn test_ecma_regex_dialect() {
    let config = Configuration::default().with_regex_dialect(RegexDialect::Ecma262);
    let schema = Schema::compile_with(json!({"pattern": "^\\d+$"}), config).expect("compiles");
    assert!(schema.valid(&json!("123")).expect("runs"));
    // ECMA \d is ASCII-only; Eastern Arabic digits must not match
    assert!(!schema.valid(&json!("١٢٣")).expect("runs"));
}

#[test]
fn test_schema_validity_check() {
    assert!(jschema_engine::valid_schema(&json!({"type": "string"})).expect("runs"));
    assert!(!jschema_engine::valid_schema(&json!({"type": 42})).expect("runs"));
    assert!(
        !jschema_engine::valid_schema(&json!({"properties": {"a": {"minLength": -1}}}))
            .expect("runs")
    );
}

#[test]
fn test_vocabulary_override_disables_validation_keywords() {
    let mut config = Configuration::default();
    config.vocabulary = Some(
        [(
            "https://json-schema.org/draft/2020-12/vocab/validation".to_string(),
            false,
        )]
        .into_iter()
        .collect(),
    );
    let schema = Schema::compile_with(json!({"type": "string"}), config).expect("compiles");
    // the validation vocabulary is switched off, so `type` never asserts
    assert!(schema.valid(&json!(42)).expect("runs"));
}
