//! Keyword evaluation
//!
//! The executor walks schema and instance together, dispatching on the
//! compiled keyword table of whichever draft governs the current schema
//! object, and produces one `ResultNode` tree per run. It carries the
//! dynamic scope used by `$dynamicRef`/`$recursiveRef`, the reference trail
//! used to detect non-terminating reference cycles, and the coverage sets the
//! `unevaluated*` keywords consult.
//!
//! A run never mutates the caller's instance. When default insertion is
//! enabled, missing-property defaults are collected during the first pass,
//! applied to a working copy, and the copy is evaluated once more.

use crate::compiler::CompiledSchema;
use crate::content;
use crate::document::SchemaDocument;
use crate::formats;
use crate::number;
use crate::pattern;
use crate::registry::Keyword;
use jschema_core::config::{AccessMode, Configuration};
use jschema_core::draft::Draft;
use jschema_core::error::{Result, SchemaError};
use jschema_core::pointer::{escape_token, Location};
use jschema_core::report::{Coverage, ResultNode};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::trace;
use url::Url;

/// Result of applying one subschema: its tree node plus the properties and
/// items it evaluated at the current instance location
pub struct Evaluation {
    pub node: ResultNode,
    pub coverage: Coverage,
}

/// Result of a whole run
#[derive(Debug)]
pub struct Outcome {
    pub node: ResultNode,
    /// Copy of the instance with schema defaults filled in, present only
    /// when default insertion ran and found something to insert
    pub defaulted_instance: Option<Value>,
}

/// A default value queued for insertion into the working copy
struct PendingDefault {
    instance_pointer: String,
    property: String,
    value: Value,
}

/// One resource entered on the current evaluation path, outermost first
struct ScopeEntry {
    doc: Arc<SchemaDocument>,
    base: String,
}

/// Evaluate an instance against a compiled schema
///
/// `verbose` disables the `anyOf` short-circuit and retains passing branches
/// so the verbose output shape has complete annotations to project.
pub fn evaluate(compiled: &CompiledSchema, instance: &Value, verbose: bool) -> Result<Outcome> {
    let mut executor = Executor::new(compiled, verbose);
    let evaluation = executor.eval_root(instance)?;

    if compiled.config.insert_property_defaults && !executor.pending_defaults.is_empty() {
        let mut working = instance.clone();
        apply_defaults(&mut working, &executor.pending_defaults);
        let mut second = Executor::new(compiled, verbose);
        let evaluation = second.eval_root(&working)?;
        return Ok(Outcome {
            node: evaluation.node,
            defaulted_instance: Some(working),
        });
    }

    Ok(Outcome {
        node: evaluation.node,
        defaulted_instance: None,
    })
}

fn apply_defaults(instance: &mut Value, defaults: &[PendingDefault]) {
    for pending in defaults {
        if let Some(Value::Object(target)) = instance.pointer_mut(&pending.instance_pointer) {
            target
                .entry(pending.property.clone())
                .or_insert_with(|| pending.value.clone());
        }
    }
}

/// Per-schema-object evaluation state
struct Frame<'a> {
    doc: &'a Arc<SchemaDocument>,
    pointer: &'a str,
    schema: &'a Map<String, Value>,
    draft: Draft,
    base: &'a Url,
    instance: &'a Value,
    instance_loc: &'a Location,
    keyword_loc: &'a Location,
    /// Property names addressed by `properties`/`patternProperties`
    addressed: BTreeSet<String>,
    /// Successful evaluations at this instance location, for `unevaluated*`
    coverage: Coverage,
    /// Decoded string carried from `contentEncoding` to `contentMediaType`
    decoded_content: Option<String>,
    children: Vec<ResultNode>,
    valid: bool,
}

impl Frame<'_> {
    fn fail(&mut self, child: ResultNode) {
        self.valid = false;
        self.children.push(child);
    }

    fn instance_pointer(&self) -> String {
        self.instance_loc.as_pointer()
    }
}

struct Executor<'a> {
    compiled: &'a CompiledSchema,
    config: &'a Configuration,
    verbose: bool,
    scope: Vec<ScopeEntry>,
    ref_trail: Vec<(String, String)>,
    pending_defaults: Vec<PendingDefault>,
}

/// Canonical URI of a schema pointer within its resource
fn absolute_location(doc: &SchemaDocument, base: &Url, pointer: &str) -> String {
    let resource_pointer = if base.as_str() == doc.uri.as_str() {
        ""
    } else {
        doc.ids.get(base.as_str()).map_or("", String::as_str)
    };
    let relative = pointer.strip_prefix(resource_pointer).unwrap_or(pointer);
    format!("{base}#{relative}")
}

fn type_matches(draft: Draft, name: &str, value: &Value) -> bool {
    match name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.as_number().is_some_and(|n| {
            if draft == Draft::Draft4 {
                n.is_i64() || n.is_u64()
            } else {
                number::is_integer(n)
            }
        }),
        _ => false,
    }
}

impl<'a> Executor<'a> {
    fn new(compiled: &'a CompiledSchema, verbose: bool) -> Self {
        Executor {
            compiled,
            config: &compiled.config,
            verbose,
            scope: Vec::new(),
            ref_trail: Vec::new(),
            pending_defaults: Vec::new(),
        }
    }

    fn eval_root(&mut self, instance: &Value) -> Result<Evaluation> {
        let root = Arc::clone(&self.compiled.root);
        self.eval(&root, "", instance, &Location::root(), &Location::root())
    }

    fn eval(
        &mut self,
        doc: &Arc<SchemaDocument>,
        pointer: &str,
        instance: &Value,
        instance_loc: &Location,
        keyword_loc: &Location,
    ) -> Result<Evaluation> {
        let value = doc
            .value_at(pointer)
            .ok_or_else(|| SchemaError::unknown_ref_at(doc.uri.as_str(), pointer))?;
        let info = doc
            .info_for(pointer)
            .ok_or_else(|| SchemaError::invalid_schema_at("unindexed schema location", pointer))?;
        let base = info.base.clone();
        let draft = info.draft;
        let absolute = absolute_location(doc, &base, pointer);

        let schema = match value {
            Value::Bool(true) => {
                return Ok(Evaluation {
                    node: ResultNode::passed(keyword_loc.as_pointer(), instance_loc.as_pointer())
                        .with_absolute_location(absolute),
                    coverage: Coverage::default(),
                });
            }
            Value::Bool(false) => {
                return Ok(Evaluation {
                    node: ResultNode::failed(
                        keyword_loc.as_pointer(),
                        instance_loc.as_pointer(),
                        "value is disallowed by a false schema",
                    )
                    .with_absolute_location(absolute),
                    coverage: Coverage::default(),
                });
            }
            Value::Object(schema) => schema,
            _ => {
                return Err(SchemaError::invalid_schema_at(
                    "schema must be an object or a boolean",
                    pointer,
                ));
            }
        };

        trace!(schema = %absolute, instance = %instance_loc, "evaluating");

        // Entering a resource pushes a dynamic-scope entry
        let is_resource_root =
            pointer.is_empty() || doc.ids.get(base.as_str()).is_some_and(|p| p == pointer);
        if is_resource_root {
            self.scope.push(ScopeEntry {
                doc: Arc::clone(doc),
                base: base.as_str().to_string(),
            });
        }

        let mut frame = Frame {
            doc,
            pointer,
            schema,
            draft,
            base: &base,
            instance,
            instance_loc,
            keyword_loc,
            addressed: BTreeSet::new(),
            coverage: Coverage::default(),
            decoded_content: None,
            children: Vec::new(),
            valid: true,
        };

        let result = self.eval_object(&mut frame);

        if is_resource_root {
            self.scope.pop();
        }
        result?;

        let mut node = if frame.valid {
            ResultNode::passed(keyword_loc.as_pointer(), instance_loc.as_pointer())
        } else {
            ResultNode::failed(
                keyword_loc.as_pointer(),
                instance_loc.as_pointer(),
                "value does not conform to schema",
            )
        }
        .with_absolute_location(absolute);
        node.children = frame.children;

        Ok(Evaluation {
            node,
            coverage: if frame.valid {
                frame.coverage
            } else {
                Coverage::default()
            },
        })
    }

    fn eval_object(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        // Custom keywords run first and shadow standard ones
        let custom: Vec<String> = self
            .config
            .keywords
            .keys()
            .filter(|name| frame.schema.contains_key(*name))
            .cloned()
            .collect();
        for name in &custom {
            let validator = &self.config.keywords[name];
            let fragment = &frame.schema[name];
            let child_loc = frame.keyword_loc.push(name);
            if validator(frame.instance, fragment, &frame.instance_pointer()) {
                frame
                    .children
                    .push(self.keyword_pass(frame, &child_loc, name));
            } else {
                let child = self.keyword_fail(
                    frame,
                    &child_loc,
                    name,
                    format!("value fails custom keyword: {name}"),
                );
                frame.fail(child);
            }
        }

        // In the old drafts a $ref suppresses every sibling keyword
        if frame.draft.ref_ignores_siblings() && frame.schema.contains_key("$ref") {
            return self.apply_ref(frame, "$ref");
        }

        let table = self.compiled.table_for(frame.draft);
        for (name, keyword) in table {
            if !frame.schema.contains_key(*name) || custom.iter().any(|c| c == name) {
                continue;
            }
            self.apply_keyword(frame, *name, *keyword)?;
        }
        Ok(())
    }

    fn keyword_pass(&self, frame: &Frame<'_>, child_loc: &Location, name: &str) -> ResultNode {
        ResultNode::passed(child_loc.as_pointer(), frame.instance_loc.as_pointer())
            .with_keyword(name)
            .with_absolute_location(absolute_location(
                frame.doc,
                frame.base,
                &format!("{}/{}", frame.pointer, escape_token(name)),
            ))
    }

    fn keyword_fail(
        &self,
        frame: &Frame<'_>,
        child_loc: &Location,
        name: &str,
        message: impl Into<String>,
    ) -> ResultNode {
        ResultNode::failed(
            child_loc.as_pointer(),
            frame.instance_loc.as_pointer(),
            message,
        )
        .with_keyword(name)
        .with_absolute_location(absolute_location(
            frame.doc,
            frame.base,
            &format!("{}/{}", frame.pointer, escape_token(name)),
        ))
    }

    #[allow(clippy::too_many_lines)]
    fn apply_keyword(&mut self, frame: &mut Frame<'_>, name: &str, keyword: Keyword) -> Result<()> {
        let fragment = &frame.schema[name];
        let child_loc = frame.keyword_loc.push(name);

        match keyword {
            Keyword::Ref => self.apply_ref(frame, "$ref")?,
            Keyword::RecursiveRef => self.apply_recursive_ref(frame)?,
            Keyword::DynamicRef => self.apply_dynamic_ref(frame)?,

            Keyword::Type => {
                let names: Vec<&str> = match fragment {
                    Value::String(single) => vec![single.as_str()],
                    Value::Array(list) => list.iter().filter_map(Value::as_str).collect(),
                    _ => Vec::new(),
                };
                if names
                    .iter()
                    .any(|n| type_matches(frame.draft, n, frame.instance))
                {
                    frame
                        .children
                        .push(self.keyword_pass(frame, &child_loc, name));
                } else {
                    let child = self.keyword_fail(
                        frame,
                        &child_loc,
                        name,
                        format!("value is not of type: {}", names.join(", ")),
                    );
                    frame.fail(child);
                }
            }

            Keyword::Enum => {
                let materialized = self.compiled.enumerators.get(frame.pointer).cloned();
                let values: &[Value] = match &materialized {
                    Some(values) => values,
                    None => fragment.as_array().map_or(&[], Vec::as_slice),
                };
                if values
                    .iter()
                    .any(|candidate| number::json_equal(candidate, frame.instance))
                {
                    frame
                        .children
                        .push(self.keyword_pass(frame, &child_loc, name));
                } else {
                    let child = self.keyword_fail(
                        frame,
                        &child_loc,
                        name,
                        "value is not one of the enumerated values",
                    );
                    frame.fail(child);
                }
            }

            Keyword::Const => {
                if number::json_equal(fragment, frame.instance) {
                    frame
                        .children
                        .push(self.keyword_pass(frame, &child_loc, name));
                } else {
                    let child = self.keyword_fail(
                        frame,
                        &child_loc,
                        name,
                        "value does not equal the constant",
                    );
                    frame.fail(child);
                }
            }

            Keyword::MultipleOf => {
                if let (Some(instance), Some(divisor)) =
                    (frame.instance.as_number(), fragment.as_number())
                {
                    if number::is_multiple_of(instance, divisor) {
                        frame
                            .children
                            .push(self.keyword_pass(frame, &child_loc, name));
                    } else {
                        let child = self.keyword_fail(
                            frame,
                            &child_loc,
                            name,
                            format!("number is not a multiple of {divisor}"),
                        );
                        frame.fail(child);
                    }
                }
            }

            Keyword::Maximum => self.apply_bound(frame, name, &child_loc, true),
            Keyword::Minimum => self.apply_bound(frame, name, &child_loc, false),
            Keyword::ExclusiveMaximum => self.apply_exclusive_bound(frame, name, &child_loc, true),
            Keyword::ExclusiveMinimum => self.apply_exclusive_bound(frame, name, &child_loc, false),

            Keyword::MaxLength | Keyword::MinLength => {
                if let (Some(text), Some(bound)) = (frame.instance.as_str(), fragment.as_u64()) {
                    let length = text.chars().count() as u64;
                    let (ok, relation) = if keyword == Keyword::MaxLength {
                        (length <= bound, "longer")
                    } else {
                        (length >= bound, "shorter")
                    };
                    if ok {
                        frame
                            .children
                            .push(self.keyword_pass(frame, &child_loc, name));
                    } else {
                        let child = self.keyword_fail(
                            frame,
                            &child_loc,
                            name,
                            format!("string is {relation} than {bound} characters"),
                        );
                        frame.fail(child);
                    }
                }
            }

            Keyword::Pattern => {
                if let (Some(text), Some(source)) = (frame.instance.as_str(), fragment.as_str()) {
                    if pattern::is_match(source, self.config.regex_dialect, text)? {
                        frame
                            .children
                            .push(self.keyword_pass(frame, &child_loc, name));
                    } else {
                        let child = self.keyword_fail(
                            frame,
                            &child_loc,
                            name,
                            format!("string does not match pattern: {source}"),
                        );
                        frame.fail(child);
                    }
                }
            }

            Keyword::MaxItems | Keyword::MinItems => {
                if let (Some(items), Some(bound)) = (frame.instance.as_array(), fragment.as_u64()) {
                    let count = items.len() as u64;
                    let (ok, relation) = if keyword == Keyword::MaxItems {
                        (count <= bound, "more")
                    } else {
                        (count >= bound, "fewer")
                    };
                    if ok {
                        frame
                            .children
                            .push(self.keyword_pass(frame, &child_loc, name));
                    } else {
                        let child = self.keyword_fail(
                            frame,
                            &child_loc,
                            name,
                            format!("array has {relation} than {bound} items"),
                        );
                        frame.fail(child);
                    }
                }
            }

            Keyword::UniqueItems => {
                if let (Some(items), Some(true)) = (frame.instance.as_array(), fragment.as_bool()) {
                    let duplicate = items.iter().enumerate().any(|(i, a)| {
                        items[..i].iter().any(|b| number::json_equal(a, b))
                    });
                    if duplicate {
                        let child = self.keyword_fail(
                            frame,
                            &child_loc,
                            name,
                            "array items are not unique",
                        );
                        frame.fail(child);
                    } else {
                        frame
                            .children
                            .push(self.keyword_pass(frame, &child_loc, name));
                    }
                }
            }

            Keyword::MaxProperties | Keyword::MinProperties => {
                if let (Some(object), Some(bound)) =
                    (frame.instance.as_object(), fragment.as_u64())
                {
                    let count = object.len() as u64;
                    let (ok, relation) = if keyword == Keyword::MaxProperties {
                        (count <= bound, "more")
                    } else {
                        (count >= bound, "fewer")
                    };
                    if ok {
                        frame
                            .children
                            .push(self.keyword_pass(frame, &child_loc, name));
                    } else {
                        let child = self.keyword_fail(
                            frame,
                            &child_loc,
                            name,
                            format!("object has {relation} than {bound} properties"),
                        );
                        frame.fail(child);
                    }
                }
            }

            Keyword::Required => {
                if let (Some(object), Some(required)) =
                    (frame.instance.as_object(), fragment.as_array())
                {
                    let missing: Vec<&str> = required
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|property| !object.contains_key(*property))
                        .collect();
                    if missing.is_empty() {
                        frame
                            .children
                            .push(self.keyword_pass(frame, &child_loc, name));
                    } else {
                        let child = self.keyword_fail(
                            frame,
                            &child_loc,
                            name,
                            format!("object is missing required properties: {}", missing.join(", ")),
                        );
                        frame.fail(child);
                    }
                }
            }

            Keyword::DependentRequired => {
                if let (Some(object), Some(map)) =
                    (frame.instance.as_object(), fragment.as_object())
                {
                    for (trigger, required) in map {
                        if !object.contains_key(trigger) {
                            continue;
                        }
                        let missing: Vec<&str> = required
                            .as_array()
                            .map_or(&[][..], Vec::as_slice)
                            .iter()
                            .filter_map(Value::as_str)
                            .filter(|property| !object.contains_key(*property))
                            .collect();
                        if !missing.is_empty() {
                            let child = self.keyword_fail(
                                frame,
                                &child_loc,
                                name,
                                format!(
                                    "object is missing properties required by '{trigger}': {}",
                                    missing.join(", ")
                                ),
                            );
                            frame.fail(child);
                        }
                    }
                }
            }

            Keyword::Format => self.apply_format(frame, &child_loc),
            Keyword::ContentEncoding => self.apply_content_encoding(frame, &child_loc),
            Keyword::ContentMediaType => self.apply_content_media_type(frame, &child_loc)?,

            Keyword::ReadOnly => {
                if fragment == &Value::Bool(true)
                    && self.config.access_mode == Some(AccessMode::Write)
                {
                    let child =
                        self.keyword_fail(frame, &child_loc, name, "value is read-only");
                    frame.fail(child);
                } else {
                    let annotated = self
                        .keyword_pass(frame, &child_loc, name)
                        .with_annotation(fragment.clone());
                    frame.children.push(annotated);
                }
            }
            Keyword::WriteOnly => {
                if fragment == &Value::Bool(true)
                    && self.config.access_mode == Some(AccessMode::Read)
                {
                    let child =
                        self.keyword_fail(frame, &child_loc, name, "value is write-only");
                    frame.fail(child);
                } else {
                    let annotated = self
                        .keyword_pass(frame, &child_loc, name)
                        .with_annotation(fragment.clone());
                    frame.children.push(annotated);
                }
            }

            Keyword::Title
            | Keyword::Description
            | Keyword::Default
            | Keyword::Deprecated
            | Keyword::Examples => {
                let annotated = self
                    .keyword_pass(frame, &child_loc, name)
                    .with_annotation(fragment.clone());
                frame.children.push(annotated);
            }

            Keyword::AllOf => self.apply_all_of(frame, &child_loc)?,
            Keyword::AnyOf => self.apply_any_of(frame, &child_loc)?,
            Keyword::OneOf => self.apply_one_of(frame, &child_loc)?,
            Keyword::Not => self.apply_not(frame, &child_loc)?,
            Keyword::If => self.apply_conditional(frame, &child_loc)?,
            Keyword::Dependencies => self.apply_dependencies(frame, &child_loc)?,
            Keyword::DependentSchemas => self.apply_dependent_schemas(frame, &child_loc)?,

            Keyword::Properties => self.apply_properties(frame, &child_loc)?,
            Keyword::PatternProperties => self.apply_pattern_properties(frame, &child_loc)?,
            Keyword::AdditionalProperties => {
                self.apply_additional_properties(frame, &child_loc)?;
            }
            Keyword::PropertyNames => self.apply_property_names(frame, &child_loc)?,

            Keyword::PrefixItems => self.apply_prefix_items(frame, &child_loc)?,
            Keyword::Items => self.apply_items(frame, &child_loc)?,
            Keyword::AdditionalItems => self.apply_additional_items(frame, &child_loc)?,
            Keyword::Contains => self.apply_contains(frame, &child_loc)?,

            Keyword::UnevaluatedItems => self.apply_unevaluated_items(frame, &child_loc)?,
            Keyword::UnevaluatedProperties => {
                self.apply_unevaluated_properties(frame, &child_loc)?;
            }
        }
        Ok(())
    }

    /// `maximum`/`minimum`, honoring the draft-4 boolean exclusivity modifier
    fn apply_bound(&self, frame: &mut Frame<'_>, name: &str, child_loc: &Location, upper: bool) {
        let fragment = &frame.schema[name];
        let (Some(instance), Some(bound)) = (frame.instance.as_number(), fragment.as_number())
        else {
            return;
        };
        let exclusive = frame.draft.exclusive_bounds_are_modifiers()
            && frame
                .schema
                .get(if upper {
                    "exclusiveMaximum"
                } else {
                    "exclusiveMinimum"
                })
                .and_then(Value::as_bool)
                .unwrap_or(false);
        let ordering = number::compare(instance, bound);
        let ok = match (upper, exclusive) {
            (true, false) => ordering != std::cmp::Ordering::Greater,
            (true, true) => ordering == std::cmp::Ordering::Less,
            (false, false) => ordering != std::cmp::Ordering::Less,
            (false, true) => ordering == std::cmp::Ordering::Greater,
        };
        if ok {
            frame
                .children
                .push(self.keyword_pass(frame, child_loc, name));
        } else {
            let relation = match (upper, exclusive) {
                (true, false) => "greater than maximum",
                (true, true) => "not less than exclusive maximum",
                (false, false) => "less than minimum",
                (false, true) => "not greater than exclusive minimum",
            };
            let child =
                self.keyword_fail(frame, child_loc, name, format!("number is {relation} {bound}"));
            frame.fail(child);
        }
    }

    /// Numeric `exclusiveMaximum`/`exclusiveMinimum` (draft 6 and later)
    fn apply_exclusive_bound(
        &self,
        frame: &mut Frame<'_>,
        name: &str,
        child_loc: &Location,
        upper: bool,
    ) {
        let fragment = &frame.schema[name];
        let (Some(instance), Some(bound)) = (frame.instance.as_number(), fragment.as_number())
        else {
            return;
        };
        let ordering = number::compare(instance, bound);
        let ok = if upper {
            ordering == std::cmp::Ordering::Less
        } else {
            ordering == std::cmp::Ordering::Greater
        };
        if ok {
            frame
                .children
                .push(self.keyword_pass(frame, child_loc, name));
        } else {
            let relation = if upper {
                "not less than exclusive maximum"
            } else {
                "not greater than exclusive minimum"
            };
            let child =
                self.keyword_fail(frame, child_loc, name, format!("number is {relation} {bound}"));
            frame.fail(child);
        }
    }

    fn apply_format(&self, frame: &mut Frame<'_>, child_loc: &Location) {
        let Some(format_name) = frame.schema["format"].as_str() else {
            return;
        };
        let annotation = json!(format_name);
        let Some(text) = frame.instance.as_str() else {
            let annotated = self
                .keyword_pass(frame, child_loc, "format")
                .with_annotation(annotation);
            frame.children.push(annotated);
            return;
        };

        let ok = if let Some(custom) = self.config.formats.get(format_name) {
            custom(text)
        } else if let Some(builtin) = formats::lookup(format_name) {
            builtin(text)
        } else {
            // Unknown formats annotate and pass
            true
        };

        if ok || !self.config.format {
            let annotated = self
                .keyword_pass(frame, child_loc, "format")
                .with_annotation(annotation);
            frame.children.push(annotated);
        } else {
            let child = self.keyword_fail(
                frame,
                child_loc,
                "format",
                format!("value does not match format: {format_name}"),
            );
            frame.fail(child);
        }
    }

    fn apply_content_encoding(&self, frame: &mut Frame<'_>, child_loc: &Location) {
        let Some(encoding_name) = frame.schema["contentEncoding"].as_str() else {
            return;
        };
        let Some(text) = frame.instance.as_str() else {
            return;
        };

        let decoded = if let Some(custom) = self.config.content_encodings.get(encoding_name) {
            Some(custom(text))
        } else {
            content::encoding(encoding_name).map(|decode| decode(text))
        };

        match decoded {
            // Unknown encodings annotate and pass
            None => {
                let annotated = self
                    .keyword_pass(frame, child_loc, "contentEncoding")
                    .with_annotation(json!(encoding_name));
                frame.children.push(annotated);
            }
            Some(Some(decoded)) => {
                let annotated = self
                    .keyword_pass(frame, child_loc, "contentEncoding")
                    .with_annotation(json!(decoded));
                frame.decoded_content = Some(decoded);
                frame.children.push(annotated);
            }
            Some(None) => {
                if frame.draft.content_asserts() {
                    let child = self.keyword_fail(
                        frame,
                        child_loc,
                        "contentEncoding",
                        format!("string is not valid {encoding_name}"),
                    );
                    frame.fail(child);
                } else {
                    frame
                        .children
                        .push(self.keyword_pass(frame, child_loc, "contentEncoding"));
                }
            }
        }
    }

    fn apply_content_media_type(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let Some(media_type) = frame.schema["contentMediaType"].as_str() else {
            return Ok(());
        };
        if !frame.instance.is_string() {
            return Ok(());
        }
        let text = frame
            .decoded_content
            .clone()
            .or_else(|| frame.instance.as_str().map(str::to_string));
        let Some(text) = text else {
            return Ok(());
        };

        let parsed = if let Some(custom) = self.config.content_media_types.get(media_type) {
            Some(custom(&text))
        } else {
            content::media_type(media_type).map(|decode| decode(&text))
        };

        match parsed {
            // Unknown media types annotate and pass
            None => {
                let annotated = self
                    .keyword_pass(frame, child_loc, "contentMediaType")
                    .with_annotation(json!(media_type));
                frame.children.push(annotated);
            }
            Some(Some(parsed)) => {
                let mut annotated = self
                    .keyword_pass(frame, child_loc, "contentMediaType")
                    .with_annotation(json!(media_type));
                // contentSchema describes the decoded document; it never
                // asserts, matching the content vocabulary from 2019-09 on
                if frame.schema.contains_key("contentSchema") && self.verbose {
                    let schema_loc = frame.keyword_loc.push("contentSchema");
                    let evaluation = self.eval(
                        frame.doc,
                        &format!("{}/contentSchema", frame.pointer),
                        &parsed,
                        frame.instance_loc,
                        &schema_loc,
                    )?;
                    annotated.push_child(evaluation.node);
                }
                frame.children.push(annotated);
            }
            Some(None) => {
                if frame.draft.content_asserts() {
                    let child = self.keyword_fail(
                        frame,
                        child_loc,
                        "contentMediaType",
                        format!("string is not valid {media_type}"),
                    );
                    frame.fail(child);
                } else {
                    frame
                        .children
                        .push(self.keyword_pass(frame, child_loc, "contentMediaType"));
                }
            }
        }
        Ok(())
    }

    fn subschemas_of(fragment: &Value) -> Vec<usize> {
        (0..fragment.as_array().map_or(0, Vec::len)).collect()
    }

    fn apply_all_of(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let mut parent = self.keyword_pass(frame, child_loc, "allOf");
        let mut all_valid = true;
        for index in Self::subschemas_of(&frame.schema["allOf"]) {
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/allOf/{index}", frame.pointer),
                frame.instance,
                frame.instance_loc,
                &child_loc.push_index(index),
            )?;
            if evaluation.node.valid {
                frame.coverage.merge(&evaluation.coverage);
            } else {
                all_valid = false;
            }
            parent.push_child(evaluation.node);
        }
        if all_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("value does not match all schemas in allOf".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_any_of(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let mut parent = self.keyword_pass(frame, child_loc, "anyOf");
        let mut any_valid = false;
        // Short-circuiting is only sound when nothing downstream needs the
        // skipped branches' annotations
        let exhaustive = self.verbose || frame.draft.supports_unevaluated();
        for index in Self::subschemas_of(&frame.schema["anyOf"]) {
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/anyOf/{index}", frame.pointer),
                frame.instance,
                frame.instance_loc,
                &child_loc.push_index(index),
            )?;
            let valid = evaluation.node.valid;
            if valid {
                any_valid = true;
                frame.coverage.merge(&evaluation.coverage);
            }
            parent.push_child(evaluation.node);
            if valid && !exhaustive {
                break;
            }
        }
        if any_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("value does not match any schema in anyOf".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_one_of(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let mut parent = self.keyword_pass(frame, child_loc, "oneOf");
        let mut matches = 0usize;
        let mut matched_coverage = Coverage::default();
        for index in Self::subschemas_of(&frame.schema["oneOf"]) {
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/oneOf/{index}", frame.pointer),
                frame.instance,
                frame.instance_loc,
                &child_loc.push_index(index),
            )?;
            if evaluation.node.valid {
                matches += 1;
                matched_coverage.merge(&evaluation.coverage);
            }
            parent.push_child(evaluation.node);
        }
        if matches == 1 {
            frame.coverage.merge(&matched_coverage);
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some(format!(
                "value matches {matches} schemas in oneOf, expected exactly one"
            ));
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_not(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let evaluation = self.eval(
            frame.doc,
            &format!("{}/not", frame.pointer),
            frame.instance,
            frame.instance_loc,
            child_loc,
        )?;
        if evaluation.node.valid {
            let mut child = self.keyword_fail(
                frame,
                child_loc,
                "not",
                "value must not match the schema in not",
            );
            if self.verbose {
                child.push_child(evaluation.node);
            }
            frame.fail(child);
        } else {
            let mut child = self.keyword_pass(frame, child_loc, "not");
            if self.verbose {
                child.push_child(evaluation.node);
            }
            frame.children.push(child);
        }
        Ok(())
    }

    fn apply_conditional(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let condition = self.eval(
            frame.doc,
            &format!("{}/if", frame.pointer),
            frame.instance,
            frame.instance_loc,
            child_loc,
        )?;
        let follow = if condition.node.valid {
            frame.coverage.merge(&condition.coverage);
            "then"
        } else {
            "else"
        };
        // The condition itself never asserts
        let mut if_node = self.keyword_pass(frame, child_loc, "if");
        if self.verbose {
            if_node.push_child(condition.node);
        }
        frame.children.push(if_node);

        if frame.schema.contains_key(follow) {
            let branch_loc = frame.keyword_loc.push(follow);
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/{follow}", frame.pointer),
                frame.instance,
                frame.instance_loc,
                &branch_loc,
            )?;
            if evaluation.node.valid {
                frame.coverage.merge(&evaluation.coverage);
                frame.children.push(evaluation.node);
            } else {
                frame.fail(evaluation.node);
            }
        }
        Ok(())
    }

    /// Draft-7-and-earlier `dependencies`: schema or required-property list
    fn apply_dependencies(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let (Some(object), Some(map)) = (
            frame.instance.as_object(),
            frame.schema["dependencies"].as_object(),
        ) else {
            return Ok(());
        };
        for (trigger, dependent) in map {
            if !object.contains_key(trigger) {
                continue;
            }
            match dependent {
                Value::Array(required) => {
                    let missing: Vec<&str> = required
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|property| !object.contains_key(*property))
                        .collect();
                    if !missing.is_empty() {
                        let child = self.keyword_fail(
                            frame,
                            child_loc,
                            "dependencies",
                            format!(
                                "object is missing properties required by '{trigger}': {}",
                                missing.join(", ")
                            ),
                        );
                        frame.fail(child);
                    }
                }
                _ => {
                    let evaluation = self.eval(
                        frame.doc,
                        &format!("{}/dependencies/{}", frame.pointer, escape_token(trigger)),
                        frame.instance,
                        frame.instance_loc,
                        &child_loc.push(trigger),
                    )?;
                    if evaluation.node.valid {
                        frame.coverage.merge(&evaluation.coverage);
                        frame.children.push(evaluation.node);
                    } else {
                        frame.fail(evaluation.node);
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_dependent_schemas(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let (Some(object), Some(map)) = (
            frame.instance.as_object(),
            frame.schema["dependentSchemas"].as_object(),
        ) else {
            return Ok(());
        };
        for trigger in map.keys() {
            if !object.contains_key(trigger) {
                continue;
            }
            let evaluation = self.eval(
                frame.doc,
                &format!(
                    "{}/dependentSchemas/{}",
                    frame.pointer,
                    escape_token(trigger)
                ),
                frame.instance,
                frame.instance_loc,
                &child_loc.push(trigger),
            )?;
            if evaluation.node.valid {
                frame.coverage.merge(&evaluation.coverage);
                frame.children.push(evaluation.node);
            } else {
                frame.fail(evaluation.node);
            }
        }
        Ok(())
    }

    fn apply_properties(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let Some(map) = frame.schema["properties"].as_object() else {
            return Ok(());
        };
        let Some(object) = frame.instance.as_object() else {
            return Ok(());
        };

        if self.config.insert_property_defaults {
            self.collect_defaults(frame, object, map);
        }

        let mut parent = self.keyword_pass(frame, child_loc, "properties");
        let mut all_valid = true;
        let mut evaluated: Vec<String> = Vec::new();
        for (property, _) in map {
            let Some(value) = object.get(property) else {
                continue;
            };
            frame.addressed.insert(property.clone());
            if !self.run_property_hooks(frame, object, property, &self.config.before_property_validation) {
                all_valid = false;
                parent.push_child(self.keyword_fail(
                    frame,
                    &child_loc.push(property),
                    "properties",
                    format!("property '{property}' rejected by validation hook"),
                ));
                continue;
            }

            let evaluation = self.eval(
                frame.doc,
                &format!("{}/properties/{}", frame.pointer, escape_token(property)),
                value,
                &frame.instance_loc.push(property),
                &child_loc.push(property),
            )?;
            let valid = evaluation.node.valid;
            if valid {
                frame.coverage.properties.insert(property.clone());
                evaluated.push(property.clone());
            } else {
                all_valid = false;
            }
            parent.push_child(evaluation.node);

            if !self.run_property_hooks(frame, object, property, &self.config.after_property_validation) {
                all_valid = false;
                parent.push_child(self.keyword_fail(
                    frame,
                    &child_loc.push(property),
                    "properties",
                    format!("property '{property}' rejected by validation hook"),
                ));
            }
        }

        if all_valid {
            parent.annotation = Some(json!(evaluated));
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("object properties do not conform".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn run_property_hooks(
        &self,
        frame: &Frame<'_>,
        object: &Map<String, Value>,
        property: &str,
        hooks: &[jschema_core::config::PropertyHook],
    ) -> bool {
        let schema_fragment = frame.schema["properties"]
            .get(property)
            .cloned()
            .unwrap_or(Value::Null);
        hooks
            .iter()
            .all(|hook| hook(object, property, &schema_fragment, &frame.instance_pointer()))
    }

    fn collect_defaults(
        &mut self,
        frame: &Frame<'_>,
        object: &Map<String, Value>,
        map: &Map<String, Value>,
    ) {
        for (property, property_schema) in map {
            if object.contains_key(property) {
                continue;
            }
            let default = match &self.config.property_default_resolver {
                Some(resolver) => resolver(object, property, property_schema),
                None => property_schema.get("default").cloned(),
            };
            if let Some(value) = default {
                self.pending_defaults.push(PendingDefault {
                    instance_pointer: frame.instance_pointer(),
                    property: property.clone(),
                    value,
                });
            }
        }
    }

    fn apply_pattern_properties(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let Some(map) = frame.schema["patternProperties"].as_object() else {
            return Ok(());
        };
        let Some(object) = frame.instance.as_object() else {
            return Ok(());
        };
        let mut parent = self.keyword_pass(frame, child_loc, "patternProperties");
        let mut all_valid = true;
        for (source, _) in map {
            for (property, value) in object {
                if !pattern::is_match(source, self.config.regex_dialect, property)? {
                    continue;
                }
                frame.addressed.insert(property.clone());
                let evaluation = self.eval(
                    frame.doc,
                    &format!(
                        "{}/patternProperties/{}",
                        frame.pointer,
                        escape_token(source)
                    ),
                    value,
                    &frame.instance_loc.push(property),
                    &child_loc.push(source).push(property),
                )?;
                if evaluation.node.valid {
                    frame.coverage.properties.insert(property.clone());
                } else {
                    all_valid = false;
                }
                parent.push_child(evaluation.node);
            }
        }
        if all_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("object pattern properties do not conform".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_additional_properties(
        &mut self,
        frame: &mut Frame<'_>,
        child_loc: &Location,
    ) -> Result<()> {
        let Some(object) = frame.instance.as_object() else {
            return Ok(());
        };
        let mut parent = self.keyword_pass(frame, child_loc, "additionalProperties");
        let mut all_valid = true;
        for (property, value) in object {
            if frame.addressed.contains(property) {
                continue;
            }
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/additionalProperties", frame.pointer),
                value,
                &frame.instance_loc.push(property),
                &child_loc.push(property),
            )?;
            if evaluation.node.valid {
                frame.coverage.properties.insert(property.clone());
            } else {
                all_valid = false;
            }
            parent.push_child(evaluation.node);
        }
        if all_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("additional object properties do not conform".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_property_names(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let Some(object) = frame.instance.as_object() else {
            return Ok(());
        };
        let mut parent = self.keyword_pass(frame, child_loc, "propertyNames");
        let mut all_valid = true;
        for property in object.keys() {
            let name_value = Value::String(property.clone());
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/propertyNames", frame.pointer),
                &name_value,
                frame.instance_loc,
                &child_loc.push(property),
            )?;
            if !evaluation.node.valid {
                all_valid = false;
            }
            parent.push_child(evaluation.node);
        }
        if all_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("object property names do not conform".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_prefix_items(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let (Some(items), Some(schemas)) = (
            frame.instance.as_array(),
            frame.schema["prefixItems"].as_array(),
        ) else {
            return Ok(());
        };
        let mut parent = self.keyword_pass(frame, child_loc, "prefixItems");
        let mut all_valid = true;
        for index in 0..schemas.len().min(items.len()) {
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/prefixItems/{index}", frame.pointer),
                &items[index],
                &frame.instance_loc.push_index(index),
                &child_loc.push_index(index),
            )?;
            if evaluation.node.valid {
                frame.coverage.items.insert(index);
            } else {
                all_valid = false;
            }
            parent.push_child(evaluation.node);
        }
        if all_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("array prefix items do not conform".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_items(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let Some(items) = frame.instance.as_array() else {
            return Ok(());
        };
        let fragment = &frame.schema["items"];

        // Pre-2020 tuple form
        if let Value::Array(schemas) = fragment {
            let mut parent = self.keyword_pass(frame, child_loc, "items");
            let mut all_valid = true;
            for index in 0..schemas.len().min(items.len()) {
                let evaluation = self.eval(
                    frame.doc,
                    &format!("{}/items/{index}", frame.pointer),
                    &items[index],
                    &frame.instance_loc.push_index(index),
                    &child_loc.push_index(index),
                )?;
                if evaluation.node.valid {
                    frame.coverage.items.insert(index);
                } else {
                    all_valid = false;
                }
                parent.push_child(evaluation.node);
            }
            if all_valid {
                frame.children.push(parent);
            } else {
                parent.valid = false;
                parent.error = Some("array items do not conform".to_string());
                frame.fail(parent);
            }
            return Ok(());
        }

        // Uniform form; from 2020-12 it starts after the prefixItems window
        let start = if frame.draft >= Draft::Draft202012 {
            frame
                .schema
                .get("prefixItems")
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
        } else {
            0
        };
        let mut parent = self.keyword_pass(frame, child_loc, "items");
        let mut all_valid = true;
        for index in start..items.len() {
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/items", frame.pointer),
                &items[index],
                &frame.instance_loc.push_index(index),
                &child_loc.push_index(index),
            )?;
            if evaluation.node.valid {
                frame.coverage.items.insert(index);
            } else {
                all_valid = false;
            }
            parent.push_child(evaluation.node);
        }
        if all_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("array items do not conform".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_additional_items(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let Some(items) = frame.instance.as_array() else {
            return Ok(());
        };
        // additionalItems only applies after a tuple-form items
        let Some(Value::Array(schemas)) = frame.schema.get("items") else {
            return Ok(());
        };
        let mut parent = self.keyword_pass(frame, child_loc, "additionalItems");
        let mut all_valid = true;
        for index in schemas.len()..items.len() {
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/additionalItems", frame.pointer),
                &items[index],
                &frame.instance_loc.push_index(index),
                &child_loc.push_index(index),
            )?;
            if evaluation.node.valid {
                frame.coverage.items.insert(index);
            } else {
                all_valid = false;
            }
            parent.push_child(evaluation.node);
        }
        if all_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("additional array items do not conform".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_contains(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let Some(items) = frame.instance.as_array() else {
            return Ok(());
        };
        let min = if frame.draft.supports_unevaluated() {
            frame
                .schema
                .get("minContains")
                .and_then(Value::as_u64)
                .unwrap_or(1)
        } else {
            1
        };
        let max = if frame.draft.supports_unevaluated() {
            frame.schema.get("maxContains").and_then(Value::as_u64)
        } else {
            None
        };

        let mut parent = self.keyword_pass(frame, child_loc, "contains");
        let mut matched: Vec<usize> = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/contains", frame.pointer),
                item,
                &frame.instance_loc.push_index(index),
                &child_loc.push_index(index),
            )?;
            if evaluation.node.valid {
                matched.push(index);
            }
            if self.verbose {
                parent.push_child(evaluation.node);
            }
        }

        let count = matched.len() as u64;
        let ok = count >= min && max.map_or(true, |max| count <= max);
        if ok {
            for index in matched {
                frame.coverage.items.insert(index);
            }
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some(if count < min {
                format!("array contains {count} matching items, expected at least {min}")
            } else {
                format!(
                    "array contains {count} matching items, expected at most {}",
                    max.unwrap_or(count)
                )
            });
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_unevaluated_properties(
        &mut self,
        frame: &mut Frame<'_>,
        child_loc: &Location,
    ) -> Result<()> {
        let Some(object) = frame.instance.as_object() else {
            return Ok(());
        };
        let mut parent = self.keyword_pass(frame, child_loc, "unevaluatedProperties");
        let mut all_valid = true;
        for (property, value) in object {
            if frame.coverage.properties.contains(property) {
                continue;
            }
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/unevaluatedProperties", frame.pointer),
                value,
                &frame.instance_loc.push(property),
                &child_loc.push(property),
            )?;
            if evaluation.node.valid {
                frame.coverage.properties.insert(property.clone());
            } else {
                all_valid = false;
            }
            parent.push_child(evaluation.node);
        }
        if all_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("unevaluated object properties do not conform".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_unevaluated_items(&mut self, frame: &mut Frame<'_>, child_loc: &Location) -> Result<()> {
        let Some(items) = frame.instance.as_array() else {
            return Ok(());
        };
        let mut parent = self.keyword_pass(frame, child_loc, "unevaluatedItems");
        let mut all_valid = true;
        for (index, item) in items.iter().enumerate() {
            if frame.coverage.items.contains(&index) {
                continue;
            }
            let evaluation = self.eval(
                frame.doc,
                &format!("{}/unevaluatedItems", frame.pointer),
                item,
                &frame.instance_loc.push_index(index),
                &child_loc.push_index(index),
            )?;
            if evaluation.node.valid {
                frame.coverage.items.insert(index);
            } else {
                all_valid = false;
            }
            parent.push_child(evaluation.node);
        }
        if all_valid {
            frame.children.push(parent);
        } else {
            parent.valid = false;
            parent.error = Some("unevaluated array items do not conform".to_string());
            frame.fail(parent);
        }
        Ok(())
    }

    fn apply_ref(&mut self, frame: &mut Frame<'_>, keyword: &str) -> Result<()> {
        let Some(raw) = frame.schema[keyword].as_str() else {
            return Err(SchemaError::invalid_schema_at(
                format!("{keyword} must be a string"),
                frame.pointer,
            ));
        };
        let (target_doc, target_pointer) =
            self.compiled.resolver.resolve_target(frame.base, raw)?;
        self.follow_reference(frame, keyword, &target_doc, &target_pointer)
    }

    fn apply_recursive_ref(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let Some(raw) = frame.schema["$recursiveRef"].as_str() else {
            return Err(SchemaError::invalid_schema_at(
                "$recursiveRef must be a string",
                frame.pointer,
            ));
        };
        let (mut target_doc, mut target_pointer) =
            self.compiled.resolver.resolve_target(frame.base, raw)?;

        // When the static landing spot is a recursive root, the outermost
        // resource in the dynamic scope that also declares one wins
        let landing_base = target_doc
            .info_for(&target_pointer)
            .map(|info| info.base.as_str().to_string());
        let is_recursive_root = landing_base.as_ref().is_some_and(|base| {
            target_doc.recursive_roots.get(base) == Some(&target_pointer)
        });
        if is_recursive_root {
            for entry in &self.scope {
                if let Some(pointer) = entry.doc.recursive_roots.get(&entry.base) {
                    target_pointer = pointer.clone();
                    target_doc = Arc::clone(&entry.doc);
                    break;
                }
            }
        }

        let target_doc = target_doc;
        self.follow_reference(frame, "$recursiveRef", &target_doc, &target_pointer)
    }

    fn apply_dynamic_ref(&mut self, frame: &mut Frame<'_>) -> Result<()> {
        let Some(raw) = frame.schema["$dynamicRef"].as_str() else {
            return Err(SchemaError::invalid_schema_at(
                "$dynamicRef must be a string",
                frame.pointer,
            ));
        };
        let (mut target_doc, mut target_pointer) =
            self.compiled.resolver.resolve_target(frame.base, raw)?;

        // Dynamic behavior requires the fragment to be a dynamic anchor at
        // the static landing spot; otherwise it degrades to a plain $ref
        if let Some((_, anchor)) = raw.split_once('#') {
            let landing_base = target_doc
                .info_for(&target_pointer)
                .map(|info| info.base.as_str().to_string());
            let is_dynamic = landing_base.as_ref().is_some_and(|base| {
                target_doc.dynamic_anchor_pointer(base, anchor) == Some(target_pointer.as_str())
            });
            if is_dynamic {
                for entry in &self.scope {
                    if let Some(pointer) = entry.doc.dynamic_anchor_pointer(&entry.base, anchor) {
                        target_pointer = pointer.to_string();
                        target_doc = Arc::clone(&entry.doc);
                        break;
                    }
                }
            }
        }

        let target_doc = target_doc;
        self.follow_reference(frame, "$dynamicRef", &target_doc, &target_pointer)
    }

    fn follow_reference(
        &mut self,
        frame: &mut Frame<'_>,
        keyword: &str,
        target_doc: &Arc<SchemaDocument>,
        target_pointer: &str,
    ) -> Result<()> {
        let trail_key = (
            format!("{}#{target_pointer}", target_doc.uri),
            frame.instance_pointer(),
        );
        if self.ref_trail.contains(&trail_key) {
            return Err(SchemaError::invalid_schema_at(
                format!("infinite reference loop through '{}'", trail_key.0),
                frame.pointer,
            ));
        }
        self.ref_trail.push(trail_key);

        let child_loc = frame.keyword_loc.push(keyword);
        let result = self.eval(
            target_doc,
            target_pointer,
            frame.instance,
            frame.instance_loc,
            &child_loc,
        );
        self.ref_trail.pop();
        let evaluation = result?;

        let mut child = evaluation.node;
        child.keyword = Some(keyword.to_string());
        if child.valid {
            frame.coverage.merge(&evaluation.coverage);
            frame.children.push(child);
        } else {
            frame.fail(child);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run(schema: Value, instance: Value) -> ResultNode {
        let compiled = compile(schema, Configuration::default()).expect("compiles");
        evaluate(&compiled, &instance, false).expect("evaluates").node
    }

    #[test]
    fn test_scalar_assertions() {
        assert!(run(json!({"type": "string"}), json!("x")).valid);
        assert!(!run(json!({"type": "string"}), json!(3)).valid);
        assert!(run(json!({"minimum": 2}), json!(2)).valid);
        assert!(!run(json!({"exclusiveMinimum": 2}), json!(2)).valid);
        assert!(run(json!({"enum": [1, "two"]}), json!(1.0)).valid);
        assert!(!run(json!({"const": {"a": 1}}), json!({"a": 2})).valid);
    }

    #[test]
    fn test_object_applicators() {
        let schema = json!({
            "properties": {"a": {"type": "integer"}},
            "patternProperties": {"^x": {"type": "string"}},
            "additionalProperties": false
        });
        assert!(run(schema.clone(), json!({"a": 1, "x1": "ok"})).valid);
        assert!(!run(schema.clone(), json!({"a": 1, "other": 2})).valid);
        assert!(!run(schema, json!({"x1": 5})).valid);
    }

    #[test]
    fn test_array_applicators_across_drafts() {
        let tuple = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "items": [{"type": "integer"}, {"type": "string"}],
            "additionalItems": {"type": "boolean"}
        });
        assert!(run(tuple.clone(), json!([1, "a", true, false])).valid);
        assert!(!run(tuple, json!([1, "a", "not-bool"])).valid);

        let modern = json!({
            "prefixItems": [{"type": "integer"}],
            "items": {"type": "string"}
        });
        assert!(run(modern.clone(), json!([1, "a", "b"])).valid);
        assert!(!run(modern, json!([1, 2])).valid);
    }

    #[test]
    fn test_conditional_and_combinators() {
        let schema = json!({
            "if": {"properties": {"kind": {"const": "num"}}},
            "then": {"properties": {"value": {"type": "number"}}},
            "else": {"properties": {"value": {"type": "string"}}}
        });
        assert!(run(schema.clone(), json!({"kind": "num", "value": 3})).valid);
        assert!(!run(schema.clone(), json!({"kind": "num", "value": "x"})).valid);
        assert!(run(schema, json!({"kind": "str", "value": "x"})).valid);

        let one = json!({"oneOf": [{"type": "integer"}, {"minimum": 10}]});
        assert!(run(one.clone(), json!(5)).valid);
        assert!(!run(one, json!(12)).valid);
    }

    #[test]
    fn test_ref_and_unevaluated_interaction() {
        let schema = json!({
            "$defs": {"base": {"properties": {"a": {"type": "integer"}}}},
            "$ref": "#/$defs/base",
            "properties": {"b": {"type": "string"}},
            "unevaluatedProperties": false
        });
        assert!(run(schema.clone(), json!({"a": 1, "b": "x"})).valid);
        assert!(!run(schema, json!({"a": 1, "c": true})).valid);
    }

    #[test]
    fn test_draft4_exclusive_modifier() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "maximum": 10,
            "exclusiveMaximum": true
        });
        assert!(run(schema.clone(), json!(9)).valid);
        assert!(!run(schema, json!(10)).valid);
    }

    #[test]
    fn test_draft7_ref_suppresses_siblings() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "definitions": {"any": true},
            "properties": {"a": {
                "$ref": "#/definitions/any",
                "type": "string"
            }}
        });
        // The sibling type constraint is ignored in draft 7
        assert!(run(schema, json!({"a": 42})).valid);
    }

    #[test]
    fn test_contains_bounds() {
        let schema = json!({"contains": {"type": "integer"}, "minContains": 2, "maxContains": 3});
        assert!(!run(schema.clone(), json!([1, "a"])).valid);
        assert!(run(schema.clone(), json!([1, 2, "a"])).valid);
        assert!(!run(schema, json!([1, 2, 3, 4])).valid);
    }

    #[test]
    fn test_min_contains_zero_accepts_empty() {
        let schema = json!({"contains": {"type": "integer"}, "minContains": 0});
        assert!(run(schema, json!(["a", "b"])).valid);
    }

    #[test]
    fn test_recursive_ref_prefers_outermost_anchor() {
        let outer_value: Value = json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$recursiveAnchor": true,
            "type": "object",
            "properties": {
                "data": {"type": "string"},
                "children": {"items": {"$ref": "https://example.com/tree"}}
            }
        });
        let tree: Value = json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://example.com/tree",
            "$recursiveAnchor": true,
            "type": "object",
            "properties": {
                "children": {"items": {"$recursiveRef": "#"}}
            }
        });
        let external: jschema_core::config::RefResolver = Arc::new(move |uri| {
            (uri.as_str() == "https://example.com/tree").then(|| tree.clone())
        });
        let config = Configuration::default()
            .with_meta_schema("https://json-schema.org/draft/2019-09/schema")
            .with_ref_resolver(external);
        let compiled = compile(outer_value, config).expect("compiles");

        // The nested node re-enters the outer schema, so its `data` property
        // must be a string even though only the tree schema mentioned it
        let ok = json!({"data": "x", "children": [{"children": [{"data": "y"}]}]});
        assert!(evaluate(&compiled, &ok, false).expect("runs").node.valid);
        let bad = json!({"data": "x", "children": [{"children": [{"data": 42}]}]});
        assert!(!evaluate(&compiled, &bad, false).expect("runs").node.valid);
    }

    #[test]
    fn test_dynamic_ref_resolves_in_dynamic_scope() {
        let schema = json!({
            "$id": "https://example.com/strict-tree",
            "$dynamicAnchor": "node",
            "$ref": "https://example.com/tree",
            "unevaluatedProperties": false
        });
        let tree: Value = json!({
            "$id": "https://example.com/tree",
            "$dynamicAnchor": "node",
            "type": "object",
            "properties": {
                "children": {"items": {"$dynamicRef": "#node"}}
            }
        });
        let external: jschema_core::config::RefResolver = Arc::new(move |uri| {
            (uri.as_str() == "https://example.com/tree").then(|| tree.clone())
        });
        let config = Configuration::default().with_ref_resolver(external);
        let compiled = compile(schema, config).expect("compiles");

        // The dynamic anchor bubbles to the strict tree, so extra properties
        // anywhere in the nested structure are rejected
        let bad = json!({"children": [{"children": [], "extra": 1}]});
        assert!(!evaluate(&compiled, &bad, false).expect("runs").node.valid);
        let ok = json!({"children": [{"children": []}]});
        assert!(evaluate(&compiled, &ok, false).expect("runs").node.valid);
    }

    #[test]
    fn test_infinite_ref_loop_detected() {
        let schema = json!({"$defs": {"a": {"$ref": "#/$defs/a"}}, "$ref": "#/$defs/a"});
        let compiled = compile(schema, Configuration::default()).expect("compiles");
        let err = evaluate(&compiled, &json!(1), false).expect_err("must fail");
        assert!(matches!(err, SchemaError::InvalidSchema { .. }));
    }

    #[test]
    fn test_default_insertion_two_pass() {
        let schema = json!({
            "properties": {
                "mode": {"type": "string", "default": "auto"},
                "count": {"type": "integer"}
            },
            "required": ["mode"]
        });
        let config = Configuration::default().with_insert_property_defaults(true);
        let compiled = compile(schema, config).expect("compiles");

        let outcome = evaluate(&compiled, &json!({"count": 2}), false).expect("runs");
        assert!(outcome.node.valid);
        let defaulted = outcome.defaulted_instance.expect("defaults applied");
        assert_eq!(defaulted, json!({"count": 2, "mode": "auto"}));
    }

    #[test]
    fn test_custom_keyword_shadows_standard() {
        let even: jschema_core::config::KeywordValidator = Arc::new(|instance, _fragment, _loc| {
            instance.as_u64().is_some_and(|n| n % 2 == 0)
        });
        let config = Configuration::default().with_keyword("multipleOf", even);
        let compiled = compile(json!({"multipleOf": 3}), config).expect("compiles");
        // The custom predicate (evenness) wins over the standard keyword
        assert!(evaluate(&compiled, &json!(4), false).expect("runs").node.valid);
        assert!(!evaluate(&compiled, &json!(9), false).expect("runs").node.valid);
    }

    #[test]
    fn test_access_mode_gates_read_only() {
        let schema = json!({"properties": {"id": {"readOnly": true}}});
        let config = Configuration::default().with_access_mode(AccessMode::Write);
        let compiled = compile(schema, config).expect("compiles");
        assert!(!evaluate(&compiled, &json!({"id": 7}), false).expect("runs").node.valid);

        let schema = json!({"properties": {"id": {"readOnly": true}}});
        let compiled = compile(schema, Configuration::default()).expect("compiles");
        assert!(evaluate(&compiled, &json!({"id": 7}), false).expect("runs").node.valid);
    }

    #[test]
    fn test_content_keywords_assert_in_draft7_only() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "contentEncoding": "base64"
        });
        assert!(run(schema.clone(), json!("aGVsbG8=")).valid);
        assert!(!run(schema, json!("not base64!")).valid);

        let modern = json!({"contentEncoding": "base64"});
        assert!(run(modern, json!("not base64!")).valid);
    }
}
