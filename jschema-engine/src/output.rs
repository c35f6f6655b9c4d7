//! Output projections of a completed result tree
//!
//! Each shape is a pure function of one `ResultNode` tree. `flag` keeps only
//! overall validity, `basic` flattens failing units, `detailed` prunes the
//! tree to failing branches, `verbose` keeps everything including the
//! annotations of passing branches, and `classic` renders the flat list of
//! caller-legible messages that predates the standardized shapes.

use jschema_core::report::{ClassicError, OutputFormat, OutputUnit, ResultNode};
use serde_json::{json, Value};

/// Project a result tree into the requested output shape
#[must_use]
pub fn render(node: &ResultNode, format: OutputFormat) -> Value {
    match format {
        OutputFormat::Flag => json!({"valid": node.valid}),
        OutputFormat::Classic => {
            json!(classic_errors(node))
        }
        OutputFormat::Basic => {
            let mut errors = Vec::new();
            collect_basic(node, &mut errors);
            if node.valid {
                json!({"valid": true})
            } else {
                json!({"valid": false, "errors": errors})
            }
        }
        OutputFormat::Detailed => serde_json::to_value(detailed_unit(node))
            .unwrap_or_else(|_| json!({"valid": node.valid})),
        OutputFormat::Verbose => serde_json::to_value(verbose_unit(node))
            .unwrap_or_else(|_| json!({"valid": node.valid})),
    }
}

/// The flat legacy error list
#[must_use]
pub fn classic_errors(node: &ResultNode) -> Vec<ClassicError> {
    node.failures()
        .into_iter()
        .map(|failure| ClassicError {
            error: failure.error.clone().unwrap_or_default(),
            keyword: failure.keyword.clone().unwrap_or_else(|| "schema".to_string()),
            schema_pointer: failure.keyword_location.clone(),
            instance_pointer: failure.instance_location.clone(),
        })
        .collect()
}

fn unit_of(node: &ResultNode) -> OutputUnit {
    let mut unit = OutputUnit::new(
        node.valid,
        node.keyword_location.clone(),
        node.instance_location.clone(),
    );
    unit.absolute_keyword_location = node.absolute_keyword_location.clone();
    unit.error = node.error.clone();
    unit.annotation = node.annotation.clone();
    unit
}

/// Flatten every failing node carrying a message into standalone units
fn collect_basic(node: &ResultNode, out: &mut Vec<OutputUnit>) {
    if !node.valid && node.error.is_some() {
        out.push(unit_of(node));
    }
    for child in &node.children {
        collect_basic(child, out);
    }
}

/// The failing subtree, with passing branches removed
fn detailed_unit(node: &ResultNode) -> OutputUnit {
    let mut unit = unit_of(node);
    unit.annotation = None;
    unit.errors = node
        .children
        .iter()
        .filter(|child| !child.valid)
        .map(detailed_unit)
        .collect();
    unit
}

/// The whole tree, passing branches and annotations included
fn verbose_unit(node: &ResultNode) -> OutputUnit {
    let mut unit = unit_of(node);
    for child in &node.children {
        if child.valid {
            unit.annotations.push(verbose_unit(child));
        } else {
            unit.errors.push(verbose_unit(child));
        }
    }
    unit
}
