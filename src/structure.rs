//! Structural Validation - Shape Before Semantics
//!
//! Manifest-agnostic. Every violation in the document is collected; the
//! quality gates only ever see a spec that passed here.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::spec::{PageMeta, PageSpec, PropValue, SpecNode};

#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Check the raw document shape without building anything.
pub fn validate_structure(raw: &Value) -> Result<(), Vec<SchemaViolation>> {
    parse_page_spec(raw).map(|_| ())
}

/// Check the raw document shape and build the `PageSpec` in the same pass.
pub fn parse_page_spec(raw: &Value) -> Result<PageSpec, Vec<SchemaViolation>> {
    let mut violations = vec![];

    let Some(root) = raw.as_object() else {
        return Err(vec![SchemaViolation::new("$", "spec must be a JSON object")]);
    };

    let page = match root.get("page") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => {
            violations.push(SchemaViolation::new("page", "must not be empty"));
            String::new()
        }
        Some(_) => {
            violations.push(SchemaViolation::new("page", "must be a string"));
            String::new()
        }
        None => {
            violations.push(SchemaViolation::new("page", "required field is missing"));
            String::new()
        }
    };

    let route = match root.get("route") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            violations.push(SchemaViolation::new("route", "must be a string"));
            String::new()
        }
        None => {
            violations.push(SchemaViolation::new("route", "required field is missing"));
            String::new()
        }
    };

    let meta = root
        .get("meta")
        .and_then(|value| parse_meta(value, &mut violations));

    let sections = match aliased(root, "sections", "children", "$", &mut violations) {
        Some((key, Value::Array(items))) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| parse_node(item, &format!("{}[{}]", key, i), &mut violations))
            .collect(),
        Some((key, _)) => {
            violations.push(SchemaViolation::new(key, "must be an array of nodes"));
            vec![]
        }
        None => {
            violations.push(SchemaViolation::new("sections", "required field is missing"));
            vec![]
        }
    };

    if violations.is_empty() {
        Ok(PageSpec {
            page,
            route,
            meta,
            sections,
        })
    } else {
        Err(violations)
    }
}

fn parse_meta(value: &Value, violations: &mut Vec<SchemaViolation>) -> Option<PageMeta> {
    let Some(map) = value.as_object() else {
        violations.push(SchemaViolation::new("meta", "must be an object"));
        return None;
    };
    Some(PageMeta {
        title: optional_string(map, "title", "meta", violations),
        description: optional_string(map, "description", "meta", violations),
    })
}

fn parse_node(value: &Value, path: &str, violations: &mut Vec<SchemaViolation>) -> Option<SpecNode> {
    let Some(map) = value.as_object() else {
        violations.push(SchemaViolation::new(path, "node must be an object"));
        return None;
    };

    let component_type = match map.get("type") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(_) => {
            violations.push(SchemaViolation::new(
                format!("{}.type", path),
                "must be a non-empty string",
            ));
            String::new()
        }
        None => {
            violations.push(SchemaViolation::new(
                format!("{}.type", path),
                "required field is missing",
            ));
            String::new()
        }
    };

    let mut node = SpecNode::new(component_type);

    match aliased(map, "props", "inputs", path, violations) {
        Some((key, Value::Object(props))) => {
            let props_path = format!("{}.{}", path, key);
            node.attributes = parse_props(props, &props_path, violations);
        }
        Some((key, _)) => {
            violations.push(SchemaViolation::new(format!("{}.{}", path, key), "must be an object"));
        }
        None => {}
    }

    match aliased(map, "events", "outputs", path, violations) {
        Some((key, Value::Object(events))) => {
            let mut handlers = IndexMap::new();
            for (name, handler) in events {
                match handler.as_str() {
                    Some(h) => {
                        handlers.insert(name.clone(), h.to_string());
                    }
                    None => violations.push(SchemaViolation::new(
                        format!("{}.{}.{}", path, key, name),
                        "event handler must be a string",
                    )),
                }
            }
            node.events = handlers;
        }
        Some((key, _)) => {
            violations.push(SchemaViolation::new(format!("{}.{}", path, key), "must be an object"));
        }
        None => {}
    }

    match map.get("children") {
        Some(Value::Array(items)) => {
            node.children = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    parse_node(item, &format!("{}.children[{}]", path, i), violations)
                })
                .collect();
        }
        Some(_) => violations.push(SchemaViolation::new(
            format!("{}.children", path),
            "must be an array of nodes",
        )),
        None => {}
    }

    node.text = optional_string(map, "text", path, violations);
    node.id = optional_string(map, "id", path, violations);

    Some(node)
}

fn parse_props(
    props: &Map<String, Value>,
    path: &str,
    violations: &mut Vec<SchemaViolation>,
) -> IndexMap<String, PropValue> {
    let mut attributes = IndexMap::new();
    for (name, raw) in props {
        let value = PropValue::from_json(name, raw);
        if let (PropValue::DataSource(_), Value::Object(descriptor)) = (&value, raw) {
            check_data_source_shape(descriptor, &format!("{}.{}", path, name), violations);
        }
        attributes.insert(name.clone(), value);
    }
    attributes
}

/// Field types only. Whether `kind` is known or `query` is present is a
/// quality-gate concern.
fn check_data_source_shape(
    descriptor: &Map<String, Value>,
    path: &str,
    violations: &mut Vec<SchemaViolation>,
) {
    for field in ["kind", "query", "transform"] {
        if let Some(value) = descriptor.get(field) {
            if !value.is_string() {
                violations.push(SchemaViolation::new(
                    format!("{}.{}", path, field),
                    "must be a string",
                ));
            }
        }
    }
    if let Some(variables) = descriptor.get("variables") {
        if !variables.is_object() {
            violations.push(SchemaViolation::new(
                format!("{}.variables", path),
                "must be an object",
            ));
        }
    }
}

/// Resolve a field that has a historical alias. Declaring both is ambiguous.
fn aliased<'a>(
    map: &'a Map<String, Value>,
    primary: &'static str,
    alias: &'static str,
    path: &str,
    violations: &mut Vec<SchemaViolation>,
) -> Option<(&'static str, &'a Value)> {
    match (map.get(primary), map.get(alias)) {
        (Some(_), Some(_)) if alias == "children" => map.get(primary).map(|v| (primary, v)),
        (Some(_), Some(_)) => {
            violations.push(SchemaViolation::new(
                path,
                format!("declares both `{}` and `{}`; use one", primary, alias),
            ));
            None
        }
        (Some(v), None) => Some((primary, v)),
        (None, Some(v)) => Some((alias, v)),
        (None, None) => None,
    }
}

fn optional_string(
    map: &Map<String, Value>,
    key: &str,
    path: &str,
    violations: &mut Vec<SchemaViolation>,
) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            violations.push(SchemaViolation::new(format!("{}.{}", path, key), "must be a string"));
            None
        }
        None => None,
    }
}
