//! Page Spec Model - The IR
//!
//! Built once per generation request by `structure::parse_page_spec`,
//! immutable for the rest of the pipeline.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Opening and closing delimiters of an embedded expression.
pub const EXPRESSION_OPEN: &str = "{{";
pub const EXPRESSION_CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSpec {
    pub page: String,
    pub route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    pub sections: Vec<SpecNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PageSpec {
    pub fn new(page: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            route: route.into(),
            meta: None,
            sections: vec![],
        }
    }

    pub fn with_section(mut self, node: SpecNode) -> Self {
        self.sections.push(node);
        self
    }

    /// Pre-order walk over every node, with a dotted location such as
    /// `sections[0].children[2]`.
    pub fn visit_nodes<'a, F>(&'a self, visitor: &mut F)
    where
        F: FnMut(&'a SpecNode, &str),
    {
        for (i, node) in self.sections.iter().enumerate() {
            visit(node, &format!("sections[{}]", i), visitor);
        }
    }

    /// Distinct component types in first-encountered order.
    pub fn component_types(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = vec![];
        self.visit_nodes(&mut |node, _| {
            if !seen.contains(&node.component_type.as_str()) {
                seen.push(&node.component_type);
            }
        });
        seen
    }
}

fn visit<'a, F>(node: &'a SpecNode, path: &str, visitor: &mut F)
where
    F: FnMut(&'a SpecNode, &str),
{
    visitor(node, path);
    for (i, child) in node.children.iter().enumerate() {
        visit(child, &format!("{}.children[{}]", path, i), visitor);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecNode {
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(rename = "props", skip_serializing_if = "IndexMap::is_empty")]
    pub attributes: IndexMap<String, PropValue>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub events: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SpecNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SpecNode {
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            attributes: IndexMap::new(),
            events: IndexMap::new(),
            children: vec![],
            text: None,
            id: None,
        }
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: PropValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_event(mut self, name: impl Into<String>, handler: impl Into<String>) -> Self {
        self.events.insert(name.into(), handler.into());
        self
    }

    pub fn with_child(mut self, child: SpecNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn prop(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    /// Text content, ignoring the empty string.
    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// False when the node renders as a self-closing element.
    pub fn has_content(&self) -> bool {
        !self.children.is_empty() || self.text_content().is_some()
    }
}

/// A prop value. Closed set; every renderer matches it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    String(String),
    /// Inner text of a `{{ ... }}` value, bound unescaped.
    Expression(String),
    Number(Number),
    Boolean(bool),
    DataSource(DataSourceDescriptor),
    Json(Value),
}

impl PropValue {
    /// Classify a raw JSON prop value. Objects become data sources when they
    /// carry a `kind` key or sit under a prop named `dataSource`.
    pub fn from_json(prop_name: &str, value: &Value) -> Self {
        match value {
            Value::String(s) => match expression_inner(s) {
                Some(inner) => PropValue::Expression(inner.to_string()),
                None => PropValue::String(s.clone()),
            },
            Value::Number(n) => PropValue::Number(n.clone()),
            Value::Bool(b) => PropValue::Boolean(*b),
            Value::Object(map) if map.contains_key("kind") || prop_name == "dataSource" => {
                PropValue::DataSource(DataSourceDescriptor::from_map(map))
            }
            other => PropValue::Json(other.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropValue::String(s) => Value::String(s.clone()),
            PropValue::Expression(inner) => {
                Value::String(format!("{}{}{}", EXPRESSION_OPEN, inner, EXPRESSION_CLOSE))
            }
            PropValue::Number(n) => Value::Number(n.clone()),
            PropValue::Boolean(b) => Value::Bool(*b),
            PropValue::DataSource(ds) => ds.to_json(),
            PropValue::Json(v) => v.clone(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, PropValue::Expression(_))
    }
}

impl Serialize for PropValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Inner text of a value that is exactly one `{{ ... }}` group. A value
/// holding several groups, or none, is literal text.
pub fn expression_inner(s: &str) -> Option<&str> {
    let inner = s.strip_prefix(EXPRESSION_OPEN)?.strip_suffix(EXPRESSION_CLOSE)?;
    if inner.contains(EXPRESSION_OPEN) || inner.contains(EXPRESSION_CLOSE) {
        return None;
    }
    Some(inner.trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSourceKind {
    Graphql,
    Rest,
    Static,
    Unrecognized(String),
}

impl DataSourceKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "graphql" => Self::Graphql,
            "rest" => Self::Rest,
            "static" => Self::Static,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Graphql => "graphql",
            Self::Rest => "rest",
            Self::Static => "static",
            Self::Unrecognized(other) => other,
        }
    }

    pub fn requires_query(&self) -> bool {
        matches!(self, Self::Graphql | Self::Rest)
    }
}

impl Serialize for DataSourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSourceDescriptor {
    /// `None` when the descriptor carries no string `kind`.
    pub kind: Option<DataSourceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub variables: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

impl DataSourceDescriptor {
    pub fn new(kind: DataSourceKind) -> Self {
        Self {
            kind: Some(kind),
            query: None,
            variables: Map::new(),
            data: None,
            transform: None,
        }
    }

    pub fn graphql(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::new(DataSourceKind::Graphql)
        }
    }

    pub fn rest(url: impl Into<String>) -> Self {
        Self {
            query: Some(url.into()),
            ..Self::new(DataSourceKind::Rest)
        }
    }

    pub fn inline(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::new(DataSourceKind::Static)
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            kind: map.get("kind").and_then(Value::as_str).map(DataSourceKind::parse),
            query: map.get("query").and_then(Value::as_str).map(str::to_string),
            variables: map
                .get("variables")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            data: map.get("data").cloned(),
            transform: map.get("transform").and_then(Value::as_str).map(str::to_string),
        }
    }

    /// Query text, ignoring the empty string.
    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expression_strings_are_stripped() {
        let value = PropValue::from_json("value", &json!("{{ state.count }}"));
        assert_eq!(value, PropValue::Expression("state.count".to_string()));
        assert_eq!(value.to_json(), json!("{{state.count}}"));
    }

    #[test]
    fn test_half_delimited_string_stays_literal() {
        let value = PropValue::from_json("title", &json!("{{ not closed"));
        assert_eq!(value, PropValue::String("{{ not closed".to_string()));
    }

    #[test]
    fn test_several_groups_stay_literal() {
        let value = PropValue::from_json("label", &json!("{{ a }} and {{ b }}"));
        assert_eq!(value, PropValue::String("{{ a }} and {{ b }}".to_string()));
        assert_eq!(expression_inner("{{}}"), Some(""));
        assert_eq!(expression_inner("{{ a }}{{ b }}"), None);
    }

    #[test]
    fn test_object_classification() {
        let ds = PropValue::from_json("rows", &json!({"kind": "rest", "query": "/api/rows"}));
        assert!(matches!(ds, PropValue::DataSource(ref d) if d.kind == Some(DataSourceKind::Rest)));

        let unnamed = PropValue::from_json("dataSource", &json!({"query": "X"}));
        assert!(matches!(unnamed, PropValue::DataSource(ref d) if d.kind.is_none()));

        let columns = PropValue::from_json("columns", &json!([{"key": "id"}]));
        assert!(matches!(columns, PropValue::Json(_)));
    }

    #[test]
    fn test_component_types_first_encountered_order() {
        let spec = PageSpec::new("Dashboard", "/dashboard")
            .with_section(SpecNode::new("Card").with_child(SpecNode::new("Stat")))
            .with_section(SpecNode::new("Card").with_child(SpecNode::new("Button")));
        assert_eq!(spec.component_types(), vec!["Card", "Stat", "Button"]);
    }

    #[test]
    fn test_visit_paths() {
        let spec = PageSpec::new("Dashboard", "/dashboard")
            .with_section(SpecNode::new("Card").with_child(SpecNode::new("Stat")));
        let mut paths = vec![];
        spec.visit_nodes(&mut |_, path| paths.push(path.to_string()));
        assert_eq!(paths, vec!["sections[0]", "sections[0].children[0]"]);
    }

    #[test]
    fn test_empty_text_is_not_content() {
        assert!(!SpecNode::new("Card").with_text("").has_content());
        assert!(SpecNode::new("Card").with_text("Hi").has_content());
    }
}
