//! React backend: function components, one merged binding list per tag.

use convert_case::{Case, Casing};
use serde_json::Value;

use super::{
    group_by_module, is_identifier, js_string, wrapper_name, AncillaryDependency, BackendKind,
    BackendPolicy, PageDocument,
};
use crate::config::DEFAULT_REACT_HOOKS_MODULE;
use crate::manifest::ComponentManifestEntry;
use crate::spec::{expression_inner, DataSourceDescriptor, DataSourceKind, PropValue, SpecNode};

pub struct ReactBackend {
    hooks_module: String,
}

impl ReactBackend {
    pub fn new(hooks_module: &str) -> Self {
        Self {
            hooks_module: hooks_module.to_string(),
        }
    }

    fn data_source_call(&self, ds: &DataSourceDescriptor) -> String {
        let query = js_string(ds.query.as_deref().unwrap_or_default());
        let variables = Value::Object(ds.variables.clone()).to_string();
        match &ds.kind {
            Some(DataSourceKind::Graphql) => format!("useGraphQLQuery({}, {})", query, variables),
            Some(DataSourceKind::Rest) => format!("useRestQuery({}, {})", query, variables),
            Some(DataSourceKind::Static) => {
                let data = ds.data.clone().unwrap_or_else(|| Value::Array(vec![]));
                format!("{{ data: {}, loading: false, error: null }}", data)
            }
            Some(DataSourceKind::Unrecognized(_)) | None => format!("useQuery({})", query),
        }
    }

    /// `click` -> `onClick`; names already starting with `on` are kept.
    fn event_prop(name: &str) -> String {
        let is_on_prefixed = name.len() > 2
            && name.starts_with("on")
            && name[2..].starts_with(|c: char| c.is_ascii_uppercase());
        if is_on_prefixed {
            name.to_string()
        } else {
            format!("on{}", name.to_case(Case::Pascal))
        }
    }

    /// Identifier paths bind directly; statements become arrow functions.
    fn event_handler(handler: &str) -> String {
        let is_reference = !handler.is_empty() && handler.split('.').all(is_identifier);
        if is_reference {
            handler.to_string()
        } else {
            format!("() => {}", handler)
        }
    }
}

impl Default for ReactBackend {
    fn default() -> Self {
        Self::new(DEFAULT_REACT_HOOKS_MODULE)
    }
}

impl BackendPolicy for ReactBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::React
    }

    fn render_open_tag(&self, node: &SpecNode, entry: &ComponentManifestEntry, self_closing: bool) -> String {
        let mut bindings: Vec<String> = node
            .attributes
            .iter()
            .map(|(name, value)| self.render_binding(name, value))
            .collect();
        bindings.extend(
            node.events
                .iter()
                .map(|(name, handler)| format!("{}={{{}}}", Self::event_prop(name), Self::event_handler(handler))),
        );

        let attrs = if bindings.is_empty() {
            String::new()
        } else {
            format!(" {}", bindings.join(" "))
        };
        let end = if self_closing { " />" } else { ">" };
        format!("<{}{}{}", entry.name, attrs, end)
    }

    fn render_binding(&self, name: &str, value: &PropValue) -> String {
        let expression = match value {
            PropValue::String(s) => js_string(s),
            PropValue::Expression(inner) => inner.clone(),
            PropValue::Number(n) => n.to_string(),
            PropValue::Boolean(b) => b.to_string(),
            PropValue::DataSource(ds) => self.data_source_call(ds),
            PropValue::Json(v) => v.to_string(),
        };
        format!("{}={{{}}}", name, expression)
    }

    fn render_text(&self, text: &str) -> String {
        match expression_inner(text) {
            Some(inner) => format!("{{{}}}", inner),
            None => format!("{{{}}}", js_string(text)),
        }
    }

    fn render_close_tag(&self, entry: &ComponentManifestEntry) -> String {
        format!("</{}>", entry.name)
    }

    fn dependency_for(&self, kind: Option<&DataSourceKind>) -> Option<AncillaryDependency> {
        let symbol = match kind {
            Some(DataSourceKind::Graphql) => "useGraphQLQuery",
            Some(DataSourceKind::Rest) => "useRestQuery",
            Some(DataSourceKind::Static) => return None,
            Some(DataSourceKind::Unrecognized(_)) | None => "useQuery",
        };
        Some(AncillaryDependency::import(symbol, &self.hooks_module))
    }

    fn body_indent(&self) -> usize {
        6
    }

    fn render_document(&self, document: &PageDocument<'_>) -> String {
        let mut imports = vec!["import React from \"react\";".to_string()];
        imports.extend(document.components.iter().map(|entry| self.import_for(entry)));
        imports.extend(
            group_by_module(document.dependencies)
                .into_iter()
                .map(|(module, symbols)| format!("import {{ {} }} from \"{}\";", symbols.join(", "), module)),
        );

        format!(
            "{imports}\n\nexport default function {name}() {{\n  return (\n    <>\n{body}\n    </>\n  );\n}}\n",
            imports = imports.join("\n"),
            name = wrapper_name(&document.spec.page, ""),
            body = document.body,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::compile_page;
    use crate::manifest::Manifest;
    use crate::spec::PageSpec;
    use serde_json::json;

    fn manifest() -> Manifest {
        Manifest::from_value(json!({
            "Card": {"import": "@your-ds/react"},
            "Stat": {"import": "@your-ds/react"},
            "Button": {"import": "@your-ds/react"},
            "DataTable": {"import": "@your-ds/react"}
        }))
        .unwrap()
    }

    #[test]
    fn test_generate_page() {
        let spec = PageSpec::new("Dashboard", "/dashboard").with_section(
            SpecNode::new("Card")
                .with_prop("title", PropValue::String("Key Metrics".into()))
                .with_child(
                    SpecNode::new("Stat")
                        .with_prop("label", PropValue::String("Users".into()))
                        .with_prop("value", PropValue::String("10".into())),
                ),
        );
        let out = compile_page(&ReactBackend::default(), &spec, &manifest()).unwrap();
        assert_eq!(
            out.source,
            "import React from \"react\";\n\
             import { Card } from \"@your-ds/react\";\n\
             import { Stat } from \"@your-ds/react\";\n\
             \n\
             export default function Dashboard() {\n\
             \x20 return (\n\
             \x20   <>\n\
             \x20     <Card title={\"Key Metrics\"}>\n\
             \x20       <Stat label={\"Users\"} value={\"10\"} />\n\
             \x20     </Card>\n\
             \x20   </>\n\
             \x20 );\n\
             }\n"
        );
        assert_eq!(out.file_name, "dashboard.jsx");
    }

    #[test]
    fn test_bindings_by_variant() {
        let backend = ReactBackend::default();
        assert_eq!(backend.render_binding("count", &PropValue::Expression("state.count".into())), "count={state.count}");
        assert_eq!(backend.render_binding("max", &PropValue::Number(5.into())), "max={5}");
        assert_eq!(backend.render_binding("open", &PropValue::Boolean(false)), "open={false}");
        assert_eq!(
            backend.render_binding("columns", &PropValue::Json(json!([{"key": "id"}]))),
            "columns={[{\"key\":\"id\"}]}"
        );
    }

    #[test]
    fn test_data_source_calls() {
        let backend = ReactBackend::default();
        let gql = DataSourceDescriptor::graphql("GET_CLAIMS").with_variable("limit", json!(10));
        assert_eq!(
            backend.render_binding("dataSource", &PropValue::DataSource(gql)),
            "dataSource={useGraphQLQuery(\"GET_CLAIMS\", {\"limit\":10})}"
        );
        let rest = DataSourceDescriptor::rest("/api/metrics");
        assert_eq!(
            backend.render_binding("dataSource", &PropValue::DataSource(rest)),
            "dataSource={useRestQuery(\"/api/metrics\", {})}"
        );
        let inline = DataSourceDescriptor::inline(json!([1, 2]));
        assert_eq!(
            backend.render_binding("rows", &PropValue::DataSource(inline)),
            "rows={{ data: [1,2], loading: false, error: null }}"
        );
    }

    #[test]
    fn test_events_merge_into_binding_list() {
        let node = SpecNode::new("Button")
            .with_prop("variant", PropValue::String("primary".into()))
            .with_event("click", "handleSave")
            .with_event("onHover", "setHover(true)");
        let entry = ComponentManifestEntry::new("Button", "@your-ds/react");
        assert_eq!(
            ReactBackend::default().render_open_tag(&node, &entry, true),
            "<Button variant={\"primary\"} onClick={handleSave} onHover={() => setHover(true)} />"
        );
    }

    #[test]
    fn test_text_rendering() {
        let backend = ReactBackend::default();
        assert_eq!(backend.render_text("Save"), "{\"Save\"}");
        assert_eq!(backend.render_text("{{ user.name }}"), "{user.name}");
        assert_eq!(
            backend.render_text("{{ a }} and {{ b }}"),
            "{\"{{ a }} and {{ b }}\"}"
        );
    }

    #[test]
    fn test_hooks_imported_once_per_kind() {
        let table = |q: &str| {
            SpecNode::new("DataTable")
                .with_prop("dataSource", PropValue::DataSource(DataSourceDescriptor::graphql(q)))
        };
        let spec = PageSpec::new("Claims", "/claims")
            .with_section(table("A"))
            .with_section(table("B"));
        let out = compile_page(&ReactBackend::default(), &spec, &manifest()).unwrap();
        assert_eq!(out.source.matches("import { useGraphQLQuery }").count(), 1);
        assert_eq!(out.dependencies.len(), 1);
    }
}
