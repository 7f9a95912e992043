//! Angular backend: standalone class components.
//!
//! Property bindings and event bindings are rendered as separate groups,
//! tags use the manifest selector, and every injected service appears once
//! in the constructor.

use serde_json::Value;

use super::{
    group_by_module, js_literal, page_selector, pascal_to_kebab, wrapper_name, AncillaryDependency, BackendKind,
    BackendPolicy, PageDocument,
};
use crate::config::DEFAULT_ANGULAR_SERVICES_MODULE;
use crate::manifest::ComponentManifestEntry;
use crate::spec::{DataSourceDescriptor, DataSourceKind, PropValue, SpecNode};

const CLASS_SUFFIX: &str = "Component";

pub struct AngularBackend {
    services_module: String,
}

impl AngularBackend {
    pub fn new(services_module: &str) -> Self {
        Self {
            services_module: services_module.to_string(),
        }
    }

    /// Manifest selector, or `app-<kebab name>` when the entry has none.
    fn selector<'e>(&self, entry: &'e ComponentManifestEntry) -> std::borrow::Cow<'e, str> {
        match &entry.selector {
            Some(selector) => selector.as_str().into(),
            None => {
                let base = entry.name.strip_suffix(CLASS_SUFFIX).unwrap_or(&entry.name);
                format!("app-{}", pascal_to_kebab(base)).into()
            }
        }
    }

    fn data_source_call(&self, ds: &DataSourceDescriptor) -> String {
        let query = js_literal(&Value::String(ds.query.clone().unwrap_or_default()));
        let variables = js_literal(&Value::Object(ds.variables.clone()));
        match &ds.kind {
            Some(DataSourceKind::Graphql) => format!("graphqlService.query({}, {})", query, variables),
            Some(DataSourceKind::Rest) => format!("restService.get({}, {})", query, variables),
            Some(DataSourceKind::Static) => {
                let data = ds.data.clone().unwrap_or_else(|| Value::Array(vec![]));
                format!("of({})", js_literal(&data))
            }
            Some(DataSourceKind::Unrecognized(_)) | None => format!("dataService.query({})", query),
        }
    }

    fn render_event(&self, name: &str, handler: &str) -> String {
        format!("({})=\"{}\"", name, escape_attr(handler))
    }
}

impl Default for AngularBackend {
    fn default() -> Self {
        Self::new(DEFAULT_ANGULAR_SERVICES_MODULE)
    }
}

impl BackendPolicy for AngularBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Angular
    }

    fn render_open_tag(&self, node: &SpecNode, entry: &ComponentManifestEntry, self_closing: bool) -> String {
        let properties = node
            .attributes
            .iter()
            .map(|(name, value)| self.render_binding(name, value));
        let events = node
            .events
            .iter()
            .map(|(name, handler)| self.render_event(name, handler));
        let bindings: Vec<String> = properties.chain(events).collect();

        let attrs = if bindings.is_empty() {
            String::new()
        } else {
            format!(" {}", bindings.join(" "))
        };
        let end = if self_closing { " />" } else { ">" };
        format!("<{}{}{}", self.selector(entry), attrs, end)
    }

    fn render_binding(&self, name: &str, value: &PropValue) -> String {
        let bound = match value {
            PropValue::String(s) => return format!("{}=\"{}\"", name, escape_attr(s)),
            PropValue::Expression(inner) => inner.clone(),
            PropValue::Number(n) => n.to_string(),
            PropValue::Boolean(b) => b.to_string(),
            PropValue::DataSource(ds) => self.data_source_call(ds),
            PropValue::Json(v) => js_literal(v),
        };
        format!("[{}]=\"{}\"", name, escape_attr(&bound))
    }

    /// `{{ ... }}` passes through as template interpolation.
    fn render_text(&self, text: &str) -> String {
        text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }

    fn render_close_tag(&self, entry: &ComponentManifestEntry) -> String {
        format!("</{}>", self.selector(entry))
    }

    fn dependency_for(&self, kind: Option<&DataSourceKind>) -> Option<AncillaryDependency> {
        let services = self.services_module.as_str();
        Some(match kind {
            Some(DataSourceKind::Graphql) => {
                AncillaryDependency::injected("GraphQLService", services, "graphqlService")
            }
            Some(DataSourceKind::Rest) => AncillaryDependency::injected("RestService", services, "restService"),
            Some(DataSourceKind::Static) => AncillaryDependency::import("of", "rxjs"),
            Some(DataSourceKind::Unrecognized(_)) | None => {
                AncillaryDependency::injected("DataService", services, "dataService")
            }
        })
    }

    fn body_indent(&self) -> usize {
        4
    }

    fn render_document(&self, document: &PageDocument<'_>) -> String {
        let spec = document.spec;
        let mut out = String::new();

        if let Some(meta) = &spec.meta {
            out.push_str(&format!("// Page: {}\n", spec.page));
            if let Some(title) = &meta.title {
                out.push_str(&format!("// Title: {}\n", title));
            }
            if let Some(description) = &meta.description {
                out.push_str(&format!("// Description: {}\n", description));
            }
            out.push_str(&format!("// Route: {}\n\n", spec.route));
        }

        out.push_str("import { Component } from \"@angular/core\";\n");
        out.push_str("import { CommonModule } from \"@angular/common\";\n");
        for entry in &document.components {
            out.push_str(&self.import_for(entry));
            out.push('\n');
        }
        for (module, symbols) in group_by_module(document.dependencies) {
            out.push_str(&format!("import {{ {} }} from \"{}\";\n", symbols.join(", "), module));
        }

        let mut standalone_imports: Vec<&str> = document.components.iter().map(|e| e.name.as_str()).collect();
        standalone_imports.push("CommonModule");

        out.push_str("\n@Component({\n");
        out.push_str(&format!("  selector: \"{}\",\n", page_selector(&spec.page)));
        out.push_str("  standalone: true,\n");
        out.push_str(&format!("  imports: [{}],\n", standalone_imports.join(", ")));
        out.push_str(&format!("  template: `\n{}\n  `,\n", escape_template_literal(&document.body)));
        out.push_str("})\n");

        let class_name = wrapper_name(&spec.page, CLASS_SUFFIX);
        let injected: Vec<String> = document
            .dependencies
            .iter()
            .filter_map(|dep| {
                dep.injected_as
                    .as_ref()
                    .map(|field| format!("    private {}: {},", field, dep.symbol))
            })
            .collect();

        if injected.is_empty() {
            out.push_str(&format!("export class {} {{}}\n", class_name));
        } else {
            out.push_str(&format!(
                "export class {} {{\n  constructor(\n{}\n  ) {{}}\n}}\n",
                class_name,
                injected.join("\n")
            ));
        }

        out
    }
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

/// The template is embedded in a backtick literal.
fn escape_template_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('`', "\\`").replace("${", "\\${")
}
