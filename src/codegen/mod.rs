//! Code Emitters - One Walker, Many Backends
//!
//! `compile_page` owns the traversal. A backend only supplies syntax through
//! `BackendPolicy`. Output is a pure function of (spec, manifest, backend).

mod angular;
mod react;

pub use angular::AngularBackend;
pub use react::ReactBackend;

use convert_case::{Boundary, Case, Converter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::DataLayerConfig;
use crate::manifest::{ComponentManifestEntry, Manifest};
use crate::spec::{DataSourceKind, PageSpec, PropValue, SpecNode};

pub type Result<T> = std::result::Result<T, CodegenError>;

#[derive(Debug, Error)]
pub enum CodegenError {
    /// Should have been caught by the quality gates; fatal here regardless.
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Unknown backend: {0} (expected react or angular)")]
    UnknownBackend(String),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Function components.
    React,
    /// Class components.
    #[default]
    Angular,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Angular => "angular",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            Self::React => ".jsx",
            Self::Angular => ".component.ts",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "react" => Ok(Self::React),
            "angular" => Ok(Self::Angular),
            other => Err(CodegenError::UnknownBackend(other.to_string())),
        }
    }
}

/// A service or helper a data source needs beyond the component imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AncillaryDependency {
    pub symbol: String,
    pub module: String,
    /// Constructor parameter name, for injected services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injected_as: Option<String>,
}

impl AncillaryDependency {
    pub fn import(symbol: &str, module: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            module: module.to_string(),
            injected_as: None,
        }
    }

    pub fn injected(symbol: &str, module: &str, field: &str) -> Self {
        Self {
            injected_as: Some(field.to_string()),
            ..Self::import(symbol, module)
        }
    }
}

/// Everything a backend needs to wrap the rendered body into a file.
pub struct PageDocument<'a> {
    pub spec: &'a PageSpec,
    pub components: Vec<&'a ComponentManifestEntry>,
    pub dependencies: &'a [AncillaryDependency],
    pub body: String,
}

/// Backend syntax rules.
pub trait BackendPolicy {
    fn kind(&self) -> BackendKind;

    fn import_for(&self, entry: &ComponentManifestEntry) -> String {
        format!("import {{ {} }} from \"{}\";", entry.name, entry.import_path)
    }

    fn render_open_tag(&self, node: &SpecNode, entry: &ComponentManifestEntry, self_closing: bool) -> String;

    fn render_binding(&self, name: &str, value: &PropValue) -> String;

    fn render_text(&self, text: &str) -> String;

    fn render_close_tag(&self, entry: &ComponentManifestEntry) -> String;

    /// The dependency a data source of this kind pulls in, if any.
    fn dependency_for(&self, kind: Option<&DataSourceKind>) -> Option<AncillaryDependency>;

    /// Every dependency the tree needs, once each, in first-encountered order.
    fn collect_ancillary_dependencies(&self, spec: &PageSpec) -> Vec<AncillaryDependency> {
        let mut dependencies: Vec<AncillaryDependency> = vec![];
        spec.visit_nodes(&mut |node, _| {
            for value in node.attributes.values() {
                if let PropValue::DataSource(ds) = value {
                    if let Some(dep) = self.dependency_for(ds.kind.as_ref()) {
                        if !dependencies.iter().any(|d| d.symbol == dep.symbol) {
                            dependencies.push(dep);
                        }
                    }
                }
            }
        });
        dependencies
    }

    /// Indentation of top-level sections inside the wrapper.
    fn body_indent(&self) -> usize;

    fn render_document(&self, document: &PageDocument<'_>) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSource {
    pub backend: BackendKind,
    pub file_name: String,
    pub source: String,
    pub components: Vec<String>,
    pub dependencies: Vec<AncillaryDependency>,
}

/// Render a page with the given backend.
pub fn compile_page<B>(backend: &B, spec: &PageSpec, manifest: &Manifest) -> Result<GeneratedSource>
where
    B: BackendPolicy + ?Sized,
{
    let components = spec
        .component_types()
        .into_iter()
        .map(|name| {
            manifest
                .lookup(name)
                .ok_or_else(|| CodegenError::UnknownComponent(name.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let dependencies = backend.collect_ancillary_dependencies(spec);

    let sections = spec
        .sections
        .iter()
        .map(|node| render_node(backend, manifest, node, backend.body_indent()))
        .collect::<Result<Vec<_>>>()?;

    let document = PageDocument {
        spec,
        components,
        dependencies: &dependencies,
        body: sections.join("\n\n"),
    };
    let source = backend.render_document(&document);

    Ok(GeneratedSource {
        backend: backend.kind(),
        file_name: output_file_name(&spec.page, backend.kind()),
        source,
        components: document.components.iter().map(|e| e.name.clone()).collect(),
        dependencies,
    })
}

fn render_node<B>(backend: &B, manifest: &Manifest, node: &SpecNode, indent: usize) -> Result<String>
where
    B: BackendPolicy + ?Sized,
{
    let entry = manifest
        .lookup(&node.component_type)
        .ok_or_else(|| CodegenError::UnknownComponent(node.component_type.clone()))?;
    let pad = " ".repeat(indent);

    if !node.has_content() {
        return Ok(format!("{}{}", pad, backend.render_open_tag(node, entry, true)));
    }

    let mut lines = vec![format!("{}{}", pad, backend.render_open_tag(node, entry, false))];
    if let Some(text) = node.text_content() {
        lines.push(format!("{}  {}", pad, backend.render_text(text)));
    }
    for child in &node.children {
        lines.push(render_node(backend, manifest, child, indent + 2)?);
    }
    lines.push(format!("{}{}", pad, backend.render_close_tag(entry)));

    Ok(lines.join("\n"))
}

/// Backend for a kind, with data-layer modules from configuration.
pub fn backend_for(kind: BackendKind, data_layer: &DataLayerConfig) -> Box<dyn BackendPolicy + Send + Sync> {
    match kind {
        BackendKind::React => Box::new(ReactBackend::new(&data_layer.react_hooks_module)),
        BackendKind::Angular => Box::new(AngularBackend::new(&data_layer.angular_services_module)),
    }
}

/// `<lowercased page><extension>`
pub fn output_file_name(page: &str, kind: BackendKind) -> String {
    format!("{}{}", page.to_lowercase(), kind.file_extension())
}

/// Wrapper declaration name: page name plus a backend suffix.
pub fn wrapper_name(page: &str, suffix: &str) -> String {
    format!("{}{}", page, suffix)
}

/// `app-` plus the kebab-cased page name, every character kept.
pub fn page_selector(page: &str) -> String {
    format!("app-{}", pascal_to_kebab(page))
}

/// Hyphenates at PascalCase word starts only; digits stay attached to the
/// word before them.
pub(crate) fn pascal_to_kebab(name: &str) -> String {
    Converter::new()
        .set_boundaries(&[Boundary::LowerUpper, Boundary::DigitUpper, Boundary::Acronym])
        .to_case(Case::Kebab)
        .convert(name)
}

/// Group dependencies by module, both in first-encountered order.
pub(crate) fn group_by_module(dependencies: &[AncillaryDependency]) -> Vec<(&str, Vec<&str>)> {
    let mut groups: Vec<(&str, Vec<&str>)> = vec![];
    for dep in dependencies {
        match groups.iter_mut().find(|(module, _)| *module == dep.module) {
            Some((_, symbols)) => symbols.push(dep.symbol.as_str()),
            None => groups.push((dep.module.as_str(), vec![dep.symbol.as_str()])),
        }
    }
    groups
}

/// Double-quoted JavaScript string.
pub(crate) fn js_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// JavaScript literal with single-quoted strings and bare identifier keys,
/// for embedding inside double-quoted template attributes.
pub(crate) fn js_literal(value: &Value) -> String {
    match value {
        Value::String(s) => single_quoted(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(js_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .map(|(key, v)| {
                    let key = if is_identifier(key) { key.clone() } else { single_quoted(key) };
                    format!("{}: {}", key, js_literal(v))
                })
                .collect();
            format!("{{ {} }}", fields.join(", "))
        }
        other => other.to_string(),
    }
}

fn single_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_selector_keeps_every_character() {
        assert_eq!(page_selector("Dashboard"), "app-dashboard");
        assert_eq!(page_selector("ClaimsDashboard"), "app-claims-dashboard");
    }

    #[test]
    fn test_page_selector_keeps_digits_in_word() {
        assert_eq!(page_selector("Page2Dashboard"), "app-page2-dashboard");
        assert_eq!(page_selector("Report2024"), "app-report2024");
    }

    #[test]
    fn test_unknown_nested_component_is_refused() {
        let manifest = Manifest::from_value(json!({
            "Card": {"selector": "app-card", "import": "@your-ds/components"}
        }))
        .unwrap();
        let spec = PageSpec::new("Dashboard", "/dashboard")
            .with_section(SpecNode::new("Card").with_child(SpecNode::new("Kard")));

        for kind in [BackendKind::React, BackendKind::Angular] {
            let backend = backend_for(kind, &DataLayerConfig::default());
            let err = compile_page(backend.as_ref(), &spec, &manifest).unwrap_err();
            assert!(
                matches!(&err, CodegenError::UnknownComponent(name) if name == "Kard"),
                "{} backend rendered an unknown component",
                kind
            );
        }
    }

    #[test]
    fn test_output_file_names() {
        assert_eq!(output_file_name("Dashboard", BackendKind::React), "dashboard.jsx");
        assert_eq!(output_file_name("FormPage", BackendKind::Angular), "formpage.component.ts");
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("React".parse::<BackendKind>().unwrap(), BackendKind::React);
        assert!("vue".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_js_literal() {
        let value = json!([{"key": "user", "header": "User's"}, {"data-id": 1, "on": true}]);
        assert_eq!(
            js_literal(&value),
            r#"[{ key: 'user', header: 'User\'s' }, { 'data-id': 1, on: true }]"#
        );
        assert_eq!(js_literal(&json!({})), "{}");
    }

    #[test]
    fn test_group_by_module_preserves_order() {
        let deps = vec![
            AncillaryDependency::injected("RestService", "@ds/services", "restService"),
            AncillaryDependency::import("of", "rxjs"),
            AncillaryDependency::injected("GraphQLService", "@ds/services", "graphqlService"),
        ];
        assert_eq!(
            group_by_module(&deps),
            vec![("@ds/services", vec!["RestService", "GraphQLService"]), ("rxjs", vec!["of"])]
        );
    }
}
