//! Quality Gates - Semantic Validation
//!
//! Gates append diagnostics. The engine runs every gate, every time, and
//! derives validity from the error list alone.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::diagnostics::{DiagnosticKind, Diagnostics, ValidationReport};
use crate::manifest::{Manifest, PropSchema, PropType};
use crate::spec::{DataSourceKind, PageSpec, PropValue, SpecNode};
use crate::tokens::{is_valid_token, looks_like_token};

static PAGE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("page name pattern is valid"));
static NODE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").expect("node id pattern is valid"));

/// Props that give an element an accessible name.
const ACCESSIBLE_NAME_PROPS: [&str; 4] = ["label", "aria-label", "ariaLabel", "aria-labelledby"];

/// One independent semantic check over the whole tree.
pub trait QualityGate: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, spec: &PageSpec, manifest: &Manifest, diagnostics: &mut Diagnostics);
}

// --- Concrete Gates ---

pub struct ComponentUsageGate;

impl QualityGate for ComponentUsageGate {
    fn name(&self) -> &'static str { "component_usage" }

    fn check(&self, spec: &PageSpec, manifest: &Manifest, diagnostics: &mut Diagnostics) {
        spec.visit_nodes(&mut |node, path| {
            if !manifest.contains(&node.component_type) {
                diagnostics.error(
                    DiagnosticKind::UnknownComponent,
                    format!(
                        "Unknown component: {}. Must use components from manifest.",
                        node.component_type
                    ),
                    path,
                );
            }
        });
    }
}

pub struct PropGate;

impl QualityGate for PropGate {
    fn name(&self) -> &'static str { "props" }

    fn check(&self, spec: &PageSpec, manifest: &Manifest, diagnostics: &mut Diagnostics) {
        spec.visit_nodes(&mut |node, path| {
            // Unknown types are reported by the usage gate.
            let Some(entry) = manifest.lookup(&node.component_type) else {
                return;
            };
            for (prop_name, schema) in &entry.props {
                match node.prop(prop_name) {
                    None if schema.required => diagnostics.error(
                        DiagnosticKind::MissingRequiredProp,
                        format!(
                            "Missing required prop \"{}\" for component {}",
                            prop_name, node.component_type
                        ),
                        path,
                    ),
                    None => {}
                    Some(value) => {
                        check_prop_type(&node.component_type, prop_name, value, schema, path, diagnostics)
                    }
                }
            }
        });
    }
}

fn check_prop_type(
    component: &str,
    prop_name: &str,
    value: &PropValue,
    schema: &PropSchema,
    path: &str,
    diagnostics: &mut Diagnostics,
) {
    // Bound expressions are only known at runtime.
    if value.is_expression() {
        return;
    }

    match schema.prop_type {
        PropType::Enum if !schema.values.is_empty() => {
            if !schema.values.contains(&value.to_json()) {
                let allowed: Vec<String> = schema.values.iter().map(display_json).collect();
                diagnostics.error(
                    DiagnosticKind::InvalidEnumValue,
                    format!(
                        "Invalid value \"{}\" for {}.{}. Must be one of: {}",
                        display_json(&value.to_json()),
                        component,
                        prop_name,
                        allowed.join(", ")
                    ),
                    path,
                );
            }
        }
        PropType::Number => match value {
            PropValue::Number(n) => {
                let n = n.as_f64().unwrap_or(f64::NAN);
                if let Some(min) = schema.min {
                    if n < min {
                        diagnostics.error(
                            DiagnosticKind::InvalidRange,
                            format!("{}.{} must be >= {}", component, prop_name, min),
                            path,
                        );
                    }
                }
                if let Some(max) = schema.max {
                    if n > max {
                        diagnostics.error(
                            DiagnosticKind::InvalidRange,
                            format!("{}.{} must be <= {}", component, prop_name, max),
                            path,
                        );
                    }
                }
            }
            other => diagnostics.error(
                DiagnosticKind::InvalidPropType,
                format!(
                    "{}.{} must be a number, got {}",
                    component,
                    prop_name,
                    type_name(other)
                ),
                path,
            ),
        },
        PropType::Boolean => {
            if !matches!(value, PropValue::Boolean(_)) {
                diagnostics.error(
                    DiagnosticKind::InvalidPropType,
                    format!(
                        "{}.{} must be a boolean, got {}",
                        component,
                        prop_name,
                        type_name(value)
                    ),
                    path,
                );
            }
        }
        PropType::Enum | PropType::String | PropType::Any => {}
    }
}

fn type_name(value: &PropValue) -> &'static str {
    match value {
        PropValue::String(_) => "string",
        PropValue::Expression(_) => "expression",
        PropValue::Number(_) => "number",
        PropValue::Boolean(_) => "boolean",
        PropValue::DataSource(_) => "data source",
        PropValue::Json(Value::Array(_)) => "array",
        PropValue::Json(Value::Null) => "null",
        PropValue::Json(_) => "object",
    }
}

fn display_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Accessibility-relevant role, from the component name with any
/// `Component` suffix removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Input,
    Button,
    Media,
    Table,
    Other,
}

impl NodeRole {
    pub fn of(component_type: &str) -> Self {
        let base = component_type.strip_suffix("Component").unwrap_or(component_type);
        match base {
            "Input" | "TextField" | "TextArea" | "Textarea" | "Select" | "Checkbox" | "Radio"
            | "Switch" | "Slider" | "DatePicker" => Self::Input,
            "Button" | "IconButton" => Self::Button,
            "Image" | "Img" | "Avatar" => Self::Media,
            "DataTable" | "Table" => Self::Table,
            _ => Self::Other,
        }
    }
}

fn has_prop(node: &SpecNode, name: &str) -> bool {
    match node.prop(name) {
        None => false,
        Some(PropValue::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn has_accessible_name(node: &SpecNode) -> bool {
    ACCESSIBLE_NAME_PROPS.iter().any(|name| has_prop(node, name))
}

pub struct AccessibilityGate;

impl QualityGate for AccessibilityGate {
    fn name(&self) -> &'static str { "accessibility" }

    fn check(&self, spec: &PageSpec, _manifest: &Manifest, diagnostics: &mut Diagnostics) {
        spec.visit_nodes(&mut |node, path| {
            let component = &node.component_type;
            match NodeRole::of(component) {
                NodeRole::Input if !has_accessible_name(node) => diagnostics.warning(
                    DiagnosticKind::Accessibility,
                    format!("{} component should have a label or aria-label", component),
                    path,
                ),
                NodeRole::Button if node.text_content().is_none() && !has_accessible_name(node) => {
                    diagnostics.warning(
                        DiagnosticKind::Accessibility,
                        format!("{} component should have text or aria-label", component),
                        path,
                    )
                }
                NodeRole::Media if !has_prop(node, "alt") => diagnostics.warning(
                    DiagnosticKind::Accessibility,
                    format!("{} component should have alt text", component),
                    path,
                ),
                NodeRole::Table => match node.prop("columns") {
                    None => diagnostics.error(
                        DiagnosticKind::Accessibility,
                        format!("{} must have columns array defined", component),
                        path,
                    ),
                    Some(PropValue::Expression(_)) => {}
                    Some(PropValue::Json(Value::Array(columns))) if !columns.is_empty() => {}
                    Some(_) => diagnostics.warning(
                        DiagnosticKind::Accessibility,
                        format!("{} columns should be a non-empty array of column definitions", component),
                        path,
                    ),
                },
                _ => {}
            }
        });
    }
}

pub struct DataSourceGate;

impl QualityGate for DataSourceGate {
    fn name(&self) -> &'static str { "data_sources" }

    fn check(&self, spec: &PageSpec, _manifest: &Manifest, diagnostics: &mut Diagnostics) {
        spec.visit_nodes(&mut |node, path| {
            for (prop_name, value) in &node.attributes {
                let PropValue::DataSource(ds) = value else {
                    continue;
                };
                let location = format!("{}.props.{}", path, prop_name);
                match &ds.kind {
                    None => diagnostics.error(
                        DiagnosticKind::InvalidDataSource,
                        format!(
                            "Invalid {}.kind: missing. Must be graphql, rest, or static",
                            prop_name
                        ),
                        &location,
                    ),
                    Some(DataSourceKind::Unrecognized(kind)) => diagnostics.error(
                        DiagnosticKind::InvalidDataSource,
                        format!(
                            "Invalid {}.kind: {}. Must be graphql, rest, or static",
                            prop_name, kind
                        ),
                        &location,
                    ),
                    Some(kind) if kind.requires_query() && ds.query_text().is_none() => {
                        diagnostics.error(
                            DiagnosticKind::InvalidDataSource,
                            format!("{} of type {} requires a query field", prop_name, kind.as_str()),
                            &location,
                        )
                    }
                    Some(DataSourceKind::Static) if ds.data.is_none() => diagnostics.warning(
                        DiagnosticKind::InvalidDataSource,
                        format!("{} of type static has no inline data; an empty list is bound", prop_name),
                        &location,
                    ),
                    Some(_) => {}
                }
            }
        });
    }
}

pub struct DesignTokenGate;

impl DesignTokenGate {
    fn check_string(value: &str, location: &str, diagnostics: &mut Diagnostics) {
        if looks_like_token(value) && !is_valid_token(value) {
            diagnostics.warning(
                DiagnosticKind::DesignToken,
                format!("Potentially invalid design token: \"{}\"", value),
                location,
            );
        }
    }

    fn check_json(value: &Value, location: &str, diagnostics: &mut Diagnostics) {
        match value {
            Value::String(s) => Self::check_string(s, location, diagnostics),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    Self::check_json(item, &format!("{}[{}]", location, i), diagnostics);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    Self::check_json(item, &format!("{}.{}", location, key), diagnostics);
                }
            }
            _ => {}
        }
    }
}

impl QualityGate for DesignTokenGate {
    fn name(&self) -> &'static str { "design_tokens" }

    fn check(&self, spec: &PageSpec, _manifest: &Manifest, diagnostics: &mut Diagnostics) {
        if let Some(meta) = &spec.meta {
            if let Some(title) = &meta.title {
                Self::check_string(title, "meta.title", diagnostics);
            }
            if let Some(description) = &meta.description {
                Self::check_string(description, "meta.description", diagnostics);
            }
        }

        spec.visit_nodes(&mut |node, path| {
            if let Some(text) = &node.text {
                Self::check_string(text, &format!("{}.text", path), diagnostics);
            }
            for (prop_name, value) in &node.attributes {
                let location = format!("{}.props.{}", path, prop_name);
                match value {
                    PropValue::String(s) => Self::check_string(s, &location, diagnostics),
                    PropValue::Json(v) => Self::check_json(v, &location, diagnostics),
                    PropValue::DataSource(ds) => {
                        for (key, v) in &ds.variables {
                            Self::check_json(v, &format!("{}.variables.{}", location, key), diagnostics);
                        }
                        if let Some(data) = &ds.data {
                            Self::check_json(data, &format!("{}.data", location), diagnostics);
                        }
                    }
                    PropValue::Expression(_) | PropValue::Number(_) | PropValue::Boolean(_) => {}
                }
            }
        });
    }
}

pub struct NamingGate;

impl QualityGate for NamingGate {
    fn name(&self) -> &'static str { "naming" }

    fn check(&self, spec: &PageSpec, _manifest: &Manifest, diagnostics: &mut Diagnostics) {
        if !PAGE_NAME.is_match(&spec.page) {
            diagnostics.error(
                DiagnosticKind::NamingConvention,
                format!("Page name \"{}\" must be in PascalCase", spec.page),
                "page",
            );
        }

        if !spec.route.starts_with('/') {
            diagnostics.error(
                DiagnosticKind::NamingConvention,
                format!("Route \"{}\" must start with /", spec.route),
                "route",
            );
        }

        spec.visit_nodes(&mut |node, path| {
            if let Some(id) = &node.id {
                if !NODE_ID.is_match(id) {
                    diagnostics.warning(
                        DiagnosticKind::NamingConvention,
                        format!("Component ID \"{}\" should be in camelCase", id),
                        path,
                    );
                }
            }
        });
    }
}

/// Runs every gate against a spec. Holds no per-run state, so one engine
/// can serve concurrent validations.
pub struct QualityGateEngine {
    gates: Vec<Box<dyn QualityGate>>,
}

impl QualityGateEngine {
    pub fn new() -> Self {
        Self {
            gates: vec![
                Box::new(ComponentUsageGate),
                Box::new(PropGate),
                Box::new(AccessibilityGate),
                Box::new(DataSourceGate),
                Box::new(DesignTokenGate),
                Box::new(NamingGate),
            ],
        }
    }

    pub fn with_gates(gates: Vec<Box<dyn QualityGate>>) -> Self {
        Self { gates }
    }

    pub fn gate_names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    pub fn validate_spec(&self, spec: &PageSpec, manifest: &Manifest) -> ValidationReport {
        let mut diagnostics = Diagnostics::new();

        for gate in &self.gates {
            gate.check(spec, manifest, &mut diagnostics);
        }

        debug!(
            page = %spec.page,
            errors = diagnostics.error_count(),
            warnings = diagnostics.warning_count(),
            "Quality gates complete"
        );

        diagnostics.into_report()
    }
}

impl Default for QualityGateEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate with the default gate set.
pub fn validate_spec(spec: &PageSpec, manifest: &Manifest) -> ValidationReport {
    QualityGateEngine::new().validate_spec(spec, manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::manifest::ComponentManifestEntry;
    use crate::spec::DataSourceDescriptor;
    use serde_json::json;

    fn manifest() -> Manifest {
        let mut manifest = Manifest::new();
        manifest.register(ComponentManifestEntry::new("Card", "@your-ds/react"));
        manifest.register(
            ComponentManifestEntry::new("Button", "@your-ds/react")
                .with_prop("variant", PropSchema::enumeration(["primary", "secondary"]))
                .with_prop("disabled", PropSchema::of(PropType::Boolean)),
        );
        manifest.register(
            ComponentManifestEntry::new("Pager", "@your-ds/react").with_prop(
                "pageSize",
                PropSchema::of(PropType::Number).range(Some(1.0), Some(100.0)),
            ),
        );
        manifest.register(ComponentManifestEntry::new("DataTable", "@your-ds/react"));
        manifest.register(ComponentManifestEntry::new("Image", "@your-ds/react"));
        manifest
    }

    fn page(nodes: Vec<SpecNode>) -> PageSpec {
        nodes
            .into_iter()
            .fold(PageSpec::new("Dashboard", "/dashboard"), PageSpec::with_section)
    }

    fn check(gate: &dyn QualityGate, spec: &PageSpec) -> ValidationReport {
        let mut diagnostics = Diagnostics::new();
        gate.check(spec, &manifest(), &mut diagnostics);
        diagnostics.into_report()
    }

    #[test]
    fn test_each_invalid_prop_reported() {
        let spec = page(vec![
            SpecNode::new("Button")
                .with_text("Go")
                .with_prop("variant", PropValue::String("danger".into()))
                .with_prop("disabled", PropValue::String("yes".into())),
            SpecNode::new("Pager").with_prop("pageSize", PropValue::Number(500.into())),
        ]);
        let report = check(&PropGate, &spec);
        let kinds: Vec<_> = report.errors.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::InvalidEnumValue,
                DiagnosticKind::InvalidPropType,
                DiagnosticKind::InvalidRange
            ]
        );
        assert_eq!(
            report.errors[0].message,
            "Invalid value \"danger\" for Button.variant. Must be one of: primary, secondary"
        );
        assert_eq!(report.errors[2].message, "Pager.pageSize must be <= 100");
    }

    #[test]
    fn test_expressions_skip_type_checks() {
        let spec = page(vec![SpecNode::new("Button")
            .with_text("Go")
            .with_prop("disabled", PropValue::Expression("form.invalid".into()))]);
        assert!(check(&PropGate, &spec).is_clean());
    }

    #[test]
    fn test_table_columns_rules() {
        let missing = page(vec![SpecNode::new("DataTable")]);
        let report = check(&AccessibilityGate, &missing);
        assert_eq!(report.errors.len(), 1);

        let empty = page(vec![SpecNode::new("DataTable").with_prop("columns", PropValue::Json(json!([])))]);
        let report = check(&AccessibilityGate, &empty);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_media_and_button_names() {
        let spec = page(vec![
            SpecNode::new("Image"),
            SpecNode::new("ButtonComponent"),
            SpecNode::new("Button").with_prop("aria-label", PropValue::String("Close".into())),
        ]);
        let report = check(&AccessibilityGate, &spec);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings.iter().all(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn test_data_source_kinds() {
        let spec = page(vec![SpecNode::new("DataTable")
            .with_prop("dataSource", PropValue::DataSource(DataSourceDescriptor::new(DataSourceKind::Graphql)))
            .with_prop("extra", PropValue::DataSource(DataSourceDescriptor::new(DataSourceKind::parse("soap"))))]);
        let report = check(&DataSourceGate, &spec);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].message, "dataSource of type graphql requires a query field");
        assert!(report.errors[1].message.contains("soap"));
    }

    #[test]
    fn test_design_tokens_in_nested_values() {
        let spec = page(vec![SpecNode::new("Card")
            .with_prop("gap", PropValue::String("spacing.4".into()))
            .with_prop("style", PropValue::Json(json!({"color": "colors.brand.neon"})))]);
        let report = check(&DesignTokenGate, &spec);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].location.as_deref(), Some("sections[0].props.style.color"));
    }

    #[test]
    fn test_naming_rules() {
        let mut spec = page(vec![SpecNode::new("Card").with_id("HeroCard")]);
        spec.page = "dashboard".into();
        spec.route = "dashboard".into();
        let report = check(&NamingGate, &spec);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_engine_runs_every_gate() {
        let spec = page(vec![SpecNode::new("Kard").with_id("Bad-Id")]);
        let report = QualityGateEngine::new().validate_spec(&spec, &manifest());
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(QualityGateEngine::new().gate_names().len(), 6);
    }
}
