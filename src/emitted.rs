//! Emitted-Text Checks
//!
//! Plain substring and pattern heuristics over generated source. Runs after
//! the write, so findings are reported but never undo it.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codegen::BackendKind;
use crate::diagnostics::{DiagnosticKind, Diagnostics, ValidationReport};

static BOUND_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)=\{(\w+)\}").expect("binding pattern is valid"));

/// Attribute text skips `{...}` groups, so `=>` inside a handler does not
/// end the tag.
static INTERACTIVE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(?:app-)?(?:button|input|select|textarea)(?:\s(?:\{[^}]*\}|[^>{])*)?/?>")
        .expect("interactive tag pattern is valid")
});

/// Check generated source for the structure its backend must produce.
pub fn validate_emitted_text(source: &str, backend: BackendKind) -> ValidationReport {
    let mut diagnostics = Diagnostics::new();

    match backend {
        BackendKind::React => check_function_component(source, &mut diagnostics),
        BackendKind::Angular => check_class_component(source, &mut diagnostics),
    }
    check_interactive_tags(source, &mut diagnostics);

    diagnostics.into_report()
}

fn check_function_component(source: &str, diagnostics: &mut Diagnostics) {
    if !source.contains("import React") {
        diagnostics.error(DiagnosticKind::EmittedText, "Missing React import", "imports");
    }
    if !source.contains("export default function") {
        diagnostics.error(DiagnosticKind::EmittedText, "Missing default export function", "exports");
    }

    for cap in BOUND_IDENTIFIER.captures_iter(source) {
        if &cap[2] == "undefined" {
            diagnostics.error(
                DiagnosticKind::EmittedText,
                format!("Undefined prop value for {}", &cap[1]),
                &line_of(source, cap.get(0).map_or(0, |m| m.start())),
            );
        }
    }
}

fn check_class_component(source: &str, diagnostics: &mut Diagnostics) {
    if !source.contains("import { Component") {
        diagnostics.error(DiagnosticKind::EmittedText, "Missing Angular Component import", "imports");
    }
    if !source.contains("@Component") {
        diagnostics.error(DiagnosticKind::EmittedText, "Missing @Component decorator", "decorator");
    }
    if !source.contains("export class") {
        diagnostics.error(DiagnosticKind::EmittedText, "Missing component class export", "exports");
    }
    if !source.contains("standalone: true") {
        diagnostics.warning(
            DiagnosticKind::EmittedText,
            "Consider using standalone components for better modularity",
            "decorator",
        );
    }
    if !source.contains("imports:") {
        diagnostics.warning(
            DiagnosticKind::EmittedText,
            "Standalone components should declare their imports",
            "decorator",
        );
    }
}

fn check_interactive_tags(source: &str, diagnostics: &mut Diagnostics) {
    for tag in INTERACTIVE_TAG.find_iter(source) {
        let text = tag.as_str();
        if !text.contains("aria-") && !text.contains("label") {
            diagnostics.warning(
                DiagnosticKind::Accessibility,
                "Interactive elements should include accessibility attributes",
                &line_of(source, tag.start()),
            );
        }
    }
}

fn line_of(source: &str, offset: usize) -> String {
    format!("line {}", source[..offset].matches('\n').count() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_component_structure() {
        let report = validate_emitted_text("const x = 1;\n", BackendKind::React);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors.iter().map(|d| d.message.as_str()).collect::<Vec<_>>(),
            vec!["Missing React import", "Missing default export function"]
        );
    }

    #[test]
    fn test_undefined_binding() {
        let source = "import React from \"react\";\nexport default function P() {\n  return <Card title={undefined} count={total} />;\n}\n";
        let report = validate_emitted_text(source, BackendKind::React);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].message, "Undefined prop value for title");
        assert_eq!(report.errors[0].location.as_deref(), Some("line 3"));
    }

    #[test]
    fn test_class_component_structure() {
        let report = validate_emitted_text("@Component({})\nexport class X {}\n", BackendKind::Angular);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].message, "Missing Angular Component import");
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_interactive_tag_needs_accessible_attribute() {
        let source = "import React from \"react\";\nexport default function P() {\n  return (\n    <>\n      <Button variant={\"primary\"} />\n      <Input aria-label={\"Email\"} />\n    </>\n  );\n}\n";
        let report = validate_emitted_text(source, BackendKind::React);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, DiagnosticKind::Accessibility);
        assert_eq!(report.warnings[0].location.as_deref(), Some("line 5"));
    }

    #[test]
    fn test_arrow_handler_does_not_end_tag() {
        let source = "import React from \"react\";\nexport default function P() {\n  return (\n    <>\n      <Button onClick={() => save()} aria-label={\"Save\"} />\n      <Button onClick={() => reset()} />\n    </>\n  );\n}\n";
        let report = validate_emitted_text(source, BackendKind::React);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].location.as_deref(), Some("line 6"));
    }
}
