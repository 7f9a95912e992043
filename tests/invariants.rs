//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use pagesmith_core::{
    hashing::canonical_json, BackendKind, GenerationPipeline, Manifest, PipelineError,
};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn create_pipeline() -> GenerationPipeline {
    let manifest = Manifest::from_value(json!({
        "Card": {"selector": "app-card", "import": "@your-ds/components"},
        "Stat": {"selector": "app-stat", "import": "@your-ds/components"},
        "DataTable": {
            "selector": "app-data-table",
            "import": "@your-ds/components",
            "props": {"columns": {"type": "array", "required": true}}
        }
    }))
    .unwrap();
    GenerationPipeline::new(manifest)
}

fn dashboard_spec(card_type: &str) -> Value {
    json!({
        "page": "Dashboard",
        "route": "/dashboard",
        "sections": [{
            "type": card_type,
            "props": {"title": "Key Metrics"},
            "children": [{"type": "Stat", "props": {"label": "Users", "value": "10"}}]
        }]
    })
}

#[test]
fn invariant_run_validates_before_writing() {
    let pipeline = create_pipeline();
    let out = TempDir::new().unwrap();
    let target = out.path().join("pages");

    let input = pipeline.input_for(dashboard_spec("Kard")).with_out_dir(&target);
    let result = pipeline.run(&input);

    // Must fail - validation is enforced, and nothing touches the disk
    let err = result.unwrap_err();
    assert!(matches!(err, PipelineError::QualityGate(_)));
    assert!(err.to_string().contains("Quality gates failed"));
    assert!(!target.exists());
}

#[test]
fn invariant_structure_violations_reported_in_full() {
    let pipeline = create_pipeline();
    let out = TempDir::new().unwrap();

    let input = pipeline
        .input_for(json!({"route": 7, "sections": [{"props": {}}]}))
        .with_out_dir(out.path());
    let err = pipeline.run(&input).unwrap_err();

    let PipelineError::Structure(violations) = err else {
        panic!("expected structural failure");
    };
    let paths: Vec<_> = violations.iter().map(|v| v.path.as_str()).collect();
    assert!(paths.contains(&"page"));
    assert!(paths.contains(&"route"));
    assert!(paths.contains(&"sections[0].type"));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn invariant_valid_spec_writes_one_file() {
    let pipeline = create_pipeline();
    let out = TempDir::new().unwrap();

    let input = pipeline.input_for(dashboard_spec("Card")).with_out_dir(out.path());
    let outcome = pipeline.run(&input).unwrap();

    assert_eq!(outcome.path, out.path().join("dashboard.component.ts"));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 1);

    let written = fs::read_to_string(&outcome.path).unwrap();
    assert_eq!(
        outcome.output_hash,
        pagesmith_core::compute_output_hash(BackendKind::Angular, &written)
    );
    assert!(outcome.quality.is_valid);
    assert!(outcome.emitted.as_ref().unwrap().is_valid);
}

#[test]
fn invariant_output_idempotent() {
    // Same spec must produce byte-identical output
    let pipeline = create_pipeline();
    let out = TempDir::new().unwrap();

    for backend in [BackendKind::React, BackendKind::Angular] {
        let input = pipeline
            .input_for(dashboard_spec("Card"))
            .with_backend(backend)
            .with_out_dir(out.path());

        let first = pipeline.run(&input).unwrap();
        let first_source = fs::read_to_string(&first.path).unwrap();
        let second = pipeline.run(&input).unwrap();
        let second_source = fs::read_to_string(&second.path).unwrap();

        assert_eq!(first_source, second_source);
        assert_eq!(first.output_hash, second.output_hash);
        assert_eq!(first.spec_hash, second.spec_hash);
        // Run identity is per run
        assert_ne!(first.id, second.id);
    }
}

#[test]
fn invariant_spec_hash_ignores_key_order() {
    let pipeline = create_pipeline();
    let out = TempDir::new().unwrap();

    let reordered = json!({
        "sections": [{
            "children": [{"props": {"value": "10", "label": "Users"}, "type": "Stat"}],
            "props": {"title": "Key Metrics"},
            "type": "Card"
        }],
        "route": "/dashboard",
        "page": "Dashboard"
    });

    let a = pipeline.run(&pipeline.input_for(dashboard_spec("Card")).with_out_dir(out.path())).unwrap();
    let b = pipeline.run(&pipeline.input_for(reordered).with_out_dir(out.path())).unwrap();
    assert_eq!(a.spec_hash, b.spec_hash);
}

#[test]
fn invariant_canonical_json_deterministic() {
    let obj1 = json!({"z": 1, "a": 2, "m": {"b": 1, "a": 2}});
    let obj2 = json!({"a": 2, "m": {"a": 2, "b": 1}, "z": 1});

    let c1 = canonical_json(&obj1).unwrap();
    let c2 = canonical_json(&obj2).unwrap();

    // Must be identical despite different input ordering
    assert_eq!(c1, c2);
}

#[test]
fn invariant_check_reports_every_error() {
    let pipeline = create_pipeline();

    let report = pipeline
        .check(&json!({"page": "Claims", "route": "/claims", "sections": [{"type": "DataTable", "props": {}}]}))
        .unwrap();

    assert!(!report.is_valid);
    assert!(report.errors.iter().any(|d| d.message.contains("columns")));
}

#[cfg(feature = "test-hooks")]
#[test]
fn invariant_run_calls_validate() {
    use pagesmith_core::pipeline::get_validation_call_count;

    let pipeline = create_pipeline();
    let out = TempDir::new().unwrap();

    let before = get_validation_call_count();
    pipeline
        .run(&pipeline.input_for(dashboard_spec("Card")).with_out_dir(out.path()))
        .unwrap();
    assert!(get_validation_call_count() > before);
}

#[tokio::test]
async fn invariant_prompt_path_validates_extracted_spec() {
    use pagesmith_core::{DemoProvider, GeneratorConfig, RetryPolicy};
    use std::time::Duration;

    let manifest = Manifest::from_value(json!({
        "CardComponent": {"selector": "app-card", "import": "@your-ds/angular"},
        "TextComponent": {"selector": "app-text", "import": "@your-ds/angular"},
        "ButtonComponent": {"selector": "app-button", "import": "@your-ds/angular"}
    }))
    .unwrap();
    let out = TempDir::new().unwrap();
    let config = GeneratorConfig {
        out_dir: out.path().to_path_buf(),
        ..GeneratorConfig::default()
    };
    let pipeline = GenerationPipeline::with_config(manifest, config);

    let provider = DemoProvider::default().into_spec_provider();
    let outcome = pipeline
        .run_from_prompt(&provider, "a demo page", &RetryPolicy::new(1, Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(outcome.page, "DemoPage");
    assert_eq!(outcome.path, out.path().join("demopage.component.ts"));
    assert!(outcome.path.exists());
}
