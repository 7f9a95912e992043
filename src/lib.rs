//! Pagesmith Core - Page Spec Compiler
//!
//! # The Six Laws (Non-Negotiable)
//! 1. The Manifest Is the Contract
//! 2. Structure Before Semantics
//! 3. Errors Block, Warnings Inform
//! 4. Deterministic Output
//! 5. One Walker, Many Backends
//! 6. Providers Suggest, Pipeline Enforces

pub mod manifest;
pub mod spec;
pub mod structure;
pub mod diagnostics;
pub mod tokens;
pub mod validation;
pub mod emitted;
pub mod codegen;
pub mod hashing;
pub mod provider;
pub mod config;
pub mod pipeline;

pub use manifest::{ComponentManifestEntry, Manifest, ManifestError, PropSchema, PropType};
pub use spec::{DataSourceDescriptor, DataSourceKind, PageMeta, PageSpec, PropValue, SpecNode};
pub use structure::{parse_page_spec, validate_structure, SchemaViolation};
pub use diagnostics::{format_report, Diagnostic, DiagnosticKind, Severity, ValidationReport};
pub use validation::{validate_spec, QualityGate, QualityGateEngine};
pub use emitted::validate_emitted_text;
pub use codegen::{compile_page, AngularBackend, BackendKind, BackendPolicy, CodegenError, GeneratedSource, ReactBackend};
pub use hashing::{canonical_json, compute_output_hash, compute_spec_hash};
pub use provider::{
    extract_spec_json, generate_spec, CompletionSource, DemoProvider, ProviderError, RetryPolicy,
    SpecProvider, TextSpecProvider,
};
pub use config::GeneratorConfig;
pub use pipeline::{GenerationOutcome, GenerationPipeline, PipelineError, PipelineInput};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
