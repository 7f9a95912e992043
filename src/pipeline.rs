//! Generation Pipeline - Single Entry Point
//!
//! CRITICAL: run MUST validate before emitting. No bypass.
//! Nothing is written unless structural and quality-gate errors are both empty.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codegen::{backend_for, compile_page, BackendKind, CodegenError};
use crate::config::GeneratorConfig;
use crate::diagnostics::{format_report, ValidationReport};
use crate::emitted::validate_emitted_text;
use crate::hashing::{compute_output_hash, compute_spec_hash};
use crate::manifest::Manifest;
use crate::provider::{generate_spec, ProviderError, RetryPolicy, SpecProvider};
use crate::spec::PageSpec;
use crate::structure::{parse_page_spec, SchemaViolation};
use crate::validation::QualityGateEngine;
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Spec structure invalid: {}", join_violations(.0))]
    Structure(Vec<SchemaViolation>),

    #[error("Quality gates failed with {} error(s)", .0.errors.len())]
    QualityGate(ValidationReport),

    #[error(transparent)]
    Codegen(#[from] CodegenError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn join_violations(violations: &[SchemaViolation]) -> String {
    violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Where emitted source goes.
pub trait OutputSink: Send + Sync {
    /// Write the file once and return its path.
    fn write(&self, file_name: &str, contents: &str) -> Result<PathBuf, PipelineError>;
}

/// Writes into a directory, creating it if needed.
pub struct FsSink {
    out_dir: PathBuf,
}

impl FsSink {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self { out_dir: out_dir.into() }
    }
}

impl OutputSink for FsSink {
    fn write(&self, file_name: &str, contents: &str) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.out_dir).map_err(|source| PipelineError::Io {
            path: self.out_dir.clone(),
            source,
        })?;
        let path = self.out_dir.join(file_name);
        fs::write(&path, contents).map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[derive(Debug, Error)]
pub enum FormatterError {
    #[error("Formatter command is empty")]
    EmptyCommand,

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },
}

/// Rewrites a written file in place. Failure is reported as a warning.
pub trait Formatter: Send + Sync {
    fn format(&self, path: &Path) -> Result<(), FormatterError>;
}

/// Runs an external command with the file path as its last argument.
pub struct CommandFormatter {
    command: Vec<String>,
}

impl CommandFormatter {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Formatter for CommandFormatter {
    fn format(&self, path: &Path) -> Result<(), FormatterError> {
        let (program, args) = self.command.split_first().ok_or(FormatterError::EmptyCommand)?;
        let status = Command::new(program)
            .args(args)
            .arg(path)
            .status()
            .map_err(|source| FormatterError::Spawn {
                program: program.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(FormatterError::Failed {
                program: program.clone(),
                status: status.to_string(),
            })
        }
    }
}

/// One run's input: the raw spec plus per-run options.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub spec: Value,
    pub backend: BackendKind,
    pub out_dir: PathBuf,
    pub validate_output: bool,
    pub format: bool,
}

impl PipelineInput {
    pub fn new(spec: Value, config: &GeneratorConfig) -> Self {
        Self {
            spec,
            backend: config.backend,
            out_dir: config.out_dir.clone(),
            validate_output: config.validate_output,
            format: config.format,
        }
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = out_dir.into();
        self
    }
}

/// Record of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub engine_version: String,
    pub page: String,
    pub route: String,
    pub backend: BackendKind,
    pub path: PathBuf,
    pub spec_hash: String,
    pub output_hash: String,
    pub components: Vec<String>,
    pub quality: ValidationReport,
    /// Present when the emitted-text checks ran.
    pub emitted: Option<ValidationReport>,
    pub formatted: bool,
}

/// The generation pipeline - single entry point for spec to source
pub struct GenerationPipeline {
    manifest: Manifest,
    engine: QualityGateEngine,
    config: GeneratorConfig,
    formatter: Box<dyn Formatter>,
}

impl GenerationPipeline {
    pub fn new(manifest: Manifest) -> Self {
        Self::with_config(manifest, GeneratorConfig::default())
    }

    pub fn with_config(manifest: Manifest, config: GeneratorConfig) -> Self {
        let formatter = Box::new(CommandFormatter::new(config.formatter.clone()));
        Self {
            manifest,
            engine: QualityGateEngine::new(),
            config,
            formatter,
        }
    }

    pub fn with_formatter(mut self, formatter: Box<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Input for `spec` with every option taken from configuration.
    pub fn input_for(&self, spec: Value) -> PipelineInput {
        PipelineInput::new(spec, &self.config)
    }

    /// Quality-gate validation of a parsed spec.
    ///
    /// This is the ONLY quality-gate entry point.
    pub fn validate(&self, spec: &PageSpec) -> ValidationReport {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        self.engine.validate_spec(spec, &self.manifest)
    }

    /// Structural and quality-gate validation, no emission.
    pub fn check(&self, raw: &Value) -> Result<ValidationReport, PipelineError> {
        let spec = parse_page_spec(raw).map_err(PipelineError::Structure)?;
        Ok(self.validate(&spec))
    }

    /// Validate, emit and write into `input.out_dir`.
    pub fn run(&self, input: &PipelineInput) -> Result<GenerationOutcome, PipelineError> {
        self.run_with_sink(input, &FsSink::new(&input.out_dir))
    }

    /// CRITICAL: validation always runs first. No bypass possible.
    pub fn run_with_sink(
        &self,
        input: &PipelineInput,
        sink: &dyn OutputSink,
    ) -> Result<GenerationOutcome, PipelineError> {
        let spec = parse_page_spec(&input.spec).map_err(|violations| {
            warn!(count = violations.len(), "Spec failed structural validation");
            PipelineError::Structure(violations)
        })?;
        info!(page = %spec.page, backend = %input.backend, "Generating page");

        let quality = self.validate(&spec);
        if !quality.is_valid {
            warn!(page = %spec.page, errors = quality.errors.len(), "Quality gates failed");
            return Err(PipelineError::QualityGate(quality));
        }
        if quality.has_warnings() {
            warn!(page = %spec.page, "Quality warnings:\n{}", format_report(&quality));
        }

        let backend = backend_for(input.backend, &self.config.data_layer);
        let generated = compile_page(backend.as_ref(), &spec, &self.manifest)?;
        let spec_hash = compute_spec_hash(&spec)?;
        let output_hash = compute_output_hash(generated.backend, &generated.source);

        let path = sink.write(&generated.file_name, &generated.source)?;
        info!(path = %path.display(), "Wrote page");

        let emitted = input.validate_output.then(|| {
            let report = validate_emitted_text(&generated.source, generated.backend);
            if !report.is_clean() {
                warn!(path = %path.display(), "Generated code findings:\n{}", format_report(&report));
            }
            report
        });

        let formatted = input.format && self.format_file(&path);

        Ok(GenerationOutcome {
            id: Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            page: spec.page.clone(),
            route: spec.route.clone(),
            backend: generated.backend,
            path,
            spec_hash,
            output_hash,
            components: generated.components,
            quality,
            emitted,
            formatted,
        })
    }

    /// Ask `provider` for a spec, then run it with configured options.
    pub async fn run_from_prompt(
        &self,
        provider: &dyn SpecProvider,
        prompt: &str,
        policy: &RetryPolicy,
    ) -> Result<GenerationOutcome, PipelineError> {
        let spec = generate_spec(provider, prompt, policy).await?;
        self.run(&self.input_for(spec))
    }

    fn format_file(&self, path: &Path) -> bool {
        match self.formatter.format(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Formatted");
                true
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Formatting failed");
                false
            }
        }
    }
}
