//! Pagesmith CLI
//!
//! Commands: components, check, generate, prompt
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation failure

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use pagesmith_core::{
    format_report, BackendKind, DemoProvider, GeneratorConfig, GenerationPipeline, Manifest,
    PipelineError, RetryPolicy,
};

#[derive(Parser)]
#[command(name = "pagesmith-cli")]
#[command(about = "Pagesmith CLI - Page Spec Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the component manifest (overrides config)
    #[arg(short, long, global = true)]
    manifest: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List manifest components
    Components,

    /// Validate a spec without generating
    Check {
        /// Spec JSON file
        spec: PathBuf,
    },

    /// Generate a page from a spec
    Generate {
        /// Spec JSON file
        spec: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate a page from a free-text prompt
    Prompt {
        /// Prompt text file
        prompt: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output directory
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Target backend (react or angular)
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// Run the external formatter on the written file
    #[arg(long)]
    format: bool,

    /// Skip the checks on emitted source
    #[arg(long)]
    no_output_check: bool,
}

impl OutputArgs {
    fn apply(&self, config: &mut GeneratorConfig) {
        if let Some(out) = &self.out {
            config.out_dir = out.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        config.format |= self.format;
        if self.no_output_check {
            config.validate_output = false;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match GeneratorConfig::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => return fail(&format!("Failed to load config: {}", e)),
    };
    if let Some(manifest) = &cli.manifest {
        config.manifest_path = manifest.clone();
    }
    match &cli.command {
        Commands::Generate { output, .. } | Commands::Prompt { output, .. } => output.apply(&mut config),
        Commands::Components | Commands::Check { .. } => {}
    }

    let manifest = match Manifest::load(&config.manifest_path) {
        Ok(m) => m,
        Err(e) => return fail(&format!("Failed to load manifest: {}", e)),
    };

    let pipeline = GenerationPipeline::with_config(manifest, config);

    match cli.command {
        Commands::Components => {
            let components: Vec<_> = pipeline
                .manifest()
                .list()
                .iter()
                .map(|c| serde_json::json!({
                    "name": c.name,
                    "selector": c.selector,
                    "import": c.import_path,
                    "required": c.required_props().collect::<Vec<_>>(),
                }))
                .collect();

            print_json(&components);
            ExitCode::SUCCESS
        }

        Commands::Check { spec } => {
            let raw = match read_spec(&spec) {
                Ok(v) => v,
                Err(e) => return fail(&e),
            };

            match pipeline.check(&raw) {
                Ok(report) => {
                    eprint!("{}", format_report(&report));
                    print_json(&report);
                    if report.is_valid {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2)
                    }
                }
                Err(e) => report_failure(&e),
            }
        }

        Commands::Generate { spec, .. } => {
            let raw = match read_spec(&spec) {
                Ok(v) => v,
                Err(e) => return fail(&e),
            };

            match pipeline.run(&pipeline.input_for(raw)) {
                Ok(outcome) => {
                    print_json(&serde_json::json!({ "success": true, "outcome": outcome }));
                    ExitCode::SUCCESS
                }
                Err(e) => report_failure(&e),
            }
        }

        Commands::Prompt { prompt, .. } => {
            let text = match fs::read_to_string(&prompt) {
                Ok(t) => t,
                Err(e) => return fail(&format!("Prompt file not found: {}: {}", prompt.display(), e)),
            };

            tracing::warn!("No model provider configured, using demo spec");
            let policy = RetryPolicy::from(&pipeline.config().retry);
            let provider = DemoProvider::default().into_spec_provider();
            match pipeline.run_from_prompt(&provider, &text, &policy).await {
                Ok(outcome) => {
                    print_json(&serde_json::json!({ "success": true, "outcome": outcome }));
                    ExitCode::SUCCESS
                }
                Err(e) => report_failure(&e),
            }
        }
    }
}

fn read_spec(path: &Path) -> Result<Value, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read spec {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Invalid spec JSON: {}", e))
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn fail(message: &str) -> ExitCode {
    print_json(&serde_json::json!({ "success": false, "error": message }));
    ExitCode::FAILURE
}

/// Validation failures exit 2 with every finding; anything else exits 1.
fn report_failure(err: &PipelineError) -> ExitCode {
    match err {
        PipelineError::Structure(violations) => {
            print_json(&serde_json::json!({ "success": false, "error": err.to_string(), "violations": violations }));
            ExitCode::from(2)
        }
        PipelineError::QualityGate(report) => {
            eprint!("{}", format_report(report));
            print_json(&serde_json::json!({ "success": false, "error": err.to_string(), "report": report }));
            ExitCode::from(2)
        }
        other => fail(&other.to_string()),
    }
}
