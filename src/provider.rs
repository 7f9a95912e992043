//! Spec Providers - Prompt to Raw Spec
//!
//! Providers suggest, the pipeline enforces: a provider only has to return
//! a JSON object with a `page` field. Retrying belongs to the caller.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("fence pattern is valid"));

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Failed to generate valid spec after {attempts} attempts. Last error: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ProviderError>,
    },
}

/// Bounded attempts with a fixed delay between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// At least one attempt is always made.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[async_trait]
pub trait SpecProvider: Send + Sync {
    fn name(&self) -> &str;

    /// One attempt: prompt in, raw spec object out.
    async fn generate(&self, prompt: &str) -> Result<Value, ProviderError>;
}

/// Run the provider under `policy`. After the last failed attempt the error
/// carries the underlying failure.
pub async fn generate_spec(
    provider: &dyn SpecProvider,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<Value, ProviderError> {
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        info!(provider = provider.name(), attempt, max_attempts = policy.max_attempts, "Generating spec");

        match provider.generate(prompt).await.and_then(require_page_field) {
            Ok(spec) => {
                info!(page = %spec["page"], "Generated spec");
                return Ok(spec);
            }
            Err(err) => {
                warn!(attempt, error = %err, "Spec generation attempt failed");
                last_error = Some(err);
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    Err(ProviderError::Exhausted {
        attempts: policy.max_attempts,
        last: Box::new(
            last_error.unwrap_or_else(|| ProviderError::Network("no attempt was made".into())),
        ),
    })
}

fn require_page_field(spec: Value) -> Result<Value, ProviderError> {
    if !spec.is_object() {
        return Err(ProviderError::SchemaMismatch("Generated spec is not a JSON object".into()));
    }
    if spec.get("page").is_none() {
        return Err(ProviderError::SchemaMismatch(
            "Generated spec missing required 'page' field".into(),
        ));
    }
    Ok(spec)
}

/// Pull the spec out of a free-text response: raw JSON, a fenced block, or
/// the outermost `{...}` span.
pub fn extract_spec_json(response: &str) -> Result<Value, ProviderError> {
    let trimmed = response.trim();

    let candidate = if let Some(cap) = FENCED_JSON.captures(trimmed) {
        cap.get(1).map_or("", |m| m.as_str()).trim()
    } else if trimmed.starts_with('{') {
        trimmed
    } else {
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => trimmed,
        }
    };

    serde_json::from_str(candidate)
        .map_err(|e| ProviderError::MalformedResponse(format!("Invalid JSON response: {}", e)))
}

/// Answers a prompt with free text, the way a model client does.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Turns a text completion into a raw spec via `extract_spec_json`.
pub struct TextSpecProvider<S> {
    source: S,
}

impl<S: CompletionSource> TextSpecProvider<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: CompletionSource> SpecProvider for TextSpecProvider<S> {
    fn name(&self) -> &str {
        self.source.name()
    }

    async fn generate(&self, prompt: &str) -> Result<Value, ProviderError> {
        let response = self.source.complete(prompt).await?;
        extract_spec_json(&response)
    }
}

/// Replies with a fixed spec in a fenced block. Used when no model is
/// configured.
pub struct DemoProvider {
    spec: Value,
}

impl DemoProvider {
    pub fn new(spec: Value) -> Self {
        Self { spec }
    }

    /// The demo source wrapped for the spec pipeline.
    pub fn into_spec_provider(self) -> TextSpecProvider<Self> {
        TextSpecProvider::new(self)
    }

    pub fn demo_spec() -> Value {
        json!({
            "page": "DemoPage",
            "route": "/demo",
            "meta": {
                "title": "Demo Page",
                "description": "Generated from prompt (demo mode)"
            },
            "sections": [
                {
                    "type": "CardComponent",
                    "inputs": { "title": "AI Generated (Demo)" },
                    "children": [
                        {
                            "type": "TextComponent",
                            "text": "This component was generated from a prompt in demo mode",
                            "inputs": { "size": "md" }
                        },
                        {
                            "type": "ButtonComponent",
                            "text": "Click me",
                            "inputs": { "variant": "primary" }
                        }
                    ]
                }
            ]
        })
    }
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new(Self::demo_spec())
    }
}

#[async_trait]
impl CompletionSource for DemoProvider {
    fn name(&self) -> &str {
        "demo"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Ok(format!("Here is the page spec:\n```json\n{}\n```\n", self.spec))
    }
}
