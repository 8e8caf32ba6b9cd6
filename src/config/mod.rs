//! Configuration loaded from `config.yaml`.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Everything is optional: a missing file or an empty document yields
/// workable defaults (stub generator, function-calling language).
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model provider definitions.
    #[serde(default)]
    pub models: Vec<ModelConfig>,
    /// Runtime defaults applied when CLI flags are absent.
    #[serde(default)]
    pub defaults: Defaults,
}

/// A configured model backend.
#[derive(Debug, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Unique identifier for this entry (e.g. "openai-default").
    pub id: String,
    /// Provider kind: "openai", "openai-compat", "ollama", etc.
    pub provider: String,
    /// Model name to request (e.g. "gpt-4o-mini").
    #[serde(default)]
    pub model: Option<String>,
    /// API key (plain text or env-var reference like `$OPENAI_API_KEY`).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Endpoint URL for compatible providers.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Runtime defaults.
#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Model config id to use when `--model` is not given.
    #[serde(default)]
    pub model: Option<String>,
    /// Action language: "function-calling" or "json-action".
    #[serde(default = "default_language")]
    pub language: String,
    /// Iteration budget per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model: None,
            language: default_language(),
            max_iterations: default_max_iterations(),
        }
    }
}

fn default_language() -> String {
    "function-calling".to_string()
}

fn default_max_iterations() -> usize {
    10
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the built-in defaults; a present but
    /// malformed file is an error.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_yaml_ng::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Find a model definition by id.
    pub fn model(&self, id: &str) -> Option<&ModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }
}
