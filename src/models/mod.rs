//! Generator abstractions.
//!
//! Defines the [`Generator`] trait — the external collaborator that
//! turns a rendered [`Prompt`] into raw model text — plus the concrete
//! [`OpenAIGenerator`], the credential-free [`StubGenerator`], and the
//! [`build_generator`] factory.

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::language::Prompt;
use crate::memory::Role;
use crate::tools::ToolSchema;

pub use openai::OpenAIGenerator;

// ---------------------------------------------------------------------------
// Generator trait
// ---------------------------------------------------------------------------

/// Trait implemented by every model backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce the next raw response for `prompt`.
    ///
    /// Returns plain text, or — when the backend natively selected a
    /// tool — a JSON string of shape `{"tool": <name>, "args": {…}}`.
    /// Network and API failures surface as errors; the agent loop
    /// treats them as fatal for the run.
    async fn generate(&self, prompt: &Prompt) -> anyhow::Result<String>;
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

/// Serialise prompt messages into the chat-completions array format.
pub fn serialize_messages(prompt: &Prompt) -> Vec<Value> {
    prompt
        .messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect()
}

/// Convert tool schemas to the native `tools` array format.
pub fn serialize_tools(tools: &[ToolSchema]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters_json(),
                },
            })
        })
        .collect()
}

/// Extract a native tool call from a chat-completion response and
/// re-encode it as the canonical `{"tool", "args"}` decision string.
///
/// Checks the modern `tool_calls` array first (first call wins), then
/// the legacy `function_call` field.  Returns `None` for plain-text
/// replies.
pub fn parse_tool_call(response: &Value) -> Option<String> {
    let message = response.get("choices")?.get(0)?.get("message")?;

    if let Some(calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        if let Some(func) = calls.first().and_then(|c| c.get("function")) {
            return encode_decision(func);
        }
    }

    // Legacy `function_call` field.
    if let Some(func) = message.get("function_call").filter(|v| v.is_object()) {
        return encode_decision(func);
    }

    None
}

fn encode_decision(func: &Value) -> Option<String> {
    let name = func.get("name")?.as_str()?;
    let raw_args = func
        .get("arguments")
        .and_then(|a| a.as_str())
        .unwrap_or("{}");
    let args: Value = serde_json::from_str(raw_args).unwrap_or_else(|_| json!({}));
    serde_json::to_string(&json!({ "tool": name, "args": args })).ok()
}

// ---------------------------------------------------------------------------
// Stub generator
// ---------------------------------------------------------------------------

/// Development fallback used when no model credentials are configured.
///
/// Emits a fenced terminate decision: the strict language parses the
/// block directly, and the forgiving language wraps the raw text in a
/// terminate of its own — either way the run ends gracefully instead of
/// spinning against a missing backend.
pub struct StubGenerator;

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, prompt: &Prompt) -> anyhow::Result<String> {
        let last_user = prompt
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let decision = json!({
            "tool": "terminate",
            "args": { "message": format!("[stub] no model configured; echoing: {last_user}") },
        });
        Ok(format!("```action\n{decision}\n```"))
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Resolve an API key: config value → env var → empty string.
///
/// If the config value starts with `$`, it's treated as an env-var
/// reference.  Falls back to `{PROVIDER}_API_KEY`.
fn resolve_api_key(config_key: Option<&str>, provider: &str) -> String {
    if let Some(key) = config_key {
        if let Some(var) = key.strip_prefix('$') {
            return std::env::var(var).unwrap_or_default();
        }
        if !key.is_empty() {
            return key.to_string();
        }
    }
    let env_name = format!("{}_API_KEY", provider.to_uppercase().replace('-', "_"));
    std::env::var(env_name).unwrap_or_default()
}

/// Build a concrete generator from a provider id and model name.
///
/// * `openai` and compatible ids (`openai-compat`, `openrouter`,
///   `ollama`, …) create an [`OpenAIGenerator`]; compatible providers
///   require an explicit `endpoint` and may run keyless (local servers).
/// * Missing credentials or an unknown provider fall back to the
///   [`StubGenerator`] with a warning rather than failing startup.
pub fn build_generator(
    provider: &str,
    model: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> Arc<dyn Generator> {
    let compat = matches!(
        provider,
        "openai-compat" | "openai_compat" | "compat" | "openrouter" | "ollama" | "groq"
            | "together" | "fireworks" | "mistral" | "lmstudio" | "vllm" | "deepseek" | "xai"
    );

    if compat {
        // NB: must come before the `contains("openai")` catch-all.
        let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) else {
            warn!(provider, "compatible provider requires an endpoint — using stub");
            return Arc::new(StubGenerator);
        };
        let key = resolve_api_key(api_key, provider);
        return Arc::new(OpenAIGenerator::with_config(
            key,
            endpoint.to_string(),
            model.to_string(),
        ));
    }

    if provider.contains("openai") {
        let key = match api_key {
            Some(_) => resolve_api_key(api_key, provider),
            None => std::env::var("OPENAI_API_KEY").unwrap_or_default(),
        };
        if key.is_empty() {
            warn!("provider \"openai\" requested but no API key available — using stub");
            return Arc::new(StubGenerator);
        }
        let endpoint = endpoint
            .filter(|e| !e.is_empty())
            .unwrap_or(openai::DEFAULT_ENDPOINT);
        return Arc::new(OpenAIGenerator::with_config(
            key,
            endpoint.to_string(),
            model.to_string(),
        ));
    }

    warn!(provider, "unknown provider id — using stub generator");
    Arc::new(StubGenerator)
}
