//! OpenAI-compatible chat-completions generator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::Generator;
use crate::language::Prompt;

/// Default endpoint for OpenAI chat completions.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Generator that talks to an OpenAI-compatible chat completions API.
pub struct OpenAIGenerator {
    api_key: String,
    endpoint: String,
    client: Client,
    /// Model name sent in the request body (e.g. "gpt-4o-mini").
    model: String,
}

impl Default for OpenAIGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAIGenerator {
    /// Create a new generator.
    ///
    /// Reads `OPENAI_API_KEY` from the environment.  Panics if the
    /// variable is missing — fail fast at startup rather than at first
    /// request.
    pub fn new() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set");
        Self::with_config(api_key, DEFAULT_ENDPOINT.to_string(), "gpt-4o-mini".to_string())
    }

    /// Create a generator with explicit configuration (useful for tests
    /// or non-default endpoints).
    pub fn with_config(api_key: String, endpoint: String, model: String) -> Self {
        Self {
            api_key,
            endpoint,
            client: Client::builder()
                .timeout(Duration::from_secs(90))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
            model,
        }
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    /// Send the prompt to the chat completions endpoint.
    ///
    /// When the prompt carries a tool catalog it is attached in the
    /// native `tools` format; a tool call in the response is re-encoded
    /// as the canonical `{"tool", "args"}` decision string, otherwise
    /// the first choice's content is returned verbatim.
    async fn generate(&self, prompt: &Prompt) -> anyhow::Result<String> {
        let api_messages = super::serialize_messages(prompt);

        let mut body = json!({
            "model": self.model,
            "messages": api_messages,
        });

        if !prompt.tools.is_empty() {
            body["tools"] = Value::Array(super::serialize_tools(&prompt.tools));
            body["tool_choice"] = json!("auto");
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("chat completions API returned {status}: {text}");
        }

        let response: Value = resp.json().await?;

        if let Some(decision) = super::parse_tool_call(&response) {
            return Ok(decision);
        }

        Ok(response["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::PromptMessage;
    use crate::memory::Role;
    use crate::tools::{ParamType, ToolDef};

    /// Smoke test: generator can be constructed with explicit config
    /// (no env var needed).
    #[test]
    fn construct_with_config() {
        let g = OpenAIGenerator::with_config(
            "sk-test".into(),
            "http://localhost:1234/v1/chat/completions".into(),
            "gpt-4o-mini".into(),
        );
        assert_eq!(g.model, "gpt-4o-mini");
    }

    /// Build the JSON request body the same way `generate` does and
    /// verify its structure — no network call needed.
    #[test]
    fn request_body_includes_tools_when_present() {
        let schema = ToolDef::builder("read_file")
            .description("Read a file.")
            .param("path", ParamType::String, "File to read.")
            .handler(|_args| async { Ok(Value::Null) })
            .build()
            .schema;

        let prompt = Prompt {
            messages: vec![PromptMessage {
                role: Role::System,
                content: "# Goals".into(),
            }],
            tools: vec![schema],
            metadata: serde_json::Map::new(),
        };

        let mut body = json!({
            "model": "gpt-4o-mini",
            "messages": super::super::serialize_messages(&prompt),
        });
        if !prompt.tools.is_empty() {
            body["tools"] = Value::Array(super::super::serialize_tools(&prompt.tools));
            body["tool_choice"] = json!("auto");
        }

        assert_eq!(body["messages"][0]["role"], "system");
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "read_file");
        assert_eq!(
            tools[0]["function"]["parameters"]["properties"]["path"]["type"],
            "string"
        );
        assert_eq!(body["tool_choice"], "auto");
    }

    /// Parse a realistic response to verify extraction logic — no
    /// network call needed.
    #[test]
    fn plain_reply_content_extracted() {
        let fake_response = json!({
            "id": "chatcmpl-abc123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Hi there!" },
                "finish_reason": "stop"
            }]
        });

        let content = fake_response["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("");
        assert_eq!(content, "Hi there!");
    }

    /// Edge case: empty choices array should yield an empty string
    /// rather than panic.
    #[test]
    fn empty_choices_yield_empty_string() {
        let fake_response = json!({ "choices": [] });
        let content = fake_response["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("");
        assert_eq!(content, "");
    }
}
