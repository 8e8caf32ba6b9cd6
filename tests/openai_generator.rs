//! Contract tests for the OpenAI-compatible generator against a mock
//! HTTP server.

use scuttle::language::{Prompt, PromptMessage};
use scuttle::memory::Role;
use scuttle::models::{Generator, OpenAIGenerator};
use scuttle::tools::{ParamType, ToolDef};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generator_for(server: &MockServer) -> OpenAIGenerator {
    OpenAIGenerator::with_config(
        "sk-test".into(),
        format!("{}/v1/chat/completions", server.uri()),
        "gpt-4o-mini".into(),
    )
}

fn plain_prompt() -> Prompt {
    Prompt {
        messages: vec![
            PromptMessage {
                role: Role::System,
                content: "# Goals".into(),
            },
            PromptMessage {
                role: Role::User,
                content: "hello".into(),
            },
        ],
        tools: Vec::new(),
        metadata: serde_json::Map::new(),
    }
}

fn prompt_with_tools() -> Prompt {
    let schema = ToolDef::builder("read_file")
        .description("Read a file.")
        .param("path", ParamType::String, "File to read.")
        .handler(|_args| async { Ok(Value::Null) })
        .build()
        .schema;
    Prompt {
        tools: vec![schema],
        ..plain_prompt()
    }
}

#[tokio::test]
async fn plain_reply_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "Hi there!" },
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = generator_for(&server)
        .generate(&plain_prompt())
        .await
        .unwrap();
    assert_eq!(reply, "Hi there!");
}

#[tokio::test]
async fn native_tool_call_is_reencoded_as_decision() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "read_file",
                            "arguments": "{\"path\": \"README.md\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let reply = generator_for(&server)
        .generate(&prompt_with_tools())
        .await
        .unwrap();

    let decision: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(decision["tool"], "read_file");
    assert_eq!(decision["args"]["path"], "README.md");
}

#[tokio::test]
async fn tool_catalog_is_sent_in_native_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "tool_choice": "auto",
            "tools": [{
                "type": "function",
                "function": { "name": "read_file" }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "ok" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = generator_for(&server)
        .generate(&prompt_with_tools())
        .await
        .unwrap();
    assert_eq!(reply, "ok");
}

#[tokio::test]
async fn non_success_status_is_an_error_with_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let err = generator_for(&server)
        .generate(&plain_prompt())
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("429"), "status surfaces: {msg}");
    assert!(msg.contains("rate limited"), "body surfaces: {msg}");
}
