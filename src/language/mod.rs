//! Action languages — the protocol layer between the agent loop and a
//! text generator.
//!
//! An [`ActionLanguage`] does two things: it renders goals, the tool
//! catalog, and conversation memory into a generator-ready [`Prompt`],
//! and it parses raw generator output back into an [`ActionDecision`].
//! Two interchangeable implementations ship, with deliberately
//! asymmetric error policies:
//!
//! * [`FunctionCallingLanguage`] — forgiving.  Tools travel as a
//!   structured field on the prompt for backends with native tool
//!   selection; any reply that is not a `{tool, args}` object is
//!   reinterpreted as a graceful `terminate`.  Parsing never fails.
//! * [`JsonActionLanguage`] — strict.  The tool catalog is inlined as
//!   pretty-printed JSON text and the generator is instructed to emit
//!   a fenced ```` ```action ```` block.  A missing or malformed block
//!   is a hard parse error the caller must handle.

pub mod parsing;

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::agent::Goal;
use crate::memory::{Memory, Role};
use crate::tools::ToolSchema;

// ── Prompt types ─────────────────────────────────────────────

/// A single role-tagged prompt message.
#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

/// A fully assembled prompt.
///
/// Built fresh every iteration, never mutated after construction,
/// discarded after the generator call.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub messages: Vec<PromptMessage>,
    /// Tool catalog for backends with native tool selection.  Empty
    /// when the catalog is inlined into message text instead.
    pub tools: Vec<ToolSchema>,
    pub metadata: Map<String, Value>,
}

/// The `{tool, args}` decision parsed from generator output.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionDecision {
    pub tool: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

// ── Trait ────────────────────────────────────────────────────

/// Pluggable render/parse protocol.
pub trait ActionLanguage: Send + Sync {
    /// Render goals + tool catalog + memory into a prompt.
    fn render(&self, tools: &[ToolSchema], goals: &[Goal], memory: &Memory) -> Prompt;

    /// Parse raw generator output into a decision.
    ///
    /// Whether a malformed reply is an error is a property of the
    /// concrete language — see the module docs.
    fn parse(&self, raw: &str) -> anyhow::Result<ActionDecision>;
}

// ── Shared rendering helpers ─────────────────────────────────

fn goals_message(goals: &[Goal]) -> PromptMessage {
    let mut content = String::from("# Goals\n");
    for goal in goals {
        content.push_str("## ");
        content.push_str(&goal.name);
        content.push('\n');
        content.push_str(&goal.description);
        content.push_str("\n\n");
    }
    PromptMessage {
        role: Role::System,
        content,
    }
}

fn memory_messages(memory: &Memory) -> Vec<PromptMessage> {
    memory
        .iter()
        .map(|entry| PromptMessage {
            role: entry.role,
            content: entry.content.clone(),
        })
        .collect()
}

/// Synthesize the graceful-stop decision used when a reply carries no
/// structured tool call.
fn terminate_decision(message: &str) -> ActionDecision {
    let mut args = Map::new();
    args.insert("message".into(), Value::String(message.to_string()));
    ActionDecision {
        tool: "terminate".into(),
        args,
    }
}

// ── Function-calling language ────────────────────────────────

/// Forgiving language for backends with native tool selection.
///
/// The tool catalog rides on [`Prompt::tools`] rather than in message
/// text, and [`parse`](ActionLanguage::parse) never fails: a plain-text
/// or malformed reply becomes a `terminate` decision carrying the raw
/// text as its message.
#[derive(Debug, Default)]
pub struct FunctionCallingLanguage;

impl ActionLanguage for FunctionCallingLanguage {
    fn render(&self, tools: &[ToolSchema], goals: &[Goal], memory: &Memory) -> Prompt {
        let mut messages = vec![goals_message(goals)];
        messages.extend(memory_messages(memory));
        Prompt {
            messages,
            tools: tools.to_vec(),
            metadata: Map::new(),
        }
    }

    fn parse(&self, raw: &str) -> anyhow::Result<ActionDecision> {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            if value.get("tool").is_some() && value.get("args").is_some() {
                if let Ok(decision) = serde_json::from_value::<ActionDecision>(value) {
                    return Ok(decision);
                }
            }
        }
        Ok(terminate_decision(raw))
    }
}

// ── JSON-action language ─────────────────────────────────────

/// Instruction template appended after the inlined tool catalog.
const ACTION_FORMAT: &str = r#"<Stop and think step by step. Insert your thoughts here.>

```action
{
    "tool": "tool_name",
    "args": {...fill in arguments...}
}
```"#;

/// Strict language for free-text backends.
///
/// The tool catalog is pretty-printed into a second system message and
/// the generator must answer with a fenced ```` ```action ```` block.
/// [`parse`](ActionLanguage::parse) propagates every failure — a reply
/// without a well-formed block means the generator did not follow
/// instructions, and the caller decides what to do about it.
#[derive(Debug, Default)]
pub struct JsonActionLanguage;

impl JsonActionLanguage {
    fn catalog_message(tools: &[ToolSchema]) -> PromptMessage {
        let catalog: Vec<Value> = tools.iter().map(|t| t.describe()).collect();
        let rendered =
            serde_json::to_string_pretty(&catalog).unwrap_or_else(|_| "[]".to_string());
        PromptMessage {
            role: Role::System,
            content: format!("Available Tools: {rendered}\n\n{ACTION_FORMAT}"),
        }
    }
}

impl ActionLanguage for JsonActionLanguage {
    fn render(&self, tools: &[ToolSchema], goals: &[Goal], memory: &Memory) -> Prompt {
        let mut messages = vec![goals_message(goals), Self::catalog_message(tools)];
        messages.extend(memory_messages(memory));
        Prompt {
            messages,
            tools: Vec::new(),
            metadata: Map::new(),
        }
    }

    fn parse(&self, raw: &str) -> anyhow::Result<ActionDecision> {
        let block = parsing::extract_action_block(raw)?;
        serde_json::from_str(&block).context("malformed JSON in action block")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryEntry;
    use crate::tools::{ParamType, ToolDef};

    fn sample_tools() -> Vec<ToolSchema> {
        vec![
            ToolDef::builder("read_file")
                .description("Read a file.")
                .param("path", ParamType::String, "File to read.")
                .handler(|_args| async { Ok(Value::Null) })
                .build()
                .schema,
        ]
    }

    fn sample_goals() -> Vec<Goal> {
        vec![Goal::new(1, "Explore", "Walk the tree and report back.")]
    }

    #[test]
    fn function_calling_attaches_tools_structurally() {
        let memory = Memory::new();
        let prompt = FunctionCallingLanguage.render(&sample_tools(), &sample_goals(), &memory);
        assert_eq!(prompt.tools.len(), 1);
        assert_eq!(prompt.messages.len(), 1);
        assert_eq!(prompt.messages[0].role, Role::System);
        assert!(prompt.messages[0].content.contains("# Goals"));
        assert!(prompt.messages[0].content.contains("## Explore"));
    }

    #[test]
    fn json_action_inlines_catalog_as_text() {
        let memory = Memory::new();
        let prompt = JsonActionLanguage.render(&sample_tools(), &sample_goals(), &memory);
        assert!(prompt.tools.is_empty(), "catalog is textual only");
        assert_eq!(prompt.messages.len(), 2);
        let catalog = &prompt.messages[1].content;
        assert!(catalog.contains("Available Tools:"));
        assert!(catalog.contains("read_file"));
        assert!(catalog.contains("```action"));
    }

    #[test]
    fn memory_entries_follow_the_goal_messages() {
        let mut memory = Memory::new();
        memory.append(MemoryEntry::user("list the files"));
        memory.append(MemoryEntry::assistant("{\"tool\":\"read_file\",\"args\":{}}"));

        let prompt = FunctionCallingLanguage.render(&sample_tools(), &sample_goals(), &memory);
        assert_eq!(prompt.messages.len(), 3);
        assert_eq!(prompt.messages[1].role, Role::User);
        assert_eq!(prompt.messages[2].role, Role::Assistant);
    }

    #[test]
    fn function_calling_parse_accepts_tool_object() {
        let decision = FunctionCallingLanguage
            .parse(r#"{"tool": "read_file", "args": {"path": "a.txt"}}"#)
            .unwrap();
        assert_eq!(decision.tool, "read_file");
        assert_eq!(decision.args["path"], "a.txt");
    }

    #[test]
    fn function_calling_parse_never_fails() {
        let decision = FunctionCallingLanguage
            .parse("I don't know what to do")
            .unwrap();
        assert_eq!(decision.tool, "terminate");
        assert_eq!(decision.args["message"], "I don't know what to do");
    }

    #[test]
    fn function_calling_missing_args_key_terminates() {
        let decision = FunctionCallingLanguage
            .parse(r#"{"tool": "read_file"}"#)
            .unwrap();
        assert_eq!(decision.tool, "terminate");
    }

    #[test]
    fn json_action_parse_reads_fenced_block() {
        let raw = "```action\n{\"tool\":\"terminate\",\"args\":{\"message\":\"done\"}}\n```";
        let decision = JsonActionLanguage.parse(raw).unwrap();
        assert_eq!(decision.tool, "terminate");
        assert_eq!(decision.args["message"], "done");
    }

    #[test]
    fn json_action_parse_rejects_plain_text() {
        assert!(JsonActionLanguage.parse("no fence here").is_err());
    }

    #[test]
    fn json_action_parse_rejects_bad_json() {
        assert!(JsonActionLanguage.parse("```action\nnot json\n```").is_err());
    }
}
