//! Tool catalog and registry.
//!
//! A [`ToolDef`] pairs the static description of a callable capability
//! (its [`ToolSchema`]) with the async binding that implements it.
//! Definitions are built explicitly with [`ToolDef::builder`] — the
//! parameter list declared on the builder doubles as the binding's
//! positional calling convention, so no runtime introspection is
//! needed.
//!
//! A [`ToolRegistry`] maps tool names to their definitions.  Tools are
//! added one at a time with [`ToolRegistry::register`] or in bulk with
//! [`ToolRegistry::discover`], which walks a set of [`ToolProvider`]s.
//! Each agent owns its own registry instance; after setup it is shared
//! read-only.

pub mod builtins;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

// ── Parameter schema ─────────────────────────────────────────

/// Schema type tag for a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

/// One declared parameter.  Declaration order on the builder is the
/// binding's positional order.
#[derive(Debug, Clone)]
pub struct ToolParam {
    pub name: String,
    pub ty: ParamType,
    pub description: Option<String>,
    pub required: bool,
}

// ── Tool schema ──────────────────────────────────────────────

/// Static description of a tool as presented to the generator.
#[derive(Debug, Clone)]
pub struct ToolSchema {
    /// Short machine-friendly name (e.g. `"read_file"`), unique within
    /// one registry.
    pub name: String,
    /// Human-readable one-liner describing what the tool does.
    pub description: String,
    /// Declared parameters in declaration order.
    pub parameters: Vec<ToolParam>,
    /// When true, dispatching this tool ends the agent run.
    pub terminal: bool,
}

impl ToolSchema {
    /// Render the parameter list as a JSON-Schema `object`.
    pub fn parameters_json(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for param in &self.parameters {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), json!(param.ty.as_str()));
            if let Some(ref desc) = param.description {
                prop.insert("description".into(), json!(desc));
            }
            properties.insert(param.name.clone(), Value::Object(prop));
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Catalog entry form used when inlining the tool into prompt text.
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "args": self.parameters_json(),
        })
    }
}

// ── Bindings ─────────────────────────────────────────────────

/// Async handler invoked with coerced positional arguments, one per
/// declared parameter.
pub type ToolFn = Arc<
    dyn Fn(Vec<Value>) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>
        + Send
        + Sync,
>;

/// A schema plus the binding that implements it.
#[derive(Clone)]
pub struct ToolDef {
    pub schema: ToolSchema,
    pub handler: Option<ToolFn>,
}

impl ToolDef {
    /// Start building a definition for the tool named `name`.
    pub fn builder(name: impl Into<String>) -> ToolDefBuilder {
        ToolDefBuilder {
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
            terminal: false,
            handler: None,
        }
    }
}

/// Builder for [`ToolDef`] — the registration-time descriptor pairing
/// name, parameter list, and handler.
pub struct ToolDefBuilder {
    name: String,
    description: String,
    parameters: Vec<ToolParam>,
    terminal: bool,
    handler: Option<ToolFn>,
}

impl ToolDefBuilder {
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Declare a required parameter.  Position follows declaration order.
    pub fn param(
        mut self,
        name: impl Into<String>,
        ty: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(ToolParam {
            name: name.into(),
            ty,
            description: Some(description.into()),
            required: true,
        });
        self
    }

    /// Declare an optional parameter.  Missing optionals reach the
    /// handler as `null`.
    pub fn optional(
        mut self,
        name: impl Into<String>,
        ty: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(ToolParam {
            name: name.into(),
            ty,
            description: Some(description.into()),
            required: false,
        });
        self
    }

    /// Mark the tool terminal — dispatching it ends the agent run.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Attach the async handler implementing the tool.
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |args| Box::pin(f(args))));
        self
    }

    pub fn build(self) -> ToolDef {
        let description = if self.description.is_empty() {
            // Placeholder for tools registered without a description.
            format!("Description for {}", self.name)
        } else {
            self.description
        };
        ToolDef {
            schema: ToolSchema {
                name: self.name,
                description,
                parameters: self.parameters,
                terminal: self.terminal,
            },
            handler: self.handler,
        }
    }
}

// ── Providers ────────────────────────────────────────────────

/// A source of tool definitions for bulk discovery.
///
/// Stateless providers hand out definitions whose handlers capture
/// nothing mutable; stateful providers (e.g. a visited-paths tracker)
/// capture shared state inside their handlers at definition time.
/// Either way the registry and dispatcher treat the result uniformly.
pub trait ToolProvider {
    fn tools(&self) -> Vec<ToolDef>;
}

// ── Registry ─────────────────────────────────────────────────

struct RegistryEntry {
    schema: ToolSchema,
    handler: ToolFn,
}

/// Maps tool names to their schema + binding.
///
/// One instance per agent; construct, populate, then share read-only.
#[derive(Default)]
pub struct ToolRegistry {
    entries: Vec<RegistryEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its schema name.
    ///
    /// Duplicate names overwrite the previous entry (last write wins);
    /// the overwrite is logged so re-registration stays observable.
    pub fn register(&mut self, def: ToolDef) -> anyhow::Result<()> {
        anyhow::ensure!(!def.schema.name.is_empty(), "tool name must not be empty");
        let handler = def
            .handler
            .ok_or_else(|| anyhow::anyhow!("tool '{}' has no handler", def.schema.name))?;

        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.schema.name == def.schema.name)
        {
            warn!(tool = %def.schema.name, "re-registering tool, previous binding replaced");
            existing.schema = def.schema;
            existing.handler = handler;
        } else {
            debug!(tool = %def.schema.name, terminal = def.schema.terminal, "tool registered");
            self.entries.push(RegistryEntry {
                schema: def.schema,
                handler,
            });
        }
        Ok(())
    }

    /// Register every definition exposed by the given providers.
    ///
    /// A definition that fails to register (empty name, missing
    /// handler) is skipped with a warning; the rest of the pass
    /// continues.  Returns the number of tools registered.
    pub fn discover(&mut self, providers: &[&dyn ToolProvider]) -> usize {
        let mut registered = 0;
        for provider in providers {
            for def in provider.tools() {
                let name = def.schema.name.clone();
                match self.register(def) {
                    Ok(()) => registered += 1,
                    Err(e) => warn!(tool = %name, error = %e, "skipping tool during discovery"),
                }
            }
        }
        debug!(registered, total = self.entries.len(), "tool discovery pass complete");
        registered
    }

    /// Look up a tool's schema and binding by name.
    pub fn lookup(&self, name: &str) -> Option<(&ToolSchema, &ToolFn)> {
        self.entries
            .iter()
            .find(|e| e.schema.name == name)
            .map(|e| (&e.schema, &e.handler))
    }

    /// Look up just the schema by name.
    pub fn schema(&self, name: &str) -> Option<&ToolSchema> {
        self.entries
            .iter()
            .find(|e| e.schema.name == name)
            .map(|e| &e.schema)
    }

    /// Return every registered schema in registration order.
    ///
    /// Callers may rely on the order for prompt readability only.
    pub fn all_schemas(&self) -> Vec<ToolSchema> {
        self.entries.iter().map(|e| e.schema.clone()).collect()
    }

    /// Whether the named tool exists and is marked terminal.
    pub fn is_terminal(&self, name: &str) -> bool {
        self.schema(name).map(|s| s.terminal).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
