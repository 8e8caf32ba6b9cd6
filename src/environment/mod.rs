//! Execution environment — the dispatch boundary between parsed
//! actions and tool bindings.
//!
//! [`Environment::execute`] resolves an [`Action`] against the
//! registry, coerces its named arguments into the binding's positional
//! calling convention, invokes the binding, and wraps whatever happens
//! in an [`Envelope`].  It is a failure boundary: every outcome —
//! unknown tool, bad argument, handler error — comes back as an
//! envelope, never as an `Err`.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::tools::{ParamType, ToolParam, ToolRegistry};

/// A concrete decision to invoke one tool with named arguments.
#[derive(Debug, Clone)]
pub struct Action {
    pub tool_name: String,
    pub args: Map<String, Value>,
}

impl Action {
    pub fn new(tool_name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            args,
        }
    }
}

/// Uniform success/failure wrapper returned by [`Environment::execute`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "tool_executed")]
    pub executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// ISO-8601 timestamp of when the dispatch completed.
    pub timestamp: String,
}

impl Envelope {
    fn success(result: Value) -> Self {
        Self {
            executed: true,
            result: Some(result),
            error: None,
            timestamp: now_rfc3339(),
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            executed: false,
            result: None,
            error: Some(error.into()),
            timestamp: now_rfc3339(),
        }
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Dispatcher bound to one tool registry.
pub struct Environment {
    registry: Arc<ToolRegistry>,
}

impl Environment {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Execute an action and wrap the outcome.
    ///
    /// Total: always returns an [`Envelope`], never propagates an
    /// error past this boundary.
    pub async fn execute(&self, action: &Action) -> Envelope {
        let (schema, handler) = match self.registry.lookup(&action.tool_name) {
            Some((schema, handler)) => (schema, handler.clone()),
            None => return Envelope::failure(format!("unknown tool: {}", action.tool_name)),
        };

        let positional = match bind_arguments(&schema.parameters, &action.args) {
            Ok(args) => args,
            Err(e) => return Envelope::failure(format!("{}: {e:#}", action.tool_name)),
        };

        debug!(tool = %action.tool_name, args = positional.len(), "dispatching");
        match handler(positional).await {
            Ok(value) => Envelope::success(value),
            Err(e) => Envelope::failure(format!("{e:#}")),
        }
    }
}

// ── Argument binding ─────────────────────────────────────────

/// Cap below which the positional fallback may engage.
const POSITIONAL_FALLBACK_MAX: usize = 10;

/// Place named `args` into the declared parameter order, coercing each
/// value to its declared type.
///
/// Pass 1 fills positions whose parameter name appears in `args`.
/// Pass 2 only runs when pass 1 left positions unfilled, the supplied
/// arg count equals the declared parameter count, and that count is at
/// most [`POSITIONAL_FALLBACK_MAX`]; it consumes the remaining args in
/// their insertion order, skipping those already taken by name.  The
/// insertion order is stable because `serde_json` is built with
/// `preserve_order`.
///
/// Missing required parameters are an error; missing optionals become
/// `null`.
pub(crate) fn bind_arguments(
    params: &[ToolParam],
    args: &Map<String, Value>,
) -> anyhow::Result<Vec<Value>> {
    let mut slots: Vec<Option<Value>> = vec![None; params.len()];
    let mut consumed: HashSet<&str> = HashSet::new();

    for (i, param) in params.iter().enumerate() {
        if let Some(value) = args.get(&param.name) {
            slots[i] = Some(
                coerce(value, param.ty).with_context(|| format!("argument '{}'", param.name))?,
            );
            consumed.insert(param.name.as_str());
        }
    }

    if slots.iter().any(Option::is_none)
        && args.len() == params.len()
        && args.len() <= POSITIONAL_FALLBACK_MAX
    {
        let mut leftover = args.iter().filter(|(k, _)| !consumed.contains(k.as_str()));
        for (i, param) in params.iter().enumerate() {
            if slots[i].is_some() {
                continue;
            }
            if let Some((_, value)) = leftover.next() {
                slots[i] = Some(
                    coerce(value, param.ty)
                        .with_context(|| format!("argument '{}'", param.name))?,
                );
            }
        }
    }

    let mut out = Vec::with_capacity(params.len());
    for (i, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(value) => out.push(value),
            None if params[i].required => {
                anyhow::bail!("missing required argument '{}'", params[i].name)
            }
            None => out.push(Value::Null),
        }
    }
    Ok(out)
}

/// Convert `value` to the declared parameter type.
///
/// Values already of the target type pass through; string targets
/// stringify; numeric and boolean targets additionally parse from
/// string representations.  Array and object targets pass through
/// unchanged and let the binding fail downstream if incompatible.
pub(crate) fn coerce(value: &Value, target: ParamType) -> anyhow::Result<Value> {
    match target {
        ParamType::String => Ok(match value {
            Value::String(_) => value.clone(),
            other => Value::String(other.to_string()),
        }),
        ParamType::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(|i| json!(i))
                .ok_or_else(|| anyhow::anyhow!("cannot convert {n} to integer")),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| json!(i))
                .map_err(|_| anyhow::anyhow!("cannot parse '{s}' as integer")),
            other => anyhow::bail!("cannot convert {other} to integer"),
        },
        ParamType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(|f| json!(f))
                .map_err(|_| anyhow::anyhow!("cannot parse '{s}' as number")),
            other => anyhow::bail!("cannot convert {other} to number"),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(json!(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(json!(false)),
            other => anyhow::bail!("cannot parse {other} as boolean"),
        },
        ParamType::Array | ParamType::Object => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolDef;

    fn param(name: &str, ty: ParamType) -> ToolParam {
        ToolParam {
            name: name.into(),
            ty,
            description: None,
            required: true,
        }
    }

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // -- coercion -----------------------------------------------------------

    #[test]
    fn string_to_integer() {
        assert_eq!(coerce(&json!("42"), ParamType::Integer).unwrap(), json!(42));
    }

    #[test]
    fn string_to_boolean_case_insensitive() {
        assert_eq!(coerce(&json!("true"), ParamType::Boolean).unwrap(), json!(true));
        assert_eq!(coerce(&json!("FALSE"), ParamType::Boolean).unwrap(), json!(false));
    }

    #[test]
    fn garbage_boolean_is_an_error() {
        assert!(coerce(&json!("maybe"), ParamType::Boolean).is_err());
    }

    #[test]
    fn float_truncates_to_integer() {
        assert_eq!(coerce(&json!(3.9), ParamType::Integer).unwrap(), json!(3));
    }

    #[test]
    fn number_stringifies() {
        assert_eq!(coerce(&json!(7), ParamType::String).unwrap(), json!("7"));
    }

    #[test]
    fn arrays_pass_through() {
        let v = json!([1, 2, 3]);
        assert_eq!(coerce(&v, ParamType::Array).unwrap(), v);
    }

    // -- binding ------------------------------------------------------------

    #[test]
    fn binds_by_name_in_declared_order() {
        let params = [param("path", ParamType::String), param("limit", ParamType::Integer)];
        let bound = bind_arguments(
            &params,
            &args(&[("limit", json!("5")), ("path", json!("src"))]),
        )
        .unwrap();
        assert_eq!(bound, vec![json!("src"), json!(5)]);
    }

    #[test]
    fn positional_fallback_fills_unmatched_names() {
        // Names don't match, but counts tie exactly, so the fallback
        // maps args in insertion order.
        let params = [param("directory", ParamType::String), param("keyword", ParamType::String)];
        let bound = bind_arguments(
            &params,
            &args(&[("dir", json!("/src")), ("term", json!("fn main"))]),
        )
        .unwrap();
        assert_eq!(bound, vec![json!("/src"), json!("fn main")]);
    }

    #[test]
    fn fallback_skips_args_consumed_by_name() {
        let params = [param("keyword", ParamType::String), param("directory", ParamType::String)];
        let bound = bind_arguments(
            &params,
            &args(&[("dir", json!("/src")), ("keyword", json!("fn main"))]),
        )
        .unwrap();
        assert_eq!(bound, vec![json!("fn main"), json!("/src")]);
    }

    #[test]
    fn no_fallback_when_counts_differ() {
        let params = [param("path", ParamType::String)];
        let result = bind_arguments(
            &params,
            &args(&[("a", json!("x")), ("b", json!("y"))]),
        );
        assert!(result.is_err(), "missing required arg without a count tie");
    }

    #[test]
    fn missing_optional_becomes_null() {
        let params = [ToolParam {
            name: "path".into(),
            ty: ParamType::String,
            description: None,
            required: false,
        }];
        let bound = bind_arguments(&params, &Map::new()).unwrap();
        assert_eq!(bound, vec![Value::Null]);
    }

    // -- dispatch -----------------------------------------------------------

    fn echo_registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDef::builder("echo_int")
                    .description("Echo an integer argument back.")
                    .param("value", ParamType::Integer, "Any integer.")
                    .handler(|args| async move { Ok(args[0].clone()) })
                    .build(),
            )
            .unwrap();
        registry
            .register(
                ToolDef::builder("always_fails")
                    .description("Fails on every call.")
                    .handler(|_args| async { anyhow::bail!("boom") })
                    .build(),
            )
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn unknown_tool_yields_failure_envelope() {
        let env = Environment::new(echo_registry());
        let envelope = env
            .execute(&Action::new("no_such_tool", Map::new()))
            .await;
        assert!(!envelope.executed);
        assert_eq!(envelope.error.as_deref(), Some("unknown tool: no_such_tool"));
        assert!(!envelope.timestamp.is_empty());
    }

    #[tokio::test]
    async fn string_arg_coerced_before_invocation() {
        let env = Environment::new(echo_registry());
        let envelope = env
            .execute(&Action::new("echo_int", args(&[("value", json!("42"))])))
            .await;
        assert!(envelope.executed);
        assert_eq!(envelope.result, Some(json!(42)));
    }

    #[tokio::test]
    async fn handler_error_becomes_failure_envelope() {
        let env = Environment::new(echo_registry());
        let envelope = env.execute(&Action::new("always_fails", Map::new())).await;
        assert!(!envelope.executed);
        assert!(envelope.error.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn bad_argument_becomes_failure_envelope() {
        let env = Environment::new(echo_registry());
        let envelope = env
            .execute(&Action::new("echo_int", args(&[("value", json!("not a number"))])))
            .await;
        assert!(!envelope.executed);
        assert!(envelope.error.as_deref().unwrap().contains("value"));
    }

    #[test]
    fn envelope_serializes_with_tool_executed_key() {
        let envelope = Envelope::success(json!({"ok": true}));
        let raw = serde_json::to_string(&envelope).unwrap();
        assert!(raw.contains("\"tool_executed\":true"));
        assert!(raw.contains("\"timestamp\""));
    }
}
