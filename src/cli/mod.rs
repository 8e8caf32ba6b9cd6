//! Subcommand bodies for the `scuttle` binary.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::agent::{self, RunOutcome, RunStatus};
use crate::config::Config;
use crate::language::{ActionLanguage, FunctionCallingLanguage, JsonActionLanguage};
use crate::models::{self, Generator, StubGenerator};
use crate::tools::builtins::explorer::FileExplorer;
use crate::tools::{ToolProvider, ToolRegistry};

/// Default task used when `explore` is invoked without one.
const DEFAULT_EXPLORE_TASK: &str = "Explore the directory and subdirectories. \
    When you have enough information, explain the architecture of the project.";

/// Shared run flags, CLI values overriding config defaults.
#[derive(Debug, Default, Clone)]
pub struct RunOpts {
    pub model: Option<String>,
    pub language: Option<String>,
    pub max_iterations: Option<usize>,
}

impl RunOpts {
    fn language<'a>(&'a self, cfg: &'a Config) -> &'a str {
        self.language.as_deref().unwrap_or(&cfg.defaults.language)
    }

    fn max_iterations(&self, cfg: &Config) -> usize {
        self.max_iterations.unwrap_or(cfg.defaults.max_iterations)
    }
}

/// Map a language name to its strategy object.
pub fn build_language(name: &str) -> anyhow::Result<Box<dyn ActionLanguage>> {
    match name {
        "function-calling" | "function_calling" | "function" | "fc" => {
            Ok(Box::new(FunctionCallingLanguage))
        }
        "json-action" | "json_action" | "json" => Ok(Box::new(JsonActionLanguage)),
        other => anyhow::bail!(
            "unknown action language '{other}' (expected \"function-calling\" or \"json-action\")"
        ),
    }
}

/// Resolve the generator for this run.
///
/// Selection order:
/// 1. The model config referenced by `--model` (or the config default).
/// 2. **OpenAI** — if `OPENAI_API_KEY` is set.
/// 3. **Stub** — echoes a terminate decision (development fallback).
pub fn build_generator(cfg: &Config, opts: &RunOpts) -> anyhow::Result<Arc<dyn Generator>> {
    let model_ref = opts
        .model
        .as_deref()
        .or(cfg.defaults.model.as_deref());

    if let Some(id) = model_ref {
        let mc = cfg
            .model(id)
            .ok_or_else(|| anyhow::anyhow!("model '{id}' not found in config"))?;
        let model_name = mc.model.as_deref().unwrap_or(&mc.id);
        return Ok(models::build_generator(
            &mc.provider,
            model_name,
            mc.endpoint.as_deref(),
            mc.api_key.as_deref(),
        ));
    }

    if std::env::var("OPENAI_API_KEY").is_ok() {
        return Ok(models::build_generator("openai", "gpt-4o-mini", None, None));
    }

    tracing::warn!("no model configured and no OPENAI_API_KEY — using local stub generator");
    Ok(Arc::new(StubGenerator))
}

/// `scuttle explore` — run the file-explorer agent.
pub async fn run_explore(
    cfg: &Config,
    opts: &RunOpts,
    root: &Path,
    task: Option<&str>,
) -> anyhow::Result<()> {
    let language = build_language(opts.language(cfg))?;
    let generator = build_generator(cfg, opts)?;
    let agent = agent::explorer_agent(root, language, generator)?;

    let task = task.unwrap_or(DEFAULT_EXPLORE_TASK);
    info!(root = %root.display(), "starting explorer agent");
    let outcome = agent.run(task, None, opts.max_iterations(cfg)).await?;
    print_outcome(&outcome);
    Ok(())
}

/// `scuttle readme` — run the README-writer agent.
pub async fn run_readme(cfg: &Config, opts: &RunOpts, root: &Path) -> anyhow::Result<()> {
    let language = build_language(opts.language(cfg))?;
    let generator = build_generator(cfg, opts)?;
    let agent = agent::readme_agent(root, language, generator)?;

    info!(root = %root.display(), "starting readme agent");
    let outcome = agent
        .run("Write a README for this project.", None, opts.max_iterations(cfg))
        .await?;
    print_outcome(&outcome);
    Ok(())
}

/// `scuttle tools` — print the explorer tool catalog.
pub fn print_tool_catalog(root: &Path) -> anyhow::Result<()> {
    let explorer = FileExplorer::new(root)?;
    let mut registry = ToolRegistry::new();
    registry.discover(&[&explorer as &dyn ToolProvider]);

    for schema in registry.all_schemas() {
        let terminal = if schema.terminal { " (terminal)" } else { "" };
        println!("{}{terminal}", schema.name);
        println!("    {}", schema.description);
        for param in &schema.parameters {
            let required = if param.required { "required" } else { "optional" };
            println!(
                "    - {} ({}, {required}): {}",
                param.name,
                param.ty.as_str(),
                param.description.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}

/// Print the final memory state entry by entry, then the run status.
pub fn print_outcome(outcome: &RunOutcome) {
    println!("\nFinal Memory State:");
    for entry in outcome.memory.iter() {
        println!("{}: {}", entry.role, entry.content);
    }
    match outcome.status {
        RunStatus::Terminated => {
            println!("\nRun terminated after {} iteration(s).", outcome.iterations)
        }
        RunStatus::Exhausted => println!(
            "\nIteration budget exhausted after {} iteration(s).",
            outcome.iterations
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_aliases_resolve() {
        assert!(build_language("function-calling").is_ok());
        assert!(build_language("fc").is_ok());
        assert!(build_language("json-action").is_ok());
        assert!(build_language("json").is_ok());
        assert!(build_language("prolog").is_err());
    }

    #[test]
    fn unknown_model_ref_is_an_error() {
        let cfg = Config::default();
        let opts = RunOpts {
            model: Some("missing".into()),
            ..Default::default()
        };
        assert!(build_generator(&cfg, &opts).is_err());
    }
}
