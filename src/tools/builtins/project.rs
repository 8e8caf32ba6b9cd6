//! Project tool provider — the README-writer toolset.
//!
//! A stateless [`ToolProvider`]: its handlers capture only the
//! immutable project root, the static-discovery case.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::{json, Value};

use crate::tools::{ParamType, ToolDef, ToolProvider};

/// Read-only tools over one project directory.
pub struct ProjectTools {
    root: PathBuf,
}

impl ProjectTools {
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root
            .into()
            .canonicalize()
            .context("project root could not be resolved")?;
        anyhow::ensure!(
            root.is_dir(),
            "project root must be an existing directory: {}",
            root.display()
        );
        Ok(Self { root })
    }
}

async fn read_project_file(root: &Path, args: Vec<Value>) -> anyhow::Result<Value> {
    let name = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("'name' must be a string"))?;
    anyhow::ensure!(
        !name.contains("..") && !name.starts_with('/'),
        "file name must be relative to the project root: {name}"
    );

    let content = tokio::fs::read_to_string(root.join(name))
        .await
        .with_context(|| format!("cannot read project file '{name}'"))?;
    Ok(Value::String(content))
}

/// List the Rust source files directly in the project root, sorted.
async fn list_project_files(root: &Path) -> anyhow::Result<Value> {
    let mut names = Vec::new();
    let mut rd = tokio::fs::read_dir(root).await?;
    while let Some(entry) = rd.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().await?.is_file() && name.ends_with(".rs") {
            names.push(name);
        }
    }
    names.sort();
    Ok(json!(names))
}

impl ToolProvider for ProjectTools {
    fn tools(&self) -> Vec<ToolDef> {
        let mut defs = Vec::new();

        {
            let root = self.root.clone();
            defs.push(
                ToolDef::builder("read_project_file")
                    .description("Read and return the content of a project file.")
                    .param("name", ParamType::String, "Name of the file to read.")
                    .handler(move |args| {
                        let root = root.clone();
                        async move { read_project_file(&root, args).await }
                    })
                    .build(),
            );
        }

        {
            let root = self.root.clone();
            defs.push(
                ToolDef::builder("list_project_files")
                    .description("List all Rust source files in the project directory, sorted.")
                    .handler(move |_args| {
                        let root = root.clone();
                        async move { list_project_files(&root).await }
                    })
                    .build(),
            );
        }

        defs.push(
            ToolDef::builder("terminate")
                .description("End the run with a final message for the user.")
                .param("message", ParamType::String, "Final message to return before terminating.")
                .terminal()
                .handler(|args| async move {
                    let message = args.first().and_then(Value::as_str).unwrap_or("");
                    Ok(Value::String(format!("{message}\nTerminating...")))
                })
                .build(),
        );

        defs
    }
}
