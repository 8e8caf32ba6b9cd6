//! File-explorer tool provider.
//!
//! A stateful [`ToolProvider`] rooted at one directory: every path
//! argument resolves relative to that root and must stay inside it.
//! The provider tracks which directories have been listed in a shared
//! visited-paths set, so the `visited_paths` tool reflects side effects
//! accumulated across calls — the instance-discovery case.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde_json::{json, Value};

use crate::tools::{ParamType, ToolDef, ToolProvider};

/// Extensions treated as text when searching file contents.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "rs", "md", "json", "toml", "yaml", "yml", "py", "js", "html", "css", "csv", "xml",
];

/// Stateful file-system navigation tools rooted at a directory.
pub struct FileExplorer {
    root: PathBuf,
    visited: Arc<Mutex<HashSet<String>>>,
}

impl FileExplorer {
    /// Root must be an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root
            .into()
            .canonicalize()
            .context("explorer root could not be resolved")?;
        anyhow::ensure!(
            root.is_dir(),
            "explorer root must be an existing directory: {}",
            root.display()
        );
        let mut visited = HashSet::new();
        visited.insert("/".to_string());
        Ok(Self {
            root,
            visited: Arc::new(Mutex::new(visited)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

// ── Path handling ────────────────────────────────────────────

/// Resolve a "/"-rooted or relative path against `root`, rejecting
/// anything that escapes it.
fn resolve(root: &Path, raw: &str) -> anyhow::Result<PathBuf> {
    if raw.contains("..") {
        anyhow::bail!("path traversal ('..') is not allowed: {raw}");
    }
    let rel = raw.trim_start_matches('/');
    let candidate = if rel.is_empty() {
        root.to_path_buf()
    } else {
        root.join(rel)
    };
    let resolved = candidate
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("invalid path '{raw}': {e}"))?;
    if !resolved.starts_with(root) {
        anyhow::bail!("path escapes the explorer root: {raw}");
    }
    Ok(resolved)
}

/// Root-relative display form of a resolved path, starting with "/".
fn relative(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => "/".to_string(),
        Ok(rel) => format!("/{}", rel.display()),
        Err(_) => path.display().to_string(),
    }
}

fn looks_textual(name: &str, content: &str) -> bool {
    if let Some((_, ext)) = name.rsplit_once('.') {
        return TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str());
    }
    // No extension: peek at the head for control characters.
    content
        .chars()
        .take(1000)
        .all(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
}

// ── Tool bodies ──────────────────────────────────────────────

async fn list_directory(
    root: &Path,
    visited: &Mutex<HashSet<String>>,
    args: Vec<Value>,
) -> anyhow::Result<Value> {
    let raw = args.first().and_then(Value::as_str).unwrap_or("/");
    let dir = resolve(root, raw)?;
    anyhow::ensure!(dir.is_dir(), "not a directory: {raw}");

    let rel = relative(root, &dir);
    visited
        .lock()
        .expect("visited set poisoned")
        .insert(rel.clone());

    let mut files = Vec::new();
    let mut directories = Vec::new();
    let mut rd = tokio::fs::read_dir(&dir)
        .await
        .with_context(|| format!("cannot read directory '{raw}'"))?;
    while let Some(entry) = rd.next_entry().await? {
        let entry_rel = relative(root, &entry.path());
        if entry.file_type().await?.is_dir() {
            directories.push(entry_rel);
        } else {
            files.push(entry_rel);
        }
    }
    files.sort();
    directories.sort();

    Ok(json!({
        "path": rel,
        "files": files,
        "directories": directories,
        "is_root": dir == root,
    }))
}

async fn read_file(root: &Path, args: Vec<Value>) -> anyhow::Result<Value> {
    let raw = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("'path' must be a string"))?;
    let file = resolve(root, raw)?;
    anyhow::ensure!(file.is_file(), "not a file: {raw}");

    let content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("cannot read file '{raw}'"))?;
    Ok(json!({
        "path": relative(root, &file),
        "content": content,
    }))
}

async fn find_files(root: &Path, args: Vec<Value>) -> anyhow::Result<Value> {
    let dir_raw = args.first().and_then(Value::as_str).unwrap_or("/");
    let pattern = args
        .get(1)
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow::anyhow!("search pattern cannot be empty"))?;

    let dir = resolve(root, dir_raw)?;
    anyhow::ensure!(dir.is_dir(), "not a directory: {dir_raw}");

    let mut matching = Vec::new();
    let mut rd = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.file_type().await?.is_file() && name.contains(pattern) {
            matching.push(relative(root, &entry.path()));
        }
    }
    matching.sort();

    Ok(json!({
        "pattern": pattern,
        "directory": relative(root, &dir),
        "matching_files": matching,
    }))
}

async fn search_in_files(root: &Path, args: Vec<Value>) -> anyhow::Result<Value> {
    let dir_raw = args.first().and_then(Value::as_str).unwrap_or("/");
    let keyword = args
        .get(1)
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| anyhow::anyhow!("search keyword cannot be empty"))?;

    let dir = resolve(root, dir_raw)?;
    anyhow::ensure!(dir.is_dir(), "not a directory: {dir_raw}");

    let mut results = Vec::new();
    let mut rd = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        // Unreadable or binary files are skipped, not errors.
        let Ok(content) = tokio::fs::read_to_string(entry.path()).await else {
            continue;
        };
        if !looks_textual(&name, &content) {
            continue;
        }

        let matches: Vec<Value> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains(keyword))
            .map(|(i, line)| json!({ "line": i + 1, "content": line }))
            .collect();
        if !matches.is_empty() {
            results.push(json!({
                "file": relative(root, &entry.path()),
                "matches": matches,
            }));
        }
    }

    Ok(json!({
        "keyword": keyword,
        "directory": relative(root, &dir),
        "results": results,
    }))
}

fn visited_paths(visited: &Mutex<HashSet<String>>) -> Value {
    let mut paths: Vec<String> = visited
        .lock()
        .expect("visited set poisoned")
        .iter()
        .cloned()
        .collect();
    paths.sort();
    json!(paths)
}

fn terminate(root: &Path, visited: &Mutex<HashSet<String>>, args: Vec<Value>) -> Value {
    let summary = args.first().and_then(Value::as_str).unwrap_or("");
    let mut explored: Vec<String> = visited
        .lock()
        .expect("visited set poisoned")
        .iter()
        .cloned()
        .collect();
    explored.sort();
    json!({
        "status": "terminated",
        "summary": summary,
        "root": root.display().to_string(),
        "explored_paths": explored,
    })
}

// ── Provider ─────────────────────────────────────────────────

impl ToolProvider for FileExplorer {
    fn tools(&self) -> Vec<ToolDef> {
        let mut defs = Vec::new();

        {
            let root = self.root.clone();
            let visited = Arc::clone(&self.visited);
            defs.push(
                ToolDef::builder("list_directory")
                    .description(
                        "List all files and directories at the given path inside the explorer root.",
                    )
                    .optional(
                        "path",
                        ParamType::String,
                        "Directory to list, relative to the root (default: the root itself).",
                    )
                    .handler(move |args| {
                        let root = root.clone();
                        let visited = Arc::clone(&visited);
                        async move { list_directory(&root, &visited, args).await }
                    })
                    .build(),
            );
        }

        {
            let root = self.root.clone();
            defs.push(
                ToolDef::builder("read_file")
                    .description("Read the content of a file inside the explorer root.")
                    .param("path", ParamType::String, "File to read, relative to the root.")
                    .handler(move |args| {
                        let root = root.clone();
                        async move { read_file(&root, args).await }
                    })
                    .build(),
            );
        }

        {
            let root = self.root.clone();
            defs.push(
                ToolDef::builder("find_files")
                    .description(
                        "Find files in a directory whose name contains the given pattern.",
                    )
                    .param("directory", ParamType::String, "Directory to search in.")
                    .param("pattern", ParamType::String, "Substring to match against file names.")
                    .handler(move |args| {
                        let root = root.clone();
                        async move { find_files(&root, args).await }
                    })
                    .build(),
            );
        }

        {
            let root = self.root.clone();
            defs.push(
                ToolDef::builder("search_in_files")
                    .description(
                        "Search for a keyword in all text files in a directory; returns matching lines.",
                    )
                    .param("directory", ParamType::String, "Directory to search in.")
                    .param("keyword", ParamType::String, "Keyword to look for.")
                    .handler(move |args| {
                        let root = root.clone();
                        async move { search_in_files(&root, args).await }
                    })
                    .build(),
            );
        }

        {
            let visited = Arc::clone(&self.visited);
            defs.push(
                ToolDef::builder("visited_paths")
                    .description("Return every directory path visited so far.")
                    .handler(move |_args| {
                        let visited = Arc::clone(&visited);
                        async move { Ok(visited_paths(&visited)) }
                    })
                    .build(),
            );
        }

        {
            let root = self.root.clone();
            let visited = Arc::clone(&self.visited);
            defs.push(
                ToolDef::builder("terminate")
                    .description(
                        "End the exploration with a summary of findings. Call once the task is complete.",
                    )
                    .param("summary", ParamType::String, "Summary of exploration and findings.")
                    .terminal()
                    .handler(move |args| {
                        let root = root.clone();
                        let visited = Arc::clone(&visited);
                        async move { Ok(terminate(&root, &visited, args)) }
                    })
                    .build(),
            );
        }

        defs
    }
}
