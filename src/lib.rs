//! scuttle — a small tool-calling agent runtime.
//!
//! Give it a task, a registry of tools, and a generator, and the agent
//! loop will render prompts, parse decisions, dispatch tools, and fold
//! the results back into conversational memory until a terminal tool
//! fires or the iteration budget runs out.
//!
//! This library crate re-exports modules so integration tests
//! (under `tests/`) can access them.

pub mod agent;
pub mod cli;
pub mod config;
pub mod environment;
pub mod language;
pub mod memory;
pub mod models;
pub mod tools;

/// Return the scuttle home directory.
///
/// Resolution order:
/// 1. `SCUTTLE_HOME` environment variable
/// 2. `$HOME/.scuttle`
pub fn scuttle_home() -> std::path::PathBuf {
    if let Ok(p) = std::env::var("SCUTTLE_HOME") {
        std::path::PathBuf::from(p)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".scuttle")
    }
}
