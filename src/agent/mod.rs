//! Agent runtime — goals, the iteration loop, and preset assemblies
//! for the bundled tool providers.
//!
//! An [`Agent`] owns its goal list, a shared read-only [`ToolRegistry`],
//! an [`ActionLanguage`] strategy, the dispatching [`Environment`], and
//! a [`Generator`].  [`Agent::run`] drives the loop: render a prompt
//! from goals + catalog + memory, ask the generator for a decision,
//! parse it, dispatch it, fold the result back into memory, and repeat
//! until a terminal tool fires or the iteration budget runs out.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::environment::{Action, Environment};
use crate::language::ActionLanguage;
use crate::memory::{Memory, MemoryEntry};
use crate::models::Generator;
use crate::tools::builtins::explorer::FileExplorer;
use crate::tools::builtins::project::ProjectTools;
use crate::tools::ToolRegistry;

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

/// A prioritized objective rendered into every prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub priority: i32,
    pub name: String,
    pub description: String,
}

impl Goal {
    pub fn new(priority: i32, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            priority,
            name: name.into(),
            description: description.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// A terminal tool was dispatched.
    Terminated,
    /// The iteration budget ran out before a terminal tool fired.
    Exhausted,
}

/// Final state of a completed run.  The answer lives in `memory`;
/// callers inspect its entries.
#[derive(Debug)]
pub struct RunOutcome {
    pub memory: Memory,
    pub status: RunStatus,
    pub iterations: usize,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A configured agent, ready to run tasks.
pub struct Agent {
    goals: Vec<Goal>,
    registry: Arc<ToolRegistry>,
    language: Box<dyn ActionLanguage>,
    environment: Environment,
    generator: Arc<dyn Generator>,
}

impl Agent {
    pub fn new(
        goals: Vec<Goal>,
        registry: Arc<ToolRegistry>,
        language: Box<dyn ActionLanguage>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let environment = Environment::new(Arc::clone(&registry));
        Self {
            goals,
            registry,
            language,
            environment,
            generator,
        }
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run the loop until a terminal tool fires or `max_iterations` is
    /// reached.
    ///
    /// Each iteration appends exactly two entries to memory: the raw
    /// generator reply as `assistant`, and the serialized dispatch
    /// envelope as `user` — the environment's side of the conversation.
    /// Generator failures, and parse failures under the strict
    /// language, abort the run and propagate.
    pub async fn run(
        &self,
        user_input: &str,
        memory: Option<Memory>,
        max_iterations: usize,
    ) -> anyhow::Result<RunOutcome> {
        let mut memory = memory.unwrap_or_default();
        memory.append(MemoryEntry::user(user_input));

        for iteration in 0..max_iterations {
            // Rebuild the prompt from scratch — memory is the single
            // source of truth for history.
            let prompt = self
                .language
                .render(&self.registry.all_schemas(), &self.goals, &memory);
            debug!(iteration, messages = prompt.messages.len(), "invoking generator");

            let raw = self.generator.generate(&prompt).await?;

            let decision = self.language.parse(&raw)?;
            let terminal = self.registry.is_terminal(&decision.tool);

            // Unknown tools flow through to dispatch so the generator
            // sees the error envelope and can self-correct next turn.
            let action = Action::new(decision.tool.clone(), decision.args);
            let envelope = self.environment.execute(&action).await;
            if !envelope.executed {
                warn!(tool = %decision.tool, error = ?envelope.error, "dispatch failed");
            }

            memory.append(MemoryEntry::assistant(raw));
            memory.append(MemoryEntry::user(serde_json::to_string(&envelope)?));

            if terminal {
                info!(iterations = iteration + 1, tool = %decision.tool, "terminal tool dispatched, run complete");
                return Ok(RunOutcome {
                    memory,
                    status: RunStatus::Terminated,
                    iterations: iteration + 1,
                });
            }
        }

        info!(max_iterations, "iteration budget exhausted");
        Ok(RunOutcome {
            memory,
            status: RunStatus::Exhausted,
            iterations: max_iterations,
        })
    }
}

// ---------------------------------------------------------------------------
// Preset assemblies
// ---------------------------------------------------------------------------

/// Assemble the file-explorer agent rooted at `root`.
///
/// Discovers the stateful [`FileExplorer`] toolset and pairs it with
/// the stock navigation goals.
pub fn explorer_agent(
    root: impl AsRef<Path>,
    language: Box<dyn ActionLanguage>,
    generator: Arc<dyn Generator>,
) -> anyhow::Result<Agent> {
    let explorer = FileExplorer::new(root.as_ref())?;
    let mut registry = ToolRegistry::new();
    registry.discover(&[&explorer]);
    Ok(Agent::new(
        explorer_goals(),
        Arc::new(registry),
        language,
        generator,
    ))
}

fn explorer_goals() -> Vec<Goal> {
    vec![
        Goal::new(
            1,
            "Navigate",
            "Help the user accomplish tasks using the provided tools. \
             Navigate the file tree by listing directory contents. \
             Avoid revisiting directories unless necessary.",
        ),
        Goal::new(2, "Read", "Read file contents when needed to answer user queries"),
        Goal::new(
            3,
            "Search",
            "Search for files or content based on user queries when appropriate",
        ),
        Goal::new(
            4,
            "Summarize",
            "Provide clear summaries of findings in response to user requests",
        ),
        Goal::new(
            5,
            "Avoid Hidden Directories",
            "Don't explore hidden directories unless explicitly requested",
        ),
        Goal::new(
            6,
            "Terminate",
            "When the user's query has been answered, call terminate with a summary",
        ),
    ]
}

/// Assemble the README-writer agent rooted at `root`.
///
/// Uses the stateless [`ProjectTools`] provider.
pub fn readme_agent(
    root: impl AsRef<Path>,
    language: Box<dyn ActionLanguage>,
    generator: Arc<dyn Generator>,
) -> anyhow::Result<Agent> {
    let project = ProjectTools::new(root.as_ref())?;
    let mut registry = ToolRegistry::new();
    registry.discover(&[&project]);
    Ok(Agent::new(
        readme_goals(),
        Arc::new(registry),
        language,
        generator,
    ))
}

fn readme_goals() -> Vec<Goal> {
    vec![
        Goal::new(
            1,
            "Gather Information",
            "Read each file in the project in order to build a deep understanding \
             of the project in order to write a README",
        ),
        Goal::new(
            2,
            "Terminate",
            "Call terminate when done and provide a complete README for the project \
             in the message parameter",
        ),
    ]
}
