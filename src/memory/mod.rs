//! Conversational memory — the append-only, role-tagged log that the
//! agent loop replays to reconstruct its prompt every iteration.
//!
//! A [`Memory`] is owned by a single run and only mutated through
//! [`Memory::append`]; readers get copies, never live references into
//! the log.

use serde::{Deserialize, Serialize};

/// Conversation role of a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub role: Role,
    pub content: String,
}

impl MemoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered, append-only log of [`MemoryEntry`] items.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    entries: Vec<MemoryEntry>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the end of the log.
    pub fn append(&mut self, entry: MemoryEntry) {
        self.entries.push(entry);
    }

    /// Return a copy of the full log in insertion order.
    pub fn all(&self) -> Vec<MemoryEntry> {
        self.entries.clone()
    }

    /// Return a copy of the first `limit` entries in insertion order.
    pub fn first(&self, limit: usize) -> Vec<MemoryEntry> {
        self.entries.iter().take(limit).cloned().collect()
    }

    /// Iterate the log without copying (prompt reconstruction).
    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
