//! Built-in tool providers.

pub mod explorer;
pub mod project;
