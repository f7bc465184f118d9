//! Prompt system for Pigeon.
//!
//! Persona and instruction prompts are YAML definitions rendered with
//! Handlebars. Built-in defaults ship with the crate; a workspace can
//! override any of them from `.pigeon/prompts/`.

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, PromptLibrary};
pub use defaults::{REPLY_REMINDER_ID, REPLY_SYSTEM_ID, SPLIT_ID};
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, PromptDefinition, PromptOutputSpec};
