//! Prompt system for the crimestat chatbot.
//!
//! This crate provides:
//! - YAML prompt definitions with a built-in default
//! - Handlebars rendering of the system prompt
//! - Data context injection as a separate system message
//! - Post-processing of model responses

pub mod builder;
pub mod loader;
pub mod response;
pub mod types;

// Re-export main types
pub use builder::build_chat_prompt;
pub use loader::{default_prompt, list_prompts, load_prompt, resolve_prompt, DEFAULT_PROMPT_ID};
pub use response::clean_response;
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptContextConfig, PromptDefinition,
};
