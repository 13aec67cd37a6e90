//! Prompt types for the crimestat chatbot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Generation settings
    #[serde(default)]
    pub behavior: PromptBehavior,

    /// Data context injection settings
    #[serde(default)]
    pub context: PromptContextConfig,

    /// Default template variables, overridable by the caller
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// System prompt template with Handlebars syntax
    pub template: String,
}

/// Generation settings passed to the completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBehavior {
    #[serde(rename = "maxTokens", default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(rename = "topP", default = "default_top_p")]
    pub top_p: f32,
}

fn default_max_tokens() -> u32 {
    300
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.95
}

impl Default for PromptBehavior {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// How retrieved data is injected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContextConfig {
    /// Add retrieved data as an extra system message
    #[serde(rename = "includeDataContext", default = "default_include_data_context")]
    pub include_data_context: bool,

    /// First line of the data context message
    #[serde(rename = "contextHeader", default = "default_context_header")]
    pub context_header: String,
}

fn default_include_data_context() -> bool {
    true
}

fn default_context_header() -> String {
    "DATA CONTEXT:".to_string()
}

impl Default for PromptContextConfig {
    fn default() -> Self {
        Self {
            include_data_context: default_include_data_context(),
            context_header: default_context_header(),
        }
    }
}

/// A fully built prompt ready for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered system prompt
    pub system: String,

    /// Data context message, when retrieved data is present
    #[serde(rename = "dataContext", skip_serializing_if = "Option::is_none")]
    pub data_context: Option<String>,

    /// User message
    pub user: String,

    /// Generation settings from the definition
    pub behavior: PromptBehavior,

    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Whether a data context message was added
    #[serde(rename = "dataContextIncluded")]
    pub data_context_included: bool,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}
