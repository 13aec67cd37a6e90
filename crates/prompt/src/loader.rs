//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use crimestat_core::config::STATE_DIR;
use crimestat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// ID of the built-in chat prompt.
pub const DEFAULT_PROMPT_ID: &str = "chat.default";

const DEFAULT_PROMPT_YAML: &str = r#"
id: chat.default
title: Public safety data assistant
apiVersion: "1.0"
createdBy: crimestat
behavior:
  maxTokens: 300
  temperature: 0.7
  topP: 0.95
context:
  includeDataContext: true
  contextHeader: "DATA CONTEXT:"
variables:
  organization: Observatorio de Seguridad de Santander
  region: Santander, Colombia
  language: Spanish
template: |
  You are a virtual assistant specializing in public safety analysis for the {{organization}} ({{region}}).

  CHARACTERISTICS:
  - You answer in {{language}}, clearly and professionally
  - You use the specific figures from the data context you are given
  - You explain technical concepts in an accessible way
  - You are precise and cite data when it is available

  INSTRUCTIONS:
  1. ALWAYS use the data context when it is available
  2. If the context has relevant information, use it in your answer
  3. If there is no data in the context, say so clearly
  4. Keep answers CONCISE (2-3 paragraphs at most)
  5. Get straight to the point

  Answer in a helpful, direct and data-driven way.
"#;

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// The built-in chat prompt.
pub fn default_prompt() -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(DEFAULT_PROMPT_YAML)
        .map_err(|e| AppError::Prompt(format!("Failed to parse built-in prompt: {}", e)))?;
    validate_prompt(&definition)?;
    Ok(definition)
}

/// Load a prompt definition by ID from the workspace.
///
/// Looks for `<id>.yml` in `.crimestat/prompts/`.
///
/// # Example
/// ```no_run
/// use crimestat_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "chat.default")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Workspace override for `prompt_id` if present, else the built-in
/// prompt when `prompt_id` is the default ID.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let override_exists = prompts_dir(workspace_path)
        .join(format!("{}.yml", prompt_id))
        .exists();

    if !override_exists && prompt_id == DEFAULT_PROMPT_ID {
        tracing::debug!("Using built-in prompt '{}'", DEFAULT_PROMPT_ID);
        return default_prompt();
    }

    load_prompt(workspace_path, prompt_id)
}

/// List all prompt IDs available in the workspace, sorted.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let prompts_dir = prompts_dir(workspace_path);

    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    if def.behavior.max_tokens == 0 {
        return Err(AppError::Prompt(
            "Prompt behavior.maxTokens must be greater than zero".to_string(),
        ));
    }

    Ok(())
}
