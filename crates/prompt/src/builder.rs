//! Prompt builder for rendering templates and injecting data context.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use crimestat_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build the chat prompt for one user message.
///
/// This function:
/// 1. Merges caller variables over the definition's defaults
/// 2. Renders the system template using Handlebars
/// 3. Adds the data context message if enabled and provided
///
/// `data_context` should be `None` when retrieval found nothing, so the
/// model is not handed an empty context block.
///
/// # Example
/// ```no_run
/// use crimestat_prompt::{build_chat_prompt, default_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = default_prompt()?;
/// let built = build_chat_prompt(&def, "How many thefts in Giron?", None, HashMap::new())?;
/// println!("System prompt: {}", built.system);
/// # Ok(())
/// # }
/// ```
pub fn build_chat_prompt(
    definition: &PromptDefinition,
    user_message: &str,
    data_context: Option<&str>,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let mut resolved = definition.variables.clone();
    resolved.extend(variables);

    let system = render_template(&definition.template, &resolved)?;

    let data_context = if definition.context.include_data_context {
        data_context
            .filter(|ctx| !ctx.trim().is_empty())
            .map(|ctx| format!("{}\n{}", definition.context.context_header, ctx))
    } else {
        None
    };
    if data_context.is_some() {
        tracing::debug!("Injected data context");
    }

    Ok(BuiltPrompt {
        system: system.trim_end().to_string(),
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            data_context_included: data_context.is_some(),
            resolved_variables: resolved,
        },
        data_context,
        user: user_message.to_string(),
        behavior: definition.behavior.clone(),
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PromptBehavior, PromptContextConfig};

    fn create_test_definition(include_data_context: bool) -> PromptDefinition {
        let mut variables = HashMap::new();
        variables.insert("region".to_string(), "Santander".to_string());

        PromptDefinition {
            id: "chat.test".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            behavior: PromptBehavior::default(),
            context: PromptContextConfig {
                include_data_context,
                ..Default::default()
            },
            variables,
            template: "Assistant for {{region}} & friends\n".to_string(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("region".to_string(), "Giron".to_string());

        let result = render_template("Data for {{region}}", &vars).unwrap();
        assert_eq!(result, "Data for Giron");
    }

    #[test]
    fn test_build_without_context() {
        let def = create_test_definition(true);
        let built = build_chat_prompt(&def, "hola", None, HashMap::new()).unwrap();

        // no_escape keeps '&' intact; trailing newline trimmed
        assert_eq!(built.system, "Assistant for Santander & friends");
        assert_eq!(built.user, "hola");
        assert_eq!(built.data_context, None);
        assert!(!built.metadata.data_context_included);
        assert_eq!(built.behavior.max_tokens, 300);
    }

    #[test]
    fn test_build_with_data_context() {
        let def = create_test_definition(true);
        let context = "RELEVANT DATA:\n\n1. Municipality: Giron. Total records: 12.";
        let built =
            build_chat_prompt(&def, "¿Cuántos delitos en Giron?", Some(context), HashMap::new())
                .unwrap();

        assert_eq!(
            built.data_context.as_deref(),
            Some("DATA CONTEXT:\nRELEVANT DATA:\n\n1. Municipality: Giron. Total records: 12.")
        );
        assert!(built.metadata.data_context_included);
    }

    #[test]
    fn test_context_disabled_by_definition() {
        let def = create_test_definition(false);
        let built = build_chat_prompt(&def, "q", Some("RELEVANT DATA:"), HashMap::new()).unwrap();
        assert_eq!(built.data_context, None);
    }

    #[test]
    fn test_caller_variables_override_defaults() {
        let def = create_test_definition(true);
        let mut vars = HashMap::new();
        vars.insert("region".to_string(), "Boyaca".to_string());

        let built = build_chat_prompt(&def, "q", None, vars).unwrap();
        assert_eq!(built.system, "Assistant for Boyaca & friends");
        assert_eq!(
            built.metadata.resolved_variables.get("region").map(String::as_str),
            Some("Boyaca")
        );
    }

    #[test]
    fn test_render_template_missing_variable() {
        let vars = HashMap::new();
        // Handlebars renders missing variables as empty string
        assert_eq!(render_template("For {{missing}}.", &vars).unwrap(), "For .");
    }

    #[test]
    fn test_default_prompt_renders() {
        let def = crate::loader::default_prompt().unwrap();
        let built = build_chat_prompt(&def, "hola", None, HashMap::new()).unwrap();
        assert!(built
            .system
            .contains("Observatorio de Seguridad de Santander (Santander, Colombia)"));
        assert!(built.system.contains("answer in Spanish"));
    }
}
