//! Chat handler: retrieval-grounded completions with a canned fallback.

use crimestat_core::{config::AppConfig, AppResult};
use crimestat_knowledge::{has_relevant_data, RagSession};
use crimestat_llm::{create_client, ChatMessage, LlmClient, LlmRequest};
use crimestat_prompt::{build_chat_prompt, clean_response, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Single words that mark a greeting.
const GREETING_WORDS: &[&str] = &["hola", "hey", "hello", "hi"];

/// Multi-word greetings, matched as substrings.
const GREETING_PHRASES: &[&str] = &["buenos días", "buenas tardes"];

const GREETING_REPLY: &str = "¡Hola! Soy el asistente del Observatorio de Seguridad de Santander con búsqueda inteligente de datos.

Puedo ayudarte con:
- Estadísticas específicas por municipio
- Predicciones de seguridad
- Análisis de tendencias
- Datos históricos de criminalidad

¿Qué necesitas saber?";

const NO_CLIENT_REPLY: &str = "Para consultas específicas, asegúrate de que GROQ_API_KEY esté configurada.

¿Hay algo específico sobre el observatorio que quieras saber?";

/// Answers user messages using the retrieval session and an LLM client.
///
/// Both collaborators are optional. Without a client, or when the
/// completion fails, replies come from [`fallback_response`]. Without a
/// session, completions run with no data context.
pub struct ChatbotHandler {
    session: Option<RagSession>,
    client: Option<Arc<dyn LlmClient>>,
    prompt: PromptDefinition,
    model: String,
}

impl ChatbotHandler {
    pub fn new(
        session: Option<RagSession>,
        client: Option<Arc<dyn LlmClient>>,
        prompt: PromptDefinition,
        model: impl Into<String>,
    ) -> Self {
        Self {
            session,
            client,
            prompt,
            model: model.into(),
        }
    }

    /// Build a handler from the application configuration.
    ///
    /// Session and client failures are logged and leave the handler on the
    /// fallback path; only an unusable prompt is an error.
    pub async fn from_config(config: &AppConfig, prompt: PromptDefinition) -> AppResult<Self> {
        let session = match RagSession::initialize(&config.workspace, &config.data_dir).await {
            Ok(session) => {
                if session.is_data_loaded() {
                    tracing::info!("Data loaded from {:?}", config.data_dir);
                } else {
                    tracing::warn!("Data could not be loaded from {:?}", config.data_dir);
                }
                Some(session)
            }
            Err(e) => {
                tracing::warn!("Retrieval unavailable: {}", e);
                None
            }
        };

        let endpoint = config
            .get_provider_config(&config.provider)
            .and_then(|pc| pc.endpoint());
        let api_key = config.resolve_api_key(&config.provider);

        let client = match create_client(&config.provider, endpoint, api_key.as_deref()) {
            Ok(client) => {
                tracing::info!("LLM client ready: {}", client.provider_name());
                Some(client)
            }
            Err(e) => {
                tracing::warn!("LLM client unavailable, using fallback replies: {}", e);
                None
            }
        };

        Ok(Self::new(session, client, prompt, &config.model))
    }

    /// Whether the retrieval session has data loaded.
    pub fn is_data_loaded(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.is_data_loaded())
    }

    /// Answer a user message. Never fails.
    pub async fn respond(&self, user_message: &str) -> String {
        let Some(client) = self.client.as_ref() else {
            return fallback_response(user_message);
        };

        match self.complete(client.as_ref(), user_message).await {
            Ok(Some(reply)) => reply,
            Ok(None) => {
                tracing::warn!("Empty completion, using fallback reply");
                fallback_response(user_message)
            }
            Err(e) => {
                tracing::error!("Completion failed: {}", e);
                fallback_response(user_message)
            }
        }
    }

    /// Messages sent for a user message: system prompt, optional data
    /// context, then the user message.
    pub async fn build_messages(&self, user_message: &str) -> AppResult<Vec<ChatMessage>> {
        let context = self.data_context(user_message).await;
        let built = build_chat_prompt(
            &self.prompt,
            user_message,
            context.as_deref(),
            HashMap::new(),
        )?;

        let mut messages = vec![ChatMessage::system(built.system)];
        if let Some(data_context) = built.data_context {
            messages.push(ChatMessage::system(data_context));
        }
        messages.push(ChatMessage::user(built.user));
        Ok(messages)
    }

    async fn complete(
        &self,
        client: &dyn LlmClient,
        user_message: &str,
    ) -> AppResult<Option<String>> {
        let messages = self.build_messages(user_message).await?;
        let behavior = &self.prompt.behavior;

        let request = LlmRequest::new(messages, &self.model)
            .with_max_tokens(behavior.max_tokens)
            .with_temperature(behavior.temperature)
            .with_top_p(behavior.top_p);

        let response = client.complete(&request).await?;
        tracing::debug!(
            "Token usage - Prompt: {}, Completion: {}, Total: {}",
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            response.usage.total_tokens
        );

        let reply = clean_response(&response.content);
        Ok((!reply.is_empty()).then_some(reply))
    }

    /// Retrieved context for the message, if any was found.
    async fn data_context(&self, user_message: &str) -> Option<String> {
        let session = self.session.as_ref().filter(|s| s.is_data_loaded())?;

        match session.format_context(user_message).await {
            Ok(context) if has_relevant_data(&context) => Some(context),
            Ok(_) => {
                tracing::debug!("No relevant data for query");
                None
            }
            Err(e) => {
                tracing::warn!("Context retrieval failed: {}", e);
                None
            }
        }
    }

    /// Summary of the loaded data for display.
    pub fn data_summary(&self) -> String {
        match self.session.as_ref() {
            Some(session) if session.is_data_loaded() => session.summary(),
            _ => "No data loaded.".to_string(),
        }
    }
}

/// Canned reply used when no completion is available.
pub fn fallback_response(user_message: &str) -> String {
    if is_greeting(user_message) {
        GREETING_REPLY.to_string()
    } else {
        NO_CLIENT_REPLY.to_string()
    }
}

fn is_greeting(message: &str) -> bool {
    let lower = message.to_lowercase();
    if GREETING_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| GREETING_WORDS.contains(&word))
}
