//! Ollama LLM provider implementation.
//!
//! Talks to a local Ollama runtime through its chat endpoint.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ProviderType;
use crimestat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Body of a non-streaming `/api/chat` call.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Default, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Chat completions from a local Ollama runtime.
pub struct OllamaClient {
    chat_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Client for `http://localhost:11434`.
    pub fn new() -> Self {
        Self::with_base_url(ProviderType::Ollama.default_endpoint())
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            client: reqwest::Client::new(),
        }
    }

    fn to_ollama_request<'a>(&self, request: &'a LlmRequest) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                top_p: request.top_p,
                num_predict: request.max_tokens,
            },
        }
    }

    fn convert_response(&self, response: OllamaChatResponse) -> LlmResponse {
        LlmResponse {
            content: response.message.content,
            model: response.model,
            usage: LlmUsage::new(
                response.prompt_eval_count.unwrap_or(0),
                response.eval_count.unwrap_or(0),
            ),
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!(
            "Ollama chat: model {}, {} messages",
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.chat_url)
            .json(&self.to_ollama_request(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Ollama request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!("Ollama returned {}: {}", status, body)));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Invalid Ollama response: {}", e)))?;

        Ok(self.convert_response(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::with_base_url("http://gpu-box:11434/");
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.chat_url, "http://gpu-box:11434/api/chat");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::new();
        let request = LlmRequest::new(vec![ChatMessage::user("Hola")], "llama3.2")
            .with_temperature(0.7)
            .with_max_tokens(100);

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.model, "llama3.2");
        assert_eq!(ollama_req.messages.len(), 1);
        assert!(!ollama_req.stream);
        assert_eq!(ollama_req.options.temperature, Some(0.7));
        assert_eq!(ollama_req.options.num_predict, Some(100));
    }

    #[test]
    fn test_ollama_response_parsing() {
        let body = r#"{
            "model": "llama3.2",
            "message": {"role": "assistant", "content": "Hola."},
            "done": true,
            "prompt_eval_count": 10,
            "eval_count": 4
        }"#;
        let parsed: OllamaChatResponse = serde_json::from_str(body).unwrap();
        let response = OllamaClient::new().convert_response(parsed);
        assert_eq!(response.content, "Hola.");
        assert_eq!(response.usage.total_tokens, 14);
    }
}
