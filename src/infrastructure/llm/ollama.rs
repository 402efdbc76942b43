//! Ollama chat provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::llm::{LlmProvider, LlmRequest, LlmResponse, Message, ResponseFormat};
use crate::domain::DomainError;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// LLM provider backed by a local Ollama server
#[derive(Debug)]
pub struct OllamaProvider<C: HttpClientTrait> {
    client: C,
    base_url: String,
    model: String,
    default_temperature: f32,
}

impl<C: HttpClientTrait> OllamaProvider<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self::with_base_url(client, model, DEFAULT_OLLAMA_BASE_URL)
    }

    pub fn with_base_url(client: C, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            default_temperature: 0.0,
        }
    }

    /// Temperature applied when a request does not set one
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = temperature;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![("Content-Type", "application/json")]
    }

    fn build_request(&self, request: &LlmRequest) -> serde_json::Value {
        let mut options = serde_json::json!({
            "temperature": request.temperature.unwrap_or(self.default_temperature),
        });

        if let Some(max_tokens) = request.max_tokens {
            options["num_predict"] = serde_json::json!(max_tokens);
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
            "options": options,
        });

        if request.response_format == ResponseFormat::Json {
            body["format"] = serde_json::json!("json");
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: OllamaChatResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("ollama", format!("Failed to parse response: {}", e))
        })?;

        let mut llm_response =
            LlmResponse::new(response.model, Message::assistant(response.message.content));
        llm_response.eval_count = response.eval_count;

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for OllamaProvider<C> {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let url = self.chat_url();
        let body = self.build_request(&request);

        let response = self.client.post_json(&url, self.headers(), &body).await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Ollama API types

#[derive(Debug, Serialize, Deserialize)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}
