//! OpenRouter API Provider.
//!
//! Implements the `LLMProvider` trait for OpenRouter's OpenAI-compatible
//! Chat Completions API.

use super::provider::{LLMProvider, ModelMetadata};
use super::types::{CompletionResponse, Message, Usage};
use crate::config::ProviderKind;
use crate::error::{FicheError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const PROVIDER: &str = "OpenRouter";
const TEMPERATURE: f32 = 0.3;
const AUTH_HINT: &str = "Vérifiez votre OPENROUTER_API_KEY et, si nécessaire, définissez APP_PUBLIC_URL (URL publique de l'app) et APP_NAME.";

/// Identification headers OpenRouter uses to attribute traffic.
#[derive(Debug, Clone, Default)]
pub struct OpenRouterHeaders {
    /// Sent as `HTTP-Referer`
    pub referer: Option<String>,
    /// Sent as `X-Title`
    pub title: Option<String>,
}

impl OpenRouterHeaders {
    /// Header pairs with empty values dropped.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        [("HTTP-Referer", &self.referer), ("X-Title", &self.title)]
            .into_iter()
            .filter_map(|(name, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (name, v.to_string()))
            })
            .collect()
    }
}

/// OpenRouter provider configuration and state.
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    model: String,
    url: String,
    headers: OpenRouterHeaders,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            url: OPENROUTER_API_URL.to_string(),
            headers: OpenRouterHeaders::default(),
        }
    }

    pub fn with_headers(mut self, headers: OpenRouterHeaders) -> Self {
        self.headers = headers;
        self
    }

    fn request_body(&self, messages: &[Message]) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: messages.iter().map(ApiMessage::from).collect(),
            temperature: TEMPERATURE,
        }
    }
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            provider: ProviderKind::OpenRouter,
            id: self.model.clone(),
        }
    }

    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let request = self.request_body(messages);
        debug!("OpenRouter request: model={} messages={}", request.model, request.messages.len());

        let mut builder = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request);
        for (name, value) in self.headers.pairs() {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| FicheError::Provider {
            provider: PROVIDER,
            message: format!("échec de la requête : {}", e),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FicheError::Provider {
            provider: PROVIDER,
            message: format!("lecture de la réponse impossible : {}", e),
        })?;

        parse_chat_response(status, &body)
    }
}

/// Map an OpenRouter HTTP answer to a completion or a user-facing error.
pub(crate) fn parse_chat_response(status: StatusCode, body: &str) -> Result<CompletionResponse> {
    if status == StatusCode::UNAUTHORIZED || (!status.is_success() && body.contains("User not found")) {
        warn!("OpenRouter rejected credentials ({})", status);
        return Err(FicheError::AuthFailed {
            provider: PROVIDER,
            status: status.as_u16(),
            hint: AUTH_HINT,
        });
    }

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorEnvelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(FicheError::Provider {
            provider: PROVIDER,
            message: format!("{} {}", status.as_u16(), message),
        });
    }

    let chat_response: ChatResponse =
        serde_json::from_str(body).map_err(|e| FicheError::MalformedResponse {
            provider: PROVIDER,
            detail: e.to_string(),
        })?;

    let content = chat_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| FicheError::MalformedResponse {
            provider: PROVIDER,
            detail: "aucun contenu renvoyé".to_string(),
        })?;

    Ok(CompletionResponse {
        content,
        usage: chat_response.usage.map(Usage::from).unwrap_or_default(),
    })
}

// -----------------------------------------------------------------------------
// OpenAI-compatible DTOs
// -----------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

impl From<&Message> for ApiMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.as_str(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}
