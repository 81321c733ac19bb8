//! Gemini API Provider.
//!
//! Implements the `LLMProvider` trait for Google's `generateContent` REST
//! endpoint.

use super::provider::{LLMProvider, ModelMetadata};
use super::types::{CompletionResponse, Message, Role, Usage};
use crate::config::ProviderKind;
use crate::error::{FicheError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const PROVIDER: &str = "Gemini";
const AUTH_HINT: &str = "Vérifiez votre GEMINI_API_KEY.";

/// Gemini provider configuration and state.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(messages: &[Message]) -> GenerateRequest {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for msg in messages {
            let part = Part {
                text: Some(msg.content.clone()),
            };
            match msg.role {
                Role::System => system_parts.push(part),
                Role::User => contents.push(Content {
                    role: Some("user".to_string()),
                    parts: vec![part],
                }),
                Role::Assistant => contents.push(Content {
                    role: Some("model".to_string()),
                    parts: vec![part],
                }),
            }
        }

        GenerateRequest {
            contents,
            system_instruction: (!system_parts.is_empty()).then(|| Content {
                role: None,
                parts: system_parts,
            }),
        }
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            provider: ProviderKind::Gemini,
            id: self.model.clone(),
        }
    }

    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse> {
        let request = Self::request_body(messages);
        debug!("Gemini request: model={} contents={}", self.model, request.contents.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FicheError::Provider {
                provider: PROVIDER,
                message: format!("échec de la requête : {}", e),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| FicheError::Provider {
            provider: PROVIDER,
            message: format!("lecture de la réponse impossible : {}", e),
        })?;

        parse_generate_response(status, &body)
    }
}

/// Map a Gemini HTTP answer to a completion or a user-facing error.
pub(crate) fn parse_generate_response(status: StatusCode, body: &str) -> Result<CompletionResponse> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!("Gemini rejected credentials ({})", status);
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
        // Gemini reports a bad key as 400 INVALID_ARGUMENT
        if message.contains("API key not valid") {
            return Err(FicheError::AuthFailed {
                provider: PROVIDER,
                status: status.as_u16(),
                hint: AUTH_HINT,
            });
        }
        return Err(FicheError::Provider {
            provider: PROVIDER,
            message: format!("{} {}", status.as_u16(), message),
        });
    }

    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| FicheError::MalformedResponse {
            provider: PROVIDER,
            detail: e.to_string(),
        })?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let detail = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("réponse bloquée ({})", r))
            .unwrap_or_else(|| "aucun contenu renvoyé".to_string());
        return Err(FicheError::MalformedResponse {
            provider: PROVIDER,
            detail,
        });
    }

    Ok(CompletionResponse {
        content: text,
        usage: parsed.usage_metadata.map(Usage::from).unwrap_or_default(),
    })
}

// -----------------------------------------------------------------------------
// Gemini DTOs
// -----------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}

impl From<UsageMetadata> for Usage {
    fn from(u: UsageMetadata) -> Self {
        Self {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
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
