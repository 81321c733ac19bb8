//! The Provider Abstraction.
//!
//! This trait defines the standard interface for any LLM backend the sheet
//! generator can talk to.

use async_trait::async_trait;
use tracing::debug;

use super::gemini::GeminiProvider;
use super::openrouter::{OpenRouterHeaders, OpenRouterProvider};
use super::types::{CompletionResponse, Message};
use crate::config::{ApiKeys, Config, ProviderKind};
use crate::error::{FicheError, Result};

/// Metadata about the model behind a provider.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    pub provider: ProviderKind,
    pub id: String,
}

/// The core trait for LLM interactions.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the model's metadata.
    fn metadata(&self) -> ModelMetadata;

    /// Send a chat completion request.
    ///
    /// Implementations return [`FicheError::MalformedResponse`] when the
    /// provider answers without any text.
    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse>;

    /// Single-prompt convenience wrapper returning the text.
    async fn ask(&self, prompt: &str) -> Result<String> {
        let response = self.completion(&[Message::user(prompt)]).await?;
        Ok(response.content)
    }
}

/// Build the provider the user selected.
///
/// `override_key` is a key typed into the UI; it wins over the environment.
pub fn connect(
    kind: ProviderKind,
    keys: &ApiKeys,
    override_key: Option<&str>,
    model: Option<&str>,
    config: &Config,
) -> Result<Box<dyn LLMProvider>> {
    let api_key = keys
        .resolve(kind, override_key)
        .ok_or(FicheError::MissingApiKey {
            provider: kind.name(),
            env_var: kind.env_var(),
        })?;
    let model = kind.resolve_model(model);
    debug!("Connecting to {} with model {}", kind.name(), model);

    let provider: Box<dyn LLMProvider> = match kind {
        ProviderKind::OpenRouter => {
            let headers = OpenRouterHeaders {
                referer: config.public_url.clone(),
                title: Some(config.app_name.clone()),
            };
            Box::new(OpenRouterProvider::new(api_key, model).with_headers(headers))
        }
        ProviderKind::Gemini => Box::new(GeminiProvider::new(api_key, model)),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_without_key_fails() {
        let keys = ApiKeys::default();
        let err = connect(ProviderKind::Gemini, &keys, None, None, &Config::default())
            .err()
            .expect("missing key must fail");
        assert!(matches!(
            err,
            FicheError::MissingApiKey { env_var: "GEMINI_API_KEY", .. }
        ));
    }

    #[test]
    fn test_connect_uses_override_and_default_model() {
        let keys = ApiKeys::default();
        let provider = connect(
            ProviderKind::OpenRouter,
            &keys,
            Some("sk-or-typed"),
            None,
            &Config::default(),
        )
        .unwrap();
        let meta = provider.metadata();
        assert_eq!(meta.provider, ProviderKind::OpenRouter);
        assert_eq!(meta.id, "deepseek/deepseek-chat-v3.1:free");
    }

    #[test]
    fn test_connect_gemini_pins_model() {
        let keys = ApiKeys {
            openrouter: None,
            gemini: Some("g-key".into()),
        };
        let provider = connect(
            ProviderKind::Gemini,
            &keys,
            None,
            Some("deepseek/deepseek-r1:free"),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(provider.metadata().id, crate::config::GEMINI_MODEL);
    }
}
