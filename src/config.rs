//! Configuration management for FicheGen
//!
//! Handles provider selection, server settings and API keys.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of leading pages scanned for the table of contents
pub const TOC_PAGES_DEFAULT: usize = 5;
/// Upper bound for the ToC scan (the UI offers 1..=12)
pub const TOC_PAGES_MAX: usize = 12;

/// Free OpenRouter models offered in the UI, first one is the default
pub const OPENROUTER_MODELS: &[&str] = &[
    "deepseek/deepseek-chat-v3.1:free",
    "deepseek/deepseek-r1-distill-llama-70b:free",
    "deepseek/deepseek-r1:free",
    "mistralai/mistral-small-3.2-24b-instruct:free",
    "meta-llama/llama-4-scout:free",
];

/// The only Gemini model used
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Supported AI providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenRouter (OpenAI-compatible chat completions)
    #[default]
    OpenRouter,
    /// Google Gemini
    Gemini,
}

impl ProviderKind {
    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenRouter => "OpenRouter",
            Self::Gemini => "Gemini",
        }
    }

    /// Environment variable holding the API key
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Models selectable for this provider
    pub fn models(&self) -> Vec<&'static str> {
        match self {
            Self::OpenRouter => OPENROUTER_MODELS.to_vec(),
            Self::Gemini => vec![GEMINI_MODEL],
        }
    }

    /// Model used when the request does not name one
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenRouter => OPENROUTER_MODELS[0],
            Self::Gemini => GEMINI_MODEL,
        }
    }

    /// Resolve the model to use; Gemini ignores the requested model.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match (self, requested) {
            (Self::OpenRouter, Some(m)) if !m.trim().is_empty() => m.trim().to_string(),
            _ => self.default_model().to_string(),
        }
    }

    /// Get all available providers
    pub fn all() -> Vec<Self> {
        vec![Self::OpenRouter, Self::Gemini]
    }
}

/// FicheGen configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interface the server binds to
    pub host: String,
    /// Port the server listens on
    pub port: u16,
    /// Directory holding saved PDF templates (one JSON file each)
    pub templates_dir: PathBuf,
    /// Pages scanned for the table of contents
    pub toc_pages: usize,
    /// Provider preselected in the UI
    pub provider: ProviderKind,
    /// OpenRouter model preselected in the UI
    pub openrouter_model: String,
    /// TrueType font used for regular text
    pub font_regular: PathBuf,
    /// TrueType font used for bold text
    pub font_bold: PathBuf,
    /// Sent to OpenRouter as `X-Title`
    pub app_name: String,
    /// Sent to OpenRouter as `HTTP-Referer`
    pub public_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            templates_dir: PathBuf::from("templates"),
            toc_pages: TOC_PAGES_DEFAULT,
            provider: ProviderKind::default(),
            openrouter_model: OPENROUTER_MODELS[0].to_string(),
            font_regular: PathBuf::from("DejaVuSans.ttf"),
            font_bold: PathBuf::from("DejaVuSans-Bold.ttf"),
            app_name: "FicheGen".to_string(),
            public_url: None,
        }
    }
}

impl Config {
    /// Get the default config file path (~/.fichegen/config.toml)
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".fichegen").join("config.toml"))
    }

    /// Load config from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load config from `path`, or defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config.normalized())
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Clamp values into the ranges the UI offers
    pub fn normalized(mut self) -> Self {
        self.toc_pages = self.toc_pages.clamp(1, TOC_PAGES_MAX);
        self
    }

    /// Apply `APP_NAME` / `APP_PUBLIC_URL` from the environment
    pub fn apply_env(&mut self) {
        if let Some(name) = env_non_empty("APP_NAME") {
            self.app_name = name;
        }
        if let Some(url) = env_non_empty("APP_PUBLIC_URL") {
            self.public_url = Some(url);
        }
    }
}

/// API keys for the supported providers
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub openrouter: Option<String>,
    pub gemini: Option<String>,
}

impl ApiKeys {
    /// Read keys from `OPENROUTER_API_KEY` / `GEMINI_API_KEY`
    pub fn from_env() -> Self {
        Self {
            openrouter: env_non_empty(ProviderKind::OpenRouter.env_var()),
            gemini: env_non_empty(ProviderKind::Gemini.env_var()),
        }
    }

    /// Key for `kind`, preferring a non-empty override supplied by the user
    pub fn resolve(&self, kind: ProviderKind, override_key: Option<&str>) -> Option<String> {
        if let Some(key) = override_key.map(str::trim).filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }
        match kind {
            ProviderKind::OpenRouter => self.openrouter.clone(),
            ProviderKind::Gemini => self.gemini.clone(),
        }
    }

    /// Whether a key is configured for `kind`
    pub fn has(&self, kind: ProviderKind) -> bool {
        self.resolve(kind, None).is_some()
    }
}

/// Load a `.env` file into the process environment.
///
/// Returns the path that was loaded, or `None` when no file was found.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(p) if p.exists() => dotenvy::from_path(p).map(|_| Some(p.to_path_buf())),
        Some(_) => Ok(None),
        None => match dotenvy::dotenv() {
            Ok(p) => Ok(Some(p)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(e),
        },
    };
    loaded.context("Failed to load environment file")
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider, ProviderKind::OpenRouter);
        assert_eq!(config.toc_pages, TOC_PAGES_DEFAULT);
        assert_eq!(config.openrouter_model, "deepseek/deepseek-chat-v3.1:free");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.port, 8501);
    }

    #[test]
    fn test_partial_file_and_clamping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 9000\ntoc_pages = 40\nprovider = \"gemini\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.toc_pages, TOC_PAGES_MAX);
        assert_eq!(config.provider, ProviderKind::Gemini);
        assert_eq!(config.app_name, "FicheGen");
    }

    #[test]
    fn test_config_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.templates_dir = PathBuf::from("/srv/templates");
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.templates_dir, PathBuf::from("/srv/templates"));
    }

    #[test]
    fn test_resolve_model() {
        assert_eq!(
            ProviderKind::OpenRouter.resolve_model(Some("deepseek/deepseek-r1:free")),
            "deepseek/deepseek-r1:free"
        );
        assert_eq!(ProviderKind::OpenRouter.resolve_model(Some("  ")), OPENROUTER_MODELS[0]);
        assert_eq!(ProviderKind::Gemini.resolve_model(Some("other")), GEMINI_MODEL);
    }

    #[test]
    fn test_override_key_wins() {
        let keys = ApiKeys {
            openrouter: Some("env-key".into()),
            gemini: None,
        };
        assert_eq!(
            keys.resolve(ProviderKind::OpenRouter, Some("typed-key")).as_deref(),
            Some("typed-key")
        );
        assert_eq!(keys.resolve(ProviderKind::OpenRouter, Some("")).as_deref(), Some("env-key"));
        assert!(keys.resolve(ProviderKind::Gemini, None).is_none());
        assert!(!keys.has(ProviderKind::Gemini));
    }

    #[test]
    fn test_env_file_missing_is_not_an_error() {
        let dir = tempdir().unwrap();
        let loaded = load_env_file(Some(&dir.path().join(".env"))).unwrap();
        assert!(loaded.is_none());
    }
}
