//! User-facing errors.
//!
//! Every variant ends the current generation or export attempt and is shown
//! inline in the web UI. Plumbing failures (I/O, serialization) travel as
//! `anyhow::Error` and are wrapped in [`FicheError::Internal`] at the edge.

use thiserror::Error;

/// Failures surfaced to the user as inline messages.
#[derive(Debug, Error)]
pub enum FicheError {
    // ── Input ────────────────────────────────────────────────────────────
    /// The request body is not valid JSON for the endpoint.
    #[error("Requête invalide : {0}")]
    InvalidRequest(String),

    /// The request body exceeds the upload limit.
    #[error("Requête trop volumineuse : le fichier dépasse la taille autorisée.")]
    PayloadTooLarge,

    /// A required form field was left empty.
    #[error("Champ obligatoire manquant : {field}")]
    MissingField { field: &'static str },

    /// The uploaded payload is not a PDF document.
    #[error("Fichier invalide : {reason}")]
    InvalidUpload { reason: String },

    // ── Provider ─────────────────────────────────────────────────────────
    /// No API key was supplied for the selected provider.
    #[error("Clé API {provider} manquante. Renseignez-la dans les options avancées ou définissez {env_var}.")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },

    /// The provider rejected the credentials.
    #[error("Authentification {provider} refusée ({status}). {hint}")]
    AuthFailed {
        provider: &'static str,
        status: u16,
        hint: &'static str,
    },

    /// The provider returned an error status or the request failed.
    #[error("Erreur de l'API IA ({provider}) : {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// The provider answered but the payload had no usable text.
    #[error("Réponse IA invalide ({provider}) : {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: String,
    },

    // ── Syllabus pipeline ────────────────────────────────────────────────
    /// PDF parsing failed outright.
    #[error("Erreur d'extraction PDF : {0}")]
    Pdf(String),

    /// The first pages of the PDF produced no text.
    #[error("Impossible d'extraire la table des matières.")]
    EmptyToc,

    /// The page lookup reply contained no page numbers.
    #[error("Pages introuvables pour « {topic} ». Réessayez ou ajustez le sujet.")]
    PagesNotFound { topic: String, reply: String },

    /// The located pages produced no text.
    #[error("Impossible d'extraire le texte de la leçon.")]
    EmptyLesson,

    // ── Templates ────────────────────────────────────────────────────────
    /// The template name has no usable characters once sanitized.
    #[error("Nom de modèle invalide.")]
    InvalidTemplateName,

    /// No stored template carries this name.
    #[error("Modèle introuvable : {0}")]
    TemplateNotFound(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected plumbing failure.
    #[error("Erreur interne : {0}")]
    Internal(String),
}

impl FicheError {
    /// Whether the failure was caused by the request rather than the server
    /// or an upstream service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::PayloadTooLarge
                | Self::MissingField { .. }
                | Self::InvalidUpload { .. }
                | Self::MissingApiKey { .. }
                | Self::EmptyToc
                | Self::PagesNotFound { .. }
                | Self::EmptyLesson
                | Self::InvalidTemplateName
        )
    }
}

impl From<anyhow::Error> for FicheError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, FicheError>;
