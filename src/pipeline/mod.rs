//! Sheet generation pipeline
//!
//! Two entry points, mirroring the two tabs of the UI:
//! - [`Generator::from_syllabus`]: ToC scan → page lookup → lesson
//!   extraction → sheet generation, from an uploaded textbook.
//! - [`Generator::free_topic`]: revision notes for a topic with no textbook.
//!
//! Each run stops at the first failure; nothing is retried.

pub mod progress;

pub use progress::{ProgressLog, ProgressStep};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{FicheError, Result};
use crate::extract::{extract_pages, extract_toc, PageSource};
use crate::llm::LLMProvider;
use crate::pages::{format_pages, parse_page_numbers};
use crate::prompts::{
    free_topic_prompt, student_notes_prompt, teacher_sheet_prompt, toc_pages_prompt, Audience,
};

/// Inputs of the "from a textbook" tab
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyllabusRequest {
    pub topic: String,
    pub class_level: String,
    pub audience: Audience,
}

/// Inputs of the "free topic" tab
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeTopicRequest {
    pub topic: String,
    pub class_level: String,
    pub country: String,
    pub subject: String,
}

/// Result of a generation run, editable by the user before export
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSheet {
    pub markdown: String,
    pub audience: Audience,
    /// Suggested PDF file name without extension
    pub file_base: String,
    /// Pages the lesson was taken from (syllabus mode)
    pub pages: Vec<u32>,
    /// Requested pages past the end of the document
    pub skipped_pages: Vec<u32>,
    pub progress: Vec<ProgressStep>,
}

/// Runs generation against one provider
pub struct Generator<'a> {
    provider: &'a dyn LLMProvider,
    toc_pages: usize,
    quiet: bool,
}

impl<'a> Generator<'a> {
    pub fn new(provider: &'a dyn LLMProvider, toc_pages: usize) -> Self {
        Self {
            provider,
            toc_pages: toc_pages.max(1),
            quiet: false,
        }
    }

    /// Suppress progress logging (tests)
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    fn progress(&self) -> ProgressLog {
        let mut log = if self.quiet { ProgressLog::quiet() } else { ProgressLog::new() };
        let meta = self.provider.metadata();
        log.step(10, format!("🔧 Client IA prêt ({} · {})", meta.provider.name(), meta.id));
        log
    }

    /// Generate a sheet from the pages of `pdf` that cover `request.topic`.
    pub async fn from_syllabus(
        &self,
        pdf: &dyn PageSource,
        request: &SyllabusRequest,
    ) -> Result<GeneratedSheet> {
        let topic = required(&request.topic, "sujet de la leçon")?;
        let class_level = required(&request.class_level, "niveau/classe")?;
        let mut log = self.progress();

        log.step(25, "📖 Extraction de la table des matières...");
        let toc = extract_toc(pdf, self.toc_pages).map_err(|e| FicheError::Pdf(format!("{:#}", e)))?;
        if toc.trim().is_empty() {
            return Err(FicheError::EmptyToc);
        }
        debug!("ToC text: {} chars", toc.len());

        log.step(50, format!("🧠 Recherche des pages pour « {} »...", topic));
        let reply = self.provider.ask(&toc_pages_prompt(&toc, topic)).await?;
        let pages = parse_page_numbers(&reply);
        if pages.is_empty() {
            warn!("No page numbers in reply: {:?}", reply);
            return Err(FicheError::PagesNotFound {
                topic: topic.to_string(),
                reply,
            });
        }
        info!("Topic '{}' located on pages {}", topic, format_pages(&pages));

        log.step(75, format!("📄 Extraction du contenu (pages {})...", format_pages(&pages)));
        let lesson = extract_pages(pdf, &pages).map_err(|e| FicheError::Pdf(format!("{:#}", e)))?;
        if lesson.text.trim().is_empty() {
            return Err(FicheError::EmptyLesson);
        }

        log.step(90, "🤖 Génération de la fiche (cela peut prendre un moment)...");
        let prompt = match request.audience {
            Audience::Teacher => teacher_sheet_prompt(&lesson.text, topic, class_level),
            Audience::Student => student_notes_prompt(&lesson.text, topic, class_level),
        };
        let markdown = self.provider.ask(&prompt).await?;

        log.complete();
        Ok(GeneratedSheet {
            markdown,
            audience: request.audience,
            file_base: format!("Fiche_{}_{}", topic.replace(' ', "_"), class_level),
            pages,
            skipped_pages: lesson.out_of_bounds,
            progress: log.into_steps(),
        })
    }

    /// Generate revision notes for a topic with no source textbook.
    pub async fn free_topic(&self, request: &FreeTopicRequest) -> Result<GeneratedSheet> {
        let topic = required(&request.topic, "sujet")?;
        let subject = required(&request.subject, "matière")?;
        let class_level = required(&request.class_level, "niveau/classe")?;
        let country = required(&request.country, "pays/curriculum")?;
        let mut log = self.progress();

        log.step(70, "🤖 Génération de la fiche...");
        let prompt = free_topic_prompt(topic, class_level, country, subject);
        let markdown = self.provider.ask(&prompt).await?;

        log.complete();
        Ok(GeneratedSheet {
            markdown,
            audience: Audience::Student,
            file_base: format!("Fiche_{}", topic.replace(' ', "_")),
            pages: Vec::new(),
            skipped_pages: Vec::new(),
            progress: log.into_steps(),
        })
    }
}

fn required<'s>(value: &'s str, field: &'static str) -> Result<&'s str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FicheError::MissingField { field });
    }
    Ok(value)
}
