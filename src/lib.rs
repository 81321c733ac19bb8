//! FicheGen - study sheets from textbooks
//!
//! Turns a PDF textbook (or a free topic) into a French teaching or revision
//! sheet using an LLM, then renders it to a styled PDF.
//!
//! Flow for the textbook mode:
//! ```text
//! PDF → ToC text → LLM: pages for topic → lesson text → LLM: sheet (Markdown) → PDF
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod pages;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod sheet;
pub mod templates;

pub use config::{load_env_file, ApiKeys, Config, ProviderKind};
pub use error::{FicheError, Result};
pub use extract::{decode_upload, extract_pages, extract_toc, PageSource, PdfBytes};
pub use llm::{connect, LLMProvider, Message};
pub use pages::{format_pages, parse_page_numbers};
pub use pipeline::{FreeTopicRequest, GeneratedSheet, Generator, SyllabusRequest};
pub use prompts::Audience;
pub use sheet::{render_sheet, CoverMeta, FontSet, PdfStyle};
pub use templates::TemplateStore;
