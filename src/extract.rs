//! PDF text extraction
//!
//! Pulls plain text out of uploaded textbooks using pdf_oxide. The pipeline
//! only sees the [`PageSource`] trait, so tests can feed pages from memory.

use anyhow::{Context, Result};
use base64::Engine;
use pdf_oxide::PdfDocument;
use std::io::Write;
use tracing::{debug, warn};

use crate::error::FicheError;

/// Read access to the text of a paginated document.
pub trait PageSource: Send + Sync {
    /// Text of each requested zero-based page, aligned with `indices`;
    /// `None` for pages past the end of the document.
    fn read_pages(&self, indices: &[usize]) -> Result<Vec<Option<String>>>;
}

/// An uploaded PDF held in memory.
///
/// pdf_oxide opens documents from a path, so each batch read spills the
/// bytes to a temporary file that is removed when the call returns.
#[derive(Clone)]
pub struct PdfBytes {
    bytes: Vec<u8>,
}

impl PdfBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn with_document<T>(&self, f: impl FnOnce(&mut PdfDocument) -> Result<T>) -> Result<T> {
        let mut file = tempfile::Builder::new()
            .prefix("fichegen_")
            .suffix(".pdf")
            .tempfile()
            .context("Failed to create temp PDF")?;
        file.write_all(&self.bytes).context("Failed to write temp PDF")?;
        file.flush().context("Failed to write temp PDF")?;

        let mut doc = PdfDocument::open(file.path())
            .map_err(|e| anyhow::anyhow!("Failed to open PDF: {}", e))?;
        f(&mut doc)
    }
}

impl PageSource for PdfBytes {
    fn read_pages(&self, indices: &[usize]) -> Result<Vec<Option<String>>> {
        self.with_document(|doc| {
            let total = doc
                .page_count()
                .map_err(|e| anyhow::anyhow!("Failed to get page count: {}", e))?;
            debug!("PDF has {} pages", total);

            indices
                .iter()
                .map(|&index| {
                    if index >= total {
                        return Ok(None);
                    }
                    doc.extract_text(index)
                        .map(Some)
                        .map_err(|e| anyhow::anyhow!("Failed to extract page {}: {}", index + 1, e))
                })
                .collect()
        })
    }
}

/// Text of the requested pages plus the pages that could not be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonText {
    pub text: String,
    /// 1-based page numbers beyond the end of the document
    pub out_of_bounds: Vec<u32>,
}

/// Text of the first `max_pages` pages, where a table of contents usually
/// sits. Each non-empty page is followed by a blank line.
pub fn extract_toc(source: &dyn PageSource, max_pages: usize) -> Result<String> {
    let indices: Vec<usize> = (0..max_pages).collect();
    let pages = source.read_pages(&indices)?;
    debug!("Scanning {} pages for the table of contents", pages.iter().flatten().count());

    let mut toc = String::new();
    for text in pages.into_iter().flatten() {
        if !text.trim().is_empty() {
            toc.push_str(&text);
            toc.push_str("\n\n");
        }
    }
    Ok(toc)
}

/// Text of the given 1-based pages, each under a `--- TEXT FROM PAGE n ---`
/// marker. Pages past the end are reported, not treated as errors.
pub fn extract_pages(source: &dyn PageSource, pages: &[u32]) -> Result<LessonText> {
    let mut lesson = LessonText::default();

    let wanted: Vec<u32> = pages.iter().copied().filter(|&p| p >= 1).collect();
    lesson.out_of_bounds.extend(pages.iter().copied().filter(|&p| p == 0));

    let indices: Vec<usize> = wanted.iter().map(|&p| p as usize - 1).collect();
    let texts = source.read_pages(&indices)?;

    for (page, text) in wanted.into_iter().zip(texts) {
        match text {
            Some(text) if !text.trim().is_empty() => {
                lesson
                    .text
                    .push_str(&format!("\n\n--- TEXT FROM PAGE {} ---\n\n{}", page, text));
            }
            Some(_) => {}
            None => {
                warn!("Page {} out of bounds", page);
                lesson.out_of_bounds.push(page);
            }
        }
    }
    Ok(lesson)
}

/// Decode an uploaded PDF sent as base64 or as a `data:` URL.
pub fn decode_upload(payload: &str) -> std::result::Result<PdfBytes, FicheError> {
    let encoded = match payload.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => payload,
    };
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| FicheError::InvalidUpload {
            reason: format!("base64 illisible ({})", e),
        })?;

    if !bytes.starts_with(b"%PDF") {
        return Err(FicheError::InvalidUpload {
            reason: "le fichier n'est pas un PDF".to_string(),
        });
    }
    Ok(PdfBytes::new(bytes))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory document for pipeline tests.
    pub(crate) struct MemoryPages(pub Vec<String>);

    impl MemoryPages {
        pub(crate) fn new(pages: &[&str]) -> Self {
            Self(pages.iter().map(|p| p.to_string()).collect())
        }
    }

    impl PageSource for MemoryPages {
        fn read_pages(&self, indices: &[usize]) -> Result<Vec<Option<String>>> {
            Ok(indices.iter().map(|&i| self.0.get(i).cloned()).collect())
        }
    }

    #[test]
    fn test_toc_limits_pages_and_skips_blank() {
        let doc = MemoryPages::new(&["Sommaire", "", "1. Les sens .... 8", "Chapitre 1"]);
        let toc = extract_toc(&doc, 3).unwrap();
        assert_eq!(toc, "Sommaire\n\n1. Les sens .... 8\n\n");
    }

    #[test]
    fn test_toc_shorter_document() {
        let doc = MemoryPages::new(&["Sommaire"]);
        assert_eq!(extract_toc(&doc, 5).unwrap(), "Sommaire\n\n");
    }

    #[test]
    fn test_extract_pages_marks_and_reports_out_of_bounds() {
        let doc = MemoryPages::new(&["p1", "p2", "p3"]);
        let lesson = extract_pages(&doc, &[2, 3, 7]).unwrap();
        assert_eq!(
            lesson.text,
            "\n\n--- TEXT FROM PAGE 2 ---\n\np2\n\n--- TEXT FROM PAGE 3 ---\n\np3"
        );
        assert_eq!(lesson.out_of_bounds, vec![7]);
    }

    #[test]
    fn test_extract_pages_zero_is_out_of_bounds() {
        let doc = MemoryPages::new(&["p1"]);
        let lesson = extract_pages(&doc, &[0, 1]).unwrap();
        assert_eq!(lesson.text, "\n\n--- TEXT FROM PAGE 1 ---\n\np1");
        assert_eq!(lesson.out_of_bounds, vec![0]);
    }

    #[test]
    fn test_decode_upload_plain_and_data_url() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"%PDF-1.4 fake");
        assert_eq!(decode_upload(&encoded).unwrap().len(), 13);

        let data_url = format!("data:application/pdf;base64,{}", encoded);
        assert_eq!(decode_upload(&data_url).unwrap().len(), 13);
    }

    fn rendered_pdf() -> Vec<u8> {
        use crate::prompts::Audience;
        use crate::sheet::{render_sheet, CoverMeta, FontSet, PdfStyle};

        let markdown = "Sommaire\n\nLes volcans ..... 3\n\nLes saisons ..... 7";
        render_sheet(
            markdown,
            Audience::Student,
            &PdfStyle::default(),
            &CoverMeta::for_file("Sommaire"),
            &FontSet::builtin(),
        )
        .unwrap()
    }

    #[test]
    fn test_pdf_bytes_reads_rendered_pages() {
        let pdf = PdfBytes::new(rendered_pdf());
        let pages = pdf.read_pages(&[0, 5]).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].as_deref().unwrap_or_default().contains("Sommaire"), "{pages:?}");
        assert!(pages[1].is_none());

        let toc = extract_toc(&pdf, 5).unwrap();
        assert!(toc.contains("Sommaire"), "{toc}");

        let lesson = extract_pages(&pdf, &[1, 9]).unwrap();
        assert!(lesson.text.starts_with("\n\n--- TEXT FROM PAGE 1 ---"));
        assert_eq!(lesson.out_of_bounds, vec![9]);
    }

    #[test]
    fn test_decode_upload_of_rendered_pdf() {
        let bytes = rendered_pdf();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let pdf = decode_upload(&format!("data:application/pdf;base64,{}", encoded)).unwrap();
        assert_eq!(pdf.len(), bytes.len());
        assert!(pdf.read_pages(&[0]).unwrap()[0].is_some());
    }

    #[test]
    fn test_decode_upload_rejects_non_pdf() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"PK\x03\x04zip");
        assert!(matches!(
            decode_upload(&encoded),
            Err(FicheError::InvalidUpload { .. })
        ));
        assert!(matches!(
            decode_upload("%%%not base64%%%"),
            Err(FicheError::InvalidUpload { .. })
        ));
    }
}
