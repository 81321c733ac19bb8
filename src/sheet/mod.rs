//! Study sheet layout: Markdown reading, styles and PDF output

pub mod markdown;
pub mod render;
pub mod style;

pub use markdown::{clean_inline, parse, Block};
pub use render::{render_sheet, CoverMeta, FontSet};
pub use style::{BaseTemplate, Margins, Orientation, PageFormat, Palette, PdfStyle};

/// File name for a downloaded sheet: unsafe characters replaced, `.pdf` added
pub fn pdf_file_name(file_base: &str) -> String {
    let base: String = file_base
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if base.is_empty() {
        "Fiche.pdf".to_string()
    } else {
        format!("{}.pdf", base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_file_name() {
        assert_eq!(pdf_file_name("Fiche_Les_5_sens_CP"), "Fiche_Les_5_sens_CP.pdf");
        assert_eq!(pdf_file_name("Fiche \"x\"/y"), "Fiche__x__y.pdf");
        assert_eq!(pdf_file_name("  "), "Fiche.pdf");
        assert_eq!(pdf_file_name("Fiche_Écosystème"), "Fiche_Écosystème.pdf");
    }
}
