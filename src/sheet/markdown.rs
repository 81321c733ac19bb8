//! Line-oriented reading of the Markdown the model returns.
//!
//! The model is asked for a small, predictable subset of Markdown, so each
//! trimmed line maps to exactly one [`Block`].

use once_cell::sync::Lazy;
use regex::Regex;

/// One line of the sheet, classified for layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Empty line, rendered as a small vertical gap
    Blank,
    /// `## Title` (or a lone `# Title`)
    Section(String),
    /// `### Title` / `#### Title`, optionally timed: `(5 min)` or `— 5 min`
    Phase { title: String, minutes: Option<u32> },
    /// `- item` / `* item`
    Bullet(String),
    /// `Classe : CP` and the other known labels
    KeyValue { label: String, value: String },
    /// Anything else
    Paragraph(String),
}

static PHASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#{3,4}\s*(.+?)\s*(?:[—–-]\s*(\d+)\s*min\.?|\((\d+)\s*min\.?\))?\s*$")
        .expect("phase regex")
});

static KEY_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(Titre du chapitre|Titre de la leçon|Titre|Durée|Classe|Objectifs?|Évaluation|Remarques?|Sujet|Niveau|Matière|Pays)\s*:\s*(.*)$",
    )
    .expect("key/value regex")
});

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("bold regex"));

/// Classify every line of `markdown`.
pub fn parse(markdown: &str) -> Vec<Block> {
    markdown.lines().map(parse_line).collect()
}

fn parse_line(raw: &str) -> Block {
    let line = raw.trim();
    if line.is_empty() {
        return Block::Blank;
    }

    if let Some(title) = line.strip_prefix("## ") {
        return Block::Section(clean_inline(title));
    }
    if let Some(title) = line.strip_prefix("# ") {
        return Block::Section(clean_inline(title));
    }

    if let Some(caps) = PHASE.captures(line) {
        let minutes = caps
            .get(2)
            .or_else(|| caps.get(3))
            .and_then(|m| m.as_str().parse().ok());
        return Block::Phase {
            title: clean_inline(&caps[1]),
            minutes,
        };
    }

    if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Block::Bullet(clean_inline(item));
    }

    let plain = clean_inline(line);
    if let Some(caps) = KEY_VALUE.captures(&plain) {
        return Block::KeyValue {
            label: caps[1].to_string(),
            value: caps[2].trim().to_string(),
        };
    }

    Block::Paragraph(plain)
}

/// Strip bold markers, keeping the emphasized text.
pub fn clean_inline(text: &str) -> String {
    BOLD.replace_all(text.trim(), |caps: &regex::Captures| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings() {
        assert_eq!(parse_line("## Les Idées Clés"), Block::Section("Les Idées Clés".into()));
        assert_eq!(parse_line("# Fiche"), Block::Section("Fiche".into()));
        assert_eq!(
            parse_line("### Introduction"),
            Block::Phase {
                title: "Introduction".into(),
                minutes: None
            }
        );
    }

    #[test]
    fn test_timed_phases() {
        assert_eq!(
            parse_line("### Introduction (5 min)"),
            Block::Phase {
                title: "Introduction".into(),
                minutes: Some(5)
            }
        );
        assert_eq!(
            parse_line("#### Mise en commun — 10 min"),
            Block::Phase {
                title: "Mise en commun".into(),
                minutes: Some(10)
            }
        );
        assert_eq!(
            parse_line("### Activité 1 - 15 min"),
            Block::Phase {
                title: "Activité 1".into(),
                minutes: Some(15)
            }
        );
    }

    #[test]
    fn test_bullets_strip_bold() {
        assert_eq!(
            parse_line("- La **vue** passe par les yeux"),
            Block::Bullet("La vue passe par les yeux".into())
        );
        assert_eq!(parse_line("* __ouïe__"), Block::Bullet("ouïe".into()));
    }

    #[test]
    fn test_key_values() {
        assert_eq!(
            parse_line("Classe : CP"),
            Block::KeyValue {
                label: "Classe".into(),
                value: "CP".into()
            }
        );
        assert_eq!(
            parse_line("**Objectifs**: Nommer les cinq sens"),
            Block::KeyValue {
                label: "Objectifs".into(),
                value: "Nommer les cinq sens".into()
            }
        );
        assert_eq!(
            parse_line("titre de la leçon: Les 5 sens"),
            Block::KeyValue {
                label: "titre de la leçon".into(),
                value: "Les 5 sens".into()
            }
        );
    }

    #[test]
    fn test_paragraph_and_blank() {
        let blocks = parse("Je demande aux élèves d'observer.\n\n   \nFin");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("Je demande aux élèves d'observer.".into()),
                Block::Blank,
                Block::Blank,
                Block::Paragraph("Fin".into()),
            ]
        );
    }

    #[test]
    fn test_unknown_label_is_paragraph() {
        assert_eq!(
            parse_line("Matériel : ardoise"),
            Block::Paragraph("Matériel : ardoise".into())
        );
    }
}
