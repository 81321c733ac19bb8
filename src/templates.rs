//! Saved PDF style templates
//!
//! Each template is one pretty-printed JSON file `<name>.json` in the
//! templates directory, holding a flat [`PdfStyle`] record.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{FicheError, Result};
use crate::sheet::PdfStyle;

/// Directory of named style templates
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// Open the store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create templates directory {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        Ok(self.dir.join(format!("{}.json", sanitize_name(name)?)))
    }

    /// Names of all stored templates, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read templates directory {:?}", self.dir))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Load a template; values are clamped into the supported ranges
    pub fn load(&self, name: &str) -> Result<PdfStyle> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(FicheError::TemplateNotFound(name.trim().to_string()));
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template {:?}", path))?;
        let style: PdfStyle = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse template {:?}", path))?;
        debug!("Loaded template {:?}", path);
        Ok(style.normalized())
    }

    /// Save (or overwrite) a template, returning its path
    pub fn save(&self, name: &str, style: &PdfStyle) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        let content = serde_json::to_string_pretty(&style.clone().normalized())
            .context("Failed to serialize template")?;
        std::fs::write(&path, content).with_context(|| format!("Failed to write template {:?}", path))?;
        info!("Saved template {:?}", path);
        Ok(path)
    }

    /// Delete a template
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(FicheError::TemplateNotFound(name.trim().to_string()));
        }
        std::fs::remove_file(&path).with_context(|| format!("Failed to delete template {:?}", path))?;
        info!("Deleted template {:?}", path);
        Ok(())
    }
}

/// Keep letters, digits, spaces, `_` and `-`, then trim.
pub fn sanitize_name(name: &str) -> Result<String> {
    let clean: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    let clean = clean.trim();
    if clean.is_empty() {
        return Err(FicheError::InvalidTemplateName);
    }
    Ok(clean.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{BaseTemplate, Orientation};
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  Mon modèle_1 ").unwrap(), "Mon modèle_1");
        assert_eq!(sanitize_name("../../etc/passwd").unwrap(), "etcpasswd");
        assert!(matches!(sanitize_name("/./"), Err(FicheError::InvalidTemplateName)));
        assert!(matches!(sanitize_name("   "), Err(FicheError::InvalidTemplateName)));
    }

    #[test]
    fn test_save_list_load_delete() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::open(dir.path().join("templates")).unwrap();
        assert!(store.list().unwrap().is_empty());

        let style = PdfStyle {
            base_template: BaseTemplate::Study,
            orientation: Orientation::Landscape,
            show_cover: true,
            ..PdfStyle::default()
        };
        let path = store.save("CP paysage", &style).unwrap();
        assert!(path.ends_with("CP paysage.json"));
        store.save("Brouillon", &PdfStyle::default()).unwrap();

        assert_eq!(store.list().unwrap(), vec!["Brouillon", "CP paysage"]);
        assert_eq!(store.load("CP paysage").unwrap(), style);

        store.delete("CP paysage").unwrap();
        assert_eq!(store.list().unwrap(), vec!["Brouillon"]);
        assert!(matches!(
            store.load("CP paysage"),
            Err(FicheError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::open(dir.path()).unwrap();
        store.save("a", &PdfStyle::default()).unwrap();
        let pro = PdfStyle {
            base_template: BaseTemplate::Pro,
            ..PdfStyle::default()
        };
        store.save("a", &pro).unwrap();
        assert_eq!(store.load("a").unwrap().base_template, BaseTemplate::Pro);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_load_hand_written_file_is_clamped() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::open(dir.path()).unwrap();
        std::fs::write(
            dir.path().join("vieux.json"),
            r#"{"base_template": "pro", "margins": [2, 15, 20], "base_font_size": 40, "line_spacing": 1.2}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list().unwrap(), vec!["vieux"]);
        let style = store.load("vieux").unwrap();
        assert_eq!(style.base_template, BaseTemplate::Pro);
        assert_eq!(style.margins.left, 5.0);
        assert_eq!(style.base_font_size, 16.0);
    }

    #[test]
    fn test_delete_missing() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::open(dir.path()).unwrap();
        assert!(matches!(store.delete("nope"), Err(FicheError::TemplateNotFound(_))));
    }

    #[test]
    fn test_corrupt_template_is_internal_error() {
        let dir = tempdir().unwrap();
        let store = TemplateStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("cassé.json"), "{not json").unwrap();
        assert!(matches!(store.load("cassé"), Err(FicheError::Internal(_))));
    }
}
