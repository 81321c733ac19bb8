//! Server application state

use crate::config::{ApiKeys, Config};
use crate::sheet::FontSet;
use crate::templates::TemplateStore;

/// Shared application state for all route handlers
pub struct AppState {
    pub config: Config,
    pub keys: ApiKeys,
    pub templates: TemplateStore,
    pub fonts: FontSet,
}

impl AppState {
    /// Open the template store and load fonts named by `config`
    pub fn new(config: Config, keys: ApiKeys) -> anyhow::Result<Self> {
        let templates = TemplateStore::open(&config.templates_dir)?;
        let fonts = FontSet::load(&config.font_regular, &config.font_bold);
        Ok(Self {
            config,
            keys,
            templates,
            fonts,
        })
    }
}
