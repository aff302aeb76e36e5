use std::path::PathBuf;

use anyhow::{Context, Result};
use config::Config;
use serde::Deserialize;

use crate::extract::Backend;

pub const ENV_PREFIX: &str = "SENATRAN";
const CONFIG_FILE: &str = "senatran_importer";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    /// pdftotext executable, name or path.
    pub pdftotext: String,
    pub backend: Backend,
    /// Extra repeated header/footer regexes removed from every page.
    pub extra_footer_patterns: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("data/banco_questoes.sqlite"),
            pdftotext: "pdftotext".to_string(),
            backend: Backend::default(),
            extra_footer_patterns: Vec::new(),
        }
    }
}

impl Settings {
    /// Optional `senatran_importer.{toml,yaml,json}` in the working directory,
    /// then `SENATRAN_*` environment variables.
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Failed to load settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let settings: Settings = Config::builder()
            .set_override("pdftotext", "/opt/poppler/bin/pdftotext")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.pdftotext, "/opt/poppler/bin/pdftotext");
        assert_eq!(settings.db_path, PathBuf::from("data/banco_questoes.sqlite"));
        assert_eq!(settings.backend, Backend::Pdftotext);
        assert!(settings.extra_footer_patterns.is_empty());
    }

    #[test]
    fn backend_name_deserializes() {
        let settings: Settings = Config::builder()
            .set_override("backend", "text")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.backend, Backend::Text);
    }
}
