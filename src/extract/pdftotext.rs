use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::{split_form_feeds, PageSource, PageText};
use crate::error::ExtractError;

/// Text layer extraction through poppler's `pdftotext`, which ends every page
/// with a form feed.
pub struct Pdftotext {
    binary: String,
    path: PathBuf,
}

impl Pdftotext {
    pub fn new(binary: &str, path: &Path) -> Self {
        Pdftotext {
            binary: binary.to_string(),
            path: path.to_path_buf(),
        }
    }

    fn open_error(&self, reason: impl Into<String>) -> ExtractError {
        ExtractError::DocumentOpen {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

impl PageSource for Pdftotext {
    fn pages(&self) -> Result<Vec<PageText>, ExtractError> {
        if !self.path.is_file() {
            return Err(self.open_error("file not found"));
        }

        let output = Command::new(&self.binary)
            .arg("-enc")
            .arg("UTF-8")
            .arg(&self.path)
            .arg("-")
            .output()
            .map_err(|e| self.open_error(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.open_error(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let pages = split_form_feeds(&output.stdout)?;
        debug!(path = ?self.path, pages = pages.len(), "pdftotext finished");
        Ok(pages)
    }
}
