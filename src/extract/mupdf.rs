use std::path::{Path, PathBuf};

use ::mupdf::Document;

use super::{PageSource, PageText};
use crate::error::ExtractError;

pub struct MupdfSource {
    path: PathBuf,
}

impl MupdfSource {
    pub fn new(path: &Path) -> Self {
        MupdfSource {
            path: path.to_path_buf(),
        }
    }
}

impl PageSource for MupdfSource {
    fn pages(&self) -> Result<Vec<PageText>, ExtractError> {
        let open_err = |reason: String| ExtractError::DocumentOpen {
            path: self.path.clone(),
            reason,
        };
        let path_str = self
            .path
            .to_str()
            .ok_or_else(|| open_err("path is not valid UTF-8".to_string()))?;
        let doc = Document::open(path_str).map_err(|e| open_err(e.to_string()))?;
        let count = doc.page_count().map_err(|e| open_err(e.to_string()))?;

        let mut pages = Vec::with_capacity(count.max(0) as usize);
        for idx in 0..count {
            let page_number = idx as u32 + 1;
            let read_err = |e: ::mupdf::Error| ExtractError::PageRead {
                page: page_number,
                reason: e.to_string(),
            };
            let page = doc.load_page(idx).map_err(read_err)?;
            let text = page.to_text().map_err(read_err)?;
            pages.push(PageText { page_number, text });
        }
        Ok(pages)
    }
}
