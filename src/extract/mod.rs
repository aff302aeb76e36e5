//! Page extraction: source document → one text blob per page, 1-based.

#[cfg(feature = "mupdf")]
pub mod mupdf;
pub mod pdftotext;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::ExtractError;

const FORM_FEED: u8 = 0x0c;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// A document that can be read page by page. Every call to `pages` starts
/// over from the first page.
pub trait PageSource {
    fn pages(&self) -> Result<Vec<PageText>, ExtractError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// poppler's pdftotext subprocess
    #[default]
    Pdftotext,
    /// MuPDF bindings (needs the `mupdf` feature)
    Mupdf,
    /// Pre-extracted UTF-8 text with form-feed page breaks
    Text,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Pdftotext => "pdftotext",
            Backend::Mupdf => "mupdf",
            Backend::Text => "text",
        }
    }
}

pub fn open_source(
    backend: Backend,
    path: &Path,
    pdftotext_bin: &str,
) -> Result<Box<dyn PageSource>, ExtractError> {
    match backend {
        Backend::Pdftotext => Ok(Box::new(pdftotext::Pdftotext::new(pdftotext_bin, path))),
        Backend::Text => Ok(Box::new(TextDump::new(path))),
        #[cfg(feature = "mupdf")]
        Backend::Mupdf => Ok(Box::new(mupdf::MupdfSource::new(path))),
        #[cfg(not(feature = "mupdf"))]
        Backend::Mupdf => Err(ExtractError::BackendUnavailable("mupdf")),
    }
}

// ── Plain text dumps ──

pub struct TextDump {
    path: PathBuf,
}

impl TextDump {
    pub fn new(path: &Path) -> Self {
        TextDump {
            path: path.to_path_buf(),
        }
    }
}

impl PageSource for TextDump {
    fn pages(&self) -> Result<Vec<PageText>, ExtractError> {
        let bytes = fs::read(&self.path).map_err(|e| ExtractError::DocumentOpen {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        split_form_feeds(&bytes)
    }
}

impl PageSource for Vec<PageText> {
    fn pages(&self) -> Result<Vec<PageText>, ExtractError> {
        Ok(self.clone())
    }
}

/// Split extractor output on form feeds. A trailing form feed closes the last
/// page rather than opening an empty one.
pub fn split_form_feeds(bytes: &[u8]) -> Result<Vec<PageText>, ExtractError> {
    let mut chunks: Vec<&[u8]> = bytes.split(|b| *b == FORM_FEED).collect();
    if chunks.len() > 1 && chunks.last().is_some_and(|c| c.is_empty()) {
        chunks.pop();
    }
    if chunks.len() == 1 && chunks[0].is_empty() {
        return Ok(Vec::new());
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let page_number = i as u32 + 1;
            let text = String::from_utf8(chunk.to_vec()).map_err(|e| ExtractError::PageRead {
                page: page_number,
                reason: e.to_string(),
            })?;
            Ok(PageText { page_number, text })
        })
        .collect()
}

/// SHA-256 of the whole source file, hex encoded.
pub fn file_sha256(path: &Path) -> Result<String, ExtractError> {
    let open_err = |e: std::io::Error| ExtractError::DocumentOpen {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut file = fs::File::open(path).map_err(open_err)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(open_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn splits_pages_on_form_feed() {
        let pages = split_form_feeds(b"one\x0ctwo\x0c").unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], PageText { page_number: 1, text: "one".into() });
        assert_eq!(pages[1], PageText { page_number: 2, text: "two".into() });
    }

    #[test]
    fn blank_pages_keep_their_number() {
        let pages = split_form_feeds(b"a\x0c\x0cc\x0c").unwrap();
        let numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(pages[1].text.is_empty());
    }

    #[test]
    fn text_without_form_feed_is_one_page() {
        let pages = split_form_feeds("só uma página".as_bytes()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "só uma página");
    }

    #[test]
    fn empty_input_has_no_pages() {
        assert!(split_form_feeds(b"").unwrap().is_empty());
    }

    #[test]
    fn invalid_utf8_names_the_page() {
        let err = split_form_feeds(b"ok\x0c\xff\xfe\x0c").unwrap_err();
        assert!(matches!(err, ExtractError::PageRead { page: 2, .. }));
    }

    #[test]
    fn text_dump_missing_file_is_open_error() {
        let src = TextDump::new(Path::new("does/not/exist.txt"));
        assert!(matches!(src.pages(), Err(ExtractError::DocumentOpen { .. })));
    }

    #[test]
    fn text_dump_is_restartable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"p1\x0cp2\x0c").unwrap();
        let src = TextDump::new(file.path());
        assert_eq!(src.pages().unwrap(), src.pages().unwrap());
    }

    #[test]
    fn sha256_is_stable_hex() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        assert_eq!(
            file_sha256(file.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[cfg(not(feature = "mupdf"))]
    #[test]
    fn mupdf_backend_reports_unavailable() {
        let res = open_source(Backend::Mupdf, Path::new("x.pdf"), "pdftotext");
        assert!(matches!(res, Err(ExtractError::BackendUnavailable("mupdf"))));
    }
}
