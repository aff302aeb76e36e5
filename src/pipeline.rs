//! Stage wiring: extract → normalize → parse → resolve → import.

use std::path::Path;
use std::str::FromStr;

use rusqlite::Connection;
use tracing::{info, warn};

use crate::db;
use crate::error::{ImportError, ImportResult};
use crate::extract::{self, PageSource};
use crate::import::{self, ImportOptions, ImportReport, ImportTarget};
use crate::modules::ModuleMap;
use crate::parser::normalize::Normalizer;
use crate::parser::parse_pages;

/// Inclusive, 1-based page filter: "N" or "N-M".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: u32,
    pub last: u32,
}

impl PageRange {
    pub fn contains(&self, page: u32) -> bool {
        self.first <= page && page <= self.last
    }
}

impl FromStr for PageRange {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ImportError::InvalidPageRange(s.to_string());
        let parse = |part: &str| part.trim().parse::<u32>().map_err(|_| invalid());

        let (first, last) = match s.split_once('-') {
            Some((a, b)) => (parse(a)?, parse(b)?),
            None => {
                let n = parse(s)?;
                (n, n)
            }
        };
        if first == 0 || first > last {
            return Err(invalid());
        }
        Ok(PageRange { first, last })
    }
}

/// Source file identity recorded on the document row.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub name: String,
    pub hash: String,
}

impl SourceFile {
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let hash = extract::file_sha256(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(SourceFile { name, hash })
    }
}

pub struct ImportJob<'a> {
    pub course_name: &'a str,
    pub document_title: &'a str,
    pub year: Option<u32>,
    pub pages: Option<PageRange>,
    pub source: SourceFile,
    pub options: ImportOptions,
}

pub fn run(
    conn: &Connection,
    source: &dyn PageSource,
    normalizer: &Normalizer,
    job: &ImportJob,
) -> ImportResult<ImportReport> {
    let course = db::find_active_course(conn, job.course_name)?
        .ok_or_else(|| ImportError::CourseNotFound(job.course_name.to_string()))?;
    let modules = ModuleMap::new(db::fetch_active_modules(conn, course.id)?)?;
    if modules.is_empty() {
        warn!(course = %course.name, "course has no module with a page range");
    }
    info!(course = %course.name, modules = modules.len(), "course loaded");

    let mut pages = source.pages()?;
    let extracted = pages.len();
    if let Some(range) = job.pages {
        pages.retain(|p| range.contains(p.page_number));
    }
    info!(extracted, selected = pages.len(), "pages extracted");

    let questions = parse_pages(normalizer, &pages);
    info!(questions = questions.len(), "questions parsed");

    let target = ImportTarget {
        course: &course,
        document_title: job.document_title,
        year: job.year,
        file_name: &job.source.name,
        file_hash: &job.source.hash,
        modules: &modules,
    };
    import::import(conn, &questions, &target, &job.options, pages.len())
}
