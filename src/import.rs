use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::db::{self, Course, QuestionRow};
use crate::error::{ImportError, ImportResult};
use crate::modules::{CurriculumModule, ModuleMap};
use crate::parser::ParsedQuestion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Intermediate,
    Hard,
}

impl Difficulty {
    /// Substring match on the printed word; anything unrecognised counts as hard.
    pub fn from_raw(raw: &str) -> Self {
        let d = raw.to_lowercase();
        if d.contains("fácil") || d.contains("facil") {
            Difficulty::Easy
        } else if d.contains("inter") {
            Difficulty::Intermediate
        } else {
            Difficulty::Hard
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Difficulty::Easy => "FACIL",
            Difficulty::Intermediate => "INTERMEDIARIO",
            Difficulty::Hard => "DIFICIL",
        }
    }
}

/// Change-detection digest: sha256 over module, number, statement and correct answer.
pub fn content_hash(module_id: i64, sequence_number: u32, statement: &str, correct: &str) -> String {
    let base = format!(
        "{}|{}|{}|{}",
        module_id,
        sequence_number,
        statement.trim(),
        correct.trim()
    );
    hex::encode(Sha256::digest(base.as_bytes()))
}

/// Conventional sign image name for a plate code, empty when there is none.
pub fn image_file(plate_code: &str) -> String {
    if plate_code.is_empty() {
        String::new()
    } else {
        format!("{}.png", plate_code)
    }
}

// ── Run parameters & report ──

/// What the questions are imported into.
pub struct ImportTarget<'a> {
    pub course: &'a Course,
    pub document_title: &'a str,
    pub year: Option<u32>,
    pub file_name: &'a str,
    pub file_hash: &'a str,
    pub modules: &'a ModuleMap,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub strict_module: bool,
    /// Abort once more than this many questions fail module resolution.
    pub max_errors: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleTally {
    pub module_id: i64,
    pub order: u32,
    pub name: String,
    pub questions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub pages_processed: usize,
    pub questions_parsed: usize,
    pub dry_run: bool,
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<String>,
    pub by_module: Vec<ModuleTally>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportReport {
    pub fn new(pages_processed: usize, questions_parsed: usize, dry_run: bool) -> Self {
        ImportReport {
            pages_processed,
            questions_parsed,
            dry_run,
            created: 0,
            updated: 0,
            errors: Vec::new(),
            by_module: Vec::new(),
            finished_at: None,
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    fn tally(&mut self, module: &CurriculumModule) {
        match self.by_module.iter_mut().find(|t| t.module_id == module.id) {
            Some(t) => t.questions += 1,
            None => {
                self.by_module.push(ModuleTally {
                    module_id: module.id,
                    order: module.order,
                    name: module.name.clone(),
                    questions: 1,
                });
                self.by_module.sort_by_key(|t| t.order);
            }
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn print(&self) {
        println!("Import finished");
        println!("Pages:     {}", self.pages_processed);
        println!("Questions: {}", self.questions_parsed);
        println!("Dry-run:   {}", if self.dry_run { "yes" } else { "no" });
        if !self.dry_run {
            println!("Created:   {}", self.created);
            println!("Updated:   {}", self.updated);
        }
        println!("Errors:    {}", self.error_count());
        for e in &self.errors {
            println!("  ! {}", e);
        }
        for t in &self.by_module {
            println!("- {}: {}", t.name, t.questions);
        }
    }
}

// ── Import ──

/// Resolve every question to a module and, unless dry-running, upsert it with
/// its alternatives. All writes share one transaction: any error rolls back
/// the whole run, document row included.
pub fn import(
    conn: &Connection,
    questions: &[ParsedQuestion],
    target: &ImportTarget,
    opts: &ImportOptions,
    pages_processed: usize,
) -> ImportResult<ImportReport> {
    let mut report = ImportReport::new(pages_processed, questions.len(), opts.dry_run);

    if opts.dry_run {
        let existing = db::find_document(conn, target.document_title)?;
        debug!(title = target.document_title, exists = existing.is_some(), "document lookup");
        for q in questions {
            if let Some(module) = resolve(target.modules, q, opts, &mut report)? {
                report.tally(module);
            }
        }
        info!(questions = questions.len(), errors = report.error_count(), "dry run, nothing written");
        return Ok(report.finish());
    }

    let tx = conn.unchecked_transaction()?;
    let document_id = db::upsert_document(
        &tx,
        target.document_title,
        target.year,
        target.file_name,
        target.file_hash,
    )?;
    debug!(document_id, title = target.document_title, "document ready");

    let pb = progress_bar(questions.len());
    for q in questions {
        pb.inc(1);
        let Some(module) = resolve(target.modules, q, opts, &mut report)? else {
            continue;
        };
        report.tally(module);

        let created = write_question(&tx, target.course.id, document_id, module, q)?;
        if created {
            report.created += 1;
        } else {
            report.updated += 1;
        }
    }
    tx.commit()?;
    pb.finish_and_clear();

    info!(
        created = report.created,
        updated = report.updated,
        errors = report.error_count(),
        "import committed"
    );
    Ok(report.finish())
}

fn resolve<'m>(
    modules: &'m ModuleMap,
    q: &ParsedQuestion,
    opts: &ImportOptions,
    report: &mut ImportReport,
) -> ImportResult<Option<&'m CurriculumModule>> {
    if let Some(module) = modules.resolve(q.page_start) {
        return Ok(Some(module));
    }
    if opts.strict_module {
        return Err(ImportError::UnresolvedModule { page: q.page_start });
    }

    warn!(page = q.page_start, number = q.sequence_number, "question outside every module");
    report
        .errors
        .push(format!("Page {} is outside every module (question {})", q.page_start, q.sequence_number));
    match opts.max_errors {
        Some(max) if report.error_count() > max => Err(ImportError::TooManyErrors {
            count: report.error_count(),
            max,
        }),
        _ => Ok(None),
    }
}

fn write_question(
    conn: &Connection,
    course_id: i64,
    document_id: i64,
    module: &CurriculumModule,
    q: &ParsedQuestion,
) -> ImportResult<bool> {
    let plate_code = q.plate_code.as_deref().unwrap_or("").to_uppercase();
    let image = image_file(&plate_code);
    let statement = q.statement.trim();
    let correct = q.correct_answer.trim();
    let wrong: Vec<String> = q.wrong_answers.iter().map(|w| w.trim().to_string()).collect();
    let hash = content_hash(module.id, q.sequence_number, statement, correct);

    let (question_id, created) = db::upsert_question(
        conn,
        &QuestionRow {
            course_id,
            module_id: module.id,
            document_id,
            sequence_number: q.sequence_number,
            difficulty: Difficulty::from_raw(&q.difficulty_raw).code(),
            statement,
            comment: q.comment.trim(),
            plate_code: &plate_code,
            image_file: &image,
            page_start: q.page_start,
            page_end: q.page_end,
            raw_block: &q.raw_block,
            content_hash: &hash,
        },
    )?;
    db::replace_alternatives(conn, question_id, correct, &wrong)?;
    Ok(created)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fetch_active_modules, open_in_memory, upsert_course, upsert_module, ModuleRow};
    use crate::extract::split_form_feeds;
    use crate::parser::normalize::Normalizer;
    use crate::parser::parse_pages;
    use rusqlite::params;

    /// Course with module A on pages 1-2 and module B on page 3 (unless `only_a`).
    fn setup(conn: &Connection, only_a: bool) -> (Course, ModuleMap) {
        let course_id = upsert_course(conn, "Primeira Habilitação", "primeira-habilitacao").unwrap();
        let mut layout = vec![("A", 1, 2)];
        if !only_a {
            layout.push(("B", 3, 3));
        }
        for (i, (name, start, end)) in layout.into_iter().enumerate() {
            upsert_module(
                conn,
                &ModuleRow {
                    course_id,
                    order: i as u32 + 1,
                    name,
                    category: "CONTEUDO",
                    page_start: Some(start),
                    page_end: Some(end),
                },
            )
            .unwrap();
        }
        let course = Course { id: course_id, name: "Primeira Habilitação".into() };
        let modules = ModuleMap::new(fetch_active_modules(conn, course_id).unwrap()).unwrap();
        (course, modules)
    }

    fn fixture() -> Vec<ParsedQuestion> {
        let raw = std::fs::read("tests/fixtures/senatran_sample.txt").unwrap();
        parse_pages(&Normalizer::default(), &split_form_feeds(&raw).unwrap())
    }

    fn run(conn: &Connection, course: &Course, modules: &ModuleMap, opts: &ImportOptions) -> ImportResult<ImportReport> {
        let target = ImportTarget {
            course,
            document_title: "Banco Nacional de Questões 2025",
            year: Some(2025),
            file_name: "senatran.pdf",
            file_hash: "f00d",
            modules,
        };
        import(conn, &fixture(), &target, opts, 3)
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0)).unwrap()
    }

    fn snapshot(conn: &Connection) -> Vec<(i64, i64, String, String, i64, String, bool)> {
        let mut stmt = conn
            .prepare(
                "SELECT q.module_id, q.sequence_number, q.content_hash, q.statement,
                        a.ordinal, a.text, a.is_correct
                 FROM questions q JOIN alternatives a ON a.question_id = q.id
                 ORDER BY q.module_id, q.sequence_number, a.ordinal",
            )
            .unwrap();
        stmt.query_map([], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
    }

    #[test]
    fn difficulty_codes() {
        assert_eq!(Difficulty::from_raw("Fácil").code(), "FACIL");
        assert_eq!(Difficulty::from_raw("FÁCIL"), Difficulty::Easy);
        assert_eq!(Difficulty::from_raw("facil"), Difficulty::Easy);
        assert_eq!(Difficulty::from_raw("Intermediário").code(), "INTERMEDIARIO");
        assert_eq!(Difficulty::from_raw("Difícil").code(), "DIFICIL");
        assert_eq!(Difficulty::from_raw("qualquer"), Difficulty::Hard);
    }

    #[test]
    fn content_hash_trims_and_is_deterministic() {
        let a = content_hash(7, 3, "  Enunciado ", "Certa\n");
        let b = content_hash(7, 3, "Enunciado", "Certa");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_hash(8, 3, "Enunciado", "Certa"));
        assert_ne!(a, content_hash(7, 4, "Enunciado", "Certa"));
    }

    #[test]
    fn image_file_from_plate() {
        assert_eq!(image_file("R-1"), "R-1.png");
        assert_eq!(image_file(""), "");
    }

    #[test]
    fn first_import_creates_everything() {
        let conn = open_in_memory();
        let (course, modules) = setup(&conn, false);
        let report = run(&conn, &course, &modules, &ImportOptions::default()).unwrap();

        assert_eq!(report.questions_parsed, 5);
        assert_eq!(report.pages_processed, 3);
        assert_eq!((report.created, report.updated, report.error_count()), (5, 0, 0));
        let tallies: Vec<(&str, usize)> =
            report.by_module.iter().map(|t| (t.name.as_str(), t.questions)).collect();
        assert_eq!(tallies, vec![("A", 3), ("B", 2)]);
        assert_eq!(count(&conn, "questions"), 5);
        assert_eq!(count(&conn, "documents"), 1);

        let (plate, image, difficulty): (String, String, String) = conn
            .query_row(
                "SELECT plate_code, image_file, difficulty FROM questions WHERE sequence_number = 1 AND page_start = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!((plate.as_str(), image.as_str(), difficulty.as_str()), ("R-1", "R-1.png", "FACIL"));
    }

    #[test]
    fn reimport_is_idempotent() {
        let conn = open_in_memory();
        let (course, modules) = setup(&conn, false);
        let first = run(&conn, &course, &modules, &ImportOptions::default()).unwrap();
        let before = snapshot(&conn);
        let alt_ids: Vec<i64> = conn
            .prepare("SELECT id FROM alternatives ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let second = run(&conn, &course, &modules, &ImportOptions::default()).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, first.created);
        assert_eq!(snapshot(&conn), before);
        assert_eq!(count(&conn, "questions"), 5);
        assert_eq!(count(&conn, "documents"), 1);

        let alt_ids_after: Vec<i64> = conn
            .prepare("SELECT id FROM alternatives ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(alt_ids, alt_ids_after);
    }

    #[test]
    fn exactly_one_correct_alternative_at_ordinal_one() {
        let conn = open_in_memory();
        let (course, modules) = setup(&conn, false);
        run(&conn, &course, &modules, &ImportOptions::default()).unwrap();

        let bad: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM questions q
                 WHERE (SELECT COUNT(*) FROM alternatives a WHERE a.question_id = q.id AND a.is_correct = 1) <> 1
                    OR NOT EXISTS (SELECT 1 FROM alternatives a
                                   WHERE a.question_id = q.id AND a.ordinal = 1 AND a.is_correct = 1)",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(bad, 0);
    }

    #[test]
    fn wrong_answers_keep_parsed_order() {
        let conn = open_in_memory();
        let (course, modules) = setup(&conn, false);
        run(&conn, &course, &modules, &ImportOptions::default()).unwrap();

        let texts: Vec<String> = conn
            .prepare(
                "SELECT a.text FROM alternatives a JOIN questions q ON q.id = a.question_id
                 WHERE q.page_start = 1 AND q.sequence_number = 3 ORDER BY a.ordinal",
            )
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            texts,
            vec![
                "Ao veículo que vem pela direita.",
                "Ao veículo que vem pela esquerda.",
                "Ao veículo de maior porte.",
                "Ao veículo mais rápido.",
            ]
        );
    }

    #[test]
    fn strict_module_failure_writes_nothing() {
        let conn = open_in_memory();
        let (course, modules) = setup(&conn, true);
        let opts = ImportOptions { strict_module: true, ..Default::default() };
        let err = run(&conn, &course, &modules, &opts).unwrap_err();
        assert!(matches!(err, ImportError::UnresolvedModule { page: 3 }));
        assert_eq!(count(&conn, "questions"), 0);
        assert_eq!(count(&conn, "alternatives"), 0);
        assert_eq!(count(&conn, "documents"), 0);
    }

    #[test]
    fn lenient_mode_skips_and_counts_unresolved() {
        let conn = open_in_memory();
        let (course, modules) = setup(&conn, true);
        let report = run(&conn, &course, &modules, &ImportOptions::default()).unwrap();
        assert_eq!(report.created, 3);
        assert_eq!(report.error_count(), 2);
        assert!(report.errors[0].starts_with("Page 3"));
        assert_eq!(count(&conn, "questions"), 3);
    }

    #[test]
    fn exceeding_max_errors_rolls_back() {
        let conn = open_in_memory();
        let (course, modules) = setup(&conn, true);
        let opts = ImportOptions { max_errors: Some(1), ..Default::default() };
        let err = run(&conn, &course, &modules, &opts).unwrap_err();
        assert!(matches!(err, ImportError::TooManyErrors { count: 2, max: 1 }));
        assert_eq!(count(&conn, "questions"), 0);

        let opts = ImportOptions { max_errors: Some(2), ..Default::default() };
        assert!(run(&conn, &course, &modules, &opts).is_ok());
    }

    #[test]
    fn dry_run_counts_match_but_nothing_is_written() {
        let conn = open_in_memory();
        let (course, modules) = setup(&conn, false);
        let dry = run(&conn, &course, &modules, &ImportOptions { dry_run: true, ..Default::default() }).unwrap();
        assert_eq!(count(&conn, "questions"), 0);
        assert_eq!(count(&conn, "documents"), 0);

        let real = run(&conn, &course, &modules, &ImportOptions::default()).unwrap();
        assert_eq!(dry.pages_processed, real.pages_processed);
        assert_eq!(dry.questions_parsed, real.questions_parsed);
        assert_eq!(dry.error_count(), real.error_count());
        assert_eq!(dry.by_module, real.by_module);
        assert_eq!((dry.created, dry.updated), (0, 0));
    }

    #[test]
    fn changed_statement_updates_in_place() {
        let conn = open_in_memory();
        let (course, modules) = setup(&conn, false);
        run(&conn, &course, &modules, &ImportOptions::default()).unwrap();

        let mut questions = fixture();
        questions[0].statement = "Enunciado revisado".into();
        questions[0].wrong_answers.truncate(1);
        let target = ImportTarget {
            course: &course,
            document_title: "Banco Nacional de Questões 2025",
            year: None,
            file_name: "senatran.pdf",
            file_hash: "f00d",
            modules: &modules,
        };
        let report = import(&conn, &questions, &target, &ImportOptions::default(), 3).unwrap();
        assert_eq!((report.created, report.updated), (0, 5));

        let (statement, alts): (String, i64) = conn
            .query_row(
                "SELECT q.statement, (SELECT COUNT(*) FROM alternatives a WHERE a.question_id = q.id)
                 FROM questions q WHERE q.page_start = 1 AND q.sequence_number = 1",
                params![],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(statement, "Enunciado revisado");
        assert_eq!(alts, 2);
    }
}
