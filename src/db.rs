use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::modules::CurriculumModule;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS courses (
            id         INTEGER PRIMARY KEY,
            name       TEXT UNIQUE NOT NULL,
            slug       TEXT UNIQUE NOT NULL,
            active     BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS course_modules (
            id         INTEGER PRIMARY KEY,
            course_id  INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            ord        INTEGER NOT NULL,
            name       TEXT NOT NULL,
            category   TEXT NOT NULL DEFAULT 'CONTEUDO' CHECK(category IN ('CONTEUDO','SIMULADO')),
            page_start INTEGER,
            page_end   INTEGER,
            active     BOOLEAN NOT NULL DEFAULT 1,
            UNIQUE(course_id, ord),
            UNIQUE(course_id, name)
        );
        CREATE INDEX IF NOT EXISTS idx_modules_course ON course_modules(course_id, category, ord);

        CREATE TABLE IF NOT EXISTS documents (
            id         INTEGER PRIMARY KEY,
            title      TEXT NOT NULL,
            year       INTEGER,
            file_name  TEXT NOT NULL DEFAULT '',
            file_hash  TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_hash
            ON documents(file_hash) WHERE file_hash <> '';

        CREATE TABLE IF NOT EXISTS questions (
            id              INTEGER PRIMARY KEY,
            course_id       INTEGER NOT NULL REFERENCES courses(id),
            module_id       INTEGER NOT NULL REFERENCES course_modules(id),
            document_id     INTEGER NOT NULL REFERENCES documents(id),
            sequence_number INTEGER NOT NULL,
            difficulty      TEXT CHECK(difficulty IN ('FACIL','INTERMEDIARIO','DIFICIL')),
            statement       TEXT NOT NULL,
            comment         TEXT NOT NULL DEFAULT '',
            plate_code      TEXT NOT NULL DEFAULT '',
            image_file      TEXT NOT NULL DEFAULT '',
            page_start      INTEGER,
            page_end        INTEGER,
            raw_block       TEXT NOT NULL DEFAULT '',
            content_hash    TEXT NOT NULL DEFAULT '',
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at      TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(document_id, module_id, sequence_number)
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_questions_hash
            ON questions(content_hash) WHERE content_hash <> '';
        CREATE INDEX IF NOT EXISTS idx_questions_module ON questions(course_id, module_id, sequence_number);
        CREATE INDEX IF NOT EXISTS idx_questions_plate ON questions(plate_code);

        CREATE TABLE IF NOT EXISTS alternatives (
            id          INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            ordinal     INTEGER NOT NULL,
            text        TEXT NOT NULL,
            is_correct  BOOLEAN NOT NULL DEFAULT 0,
            UNIQUE(question_id, ordinal)
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_alternatives_one_correct
            ON alternatives(question_id) WHERE is_correct = 1;
        ",
    )
}

// ── Courses & modules ──

#[derive(Debug, Clone)]
pub struct Course {
    pub id: i64,
    pub name: String,
}

pub fn find_active_course(conn: &Connection, name: &str) -> rusqlite::Result<Option<Course>> {
    conn.query_row(
        "SELECT id, name FROM courses WHERE name = ?1 AND active = 1",
        params![name],
        |row| {
            Ok(Course {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn upsert_course(conn: &Connection, name: &str, slug: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO courses (name, slug) VALUES (?1, ?2)
         ON CONFLICT(slug) DO UPDATE SET name = excluded.name",
        params![name, slug],
    )?;
    conn.query_row("SELECT id FROM courses WHERE slug = ?1", params![slug], |r| r.get(0))
}

pub struct ModuleRow<'a> {
    pub course_id: i64,
    pub order: u32,
    pub name: &'a str,
    pub category: &'a str,
    pub page_start: Option<u32>,
    pub page_end: Option<u32>,
}

pub fn upsert_module(conn: &Connection, m: &ModuleRow) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO course_modules (course_id, ord, name, category, page_start, page_end, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)
         ON CONFLICT(course_id, name) DO UPDATE SET
            ord = excluded.ord,
            category = excluded.category,
            page_start = excluded.page_start,
            page_end = excluded.page_end,
            active = 1",
        params![m.course_id, m.order, m.name, m.category, m.page_start, m.page_end],
    )
}

/// Active modules of a course in display order.
pub fn fetch_active_modules(
    conn: &Connection,
    course_id: i64,
) -> rusqlite::Result<Vec<CurriculumModule>> {
    let mut stmt = conn.prepare(
        "SELECT id, course_id, ord, name, page_start, page_end
         FROM course_modules
         WHERE course_id = ?1 AND active = 1
         ORDER BY ord",
    )?;
    let rows = stmt
        .query_map(params![course_id], |row| {
            Ok(CurriculumModule {
                id: row.get(0)?,
                course_id: row.get(1)?,
                order: row.get(2)?,
                name: row.get(3)?,
                page_start: row.get(4)?,
                page_end: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Documents ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub id: i64,
    pub title: String,
    pub year: Option<u32>,
}

pub fn find_document(conn: &Connection, title: &str) -> rusqlite::Result<Option<DocumentRow>> {
    conn.query_row(
        "SELECT id, title, year FROM documents WHERE title = ?1 ORDER BY id LIMIT 1",
        params![title],
        |row| {
            Ok(DocumentRow {
                id: row.get(0)?,
                title: row.get(1)?,
                year: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Get-or-create by title. A given year overwrites a different stored one;
/// the source file name and hash always reflect the latest import.
pub fn upsert_document(
    conn: &Connection,
    title: &str,
    year: Option<u32>,
    file_name: &str,
    file_hash: &str,
) -> rusqlite::Result<i64> {
    let id = match find_document(conn, title)? {
        Some(doc) => {
            if let Some(y) = year.filter(|y| doc.year != Some(*y)) {
                conn.execute("UPDATE documents SET year = ?1 WHERE id = ?2", params![y, doc.id])?;
            }
            doc.id
        }
        None => {
            conn.execute(
                "INSERT INTO documents (title, year) VALUES (?1, ?2)",
                params![title, year],
            )?;
            conn.last_insert_rowid()
        }
    };
    conn.execute(
        "UPDATE documents SET file_name = ?1, file_hash = ?2 WHERE id = ?3",
        params![file_name, file_hash, id],
    )?;
    Ok(id)
}

// ── Questions & alternatives ──

pub struct QuestionRow<'a> {
    pub course_id: i64,
    pub module_id: i64,
    pub document_id: i64,
    pub sequence_number: u32,
    pub difficulty: &'a str,
    pub statement: &'a str,
    pub comment: &'a str,
    pub plate_code: &'a str,
    pub image_file: &'a str,
    pub page_start: u32,
    pub page_end: u32,
    pub raw_block: &'a str,
    pub content_hash: &'a str,
}

/// Upsert on (document, module, sequence number). Returns the row id and
/// whether it was created.
pub fn upsert_question(conn: &Connection, q: &QuestionRow) -> rusqlite::Result<(i64, bool)> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM questions
             WHERE document_id = ?1 AND module_id = ?2 AND sequence_number = ?3",
            params![q.document_id, q.module_id, q.sequence_number],
            |r| r.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE questions SET
                    course_id = ?1, difficulty = ?2, statement = ?3, comment = ?4,
                    plate_code = ?5, image_file = ?6, page_start = ?7, page_end = ?8,
                    raw_block = ?9, content_hash = ?10, updated_at = datetime('now')
                 WHERE id = ?11",
                params![
                    q.course_id, q.difficulty, q.statement, q.comment, q.plate_code,
                    q.image_file, q.page_start, q.page_end, q.raw_block, q.content_hash, id,
                ],
            )?;
            Ok((id, false))
        }
        None => {
            conn.execute(
                "INSERT INTO questions
                 (course_id, module_id, document_id, sequence_number, difficulty, statement,
                  comment, plate_code, image_file, page_start, page_end, raw_block, content_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    q.course_id, q.module_id, q.document_id, q.sequence_number, q.difficulty,
                    q.statement, q.comment, q.plate_code, q.image_file, q.page_start,
                    q.page_end, q.raw_block, q.content_hash,
                ],
            )?;
            Ok((conn.last_insert_rowid(), true))
        }
    }
}

/// Write the full alternative list: ordinal 1 is the correct answer, then the
/// wrong answers in order. Rows are updated in place by ordinal so their ids
/// survive re-imports; ordinals past the new list are removed.
pub fn replace_alternatives(
    conn: &Connection,
    question_id: i64,
    correct: &str,
    wrong: &[String],
) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO alternatives (question_id, ordinal, text, is_correct)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(question_id, ordinal) DO UPDATE SET
            text = excluded.text,
            is_correct = excluded.is_correct",
    )?;
    let answers = std::iter::once((correct, true)).chain(wrong.iter().map(|w| (w.as_str(), false)));
    let mut count = 0;
    for (i, (text, is_correct)) in answers.enumerate() {
        stmt.execute(params![question_id, i + 1, text, is_correct])?;
        count += 1;
    }
    conn.execute(
        "DELETE FROM alternatives WHERE question_id = ?1 AND ordinal > ?2",
        params![question_id, count],
    )?;
    Ok(count)
}

// ── Stats ──

pub struct Stats {
    pub courses: usize,
    pub modules: usize,
    pub documents: usize,
    pub questions: usize,
    pub alternatives: usize,
    pub with_plate: usize,
    pub missing_correct: usize,
}

pub fn get_stats(conn: &Connection) -> rusqlite::Result<Stats> {
    let count = |sql: &str| -> rusqlite::Result<usize> { conn.query_row(sql, [], |r| r.get(0)) };
    Ok(Stats {
        courses: count("SELECT COUNT(*) FROM courses")?,
        modules: count("SELECT COUNT(*) FROM course_modules")?,
        documents: count("SELECT COUNT(*) FROM documents")?,
        questions: count("SELECT COUNT(*) FROM questions")?,
        alternatives: count("SELECT COUNT(*) FROM alternatives")?,
        with_plate: count("SELECT COUNT(*) FROM questions WHERE plate_code <> ''")?,
        missing_correct: count(
            "SELECT COUNT(*) FROM questions q
             WHERE NOT EXISTS (
                 SELECT 1 FROM alternatives a
                 WHERE a.question_id = q.id AND a.is_correct = 1 AND a.text <> ''
             )",
        )?,
    })
}

#[cfg(test)]
pub fn open_in_memory() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
    init_schema(&conn).unwrap();
    conn
}
