use rusqlite::Connection;
use tracing::info;

use crate::db::{self, ModuleRow};

pub const COURSE_NAME: &str = "Primeira Habilitação";
pub const COURSE_SLUG: &str = "primeira-habilitacao";

/// (order, name, category, first page, last page) of the SENATRAN 2025 bank.
pub const SENATRAN_2025_MODULES: &[(u32, &str, &str, u32, u32)] = &[
    (1, "Placas, Cores e Caminhos", "CONTEUDO", 1, 77),
    (2, "Escolhas e Consequências", "CONTEUDO", 78, 111),
    (3, "Na Direção da Segurança", "CONTEUDO", 112, 228),
    (4, "Cuidar, Agir e Preservar", "CONTEUDO", 229, 275),
    (5, "Placas, Cores e Caminhos (Teste)", "SIMULADO", 277, 285),
    (6, "Escolhas e Consequências (Teste)", "SIMULADO", 286, 293),
    (7, "Na Direção da Segurança (Teste)", "SIMULADO", 294, 304),
    (8, "Cuidar, Agir e Preservar (Teste)", "SIMULADO", 305, 313),
];

/// Create or refresh the default course and its modules. Safe to re-run.
pub fn seed_senatran_2025(conn: &Connection) -> rusqlite::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let course_id = db::upsert_course(&tx, COURSE_NAME, COURSE_SLUG)?;
    for &(order, name, category, start, end) in SENATRAN_2025_MODULES {
        db::upsert_module(
            &tx,
            &ModuleRow {
                course_id,
                order,
                name,
                category,
                page_start: Some(start),
                page_end: Some(end),
            },
        )?;
    }
    tx.commit()?;
    info!(course_id, modules = SENATRAN_2025_MODULES.len(), "seeded SENATRAN 2025 modules");
    Ok(SENATRAN_2025_MODULES.len())
}
