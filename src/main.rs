mod config;
mod db;
mod error;
mod extract;
mod import;
mod modules;
mod parser;
mod pipeline;
mod seed;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::extract::Backend;
use crate::import::ImportOptions;
use crate::parser::normalize::Normalizer;
use crate::pipeline::{ImportJob, PageRange, SourceFile};

#[derive(Parser)]
#[command(name = "senatran_importer", about = "SENATRAN question bank PDF importer")]
struct Cli {
    /// SQLite database (overrides SENATRAN_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, parse and store the questions of a bank PDF
    Import {
        /// Source document
        pdf_path: PathBuf,
        /// Name of an existing, active course
        #[arg(long = "curso")]
        course: String,
        /// Document title (created when missing)
        #[arg(long = "documento")]
        document: String,
        /// Document year
        #[arg(long = "ano")]
        year: Option<u32>,
        /// Only these pages: N or N-M
        #[arg(long, value_parser = parse_page_range)]
        pages: Option<PageRange>,
        /// Parse and resolve only, write nothing
        #[arg(long)]
        dry_run: bool,
        /// Abort on the first page outside every module
        #[arg(long = "strict-modulo")]
        strict_module: bool,
        /// Abort once more module resolution errors than this occur
        #[arg(long, default_value_t = 20)]
        max_errors: usize,
        /// Text extraction backend (overrides SENATRAN_BACKEND)
        #[arg(long, value_enum)]
        backend: Option<Backend>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create or refresh the "Primeira Habilitação" course and SENATRAN 2025 modules
    SeedModules,
    /// Show database counts
    Stats,
}

fn parse_page_range(s: &str) -> Result<PageRange, String> {
    s.parse().map_err(|e: error::ImportError| e.to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let db_path = cli.db.unwrap_or_else(|| settings.db_path.clone());

    let conn = db::connect(&db_path)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import {
            pdf_path,
            course,
            document,
            year,
            pages,
            dry_run,
            strict_module,
            max_errors,
            backend,
            json,
        } => {
            let backend = backend.unwrap_or(settings.backend);
            let normalizer = Normalizer::with_extra_footers(&settings.extra_footer_patterns)
                .context("Invalid extra_footer_patterns")?;
            let source = extract::open_source(backend, &pdf_path, &settings.pdftotext)?;
            info!(path = ?pdf_path, backend = backend.name(), db = ?db_path, "starting import");

            let job = ImportJob {
                course_name: &course,
                document_title: &document,
                year,
                pages,
                source: SourceFile::from_path(&pdf_path)?,
                options: ImportOptions {
                    dry_run,
                    strict_module,
                    max_errors: Some(max_errors),
                },
            };
            let report = pipeline::run(&conn, source.as_ref(), &normalizer, &job)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print();
            }
        }
        Commands::SeedModules => {
            let n = seed::seed_senatran_2025(&conn)?;
            println!("Course \"{}\" ready with {} modules.", seed::COURSE_NAME, n);
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Courses:          {}", s.courses);
            println!("Modules:          {}", s.modules);
            println!("Documents:        {}", s.documents);
            println!("Questions:        {}", s.questions);
            println!("Alternatives:     {}", s.alternatives);
            println!("With plate code:  {}", s.with_plate);
            println!("Missing correct:  {}", s.missing_correct);
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}
