//! `berner-registry`: import, link and grade the Bernese Mountain Dog registry.
//!
//! # Usage
//!
//! ```
//! berner-registry --import-dir ./storage/app/import import --fresh
//! berner-registry import-health
//! berner-registry search "vom berg"
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use berner_registry::import::StageReport;
use berner_registry::query::{self, DogQuery};
use berner_registry::{grading, setup_database, Config, Importer};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "berner-registry", version, about = "Bernese Mountain Dog breeder registry")]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long, value_name = "FILE", env = "BERNER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the CSV extracts (overrides the config file).
    #[arg(long, env = "BERNER_IMPORT_DIR")]
    import_dir: Option<PathBuf>,

    /// SQLite database path (overrides the config file).
    #[arg(long, env = "BERNER_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full pipeline: breeders, dogs, breeder links, litters, grades
    Import {
        /// Empty all entity tables first
        #[arg(long)]
        fresh: bool,
    },
    /// Link dogs to breeders from the breeder details file
    LinkBreeders,
    /// Merge health certifications and regrade the affected dogs
    ImportHealth,
    /// Fill parent and pedigree details from the parent dog file
    ImportParents,
    /// Set litter sire/dam ids from the litter details file
    UpdateLitterIds,
    /// Fill missing litter sire/dam ids by matching parent names
    LinkLitters {
        /// Clear all litter parent ids before linking
        #[arg(long)]
        fresh: bool,
    },
    /// Regrade every dog and breeder
    RecalculateGrades,
    /// Search dogs and breeders by name
    Search {
        term: String,
        /// Only dogs with health data on file
        #[arg(long)]
        complete: bool,
    },
    /// Best living dogs by grade
    Best {
        #[arg(long)]
        sex: Option<String>,
        /// Breeder state
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        max_age: Option<i64>,
        /// Hips on file and not Moderate/Severe
        #[arg(long)]
        require_hips: bool,
        #[arg(long)]
        require_elbows: bool,
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// Living dogs with recent litters
    Active {
        /// First birth year counted (default: the configured window back from now)
        #[arg(long)]
        since: Option<i32>,
        #[arg(long)]
        sex: Option<String>,
        #[arg(long)]
        state: Option<String>,
    },
    /// Store counts and link coverage
    Stats,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    // CLI flags override config file, which overrides defaults.
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.import_dir {
        config.import_dir = dir;
    }
    if let Some(db) = args.db {
        config.database_path = db;
    }

    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path.display()))?;
    setup_database(&conn)?;

    let importer = Importer::new(&conn, &config);

    match args.command {
        Command::Import { fresh } => run_import(&importer, fresh),
        Command::LinkBreeders => {
            match importer.link_breeders()? {
                Some(report) => {
                    println!("✓ Linked {} dogs to breeders", report.linked);
                    println!("  Already linked: {}", report.already_linked);
                    println!("  Not found: {}", report.not_found);
                    if report.invalid > 0 {
                        println!("  Invalid ids: {}", report.invalid);
                    }
                    if report.linked > 0 {
                        let breeders = grading::recalculate_breeder_grades(&conn)?;
                        println!("✓ Regraded {} breeders", breeders);
                    }
                }
                None => println!("⚠️  No breeder links in {}", config.import_dir.display()),
            }
            Ok(())
        }
        Command::ImportHealth => {
            let report = importer.import_health_certifications()?;
            print_stage(&report);
            Ok(())
        }
        Command::ImportParents => {
            let report = importer.import_parent_dogs()?;
            print_stage(&report);
            Ok(())
        }
        Command::UpdateLitterIds => {
            match importer.update_litter_ids()? {
                Some(report) => {
                    println!("✓ Updated {} litters ({} rows)", report.updated, report.rows);
                    println!("  Unchanged: {}", report.unchanged);
                    println!("  Not found: {}", report.not_found);
                }
                None => println!("⚠️  No litter details in {}", config.import_dir.display()),
            }
            Ok(())
        }
        Command::LinkLitters { fresh } => {
            let report = importer.link_litters(fresh)?;
            if fresh {
                println!("✓ Cleared parent ids on {} litters", report.cleared);
            }
            println!("✓ Indexed {} dog names", report.names_indexed);
            println!("✓ Linked {} sires, {} dams ({} candidates)",
                report.sires_linked, report.dams_linked, report.candidates);
            Ok(())
        }
        Command::RecalculateGrades => {
            let summary = importer.recalculate_grades()?;
            println!("✓ Graded {} dogs, {} breeders", summary.dogs, summary.breeders);
            println!("  Average grade: {:.2}", summary.avg_grade);
            Ok(())
        }
        Command::Search { term, complete } => {
            let results = query::search(&conn, &term, complete)?;
            println!("🔍 {} dogs, {} breeders", results.dogs.len(), results.breeders.len());
            for dog in &results.dogs {
                println!("  🐕 {:<50} {}", dog.display_name(), fmt_grade(dog.grade));
            }
            for breeder in &results.breeders {
                println!("  🏠 {:<50} {}", breeder.display_name(), fmt_grade(breeder.grade));
            }
            Ok(())
        }
        Command::Best { sex, state, max_age, require_hips, require_elbows, limit } => {
            let dogs = query::find_dogs(
                &conn,
                &DogQuery {
                    sex,
                    state,
                    max_age,
                    require_hips,
                    require_elbows,
                    limit: Some(limit),
                    ..DogQuery::best()
                },
            )?;
            for (rank, dog) in dogs.iter().enumerate() {
                println!("{:>3}. {:<50} {}", rank + 1, dog.display_name(), fmt_grade(dog.grade));
            }
            Ok(())
        }
        Command::Active { since, sex, state } => {
            let since = since.unwrap_or_else(|| query::since_year(config.recent_litter_years));
            let active = query::active_breeding(&conn, since, sex.as_deref(), state.as_deref())?;
            println!("🐾 {} dogs with litters since {}", active.len(), since);
            for entry in &active {
                println!(
                    "  {:<50} {} (last litter {})",
                    entry.dog.display_name(),
                    fmt_grade(entry.dog.grade),
                    entry.most_recent_litter_year.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string())
                );
            }
            Ok(())
        }
        Command::Stats => {
            let stats = query::registry_stats(&conn)?;
            println!("📊 Registry");
            println!("  Breeders: {}", stats.breeders);
            println!("  Dogs: {} ({} graded, {} with breeder)",
                stats.dogs, stats.graded_dogs, stats.dogs_with_breeder);
            println!("  Litters: {}", stats.litters);
            println!("    with sire: {}", stats.litters_with_sire);
            println!("    with dam: {}", stats.litters_with_dam);
            println!("    with both: {}", stats.litters_with_both);
            Ok(())
        }
    }
}

fn run_import(importer: &Importer, fresh: bool) -> Result<()> {
    println!("🗄️  Import: CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let report = importer.run_pipeline(fresh)?;

    print_stage(&report.breeders);
    print_stage(&report.dogs);
    match &report.breeder_links {
        Some(links) => println!("✓ link_breeders: {} linked, {} not found", links.linked, links.not_found),
        None => println!("⚠️  link_breeders: skipped"),
    }
    print_stage(&report.litters);
    println!("✓ grades: {} dogs, {} breeders (avg {:.2})",
        report.grades.dogs, report.grades.breeders, report.grades.avg_grade);

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {} breeders, {} dogs, {} litters",
        report.counts.breeders, report.counts.dogs, report.counts.litters);

    Ok(())
}

fn print_stage(report: &StageReport) {
    if !report.file_found() {
        println!("⚠️  {}: no input file", report.stage);
        return;
    }
    println!(
        "✓ {}: {} rows, {} created, {} updated, {} skipped",
        report.stage, report.rows, report.created, report.updated, report.skipped
    );
    if report.no_data > 0 {
        println!("  No data: {}", report.no_data);
    }
    if report.graded > 0 {
        println!("  Graded: {}", report.graded);
    }
}

fn fmt_grade(grade: Option<f64>) -> String {
    grade.map(|g| format!("{:.2}", g)).unwrap_or_else(|| "-".to_string())
}
