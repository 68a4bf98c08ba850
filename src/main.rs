mod analysis;
mod catalog;
mod db;
mod error;
mod fetch;
mod parser;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::analysis::{Bucket, SummaryTable};
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "imdb_scraper", about = "IMDb Top 250 scraper, store and reports")]
struct Cli {
    /// Settings file (JSON); IMDB_* env vars override it
    #[arg(short, long, default_value = settings::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the chart and show what was extracted
    Scrape {
        /// Max chart items (overrides settings)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape, store, export and summarize in one go
    Run {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Export and summarize what is already stored
    Analyze,
    /// Row counts per table
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;

    let result = match cli.command {
        Commands::Scrape { limit } => {
            apply_limit(&mut settings, limit)?;
            let records = fetch::extract(&settings)?;
            if records.is_empty() {
                bail!("No records extracted; the chart markup may have changed.");
            }
            println!("Extracted {} records. First 10 titles:", records.len());
            for r in records.iter().take(10) {
                println!("  - {}", r.title);
            }
            println!();
            for r in records.iter().take(5) {
                println!("{} ({}) – Rating: {}", r.title, r.year, r.rating);
            }
            Ok(())
        }
        Commands::Run { limit } => {
            apply_limit(&mut settings, limit)?;

            let records = fetch::extract(&settings)?;
            if records.is_empty() {
                bail!("No records extracted; the chart markup may have changed.");
            }
            let catalog = catalog::build(&records, settings.seed_series()?)?;
            let movies = catalog.iter().filter(|e| e.is_movie()).count();
            println!(
                "Catalog: {} entries ({} movies, {} series)",
                catalog.len(),
                movies,
                catalog.len() - movies
            );
            if let (Some(first), Some(last)) = (catalog.first(), catalog.last()) {
                println!("  first: {}", first);
                println!("  last:  {}", last);
            }

            let conn = db::connect(&settings.db_path)?;
            let report = db::persist_catalog(&conn, &catalog)?;
            println!(
                "Stored: {} new, {} duplicates ignored, {} failed",
                report.inserted, report.duplicates, report.failed
            );

            analyze(&conn, &settings)
        }
        Commands::Analyze => {
            let conn = db::connect(&settings.db_path)?;
            analyze(&conn, &settings)
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            let s = db::get_stats(&conn)?;
            println!("Movies: {}", s.movies);
            println!("Series: {}", s.series);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn apply_limit(settings: &mut Settings, limit: Option<usize>) -> anyhow::Result<()> {
    match limit {
        Some(0) => bail!("--limit must be a positive integer"),
        Some(n) => settings.limit = n,
        None => {}
    }
    Ok(())
}

fn analyze(conn: &Connection, settings: &Settings) -> anyhow::Result<()> {
    let tables = analysis::load_tables(conn).context("Failed to read the store")?;
    for table in &tables.missing {
        println!("Warning: table '{}' does not exist yet.", table);
    }
    if tables.movies.is_empty() {
        println!("No movies stored; nothing to analyze.");
        return Ok(());
    }

    let export = analysis::export_and_filter(&tables.movies, &tables.series, &settings.export_dir);
    for path in &export.written {
        println!("Wrote {}", path.display());
    }
    for failure in &export.failures {
        println!("Export error: {}", failure);
    }

    if export.top_rated.is_empty() {
        println!("\nNo movies rated above {}.", analysis::TOP_RATED_THRESHOLD);
    } else {
        println!("\nTop rated (> {}):", analysis::TOP_RATED_THRESHOLD);
        println!("{:<40} | {:>6} | {:>4}", "Title", "Rating", "Year");
        for m in export.top_rated.iter().take(5) {
            println!("{:<40} | {:>6.1} | {:>4}", truncate(&m.title, 40), m.rating, m.year);
        }
    }

    let (summary, classified) = analysis::classify_and_summarize(&tables.movies);
    println!("\nClassification sample:");
    for c in classified.iter().take(10) {
        println!("  {:<40} {:>4.1}  {}", truncate(&c.movie.title, 40), c.movie.rating, c.bucket);
    }

    println!("\nMovies per year (last 5 years):");
    print_summary(&summary, 5);
    Ok(())
}

fn print_summary(summary: &SummaryTable, last: usize) {
    if summary.is_empty() {
        println!("(empty)");
        return;
    }
    let columns: &[Bucket] = summary.columns();
    print!("{:>6}", "year");
    for b in columns {
        print!(" | {:>11}", b.label());
    }
    println!(" | {:>5}", "total");
    for year in summary.recent_years(last) {
        print!("{:>6}", year);
        for b in columns {
            print!(" | {:>11}", summary.count(year, *b));
        }
        println!(" | {:>5}", summary.row_total(year));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
