use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{CatalogEntry, EntryKind};

pub const MOVIES_TABLE: &str = "movies";
pub const SERIES_TABLE: &str = "series";

/// Open (or create) the file-backed store. The connection is the store handle.
pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS movies (
            id     INTEGER PRIMARY KEY,
            title  TEXT NOT NULL UNIQUE,
            year   INTEGER NOT NULL,
            rating REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS series (
            id       INTEGER PRIMARY KEY,
            title    TEXT NOT NULL UNIQUE,
            year     INTEGER NOT NULL,
            seasons  INTEGER NOT NULL,
            episodes INTEGER NOT NULL
        );
        ",
    )?;
    Ok(())
}

// ── Persisting ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Insert one entry in its own transaction. A title clash rolls back just this entry.
pub fn insert_entry(conn: &Connection, entry: &CatalogEntry) -> Result<InsertOutcome> {
    let tx = conn.unchecked_transaction()?;
    let result = match entry.kind() {
        EntryKind::Movie { rating } => tx.execute(
            "INSERT INTO movies (title, year, rating) VALUES (?1, ?2, ?3)",
            params![entry.title(), entry.year(), rating],
        ),
        EntryKind::Series { seasons, episodes } => tx.execute(
            "INSERT INTO series (title, year, seasons, episodes) VALUES (?1, ?2, ?3, ?4)",
            params![entry.title(), entry.year(), seasons, episodes],
        ),
    };

    match result {
        Ok(_) => {
            tx.commit()?;
            Ok(InsertOutcome::Inserted)
        }
        Err(e) if is_unique_violation(&e) => {
            tx.rollback()?;
            Ok(InsertOutcome::Duplicate)
        }
        Err(e) => {
            tx.rollback()?;
            Err(e).with_context(|| format!("Failed to insert {:?}", entry.title()))
        }
    }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Append-once-per-title persistence, one commit per entry.
/// Creates the tables on first use and reuses them afterwards.
pub fn persist_catalog(conn: &Connection, catalog: &[CatalogEntry]) -> Result<PersistReport> {
    init_schema(conn).context("Failed to initialize the store")?;
    info!("Persisting {} catalog entries", catalog.len());

    let pb = ProgressBar::new(catalog.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len}") {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut report = PersistReport::default();
    for entry in catalog {
        match insert_entry(conn, entry) {
            Ok(InsertOutcome::Inserted) => report.inserted += 1,
            Ok(InsertOutcome::Duplicate) => report.duplicates += 1,
            Err(e) => {
                warn!("{:#}", e);
                report.failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Inserted {} new, ignored {} duplicates, {} failed",
        report.inserted, report.duplicates, report.failed
    );
    Ok(report)
}

// ── Reading ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRow {
    pub id: i64,
    pub title: String,
    pub year: i64,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub id: i64,
    pub title: String,
    pub year: i64,
    pub seasons: i64,
    pub episodes: i64,
}

pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

pub fn fetch_movies(conn: &Connection) -> Result<Vec<MovieRow>> {
    let mut stmt = conn.prepare("SELECT id, title, year, rating FROM movies ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MovieRow {
                id: row.get(0)?,
                title: row.get(1)?,
                year: row.get(2)?,
                rating: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_series(conn: &Connection) -> Result<Vec<SeriesRow>> {
    let mut stmt =
        conn.prepare("SELECT id, title, year, seasons, episodes FROM series ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SeriesRow {
                id: row.get(0)?,
                title: row.get(1)?,
                year: row.get(2)?,
                seasons: row.get(3)?,
                episodes: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub movies: usize,
    pub series: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |table: &str| -> Result<usize> {
        if !table_exists(conn, table)? {
            return Ok(0);
        }
        let n: usize =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
        Ok(n)
    };
    Ok(Stats {
        movies: count(MOVIES_TABLE)?,
        series: count(SERIES_TABLE)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn sample_catalog() -> Vec<CatalogEntry> {
        vec![
            CatalogEntry::movie("Film A", 2001, 9.5).unwrap(),
            CatalogEntry::movie("Film B", 1999, 8.6).unwrap(),
            CatalogEntry::series("Show C", 2010, 3, 24).unwrap(),
        ]
    }

    #[test]
    fn first_run_inserts_everything() {
        let conn = store();
        let report = persist_catalog(&conn, &sample_catalog()).unwrap();
        assert_eq!(
            report,
            PersistReport {
                inserted: 3,
                duplicates: 0,
                failed: 0
            }
        );
        assert_eq!(fetch_movies(&conn).unwrap().len(), 2);
        let series = fetch_series(&conn).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].episodes, 24);
    }

    #[test]
    fn second_run_is_all_duplicates() {
        let conn = store();
        persist_catalog(&conn, &sample_catalog()).unwrap();
        let report = persist_catalog(&conn, &sample_catalog()).unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.duplicates, 3);

        let stats = get_stats(&conn).unwrap();
        assert_eq!((stats.movies, stats.series), (2, 1));
    }

    #[test]
    fn duplicate_does_not_undo_earlier_inserts() {
        let conn = store();
        let catalog = vec![
            CatalogEntry::movie("One", 2000, 8.0).unwrap(),
            CatalogEntry::movie("One", 2001, 7.0).unwrap(),
            CatalogEntry::movie("Two", 2002, 6.0).unwrap(),
        ];
        let report = persist_catalog(&conn, &catalog).unwrap();
        assert_eq!((report.inserted, report.duplicates), (2, 1));

        let movies = fetch_movies(&conn).unwrap();
        assert_eq!(movies[0].title, "One");
        assert_eq!(movies[0].year, 2000, "first write wins, never updated");
        assert_eq!(movies[1].title, "Two");
    }

    #[test]
    fn same_title_allowed_across_tables() {
        let conn = store();
        let catalog = vec![
            CatalogEntry::movie("Fargo", 1996, 8.1).unwrap(),
            CatalogEntry::series("Fargo", 2014, 5, 51).unwrap(),
        ];
        assert_eq!(persist_catalog(&conn, &catalog).unwrap().inserted, 2);
    }

    #[test]
    fn creates_tables_on_first_persist() {
        let conn = Connection::open_in_memory().unwrap();
        let report = persist_catalog(&conn, &sample_catalog()).unwrap();
        assert_eq!((report.inserted, report.duplicates), (3, 0));
        assert!(table_exists(&conn, MOVIES_TABLE).unwrap());
        assert!(table_exists(&conn, SERIES_TABLE).unwrap());
    }

    #[test]
    fn other_failures_are_counted_not_fatal() {
        let conn = store();
        conn.execute_batch(
            "CREATE TRIGGER series_read_only BEFORE INSERT ON series
             BEGIN SELECT RAISE(ABORT, 'read only'); END;",
        )
        .unwrap();
        let report = persist_catalog(&conn, &sample_catalog()).unwrap();
        assert_eq!(
            report,
            PersistReport {
                inserted: 2,
                duplicates: 0,
                failed: 1
            }
        );
    }

    #[test]
    fn missing_tables_detected() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!table_exists(&conn, MOVIES_TABLE).unwrap());
        let stats = get_stats(&conn).unwrap();
        assert_eq!((stats.movies, stats.series), (0, 0));
    }

    #[test]
    fn file_store_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imdb.db");
        {
            let conn = connect(&path).unwrap();
            init_schema(&conn).unwrap();
            assert_eq!(persist_catalog(&conn, &sample_catalog()).unwrap().inserted, 3);
        }
        let conn = connect(&path).unwrap();
        init_schema(&conn).unwrap();
        let report = persist_catalog(&conn, &sample_catalog()).unwrap();
        assert_eq!((report.inserted, report.duplicates), (0, 3));
    }
}
