use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::{self, MovieRow, SeriesRow, MOVIES_TABLE, SERIES_TABLE};
use crate::error::ExportError;

/// Movies strictly above this rating make the top-rated cut.
pub const TOP_RATED_THRESHOLD: f64 = 9.0;

const MOVIE_COLUMNS: [&str; 4] = ["id", "title", "year", "rating"];
const SERIES_COLUMNS: [&str; 5] = ["id", "title", "year", "seasons", "episodes"];

// ── Loading ──

pub struct LoadedTables {
    pub movies: Vec<MovieRow>,
    pub series: Vec<SeriesRow>,
    /// Tables that did not exist yet and were read as empty.
    pub missing: Vec<&'static str>,
}

pub fn load_tables(conn: &Connection) -> Result<LoadedTables> {
    let mut missing = Vec::new();

    let movies = if db::table_exists(conn, MOVIES_TABLE)? {
        db::fetch_movies(conn)?
    } else {
        missing.push(MOVIES_TABLE);
        Vec::new()
    };
    let series = if db::table_exists(conn, SERIES_TABLE)? {
        db::fetch_series(conn)?
    } else {
        missing.push(SERIES_TABLE);
        Vec::new()
    };

    if !missing.is_empty() {
        warn!("Tables not created yet, read as empty: {}", missing.join(", "));
    }
    info!("Loaded {} movies and {} series", movies.len(), series.len());
    Ok(LoadedTables {
        movies,
        series,
        missing,
    })
}

// ── Sorting, filtering, export ──

pub struct ExportReport {
    /// Movies rated above `TOP_RATED_THRESHOLD`, best first.
    pub top_rated: Vec<MovieRow>,
    pub written: Vec<PathBuf>,
    pub failures: Vec<ExportError>,
}

/// Best first; equal ratings keep their original relative order.
pub fn sort_by_rating(movies: &[MovieRow]) -> Vec<MovieRow> {
    let mut sorted = movies.to_vec();
    sorted.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    sorted
}

/// Writes movies.{csv,json} (sorted) and series.{csv,json} into `out_dir`.
/// Export failures are collected; the filtered subset is returned regardless.
pub fn export_and_filter(movies: &[MovieRow], series: &[SeriesRow], out_dir: &Path) -> ExportReport {
    let sorted = sort_by_rating(movies);
    let top_rated: Vec<MovieRow> = sorted
        .iter()
        .filter(|m| m.rating > TOP_RATED_THRESHOLD)
        .cloned()
        .collect();

    if let Err(e) = fs::create_dir_all(out_dir) {
        warn!("Could not create export dir {:?}: {}", out_dir, e);
    }

    let attempts = [
        write_csv(&out_dir.join("movies.csv"), &MOVIE_COLUMNS, &sorted),
        write_csv(&out_dir.join("series.csv"), &SERIES_COLUMNS, series),
        write_json(&out_dir.join("movies.json"), &sorted),
        write_json(&out_dir.join("series.json"), series),
    ];

    let mut written = Vec::new();
    let mut failures = Vec::new();
    for attempt in attempts {
        match attempt {
            Ok(path) => written.push(path),
            Err(e) => {
                warn!("Export failed: {}", e);
                failures.push(e);
            }
        }
    }

    info!(
        "Exported {} files ({} failed), {} movies above {}",
        written.len(),
        failures.len(),
        top_rated.len(),
        TOP_RATED_THRESHOLD
    );
    ExportReport {
        top_rated,
        written,
        failures,
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Header row, then one line per record. No index column.
/// The header is written up front so empty tables still get one.
fn write_csv<R: Serialize>(
    path: &Path,
    columns: &[&str],
    records: &[R],
) -> Result<PathBuf, ExportError> {
    let to_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(to_err)?;
    wtr.write_record(columns).map_err(to_err)?;
    for record in records {
        wtr.serialize(record).map_err(to_err)?;
    }
    wtr.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

/// List of objects, 4-space indent, non-ASCII written as-is.
fn write_json<R: Serialize>(path: &Path, records: &[R]) -> Result<PathBuf, ExportError> {
    let mut file = create(path)?;
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut file, formatter);
    records
        .serialize(&mut ser)
        .map_err(|source| ExportError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    file.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

// ── Classification ──

/// Rating bucket. Declaration order is best to worst and drives column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    Masterpiece,
    Excellent,
    VeryGood,
    Good,
    Average,
}

impl Bucket {
    /// Half-open ranges, checked top to bottom.
    pub fn from_rating(rating: f64) -> Self {
        if rating >= 9.0 {
            Bucket::Masterpiece
        } else if rating >= 8.5 {
            Bucket::Excellent
        } else if rating >= 7.5 {
            Bucket::VeryGood
        } else if rating >= 6.0 {
            Bucket::Good
        } else {
            Bucket::Average
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Masterpiece => "Masterpiece",
            Bucket::Excellent => "Excellent",
            Bucket::VeryGood => "Very Good",
            Bucket::Good => "Good",
            Bucket::Average => "Average",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMovie {
    pub movie: MovieRow,
    pub bucket: Bucket,
}

/// Year x bucket counts. Columns are the buckets present in the data;
/// every row has a value for every column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryTable {
    columns: Vec<Bucket>,
    rows: BTreeMap<i64, Vec<usize>>,
}

impl SummaryTable {
    pub fn columns(&self) -> &[Bucket] {
        &self.columns
    }

    pub fn years(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 0 for any combination not seen, including unknown years or buckets.
    pub fn count(&self, year: i64, bucket: Bucket) -> usize {
        let Some(col) = self.columns.iter().position(|b| *b == bucket) else {
            return 0;
        };
        self.rows.get(&year).map(|r| r[col]).unwrap_or(0)
    }

    pub fn row_total(&self, year: i64) -> usize {
        self.rows.get(&year).map(|r| r.iter().sum()).unwrap_or(0)
    }

    /// Last `n` years in ascending order.
    pub fn recent_years(&self, n: usize) -> impl Iterator<Item = i64> + '_ {
        self.years().skip(self.rows.len().saturating_sub(n))
    }
}

pub fn classify_and_summarize(movies: &[MovieRow]) -> (SummaryTable, Vec<ClassifiedMovie>) {
    let classified: Vec<ClassifiedMovie> = movies
        .iter()
        .map(|m| ClassifiedMovie {
            movie: m.clone(),
            bucket: Bucket::from_rating(m.rating),
        })
        .collect();

    let columns: Vec<Bucket> = classified
        .iter()
        .map(|c| c.bucket)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut rows: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for c in &classified {
        let col = columns
            .iter()
            .position(|b| *b == c.bucket)
            .unwrap_or_default();
        rows.entry(c.movie.year).or_insert_with(|| vec![0; columns.len()])[col] += 1;
    }

    (SummaryTable { columns, rows }, classified)
}
