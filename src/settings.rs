use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::debug;

use crate::catalog::CatalogEntry;
use crate::error::{CatalogError, ConfigError};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
const DEFAULT_CHART_URL: &str = "https://www.imdb.com/pt/chart/top/";
const DEFAULT_LIMIT: usize = 250;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Max chart items processed per run.
    pub limit: usize,
    pub url: String,
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub timeout_secs: u64,
    /// Hand-maintained series appended after the scraped movies.
    pub series: Vec<SeedSeries>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSeries {
    pub title: String,
    pub year: i64,
    pub seasons: u32,
    pub episodes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            limit: DEFAULT_LIMIT,
            url: DEFAULT_CHART_URL.to_string(),
            db_path: PathBuf::from("imdb.db"),
            export_dir: PathBuf::from("."),
            timeout_secs: 30,
            series: vec![
                SeedSeries {
                    title: "Breaking Bad".into(),
                    year: 2008,
                    seasons: 5,
                    episodes: 62,
                },
                SeedSeries {
                    title: "Game of Thrones".into(),
                    year: 2011,
                    seasons: 8,
                    episodes: 73,
                },
            ],
        }
    }
}

impl Settings {
    /// Optional JSON file, then `IMDB_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("IMDB").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if settings.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        debug!(?settings, "settings loaded");
        Ok(settings)
    }

    pub fn seed_series(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.series
            .iter()
            .map(|s| CatalogEntry::series(&s.title, s.year, s.seasons, s.episodes))
            .collect()
    }
}
