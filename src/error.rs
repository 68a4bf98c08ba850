use std::path::PathBuf;

use thiserror::Error;

/// Network or transport failure while fetching the chart page. Fatal to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Why a single chart item was dropped during extraction.
#[derive(Debug, Error, PartialEq)]
pub enum FragmentError {
    #[error("item has no title element")]
    MissingTitle,
    #[error("item title is empty")]
    EmptyTitle,
    #[error("unparseable rating {0:?}")]
    BadRating(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog entries need a non-empty title")]
    EmptyTitle,
}

/// A single export artifact that could not be written.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("writing {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("serializing {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("loading settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("limit must be a positive integer")]
    ZeroLimit,
}
