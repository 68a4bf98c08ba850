use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::{info, warn};

use crate::error::FetchError;
use crate::parser::{self, RawRecord};
use crate::settings::Settings;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const ACCEPT_LANGUAGE_PT: &str = "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7";

/// Fetch the chart page and extract up to `settings.limit` records.
///
/// An empty result on success means the markup no longer matched; deciding
/// whether that is fatal is left to the caller.
pub fn extract(settings: &Settings) -> Result<Vec<RawRecord>, FetchError> {
    let html = fetch_chart(
        &settings.url,
        Duration::from_secs(settings.timeout_secs),
    )?;
    let records = parser::parse_chart(&html, settings.limit);
    info!("Extracted {} records (limit {})", records.len(), settings.limit);
    Ok(records)
}

/// Single blocking GET with browser-like, Portuguese-first headers.
pub fn fetch_chart(url: &str, timeout: Duration) -> Result<String, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_PT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(FetchError::Client)?;

    info!("Fetching chart: {}", url);
    let start = Instant::now();
    let transport = |source| FetchError::Transport {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        warn!("Chart request returned {}", status);
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }
    let body = response.text().map_err(transport)?;

    info!(
        "Fetched {} bytes in {}ms",
        body.len(),
        start.elapsed().as_millis()
    );
    Ok(body)
}
