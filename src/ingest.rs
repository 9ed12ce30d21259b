//! Ingestion stage: obtain the raw listings table.
//!
//! With `refresh` set, the canonical remote CSV is fetched and persisted as
//! the local cache (a verbatim copy, no index column) before being read
//! back; otherwise the most recent cache is loaded. No value transformation
//! happens here — the stage is a passthrough of raw rows.

use crate::config::PrepConfig;
use crate::error::{PrepError, Result};
use crate::schema::{self, REQUIRED_RAW_COLUMNS};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Load the raw listings table per the configured refresh policy.
///
/// Fails with [`PrepError::DataUnavailable`] when neither the remote source
/// nor the local cache yields a readable table.
pub fn fetch_listings(config: &PrepConfig) -> Result<DataFrame> {
    let cache = config.raw_cache_path();

    if config.refresh {
        info!("Refreshing listings from {}", config.source_url);
        if let Err(e) = download_source(&config.source_url, &cache) {
            warn!("Remote fetch failed ({e}); falling back to local cache");
        }
    } else {
        info!("Loading listings from cache: {}", cache.display());
    }

    let df = match read_raw_csv(&cache) {
        Ok(df) => df,
        Err(cache_err) if !config.refresh => {
            // No usable cache; the remote source is the last resort.
            warn!("Cache unreadable ({cache_err}); fetching remote source");
            download_source(&config.source_url, &cache).map_err(|e| {
                PrepError::DataUnavailable(format!(
                    "no cache at {} and remote fetch failed: {e}",
                    cache.display()
                ))
            })?;
            read_raw_csv(&cache).map_err(|e| {
                PrepError::DataUnavailable(format!(
                    "freshly fetched listings unreadable at {}: {e}",
                    cache.display()
                ))
            })?
        }
        Err(e) => {
            return Err(PrepError::DataUnavailable(format!(
                "no readable listings at {} after refresh: {e}",
                cache.display()
            )));
        }
    };

    schema::ensure_columns(&df, REQUIRED_RAW_COLUMNS, "raw listings")?;
    info!("Listings loaded: {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

/// Fetch the remote CSV and persist it verbatim as the local cache.
fn download_source(url: &str, cache: &Path) -> Result<()> {
    let body = reqwest::blocking::get(url)?.error_for_status()?.text()?;
    if let Some(parent) = cache.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(cache, body.as_bytes())?;
    debug!("Cached {} bytes at {}", body.len(), cache.display());
    Ok(())
}

/// Read the cached listings CSV.
///
/// `PostalCode` is pinned to text so leading zeros survive the raw snapshot.
/// The override only applies when the header carries the column, so a feed
/// without it still loads and fails the schema check with a proper error.
fn read_raw_csv(path: &Path) -> Result<DataFrame> {
    let mut options = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')));

    if header_contains(path, "PostalCode")? {
        let overrides = Schema::from_iter([Field::new("PostalCode".into(), DataType::String)]);
        options = options.with_schema_overwrite(Some(Arc::new(overrides)));
    }

    options
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .map_err(Into::into)
}

fn header_contains(path: &Path, column: &str) -> Result<bool> {
    use std::io::{BufRead, BufReader};
    let file = std::fs::File::open(path)?;
    let mut header = String::new();
    BufReader::new(file).read_line(&mut header)?;
    Ok(header.split(',').any(|c| c.trim().trim_matches('"') == column))
}
