//! Error types for the data-preparation pipeline.
//!
//! One `thiserror` hierarchy covers the whole run. Structural problems
//! (missing inputs, absent columns, non-coercible values, zero denominators)
//! are fatal; row-level anomalies never surface here — they become nulls or
//! sentinels at the call site.

use thiserror::Error;

/// The main error type for the preparation pipeline.
#[derive(Error, Debug)]
pub enum PrepError {
    /// Neither the remote source nor the local cache produced a listings table.
    #[error("listings data unavailable: {0}")]
    DataUnavailable(String),

    /// An expected column is absent from an input table.
    #[error("column '{column}' missing from {table}")]
    SchemaMismatch { column: String, table: String },

    /// A value could not be coerced to its declared type after null-handling.
    #[error("cannot coerce value '{value}' in column '{column}' (row ID {row})")]
    Coercion {
        column: String,
        row: String,
        value: String,
    },

    /// Zero denominator in a derived-ratio computation. Upstream filtering
    /// must have removed zero-area rows, so this is an invariant violation.
    #[error("zero denominator computing ratio over '{column}'")]
    Division { column: String },

    /// A categorical value has no ordinal mapping and the strict policy is active.
    #[error("no ordinal mapping for '{value}' in column '{column}'")]
    UnmappedCategory { column: String, value: String },

    /// The boundary file declares a coordinate reference system the pipeline
    /// cannot reproject.
    #[error("unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// HTTP error from the dataset fetch.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed boundary file.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Malformed density workbook.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PrepError>,
    },
}

impl PrepError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PrepError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PrepError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_row_identity() {
        let err = PrepError::Coercion {
            column: "Price".to_string(),
            row: "11112222".to_string(),
            value: "abc".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Price"));
        assert!(msg.contains("11112222"));
        assert!(msg.contains("abc"));
    }

    #[test]
    fn test_with_context_preserves_source() {
        let err = PrepError::SchemaMismatch {
            column: "Refnis".to_string(),
            table: "density reference".to_string(),
        }
        .with_context("loading reference data");
        assert!(err.to_string().contains("loading reference data"));
        assert!(err.to_string().contains("Refnis"));
    }

    #[test]
    fn test_context_on_polars_result() {
        let res: std::result::Result<(), polars::error::PolarsError> = Err(
            polars::error::PolarsError::ComputeError("boom".into()),
        );
        let err = res.context("during join").unwrap_err();
        assert!(err.to_string().contains("during join"));
    }
}
