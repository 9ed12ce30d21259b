//! Configuration for the data-preparation pipeline.
//!
//! Built through a fluent builder so callers only name what they override.
//! Validation happens once at build time; the stages trust the config after
//! that.

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Canonical remote source of the scraped listings feed.
pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/bear-revels/immo-eliza-scraping-Python_Pricers/main/data/all_property_details.csv";

/// How far past the reference year a construction year may lie before it is
/// treated as a data-entry error.
pub const CONSTRUCTION_YEAR_SLACK: i32 = 10;

/// Policy for categorical text with no ordinal mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UnmappedCategory {
    /// Encode unmapped text as null (keeps the row, loses the signal).
    #[default]
    Null,
    /// Fail the run with the offending column and value.
    Fail,
}

/// Configuration for the preparation pipeline.
///
/// Use [`PrepConfig::builder()`] for fluent construction.
///
/// # Example
///
/// ```rust,ignore
/// use immo_prep::PrepConfig;
///
/// let config = PrepConfig::builder()
///     .data_dir("./data/external_data")
///     .refresh(true)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepConfig {
    /// Remote URL of the raw listings CSV.
    pub source_url: String,

    /// Directory holding the local cache and the reference files.
    pub data_dir: PathBuf,

    /// Directory receiving the per-stage CSV snapshots.
    pub output_dir: PathBuf,

    /// Municipality boundary file (GeoJSON).
    pub municipality_file: PathBuf,

    /// Population density workbook (xlsx).
    pub density_file: PathBuf,

    /// When true, fetch the remote source and refresh the cache; otherwise
    /// load the most recent cache.
    pub refresh: bool,

    /// When false, skip all snapshot writes and keep results in memory only.
    pub save_outputs: bool,

    /// Policy for categorical values missing from the ordinal dictionaries.
    pub unmapped_categories: UnmappedCategory,

    /// Column the outlier filter operates on.
    pub outlier_column: String,

    /// Grouping columns for per-partition outlier removal.
    pub grouping_columns: Vec<String>,

    /// IQR multiplier for the outlier bounds.
    pub iqr_multiplier: f64,

    /// Reference year for the construction-year plausibility bound.
    /// Defaults to the current calendar year when unset.
    pub reference_year: Option<i32>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./data/external_data");
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            municipality_file: data_dir.join("REFNIS_CODES.geojson"),
            density_file: data_dir.join("PopDensity.xlsx"),
            data_dir,
            output_dir: PathBuf::from("./data"),
            refresh: false,
            save_outputs: true,
            unmapped_categories: UnmappedCategory::default(),
            outlier_column: "PricePerLivingSquareMeter".to_string(),
            grouping_columns: vec!["Refnis".to_string(), "PropertySubType".to_string()],
            iqr_multiplier: 1.5,
            reference_year: None,
        }
    }
}

impl PrepConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PrepConfigBuilder {
        PrepConfigBuilder::default()
    }

    /// Location of the raw listings cache.
    pub fn raw_cache_path(&self) -> PathBuf {
        self.data_dir.join("raw_data.csv")
    }

    /// Latest construction year accepted as plausible.
    pub fn max_construction_year(&self) -> i32 {
        let reference = self
            .reference_year
            .unwrap_or_else(|| Local::now().year());
        reference + CONSTRUCTION_YEAR_SLACK
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier <= 0.0 {
            return Err(ConfigValidationError::InvalidIqrMultiplier(
                self.iqr_multiplier,
            ));
        }
        if self.outlier_column.is_empty() {
            return Err(ConfigValidationError::EmptyField("outlier_column"));
        }
        if self.grouping_columns.is_empty() {
            return Err(ConfigValidationError::EmptyField("grouping_columns"));
        }
        if self.source_url.is_empty() {
            return Err(ConfigValidationError::EmptyField("source_url"));
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("invalid IQR multiplier: {0} (must be finite and positive)")]
    InvalidIqrMultiplier(f64),

    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Builder for [`PrepConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PrepConfigBuilder {
    source_url: Option<String>,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    municipality_file: Option<PathBuf>,
    density_file: Option<PathBuf>,
    refresh: Option<bool>,
    save_outputs: Option<bool>,
    unmapped_categories: Option<UnmappedCategory>,
    outlier_column: Option<String>,
    grouping_columns: Option<Vec<String>>,
    iqr_multiplier: Option<f64>,
    reference_year: Option<i32>,
}

impl PrepConfigBuilder {
    /// Set the remote URL of the raw listings CSV.
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Set the directory holding the cache and reference files.
    ///
    /// The municipality and density paths default to this directory unless
    /// set explicitly.
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Set the directory receiving the per-stage snapshots.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the municipality boundary file.
    pub fn municipality_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.municipality_file = Some(path.into());
        self
    }

    /// Set the population density workbook.
    pub fn density_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.density_file = Some(path.into());
        self
    }

    /// Fetch the remote source instead of loading the cache.
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// Enable or disable the per-stage snapshot writes.
    pub fn save_outputs(mut self, save: bool) -> Self {
        self.save_outputs = Some(save);
        self
    }

    /// Set the policy for unmapped categorical values.
    pub fn unmapped_categories(mut self, policy: UnmappedCategory) -> Self {
        self.unmapped_categories = Some(policy);
        self
    }

    /// Set the column the outlier filter operates on.
    pub fn outlier_column(mut self, column: impl Into<String>) -> Self {
        self.outlier_column = Some(column.into());
        self
    }

    /// Set the grouping columns for per-partition outlier removal.
    pub fn grouping_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grouping_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the IQR multiplier for the outlier bounds.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    /// Pin the reference year for the construction-year bound (tests).
    pub fn reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PrepConfig` or an error if validation fails.
    pub fn build(self) -> Result<PrepConfig, ConfigValidationError> {
        let defaults = PrepConfig::default();
        let data_dir = self.data_dir.unwrap_or(defaults.data_dir);
        let config = PrepConfig {
            source_url: self.source_url.unwrap_or(defaults.source_url),
            municipality_file: self
                .municipality_file
                .unwrap_or_else(|| data_dir.join("REFNIS_CODES.geojson")),
            density_file: self
                .density_file
                .unwrap_or_else(|| data_dir.join("PopDensity.xlsx")),
            data_dir,
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            refresh: self.refresh.unwrap_or(false),
            save_outputs: self.save_outputs.unwrap_or(true),
            unmapped_categories: self.unmapped_categories.unwrap_or_default(),
            outlier_column: self.outlier_column.unwrap_or(defaults.outlier_column),
            grouping_columns: self.grouping_columns.unwrap_or(defaults.grouping_columns),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(defaults.iqr_multiplier),
            reference_year: self.reference_year,
        };

        config.validate()?;
        Ok(config)
    }
}
