//! Real-Estate Listings Data-Preparation Pipeline
//!
//! A batch pipeline built on Rust and Polars that turns raw scraped property
//! records into a modeling-ready table.
//!
//! # Overview
//!
//! Four sequential stages, each consuming the previous stage's output:
//!
//! - **Ingestion**: raw listings from the canonical remote source or the
//!   local cache, keyed by a refresh flag
//! - **Geo-Join**: municipality attachment via point-in-polygon matching
//!   plus a population-density lookup merge
//! - **Normalizer**: an ordered sequence of cleaning, coercion,
//!   deduplication, filtering, and derivation tasks
//! - **Outlier Filter**: per-(municipality, subtype) IQR filtering on the
//!   price-per-living-area ratio
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use immo_prep::{DataPrep, PrepConfig};
//!
//! let config = PrepConfig::builder()
//!     .data_dir("./data/external_data")
//!     .output_dir("./data")
//!     .refresh(false)
//!     .build()?;
//!
//! let result = DataPrep::new(config).run()?;
//! println!("model rows: {}", result.model.height());
//! ```
//!
//! # Configuration
//!
//! [`PrepConfig`] controls the input locations, the snapshot writes, the
//! outlier grouping, and the policy for categorical values that have no
//! ordinal mapping:
//!
//! ```rust,ignore
//! use immo_prep::{PrepConfig, UnmappedCategory};
//!
//! let config = PrepConfig::builder()
//!     .unmapped_categories(UnmappedCategory::Fail)
//!     .iqr_multiplier(3.0)
//!     .build()?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod geojoin;
pub mod ingest;
pub mod outliers;
pub mod pipeline;
pub mod schema;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::DataCleaner;
pub use config::{ConfigValidationError, PrepConfig, PrepConfigBuilder, UnmappedCategory};
pub use error::{PrepError, Result, ResultExt};
pub use geojoin::{GeoJoiner, RegionSet};
pub use outliers::OutlierFilter;
pub use pipeline::{DataPrep, PipelineResult};
