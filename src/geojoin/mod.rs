//! Geo-join stage: enrich listings with administrative and density columns.
//!
//! Each listing becomes a WGS84 point from its `Latitude`/`Longitude` and is
//! matched against the municipality polygons (left join, containment
//! predicate). The matched municipality code is then the key for a left
//! equi-join against the population-density lookup. Rows that fail either
//! match keep all their original columns and get nulls (or the `-1` key
//! sentinel) in the joined ones.

mod crs;
mod density;
mod regions;

pub use crs::Crs;
pub use regions::{Region, RegionSet};

use crate::config::PrepConfig;
use crate::error::Result;
use crate::schema::{self, DENSITY_KEY, DENSITY_VALUE, MUNICIPALITY_KEY, MUNICIPALITY_NAME};
use crate::utils::numeric_value;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Join-key sentinel for rows without a municipality match, keeping the
/// merge key type-stable.
pub const UNMATCHED_MUNICIPALITY: i64 = -1;

/// Spatial and attribute joiner over the two reference datasets.
pub struct GeoJoiner {
    regions: RegionSet,
    density: HashMap<i64, f64>,
}

impl GeoJoiner {
    /// Load both reference datasets from the configured paths.
    pub fn load(config: &PrepConfig) -> Result<Self> {
        let regions = RegionSet::from_file(&config.municipality_file)?;
        if regions.is_empty() {
            warn!("Municipality boundary set is empty; no listing will match");
        }
        let density = density::load_density(&config.density_file)?;
        info!(
            "Reference data loaded: {} boundaries, {} density entries",
            regions.len(),
            density.len()
        );
        Ok(Self { regions, density })
    }

    /// Build a joiner from already-loaded reference data.
    pub fn from_parts(regions: RegionSet, density: HashMap<i64, f64>) -> Self {
        Self { regions, density }
    }

    /// Attach municipality and density columns to the listings.
    ///
    /// Output row count equals input row count, except when a point lies in
    /// several (overlapping) polygons — then one row per match is emitted and
    /// downstream deduplication by `ID` resolves it.
    pub fn join(&self, df: DataFrame) -> Result<DataFrame> {
        schema::ensure_columns(&df, &["Latitude", "Longitude"], "listings")?;

        let latitudes = df.column("Latitude")?.as_materialized_series().clone();
        let longitudes = df.column("Longitude")?.as_materialized_series().clone();

        let mut take_indices: Vec<IdxSize> = Vec::with_capacity(df.height());
        let mut codes: Vec<Option<i64>> = Vec::with_capacity(df.height());
        let mut names: Vec<Option<String>> = Vec::with_capacity(df.height());
        let mut unmatched = 0usize;

        for row in 0..df.height() {
            let lat = numeric_value(&latitudes.get(row)?);
            let lon = numeric_value(&longitudes.get(row)?);

            // Malformed coordinates are a row-level anomaly: the row simply
            // fails to match.
            let hits = match (lon, lat) {
                (Some(lon), Some(lat)) => self.regions.locate(lon, lat),
                _ => Vec::new(),
            };

            if hits.is_empty() {
                take_indices.push(row as IdxSize);
                codes.push(None);
                names.push(None);
                unmatched += 1;
            } else {
                for region in hits {
                    take_indices.push(row as IdxSize);
                    codes.push(Some(region.refnis));
                    names.push(region.name.clone());
                }
            }
        }

        let mut joined = df.take(&IdxCa::from_vec("take".into(), take_indices))?;

        // Normalize the merge key: sentinel for misses, then Int64 throughout.
        let keys: Vec<i64> = codes
            .iter()
            .map(|c| c.unwrap_or(UNMATCHED_MUNICIPALITY))
            .collect();
        joined.with_column(Series::new(MUNICIPALITY_KEY.into(), keys.clone()))?;
        joined.with_column(Series::new(MUNICIPALITY_NAME.into(), names))?;

        // Left equi-join against the density lookup on the normalized key.
        let mut matched_keys: Vec<Option<i64>> = Vec::with_capacity(keys.len());
        let mut densities: Vec<Option<f64>> = Vec::with_capacity(keys.len());
        for key in &keys {
            match self.density.get(key) {
                Some(value) => {
                    matched_keys.push(Some(*key));
                    densities.push(Some(*value));
                }
                None => {
                    matched_keys.push(None);
                    densities.push(None);
                }
            }
        }
        joined.with_column(Series::new(DENSITY_KEY.into(), matched_keys))?;
        joined.with_column(Series::new(DENSITY_VALUE.into(), densities))?;

        debug!(
            "Spatial join: {} rows in, {} rows out, {} without a municipality",
            df.height(),
            joined.height(),
            unmatched
        );
        Ok(joined)
    }
}
