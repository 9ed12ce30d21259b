//! Column vocabulary for the listings table and its reference data.
//!
//! Every stage reads its column lists from here so there is exactly one
//! source of truth for what the pipeline expects, fills, coerces, and drops.

use crate::error::{PrepError, Result};
use polars::prelude::*;

/// Columns that must be present in the raw listings table.
pub const REQUIRED_RAW_COLUMNS: &[&str] = &[
    "ID",
    "Price",
    "LivingArea",
    "Latitude",
    "Longitude",
    "SaleType",
    "BidStylePricing",
    "PropertySubType",
];

/// Count/flag columns where absence means "feature not present", not "unknown".
pub const ZERO_FILL_COLUMNS: &[&str] = &[
    "Furnished",
    "Fireplace",
    "Terrace",
    "TerraceArea",
    "Garden",
    "GardenArea",
    "SwimmingPool",
    "BidStylePricing",
    "ViewCount",
    "bookmarkCount",
];

/// Categorical text columns that get title-cased and trimmed.
pub const TEXT_COLUMNS: &[&str] = &[
    "City",
    "Region",
    "District",
    "Province",
    "PropertyType",
    "PropertySubType",
    "KitchenType",
    "Condition",
    "EPCScore",
];

/// Columns coerced to Float64, nulls preserved.
pub const FLOAT_COLUMNS: &[&str] = &[
    "Price",
    "LivingArea",
    "TerraceArea",
    "GardenArea",
    "EnergyConsumptionPerSqm",
];

/// Columns coerced to nullable Int64 via round-half-to-even.
pub const INT_COLUMNS: &[&str] = &[
    "ID",
    "PostalCode",
    "ConstructionYear",
    "BedroomCount",
    "Furnished",
    "Fireplace",
    "Terrace",
    "Garden",
    "Facades",
    "SwimmingPool",
    "bookmarkCount",
    "ViewCount",
    "BidStylePricing",
];

/// Listing-date columns parsed into calendar dates.
pub const DATE_COLUMNS: &[&str] = &[
    "ListingCreateDate",
    "ListingExpirationDate",
    "ListingCloseDate",
];

/// Identifying/free-text columns with no downstream use. Dropped when present.
pub const DROP_COLUMNS: &[&str] = &[
    "PropertyUrl",
    "Property url",
    "Street",
    "HouseNumber",
    "Box",
    "Floor",
];

/// Municipality code property on the boundary features, and the spatial-join
/// output column. `-1` is the sentinel for unmatched rows.
pub const MUNICIPALITY_KEY: &str = "cd_munty_refnis";

/// Municipality name property kept from the boundary features.
pub const MUNICIPALITY_NAME: &str = "tx_munty_descr_nl";

/// Key column of the density reference, carried into the joined table.
pub const DENSITY_KEY: &str = "Refnis";

/// Density value column added by the equi-join.
pub const DENSITY_VALUE: &str = "PopulationDensity";

/// Verify that `columns` are all present in `df`, naming the first absent one.
pub fn ensure_columns(df: &DataFrame, columns: &[&str], table: &str) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for column in columns {
        if !present.iter().any(|c| c == column) {
            return Err(PrepError::SchemaMismatch {
                column: (*column).to_string(),
                table: table.to_string(),
            });
        }
    }
    Ok(())
}
