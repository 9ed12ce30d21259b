//! Normalizer stage: clean, type-coerce, deduplicate, filter, and derive.
//!
//! The tasks run in a fixed order because later steps assume earlier ones'
//! invariants (the ratio computations in task 14 rely on task 1 having
//! removed null and zero living areas, the ordinal encodings in task 15 rely
//! on task 6 having title-cased the categories). Re-running the cleaner on
//! its own output changes nothing.

mod convert;
pub mod mappings;

pub use mappings::{encode_ordinal, CONDITION_MAPPING, KITCHEN_MAPPING};

use crate::config::PrepConfig;
use crate::error::{PrepError, Result};
use crate::schema::{
    self, DATE_COLUMNS, DROP_COLUMNS, FLOAT_COLUMNS, INT_COLUMNS, TEXT_COLUMNS, ZERO_FILL_COLUMNS,
};
use crate::utils::{numeric_value, row_key};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info};

/// Data cleaner holding the ordered normalization tasks.
pub struct DataCleaner;

impl DataCleaner {
    /// Run the full cleaning sequence over the joined table.
    pub fn clean(&self, df: DataFrame, config: &PrepConfig) -> Result<DataFrame> {
        schema::ensure_columns(&df, &required_columns(), "joined listings")?;

        let rows_before = df.height();
        info!("Cleaning {} rows...", rows_before);

        // Task 1: drop rows with null Price or null/zero LivingArea.
        let mut df = drop_unpriceable_rows(df)?;

        // Task 2: deduplicate by ID, then by all columns except ID.
        df = keep_first(df, &["ID"])?;
        let non_id: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|c| c != "ID")
            .collect();
        let non_id_refs: Vec<&str> = non_id.iter().map(String::as_str).collect();
        df = keep_first(df, &non_id_refs)?;
        debug!("After deduplication: {} rows", df.height());

        // Task 3: zero-fill count/flag columns.
        let ids = df.column("ID")?.as_materialized_series().clone();
        for &column in ZERO_FILL_COLUMNS {
            let series = df.column(column)?.as_materialized_series().clone();
            df.replace(column, convert::zero_fill(&series, &ids)?)?;
        }

        // Task 4: keep residential sales with conventional pricing.
        df = filter_residential(df)?;
        debug!("After residential filter: {} rows", df.height());

        // Task 5: drop identifying/free-text columns.
        let present: Vec<PlSmallStr> = DROP_COLUMNS
            .iter()
            .copied()
            .filter(|&c| has_column(&df, c))
            .map(Into::into)
            .collect();
        if !present.is_empty() {
            df = df.drop_many(present);
        }

        // Task 6: title-case and trim the categorical text columns.
        for &column in TEXT_COLUMNS {
            let series = df.column(column)?.as_materialized_series().clone();
            df.replace(column, convert::format_text_series(&series)?)?;
        }

        // Task 7: repair the corrupted-é encoding defect everywhere.
        let string_columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        for column in &string_columns {
            let series = df.column(column)?.as_materialized_series().clone();
            if series.dtype() == &DataType::String {
                df.replace(column, convert::repair_encoding(&series)?)?;
            }
        }

        // Tasks 8 and 9: numeric coercions, nulls preserved.
        let ids = df.column("ID")?.as_materialized_series().clone();
        for &column in FLOAT_COLUMNS {
            let series = df.column(column)?.as_materialized_series().clone();
            df.replace(column, convert::coerce_float64(&series, &ids)?)?;
        }
        for &column in INT_COLUMNS {
            let series = df.column(column)?.as_materialized_series().clone();
            df.replace(column, convert::coerce_int64(&series, &ids)?)?;
        }

        // Task 10: implausible construction years become null.
        let max_year = config.max_construction_year() as i64;
        let series = df.column("ConstructionYear")?.as_materialized_series().clone();
        let clamped = series.i64()?.apply(|v| v.filter(|year| *year <= max_year));
        df.replace("ConstructionYear", clamped.into_series())?;

        // Task 11: EPC labels carry variant suffixes after an underscore.
        let series = df.column("EPCScore")?.as_materialized_series().clone();
        df.replace("EPCScore", convert::truncate_at_underscore(&series)?)?;

        // Task 12: listing dates.
        for &column in DATE_COLUMNS {
            let series = df.column(column)?.as_materialized_series().clone();
            df.replace(column, convert::parse_date_series(&series)?)?;
        }

        // Task 13: negative energy consumption is physically invalid.
        let series = df
            .column("EnergyConsumptionPerSqm")?
            .as_materialized_series()
            .clone();
        let floored = series.f64()?.apply(|v| v.map(|x| x.max(0.0)));
        df.replace("EnergyConsumptionPerSqm", floored.into_series())?;

        // Task 14: derived area and price-per-area fields.
        compute_derived(&mut df)?;

        // Task 15: ordinal encodings.
        let policy = config.unmapped_categories;
        let condition = df.column("Condition")?.as_materialized_series().clone();
        df.with_column(encode_ordinal(
            &condition,
            &CONDITION_MAPPING,
            "Condition#",
            policy,
        )?)?;
        let kitchen = df.column("KitchenType")?.as_materialized_series().clone();
        df.with_column(encode_ordinal(
            &kitchen,
            &KITCHEN_MAPPING,
            "KitchenType#",
            policy,
        )?)?;

        info!(
            "Cleaning finished: {} rows in, {} rows out",
            rows_before,
            df.height()
        );
        Ok(df)
    }
}

/// Columns the cleaner operates on; all must be present up front.
fn required_columns() -> Vec<&'static str> {
    let mut columns = vec!["ID", "SaleType"];
    for set in [
        ZERO_FILL_COLUMNS,
        TEXT_COLUMNS,
        FLOAT_COLUMNS,
        INT_COLUMNS,
        DATE_COLUMNS,
    ] {
        for column in set {
            if !columns.contains(column) {
                columns.push(*column);
            }
        }
    }
    columns
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Task 1: a row without a price or a positive living area can never carry
/// the derived ratios.
fn drop_unpriceable_rows(df: DataFrame) -> Result<DataFrame> {
    let price = df.column("Price")?.as_materialized_series().clone();
    let living = df.column("LivingArea")?.as_materialized_series().clone();

    let mut mask_values = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let price_present = !matches!(price.get(row)?, AnyValue::Null);
        let living_value = living.get(row)?;
        let living_present = !matches!(living_value, AnyValue::Null)
            && numeric_value(&living_value) != Some(0.0);
        mask_values.push(price_present && living_present);
    }

    let mask = BooleanChunked::from_slice("keep".into(), &mask_values);
    let kept = df.filter(&mask)?;
    debug!(
        "Dropped {} rows without price or living area",
        df.height() - kept.height()
    );
    Ok(kept)
}

/// Keep the first occurrence of each key; order preserved.
fn keep_first(df: DataFrame, key_columns: &[&str]) -> Result<DataFrame> {
    let mut series = Vec::with_capacity(key_columns.len());
    for &column in key_columns {
        series.push(df.column(column)?.as_materialized_series());
    }

    let mut seen = HashSet::with_capacity(df.height());
    let mut mask_values = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        mask_values.push(seen.insert(row_key(&series, row)?));
    }

    let mask = BooleanChunked::from_slice("keep".into(), &mask_values);
    df.filter(&mask).map_err(Into::into)
}

/// Task 4: commercial and auction-style listings have incompatible pricing
/// semantics.
fn filter_residential(df: DataFrame) -> Result<DataFrame> {
    let sale = df.column("SaleType")?.as_materialized_series().clone();
    let bid = df.column("BidStylePricing")?.as_materialized_series().clone();

    let mut mask_values = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let residential = match sale.get(row)? {
            AnyValue::String(s) => s == "residential_sale",
            AnyValue::StringOwned(s) => s.as_str() == "residential_sale",
            _ => false,
        };
        let conventional = numeric_value(&bid.get(row)?) == Some(0.0);
        mask_values.push(residential && conventional);
    }

    let mask = BooleanChunked::from_slice("keep".into(), &mask_values);
    df.filter(&mask).map_err(Into::into)
}

/// Task 14: `TotalArea` and the two price-per-area ratios.
///
/// Task 1 removed zero living areas and task 3 zero-filled the garden and
/// terrace areas, so the denominators here are strictly positive; a zero is
/// an invariant violation, not a data problem.
fn compute_derived(df: &mut DataFrame) -> Result<()> {
    let price = df.column("Price")?.as_materialized_series().clone();
    let living = df.column("LivingArea")?.as_materialized_series().clone();
    let garden = df.column("GardenArea")?.as_materialized_series().clone();
    let terrace = df.column("TerraceArea")?.as_materialized_series().clone();

    let price = price.f64()?;
    let living = living.f64()?;
    let garden = garden.f64()?;
    let terrace = terrace.f64()?;

    let height = df.height();
    let mut totals: Vec<Option<f64>> = Vec::with_capacity(height);
    let mut per_living: Vec<Option<i64>> = Vec::with_capacity(height);
    let mut per_total: Vec<Option<i64>> = Vec::with_capacity(height);

    for row in 0..height {
        let p = price.get(row);
        let l = living.get(row);
        let g = garden.get(row).unwrap_or(0.0);
        let t = terrace.get(row).unwrap_or(0.0);

        let total = l.map(|l| l + g + t);
        totals.push(total);

        match (p, l) {
            (Some(p), Some(l)) => {
                if l == 0.0 {
                    return Err(PrepError::Division {
                        column: "LivingArea".to_string(),
                    });
                }
                per_living.push(Some((p / l).round_ties_even() as i64));
            }
            _ => per_living.push(None),
        }

        match (p, total) {
            (Some(p), Some(total)) => {
                if total == 0.0 {
                    return Err(PrepError::Division {
                        column: "TotalArea".to_string(),
                    });
                }
                per_total.push(Some((p / total).round_ties_even() as i64));
            }
            _ => per_total.push(None),
        }
    }

    df.with_column(Series::new("TotalArea".into(), totals))?;
    df.with_column(Series::new("PricePerLivingSquareMeter".into(), per_living))?;
    df.with_column(Series::new("PricePerTotalSquareMeter".into(), per_total))?;
    Ok(())
}
