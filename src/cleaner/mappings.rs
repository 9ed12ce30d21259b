//! Fixed categorical-to-ordinal dictionaries.
//!
//! Kept as explicit lookup configuration so the encodings are testable in
//! isolation. Keys are the title-cased category labels as they appear after
//! the text-format task.

use crate::config::UnmappedCategory;
use crate::error::{PrepError, Result};
use once_cell::sync::Lazy;
use polars::prelude::*;
use std::collections::HashMap;

/// Property condition, ordered from worst to best.
pub static CONDITION_MAPPING: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    HashMap::from([
        ("To_Restore", 0),
        ("To_Renovate", 1),
        ("To_Be_Done_Up", 2),
        ("Good", 3),
        ("Just_Renovated", 4),
        ("As_New", 5),
    ])
});

/// Kitchen fit-out, collapsed to installed (1) / not installed (0).
pub static KITCHEN_MAPPING: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    HashMap::from([
        ("Not_Installed", 0),
        ("Usa_Uninstalled", 0),
        ("Installed", 1),
        ("Semi_Equipped", 1),
        ("Hyper_Equipped", 1),
        ("Usa_Installed", 1),
        ("Usa_Semi_Equipped", 1),
        ("Usa_Hyper_Equipped", 1),
    ])
});

/// Encode a categorical text column into an ordinal Int64 column named
/// `target`. Under the default policy unmapped text becomes null; under the
/// strict policy it fails the run with the offending column and value.
pub fn encode_ordinal(
    series: &Series,
    mapping: &HashMap<&'static str, i64>,
    target: &str,
    policy: UnmappedCategory,
) -> Result<Series> {
    let str_series = series.str()?;
    let mut values: Vec<Option<i64>> = Vec::with_capacity(str_series.len());
    for opt_val in str_series.into_iter() {
        match opt_val {
            None => values.push(None),
            Some(raw) => {
                let trimmed = raw.trim();
                match mapping.get(trimmed) {
                    Some(code) => values.push(Some(*code)),
                    None => match policy {
                        UnmappedCategory::Null => values.push(None),
                        UnmappedCategory::Fail => {
                            return Err(PrepError::UnmappedCategory {
                                column: series.name().to_string(),
                                value: trimmed.to_string(),
                            });
                        }
                    },
                }
            }
        }
    }
    Ok(Series::new(target.into(), values))
}
