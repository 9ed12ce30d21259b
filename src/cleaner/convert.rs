//! Value-level conversions used by the cleaning tasks.
//!
//! Each function rebuilds a full Series, passing nulls through untouched.
//! Coercions that hit a non-convertible value surface the offending column
//! and row identity instead of silently dropping data.

use crate::error::{PrepError, Result};
use crate::utils::is_numeric_dtype;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Days between 0001-01-01 (CE) and the 1970-01-01 epoch polars dates count from.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Title-case a value the way the upstream categories are cased: the first
/// letter after any non-alphabetic character is uppercased, the rest
/// lowercased (`TO_BE_DONE_UP` -> `To_Be_Done_Up`).
pub(crate) fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut boundary = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if boundary {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            boundary = false;
        } else {
            out.push(ch);
            boundary = true;
        }
    }
    out
}

/// Trim and title-case a categorical text column. Non-string columns pass
/// through unchanged.
pub(crate) fn format_text_series(series: &Series) -> Result<Series> {
    if series.dtype() != &DataType::String {
        return Ok(series.clone());
    }
    let str_series = series.str()?;
    let mut values: Vec<Option<String>> = Vec::with_capacity(str_series.len());
    for opt_val in str_series.into_iter() {
        values.push(opt_val.map(|v| title_case(v.trim())));
    }
    Ok(Series::new(series.name().clone(), values))
}

/// Repair the upstream encoding defect: the replacement character left where
/// an `é` was corrupted becomes a plain `e`.
pub(crate) fn repair_encoding(series: &Series) -> Result<Series> {
    let str_series = series.str()?;
    let mut values: Vec<Option<String>> = Vec::with_capacity(str_series.len());
    for opt_val in str_series.into_iter() {
        values.push(opt_val.map(|v| v.replace('\u{FFFD}', "e")));
    }
    Ok(Series::new(series.name().clone(), values))
}

/// Keep only the text before the first underscore (`A_label` -> `A`).
pub(crate) fn truncate_at_underscore(series: &Series) -> Result<Series> {
    if series.dtype() != &DataType::String {
        return Ok(series.clone());
    }
    let str_series = series.str()?;
    let mut values: Vec<Option<String>> = Vec::with_capacity(str_series.len());
    for opt_val in str_series.into_iter() {
        values.push(opt_val.map(|v| v.split('_').next().unwrap_or(v).to_string()));
    }
    Ok(Series::new(series.name().clone(), values))
}

/// Coerce a column to Float64, nulls preserved as nulls.
pub(crate) fn coerce_float64(series: &Series, ids: &Series) -> Result<Series> {
    match series.dtype() {
        DataType::Float64 => Ok(series.clone()),
        DataType::String => {
            let str_series = series.str()?;
            let mut values: Vec<Option<f64>> = Vec::with_capacity(str_series.len());
            for (row, opt_val) in str_series.into_iter().enumerate() {
                match opt_val {
                    None => values.push(None),
                    Some(raw) => {
                        let trimmed = raw.trim();
                        if trimmed.is_empty() {
                            values.push(None);
                        } else {
                            match trimmed.parse::<f64>() {
                                Ok(v) => values.push(Some(v)),
                                Err(_) => {
                                    return Err(coercion_error(series, ids, row, trimmed));
                                }
                            }
                        }
                    }
                }
            }
            Ok(Series::new(series.name().clone(), values))
        }
        other if is_numeric_dtype(other) || other == &DataType::Boolean => {
            series.cast(&DataType::Float64).map_err(Into::into)
        }
        _ => Err(coercion_error(series, ids, 0, &format!("<{} column>", series.dtype()))),
    }
}

/// Coerce a column to nullable Int64 via round-half-to-even from float.
pub(crate) fn coerce_int64(series: &Series, ids: &Series) -> Result<Series> {
    match series.dtype() {
        DataType::Int64 => Ok(series.clone()),
        DataType::String => {
            let floats = coerce_float64(series, ids)?;
            round_to_int(&floats)
        }
        other if is_numeric_dtype(other) || other == &DataType::Boolean => {
            let floats = series.cast(&DataType::Float64)?;
            round_to_int(&floats)
        }
        _ => Err(coercion_error(series, ids, 0, &format!("<{} column>", series.dtype()))),
    }
}

fn round_to_int(floats: &Series) -> Result<Series> {
    let ca = floats.f64()?;
    let mut values: Vec<Option<i64>> = Vec::with_capacity(ca.len());
    for opt_val in ca.into_iter() {
        values.push(opt_val.and_then(|v| v.is_finite().then(|| v.round_ties_even() as i64)));
    }
    Ok(Series::new(floats.name().clone(), values))
}

/// Parse a listing-date column into a Date series. Day-first text is the
/// primary format; ISO8601 dates and datetimes are accepted as fallbacks.
/// Unparseable values become null rather than failing the row.
pub(crate) fn parse_date_series(series: &Series) -> Result<Series> {
    match series.dtype() {
        DataType::Date => Ok(series.clone()),
        DataType::Datetime(_, _) => series.cast(&DataType::Date).map_err(Into::into),
        DataType::String => {
            let str_series = series.str()?;
            let mut values: Vec<Option<i32>> = Vec::with_capacity(str_series.len());
            for opt_val in str_series.into_iter() {
                values.push(
                    opt_val
                        .and_then(parse_flexible_date)
                        .map(|d| d.num_days_from_ce() - EPOCH_DAYS_FROM_CE),
                );
            }
            Series::new(series.name().clone(), values)
                .cast(&DataType::Date)
                .map_err(Into::into)
        }
        // An all-null column can surface under another dtype; a plain cast
        // keeps the nulls.
        _ => series.cast(&DataType::Date).map_err(Into::into),
    }
}

fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
                .map(|dt| dt.date())
                .ok()
        })
}

/// Fill nulls with zero, coercing the column to a numeric type first when
/// the raw feed delivered it as text or booleans.
pub(crate) fn zero_fill(series: &Series, ids: &Series) -> Result<Series> {
    let numeric = match series.dtype() {
        d if is_numeric_dtype(d) => series.clone(),
        DataType::Boolean => series.cast(&DataType::Int64)?,
        DataType::String => {
            // Absence means "feature not present": text that fails to parse
            // counts as absent here, it is not a coercion error.
            let str_series = series.str()?;
            let mut values: Vec<Option<f64>> = Vec::with_capacity(str_series.len());
            for opt_val in str_series.into_iter() {
                values.push(opt_val.and_then(|v| v.trim().parse::<f64>().ok()));
            }
            Series::new(series.name().clone(), values)
        }
        _ => {
            return Err(coercion_error(
                series,
                ids,
                0,
                &format!("<{} column>", series.dtype()),
            ));
        }
    };
    numeric.fill_null(FillNullStrategy::Zero).map_err(Into::into)
}

fn coercion_error(series: &Series, ids: &Series, row: usize, value: &str) -> PrepError {
    let row_id = match ids.get(row) {
        Ok(AnyValue::Null) | Err(_) => "<unknown>".to_string(),
        Ok(other) => format!("{}", other),
    };
    PrepError::Coercion {
        column: series.name().to_string(),
        row: row_id,
        value: value.to_string(),
    }
}
