//! Outlier filter stage: per-group IQR filtering.
//!
//! Price-per-area distributions differ materially by region and property
//! type, so inclusion is decided by group-relative statistics rather than
//! fixed thresholds: within each (municipality, subtype) partition, rows
//! survive when their value lies in `[Q1 - k*IQR, Q3 + k*IQR]`.

use crate::config::PrepConfig;
use crate::error::Result;
use crate::schema;
use crate::utils::{numeric_value, row_key};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// Removes rows whose value is an outlier within its partition.
pub struct OutlierFilter {
    column: String,
    grouping: Vec<String>,
    multiplier: f64,
}

impl OutlierFilter {
    pub fn new(column: impl Into<String>, grouping: Vec<String>, multiplier: f64) -> Self {
        Self {
            column: column.into(),
            grouping,
            multiplier,
        }
    }

    pub fn from_config(config: &PrepConfig) -> Self {
        Self::new(
            config.outlier_column.clone(),
            config.grouping_columns.clone(),
            config.iqr_multiplier,
        )
    }

    /// Apply the IQR rule within each partition independently.
    ///
    /// Rows whose grouping key contains nulls form their own partition and
    /// run the same formula; partitions too small for meaningful quartiles
    /// get degenerate bounds, not special-casing. Null values survive.
    /// Input order is preserved.
    pub fn filter(&self, df: DataFrame) -> Result<DataFrame> {
        let mut required: Vec<&str> = vec![self.column.as_str()];
        required.extend(self.grouping.iter().map(String::as_str));
        schema::ensure_columns(&df, &required, "cleaned listings")?;

        let value_series = df.column(&self.column)?.as_materialized_series().clone();
        let mut values: Vec<Option<f64>> = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            values.push(numeric_value(&value_series.get(row)?));
        }

        let mut key_series = Vec::with_capacity(self.grouping.len());
        for column in &self.grouping {
            key_series.push(df.column(column)?.as_materialized_series());
        }

        let mut partitions: HashMap<String, Vec<usize>> = HashMap::new();
        for row in 0..df.height() {
            partitions
                .entry(row_key(&key_series, row)?)
                .or_default()
                .push(row);
        }

        let mut mask_values = vec![true; df.height()];
        for rows in partitions.values() {
            let mut observed: Vec<f64> = rows.iter().filter_map(|&r| values[r]).collect();
            if observed.is_empty() {
                continue;
            }
            observed.sort_by(|a, b| a.total_cmp(b));

            let q1 = quantile(&observed, 0.25);
            let q3 = quantile(&observed, 0.75);
            let iqr = q3 - q1;
            let lower = q1 - self.multiplier * iqr;
            let upper = q3 + self.multiplier * iqr;

            for &row in rows {
                if let Some(value) = values[row] {
                    mask_values[row] = value >= lower && value <= upper;
                }
            }
        }

        let mask = BooleanChunked::from_slice("keep".into(), &mask_values);
        let kept = df.filter(&mask)?;

        let removed = df.height() - kept.height();
        if removed > 0 {
            debug!(
                "Removed {} outlier rows across {} partitions",
                removed,
                partitions.len()
            );
        }
        info!(
            "Outlier filter: {} rows in, {} rows out",
            df.height(),
            kept.height()
        );
        Ok(kept)
    }
}

/// Linearly interpolated quantile of an ascending-sorted slice.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let fraction = position - lower as f64;
    if lower + 1 < sorted.len() {
        sorted[lower] + fraction * (sorted[lower + 1] - sorted[lower])
    } else {
        sorted[lower]
    }
}
