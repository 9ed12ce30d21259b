//! Small shared helpers for table I/O and value extraction.

use crate::error::Result;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Best-effort numeric view of a cell. Strings are parsed, booleans become
/// 0/1, anything else goes through a numeric cast. `None` for null and for
/// text that does not parse.
pub fn numeric_value(value: &AnyValue) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        AnyValue::String(s) => s.trim().parse::<f64>().ok(),
        AnyValue::StringOwned(s) => s.as_str().trim().parse::<f64>().ok(),
        other => other.try_extract::<f64>().ok(),
    }
}

/// Stable per-row key over a set of series, used for keep-first deduplication
/// and group partitioning. Null cells participate as ordinary key parts.
pub fn row_key(series: &[&Series], row: usize) -> Result<String> {
    let mut key = String::new();
    for s in series {
        key.push_str(&format!("{:?}", s.get(row)?));
        key.push('|');
    }
    Ok(key)
}

/// Write a full-table CSV snapshot, creating parent directories as needed.
pub fn write_csv_snapshot(df: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    let mut out = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut out)?;
    info!("Snapshot written: {} ({} rows)", path.display(), df.height());
    Ok(())
}
