//! Population density reference: a municipality-code -> density lookup
//! loaded from the first sheet of a spreadsheet workbook.

use crate::error::{PrepError, Result};
use crate::schema::DENSITY_KEY;
use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Load the density lookup from a workbook.
///
/// The header row must carry a `Refnis` column; the first other column is
/// taken as the density value. Rows that fail to yield a numeric key/value
/// pair are skipped (they are blank padding in practice).
pub fn load_density(path: &Path) -> Result<HashMap<i64, f64>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(calamine::Error::Msg("workbook has no sheets"))??;

    let lookup = density_from_rows(range.rows())?;
    debug!(
        "Loaded {} density entries from {}",
        lookup.len(),
        path.display()
    );
    Ok(lookup)
}

/// Build the lookup from raw sheet rows (header first). Split out from the
/// file read so the parsing contract is testable without a workbook on disk.
pub(crate) fn density_from_rows<'a, I>(mut rows: I) -> Result<HashMap<i64, f64>>
where
    I: Iterator<Item = &'a [Data]>,
{
    let header = rows.next().ok_or_else(|| PrepError::SchemaMismatch {
        column: DENSITY_KEY.to_string(),
        table: "density reference".to_string(),
    })?;

    let key_idx = header
        .iter()
        .position(|c| matches!(c, Data::String(s) if s.trim() == DENSITY_KEY))
        .ok_or_else(|| PrepError::SchemaMismatch {
            column: DENSITY_KEY.to_string(),
            table: "density reference".to_string(),
        })?;
    let value_idx = (0..header.len())
        .find(|i| *i != key_idx)
        .ok_or_else(|| PrepError::SchemaMismatch {
            column: "density value".to_string(),
            table: "density reference".to_string(),
        })?;

    let mut lookup = HashMap::new();
    for row in rows {
        let key = row.get(key_idx).and_then(cell_as_i64);
        let value = row.get(value_idx).and_then(cell_as_f64);
        if let (Some(key), Some(value)) = (key, value) {
            // First occurrence wins; the reference has one row per code.
            lookup.entry(key).or_insert(value);
        }
    }
    Ok(lookup)
}

fn cell_as_i64(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) => Some(f.round() as i64),
        Data::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn cell_as_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        Data::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
