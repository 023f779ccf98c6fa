//! Row reconciler: aligns incoming records to the key order of existing rows.
//!
//! Row positions are keyed on an immutable integer identifier (the paper
//! number), so annotations humans add to unrelated columns keep their row
//! across re-runs. An existing row whose key has no incoming record aborts
//! the operation rather than silently dropping the row.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, SyncError};
use crate::model::{CellValue, Grid, Record};

/// Reorders `records` to match the existing row order of the mirror's key
/// column, then appends records whose keys are not yet present, in ascending
/// key order.
///
/// Trailing rows that are entirely blank are ignored before keys are read.
/// Every retained key cell must cast losslessly to an integer; a cast
/// failure is fatal, as is a duplicate key among the incoming records.
pub fn align(
    records: Vec<Record>,
    key_column: &str,
    headers: &[String],
    mirror: &Grid,
) -> Result<Vec<Record>> {
    let key_idx = headers
        .iter()
        .position(|h| h == key_column)
        .ok_or_else(|| SyncError::UnknownColumn {
            column: key_column.to_string(),
        })?;

    let existing_keys = existing_keys(mirror, key_idx)?;

    let mut by_key: BTreeMap<i64, Record> = BTreeMap::new();
    for record in records {
        let cell = record
            .get(key_column)
            .ok_or_else(|| SyncError::RecordWithoutKey {
                column: key_column.to_string(),
            })?;
        let key = cell.as_int().ok_or_else(|| SyncError::InvalidRecordKey {
            value: cell.to_cell_string(),
        })?;
        if by_key.insert(key, record).is_some() {
            return Err(SyncError::DuplicateKey { key });
        }
    }

    let mut aligned = Vec::with_capacity(by_key.len());
    for key in &existing_keys {
        let record = by_key
            .remove(key)
            .ok_or(SyncError::MissingRecord { key: *key })?;
        aligned.push(record);
    }

    if !by_key.is_empty() {
        debug!(
            appended = by_key.len(),
            "incoming records with new keys appended after existing rows"
        );
        aligned.extend(by_key.into_values());
    }

    Ok(aligned)
}

/// Reads the integer keys of the mirror's data rows in stored order,
/// dropping trailing all-blank rows first.
fn existing_keys(mirror: &Grid, key_idx: usize) -> Result<Vec<i64>> {
    let mut data_rows: &[Vec<CellValue>] = mirror.get(1..).unwrap_or(&[]);
    while let Some(last) = data_rows.last() {
        if last.iter().all(CellValue::is_empty) {
            data_rows = &data_rows[..data_rows.len() - 1];
        } else {
            break;
        }
    }

    let mut keys = Vec::with_capacity(data_rows.len());
    for (offset, row) in data_rows.iter().enumerate() {
        let cell = row.get(key_idx).unwrap_or(&CellValue::Empty);
        let key = cell.as_int().ok_or_else(|| SyncError::InvalidKey {
            row: offset + 1,
            value: cell.to_cell_string(),
        })?;
        keys.push(key);
    }
    Ok(keys)
}
