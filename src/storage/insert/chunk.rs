//! Column-set validation and chunking of the input records.

use std::ops::Range;

use crate::error_handling::InsertError;
use crate::records::Record;
use crate::storage::dialect::validate_identifier;

/// Column list shared by every record, in statement order.
///
/// All records must carry exactly the first record's columns; the first one
/// that differs is reported. Column names must be plain identifiers.
pub(crate) fn validate_columns(records: &[Record]) -> Result<Vec<String>, InsertError> {
    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    if first.is_empty() {
        return Err(InsertError::NoColumns);
    }
    for name in first.keys() {
        validate_identifier(name)?;
    }

    for (index, record) in records.iter().enumerate().skip(1) {
        if record.len() != first.len() || !record.keys().eq(first.keys()) {
            return Err(InsertError::ColumnMismatch {
                index,
                expected: first.keys().cloned().collect(),
                found: record.keys().cloned().collect(),
            });
        }
    }

    Ok(first.keys().cloned().collect())
}

/// Splits `len` items into contiguous ranges of at most `chunk_size`.
pub(crate) fn chunk_ranges(len: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    (0..len)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(len))
        .collect()
}
