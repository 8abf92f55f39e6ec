//! Reverse the element order of a multi-valued field.

use crate::error::Result;
use crate::pipeline::{describe_required, require_field};
use crate::store::{RecordSource, RecordStore};
use crate::types::{CellValue, RecordUpdate};
use crate::writer::{BatchProgress, BatchWriter, WriteSummary};

/// Outcome of [`reverse_values`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReverseReport {
    pub scanned: usize,
    pub reversed: usize,
    pub written: WriteSummary,
}

/// Reverse the JSON array stored in `field` for every record holding more
/// than one value. Cells that are empty, single-valued or not arrays are left
/// alone. Updates go through the batch writer.
pub fn reverse_values<S: RecordStore + ?Sized>(
    store: &S,
    table: &str,
    field: &str,
    view: Option<&str>,
    on_progress: impl FnMut(&BatchProgress),
) -> Result<ReverseReport> {
    let schema = describe_required(store, table)?;
    require_field(&schema, field)?;

    let source = match view {
        Some(view) => RecordSource::view(table, view),
        None => RecordSource::table(table),
    };
    let records = store.fetch_records(&source, &[field])?;

    let mut updates = Vec::new();
    for record in &records {
        let Some(mut items) = record.cell(field).json_array() else {
            continue;
        };
        if items.len() < 2 {
            continue;
        }
        items.reverse();
        let text = serde_json::to_string(&items)?;
        updates.push(RecordUpdate::single(record.id.clone(), field, CellValue::Text(text)));
    }
    tracing::info!(
        table,
        field,
        scanned = records.len(),
        to_update = updates.len(),
        "reversing multi-valued cells"
    );

    let reversed = updates.len();
    let written = BatchWriter::new(store, table).write_all(updates, on_progress)?;
    Ok(ReverseReport {
        scanned: records.len(),
        reversed,
        written,
    })
}
