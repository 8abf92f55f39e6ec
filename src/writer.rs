//! Sequential, bounded-size persistence of pending updates.
//!
//! Updates are sent in chunks of at most [`MAX_UPDATE_BATCH`], one store
//! call per chunk, strictly one after another. The first failing chunk
//! aborts the run: chunks already sent stay applied and later chunks are
//! never attempted. There is no retry.

use crate::error::{HierLabelError, Result};
use crate::store::{RecordStore, MAX_UPDATE_BATCH};
use crate::types::{Assignment, RecordUpdate};

/// Progress after one successfully applied chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based number of the chunk just applied.
    pub batch: usize,
    pub total_batches: usize,
    /// Records applied so far, including this chunk.
    pub applied: usize,
    pub total: usize,
}

/// Outcome of a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteSummary {
    pub batches: usize,
    pub records: usize,
}

/// Drains updates into a [`RecordStore`] table.
pub struct BatchWriter<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    table: &'a str,
}

impl<'a, S: RecordStore + ?Sized> BatchWriter<'a, S> {
    pub fn new(store: &'a S, table: &'a str) -> Self {
        Self { store, table }
    }

    /// Number of store calls needed for `count` updates.
    pub fn batches_for(&self, count: usize) -> usize {
        count.div_ceil(MAX_UPDATE_BATCH)
    }

    /// Write computed labels into `output_field`.
    pub fn write_assignments(
        &self,
        assignments: Vec<Assignment>,
        output_field: &str,
        on_progress: impl FnMut(&BatchProgress),
    ) -> Result<WriteSummary> {
        let updates = assignments
            .into_iter()
            .map(|a| a.into_update(output_field))
            .collect();
        self.write_all(updates, on_progress)
    }

    /// Send every update, chunk by chunk, in order.
    pub fn write_all(
        &self,
        updates: Vec<RecordUpdate>,
        mut on_progress: impl FnMut(&BatchProgress),
    ) -> Result<WriteSummary> {
        let total = updates.len();
        let total_batches = self.batches_for(total);
        let mut applied = 0usize;

        for (i, chunk) in updates.chunks(MAX_UPDATE_BATCH).enumerate() {
            let batch = i + 1;
            if let Err(source) = self.store.update_records(self.table, chunk) {
                tracing::error!(batch, total_batches, applied, error = %source, "batch update failed");
                return Err(HierLabelError::Persistence {
                    batch,
                    applied,
                    source: Box::new(source),
                });
            }
            applied += chunk.len();
            tracing::info!(batch, total_batches, applied, total, "batch applied");
            on_progress(&BatchProgress {
                batch,
                total_batches,
                applied,
                total,
            });
        }

        Ok(WriteSummary {
            batches: total_batches,
            records: applied,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
