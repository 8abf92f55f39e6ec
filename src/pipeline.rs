//! End-to-end labeling run: validate, fetch, traverse, persist.

use std::collections::HashSet;
use std::time::Instant;

use crate::config::LabelJob;
use crate::db::schema::ID_COLUMN;
use crate::error::{HierLabelError, Result};
use crate::hierarchy::engine::labels_by_id;
use crate::hierarchy::{HierarchyEngine, NodeSet};
use crate::observability::{millis, RunMetrics};
use crate::store::{RecordSource, RecordStore, TableSchema};
use crate::types::Assignment;
use crate::writer::{BatchProgress, BatchWriter, WriteSummary};

/// Outcome of [`run_labels`].
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Labels in traversal order.
    pub assignments: Vec<Assignment>,
    /// `None` on a dry run or when there was nothing to write.
    pub written: Option<WriteSummary>,
    pub metrics: RunMetrics,
}

impl RunReport {
    /// True when the traversal produced no labels ("No changes to apply").
    pub fn is_noop(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Look up the job's table and check that its view and fields exist.
pub fn check_job<S: RecordStore + ?Sized>(store: &S, job: &LabelJob) -> Result<TableSchema> {
    let schema = describe_required(store, &job.table)?;
    if let Some(view) = job.view.as_deref() {
        if !schema.has_view(view) {
            return Err(HierLabelError::config(format!(
                "view '{view}' not found for table '{}'",
                job.table
            )));
        }
    }
    for field in job.fetch_fields() {
        require_field(&schema, field)?;
    }
    if job.output_field == ID_COLUMN {
        return Err(HierLabelError::config(format!(
            "the output field cannot be the '{ID_COLUMN}' column"
        )));
    }
    Ok(schema)
}

/// Run one labeling job against `store`.
///
/// Configuration problems abort before anything is read. With `dry_run`
/// the assignments are computed and returned but nothing is written.
pub fn run_labels<S: RecordStore + ?Sized>(
    store: &S,
    job: &LabelJob,
    dry_run: bool,
    on_progress: impl FnMut(&BatchProgress),
) -> Result<RunReport> {
    check_job(store, job)?;
    let mut metrics = RunMetrics::new();

    let started = Instant::now();
    let source = match job.view.as_deref() {
        Some(view) => RecordSource::view(&job.table, view),
        None => RecordSource::table(&job.table),
    };
    let records = store.fetch_records(&source, &job.fetch_fields())?;
    metrics.records_fetched = records.len();
    metrics.fetch_duration_ms = Some(millis(started.elapsed()));

    let started = Instant::now();
    let nodes = NodeSet::from_records(&records, &job.link_field, job.label_field.as_deref());
    let assignments = HierarchyEngine::new(&nodes, &job.options).run();
    metrics.traversal_duration_ms = Some(millis(started.elapsed()));
    metrics.assignments = assignments.len();

    let labeled = labels_by_id(&assignments);
    metrics.unlabeled = nodes
        .iter()
        .filter(|n| !labeled.contains_key(n.id.as_str()))
        .map(|n| n.id.as_str())
        .collect::<HashSet<_>>()
        .len();
    if metrics.unlabeled > 0 {
        tracing::warn!(
            unlabeled = metrics.unlabeled,
            "some records are not reachable from a root and were left unlabeled"
        );
    }

    if assignments.is_empty() {
        tracing::info!("no changes to apply");
        return Ok(RunReport {
            assignments,
            written: None,
            metrics,
        });
    }
    if dry_run {
        tracing::info!(assignments = assignments.len(), "dry run, nothing written");
        return Ok(RunReport {
            assignments,
            written: None,
            metrics,
        });
    }

    let started = Instant::now();
    let summary = BatchWriter::new(store, &job.table).write_assignments(
        assignments.clone(),
        &job.output_field,
        on_progress,
    )?;
    metrics.write_duration_ms = Some(millis(started.elapsed()));
    metrics.batches = summary.batches;
    metrics.records_updated = summary.records;

    Ok(RunReport {
        assignments,
        written: Some(summary),
        metrics,
    })
}

pub(crate) fn describe_required<S: RecordStore + ?Sized>(
    store: &S,
    table: &str,
) -> Result<TableSchema> {
    store
        .describe_table(table)?
        .ok_or_else(|| HierLabelError::config(format!("table '{table}' not found")))
}

pub(crate) fn require_field(schema: &TableSchema, field: &str) -> Result<()> {
    if schema.has_field(field) {
        Ok(())
    } else {
        Err(HierLabelError::config(format!(
            "field '{field}' not found in table '{}'",
            schema.name
        )))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
