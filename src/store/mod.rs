//! Record store abstraction.
//!
//! The hierarchy engine never talks to a database directly. It reads a
//! snapshot through [`RecordStore::fetch_records`] and the batch writer
//! persists labels through [`RecordStore::update_records`].

pub mod sqlite;

pub use sqlite::SqliteRecordStore;

use crate::error::Result;
use crate::types::{RecordUpdate, StoredRecord};

/// Largest number of records a single update call may carry.
pub const MAX_UPDATE_BATCH: usize = 50;

/// Fields and views of one table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSchema {
    pub name: String,
    pub fields: Vec<FieldInfo>,
    pub views: Vec<String>,
}

impl TableSchema {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn has_view(&self, name: &str) -> bool {
        self.views.iter().any(|v| v == name)
    }
}

/// One field (column) of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub field_type: String,
}

/// Where records are read from. The view, when set, decides the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSource<'a> {
    pub table: &'a str,
    pub view: Option<&'a str>,
}

impl<'a> RecordSource<'a> {
    pub fn table(table: &'a str) -> Self {
        Self { table, view: None }
    }

    pub fn view(table: &'a str, view: &'a str) -> Self {
        Self {
            table,
            view: Some(view),
        }
    }
}

/// Read/update access to a collection of records.
pub trait RecordStore {
    /// Describe `table`, or `None` when it does not exist.
    fn describe_table(&self, table: &str) -> Result<Option<TableSchema>>;

    /// Fetch every record of `source`, in source order, with only `fields`
    /// populated.
    fn fetch_records(&self, source: &RecordSource<'_>, fields: &[&str]) -> Result<Vec<StoredRecord>>;

    /// Apply one chunk of at most [`MAX_UPDATE_BATCH`] updates to `table`.
    fn update_records(&self, table: &str, updates: &[RecordUpdate]) -> Result<()>;
}
