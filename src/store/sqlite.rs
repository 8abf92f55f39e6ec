//! SQLite implementation of [`RecordStore`].
//!
//! Statements go through [`Connection::prepare_cached`]; the SQL is built
//! per table and field list, so the cache keys stay stable across chunks of
//! the same run.

use rusqlite::{params_from_iter, Connection};

use crate::db::converters::value_ref_to_id;
use crate::db::schema::{
    list_tables, object_exists, open_database, quote_ident, table_columns, views_for_table, ID_COLUMN,
};
use crate::error::{HierLabelError, Result};
use crate::store::{FieldInfo, RecordSource, RecordStore, TableSchema, MAX_UPDATE_BATCH};
use crate::types::{CellValue, RecordUpdate, StoredRecord};

/// Record store backed by a SQLite database file.
pub struct SqliteRecordStore {
    pub conn: Connection,
}

impl std::fmt::Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore").finish_non_exhaustive()
    }
}

impl SqliteRecordStore {
    /// Open an existing database at `db_path`.
    pub fn open(db_path: &str) -> Result<Self> {
        Ok(Self {
            conn: open_database(db_path)?,
        })
    }

    /// Wrap an already-open connection. Useful in tests with `:memory:`.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Names of all user tables, sorted.
    pub fn table_names(&self) -> Result<Vec<String>> {
        Ok(list_tables(&self.conn)?)
    }

    fn select_sql(source: &RecordSource<'_>, fields: &[&str]) -> String {
        let mut columns = vec![quote_ident(ID_COLUMN)];
        columns.extend(fields.iter().map(|f| quote_ident(f)));
        match source.view {
            Some(view) => format!("SELECT {} FROM {}", columns.join(", "), quote_ident(view)),
            None => format!(
                "SELECT {} FROM {} ORDER BY rowid",
                columns.join(", "),
                quote_ident(source.table)
            ),
        }
    }

    /// Every selected column must exist in the source. SQLite would read an
    /// unknown double-quoted name as a string literal instead of failing.
    fn check_source_columns(&self, source: &RecordSource<'_>, fields: &[&str]) -> Result<()> {
        let (kind, name) = match source.view {
            Some(view) => ("view", view),
            None => ("table", source.table),
        };
        let columns = table_columns(&self.conn, name)?;
        if columns.is_empty() {
            return Err(HierLabelError::config(format!("{kind} '{name}' not found")));
        }
        let missing = std::iter::once(ID_COLUMN)
            .chain(fields.iter().copied())
            .find(|f| !columns.iter().any(|c| c.name == *f));
        match missing {
            Some(field) => Err(HierLabelError::config(format!(
                "field '{field}' not found in {kind} '{name}'"
            ))),
            None => Ok(()),
        }
    }

    fn update_sql(table: &str, fields: &[&String]) -> String {
        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", quote_ident(f), i + 1))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_ident(table),
            assignments.join(", "),
            quote_ident(ID_COLUMN),
            fields.len() + 1
        )
    }
}

impl RecordStore for SqliteRecordStore {
    fn describe_table(&self, table: &str) -> Result<Option<TableSchema>> {
        if !object_exists(&self.conn, "table", table)? {
            return Ok(None);
        }
        let fields = table_columns(&self.conn, table)?
            .into_iter()
            .map(|c| FieldInfo {
                name: c.name,
                field_type: c.decl_type,
            })
            .collect();
        Ok(Some(TableSchema {
            name: table.to_string(),
            fields,
            views: views_for_table(&self.conn, table)?,
        }))
    }

    fn fetch_records(&self, source: &RecordSource<'_>, fields: &[&str]) -> Result<Vec<StoredRecord>> {
        self.check_source_columns(source, fields)?;
        let sql = Self::select_sql(source, fields);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        let mut skipped = 0usize;
        while let Some(row) = rows.next()? {
            let Some(id) = value_ref_to_id(row.get_ref(0)?) else {
                skipped += 1;
                continue;
            };
            let mut record = StoredRecord::new(id);
            for (i, field) in fields.iter().enumerate() {
                let value: CellValue = row.get(i + 1)?;
                record.cells.insert((*field).to_string(), value);
            }
            records.push(record);
        }
        if skipped > 0 {
            tracing::warn!(skipped, table = source.table, "rows without an id were ignored");
        }
        tracing::debug!(
            table = source.table,
            view = source.view.unwrap_or("<table order>"),
            records = records.len(),
            "fetched records"
        );
        Ok(records)
    }

    /// Each chunk runs in its own transaction: it is applied fully or not
    /// at all, independently of earlier chunks.
    fn update_records(&self, table: &str, updates: &[RecordUpdate]) -> Result<()> {
        if updates.len() > MAX_UPDATE_BATCH {
            return Err(HierLabelError::Other(format!(
                "update batch of {} exceeds the limit of {MAX_UPDATE_BATCH}",
                updates.len()
            )));
        }
        let tx = self.conn.unchecked_transaction()?;
        for update in updates {
            if update.fields.is_empty() {
                continue;
            }
            let fields: Vec<&String> = update.fields.keys().collect();
            let sql = Self::update_sql(table, &fields);
            let mut stmt = tx.prepare_cached(&sql)?;
            let values = update
                .fields
                .values()
                .cloned()
                .chain(std::iter::once(CellValue::Text(update.id.clone())));
            stmt.execute(params_from_iter(values))?;
        }
        tx.commit()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::open_database;

    fn setup() -> SqliteRecordStore {
        let conn = open_database(":memory:").expect("schema init should succeed on :memory:");
        conn.execute_batch(
            "CREATE TABLE tasks (id TEXT PRIMARY KEY, name TEXT, parent TEXT, outline TEXT);
             INSERT INTO tasks (id, name, parent) VALUES
               ('b', 'Bravo', '[\"a\"]'),
               ('a', 'Alpha', NULL),
               ('c', 'Charlie', 'a');
             CREATE VIEW alphabetical AS SELECT * FROM tasks ORDER BY name;",
        )
        .unwrap();
        SqliteRecordStore::from_connection(conn)
    }

    #[test]
    fn describe_existing_table() {
        let store = setup();
        let schema = store.describe_table("tasks").unwrap().expect("table exists");
        assert!(schema.has_field("parent"));
        assert!(!schema.has_field("missing"));
        assert!(schema.has_view("alphabetical"));
        assert_eq!(schema.fields.len(), 4);
    }

    #[test]
    fn table_names_excludes_views() {
        let store = setup();
        assert_eq!(store.table_names().unwrap(), vec!["tasks".to_string()]);
    }

    #[test]
    fn describe_missing_table_is_none() {
        let store = setup();
        assert!(store.describe_table("ghost").unwrap().is_none());
        // A view is not a table.
        assert!(store.describe_table("alphabetical").unwrap().is_none());
    }

    #[test]
    fn fetch_without_view_uses_rowid_order() {
        let store = setup();
        let records = store
            .fetch_records(&RecordSource::table("tasks"), &["name", "parent"])
            .unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(records[1].cell("parent"), &CellValue::Null);
        assert_eq!(records[0].cell("parent").links(), vec!["a"]);
        assert_eq!(records[2].cell("parent").links(), vec!["a"]);
    }

    #[test]
    fn fetch_through_view_uses_view_order() {
        let store = setup();
        let records = store
            .fetch_records(&RecordSource::view("tasks", "alphabetical"), &["name"])
            .unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(records[0].cells.get("parent").is_none());
    }

    #[test]
    fn fetch_unknown_field_errors() {
        let store = setup();
        let err = store
            .fetch_records(&RecordSource::table("tasks"), &["nope"])
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("field 'nope' not found in table 'tasks'"));
    }

    #[test]
    fn fetch_field_missing_from_view_errors() {
        let store = setup();
        store
            .conn
            .execute_batch("CREATE VIEW narrow AS SELECT id, parent FROM tasks;")
            .unwrap();
        let err = store
            .fetch_records(&RecordSource::view("tasks", "narrow"), &["parent", "name"])
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("field 'name' not found in view 'narrow'"));

        let records = store
            .fetch_records(&RecordSource::view("tasks", "narrow"), &["parent"])
            .unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn fetch_view_without_id_column_errors() {
        let store = setup();
        store
            .conn
            .execute_batch("CREATE VIEW nameless AS SELECT name, parent FROM tasks;")
            .unwrap();
        let err = store
            .fetch_records(&RecordSource::view("tasks", "nameless"), &["parent"])
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("field 'id' not found"));
    }

    #[test]
    fn fetch_from_missing_source_errors() {
        let store = setup();
        let err = store
            .fetch_records(&RecordSource::table("ghost"), &["name"])
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn update_records_writes_fields() {
        let store = setup();
        store
            .update_records(
                "tasks",
                &[
                    RecordUpdate::single("a", "outline", "1"),
                    RecordUpdate::single("b", "outline", "1.1"),
                ],
            )
            .unwrap();
        let outline: String = store
            .conn
            .query_row("SELECT outline FROM tasks WHERE id = 'b'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(outline, "1.1");
    }

    #[test]
    fn update_records_rejects_oversized_batch() {
        let store = setup();
        let updates: Vec<_> = (0..=MAX_UPDATE_BATCH)
            .map(|i| RecordUpdate::single(format!("r{i}"), "outline", "x"))
            .collect();
        assert!(store.update_records("tasks", &updates).is_err());
    }

    #[test]
    fn failed_chunk_rolls_back_whole_chunk() {
        let store = setup();
        let result = store.update_records(
            "tasks",
            &[
                RecordUpdate::single("a", "outline", "1"),
                RecordUpdate::single("b", "no_such_column", "x"),
            ],
        );
        assert!(result.is_err());
        let outline: Option<String> = store
            .conn
            .query_row("SELECT outline FROM tasks WHERE id = 'a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(outline, None);
    }

    #[test]
    fn integer_ids_are_read_as_text_and_updated() {
        let conn = open_database(":memory:").unwrap();
        conn.execute_batch(
            "CREATE TABLE nums (id INTEGER PRIMARY KEY, label TEXT);
             INSERT INTO nums (id) VALUES (10), (20);",
        )
        .unwrap();
        let store = SqliteRecordStore::from_connection(conn);
        let records = store
            .fetch_records(&RecordSource::table("nums"), &["label"])
            .unwrap();
        assert_eq!(records[0].id, "10");
        store
            .update_records("nums", &[RecordUpdate::single("20", "label", "two")])
            .unwrap();
        let label: String = store
            .conn
            .query_row("SELECT label FROM nums WHERE id = 20", [], |r| r.get(0))
            .unwrap();
        assert_eq!(label, "two");
    }
}
