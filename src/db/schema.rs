//! Opening record databases and reading their catalog.
//!
//! Records live in ordinary SQLite tables keyed by an `id` column. Views
//! are native SQLite views over those tables; their `SELECT` decides the
//! order records are read in.

use regex::Regex;
use rusqlite::{params, Connection};

/// Column holding each record's identifier.
pub const ID_COLUMN: &str = "id";

// ---------------------------------------------------------------------------
// Catalog types
// ---------------------------------------------------------------------------

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type as written in the DDL (may be empty).
    pub decl_type: String,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open the record database at `db_path`.
///
/// The database must already exist unless `db_path` is `:memory:`; the
/// store never creates tables on its own.
///
/// # Errors
///
/// Returns a `rusqlite::Error` if the file cannot be opened or the pragmas
/// cannot be applied.
pub fn open_database(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = if db_path == ":memory:" {
        Connection::open_in_memory()?
    } else {
        Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?
    };
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    Ok(conn)
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Names of all user tables, alphabetically.
pub fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect()
}

/// Whether a table or view named `name` exists.
pub fn object_exists(conn: &Connection, kind: &str, name: &str) -> rusqlite::Result<bool> {
    let mut stmt =
        conn.prepare_cached("SELECT count(*) FROM sqlite_master WHERE type = ?1 AND name = ?2")?;
    let count: i64 = stmt.query_row(params![kind, name], |row| row.get(0))?;
    Ok(count > 0)
}

/// Columns of `table` (or view) in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare_cached("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt.query_map(params![table], |row| {
        Ok(ColumnInfo {
            name: row.get(0)?,
            decl_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        })
    })?;
    rows.collect()
}

/// Views whose definition selects from `table`, alphabetically.
pub fn views_for_table(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let Some(pattern) = source_pattern(table) else {
        return Ok(Vec::new());
    };
    let mut stmt = conn.prepare_cached(
        "SELECT name, sql FROM sqlite_master WHERE type = 'view' ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
    })?;
    let mut views = Vec::new();
    for row in rows {
        let (name, sql) = row?;
        if sql.as_deref().is_some_and(|s| pattern.is_match(s)) {
            views.push(name);
        }
    }
    Ok(views)
}

/// Matches `FROM <table>` / `JOIN <table>` with any SQLite quoting style.
fn source_pattern(table: &str) -> Option<Regex> {
    let t = regex::escape(table);
    let quoted = regex::escape(&table.replace('"', "\"\""));
    let pattern = format!(
        r#"(?i)\b(?:from|join)\s+(?:"{quoted}"|`{t}`|\[{t}\]|{t}\b)"#
    );
    Regex::new(&pattern).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
