//! Conversions between SQLite values and [`CellValue`].

use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;

use crate::types::CellValue;

impl FromSql for CellValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(value_ref_to_cell(value))
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            CellValue::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            CellValue::Real(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

/// Convert a borrowed SQLite value. Invalid UTF-8 text is decoded lossily.
pub fn value_ref_to_cell(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Integer(i),
        ValueRef::Real(f) => CellValue::Real(f),
        ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => CellValue::Blob(b.to_vec()),
    }
}

/// Render a record id column value. Integer primary keys become decimal text.
pub fn value_ref_to_id(value: ValueRef<'_>) -> Option<String> {
    match value_ref_to_cell(value) {
        CellValue::Null => None,
        other => Some(other.render()),
    }
}
