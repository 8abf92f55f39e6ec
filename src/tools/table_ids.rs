//! Identifier maps for a table, its fields and views.
//!
//! Every name is turned into a camelCase key so generated code can refer to
//! `FL.tasks.parentTask` instead of the raw column name `"Parent Task"`.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{HierLabelError, Result};
use crate::store::TableSchema;

/// Output format of [`TableIds::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdFormat {
    /// `const TB = {...}` blocks.
    #[default]
    Constants,
    /// Constants followed by a table handle and a record query over `FL`.
    Script,
    /// Constants wrapped in `getTableIfExists`/`getFieldIfExists` lookups,
    /// preceded by the `base` import.
    Extension,
    Json,
}

impl FromStr for IdFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constants" | "const" => Ok(Self::Constants),
            "script" => Ok(Self::Script),
            "extension" | "custom-extension" => Ok(Self::Extension),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "unknown output format '{s}' (expected constants, script, extension or json)"
            )),
        }
    }
}

/// Numbering for names that produce no usable key. Starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCounter(usize);

impl UnknownCounter {
    pub fn new() -> Self {
        Self(1)
    }

    fn take(&mut self) -> usize {
        let n = self.0;
        self.0 += 1;
        n
    }
}

impl Default for UnknownCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a display name into a camelCase key.
///
/// Everything except ASCII letters, digits and spaces is dropped; words are
/// split on spaces. A name with nothing left becomes
/// `unknown{n}_{name}`, consuming one number from `counter`.
pub fn convert_name(name: &str, counter: &mut UnknownCounter) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect();
    let lowered = cleaned.trim().to_ascii_lowercase();

    let mut key = String::new();
    for (i, word) in lowered.split(' ').enumerate() {
        if word.is_empty() {
            continue;
        }
        if i == 0 {
            key.push_str(word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                key.push(first.to_ascii_uppercase());
                key.push_str(chars.as_str());
            }
        }
    }

    if key.is_empty() {
        key = format!("unknown{}_{name}", counter.take());
    }
    key
}

/// One generated key and the name it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdEntry {
    pub key: String,
    pub name: String,
}

/// Keys for a table and, optionally, its fields and views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableIds {
    pub table: IdEntry,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<IdEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub views: Vec<IdEntry>,
}

impl TableIds {
    /// Collect keys from `schema`. Names are converted table first, then
    /// fields, then views, all drawing on one counter. Fields and views are
    /// sorted by key; equal keys keep their schema order.
    pub fn collect(schema: &TableSchema, include_fields: bool, include_views: bool) -> Self {
        let mut counter = UnknownCounter::new();
        let mut entry = |name: &str| IdEntry {
            key: convert_name(name, &mut counter),
            name: name.to_string(),
        };

        let table = entry(schema.name.as_str());
        let mut fields: Vec<IdEntry> = if include_fields {
            schema.fields.iter().map(|f| entry(f.name.as_str())).collect()
        } else {
            Vec::new()
        };
        let mut views: Vec<IdEntry> = if include_views {
            schema.views.iter().map(|v| entry(v.as_str())).collect()
        } else {
            Vec::new()
        };
        fields.sort_by(|a, b| a.key.cmp(&b.key));
        views.sort_by(|a, b| a.key.cmp(&b.key));

        Self {
            table,
            fields,
            views,
        }
    }

    /// Render with `indent` spaces per level (2 or 4).
    pub fn render(&self, format: IdFormat, indent: usize) -> Result<String> {
        if indent != 2 && indent != 4 {
            return Err(HierLabelError::config(format!(
                "indent must be 2 or 4 spaces, got {indent}"
            )));
        }
        match format {
            IdFormat::Constants => self.render_constants(indent, false),
            IdFormat::Script => {
                let mut out = self.render_constants(indent, false)?;
                self.write_script_tail(&mut out).map_err(fmt_err)?;
                Ok(out)
            }
            IdFormat::Extension => {
                let mut out = String::from("import { base } from '@airtable/blocks'\n");
                out.push_str(&self.render_constants(indent, true)?);
                Ok(out)
            }
            IdFormat::Json => self.render_json(indent),
        }
    }

    /// With `lookups`, table and field names are wrapped in existence checks.
    /// Views are never wrapped.
    fn render_constants(&self, indent: usize, lookups: bool) -> Result<String> {
        let pad = |level: usize| " ".repeat(indent * level);
        let table_key = &self.table.key;
        let mut out = String::new();

        let table_value = quoted(&self.table.name)?;
        let table_value = if lookups {
            format!("base.getTableIfExists({table_value})")
        } else {
            table_value
        };
        writeln!(out, "const TB = {{").map_err(fmt_err)?;
        writeln!(out, "{}{table_key}: {table_value},", pad(1)).map_err(fmt_err)?;
        writeln!(out, "}}").map_err(fmt_err)?;

        for (name, entries) in [("FL", &self.fields), ("VW", &self.views)] {
            if entries.is_empty() {
                continue;
            }
            let wrap = lookups && name == "FL";
            writeln!(out, "const {name} = {{").map_err(fmt_err)?;
            writeln!(out, "{}{table_key}: {{", pad(1)).map_err(fmt_err)?;
            for e in entries {
                let value = quoted(&e.name)?;
                let value = if wrap {
                    format!("TB.{table_key}.getFieldIfExists({value})")
                } else {
                    value
                };
                writeln!(out, "{}{}: {value},", pad(2), e.key).map_err(fmt_err)?;
            }
            writeln!(out, "{}}},", pad(1)).map_err(fmt_err)?;
            writeln!(out, "}}").map_err(fmt_err)?;
        }
        Ok(out)
    }

    /// Table handle plus a query over every listed field. Without a field
    /// block the query selects no fields.
    fn write_script_tail(&self, out: &mut String) -> std::fmt::Result {
        let key = &self.table.key;
        let fields = if self.fields.is_empty() {
            "[]".to_string()
        } else {
            format!("Object.values(FL.{key})")
        };
        writeln!(out, "const {key}Table = base.getTable(TB.{key})")?;
        writeln!(
            out,
            "const {key}Query = await {key}Table.selectRecordsAsync({{fields: {fields}}})"
        )
    }

    fn render_json(&self, indent: usize) -> Result<String> {
        let spaces = " ".repeat(indent);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(spaces.as_bytes());
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        let mut out = String::from_utf8(buf)
            .map_err(|e| HierLabelError::Other(format!("generated JSON is not UTF-8: {e}")))?;
        out.push('\n');
        Ok(out)
    }
}

fn quoted(s: &str) -> Result<String> {
    Ok(serde_json::to_string(s)?)
}

fn fmt_err(e: std::fmt::Error) -> HierLabelError {
    HierLabelError::Other(format!("formatting failed: {e}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
