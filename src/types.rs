//! Core domain types for hierlabel.
//!
//! Records, cell values, traversal options and the assignments the engine
//! hands to the batch writer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable record identifier, as stored in the table's `id` column.
pub type RecordId = String;

// ---------------------------------------------------------------------------
// CellValue
// ---------------------------------------------------------------------------

/// A single typed cell, mirroring SQLite's storage classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

static NULL_CELL: CellValue = CellValue::Null;

impl CellValue {
    /// Whether the cell holds no value at all (NULL, blank text, or `[]`).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => {
                let t = s.trim();
                t.is_empty() || t == "[]"
            }
            Self::Blob(b) => b.is_empty(),
            Self::Integer(_) | Self::Real(_) => false,
        }
    }

    /// Render the cell as display text. NULL renders as the empty string.
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(i) => i.to_string(),
            Self::Real(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Blob(b) => hex::encode(b),
        }
    }

    /// Interpret the cell as a link value and return the referenced ids in
    /// stored order.
    ///
    /// Accepts a JSON array whose elements are strings, numbers, or objects
    /// carrying an `"id"` key, or a single bare identifier.
    pub fn links(&self) -> Vec<RecordId> {
        match self {
            Self::Null | Self::Blob(_) => Vec::new(),
            Self::Integer(i) => vec![i.to_string()],
            Self::Real(f) => vec![f.to_string()],
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Vec::new();
                }
                match self.json_array() {
                    Some(items) => items.iter().filter_map(link_id).collect(),
                    None => vec![trimmed.to_string()],
                }
            }
        }
    }

    /// Parse the cell as a JSON array, if it holds one.
    pub fn json_array(&self) -> Option<Vec<serde_json::Value>> {
        let Self::Text(s) = self else {
            return None;
        };
        let trimmed = s.trim();
        if !trimmed.starts_with('[') {
            return None;
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(serde_json::Value::Array(items)) => Some(items),
            _ => None,
        }
    }
}

/// Extract an identifier from one element of a JSON link array.
fn link_id(item: &serde_json::Value) -> Option<RecordId> {
    match item {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Object(map) => map.get("id").and_then(link_id),
        _ => None,
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        Self::Real(f)
    }
}

// ---------------------------------------------------------------------------
// StoredRecord
// ---------------------------------------------------------------------------

/// A record as fetched from the store: its id plus the requested cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredRecord {
    pub id: RecordId,
    pub cells: BTreeMap<String, CellValue>,
}

impl StoredRecord {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Builder-style cell setter, handy for fixtures.
    pub fn with(mut self, field: &str, value: impl Into<CellValue>) -> Self {
        self.cells.insert(field.to_string(), value.into());
        self
    }

    /// The cell for `field`, or NULL when it was not fetched.
    pub fn cell(&self, field: &str) -> &CellValue {
        self.cells.get(field).unwrap_or(&NULL_CELL)
    }
}

/// A pending write: new values for some fields of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub id: RecordId,
    pub fields: BTreeMap<String, CellValue>,
}

impl RecordUpdate {
    pub fn single(id: impl Into<RecordId>, field: &str, value: impl Into<CellValue>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), value.into());
        Self {
            id: id.into(),
            fields,
        }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// How the link field encodes the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Each record links to (at most) one parent.
    ChildToParent,
    /// Each record links to its children, in order.
    ParentToChild,
}

impl Direction {
    /// Parse from a loose string (case-insensitive, `-`/`_`/space accepted).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        match norm.as_str() {
            "childtoparent" | "c2p" => Some(Self::ChildToParent),
            "parenttochild" | "p2c" => Some(Self::ParentToChild),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChildToParent => "child-to-parent",
            Self::ParentToChild => "parent-to-child",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or_else(|| {
            format!("unknown direction '{s}' (expected child-to-parent or parent-to-child)")
        })
    }
}

// ---------------------------------------------------------------------------
// LabelMode
// ---------------------------------------------------------------------------

/// What each label component is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelMode {
    /// 1-based position among siblings, e.g. `1.2.1`.
    Index,
    /// The record's label-source value, e.g. `Paul->Peter->Mary`.
    Path,
}

impl LabelMode {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "index" => Some(Self::Index),
            "path" => Some(Self::Path),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Path => "path",
        }
    }

    /// Label component for a record at 0-based `position` among its siblings.
    pub fn component(&self, position: usize, label_source: &CellValue) -> String {
        match self {
            Self::Index => (position + 1).to_string(),
            Self::Path => label_source.render(),
        }
    }
}

impl std::fmt::Display for LabelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LabelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s)
            .ok_or_else(|| format!("unknown label mode '{s}' (expected index or path)"))
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// A computed label waiting to be written to the output field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    pub id: RecordId,
    pub label: String,
}

impl Assignment {
    pub fn new(id: impl Into<RecordId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Turn into a store update targeting `output_field`.
    pub fn into_update(self, output_field: &str) -> RecordUpdate {
        RecordUpdate::single(self.id, output_field, self.label)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq as pa_eq;
    use test_case::test_case;

    #[test_case("Child-to-Parent", Some(Direction::ChildToParent) ; "display form")]
    #[test_case("child_to_parent", Some(Direction::ChildToParent) ; "underscores")]
    #[test_case("CHILDTOPARENT", Some(Direction::ChildToParent) ; "concatenated upper")]
    #[test_case("parent-to-child", Some(Direction::ParentToChild) ; "kebab")]
    #[test_case(" Parent to Child ", Some(Direction::ParentToChild) ; "spaces")]
    #[test_case("p2c", Some(Direction::ParentToChild) ; "short form")]
    #[test_case("sideways", None ; "unknown")]
    #[test_case("", None ; "empty")]
    fn direction_from_str_loose(input: &str, expected: Option<Direction>) {
        pa_eq!(Direction::from_str_loose(input), expected);
    }

    #[test_case("index", Some(LabelMode::Index) ; "index lower")]
    #[test_case("Index", Some(LabelMode::Index) ; "index title")]
    #[test_case("PATH", Some(LabelMode::Path) ; "path upper")]
    #[test_case("outline", None ; "unknown")]
    fn label_mode_from_str_loose(input: &str, expected: Option<LabelMode>) {
        pa_eq!(LabelMode::from_str_loose(input), expected);
    }

    #[test]
    fn direction_from_str_error_mentions_input() {
        let err = "up".parse::<Direction>().unwrap_err();
        assert!(err.contains("'up'"));
    }

    #[test]
    fn direction_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Direction::ParentToChild).unwrap();
        pa_eq!(json, "\"parent-to-child\"");
    }

    #[test]
    fn label_component_index_is_one_based() {
        pa_eq!(LabelMode::Index.component(0, &CellValue::from("x")), "1");
        pa_eq!(LabelMode::Index.component(4, &CellValue::Null), "5");
    }

    #[test]
    fn label_component_path_renders_source() {
        pa_eq!(LabelMode::Path.component(3, &CellValue::from("Mid")), "Mid");
        pa_eq!(LabelMode::Path.component(0, &CellValue::Integer(42)), "42");
        pa_eq!(LabelMode::Path.component(0, &CellValue::Null), "");
    }

    #[test]
    fn render_real_drops_trailing_zero() {
        pa_eq!(CellValue::Real(2.0).render(), "2");
        pa_eq!(CellValue::Real(1.5).render(), "1.5");
    }

    #[test]
    fn render_blob_as_hex() {
        pa_eq!(CellValue::Blob(vec![0xde, 0xad]).render(), "dead");
    }

    #[test]
    fn links_from_json_array_preserves_order() {
        let cell = CellValue::from(r#"["rec3", "rec1", "rec2"]"#);
        pa_eq!(cell.links(), vec!["rec3", "rec1", "rec2"]);
    }

    #[test]
    fn links_from_objects_and_numbers() {
        let cell = CellValue::from(r#"[{"id": "a", "name": "A"}, 7, {"name": "no id"}, null]"#);
        pa_eq!(cell.links(), vec!["a", "7"]);
    }

    #[test]
    fn links_from_bare_identifier() {
        pa_eq!(CellValue::from(" rec9 ").links(), vec!["rec9"]);
        pa_eq!(CellValue::Integer(12).links(), vec!["12"]);
    }

    #[test]
    fn empty_links() {
        assert!(CellValue::Null.links().is_empty());
        assert!(CellValue::from("").links().is_empty());
        assert!(CellValue::from("[]").links().is_empty());
        assert!(CellValue::from("[]").is_empty());
        assert!(CellValue::from("  ").is_empty());
        assert!(!CellValue::Integer(0).is_empty());
    }

    #[test]
    fn json_array_rejects_non_arrays() {
        assert!(CellValue::from("{\"a\": 1}").json_array().is_none());
        assert!(CellValue::from("[not json").json_array().is_none());
        assert!(CellValue::Integer(1).json_array().is_none());
        pa_eq!(CellValue::from("[1,2]").json_array().map(|v| v.len()), Some(2));
    }

    #[test]
    fn stored_record_missing_cell_is_null() {
        let rec = StoredRecord::new("r1").with("name", "Root");
        pa_eq!(rec.cell("name"), &CellValue::from("Root"));
        pa_eq!(rec.cell("parent"), &CellValue::Null);
    }

    #[test]
    fn assignment_into_update() {
        let update = Assignment::new("r1", "1.2").into_update("outline");
        pa_eq!(update.id, "r1");
        pa_eq!(update.fields.get("outline"), Some(&CellValue::from("1.2")));
    }
}
