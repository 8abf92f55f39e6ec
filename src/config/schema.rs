//! Configuration data structures for hierlabel.
//!
//! Defines the YAML config format: data source, link/label/output fields
//! and traversal options. Designed for multi-source loading: every source
//! produces a [`ConfigLayer`] of optional values, and layers are applied on
//! top of [`LabelConfig::default`] in priority order.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{HierLabelError, Result};
use crate::hierarchy::LabelOptions;
use crate::types::{Direction, LabelMode};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Effective configuration after all sources are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Path of the SQLite record database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Table holding the hierarchy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// View deciding record order. Table order (rowid) when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,

    /// Field whose values link records to each other.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_field: Option<String>,

    /// Field supplying path components. Ignored in index mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_field: Option<String>,

    /// Field receiving the computed labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_field: Option<String>,

    #[serde(default = "default_direction", deserialize_with = "de_direction")]
    pub direction: Direction,

    #[serde(default = "default_mode", deserialize_with = "de_mode")]
    pub mode: LabelMode,

    /// Text between label components, in both modes.
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: None,
            table: None,
            view: None,
            link_field: None,
            label_field: None,
            output_field: None,
            direction: default_direction(),
            mode: default_mode(),
            separator: default_separator(),
        }
    }
}

impl LabelConfig {
    /// Overlay every value `layer` sets.
    pub fn apply(&mut self, layer: ConfigLayer) {
        fn set<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        set(&mut self.database, layer.database);
        set(&mut self.table, layer.table);
        set(&mut self.view, layer.view);
        set(&mut self.link_field, layer.link_field);
        set(&mut self.label_field, layer.label_field);
        set(&mut self.output_field, layer.output_field);
        if let Some(direction) = layer.direction {
            self.direction = direction;
        }
        if let Some(mode) = layer.mode {
            self.mode = mode;
        }
        if let Some(separator) = layer.separator {
            self.separator = separator;
        }
    }

    /// Traversal options carried by this config.
    pub fn label_options(&self) -> LabelOptions {
        LabelOptions {
            direction: self.direction,
            mode: self.mode,
            separator: self.separator.clone(),
        }
    }

    /// Check that everything a labeling run needs is present.
    ///
    /// Only checks presence; whether the table and fields exist is checked
    /// against the store when the run starts.
    pub fn resolve(&self) -> Result<LabelJob> {
        let table = required(&self.table, "no table selected")?;
        let link_field = required(&self.link_field, "no link field selected")?;
        let output_field = required(&self.output_field, "no output field selected")?;
        let label_field = match self.mode {
            LabelMode::Path => Some(required(
                &self.label_field,
                "path mode needs a label field",
            )?),
            LabelMode::Index => None,
        };
        if link_field == output_field {
            return Err(HierLabelError::config(
                "the output field must differ from the link field",
            ));
        }
        Ok(LabelJob {
            table,
            view: non_empty(&self.view),
            link_field,
            label_field,
            output_field,
            options: self.label_options(),
        })
    }
}

/// A fully specified labeling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelJob {
    pub table: String,
    pub view: Option<String>,
    pub link_field: String,
    /// `None` in index mode.
    pub label_field: Option<String>,
    pub output_field: String,
    pub options: LabelOptions,
}

impl LabelJob {
    /// Fields to fetch for this run, without duplicates.
    pub fn fetch_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.link_field.as_str()];
        for f in [self.label_field.as_deref(), Some(self.output_field.as_str())]
            .into_iter()
            .flatten()
        {
            if !fields.contains(&f) {
                fields.push(f);
            }
        }
        fields
    }
}

// ---------------------------------------------------------------------------
// ConfigLayer
// ---------------------------------------------------------------------------

/// Values contributed by one config source. `None` leaves the lower layer's
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigLayer {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub view: Option<String>,
    #[serde(default)]
    pub link_field: Option<String>,
    #[serde(default)]
    pub label_field: Option<String>,
    #[serde(default)]
    pub output_field: Option<String>,
    #[serde(default, deserialize_with = "de_opt_direction")]
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "de_opt_mode")]
    pub mode: Option<LabelMode>,
    #[serde(default)]
    pub separator: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn required(value: &Option<String>, msg: &str) -> Result<String> {
    non_empty(value).ok_or_else(|| HierLabelError::config(msg))
}

fn de_direction<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Direction, D::Error> {
    let s = String::deserialize(d)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn de_mode<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<LabelMode, D::Error> {
    let s = String::deserialize(d)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn de_opt_direction<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<Direction>, D::Error> {
    Option::<String>::deserialize(d)?
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .transpose()
}

fn de_opt_mode<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<LabelMode>, D::Error> {
    Option::<String>::deserialize(d)?
        .map(|s| s.parse().map_err(serde::de::Error::custom))
        .transpose()
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

fn default_direction() -> Direction {
    Direction::ChildToParent
}

fn default_mode() -> LabelMode {
    LabelMode::Index
}

fn default_separator() -> String {
    ".".to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
