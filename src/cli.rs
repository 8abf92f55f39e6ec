//! Command-line surface.
//!
//! Parsing and config merging live here so they can be tested without a
//! terminal; `main.rs` only renders results.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::config::{load_config, ConfigLayer, LabelConfig};
use crate::error::{HierLabelError, Result};
use crate::store::SqliteRecordStore;
use crate::tools::IdFormat;
use crate::types::{Direction, LabelMode};

#[derive(Debug, Parser)]
#[command(name = "hierlabel", version, about = "Outline labels for hierarchical records")]
pub struct Cli {
    /// SQLite database file (overrides `database` from config).
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Extra YAML config file applied over user and project config.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute hierarchy labels and write them to the output field.
    Labels(LabelsArgs),
    /// Print camelCase identifier maps for a table.
    TableIds(TableIdsArgs),
    /// Reverse multi-valued cells of a field.
    ReverseValues(ReverseArgs),
    /// Print the effective configuration as YAML.
    Config,
}

#[derive(Debug, Args)]
pub struct LabelsArgs {
    #[command(flatten)]
    pub overrides: LabelOverrides,

    /// Compute and print labels without writing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Prompt for a missing table or fields.
    #[arg(long, short)]
    pub interactive: bool,

    /// Print run metrics as JSON when done.
    #[arg(long)]
    pub metrics: bool,
}

/// Flags that override the merged config for one labeling run.
#[derive(Debug, Clone, Default, Args)]
pub struct LabelOverrides {
    #[arg(long)]
    pub table: Option<String>,
    #[arg(long)]
    pub view: Option<String>,
    #[arg(long)]
    pub link_field: Option<String>,
    #[arg(long)]
    pub label_field: Option<String>,
    #[arg(long)]
    pub output_field: Option<String>,
    /// child-to-parent or parent-to-child
    #[arg(long)]
    pub direction: Option<Direction>,
    /// index or path
    #[arg(long)]
    pub mode: Option<LabelMode>,
    #[arg(long, allow_hyphen_values = true)]
    pub separator: Option<String>,
}

impl LabelOverrides {
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            table: self.table.clone(),
            view: self.view.clone(),
            link_field: self.link_field.clone(),
            label_field: self.label_field.clone(),
            output_field: self.output_field.clone(),
            direction: self.direction,
            mode: self.mode,
            separator: self.separator.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Args)]
pub struct TableIdsArgs {
    /// Table to describe (defaults to `table` from config).
    pub table: Option<String>,
    /// Include field keys.
    #[arg(long)]
    pub fields: bool,
    /// Include view keys.
    #[arg(long)]
    pub views: bool,
    /// constants, script, extension or json
    #[arg(long, default_value = "constants")]
    pub format: IdFormat,
    /// Spaces per indent level: 2 or 4.
    #[arg(long, default_value_t = 2, value_parser = parse_indent)]
    pub indent: usize,
}

#[derive(Debug, Args)]
pub struct ReverseArgs {
    pub table: String,
    pub field: String,
    /// View deciding the update order.
    #[arg(long)]
    pub view: Option<String>,
}

fn parse_indent(s: &str) -> std::result::Result<usize, String> {
    match s.trim() {
        "2" => Ok(2),
        "4" => Ok(4),
        other => Err(format!("indent must be 2 or 4, got '{other}'")),
    }
}

impl Cli {
    /// Merge config sources, then apply this invocation's flags.
    pub fn effective_config(&self, project_root: Option<&Path>) -> Result<LabelConfig> {
        let mut config = load_config(self.config.as_deref(), project_root)?;
        self.apply_flags(&mut config);
        Ok(config)
    }

    /// Apply `--db` and, for `labels`, the override flags.
    pub fn apply_flags(&self, config: &mut LabelConfig) {
        config.apply(ConfigLayer {
            database: self.db.clone(),
            ..Default::default()
        });
        if let Command::Labels(args) = &self.command {
            config.apply(args.overrides.to_layer());
        }
    }
}

/// Open the database named by the config.
pub fn open_store(config: &LabelConfig) -> Result<SqliteRecordStore> {
    let path = config
        .database
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| HierLabelError::config("no database selected (use --db)"))?;
    if path != ":memory:" && !Path::new(path).is_file() {
        return Err(HierLabelError::config(format!("database not found: {path}")));
    }
    SqliteRecordStore::open(path)
}
