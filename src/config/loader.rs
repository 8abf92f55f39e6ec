//! Multi-source config loading.
//!
//! Priority, lowest first:
//! 1. built-in defaults
//! 2. user config (`<config dir>/hierlabel/config.yaml`)
//! 3. project config (`.hierlabel.yaml` in the project root)
//! 4. an explicit `--config` file
//! 5. `HIERLABEL_*` environment variables
//!
//! CLI flags are applied by the caller on top of the result.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use super::schema::{ConfigLayer, LabelConfig};
use crate::error::{HierLabelError, Result};

/// Project-level config file name.
pub const PROJECT_CONFIG_FILE: &str = ".hierlabel.yaml";

/// Prefix of the environment variables that override config values.
pub const ENV_PREFIX: &str = "HIERLABEL_";

/// Location of the per-user config file, if the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hierlabel").map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Load the effective config from the standard sources and the process
/// environment.
pub fn load_config(explicit: Option<&Path>, project_root: Option<&Path>) -> Result<LabelConfig> {
    load_from(
        user_config_path().as_deref(),
        project_root,
        explicit,
        std::env::vars(),
    )
}

/// Load from explicitly given sources. Missing user/project files are
/// skipped; a missing explicit file is an error.
pub fn load_from(
    user_file: Option<&Path>,
    project_root: Option<&Path>,
    explicit: Option<&Path>,
    env: impl IntoIterator<Item = (String, String)>,
) -> Result<LabelConfig> {
    let mut config = LabelConfig::default();

    if let Some(path) = user_file.filter(|p| p.is_file()) {
        tracing::debug!(path = %path.display(), "applying user config");
        config.apply(load_layer(path)?);
    }
    if let Some(path) = project_root
        .map(|root| root.join(PROJECT_CONFIG_FILE))
        .filter(|p| p.is_file())
    {
        tracing::debug!(path = %path.display(), "applying project config");
        config.apply(load_layer(&path)?);
    }
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(HierLabelError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), "applying explicit config");
        config.apply(load_layer(path)?);
    }
    config.apply(env_layer(env)?);

    Ok(config)
}

/// Parse one YAML file into a layer. An empty file is an empty layer.
pub fn load_layer(path: &Path) -> Result<ConfigLayer> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(ConfigLayer::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| {
        HierLabelError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Build a layer from `HIERLABEL_*` variables. Other variables are ignored.
pub fn env_layer(vars: impl IntoIterator<Item = (String, String)>) -> Result<ConfigLayer> {
    let mut layer = ConfigLayer::default();
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        match name {
            "DATABASE" => layer.database = Some(value),
            "TABLE" => layer.table = Some(value),
            "VIEW" => layer.view = Some(value),
            "LINK_FIELD" => layer.link_field = Some(value),
            "LABEL_FIELD" => layer.label_field = Some(value),
            "OUTPUT_FIELD" => layer.output_field = Some(value),
            "SEPARATOR" => layer.separator = Some(value),
            "DIRECTION" => {
                layer.direction = Some(value.parse().map_err(|e| {
                    HierLabelError::config(format!("{ENV_PREFIX}DIRECTION: {e}"))
                })?)
            }
            "MODE" => {
                layer.mode = Some(
                    value
                        .parse()
                        .map_err(|e| HierLabelError::config(format!("{ENV_PREFIX}MODE: {e}")))?,
                )
            }
            other => tracing::debug!(variable = other, "ignoring unknown config variable"),
        }
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, LabelMode};
    use pretty_assertions::assert_eq as pa_eq;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_sources_gives_defaults() {
        let config = load_from(None, None, None, Vec::new()).unwrap();
        pa_eq!(config, LabelConfig::default());
    }

    #[test]
    fn layers_apply_in_priority_order() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("user.yaml");
        std::fs::write(&user, "table: from_user\nseparator: '/'\nlink_field: parent\n").unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "table: from_project\nmode: path\n",
        )
        .unwrap();
        let explicit = dir.path().join("run.yaml");
        std::fs::write(&explicit, "table: from_explicit\n").unwrap();

        let config = load_from(
            Some(&user),
            Some(dir.path()),
            Some(&explicit),
            env(&[("HIERLABEL_SEPARATOR", " > "), ("PATH", "/usr/bin")]),
        )
        .unwrap();

        pa_eq!(config.table.as_deref(), Some("from_explicit"));
        pa_eq!(config.link_field.as_deref(), Some("parent"));
        pa_eq!(config.mode, LabelMode::Path);
        pa_eq!(config.separator, " > ");
    }

    #[test]
    fn missing_optional_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let config = load_from(
            Some(&dir.path().join("absent.yaml")),
            Some(dir.path()),
            None,
            Vec::new(),
        )
        .unwrap();
        pa_eq!(config, LabelConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = load_from(None, None, Some(&dir.path().join("nope.yaml")), Vec::new())
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn malformed_yaml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "table: [unclosed").unwrap();
        let err = load_layer(&path).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn empty_file_is_empty_layer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.yaml");
        std::fs::write(&path, "\n").unwrap();
        pa_eq!(load_layer(&path).unwrap(), ConfigLayer::default());
    }

    #[test]
    fn env_layer_reads_all_keys() {
        let layer = env_layer(env(&[
            ("HIERLABEL_DATABASE", "x.db"),
            ("HIERLABEL_TABLE", "t"),
            ("HIERLABEL_VIEW", "v"),
            ("HIERLABEL_LINK_FIELD", "l"),
            ("HIERLABEL_LABEL_FIELD", "n"),
            ("HIERLABEL_OUTPUT_FIELD", "o"),
            ("HIERLABEL_DIRECTION", "Parent-to-Child"),
            ("HIERLABEL_MODE", "Path"),
            ("HIERLABEL_UNKNOWN", "ignored"),
        ]))
        .unwrap();
        pa_eq!(layer.database.as_deref(), Some("x.db"));
        pa_eq!(layer.view.as_deref(), Some("v"));
        pa_eq!(layer.direction, Some(Direction::ParentToChild));
        pa_eq!(layer.mode, Some(LabelMode::Path));
    }

    #[test]
    fn env_layer_rejects_bad_direction() {
        let err = env_layer(env(&[("HIERLABEL_DIRECTION", "diagonal")])).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("HIERLABEL_DIRECTION"));
    }
}
