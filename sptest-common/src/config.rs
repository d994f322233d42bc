//! Configuration loading and records-root resolution
//!
//! Configuration is a single optional TOML file:
//!
//! ```toml
//! records_root = "/srv/speaking-test/Records"
//! use_roster = true
//!
//! [logging]
//! level = "info"
//!
//! [[point_scale]]
//! position = 1
//! points = 5
//! label = "Correct"
//!
//! [classes."5A"]
//! point_scale = [ { position = 1, points = 4, label = "Good" } ]
//! ```
//!
//! A missing file is not an error: every field has a built-in default.

use crate::point_scale::{PointScale, ScaleEntry};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "SPTEST_CONFIG";

/// Environment variable naming the records root
pub const RECORDS_ROOT_ENV_VAR: &str = "SPTEST_RECORDS_ROOT";

/// Records root used when nothing else names one
pub const DEFAULT_RECORDS_ROOT: &str = "Records";

/// Contents of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Records root (optional; CLI and environment take priority)
    #[serde(default)]
    pub records_root: Option<PathBuf>,

    /// Look up student names in class rosters
    #[serde(default)]
    pub use_roster: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Global point scale (optional; built-in default when empty)
    #[serde(default)]
    pub point_scale: Vec<ScaleEntry>,

    /// Per-class overrides keyed by class key
    #[serde(default)]
    pub classes: BTreeMap<String, ClassConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Per-class configuration overrides
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ClassConfig {
    #[serde(default)]
    pub use_roster: Option<bool>,

    #[serde(default)]
    pub point_scale: Option<Vec<ScaleEntry>>,
}

impl TomlConfig {
    /// Parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: TomlConfig = toml::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Locate and load the configuration file
    ///
    /// Priority: explicit path, then `SPTEST_CONFIG`, then the platform
    /// config directory. An explicitly named file must exist; a missing
    /// platform default falls back to built-in defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                warn!(path = %path.display(), "No configuration file found, using defaults");
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        PointScale::from_entries(&self.point_scale)?;
        for (class_key, class) in &self.classes {
            if let Some(entries) = &class.point_scale {
                PointScale::from_entries(entries)
                    .map_err(|e| Error::Config(format!("class {}: {}", class_key, e)))?;
            }
        }
        Ok(())
    }

    /// Globally configured scale, if any entries are given
    pub fn global_point_scale(&self) -> Result<Option<PointScale>> {
        if self.point_scale.is_empty() {
            return Ok(None);
        }
        PointScale::from_entries(&self.point_scale).map(Some)
    }

    /// Scale configured specifically for a class, if any
    pub fn class_point_scale(&self, class_key: &str) -> Result<Option<PointScale>> {
        match self.classes.get(class_key).and_then(|c| c.point_scale.as_ref()) {
            Some(entries) => PointScale::from_entries(entries).map(Some),
            None => Ok(None),
        }
    }

    pub fn use_roster_for(&self, class_key: &str) -> bool {
        self.classes
            .get(class_key)
            .and_then(|c| c.use_roster)
            .unwrap_or(self.use_roster)
    }
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sptest").join("config.toml"))
}

/// Records-root resolution:
/// 1. Command-line argument (highest priority)
/// 2. `SPTEST_RECORDS_ROOT` environment variable
/// 3. `records_root` from the TOML config file
/// 4. `./Records`
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_root: config.records_root.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }
        if let Ok(path) = std::env::var(RECORDS_ROOT_ENV_VAR) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        if let Some(path) = &self.toml_root {
            return path.clone();
        }
        PathBuf::from(DEFAULT_RECORDS_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(TomlConfig::default().logging.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let config: TomlConfig = toml::from_str(
            r#"
            records_root = "/srv/records"
            use_roster = true

            [logging]
            level = "debug"

            [[point_scale]]
            position = 1
            points = 4
            label = "Good"

            [[point_scale]]
            position = 2
            points = 0
            label = "Wrong"

            [classes."5A"]
            use_roster = false
            point_scale = [ { position = 1, points = 3, label = "Yes" } ]
            "#,
        )
        .unwrap();

        assert_eq!(config.records_root, Some(PathBuf::from("/srv/records")));
        assert_eq!(config.logging.level, "debug");
        assert!(config.use_roster);
        assert!(!config.use_roster_for("5A"));
        assert!(config.use_roster_for("6B"));

        let global = config.global_point_scale().unwrap().unwrap();
        assert_eq!(global.max_point_value(), 4);
        let class = config.class_point_scale("5A").unwrap().unwrap();
        assert_eq!(class.points_for(1), 3);
        assert!(config.class_point_scale("6B").unwrap().is_none());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.records_root, None);
        assert!(!config.use_roster);
        assert_eq!(config.logging.level, "info");
        assert!(config.global_point_scale().unwrap().is_none());
    }
}
