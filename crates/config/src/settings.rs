use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Written out by [`CacheSettings::write_default_file`].
const DEFAULT_FILE: &str = r#"{
    // Fallback dimensions, used until the spreadsheet's metadata arrives
    "grid.defaultColumnWidth": 100,
    "grid.defaultRowHeight": 30,

    // Request URL classification
    // A GET ending in <collection>/<wildcard> replaces that whole collection
    "url.wildcardSegment": "*",
    "url.cellSegment": "cell",
    "url.labelSegment": "label",
    // The segment after this one is the spreadsheet id
    "url.spreadsheetSegment": "spreadsheet"
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    // Grid
    #[serde(rename = "grid.defaultColumnWidth")]
    pub default_column_width: f64,

    #[serde(rename = "grid.defaultRowHeight")]
    pub default_row_height: f64,

    // Requests
    #[serde(rename = "url.wildcardSegment")]
    pub wildcard_segment: String,

    #[serde(rename = "url.spreadsheetSegment")]
    pub spreadsheet_segment: String,

    #[serde(rename = "url.cellSegment")]
    pub cell_segment: String,

    #[serde(rename = "url.labelSegment")]
    pub label_segment: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_column_width: 100.0,
            default_row_height: 30.0,
            wildcard_segment: "*".to_string(),
            spreadsheet_segment: "spreadsheet".to_string(),
            cell_segment: "cell".to_string(),
            label_segment: "label".to_string(),
        }
    }
}

impl CacheSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("viewgrid");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults on
    /// any problem.
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_column_width.is_finite() && self.default_column_width >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "grid.defaultColumnWidth",
                reason: format!("expected a non-negative length, got {}", self.default_column_width),
            });
        }
        if !(self.default_row_height.is_finite() && self.default_row_height >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "grid.defaultRowHeight",
                reason: format!("expected a non-negative length, got {}", self.default_row_height),
            });
        }
        check_segment("url.wildcardSegment", &self.wildcard_segment)?;
        check_segment("url.spreadsheetSegment", &self.spreadsheet_segment)?;
        check_segment("url.cellSegment", &self.cell_segment)?;
        check_segment("url.labelSegment", &self.label_segment)?;
        if self.cell_segment == self.label_segment {
            return Err(ConfigError::Invalid {
                key: "url.labelSegment",
                reason: format!("must differ from url.cellSegment ({:?})", self.cell_segment),
            });
        }
        Ok(())
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    /// Write the commented default file to `path` unless one already exists.
    /// Returns whether a file was written.
    pub fn write_default_file(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, DEFAULT_FILE).map_err(io_err)?;
        Ok(true)
    }
}

fn check_segment(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.contains('/') {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be a single non-empty path segment".to_string(),
        });
    }
    Ok(())
}
