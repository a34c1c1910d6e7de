//! Viewbind Configuration Module
//!
//! Parser defaults that are not tied to one call site.
//! Config is stored in `~/.config/viewbind/config.toml`.
//!
//! ```toml
//! [binding]
//! read_only = false
//! cache = { strategy = "bounded", capacity = 512 }
//!
//! [view]
//! template_depth = 0
//! ```
//!
//! Missing sections fall back to their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binding::{BindingParser, BindingParserOptions};
use crate::cache::CacheStrategy;
use crate::error::{Result, ViewbindError};
use crate::view::ParseObjectOptions;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewbindConfig {
    #[serde(default)]
    pub binding: BindingConfig,

    #[serde(default)]
    pub view: ViewConfig,
}

/// Binding parser settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BindingConfig {
    /// Never write query-miss records back to the data source
    #[serde(default)]
    pub read_only: bool,

    /// Eviction policy for the AST and canonical binding caches
    #[serde(default)]
    pub cache: CacheStrategy,
}

/// View parser settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewConfig {
    /// Template depth the root object is parsed at
    #[serde(default)]
    pub template_depth: usize,
}

impl ViewbindConfig {
    /// Returns `~/.config/viewbind/` on Unix, `%APPDATA%/viewbind/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("viewbind")
    }

    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ViewbindError::Config {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Load configuration from an explicit file
    ///
    /// A missing file is an error here, unlike [`ViewbindConfig::load_default`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ViewbindError::Config {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `~/.config/viewbind/config.toml`, or defaults if it doesn't exist
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ViewbindError::Config {
            reason: format!("Failed to serialize config: {}", e),
        })
    }

    /// Apply the binding section to parser options and build the parser
    pub fn binding_parser(&self, options: BindingParserOptions) -> BindingParser {
        let options = if self.binding.read_only {
            options.read_only(true)
        } else {
            options
        };
        BindingParser::with_cache(options, self.binding.cache)
    }

    pub fn parse_object_options(&self) -> ParseObjectOptions {
        ParseObjectOptions {
            template_depth: self.view.template_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_path_contains_viewbind() {
        let path = ViewbindConfig::default_path();
        assert!(path.to_string_lossy().contains("viewbind"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = ViewbindConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewbindConfig::default());
        assert_eq!(config.binding.cache, CacheStrategy::Unbounded);
    }

    #[test]
    fn test_parse_bounded_cache() {
        let config = ViewbindConfig::from_toml_str(
            r#"
[binding]
read_only = true
cache = { strategy = "bounded", capacity = 64 }

[view]
template_depth = 2
"#,
        )
        .unwrap();

        assert!(config.binding.read_only);
        assert_eq!(config.binding.cache, CacheStrategy::Bounded { capacity: 64 });
        assert_eq!(config.parse_object_options().template_depth, 2);
    }

    #[test]
    fn test_malformed_config_is_config_error() {
        let err = ViewbindConfig::from_toml_str("[binding]\nread_only = \"yes\"").unwrap_err();
        assert_eq!(err.code(), "VB-050");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = ViewbindConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ViewbindError::Config { .. }));
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ViewbindConfig::default();
        config.binding.cache = CacheStrategy::Bounded { capacity: 8 };
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(ViewbindConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_binding_parser_honours_read_only() {
        let mut config = ViewbindConfig::default();
        config.binding.read_only = true;
        let parser = config.binding_parser(BindingParserOptions::new());
        assert!(parser.options().read_only);
    }
}
