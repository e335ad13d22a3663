//! Configuration file support.
//!
//! ```toml
//! [builder]
//! unsafe_identifiers = false
//! disable_build_cache = false
//!
//! [bind]
//! interpolate = false
//! expand_placeholders = true
//!
//! [iterate]
//! concurrency = 8
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DmlError, DmlResult, ResultExt};

/// Environment variable pointing at a config file.
pub const CONFIG_ENV: &str = "DML_CONFIG";

/// Options applied while a statement renders SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Write identifiers failing the identifier grammar as raw expressions
    /// instead of rejecting them.
    pub unsafe_identifiers: bool,
    /// Render the SQL on every build instead of serving it from the cache.
    pub disable_build_cache: bool,
}

/// Options applied while a bound statement produces its final SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    /// Embed values into the SQL text and return no arguments.
    pub interpolate: bool,
    /// Rewrite placeholders bound to lists into one placeholder per element.
    pub expand_placeholders: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterateConfig {
    /// Worker count for parallel iteration.
    pub concurrency: usize,
}

impl Default for IterateConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmlConfig {
    pub builder: BuilderOptions,
    pub bind: BindOptions,
    pub iterate: IterateConfig,
}

impl DmlConfig {
    pub fn from_toml_str(s: &str) -> DmlResult<Self> {
        toml::from_str(s).map_err(|e| DmlError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> DmlResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).context_with(|| path.display().to_string())
    }

    /// Load from `$DML_CONFIG`, then the user config directory, then defaults.
    pub fn load() -> DmlResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/dml/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dml").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let cfg = DmlConfig::from_toml_str(
            r#"
            [bind]
            expand_placeholders = true

            [iterate]
            concurrency = 2
            "#,
        )
        .unwrap();
        assert!(cfg.bind.expand_placeholders);
        assert!(!cfg.bind.interpolate);
        assert!(!cfg.builder.unsafe_identifiers);
        assert_eq!(cfg.iterate.concurrency, 2);
    }

    #[test]
    fn test_empty_config_is_default() {
        let cfg = DmlConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, DmlConfig::default());
        assert_eq!(cfg.iterate.concurrency, 4);
    }

    #[test]
    fn test_bad_config() {
        let err = DmlConfig::from_toml_str("[bind]\ninterpolate = 3").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Config);
    }
}
