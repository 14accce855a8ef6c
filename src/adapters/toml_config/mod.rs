// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::CompositorConfig;
use crate::domain::errors::*;
use crate::ports::*;

/// Default search locations, first match wins
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["config/compositor.toml", "compositor.toml"];

/// TOML configuration adapter
#[derive(Debug, Clone)]
pub struct TomlConfigAdapter {
    path: Option<PathBuf>,
    required: bool,
}

impl TomlConfigAdapter {
    /// Adapter for an explicit file that must exist
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            required: true,
        }
    }

    /// Adapter for the first default location that exists, if any
    pub fn discover() -> Self {
        Self::discover_in(Path::new("."))
    }

    pub fn discover_in(root: &Path) -> Self {
        let path = DEFAULT_CONFIG_PATHS
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|candidate| candidate.is_file());
        Self {
            path,
            required: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn parse(content: &str) -> Result<CompositorConfig, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::BadArgs(format!("Failed to parse TOML config: {}", e)))
    }

    /// Serialize configuration to TOML
    pub fn serialize(config: &CompositorConfig) -> Result<String, DomainError> {
        toml::to_string_pretty(config)
            .map_err(|e| DomainError::BadArgs(format!("Failed to serialize config: {}", e)))
    }
}

impl ConfigPort for TomlConfigAdapter {
    /// A file replaces the base wholesale; unset keys fall back to defaults
    fn load(&self, base: CompositorConfig) -> Result<CompositorConfig, DomainError> {
        let Some(path) = &self.path else {
            return Ok(base);
        };

        if !path.is_file() {
            if self.required {
                return Err(DomainError::FileNotFound(format!(
                    "Config file does not exist: {}",
                    path.display()
                )));
            }
            return Ok(base);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::BadArgs(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        info!("Loading configuration from: {}", path.display());
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_prefers_config_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::write(dir.path().join("compositor.toml"), "").unwrap();
        std::fs::write(dir.path().join("config/compositor.toml"), "").unwrap();

        let adapter = TomlConfigAdapter::discover_in(dir.path());
        assert_eq!(
            adapter.path(),
            Some(dir.path().join("config/compositor.toml").as_path())
        );
    }

    #[test]
    fn test_load_file_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.toml");
        std::fs::write(
            &path,
            "[remote]\nenabled = true\nbase_url = \"http://gen\"\npoll_interval_secs = 2.0\n",
        )
        .unwrap();

        let config = TomlConfigAdapter::from_path(&path)
            .load(CompositorConfig::default())
            .unwrap();
        assert!(config.remote.enabled);
        assert_eq!(config.remote.poll_interval_secs, 2.0);
        assert_eq!(config.remote.max_wait_secs, 180.0);
    }

    #[test]
    fn test_missing_required_file_and_bad_toml() {
        let dir = TempDir::new().unwrap();
        let missing = TomlConfigAdapter::from_path(dir.path().join("none.toml"));
        assert!(missing.load(CompositorConfig::default()).is_err());

        assert!(TomlConfigAdapter::parse("[video\nfps = ").is_err());
    }

    #[test]
    fn test_serialize_round_trips_defaults() {
        let text = TomlConfigAdapter::serialize(&CompositorConfig::default()).unwrap();
        let parsed = TomlConfigAdapter::parse(&text).unwrap();
        assert_eq!(parsed, CompositorConfig::default());
    }
}
