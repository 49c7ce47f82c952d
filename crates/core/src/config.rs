//! Application configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

/// Endpoint used when no config file or environment override is present.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4000/graphql";

const DEFAULT_CONFIG: &str = r#"# gamedex configuration
#
# endpoint: URL of the games GraphQL API.
endpoint = "http://localhost:4000/graphql"
"#;

/// Runtime settings for the application.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// GraphQL endpoint the client posts to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Directory holding the user-level configuration file.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gamedex")
}

/// Path to the user-level configuration file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    let path = config_path();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

impl AppConfig {
    /// Load settings from the default config path plus `GAMEDEX_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load settings from an explicit file path. A missing file is not an
    /// error; defaults and environment overrides still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut builder = Config::builder();
        if path.exists() {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings = builder
            .add_source(Environment::with_prefix("GAMEDEX"))
            .build()
            .context("failed to read configuration")?;
        let config = settings
            .try_deserialize::<AppConfig>()
            .context("invalid configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("nope.toml"))?;
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        Ok(())
    }

    #[test]
    fn file_overrides_endpoint() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "endpoint = \"http://games.test/graphql\"\n")?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.endpoint, "http://games.test/graphql");
        Ok(())
    }

    #[test]
    fn default_config_is_parseable() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, DEFAULT_CONFIG)?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        Ok(())
    }
}
