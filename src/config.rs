use crate::error::SiteError;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
};
use url::Url;

/// Device class the launchpad runs on. Phones never open new windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Desktop,
    Tablet,
    Phone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub default_group_title: String,
    pub default_group_id: String,
    pub group_id_prefix: String,
    pub tile_id_prefix: String,
    pub device: DeviceKind,
    /// The launchpad's own origin; absolute urls elsewhere open in a new window.
    pub origin: Option<String>,
    pub bookmark_viz_type: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            default_group_title: "My Home".to_string(),
            default_group_id: "DEFAULT_GROUP".to_string(),
            group_id_prefix: "group".to_string(),
            tile_id_prefix: "tile".to_string(),
            device: DeviceKind::Desktop,
            origin: None,
            bookmark_viz_type: "sap.ushell.StaticAppLauncher".to_string(),
        }
    }
}

impl AdapterConfig {
    pub fn from_toml(text: &str) -> Result<AdapterConfig, SiteError> {
        Ok(toml::from_str(text)?)
    }

    pub fn origin_url(&self) -> Option<Url> {
        let origin = self.origin.as_deref()?;
        match Url::parse(origin) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("[AdapterConfig] Ignoring unparsable origin '{}': {}", origin, e);
                None
            }
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<AdapterConfig, SiteError>;
    fn set_config(&self, config: &AdapterConfig) -> Result<(), SiteError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<AdapterConfig, SiteError> {
        tracing::debug!("Attempting to read adapter config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using default adapter config.");
            return Ok(AdapterConfig::default());
        }
        let content = read_to_string(&self.path)?;
        AdapterConfig::from_toml(&content)
    }

    fn set_config(&self, config: &AdapterConfig) -> Result<(), SiteError> {
        tracing::debug!("Attempting to write adapter config to: {:?}", &self.path);
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("adapter.toml"));
        assert_eq!(provider.get_config().unwrap(), AdapterConfig::default());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = AdapterConfig::from_toml(
            r#"
            device = "phone"
            default_group_title = "Start"
            "#,
        )
        .unwrap();
        assert_eq!(config.device, DeviceKind::Phone);
        assert_eq!(config.default_group_title, "Start");
        assert_eq!(config.tile_id_prefix, "tile");
    }

    #[test]
    fn config_survives_a_write_read_cycle() {
        let dir = tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("adapter.toml"));
        let config = AdapterConfig {
            origin: Some("https://launchpad.example.com".into()),
            ..Default::default()
        };
        provider.set_config(&config).unwrap();
        let read = provider.get_config().unwrap();
        assert_eq!(read, config);
        assert_eq!(
            read.origin_url().unwrap().host_str(),
            Some("launchpad.example.com")
        );
    }
}
