use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::channel::DEFAULT_CHANNEL;
use crate::protocol::AspectRatio;

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "atelier";

const DEFAULT_PRESENTER_WIDTH: u32 = 400;
const DEFAULT_PRESENTER_HEIGHT: u32 = 600;

pub const KEYS: &[&str] = &[
    "defaults.aspect",
    "defaults.border",
    "defaults.windowed",
    "presenter.channel",
    "presenter.width",
    "presenter.height",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presenter: Option<PresenterConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windowed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresenterConfig {
    /// Rendezvous name shared by the main window and the presenter console.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `atelier config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, format!("# atelier configuration\n{yaml}"))?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "defaults.aspect" => {
                if AspectRatio::from_token(value).is_none() {
                    anyhow::bail!("Invalid aspect ratio: {value}. Must be '16:9' or '9:16'.");
                }
                self.defaults_mut().aspect = Some(value.to_string());
            }
            "defaults.border" => self.defaults_mut().border = Some(parse_bool(key, value)?),
            "defaults.windowed" => self.defaults_mut().windowed = Some(parse_bool(key, value)?),
            "presenter.channel" => {
                if value.trim().is_empty() {
                    anyhow::bail!("Invalid presenter.channel: must not be empty.");
                }
                self.presenter_mut().channel = Some(value.trim().to_string());
            }
            "presenter.width" => self.presenter_mut().width = Some(parse_size(key, value)?),
            "presenter.height" => self.presenter_mut().height = Some(parse_size(key, value)?),
            _ => anyhow::bail!("Unknown config key: {key}. Valid keys: {}", KEYS.join(", ")),
        }
        Ok(())
    }

    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        self.defaults
            .as_ref()
            .and_then(|d| d.aspect.as_deref())
            .and_then(AspectRatio::from_token)
    }

    pub fn show_border(&self) -> bool {
        self.defaults.as_ref().and_then(|d| d.border).unwrap_or(true)
    }

    pub fn windowed(&self) -> bool {
        self.defaults.as_ref().and_then(|d| d.windowed).unwrap_or(false)
    }

    pub fn channel(&self) -> String {
        self.presenter
            .as_ref()
            .and_then(|p| p.channel.clone())
            .unwrap_or_else(|| DEFAULT_CHANNEL.to_string())
    }

    pub fn presenter_size(&self) -> [f32; 2] {
        let presenter = self.presenter.as_ref();
        let width = presenter.and_then(|p| p.width).unwrap_or(DEFAULT_PRESENTER_WIDTH);
        let height = presenter.and_then(|p| p.height).unwrap_or(DEFAULT_PRESENTER_HEIGHT);
        [width as f32, height as f32]
    }

    fn defaults_mut(&mut self) -> &mut DefaultsConfig {
        self.defaults.get_or_insert_with(DefaultsConfig::default)
    }

    fn presenter_mut(&mut self) -> &mut PresenterConfig {
        self.presenter.get_or_insert_with(PresenterConfig::default)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => anyhow::bail!("Invalid {key}: {value}. Must be 'true' or 'false'."),
    }
}

fn parse_size(key: &str, value: &str) -> Result<u32> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => anyhow::bail!("Invalid {key}: {value}. Must be a positive integer."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.aspect_ratio(), None);
        assert!(config.show_border());
        assert!(!config.windowed());
        assert_eq!(config.channel(), DEFAULT_CHANNEL);
        assert_eq!(config.presenter_size(), [400.0, 600.0]);
    }

    #[test]
    fn test_set_valid_values() {
        let mut config = Config::default();
        config.set("defaults.aspect", "9:16").unwrap();
        config.set("defaults.border", "false").unwrap();
        config.set("defaults.windowed", "true").unwrap();
        config.set("presenter.channel", "talk").unwrap();
        config.set("presenter.width", "800").unwrap();

        assert_eq!(config.aspect_ratio(), Some(AspectRatio::Portrait));
        assert!(!config.show_border());
        assert!(config.windowed());
        assert_eq!(config.channel(), "talk");
        assert_eq!(config.presenter_size(), [800.0, 600.0]);
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = Config::default();
        assert!(config.set("defaults.aspect", "4:3").is_err());
        assert!(config.set("defaults.border", "yes").is_err());
        assert!(config.set("presenter.channel", "  ").is_err());
        assert!(config.set("presenter.height", "0").is_err());
        let err = config.set("theme", "dark").unwrap_err();
        assert!(err.to_string().contains("presenter.channel"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FILENAME);
        let mut config = Config::default();
        config.set("defaults.aspect", "16:9").unwrap();
        config.set("presenter.height", "700").unwrap();
        config.save_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# atelier configuration"));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join(FILENAME)).unwrap_err();
        assert!(err.to_string().contains("No config found"));
    }
}
