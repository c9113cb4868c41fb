//! Runtime settings with persistence
//!
//! Settings are saved to `~/.config/strata/settings.toml`

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use strata_assets::AssetConfig;
use strata_core::TickConfig;

/// All runtime settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub assets: AssetConfig,
    pub tick: TickConfig,
    pub run: RunSettings,
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("strata"))
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(dir) = Self::config_dir() else {
            anyhow::bail!("Could not determine config directory");
        };

        let path = dir.join("settings.toml");

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;

        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// How the command-line driver runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Simulated frame length in milliseconds
    pub frame_ms: u64,
    /// Stop after this much simulated time even if assets are still cached
    pub simulate_ms: u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            frame_ms: 16,
            simulate_ms: 300_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [assets]
            root = "data"
            ttl_ms = 5000

            [assets.worlds]
            ttl_ms = 60000

            [tick]
            tick_ms = 10
            "#,
        )
        .unwrap();

        assert_eq!(settings.assets.root, PathBuf::from("data"));
        assert_eq!(settings.assets.ttl_ms, 5_000);
        assert_eq!(settings.assets.worlds.ttl_ms, Some(60_000));
        assert_eq!(settings.tick.tick_ms, 10);
        assert_eq!(settings.tick.max_delta_ms, 250);
        assert_eq!(settings.run.simulate_ms, 300_000);
    }

    #[test]
    fn defaults_survive_toml() {
        let text = toml::to_string_pretty(&Settings::default()).unwrap();
        let settings: Settings = toml::from_str(&text).unwrap();
        assert_eq!(settings.assets, AssetConfig::default());
        assert_eq!(settings.run.frame_ms, 16);
    }
}
