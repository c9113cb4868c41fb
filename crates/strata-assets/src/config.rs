use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::kind::AssetKindId;
use crate::root::DEFAULT_TTL_MS;

/// Asset cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory virtual paths are resolved against.
    pub root: PathBuf,
    /// Idle time before an unreferenced asset is evicted.
    pub ttl_ms: u64,
    pub textures: KindConfig,
    pub models: KindConfig,
    pub shaders: KindConfig,
    pub worlds: KindConfig,
}

/// Per-kind overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindConfig {
    pub ttl_ms: Option<u64>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            ttl_ms: DEFAULT_TTL_MS,
            textures: KindConfig::default(),
            models: KindConfig::default(),
            shaders: KindConfig::default(),
            worlds: KindConfig::default(),
        }
    }
}

impl AssetConfig {
    /// Effective TTL for a kind.
    pub fn ttl_for(&self, kind: AssetKindId) -> u64 {
        let overrides = match kind {
            AssetKindId::Texture => &self.textures,
            AssetKindId::Model => &self.models,
            AssetKindId::Shader => &self.shaders,
            AssetKindId::World => &self.worlds,
        };
        overrides.ttl_ms.unwrap_or(self.ttl_ms)
    }
}
