//! The engine's asset context: one loader per kind on a shared GPU device.

use tracing::{debug, info, warn};

use crate::config::AssetConfig;
use crate::error::AssetError;
use crate::gpu::{GpuDevice, GpuUploader};
use crate::kind::AssetKindId;
use crate::loader::Loader;
use crate::model::Model;
use crate::queue::{AssetRequest, RequestQueue};
use crate::shader::Shader;
use crate::source::{AssetSource, FileSource};
use crate::texture::Texture;
use crate::world::World;

/// Owns every asset loader. Construct one per GPU device and pass it to the
/// systems that need assets.
pub struct Assets<G: GpuDevice> {
    pub textures: Loader<Texture, GpuUploader<G>>,
    pub models: Loader<Model, GpuUploader<G>>,
    pub shaders: Loader<Shader, GpuUploader<G>>,
    pub worlds: Loader<World, GpuUploader<G>>,
    gpu: G,
}

impl<G: GpuDevice> Assets<G> {
    /// Loaders reading from `config.root` on disk.
    pub fn new(config: &AssetConfig, gpu: G) -> Self {
        Self::with_source(config, gpu, FileSource::new(&config.root))
    }

    /// Loaders sharing `source`.
    pub fn with_source<S>(config: &AssetConfig, gpu: G, source: S) -> Self
    where
        S: AssetSource + Clone + 'static,
    {
        info!("Asset context on {} GPU", gpu.backend_name());
        Self {
            textures: Loader::new(
                GpuUploader::new(gpu.clone()),
                source.clone(),
                config.ttl_for(AssetKindId::Texture),
            ),
            models: Loader::new(
                GpuUploader::new(gpu.clone()),
                source.clone(),
                config.ttl_for(AssetKindId::Model),
            ),
            shaders: Loader::new(
                GpuUploader::new(gpu.clone()),
                source.clone(),
                config.ttl_for(AssetKindId::Shader),
            ),
            worlds: Loader::new(
                GpuUploader::new(gpu.clone()),
                source,
                config.ttl_for(AssetKindId::World),
            ),
            gpu,
        }
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    /// Sweep every loader once. Returns the number of evictions.
    pub fn update(&mut self, delay_ms: u64) -> usize {
        self.textures.update(delay_ms)
            + self.models.update(delay_ms)
            + self.shaders.update(delay_ms)
            + self.worlds.update(delay_ms)
    }

    /// Load an asset into the cache without keeping a handle. It ages from now.
    pub fn preload(&mut self, kind: AssetKindId, name: &str) -> Result<(), AssetError> {
        match kind {
            AssetKindId::Texture => self.textures.get(name).map(drop),
            AssetKindId::Model => self.models.get(name).map(drop),
            AssetKindId::Shader => self.shaders.get(name).map(drop),
            AssetKindId::World => self.worlds.get(name).map(drop),
        }
    }

    pub fn unload(&mut self, kind: AssetKindId, name: &str) -> bool {
        match kind {
            AssetKindId::Texture => self.textures.unload(name),
            AssetKindId::Model => self.models.unload(name),
            AssetKindId::Shader => self.shaders.unload(name),
            AssetKindId::World => self.worlds.unload(name),
        }
    }

    pub fn contains(&self, kind: AssetKindId, name: &str) -> bool {
        match kind {
            AssetKindId::Texture => self.textures.contains(name),
            AssetKindId::Model => self.models.contains(name),
            AssetKindId::Shader => self.shaders.contains(name),
            AssetKindId::World => self.worlds.contains(name),
        }
    }

    /// Run every queued request. A failing request is logged and skipped.
    /// Returns how many requests were handled.
    pub fn process(&mut self, queue: &RequestQueue) -> usize {
        let requests = queue.drain();
        let count = requests.len();
        for request in requests {
            match &request {
                AssetRequest::Preload { kind, name } => {
                    if let Err(e) = self.preload(*kind, name) {
                        warn!("Preload of {} '{}' failed: {}", kind, name, e);
                    }
                }
                AssetRequest::Unload { kind, name } => {
                    if !self.unload(*kind, name) {
                        debug!("Unload of {} '{}': not cached", kind, name);
                    }
                }
            }
        }
        count
    }

    /// Total cached assets across all kinds.
    pub fn cached(&self) -> usize {
        self.textures.len() + self.models.len() + self.shaders.len() + self.worlds.len()
    }

    /// Evict everything.
    pub fn clear(&mut self) {
        self.textures.clear();
        self.models.clear();
        self.shaders.clear();
        self.worlds.clear();
    }
}
