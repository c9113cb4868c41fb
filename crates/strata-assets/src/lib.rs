//! Strata Assets - reference-counted asset cache
//!
//! Loads textures, models, shaders and worlds once per virtual path, hands out
//! lightweight handles, and evicts GPU payloads after they have gone unused
//! for a configurable idle period.

mod cache;
mod config;
mod context;
mod decoder;
mod error;
pub mod gpu;
mod handle;
mod kind;
mod loader;
mod model;
mod path;
mod queue;
mod root;
mod shader;
mod source;
mod texture;
mod world;

#[cfg(test)]
mod testing;

pub use cache::{Cache, EvictionListener};
pub use config::{AssetConfig, KindConfig};
pub use context::Assets;
pub use decoder::{Decoder, DecoderRegistry};
pub use error::AssetError;
pub use gpu::{GpuDevice, GpuError, GpuId, GpuUploader, HeadlessGpu};
pub use handle::Handle;
pub use kind::{AssetKind, AssetKindId, PayloadBuilder};
pub use loader::{Loader, LoaderStats};
pub use model::{flatten, Aabb, GltfDecoder, MeshPrimitive, MeshVertex, Model, ModelPayload, ModelRecord};
pub use path::VirtualPath;
pub use queue::{AssetRequest, RequestQueue};
pub use root::{HandleKey, Root, RootId, RootRef, DEFAULT_TTL_MS};
pub use shader::{GlslDecoder, Shader, ShaderPayload, ShaderRecord};
pub use source::{AssetSource, FileSource, MemorySource};
pub use texture::{ImageDecoder, Texture, TextureFormat, TexturePayload, TextureRecord};
pub use world::{World, WorldDecoder, WorldPayload, WorldRecord};
