//! GPU device seam
//!
//! Payload builders allocate GPU objects through [`GpuDevice`] so the cache
//! never depends on a specific graphics API. [`HeadlessGpu`] is an in-memory
//! device for tools and tests.

mod headless;

use std::fmt::{self, Debug};

use thiserror::Error;

pub use headless::{FailPoint, HeadlessGpu};

/// Error type for GPU operations
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("Texture creation failed: {0}")]
    TextureCreationFailed(String),

    #[error("Buffer upload failed: {0}")]
    UploadFailed(String),

    #[error("{stage} shader failed to compile: {log}")]
    CompileFailed { stage: ShaderStage, log: String },

    #[error("Program link failed: {0}")]
    LinkFailed(String),

    #[error("Unknown GPU object {0}")]
    UnknownObject(GpuId),

    #[error("Device lost")]
    DeviceLost,

    #[error("Out of memory")]
    OutOfMemory,
}

/// Result type for GPU operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Name of an object living on the GPU. Zero is never a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GpuId(pub u32);

impl GpuId {
    pub const NULL: GpuId = GpuId(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for GpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuTextureFormat {
    /// RGBA 8-bit with sRGB color space
    Rgba8Srgb,
}

impl GpuTextureFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            GpuTextureFormat::Rgba8Srgb => 4,
        }
    }
}

/// Texture descriptor for creation
#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Texture format
    pub format: GpuTextureFormat,
}

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Backend-agnostic GPU operations used by payload builders.
///
/// All calls happen on the thread that owns the graphics context.
pub trait GpuDevice: Clone + Debug {
    /// Upload pixel data into a new texture
    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuResult<GpuId>;

    /// Upload interleaved vertices of `stride` bytes and an index list into a
    /// new vertex array
    fn create_vertex_array(&self, vertices: &[u8], stride: usize, indices: &[u32])
        -> GpuResult<GpuId>;

    /// Compile one shader stage
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> GpuResult<GpuId>;

    /// Link a vertex and a fragment stage into a program
    fn link_program(&self, vertex: GpuId, fragment: GpuId) -> GpuResult<GpuId>;

    /// Free any object created by this device
    fn destroy(&self, id: GpuId) -> GpuResult<()>;

    /// Get the name of this GPU backend (for debugging)
    fn backend_name(&self) -> &'static str;
}

/// Builds every built-in payload kind on one GPU device.
///
/// The `PayloadBuilder` impls live next to each asset kind.
#[derive(Debug, Clone)]
pub struct GpuUploader<G: GpuDevice> {
    gpu: G,
}

impl<G: GpuDevice> GpuUploader<G> {
    pub fn new(gpu: G) -> Self {
        Self { gpu }
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }
}
