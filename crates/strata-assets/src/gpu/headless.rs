//! Headless GPU implementation
//!
//! Allocates object ids and validates uploads in memory so the cache can run
//! in tools and tests without graphics hardware.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{GpuDevice, GpuError, GpuId, GpuResult, ShaderStage, TextureDescriptor};

/// Operation that should fail the next time it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Texture,
    VertexArray,
    Compile(ShaderStage),
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GpuObject {
    Texture { bytes: usize },
    VertexArray { bytes: usize },
    Shader(ShaderStage),
    Program,
}

impl GpuObject {
    fn bytes(&self) -> usize {
        match self {
            GpuObject::Texture { bytes } | GpuObject::VertexArray { bytes } => *bytes,
            GpuObject::Shader(_) | GpuObject::Program => 0,
        }
    }
}

#[derive(Debug)]
struct HeadlessState {
    next_id: u32,
    objects: HashMap<GpuId, GpuObject>,
    allocated_bytes: usize,
    fail_next: Vec<FailPoint>,
}

impl Default for HeadlessState {
    fn default() -> Self {
        Self {
            next_id: 1,
            objects: HashMap::new(),
            allocated_bytes: 0,
            fail_next: Vec::new(),
        }
    }
}

impl HeadlessState {
    fn take_failure(&mut self, point: FailPoint) -> bool {
        match self.fail_next.iter().position(|p| *p == point) {
            Some(index) => {
                self.fail_next.remove(index);
                true
            }
            None => false,
        }
    }

    fn allocate(&mut self, object: GpuObject) -> GpuId {
        let id = GpuId(self.next_id);
        self.next_id += 1;
        self.allocated_bytes += object.bytes();
        self.objects.insert(id, object);
        id
    }
}

/// In-memory GPU device. Clones share the same object table.
#[derive(Debug, Clone, Default)]
pub struct HeadlessGpu {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next operation of the given kind fail once.
    pub fn fail_next(&self, point: FailPoint) {
        self.state.lock().fail_next.push(point);
    }

    /// Objects created and not yet destroyed.
    pub fn live_objects(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn is_live(&self, id: GpuId) -> bool {
        self.state.lock().objects.contains_key(&id)
    }

    /// Bytes held by live textures and vertex arrays.
    pub fn allocated_bytes(&self) -> usize {
        self.state.lock().allocated_bytes
    }
}

impl GpuDevice for HeadlessGpu {
    fn create_texture(&self, desc: &TextureDescriptor, data: &[u8]) -> GpuResult<GpuId> {
        let mut state = self.state.lock();
        if state.take_failure(FailPoint::Texture) {
            return Err(GpuError::OutOfMemory);
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(GpuError::TextureCreationFailed(
                "Invalid texture dimensions".to_string(),
            ));
        }

        let expected = desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel();
        if data.len() != expected {
            return Err(GpuError::TextureCreationFailed(format!(
                "Expected {} bytes of pixel data, got {}",
                expected,
                data.len()
            )));
        }

        Ok(state.allocate(GpuObject::Texture { bytes: data.len() }))
    }

    fn create_vertex_array(
        &self,
        vertices: &[u8],
        stride: usize,
        indices: &[u32],
    ) -> GpuResult<GpuId> {
        let mut state = self.state.lock();
        if state.take_failure(FailPoint::VertexArray) {
            return Err(GpuError::OutOfMemory);
        }
        if stride == 0 || vertices.is_empty() || vertices.len() % stride != 0 {
            return Err(GpuError::UploadFailed(format!(
                "Vertex data of {} bytes does not divide into {}-byte vertices",
                vertices.len(),
                stride
            )));
        }

        let vertex_count = vertices.len() / stride;
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(GpuError::UploadFailed(format!(
                "Index {} out of range for {} vertices",
                bad, vertex_count
            )));
        }

        let bytes = vertices.len() + std::mem::size_of_val(indices);
        Ok(state.allocate(GpuObject::VertexArray { bytes }))
    }

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> GpuResult<GpuId> {
        let mut state = self.state.lock();
        if state.take_failure(FailPoint::Compile(stage)) {
            return Err(GpuError::CompileFailed {
                stage,
                log: "injected failure".to_string(),
            });
        }
        if !source.contains("main") {
            return Err(GpuError::CompileFailed {
                stage,
                log: "no entry point 'main'".to_string(),
            });
        }

        Ok(state.allocate(GpuObject::Shader(stage)))
    }

    fn link_program(&self, vertex: GpuId, fragment: GpuId) -> GpuResult<GpuId> {
        let mut state = self.state.lock();
        if state.take_failure(FailPoint::Link) {
            return Err(GpuError::LinkFailed("injected failure".to_string()));
        }

        let paired = matches!(
            (state.objects.get(&vertex), state.objects.get(&fragment)),
            (
                Some(GpuObject::Shader(ShaderStage::Vertex)),
                Some(GpuObject::Shader(ShaderStage::Fragment)),
            )
        );
        if !paired {
            return Err(GpuError::LinkFailed(format!(
                "{} and {} are not a vertex/fragment pair",
                vertex, fragment
            )));
        }

        Ok(state.allocate(GpuObject::Program))
    }

    fn destroy(&self, id: GpuId) -> GpuResult<()> {
        let mut state = self.state.lock();
        let object = state.objects.remove(&id).ok_or(GpuError::UnknownObject(id))?;
        state.allocated_bytes -= object.bytes();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Headless"
    }
}
