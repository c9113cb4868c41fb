//! World terrain: JSON height grids uploaded as a single mesh.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decoder::{Decoder, DecoderRegistry};
use crate::error::AssetError;
use crate::gpu::{GpuDevice, GpuId, GpuUploader};
use crate::handle::Handle;
use crate::kind::{AssetKind, PayloadBuilder};
use crate::model::MeshVertex;
use crate::path::VirtualPath;

/// Worlds under `worlds/`.
pub struct World;

/// Height grid, row-major: `heights[z * width + x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldRecord {
    pub width: u32,
    pub depth: u32,
    pub cell_size: f32,
    pub heights: Vec<f32>,
}

impl WorldRecord {
    pub fn height(&self, x: u32, z: u32) -> f32 {
        self.heights[(z * self.width + x) as usize]
    }

    /// Surface normal at a grid point from central differences, falling back
    /// to one-sided differences on the border.
    pub fn normal_at(&self, x: u32, z: u32) -> Vec3 {
        let left = x.saturating_sub(1);
        let right = (x + 1).min(self.width - 1);
        let down = z.saturating_sub(1);
        let up = (z + 1).min(self.depth - 1);

        let dx = (right - left) as f32 * self.cell_size;
        let dz = (up - down) as f32 * self.cell_size;
        let slope_x = (self.height(right, z) - self.height(left, z)) / dx;
        let slope_z = (self.height(x, up) - self.height(x, down)) / dz;

        Vec3::new(-slope_x, 1.0, -slope_z).normalize()
    }

    /// Lowest and highest sample.
    pub fn height_range(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }

    /// Grid vertices and a triangle list covering every cell.
    pub fn mesh(&self) -> (Vec<MeshVertex>, Vec<u32>) {
        let mut vertices = Vec::with_capacity(self.heights.len());
        for z in 0..self.depth {
            for x in 0..self.width {
                vertices.push(MeshVertex {
                    position: [
                        x as f32 * self.cell_size,
                        self.height(x, z),
                        z as f32 * self.cell_size,
                    ],
                    normal: self.normal_at(x, z).to_array(),
                    tex_coord: [
                        x as f32 / (self.width - 1) as f32,
                        z as f32 / (self.depth - 1) as f32,
                    ],
                });
            }
        }

        let mut indices = Vec::with_capacity(((self.width - 1) * (self.depth - 1) * 6) as usize);
        for z in 0..self.depth - 1 {
            for x in 0..self.width - 1 {
                let top_left = z * self.width + x;
                let top_right = top_left + 1;
                let bottom_left = top_left + self.width;
                let bottom_right = bottom_left + 1;

                indices.extend_from_slice(&[top_left, bottom_left, top_right]);
                indices.extend_from_slice(&[top_right, bottom_left, bottom_right]);
            }
        }

        (vertices, indices)
    }
}

/// An uploaded terrain mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldPayload {
    pub vertex_array: GpuId,
    pub width: u32,
    pub depth: u32,
    pub cell_size: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub index_count: u32,
}

impl AssetKind for World {
    type Record = WorldRecord;
    type Payload = WorldPayload;

    const NAMESPACE: &'static str = "worlds";
    const DEFAULT_EXTENSION: &'static str = "world";

    fn validate(record: &WorldRecord) -> Result<(), String> {
        if record.width < 2 || record.depth < 2 {
            return Err(format!(
                "grid must be at least 2x2, got {}x{}",
                record.width, record.depth
            ));
        }
        if !(record.cell_size.is_finite() && record.cell_size > 0.0) {
            return Err(format!("invalid cell size {}", record.cell_size));
        }
        let expected = record.width as usize * record.depth as usize;
        if record.heights.len() != expected {
            return Err(format!(
                "expected {} heights, got {}",
                expected,
                record.heights.len()
            ));
        }
        if record.heights.iter().any(|h| !h.is_finite()) {
            return Err("heights must be finite".into());
        }
        Ok(())
    }

    fn is_ready(payload: &WorldPayload) -> bool {
        payload.vertex_array.is_valid()
    }

    fn register_default_decoders(registry: &mut DecoderRegistry<Self>) {
        registry.register(&["world", "json"], WorldDecoder);
    }
}

/// Reads a [`WorldRecord`] from JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldDecoder;

impl Decoder<World> for WorldDecoder {
    fn decode(&self, path: &VirtualPath, bytes: &[u8]) -> Result<WorldRecord, AssetError> {
        serde_json::from_slice(bytes).map_err(|e| AssetError::format(path, e))
    }
}

impl<G: GpuDevice> PayloadBuilder<World> for GpuUploader<G> {
    fn build(&mut self, path: &VirtualPath, record: WorldRecord) -> Result<WorldPayload, AssetError> {
        let (vertices, indices) = record.mesh();
        let (min_height, max_height) = record.height_range();

        let vertex_array = self.gpu().create_vertex_array(
            bytemuck::cast_slice(&vertices),
            std::mem::size_of::<MeshVertex>(),
            &indices,
        )?;

        debug!(
            "Uploaded world '{}': {}x{} grid, heights {:.2}..{:.2}",
            path, record.width, record.depth, min_height, max_height
        );

        Ok(WorldPayload {
            vertex_array,
            width: record.width,
            depth: record.depth,
            cell_size: record.cell_size,
            min_height,
            max_height,
            index_count: indices.len() as u32,
        })
    }

    fn release(&mut self, payload: WorldPayload) -> Result<(), AssetError> {
        self.gpu().destroy(payload.vertex_array)?;
        Ok(())
    }
}

impl Handle<World> {
    pub fn vertex_array(&self) -> Result<GpuId, AssetError> {
        self.read(|w| w.vertex_array)
    }

    /// Grid size in samples.
    pub fn dimensions(&self) -> Result<(u32, u32), AssetError> {
        self.read(|w| (w.width, w.depth))
    }

    /// World-space extent along x and z.
    pub fn extent(&self) -> Result<(f32, f32), AssetError> {
        self.read(|w| {
            (
                (w.width - 1) as f32 * w.cell_size,
                (w.depth - 1) as f32 * w.cell_size,
            )
        })
    }

    pub fn height_range(&self) -> Result<(f32, f32), AssetError> {
        self.read(|w| (w.min_height, w.max_height))
    }
}
