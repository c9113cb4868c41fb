//! 3D models: glTF decoding and vertex-array upload.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use tracing::debug;

use crate::decoder::{Decoder, DecoderRegistry};
use crate::error::AssetError;
use crate::gpu::{GpuDevice, GpuId, GpuUploader};
use crate::handle::Handle;
use crate::kind::{AssetKind, PayloadBuilder};
use crate::path::VirtualPath;

/// Models under `models/`.
pub struct Model;

/// Decoded model data (renderer-agnostic).
#[derive(Debug, Clone)]
pub struct ModelRecord {
    pub name: String,
    pub primitives: Vec<MeshPrimitive>,
}

/// A single draw primitive within a model.
#[derive(Debug, Clone, Default)]
pub struct MeshPrimitive {
    pub positions: Vec<[f32; 3]>,
    /// Empty when the source has no normals; face normals are generated on upload.
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    /// `None` means the positions form a plain triangle list.
    pub indices: Option<Vec<u32>>,
}

/// Interleaved vertex uploaded for models and terrain.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing every point. `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// An uploaded model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPayload {
    pub vertex_array: GpuId,
    pub vertex_count: u32,
    pub index_count: u32,
    pub bounds: Aabb,
}

impl AssetKind for Model {
    type Record = ModelRecord;
    type Payload = ModelPayload;

    const NAMESPACE: &'static str = "models";
    const DEFAULT_EXTENSION: &'static str = "glb";

    fn validate(record: &ModelRecord) -> Result<(), String> {
        if record.primitives.iter().all(|p| p.positions.is_empty()) {
            return Err(format!("model '{}' has no vertices", record.name));
        }

        for (i, primitive) in record.primitives.iter().enumerate() {
            let count = primitive.positions.len();
            if !primitive.normals.is_empty() && primitive.normals.len() != count {
                return Err(format!(
                    "primitive {}: {} normals for {} positions",
                    i,
                    primitive.normals.len(),
                    count
                ));
            }
            if let Some(tex_coords) = &primitive.tex_coords {
                if tex_coords.len() != count {
                    return Err(format!(
                        "primitive {}: {} texture coordinates for {} positions",
                        i,
                        tex_coords.len(),
                        count
                    ));
                }
            }
            match &primitive.indices {
                Some(indices) => {
                    if indices.len() % 3 != 0 {
                        return Err(format!("primitive {}: index count is not a multiple of 3", i));
                    }
                    if let Some(bad) = indices.iter().find(|&&idx| idx as usize >= count) {
                        return Err(format!("primitive {}: index {} out of range", i, bad));
                    }
                }
                None if count % 3 != 0 => {
                    return Err(format!("primitive {}: vertex count is not a multiple of 3", i));
                }
                None => {}
            }
        }
        Ok(())
    }

    fn is_ready(payload: &ModelPayload) -> bool {
        payload.vertex_array.is_valid()
    }

    fn register_default_decoders(registry: &mut DecoderRegistry<Self>) {
        registry.register(&["glb", "gltf"], GltfDecoder);
    }
}

/// Decodes glTF 2.0 files (.gltf with embedded buffers, or .glb), merging
/// every mesh into one record.
#[derive(Debug, Clone, Copy, Default)]
pub struct GltfDecoder;

impl Decoder<Model> for GltfDecoder {
    fn decode(&self, path: &VirtualPath, bytes: &[u8]) -> Result<ModelRecord, AssetError> {
        let (document, buffers, _images) =
            gltf::import_slice(bytes).map_err(|e| AssetError::format(path, e))?;

        let mut primitives = Vec::new();

        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

                let positions: Vec<[f32; 3]> = reader
                    .read_positions()
                    .map(|iter| iter.collect())
                    .unwrap_or_default();

                let normals: Vec<[f32; 3]> = reader
                    .read_normals()
                    .map(|iter| iter.collect())
                    .unwrap_or_default();

                let tex_coords: Option<Vec<[f32; 2]>> = reader
                    .read_tex_coords(0)
                    .map(|tc| tc.into_f32().collect());

                let indices: Option<Vec<u32>> = reader
                    .read_indices()
                    .map(|idx| idx.into_u32().collect());

                primitives.push(MeshPrimitive {
                    positions,
                    normals,
                    tex_coords,
                    indices,
                });
            }
        }

        if primitives.is_empty() {
            return Err(AssetError::format(path, "no meshes found"));
        }

        let name = document
            .meshes()
            .next()
            .and_then(|m| m.name().map(str::to_string))
            .unwrap_or_else(|| path.file_name().to_string());

        debug!("glTF '{}': {} primitives", path, primitives.len());
        Ok(ModelRecord { name, primitives })
    }
}

/// Flatten every primitive into one interleaved vertex list and index list.
pub fn flatten(record: &ModelRecord) -> (Vec<MeshVertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for primitive in &record.primitives {
        let base = vertices.len() as u32;
        let local: Vec<u32> = match &primitive.indices {
            Some(idx) => idx.clone(),
            None => (0..primitive.positions.len() as u32).collect(),
        };

        let normals = if primitive.normals.is_empty() {
            face_normals(&primitive.positions, &local)
        } else {
            primitive.normals.clone()
        };

        for (i, position) in primitive.positions.iter().enumerate() {
            let tex_coord = primitive
                .tex_coords
                .as_ref()
                .map_or([0.0, 0.0], |tc| tc[i]);
            vertices.push(MeshVertex {
                position: *position,
                normal: normals[i],
                tex_coord,
            });
        }

        indices.extend(local.into_iter().map(|i| i + base));
    }

    (vertices, indices)
}

/// Area-weighted vertex normals from triangle faces.
fn face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(positions[i as usize]));
        let face = (b - a).cross(c - a);
        for &i in tri {
            normals[i as usize] += face;
        }
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

impl<G: GpuDevice> PayloadBuilder<Model> for GpuUploader<G> {
    fn build(&mut self, path: &VirtualPath, record: ModelRecord) -> Result<ModelPayload, AssetError> {
        let (vertices, indices) = flatten(&record);
        let bounds = Aabb::from_points(vertices.iter().map(|v| Vec3::from(v.position)))
            .ok_or_else(|| AssetError::format(path, "model has no vertices"))?;

        let vertex_array = self.gpu().create_vertex_array(
            bytemuck::cast_slice(&vertices),
            std::mem::size_of::<MeshVertex>(),
            &indices,
        )?;

        debug!(
            "Uploaded model '{}': {} vertices, {} indices",
            record.name,
            vertices.len(),
            indices.len()
        );

        Ok(ModelPayload {
            vertex_array,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
            bounds,
        })
    }

    fn release(&mut self, payload: ModelPayload) -> Result<(), AssetError> {
        self.gpu().destroy(payload.vertex_array)?;
        Ok(())
    }
}

impl Handle<Model> {
    pub fn vertex_array(&self) -> Result<GpuId, AssetError> {
        self.read(|m| m.vertex_array)
    }

    pub fn vertex_count(&self) -> Result<u32, AssetError> {
        self.read(|m| m.vertex_count)
    }

    pub fn index_count(&self) -> Result<u32, AssetError> {
        self.read(|m| m.index_count)
    }

    pub fn bounds(&self) -> Result<Aabb, AssetError> {
        self.read(|m| m.bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessGpu;
    use crate::testing::TRIANGLE_GLTF;

    fn triangle() -> MeshPrimitive {
        MeshPrimitive {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]],
            ..Default::default()
        }
    }

    fn path() -> VirtualPath {
        VirtualPath::normalize("models", "tri", "glb").unwrap()
    }

    #[test]
    fn flatten_offsets_indices() {
        let quad = MeshPrimitive {
            positions: vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            tex_coords: Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
            indices: Some(vec![0, 1, 2, 0, 2, 3]),
        };
        let record = ModelRecord {
            name: "two".into(),
            primitives: vec![triangle(), quad],
        };

        let (vertices, indices) = flatten(&record);
        assert_eq!(vertices.len(), 7);
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 3, 5, 6]);
        assert_eq!(vertices[5].tex_coord, [1.0, 1.0]);
    }

    #[test]
    fn missing_normals_are_generated() {
        let record = ModelRecord {
            name: "tri".into(),
            primitives: vec![triangle()],
        };
        let (vertices, _) = flatten(&record);
        for v in vertices {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn validate_catches_mismatches() {
        let mut primitive = triangle();
        primitive.normals = vec![[0.0, 1.0, 0.0]; 2];
        let record = ModelRecord {
            name: "bad".into(),
            primitives: vec![primitive],
        };
        assert!(Model::validate(&record).is_err());

        let mut primitive = triangle();
        primitive.indices = Some(vec![0, 1, 5]);
        let record = ModelRecord {
            name: "bad".into(),
            primitives: vec![primitive],
        };
        assert!(Model::validate(&record).is_err());

        let empty = ModelRecord {
            name: "empty".into(),
            primitives: vec![MeshPrimitive::default()],
        };
        assert!(Model::validate(&empty).is_err());
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let bounds = Aabb::from_points([
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-1.0, 4.0, 0.0),
        ])
        .unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 4.0, 3.0));
        assert_eq!(bounds.center(), Vec3::new(0.0, 1.0, 1.5));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn uploads_model() {
        let gpu = HeadlessGpu::new();
        let mut uploader = GpuUploader::new(gpu.clone());
        let record = ModelRecord {
            name: "tri".into(),
            primitives: vec![triangle()],
        };

        let payload = PayloadBuilder::<Model>::build(&mut uploader, &path(), record).unwrap();
        assert!(Model::is_ready(&payload));
        assert_eq!(payload.vertex_count, 3);
        assert_eq!(payload.index_count, 3);
        assert_eq!(payload.bounds.size(), Vec3::new(1.0, 0.0, 1.0));

        PayloadBuilder::<Model>::release(&mut uploader, payload).unwrap();
        assert_eq!(gpu.live_objects(), 0);
    }

    #[test]
    fn decodes_embedded_gltf() {
        let record = GltfDecoder.decode(&path(), TRIANGLE_GLTF.as_bytes()).unwrap();
        assert_eq!(record.name, "tri");
        assert_eq!(record.primitives.len(), 1);

        let primitive = &record.primitives[0];
        assert_eq!(primitive.positions[2], [0.0, 1.0, 0.0]);
        assert!(primitive.normals.is_empty());
        assert!(primitive.indices.is_none());
        assert!(Model::validate(&record).is_ok());

        let (vertices, _) = flatten(&record);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn garbage_is_not_gltf() {
        assert!(matches!(
            GltfDecoder.decode(&path(), b"definitely not gltf"),
            Err(AssetError::Format { .. })
        ));
    }
}
