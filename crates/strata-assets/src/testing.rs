//! Test-only asset kind with counting decoder and builder.

use std::cell::Cell;
use std::rc::Rc;

use crate::decoder::Decoder;
use crate::error::AssetError;
use crate::gpu::GpuError;
use crate::kind::{AssetKind, PayloadBuilder};
use crate::path::VirtualPath;
use crate::root::{Root, RootRef};

/// Opaque byte blobs under `blobs/`.
pub(crate) struct Blob;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BlobPayload {
    pub id: u32,
    pub len: usize,
    /// Release of this payload fails.
    pub sticky: bool,
}

impl BlobPayload {
    pub fn new(id: u32, len: usize) -> Self {
        Self {
            id,
            len,
            sticky: false,
        }
    }
}

impl AssetKind for Blob {
    type Record = Vec<u8>;
    type Payload = BlobPayload;

    const NAMESPACE: &'static str = "blobs";
    const DEFAULT_EXTENSION: &'static str = "bin";

    fn validate(record: &Self::Record) -> Result<(), String> {
        if record.is_empty() {
            return Err("empty blob".into());
        }
        Ok(())
    }

    fn is_ready(payload: &Self::Payload) -> bool {
        payload.id != 0
    }
}

pub(crate) fn blob_root(name: &str, ttl_ms: u64) -> RootRef<Blob> {
    let path = VirtualPath::normalize(Blob::NAMESPACE, name, Blob::DEFAULT_EXTENSION).unwrap();
    Rc::new(Root::new(path, BlobPayload::new(1, 3), ttl_ms))
}

/// Shared call counters, readable after the builder moved into a loader.
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    built: Rc<Cell<usize>>,
    released: Rc<Cell<usize>>,
    decoded: Rc<Cell<usize>>,
}

impl Counters {
    pub fn built(&self) -> usize {
        self.built.get()
    }

    pub fn released(&self) -> usize {
        self.released.get()
    }

    pub fn decoded(&self) -> usize {
        self.decoded.get()
    }

    /// Payloads built and not yet released.
    pub fn live(&self) -> usize {
        self.built() - self.released()
    }
}

/// Builder that hands out increasing ids. Records starting with `fail` fail
/// to build; records starting with `sticky` fail to release.
pub(crate) struct CountingBuilder {
    counters: Counters,
    next_id: u32,
}

impl CountingBuilder {
    pub fn new(counters: &Counters) -> Self {
        Self {
            counters: counters.clone(),
            next_id: 1,
        }
    }
}

impl PayloadBuilder<Blob> for CountingBuilder {
    fn build(&mut self, _path: &VirtualPath, record: Vec<u8>) -> Result<BlobPayload, AssetError> {
        if record.starts_with(b"fail") {
            return Err(GpuError::OutOfMemory.into());
        }
        let id = self.next_id;
        self.next_id += 1;
        self.counters.built.set(self.counters.built() + 1);
        Ok(BlobPayload {
            id,
            len: record.len(),
            sticky: record.starts_with(b"sticky"),
        })
    }

    fn release(&mut self, payload: BlobPayload) -> Result<(), AssetError> {
        if payload.sticky {
            return Err(GpuError::DeviceLost.into());
        }
        self.counters.released.set(self.counters.released() + 1);
        Ok(())
    }
}

/// Decoder that copies bytes through. `corrupt` is a format error.
pub(crate) struct CountingDecoder {
    counters: Counters,
}

impl CountingDecoder {
    pub fn new(counters: &Counters) -> Self {
        Self {
            counters: counters.clone(),
        }
    }
}

impl Decoder<Blob> for CountingDecoder {
    fn decode(&self, path: &VirtualPath, bytes: &[u8]) -> Result<Vec<u8>, AssetError> {
        self.counters.decoded.set(self.counters.decoded() + 1);
        if bytes == b"corrupt" {
            return Err(AssetError::format(path, "corrupt blob"));
        }
        Ok(bytes.to_vec())
    }
}

/// One triangle in the xy plane with an embedded buffer.
pub(crate) const TRIANGLE_GLTF: &str = r#"{
    "asset": { "version": "2.0" },
    "buffers": [{
        "byteLength": 36,
        "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
    }],
    "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
    "accessors": [{
        "bufferView": 0,
        "componentType": 5126,
        "count": 3,
        "type": "VEC3",
        "min": [0.0, 0.0, 0.0],
        "max": [1.0, 1.0, 0.0]
    }],
    "meshes": [{ "name": "tri", "primitives": [{ "attributes": { "POSITION": 0 } }] }]
}"#;
