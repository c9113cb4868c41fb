//! Asset kinds and the payload-building seam.

use std::fmt;
use std::str::FromStr;

use crate::decoder::DecoderRegistry;
use crate::error::AssetError;
use crate::path::VirtualPath;

/// One family of cached assets (textures, models, ...).
///
/// A kind names the plain decoded data (`Record`), the heavyweight resource
/// built from it (`Payload`) and the namespace its virtual paths live in.
pub trait AssetKind: Sized + 'static {
    /// Decoded, type-specific data bag.
    type Record;
    /// Heavyweight resource owned by a cache root.
    type Payload;

    /// Virtual path prefix for this kind.
    const NAMESPACE: &'static str;
    /// Extension appended to names that have none.
    const DEFAULT_EXTENSION: &'static str;

    /// Check that a record is usable. Returns a human-readable reason on failure.
    fn validate(record: &Self::Record) -> Result<(), String>;

    /// Whether a payload is fully constructed and usable.
    fn is_ready(payload: &Self::Payload) -> bool;

    /// Install the decoders this kind ships with.
    fn register_default_decoders(_registry: &mut DecoderRegistry<Self>) {}
}

/// Builds and tears down payloads for one asset kind.
///
/// `build` must be all-or-nothing: on failure nothing it allocated may
/// outlive the call.
pub trait PayloadBuilder<K: AssetKind> {
    fn build(&mut self, path: &VirtualPath, record: K::Record) -> Result<K::Payload, AssetError>;

    fn release(&mut self, payload: K::Payload) -> Result<(), AssetError>;
}

/// Runtime tag for the built-in asset kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKindId {
    Texture,
    Model,
    Shader,
    World,
}

impl AssetKindId {
    pub const ALL: [AssetKindId; 4] = [
        AssetKindId::Texture,
        AssetKindId::Model,
        AssetKindId::Shader,
        AssetKindId::World,
    ];

    /// Namespace used by this kind's virtual paths.
    pub fn namespace(&self) -> &'static str {
        match self {
            AssetKindId::Texture => "textures",
            AssetKindId::Model => "models",
            AssetKindId::Shader => "shaders",
            AssetKindId::World => "worlds",
        }
    }

    /// Guess the kind from the first segment of a name like `models/tree.glb`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches(['/', '\\']);
        let first = name.split(['/', '\\']).next()?;
        first.parse().ok()
    }
}

impl fmt::Display for AssetKindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.namespace())
    }
}

impl FromStr for AssetKindId {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetKindId::ALL
            .into_iter()
            .find(|kind| kind.namespace() == s)
            .ok_or_else(|| AssetError::InvalidArgument(format!("unknown asset kind '{}'", s)))
    }
}
