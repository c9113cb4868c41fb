use std::collections::HashMap;
use std::rc::Rc;

use crate::error::AssetError;
use crate::kind::AssetKind;
use crate::path::VirtualPath;

/// Turns raw file bytes into a kind's record.
pub trait Decoder<K: AssetKind> {
    fn decode(&self, path: &VirtualPath, bytes: &[u8]) -> Result<K::Record, AssetError>;
}

/// Extension → decoder lookup for one asset kind. Extensions are matched
/// case-insensitively.
pub struct DecoderRegistry<K: AssetKind> {
    decoders: HashMap<String, Rc<dyn Decoder<K>>>,
}

impl<K: AssetKind> DecoderRegistry<K> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry holding the kind's built-in decoders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        K::register_default_decoders(&mut registry);
        registry
    }

    /// Register `decoder` for every extension in `extensions`, replacing any
    /// decoder previously registered for them.
    pub fn register<D>(&mut self, extensions: &[&str], decoder: D)
    where
        D: Decoder<K> + 'static,
    {
        let decoder: Rc<dyn Decoder<K>> = Rc::new(decoder);
        for ext in extensions {
            self.decoders
                .insert(normalize_extension(ext), Rc::clone(&decoder));
        }
    }

    /// Find the decoder for a path's extension.
    pub fn resolve(&self, path: &VirtualPath) -> Result<&dyn Decoder<K>, AssetError> {
        let extension = path.extension().unwrap_or_default();
        self.decoders
            .get(&extension)
            .map(|d| &**d)
            .ok_or_else(|| AssetError::UnsupportedFormat {
                path: path.to_string(),
                extension,
            })
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.decoders.contains_key(&normalize_extension(extension))
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }
}

impl<K: AssetKind> Default for DecoderRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}
