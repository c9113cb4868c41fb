//! Per-kind loader: name normalization, decode-on-miss and the eviction sweep.

use tracing::{debug, info, warn};

use crate::cache::{Cache, EvictionListener};
use crate::decoder::{Decoder, DecoderRegistry};
use crate::error::AssetError;
use crate::handle::Handle;
use crate::kind::{AssetKind, PayloadBuilder};
use crate::path::VirtualPath;
use crate::root::{Root, RootRef};
use crate::source::AssetSource;

/// Running counters for one loader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// `get` calls answered from the cache.
    pub hits: u64,
    /// `get` calls that had to read and decode.
    pub misses: u64,
    /// Payloads built and cached.
    pub loads: u64,
    /// Loads or creates that returned an error.
    pub failed_loads: u64,
    /// Roots evicted by sweep, unload or clear.
    pub evictions: u64,
}

/// Loads, caches and evicts assets of one kind.
///
/// Every handle returned is backed by a fully built payload. Roots live in the
/// cache until they have gone `ttl_ms` without a handle, are unloaded, or the
/// loader is cleared or dropped.
pub struct Loader<K: AssetKind, B: PayloadBuilder<K>> {
    cache: Cache<K>,
    decoders: DecoderRegistry<K>,
    builder: B,
    source: Box<dyn AssetSource>,
    ttl_ms: u64,
    stats: LoaderStats,
    pending: Vec<RootRef<K>>,
}

impl<K: AssetKind, B: PayloadBuilder<K>> Loader<K, B> {
    /// Create a loader with the kind's default decoders.
    pub fn new(builder: B, source: impl AssetSource + 'static, ttl_ms: u64) -> Self {
        info!("{} loader created (ttl {} ms)", K::NAMESPACE, ttl_ms);
        Self {
            cache: Cache::new(K::NAMESPACE),
            decoders: DecoderRegistry::with_defaults(),
            builder,
            source: Box::new(source),
            ttl_ms,
            stats: LoaderStats::default(),
            pending: Vec::new(),
        }
    }

    /// Register (or replace) the decoder for the given extensions.
    pub fn register_decoder<D>(&mut self, extensions: &[&str], decoder: D)
    where
        D: Decoder<K> + 'static,
    {
        self.decoders.register(extensions, decoder);
    }

    /// Observe every path this loader's cache drops.
    pub fn set_eviction_listener(&mut self, listener: EvictionListener) {
        self.cache.set_listener(listener);
    }

    /// Turn a caller-supplied name into this kind's virtual path.
    pub fn normalize(&self, name: &str) -> Result<VirtualPath, AssetError> {
        VirtualPath::normalize(K::NAMESPACE, name, K::DEFAULT_EXTENSION)
    }

    /// Get a handle to the named asset, loading it on a miss.
    pub fn get(&mut self, name: &str) -> Result<Handle<K>, AssetError> {
        let path = self.normalize(name)?;

        if let Some(root) = self.cache.get(path.as_str()) {
            let handle = Root::create_handle(root);
            self.stats.hits += 1;
            debug!("Cache hit: {}", path);
            return Ok(handle);
        }

        self.stats.misses += 1;
        debug!("Cache miss: {}", path);

        let result = self.load(path);
        if let Err(e) = &result {
            self.stats.failed_loads += 1;
            warn!("Failed to load {} asset '{}': {}", K::NAMESPACE, name, e);
        }
        result
    }

    fn load(&mut self, path: VirtualPath) -> Result<Handle<K>, AssetError> {
        let decoder = self.decoders.resolve(&path)?;
        let bytes = self.source.read(&path)?;
        let record = decoder.decode(&path, &bytes)?;
        K::validate(&record).map_err(|reason| AssetError::format(&path, reason))?;
        self.insert(path, record)
    }

    /// Build and cache an asset from an already decoded record.
    pub fn create(&mut self, name: &str, record: K::Record) -> Result<Handle<K>, AssetError> {
        if name.trim().is_empty() {
            return Err(AssetError::InvalidArgument("asset name is blank".into()));
        }
        let path = self.normalize(name)?;
        K::validate(&record)
            .map_err(|reason| AssetError::InvalidArgument(format!("'{}': {}", path, reason)))?;

        if self.cache.contains(path.as_str()) {
            return Err(AssetError::AlreadyExists(path.to_string()));
        }

        let result = self.insert(path, record);
        if result.is_err() {
            self.stats.failed_loads += 1;
        }
        result
    }

    /// Build the payload, wrap it in a root and cache it.
    fn insert(&mut self, path: VirtualPath, record: K::Record) -> Result<Handle<K>, AssetError> {
        let payload = self.builder.build(&path, record)?;

        match self.cache.add(Root::new(path, payload, self.ttl_ms)) {
            Ok(root) => {
                self.stats.loads += 1;
                debug!("Loaded {}", root.path());
                Ok(Root::create_handle(&root))
            }
            Err(root) => {
                // Lost the slot: the fresh payload is ours to free.
                if let Ok(Some(payload)) = root.evict() {
                    if let Err(e) = self.builder.release(payload) {
                        warn!("Failed to release duplicate '{}': {}", root.path(), e);
                    }
                }
                Err(AssetError::AlreadyExists(root.path().to_string()))
            }
        }
    }

    /// Age every cached root by `delay_ms` and evict the expired ones.
    /// Returns how many were evicted.
    pub fn update(&mut self, delay_ms: u64) -> usize {
        self.release_pending();

        let expired = self.cache.sweep(delay_ms);
        let count = expired.len();
        for root in expired {
            self.evict_root(root);
        }
        if count > 0 {
            info!(
                "Evicted {} idle {} ({} cached)",
                count,
                K::NAMESPACE,
                self.cache.len()
            );
        }
        count
    }

    /// Evict the named asset now, invalidating its handles.
    pub fn unload(&mut self, name: &str) -> bool {
        let Ok(path) = self.normalize(name) else {
            return false;
        };
        match self.cache.remove(path.as_str()) {
            Some(root) => {
                self.evict_root(root);
                true
            }
            None => false,
        }
    }

    /// Evict everything.
    pub fn clear(&mut self) {
        let roots = self.cache.drain();
        if !roots.is_empty() {
            info!("Clearing {} cached {}", roots.len(), K::NAMESPACE);
        }
        for root in roots {
            self.evict_root(root);
        }
        self.release_pending();
    }

    /// Invalidate the root's handles, then release its payload. A payload
    /// that is being read is parked until the next `update` or `clear`.
    fn evict_root(&mut self, root: RootRef<K>) {
        root.invalidate();
        self.stats.evictions += 1;
        self.release_payload(root);
    }

    fn release_payload(&mut self, root: RootRef<K>) {
        match root.take_payload() {
            Ok(Some(payload)) => {
                if let Err(e) = self.builder.release(payload) {
                    warn!("Failed to release {} payload '{}': {}", K::NAMESPACE, root.path(), e);
                }
            }
            Ok(None) => {}
            Err(_) => {
                debug!("'{}' is being read; deferring its release", root.path());
                self.pending.push(root);
            }
        }
    }

    fn release_pending(&mut self) {
        for root in std::mem::take(&mut self.pending) {
            self.release_payload(root);
        }
    }

    /// Evicted roots whose payload release is still deferred.
    pub fn pending_releases(&self) -> usize {
        self.pending.len()
    }

    /// Whether the named asset is cached.
    pub fn contains(&self, name: &str) -> bool {
        self.normalize(name)
            .map(|path| self.cache.contains(path.as_str()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> LoaderStats {
        self.stats
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn cache(&self) -> &Cache<K> {
        &self.cache
    }

    pub fn decoders(&self) -> &DecoderRegistry<K> {
        &self.decoders
    }
}

impl<K: AssetKind, B: PayloadBuilder<K>> Drop for Loader<K, B> {
    fn drop(&mut self) {
        self.clear();
        if !self.pending.is_empty() {
            warn!(
                "{} loader dropped with {} payloads still being read",
                K::NAMESPACE,
                self.pending.len()
            );
        }
    }
}
