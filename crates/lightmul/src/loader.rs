//! Light archive lifecycle
//!
//! [`LightsLoader`] is an owned context: create one, `load()` it, hand it to
//! whatever needs lights, and `reset()` (or drop) it to release the archive.
//! A reset loader can be loaded again and will rebuild everything from the
//! files on disk.

use crate::archive::ArchiveReader;
use crate::cache::ResourceCache;
use crate::config::LightsConfig;
use crate::decode::decode;
use crate::error::{LightError, Result};
use crate::resolver::{DirectoryResolver, PathResolver, ensure_exists};
use crate::table::EntryTable;
use crate::texture::LightTexture;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, trace, warn};

/// An opened archive with its entry table and texture cache.
///
/// Published to lookups only once the entry table is complete.
pub struct LoadedArchive {
    reader: ArchiveReader,
    table: EntryTable,
    cache: ResourceCache,
}

impl LoadedArchive {
    /// Read the entry table from `reader`
    pub fn from_reader(reader: ArchiveReader) -> Result<Self> {
        let table = EntryTable::new(reader.read_index_records()?);

        let data_len = reader.data_len();
        let overruns = table.out_of_bounds(data_len).count();
        if overruns > 0 {
            warn!(
                "{} light records extend past the end of the data file ({} bytes)",
                overruns, data_len
            );
        }

        Ok(Self {
            reader,
            table,
            cache: ResourceCache::new(),
        })
    }

    /// Texture for `id`, decoding it on first use.
    ///
    /// Identifiers outside the table and absent slots yield `Ok(None)`
    /// without touching the cache or the data file.
    pub fn get(&self, id: u32) -> Result<Option<Arc<LightTexture>>> {
        let Some(record) = self.table.lookup(id) else {
            trace!("No light resource for {}", id);
            return Ok(None);
        };

        self.cache.get_or_insert_with(id, || {
            let mut cursor = self.reader.cursor();
            let buffer = decode(&mut cursor, &record)?;
            debug!("Decoded light {} ({}x{})", id, record.width, record.height);
            Ok(buffer.map(LightTexture::from_buffer))
        })
    }

    /// Entry table
    pub fn table(&self) -> &EntryTable {
        &self.table
    }

    /// Texture cache, for the eviction sweep
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Underlying reader
    pub fn reader(&self) -> &ArchiveReader {
        &self.reader
    }

    fn release(&self) {
        self.cache.clear();
        self.reader.close();
    }
}

/// Loads the light archive and serves decoded lights by identifier.
pub struct LightsLoader {
    config: LightsConfig,
    resolver: Arc<dyn PathResolver>,
    state: RwLock<Option<Arc<LoadedArchive>>>,
    load_lock: AsyncMutex<()>,
    epoch: AtomicU64,
}

impl LightsLoader {
    /// Create a loader resolving files inside `config.base_path`
    pub fn new(config: LightsConfig) -> Self {
        let resolver = Arc::new(DirectoryResolver::new(&config.base_path));
        Self::with_resolver(config, resolver)
    }

    /// Create a loader with a custom path resolver
    pub fn with_resolver(config: LightsConfig, resolver: Arc<dyn PathResolver>) -> Self {
        Self {
            config,
            resolver,
            state: RwLock::new(None),
            load_lock: AsyncMutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Open the archive files and build the entry table.
    ///
    /// File work runs on the blocking thread pool. Loads are serialized and
    /// a load on an already loaded instance does nothing. On failure the
    /// loader stays unloaded and the call can be retried.
    pub async fn load(&self) -> Result<()> {
        self.config.validate()?;

        let resolver = Arc::clone(&self.resolver);
        let data_file = self.config.data_file.clone();
        let index_file = self.config.index_file.clone();
        let max_count = self.config.max_count;
        let use_memory_mapping = self.config.use_memory_mapping;

        self.load_with(move || {
            let data_path = resolver.resolve(&data_file);
            let index_path = resolver.resolve(&index_file);
            ensure_exists(&data_path)?;
            ensure_exists(&index_path)?;
            ArchiveReader::open(&index_path, &data_path, max_count, use_memory_mapping)
        })
        .await
    }

    /// Load from a reader produced by `open`.
    ///
    /// `open` runs on the blocking thread pool, as does reading the index.
    pub async fn load_with<F>(&self, open: F) -> Result<()>
    where
        F: FnOnce() -> Result<ArchiveReader> + Send + 'static,
    {
        let _guard = self.load_lock.lock().await;
        if self.is_loaded() {
            debug!("Light archive already loaded");
            return Ok(());
        }

        let epoch = self.epoch.load(Ordering::Acquire);
        let archive = tokio::task::spawn_blocking(move || open().and_then(LoadedArchive::from_reader))
            .await
            .map_err(|e| LightError::Task(e.to_string()))??;

        let mut state = self.state.write();
        if self.epoch.load(Ordering::Acquire) != epoch {
            drop(state);
            archive.release();
            debug!("Light archive was reset while loading, discarding it");
            return Err(LightError::ArchiveClosed);
        }

        info!(
            "Loaded light archive: {} of {} slots present",
            archive.table().present_count(),
            archive.table().len()
        );
        *state = Some(Arc::new(archive));
        Ok(())
    }

    /// Texture for `id`, or `None` if there is none or it could not be
    /// decoded.
    ///
    /// Failures are logged and only affect `id`. Use
    /// [`LightsLoader::try_get`] to receive them.
    pub fn get(&self, id: u32) -> Option<Arc<LightTexture>> {
        match self.try_get(id) {
            Ok(texture) => texture,
            Err(LightError::NotReady) => {
                trace!("Light {} requested before the archive was loaded", id);
                None
            }
            Err(e) => {
                if self.config.strict {
                    error!("Failed to load light {}: {}", id, e);
                } else {
                    warn!("Failed to load light {}: {}", id, e);
                }
                None
            }
        }
    }

    /// Texture for `id`, surfacing decode failures.
    ///
    /// Returns [`LightError::NotReady`] until [`LightsLoader::load`] has
    /// completed.
    pub fn try_get(&self, id: u32) -> Result<Option<Arc<LightTexture>>> {
        let archive = self.archive().ok_or(LightError::NotReady)?;
        archive.get(id)
    }

    /// Release the archive, cache and entry table.
    ///
    /// Safe to call at any time. A load still in progress is discarded.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        let previous = self.state.write().take();

        match previous {
            Some(archive) => {
                archive.release();
                info!("Released light archive");
            }
            None => debug!("Reset on unloaded light archive"),
        }
    }

    /// Whether a load has completed since the last reset
    pub fn is_loaded(&self) -> bool {
        self.state.read().is_some()
    }

    /// The loaded archive, if any
    pub fn archive(&self) -> Option<Arc<LoadedArchive>> {
        self.state.read().clone()
    }

    /// Loader configuration
    pub fn config(&self) -> &LightsConfig {
        &self.config
    }
}

impl Drop for LightsLoader {
    fn drop(&mut self) {
        if let Some(archive) = self.state.get_mut().take() {
            archive.release();
        }
    }
}
