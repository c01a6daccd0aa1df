use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::Result;

/// Path-keyed cache of immutable assets.
///
/// Each path is loaded at most once while it stays cached; callers share the
/// result read-only through `Arc`. Entries live until [`AssetCache::evict`]
/// or [`AssetCache::clear`] is called.
pub struct AssetCache<T> {
    inner: RwLock<FxHashMap<PathBuf, Arc<T>>>,
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AssetCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::default(),
        }
    }

    /// [Read] Returns the cached asset, if any.
    pub fn get(&self, path: &Path) -> Option<Arc<T>> {
        self.inner.read().get(path).cloned()
    }

    /// Returns the cached asset or loads, caches and returns it.
    ///
    /// The loader runs without the lock held; if two callers race, the
    /// first stored value wins and both receive it. Load errors are not
    /// cached.
    pub fn get_or_load<F>(&self, path: &Path, loader: F) -> Result<Arc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        if let Some(hit) = self.get(path) {
            return Ok(hit);
        }
        let loaded = Arc::new(loader(path)?);
        let mut guard = self.inner.write();
        Ok(guard.entry(path.to_path_buf()).or_insert(loaded).clone())
    }

    /// [Write] Inserts an already-built asset, replacing any previous entry.
    pub fn insert(&self, path: impl Into<PathBuf>, asset: T) -> Arc<T> {
        let asset = Arc::new(asset);
        self.inner.write().insert(path.into(), asset.clone());
        asset
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.inner.read().contains_key(path)
    }

    /// Drops one entry. Outstanding `Arc`s stay valid.
    pub fn evict(&self, path: &Path) -> Option<Arc<T>> {
        self.inner.write().remove(path)
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
