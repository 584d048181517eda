use crate::config::PoolConfig;
use crate::entry::{read_entry, write_entry};
use crate::error::{InvalidKey, PoolError};
use crate::index::Index;
use crate::item::Item;
use crate::key::{entry_file_name, validate_key, INDEX_FILE_NAME};
use crate::stats::{PoolCounters, PoolStats};
use crate::util::remove_file;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Whether a write rewrites the index file right away or leaves that to the caller, which
/// flushes once after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flush {
    Immediate,
    Batched,
}

#[derive(Debug, Default)]
struct PoolState {
    index: Index,
    /// Items handed to [`Pool::save_deferred`] and not yet committed.
    deferred: IndexMap<String, Item>,
}

/// A persistent cache pool backed by one file per entry plus the `CACHE.DIC` index file.
///
/// Every operation runs to completion on the calling thread. The index, the deferred queue and
/// the directory contents are guarded by a single lock per pool, so a `Pool` can be shared
/// across threads. Separate processes must not use the same directory concurrently.
///
/// Operational failures (I/O, encoding) are logged and reported as `false`; only an invalid key
/// is reported as an error.
#[derive(Debug)]
pub struct Pool {
    directory: PathBuf,
    index_path: PathBuf,
    state: Mutex<PoolState>,
    counters: PoolCounters,
}

impl Pool {
    /// Opens the pool stored in `directory`.
    ///
    /// A missing directory, a missing index file, or an index that fails to decode all start
    /// an empty pool. The directory is created by the first write.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        let directory = directory.as_ref();
        let directory =
            std::path::absolute(directory).unwrap_or_else(|_| directory.to_path_buf());
        let index_path = directory.join(INDEX_FILE_NAME);
        let index = Index::load(&directory, &index_path);

        tracing::debug!(
            target: "nova.pool",
            directory = %directory.display(),
            entries = index.len(),
            "opened pool"
        );

        Self {
            directory,
            index_path,
            state: Mutex::new(PoolState {
                index,
                deferred: IndexMap::new(),
            }),
            counters: PoolCounters::default(),
        }
    }

    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        Ok(Self::new(config.directory()?))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Returns the item stored under `key`.
    ///
    /// A miss is not an error: the returned item has no value and `is_hit() == false`. A miss
    /// also writes that placeholder through the regular save path, which repairs index entries
    /// whose files are missing or corrupt.
    pub fn get_item(&self, key: &str) -> Result<Item, InvalidKey> {
        validate_key(key)?;
        let mut state = self.lock();
        Ok(self.get_locked(&mut state, key, Flush::Immediate))
    }

    /// Looks up every key, rewriting the index file once for the whole batch.
    ///
    /// The result preserves the order of `keys`; a repeated key yields a single entry.
    pub fn get_items<I, K>(&self, keys: I) -> Result<IndexMap<String, Item>, InvalidKey>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = validate_keys(keys)?;
        let mut items = IndexMap::with_capacity(keys.len());
        if keys.is_empty() {
            return Ok(items);
        }

        let mut state = self.lock();
        for key in keys {
            if items.contains_key(&key) {
                continue;
            }
            let item = self.get_locked(&mut state, &key, Flush::Batched);
            items.insert(key, item);
        }
        if let Err(err) = self.persist_index(&state.index) {
            tracing::debug!(
                target: "nova.pool",
                path = %self.index_path.display(),
                error = %err,
                "failed to write index after batch lookup"
            );
        }
        Ok(items)
    }

    /// Whether `key` is indexed and its entry file exists. The entry's contents are not
    /// checked; use [`Item::is_hit`] on [`Pool::get_item`] for that.
    pub fn has_item(&self, key: &str) -> Result<bool, InvalidKey> {
        validate_key(key)?;
        let state = self.lock();
        Ok(state.index.get(key).is_some_and(|path| path.exists()))
    }

    /// Writes `item` and rewrites the index file.
    ///
    /// A deferred write queued for the same key is discarded, so a later commit cannot
    /// overwrite this value.
    pub fn save(&self, item: &Item) -> bool {
        let mut state = self.lock();
        state.deferred.shift_remove(item.key());
        self.save_locked(&mut state, item, Flush::Immediate)
    }

    /// Queues `item` to be written by the next [`Pool::commit`]. A later deferred save of the
    /// same key replaces the queued item.
    ///
    /// Queued items are not visible to reads until committed.
    pub fn save_deferred(&self, item: &Item) -> bool {
        let mut state = self.lock();
        state.deferred.insert(item.key().to_string(), item.clone());
        true
    }

    /// Writes every queued item and rewrites the index file once.
    ///
    /// Items that fail to write stay queued and the call returns `false`.
    pub fn commit(&self) -> bool {
        let mut state = self.lock();
        self.commit_locked(&mut state)
    }

    /// Removes the entry for `key`. Deleting an unknown key succeeds without touching disk.
    pub fn delete_item(&self, key: &str) -> Result<bool, InvalidKey> {
        validate_key(key)?;
        let mut state = self.lock();
        state.deferred.shift_remove(key);
        if !state.index.contains(key) {
            return Ok(true);
        }

        if let Err(err) = self.remove_entry(&mut state, key) {
            tracing::debug!(target: "nova.pool", key, error = %err, "failed to delete entry");
            return Ok(false);
        }
        Ok(self.persist_index_logged(&state.index))
    }

    /// Removes the entries for all `keys` and rewrites the index file once.
    ///
    /// Keys missing from the index make the call return `false`, but the remaining keys are
    /// still deleted. Nothing is rolled back.
    pub fn delete_items<I, K>(&self, keys: I) -> Result<bool, InvalidKey>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys = validate_keys(keys)?;
        if keys.is_empty() {
            return Ok(true);
        }

        let mut state = self.lock();
        let mut ok = true;
        for key in &keys {
            state.deferred.shift_remove(key.as_str());
            if !state.index.contains(key) {
                tracing::debug!(target: "nova.pool", key = %key, "key is not in the index");
                ok = false;
                continue;
            }
            if let Err(err) = self.remove_entry(&mut state, key) {
                tracing::debug!(
                    target: "nova.pool",
                    key = %key,
                    error = %err,
                    "failed to delete entry"
                );
                ok = false;
            }
        }

        Ok(self.persist_index_logged(&state.index) && ok)
    }

    /// Removes every indexed entry file, the index file, and any queued deferred writes.
    ///
    /// On failure the files already removed stay removed and the index keeps only the entries
    /// that were not reached.
    pub fn clear(&self) -> bool {
        let mut state = self.lock();
        state.deferred.clear();

        let keys: Vec<String> = state.index.keys().map(str::to_string).collect();
        for key in &keys {
            if let Err(err) = self.remove_entry(&mut state, key) {
                tracing::debug!(
                    target: "nova.pool",
                    key = %key,
                    error = %err,
                    "failed to remove entry while clearing pool"
                );
                self.persist_index_logged(&state.index);
                return false;
            }
        }

        state.index.clear();
        match remove_file(&self.index_path) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(
                    target: "nova.pool",
                    path = %self.index_path.display(),
                    error = %err,
                    "failed to remove index file"
                );
                false
            }
        }
    }

    /// Keys currently present in the index, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().index.keys().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of deferred items waiting for [`Pool::commit`].
    pub fn pending(&self) -> usize {
        self.lock().deferred.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.counters.snapshot()
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.directory.join(entry_file_name(key))
    }

    fn get_locked(&self, state: &mut PoolState, key: &str, flush: Flush) -> Item {
        if let Some(path) = state.index.get(key) {
            if let Some(item) = read_entry(&path, key).filter(Item::is_hit) {
                self.counters.hit();
                return item;
            }
        }

        self.counters.miss();
        let item = Item::placeholder(key.to_string());
        if !self.save_locked(state, &item, flush) {
            tracing::debug!(target: "nova.pool", key, "failed to persist miss placeholder");
        }
        item
    }

    fn save_locked(&self, state: &mut PoolState, item: &Item, flush: Flush) -> bool {
        match self.write_locked(state, item, flush) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(
                    target: "nova.pool",
                    key = item.key(),
                    error = %err,
                    "failed to save item"
                );
                false
            }
        }
    }

    fn write_locked(
        &self,
        state: &mut PoolState,
        item: &Item,
        flush: Flush,
    ) -> Result<(), PoolError> {
        let path = self.entry_path(item.key());
        write_entry(&path, item)?;
        state.index.insert(item.key(), &path);
        self.counters.entry_write();
        if flush == Flush::Immediate {
            self.persist_index(&state.index)?;
        }
        Ok(())
    }

    fn commit_locked(&self, state: &mut PoolState) -> bool {
        if state.deferred.is_empty() {
            return true;
        }

        let pending = std::mem::take(&mut state.deferred);
        let mut ok = true;
        for (key, item) in pending {
            if let Err(err) = self.write_locked(state, &item, Flush::Batched) {
                tracing::debug!(
                    target: "nova.pool",
                    key = %key,
                    error = %err,
                    "failed to commit deferred item"
                );
                state.deferred.insert(key, item);
                ok = false;
            }
        }

        self.persist_index_logged(&state.index) && ok
    }

    /// Removes the entry file for an indexed key, then the key itself.
    fn remove_entry(&self, state: &mut PoolState, key: &str) -> std::io::Result<()> {
        if let Some(path) = state.index.get(key) {
            remove_file(&path)?;
            self.counters.delete();
        }
        state.index.remove(key);
        Ok(())
    }

    fn persist_index(&self, index: &Index) -> Result<(), PoolError> {
        if index.persist(&self.directory, &self.index_path)? {
            self.counters.index_write();
        }
        Ok(())
    }

    fn persist_index_logged(&self, index: &Index) -> bool {
        match self.persist_index(index) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(
                    target: "nova.pool",
                    path = %self.index_path.display(),
                    error = %err,
                    "failed to write index"
                );
                false
            }
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        let mut state = self.lock();
        if state.deferred.is_empty() {
            return;
        }
        let pending = state.deferred.len();
        if !self.commit_locked(&mut state) {
            tracing::debug!(
                target: "nova.pool",
                directory = %self.directory.display(),
                pending,
                "failed to commit deferred items on drop"
            );
        }
    }
}

fn validate_keys<I, K>(keys: I) -> Result<Vec<String>, InvalidKey>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    keys.into_iter()
        .map(|key| {
            let key = key.as_ref();
            validate_key(key)?;
            Ok(key.to_string())
        })
        .collect()
}
