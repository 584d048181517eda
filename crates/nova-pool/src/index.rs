use crate::error::PoolError;
use crate::util::{atomic_write, decode, encode, now_millis, read_file_limited};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const INDEX_MAGIC: [u8; 8] = *b"NOVAPOOL";
const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct IndexFile<'a> {
    magic: [u8; 8],
    format_version: u32,
    saved_at_millis: u64,
    entries: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct IndexFileOwned {
    magic: [u8; 8],
    format_version: u32,
    #[allow(dead_code)]
    saved_at_millis: u64,
    entries: BTreeMap<String, String>,
}

/// In-memory key -> entry path mapping, mirrored to the index file as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Index {
    entries: BTreeMap<String, String>,
}

impl Index {
    /// Loads the index stored at `path`. Anything unreadable yields an empty index.
    pub(crate) fn load(directory: &Path, path: &Path) -> Self {
        if !directory.is_dir() {
            return Self::default();
        }
        let Some(bytes) = read_file_limited(path) else {
            return Self::default();
        };

        match decode::<IndexFileOwned>(&bytes) {
            Ok(file) if file.magic != INDEX_MAGIC => {
                tracing::debug!(
                    target: "nova.pool",
                    path = %path.display(),
                    "index file has unexpected magic; starting empty"
                );
                Self::default()
            }
            Ok(file) if file.format_version != INDEX_FORMAT_VERSION => {
                tracing::debug!(
                    target: "nova.pool",
                    path = %path.display(),
                    found = file.format_version,
                    expected = INDEX_FORMAT_VERSION,
                    "unsupported index format version; starting empty"
                );
                Self::default()
            }
            Ok(file) => Self {
                entries: file.entries,
            },
            Err(err) => {
                tracing::debug!(
                    target: "nova.pool",
                    path = %path.display(),
                    error = %err,
                    "failed to decode index file; starting empty"
                );
                Self::default()
            }
        }
    }

    /// Rewrites the whole index file. Returns `Ok(false)` without writing when `directory`
    /// does not exist.
    pub(crate) fn persist(&self, directory: &Path, path: &Path) -> Result<bool, PoolError> {
        if directory.as_os_str().is_empty() || !directory.is_dir() {
            return Ok(false);
        }
        let file = IndexFile {
            magic: INDEX_MAGIC,
            format_version: INDEX_FORMAT_VERSION,
            saved_at_millis: now_millis(),
            entries: &self.entries,
        };
        atomic_write(path, &encode(&file)?)?;
        Ok(true)
    }

    pub(crate) fn get(&self, key: &str) -> Option<PathBuf> {
        self.entries.get(key).map(PathBuf::from)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn insert(&mut self, key: &str, path: &Path) {
        self.entries
            .insert(key.to_string(), path.to_string_lossy().into_owned());
    }

    pub(crate) fn remove(&mut self, key: &str) -> Option<PathBuf> {
        self.entries.remove(key).map(PathBuf::from)
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("CACHE.DIC");
        let mut index = Index::default();
        index.insert("a", &tmp.path().join("a.item"));
        index.insert("b", &tmp.path().join("b.item"));

        assert!(index.persist(tmp.path(), &path).unwrap());
        assert_eq!(Index::load(tmp.path(), &path), index);
    }

    #[test]
    fn missing_directory_is_a_fresh_index_and_persist_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("absent");
        let path = dir.join("CACHE.DIC");
        let mut index = Index::default();
        index.insert("a", &dir.join("a.item"));

        assert_eq!(Index::load(&dir, &path).len(), 0);
        assert!(!index.persist(&dir, &path).unwrap());
        assert!(!dir.exists());
    }

    #[test]
    fn corrupt_index_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("CACHE.DIC");
        std::fs::write(&path, b"garbage").unwrap();
        assert_eq!(Index::load(tmp.path(), &path).len(), 0);

        let file = IndexFile {
            magic: *b"NOTAPOOL",
            format_version: INDEX_FORMAT_VERSION,
            saved_at_millis: 0,
            entries: &BTreeMap::from([("a".to_string(), "/x/a.item".to_string())]),
        };
        std::fs::write(&path, encode(&file).unwrap()).unwrap();
        assert_eq!(Index::load(tmp.path(), &path).len(), 0);
    }

    #[test]
    fn future_format_version_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("CACHE.DIC");
        let file = IndexFile {
            magic: INDEX_MAGIC,
            format_version: INDEX_FORMAT_VERSION + 1,
            saved_at_millis: 0,
            entries: &BTreeMap::from([("a".to_string(), "/x/a.item".to_string())]),
        };
        std::fs::write(&path, encode(&file).unwrap()).unwrap();
        assert_eq!(Index::load(tmp.path(), &path).len(), 0);
    }
}
