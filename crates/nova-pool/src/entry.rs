use crate::error::PoolError;
use crate::item::Item;
use crate::util::{
    atomic_write, decode, encode, now_millis, read_file_limited, PAYLOAD_LIMIT_BYTES,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Version of the on-disk entry record.
pub const ENTRY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct PersistedEntry<'a> {
    schema_version: u32,
    saved_at_millis: u64,
    key: &'a str,
    hit: bool,
    expires_at_millis: Option<u64>,
    value: Option<&'a [u8]>,
}

#[derive(Debug, Deserialize)]
struct PersistedEntryOwned {
    schema_version: u32,
    #[allow(dead_code)]
    saved_at_millis: u64,
    key: String,
    hit: bool,
    expires_at_millis: Option<u64>,
    value: Option<Vec<u8>>,
}

/// Writes `item` to `path`.
///
/// Records larger than [`PAYLOAD_LIMIT_BYTES`] are refused, since [`read_entry`] would discard
/// them as corrupt.
pub(crate) fn write_entry(path: &Path, item: &Item) -> Result<(), PoolError> {
    let persisted = PersistedEntry {
        schema_version: ENTRY_SCHEMA_VERSION,
        saved_at_millis: now_millis(),
        key: item.key(),
        hit: item.persisted_hit(),
        expires_at_millis: item.expiration_millis(),
        value: item.value_bytes(),
    };
    let bytes = encode(&persisted)?;
    if bytes.len() > PAYLOAD_LIMIT_BYTES {
        return Err(PoolError::PayloadTooLarge {
            len: bytes.len(),
            limit: PAYLOAD_LIMIT_BYTES,
        });
    }
    atomic_write(path, &bytes)
}

/// Loads the entry stored at `path` for `key`.
///
/// Returns `None` when the file is missing, does not decode, was written by another schema
/// version, or belongs to a different key.
pub(crate) fn read_entry(path: &Path, key: &str) -> Option<Item> {
    let bytes = read_file_limited(path)?;
    let persisted: PersistedEntryOwned = match decode(&bytes) {
        Ok(persisted) => persisted,
        Err(err) => {
            tracing::debug!(
                target: "nova.pool",
                key,
                path = %path.display(),
                error = %err,
                "failed to decode entry file"
            );
            return None;
        }
    };

    if persisted.schema_version != ENTRY_SCHEMA_VERSION {
        tracing::debug!(
            target: "nova.pool",
            key,
            path = %path.display(),
            found = persisted.schema_version,
            "entry schema version mismatch"
        );
        return None;
    }
    if persisted.key != key {
        tracing::debug!(
            target: "nova.pool",
            key,
            path = %path.display(),
            "entry file belongs to another key"
        );
        return None;
    }

    Some(Item::from_parts(
        persisted.key,
        persisted.value,
        persisted.hit,
        persisted.expires_at_millis,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_roundtrip_with_hit_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.item");
        let mut item = Item::new("a").unwrap();
        item.set(b"payload".to_vec());

        write_entry(&path, &item).unwrap();
        let loaded = read_entry(&path, "a").unwrap();
        assert_eq!(loaded.get(), Some(b"payload".as_slice()));
        assert!(loaded.is_hit());
    }

    #[test]
    fn placeholders_read_back_as_misses() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.item");
        write_entry(&path, &Item::new("a").unwrap()).unwrap();

        let loaded = read_entry(&path, "a").unwrap();
        assert!(!loaded.is_hit());
        assert!(loaded.get().is_none());
    }

    #[test]
    fn foreign_or_corrupt_entries_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.item");
        let mut item = Item::new("b").unwrap();
        item.set(b"v".to_vec());
        write_entry(&path, &item).unwrap();
        assert!(read_entry(&path, "a").is_none());

        std::fs::write(&path, b"not bincode").unwrap();
        assert!(read_entry(&path, "a").is_none());
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a.item");
        let persisted = PersistedEntry {
            schema_version: ENTRY_SCHEMA_VERSION + 1,
            saved_at_millis: 0,
            key: "a",
            hit: true,
            expires_at_millis: None,
            value: Some(b"v".as_slice()),
        };
        std::fs::write(&path, encode(&persisted).unwrap()).unwrap();

        assert!(read_entry(&path, "a").is_none());
    }

    #[test]
    fn oversize_records_are_refused_without_touching_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("big.item");
        let mut item = Item::new("big").unwrap();
        item.set(vec![7u8; PAYLOAD_LIMIT_BYTES]);

        let err = write_entry(&path, &item).unwrap_err();
        assert!(matches!(err, PoolError::PayloadTooLarge { .. }));
        assert!(!path.exists());
    }
}
