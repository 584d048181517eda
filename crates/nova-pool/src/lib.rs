//! Persistent, file-backed cache pool.
//!
//! A [`Pool`] maps string keys to opaque byte payloads and keeps them across process restarts.
//! Reads never fail for a missing key: they return an [`Item`] whose `is_hit()` is `false`.
//!
//! ## On-disk layout
//!
//! A pool directory contains:
//! - `CACHE.DIC`: the index, a versioned `bincode` record mapping every key to the absolute
//!   path of its entry file. It is rewritten as a whole on every persisted change.
//! - `<key>.item`: one versioned `bincode` entry record per key (key, value, hit flag,
//!   optional expiry).
//!
//! Both files are written atomically (temp file + fsync + rename). Corrupt, oversize, or
//! foreign files are treated as absent; the next write replaces them.
//!
//! ## Errors
//!
//! Keys are validated up front and rejected with [`InvalidKey`]. Everything else that can go
//! wrong on disk is logged on the `nova.pool` tracing target and reported as `false`.

mod config;
mod entry;
mod error;
mod index;
mod item;
mod key;
mod pool;
mod stats;
mod util;

pub use config::{default_pool_dir, PoolConfig, POOL_DIR_ENV};
pub use entry::ENTRY_SCHEMA_VERSION;
pub use error::{InvalidKey, InvalidKeyReason, PoolError, Result};
pub use item::Item;
pub use key::{validate_key, ENTRY_FILE_SUFFIX, INDEX_FILE_NAME, MAX_KEY_LEN};
pub use pool::Pool;
pub use stats::PoolStats;
pub use util::{atomic_write, now_millis, PAYLOAD_LIMIT_BYTES};

pub use indexmap::IndexMap;
