use crate::error::PoolError;
use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Largest index or entry file the pool will decode.
///
/// A corrupted length prefix must turn into a miss, not a huge allocation.
pub const PAYLOAD_LIMIT_BYTES: usize = 64 * 1024 * 1024;

pub fn now_millis() -> u64 {
    millis_since_epoch(SystemTime::now())
}

pub(crate) fn millis_since_epoch(time: SystemTime) -> u64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => u64::try_from(d.as_millis()).unwrap_or(u64::MAX),
        Err(err) => {
            static REPORTED: OnceLock<()> = OnceLock::new();
            if REPORTED.set(()).is_ok() {
                tracing::debug!(
                    target: "nova.pool",
                    error = %err,
                    "time is before unix epoch; clamping to 0"
                );
            }
            0
        }
    }
}

fn bincode_options() -> impl bincode::Options + Copy {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

pub(crate) fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, PoolError> {
    Ok(bincode_options().serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, PoolError> {
    Ok(bincode_options()
        .with_limit(PAYLOAD_LIMIT_BYTES as u64)
        .deserialize(bytes)?)
}

/// Reads a pool file, returning `None` when it is missing or unusable.
///
/// Symlinks, non-regular files and oversize files are removed so the next write starts clean.
pub(crate) fn read_file_limited(path: &Path) -> Option<Vec<u8>> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target: "nova.pool",
                    path = %path.display(),
                    error = %err,
                    "failed to stat pool file"
                );
            }
            return None;
        }
    };
    if meta.file_type().is_symlink() || !meta.is_file() {
        remove_file_best_effort(path, "read.not_regular_file");
        return None;
    }
    if meta.len() > PAYLOAD_LIMIT_BYTES as u64 {
        remove_file_best_effort(path, "read.oversize");
        return None;
    }

    match fs::read(path) {
        Ok(bytes) if bytes.len() > PAYLOAD_LIMIT_BYTES => {
            remove_file_best_effort(path, "read.oversize");
            None
        }
        Ok(bytes) => Some(bytes),
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target: "nova.pool",
                    path = %path.display(),
                    error = %err,
                    "failed to read pool file"
                );
            }
            None
        }
    }
}

/// Removes `path`, treating an already-missing file as success.
pub(crate) fn remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

pub(crate) fn remove_file_best_effort(path: &Path, reason: &'static str) -> bool {
    match remove_file(path) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(
                target: "nova.pool",
                path = %path.display(),
                reason,
                error = %err,
                "failed to remove pool file"
            );
            false
        }
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes `bytes` to `path` through a synced temp file in the same directory and a rename, so
/// readers observe either the previous contents or the new ones.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), PoolError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        Some(_) => Path::new("."),
        None => return Err(io::Error::other("path has no parent").into()),
    };
    fs::create_dir_all(parent)?;

    let (tmp_path, mut file) = create_tmp_file(path, parent)?;
    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    drop(file);
    if let Err(err) = written {
        remove_file_best_effort(&tmp_path, "atomic_write.write_failed");
        return Err(err.into());
    }

    if let Err(err) = rename_over(&tmp_path, path) {
        remove_file_best_effort(&tmp_path, "atomic_write.rename_failed");
        return Err(err.into());
    }

    sync_dir_best_effort(parent);
    Ok(())
}

fn rename_over(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        // Windows refuses to rename over an existing file.
        Err(err) if cfg!(windows) && to.exists() => {
            remove_file(to)?;
            fs::rename(from, to).map_err(|_| err)
        }
        other => other,
    }
}

fn sync_dir_best_effort(dir: &Path) {
    #[cfg(unix)]
    {
        static REPORTED: OnceLock<()> = OnceLock::new();
        if let Err(err) = fs::File::open(dir).and_then(|dir| dir.sync_all()) {
            if err.kind() != io::ErrorKind::NotFound && REPORTED.set(()).is_ok() {
                tracing::debug!(
                    target: "nova.pool",
                    dir = %dir.display(),
                    error = %err,
                    "failed to sync pool directory"
                );
            }
        }
    }

    #[cfg(not(unix))]
    let _ = dir;
}

fn create_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}
