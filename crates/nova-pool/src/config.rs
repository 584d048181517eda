use crate::error::PoolError;
use std::path::PathBuf;

/// Environment variable that overrides the pool directory.
pub const POOL_DIR_ENV: &str = "NOVA_POOL_DIR";

/// Configuration for selecting the on-disk pool directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolConfig {
    /// Use this directory instead of the default `~/.nova/pool`.
    pub directory_override: Option<PathBuf>,
}

impl PoolConfig {
    pub fn from_env() -> Self {
        Self {
            directory_override: std::env::var_os(POOL_DIR_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn directory(&self) -> Result<PathBuf, PoolError> {
        match &self.directory_override {
            Some(dir) => Ok(dir.clone()),
            None => default_pool_dir(),
        }
    }
}

pub fn default_pool_dir() -> Result<PathBuf, PoolError> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or(PoolError::MissingHomeDir)?;

    Ok(home.join(".nova").join("pool"))
}
