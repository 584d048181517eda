use std::fmt;

pub type Result<T> = std::result::Result<T, PoolError>;

/// A cache key that cannot be used to address an entry file.
///
/// This is the caller-input error tier: it is returned instead of a plain `false` so callers
/// can tell a bad call apart from an operation that failed on disk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cache key {key:?}: {reason}")]
pub struct InvalidKey {
    pub key: String,
    pub reason: InvalidKeyReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidKeyReason {
    Empty,
    TooLong { max: usize },
    ReservedCharacter(char),
    ControlCharacter,
    PathTraversal,
    ReservedName,
}

impl fmt::Display for InvalidKeyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidKeyReason::Empty => f.write_str("key is empty"),
            InvalidKeyReason::TooLong { max } => write!(f, "key is longer than {max} bytes"),
            InvalidKeyReason::ReservedCharacter(ch) => {
                write!(f, "key contains reserved character {ch:?}")
            }
            InvalidKeyReason::ControlCharacter => f.write_str("key contains a control character"),
            InvalidKeyReason::PathTraversal => f.write_str("key contains a relative path segment"),
            InvalidKeyReason::ReservedName => f.write_str("key names a pool bookkeeping file"),
        }
    }
}

/// Errors produced while reading or writing pool files.
///
/// These never cross the pool's public operations; they are logged and reported as `false`.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("failed to determine home directory for default pool path")]
    MissingHomeDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("entry record is {len} bytes, over the {limit} byte limit")]
    PayloadTooLarge { len: usize, limit: usize },

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    InvalidKey(#[from] InvalidKey),
}
