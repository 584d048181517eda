use crate::error::{InvalidKey, InvalidKeyReason};

/// File name of the persisted key -> entry path mapping.
pub const INDEX_FILE_NAME: &str = "CACHE.DIC";

/// Suffix appended to a key to form its entry file name.
pub const ENTRY_FILE_SUFFIX: &str = ".item";

/// Longest key accepted, in bytes. Leaves room for the entry suffix and the atomic-write
/// temp suffix under the common 255 byte file name limit.
pub const MAX_KEY_LEN: usize = 200;

const RESERVED_CHARACTERS: &[char] = &['{', '}', '(', ')', '/', '\\', '@', ':'];

pub fn validate_key(key: &str) -> Result<(), InvalidKey> {
    let reject = |reason| {
        Err(InvalidKey {
            key: key.to_string(),
            reason,
        })
    };

    if key.is_empty() {
        return reject(InvalidKeyReason::Empty);
    }
    if key.len() > MAX_KEY_LEN {
        return reject(InvalidKeyReason::TooLong { max: MAX_KEY_LEN });
    }
    if let Some(ch) = key.chars().find(|ch| RESERVED_CHARACTERS.contains(ch)) {
        return reject(InvalidKeyReason::ReservedCharacter(ch));
    }
    if key.chars().any(|ch| ch.is_control()) {
        return reject(InvalidKeyReason::ControlCharacter);
    }
    if key == "." || key.contains("..") {
        return reject(InvalidKeyReason::PathTraversal);
    }
    if key.eq_ignore_ascii_case(INDEX_FILE_NAME) {
        return reject(InvalidKeyReason::ReservedName);
    }

    Ok(())
}

/// Entry file name for an already validated key.
pub(crate) fn entry_file_name(key: &str) -> String {
    format!("{key}{ENTRY_FILE_SUFFIX}")
}
