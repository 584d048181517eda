use crate::error::{InvalidKey, PoolError};
use crate::key::validate_key;
use crate::util::{decode, encode, millis_since_epoch, now_millis};
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, SystemTime};

/// A single cache entry as handed to and returned from a [`Pool`](crate::Pool).
///
/// The value is an opaque byte payload. [`Item::set_value`] and [`Item::value`] are
/// conveniences for callers that want to store a typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    key: String,
    value: Option<Vec<u8>>,
    hit: bool,
    expires_at_millis: Option<u64>,
}

impl Item {
    /// A fresh placeholder for `key`: no value, not a hit.
    pub fn new(key: impl Into<String>) -> Result<Self, InvalidKey> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self::placeholder(key))
    }

    pub(crate) fn placeholder(key: String) -> Self {
        Self {
            key,
            value: None,
            hit: false,
            expires_at_millis: None,
        }
    }

    pub(crate) fn from_parts(
        key: String,
        value: Option<Vec<u8>>,
        hit: bool,
        expires_at_millis: Option<u64>,
    ) -> Self {
        Self {
            key,
            value,
            hit,
            expires_at_millis,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    pub fn set(&mut self, value: impl Into<Vec<u8>>) -> &mut Self {
        self.value = Some(value.into());
        self
    }

    pub fn set_value<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, PoolError> {
        self.value = Some(encode(value)?);
        Ok(self)
    }

    /// Decodes a value stored with [`Item::set_value`]. Returns `None` when the item holds no
    /// value or the payload does not decode as `T`.
    pub fn value<T: DeserializeOwned>(&self) -> Option<T> {
        decode(self.value.as_deref()?).ok()
    }

    /// Whether this item was loaded from a valid, previously saved entry that has not expired.
    pub fn is_hit(&self) -> bool {
        self.hit && !self.is_expired_at(now_millis())
    }

    pub fn expires_at(&mut self, when: Option<SystemTime>) -> &mut Self {
        self.expires_at_millis = when.map(millis_since_epoch);
        self
    }

    pub fn expires_after(&mut self, ttl: Option<Duration>) -> &mut Self {
        self.expires_at_millis = ttl.map(|ttl| {
            let ttl = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            now_millis().saturating_add(ttl)
        });
        self
    }

    pub fn expiration_millis(&self) -> Option<u64> {
        self.expires_at_millis
    }

    pub(crate) fn is_expired_at(&self, now_millis: u64) -> bool {
        self.expires_at_millis
            .is_some_and(|expires_at| expires_at <= now_millis)
    }

    /// Hit flag written to the entry file: only items carrying a value are real entries.
    pub(crate) fn persisted_hit(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn value_bytes(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        visits: u32,
    }

    #[test]
    fn new_items_are_empty_misses() {
        let item = Item::new("session.1").unwrap();
        assert_eq!(item.key(), "session.1");
        assert!(item.get().is_none());
        assert!(!item.is_hit());
        assert!(Item::new("a/b").is_err());
    }

    #[test]
    fn typed_values_roundtrip_through_bytes() {
        let mut item = Item::new("session.1").unwrap();
        let session = Session {
            user: "ada".to_string(),
            visits: 3,
        };
        item.set_value(&session).unwrap();

        assert!(item.get().is_some());
        assert_eq!(item.value::<Session>(), Some(session));
    }

    #[test]
    fn expiry_turns_hits_into_misses() {
        let mut item = Item::from_parts("k".to_string(), Some(b"v".to_vec()), true, None);
        assert!(item.is_hit());

        item.expires_after(Some(Duration::from_secs(3600)));
        assert!(item.is_hit());

        item.expires_at(Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1)));
        assert!(!item.is_hit());

        item.expires_at(None);
        assert!(item.is_hit());
    }
}
