use crate::{Cache, CacheEntry, CacheError, Codec, Options, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Registry name of the in-memory backend.
pub const MEMORY: &str = "memory";

/// In-process cache backend.
///
/// Stores encoded values in a [`DashMap`], so readers and writers on
/// different keys rarely contend. Expired entries are dropped lazily when they
/// are read, or all at once through [`purge_expired`](Self::purge_expired).
///
/// The configured address is ignored and [`ping`](Cache::ping) always succeeds.
///
/// # Examples
///
/// ```
/// use dogpile_core::{Cache, CacheExt, MemoryCache, Options};
///
/// let cache = MemoryCache::new(Options::new().with_prefix("app:"));
/// cache.save("user:1", "ada", None).unwrap();
///
/// assert!(cache.contain("user:1"));
/// assert_eq!(cache.keys(&["user:"]).unwrap(), vec!["user:1".to_string()]);
/// ```
#[derive(Debug)]
pub struct MemoryCache {
    options: Options,
    store: DashMap<String, CacheEntry<Vec<u8>>>,
}

impl MemoryCache {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            store: DashMap::new(),
        }
    }

    /// Factory registered under [`MEMORY`].
    pub fn factory(options: Options) -> Result<Arc<dyn Cache>> {
        Ok(Arc::new(Self::new(options)))
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.store.len())
    }

    fn remove_if_expired(&self, full_key: &str) {
        self.store.remove_if(full_key, |_, entry| entry.is_expired());
    }
}

impl Cache for MemoryCache {
    fn contain(&self, key: &str) -> bool {
        let full_key = self.options.key(key);
        let expired = match self.store.get(&full_key) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };

        if expired {
            self.remove_if_expired(&full_key);
        }
        !expired
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.store.remove(&self.options.key(key));
        Ok(())
    }

    fn fetch_bytes(&self, key: &str) -> Result<Vec<u8>> {
        let full_key = self.options.key(key);
        if let Some(entry) = self.store.get(&full_key) {
            if !entry.is_expired() {
                return Ok(entry.value.clone());
            }
            // the shard read lock must be released before removing
            drop(entry);
            self.remove_if_expired(&full_key);
        }

        Err(CacheError::not_found(key))
    }

    fn save_bytes(&self, key: &str, value: Vec<u8>, expiration: Option<Duration>) -> Result<()> {
        let expiration = self.options.effective_expiration(expiration);
        self.store
            .insert(self.options.key(key), CacheEntry::new(value, expiration));
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn keys(&self, prefixes: &[&str]) -> Result<Vec<String>> {
        let keys = self
            .store
            .iter()
            .filter(|entry| !entry.value().is_expired())
            .filter_map(|entry| self.options.logical_key(entry.key()).map(str::to_string))
            .filter(|key| prefixes.is_empty() || prefixes.iter().any(|p| key.starts_with(p)))
            .collect();
        Ok(keys)
    }

    fn codec(&self) -> Codec {
        self.options.codec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheExt;
    use serde::{Deserialize, Serialize};
    use std::thread;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        roles: Vec<String>,
    }

    #[test]
    fn test_save_then_fetch() {
        let cache = MemoryCache::new(Options::new());
        let session = Session {
            user: "ada".into(),
            roles: vec!["admin".into()],
        };

        cache.save("session:1", &session, None).unwrap();
        assert_eq!(cache.fetch::<Session>("session:1").unwrap(), session);
    }

    #[test]
    fn test_fetch_missing_is_not_found() {
        let cache = MemoryCache::new(Options::new());
        let err = cache.fetch::<String>("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_fetch_after_delete_is_not_found() {
        let cache = MemoryCache::new(Options::new());
        cache.save("k", "v", None).unwrap();
        cache.delete("k").unwrap();

        assert!(!cache.contain("k"));
        assert!(cache.fetch::<String>("k").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_absent_key_succeeds() {
        let cache = MemoryCache::new(Options::new());
        assert!(cache.delete("never-stored").is_ok());
    }

    #[test]
    fn test_prefix_is_applied_to_stored_keys() {
        let cache = MemoryCache::new(Options::new().with_prefix("cache:"));
        cache.save("k", &1, None).unwrap();

        assert!(cache.store.contains_key("cache:k"));
        assert!(!cache.store.contains_key("k"));
        assert_eq!(cache.keys(&[]).unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_keys_filters_by_any_prefix() {
        let cache = MemoryCache::new(Options::new());
        for key in ["user:1", "user:2", "order:1", "cart:9"] {
            cache.save(key, &0, None).unwrap();
        }

        let mut keys = cache.keys(&["user:", "order:"]).unwrap();
        keys.sort();
        assert_eq!(keys, vec!["order:1", "user:1", "user:2"]);

        assert_eq!(cache.keys(&[]).unwrap().len(), 4);
        assert!(cache.keys(&["nothing:"]).unwrap().is_empty());
    }

    #[test]
    fn test_save_expiration_overrides_default() {
        let cache =
            MemoryCache::new(Options::new().with_expiration(Duration::from_secs(3600)));
        cache
            .save("short", "v", Some(Duration::from_millis(30)))
            .unwrap();
        cache.save("long", "v", None).unwrap();

        thread::sleep(Duration::from_millis(60));

        assert!(!cache.contain("short"));
        assert!(cache.fetch::<String>("short").unwrap_err().is_not_found());
        assert!(cache.contain("long"));
    }

    #[test]
    fn test_default_expiration_applies() {
        let cache = MemoryCache::new(Options::new().with_expiration(Duration::from_millis(30)));
        cache.save("k", "v", None).unwrap();
        assert!(cache.contain("k"));

        thread::sleep(Duration::from_millis(60));
        assert!(!cache.contain("k"));
        assert!(cache.keys(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = MemoryCache::new(Options::new());
        cache
            .save("a", "v", Some(Duration::from_millis(10)))
            .unwrap();
        cache
            .save("b", "v", Some(Duration::from_millis(10)))
            .unwrap();
        cache.save("c", "v", None).unwrap();

        thread::sleep(Duration::from_millis(30));

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let cache = MemoryCache::new(Options::new());
        cache.save("k", &1, None).unwrap();
        cache.save("k", &2, None).unwrap();
        assert_eq!(cache.fetch::<i32>("k").unwrap(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_decode_error_is_not_not_found() {
        let cache = MemoryCache::new(Options::new());
        cache.save("k", "text", None).unwrap();

        let err = cache.fetch::<u64>("k").unwrap_err();
        assert!(matches!(err, CacheError::Codec(_)));
    }

    #[test]
    fn test_ping_and_factory() {
        let cache = MemoryCache::factory(Options::new()).unwrap();
        assert!(cache.ping().is_ok());
        cache.save("k", "v", None).unwrap();
        assert_eq!(cache.fetch::<String>("k").unwrap(), "v");
    }
}
