use crate::Codec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a [`Cache`](crate::Cache) instance is constructed.
///
/// Options are assembled by applying setters in order, each of which touches
/// exactly one field; the last setter for a field wins.
///
/// # Examples
///
/// ```
/// use dogpile_core::Options;
/// use std::time::Duration;
///
/// let opts = Options::new()
///     .with_address("redis://localhost:6379/0")
///     .with_prefix("cache:")
///     .with_expiration(Duration::from_secs(300));
///
/// assert_eq!(opts.key("user:1"), "cache:user:1");
/// assert_eq!(opts.logical_key("cache:user:1"), Some("user:1"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Network address of the backend. Ignored by the in-memory backend.
    pub address: String,
    /// Prepended to every logical key before it reaches the store.
    pub prefix: String,
    /// Expiration used when a save doesn't specify one. Zero means entries
    /// don't expire unless the backend decides otherwise.
    pub expiration: Duration,
    /// Value codec. The registry always replaces it with [`Codec::default()`].
    pub codec: Codec,
}

impl Options {
    /// No address, no prefix, no default expiration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Sets the key prefix.
    ///
    /// ```
    /// use dogpile_core::Options;
    ///
    /// let opts = Options::new().with_prefix("a:").with_prefix("b:");
    /// assert_eq!(opts.key("k"), "b:k");
    /// ```
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the default expiration; zero keeps entries until deleted.
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Sets the codec.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Maps a logical key to the key stored in the backend.
    pub fn key(&self, key: &str) -> String {
        let mut full = String::with_capacity(self.prefix.len() + key.len());
        full.push_str(&self.prefix);
        full.push_str(key);
        full
    }

    /// Inverse of [`key`](Self::key). `None` for keys outside this prefix.
    pub fn logical_key<'a>(&self, stored: &'a str) -> Option<&'a str> {
        stored.strip_prefix(self.prefix.as_str())
    }

    /// The expiration to apply for a save, falling back to the default.
    ///
    /// Returns `None` when neither is set, meaning "never expires".
    pub fn effective_expiration(&self, requested: Option<Duration>) -> Option<Duration> {
        match requested {
            Some(expiration) if !expiration.is_zero() => Some(expiration),
            _ if !self.expiration.is_zero() => Some(self.expiration),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_apply_in_order() {
        let opts = Options::new()
            .with_prefix("a:")
            .with_address("memory://")
            .with_prefix("b:");

        assert_eq!(opts.prefix, "b:");
        assert_eq!(opts.address, "memory://");
        assert_eq!(opts.expiration, Duration::ZERO);
    }

    #[test]
    fn test_key_mapping_without_prefix() {
        let opts = Options::new();
        assert_eq!(opts.key("k"), "k");
        assert_eq!(opts.logical_key("k"), Some("k"));
    }

    #[test]
    fn test_logical_key_outside_prefix() {
        let opts = Options::new().with_prefix("cache:");
        assert_eq!(opts.logical_key("other:k"), None);
    }

    #[test]
    fn test_effective_expiration() {
        let never = Options::new();
        assert_eq!(never.effective_expiration(None), None);
        assert_eq!(never.effective_expiration(Some(Duration::ZERO)), None);
        assert_eq!(
            never.effective_expiration(Some(Duration::from_secs(5))),
            Some(Duration::from_secs(5))
        );

        let default_ttl = Options::new().with_expiration(Duration::from_secs(60));
        assert_eq!(
            default_ttl.effective_expiration(None),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            default_ttl.effective_expiration(Some(Duration::ZERO)),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            default_ttl.effective_expiration(Some(Duration::from_secs(1))),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let opts: Options = serde_json::from_str(r#"{"prefix": "svc:"}"#).unwrap();
        assert_eq!(opts.prefix, "svc:");
        assert_eq!(opts.codec, Codec::Json);
        assert!(opts.address.is_empty());
    }
}
