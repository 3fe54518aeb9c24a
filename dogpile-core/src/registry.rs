use crate::{Cache, CacheError, Codec, MemoryCache, Options, Result, MEMORY};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor for a cache backend.
pub type Factory = Arc<dyn Fn(Options) -> Result<Arc<dyn Cache>> + Send + Sync>;

/// Maps backend names to the factories that build them.
///
/// A process-wide registry is available through [`BackendRegistry::global`]
/// (and the free functions [`register`] and [`new_cache`]); separate
/// instances can be created for injection into tests or subsystems.
///
/// # Thread Safety
///
/// Lookups and registrations are synchronized with a `parking_lot::RwLock`.
/// Registering the same name twice keeps the last factory; when registrations
/// race, which one wins is unspecified.
///
/// # Examples
///
/// ```
/// use dogpile_core::{BackendRegistry, CacheExt, MemoryCache, Options};
///
/// let registry = BackendRegistry::new();
/// registry.register("local", MemoryCache::factory);
///
/// let cache = registry.build("local", Options::new().with_prefix("app:")).unwrap();
/// cache.save("k", "v", None).unwrap();
///
/// assert!(registry.build("etcd", Options::new()).is_err());
/// ```
pub struct BackendRegistry {
    factories: RwLock<HashMap<String, Factory>>,
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry with the built-in backends ([`MEMORY`]) registered.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(MEMORY, MemoryCache::factory);
        registry
    }

    /// The process-wide registry, seeded with the built-in backends.
    pub fn global() -> &'static BackendRegistry {
        static INSTANCE: Lazy<BackendRegistry> = Lazy::new(BackendRegistry::with_builtin);
        &INSTANCE
    }

    /// Registers `factory` under `name`, replacing any previous factory.
    pub fn register<F>(&self, name: &str, factory: F)
    where
        F: Fn(Options) -> Result<Arc<dyn Cache>> + Send + Sync + 'static,
    {
        let previous = self
            .factories
            .write()
            .insert(name.to_string(), Arc::new(factory));

        if previous.is_some() {
            tracing::debug!(backend = name, "replaced cache backend factory");
        } else {
            tracing::debug!(backend = name, "registered cache backend factory");
        }
    }

    /// Builds a cache with the factory registered under `name`.
    ///
    /// The codec in `options` is always replaced by [`Codec::default()`]:
    /// only one codec is used per process.
    pub fn build(&self, name: &str, options: Options) -> Result<Arc<dyn Cache>> {
        let options = options.with_codec(Codec::default());

        // clone the factory so that it runs without the registry lock held
        let factory = self
            .factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::UnsupportedBackend(name.to_string()))?;

        factory(options)
    }

    /// Whether a factory is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Names of all registered backends, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers a backend factory in the process-wide registry.
pub fn register<F>(name: &str, factory: F)
where
    F: Fn(Options) -> Result<Arc<dyn Cache>> + Send + Sync + 'static,
{
    BackendRegistry::global().register(name, factory);
}

/// Builds a cache from the process-wide registry.
///
/// ```
/// use dogpile_core::{new_cache, Cache, Options, MEMORY};
///
/// let cache = new_cache(MEMORY, Options::new()).unwrap();
/// assert!(cache.ping().is_ok());
/// ```
pub fn new_cache(name: &str, options: Options) -> Result<Arc<dyn Cache>> {
    BackendRegistry::global().build(name, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_unknown_backend() {
        let registry = BackendRegistry::new();
        match registry.build("redis", Options::new()) {
            Err(CacheError::UnsupportedBackend(name)) => assert_eq!(name, "redis"),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("empty registry built a cache"),
        }
    }

    #[test]
    fn test_builtin_memory_backend() {
        let registry = BackendRegistry::with_builtin();
        assert!(registry.contains(MEMORY));
        assert!(registry.build(MEMORY, Options::new()).is_ok());
        assert!(!BackendRegistry::new().contains(MEMORY));
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = BackendRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        registry.register("custom", move |opts| {
            first.lock().push("first");
            MemoryCache::factory(opts)
        });
        let second = Arc::clone(&seen);
        registry.register("custom", move |opts| {
            second.lock().push("second");
            MemoryCache::factory(opts)
        });

        registry.build("custom", Options::new()).unwrap();
        assert_eq!(*seen.lock(), vec!["second"]);
        assert_eq!(registry.names(), vec!["custom".to_string()]);
    }

    #[test]
    fn test_factory_receives_options_with_default_codec() {
        let registry = BackendRegistry::new();
        let received = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&received);
        registry.register("spy", move |opts: Options| {
            *slot.lock() = Some(opts.clone());
            MemoryCache::factory(opts)
        });

        registry
            .build("spy", Options::new().with_address("mem://x").with_prefix("p:"))
            .unwrap();

        let opts = received.lock().clone().unwrap();
        assert_eq!(opts.address, "mem://x");
        assert_eq!(opts.prefix, "p:");
        assert_eq!(opts.codec, Codec::default());
    }

    #[test]
    fn test_factory_error_is_returned() {
        let registry = BackendRegistry::new();
        registry.register("broken", |_| Err(CacheError::backend("bad address")));

        let err = registry.build("broken", Options::new()).err().unwrap();
        assert!(matches!(err, CacheError::Backend { .. }));
    }

    #[test]
    fn test_global_has_memory() {
        assert!(BackendRegistry::global().contains(MEMORY));
        assert!(new_cache(MEMORY, Options::new()).is_ok());
    }
}
