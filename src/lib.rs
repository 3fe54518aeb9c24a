//! # Dogpile
//!
//! A small caching toolkit for Rust services: a pluggable cache contract,
//! a registry of named backends, and a fetch-or-save helper that stops a
//! crowd of concurrent callers from rebuilding the same missing value.
//!
//! ## Features
//!
//! - **Backend agnostic**: code talks to [`Cache`]; backends register a factory by name
//! - **Dogpile prevention**: [`fetch_or_save`] lets one caller build a missing value
//!   while the others wait and then read it from the cache
//! - **Graceful degradation**: a value that can't be saved is still returned to the caller
//! - **Resilient startup**: [`initialize`] retries the backend's health check with
//!   exponential backoff and jitter, and masks passwords in its logs
//! - **Retry engine**: the same loop is available on its own in [`retry`]
//!
//! ## Quick Start
//!
//! ```rust
//! use dogpile::{fetch_or_save, initialize, CacheError, MEMORY};
//! use std::time::Duration;
//!
//! #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
//! struct Profile {
//!     id: u64,
//!     name: String,
//! }
//!
//! fn load_profile(id: u64) -> Result<Profile, CacheError> {
//!     Ok(Profile { id, name: "Ada".to_string() })
//! }
//!
//! let cache = initialize(MEMORY, "").unwrap();
//!
//! let profile: Profile = fetch_or_save(
//!     cache.as_ref(),
//!     "profile:1",
//!     || load_profile(1),
//!     Some(Duration::from_secs(300)),
//! )
//! .unwrap();
//!
//! assert_eq!(profile.name, "Ada");
//! ```
//!
//! ## Application Errors
//!
//! Builders return the application's own error type; it only needs to be
//! constructible from [`CacheError`] so that cache faults can flow through it:
//!
//! ```rust
//! use dogpile::{fetch_or_save, Cache, CacheError, MemoryCache, Options};
//!
//! #[derive(Debug)]
//! enum AppError {
//!     Cache(CacheError),
//!     Database(String),
//! }
//!
//! impl From<CacheError> for AppError {
//!     fn from(err: CacheError) -> Self {
//!         AppError::Cache(err)
//!     }
//! }
//!
//! let cache = MemoryCache::new(Options::new());
//! let result: Result<u32, AppError> = fetch_or_save(&cache, "count", || {
//!     Err(AppError::Database("connection reset".to_string()))
//! }, None);
//!
//! // builder errors come back untouched and nothing is cached
//! assert!(matches!(result, Err(AppError::Database(_))));
//! assert!(!cache.contain("count"));
//! ```
//!
//! ## Custom Backends
//!
//! ```rust
//! use dogpile::{new_cache, register, Cache, MemoryCache, Options};
//!
//! register("local", |options: Options| MemoryCache::factory(options));
//!
//! let cache = new_cache("local", Options::new().with_prefix("svc:")).unwrap();
//! assert!(cache.ping().is_ok());
//! ```

pub use dogpile_core::*;
pub use dogpile_retry::{abort, Failure, RetryError, RetryPolicy};

/// Counters of the process-wide fetch-or-save coordinator.
///
/// # Examples
///
/// ```rust
/// use dogpile::{fetch_or_save, CacheError, MemoryCache, Options};
///
/// let cache = MemoryCache::new(Options::new());
/// let before = dogpile::stats().builds();
///
/// let _: u8 = fetch_or_save(&cache, "k", || Ok::<_, CacheError>(1), None).unwrap();
/// assert!(dogpile::stats().builds() > before);
/// ```
#[cfg(feature = "stats")]
pub fn stats() -> &'static FetchStats {
    Coordinator::global().stats()
}
