//! # Dogpile Core
//!
//! Core traits and building blocks for the Dogpile caching library.
//!
//! This crate defines the contract every cache backend fulfils, the registry
//! that turns a backend name into a live cache, and the fetch-or-save
//! coordinator that keeps concurrent callers from rebuilding the same value.
//!
//! ## Features
//!
//! - **Pluggable backends**: any type implementing [`Cache`] can be registered by name
//! - **Typed access**: [`CacheExt`] serializes values through the process codec
//! - **Stampede protection**: [`fetch_or_save()`] runs at most one builder per key at a time
//! - **Key-scoped locking**: [`KeyMutex`] locks individual string keys and forgets them on unlock
//! - **Resilient startup**: [`initialize`] waits for the backend with retries and backoff
//! - **In-memory backend**: [`MemoryCache`], registered as [`MEMORY`], with per-entry expiration
//!
//! ## Module Organization
//!
//! - [`cache`] - The backend contract and its typed extension
//! - [`registry`] - Backend name to factory mapping
//! - [`fetch_or_save`](mod@fetch_or_save) - The dogpile-safe fetch-or-save coordinator
//! - [`key_mutex`] - Per-key mutual exclusion
//! - [`bootstrap`] - Process startup with retried readiness checks
//!
//! ## Example
//!
//! ```
//! use dogpile_core::{fetch_or_save, initialize, Cache, CacheError, MEMORY};
//! use std::time::Duration;
//!
//! let cache = initialize(MEMORY, "").unwrap();
//!
//! let answer: u64 = fetch_or_save(
//!     cache.as_ref(),
//!     "answer",
//!     || Ok::<_, CacheError>(42),
//!     Some(Duration::from_secs(60)),
//! )
//! .unwrap();
//!
//! assert_eq!(answer, 42);
//! assert!(cache.contain("answer"));
//! ```
mod cache_entry;
mod codec;
mod error;
mod memory;
mod options;

pub mod bootstrap;
pub mod cache;
pub mod fetch_or_save;
pub mod key_mutex;
pub mod registry;

#[cfg(feature = "stats")]
mod stats;

pub use bootstrap::{
    initialize, initialize_with, redact_address, BootstrapConfig, DEFAULT_KEY_PREFIX,
};
pub use cache::{Cache, CacheExt};
pub use cache_entry::CacheEntry;
pub use codec::{Codec, CodecError};
pub use error::{CacheError, InitError, Result};
pub use fetch_or_save::{fetch_or_save, Coordinator, FetchOptions};
pub use key_mutex::{KeyMutex, KeyMutexGuard};
pub use memory::{MemoryCache, MEMORY};
pub use options::Options;
pub use registry::{new_cache, register, BackendRegistry, Factory};

#[cfg(feature = "stats")]
pub use stats::FetchStats;

pub use dogpile_retry as retry;
