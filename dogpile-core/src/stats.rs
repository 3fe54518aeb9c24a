use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing how [`fetch_or_save`](crate::fetch_or_save) calls were served.
///
/// # Thread Safety
///
/// All counters are atomics updated with `Relaxed` ordering; a snapshot taken
/// while calls are in flight may be slightly inconsistent across counters.
///
/// # Examples
///
/// ```
/// use dogpile_core::FetchStats;
///
/// let stats = FetchStats::new();
/// stats.record_hit();
/// stats.record_shared();
/// stats.record_build();
///
/// assert_eq!(stats.hits(), 1);
/// assert_eq!(stats.shared(), 1);
/// assert_eq!(stats.builds(), 1);
/// assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
/// ```
#[derive(Debug)]
pub struct FetchStats {
    hits: AtomicU64,
    shared: AtomicU64,
    builds: AtomicU64,
    degraded: AtomicU64,
}

impl FetchStats {
    /// Creates a new statistics tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            shared: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
        }
    }

    /// Records a value served by the first fetch, without locking.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a value found by the second fetch, built by another caller
    /// while this one waited for the lock.
    #[inline]
    pub fn record_shared(&self) {
        self.shared.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a builder that returned a value.
    #[inline]
    pub fn record_build(&self) {
        self.builds.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a built value that could not be saved and was handed back
    /// without going through the cache.
    #[inline]
    pub fn record_degraded(&self) {
        self.degraded.fetch_add(1, Ordering::Relaxed);
    }

    /// Values served by the first fetch.
    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Values built by another caller and read after waiting for the lock.
    #[inline]
    pub fn shared(&self) -> u64 {
        self.shared.load(Ordering::Relaxed)
    }

    /// Values built by this caller. Failed or panicking builders are not counted.
    #[inline]
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Built values returned without being saved. Also counted in [`builds`](Self::builds).
    #[inline]
    pub fn degraded(&self) -> u64 {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Calls that ended with a value, whether cached or built.
    #[inline]
    pub fn total(&self) -> u64 {
        self.hits() + self.shared() + self.builds()
    }

    /// Fraction of calls served without running a builder (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing was recorded yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.hits() + self.shared()) as f64 / total as f64
        }
    }

    /// Sets every counter back to zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use dogpile_core::FetchStats;
    ///
    /// let stats = FetchStats::new();
    /// stats.record_hit();
    /// stats.reset();
    /// assert_eq!(stats.total(), 0);
    /// ```
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.shared.store(0, Ordering::Relaxed);
        self.builds.store(0, Ordering::Relaxed);
        self.degraded.store(0, Ordering::Relaxed);
    }
}

impl Default for FetchStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for FetchStats {
    fn clone(&self) -> Self {
        Self {
            hits: AtomicU64::new(self.hits()),
            shared: AtomicU64::new(self.shared()),
            builds: AtomicU64::new(self.builds()),
            degraded: AtomicU64::new(self.degraded()),
        }
    }
}
