use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type Slot = Arc<Mutex<()>>;

/// A mutex per string key, created on demand and removed on unlock.
///
/// The lock table holds an entry only while its key is locked, so it never
/// grows beyond the number of keys locked at the same time.
///
/// # Algorithm
///
/// `lock` creates a fresh candidate mutex and inserts it unless the key is
/// already present, then blocks on whichever mutex is in the table. If that
/// turns out not to be its own candidate, the previous holder has released
/// and removed it in the meantime; the caller lets go and starts over.
/// Unlocking removes the table entry *before* releasing the mutex, so a new
/// caller can never pick up an entry that is about to be released.
///
/// Collisions on the same key are expected to be rare, which keeps the retry
/// path cheap in practice.
///
/// # Examples
///
/// ```
/// use dogpile_core::KeyMutex;
///
/// let locks = KeyMutex::new();
/// {
///     let _guard = locks.lock("user:1");
///     assert!(locks.is_locked("user:1"));
///     assert!(!locks.is_locked("user:2"));
/// }
/// assert!(locks.is_empty());
/// ```
#[derive(Default)]
pub struct KeyMutex {
    table: DashMap<String, Slot>,
}

impl KeyMutex {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `key` is locked by the caller.
    ///
    /// The lock is held until the returned guard is dropped.
    pub fn lock(&self, key: &str) -> KeyMutexGuard<'_> {
        loop {
            let (slot, owned) = self.claim(key);
            let guard = slot.lock_arc();
            if owned {
                return KeyMutexGuard::new(self, key, slot, guard);
            }
            // stale handoff: the previous holder already removed this slot
            drop(guard);
        }
    }

    /// Like [`lock`](Self::lock), but gives up after `timeout`.
    ///
    /// A timeout too large to be represented as an [`Instant`] (such as
    /// [`Duration::MAX`]) waits as long as [`lock`](Self::lock) does.
    pub fn lock_for(&self, key: &str, timeout: Duration) -> Option<KeyMutexGuard<'_>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.lock(key));
        };
        loop {
            let (slot, owned) = self.claim(key);
            let remaining = deadline.saturating_duration_since(Instant::now());

            match slot.try_lock_arc_for(remaining) {
                Some(guard) if owned => return Some(KeyMutexGuard::new(self, key, slot, guard)),
                Some(guard) => drop(guard),
                None => {
                    if owned {
                        self.table.remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
                    }
                    return None;
                }
            }

            if Instant::now() >= deadline {
                return None;
            }
        }
    }

    /// Whether some caller currently holds (or is acquiring) `key`.
    pub fn is_locked(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// Number of keys currently locked.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no key is locked.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the slot for `key` and whether it is the one this call inserted.
    fn claim(&self, key: &str) -> (Slot, bool) {
        let candidate: Slot = Arc::new(Mutex::new(()));
        // the map reference is dropped at the end of this statement, before blocking
        let slot = Arc::clone(
            self.table
                .entry(key.to_string())
                .or_insert_with(|| Arc::clone(&candidate))
                .value(),
        );
        let owned = Arc::ptr_eq(&slot, &candidate);
        (slot, owned)
    }
}

impl fmt::Debug for KeyMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMutex")
            .field("locked", &self.table.len())
            .finish()
    }
}

/// Holds a key locked in a [`KeyMutex`]; unlocks on drop.
///
/// The guard is not `Send`: a key must be unlocked on the thread that locked it.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyMutexGuard<'a> {
    owner: &'a KeyMutex,
    key: String,
    slot: Slot,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl<'a> KeyMutexGuard<'a> {
    fn new(
        owner: &'a KeyMutex,
        key: &str,
        slot: Slot,
        guard: ArcMutexGuard<RawMutex, ()>,
    ) -> Self {
        Self {
            owner,
            key: key.to_string(),
            slot,
            guard: Some(guard),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Unlocks the key now instead of at the end of the scope.
    pub fn unlock(self) {}
}

impl Drop for KeyMutexGuard<'_> {
    fn drop(&mut self) {
        let removed = self
            .owner
            .table
            .remove_if(&self.key, |_, current| Arc::ptr_eq(current, &self.slot));

        // release only once the entry is gone
        drop(self.guard.take());

        if removed.is_none() && !thread::panicking() {
            panic!("unlock of unlocked mutex: {}", self.key);
        }
    }
}

impl fmt::Debug for KeyMutexGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMutexGuard")
            .field("key", &self.key)
            .finish()
    }
}
