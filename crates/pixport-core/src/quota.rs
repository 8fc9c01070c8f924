//! Per-client daily upload quota.
//!
//! `DailyQuota` holds a sharded in-memory map from client identifier to a
//! windowed upload counter. Admission for a batch is a single atomic
//! `try_reserve` under the owning shard's lock: the whole batch is either
//! admitted (and its size charged up front) or denied. After the real number
//! of stored files is known, the unused part of the reservation is returned
//! with `release`, so rejected and failed files never consume quota.
//!
//! Windows reset lazily: an entry whose `reset_at` has passed is re-created
//! on the next check. There is no background sweep inside this type;
//! `cleanup_expired` is exposed for a periodic caller, and each shard evicts
//! stale entries itself when it grows past its bucket cap.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

/// Default shard count (power of two for even key distribution).
const DEFAULT_SHARD_COUNT: usize = 16;

/// Maximum tracked clients per shard before eviction kicks in.
const MAX_ENTRIES_PER_SHARD: usize = 10_000;

#[derive(Debug, Clone)]
struct QuotaEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

impl QuotaEntry {
    fn fresh(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: now + window,
        }
    }

    /// Lazy window expiry: counts only reset when a check observes that the
    /// window has passed.
    fn reset_if_expired(&mut self, now: DateTime<Utc>, window: Duration) {
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }
    }
}

/// Point-in-time view of a client's quota state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Why a batch was not admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDenied {
    /// The daily limit is already spent.
    Exhausted { reset_at: DateTime<Utc> },
    /// There is headroom, but not enough for the whole batch. The client may
    /// retry with a batch no larger than `remaining`.
    InsufficientRemaining {
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
}

/// A successful admission. The batch size has already been charged; callers
/// must `release` the unused remainder once the stored count is known.
#[derive(Debug, Clone)]
pub struct QuotaReservation {
    pub reserved: u32,
    /// Headroom left after this reservation.
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Sharded per-client daily quota store.
///
/// Shards (separate `HashMap`s behind independent mutexes) keep unrelated
/// clients from serializing on one lock. The locks are `std::sync::Mutex`:
/// every critical section is a handful of map operations and must never
/// suspend, so admission stays synchronous even on the async request path.
pub struct DailyQuota {
    shards: Vec<Mutex<HashMap<String, QuotaEntry>>>,
    shard_count: usize,
    daily_limit: u32,
    window: Duration,
    max_entries_per_shard: usize,
}

impl DailyQuota {
    /// Create a quota store with the default shard count.
    pub fn new(daily_limit: u32, window: Duration) -> Self {
        Self::with_shards(daily_limit, window, DEFAULT_SHARD_COUNT)
    }

    /// Create a quota store with a custom shard count.
    pub fn with_shards(daily_limit: u32, window: Duration, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            shards,
            shard_count,
            daily_limit,
            window,
            max_entries_per_shard: MAX_ENTRIES_PER_SHARD,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shard_count
    }

    fn lock_shard(&self, key: &str) -> std::sync::MutexGuard<'_, HashMap<String, QuotaEntry>> {
        // A poisoned shard only means another thread panicked mid-update of a
        // counter; the map itself is still usable.
        match self.shards[self.shard_index(key)].lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current quota state for a client.
    ///
    /// Not purely read-only: if the client has no entry, or its window has
    /// expired, the fresh entry backing the snapshot is persisted into the
    /// store (lazy reset-on-read).
    pub fn peek(&self, client: &str) -> QuotaSnapshot {
        let now = Utc::now();
        let mut entries = self.lock_shard(client);
        self.evict_if_full(&mut entries, client, now);

        let window = self.window;
        let entry = entries
            .entry(client.to_string())
            .or_insert_with(|| QuotaEntry::fresh(now, window));
        entry.reset_if_expired(now, window);

        QuotaSnapshot {
            allowed: entry.count < self.daily_limit,
            remaining: self.daily_limit.saturating_sub(entry.count),
            reset_at: entry.reset_at,
        }
    }

    /// Atomically admit a batch of `requested` items, charging them against
    /// the client's window.
    ///
    /// The gate is all-or-nothing: a batch larger than the remaining headroom
    /// is denied in its entirety even though some headroom exists.
    pub fn try_reserve(
        &self,
        client: &str,
        requested: u32,
    ) -> Result<QuotaReservation, AdmissionDenied> {
        let now = Utc::now();
        let mut entries = self.lock_shard(client);
        self.evict_if_full(&mut entries, client, now);

        let window = self.window;
        let entry = entries
            .entry(client.to_string())
            .or_insert_with(|| QuotaEntry::fresh(now, window));
        entry.reset_if_expired(now, window);

        if entry.count >= self.daily_limit {
            return Err(AdmissionDenied::Exhausted {
                reset_at: entry.reset_at,
            });
        }

        let remaining = self.daily_limit - entry.count;
        if remaining < requested {
            return Err(AdmissionDenied::InsufficientRemaining {
                remaining,
                reset_at: entry.reset_at,
            });
        }

        entry.count += requested;
        Ok(QuotaReservation {
            reserved: requested,
            remaining: self.daily_limit - entry.count,
            reset_at: entry.reset_at,
        })
    }

    /// Return the unused part of a reservation.
    ///
    /// A release against a missing or already-expired entry is a no-op: the
    /// window has reset (or the entry was evicted) and there is nothing left
    /// to return.
    pub fn release(&self, client: &str, unused: u32) {
        if unused == 0 {
            return;
        }
        let now = Utc::now();
        let mut entries = self.lock_shard(client);
        if let Some(entry) = entries.get_mut(client) {
            if now < entry.reset_at {
                entry.count = entry.count.saturating_sub(unused);
            }
        }
    }

    /// Drop entries whose window expired more than one full window ago.
    ///
    /// Returns the number of entries removed. Intended to be driven by a
    /// periodic task so the map stays bounded under many distinct clients.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let grace = self.window;
        let mut total_removed = 0;

        for shard in &self.shards {
            let mut entries = match shard.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let before = entries.len();
            entries.retain(|_, entry| now < entry.reset_at + grace);
            total_removed += before - entries.len();
        }

        if total_removed > 0 {
            tracing::debug!(
                entries_removed = total_removed,
                "Cleaned up expired quota entries"
            );
        }
        total_removed
    }

    /// Capacity guard for a single shard: when full and about to grow, first
    /// drop expired entries, then the entry closest to its reset as a last
    /// resort.
    fn evict_if_full(
        &self,
        entries: &mut HashMap<String, QuotaEntry>,
        client: &str,
        now: DateTime<Utc>,
    ) {
        if entries.len() < self.max_entries_per_shard || entries.contains_key(client) {
            return;
        }

        let grace = self.window;
        entries.retain(|_, entry| now < entry.reset_at + grace);

        if entries.len() >= self.max_entries_per_shard {
            let oldest_key = entries
                .iter()
                .min_by_key(|(_, entry)| entry.reset_at)
                .map(|(k, _)| k.clone());
            if let Some(key) = oldest_key {
                entries.remove(&key);
                tracing::debug!(
                    evicted_client = %key,
                    remaining_entries = entries.len(),
                    "Evicted oldest quota entry due to shard capacity limit"
                );
            }
        }
    }
}
