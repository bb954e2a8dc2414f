use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::GatewayRequest;

/// Time source for cache expiry. Swapped for [`ManualClock`] in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct CachedResponse {
    value: Value,
    stored_at: Instant,
}

/// Thread-safe LRU cache of successful gateway responses with a time-to-live
///
/// Entries are keyed by the exact request (method, URL, body). An entry older
/// than the TTL is treated as absent and evicted on lookup.
pub struct ResponseCache {
    entries: Mutex<LruCache<GatewayRequest, CachedResponse>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    /// Create a cache using the system clock
    ///
    /// A capacity of 0 is bumped to 1.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            entries: Mutex::new(LruCache::new(cap)),
            ttl,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<GatewayRequest, CachedResponse>> {
        // A poisoned cache only holds idempotent fetch results, keep using it
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get a live cached response for a request
    pub fn get(&self, request: &GatewayRequest) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.lock();

        let expired = match entries.get(request) {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(request);
        }
        None
    }

    /// Store a successful response
    pub fn put(&self, request: GatewayRequest, value: Value) {
        let stored_at = self.clock.now();
        self.lock().put(request, CachedResponse { value, stored_at });
    }

    /// Number of stored entries, expired ones included until looked up
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
