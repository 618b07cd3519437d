//! Core fixed-window rate limiter.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::entry::{RateLimitEntry, RateLimitStatus};
use super::key::RateLimitKey;

/// Default window: 30 minutes.
const DEFAULT_WINDOW: Duration = Duration::from_secs(30 * 60);
/// Default number of actions allowed per window.
const DEFAULT_MAX_REQUESTS: u32 = 1;
/// Default ceiling on tracked keys.
const DEFAULT_MAX_TRACKED_KEYS: usize = 10_000;
/// Default chance that a check sweeps expired entries first.
const DEFAULT_CLEANUP_PROBABILITY: f64 = 0.01;

/// Settings for a rate limiter, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterSettings {
    /// Length of each fixed window
    pub window: Duration,
    /// Actions allowed per key per window
    pub max_requests: u32,
    /// Maximum number of keys held at once
    pub max_tracked_keys: usize,
    /// Probability in `0.0..=1.0` that a check sweeps expired entries
    pub cleanup_probability: f64,
}

impl Default for RateLimiterSettings {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            max_requests: DEFAULT_MAX_REQUESTS,
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
            cleanup_probability: DEFAULT_CLEANUP_PROBABILITY,
        }
    }
}

/// Entries plus an insertion-order index over them.
#[derive(Default)]
struct Store {
    entries: HashMap<String, RateLimitEntry>,
    /// seq -> key, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl Store {
    fn insert(&mut self, key: &str, now: Instant, window: Duration) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(key.to_string(), RateLimitEntry::new(now, window, seq));
        self.order.insert(seq, key.to_string());
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    fn remove_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let order = &mut self.order;
        self.entries.retain(|_, entry| {
            if entry.is_expired(now) {
                order.remove(&entry.seq());
                false
            } else {
                true
            }
        });
        before - self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// An in-process, fixed-window rate limiter keyed by opaque strings.
///
/// The store lives behind a single mutex so each check's
/// read-compare-write runs atomically; the limiter can be shared across
/// tasks through an `Arc`. State is local to the process: separate
/// instances each enforce their own limit.
pub struct RateLimiter {
    store: Mutex<Store>,
    settings: RateLimiterSettings,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter with default settings.
    pub fn new() -> Self {
        Self::with_settings(RateLimiterSettings::default())
    }

    /// Create a rate limiter with the given settings and the system clock.
    pub fn with_settings(settings: RateLimiterSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Create a rate limiter reading time from `clock`.
    pub fn with_clock(settings: RateLimiterSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            settings,
            clock,
        }
    }

    /// The settings this limiter was built with.
    pub fn settings(&self) -> &RateLimiterSettings {
        &self.settings
    }

    /// Record an action for `key` and decide whether it is allowed.
    ///
    /// A limited check leaves the entry untouched. Any string is a valid
    /// key, including the empty string, which is simply one shared bucket.
    pub fn check(&self, key: &str) -> RateLimitStatus {
        let now = self.clock.now();
        let mut guard = self.store.lock();
        let store = &mut *guard;

        if self.should_sweep() {
            let removed = store.remove_expired(now);
            if removed > 0 {
                debug!(removed = removed, "Swept expired rate limit entries");
            }
        }

        trace!(key = %key, "Checking rate limit");

        match store.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                if entry.count() < self.settings.max_requests {
                    entry.increment();
                    RateLimitStatus::allowed()
                } else {
                    let retry_after = entry.retry_after_secs(now);
                    debug!(key = %key, retry_after_secs = retry_after, "Rate limit exceeded");
                    RateLimitStatus::limited(retry_after)
                }
            }
            Some(entry) => {
                trace!(key = %key, "Window expired, starting a new one");
                entry.reset(now, self.settings.window);
                RateLimitStatus::allowed()
            }
            None => {
                store.insert(key, now, self.settings.window);
                if store.entries.len() > self.settings.max_tracked_keys {
                    if let Some(evicted) = store.evict_oldest() {
                        debug!(
                            evicted = %evicted,
                            max_tracked_keys = self.settings.max_tracked_keys,
                            "Evicted oldest rate limit entry"
                        );
                    }
                }
                RateLimitStatus::allowed()
            }
        }
    }

    /// Check a composite (client, theme) key.
    pub fn check_key(&self, key: &RateLimitKey) -> RateLimitStatus {
        self.check(&key.to_string_key())
    }

    /// Remove every expired entry now. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        self.store.lock().remove_expired(now)
    }

    /// Get the count of the current window for `key`.
    ///
    /// Returns `None` if no entry exists for the key.
    pub fn entry_count(&self, key: &str) -> Option<u32> {
        self.store.lock().entries.get(key).map(|e| e.count())
    }

    /// Get the number of tracked keys.
    pub fn tracked_keys(&self) -> usize {
        self.store.lock().entries.len()
    }

    /// Clear all entries.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    fn should_sweep(&self) -> bool {
        let p = self.settings.cleanup_probability;
        p > 0.0 && rand::thread_rng().gen_bool(p.min(1.0))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;

    fn test_settings() -> RateLimiterSettings {
        RateLimiterSettings {
            cleanup_probability: 0.0,
            ..RateLimiterSettings::default()
        }
    }

    fn manual_limiter(settings: RateLimiterSettings) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(settings, Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.tracked_keys(), 0);
        assert_eq!(limiter.settings().window, Duration::from_secs(1800));
        assert_eq!(limiter.settings().max_requests, 1);
        assert_eq!(limiter.settings().max_tracked_keys, 10_000);
    }

    #[test]
    fn test_first_check_creates_entry() {
        let limiter = RateLimiter::with_settings(test_settings());

        let status = limiter.check("ip1:alice/theme");

        assert_eq!(status, RateLimitStatus::allowed());
        assert_eq!(limiter.entry_count("ip1:alice/theme"), Some(1));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_second_check_is_limited_with_retry_hint() {
        let limiter = RateLimiter::with_settings(test_settings());

        assert!(!limiter.check("ip1:alice/theme").limited);
        let status = limiter.check("ip1:alice/theme");

        assert!(status.limited);
        let retry = status.retry_after_secs.unwrap();
        assert!((1798..=1800).contains(&retry), "retry_after was {}", retry);
    }

    #[test]
    fn test_allows_max_requests_then_limits() {
        let (limiter, _clock) = manual_limiter(RateLimiterSettings {
            max_requests: 5,
            ..test_settings()
        });

        for i in 1..=5 {
            let status = limiter.check("key");
            assert!(!status.limited, "request {} should be allowed", i);
            assert_eq!(limiter.entry_count("key"), Some(i));
        }

        let status = limiter.check("key");
        assert!(status.limited);
        assert!(status.retry_after_secs.unwrap() > 0);
    }

    #[test]
    fn test_limited_check_does_not_increment() {
        let (limiter, _clock) = manual_limiter(RateLimiterSettings {
            max_requests: 2,
            ..test_settings()
        });

        limiter.check("key");
        limiter.check("key");
        limiter.check("key");
        limiter.check("key");

        assert_eq!(limiter.entry_count("key"), Some(2));
    }

    #[test]
    fn test_window_reset_after_expiry() {
        let (limiter, clock) = manual_limiter(test_settings());

        assert!(!limiter.check("ip1:alice/theme").limited);
        assert!(limiter.check("ip1:alice/theme").limited);

        // The reset instant itself is still inside the window
        clock.advance(Duration::from_secs(1800));
        let status = limiter.check("ip1:alice/theme");
        assert_eq!(status, RateLimitStatus::limited(0));

        clock.advance(Duration::from_millis(1));
        assert!(!limiter.check("ip1:alice/theme").limited);
        assert_eq!(limiter.entry_count("ip1:alice/theme"), Some(1));
        assert!(limiter.check("ip1:alice/theme").limited);
    }

    #[test]
    fn test_retry_after_tracks_clock() {
        let (limiter, clock) = manual_limiter(test_settings());

        limiter.check("key");
        clock.advance(Duration::from_millis(600_500));

        let status = limiter.check("key");
        assert_eq!(status, RateLimitStatus::limited(1200));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::with_settings(test_settings());

        limiter.check("ip1:alice/theme");
        assert!(limiter.check("ip1:alice/theme").limited);

        assert!(!limiter.check("ip2:alice/theme").limited);
        assert!(!limiter.check("ip1:bob/theme").limited);
    }

    #[test]
    fn test_check_key_uses_composite_form() {
        let limiter = RateLimiter::with_settings(test_settings());
        let key = RateLimitKey::new("ip1", "alice", "theme");

        limiter.check_key(&key);

        assert_eq!(limiter.entry_count("ip1:alice/theme"), Some(1));
        assert!(limiter.check("ip1:alice/theme").limited);
    }

    #[test]
    fn test_empty_key_is_a_shared_bucket() {
        let limiter = RateLimiter::with_settings(test_settings());

        assert!(!limiter.check("").limited);
        assert!(limiter.check("").limited);
    }

    #[test]
    fn test_eviction_bounds_tracked_keys() {
        let limiter = RateLimiter::with_settings(RateLimiterSettings {
            max_tracked_keys: 100,
            ..test_settings()
        });

        for i in 0..250 {
            limiter.check(&format!("ip{}:alice/theme", i));
            assert!(limiter.tracked_keys() <= 100);
        }

        assert_eq!(limiter.tracked_keys(), 100);
    }

    #[test]
    fn test_eviction_removes_oldest_inserted() {
        let limiter = RateLimiter::with_settings(RateLimiterSettings {
            max_tracked_keys: 2,
            ..test_settings()
        });

        limiter.check("a");
        limiter.check("b");
        // Touching "a" again does not move it in insertion order
        limiter.check("a");
        limiter.check("c");

        assert_eq!(limiter.entry_count("a"), None);
        assert_eq!(limiter.entry_count("b"), Some(1));
        assert_eq!(limiter.entry_count("c"), Some(1));
    }

    #[test]
    fn test_reset_keeps_insertion_position() {
        let (limiter, clock) = manual_limiter(RateLimiterSettings {
            max_tracked_keys: 2,
            ..test_settings()
        });

        limiter.check("a");
        clock.advance(Duration::from_secs(1000));
        limiter.check("b");
        clock.advance(Duration::from_secs(1000));

        // "a" expired and is reset in place; it remains the oldest entry
        assert!(!limiter.check("a").limited);
        limiter.check("c");

        assert_eq!(limiter.entry_count("a"), None);
        assert_eq!(limiter.entry_count("b"), Some(1));
        assert_eq!(limiter.entry_count("c"), Some(1));
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let (limiter, clock) = manual_limiter(test_settings());

        limiter.check("old");
        clock.advance(Duration::from_secs(1000));
        limiter.check("new");
        clock.advance(Duration::from_secs(1000));

        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.entry_count("old"), None);
        assert_eq!(limiter.entry_count("new"), Some(1));
    }

    #[test]
    fn test_cleanup_frees_eviction_order() {
        let (limiter, clock) = manual_limiter(RateLimiterSettings {
            max_tracked_keys: 2,
            ..test_settings()
        });

        limiter.check("a");
        clock.advance(Duration::from_secs(2000));
        assert_eq!(limiter.cleanup(), 1);

        limiter.check("b");
        limiter.check("c");
        limiter.check("d");

        assert_eq!(limiter.tracked_keys(), 2);
        assert_eq!(limiter.entry_count("b"), None);
        assert_eq!(limiter.entry_count("c"), Some(1));
        assert_eq!(limiter.entry_count("d"), Some(1));
    }

    #[test]
    fn test_probabilistic_sweep_always_runs_at_one() {
        let (limiter, clock) = manual_limiter(RateLimiterSettings {
            cleanup_probability: 1.0,
            ..test_settings()
        });

        limiter.check("stale");
        clock.advance(Duration::from_secs(3600));
        limiter.check("fresh");

        assert_eq!(limiter.tracked_keys(), 1);
        assert_eq!(limiter.entry_count("stale"), None);
    }

    #[test]
    fn test_concurrent_checks_allow_exactly_max() {
        let limiter = Arc::new(RateLimiter::with_settings(RateLimiterSettings {
            max_requests: 10,
            ..test_settings()
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..10).filter(|_| !limiter.check("shared").limited).count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 10);
        assert_eq!(limiter.entry_count("shared"), Some(10));
    }

    #[test]
    fn test_clear_entries() {
        let limiter = RateLimiter::with_settings(test_settings());

        limiter.check("key");
        assert_eq!(limiter.tracked_keys(), 1);

        limiter.clear();
        assert_eq!(limiter.tracked_keys(), 0);
        assert!(!limiter.check("key").limited);
    }
}
