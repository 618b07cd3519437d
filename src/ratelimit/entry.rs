//! Fixed-window rate limit entries.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Throttling state for one key.
///
/// An entry always has `count >= 1`; it is created on the first observed
/// action and reset in place once its window has passed.
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    /// Actions observed in the current window
    count: u32,
    /// When the current window expires
    reset_at: Instant,
    /// Insertion sequence number, used for oldest-first eviction
    seq: u64,
}

impl RateLimitEntry {
    /// Open a fresh window at `now`.
    pub(crate) fn new(now: Instant, window: Duration, seq: u64) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
            seq,
        }
    }

    /// Start a new window in place, keeping the insertion position.
    pub(crate) fn reset(&mut self, now: Instant, window: Duration) {
        self.count = 1;
        self.reset_at = now + window;
    }

    /// Whether the window has passed. The boundary instant itself still
    /// belongs to the window.
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.reset_at
    }

    /// Count one more action.
    pub(crate) fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    /// Actions observed in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// When the current window expires.
    pub fn reset_at(&self) -> Instant {
        self.reset_at
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self, now: Instant) -> u64 {
        let remaining = self.reset_at.saturating_duration_since(now).as_millis();
        remaining.div_ceil(1000) as u64
    }
}

/// Outcome of a rate limit check.
///
/// Serializes as `{"limited": bool, "retryAfterSeconds"?: number}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    /// Whether the action must be refused
    pub limited: bool,
    /// Seconds until the caller may retry, present only when limited
    #[serde(rename = "retryAfterSeconds", skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl RateLimitStatus {
    /// The action is allowed.
    pub fn allowed() -> Self {
        Self {
            limited: false,
            retry_after_secs: None,
        }
    }

    /// The action is refused until `retry_after_secs` have passed.
    pub fn limited(retry_after_secs: u64) -> Self {
        Self {
            limited: true,
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_starts_at_one() {
        let now = Instant::now();
        let entry = RateLimitEntry::new(now, Duration::from_secs(60), 0);

        assert_eq!(entry.count(), 1);
        assert_eq!(entry.reset_at(), now + Duration::from_secs(60));
        assert!(!entry.is_expired(now));
    }

    #[test]
    fn test_expiry_is_strictly_after_reset() {
        let now = Instant::now();
        let entry = RateLimitEntry::new(now, Duration::from_secs(10), 0);

        assert!(!entry.is_expired(now + Duration::from_secs(10)));
        assert!(entry.is_expired(now + Duration::from_millis(10_001)));
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let now = Instant::now();
        let entry = RateLimitEntry::new(now, Duration::from_secs(30), 0);

        assert_eq!(entry.retry_after_secs(now), 30);
        assert_eq!(entry.retry_after_secs(now + Duration::from_millis(500)), 30);
        assert_eq!(entry.retry_after_secs(now + Duration::from_millis(29_001)), 1);
        assert_eq!(entry.retry_after_secs(now + Duration::from_secs(31)), 0);
    }

    #[test]
    fn test_reset_keeps_sequence() {
        let now = Instant::now();
        let mut entry = RateLimitEntry::new(now, Duration::from_secs(1), 7);
        entry.increment();
        entry.increment();
        assert_eq!(entry.count(), 3);

        let later = now + Duration::from_secs(5);
        entry.reset(later, Duration::from_secs(1));

        assert_eq!(entry.count(), 1);
        assert_eq!(entry.seq(), 7);
        assert_eq!(entry.reset_at(), later + Duration::from_secs(1));
    }

    #[test]
    fn test_status_serialization() {
        let allowed = serde_json::to_value(RateLimitStatus::allowed()).unwrap();
        assert_eq!(allowed, serde_json::json!({ "limited": false }));

        let limited = serde_json::to_value(RateLimitStatus::limited(12)).unwrap();
        assert_eq!(
            limited,
            serde_json::json!({ "limited": true, "retryAfterSeconds": 12 })
        );
    }
}
