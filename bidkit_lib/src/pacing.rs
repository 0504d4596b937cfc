//! Backend-driven call pacing.
//!
//! Each response may carry a "time to next call" hint. Until that deadline
//! passes, background fetches are skipped. The deadline is a single atomic so
//! throttling checks never contend with the cache lock.

use std::sync::atomic::{AtomicI64, Ordering};

/// Sentinel for "no deadline".
const NO_DEADLINE: i64 = i64::MIN;

#[derive(Debug)]
pub struct CallPacer {
    next_call_at_ms: AtomicI64,
}

impl Default for CallPacer {
    fn default() -> Self {
        Self::new()
    }
}

impl CallPacer {
    pub fn new() -> Self {
        Self {
            next_call_at_ms: AtomicI64::new(NO_DEADLINE),
        }
    }

    /// Whether a backend call must be skipped at `now_ms`.
    pub fn is_throttled(&self, now_ms: i64) -> bool {
        now_ms < self.next_call_at_ms.load(Ordering::Acquire)
    }

    /// Records a response's pacing hint. Non-positive hints leave the current deadline alone.
    pub fn apply_hint(&self, now_ms: i64, time_to_next_call_secs: i64) {
        if time_to_next_call_secs <= 0 {
            return;
        }
        let deadline = now_ms.saturating_add(time_to_next_call_secs.saturating_mul(1000));
        self.next_call_at_ms.fetch_max(deadline, Ordering::AcqRel);
    }

    /// The current deadline, if one is set.
    pub fn next_call_at_ms(&self) -> Option<i64> {
        match self.next_call_at_ms.load(Ordering::Acquire) {
            NO_DEADLINE => None,
            deadline => Some(deadline),
        }
    }
}
