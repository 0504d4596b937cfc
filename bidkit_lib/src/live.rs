//! One live bid request raced against a time budget.
//!
//! A [`LiveCallArbiter`] is shared by two producers: the task awaiting the
//! backend and the task sleeping for the time budget. Both report into it and
//! the first to flip the `resolved` flag delivers the caller's callback. The
//! loser only contributes data: a late network response is still merged into
//! the cache so the next cache lookup can serve it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::ad_unit::CacheKey;
use crate::cache::{BidCache, Claim};
use crate::clock::Clock;
use crate::error::BidKitError;
use crate::slot::CachedBid;
use crate::telemetry::BidTelemetry;

/// Terminal callback of a live request. Exactly one method is called, once.
///
/// Both methods consume the callback, so a second delivery does not type-check.
/// Closures taking `Option<CachedBid>` implement this trait (`None` is no bid).
pub trait BidResponseCallback: Send {
    fn on_bid_response(self: Box<Self>, slot: CachedBid);

    fn on_no_bid(self: Box<Self>);
}

impl<F> BidResponseCallback for F
where
    F: FnOnce(Option<CachedBid>) + Send,
{
    fn on_bid_response(self: Box<Self>, slot: CachedBid) {
        (*self)(Some(slot))
    }

    fn on_no_bid(self: Box<Self>) {
        (*self)(None)
    }
}

pub struct LiveCallArbiter {
    key: CacheKey,
    resolved: AtomicBool,
    callback: Mutex<Option<Box<dyn BidResponseCallback>>>,
    cache: Arc<BidCache>,
    clock: Arc<dyn Clock>,
    telemetry: Arc<dyn BidTelemetry>,
}

impl LiveCallArbiter {
    pub fn new(
        key: CacheKey,
        callback: Box<dyn BidResponseCallback>,
        cache: Arc<BidCache>,
        clock: Arc<dyn Clock>,
        telemetry: Arc<dyn BidTelemetry>,
    ) -> Self {
        Self {
            key,
            resolved: AtomicBool::new(false),
            callback: Mutex::new(Some(callback)),
            cache,
            clock,
            telemetry,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Flips Pending to Resolved. Only the single winner gets the callback.
    fn try_resolve(&self) -> Option<Box<dyn BidResponseCallback>> {
        self.resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.callback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Runs the consumption hook without letting a faulty sink cost the
    /// caller its already-taken callback.
    fn report_consumed(&self, slot: &CachedBid) {
        let reported = catch_unwind(AssertUnwindSafe(|| {
            self.telemetry.on_bid_consumed(&self.key, slot)
        }));
        if reported.is_err() {
            tracing::error!(key = %self.key, "telemetry sink panicked on bid consumed");
        }
    }

    /// The backend answered.
    pub fn on_network_response(&self, slots: Vec<CachedBid>) {
        let Some(callback) = self.try_resolve() else {
            let merged = self.cache.upsert(slots);
            tracing::debug!(key = %self.key, merged, "late live response merged into cache");
            return;
        };

        if slots.len() > 1 {
            let violation = BidKitError::ProtocolViolation(format!(
                "live response for {} carried {} slots, expected at most one",
                self.key,
                slots.len()
            ));
            tracing::warn!(error = %violation, "answering no bid");
            self.cache.upsert(slots);
            callback.on_no_bid();
            return;
        }

        let now = self.clock.now_ms();
        match slots.into_iter().next().map(|slot| self.cache.normalize(slot)) {
            Some(slot) if slot.is_valid() && slot.is_silence() => {
                tracing::debug!(key = %self.key, ttl = slot.ttl_secs, "live response is silence");
                self.cache.upsert(vec![slot]);
                callback.on_no_bid();
            }
            Some(slot) if slot.is_valid() && slot.is_usable(now) => {
                self.report_consumed(&slot);
                callback.on_bid_response(slot);
            }
            _ => callback.on_no_bid(),
        }
    }

    /// The backend call failed. Same outcome as running out of time.
    pub fn on_network_error(&self, error: &BidKitError) {
        tracing::debug!(key = %self.key, error = %error, "live request failed, falling back to cache");
        self.on_time_budget_exceeded();
    }

    /// The time budget elapsed. Serves a usable cached bid if one is there.
    pub fn on_time_budget_exceeded(&self) {
        let Some(callback) = self.try_resolve() else {
            return;
        };
        let now = self.clock.now_ms();
        match self.cache.claim(&self.key, now) {
            Claim::Claimed(slot) if slot.is_usable(now) => {
                self.report_consumed(&slot);
                callback.on_bid_response(slot);
            }
            _ => callback.on_no_bid(),
        }
    }
}

/// A request abandoned before either producer resolved it, such as after a
/// fault while it was being set up, still answers no bid.
impl Drop for LiveCallArbiter {
    fn drop(&mut self) {
        let callback = self
            .callback
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(callback) = callback {
            tracing::warn!(key = %self.key, "live request dropped unresolved, answering no bid");
            callback.on_no_bid();
        }
    }
}
