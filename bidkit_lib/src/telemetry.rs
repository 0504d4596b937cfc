//! Fire-and-forget hooks called at fixed points of the bid lifecycle.
//!
//! The engine owns none of the storage or delivery of these events. Sinks must
//! return quickly: hooks run on the caller's thread or on runtime workers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::ad_unit::CacheKey;
use crate::slot::CachedBid;

pub trait BidTelemetry: Send + Sync {
    /// A caller asked for a bid for `key` (cache or live path).
    fn on_bid_requested(&self, _key: &CacheKey) {}

    /// A usable bid was handed to a caller.
    fn on_bid_consumed(&self, _key: &CacheKey, _slot: &CachedBid) {}

    /// A backend call covering `key` failed.
    fn on_fetch_failed(&self, _key: &CacheKey, _reason: &str) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl BidTelemetry for NoopTelemetry {}

/// Logs every event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl BidTelemetry for TracingTelemetry {
    fn on_bid_requested(&self, key: &CacheKey) {
        tracing::debug!(%key, "bid requested");
    }

    fn on_bid_consumed(&self, key: &CacheKey, slot: &CachedBid) {
        tracing::debug!(%key, cpm = slot.price(), "bid consumed");
    }

    fn on_fetch_failed(&self, key: &CacheKey, reason: &str) {
        tracing::debug!(%key, reason, "bid fetch failed");
    }
}

/// Atomic counters of lifecycle events.
#[derive(Debug, Default)]
pub struct TelemetryCounters {
    bids_requested: AtomicU64,
    bids_consumed: AtomicU64,
    fetches_failed: AtomicU64,
    /// Sum of consumed prices, in thousandths of a currency unit.
    consumed_cpm_millis: AtomicU64,
}

impl TelemetryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current counters.
    pub fn summary(&self) -> TelemetrySummary {
        TelemetrySummary {
            bids_requested: self.bids_requested.load(Ordering::Relaxed),
            bids_consumed: self.bids_consumed.load(Ordering::Relaxed),
            fetches_failed: self.fetches_failed.load(Ordering::Relaxed),
            consumed_cpm_total: self.consumed_cpm_millis.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

impl BidTelemetry for TelemetryCounters {
    fn on_bid_requested(&self, _key: &CacheKey) {
        self.bids_requested.fetch_add(1, Ordering::Relaxed);
    }

    fn on_bid_consumed(&self, _key: &CacheKey, slot: &CachedBid) {
        self.bids_consumed.fetch_add(1, Ordering::Relaxed);
        self.consumed_cpm_millis
            .fetch_add((slot.price() * 1000.0).round() as u64, Ordering::Relaxed);
    }

    fn on_fetch_failed(&self, _key: &CacheKey, _reason: &str) {
        self.fetches_failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Immutable snapshot of [`TelemetryCounters`] for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySummary {
    pub bids_requested: u64,
    pub bids_consumed: u64,
    pub fetches_failed: u64,
    pub consumed_cpm_total: f64,
}
