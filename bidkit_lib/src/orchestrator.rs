//! Cache-first bid decisions with throttled background refresh.
//!
//! [`FetchOrchestrator`] is the engine's public face. Cache lookups are
//! synchronous and never wait on I/O; every lookup that consumes or misses an
//! entry schedules a background fetch on the tokio runtime so the next lookup
//! finds a fresh bid. Live requests race the backend against a time budget
//! through a [`LiveCallArbiter`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashSet;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};

use crate::ad_unit::{AdUnit, AdUnitMapper, AdUnitType, CacheKey};
use crate::backend::BidBackend;
use crate::bid::Bid;
use crate::cache::{BidCache, Claim};
use crate::clock::{Clock, SystemClock};
use crate::config::{EngineConfig, KillSwitch};
use crate::live::{BidResponseCallback, LiveCallArbiter};
use crate::pacing::CallPacer;
use crate::slot::CachedBid;
use crate::telemetry::{BidTelemetry, TracingTelemetry};
use crate::token::{BidToken, TokenCache, TokenValue};

/// A bid exchanged for a token, for header-bidding integrations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBid {
    pub token: BidToken,
    pub price: f64,
}

pub struct FetchOrchestratorBuilder {
    backend: Arc<dyn BidBackend>,
    config: Arc<EngineConfig>,
    kill_switch: Option<Arc<dyn KillSwitch>>,
    clock: Arc<dyn Clock>,
    telemetry: Arc<dyn BidTelemetry>,
}

impl FetchOrchestratorBuilder {
    pub fn with_config(mut self, config: Arc<EngineConfig>) -> Self {
        self.config = config;
        self
    }

    /// Overrides the kill switch. By default the config's own flag is used.
    pub fn with_kill_switch(mut self, kill_switch: Arc<dyn KillSwitch>) -> Self {
        self.kill_switch = Some(kill_switch);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn BidTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Builds the orchestrator. Background and live fetches run on `runtime`.
    pub fn build(self, runtime: Handle) -> FetchOrchestrator {
        let kill_switch = self
            .kill_switch
            .unwrap_or_else(|| self.config.clone() as Arc<dyn KillSwitch>);
        let inner = Inner {
            backend: self.backend,
            cache: Arc::new(BidCache::new(self.config.immediate_bid_ttl)),
            pacer: CallPacer::new(),
            mapper: AdUnitMapper::new(self.config.screen_size),
            tokens: TokenCache::new(Arc::clone(&self.clock)),
            config: self.config,
            kill_switch,
            clock: self.clock,
            telemetry: self.telemetry,
            in_flight: DashSet::new(),
            tasks: Mutex::new(Vec::new()),
            runtime,
        };
        FetchOrchestrator {
            inner: Arc::new(inner),
        }
    }
}

/// Decides whether a bid can be served now and keeps the cache fresh.
///
/// Cheap to clone; clones share the same cache and pacing state.
#[derive(Clone)]
pub struct FetchOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn BidBackend>,
    cache: Arc<BidCache>,
    pacer: CallPacer,
    mapper: AdUnitMapper,
    tokens: TokenCache,
    config: Arc<EngineConfig>,
    kill_switch: Arc<dyn KillSwitch>,
    clock: Arc<dyn Clock>,
    telemetry: Arc<dyn BidTelemetry>,
    /// Keys with a background fetch outstanding.
    in_flight: DashSet<CacheKey>,
    /// Background fetches that `on_application_stopped` may abort.
    tasks: Mutex<Vec<AbortHandle>>,
    runtime: Handle,
}

impl FetchOrchestrator {
    pub fn builder(backend: Arc<dyn BidBackend>) -> FetchOrchestratorBuilder {
        FetchOrchestratorBuilder {
            backend,
            config: Arc::new(EngineConfig::default()),
            kill_switch: None,
            clock: Arc::new(SystemClock),
            telemetry: Arc::new(TracingTelemetry),
        }
    }

    pub fn cache(&self) -> &BidCache {
        &self.inner.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn pacer(&self) -> &CallPacer {
        &self.inner.pacer
    }

    /// Maps an ad unit the way every entry point does.
    pub fn cache_key(&self, ad_unit: &AdUnit) -> Option<CacheKey> {
        self.inner.map(ad_unit)
    }

    /// Returns a usable cached bid for `ad_unit`, if any, and schedules a refresh.
    ///
    /// - kill switch engaged: `None`, nothing else happens
    /// - unmappable ad unit: `None`, logged
    /// - miss: `None`, fetch scheduled
    /// - unexpired silence: `None`, no fetch
    /// - hit: the entry is removed, a fetch is scheduled, and the entry is
    ///   returned if it is still usable
    pub fn get_bid_and_prefetch(&self, ad_unit: &AdUnit) -> Option<CachedBid> {
        guarded("get_bid_and_prefetch", || self.inner.claim_cached_bid(ad_unit)).flatten()
    }

    /// Cache path wrapped in a single-use [`Bid`].
    pub fn load_bid(&self, ad_unit: &AdUnit) -> Option<Bid> {
        let slot = self.get_bid_and_prefetch(ad_unit)?;
        Some(Bid::new(
            ad_unit.ad_unit_type(),
            slot,
            Arc::clone(&self.inner.clock),
        ))
    }

    /// Cache path, with the bid parked behind a one-shot token.
    pub fn get_bid_token(&self, ad_unit: &AdUnit) -> Option<TokenBid> {
        let slot = self.get_bid_and_prefetch(ad_unit)?;
        let price = slot.price();
        let token = self.inner.tokens.add(slot, ad_unit.ad_unit_type());
        Some(TokenBid { token, price })
    }

    /// Redeems a token handed out by [`get_bid_token`](Self::get_bid_token).
    pub fn redeem_token(&self, token: &BidToken, expected_type: AdUnitType) -> Option<TokenValue> {
        self.inner.tokens.get(token, expected_type)
    }

    /// Fetches bids for all valid `ad_units` in one backend call.
    ///
    /// Returns the handle of the scheduled fetch, or `None` when nothing was
    /// scheduled (kill switch, pacing, nothing mappable, all keys in flight).
    pub fn prefetch(&self, ad_units: &[AdUnit]) -> Option<JoinHandle<()>> {
        guarded("prefetch", || {
            if self.inner.kill_switch.is_bidding_disabled() {
                tracing::debug!("bidding disabled by kill switch, skipping prefetch");
                return None;
            }
            let keys = self.inner.mapper.map_all(ad_units);
            if keys.is_empty() {
                return None;
            }
            self.inner.trigger_fetch(keys)
        })
        .flatten()
    }

    /// Asks the backend for a bid and waits at most `timeout` for it.
    ///
    /// `callback` is invoked exactly once, from a runtime worker, or
    /// synchronously when the request is refused up front (kill switch,
    /// invalid ad unit) or paced (served from the cache).
    pub fn request_live_bid<C>(&self, ad_unit: &AdUnit, timeout: Duration, callback: C)
    where
        C: BidResponseCallback + 'static,
    {
        let mut callback: Option<Box<dyn BidResponseCallback>> = Some(Box::new(callback));
        let handled = guarded("request_live_bid", || {
            self.inner.request_live_bid(ad_unit, timeout, &mut callback)
        });
        // A fault before the arbiter took the callback still owes an answer.
        if handled.is_none() {
            answer_no_bid(&mut callback);
        }
    }

    /// Live path when live bidding is enabled, cache path otherwise.
    pub fn get_bid_for_ad_unit<C>(&self, ad_unit: &AdUnit, callback: C)
    where
        C: BidResponseCallback + 'static,
    {
        if self.inner.config.live_bidding_enabled() {
            let budget = self.inner.config.live_time_budget();
            self.request_live_bid(ad_unit, budget, callback);
            return;
        }
        let callback: Box<dyn BidResponseCallback> = Box::new(callback);
        match self.get_bid_and_prefetch(ad_unit) {
            Some(slot) => callback.on_bid_response(slot),
            None => callback.on_no_bid(),
        }
    }

    /// Aborts outstanding background fetches. Fetches that already hold the
    /// cache lock finish their merge; live requests are not affected.
    pub fn on_application_stopped(&self) {
        let tasks = std::mem::take(&mut *self.inner.lock_tasks());
        let pending = tasks.iter().filter(|task| !task.is_finished()).count();
        for task in tasks {
            task.abort();
        }
        tracing::info!(pending, "application stopped, background fetches cancelled");
    }
}

impl Inner {
    fn map(&self, ad_unit: &AdUnit) -> Option<CacheKey> {
        match self.mapper.map(ad_unit) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring bid request for invalid ad unit");
                None
            }
        }
    }

    fn claim_cached_bid(self: &Arc<Self>, ad_unit: &AdUnit) -> Option<CachedBid> {
        if self.kill_switch.is_bidding_disabled() {
            tracing::debug!("bidding disabled by kill switch");
            return None;
        }
        let key = self.map(ad_unit)?;
        self.telemetry.on_bid_requested(&key);

        let now = self.clock.now_ms();
        match self.cache.claim(&key, now) {
            Claim::Silenced => {
                tracing::debug!(%key, "placement silenced, not fetching");
                None
            }
            Claim::Miss => {
                tracing::debug!(%key, "cache miss");
                self.trigger_fetch(vec![key]);
                None
            }
            Claim::Claimed(slot) => {
                self.trigger_fetch(vec![key.clone()]);
                if slot.is_usable(now) {
                    tracing::debug!(%key, cpm = slot.price(), "cache hit");
                    self.telemetry.on_bid_consumed(&key, &slot);
                    Some(slot)
                } else {
                    tracing::debug!(%key, "cached bid expired");
                    None
                }
            }
        }
    }

    /// Schedules one background backend call for `keys`, minus those already in flight.
    fn trigger_fetch(self: &Arc<Self>, keys: Vec<CacheKey>) -> Option<JoinHandle<()>> {
        if self.pacer.is_throttled(self.clock.now_ms()) {
            tracing::debug!(
                next_call_at_ms = ?self.pacer.next_call_at_ms(),
                "backend asked for a pause, skipping fetch"
            );
            return None;
        }
        let keys: Vec<CacheKey> = keys
            .into_iter()
            .filter(|key| self.in_flight.insert(key.clone()))
            .collect();
        if keys.is_empty() {
            return None;
        }

        let fetch = PendingFetch {
            inner: Arc::clone(self),
            keys,
        };
        let handle = self.runtime.spawn(fetch.run());
        let mut tasks = self.lock_tasks();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle.abort_handle());
        Some(handle)
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<AbortHandle>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn request_live_bid(
        self: &Arc<Self>,
        ad_unit: &AdUnit,
        timeout: Duration,
        callback: &mut Option<Box<dyn BidResponseCallback>>,
    ) {
        if self.kill_switch.is_bidding_disabled() {
            tracing::debug!("bidding disabled by kill switch");
            answer_no_bid(callback);
            return;
        }
        let Some(key) = self.map(ad_unit) else {
            answer_no_bid(callback);
            return;
        };
        self.telemetry.on_bid_requested(&key);

        let Some(callback) = callback.take() else {
            return;
        };
        let arbiter = Arc::new(LiveCallArbiter::new(
            key,
            callback,
            Arc::clone(&self.cache),
            Arc::clone(&self.clock),
            Arc::clone(&self.telemetry),
        ));

        if self.pacer.is_throttled(self.clock.now_ms()) {
            tracing::debug!(key = %arbiter.key(), "backend asked for a pause, serving live request from cache");
            arbiter.on_time_budget_exceeded();
            return;
        }

        let timer = {
            let arbiter = Arc::clone(&arbiter);
            self.runtime.spawn(async move {
                tokio::time::sleep(timeout).await;
                arbiter.on_time_budget_exceeded();
            })
        };

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            let keys = std::slice::from_ref(arbiter.key());
            match inner.backend.fetch_bids(keys).await {
                Ok(fetched) => {
                    inner
                        .pacer
                        .apply_hint(inner.clock.now_ms(), fetched.time_to_next_call_secs);
                    arbiter.on_network_response(fetched.slots);
                }
                Err(e) => {
                    inner.telemetry.on_fetch_failed(arbiter.key(), &e.to_string());
                    arbiter.on_network_error(&e);
                }
            }
            timer.abort();
        });
    }
}

/// One background backend call. Dropping it, whether it completed or was
/// aborted, releases its keys for the next fetch.
struct PendingFetch {
    inner: Arc<Inner>,
    keys: Vec<CacheKey>,
}

impl PendingFetch {
    async fn run(self) {
        let inner = &self.inner;
        match inner.backend.fetch_bids(&self.keys).await {
            Ok(fetched) => {
                inner
                    .pacer
                    .apply_hint(inner.clock.now_ms(), fetched.time_to_next_call_secs);
                let stored = inner.cache.upsert(fetched.slots);
                tracing::debug!(requested = self.keys.len(), stored, "background fetch merged");
            }
            Err(e) => {
                tracing::warn!(error = %e, keys = self.keys.len(), "background bid fetch failed");
                let reason = e.to_string();
                for key in &self.keys {
                    inner.telemetry.on_fetch_failed(key, &reason);
                }
            }
        }
    }
}

impl Drop for PendingFetch {
    fn drop(&mut self) {
        for key in &self.keys {
            self.inner.in_flight.remove(key);
        }
    }
}

fn answer_no_bid(callback: &mut Option<Box<dyn BidResponseCallback>>) {
    if let Some(callback) = callback.take() {
        callback.on_no_bid();
    }
}

/// Runs an entry point, turning a panic into a logged `None`.
fn guarded<T>(operation: &str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!(operation, "internal fault, answering no bid");
            None
        }
    }
}
