//! End-to-end behavior of the engine against a scripted backend.
//!
//! Time-sensitive tests run on a paused tokio clock: sleeps complete as soon as
//! the runtime is otherwise idle, so delays are exact and the tests are fast.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bidkit_lib::{
    AdUnit, AdUnitType, BidBackend, BidKitError, CacheKey, CachedBid, EngineConfig,
    FetchOrchestrator, FetchedBids, ManualClock, TelemetryCounters,
};
use tokio::runtime::Handle;
use tokio::time::Instant;

const NOW: i64 = 1_700_000_000_000;

type Script = Box<dyn Fn(usize, &[CacheKey]) -> Result<FetchedBids, BidKitError> + Send + Sync>;

/// Backend whose answers and latency are fixed by the test.
struct ScriptedBackend {
    calls: AtomicUsize,
    latency: Duration,
    script: Script,
}

impl ScriptedBackend {
    fn new(latency: Duration, script: Script) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            latency,
            script,
        })
    }

    /// Answers every key with a display bid at `cpm`.
    fn pricing(latency: Duration, cpm: f64, ttl: i64) -> Arc<Self> {
        Self::new(
            latency,
            Box::new(move |_, keys| {
                Ok(FetchedBids {
                    slots: keys
                        .iter()
                        .map(|key| CachedBid::display(key.clone(), cpm, ttl, "https://c.example.com/a.js", NOW))
                        .collect(),
                    time_to_next_call_secs: 0,
                })
            }),
        )
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BidBackend for ScriptedBackend {
    async fn fetch_bids(&self, keys: &[CacheKey]) -> Result<FetchedBids, BidKitError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        (self.script)(call, keys)
    }
}

fn engine(backend: Arc<ScriptedBackend>) -> FetchOrchestrator {
    FetchOrchestrator::builder(backend)
        .with_clock(Arc::new(ManualClock::new(NOW)))
        .build(Handle::current())
}

fn banner() -> AdUnit {
    AdUnit::banner("home-top", 320, 50)
}

fn seed(engine: &FetchOrchestrator, cpm: f64, ttl: i64) -> CacheKey {
    let key = engine.cache_key(&banner()).unwrap();
    engine
        .cache()
        .upsert(vec![CachedBid::display(key.clone(), cpm, ttl, "https://c.example.com/a.js", NOW)]);
    key
}

/// Collects live outcomes together with the instant they were delivered.
#[derive(Clone, Default)]
struct Outcomes(Arc<Mutex<Vec<(Option<f64>, Instant)>>>);

impl Outcomes {
    fn callback(&self) -> impl FnOnce(Option<CachedBid>) + Send + 'static {
        let sink = Arc::clone(&self.0);
        move |outcome: Option<CachedBid>| {
            sink.lock()
                .unwrap()
                .push((outcome.map(|slot| slot.price()), Instant::now()));
        }
    }

    fn prices(&self) -> Vec<Option<f64>> {
        self.0.lock().unwrap().iter().map(|(price, _)| *price).collect()
    }

    fn delivered_at(&self, index: usize) -> Instant {
        self.0.lock().unwrap()[index].1
    }
}

#[tokio::test(start_paused = true)]
async fn empty_cache_misses_and_fetches_once() {
    let backend = ScriptedBackend::pricing(Duration::from_millis(100), 1.2, 600);
    let engine = engine(backend.clone());

    assert!(engine.get_bid_and_prefetch(&banner()).is_none());
    assert!(engine.get_bid_and_prefetch(&banner()).is_none());
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(backend.calls(), 1);
    let slot = engine.get_bid_and_prefetch(&banner()).unwrap();
    assert_eq!(slot.price(), 1.2);
}

#[tokio::test(start_paused = true)]
async fn cached_bid_is_served_once_then_refetched() {
    let backend = ScriptedBackend::pricing(Duration::from_millis(20), 1.3, 600);
    let engine = engine(backend.clone());
    seed(&engine, 1.2, 600);

    let first = engine.get_bid_and_prefetch(&banner()).unwrap();
    assert_eq!(first.price(), 1.2);
    assert!(engine.get_bid_and_prefetch(&banner()).is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.calls(), 1);
    let refreshed = engine.get_bid_and_prefetch(&banner()).unwrap();
    assert_eq!(refreshed.price(), 1.3);
}

#[tokio::test(start_paused = true)]
async fn silence_blocks_fetching_until_it_expires() {
    let backend = ScriptedBackend::pricing(Duration::ZERO, 1.0, 60);
    let engine = engine(backend.clone());
    let key = engine.cache_key(&banner()).unwrap();
    engine
        .cache()
        .upsert(vec![CachedBid::silence(key.clone(), 600, NOW)]);

    assert!(engine.get_bid_and_prefetch(&banner()).is_none());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(backend.calls(), 0);
    assert!(engine.cache().peek(&key).unwrap().is_silence());
}

#[tokio::test(start_paused = true)]
async fn live_response_beats_time_budget() {
    let backend = ScriptedBackend::pricing(Duration::from_millis(10), 1.2, 600);
    let engine = engine(backend.clone());
    let outcomes = Outcomes::default();
    let start = Instant::now();

    engine.request_live_bid(&banner(), Duration::from_millis(50), outcomes.callback());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(outcomes.prices(), vec![Some(1.2)]);
    let elapsed = outcomes.delivered_at(0) - start;
    assert!(elapsed >= Duration::from_millis(10));
    assert!(elapsed < Duration::from_millis(50));
    // The winning bid went to the caller, not the cache.
    assert!(engine.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn time_budget_beats_slow_live_response() {
    let backend = ScriptedBackend::pricing(Duration::from_millis(50), 1.5, 600);
    let engine = engine(backend.clone());
    let outcomes = Outcomes::default();
    let start = Instant::now();

    engine.request_live_bid(&banner(), Duration::from_millis(10), outcomes.callback());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(outcomes.prices(), vec![None]);
    let elapsed = outcomes.delivered_at(0) - start;
    assert!(elapsed >= Duration::from_millis(10));
    assert!(elapsed < Duration::from_millis(50));

    let late = engine.get_bid_and_prefetch(&banner()).unwrap();
    assert_eq!(late.price(), 1.5);
    assert_eq!(outcomes.prices().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn time_budget_serves_cached_bid() {
    let backend = ScriptedBackend::pricing(Duration::from_millis(50), 1.5, 600);
    let engine = engine(backend.clone());
    seed(&engine, 0.9, 600);
    let outcomes = Outcomes::default();

    engine.request_live_bid(&banner(), Duration::from_millis(10), outcomes.callback());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(outcomes.prices(), vec![Some(0.9)]);
    assert_eq!(engine.get_bid_and_prefetch(&banner()).unwrap().price(), 1.5);
}

#[tokio::test(start_paused = true)]
async fn live_network_error_falls_back_to_cache_immediately() {
    let backend = ScriptedBackend::new(
        Duration::from_millis(5),
        Box::new(|_, _| Err(BidKitError::Api(bidkit_lib::bidkit_api::Error::RequestFailed))),
    );
    let counters = Arc::new(TelemetryCounters::new());
    let engine = FetchOrchestrator::builder(backend.clone())
        .with_clock(Arc::new(ManualClock::new(NOW)))
        .with_telemetry(counters.clone())
        .build(Handle::current());
    seed(&engine, 0.9, 600);
    let outcomes = Outcomes::default();
    let start = Instant::now();

    engine.request_live_bid(&banner(), Duration::from_millis(500), outcomes.callback());
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(outcomes.prices(), vec![Some(0.9)]);
    assert!(outcomes.delivered_at(0) - start < Duration::from_millis(500));
    let summary = counters.summary();
    assert_eq!(summary.fetches_failed, 1);
    assert_eq!(summary.bids_consumed, 1);
}

#[tokio::test(start_paused = true)]
async fn live_silence_answers_no_bid_and_silences_cache_path() {
    let backend = ScriptedBackend::new(
        Duration::from_millis(5),
        Box::new(|_, keys| {
            Ok(FetchedBids {
                slots: vec![CachedBid::silence(keys[0].clone(), 300, NOW)],
                time_to_next_call_secs: 0,
            })
        }),
    );
    let engine = engine(backend.clone());
    let outcomes = Outcomes::default();

    engine.request_live_bid(&banner(), Duration::from_millis(50), outcomes.callback());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(outcomes.prices(), vec![None]);

    assert!(engine.get_bid_and_prefetch(&banner()).is_none());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn live_request_refused_up_front() {
    let backend = ScriptedBackend::pricing(Duration::ZERO, 1.0, 60);
    let engine = engine(backend.clone());

    let outcomes = Outcomes::default();
    engine.request_live_bid(&AdUnit::banner("", 320, 50), Duration::from_millis(50), outcomes.callback());
    assert_eq!(outcomes.prices(), vec![None]);

    engine.config().set_kill_switch(true);
    let outcomes = Outcomes::default();
    engine.request_live_bid(&banner(), Duration::from_millis(50), outcomes.callback());
    assert_eq!(outcomes.prices(), vec![None]);

    tokio::task::yield_now().await;
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn paced_live_request_is_served_from_cache_without_calling() {
    let backend = ScriptedBackend::pricing(Duration::ZERO, 2.0, 60);
    let engine = engine(backend.clone());
    seed(&engine, 0.9, 600);
    engine.pacer().apply_hint(NOW, 60);

    let outcomes = Outcomes::default();
    engine.request_live_bid(&banner(), Duration::from_millis(50), outcomes.callback());
    assert_eq!(outcomes.prices(), vec![Some(0.9)]);

    tokio::task::yield_now().await;
    assert_eq!(backend.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn live_response_sets_pacing_for_background_fetches() {
    let backend = ScriptedBackend::new(
        Duration::from_millis(5),
        Box::new(|_, keys| {
            Ok(FetchedBids {
                slots: vec![CachedBid::display(keys[0].clone(), 1.0, 60, "u", NOW)],
                time_to_next_call_secs: 120,
            })
        }),
    );
    let engine = engine(backend.clone());
    let outcomes = Outcomes::default();

    engine.request_live_bid(&banner(), Duration::from_millis(50), outcomes.callback());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(engine.pacer().next_call_at_ms(), Some(NOW + 120_000));

    assert!(engine.get_bid_and_prefetch(&banner()).is_none());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn live_mode_dispatch_uses_configured_budget() {
    let backend = ScriptedBackend::pricing(Duration::from_millis(200), 1.0, 60);
    let config = EngineConfig::default();
    config.set_live_bidding_enabled(true);
    config.set_live_time_budget(Duration::from_millis(20));
    let engine = FetchOrchestrator::builder(backend.clone())
        .with_clock(Arc::new(ManualClock::new(NOW)))
        .with_config(Arc::new(config))
        .build(Handle::current());
    let outcomes = Outcomes::default();
    let start = Instant::now();

    engine.get_bid_for_ad_unit(&banner(), outcomes.callback());
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(outcomes.prices(), vec![None]);
    let elapsed = outcomes.delivered_at(0) - start;
    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_millis(200));
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn immediate_bid_enters_cache_with_default_ttl() {
    let backend = ScriptedBackend::pricing(Duration::ZERO, 2.0, 0);
    let engine = engine(backend.clone());
    let key = engine.cache_key(&banner()).unwrap();

    engine.prefetch(&[banner()]).unwrap().await.unwrap();
    assert_eq!(engine.cache().peek(&key).unwrap().ttl_secs, 900);

    let slot = engine.get_bid_and_prefetch(&banner()).unwrap();
    assert_eq!(slot.price(), 2.0);
}

#[tokio::test]
async fn unpriced_zero_ttl_slot_is_never_retained() {
    let backend = ScriptedBackend::pricing(Duration::ZERO, 0.0, 0);
    let engine = engine(backend.clone());

    engine.prefetch(&[banner()]).unwrap().await.unwrap();
    assert!(engine.cache().is_empty());
}

#[tokio::test]
async fn loaded_bid_is_consumed_by_exactly_one_thread() {
    let backend = ScriptedBackend::pricing(Duration::ZERO, 1.0, 600);
    let engine = engine(backend.clone());

    for _ in 0..50 {
        seed(&engine, 1.0, 600);
        let bid = Arc::new(engine.load_bid(&banner()).unwrap());
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let bid = Arc::clone(&bid);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    bid.consume_display_url_for(AdUnitType::Banner)
                })
            })
            .collect();
        let payloads: Vec<String> = handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(payloads, vec!["https://c.example.com/a.js".to_string()]);
    }
}
