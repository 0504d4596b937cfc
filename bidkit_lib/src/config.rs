//! Engine configuration.
//!
//! Static settings are plain fields. Flags a remote-config refresh may flip at
//! runtime (kill switch, live bidding, time budget) are atomics, so readers on
//! the hot path never take a lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::ad_unit::AdSize;

/// Window assigned to an immediate bid (positive price, zero ttl) when it enters the cache.
pub const DEFAULT_IMMEDIATE_BID_TTL: Duration = Duration::from_secs(15 * 60);

/// How long a live caller waits for the network before falling back to the cache.
pub const DEFAULT_LIVE_TIME_BUDGET: Duration = Duration::from_millis(8_000);

/// Screen size assumed for full-screen units until the host app provides one.
pub const DEFAULT_SCREEN_SIZE: AdSize = AdSize::new(360, 640);

/// Answers whether all outgoing bidding calls are disabled.
///
/// Polled synchronously on every entry point; implementations must be cheap
/// and free of side effects.
pub trait KillSwitch: Send + Sync {
    fn is_bidding_disabled(&self) -> bool;
}

#[derive(Debug)]
pub struct EngineConfig {
    kill_switch: AtomicBool,
    live_bidding_enabled: AtomicBool,
    live_time_budget_ms: AtomicU64,
    /// Ttl written onto immediate bids at cache-entry time.
    pub immediate_bid_ttl: Duration,
    /// Size used for interstitial and rewarded units.
    pub screen_size: AdSize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kill_switch: AtomicBool::new(false),
            live_bidding_enabled: AtomicBool::new(false),
            live_time_budget_ms: AtomicU64::new(DEFAULT_LIVE_TIME_BUDGET.as_millis() as u64),
            immediate_bid_ttl: DEFAULT_IMMEDIATE_BID_TTL,
            screen_size: DEFAULT_SCREEN_SIZE,
        }
    }
}

impl EngineConfig {
    /// Reads overrides from the process environment.
    ///
    /// - `BIDKIT_KILL_SWITCH` (bool)
    /// - `BIDKIT_LIVE_BIDDING` (bool)
    /// - `BIDKIT_LIVE_TIME_BUDGET_MS` (u64)
    /// - `BIDKIT_IMMEDIATE_TTL_SECS` (u64)
    /// - `BIDKIT_SCREEN_SIZE` (`WIDTHxHEIGHT`)
    ///
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        // A zero window would store immediate bids that are never usable.
        let immediate_secs = match lookup_u64(
            &lookup,
            "BIDKIT_IMMEDIATE_TTL_SECS",
            defaults.immediate_bid_ttl.as_secs(),
        ) {
            0 => defaults.immediate_bid_ttl.as_secs(),
            secs => secs,
        };
        let screen_size = lookup("BIDKIT_SCREEN_SIZE")
            .and_then(|val| val.parse::<AdSize>().ok())
            .filter(AdSize::is_positive)
            .unwrap_or(defaults.screen_size);
        let config = Self {
            immediate_bid_ttl: Duration::from_secs(immediate_secs),
            screen_size,
            ..defaults
        };
        config.set_kill_switch(lookup_bool(&lookup, "BIDKIT_KILL_SWITCH", false));
        config.set_live_bidding_enabled(lookup_bool(&lookup, "BIDKIT_LIVE_BIDDING", false));
        config.set_live_time_budget(Duration::from_millis(lookup_u64(
            &lookup,
            "BIDKIT_LIVE_TIME_BUDGET_MS",
            DEFAULT_LIVE_TIME_BUDGET.as_millis() as u64,
        )));
        config
    }

    pub fn set_kill_switch(&self, engaged: bool) {
        self.kill_switch.store(engaged, Ordering::Release);
    }

    pub fn live_bidding_enabled(&self) -> bool {
        self.live_bidding_enabled.load(Ordering::Acquire)
    }

    pub fn set_live_bidding_enabled(&self, enabled: bool) {
        self.live_bidding_enabled.store(enabled, Ordering::Release);
    }

    pub fn live_time_budget(&self) -> Duration {
        Duration::from_millis(self.live_time_budget_ms.load(Ordering::Acquire))
    }

    pub fn set_live_time_budget(&self, budget: Duration) {
        self.live_time_budget_ms
            .store(budget.as_millis() as u64, Ordering::Release);
    }
}

impl KillSwitch for EngineConfig {
    fn is_bidding_disabled(&self) -> bool {
        self.kill_switch.load(Ordering::Acquire)
    }
}

fn lookup_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|val| val.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn lookup_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|val| val.trim().to_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
