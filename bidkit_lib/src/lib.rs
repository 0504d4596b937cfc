//! Client-side bid acquisition engine.
//!
//! Keeps a cache of auction results keyed by ad unit, refreshes it in the
//! background under the backend's pacing hints, and serves bids either
//! straight from the cache or from a live auction raced against a time budget.
//!
//! Wire types and the HTTP client live in the `bidkit_api` crate.

pub mod ad_unit;
pub mod backend;
pub mod bid;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod live;
pub mod orchestrator;
pub mod pacing;
pub mod slot;
pub mod telemetry;
pub mod token;

pub use bidkit_api;

pub use ad_unit::{AdSize, AdUnit, AdUnitMapper, AdUnitType, CacheKey};
pub use backend::{BidBackend, FetchedBids, HttpBidBackend};
pub use bid::Bid;
pub use cache::{BidCache, Claim};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, KillSwitch};
pub use error::BidKitError;
pub use live::{BidResponseCallback, LiveCallArbiter};
pub use orchestrator::{FetchOrchestrator, FetchOrchestratorBuilder, TokenBid};
pub use pacing::CallPacer;
pub use slot::{CachedBid, Creative};
pub use telemetry::{BidTelemetry, NoopTelemetry, TelemetryCounters, TelemetrySummary, TracingTelemetry};
pub use token::{BidToken, TokenCache, TokenValue};
