//! Opaque one-shot tokens standing in for a cached bid.
//!
//! Header-bidding integrations pass a token through a third-party ad server
//! instead of the bid itself, and redeem it when the engine's line item wins.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::ad_unit::AdUnitType;
use crate::clock::Clock;
use crate::error::BidKitError;
use crate::slot::CachedBid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BidToken(Uuid);

impl BidToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BidToken {
    type Err = BidKitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| BidKitError::InvalidInput(format!("invalid bid token '{}': {}", s, e)))
    }
}

/// What a token redeems to.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenValue {
    pub slot: CachedBid,
    pub ad_unit_type: AdUnitType,
    pub expires_at_ms: i64,
}

impl TokenValue {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

/// Token to value map with strictly one lookup per token.
pub struct TokenCache {
    entries: DashMap<BidToken, TokenValue>,
    clock: Arc<dyn Clock>,
}

impl TokenCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Stores `slot` behind a fresh token. The token expires with the slot.
    ///
    /// Expired tokens that were never redeemed are dropped here.
    pub fn add(&self, slot: CachedBid, ad_unit_type: AdUnitType) -> BidToken {
        let now = self.clock.now_ms();
        self.entries.retain(|_, value| !value.is_expired(now));

        let token = BidToken::new();
        let value = TokenValue {
            expires_at_ms: slot.expiry_ms(),
            slot,
            ad_unit_type,
        };
        self.entries.insert(token, value);
        token
    }

    /// Redeems `token`. The entry is removed whether or not it validates, so
    /// an expired or mismatched token cannot be tried twice.
    pub fn get(&self, token: &BidToken, expected_type: AdUnitType) -> Option<TokenValue> {
        let (_, value) = self.entries.remove(token)?;
        if value.is_expired(self.clock.now_ms()) {
            tracing::debug!(%token, "bid token expired");
            return None;
        }
        if value.ad_unit_type != expected_type {
            tracing::debug!(%token, expected = %expected_type, actual = %value.ad_unit_type, "bid token type mismatch");
            return None;
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
