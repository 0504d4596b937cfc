//! Single-use bid handed to the embedding app.

use std::sync::{Arc, Mutex};

use bidkit_api::types::NativeAssets;

use crate::ad_unit::AdUnitType;
use crate::clock::Clock;
use crate::slot::CachedBid;

/// A bid the caller owns until it is consumed.
///
/// The price stays readable forever; the slot itself can be taken at most
/// once. A consumed or expired bid yields `None` from every `consume*` call,
/// indistinguishable from never having had a bid.
pub struct Bid {
    price: f64,
    ad_unit_type: AdUnitType,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<CachedBid>>,
}

impl Bid {
    pub fn new(ad_unit_type: AdUnitType, slot: CachedBid, clock: Arc<dyn Clock>) -> Self {
        Self {
            price: slot.price(),
            ad_unit_type,
            clock,
            slot: Mutex::new(Some(slot)),
        }
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn ad_unit_type(&self) -> AdUnitType {
        self.ad_unit_type
    }

    pub fn is_consumed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Takes the slot and applies `projection` to it.
    ///
    /// Returns `None` without calling `projection` when the bid was already
    /// consumed or has expired. Expired bids are not taken.
    pub fn consume<T, F>(&self, projection: F) -> Option<T>
    where
        F: FnOnce(CachedBid) -> T,
    {
        let slot = {
            let mut guard = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            if guard
                .as_ref()
                .is_some_and(|slot| slot.is_expired(self.clock.now_ms()))
            {
                return None;
            }
            guard.take()?
        };
        Some(projection(slot))
    }

    /// Display URL for a unit of `ad_unit_type`. A type mismatch leaves the bid untouched.
    pub fn consume_display_url_for(&self, ad_unit_type: AdUnitType) -> Option<String> {
        if ad_unit_type != self.ad_unit_type || ad_unit_type == AdUnitType::Native {
            return None;
        }
        self.consume(|slot| slot.display_url().map(str::to_owned))
            .flatten()
    }

    /// Native assets, for native bids only.
    pub fn consume_native_assets(&self) -> Option<NativeAssets> {
        if self.ad_unit_type != AdUnitType::Native {
            return None;
        }
        self.consume(|slot| slot.native_assets().cloned()).flatten()
    }
}

impl std::fmt::Debug for Bid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bid")
            .field("price", &self.price)
            .field("ad_unit_type", &self.ad_unit_type)
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
