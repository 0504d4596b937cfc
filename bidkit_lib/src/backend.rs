//! The auction backend as the engine sees it, and its HTTP implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bidkit_api::{BidRequest, Client, Publisher, RequestSlot, User};

use crate::ad_unit::{AdUnitType, CacheKey};
use crate::clock::Clock;
use crate::error::BidKitError;
use crate::slot::CachedBid;

/// Slots returned by one backend call, with the backend's pacing hint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedBids {
    pub slots: Vec<CachedBid>,
    /// Seconds before the backend may be called again. Zero means no restriction.
    pub time_to_next_call_secs: i64,
}

/// Performs the actual auction call. Implementations must be cancel-safe:
/// the engine may drop the future at any await point.
#[async_trait]
pub trait BidBackend: Send + Sync {
    async fn fetch_bids(&self, keys: &[CacheKey]) -> Result<FetchedBids, BidKitError>;
}

/// [`BidBackend`] over the HTTP auction API.
pub struct HttpBidBackend {
    client: Client,
    publisher: Publisher,
    user: User,
    profile_id: i32,
    clock: Arc<dyn Clock>,
}

impl HttpBidBackend {
    pub fn new(client: Client, publisher: Publisher, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            publisher,
            user: User::default(),
            profile_id: 0,
            clock,
        }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    pub fn with_profile_id(mut self, profile_id: i32) -> Self {
        self.profile_id = profile_id;
        self
    }

    fn build_request(&self, keys: &[CacheKey]) -> (BidRequest, HashMap<String, CacheKey>) {
        let mut by_imp_id = HashMap::with_capacity(keys.len());
        let mut request = BidRequest::new(&uuid::Uuid::new_v4().to_string(), self.publisher.clone())
            .with_user(self.user.clone())
            .with_profile_id(self.profile_id);
        for key in keys {
            let imp_id = uuid::Uuid::new_v4().to_string();
            let slot = RequestSlot::new(&imp_id, &key.placement_id, &key.formatted_size);
            let slot = match key.ad_unit_type {
                AdUnitType::Banner => slot,
                AdUnitType::Interstitial => slot.interstitial(),
                AdUnitType::Native => slot.native(),
                AdUnitType::Rewarded => slot.rewarded(),
            };
            request = request.with_slot(slot);
            by_imp_id.insert(imp_id, key.clone());
        }
        (request, by_imp_id)
    }
}

#[async_trait]
impl BidBackend for HttpBidBackend {
    async fn fetch_bids(&self, keys: &[CacheKey]) -> Result<FetchedBids, BidKitError> {
        let (request, by_imp_id) = self.build_request(keys);
        let response = self.client.fetch_bids(&request).await?;
        let downloaded_at = self.clock.now_ms();

        let mut slots = Vec::with_capacity(response.slots.len());
        for dto in response.slots {
            // Older backends omit the impression id; fall back to the placement.
            let key = dto
                .imp_id
                .as_deref()
                .and_then(|imp_id| by_imp_id.get(imp_id))
                .or_else(|| keys.iter().find(|k| k.placement_id == dto.placement_id));
            match key {
                Some(key) => slots.push(CachedBid::from_dto(key.clone(), dto, downloaded_at)),
                None => tracing::warn!(
                    placement = %dto.placement_id,
                    imp_id = ?dto.imp_id,
                    "dropping slot that answers no requested key"
                ),
            }
        }

        Ok(FetchedBids {
            slots,
            time_to_next_call_secs: response.time_to_next_call,
        })
    }
}
