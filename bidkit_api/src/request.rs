//! Auction request body and its builder methods.

use serde::Serialize;

/// Identifies the app the request is made from.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    pub bundle_id: String,
    pub cp_id: String,
}

/// Device-level context. Every field is optional; consent handling lives
/// outside this crate and decides what is filled in.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_os: Option<String>,
}

/// One impression to price.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestSlot {
    pub imp_id: String,
    pub placement_id: String,
    pub sizes: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_native: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub interstitial: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub rewarded: bool,
}

impl RequestSlot {
    /// Creates a slot for a single formatted size such as `320x50`.
    pub fn new(imp_id: &str, placement_id: &str, size: &str) -> Self {
        Self {
            imp_id: imp_id.to_string(),
            placement_id: placement_id.to_string(),
            sizes: vec![size.to_string()],
            ..Self::default()
        }
    }

    /// Marks the slot as a native placement.
    pub fn native(mut self) -> Self {
        self.is_native = true;
        self
    }

    /// Marks the slot as a full-screen placement.
    pub fn interstitial(mut self) -> Self {
        self.interstitial = true;
        self
    }

    /// Marks the slot as a rewarded full-screen placement.
    pub fn rewarded(mut self) -> Self {
        self.interstitial = true;
        self.rewarded = true;
        self
    }
}

/// Body of `POST /inapp/v2`.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidRequest {
    pub id: String,
    pub publisher: Publisher,
    pub user: User,
    pub sdk_version: String,
    pub profile_id: i32,
    pub slots: Vec<RequestSlot>,
}

impl BidRequest {
    /// Starts a request with the given id and publisher and no slots.
    pub fn new(id: &str, publisher: Publisher) -> Self {
        Self {
            id: id.to_string(),
            publisher,
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            ..Self::default()
        }
    }

    /// Sets the device context.
    pub fn with_user(mut self, user: User) -> Self {
        self.user = user;
        self
    }

    /// Sets the integration profile the backend uses for reporting.
    pub fn with_profile_id(mut self, profile_id: i32) -> Self {
        self.profile_id = profile_id;
        self
    }

    /// Appends one impression to price.
    pub fn with_slot(mut self, slot: RequestSlot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Finds the requested slot a response slot answers.
    pub fn slot_by_imp_id(&self, imp_id: &str) -> Option<&RequestSlot> {
        self.slots.iter().find(|slot| slot.imp_id == imp_id)
    }
}
