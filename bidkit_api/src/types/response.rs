use serde::{Deserialize, Serialize};

use super::SlotDto;

/// Body of a successful auction call.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BidResponse {
    #[serde(default)]
    pub slots: Vec<SlotDto>,

    /// Pacing hint in seconds. While it has not elapsed the client must not
    /// call the backend again. Zero or absent means no restriction.
    #[serde(default)]
    pub time_to_next_call: i64,
}
