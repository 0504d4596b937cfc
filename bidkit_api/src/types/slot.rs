use serde::{Deserialize, Serialize};

use super::NativeAssets;

/// One priced answer for one requested impression.
///
/// `cpm` is kept as the raw string the backend sent: parsing and validity
/// rules belong to the consumer, which must treat unparsable values as invalid.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    #[serde(default)]
    pub imp_id: Option<String>,

    #[serde(default)]
    pub placement_id: String,

    #[serde(default)]
    pub zone_id: Option<i64>,

    #[serde(default)]
    pub cpm: Option<String>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub width: i32,

    #[serde(default)]
    pub height: i32,

    #[serde(default)]
    pub display_url: Option<String>,

    #[serde(default)]
    pub native: Option<NativeAssets>,

    /// Time to live in seconds.
    #[serde(default)]
    pub ttl: i64,

    #[serde(default)]
    pub is_video: bool,

    #[serde(default)]
    pub is_rewarded: bool,
}

impl SlotDto {
    /// Parsed price, or `None` when the backend sent something that is not a decimal.
    pub fn cpm_value(&self) -> Option<f64> {
        self.cpm
            .as_deref()
            .and_then(|cpm| cpm.trim().parse::<f64>().ok())
            .filter(|cpm| cpm.is_finite())
    }
}
