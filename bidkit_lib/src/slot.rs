//! A priced bid as the engine stores it, plus its validity rules.

use std::time::Duration;

use bidkit_api::types::{NativeAssets, SlotDto};
use serde::Serialize;

use crate::ad_unit::CacheKey;

/// What the app renders when the bid wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Creative {
    Display { url: String },
    Native(NativeAssets),
}

/// One priced creative plus its ttl metadata.
///
/// | cpm   | ttl  | meaning |
/// |-------|------|---------|
/// | > 0   | > 0  | regular bid, usable until `downloaded_at + ttl` |
/// | > 0   | 0    | immediate bid, gets the default window on cache entry |
/// | 0     | > 0  | silence: no bid, do not ask again until it expires |
/// | 0     | 0    | invalid |
///
/// A missing, unparsable or negative cpm is invalid as well.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedBid {
    pub key: CacheKey,
    pub impression_id: Option<String>,
    /// `None` when the backend sent no price or one that does not parse.
    pub cpm: Option<f64>,
    pub currency: Option<String>,
    pub width: i32,
    pub height: i32,
    pub ttl_secs: i64,
    pub creative: Option<Creative>,
    pub downloaded_at_ms: i64,
    pub is_video: bool,
    pub is_rewarded: bool,
}

impl CachedBid {
    /// Converts a wire slot answered for `key`.
    pub fn from_dto(key: CacheKey, dto: SlotDto, downloaded_at_ms: i64) -> Self {
        let cpm = dto.cpm_value();
        let creative = match (dto.display_url, dto.native) {
            (_, Some(native)) => Some(Creative::Native(native)),
            (Some(url), None) if !url.trim().is_empty() => Some(Creative::Display { url }),
            _ => None,
        };
        Self {
            key,
            impression_id: dto.imp_id,
            cpm,
            currency: dto.currency,
            width: dto.width,
            height: dto.height,
            ttl_secs: dto.ttl,
            creative,
            downloaded_at_ms,
            is_video: dto.is_video,
            is_rewarded: dto.is_rewarded,
        }
    }

    /// A display bid. Mostly useful to seed caches in tests and tools.
    pub fn display(key: CacheKey, cpm: f64, ttl_secs: i64, url: &str, downloaded_at_ms: i64) -> Self {
        Self {
            key,
            impression_id: None,
            cpm: Some(cpm),
            currency: Some("USD".to_string()),
            width: 0,
            height: 0,
            ttl_secs,
            creative: Some(Creative::Display {
                url: url.to_string(),
            }),
            downloaded_at_ms,
            is_video: false,
            is_rewarded: false,
        }
    }

    /// A silence answer: zero price, non-zero ttl.
    pub fn silence(key: CacheKey, ttl_secs: i64, downloaded_at_ms: i64) -> Self {
        Self {
            cpm: Some(0.0),
            creative: None,
            ..Self::display(key, 0.0, ttl_secs, "", downloaded_at_ms)
        }
    }

    /// Price, with invalid prices reported as zero.
    pub fn price(&self) -> f64 {
        self.cpm.unwrap_or(0.0)
    }

    pub fn is_valid(&self) -> bool {
        let Some(cpm) = self.cpm else {
            return false;
        };
        if cpm < 0.0 || self.ttl_secs < 0 {
            return false;
        }
        if cpm == 0.0 {
            return self.ttl_secs > 0;
        }
        self.creative.is_some()
    }

    pub fn is_silence(&self) -> bool {
        self.cpm == Some(0.0) && self.ttl_secs > 0
    }

    pub fn is_immediate(&self) -> bool {
        self.price() > 0.0 && self.ttl_secs == 0
    }

    pub fn expiry_ms(&self) -> i64 {
        self.downloaded_at_ms
            .saturating_add(self.ttl_secs.saturating_mul(1000))
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expiry_ms()
    }

    /// Whether the bid can be shown right now.
    pub fn is_usable(&self, now_ms: i64) -> bool {
        self.price() > 0.0 && self.ttl_secs > 0 && !self.is_expired(now_ms)
    }

    /// Rewrites the ttl of an immediate bid; any other bid is returned as is.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        if self.is_immediate() {
            self.ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        }
        self
    }

    pub fn display_url(&self) -> Option<&str> {
        match &self.creative {
            Some(Creative::Display { url }) => Some(url),
            _ => None,
        }
    }

    pub fn native_assets(&self) -> Option<&NativeAssets> {
        match &self.creative {
            Some(Creative::Native(assets)) => Some(assets),
            _ => None,
        }
    }
}
