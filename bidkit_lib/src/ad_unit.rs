//! Publisher-facing ad units and their mapping to cache keys.
//!
//! An [`AdUnit`] is what the embedding app asks for; a [`CacheKey`] is the
//! normalized identity the cache and the backend agree on. Mapping rejects
//! anything the backend could never price (empty placement, zero-sized slot).

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::BidKitError;

/// Maximum accepted placement id length, in bytes.
pub const MAX_PLACEMENT_ID_LENGTH: usize = 256;

/// Size requested for every native placement. Native creatives are laid out
/// by the app, so the backend only needs a marker size.
pub const NATIVE_SIZE: AdSize = AdSize {
    width: 2,
    height: 2,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdUnitType {
    Banner,
    Interstitial,
    Native,
    Rewarded,
}

impl fmt::Display for AdUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Banner => "banner",
            Self::Interstitial => "interstitial",
            Self::Native => "native",
            Self::Rewarded => "rewarded",
        };
        f.write_str(name)
    }
}

impl FromStr for AdUnitType {
    type Err = BidKitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "banner" | "b" => Ok(Self::Banner),
            "interstitial" | "i" => Ok(Self::Interstitial),
            "native" | "n" => Ok(Self::Native),
            "rewarded" | "r" => Ok(Self::Rewarded),
            _ => Err(BidKitError::InvalidInput(format!(
                "unknown ad unit type '{}'. Valid values: banner, interstitial, native, rewarded",
                s
            ))),
        }
    }
}

/// Pixel dimensions of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AdSize {
    pub width: i32,
    pub height: i32,
}

impl AdSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Wire form, e.g. `320x50`.
    pub fn formatted(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl fmt::Display for AdSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for AdSize {
    type Err = BidKitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            BidKitError::InvalidInput(format!(
                "invalid size '{}'. Expected WIDTHxHEIGHT, e.g. 320x50",
                s
            ))
        };
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse::<i32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self { width, height })
    }
}

/// A placement as the embedding app describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdUnit {
    Banner { placement_id: String, size: AdSize },
    Interstitial { placement_id: String },
    Native { placement_id: String },
    Rewarded { placement_id: String },
}

impl AdUnit {
    pub fn banner(placement_id: &str, width: i32, height: i32) -> Self {
        Self::Banner {
            placement_id: placement_id.to_string(),
            size: AdSize::new(width, height),
        }
    }

    pub fn interstitial(placement_id: &str) -> Self {
        Self::Interstitial {
            placement_id: placement_id.to_string(),
        }
    }

    pub fn native(placement_id: &str) -> Self {
        Self::Native {
            placement_id: placement_id.to_string(),
        }
    }

    pub fn rewarded(placement_id: &str) -> Self {
        Self::Rewarded {
            placement_id: placement_id.to_string(),
        }
    }

    pub fn placement_id(&self) -> &str {
        match self {
            Self::Banner { placement_id, .. }
            | Self::Interstitial { placement_id }
            | Self::Native { placement_id }
            | Self::Rewarded { placement_id } => placement_id,
        }
    }

    pub fn ad_unit_type(&self) -> AdUnitType {
        match self {
            Self::Banner { .. } => AdUnitType::Banner,
            Self::Interstitial { .. } => AdUnitType::Interstitial,
            Self::Native { .. } => AdUnitType::Native,
            Self::Rewarded { .. } => AdUnitType::Rewarded,
        }
    }
}

/// Parses `TYPE:PLACEMENT[:WxH]`, e.g. `banner:home-top:320x50` or `native:feed`.
/// The size is required for banners and ignored otherwise.
impl FromStr for AdUnit {
    type Err = BidKitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, ':');
        let kind: AdUnitType = parts.next().unwrap_or_default().parse()?;
        let placement_id = parts.next().unwrap_or_default().trim();
        if placement_id.is_empty() {
            return Err(BidKitError::InvalidInput(format!(
                "ad unit '{}' has no placement id. Expected TYPE:PLACEMENT[:WxH]",
                s
            )));
        }
        let size = parts.next();
        Ok(match kind {
            AdUnitType::Banner => {
                let size = size.ok_or_else(|| {
                    BidKitError::InvalidInput(format!(
                        "banner ad unit '{}' needs a size, e.g. banner:{}:320x50",
                        s, placement_id
                    ))
                })?;
                Self::Banner {
                    placement_id: placement_id.to_string(),
                    size: size.parse()?,
                }
            }
            AdUnitType::Interstitial => Self::interstitial(placement_id),
            AdUnitType::Native => Self::native(placement_id),
            AdUnitType::Rewarded => Self::rewarded(placement_id),
        })
    }
}

/// Normalized identity of a placement in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub placement_id: String,
    pub formatted_size: String,
    pub ad_unit_type: AdUnitType,
}

impl CacheKey {
    pub fn new(placement_id: &str, size: AdSize, ad_unit_type: AdUnitType) -> Self {
        Self {
            placement_id: placement_id.to_string(),
            formatted_size: size.formatted(),
            ad_unit_type,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.ad_unit_type, self.placement_id, self.formatted_size
        )
    }
}

/// Maps ad units to cache keys. Full-screen units take the device screen size.
#[derive(Debug, Clone)]
pub struct AdUnitMapper {
    screen_size: AdSize,
}

impl AdUnitMapper {
    pub fn new(screen_size: AdSize) -> Self {
        Self { screen_size }
    }

    pub fn map(&self, ad_unit: &AdUnit) -> Result<CacheKey, BidKitError> {
        let placement_id = validate_placement_id(ad_unit.placement_id())?;
        let size = match ad_unit {
            AdUnit::Banner { size, .. } => *size,
            AdUnit::Interstitial { .. } | AdUnit::Rewarded { .. } => self.screen_size,
            AdUnit::Native { .. } => NATIVE_SIZE,
        };
        if !size.is_positive() {
            return Err(BidKitError::InvalidAdUnit(format!(
                "{} placement '{}' has non-positive size {}",
                ad_unit.ad_unit_type(),
                placement_id,
                size
            )));
        }
        Ok(CacheKey::new(placement_id, size, ad_unit.ad_unit_type()))
    }

    /// Maps every valid unit, logging and skipping the rest. Duplicates are dropped.
    pub fn map_all(&self, ad_units: &[AdUnit]) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = Vec::with_capacity(ad_units.len());
        for ad_unit in ad_units {
            match self.map(ad_unit) {
                Ok(key) if !keys.contains(&key) => keys.push(key),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unmappable ad unit"),
            }
        }
        keys
    }
}

/// Validate a placement id: non-empty after trimming and bounded in length.
pub fn validate_placement_id(input: &str) -> Result<&str, BidKitError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(BidKitError::InvalidAdUnit(
            "placement id is empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_PLACEMENT_ID_LENGTH {
        return Err(BidKitError::InvalidAdUnit(format!(
            "placement id exceeds maximum length of {} bytes",
            MAX_PLACEMENT_ID_LENGTH
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
#[path = "ad_unit_tests.rs"]
mod tests;
