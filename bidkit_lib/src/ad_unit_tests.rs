use super::*;

fn mapper() -> AdUnitMapper {
    AdUnitMapper::new(AdSize::new(360, 640))
}

// -- Mapping --

#[test]
fn banner_maps_to_its_own_size() {
    let key = mapper().map(&AdUnit::banner("home-top", 320, 50)).unwrap();
    assert_eq!(key.placement_id, "home-top");
    assert_eq!(key.formatted_size, "320x50");
    assert_eq!(key.ad_unit_type, AdUnitType::Banner);
}

#[test]
fn interstitial_and_rewarded_take_screen_size() {
    let key = mapper().map(&AdUnit::interstitial("inter")).unwrap();
    assert_eq!(key.formatted_size, "360x640");
    assert_eq!(key.ad_unit_type, AdUnitType::Interstitial);

    let key = mapper().map(&AdUnit::rewarded("reward")).unwrap();
    assert_eq!(key.formatted_size, "360x640");
    assert_eq!(key.ad_unit_type, AdUnitType::Rewarded);
}

#[test]
fn native_uses_marker_size() {
    let key = mapper().map(&AdUnit::native("feed")).unwrap();
    assert_eq!(key.formatted_size, "2x2");
}

#[test]
fn placement_id_is_trimmed() {
    let key = mapper().map(&AdUnit::native("  feed ")).unwrap();
    assert_eq!(key.placement_id, "feed");
}

#[test]
fn empty_placement_is_invalid() {
    let err = mapper().map(&AdUnit::banner("   ", 320, 50)).unwrap_err();
    assert!(matches!(err, BidKitError::InvalidAdUnit(_)));
}

#[test]
fn oversized_placement_is_invalid() {
    let long = "p".repeat(MAX_PLACEMENT_ID_LENGTH + 1);
    assert!(mapper().map(&AdUnit::native(&long)).is_err());
}

#[test]
fn non_positive_banner_size_is_invalid() {
    assert!(mapper().map(&AdUnit::banner("b", 0, 50)).is_err());
    assert!(mapper().map(&AdUnit::banner("b", 320, -1)).is_err());
}

#[test]
fn unknown_screen_size_rejects_full_screen_units() {
    let mapper = AdUnitMapper::new(AdSize::new(0, 0));
    assert!(mapper.map(&AdUnit::interstitial("inter")).is_err());
    assert!(mapper.map(&AdUnit::banner("b", 320, 50)).is_ok());
}

#[test]
fn map_all_skips_invalid_and_duplicates() {
    let keys = mapper().map_all(&[
        AdUnit::banner("a", 320, 50),
        AdUnit::banner("", 320, 50),
        AdUnit::banner("a", 320, 50),
        AdUnit::native("n"),
    ]);
    assert_eq!(keys.len(), 2);
}

#[test]
fn same_placement_different_type_is_a_different_key() {
    let banner = mapper().map(&AdUnit::banner("p", 360, 640)).unwrap();
    let inter = mapper().map(&AdUnit::interstitial("p")).unwrap();
    assert_ne!(banner, inter);
}

// -- Parsing --

#[test]
fn parse_banner() {
    let unit: AdUnit = "banner:home-top:320x50".parse().unwrap();
    assert_eq!(unit, AdUnit::banner("home-top", 320, 50));
}

#[test]
fn parse_short_type_names() {
    assert_eq!("n:feed".parse::<AdUnit>().unwrap(), AdUnit::native("feed"));
    assert_eq!(
        "I:splash".parse::<AdUnit>().unwrap(),
        AdUnit::interstitial("splash")
    );
    assert_eq!(
        "rewarded:coins".parse::<AdUnit>().unwrap(),
        AdUnit::rewarded("coins")
    );
}

#[test]
fn parse_banner_without_size_fails() {
    assert!("banner:home-top".parse::<AdUnit>().is_err());
}

#[test]
fn parse_missing_placement_fails() {
    assert!("native:".parse::<AdUnit>().is_err());
    assert!("native".parse::<AdUnit>().is_err());
}

#[test]
fn parse_unknown_type_fails() {
    assert!("video:p".parse::<AdUnit>().is_err());
}

#[test]
fn parse_size() {
    assert_eq!("300X250".parse::<AdSize>().unwrap(), AdSize::new(300, 250));
    assert!("300".parse::<AdSize>().is_err());
    assert!("axb".parse::<AdSize>().is_err());
}

#[test]
fn cache_key_display() {
    let key = CacheKey::new("p", AdSize::new(320, 50), AdUnitType::Banner);
    assert_eq!(key.to_string(), "banner:p:320x50");
}
