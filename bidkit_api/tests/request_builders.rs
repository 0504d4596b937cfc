use bidkit_api::{BidRequest, Publisher, RequestSlot, User};

fn publisher() -> Publisher {
    Publisher {
        bundle_id: "com.example.app".to_string(),
        cp_id: "B-000001".to_string(),
    }
}

#[test]
fn request_defaults() {
    let request = BidRequest::new("req-1", publisher());
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["id"], "req-1");
    assert_eq!(json["publisher"]["bundleId"], "com.example.app");
    assert_eq!(json["publisher"]["cpId"], "B-000001");
    assert_eq!(json["sdkVersion"], env!("CARGO_PKG_VERSION"));
    assert!(json["slots"].as_array().unwrap().is_empty());
    assert!(json["user"].as_object().unwrap().is_empty());
}

#[test]
fn banner_slot_omits_false_flags() {
    let request = BidRequest::new("req-1", publisher())
        .with_slot(RequestSlot::new("imp-1", "adunit-banner", "320x50"));
    let json = serde_json::to_value(&request).unwrap();
    let slot = &json["slots"][0];
    assert_eq!(slot["impId"], "imp-1");
    assert_eq!(slot["placementId"], "adunit-banner");
    assert_eq!(slot["sizes"][0], "320x50");
    assert!(slot.get("isNative").is_none());
    assert!(slot.get("interstitial").is_none());
    assert!(slot.get("rewarded").is_none());
}

#[test]
fn flagged_slots() {
    let request = BidRequest::new("req-2", publisher())
        .with_profile_id(235)
        .with_user(User {
            device_id: Some("device-1".to_string()),
            device_os: Some("android".to_string()),
        })
        .with_slot(RequestSlot::new("imp-n", "adunit-native", "2x2").native())
        .with_slot(RequestSlot::new("imp-r", "adunit-rewarded", "360x640").rewarded());
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["profileId"], 235);
    assert_eq!(json["user"]["deviceId"], "device-1");
    assert_eq!(json["slots"][0]["isNative"], true);
    assert_eq!(json["slots"][1]["interstitial"], true);
    assert_eq!(json["slots"][1]["rewarded"], true);
}

#[test]
fn slot_lookup_by_imp_id() {
    let request = BidRequest::new("req-3", publisher())
        .with_slot(RequestSlot::new("a", "p1", "320x50"))
        .with_slot(RequestSlot::new("b", "p2", "300x250"));
    assert_eq!(request.slot_by_imp_id("b").unwrap().placement_id, "p2");
    assert!(request.slot_by_imp_id("c").is_none());
}
