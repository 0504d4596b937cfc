use serde::{Deserialize, Serialize};

/// Asset bundle for a native creative, rendered by the embedding app.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativeAssets {
    #[serde(default)]
    pub products: Vec<NativeProduct>,

    pub advertiser: Option<NativeAdvertiser>,

    pub privacy: Option<NativePrivacy>,

    #[serde(default)]
    pub impression_pixels: Vec<PixelDto>,
}

impl NativeAssets {
    /// The first product is the one shown; extra products are carousel candidates.
    pub fn primary_product(&self) -> Option<&NativeProduct> {
        self.products.first()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativeProduct {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub click_url: String,
    #[serde(default)]
    pub call_to_action: String,
    pub image: Option<NativeImage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativeAdvertiser {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain: String,
    pub logo: Option<NativeImage>,
    #[serde(default)]
    pub logo_click_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NativePrivacy {
    #[serde(default)]
    pub optout_click_url: String,
    #[serde(default)]
    pub optout_image_url: String,
    #[serde(default)]
    pub long_legal_text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NativeImage {
    pub url: String,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PixelDto {
    pub url: String,
}
