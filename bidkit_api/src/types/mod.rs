mod response;
pub use self::response::BidResponse;

mod slot;
pub use self::slot::SlotDto;

mod native;
pub use self::native::{
    NativeAdvertiser, NativeAssets, NativeImage, NativePrivacy, NativeProduct, PixelDto,
};
