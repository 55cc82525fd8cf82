//! Screenshot handling — public API.
//!
//! `crop` is the pure core (scale derivation, crop plan, encoding),
//! `data_uri` is the wire form images travel in, and `screenshot` is the
//! OS capture backend used by the desktop rendition.

mod crop;
pub mod data_uri;
#[cfg(feature = "desktop")]
pub mod screenshot;

pub use crop::{
    crop_encoded, crop_screenshot, crop_to_png_bytes, encode_for_download, CropError, CropPlan,
    CroppedImage, ScaleFactors,
};
