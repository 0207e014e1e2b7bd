/// Image decoding and frame encoding.
pub mod decode;
/// Campaign asset lookup, decoded image cache and text layout.
pub mod store;

pub use decode::{decode_image, encode_jpeg_premul, encode_png_premul};
pub use store::{AssetStore, PreparedImage, campaign_relative_path, normalize_rel_path};
