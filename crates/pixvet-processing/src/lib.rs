//! Pixvet Processing Library
//!
//! The image codec gateway and the two boundary conversions of the ingest
//! pipeline. The gateway wraps the `image` and `webp` crates behind a narrow
//! capability trait with enforced decode limits, so the rest of the system
//! (and its tests) never touch the codec libraries directly.

pub mod codec;
pub mod convert;

pub use codec::{Codec, CodecError, CodecLimits, DecodedImage, EncodeParams, ImageCodec};
pub use convert::{
    classify_decode_error, classify_encode_error, to_scan_compatible, to_storage_format,
    webp_encode_params,
};
