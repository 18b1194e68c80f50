//! Audio decoding

mod decode;

pub use decode::{decode_bytes, DecodeError, DecodedAudio};
