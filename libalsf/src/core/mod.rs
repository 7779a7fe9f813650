pub mod bits;
pub mod metadata;
pub mod rice;
pub mod types;

pub use bits::{BitReader, BitWriter};
pub use metadata::StreamMetadata;
pub use rice::{
    decode as rice_decode, encode as rice_encode, encoded_len as rice_encoded_len,
    estimate_rice_parameter,
};
pub use types::*;
