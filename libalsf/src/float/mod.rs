//! Lossless floating-point engine
//!
//! Each channel of a frame is divided by a common multiplier (when one
//! exists), converted to `IntRes`-bit integers and rebuilt bit-exactly from
//! those integers plus two residual partitions:
//!
//! - Part A: the verbatim 32-bit pattern of every sample whose integer is 0
//!   (zeros, NaN, infinities, values too small or too large for the shift)
//! - Part B: the distance from each reconstruction up to its sample, in
//!   units of the reconstruction's last place
//!
//! Both partitions go through the masked-LZ coder when that is smaller.

pub mod acf;
pub mod decoder;
pub mod encoder;
pub mod float32;
pub mod quantize;
pub mod state;

pub use acf::{check_acf, estimate_acf};
pub use decoder::{ChannelDecoder, FloatFrameDecoder};
pub use encoder::{ChannelEncodeResult, ChannelEncoder, FloatFrame, FloatFrameEncoder};
pub use float32::{decompose, multiply, power_of_two, recompose, Float32Value};
pub use state::ChannelFrameState;
