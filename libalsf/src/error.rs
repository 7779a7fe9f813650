//! Error types for the ALSF codec
//!
//! Estimation failures (an ACF candidate that does not validate) never show up
//! here; they fall back to the identity multiplier inside the encoder. What is
//! left are configuration limits, allocation failures and stream corruption.

use thiserror::Error;

/// Everything that can go wrong while encoding or decoding an ALSF stream.
#[derive(Debug, Error)]
pub enum AlsfError {
    /// A configuration value is outside what the format can represent.
    ///
    /// Raised by `EncoderConfig::validate` before any sample is touched.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller handed over data that does not fit the call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A frame or stream buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes")]
    Allocation { bytes: usize },

    /// The bitstream ended before a field could be read.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The dictionary decoder read a code that the encoder could not have
    /// produced at this point.
    #[error("invalid dictionary code {code} (next code {next_code})")]
    InvalidCode { code: u32, next_code: u32 },

    /// A dictionary string would write past the expected symbol count.
    #[error("dictionary string of {needed} symbols overflows {available} remaining")]
    StringOverflow { needed: usize, available: usize },

    /// A residual partition does not agree with the decoded integers.
    #[error("partition mismatch: {0}")]
    PartitionMismatch(String),

    /// A residual value cannot be applied to its reconstruction.
    #[error("invalid residual: {0}")]
    InvalidResidual(String),

    /// The container header, TOC or a frame header is malformed.
    #[error("invalid stream: {0}")]
    InvalidHeader(String),

    /// The data chunk does not match the digest stored in the header.
    #[error("data digest mismatch")]
    DigestMismatch,

    /// Metadata could not be serialized or parsed.
    #[error("metadata error: {0}")]
    Metadata(String),
}

/// result type for alsf stuff
pub type AlsfResult<T> = Result<T, AlsfError>;

/// Allocate an empty vector with room for `len` items, reporting
/// allocation failure instead of aborting.
pub(crate) fn try_vec_with_capacity<T>(len: usize) -> AlsfResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| AlsfError::Allocation {
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    Ok(v)
}
