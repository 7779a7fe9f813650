//! Whole-stream coding
//!
//! The float engine turns every frame into integers plus a diff-float
//! block. The integers are carried here with fixed polynomial predictors and
//! Rice coding, and frames are laid out in the ALSF container.

pub mod decoder;
pub mod encoder;
pub mod predictor;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use predictor::{fixed_reconstruct, fixed_residuals, wasted_bits};
