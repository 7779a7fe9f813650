//! Masked-LZ dictionary coder
//!
//! An LZ78-family coder over byte symbols where each symbol carries a mask
//! width: only its top `width` bits have to match a dictionary string. The
//! residual partitions of the float engine have a per-sample natural width,
//! so most of their last bytes are partial.
//!
//! Encoder and decoder build identical tables without transmitting them.
//! Control codes share the code space with literals:
//!
//! | code        | meaning                                |
//! |-------------|----------------------------------------|
//! | 0..=255     | literal byte                           |
//! | 256         | FLUSH: clear the table, width back to 9|
//! | 257         | FREEZE: stop adding strings            |
//! | 258         | BUMP: one more bit per code            |
//! | 259..32768  | dictionary strings                     |

pub mod decoder;
pub mod dictionary;
pub mod encoder;

pub use decoder::MlzDecoder;
pub use dictionary::{
    symbol_mask, DictionaryEntry, DictionaryTable, BUMP_CODE, DICTIONARY_CAPACITY, FIRST_CODE,
    FLUSH_CODE, FREEZE_CODE, MAX_CODE_BITS, MIN_CODE_BITS,
};
pub use encoder::MlzEncoder;
