use tracing::warn;

use super::dictionary::{
    Dictionary, DictionaryTable, BUMP_CODE, DICTIONARY_CAPACITY, FIRST_CODE, FLUSH_CODE,
    FREEZE_CODE, MAX_CODE_BITS,
};
use crate::core::BitReader;
use crate::error::{try_vec_with_capacity, AlsfError, AlsfResult};

/// Masked-LZ decoder for one channel, in lock-step with an `MlzEncoder`.
#[derive(Debug, Clone)]
pub struct MlzDecoder {
    dict: Dictionary,
}

impl Default for MlzDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MlzDecoder {
    pub fn new() -> Self {
        MlzDecoder {
            dict: Dictionary::plain(),
        }
    }

    /// Read codes from `reader` until exactly `expected` symbols are out.
    ///
    /// Any code the encoder could not have written here is fatal: the table
    /// cannot resynchronize afterwards.
    pub fn decode(&mut self, reader: &mut BitReader, expected: usize) -> AlsfResult<Vec<u8>> {
        let mut out = try_vec_with_capacity(expected)?;
        let mut prev: Option<u32> = None;

        while out.len() < expected {
            let code = reader.read_bits(self.dict.code_bits())?;
            match code {
                FLUSH_CODE => {
                    self.dict.reset();
                    prev = None;
                    continue;
                }
                BUMP_CODE => {
                    if self.dict.code_bits() >= MAX_CODE_BITS {
                        return Err(self.invalid(code));
                    }
                    self.dict.bump();
                    continue;
                }
                FREEZE_CODE => {
                    self.dict.freeze();
                    continue;
                }
                _ => {}
            }

            let next_code = self.dict.next_code();
            // The encoder keeps adding one step ahead of us, up to capacity.
            let parent = prev.filter(|_| next_code < DICTIONARY_CAPACITY);
            let available = expected - out.len();
            let start = out.len();

            if self.dict.contains(code) {
                let needed = self.dict.length(code) as usize;
                if needed > available {
                    return Err(self.overflow(needed, available));
                }
                let first = self.dict.expand_into(code, &mut out);
                if let Some(p) = parent {
                    self.dict.add(p, first);
                }
            } else if let (Some(p), true) = (parent, code == next_code) {
                // the string being defined by this very code
                let needed = self.dict.length(p) as usize + 1;
                if needed > available {
                    return Err(self.overflow(needed, available));
                }
                let first = self.dict.expand_into(p, &mut out);
                out.push(first);
                self.dict.add(p, first);
                debug_assert_eq!(out[start], first);
            } else {
                return Err(self.invalid(code));
            }

            prev = Some(code);
        }

        Ok(out)
    }

    fn invalid(&self, code: u32) -> AlsfError {
        let next_code = self.dict.next_code();
        warn!(code, next_code, "invalid dictionary code");
        AlsfError::InvalidCode { code, next_code }
    }

    fn overflow(&self, needed: usize, available: usize) -> AlsfError {
        warn!(needed, available, "dictionary string overflows partition");
        AlsfError::StringOverflow { needed, available }
    }

    /// Start over from an empty table.
    pub fn flush(&mut self) {
        self.dict.reset();
    }

    pub fn table(&self) -> &DictionaryTable {
        self.dict.table()
    }

    /// Number of string codes currently defined.
    pub fn string_count(&self) -> u32 {
        self.dict.next_code() - FIRST_CODE
    }
}
