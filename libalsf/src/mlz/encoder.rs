use tracing::trace;

use super::dictionary::{
    symbol_mask, Dictionary, DictionaryTable, BUMP_CODE, FLUSH_CODE, FREEZE_CODE, MAX_CODE_BITS,
};
use crate::config::DictionaryPolicy;
use crate::core::BitWriter;
use crate::error::{AlsfError, AlsfResult};

/// Trie nodes visited per longest-match search before giving up on deeper
/// candidates.
pub const MAX_SEARCH_NODES: usize = 4096;

/// Masked-LZ encoder for one channel. The dictionary survives across calls.
#[derive(Debug, Clone)]
pub struct MlzEncoder {
    dict: Dictionary,
    policy: DictionaryPolicy,
    stack: Vec<(u32, usize)>,
}

impl MlzEncoder {
    pub fn new(policy: DictionaryPolicy) -> Self {
        MlzEncoder {
            dict: Dictionary::indexed(),
            policy,
            stack: Vec::new(),
        }
    }

    /// Code `symbols`, each significant in its top `widths[i]` bits, onto `out`.
    ///
    /// Low bits below a symbol's width are ignored; the decoder may hand them
    /// back as anything.
    pub fn encode(&mut self, symbols: &[u8], widths: &[u8], out: &mut BitWriter) -> AlsfResult<()> {
        if symbols.len() != widths.len() {
            return Err(AlsfError::InvalidInput(format!(
                "{} symbols but {} mask widths",
                symbols.len(),
                widths.len()
            )));
        }
        if let Some(w) = widths.iter().find(|&&w| w == 0 || w > 8) {
            return Err(AlsfError::InvalidInput(format!("mask width {w} outside 1..=8")));
        }

        let masked: Vec<u8> = symbols
            .iter()
            .zip(widths)
            .map(|(&s, &w)| s & symbol_mask(w))
            .collect();

        let start_bits = out.bit_len();
        let mut pos = 0;
        while pos < masked.len() {
            let (code, len) = self.longest_match(&masked, widths, pos);
            out.write_bits(code, self.dict.code_bits());
            pos += len;

            if pos < masked.len() && !self.dict.is_frozen() {
                self.dict.add(code, masked[pos]);
                self.grow(out);
            }
        }

        trace!(
            symbols = masked.len(),
            bits = out.bit_len() - start_bits,
            next_code = self.dict.next_code(),
            "mlz encode"
        );
        Ok(())
    }

    // Called after every add: widen, or handle a full table.
    fn grow(&mut self, out: &mut BitWriter) {
        let bits = self.dict.code_bits();
        if self.dict.next_code() < 1 << bits {
            return;
        }
        if bits < MAX_CODE_BITS {
            out.write_bits(BUMP_CODE, bits);
            self.dict.bump();
            return;
        }
        match self.policy {
            DictionaryPolicy::Flush => {
                out.write_bits(FLUSH_CODE, bits);
                self.dict.reset();
            }
            DictionaryPolicy::Freeze => {
                out.write_bits(FREEZE_CODE, bits);
                self.dict.freeze();
            }
        }
    }

    /// Longest string in the table matching `symbols[start..]`, rooted at the
    /// literal `symbols[start]`. Returns `(code, length)`.
    fn longest_match(&mut self, symbols: &[u8], widths: &[u8], start: usize) -> (u32, usize) {
        let root = symbols[start] as u32;
        let mut best = (root, 1);
        let mut visited = 0;

        self.stack.clear();
        self.stack.push((root, 1));
        while let Some((code, len)) = self.stack.pop() {
            if len > best.1 {
                best = (code, len);
            }
            let pos = start + len;
            if pos >= symbols.len() || visited >= MAX_SEARCH_NODES {
                continue;
            }
            visited += 1;

            let (found, count) = self.dict.candidates(code, symbols[pos], widths[pos]);
            for &child in found[..count].iter().rev() {
                self.stack.push((child, len + 1));
            }
        }
        best
    }

    /// Save the dictionary before a speculative `encode`.
    pub fn backup(&mut self) {
        self.dict.backup();
    }

    /// Roll the dictionary back to the last `backup`.
    pub fn resume(&mut self) {
        self.dict.resume();
    }

    /// Keep the state reached since the last `backup`.
    pub fn commit(&mut self) {
        self.dict.commit();
    }

    /// Start over from an empty table.
    pub fn flush(&mut self) {
        self.dict.commit();
        self.dict.reset();
    }

    pub fn table(&self) -> &DictionaryTable {
        self.dict.table()
    }
}
