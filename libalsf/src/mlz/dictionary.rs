//! Dictionary table shared by the masked-LZ encoder and decoder
//!
//! String codes are arena indices: code `FIRST_CODE + i` lives at
//! `entries[i]`, and the 256 literal codes are implicit single-byte strings.
//! Only the encoder carries a hash index; the decoder never searches.

use std::collections::HashMap;

/// Clear the table and restart at the minimum code width.
pub const FLUSH_CODE: u32 = 256;
/// Stop adding entries; the table stays as it is.
pub const FREEZE_CODE: u32 = 257;
/// Widen every following code by one bit.
pub const BUMP_CODE: u32 = 258;
/// First code assigned to a multi-symbol string.
pub const FIRST_CODE: u32 = 259;

pub const MIN_CODE_BITS: u32 = 9;
pub const MAX_CODE_BITS: u32 = 15;
pub const DICTIONARY_CAPACITY: u32 = 1 << MAX_CODE_BITS;

/// Candidates followed per trie node during the longest-match search.
pub const MAX_SEARCH: usize = 4;

/// High-bit mask for a symbol with `width` significant bits.
#[inline]
pub fn symbol_mask(width: u8) -> u8 {
    if width >= 8 {
        0xFF
    } else {
        !(0xFFu8 >> width)
    }
}

/// One multi-symbol string: the string of `parent` followed by `symbol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub code: u32,
    pub parent: u32,
    pub symbol: u8,
    pub length: u32,
}

/// The part of the dictionary both sides must agree on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryTable {
    entries: Vec<DictionaryEntry>,
    code_bits: u32,
    frozen: bool,
}

impl DictionaryTable {
    fn new() -> Self {
        DictionaryTable {
            entries: Vec::new(),
            code_bits: MIN_CODE_BITS,
            frozen: false,
        }
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    pub fn next_code(&self) -> u32 {
        FIRST_CODE + self.entries.len() as u32
    }

    pub fn code_bits(&self) -> u32 {
        self.code_bits
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct IndexKey {
    parent: u32,
    symbol: u8,
    width: u8,
}

/// `(parent, masked symbol, mask width)` → first string code with that key.
#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    map: HashMap<IndexKey, u32>,
}

impl HashIndex {
    /// Index `entry` under every mask width, logging the keys that were new.
    fn insert(&mut self, entry: &DictionaryEntry, mut log: Option<&mut Vec<IndexKey>>) {
        for width in 1..=8u8 {
            let key = IndexKey {
                parent: entry.parent,
                symbol: entry.symbol & symbol_mask(width),
                width,
            };
            if let std::collections::hash_map::Entry::Vacant(slot) = self.map.entry(key) {
                slot.insert(entry.code);
                if let Some(log) = log.as_deref_mut() {
                    log.push(key);
                }
            }
        }
    }

    fn get(&self, parent: u32, symbol: u8, width: u8) -> Option<u32> {
        self.map
            .get(&IndexKey {
                parent,
                symbol,
                width,
            })
            .copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// Undo log between backup() and resume(). A reset inside the window moves
// the whole pre-reset state here instead of logging keys.
#[derive(Debug, Clone)]
struct Checkpoint {
    entries_len: usize,
    code_bits: u32,
    frozen: bool,
    inserted: Vec<IndexKey>,
    before_reset: Option<(DictionaryTable, Option<HashIndex>)>,
}

/// Live dictionary state of one channel.
#[derive(Debug, Clone)]
pub struct Dictionary {
    table: DictionaryTable,
    index: Option<HashIndex>,
    checkpoint: Option<Checkpoint>,
}

impl Dictionary {
    /// Dictionary with a hash index, for the encoder.
    pub fn indexed() -> Self {
        Dictionary {
            table: DictionaryTable::new(),
            index: Some(HashIndex::default()),
            checkpoint: None,
        }
    }

    /// Dictionary without an index, for the decoder.
    pub fn plain() -> Self {
        Dictionary {
            table: DictionaryTable::new(),
            index: None,
            checkpoint: None,
        }
    }

    pub fn table(&self) -> &DictionaryTable {
        &self.table
    }

    pub fn next_code(&self) -> u32 {
        self.table.next_code()
    }

    pub fn code_bits(&self) -> u32 {
        self.table.code_bits
    }

    pub fn is_frozen(&self) -> bool {
        self.table.frozen
    }

    pub fn is_full(&self) -> bool {
        self.next_code() >= DICTIONARY_CAPACITY
    }

    /// Drop every string code and return to the minimum code width.
    pub fn reset(&mut self) {
        let old_table = std::mem::replace(&mut self.table, DictionaryTable::new());
        let old_index = self.index.as_mut().map(std::mem::take);
        if let Some(cp) = self.checkpoint.as_mut() {
            if cp.before_reset.is_none() {
                cp.before_reset = Some((old_table, old_index));
                cp.inserted.clear();
            }
        }
    }

    pub fn bump(&mut self) {
        self.table.code_bits += 1;
    }

    pub fn freeze(&mut self) {
        self.table.frozen = true;
    }

    /// Append `parent + symbol` as the next string code.
    pub fn add(&mut self, parent: u32, symbol: u8) -> u32 {
        let code = self.next_code();
        let entry = DictionaryEntry {
            code,
            parent,
            symbol,
            length: self.length(parent) + 1,
        };
        if let Some(index) = self.index.as_mut() {
            let log = match self.checkpoint.as_mut() {
                Some(cp) if cp.before_reset.is_none() => Some(&mut cp.inserted),
                _ => None,
            };
            index.insert(&entry, log);
        }
        self.table.entries.push(entry);
        code
    }

    /// Whether `code` names a literal or a live string.
    pub fn contains(&self, code: u32) -> bool {
        code < FLUSH_CODE || (FIRST_CODE..self.next_code()).contains(&code)
    }

    pub fn entry(&self, code: u32) -> Option<&DictionaryEntry> {
        code.checked_sub(FIRST_CODE)
            .and_then(|i| self.table.entries.get(i as usize))
    }

    /// Symbols in the string `code`; callers must pass a live code.
    pub fn length(&self, code: u32) -> u32 {
        match self.entry(code) {
            Some(e) => e.length,
            None => 1,
        }
    }

    /// Append the string `code` to `out` and return its first symbol.
    pub fn expand_into(&self, code: u32, out: &mut Vec<u8>) -> u8 {
        let len = self.length(code) as usize;
        let start = out.len();
        out.resize(start + len, 0);

        let mut c = code;
        for i in (0..len).rev() {
            match self.entry(c) {
                Some(e) => {
                    out[start + i] = e.symbol;
                    c = e.parent;
                }
                None => {
                    out[start + i] = c as u8;
                    break;
                }
            }
        }
        out[start]
    }

    /// Up to `MAX_SEARCH` distinct children of `parent` whose symbol agrees
    /// with `symbol` in its top `width` bits.
    pub fn candidates(&self, parent: u32, symbol: u8, width: u8) -> ([u32; MAX_SEARCH], usize) {
        let mut found = [0u32; MAX_SEARCH];
        let mut count = 0;
        let Some(index) = self.index.as_ref() else {
            return (found, 0);
        };
        for w in width..=8 {
            if let Some(code) = index.get(parent, symbol & symbol_mask(w), w) {
                if !found[..count].contains(&code) {
                    found[count] = code;
                    count += 1;
                    if count == MAX_SEARCH {
                        break;
                    }
                }
            }
        }
        (found, count)
    }

    /// Remember the current state so a speculative encode can be undone.
    pub fn backup(&mut self) {
        self.checkpoint = Some(Checkpoint {
            entries_len: self.table.entries.len(),
            code_bits: self.table.code_bits,
            frozen: self.table.frozen,
            inserted: Vec::new(),
            before_reset: None,
        });
    }

    /// Return to the state saved by the last `backup`.
    pub fn resume(&mut self) {
        let Some(cp) = self.checkpoint.take() else {
            return;
        };
        if let Some((table, index)) = cp.before_reset {
            self.table = table;
            self.index = index;
            return;
        }
        self.table.entries.truncate(cp.entries_len);
        self.table.code_bits = cp.code_bits;
        self.table.frozen = cp.frozen;
        if let Some(index) = self.index.as_mut() {
            for key in cp.inserted {
                index.map.remove(&key);
            }
        }
    }

    /// Keep everything done since the last `backup`.
    pub fn commit(&mut self) {
        self.checkpoint = None;
    }

    pub fn index_len(&self) -> usize {
        self.index.as_ref().map_or(0, HashIndex::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks() {
        assert_eq!(symbol_mask(1), 0x80);
        assert_eq!(symbol_mask(3), 0xE0);
        assert_eq!(symbol_mask(8), 0xFF);
    }

    #[test]
    fn expand_walks_parent_chain() {
        let mut dict = Dictionary::plain();
        let ab = dict.add(b'a' as u32, b'b');
        let abc = dict.add(ab, b'c');
        assert_eq!(abc, FIRST_CODE + 1);
        assert_eq!(dict.length(abc), 3);

        let mut out = vec![b'x'];
        let first = dict.expand_into(abc, &mut out);
        assert_eq!(first, b'a');
        assert_eq!(out, b"xabc");
    }

    #[test]
    fn first_key_wins_for_each_width() {
        let mut dict = Dictionary::indexed();
        let a = dict.add(7, 0b1010_0000);
        let b = dict.add(7, 0b1011_0000);

        // both share the top three bits; the older entry owns widths 1..=3
        let (found, n) = dict.candidates(7, 0b1010_0000, 3);
        assert_eq!(&found[..n], &[a]);
        let (found, n) = dict.candidates(7, 0b1011_0000, 4);
        assert_eq!(&found[..n], &[b]);
    }

    #[test]
    fn resume_undoes_adds_and_resets() {
        let mut dict = Dictionary::indexed();
        dict.add(1, 2);
        let before = dict.table().clone();
        let keys = dict.index_len();

        dict.backup();
        dict.add(3, 4);
        dict.bump();
        dict.resume();
        assert_eq!(dict.table(), &before);
        assert_eq!(dict.index_len(), keys);

        dict.backup();
        dict.add(5, 6);
        dict.reset();
        dict.add(9, 9);
        dict.resume();
        assert_eq!(dict.table(), &before);
        assert_eq!(dict.index_len(), keys);
    }
}
