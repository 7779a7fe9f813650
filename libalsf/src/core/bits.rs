//! Bit-level I/O shared by the integer layer and the float engine
//!
//! Bits are packed MSB-first. The writer never fails; the reader returns
//! `UnexpectedEof` instead of padding with zeros, because every consumer of
//! this stream treats a short read as corruption.

use crate::error::{AlsfError, AlsfResult};

/// Bit-level writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitWriter {
    bytes: Vec<u8>,
    current_byte: u8,
    bit_pos: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter {
            bytes: Vec::new(),
            current_byte: 0,
            bit_pos: 0,
        }
    }

    pub fn with_capacity(bytes: usize) -> Self {
        BitWriter {
            bytes: Vec::with_capacity(bytes),
            current_byte: 0,
            bit_pos: 0,
        }
    }

    pub fn write_bit(&mut self, bit: u32) {
        if bit != 0 {
            self.current_byte |= 1 << (7 - self.bit_pos);
        }

        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bytes.push(self.current_byte);
            self.current_byte = 0;
            self.bit_pos = 0;
        }
    }

    /// Write the low `num_bits` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, num_bits: u32) {
        debug_assert!(num_bits <= 32);
        if self.bit_pos == 0 && num_bits % 8 == 0 {
            // byte aligned fast path
            for i in (0..num_bits / 8).rev() {
                self.bytes.push((value >> (i * 8)) as u8);
            }
            return;
        }
        for i in (0..num_bits).rev() {
            self.write_bit((value >> i) & 1);
        }
    }

    /// Append every bit written to `other`, preserving its bit length.
    pub fn append(&mut self, other: &BitWriter) {
        for &byte in &other.bytes {
            self.write_bits(byte as u32, 8);
        }
        for i in 0..other.bit_pos {
            self.write_bit(((other.current_byte >> (7 - i)) & 1) as u32);
        }
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bit_pos > 0 {
            self.bytes.push(self.current_byte);
            self.current_byte = 0;
            self.bit_pos = 0;
        }
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 + self.bit_pos as usize
    }

    pub fn into_bytes(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.bytes
    }

    pub fn byte_count(&self) -> usize {
        self.bytes.len() + if self.bit_pos > 0 { 1 } else { 0 }
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bit-level reader
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        BitReader {
            bytes,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    pub fn read_bit(&mut self) -> AlsfResult<u32> {
        if self.byte_pos >= self.bytes.len() {
            return Err(AlsfError::UnexpectedEof);
        }

        let bit = (self.bytes[self.byte_pos] >> (7 - self.bit_pos)) & 1;

        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }

        Ok(bit as u32)
    }

    /// Read `num_bits` (at most 32) bits, most significant first.
    pub fn read_bits(&mut self, num_bits: u32) -> AlsfResult<u32> {
        debug_assert!(num_bits <= 32);
        if num_bits as usize > self.bits_remaining() {
            return Err(AlsfError::UnexpectedEof);
        }
        let mut value = 0u64;
        for _ in 0..num_bits {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value as u32)
    }

    pub fn read_flag(&mut self) -> AlsfResult<bool> {
        Ok(self.read_bit()? == 1)
    }

    /// Skip to the next byte boundary.
    pub fn align_to_byte(&mut self) {
        if self.bit_pos > 0 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.byte_pos >= self.bytes.len()
    }

    /// Bits consumed so far.
    pub fn bit_position(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    pub fn bits_remaining(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.bit_position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_partial_bits() {
        let mut head = BitWriter::new();
        head.write_bits(0b101, 3);

        let mut tail = BitWriter::new();
        tail.write_bits(0xABC, 12);
        tail.write_bits(0b01, 2);

        head.append(&tail);
        assert_eq!(head.bit_len(), 17);

        let bytes = head.into_bytes();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(12).unwrap(), 0xABC);
        assert_eq!(reader.read_bits(2).unwrap(), 0b01);
    }

    #[test]
    fn short_read_is_an_error() {
        let bytes = [0xFF];
        let mut reader = BitReader::new(&bytes);
        assert!(reader.read_bits(9).is_err());
        assert_eq!(reader.read_bits(8).unwrap(), 0xFF);
        assert!(matches!(reader.read_bit(), Err(AlsfError::UnexpectedEof)));
    }

    #[test]
    fn full_width_words() {
        let mut w = BitWriter::new();
        w.write_bit(1);
        w.write_bits(0xDEAD_BEEF, 32);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_bit().unwrap(), 1);
        assert_eq!(r.read_bits(32).unwrap(), 0xDEAD_BEEF);
    }
}
