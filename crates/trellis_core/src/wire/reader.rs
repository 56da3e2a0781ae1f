//! Bounds-checked cursor over a received buffer

use super::{WireError, WireResult};

/// Cursor over a byte slice; every read is bounds-checked
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub fn get_byte(&mut self) -> WireResult<u8> {
        let byte = self
            .data
            .get(self.pos)
            .copied()
            .ok_or(WireError::UnexpectedEof(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn get_slice(&mut self, len: usize) -> WireResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(WireError::UnexpectedEof(self.pos))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn get_varint(&mut self) -> WireResult<u64> {
        let start = self.pos;
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.get_byte()?;
            if shift >= 64 || (shift == 63 && byte > 1) {
                return Err(WireError::VarintOverflow(start));
            }
            result |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Varint that must fit in 32 bits (lengths, counts, uint32 values)
    pub fn get_varint32(&mut self) -> WireResult<u32> {
        let start = self.pos;
        let value = self.get_varint()?;
        u32::try_from(value).map_err(|_| WireError::VarintOverflow(start))
    }

    pub fn get_zigzag32(&mut self) -> WireResult<i32> {
        let raw = self.get_varint32()?;
        Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
    }

    pub fn get_double(&mut self) -> WireResult<f64> {
        let bytes = self.get_slice(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_and_zigzag() {
        let mut reader = BinaryReader::new(&[0xAC, 0x02, 0x03, 0x04]);
        assert_eq!(reader.get_varint().unwrap(), 300);
        assert_eq!(reader.get_zigzag32().unwrap(), -2);
        assert_eq!(reader.get_zigzag32().unwrap(), 2);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_truncated_reads_fail() {
        let mut reader = BinaryReader::new(&[0x80]);
        assert_eq!(reader.get_varint(), Err(WireError::UnexpectedEof(1)));

        let mut reader = BinaryReader::new(&[0, 0, 0]);
        assert_eq!(reader.get_double(), Err(WireError::UnexpectedEof(0)));
    }

    #[test]
    fn test_varint_overflow() {
        let bytes = [0xFF; 11];
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(reader.get_varint(), Err(WireError::VarintOverflow(0)));

        let mut reader = BinaryReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x10]);
        assert_eq!(reader.get_varint32(), Err(WireError::VarintOverflow(0)));
    }
}
