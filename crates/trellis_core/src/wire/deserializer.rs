//! Buffer -> value decoding
//!
//! The decoder is strict: declared counts must match, unknown tags fail and
//! the header version must be exactly the expected one.

use super::reader::BinaryReader;
use super::{tag, WireError, WireResult};
use crate::value::{PropMap, PropValue};

/// Nesting beyond this depth is treated as a malformed buffer
const MAX_DEPTH: usize = 128;

/// Reads a header and a value stream from a received buffer
#[derive(Debug)]
pub struct Deserializer<'a> {
    reader: BinaryReader<'a>,
    expected_version: u32,
    depth: usize,
}

impl<'a> Deserializer<'a> {
    pub fn new(data: &'a [u8], expected_version: u32) -> Self {
        Self {
            reader: BinaryReader::new(data),
            expected_version,
            depth: 0,
        }
    }

    /// Consume `0xFF` + version, rejecting any other version
    pub fn read_header(&mut self) -> WireResult<u32> {
        if self.reader.peek_byte() != Some(tag::VERSION) {
            return Err(WireError::MissingHeader);
        }
        self.reader.get_byte()?;
        let found = self.reader.get_varint32()?;
        if found != self.expected_version {
            return Err(WireError::UnsupportedVersion {
                found,
                expected: self.expected_version,
            });
        }
        Ok(found)
    }

    pub fn read_value(&mut self) -> WireResult<PropValue> {
        let tag = self.read_tag()?;
        self.read_value_with_tag(tag)
    }

    /// Require that only padding remains
    pub fn finish(&mut self) -> WireResult<()> {
        while let Some(byte) = self.reader.peek_byte() {
            if byte != tag::PADDING {
                return Err(WireError::Shape(format!(
                    "{} trailing bytes after value",
                    self.reader.remaining()
                )));
            }
            self.reader.get_byte()?;
        }
        Ok(())
    }

    fn read_tag(&mut self) -> WireResult<u8> {
        loop {
            let byte = self.reader.get_byte()?;
            if byte != tag::PADDING {
                return Ok(byte);
            }
        }
    }

    fn read_value_with_tag(&mut self, tag_byte: u8) -> WireResult<PropValue> {
        match tag_byte {
            tag::NULL => Ok(PropValue::Null),
            tag::UNDEFINED => Ok(PropValue::Undefined),
            tag::TRUE => Ok(PropValue::Bool(true)),
            tag::FALSE => Ok(PropValue::Bool(false)),
            tag::INT32 => Ok(PropValue::Int32(self.reader.get_zigzag32()?)),
            tag::UINT32 => Ok(PropValue::Uint32(self.reader.get_varint32()?)),
            tag::DOUBLE => Ok(PropValue::Double(self.reader.get_double()?)),
            tag::ONE_BYTE_STRING | tag::TWO_BYTE_STRING | tag::UTF8_STRING => {
                Ok(PropValue::String(self.read_string_with_tag(tag_byte)?))
            }
            tag::BEGIN_DENSE_ARRAY => self.nested(Self::read_dense_array),
            tag::BEGIN_OBJECT => self.nested(|d| d.read_properties(tag::END_OBJECT, 1)),
            tag::BEGIN_MAP => self.nested(|d| d.read_properties(tag::END_MAP, 2)),
            other => Err(WireError::UnknownTag(other)),
        }
    }

    fn nested(
        &mut self,
        read: impl FnOnce(&mut Self) -> WireResult<PropValue>,
    ) -> WireResult<PropValue> {
        if self.depth >= MAX_DEPTH {
            return Err(WireError::Shape(format!(
                "nesting deeper than {}",
                MAX_DEPTH
            )));
        }
        self.depth += 1;
        let value = read(self);
        self.depth -= 1;
        value
    }

    fn read_string_with_tag(&mut self, tag_byte: u8) -> WireResult<String> {
        let len = self.reader.get_varint32()? as usize;
        let bytes = self.reader.get_slice(len)?;
        match tag_byte {
            tag::ONE_BYTE_STRING => Ok(bytes.iter().map(|b| char::from(*b)).collect()),
            tag::TWO_BYTE_STRING => {
                if len % 2 != 0 {
                    return Err(WireError::InvalidUtf16);
                }
                let units = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                char::decode_utf16(units)
                    .collect::<Result<String, _>>()
                    .map_err(|_| WireError::InvalidUtf16)
            }
            _ => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|_| WireError::InvalidUtf8),
        }
    }

    fn read_key(&mut self) -> WireResult<String> {
        match self.read_value()? {
            PropValue::String(s) => Ok(s),
            PropValue::Int32(v) => Ok(v.to_string()),
            PropValue::Uint32(v) => Ok(v.to_string()),
            other => Err(WireError::Shape(format!(
                "object key must be a string, got {}",
                other.type_name()
            ))),
        }
    }

    /// Key/value pairs until `end`, then a count of `pairs * per_pair`
    fn read_properties(&mut self, end: u8, per_pair: u32) -> WireResult<PropValue> {
        let mut map = PropMap::new();
        loop {
            match self.reader.peek_byte() {
                Some(byte) if byte == end => {
                    self.reader.get_byte()?;
                    break;
                }
                Some(tag::PADDING) => {
                    self.reader.get_byte()?;
                }
                Some(_) => {
                    let key = self.read_key()?;
                    let value = self.read_value()?;
                    map.insert(key, value);
                }
                None => return Err(WireError::UnexpectedEof(self.reader.position())),
            }
        }
        let declared = self.reader.get_varint32()?;
        let actual = map.len() as u32 * per_pair;
        if declared != actual {
            return Err(WireError::CountMismatch { declared, actual });
        }
        Ok(PropValue::Object(map))
    }

    fn read_dense_array(&mut self) -> WireResult<PropValue> {
        let length = self.reader.get_varint32()?;
        let mut items = Vec::with_capacity(length.min(1024) as usize);
        for _ in 0..length {
            let tag_byte = self.read_tag()?;
            if tag_byte == tag::HOLE {
                continue;
            }
            items.push(self.read_value_with_tag(tag_byte)?);
        }
        let end = self.read_tag()?;
        if end != tag::END_DENSE_ARRAY {
            return Err(WireError::Shape(format!(
                "dense array of {} items not terminated (found 0x{:02x})",
                length, end
            )));
        }
        let properties = self.reader.get_varint32()?;
        if properties != 0 {
            return Err(WireError::Shape(format!(
                "dense array carries {} extra properties",
                properties
            )));
        }
        let declared = self.reader.get_varint32()?;
        if declared != length {
            return Err(WireError::CountMismatch {
                declared,
                actual: length,
            });
        }
        Ok(PropValue::Array(items))
    }
}
