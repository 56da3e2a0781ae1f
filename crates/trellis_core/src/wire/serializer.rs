//! Value -> buffer encoding

use super::tag;
use super::writer::BinaryWriter;
use crate::value::{PropMap, PropValue};

/// Writes a header and a value stream into a fresh buffer
#[derive(Debug)]
pub struct Serializer {
    writer: BinaryWriter,
    version: u32,
}

impl Serializer {
    pub fn new(version: u32) -> Self {
        Self {
            writer: BinaryWriter::with_capacity(256),
            version,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn write_header(&mut self) {
        self.writer.put_byte(tag::VERSION);
        self.writer.put_varint(u64::from(self.version));
    }

    pub fn write_value(&mut self, value: &PropValue) {
        match value {
            PropValue::Null => self.writer.put_byte(tag::NULL),
            PropValue::Undefined => self.writer.put_byte(tag::UNDEFINED),
            PropValue::Bool(true) => self.writer.put_byte(tag::TRUE),
            PropValue::Bool(false) => self.writer.put_byte(tag::FALSE),
            PropValue::Int32(v) => {
                self.writer.put_byte(tag::INT32);
                self.writer.put_zigzag32(*v);
            }
            PropValue::Uint32(v) => {
                self.writer.put_byte(tag::UINT32);
                self.writer.put_varint(u64::from(*v));
            }
            PropValue::Double(v) => {
                self.writer.put_byte(tag::DOUBLE);
                self.writer.put_double(*v);
            }
            PropValue::String(s) => self.write_string(s),
            PropValue::Array(items) => self.write_dense_array(items),
            PropValue::Object(map) => self.write_object(map),
        }
    }

    /// Latin-1 when every char fits in one byte, UTF-16LE otherwise
    pub fn write_string(&mut self, value: &str) {
        if value.chars().all(|c| (c as u32) < 0x100) {
            self.writer.put_byte(tag::ONE_BYTE_STRING);
            self.writer.put_varint(value.chars().count() as u64);
            for c in value.chars() {
                self.writer.put_byte(c as u32 as u8);
            }
        } else {
            let units: Vec<u16> = value.encode_utf16().collect();
            self.writer.put_byte(tag::TWO_BYTE_STRING);
            self.writer.put_varint(units.len() as u64 * 2);
            for unit in units {
                self.writer.put_u16(unit);
            }
        }
    }

    fn write_dense_array(&mut self, items: &[PropValue]) {
        self.writer.put_byte(tag::BEGIN_DENSE_ARRAY);
        self.writer.put_varint(items.len() as u64);
        for item in items {
            self.write_value(item);
        }
        self.writer.put_byte(tag::END_DENSE_ARRAY);
        self.writer.put_varint(0);
        self.writer.put_varint(items.len() as u64);
    }

    fn write_object(&mut self, map: &PropMap) {
        self.writer.put_byte(tag::BEGIN_OBJECT);
        for (key, value) in map {
            self.write_string(key);
            self.write_value(value);
        }
        self.writer.put_byte(tag::END_OBJECT);
        self.writer.put_varint(map.len() as u64);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    fn body(value: &PropValue) -> Vec<u8> {
        let mut serializer = Serializer::new(13);
        serializer.write_value(value);
        serializer.into_bytes()
    }

    #[test]
    fn test_scalar_tags() {
        assert_eq!(body(&PropValue::Int32(-1)), vec![b'I', 1]);
        assert_eq!(body(&PropValue::Uint32(300)), vec![b'U', 0xAC, 0x02]);
        assert_eq!(body(&PropValue::Bool(true)), vec![b'T']);
        let double = body(&PropValue::Double(1.5));
        assert_eq!(double[0], b'N');
        assert_eq!(&double[1..], &1.5f64.to_le_bytes());
    }

    #[test]
    fn test_string_encodings() {
        assert_eq!(body(&"é".into()), vec![b'"', 1, 0xE9]);
        assert_eq!(body(&"✓".into()), vec![b'c', 2, 0x13, 0x27]);
    }

    #[test]
    fn test_containers() {
        assert_eq!(
            body(&PropValue::Array(vec![PropValue::Null])),
            vec![b'A', 1, b'0', b'$', 0, 1]
        );
        assert_eq!(
            body(&PropValue::Object(props! { "a" => true })),
            vec![b'o', b'"', 1, b'a', b'T', b'{', 1]
        );
    }
}
