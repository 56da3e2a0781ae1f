//! Binary wire format for the serialized backend
//!
//! A buffer is a versioned header followed by one self-describing value:
//!
//! ```text
//! ┌──────┬────────────────┬──────────────────────────────────────┐
//! │ 0xFF │ version varint │ tag byte + payload (recursively)      │
//! └──────┴────────────────┴──────────────────────────────────────┘
//! ```
//!
//! | tag  | payload                                              |
//! |------|------------------------------------------------------|
//! | `0`  | null                                                 |
//! | `_`  | undefined                                            |
//! | `-`  | array hole (only inside arrays, skipped on decode)   |
//! | `T`  | true                                                 |
//! | `F`  | false                                                |
//! | `I`  | zigzag varint int32                                  |
//! | `U`  | varint uint32                                        |
//! | `N`  | little-endian f64                                    |
//! | `"`  | varint byte length + Latin-1 bytes                   |
//! | `c`  | varint byte length + UTF-16LE units                  |
//! | `S`  | varint byte length + UTF-8 bytes                     |
//! | `o`  | key/value pairs, then `{` + varint pair count        |
//! | `A`  | varint length, items, then `$` + `0` + varint length |
//! | `;`  | key/value pairs, then `:` + varint 2*pair count      |
//!
//! `0x00` bytes in front of a tag are padding and are skipped.

mod deserializer;
mod reader;
mod serializer;
mod writer;

pub use deserializer::Deserializer;
pub use reader::BinaryReader;
pub use serializer::Serializer;
pub use writer::BinaryWriter;

use thiserror::Error;

use crate::error::BridgeError;
use crate::value::PropValue;

/// Version written by default into buffer headers
pub const WIRE_VERSION: u32 = 13;

/// Tag bytes
pub mod tag {
    pub const VERSION: u8 = 0xFF;
    pub const PADDING: u8 = 0x00;
    pub const NULL: u8 = b'0';
    pub const UNDEFINED: u8 = b'_';
    pub const HOLE: u8 = b'-';
    pub const TRUE: u8 = b'T';
    pub const FALSE: u8 = b'F';
    pub const INT32: u8 = b'I';
    pub const UINT32: u8 = b'U';
    pub const DOUBLE: u8 = b'N';
    pub const ONE_BYTE_STRING: u8 = b'"';
    pub const TWO_BYTE_STRING: u8 = b'c';
    pub const UTF8_STRING: u8 = b'S';
    pub const BEGIN_OBJECT: u8 = b'o';
    pub const END_OBJECT: u8 = b'{';
    pub const BEGIN_DENSE_ARRAY: u8 = b'A';
    pub const END_DENSE_ARRAY: u8 = b'$';
    pub const BEGIN_MAP: u8 = b';';
    pub const END_MAP: u8 = b':';
}

/// Wire decoding error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    #[error("unexpected end of buffer at offset {0}")]
    UnexpectedEof(usize),

    #[error("buffer does not start with a version header")]
    MissingHeader,

    #[error("unsupported wire version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("unknown tag byte 0x{0:02x}")]
    UnknownTag(u8),

    #[error("count mismatch: declared {declared}, read {actual}")]
    CountMismatch { declared: u32, actual: u32 },

    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    #[error("invalid UTF-16 string")]
    InvalidUtf16,

    #[error("varint overflow at offset {0}")]
    VarintOverflow(usize),

    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

impl From<WireError> for BridgeError {
    fn from(err: WireError) -> Self {
        BridgeError::BackendMismatch(err.to_string())
    }
}

/// Result type for wire operations
pub type WireResult<T> = std::result::Result<T, WireError>;

/// Encode one value with a header of the given version
pub fn encode(version: u32, value: &PropValue) -> Vec<u8> {
    let mut serializer = Serializer::new(version);
    serializer.write_header();
    serializer.write_value(value);
    serializer.into_bytes()
}

/// Decode a whole buffer, requiring the given header version
///
/// Trailing bytes other than padding are rejected.
pub fn decode(expected_version: u32, bytes: &[u8]) -> WireResult<PropValue> {
    let mut deserializer = Deserializer::new(bytes, expected_version);
    deserializer.read_header()?;
    let value = deserializer.read_value()?;
    deserializer.finish()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props;

    #[test]
    fn test_header_layout() {
        let bytes = encode(WIRE_VERSION, &PropValue::Null);
        assert_eq!(bytes, vec![0xFF, 13, b'0']);
    }

    #[test]
    fn test_nested_payload_survives() {
        let value = PropValue::Array(vec![PropValue::Object(props! {
            "id" => 3u32,
            "name" => "Text",
            "props" => props! { "text" => "héllo ✓", "opacity" => 0.5, "offset" => -4 },
        })]);
        let bytes = encode(WIRE_VERSION, &value);
        let decoded = decode(WIRE_VERSION, &bytes).unwrap();
        let node = &decoded.as_array().unwrap()[0];
        assert_eq!(node.get("id"), Some(&PropValue::Uint32(3)));
        let props = node.get("props").unwrap();
        assert_eq!(props.get("text").and_then(PropValue::as_str), Some("héllo ✓"));
        assert_eq!(props.get("opacity"), Some(&PropValue::Double(0.5)));
        assert_eq!(props.get("offset"), Some(&PropValue::Int32(-4)));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let bytes = encode(12, &PropValue::Bool(true));
        assert_eq!(
            decode(WIRE_VERSION, &bytes),
            Err(WireError::UnsupportedVersion {
                found: 12,
                expected: 13
            })
        );
    }

    #[test]
    fn test_rejects_missing_header() {
        assert_eq!(decode(WIRE_VERSION, b"T"), Err(WireError::MissingHeader));
        assert_eq!(decode(WIRE_VERSION, &[]), Err(WireError::MissingHeader));
    }

    #[test]
    fn test_rejects_trailing_garbage() {
        let mut bytes = encode(WIRE_VERSION, &PropValue::Bool(false));
        bytes.push(b'T');
        assert!(matches!(
            decode(WIRE_VERSION, &bytes),
            Err(WireError::Shape(_))
        ));
    }

    #[test]
    fn test_wire_error_maps_to_backend_mismatch() {
        let err: BridgeError = WireError::UnknownTag(b'?').into();
        assert!(matches!(err, BridgeError::BackendMismatch(_)));
    }
}
