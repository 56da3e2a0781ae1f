//! Property values carried by mutation records
//!
//! `PropValue` is the dynamic value tree the document engine attaches to
//! nodes (styles, attributes, event params). Objects keep insertion order so
//! that property diffs are applied, encoded and compared deterministically.

use std::fmt;

use indexmap::IndexMap;

/// Ordered property map (key -> value)
pub type PropMap = IndexMap<String, PropValue>;

/// Build a [`PropMap`] from `key => value` pairs
///
/// ```
/// use trellis_core::{props, PropValue};
///
/// let map = props! { "text" => "hello", "fontSize" => 14.0 };
/// assert_eq!(map.get("text"), Some(&PropValue::String("hello".into())));
/// ```
#[macro_export]
macro_rules! props {
    () => {
        $crate::value::PropMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::value::PropMap::new();
        $(
            map.insert(
                ::std::string::String::from($key),
                $crate::value::PropValue::from($value),
            );
        )+
        map
    }};
}

/// Dynamic property value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropValue {
    /// Explicit null
    #[default]
    Null,
    /// Absent value (script `undefined`)
    Undefined,
    /// Boolean value
    Bool(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 32-bit unsigned integer
    Uint32(u32),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    Array(Vec<PropValue>),
    /// Ordered string-keyed object
    Object(PropMap),
}

impl PropValue {
    /// True for `Null` and `Undefined`
    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null | PropValue::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value
    ///
    /// Integers widen, and strings holding a plain number (`"14"`, `"1.5"`)
    /// parse. Anything else yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropValue::Int32(v) => Some(f64::from(*v)),
            PropValue::Uint32(v) => Some(f64::from(*v)),
            PropValue::Double(v) => Some(*v),
            PropValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|v| v as f32)
    }

    /// Integral view of the value, rejecting fractional and out-of-range numbers
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PropValue::Int32(v) => Some(*v),
            PropValue::Uint32(v) => i32::try_from(*v).ok(),
            PropValue::Double(v) if v.fract() == 0.0 => {
                if *v >= f64::from(i32::MIN) && *v <= f64::from(i32::MAX) {
                    Some(*v as i32)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Unsigned view of the value (tags, counts, indices)
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            PropValue::Uint32(v) => Some(*v),
            PropValue::Int32(v) => u32::try_from(*v).ok(),
            PropValue::Double(v) if v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX) => {
                Some(*v as u32)
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PropValue]> {
        match self {
            PropValue::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&PropMap> {
        match self {
            PropValue::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<PropValue>> {
        match self {
            PropValue::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<PropMap> {
        match self {
            PropValue::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a key when the value is an object
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PropValue::Null => "Null",
            PropValue::Undefined => "Undefined",
            PropValue::Bool(_) => "Bool",
            PropValue::Int32(_) => "Int32",
            PropValue::Uint32(_) => "Uint32",
            PropValue::Double(_) => "Double",
            PropValue::String(_) => "String",
            PropValue::Array(_) => "Array",
            PropValue::Object(_) => "Object",
        }
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => write!(f, "null"),
            PropValue::Undefined => write!(f, "undefined"),
            PropValue::Bool(v) => write!(f, "{}", v),
            PropValue::Int32(v) => write!(f, "{}", v),
            PropValue::Uint32(v) => write!(f, "{}", v),
            PropValue::Double(v) => write!(f, "{}", v),
            PropValue::String(v) => write!(f, "{:?}", v),
            PropValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            PropValue::Object(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{:?}:{}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Int32(v)
    }
}

impl From<u32> for PropValue {
    fn from(v: u32) -> Self {
        PropValue::Uint32(v)
    }
}

impl From<f32> for PropValue {
    fn from(v: f32) -> Self {
        PropValue::Double(f64::from(v))
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Double(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::String(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::String(v)
    }
}

impl From<Vec<PropValue>> for PropValue {
    fn from(v: Vec<PropValue>) -> Self {
        PropValue::Array(v)
    }
}

impl From<PropMap> for PropValue {
    fn from(v: PropMap) -> Self {
        PropValue::Object(v)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(PropValue::Null, Into::into)
    }
}
