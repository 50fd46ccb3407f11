//! Open-ended values.
//!
//! `AnySerializable` lets one key hold values of different shapes over
//! time. It is a closed union over the storable primitives, so equality and
//! round-trips stay well defined.

use std::collections::{BTreeMap, HashMap};

use prefs_core_store::{DateTime, Utc, Value};

use crate::{Blob, Bridge, BridgeError, BridgeKind, Serializable};

/// A type-erased storable value.
///
/// Build one with `From` or the `any!` macro:
///
/// ```rust
/// use prefs_serde_store::{any, AnySerializable};
///
/// let value = any!({ "name": "Alice", "tags": ["a", "b"], "age": 30 });
/// assert_eq!(value.get_key("name").and_then(AnySerializable::as_str), Some("Alice"));
///
/// assert_eq!(any!(3), AnySerializable::I64(3));
/// assert!(any!(null).is_nil());
/// ```
#[derive(Clone, Debug, Default)]
pub enum AnySerializable {
    #[default]
    Nil,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Double(f64),
    Float(f32),
    String(String),
    Data(Vec<u8>),
    Date(DateTime<Utc>),
    Array(Vec<AnySerializable>),
    Dictionary(BTreeMap<String, AnySerializable>),
}

impl AnySerializable {
    pub fn is_nil(&self) -> bool {
        matches!(self, AnySerializable::Nil)
    }

    /// Name of the boxed runtime type.
    pub fn type_name(&self) -> &'static str {
        match self {
            AnySerializable::Nil => "nil",
            AnySerializable::Bool(_) => "bool",
            AnySerializable::I8(_) => "i8",
            AnySerializable::I16(_) => "i16",
            AnySerializable::I32(_) => "i32",
            AnySerializable::I64(_) => "i64",
            AnySerializable::U8(_) => "u8",
            AnySerializable::U16(_) => "u16",
            AnySerializable::U32(_) => "u32",
            AnySerializable::U64(_) => "u64",
            AnySerializable::Double(_) => "f64",
            AnySerializable::Float(_) => "f32",
            AnySerializable::String(_) => "string",
            AnySerializable::Data(_) => "data",
            AnySerializable::Date(_) => "date",
            AnySerializable::Array(_) => "array",
            AnySerializable::Dictionary(_) => "dictionary",
        }
    }

    fn integer(&self) -> Option<i128> {
        match *self {
            AnySerializable::I8(v) => Some(v.into()),
            AnySerializable::I16(v) => Some(v.into()),
            AnySerializable::I32(v) => Some(v.into()),
            AnySerializable::I64(v) => Some(v.into()),
            AnySerializable::U8(v) => Some(v.into()),
            AnySerializable::U16(v) => Some(v.into()),
            AnySerializable::U32(v) => Some(v.into()),
            AnySerializable::U64(v) => Some(v.into()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnySerializable::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The boxed integer, whatever its width, if it fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        self.integer().and_then(|i| i64::try_from(i).ok())
    }

    /// The boxed integer, whatever its width, if it fits in a `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        self.integer().and_then(|i| u64::try_from(i).ok())
    }

    pub fn as_i8(&self) -> Option<i8> {
        self.integer().and_then(|i| i8::try_from(i).ok())
    }

    pub fn as_i16(&self) -> Option<i16> {
        self.integer().and_then(|i| i16::try_from(i).ok())
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.integer().and_then(|i| i32::try_from(i).ok())
    }

    pub fn as_u8(&self) -> Option<u8> {
        self.integer().and_then(|i| u8::try_from(i).ok())
    }

    pub fn as_u16(&self) -> Option<u16> {
        self.integer().and_then(|i| u16::try_from(i).ok())
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.integer().and_then(|i| u32::try_from(i).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            AnySerializable::Double(f) => Some(f),
            AnySerializable::Float(f) => Some(f.into()),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            AnySerializable::Float(f) => Some(f),
            AnySerializable::Double(f) => Some(f as f32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnySerializable::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            AnySerializable::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            AnySerializable::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AnySerializable]> {
        match self {
            AnySerializable::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, AnySerializable>> {
        match self {
            AnySerializable::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Look up a key of a boxed dictionary.
    pub fn get_key(&self, key: &str) -> Option<&AnySerializable> {
        self.as_dictionary()?.get(key)
    }

    /// Convert the boxed value to a concrete type through its bridge.
    pub fn get<T: Serializable>(&self) -> Option<T> {
        T::from_storable(&self.to_value()).ok()
    }

    /// The storable form of the boxed value.
    pub fn to_value(&self) -> Value {
        match self {
            AnySerializable::Nil => Value::Null,
            AnySerializable::Bool(b) => Value::Bool(*b),
            AnySerializable::I8(v) => Value::Integer((*v).into()),
            AnySerializable::I16(v) => Value::Integer((*v).into()),
            AnySerializable::I32(v) => Value::Integer((*v).into()),
            AnySerializable::I64(v) => Value::Integer(*v),
            AnySerializable::U8(v) => Value::Integer((*v).into()),
            AnySerializable::U16(v) => Value::Integer((*v).into()),
            AnySerializable::U32(v) => Value::Integer((*v).into()),
            AnySerializable::U64(v) => Value::unsigned(*v),
            AnySerializable::Double(f) => Value::Float(*f),
            AnySerializable::Float(f) => Value::Float((*f).into()),
            AnySerializable::String(s) => Value::String(s.clone()),
            AnySerializable::Data(d) => Value::Bytes(d.clone()),
            AnySerializable::Date(d) => Value::Date(*d),
            AnySerializable::Array(items) => {
                Value::Array(items.iter().map(AnySerializable::to_value).collect())
            }
            AnySerializable::Dictionary(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect(),
            ),
        }
    }

    /// Box a stored value.
    ///
    /// Integers come back as `I64` when they fit and `U64` otherwise;
    /// floating point comes back as `Double`. The original width of a
    /// boxed number is not recorded by the store.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => AnySerializable::Nil,
            Value::Bool(b) => AnySerializable::Bool(*b),
            Value::Integer(i) => AnySerializable::I64(*i),
            Value::Unsigned(u) => match i64::try_from(*u) {
                Ok(i) => AnySerializable::I64(i),
                Err(_) => AnySerializable::U64(*u),
            },
            Value::Float(f) => AnySerializable::Double(*f),
            Value::String(s) => AnySerializable::String(s.clone()),
            Value::Date(d) => AnySerializable::Date(*d),
            Value::Bytes(b) => AnySerializable::Data(b.clone()),
            Value::Array(items) => {
                AnySerializable::Array(items.iter().map(AnySerializable::from_value).collect())
            }
            Value::Map(map) => AnySerializable::Dictionary(
                map.iter()
                    .map(|(k, v)| (k.clone(), AnySerializable::from_value(v)))
                    .collect(),
            ),
        }
    }
}

/// Values compare by their runtime value: integers of any width are equal
/// when numerically equal, and `Float`/`Double` compare as `f64`.
impl PartialEq for AnySerializable {
    fn eq(&self, other: &Self) -> bool {
        use AnySerializable::*;

        if let (Some(a), Some(b)) = (self.integer(), other.integer()) {
            return a == b;
        }

        match (self, other) {
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Double(_) | Float(_), Double(_) | Float(_)) => self.as_f64() == other.as_f64(),
            (String(a), String(b)) => a == b,
            (Data(a), Data(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Dictionary(a), Dictionary(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! from_payload {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for AnySerializable {
                fn from(value: $ty) -> Self {
                    AnySerializable::$variant(value)
                }
            }
        )*
    };
}

from_payload! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f64 => Double,
    f32 => Float,
    String => String,
    DateTime<Utc> => Date,
}

impl From<isize> for AnySerializable {
    fn from(value: isize) -> Self {
        AnySerializable::I64(value as i64)
    }
}

impl From<usize> for AnySerializable {
    fn from(value: usize) -> Self {
        AnySerializable::U64(value as u64)
    }
}

impl From<&str> for AnySerializable {
    fn from(value: &str) -> Self {
        AnySerializable::String(value.to_string())
    }
}

impl From<Blob> for AnySerializable {
    fn from(value: Blob) -> Self {
        AnySerializable::Data(value.0)
    }
}

impl<T: Into<AnySerializable>> From<Option<T>> for AnySerializable {
    fn from(value: Option<T>) -> Self {
        value.map_or(AnySerializable::Nil, Into::into)
    }
}

impl<T: Into<AnySerializable>> From<Vec<T>> for AnySerializable {
    fn from(values: Vec<T>) -> Self {
        AnySerializable::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AnySerializable>> From<BTreeMap<String, T>> for AnySerializable {
    fn from(map: BTreeMap<String, T>) -> Self {
        AnySerializable::Dictionary(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<AnySerializable>> From<HashMap<String, T>> for AnySerializable {
    fn from(map: HashMap<String, T>) -> Self {
        AnySerializable::Dictionary(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// Build an `AnySerializable` from literal-like syntax.
///
/// Supports `null`, `[..]` lists, `{ "key": value }` maps and any
/// expression with a `From` conversion. Unsuffixed integer literals box as
/// `I64`.
/// Negative numbers and other multi-token elements must be parenthesized
/// inside lists and maps, e.g. `any!([(-1), 2])`.
#[macro_export]
macro_rules! any {
    (null) => {
        $crate::AnySerializable::Nil
    };
    ([ $($element:tt),* $(,)? ]) => {
        $crate::AnySerializable::Array(::std::vec![ $( $crate::any!($element) ),* ])
    };
    ({ $($key:literal : $value:tt),* $(,)? }) => {
        $crate::AnySerializable::Dictionary({
            #[allow(unused_mut)]
            let mut map = ::std::collections::BTreeMap::new();
            $( map.insert(::std::string::String::from($key), $crate::any!($value)); )*
            map
        })
    };
    (( $($inner:tt)* )) => {
        $crate::any!($($inner)*)
    };
    ($value:literal) => {
        $crate::AnySerializable::from_literal($value)
    };
    ($value:expr) => {
        $crate::AnySerializable::from($value)
    };
}

#[doc(hidden)]
pub trait LiteralValue {
    fn into_any(self) -> AnySerializable;
}

macro_rules! literal_value {
    ($($ty:ty => $convert:expr),* $(,)?) => {
        $(
            impl LiteralValue for $ty {
                fn into_any(self) -> AnySerializable {
                    let convert: fn($ty) -> AnySerializable = $convert;
                    convert(self)
                }
            }
        )*
    };
}

literal_value! {
    i32 => |v| AnySerializable::I64(v.into()),
    i8 => AnySerializable::I8,
    i16 => AnySerializable::I16,
    i64 => AnySerializable::I64,
    u8 => AnySerializable::U8,
    u16 => AnySerializable::U16,
    u32 => AnySerializable::U32,
    u64 => AnySerializable::U64,
    f32 => AnySerializable::Float,
    f64 => AnySerializable::Double,
    bool => AnySerializable::Bool,
    &'static str => AnySerializable::from,
    char => |c| AnySerializable::String(c.to_string()),
}

impl AnySerializable {
    #[doc(hidden)]
    pub fn from_literal(value: impl LiteralValue) -> Self {
        value.into_any()
    }
}

/// Bridge for `AnySerializable`.
///
/// Decoding never fails: every storable shape has a boxed counterpart.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyBridge;

impl Bridge for AnyBridge {
    type Native = AnySerializable;

    fn kind(&self) -> BridgeKind {
        BridgeKind::Any
    }

    fn serialize(&self, value: &AnySerializable) -> Result<Value, BridgeError> {
        Ok(value.to_value())
    }

    fn deserialize(&self, value: &Value) -> Result<AnySerializable, BridgeError> {
        Ok(AnySerializable::from_value(value))
    }
}

impl Serializable for AnySerializable {
    type Bridge = AnyBridge;

    fn bridge() -> AnyBridge {
        AnyBridge
    }

    fn is_nil(&self) -> bool {
        AnySerializable::is_nil(self)
    }
}
