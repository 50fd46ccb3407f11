//! Natively supported types.
//!
//! These types are held by the store as-is. Their bridge only exists so
//! they can sit inside collections and struct fields like any other type.

use std::any::type_name;
use std::marker::PhantomData;

use prefs_core_store::{DateTime, Utc, Value};
use serde::{Deserialize, Serialize};

use crate::{Bridge, BridgeError, BridgeKind, Serializable};

/// Passthrough bridge for natively supported types.
pub struct NativeBridge<T>(PhantomData<fn() -> T>);

impl<T> NativeBridge<T> {
    pub const fn new() -> Self {
        NativeBridge(PhantomData)
    }
}

impl<T> Default for NativeBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serializable> Bridge for NativeBridge<T> {
    type Native = T;

    fn kind(&self) -> BridgeKind {
        BridgeKind::Native
    }

    fn serialize(&self, value: &T) -> Result<Value, BridgeError> {
        value.to_native().ok_or_else(|| BridgeError::Encode {
            message: format!("{} has no native representation", type_name::<T>()),
        })
    }

    fn deserialize(&self, value: &Value) -> Result<T, BridgeError> {
        T::from_native(value).ok_or_else(|| BridgeError::mismatch(type_name::<T>(), value))
    }
}

/// Binary data stored as a blob.
///
/// A plain `Vec<u8>` is a list of small integers; wrap it in `Blob` to store
/// it as bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Blob(pub Vec<u8>);

impl Blob {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Blob(bytes)
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Blob(bytes.to_vec())
    }
}

macro_rules! native {
    ($ty:ty, |$this:ident| $to:expr, |$value:ident| $from:expr) => {
        impl Serializable for $ty {
            type Bridge = NativeBridge<$ty>;
            const IS_NATIVELY_SUPPORTED: bool = true;

            fn bridge() -> Self::Bridge {
                NativeBridge::new()
            }

            fn to_native(&self) -> Option<Value> {
                let $this = self;
                Some($to)
            }

            fn from_native($value: &Value) -> Option<Self> {
                $from
            }
        }
    };
}

macro_rules! native_signed {
    ($($ty:ty),*) => {
        $(
            native!($ty, |this| Value::Integer(*this as i64), |value| {
                value.as_i64().and_then(|i| <$ty>::try_from(i).ok())
            });
        )*
    };
}

macro_rules! native_unsigned {
    ($($ty:ty),*) => {
        $(
            native!($ty, |this| Value::unsigned(*this as u64), |value| {
                value.as_u64().and_then(|u| <$ty>::try_from(u).ok())
            });
        )*
    };
}

native_signed!(i8, i16, i32, i64, isize);
native_unsigned!(u8, u16, u32, u64, usize);

native!(bool, |this| Value::Bool(*this), |value| value.as_bool());
native!(f64, |this| Value::Float(*this), |value| value.as_f64());
native!(f32, |this| Value::Float(f64::from(*this)), |value| {
    value.as_f64().map(|f| f as f32)
});
native!(String, |this| Value::String(this.clone()), |value| {
    value.as_str().map(str::to_string)
});
native!(Blob, |this| Value::Bytes(this.0.clone()), |value| {
    value.as_bytes().map(Blob::from)
});
native!(DateTime<Utc>, |this| Value::Date(*this), |value| value.as_date());
