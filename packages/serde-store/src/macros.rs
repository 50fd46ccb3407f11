//! Declaration macros.

/// Declare a plain struct and derive its layout for the generic struct codec.
///
/// Every field type must be `Serializable` and `Default`; the default is the
/// zero value a field keeps when a stored map lacks it. Fields declared with
/// a visibility are reported as mutable.
///
/// ```rust
/// use prefs_serde_store::{reflect_struct, Serializable, Value};
///
/// reflect_struct! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct TimeZone {
///         pub id: String,
///         pub name: String,
///     }
/// }
///
/// let zone = TimeZone { id: "0".into(), name: "Asia/Taipei".into() };
/// let stored = zone.to_storable().unwrap();
/// assert!(matches!(stored, Value::Map(_)));
/// assert_eq!(TimeZone::from_storable(&stored).unwrap(), zone);
/// ```
///
/// Generic structs are not accepted; implement `Reflect` and `Serializable`
/// by hand for those.
#[macro_export]
macro_rules! reflect_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $field_ty,
            )*
        }

        impl $crate::Reflect for $name {
            fn describe_fields() -> ::std::vec::Vec<$crate::FieldDescriptor<Self>> {
                ::std::vec![
                    $(
                        $crate::FieldDescriptor::new(
                            ::core::stringify!($field),
                            $crate::TypeHandle::of::<$field_ty>(),
                            !::core::stringify!($field_vis).is_empty(),
                            ::core::mem::offset_of!($name, $field),
                            |instance: &Self| $crate::Serializable::to_storable(&instance.$field),
                            |instance: &mut Self, value: &$crate::Value| {
                                instance.$field =
                                    <$field_ty as $crate::Serializable>::from_storable(value)?;
                                ::core::result::Result::Ok(())
                            },
                        ),
                    )*
                ]
            }

            fn zeroed() -> Self {
                $name {
                    $( $field: ::core::default::Default::default(), )*
                }
            }
        }

        impl $crate::Serializable for $name {
            type Bridge = $crate::ObjectBridge<Self>;

            fn bridge() -> Self::Bridge {
                $crate::ObjectBridge::new()
            }
        }

        $crate::serializable!(@check Object, $crate::Capabilities::NONE.with_plain_struct());
    };
}

/// Give a type a `Serializable` impl from its declared capabilities.
///
/// | Declaration | Bridge |
/// |---|---|
/// | `serializable!(codable: T)` | `CodableBridge` (JSON envelope) |
/// | `serializable!(raw_value: T)` | `RawValueBridge` |
/// | `serializable!(raw_value, codable: T)` | `RawValueCodableBridge` |
/// | `serializable!(secure_archive: T)` | `ArchiveBridge` |
/// | `serializable!(codable, secure_archive: T)` | `CodableBridge` |
/// | `serializable!(custom(B): T)` | `B`, built with `Default` |
///
/// When several capabilities are declared the bridge is the one
/// `BridgeKind::resolve` selects, checked at compile time.
///
/// ```rust
/// use prefs_serde_store::{serializable, Serializable, Value};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Window {
///     width: u32,
/// }
///
/// serializable!(codable: Window);
///
/// let stored = Window { width: 640 }.to_storable().unwrap();
/// assert_eq!(stored, Value::from(r#"{"width":640}"#));
/// ```
#[macro_export]
macro_rules! serializable {
    (codable: $ty:ty) => {
        $crate::serializable!(@bridge $ty, CodableBridge);
        $crate::serializable!(@check Codable, $crate::Capabilities::NONE.with_codable());
    };
    (raw_value: $ty:ty) => {
        $crate::serializable!(@bridge $ty, RawValueBridge);
        $crate::serializable!(@check RawValue, $crate::Capabilities::NONE.with_raw_representable());
    };
    (raw_value, codable: $ty:ty) => {
        $crate::serializable!(@bridge $ty, RawValueCodableBridge);
        $crate::serializable!(
            @check RawValueCodable,
            $crate::Capabilities::NONE.with_raw_representable().with_codable()
        );
    };
    (codable, raw_value: $ty:ty) => {
        $crate::serializable!(raw_value, codable: $ty);
    };
    (secure_archive: $ty:ty) => {
        $crate::serializable!(@bridge $ty, ArchiveBridge);
        $crate::serializable!(
            @check SecureArchive,
            $crate::Capabilities::NONE.with_secure_archivable()
        );
    };
    (codable, secure_archive: $ty:ty) => {
        $crate::serializable!(@bridge $ty, CodableBridge);
        $crate::serializable!(
            @check Codable,
            $crate::Capabilities::NONE.with_codable().with_secure_archivable()
        );
    };
    (secure_archive, codable: $ty:ty) => {
        $crate::serializable!(codable, secure_archive: $ty);
    };
    (custom($bridge:ty): $ty:ty) => {
        impl $crate::Serializable for $ty {
            type Bridge = $bridge;

            fn bridge() -> Self::Bridge {
                <$bridge as ::core::default::Default>::default()
            }
        }
        $crate::serializable!(@check Custom, $crate::Capabilities::NONE.with_custom_bridge());
    };
    (@bridge $ty:ty, $bridge:ident) => {
        impl $crate::Serializable for $ty {
            type Bridge = $crate::$bridge<Self>;

            fn bridge() -> Self::Bridge {
                $crate::$bridge::new()
            }
        }
    };
    (@check $kind:ident, $caps:expr) => {
        const _: () = ::core::assert!(::core::matches!(
            $crate::BridgeKind::resolve($caps),
            ::core::option::Option::Some($crate::BridgeKind::$kind)
        ));
    };
}
