//! Generic struct codec.
//!
//! Serializes any `Reflect` struct to a field-name map and builds it back
//! from a possibly partial map. Decoding is best-effort: fields missing from
//! the map keep their zero value and fields that fail to decode are skipped.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use prefs_core_store::Value;

use crate::{type_layout, Bridge, BridgeError, BridgeKind, Reflect};

/// Serialize a struct into a map keyed by field name.
///
/// Fields holding a nil value (e.g. `None`) are omitted.
pub fn serialize_struct<T: Reflect>(instance: &T) -> Result<BTreeMap<String, Value>, BridgeError> {
    let layout = type_layout::<T>()?;
    let mut map = BTreeMap::new();

    for field in &layout.fields {
        match field.read(instance) {
            Ok(Value::Null) => {}
            Ok(value) => {
                map.insert(field.name.to_string(), value);
            }
            Err(error) => {
                tracing::debug!(
                    owner = layout.type_handle.name(),
                    field = field.name,
                    %error,
                    "skipping unserializable field"
                );
            }
        }
    }

    Ok(map)
}

/// Build a struct from a map keyed by field name.
pub fn deserialize_struct<T: Reflect>(map: &BTreeMap<String, Value>) -> Result<T, BridgeError> {
    let layout = type_layout::<T>()?;
    let mut instance = T::zeroed();

    for field in &layout.fields {
        let Some(value) = map.get(field.name) else {
            continue;
        };

        if let Err(source) = field.write(&mut instance, value) {
            let error = BridgeError::UnresolvedFieldType {
                owner: layout.type_handle.name(),
                field: field.name,
                source: Box::new(source),
            };
            tracing::debug!(%error, "skipping field");
        }
    }

    Ok(instance)
}

/// Bridge of last resort for plain structs.
pub struct ObjectBridge<T>(PhantomData<fn() -> T>);

impl<T> ObjectBridge<T> {
    pub const fn new() -> Self {
        ObjectBridge(PhantomData)
    }
}

impl<T> Default for ObjectBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Reflect> Bridge for ObjectBridge<T> {
    type Native = T;

    fn kind(&self) -> BridgeKind {
        BridgeKind::Object
    }

    fn serialize(&self, value: &T) -> Result<Value, BridgeError> {
        serialize_struct(value).map(Value::Map)
    }

    fn deserialize(&self, value: &Value) -> Result<T, BridgeError> {
        let map = value
            .as_map()
            .ok_or_else(|| BridgeError::mismatch("map", value))?;
        deserialize_struct(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{reflect_struct, Serializable, TypeKind};
    use collection_literals::btree;

    reflect_struct! {
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct TimeZone {
            pub id: String,
            pub name: String,
        }
    }

    reflect_struct! {
        #[derive(Debug, PartialEq)]
        struct Window {
            pub title: String,
            pub width: u32,
            zoom: Option<f64>,
            tags: Vec<String>,
        }
    }

    reflect_struct! {
        #[derive(Debug, PartialEq)]
        struct Profile {
            zone: TimeZone,
            history: Vec<TimeZone>,
        }
    }

    #[derive(Debug)]
    struct Shared;

    impl Reflect for Shared {
        const KIND: TypeKind = TypeKind::Class;

        fn describe_fields() -> Vec<crate::FieldDescriptor<Self>> {
            Vec::new()
        }

        fn zeroed() -> Self {
            Shared
        }
    }

    #[test]
    fn struct_roundtrip_through_bridge() {
        let zone = TimeZone {
            id: "0".to_string(),
            name: "Asia/Taipei".to_string(),
        };

        let stored = zone.to_storable().unwrap();
        assert_eq!(
            stored,
            Value::Map(btree! {
                "id".to_string() => Value::from("0"),
                "name".to_string() => Value::from("Asia/Taipei"),
            })
        );
        assert_eq!(TimeZone::from_storable(&stored).unwrap(), zone);
        assert_eq!(TimeZone::bridge().kind(), BridgeKind::Object);
    }

    #[test]
    fn missing_field_keeps_zero_value() {
        let map = btree! {
            "title".to_string() => Value::from("main"),
            "width".to_string() => Value::Integer(1024),
        };

        let window: Window = deserialize_struct(&map).unwrap();
        assert_eq!(window.title, "main");
        assert_eq!(window.width, 1024);
        assert_eq!(window.zoom, None);
        assert!(window.tags.is_empty());
    }

    #[test]
    fn bad_field_is_skipped() {
        let map = btree! {
            "title".to_string() => Value::Integer(5),
            "width".to_string() => Value::Integer(300),
            "zoom".to_string() => Value::Float(1.5),
        };

        let window: Window = deserialize_struct(&map).unwrap();
        assert_eq!(window.title, "");
        assert_eq!(window.width, 300);
        assert_eq!(window.zoom, Some(1.5));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let map = btree! {
            "id".to_string() => Value::from("7"),
            "legacy".to_string() => Value::Bool(true),
        };

        let zone: TimeZone = deserialize_struct(&map).unwrap();
        assert_eq!(zone.id, "7");
        assert_eq!(zone.name, "");
    }

    #[test]
    fn nil_fields_are_omitted() {
        let window = Window {
            title: "t".to_string(),
            width: 1,
            zoom: None,
            tags: vec!["a".to_string()],
        };

        let map = serialize_struct(&window).unwrap();
        assert!(!map.contains_key("zoom"));
        assert_eq!(map.get("tags"), Some(&Value::from(vec!["a"])));
        assert_eq!(deserialize_struct::<Window>(&map).unwrap(), window);
    }

    #[test]
    fn nested_structs() {
        let zone = TimeZone {
            id: "1".to_string(),
            name: "Europe/Oslo".to_string(),
        };
        let profile = Profile {
            zone: zone.clone(),
            history: vec![zone.clone(), zone],
        };

        let stored = profile.to_storable().unwrap();
        assert_eq!(Profile::from_storable(&stored).unwrap(), profile);
    }

    #[test]
    fn non_map_value_is_a_mismatch() {
        let err = TimeZone::from_storable(&Value::from("Asia/Taipei")).unwrap_err();
        assert!(matches!(err, BridgeError::BridgeMismatch { .. }));
    }

    #[test]
    fn class_types_cannot_use_the_codec() {
        let err = serialize_struct(&Shared).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedKind { .. }));

        let err = deserialize_struct::<Shared>(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedKind { .. }));
    }

    #[test]
    fn mutability_follows_visibility() {
        let layout = type_layout::<Window>().unwrap();
        assert!(layout.field("title").unwrap().is_mutable);
        assert!(!layout.field("zoom").unwrap().is_mutable);
    }
}
