//! Collection combinators.
//!
//! Each combinator wraps its element type's bridge. When the element type is
//! natively supported the whole collection takes the native fast path;
//! otherwise elements are bridged one by one. Elements that fail to convert
//! are dropped and logged, never fatal for the collection.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::marker::PhantomData;

use prefs_core_store::Value;

use crate::{Bridge, BridgeError, BridgeKind, Serializable};

fn keep<T>(position: impl ToString, result: Result<T, BridgeError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(source) => {
            let error = BridgeError::element(position, source);
            tracing::debug!(%error, "dropping collection element");
            None
        }
    }
}

fn serialize_elements<'a, T, I>(elements: I) -> Value
where
    T: Serializable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    Value::Array(
        elements
            .into_iter()
            .enumerate()
            .filter_map(|(i, element)| keep(i, element.to_storable()))
            .collect(),
    )
}

fn deserialize_elements<T: Serializable>(value: &Value) -> Result<Vec<T>, BridgeError> {
    let items = value
        .as_array()
        .ok_or_else(|| BridgeError::mismatch("array", value))?;

    Ok(items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| keep(i, T::from_storable(item)))
        .collect())
}

fn native_elements<'a, T, I>(elements: I) -> Option<Value>
where
    T: Serializable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    elements
        .into_iter()
        .map(Serializable::to_native)
        .collect::<Option<Vec<_>>>()
        .map(Value::Array)
}

fn from_native_elements<T: Serializable>(value: &Value) -> Option<Vec<T>> {
    value.as_array()?.iter().map(T::from_native).collect()
}

macro_rules! bridge_struct {
    ($name:ident) => {
        pub struct $name<T>(PhantomData<fn() -> T>);

        impl<T> $name<T> {
            pub const fn new() -> Self {
                $name(PhantomData)
            }
        }

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

bridge_struct!(OptionalBridge);
bridge_struct!(ArrayBridge);
bridge_struct!(DictionaryBridge);
bridge_struct!(SetBridge);
bridge_struct!(SetAlgebraBridge);
bridge_struct!(CollectionBridge);

// Optional

impl<T: Serializable> Bridge for OptionalBridge<T> {
    type Native = Option<T>;

    fn kind(&self) -> BridgeKind {
        BridgeKind::Optional
    }

    fn serialize(&self, value: &Option<T>) -> Result<Value, BridgeError> {
        match value {
            Some(inner) => inner.to_storable(),
            None => Ok(Value::Null),
        }
    }

    fn deserialize(&self, value: &Value) -> Result<Option<T>, BridgeError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_storable(value).map(Some)
    }
}

impl<T: Serializable> Serializable for Option<T> {
    type Bridge = OptionalBridge<T>;
    const IS_NATIVELY_SUPPORTED: bool = T::IS_NATIVELY_SUPPORTED;

    fn bridge() -> Self::Bridge {
        OptionalBridge::new()
    }

    fn to_native(&self) -> Option<Value> {
        match self {
            Some(inner) => inner.to_native(),
            None => Some(Value::Null),
        }
    }

    fn from_native(value: &Value) -> Option<Self> {
        if value.is_null() {
            return Some(None);
        }
        T::from_native(value).map(Some)
    }

    fn is_nil(&self) -> bool {
        self.is_none()
    }
}

// Ordered list

impl<T: Serializable> Bridge for ArrayBridge<T> {
    type Native = Vec<T>;

    fn kind(&self) -> BridgeKind {
        BridgeKind::Array
    }

    fn serialize(&self, value: &Vec<T>) -> Result<Value, BridgeError> {
        Ok(serialize_elements(value))
    }

    fn deserialize(&self, value: &Value) -> Result<Vec<T>, BridgeError> {
        deserialize_elements(value)
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    type Bridge = ArrayBridge<T>;
    const IS_NATIVELY_SUPPORTED: bool = T::IS_NATIVELY_SUPPORTED;

    fn bridge() -> Self::Bridge {
        ArrayBridge::new()
    }

    fn to_native(&self) -> Option<Value> {
        native_elements(self)
    }

    fn from_native(value: &Value) -> Option<Self> {
        from_native_elements(value)
    }
}

// String-keyed map

/// A map with string keys, bridged as a `Value::Map`.
pub trait DictionarySerializable: Sized + 'static {
    type Element: Serializable;

    fn entries(&self) -> impl Iterator<Item = (&String, &Self::Element)>;

    fn from_entries(entries: impl Iterator<Item = (String, Self::Element)>) -> Self;
}

impl<V: Serializable> DictionarySerializable for HashMap<String, V> {
    type Element = V;

    fn entries(&self) -> impl Iterator<Item = (&String, &V)> {
        self.iter()
    }

    fn from_entries(entries: impl Iterator<Item = (String, V)>) -> Self {
        entries.collect()
    }
}

impl<V: Serializable> DictionarySerializable for BTreeMap<String, V> {
    type Element = V;

    fn entries(&self) -> impl Iterator<Item = (&String, &V)> {
        self.iter()
    }

    fn from_entries(entries: impl Iterator<Item = (String, V)>) -> Self {
        entries.collect()
    }
}

impl<M: DictionarySerializable> Bridge for DictionaryBridge<M> {
    type Native = M;

    fn kind(&self) -> BridgeKind {
        BridgeKind::Dictionary
    }

    fn serialize(&self, value: &M) -> Result<Value, BridgeError> {
        Ok(Value::Map(
            value
                .entries()
                .filter_map(|(key, element)| {
                    keep(key, element.to_storable()).map(|stored| (key.clone(), stored))
                })
                .collect(),
        ))
    }

    fn deserialize(&self, value: &Value) -> Result<M, BridgeError> {
        let map = value
            .as_map()
            .ok_or_else(|| BridgeError::mismatch("map", value))?;

        Ok(M::from_entries(map.iter().filter_map(|(key, item)| {
            keep(key, M::Element::from_storable(item)).map(|element| (key.clone(), element))
        })))
    }
}

fn dictionary_to_native<M: DictionarySerializable>(map: &M) -> Option<Value> {
    map.entries()
        .map(|(key, element)| element.to_native().map(|stored| (key.clone(), stored)))
        .collect::<Option<BTreeMap<_, _>>>()
        .map(Value::Map)
}

fn dictionary_from_native<M: DictionarySerializable>(value: &Value) -> Option<M> {
    let entries = value
        .as_map()?
        .iter()
        .map(|(key, item)| M::Element::from_native(item).map(|element| (key.clone(), element)))
        .collect::<Option<Vec<_>>>()?;
    Some(M::from_entries(entries.into_iter()))
}

impl<V: Serializable> Serializable for HashMap<String, V> {
    type Bridge = DictionaryBridge<Self>;
    const IS_NATIVELY_SUPPORTED: bool = V::IS_NATIVELY_SUPPORTED;

    fn bridge() -> Self::Bridge {
        DictionaryBridge::new()
    }

    fn to_native(&self) -> Option<Value> {
        dictionary_to_native(self)
    }

    fn from_native(value: &Value) -> Option<Self> {
        dictionary_from_native(value)
    }
}

impl<V: Serializable> Serializable for BTreeMap<String, V> {
    type Bridge = DictionaryBridge<Self>;
    const IS_NATIVELY_SUPPORTED: bool = V::IS_NATIVELY_SUPPORTED;

    fn bridge() -> Self::Bridge {
        DictionaryBridge::new()
    }

    fn to_native(&self) -> Option<Value> {
        dictionary_to_native(self)
    }

    fn from_native(value: &Value) -> Option<Self> {
        dictionary_from_native(value)
    }
}

// Set

impl<T: Serializable + Eq + Hash> Bridge for SetBridge<T> {
    type Native = HashSet<T>;

    fn kind(&self) -> BridgeKind {
        BridgeKind::Set
    }

    fn serialize(&self, value: &HashSet<T>) -> Result<Value, BridgeError> {
        Ok(serialize_elements(value))
    }

    fn deserialize(&self, value: &Value) -> Result<HashSet<T>, BridgeError> {
        deserialize_elements(value).map(|elements| elements.into_iter().collect())
    }
}

impl<T: Serializable + Eq + Hash> Serializable for HashSet<T> {
    type Bridge = SetBridge<T>;
    const IS_NATIVELY_SUPPORTED: bool = T::IS_NATIVELY_SUPPORTED;

    fn bridge() -> Self::Bridge {
        SetBridge::new()
    }

    fn to_native(&self) -> Option<Value> {
        native_elements(self)
    }

    fn from_native(value: &Value) -> Option<Self> {
        from_native_elements(value).map(|elements| elements.into_iter().collect())
    }
}

// Set algebra and generic collections

/// A set-like container of unique elements, bridged as a `Value::Array`.
pub trait SetAlgebraSerializable: Sized + 'static {
    type Element: Serializable;

    fn elements(&self) -> impl Iterator<Item = &Self::Element>;

    /// Build the set; duplicate elements collapse.
    fn from_elements(elements: Vec<Self::Element>) -> Self;
}

/// An ordered container, bridged as a `Value::Array`.
pub trait CollectionSerializable: Sized + 'static {
    type Element: Serializable;

    fn elements(&self) -> impl Iterator<Item = &Self::Element>;

    fn from_elements(elements: Vec<Self::Element>) -> Self;
}

impl<T: Serializable + Ord> SetAlgebraSerializable for BTreeSet<T> {
    type Element = T;

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn from_elements(elements: Vec<T>) -> Self {
        elements.into_iter().collect()
    }
}

impl<T: Serializable> CollectionSerializable for VecDeque<T> {
    type Element = T;

    fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn from_elements(elements: Vec<T>) -> Self {
        elements.into()
    }
}

impl<S: SetAlgebraSerializable> Bridge for SetAlgebraBridge<S> {
    type Native = S;

    fn kind(&self) -> BridgeKind {
        BridgeKind::SetAlgebra
    }

    fn serialize(&self, value: &S) -> Result<Value, BridgeError> {
        Ok(serialize_elements(value.elements()))
    }

    fn deserialize(&self, value: &Value) -> Result<S, BridgeError> {
        deserialize_elements(value).map(S::from_elements)
    }
}

impl<C: CollectionSerializable> Bridge for CollectionBridge<C> {
    type Native = C;

    fn kind(&self) -> BridgeKind {
        BridgeKind::Collection
    }

    fn serialize(&self, value: &C) -> Result<Value, BridgeError> {
        Ok(serialize_elements(value.elements()))
    }

    fn deserialize(&self, value: &Value) -> Result<C, BridgeError> {
        deserialize_elements(value).map(C::from_elements)
    }
}

impl<T: Serializable + Ord> Serializable for BTreeSet<T> {
    type Bridge = SetAlgebraBridge<Self>;
    const IS_NATIVELY_SUPPORTED: bool = T::IS_NATIVELY_SUPPORTED;

    fn bridge() -> Self::Bridge {
        SetAlgebraBridge::new()
    }

    fn to_native(&self) -> Option<Value> {
        native_elements(self)
    }

    fn from_native(value: &Value) -> Option<Self> {
        from_native_elements(value).map(Self::from_elements)
    }
}

impl<T: Serializable> Serializable for VecDeque<T> {
    type Bridge = CollectionBridge<Self>;
    const IS_NATIVELY_SUPPORTED: bool = T::IS_NATIVELY_SUPPORTED;

    fn bridge() -> Self::Bridge {
        CollectionBridge::new()
    }

    fn to_native(&self) -> Option<Value> {
        native_elements(self)
    }

    fn from_native(value: &Value) -> Option<Self> {
        from_native_elements(value).map(Self::from_elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;

    /// A type that is never natively supported, to force per-element bridging.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
    struct Even(i64);

    struct EvenBridge;

    impl Bridge for EvenBridge {
        type Native = Even;

        fn kind(&self) -> BridgeKind {
            BridgeKind::Custom
        }

        fn serialize(&self, value: &Even) -> Result<Value, BridgeError> {
            Ok(Value::Integer(value.0))
        }

        fn deserialize(&self, value: &Value) -> Result<Even, BridgeError> {
            match value.as_i64() {
                Some(i) if i % 2 == 0 => Ok(Even(i)),
                _ => Err(BridgeError::mismatch("even integer", value)),
            }
        }
    }

    impl Serializable for Even {
        type Bridge = EvenBridge;

        fn bridge() -> EvenBridge {
            EvenBridge
        }
    }

    fn ints(values: &[i64]) -> Value {
        Value::Array(values.iter().copied().map(Value::Integer).collect())
    }

    #[test]
    fn native_elements_take_fast_path() {
        assert!(<Vec<String>>::IS_NATIVELY_SUPPORTED);
        assert!(!<Vec<Even>>::IS_NATIVELY_SUPPORTED);

        let tags = vec!["a".to_string(), "b".to_string()];
        assert_eq!(tags.to_storable().unwrap(), Value::from(vec!["a", "b"]));
        assert_eq!(<Vec<String>>::from_storable(&Value::from(vec!["a", "b"])).unwrap(), tags);
    }

    #[test]
    fn fast_path_and_bridge_agree() {
        let values = vec![1i64, 2, 3];
        let via_bridge = ArrayBridge::<i64>::new().serialize(&values).unwrap();
        assert_eq!(via_bridge, values.to_storable().unwrap());
        assert_eq!(ArrayBridge::<i64>::new().deserialize(&via_bridge).unwrap(), values);
    }

    #[test]
    fn malformed_array_element_is_dropped() {
        let decoded = <Vec<Even>>::from_storable(&ints(&[2, 3, 4, 6])).unwrap();
        assert_eq!(decoded, vec![Even(2), Even(4), Even(6)]);
    }

    #[test]
    fn malformed_native_element_is_dropped() {
        let stored = Value::Array(vec![
            Value::from("a"),
            Value::Integer(1),
            Value::from("c"),
        ]);
        let decoded = <Vec<String>>::from_storable(&stored).unwrap();
        assert_eq!(decoded, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn wrong_container_shape_is_a_mismatch() {
        let err = <Vec<Even>>::from_storable(&Value::Integer(2)).unwrap_err();
        assert!(matches!(err, BridgeError::BridgeMismatch { .. }));

        let err = <BTreeMap<String, Even>>::from_storable(&ints(&[2])).unwrap_err();
        assert!(matches!(err, BridgeError::BridgeMismatch { .. }));
    }

    #[test]
    fn optional_nil_and_some() {
        assert!(None::<i64>.is_nil());
        assert!(!Some(1i64).is_nil());

        let bridge = OptionalBridge::<Even>::new();
        assert_eq!(bridge.serialize(&None).unwrap(), Value::Null);
        assert_eq!(bridge.deserialize(&Value::Null).unwrap(), None);
        assert_eq!(bridge.deserialize(&Value::Integer(8)).unwrap(), Some(Even(8)));
        assert!(bridge.deserialize(&Value::Integer(7)).is_err());
    }

    #[test]
    fn array_of_optionals_keeps_nil_elements() {
        let values = vec![Some(1i64), None, Some(3)];
        let stored = values.to_storable().unwrap();
        assert_eq!(
            stored,
            Value::Array(vec![Value::Integer(1), Value::Null, Value::Integer(3)])
        );
        assert_eq!(<Vec<Option<i64>>>::from_storable(&stored).unwrap(), values);
    }

    #[test]
    fn dictionary_drops_bad_entries() {
        let stored = Value::Map(btree! {
            "a".to_string() => Value::Integer(2),
            "b".to_string() => Value::Integer(5),
            "c".to_string() => Value::Integer(10),
        });

        let decoded = <HashMap<String, Even>>::from_storable(&stored).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.get("c"), Some(&Even(10)));
        assert!(!decoded.contains_key("b"));

        let sorted = <BTreeMap<String, Even>>::from_storable(&stored).unwrap();
        assert_eq!(sorted.keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(sorted.to_storable().unwrap(), Value::Map(btree! {
            "a".to_string() => Value::Integer(2),
            "c".to_string() => Value::Integer(10),
        }));
    }

    #[test]
    fn native_dictionary_roundtrip() {
        let counts: BTreeMap<String, i64> = btree! {
            "x".to_string() => 1,
            "y".to_string() => 2,
        };
        let stored = counts.to_storable().unwrap();
        assert_eq!(stored, Value::from(counts.clone()));
        assert_eq!(<BTreeMap<String, i64>>::from_storable(&stored).unwrap(), counts);
    }

    #[test]
    fn sets_roundtrip_and_drop_bad_elements() {
        let set: HashSet<Even> = [Even(2), Even(4)].into_iter().collect();
        let stored = set.to_storable().unwrap();
        assert_eq!(<HashSet<Even>>::from_storable(&stored).unwrap(), set);

        let decoded = <HashSet<Even>>::from_storable(&ints(&[2, 9, 2])).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(SetBridge::<Even>::new().kind(), BridgeKind::Set);
    }

    #[test]
    fn set_algebra_collapses_duplicates() {
        let decoded = <BTreeSet<Even>>::from_storable(&ints(&[4, 2, 4, 1])).unwrap();
        assert_eq!(decoded.into_iter().collect::<Vec<_>>(), vec![Even(2), Even(4)]);

        let set: BTreeSet<i64> = [3, 1, 2].into_iter().collect();
        assert_eq!(set.to_storable().unwrap(), ints(&[1, 2, 3]));
        assert_eq!(BTreeSet::<i64>::bridge().kind(), BridgeKind::SetAlgebra);
    }

    #[test]
    fn collection_keeps_order() {
        let queue: VecDeque<Even> = [Even(6), Even(2)].into_iter().collect();
        let stored = queue.to_storable().unwrap();
        assert_eq!(stored, ints(&[6, 2]));
        assert_eq!(<VecDeque<Even>>::from_storable(&stored).unwrap(), queue);
        assert_eq!(VecDeque::<Even>::bridge().kind(), BridgeKind::Collection);
    }

    #[test]
    fn nested_collections() {
        let nested = vec![vec![Even(2)], vec![Even(3), Even(4)]];
        let stored = nested.to_storable().unwrap();
        let decoded = <Vec<Vec<Even>>>::from_storable(&stored).unwrap();
        assert_eq!(decoded, vec![vec![Even(2)], vec![Even(4)]]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Roundtrip property: collections of native elements survive both paths
        #[test]
        fn prop_vec_roundtrip(values in proptest::collection::vec(any::<i64>(), 0..32)) {
            let stored = values.to_storable().unwrap();
            prop_assert_eq!(<Vec<i64>>::from_storable(&stored).unwrap(), values.clone());

            let bridge = ArrayBridge::<i64>::new();
            prop_assert_eq!(bridge.deserialize(&bridge.serialize(&values).unwrap()).unwrap(), values);
        }

        #[test]
        fn prop_map_roundtrip(map in proptest::collection::btree_map(".*", any::<Option<bool>>(), 0..16)) {
            let stored = map.to_storable().unwrap();
            prop_assert_eq!(<BTreeMap<String, Option<bool>>>::from_storable(&stored).unwrap(), map);
        }
    }
}
