//! Memory layout reader.
//!
//! Describes a plain struct's fields (name, type, mutability, byte offset,
//! owner) so the generic struct codec can serialize it without a hand
//! written codec. Descriptors are generated at compile time by
//! `reflect_struct!` (or a hand written `Reflect` impl for generic structs)
//! and cached once per type for the life of the process.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::{PoisonError, RwLock};

use lazy_static::lazy_static;
use prefs_core_store::Value;

use crate::BridgeError;

/// Identity of a type at runtime.
#[derive(Clone, Copy)]
pub struct TypeHandle {
    id: TypeId,
    name: &'static str,
}

impl TypeHandle {
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeHandle {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandle({})", self.name)
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Whether a type is a plain value record or has reference semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Struct,
    /// Shared or reference-like types. Their layout is not supported.
    Class,
}

type ReadField<T> = fn(&T) -> Result<Value, BridgeError>;
type WriteField<T> = fn(&mut T, &Value) -> Result<(), BridgeError>;

/// One field of a struct.
pub struct FieldDescriptor<T> {
    pub name: &'static str,
    pub field_type: TypeHandle,
    /// The field is declared with a visibility and can be set from outside
    /// its module.
    pub is_mutable: bool,
    /// Byte offset of the field within `T`.
    pub offset: usize,
    pub owner_type: TypeHandle,
    read: ReadField<T>,
    write: WriteField<T>,
}

impl<T: 'static> FieldDescriptor<T> {
    pub fn new(
        name: &'static str,
        field_type: TypeHandle,
        is_mutable: bool,
        offset: usize,
        read: ReadField<T>,
        write: WriteField<T>,
    ) -> Self {
        FieldDescriptor {
            name,
            field_type,
            is_mutable,
            offset,
            owner_type: TypeHandle::of::<T>(),
            read,
            write,
        }
    }
}

impl<T> FieldDescriptor<T> {
    /// Read the field's current value in storable form.
    pub fn read(&self, instance: &T) -> Result<Value, BridgeError> {
        (self.read)(instance)
    }

    /// Decode `value` and store it in the field.
    pub fn write(&self, instance: &mut T, value: &Value) -> Result<(), BridgeError> {
        (self.write)(instance, value)
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("is_mutable", &self.is_mutable)
            .field("offset", &self.offset)
            .field("owner_type", &self.owner_type)
            .finish()
    }
}

/// Compile-time description of a plain struct.
///
/// Usually derived with `reflect_struct!`. Generic structs implement it by
/// hand; each instantiation gets its own cached layout.
pub trait Reflect: Sized + 'static {
    const KIND: TypeKind = TypeKind::Struct;

    /// Field descriptors in declaration order.
    fn describe_fields() -> Vec<FieldDescriptor<Self>>;

    /// An instance whose fields all hold their zero value.
    fn zeroed() -> Self;
}

/// Layout of a struct type.
#[derive(Debug)]
pub struct TypeLayout<T> {
    pub type_handle: TypeHandle,
    pub size: usize,
    pub alignment: usize,
    pub fields: Vec<FieldDescriptor<T>>,
}

impl<T> TypeLayout<T> {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|field| field.name)
    }
}

lazy_static! {
    static ref LAYOUTS: RwLock<HashMap<TypeId, &'static (dyn Any + Send + Sync)>> =
        RwLock::new(HashMap::new());
}

/// Get the layout of `T`, computing it on first use.
///
/// Fails with `UnsupportedKind` for types that are not struct-like.
pub fn type_layout<T: Reflect>() -> Result<&'static TypeLayout<T>, BridgeError> {
    let unsupported = || BridgeError::UnsupportedKind {
        type_name: type_name::<T>(),
    };

    if T::KIND != TypeKind::Struct {
        return Err(unsupported());
    }

    let id = TypeId::of::<T>();
    let cached = LAYOUTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&id)
        .copied();

    let entry = match cached {
        Some(entry) => entry,
        None => {
            // describe_fields may itself ask for layouts, so no lock is held here.
            tracing::trace!(type_name = type_name::<T>(), "computing type layout");
            let layout = TypeLayout {
                type_handle: TypeHandle::of::<T>(),
                size: mem::size_of::<T>(),
                alignment: mem::align_of::<T>(),
                fields: T::describe_fields(),
            };

            let mut layouts = LAYOUTS.write().unwrap_or_else(PoisonError::into_inner);
            *layouts.entry(id).or_insert_with(|| {
                let leaked: &'static (dyn Any + Send + Sync) = Box::leak(Box::new(layout));
                leaked
            })
        }
    };

    entry.downcast_ref::<TypeLayout<T>>().ok_or_else(unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Serializable;

    #[derive(Debug, Default, PartialEq)]
    struct Pair<A, B> {
        pub first: A,
        second: B,
    }

    impl<A: Serializable + Default, B: Serializable + Default> Reflect for Pair<A, B> {
        fn describe_fields() -> Vec<FieldDescriptor<Self>> {
            vec![
                FieldDescriptor::new(
                    "first",
                    TypeHandle::of::<A>(),
                    true,
                    mem::offset_of!(Self, first),
                    |pair: &Self| pair.first.to_storable(),
                    |pair: &mut Self, value: &Value| {
                        pair.first = A::from_storable(value)?;
                        Ok(())
                    },
                ),
                FieldDescriptor::new(
                    "second",
                    TypeHandle::of::<B>(),
                    false,
                    mem::offset_of!(Self, second),
                    |pair: &Self| pair.second.to_storable(),
                    |pair: &mut Self, value: &Value| {
                        pair.second = B::from_storable(value)?;
                        Ok(())
                    },
                ),
            ]
        }

        fn zeroed() -> Self {
            Pair {
                first: A::default(),
                second: B::default(),
            }
        }
    }

    #[derive(Debug)]
    struct Handle;

    impl Reflect for Handle {
        const KIND: TypeKind = TypeKind::Class;

        fn describe_fields() -> Vec<FieldDescriptor<Self>> {
            Vec::new()
        }

        fn zeroed() -> Self {
            Handle
        }
    }

    /// Reads the layout of its inner pair while describing itself.
    #[derive(Debug, Default)]
    struct Wrapper {
        inner_fields: i64,
    }

    impl Reflect for Wrapper {
        fn describe_fields() -> Vec<FieldDescriptor<Self>> {
            let _inner = type_layout::<Pair<i8, u8>>();

            vec![FieldDescriptor::new(
                "inner_fields",
                TypeHandle::of::<i64>(),
                true,
                mem::offset_of!(Self, inner_fields),
                |wrapper: &Self| wrapper.inner_fields.to_storable(),
                |wrapper: &mut Self, value: &Value| {
                    wrapper.inner_fields = i64::from_storable(value)?;
                    Ok(())
                },
            )]
        }

        fn zeroed() -> Self {
            Wrapper::default()
        }
    }

    #[test]
    fn describes_fields_in_order() {
        let layout = type_layout::<Pair<u8, String>>().unwrap();

        assert_eq!(layout.field_names().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(layout.size, mem::size_of::<Pair<u8, String>>());
        assert_eq!(layout.alignment, mem::align_of::<Pair<u8, String>>());

        let first = layout.field("first").unwrap();
        assert_eq!(first.field_type, TypeHandle::of::<u8>());
        assert_eq!(first.owner_type, TypeHandle::of::<Pair<u8, String>>());
        assert!(first.is_mutable);
        assert!(!layout.field("second").unwrap().is_mutable);
        assert!(layout.field("third").is_none());
    }

    #[test]
    fn offsets_are_distinct_and_in_bounds() {
        let layout = type_layout::<Pair<u64, u8>>().unwrap();
        let first = layout.field("first").unwrap().offset;
        let second = layout.field("second").unwrap().offset;

        assert_ne!(first, second);
        assert!(first + mem::size_of::<u64>() <= layout.size);
        assert!(second + mem::size_of::<u8>() <= layout.size);
    }

    #[test]
    fn generic_instantiations_get_their_own_layout() {
        let ints = type_layout::<Pair<i64, i64>>().unwrap();
        let strings = type_layout::<Pair<String, String>>().unwrap();

        assert_ne!(ints.type_handle, strings.type_handle);
        assert_eq!(
            ints.field("first").unwrap().field_type,
            TypeHandle::of::<i64>()
        );
        assert_eq!(
            strings.field("first").unwrap().field_type,
            TypeHandle::of::<String>()
        );
    }

    #[test]
    fn layout_is_cached() {
        let a = type_layout::<Pair<bool, bool>>().unwrap();
        let b = type_layout::<Pair<bool, bool>>().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn class_types_are_unsupported() {
        let err = type_layout::<Handle>().unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedKind { .. }));
    }

    #[test]
    fn accessors_read_and_write() {
        let layout = type_layout::<Pair<i32, String>>().unwrap();
        let mut pair = Pair::<i32, String>::zeroed();

        layout
            .field("first")
            .unwrap()
            .write(&mut pair, &Value::Integer(9))
            .unwrap();
        assert_eq!(pair.first, 9);
        assert_eq!(
            layout.field("first").unwrap().read(&pair).unwrap(),
            Value::Integer(9)
        );

        let err = layout
            .field("second")
            .unwrap()
            .write(&mut pair, &Value::Bool(true))
            .unwrap_err();
        assert!(matches!(err, BridgeError::BridgeMismatch { .. }));
        assert_eq!(pair.second, "");
    }

    #[test]
    fn field_description_may_read_other_layouts() {
        let layout = type_layout::<Wrapper>().unwrap();
        assert_eq!(layout.field_names().collect::<Vec<_>>(), vec!["inner_fields"]);

        let inner = type_layout::<Pair<i8, u8>>().unwrap();
        assert_eq!(inner.fields.len(), 2);
    }

    #[test]
    fn concurrent_first_use_yields_one_layout() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    type_layout::<Pair<u16, u32>>().unwrap() as *const TypeLayout<Pair<u16, u32>> as usize
                })
            })
            .collect();

        let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addresses.iter().all(|&a| a == addresses[0]));
    }
}
