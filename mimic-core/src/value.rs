//! Dynamic value model for recorded arguments and results
//!
//! Transcripts are not self-describing, so every decode is directed by a
//! [`ValueType`] supplied by the caller. The typed [`ReplayValue`] trait maps
//! ordinary Rust types onto that model.

use chrono::NaiveDateTime;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{MimicError, Result};

/// A value that can appear as an argument or result in a transcript
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    DateTime(NaiveDateTime),
    List(Vec<Value>),
    /// Key/value pairs in insertion order
    Map(Vec<(Value, Value)>),
    /// Reference to a live object, compared by identity
    Object(ObjectRef),
}

impl Value {
    /// Short name of the value's shape, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// The statically known type a piece of text is decoded into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Str,
    DateTime,
    List(Box<ValueType>),
    Map(Box<ValueType>, Box<ValueType>),
    /// A reference that must be assignable to the given capability
    Object(CapabilityType),
    /// A reference of any type
    AnyObject,
    /// Accepts `null` in addition to the inner type
    Optional(Box<ValueType>),
}

impl ValueType {
    pub fn list(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    pub fn map(key: ValueType, value: ValueType) -> Self {
        ValueType::Map(Box::new(key), Box::new(value))
    }

    pub fn optional(inner: ValueType) -> Self {
        ValueType::Optional(Box::new(inner))
    }

    /// Whether `null` is an acceptable value for this type
    pub fn is_nullable(&self) -> bool {
        !matches!(
            self,
            ValueType::Bool | ValueType::Int | ValueType::Float | ValueType::DateTime
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Str => write!(f, "string"),
            ValueType::DateTime => write!(f, "datetime"),
            ValueType::List(inner) => write!(f, "list<{}>", inner),
            ValueType::Map(k, v) => write!(f, "map<{}, {}>", k, v),
            ValueType::Object(cap) => write!(f, "{}", cap.name()),
            ValueType::AnyObject => write!(f, "object"),
            ValueType::Optional(inner) => write!(f, "{}?", inner),
        }
    }
}

/// Identity of a capability type (usually a trait object such as `dyn Calculator`)
#[derive(Clone)]
pub struct CapabilityType {
    id: TypeId,
    name: String,
}

impl CapabilityType {
    /// Describe the type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Short display name without module path or generic arguments
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for CapabilityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CapabilityType {}

impl std::hash::Hash for CapabilityType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapabilityType").field(&self.name).finish()
    }
}

/// Strip `dyn `, module paths and generic arguments from a type name.
///
/// `dyn my_crate::billing::Calculator + Send` becomes `Calculator`.
pub(crate) fn short_type_name(full: &str) -> String {
    let without_dyn = full.trim_start_matches("dyn ");
    let head = without_dyn
        .split(['<', ' ', '+'])
        .next()
        .unwrap_or(without_dyn);
    head.rsplit("::").next().unwrap_or(head).to_string()
}

/// Cloneable handle to a live object that is referenced, not serialized
#[derive(Clone)]
pub struct ObjectRef {
    // Holds an `Arc<T>` so the original (possibly unsized) handle can be recovered.
    handle: Arc<dyn Any + Send + Sync>,
    capability: CapabilityType,
    address: usize,
}

impl ObjectRef {
    /// Wrap a shared object; the capability is `T` itself
    pub fn new<T: ?Sized + Send + Sync + 'static>(object: Arc<T>) -> Self {
        let address = Arc::as_ptr(&object) as *const () as usize;
        Self {
            handle: Arc::new(object),
            capability: CapabilityType::of::<T>(),
            address,
        }
    }

    /// Convenience for sized values that are not yet shared
    pub fn from_owned<T: Send + Sync + 'static>(object: T) -> Self {
        Self::new(Arc::new(object))
    }

    /// Recover the shared handle if the object was registered as `T`
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.handle.downcast_ref::<Arc<T>>().cloned()
    }

    /// Whether this reference is assignable to `capability`
    pub fn is_a(&self, capability: &CapabilityType) -> bool {
        &self.capability == capability
    }

    pub fn capability(&self) -> &CapabilityType {
        &self.capability
    }

    pub fn type_name(&self) -> &str {
        self.capability.name()
    }

    /// Identity of the underlying allocation
    pub fn address(&self) -> usize {
        self.address
    }

    /// Identity equality
    pub fn same_object(&self, other: &ObjectRef) -> bool {
        self.address == other.address
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_object(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{:#x})", self.type_name(), self.address)
    }
}

/// Rust types that can cross the replay boundary as a [`Value`]
pub trait ReplayValue: Sized {
    /// The target type used when decoding text into this type
    fn value_type() -> ValueType;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value, expected: ValueType) -> Result<T> {
    Err(MimicError::type_conversion(
        format!("{:?}", value),
        expected,
        format!("found {}", value.kind()),
    ))
}

impl ReplayValue for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => mismatch(&other, ValueType::Bool),
        }
    }
}

macro_rules! replay_int {
    ($($ty:ty),*) => {
        $(
            impl ReplayValue for $ty {
                fn value_type() -> ValueType {
                    ValueType::Int
                }

                fn into_value(self) -> Value {
                    Value::Int(self as i64)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Int(n) => <$ty>::try_from(n).map_err(|_| {
                            MimicError::type_conversion(
                                n.to_string(),
                                stringify!($ty),
                                "value out of range",
                            )
                        }),
                        other => mismatch(&other, ValueType::Int),
                    }
                }
            }
        )*
    };
}

replay_int!(i8, i16, i32, i64, u8, u16, u32, isize);

/// Encoded as `Int`; values above `i64::MAX` saturate to `i64::MAX`, and
/// decoding rejects negatives.
impl ReplayValue for usize {
    fn value_type() -> ValueType {
        ValueType::Int
    }

    fn into_value(self) -> Value {
        Value::Int(i64::try_from(self).unwrap_or(i64::MAX))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(n) => usize::try_from(n).map_err(|_| {
                MimicError::type_conversion(n.to_string(), "usize", "value out of range")
            }),
            other => mismatch(&other, ValueType::Int),
        }
    }
}

impl ReplayValue for f64 {
    fn value_type() -> ValueType {
        ValueType::Float
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(n) => Ok(n as f64),
            other => mismatch(&other, ValueType::Float),
        }
    }
}

impl ReplayValue for f32 {
    fn value_type() -> ValueType {
        ValueType::Float
    }

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }

    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl ReplayValue for String {
    fn value_type() -> ValueType {
        ValueType::Str
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => mismatch(&other, ValueType::Str),
        }
    }
}

impl ReplayValue for NaiveDateTime {
    fn value_type() -> ValueType {
        ValueType::DateTime
    }

    fn into_value(self) -> Value {
        Value::DateTime(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => mismatch(&other, ValueType::DateTime),
        }
    }
}

impl<T: ReplayValue> ReplayValue for Vec<T> {
    fn value_type() -> ValueType {
        ValueType::list(T::value_type())
    }

    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(ReplayValue::into_value).collect())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => mismatch(&other, Self::value_type()),
        }
    }
}

impl<K: ReplayValue + Ord, V: ReplayValue> ReplayValue for BTreeMap<K, V> {
    fn value_type() -> ValueType {
        ValueType::map(K::value_type(), V::value_type())
    }

    fn into_value(self) -> Value {
        Value::Map(
            self.into_iter()
                .map(|(k, v)| (k.into_value(), v.into_value()))
                .collect(),
        )
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => mismatch(&other, Self::value_type()),
        }
    }
}

impl<T: ReplayValue> ReplayValue for Option<T> {
    fn value_type() -> ValueType {
        ValueType::optional(T::value_type())
    }

    fn into_value(self) -> Value {
        self.map(ReplayValue::into_value).unwrap_or(Value::Null)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> ReplayValue for Arc<T> {
    fn value_type() -> ValueType {
        ValueType::Object(CapabilityType::of::<T>())
    }

    fn into_value(self) -> Value {
        Value::Object(ObjectRef::new(self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(obj) => obj.downcast::<T>().ok_or_else(|| {
                MimicError::type_conversion(
                    format!("{:?}", obj),
                    CapabilityType::of::<T>().name(),
                    format!("object of type {} is not assignable", obj.type_name()),
                )
            }),
            other => mismatch(&other, Self::value_type()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Calculator: Send + Sync {
        fn add(&self, a: i32, b: i32) -> i32;
    }

    struct Adder;

    impl Calculator for Adder {
        fn add(&self, a: i32, b: i32) -> i32 {
            a + b
        }
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("dyn my_crate::billing::Calculator"), "Calculator");
        assert_eq!(short_type_name("alloc::vec::Vec<i32>"), "Vec");
        assert_eq!(short_type_name("dyn a::Repo + Send"), "Repo");
        assert_eq!(short_type_name("i32"), "i32");
    }

    #[test]
    fn test_capability_name_for_trait_object() {
        let cap = CapabilityType::of::<dyn Calculator>();
        assert_eq!(cap.name(), "Calculator");
        assert_eq!(cap, CapabilityType::of::<dyn Calculator>());
        assert_ne!(cap, CapabilityType::of::<Adder>());
    }

    #[test]
    fn test_object_ref_downcast_and_identity() {
        let calc: Arc<dyn Calculator> = Arc::new(Adder);
        let a = ObjectRef::new(calc.clone());
        let b = ObjectRef::new(calc.clone());

        assert_eq!(a, b);
        assert!(a.is_a(&CapabilityType::of::<dyn Calculator>()));
        assert_eq!(a.downcast::<dyn Calculator>().unwrap().add(2, 3), 5);
        assert!(a.downcast::<Adder>().is_none());

        let other = ObjectRef::new(Arc::new(Adder) as Arc<dyn Calculator>);
        assert_ne!(a, other);
    }

    #[test]
    fn test_usize_saturates_on_encode_and_checks_on_decode() {
        assert_eq!(7usize.into_value(), Value::Int(7));
        if usize::BITS >= 64 {
            assert_eq!(usize::MAX.into_value(), Value::Int(i64::MAX));
        }
        let err = usize::from_value(Value::Int(-1)).unwrap_err();
        assert!(matches!(err, MimicError::TypeConversion { .. }));
    }

    #[test]
    fn test_int_width_checked() {
        assert_eq!(i32::from_value(Value::Int(42)).unwrap(), 42);
        let err = u8::from_value(Value::Int(300)).unwrap_err();
        assert!(matches!(err, MimicError::TypeConversion { .. }));
        assert!(err.to_string().contains("u8"));
    }

    #[test]
    fn test_nested_value_types() {
        assert_eq!(
            <Vec<Option<String>>>::value_type(),
            ValueType::list(ValueType::optional(ValueType::Str))
        );
        assert_eq!(
            <BTreeMap<String, i64>>::value_type().to_string(),
            "map<string, int>"
        );
    }

    #[test]
    fn test_option_roundtrip_through_value() {
        assert_eq!(Option::<i32>::None.into_value(), Value::Null);
        assert_eq!(Option::<i32>::from_value(Value::Int(7)).unwrap(), Some(7));
    }
}
