//! Attribute values and accessors
//!
//! Every indexed attribute evaluates to a [`Value`]. Values must be hashable;
//! values that take part in range queries must also be mutually orderable.
//!
//! # Orderability
//!
//! Orderability is a runtime property. [`Value::try_cmp`] returns `None` for
//! pairs that cannot be ordered (different classes, `Null`, custom types with
//! no ordering). Indexes probe it once and remember the outcome.
//!
//! # Numeric class
//!
//! `Int` and `Float` are one class: `Int(9) == Float(9.0)`, both hash the same
//! and they order numerically. `NaN` equals itself and sorts last.

mod attribute;
mod record;

pub use attribute::{Attribute, DerivedFn};
pub use record::Record;

use std::any::Any;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A user-defined value type.
///
/// Implement this to index values the built-in variants cannot express,
/// such as types with a hand-written hash or types with no ordering.
pub trait DynValue: fmt::Debug + Send + Sync + 'static {
    /// Name used to tell custom types apart. Values of different custom
    /// types are never equal and never comparable.
    fn type_name(&self) -> &'static str;

    /// 64-bit hash. Equal values must return equal hashes.
    fn hash_value(&self) -> u64;

    /// Equality against another value of the same `type_name`.
    fn eq_value(&self, other: &dyn DynValue) -> bool;

    /// Ordering against another value of the same `type_name`.
    ///
    /// Return `None` when the type has no ordering.
    fn cmp_value(&self, other: &dyn DynValue) -> Option<Ordering> {
        let _ = other;
        None
    }

    /// Downcasting hook for `eq_value` / `cmp_value` implementations.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a [`DynValue`].
#[derive(Clone)]
pub struct CustomValue(Arc<dyn DynValue>);

impl CustomValue {
    /// Wrap a custom value
    pub fn new(value: impl DynValue) -> Self {
        CustomValue(Arc::new(value))
    }

    /// Borrow the inner value
    pub fn inner(&self) -> &dyn DynValue {
        self.0.as_ref()
    }

    /// Downcast to a concrete type
    pub fn downcast_ref<V: DynValue>(&self) -> Option<&V> {
        self.0.as_any().downcast_ref::<V>()
    }

    fn same_type(&self, other: &CustomValue) -> bool {
        self.0.type_name() == other.0.type_name()
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An attribute value.
#[derive(Debug, Clone)]
pub enum Value {
    /// The null-like value. Indexed in its own bucket, never ordered.
    Null,
    /// Boolean (false < true)
    Bool(bool),
    /// Integer, same numeric class as `Float`
    Int(i64),
    /// Float, same numeric class as `Int`
    Float(f64),
    /// String
    Str(String),
    /// Lexicographically ordered sequence
    Tuple(Vec<Value>),
    /// User-defined value
    Custom(CustomValue),
}

/// Returns the integer a float is exactly equal to, if any.
fn float_as_int(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        Some(f as i64)
    } else {
        None
    }
}

/// Total numeric order between an integer and a float. NaN sorts last.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() || f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let truncated = f.trunc();
    match i.cmp(&(truncated as i64)) {
        Ordering::Equal if f > truncated => Ordering::Less,
        Ordering::Equal if f < truncated => Ordering::Greater,
        other => other,
    }
}

fn cmp_floats(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

impl Value {
    /// Build a tuple value
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Build a custom value
    pub fn custom(value: impl DynValue) -> Self {
        Value::Custom(CustomValue::new(value))
    }

    /// Returns true for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's class, for messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::Float(_) => "number",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::Custom(c) => c.inner().type_name(),
        }
    }

    /// Compare two values if they are mutually orderable.
    ///
    /// Returns `None` for incomparable pairs.
    pub fn try_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => Some(cmp_int_float(*a, *b)),
            (Value::Float(a), Value::Int(b)) => Some(cmp_int_float(*b, *a).reverse()),
            (Value::Float(a), Value::Float(b)) => Some(cmp_floats(*a, *b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Tuple(a), Value::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.try_cmp(y)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (Value::Custom(a), Value::Custom(b)) if a.same_type(b) => {
                a.inner().cmp_value(b.inner())
            }
            _ => None,
        }
    }

    /// Orderability probe: can this value be ordered against itself?
    pub fn is_orderable(&self) -> bool {
        self.try_cmp(self).is_some()
    }

    /// Deterministic 64-bit hash, stable for the life of the process.
    pub fn hash64(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    /// Create a value from JSON.
    ///
    /// Objects are not indexable and return `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_json::Value::String(s) => Some(Value::Str(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Tuple),
            serde_json::Value::Object(_) => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::Tuple(_) => 4,
            Value::Custom(_) => 5,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(i), Value::Float(f)) | (Value::Float(f), Value::Int(i)) => {
                cmp_int_float(*i, *f) == Ordering::Equal
            }
            (Value::Float(a), Value::Float(b)) => cmp_floats(*a, *b) == Ordering::Equal,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => {
                a.same_type(b) && a.inner().eq_value(b.inner())
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Int(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => match float_as_int(*f) {
                Some(i) => {
                    2u8.hash(state);
                    i.hash(state);
                }
                None => {
                    3u8.hash(state);
                    let bits = if f.is_nan() { f64::NAN.to_bits() } else { f.to_bits() };
                    bits.hash(state);
                }
            },
            Value::Str(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::Tuple(items) => {
                5u8.hash(state);
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            Value::Custom(c) => {
                6u8.hash(state);
                c.inner().type_name().hash(state);
                c.inner().hash_value().hash(state);
            }
        }
    }
}

/// Total key order for ordered maps.
///
/// Agrees with [`Value::try_cmp`] wherever that returns `Some`. Custom types
/// with no ordering never become keys of an ordered map.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        if let Some(ord) = self.try_cmp(other) {
            return ord;
        }
        match (self, other) {
            (Value::Tuple(a), Value::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.cmp(y) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Custom(a), Value::Custom(b)) => a
                .inner()
                .type_name()
                .cmp(b.inner().type_name())
                .then_with(|| a.inner().hash_value().cmp(&b.inner().hash_value())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Custom(c) => write!(f, "{:?}", c),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl From<CustomValue> for Value {
    fn from(v: CustomValue) -> Self {
        Value::Custom(v)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A custom value whose hash is always 42; ordered by `n`.
    #[derive(Debug, Clone, Copy)]
    pub struct BadHash(pub i64);

    impl DynValue for BadHash {
        fn type_name(&self) -> &'static str {
            "BadHash"
        }
        fn hash_value(&self) -> u64 {
            42
        }
        fn eq_value(&self, other: &dyn DynValue) -> bool {
            other.as_any().downcast_ref::<BadHash>().map_or(false, |o| o.0 == self.0)
        }
        fn cmp_value(&self, other: &dyn DynValue) -> Option<Ordering> {
            other.as_any().downcast_ref::<BadHash>().map(|o| self.0.cmp(&o.0))
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// A hashable custom value with no ordering.
    #[derive(Debug, Clone, Copy)]
    pub struct NoSort(pub i64);

    impl DynValue for NoSort {
        fn type_name(&self) -> &'static str {
            "NoSort"
        }
        fn hash_value(&self) -> u64 {
            self.0 as u64
        }
        fn eq_value(&self, other: &dyn DynValue) -> bool {
            other.as_any().downcast_ref::<NoSort>().map_or(false, |o| o.0 == self.0)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{BadHash, NoSort};
    use super::*;

    #[test]
    fn test_numeric_class_equality() {
        assert_eq!(Value::Int(9), Value::Float(9.0));
        assert_eq!(Value::Int(9).hash64(), Value::Float(9.0).hash64());
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
        assert_eq!(Value::Float(-0.0).hash64(), Value::Int(0).hash64());
        assert_ne!(Value::Int(9), Value::Float(9.5));
    }

    #[test]
    fn test_numeric_ordering() {
        assert_eq!(Value::Int(9).try_cmp(&Value::Float(8.5)), Some(Ordering::Greater));
        assert_eq!(Value::Int(9).try_cmp(&Value::Float(9.5)), Some(Ordering::Less));
        assert_eq!(Value::Float(-1.5).try_cmp(&Value::Int(-1)), Some(Ordering::Less));
        assert_eq!(Value::Float(f64::NAN).try_cmp(&Value::Int(i64::MAX)), Some(Ordering::Greater));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_incomparable_classes() {
        assert_eq!(Value::Int(1).try_cmp(&Value::from("a")), None);
        assert_eq!(Value::Null.try_cmp(&Value::Null), None);
        assert_eq!(Value::Bool(true).try_cmp(&Value::Int(1)), None);
        assert!(!Value::Null.is_orderable());
        assert!(Value::from("x").is_orderable());
    }

    #[test]
    fn test_tuple_ordering() {
        let a = Value::tuple([1, 2]);
        let b = Value::tuple([1, 3]);
        assert_eq!(a.try_cmp(&b), Some(Ordering::Less));
        let mixed = Value::Tuple(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(a.try_cmp(&mixed), None);
        assert_eq!(Value::tuple([1]).try_cmp(&a), Some(Ordering::Less));
    }

    #[test]
    fn test_custom_values() {
        let a = Value::custom(BadHash(1));
        let b = Value::custom(BadHash(2));
        assert_eq!(a.hash64(), b.hash64());
        assert_ne!(a, b);
        assert_eq!(a, Value::custom(BadHash(1)));
        assert_eq!(a.try_cmp(&b), Some(Ordering::Less));

        let n = Value::custom(NoSort(1));
        assert!(!n.is_orderable());
        assert_ne!(n, a);
        assert_eq!(n.try_cmp(&a), None);
    }

    #[test]
    fn test_total_order_groups_classes() {
        let mut values = vec![
            Value::from("b"),
            Value::Int(3),
            Value::Bool(false),
            Value::Float(1.5),
            Value::from("a"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Bool(false),
                Value::Float(1.5),
                Value::Int(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&serde_json::json!(42)), Some(Value::Int(42)));
        assert_eq!(Value::from_json(&serde_json::json!(null)), Some(Value::Null));
        assert_eq!(
            Value::from_json(&serde_json::json!([1, "a"])),
            Some(Value::Tuple(vec![Value::Int(1), Value::from("a")]))
        );
        assert_eq!(Value::from_json(&serde_json::json!({"a": 1})), None);
    }
}
