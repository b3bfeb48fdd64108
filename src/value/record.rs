//! Named-field access for stored objects

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};

use super::Value;

/// An object whose attributes can be read by name.
///
/// `None` means the object does not have the attribute at all, which is
/// different from having it with value `Value::Null`.
///
/// Types only queried through derived attributes can use the default body:
///
/// ```ignore
/// impl Record for Sensor {}
/// ```
pub trait Record {
    /// Look up a named field or key
    fn field(&self, name: &str) -> Option<Value> {
        let _ = name;
        None
    }
}

impl Record for serde_json::Value {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).and_then(Value::from_json)
    }
}

impl Record for serde_json::Map<String, serde_json::Value> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).and_then(Value::from_json)
    }
}

impl<V: Clone + Into<Value>> Record for HashMap<String, V> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }
}

impl<V: Clone + Into<Value>> Record for BTreeMap<String, V> {
    fn field(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Into::into)
    }
}

impl<T: Record> Record for Mutex<T> {
    fn field(&self, name: &str) -> Option<Value> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .field(name)
    }
}

impl<T: Record> Record for RwLock<T> {
    fn field(&self, name: &str) -> Option<Value> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .field(name)
    }
}

impl<T: Record + ?Sized> Record for Box<T> {
    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }
}
