//! Serde support
//!
//! Arrays serialize in iteration order: lists as sequences, everything else
//! as maps with string keys. Identical input order therefore always gives
//! identical output, which is the only ordering guarantee serializers rely
//! on. Objects serialize as maps of their properties and resources as null.
//!
//! JSON input converts the other way: objects become string-keyed arrays
//! (numeric member names normalise to integer keys), arrays become lists.
//!
//! A reference or object reached again while it is still being written
//! fails the whole serialization instead of recursing forever.

use crate::core::alias::PhpAlias;
use crate::core::array::{IntStringKey, OrderedDictionary, PhpArray};
use crate::core::object::PhpObject;
use crate::core::value::PhpValue;
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};
use std::cell::RefCell;

const RECURSION: &str = "recursion detected";

enum Open {
    Alias(PhpAlias),
    Object(PhpObject),
}

impl Open {
    fn same(&self, other: &Open) -> bool {
        match (self, other) {
            (Open::Alias(a), Open::Alias(b)) => a.ptr_eq(b),
            (Open::Object(a), Open::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

thread_local! {
    static OPEN: RefCell<Vec<Open>> = const { RefCell::new(Vec::new()) };
}

/// Marks a container as being written until dropped.
struct Visit;

impl Visit {
    fn enter(container: Open) -> Option<Visit> {
        OPEN.with(|open| {
            let mut open = open.borrow_mut();
            if open.iter().any(|seen| seen.same(&container)) {
                return None;
            }
            open.push(container);
            Some(Visit)
        })
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        OPEN.with(|open| open.borrow_mut().pop());
    }
}

impl Serialize for OrderedDictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_list() {
            let mut seq = serializer.serialize_seq(Some(self.len()))?;
            for value in self.values() {
                seq.serialize_element(value)?;
            }
            seq.end()
        } else {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self.iter() {
                map.serialize_entry(&key.to_php_string().to_string_lossy(), value)?;
            }
            map.end()
        }
    }
}

impl Serialize for PhpArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (**self).serialize(serializer)
    }
}

impl Serialize for PhpValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PhpValue::Null | PhpValue::Resource(_) => serializer.serialize_unit(),
            PhpValue::Bool(b) => serializer.serialize_bool(*b),
            PhpValue::Long(i) => serializer.serialize_i64(*i),
            PhpValue::Double(d) => serializer.serialize_f64(*d),
            PhpValue::String(s) => serializer.serialize_str(&s.to_string_lossy()),
            PhpValue::Array(a) => a.serialize(serializer),
            PhpValue::Object(o) => {
                let _visit = Visit::enter(Open::Object(o.clone()))
                    .ok_or_else(|| S::Error::custom(RECURSION))?;
                let props = o.properties();
                let mut map = serializer.serialize_map(Some(props.len()))?;
                for (name, value) in props.iter() {
                    map.serialize_entry(&name.to_string_lossy(), value)?;
                }
                map.end()
            }
            PhpValue::Alias(alias) => {
                let _visit = Visit::enter(Open::Alias(alias.clone()))
                    .ok_or_else(|| S::Error::custom(RECURSION))?;
                alias.with(|value| value.serialize(serializer))
            }
        }
    }
}

impl PhpValue {
    pub fn from_json(json: serde_json::Value) -> PhpValue {
        match json {
            serde_json::Value::Null => PhpValue::Null,
            serde_json::Value::Bool(b) => PhpValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => PhpValue::Long(i),
                None => PhpValue::Double(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => PhpValue::from(s),
            serde_json::Value::Array(items) => PhpValue::Array(
                items.into_iter().map(PhpValue::from_json).collect::<PhpArray>(),
            ),
            serde_json::Value::Object(members) => PhpValue::Array(
                members
                    .into_iter()
                    .map(|(name, value)| (IntStringKey::from(name), PhpValue::from_json(value)))
                    .collect::<PhpArray>(),
            ),
        }
    }
}

impl From<serde_json::Value> for PhpValue {
    fn from(json: serde_json::Value) -> Self {
        PhpValue::from_json(json)
    }
}
