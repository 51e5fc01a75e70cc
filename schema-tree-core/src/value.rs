//! Plain-value projection of a typed tree.
//!
//! [`Document::project`] turns a subtree into nested [`Value`]s: ordered maps
//! for structured nodes, sequences for repeated children and bare scalars for
//! leaves. Every downstream output format reads documents through this
//! projection.

use std::convert::Infallible;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::schema::LeafKind;
use crate::tree::{Document, NodeId, Scalar, Slot};

/// A generic value produced by projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A leaf whose element carried no text.
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Entry of a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }
}

impl From<&Scalar> for Value {
    fn from(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::Text(text) => Value::Text(text.clone()),
            Scalar::Integer(value) => Value::Integer(*value),
            Scalar::Timestamp(value) => Value::Timestamp(*value),
            Scalar::Flag => Value::Bool(true),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Text(text) => serializer.serialize_str(text),
            Value::Timestamp(value) => {
                serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Supplies the projected value of reference-bearing leaves.
pub trait ReferenceResolver {
    type Error;

    fn resolve_reference(&self, doc: &Document, leaf: NodeId) -> Result<Value, Self::Error>;
}

/// Projects reference leaves as their literal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralReferences;

impl ReferenceResolver for LiteralReferences {
    type Error = Infallible;

    fn resolve_reference(&self, doc: &Document, leaf: NodeId) -> Result<Value, Infallible> {
        Ok(doc.scalar(leaf).map_or(Value::Null, Value::from))
    }
}

impl Document {
    /// Project the subtree at `id`, delegating reference leaves to `resolver`.
    pub fn project<R>(&self, id: NodeId, resolver: &R) -> Result<Value, R::Error>
    where
        R: ReferenceResolver + ?Sized,
    {
        match self.leaf_kind(id) {
            Some(LeafKind::Reference) => resolver.resolve_reference(self, id),
            Some(_) => Ok(self.scalar(id).map_or(Value::Null, Value::from)),
            None => {
                let mut map = IndexMap::new();
                for (key, slot) in self.children(id) {
                    let value = match slot {
                        Slot::Single(child) => self.project(*child, resolver)?,
                        Slot::List(items) => Value::List(
                            items
                                .iter()
                                .map(|item| self.project(*item, resolver))
                                .collect::<Result<_, _>>()?,
                        ),
                    };
                    map.insert(key.to_string(), value);
                }
                Ok(Value::Map(map))
            }
        }
    }

    /// Project the subtree at `id` with references left as literal text.
    pub fn to_value(&self, id: NodeId) -> Value {
        match self.project(id, &LiteralReferences) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}
