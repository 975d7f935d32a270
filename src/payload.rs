//! Expanded payload tree.
//!
//! Mirrors `serde_json::Value`, except object keys remember whether they were
//! rebuilt by the expander as identifier tokens ([`Key::Symbol`]) or are plain
//! text ([`Key::Text`]), either passed through from the input or rebuilt with
//! `symbolize` off.
use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Symbol(String),
    Text(String),
}

impl Key {
    pub fn as_str(&self) -> &str {
        match self {
            Key::Symbol(s) | Key::Text(s) => s,
        }
    }

    pub fn is_symbol(&self) -> bool { matches!(self, Key::Symbol(_)) }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Symbol(s) => write!(f, ":{s}"),
            Key::Text(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Payload>),
    Object(IndexMap<Key, Payload>),
}

impl Payload {
    pub fn is_null(&self) -> bool { matches!(self, Payload::Null) }

    /// Look up an object member by name, whatever form its key takes.
    pub fn get(&self, name: &str) -> Option<&Payload> {
        match self {
            Payload::Object(m) => m.iter().find(|(k, _)| k.as_str() == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Payload]> {
        match self {
            Payload::Array(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn keys(&self) -> Vec<&Key> {
        match self {
            Payload::Object(m) => m.keys().collect(),
            _ => Vec::new(),
        }
    }

    /// Flatten to JSON; both key forms become plain strings.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Null => Value::Null,
            Payload::Bool(b) => Value::Bool(b),
            Payload::Number(n) => Value::Number(n),
            Payload::String(s) => Value::String(s),
            Payload::Array(xs) => Value::Array(xs.into_iter().map(Payload::into_json).collect()),
            Payload::Object(m) => Value::Object(
                m.into_iter()
                    .map(|(k, v)| match k {
                        Key::Symbol(s) | Key::Text(s) => (s, v.into_json()),
                    })
                    .collect(),
            ),
        }
    }
}

/// Verbatim copy; every key is text.
impl From<&Value> for Payload {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(*b),
            Value::Number(n) => Payload::Number(n.clone()),
            Value::String(s) => Payload::String(s.clone()),
            Value::Array(xs) => Payload::Array(xs.iter().map(Payload::from).collect()),
            Value::Object(m) => Payload::Object(
                m.iter().map(|(k, v)| (Key::Text(k.clone()), Payload::from(v))).collect(),
            ),
        }
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payload::Null => serializer.serialize_unit(),
            Payload::Bool(b) => serializer.serialize_bool(*b),
            Payload::Number(n) => n.serialize(serializer),
            Payload::String(s) => serializer.serialize_str(s),
            Payload::Array(xs) => {
                let mut seq = serializer.serialize_seq(Some(xs.len()))?;
                for x in xs {
                    seq.serialize_element(x)?;
                }
                seq.end()
            }
            Payload::Object(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k.as_str(), v)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_copy_keeps_text_keys_and_order() {
        let src = json!({"b": 1, "a": [true, null, {"c": "x"}]});
        let p = Payload::from(&src);
        assert_eq!(p.keys(), [&Key::Text("b".into()), &Key::Text("a".into())]);
        assert_eq!(p.clone().into_json(), src);
        assert_eq!(serde_json::to_value(&p).unwrap(), src);
    }

    #[test]
    fn lookup_ignores_key_form() {
        let mut m = IndexMap::new();
        m.insert(Key::Symbol("name".into()), Payload::String("Ann".into()));
        let p = Payload::Object(m);
        assert_eq!(p.get("name"), Some(&Payload::String("Ann".into())));
        assert_eq!(p.into_json(), json!({"name": "Ann"}));
        assert_eq!(Key::Symbol("a".into()).to_string(), ":a");
        assert_eq!(Key::Text("a".into()).to_string(), "\"a\"");
    }
}
