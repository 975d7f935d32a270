//! Reversal records produced by compression and consumed by expansion.
//!
//! Wire form (JSON):
//! - a bare string for a [`FieldEntry::Leaf`],
//! - `{"_original": name, ...}` for a [`FieldEntry::Node`], where the rest is
//!   the flattened [`Shape`]: short codes for `Object`, `_items`, `_variants`
//!   or `_ref`,
//! - `_defs` at the root only.
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{json_kind, FieldMapError};

pub const ORIGINAL: &str = "_original";
pub const ITEMS: &str = "_items";
pub const VARIANTS: &str = "_variants";
pub const REF: &str = "_ref";
pub const DEFS: &str = "_defs";

// ------------------------------- Types ------------------------------------ //

/// Short code → entry, for one object level.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping(pub IndexMap<String, FieldEntry>);

#[derive(Debug, Clone, PartialEq)]
pub enum FieldEntry {
    /// Rename only; the value is never recursed into.
    Leaf(String),
    Node { original: String, shape: Shape },
}

/// How to rebuild a value below a renamed key.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Object(Mapping),
    /// Array whose elements have this shape.
    Items(Box<Shape>),
    /// One shape per union arm, in declaration order. Trivial arms are an
    /// empty `Object`.
    Variants(Vec<Shape>),
    /// Named definition, resolved through the root `_defs`.
    Ref(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMap {
    pub entries: Mapping,
    /// Present when definitions were compressed.
    pub defs: Option<IndexMap<String, Mapping>>,
}

impl Mapping {
    pub fn new() -> Self { Self::default() }
    pub fn get(&self, code: &str) -> Option<&FieldEntry> { self.0.get(code) }
    pub fn insert(&mut self, code: String, entry: FieldEntry) { self.0.insert(code, entry); }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, FieldEntry> { self.0.iter() }
    pub fn contains_code(&self, code: &str) -> bool { self.0.contains_key(code) }
}

impl FieldEntry {
    pub fn original(&self) -> &str {
        match self {
            FieldEntry::Leaf(name) => name,
            FieldEntry::Node { original, .. } => original,
        }
    }
}

impl Shape {
    pub fn empty() -> Self { Shape::Object(Mapping::new()) }
}

impl FieldMap {
    pub fn get(&self, code: &str) -> Option<&FieldEntry> { self.entries.get(code) }

    pub fn definition(&self, name: &str) -> Option<&Mapping> {
        self.defs.as_ref().and_then(|d| d.get(name))
    }
}

// ------------------------------- Emission --------------------------------- //

impl FieldMap {
    pub fn to_json(&self) -> Value {
        let mut out = mapping_to_map(&self.entries);
        if let Some(defs) = &self.defs {
            let defs = defs.iter()
                .map(|(name, m)| (name.clone(), Value::Object(mapping_to_map(m))))
                .collect::<Map<_, _>>();
            out.insert(DEFS.into(), Value::Object(defs));
        }
        Value::Object(out)
    }
}

impl FieldEntry {
    pub fn to_json(&self) -> Value {
        match self {
            FieldEntry::Leaf(name) => Value::from(name.clone()),
            FieldEntry::Node { original, shape } => {
                let mut out = Map::new();
                out.insert(ORIGINAL.into(), Value::from(original.clone()));
                out.extend(shape_to_map(shape));
                Value::Object(out)
            }
        }
    }
}

impl Shape {
    pub fn to_json(&self) -> Value { Value::Object(shape_to_map(self)) }
}

fn mapping_to_map(m: &Mapping) -> Map<String, Value> {
    m.iter().map(|(code, e)| (code.clone(), e.to_json())).collect()
}

fn shape_to_map(shape: &Shape) -> Map<String, Value> {
    match shape {
        Shape::Object(m) => mapping_to_map(m),
        Shape::Items(inner) => {
            let mut out = Map::new();
            out.insert(ITEMS.into(), inner.to_json());
            out
        }
        Shape::Variants(vs) => {
            let mut out = Map::new();
            out.insert(VARIANTS.into(), Value::Array(vs.iter().map(Shape::to_json).collect()));
            out
        }
        Shape::Ref(name) => {
            let mut out = Map::new();
            out.insert(REF.into(), Value::from(name.clone()));
            out
        }
    }
}

// -------------------------------- Parsing --------------------------------- //

impl FieldMap {
    /// Read the wire form. Anything that does not match a recognized entry
    /// shape is rejected rather than guessed at.
    pub fn from_json(value: &Value) -> Result<Self, FieldMapError> {
        let map = expect_object(value, "")?;
        let mut entries = Mapping::new();
        let mut defs = None;
        for (k, v) in map {
            let path = format!("/{}", k);
            if k == DEFS {
                let raw = expect_object(v, &path)?;
                let mut out = IndexMap::new();
                for (name, m) in raw {
                    let def_path = format!("{path}/{name}");
                    out.insert(name.clone(), parse_mapping(expect_object(m, &def_path)?, &def_path)?);
                }
                defs = Some(out);
            } else {
                entries.insert(k.clone(), parse_entry(v, &path)?);
            }
        }
        Ok(FieldMap { entries, defs })
    }
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, FieldMapError> {
    match value {
        Value::Object(m) => Ok(m),
        other => Err(FieldMapError::malformed(path, format!("expected object, found {}", json_kind(other)))),
    }
}

fn is_marker(key: &str) -> bool {
    matches!(key, ORIGINAL | ITEMS | VARIANTS | REF | DEFS)
}

fn parse_mapping(map: &Map<String, Value>, path: &str) -> Result<Mapping, FieldMapError> {
    let mut out = Mapping::new();
    for (code, v) in map {
        if is_marker(code) {
            return Err(FieldMapError::malformed(path, format!("unexpected `{code}` in a plain mapping")));
        }
        out.insert(code.clone(), parse_entry(v, &format!("{path}/{code}"))?);
    }
    Ok(out)
}

fn parse_entry(value: &Value, path: &str) -> Result<FieldEntry, FieldMapError> {
    match value {
        Value::String(name) => Ok(FieldEntry::Leaf(name.clone())),
        Value::Object(map) => {
            let original = match map.get(ORIGINAL) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => {
                    return Err(FieldMapError::malformed(path, format!("`_original` must be a string, found {}", json_kind(other))));
                }
                None => return Err(FieldMapError::malformed(path, "nested entry without `_original`")),
            };
            let mut rest = map.clone();
            rest.shift_remove(ORIGINAL);
            let shape = parse_shape(&rest, path)?;
            Ok(FieldEntry::Node { original, shape })
        }
        other => Err(FieldMapError::malformed(path, format!("expected string or object, found {}", json_kind(other)))),
    }
}

fn parse_shape(map: &Map<String, Value>, path: &str) -> Result<Shape, FieldMapError> {
    let markers = map.keys().filter(|k| is_marker(k)).collect::<Vec<_>>();
    match markers.as_slice() {
        [] => parse_mapping(map, path).map(Shape::Object),
        [marker] if map.len() == 1 => {
            let value = &map[marker.as_str()];
            let inner_path = format!("{path}/{marker}");
            match marker.as_str() {
                ITEMS => {
                    let inner = expect_object(value, &inner_path)?;
                    Ok(Shape::Items(Box::new(parse_shape(inner, &inner_path)?)))
                }
                VARIANTS => {
                    let arms = match value {
                        Value::Array(xs) => xs,
                        other => {
                            return Err(FieldMapError::malformed(&inner_path, format!("expected array, found {}", json_kind(other))));
                        }
                    };
                    arms.iter().enumerate()
                        .map(|(i, arm)| {
                            let arm_path = format!("{inner_path}/{i}");
                            parse_shape(expect_object(arm, &arm_path)?, &arm_path)
                        })
                        .collect::<Result<Vec<_>, _>>()
                        .map(Shape::Variants)
                }
                REF => match value {
                    Value::String(name) => Ok(Shape::Ref(name.clone())),
                    other => Err(FieldMapError::malformed(&inner_path, format!("expected string, found {}", json_kind(other)))),
                },
                _ => Err(FieldMapError::malformed(path, format!("`{marker}` is not allowed here"))),
            }
        }
        _ => Err(FieldMapError::malformed(path, "markers cannot be mixed with each other or with short codes")),
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FieldMap::from_json(&value).map_err(serde::de::Error::custom)
    }
}

// ------------------------------- Tests ------------------------------------ //
