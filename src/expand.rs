//! Field-map expansion: the inverse of compression.
//!
//! Model output is not trusted to match the compressed schema exactly, so any
//! value whose runtime shape disagrees with the field map is passed through
//! untouched instead of failing the whole payload. The only hard error is a
//! `_ref` that the field map itself cannot resolve.
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{json_kind, ExpandError};
use crate::field_map::{FieldEntry, FieldMap, Mapping, Shape};
use crate::payload::{Key, Payload};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Rebuilt keys become [`Key::Symbol`] instead of [`Key::Text`], at every
    /// depth. Keys without a field-map entry always stay text.
    pub symbolize: bool,
}

impl ExpandOptions {
    pub fn symbolized() -> Self { Self { symbolize: true } }
}

// ------------------------------- Front API -------------------------------- //

pub fn expand(payload: &Value, field_map: &FieldMap, options: ExpandOptions) -> Result<Payload, ExpandError> {
    Expander::new(field_map, options).expand(payload)
}

/// Expand and flatten straight back to JSON.
pub fn expand_json(payload: &Value, field_map: &FieldMap) -> Result<Value, ExpandError> {
    expand(payload, field_map, ExpandOptions::default()).map(Payload::into_json)
}

// ------------------------------- Expander --------------------------------- //

pub struct Expander<'a> {
    field_map: &'a FieldMap,
    options: ExpandOptions,
}

impl<'a> Expander<'a> {
    pub fn new(field_map: &'a FieldMap, options: ExpandOptions) -> Self {
        Self { field_map, options }
    }

    pub fn expand(&self, payload: &Value) -> Result<Payload, ExpandError> {
        match payload {
            Value::Object(object) => self.expand_object(object, &self.field_map.entries),
            other => {
                tracing::debug!(found = json_kind(other), "payload root is not an object, passing through");
                Ok(Payload::from(other))
            }
        }
    }

    fn key(&self, original: &str) -> Key {
        if self.options.symbolize {
            Key::Symbol(original.to_string())
        } else {
            Key::Text(original.to_string())
        }
    }

    fn definition(&self, name: &str) -> Result<&'a Mapping, ExpandError> {
        self.field_map
            .definition(name)
            .ok_or_else(|| ExpandError::UnresolvedReference { name: name.to_string() })
    }

    fn expand_object(&self, object: &Map<String, Value>, mapping: &Mapping) -> Result<Payload, ExpandError> {
        let mut out = IndexMap::with_capacity(object.len());
        for (k, v) in object {
            match mapping.get(k) {
                None => {
                    out.insert(Key::Text(k.clone()), Payload::from(v));
                }
                Some(FieldEntry::Leaf(original)) => {
                    out.insert(self.key(original), Payload::from(v));
                }
                Some(FieldEntry::Node { original, shape }) => {
                    out.insert(self.key(original), self.expand_shaped(v, shape)?);
                }
            }
        }
        Ok(Payload::Object(out))
    }

    fn expand_shaped(&self, value: &Value, shape: &Shape) -> Result<Payload, ExpandError> {
        match (shape, value) {
            // resolve before looking at the value so a dangling `_ref` is
            // reported even when the model sent null
            (Shape::Ref(name), _) => {
                let mapping = self.definition(name)?;
                self.expand_against(value, mapping)
            }
            (_, Value::Null) => Ok(Payload::Null),
            (Shape::Object(mapping), Value::Object(object)) => self.expand_object(object, mapping),
            (Shape::Items(inner), Value::Array(xs)) => xs.iter()
                .map(|x| self.expand_shaped(x, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Payload::Array),
            (Shape::Variants(variants), _) => self.expand_variants(value, variants),
            (Shape::Object(_) | Shape::Items(_), other) => {
                tracing::debug!(found = json_kind(other), "shape mismatch, passing through");
                Ok(Payload::from(other))
            }
        }
    }

    /// Definition mapping applied to an object, or to each element of an array.
    fn expand_against(&self, value: &Value, mapping: &Mapping) -> Result<Payload, ExpandError> {
        match value {
            Value::Object(object) => self.expand_object(object, mapping),
            Value::Array(xs) => xs.iter()
                .map(|x| self.expand_against(x, mapping))
                .collect::<Result<Vec<_>, _>>()
                .map(Payload::Array),
            other => Ok(Payload::from(other)),
        }
    }

    fn expand_variants(&self, value: &Value, variants: &[Shape]) -> Result<Payload, ExpandError> {
        match value {
            Value::Array(xs) => {
                let arms = variants.iter()
                    .filter(|v| matches!(v, Shape::Items(_) | Shape::Ref(_)))
                    .collect::<Vec<_>>();
                let mut chosen = None;
                // first object element decides between array arms
                if let Some(element) = xs.iter().find_map(Value::as_object) {
                    for arm in &arms {
                        let element_shape = match arm {
                            Shape::Items(inner) => inner.as_ref(),
                            other => other,
                        };
                        if self.arm_matches(element_shape, element)? {
                            chosen = Some(*arm);
                            break;
                        }
                    }
                }
                match chosen.or_else(|| arms.first().copied()) {
                    Some(arm) => self.expand_shaped(value, arm),
                    None => Ok(Payload::from(value)),
                }
            }
            Value::Object(object) => {
                for arm in variants {
                    if self.arm_matches(arm, object)? {
                        return self.expand_shaped(value, arm);
                    }
                }
                tracing::debug!(keys = object.len(), "no union arm matches payload keys, passing through");
                Ok(Payload::from(value))
            }
            other => Ok(Payload::from(other)),
        }
    }

    /// An arm matches when its codes intersect the keys actually present.
    fn arm_matches(&self, arm: &Shape, object: &Map<String, Value>) -> Result<bool, ExpandError> {
        let intersects = |m: &Mapping| object.keys().any(|k| m.contains_code(k));
        match arm {
            Shape::Object(m) => Ok(intersects(m)),
            Shape::Ref(name) => Ok(intersects(self.definition(name)?)),
            Shape::Variants(inner) => {
                for arm in inner {
                    if self.arm_matches(arm, object)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Shape::Items(_) => Ok(false),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
