//! Schema tree consumed by the compressor.
//!
//! A node is classified only as far as compression needs: primitive, object,
//! array, union or reference. Every other keyword (`type`, `enum`, `minimum`,
//! `additionalProperties`, ...) rides along untouched in `keywords`, so the
//! core never has to understand type semantics.
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{json_kind, SchemaError};

/// Uninterpreted JSON-schema keywords, in source order.
pub type Keywords = Map<String, Value>;

// ------------------------------- Nodes ------------------------------------ //

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Primitive(Primitive),
    Object(ObjectNode),
    Array(ArrayNode),
    Union(UnionNode),
    Reference(Reference),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Primitive {
    pub description: Option<String>,
    pub keywords: Keywords,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectNode {
    pub properties: IndexMap<String, SchemaNode>,
    /// Whether the source spelled out `properties`, even as `{}`.
    pub declares_properties: bool,
    pub required: Vec<String>,
    pub description: Option<String>,
    pub keywords: Keywords,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayNode {
    /// `None` ⇒ untyped array.
    pub items: Option<Box<SchemaNode>>,
    pub description: Option<String>,
    pub keywords: Keywords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionKind {
    AnyOf,
    OneOf,
}

impl UnionKind {
    pub fn keyword(self) -> &'static str {
        match self {
            UnionKind::AnyOf => "anyOf",
            UnionKind::OneOf => "oneOf",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionNode {
    pub kind: UnionKind,
    pub variants: Vec<SchemaNode>,
    pub description: Option<String>,
    pub keywords: Keywords,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// Raw `$ref` target, e.g. `#/$defs/person`.
    pub target: String,
    pub description: Option<String>,
    pub keywords: Keywords,
}

// ---------------------------- Construction -------------------------------- //

impl SchemaNode {
    /// Leaf with the given JSON-schema `type`.
    pub fn primitive(ty: &str) -> Self {
        let mut keywords = Keywords::new();
        keywords.insert("type".into(), Value::from(ty));
        SchemaNode::Primitive(Primitive { description: None, keywords })
    }

    pub fn object<'a, I>(fields: I, required: &[&str]) -> Self
    where
        I: IntoIterator<Item = (&'a str, SchemaNode)>,
    {
        let mut keywords = Keywords::new();
        keywords.insert("type".into(), Value::from("object"));
        SchemaNode::Object(ObjectNode {
            properties: fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            declares_properties: true,
            required: required.iter().map(|s| s.to_string()).collect(),
            description: None,
            keywords,
        })
    }

    pub fn array(items: Option<SchemaNode>) -> Self {
        let mut keywords = Keywords::new();
        keywords.insert("type".into(), Value::from("array"));
        SchemaNode::Array(ArrayNode {
            items: items.map(Box::new),
            description: None,
            keywords,
        })
    }

    pub fn any_of(variants: Vec<SchemaNode>) -> Self {
        SchemaNode::Union(UnionNode {
            kind: UnionKind::AnyOf,
            variants,
            description: None,
            keywords: Keywords::new(),
        })
    }

    pub fn reference(target: &str) -> Self {
        SchemaNode::Reference(Reference {
            target: target.to_string(),
            description: None,
            keywords: Keywords::new(),
        })
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.set_description(Some(description.to_string()));
        self
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            SchemaNode::Primitive(x) => x.description.as_deref(),
            SchemaNode::Object(x) => x.description.as_deref(),
            SchemaNode::Array(x) => x.description.as_deref(),
            SchemaNode::Union(x) => x.description.as_deref(),
            SchemaNode::Reference(x) => x.description.as_deref(),
        }
    }

    pub fn set_description(&mut self, description: Option<String>) {
        let slot = match self {
            SchemaNode::Primitive(x) => &mut x.description,
            SchemaNode::Object(x) => &mut x.description,
            SchemaNode::Array(x) => &mut x.description,
            SchemaNode::Union(x) => &mut x.description,
            SchemaNode::Reference(x) => &mut x.description,
        };
        *slot = description;
    }
}

// ------------------------------ JSON bridge ------------------------------- //

impl SchemaNode {
    /// Classify a JSON schema node.
    ///
    /// Precedence: `$ref`, then `anyOf`/`oneOf`, then object, then array,
    /// otherwise primitive.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        from_json_at(value, "#")
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        let (description, keywords) = match self {
            SchemaNode::Primitive(x) => (&x.description, &x.keywords),
            SchemaNode::Object(x) => (&x.description, &x.keywords),
            SchemaNode::Array(x) => (&x.description, &x.keywords),
            SchemaNode::Union(x) => (&x.description, &x.keywords),
            SchemaNode::Reference(x) => (&x.description, &x.keywords),
        };
        if let SchemaNode::Reference(r) = self {
            out.insert("$ref".into(), Value::from(r.target.clone()));
        }
        for (k, v) in keywords {
            out.insert(k.clone(), v.clone());
        }
        if let Some(d) = description {
            out.insert("description".into(), Value::from(d.clone()));
        }
        match self {
            SchemaNode::Primitive(_) | SchemaNode::Reference(_) => {}
            SchemaNode::Object(o) => {
                if !o.properties.is_empty() || o.declares_properties {
                    let props = o.properties.iter()
                        .map(|(k, v)| (k.clone(), v.to_json()))
                        .collect::<Map<_, _>>();
                    out.insert("properties".into(), Value::Object(props));
                }
                if !o.required.is_empty() {
                    out.insert(
                        "required".into(),
                        Value::Array(o.required.iter().cloned().map(Value::from).collect()),
                    );
                }
            }
            SchemaNode::Array(a) => {
                if let Some(items) = &a.items {
                    out.insert("items".into(), items.to_json());
                }
            }
            SchemaNode::Union(u) => {
                out.insert(
                    u.kind.keyword().into(),
                    Value::Array(u.variants.iter().map(SchemaNode::to_json).collect()),
                );
            }
        }
        Value::Object(out)
    }
}

fn from_json_at(value: &Value, path: &str) -> Result<SchemaNode, SchemaError> {
    let map = match value {
        Value::Object(m) => m,
        other => {
            return Err(SchemaError::NotAnObject {
                path: path.to_string(),
                found: json_kind(other),
            });
        }
    };

    let mut keywords = Keywords::new();
    let mut description = None;
    for (k, v) in map {
        if k == "description" {
            match v {
                Value::String(s) => description = Some(s.clone()),
                other => return Err(invalid(path, "description", format!("expected string, found {}", json_kind(other)))),
            }
        } else {
            keywords.insert(k.clone(), v.clone());
        }
    }

    // 1) References
    if let Some(target) = keywords.shift_remove("$ref") {
        let target = match target {
            Value::String(s) => s,
            other => return Err(invalid(path, "$ref", format!("expected string, found {}", json_kind(&other)))),
        };
        return Ok(SchemaNode::Reference(Reference { target, description, keywords }));
    }

    // 2) Unions
    for kind in [UnionKind::AnyOf, UnionKind::OneOf] {
        let keyword = kind.keyword();
        if let Some(arms) = keywords.shift_remove(keyword) {
            let arms = match arms {
                Value::Array(xs) => xs,
                other => return Err(invalid(path, keyword, format!("expected array, found {}", json_kind(&other)))),
            };
            let variants = arms.iter().enumerate()
                .map(|(i, v)| from_json_at(v, &format!("{path}/{keyword}/{i}")))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(SchemaNode::Union(UnionNode { kind, variants, description, keywords }));
        }
    }

    let ty = keywords.get("type").and_then(Value::as_str);

    // 3) Objects
    if ty == Some("object") || keywords.contains_key("properties") {
        let mut properties = IndexMap::new();
        let declares_properties = keywords.contains_key("properties");
        if let Some(props) = keywords.shift_remove("properties") {
            let props = match props {
                Value::Object(m) => m,
                other => return Err(invalid(path, "properties", format!("expected object, found {}", json_kind(&other)))),
            };
            for (name, child) in &props {
                let child = from_json_at(child, &format!("{path}/properties/{}", escape_pointer(name)))?;
                properties.insert(name.clone(), child);
            }
        }
        let required = match keywords.shift_remove("required") {
            None => Vec::new(),
            Some(v) => read_required(&v, path)?,
        };
        return Ok(SchemaNode::Object(ObjectNode { properties, declares_properties, required, description, keywords }));
    }

    // 4) Arrays
    if ty == Some("array") || keywords.contains_key("items") {
        let items = match keywords.shift_remove("items") {
            None => None,
            Some(v) => Some(Box::new(from_json_at(&v, &format!("{path}/items"))?)),
        };
        return Ok(SchemaNode::Array(ArrayNode { items, description, keywords }));
    }

    // 5) Everything else
    Ok(SchemaNode::Primitive(Primitive { description, keywords }))
}

pub(crate) fn read_required(value: &Value, path: &str) -> Result<Vec<String>, SchemaError> {
    let xs = match value {
        Value::Array(xs) => xs,
        other => return Err(invalid(path, "required", format!("expected array, found {}", json_kind(other)))),
    };
    xs.iter()
        .map(|x| match x {
            Value::String(s) => Ok(s.clone()),
            other => Err(invalid(path, "required", format!("expected string entries, found {}", json_kind(other)))),
        })
        .collect()
}

fn invalid(path: &str, keyword: &'static str, reason: String) -> SchemaError {
    SchemaError::InvalidKeyword { path: path.to_string(), keyword, reason }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SchemaNode::from_json(&value).map_err(serde::de::Error::custom)
    }
}

// ------------------------------- Document --------------------------------- //

/// Root of a structured-output schema: top-level properties, their required
/// names and the pool of named definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub properties: IndexMap<String, SchemaNode>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(rename = "$defs", alias = "definitions", default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<IndexMap<String, SchemaNode>>,
    /// Root keywords other than the above (`type`, `title`, ...).
    #[serde(flatten)]
    pub keywords: Keywords,
}

impl SchemaDocument {
    /// Like the serde path, but errors carry full `#/properties/...` paths.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        let map = match value {
            Value::Object(m) => m,
            other => return Err(SchemaError::NotAnObject { path: "#".into(), found: json_kind(other) }),
        };
        let mut doc = SchemaDocument::default();
        for (k, v) in map {
            match k.as_str() {
                "properties" => {
                    let props = v.as_object().ok_or_else(|| {
                        invalid("#", "properties", format!("expected object, found {}", json_kind(v)))
                    })?;
                    for (name, child) in props {
                        let path = format!("#/properties/{}", escape_pointer(name));
                        doc.properties.insert(name.clone(), from_json_at(child, &path)?);
                    }
                }
                "required" => doc.required = read_required(v, "#")?,
                "$defs" | "definitions" => {
                    let keyword = if k == "$defs" { "$defs" } else { "definitions" };
                    let defs = v.as_object().ok_or_else(|| {
                        invalid("#", keyword, format!("expected object, found {}", json_kind(v)))
                    })?;
                    let pool = doc.definitions.get_or_insert_with(IndexMap::new);
                    for (name, child) in defs {
                        let path = format!("#/{keyword}/{}", escape_pointer(name));
                        pool.insert(name.clone(), from_json_at(child, &path)?);
                    }
                }
                _ => {
                    doc.keywords.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(doc)
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classification_follows_keyword_precedence() {
        let node = SchemaNode::from_json(&json!({"$ref": "#/$defs/a", "type": "object"})).unwrap();
        assert!(matches!(node, SchemaNode::Reference(_)));

        let node = SchemaNode::from_json(&json!({"anyOf": [{"type": "string"}, {"type": "null"}]})).unwrap();
        let SchemaNode::Union(u) = node else { panic!("expected union") };
        assert_eq!(u.kind, UnionKind::AnyOf);
        assert_eq!(u.variants.len(), 2);

        let node = SchemaNode::from_json(&json!({"properties": {"x": {"type": "integer"}}})).unwrap();
        assert!(matches!(node, SchemaNode::Object(_)));

        let node = SchemaNode::from_json(&json!({"type": "array"})).unwrap();
        let SchemaNode::Array(a) = node else { panic!("expected array") };
        assert!(a.items.is_none());

        let node = SchemaNode::from_json(&json!({"type": ["string", "null"]})).unwrap();
        assert!(matches!(node, SchemaNode::Primitive(_)));
    }

    #[test]
    fn unknown_keywords_survive_a_round_trip() {
        let src = json!({
            "type": "object",
            "additionalProperties": false,
            "description": "a point",
            "properties": {
                "x": {"type": "number", "minimum": 0},
                "tags": {"type": "array", "items": {"type": "string", "enum": ["a", "b"]}}
            },
            "required": ["x"]
        });
        let node = SchemaNode::from_json(&src).unwrap();
        assert_eq!(node.description(), Some("a point"));
        let back = node.to_json();
        assert_eq!(back["additionalProperties"], json!(false));
        assert_eq!(back["properties"]["x"]["minimum"], json!(0));
        assert_eq!(back["properties"]["tags"]["items"]["enum"], json!(["a", "b"]));
        assert_eq!(back["required"], json!(["x"]));
        assert_eq!(SchemaNode::from_json(&back).unwrap(), node);
    }

    #[test]
    fn empty_properties_are_kept_when_declared() {
        let src = json!({"type": "object", "properties": {}, "additionalProperties": false});
        let back = SchemaNode::from_json(&src).unwrap().to_json();
        assert_eq!(back, src);

        let src = json!({"type": "object"});
        assert_eq!(SchemaNode::from_json(&src).unwrap().to_json(), src);

        let src = json!({"properties": {}});
        assert_eq!(SchemaNode::from_json(&src).unwrap().to_json(), src);
    }

    #[test]
    fn errors_carry_the_offending_path() {
        let err = SchemaNode::from_json(&json!({"properties": {"a/b": {"items": 3}}})).unwrap_err();
        assert_eq!(err, SchemaError::NotAnObject { path: "#/properties/a~1b/items".into(), found: "number" });

        let err = SchemaNode::from_json(&json!({"type": "object", "required": "x"})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidKeyword { keyword: "required", .. }));
    }

    #[test]
    fn document_accepts_definitions_alias() {
        let doc: SchemaDocument = serde_json::from_value(json!({
            "type": "object",
            "properties": {"boss": {"$ref": "#/definitions/person"}},
            "definitions": {"person": {"type": "object", "properties": {"name": {"type": "string"}}}}
        })).unwrap();
        assert_eq!(doc.properties.len(), 1);
        assert!(doc.definitions.as_ref().unwrap().contains_key("person"));
        assert_eq!(doc.keywords.get("type"), Some(&json!("object")));
    }

    #[test]
    fn document_errors_use_full_paths() {
        let err = SchemaDocument::from_json(&json!({
            "properties": {"ok": {"type": "string"}},
            "$defs": {"person": {"properties": {"age": 5}}}
        })).unwrap_err();
        assert_eq!(err, SchemaError::NotAnObject { path: "#/$defs/person/properties/age".into(), found: "number" });

        let doc = SchemaDocument::from_json(&json!({
            "title": "T",
            "properties": {"a": {"type": "string"}},
            "required": ["a"]
        })).unwrap();
        assert_eq!(doc.required, ["a"]);
        assert!(doc.definitions.is_none());
        assert_eq!(doc.keywords.get("title"), Some(&json!("T")));
    }
}
