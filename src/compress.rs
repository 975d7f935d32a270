//! Field-name compression.
//!
//! Walks a schema tree, swaps every field name for a short code and records
//! how to undo it in a [`FieldMap`]. The main tree shares one [`NameScope`]
//! across all depths; each definition is compressed with its own (see
//! [`defs`]).
pub mod alloc;
pub mod defs;

use indexmap::IndexMap;
use serde_json::{Map, Value};

pub use alloc::NameScope;

use crate::field_map::{FieldEntry, FieldMap, Mapping, Shape};
use crate::schema::{ArrayNode, Keywords, ObjectNode, SchemaDocument, SchemaNode, UnionNode};

// ------------------------------- Output ----------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub struct Compressed {
    pub properties: IndexMap<String, SchemaNode>,
    pub required: Vec<String>,
    pub field_map: FieldMap,
    /// Present when a non-empty definitions pool was supplied.
    pub definitions: Option<IndexMap<String, SchemaNode>>,
    /// Root keywords carried over from a [`SchemaDocument`].
    pub keywords: Keywords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressionStats {
    pub fields: usize,
    pub original_key_chars: usize,
    pub compressed_key_chars: usize,
}

impl CompressionStats {
    pub fn saved(&self) -> usize {
        self.original_key_chars.saturating_sub(self.compressed_key_chars)
    }

    /// Compressed key length as a fraction of the original.
    pub fn ratio(&self) -> f64 {
        if self.original_key_chars == 0 {
            1.0
        } else {
            self.compressed_key_chars as f64 / self.original_key_chars as f64
        }
    }

    fn add_mapping(&mut self, mapping: &Mapping) {
        for (code, entry) in mapping.iter() {
            self.fields += 1;
            self.original_key_chars += entry.original().chars().count();
            self.compressed_key_chars += code.chars().count();
            if let FieldEntry::Node { shape, .. } = entry {
                self.add_shape(shape);
            }
        }
    }

    fn add_shape(&mut self, shape: &Shape) {
        match shape {
            Shape::Object(m) => self.add_mapping(m),
            Shape::Items(inner) => self.add_shape(inner),
            Shape::Variants(vs) => vs.iter().for_each(|v| self.add_shape(v)),
            Shape::Ref(_) => {}
        }
    }
}

impl Compressed {
    pub fn stats(&self) -> CompressionStats {
        let mut stats = CompressionStats::default();
        stats.add_mapping(&self.field_map.entries);
        if let Some(defs) = &self.field_map.defs {
            defs.values().for_each(|m| stats.add_mapping(m));
        }
        stats
    }

    /// Rebuild a root JSON schema around the compressed tree.
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        if !self.keywords.contains_key("type") {
            out.insert("type".into(), Value::from("object"));
        }
        for (k, v) in &self.keywords {
            out.insert(k.clone(), v.clone());
        }
        let props = self.properties.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<Map<_, _>>();
        out.insert("properties".into(), Value::Object(props));
        out.insert(
            "required".into(),
            Value::Array(self.required.iter().cloned().map(Value::from).collect()),
        );
        if let Some(defs) = &self.definitions {
            let defs = defs.iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect::<Map<_, _>>();
            out.insert("$defs".into(), Value::Object(defs));
        }
        Value::Object(out)
    }
}

// ------------------------------- Front API -------------------------------- //

/// Compress a properties tree and its definitions pool.
pub fn compress(
    properties: &IndexMap<String, SchemaNode>,
    required: &[String],
    definitions: Option<&IndexMap<String, SchemaNode>>,
) -> Compressed {
    let definitions = definitions.filter(|d| !d.is_empty());
    let span = tracing::debug_span!(
        "compress",
        fields = properties.len(),
        definitions = definitions.map_or(0, |d| d.len())
    );
    let _guard = span.enter();

    // definitions first, each with its own scope
    let (compressed_defs, defs_map) = match definitions {
        Some(pool) => {
            let (nodes, maps) = defs::compress_definitions(pool);
            (Some(nodes), Some(maps))
        }
        None => (None, None),
    };

    let mut compressor = SchemaCompressor::new(definitions);
    let (properties, required, entries) = compressor.compress_properties(properties, required);
    tracing::debug!(codes = compressor.scope().len(), "compressed main tree");

    Compressed {
        properties,
        required,
        field_map: FieldMap { entries, defs: defs_map },
        definitions: compressed_defs,
        keywords: Keywords::new(),
    }
}

pub fn compress_document(doc: &SchemaDocument) -> Compressed {
    let mut out = compress(&doc.properties, &doc.required, doc.definitions.as_ref());
    out.keywords = doc.keywords.clone();
    out
}

// ------------------------------ Compressor -------------------------------- //

/// One compression pass. Owns the naming scope every recursive call shares.
pub struct SchemaCompressor<'a> {
    scope: NameScope,
    /// Pool used only to flag `$ref`s that point nowhere.
    definitions: Option<&'a IndexMap<String, SchemaNode>>,
}

impl<'a> SchemaCompressor<'a> {
    pub fn new(definitions: Option<&'a IndexMap<String, SchemaNode>>) -> Self {
        Self { scope: NameScope::new(), definitions }
    }

    pub fn scope(&self) -> &NameScope { &self.scope }

    /// Rename one level of properties, recursing into children under the same
    /// scope. Returns the renamed properties, the renamed required list (in
    /// field order) and the level's mapping.
    pub fn compress_properties(
        &mut self,
        properties: &IndexMap<String, SchemaNode>,
        required: &[String],
    ) -> (IndexMap<String, SchemaNode>, Vec<String>, Mapping) {
        let mut out = IndexMap::with_capacity(properties.len());
        let mut out_required = Vec::new();
        let mut mapping = Mapping::new();
        for (name, node) in properties {
            // parent claims its code before any child does
            let code = self.scope.allocate(name);
            tracing::trace!(name = %name, code = %code, "allocated short code");
            if required.iter().any(|r| r == name) {
                out_required.push(code.clone());
            }
            let (node, entry) = self.compress_field(name, node);
            out.insert(code.clone(), node);
            mapping.insert(code, entry);
        }
        (out, out_required, mapping)
    }

    pub(crate) fn compress_object(&mut self, o: &ObjectNode) -> (ObjectNode, Mapping) {
        let (properties, required, mapping) = self.compress_properties(&o.properties, &o.required);
        let obj = ObjectNode {
            properties,
            declares_properties: o.declares_properties,
            required,
            description: o.description.clone(),
            keywords: o.keywords.clone(),
        };
        (obj, mapping)
    }

    fn compress_field(&mut self, name: &str, node: &SchemaNode) -> (SchemaNode, FieldEntry) {
        let leaf = || FieldEntry::Leaf(name.to_string());
        let branch = |shape: Shape| FieldEntry::Node { original: name.to_string(), shape };

        let (mut out, entry) = match node {
            SchemaNode::Reference(r) => (node.clone(), branch(Shape::Ref(self.resolve(&r.target)))),
            SchemaNode::Object(o) if !o.properties.is_empty() => {
                let (obj, mapping) = self.compress_object(o);
                let entry = if mapping.is_empty() { leaf() } else { branch(Shape::Object(mapping)) };
                (SchemaNode::Object(obj), entry)
            }
            SchemaNode::Object(_) | SchemaNode::Primitive(_) => (node.clone(), leaf()),
            SchemaNode::Array(a) => {
                let (arr, shape) = self.compress_array(a);
                (SchemaNode::Array(arr), shape.map_or_else(leaf, branch))
            }
            SchemaNode::Union(u) => {
                let (union, shapes) = self.compress_union(u);
                (SchemaNode::Union(union), branch(Shape::Variants(shapes)))
            }
        };
        out.set_description(Some(field_description(name, node.description())));
        (out, entry)
    }

    /// Shape of the array as a whole: `Items(..)` or `Ref(..)`, `None` when
    /// the elements need no renaming.
    fn compress_array(&mut self, a: &ArrayNode) -> (ArrayNode, Option<Shape>) {
        let mut arr = a.clone();
        let shape = match &a.items {
            None => None,
            Some(items) => {
                let (items, shape) = self.compress_items(items);
                arr.items = Some(Box::new(items));
                shape
            }
        };
        (arr, shape)
    }

    fn compress_items(&mut self, items: &SchemaNode) -> (SchemaNode, Option<Shape>) {
        match items {
            SchemaNode::Object(o) if !o.properties.is_empty() => {
                let (obj, mapping) = self.compress_object(o);
                (SchemaNode::Object(obj), Some(Shape::Items(Box::new(Shape::Object(mapping)))))
            }
            SchemaNode::Union(u) => {
                let (union, shapes) = self.compress_union(u);
                (SchemaNode::Union(union), Some(Shape::Items(Box::new(Shape::Variants(shapes)))))
            }
            SchemaNode::Reference(r) => (items.clone(), Some(Shape::Ref(self.resolve(&r.target)))),
            SchemaNode::Array(a) => {
                let (arr, shape) = self.compress_array(a);
                (SchemaNode::Array(arr), shape.map(|s| Shape::Items(Box::new(s))))
            }
            SchemaNode::Object(_) | SchemaNode::Primitive(_) => (items.clone(), None),
        }
    }

    fn compress_union(&mut self, u: &UnionNode) -> (UnionNode, Vec<Shape>) {
        let mut variants = Vec::with_capacity(u.variants.len());
        let mut shapes = Vec::with_capacity(u.variants.len());
        for variant in &u.variants {
            let (node, shape) = self.compress_variant(variant);
            variants.push(node);
            shapes.push(shape);
        }
        let union = UnionNode {
            kind: u.kind,
            variants,
            description: u.description.clone(),
            keywords: u.keywords.clone(),
        };
        (union, shapes)
    }

    /// One union arm. Arms with nothing to rename become an empty mapping,
    /// which is how the null branch shows up in the field map.
    fn compress_variant(&mut self, variant: &SchemaNode) -> (SchemaNode, Shape) {
        match variant {
            SchemaNode::Object(o) if !o.properties.is_empty() => {
                let (obj, mapping) = self.compress_object(o);
                (SchemaNode::Object(obj), Shape::Object(mapping))
            }
            SchemaNode::Array(a) => {
                let (arr, shape) = self.compress_array(a);
                (SchemaNode::Array(arr), shape.unwrap_or_else(Shape::empty))
            }
            SchemaNode::Reference(r) => (variant.clone(), Shape::Ref(self.resolve(&r.target))),
            SchemaNode::Union(u) => {
                let (union, shapes) = self.compress_union(u);
                (SchemaNode::Union(union), Shape::Variants(shapes))
            }
            SchemaNode::Object(_) | SchemaNode::Primitive(_) => (variant.clone(), Shape::empty()),
        }
    }

    fn resolve(&self, target: &str) -> String {
        let name = defs::definition_name(target);
        if let Some(pool) = self.definitions {
            if !pool.contains_key(&name) {
                tracing::warn!(reference = %target, definition = %name, "$ref points at an unknown definition");
            }
        }
        name
    }
}

/// `"<name>: <description>"`, or just the name.
pub fn field_description(name: &str, description: Option<&str>) -> String {
    match description {
        Some(d) => format!("{name}: {d}"),
        None => name.to_string(),
    }
}

// ------------------------------- Tests ------------------------------------ //
