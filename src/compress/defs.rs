use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::SchemaCompressor;
use crate::field_map::Mapping;
use crate::schema::SchemaNode;

static DEF_POINTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#/(?:\$defs|definitions)/(.+)$").expect("definition pointer regex")
});

/// Definition name named by a `$ref` target.
///
/// `#/$defs/<name>` and `#/definitions/<name>` are recognized; anything else
/// falls back to the last path segment.
pub fn definition_name(target: &str) -> String {
    let raw = match DEF_POINTER.captures(target) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => target.rsplit('/').next().unwrap_or(target),
    };
    raw.replace("~1", "/").replace("~0", "~")
}

/// Compress every definition under its own fresh scope.
///
/// Returns the compressed pool and each definition's field map, both keyed by
/// the (unchanged) definition name.
pub fn compress_definitions(
    definitions: &IndexMap<String, SchemaNode>,
) -> (IndexMap<String, SchemaNode>, IndexMap<String, Mapping>) {
    let mut nodes = IndexMap::with_capacity(definitions.len());
    let mut maps = IndexMap::with_capacity(definitions.len());
    for (name, definition) in definitions {
        let (node, mapping) = compress_schema(definition, Some(definitions));
        tracing::debug!(definition = %name, fields = mapping.len(), "compressed definition");
        nodes.insert(name.clone(), node);
        maps.insert(name.clone(), mapping);
    }
    (nodes, maps)
}

/// One definition: objects with properties are compressed with a new scope,
/// anything else passes through with an empty map.
pub fn compress_schema(
    definition: &SchemaNode,
    pool: Option<&IndexMap<String, SchemaNode>>,
) -> (SchemaNode, Mapping) {
    match definition {
        SchemaNode::Object(o) if !o.properties.is_empty() => {
            let mut compressor = SchemaCompressor::new(pool);
            let (obj, mapping) = compressor.compress_object(o);
            (SchemaNode::Object(obj), mapping)
        }
        other => (other.clone(), Mapping::new()),
    }
}
