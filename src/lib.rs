//! Reversible field-name compression for structured-output schemas.
//!
//! [`compress::compress`] rewrites every field name in a schema tree to a
//! short code and returns a [`field_map::FieldMap`]; [`expand::expand`] uses
//! that map to rebuild a model's compressed response with the original names.
pub mod error;
pub mod schema;
pub mod field_map;
pub mod compress;
pub mod payload;
pub mod expand;
pub mod path_de;
pub mod jq_exec;

pub use compress::{compress, compress_document, Compressed, CompressionStats};
pub use error::{ExpandError, FieldMapError, SchemaError};
pub use expand::{expand, expand_json, ExpandOptions};
pub use field_map::{FieldEntry, FieldMap, Mapping, Shape};
pub use payload::{Key, Payload};
pub use schema::{SchemaDocument, SchemaNode};
