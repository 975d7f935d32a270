/// Error types for the schema-squash crate.
use thiserror::Error;

/// Errors raised while reading a JSON schema into a [`crate::schema::SchemaNode`] tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("schema node at {path} must be a JSON object, found {found}")]
    NotAnObject { path: String, found: &'static str },

    #[error("invalid `{keyword}` at {path}: {reason}")]
    InvalidKeyword {
        path: String,
        keyword: &'static str,
        reason: String,
    },
}

/// Errors raised while reading a field map from its JSON wire form.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldMapError {
    #[error("malformed field map at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl FieldMapError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        let path = if path.is_empty() { "/" } else { path };
        FieldMapError::Malformed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while expanding a payload.
///
/// Payload irregularities never end up here; they are passed through.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpandError {
    #[error("field map references definition `{name}` but `_defs` has no such entry")]
    UnresolvedReference { name: String },
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
