use serde::de::DeserializeOwned;

/// Deserialize with JSON-path context in error messages, e.g. a bad `$ref`
/// deep inside `properties` reports where it sits in the document.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> anyhow::Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        anyhow::anyhow!("at JSON path {path} → {}", err.into_inner())
    })
}
