use thiserror::Error;

/// Failures that reject a dataset or configuration as a whole.
///
/// Per-record problems (undecodable payloads, missing fields) never surface here;
/// they degrade to safe defaults inside the pipeline.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("invalid dataset shape: {0}")]
    InvalidShape(String),
    #[error("record {index} is not an object (found {found})")]
    RecordNotObject { index: usize, found: &'static str },
    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed YAML input: {0}")]
    Yaml(#[from] serde_yaml::Error),
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
