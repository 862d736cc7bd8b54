//! Boundary helpers that turn loaded JSON into dataset records.
//!
//! Datasets arrive either as a bare array of objects or wrapped in an API
//! envelope (`{"data": {"result": [...]}}` or `{"result": [...]}`). Anything
//! else is rejected up front with [`DatasetError`]; no partial recovery is
//! attempted at this layer.

use log::debug;

use crate::{
    data::{DECODED_FIELD, FieldMap, Record, Value},
    error::{DatasetError, json_kind},
};

pub fn parse_dataset(input: &str) -> Result<Vec<Record>, DatasetError> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    let items = unwrap_envelope(value)?;
    records_from_json(items)
}

/// Extracts the record array from `data.result`, `result`, or the value itself.
pub fn unwrap_envelope(value: serde_json::Value) -> Result<Vec<serde_json::Value>, DatasetError> {
    match value {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(mut map) => {
            if let Some(serde_json::Value::Object(data)) = map.get_mut("data")
                && let Some(result) = data.remove("result")
            {
                debug!("Unwrapping dataset from 'data.result'");
                return expect_array(result, "data.result");
            }
            if let Some(result) = map.remove("result") {
                debug!("Unwrapping dataset from 'result'");
                return expect_array(result, "result");
            }
            Err(DatasetError::InvalidShape(
                "expected an array or an object with 'data.result' or 'result'".to_string(),
            ))
        }
        other => Err(DatasetError::InvalidShape(format!(
            "expected an array of records, found {}",
            json_kind(&other)
        ))),
    }
}

fn expect_array(value: serde_json::Value, path: &str) -> Result<Vec<serde_json::Value>, DatasetError> {
    match value {
        serde_json::Value::Array(items) => Ok(items),
        other => Err(DatasetError::InvalidShape(format!(
            "'{path}' must be an array, found {}",
            json_kind(&other)
        ))),
    }
}

pub fn records_from_json(items: Vec<serde_json::Value>) -> Result<Vec<Record>, DatasetError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| record_from_json(index, item))
        .collect()
}

fn record_from_json(index: usize, item: serde_json::Value) -> Result<Record, DatasetError> {
    let serde_json::Value::Object(map) = item else {
        return Err(DatasetError::RecordNotObject {
            index,
            found: json_kind(&item),
        });
    };
    let mut record = Record::new();
    for (key, value) in map {
        match (key.as_str(), &value) {
            // Already decoded upstream; keep it as the property bag rather than a field.
            (DECODED_FIELD, serde_json::Value::Object(props)) => {
                let decoded = props
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect::<FieldMap>();
                record.custom_properties = Some(decoded);
            }
            _ => {
                record.fields.insert(key, Value::from_json(&value));
            }
        }
    }
    Ok(record)
}
