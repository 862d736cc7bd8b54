//! Decoding of the embedded property payload carried by raw records.
//!
//! Payloads use single quotes as string delimiters (`{'isOfferApplied':true}`).
//! Every `'` is swapped for `"` and the result must then be a JSON object;
//! anything else decodes to an empty property bag for that record only.

use log::{debug, info};

use crate::data::{FieldMap, Record, Value, parse_js_number};

/// Normalizes every record, preserving order and length.
pub fn normalize(records: Vec<Record>) -> Vec<Record> {
    let total = records.len();
    let mut undecodable = 0usize;
    let normalized = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let (record, decoded) = normalize_inner(record);
            if !decoded {
                undecodable += 1;
                debug!("Record {index}: property payload could not be decoded");
            }
            record
        })
        .collect::<Vec<_>>();
    info!("Normalized {total} record(s); {undecodable} payload(s) could not be decoded");
    normalized
}

/// Decodes one record's payload and merges the decoded keys onto the top level
/// without overwriting existing fields. Records without a payload pass through.
pub fn normalize_record(record: Record) -> Record {
    normalize_inner(record).0
}

fn normalize_inner(mut record: Record) -> (Record, bool) {
    let Some(payload) = record.payload() else {
        return (record, true);
    };
    let decoded = decode_payload(payload);
    let ok = decoded.is_some();
    let props = decoded.unwrap_or_default();
    for (key, value) in &props {
        if !record.fields.contains_key(key) {
            record.fields.insert(key.clone(), value.clone());
        }
    }
    record.custom_properties = Some(props);
    (record, ok)
}

/// Returns `None` when the payload is not a JSON object after quote substitution.
pub fn decode_payload(payload: &str) -> Option<FieldMap> {
    let substituted = payload.replace('\'', "\"");
    let parsed: serde_json::Value = serde_json::from_str(&substituted).ok()?;
    let serde_json::Value::Object(map) = parsed else {
        return None;
    };
    Some(
        map.iter()
            .map(|(key, value)| (key.clone(), reclassify(Value::from_json(value))))
            .collect(),
    )
}

/// Turns `"true"`/`"false"` and fully numeric strings into their typed form.
/// A blank string reads as `0`, as `Number("")` does.
pub fn reclassify(value: Value) -> Value {
    match value {
        Value::String(s) => match s.as_str() {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            blank if blank.trim().is_empty() => Value::Number(0.0),
            other => match parse_js_number(other) {
                Some(number) => Value::Number(number),
                None => Value::String(s),
            },
        },
        other => other,
    }
}
