use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{DECODED_FIELD, PAYLOAD_FIELD, Record, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Boolean,
    String,
    Date,
    Unknown,
}

impl FieldType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Number(_) => FieldType::Number,
            Value::Boolean(_) => FieldType::Boolean,
            Value::String(_) => FieldType::String,
            Value::Null => FieldType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::String => "string",
            FieldType::Date => "date",
            FieldType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldCategory {
    #[serde(rename = "customProperties")]
    CustomProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FieldCategory>,
}

impl FieldDescriptor {
    pub fn is_custom(&self) -> bool {
        self.category == Some(FieldCategory::CustomProperties)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CatalogStrategy {
    /// Inspect only the first record
    Sample,
    /// Union of the fields of every record
    #[default]
    Exhaustive,
}

/// Builds the field catalog by scanning every record.
pub fn build_field_catalog(records: &[Record]) -> Vec<FieldDescriptor> {
    build_field_catalog_with(records, CatalogStrategy::Exhaustive)
}

pub fn build_field_catalog_with(
    records: &[Record],
    strategy: CatalogStrategy,
) -> Vec<FieldDescriptor> {
    let scanned = match strategy {
        CatalogStrategy::Sample => records.get(..1).unwrap_or_default(),
        CatalogStrategy::Exhaustive => records,
    };
    let mut standard = FieldAccumulator::default();
    let mut custom = FieldAccumulator::default();

    for record in scanned {
        let props = record.custom_properties.as_ref();
        if let Some(props) = props {
            for (name, value) in props {
                custom.observe(name, value);
            }
        }
        for (name, value) in &record.fields {
            if name == PAYLOAD_FIELD || name == DECODED_FIELD {
                continue;
            }
            // Keys merged up from the property bag are listed once, as custom fields.
            if props.is_some_and(|p| p.contains_key(name)) {
                continue;
            }
            standard.observe(name, value);
        }
    }

    standard.types.retain(|name, _| !custom.types.contains_key(name));
    let catalog = standard
        .into_descriptors(None)
        .chain(custom.into_descriptors(Some(FieldCategory::CustomProperties)))
        .collect::<Vec<_>>();
    debug!(
        "Field catalog built from {} record(s) ({strategy:?}): {} field(s)",
        scanned.len(),
        catalog.len()
    );
    catalog
}

#[derive(Default)]
struct FieldAccumulator {
    types: IndexMap<String, Option<FieldType>>,
}

impl FieldAccumulator {
    fn observe(&mut self, name: &str, value: &Value) {
        let slot = self.types.entry(name.to_string()).or_insert(None);
        if slot.is_none() && !value.is_null() {
            *slot = Some(FieldType::of(value));
        }
    }

    fn into_descriptors(
        self,
        category: Option<FieldCategory>,
    ) -> impl Iterator<Item = FieldDescriptor> {
        self.types.into_iter().map(move |(name, ty)| FieldDescriptor {
            id: Uuid::new_v4(),
            name,
            field_type: ty.unwrap_or(FieldType::Unknown),
            category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn sample() -> Vec<Record> {
        normalize(vec![
            Record::new()
                .with_payload("{'isOfferApplied':true,'time':120}")
                .with_field("platform", "Android")
                .with_field("userid", 0),
            Record::new()
                .with_payload("{'time':90,'coupon':'SAVE'}")
                .with_field("platform", "iOS")
                .with_field("userid", 1)
                .with_field("note", Value::Null),
        ])
    }

    #[test]
    fn empty_dataset_has_no_fields() {
        assert!(build_field_catalog(&[]).is_empty());
    }

    #[test]
    fn exhaustive_catalog_unions_custom_keys() {
        let catalog = build_field_catalog(&sample());
        let names = catalog.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["platform", "userid", "note", "isOfferApplied", "time", "coupon"]
        );
        let note = catalog.iter().find(|f| f.name == "note").unwrap();
        assert_eq!(note.field_type, FieldType::Unknown);
        assert!(!note.is_custom());
        let coupon = catalog.iter().find(|f| f.name == "coupon").unwrap();
        assert_eq!(coupon.field_type, FieldType::String);
        assert!(coupon.is_custom());
    }

    #[test]
    fn sample_catalog_reads_first_record_only() {
        let catalog = build_field_catalog_with(&sample(), CatalogStrategy::Sample);
        let names = catalog.iter().map(|f| f.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["platform", "userid", "isOfferApplied", "time"]);
        let flag = catalog.iter().find(|f| f.name == "isOfferApplied").unwrap();
        assert_eq!(flag.field_type, FieldType::Boolean);
    }

    #[test]
    fn names_seen_in_any_property_bag_are_custom_only() {
        let records = normalize(vec![
            Record::new().with_field("time", 12).with_field("platform", "web"),
            Record::new().with_payload("{'time':30}"),
        ]);
        let catalog = build_field_catalog(&records);
        let summary = catalog
            .iter()
            .map(|f| (f.name.as_str(), f.is_custom()))
            .collect::<Vec<_>>();
        assert_eq!(summary, vec![("platform", false), ("time", true)]);
    }

    #[test]
    fn identifiers_are_unique_within_a_build() {
        let catalog = build_field_catalog(&sample());
        let mut ids = catalog.iter().map(|f| f.id).collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), catalog.len());
    }
}
