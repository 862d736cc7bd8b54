//! Named, independently defined record subsets for side-by-side comparison.
//!
//! A group holds equality constraints only. A record belongs to a group when every
//! constraint holds under strict equality (no coercion) against the record's
//! resolved value. Groups may overlap or be empty, and the output always keeps
//! one entry per group, in definition order.

use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{Record, Value, resolve_field};

pub const UNNAMED_GROUP: &str = "New Group";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupCondition {
    pub field: String,
    pub value: Value,
}

impl GroupCondition {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn holds(&self, record: &Record) -> bool {
        resolve_field(record, &self.field) == Some(&self.value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonGroup {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<GroupCondition>,
    /// Set once the name was chosen by hand; such names are never regenerated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub custom_name: bool,
}

impl ComparisonGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            conditions: Vec::new(),
            custom_name: false,
        }
    }

    /// Builds a group whose name is derived from its conditions.
    pub fn from_conditions(conditions: Vec<GroupCondition>) -> Self {
        let name = generate_group_name(&conditions);
        Self {
            conditions,
            ..Self::new(name)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self.custom_name = true;
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|condition| condition.holds(record))
    }

    pub fn refresh_name(&mut self) {
        if !self.custom_name {
            self.name = generate_group_name(&self.conditions);
        }
    }
}

/// `"field: True & other: False"`, judged by each value's truthiness.
pub fn generate_group_name(conditions: &[GroupCondition]) -> String {
    if conditions.is_empty() {
        return UNNAMED_GROUP.to_string();
    }
    conditions
        .iter()
        .map(|c| {
            let label = if c.value.is_truthy() { "True" } else { "False" };
            format!("{}: {label}", c.field)
        })
        .join(" & ")
}

/// Partitions `records` into one possibly-empty subset per group.
///
/// Duplicate group names get a ` (n)` suffix so that no group is dropped.
pub fn compare_groups(
    records: &[Record],
    groups: &[ComparisonGroup],
) -> IndexMap<String, Vec<Record>> {
    let mut result = IndexMap::with_capacity(groups.len());
    for group in groups {
        let members = records
            .iter()
            .filter(|record| group.matches(record))
            .cloned()
            .collect::<Vec<_>>();
        debug!("Comparison group '{}': {} record(s)", group.name, members.len());
        let name = unique_name(&result, &group.name);
        result.insert(name, members);
    }
    result
}

fn unique_name(existing: &IndexMap<String, Vec<Record>>, name: &str) -> String {
    if !existing.contains_key(name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{name} ({n})"))
        .find(|candidate| !existing.contains_key(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Every true/false assignment over `fields`, one group per assignment.
///
/// Assignments are produced iteratively, first field varying slowest and `true`
/// before `false`. No fields yields a single unconstrained group.
pub fn boolean_combinations(fields: &[String]) -> Vec<ComparisonGroup> {
    if fields.is_empty() {
        return vec![ComparisonGroup::from_conditions(Vec::new())];
    }
    fields
        .iter()
        .map(|_| [true, false])
        .multi_cartesian_product()
        .map(|flags| {
            let conditions = fields
                .iter()
                .zip(flags)
                .map(|(field, flag)| GroupCondition::new(field.clone(), flag))
                .collect();
            ComparisonGroup::from_conditions(conditions)
        })
        .collect()
}

/// Parses `[name:]field=value[,field=value...]`.
///
/// The text before a `:` that precedes the first `=` names the group; otherwise the
/// name is generated from the conditions.
pub fn parse_group(expr: &str) -> Result<ComparisonGroup> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty comparison group expression"));
    }
    let (name, body) = match (trimmed.find(':'), trimmed.find('=')) {
        (Some(colon), Some(eq)) if colon < eq => {
            (Some(trimmed[..colon].trim()), &trimmed[colon + 1..])
        }
        (Some(colon), None) => (Some(trimmed[..colon].trim()), &trimmed[colon + 1..]),
        _ => (None, trimmed),
    };
    let conditions = body
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (field, value) = part
                .split_once('=')
                .ok_or_else(|| anyhow!("Comparison condition '{part}' must be field=value"))?;
            let field = field.trim();
            if field.is_empty() {
                return Err(anyhow!("Comparison condition '{part}' is missing a field name"));
            }
            Ok(GroupCondition::new(field, Value::parse_literal(value)))
        })
        .collect::<Result<Vec<_>>>()?;
    let group = ComparisonGroup::from_conditions(conditions);
    Ok(match name.filter(|n| !n.is_empty()) {
        Some(name) => group.with_name(name),
        None => group,
    })
}
