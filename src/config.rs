//! The analysis configuration: the single aggregate root the pipeline reads.
//!
//! Every edit returns a new revision instead of mutating in place, so callers can
//! detect change by comparing revisions. Edits that name an unknown id or an
//! out-of-range index return an unchanged copy.
//!
//! Configurations round-trip through YAML or JSON, chosen by file extension.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    aggregate::AggregationType,
    compare::{ComparisonGroup, GroupCondition},
    data::Value,
    error::DatasetError,
    filter::{ComparisonOperator, Connective, FilterCondition},
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
    #[default]
    Bar,
    Line,
    Pie,
    Area,
    Table,
}

/// Where a field from the catalog was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    Metrics,
    Dimensions,
    Conditions,
    Comparisons,
}

#[derive(Debug, Clone, Default)]
pub struct ConditionUpdate {
    pub field: Option<String>,
    pub operator: Option<ComparisonOperator>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub conditions: Option<Vec<GroupCondition>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    pub metrics: Vec<String>,
    pub dimensions: Vec<String>,
    pub conditions: Vec<FilterCondition>,
    #[serde(rename = "conditionOperators")]
    pub connectives: Vec<Connective>,
    pub comparison_groups: Vec<ComparisonGroup>,
    pub visualization: VisualizationType,
    pub aggregation_type: AggregationType,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_metric(&self, field: &str) -> Self {
        let mut next = self.clone();
        push_unique(&mut next.metrics, field);
        next
    }

    #[must_use]
    pub fn remove_metric(&self, field: &str) -> Self {
        let mut next = self.clone();
        next.metrics.retain(|m| m != field);
        next
    }

    #[must_use]
    pub fn add_dimension(&self, field: &str) -> Self {
        let mut next = self.clone();
        push_unique(&mut next.dimensions, field);
        next
    }

    #[must_use]
    pub fn remove_dimension(&self, field: &str) -> Self {
        let mut next = self.clone();
        next.dimensions.retain(|d| d != field);
        next
    }

    /// Appends an unconfigured condition row.
    #[must_use]
    pub fn add_condition(&self) -> Self {
        self.push_condition(FilterCondition::blank())
    }

    #[must_use]
    pub fn add_condition_for_field(&self, field: &str) -> Self {
        let mut condition = FilterCondition::blank();
        condition.field = field.to_string();
        self.push_condition(condition)
    }

    /// Appends a fully specified condition, joined to the previous one with `AND`.
    #[must_use]
    pub fn push_condition(&self, condition: FilterCondition) -> Self {
        let mut next = self.clone();
        next.conditions.push(condition);
        if next.conditions.len() > 1 {
            next.connectives.push(Connective::And);
        }
        next
    }

    #[must_use]
    pub fn update_condition(&self, id: Uuid, update: ConditionUpdate) -> Self {
        let mut next = self.clone();
        match next.conditions.iter_mut().find(|c| c.id == id) {
            Some(condition) => {
                if let Some(field) = update.field {
                    condition.field = field;
                }
                if let Some(operator) = update.operator {
                    condition.operator = operator;
                }
                if let Some(value) = update.value {
                    condition.value = value;
                }
            }
            None => debug!("update_condition: no condition with id {id}"),
        }
        next
    }

    /// Removes a condition together with the connective in front of it
    /// (or the first connective when the first condition goes).
    #[must_use]
    pub fn remove_condition(&self, id: Uuid) -> Self {
        let mut next = self.clone();
        let Some(index) = next.conditions.iter().position(|c| c.id == id) else {
            debug!("remove_condition: no condition with id {id}");
            return next;
        };
        next.conditions.remove(index);
        let connective_index = index.saturating_sub(1);
        if connective_index < next.connectives.len() {
            next.connectives.remove(connective_index);
        }
        next
    }

    #[must_use]
    pub fn set_connective(&self, index: usize, connective: Connective) -> Self {
        let mut next = self.clone();
        match next.connectives.get_mut(index) {
            Some(slot) => *slot = connective,
            None => debug!("set_connective: index {index} out of range"),
        }
        next
    }

    #[must_use]
    pub fn add_comparison_group(&self) -> Self {
        let name = format!("Group {}", self.comparison_groups.len() + 1);
        self.push_comparison_group(ComparisonGroup::new(name))
    }

    #[must_use]
    pub fn push_comparison_group(&self, group: ComparisonGroup) -> Self {
        let mut next = self.clone();
        next.comparison_groups.push(group);
        next
    }

    /// Applies a partial update; an explicit name marks the group as manually named.
    #[must_use]
    pub fn update_comparison_group(&self, id: Uuid, update: GroupUpdate) -> Self {
        self.edit_group(id, |group| {
            if let Some(conditions) = update.conditions {
                group.conditions = conditions;
                group.refresh_name();
            }
            if let Some(name) = update.name {
                group.name = name;
                group.custom_name = true;
            }
        })
    }

    #[must_use]
    pub fn add_comparison_condition(&self, group_id: Uuid, field: &str, value: Value) -> Self {
        self.edit_group(group_id, |group| {
            group.conditions.push(GroupCondition::new(field, value));
            group.refresh_name();
        })
    }

    #[must_use]
    pub fn update_comparison_condition(
        &self,
        group_id: Uuid,
        index: usize,
        field: &str,
        value: Value,
    ) -> Self {
        self.edit_group(group_id, |group| match group.conditions.get_mut(index) {
            Some(slot) => {
                *slot = GroupCondition::new(field, value);
                group.refresh_name();
            }
            None => debug!("update_comparison_condition: index {index} out of range"),
        })
    }

    #[must_use]
    pub fn remove_comparison_condition(&self, group_id: Uuid, index: usize) -> Self {
        self.edit_group(group_id, |group| {
            if index < group.conditions.len() {
                group.conditions.remove(index);
                group.refresh_name();
            }
        })
    }

    #[must_use]
    pub fn remove_comparison_group(&self, id: Uuid) -> Self {
        let mut next = self.clone();
        next.comparison_groups.retain(|g| g.id != id);
        next
    }

    #[must_use]
    pub fn set_visualization(&self, visualization: VisualizationType) -> Self {
        Self {
            visualization,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn set_aggregation(&self, aggregation_type: AggregationType) -> Self {
        Self {
            aggregation_type,
            ..self.clone()
        }
    }

    /// Routes a field dropped from the catalog to the matching configuration list.
    ///
    /// Dropping on comparisons adds a `field = true` constraint to the last group,
    /// creating a group first when there is none.
    #[must_use]
    pub fn handle_field_drop(&self, field: &str, zone: DropZone) -> Self {
        match zone {
            DropZone::Metrics => self.add_metric(field),
            DropZone::Dimensions => self.add_dimension(field),
            DropZone::Conditions => self.add_condition_for_field(field),
            DropZone::Comparisons => {
                let base = if self.comparison_groups.is_empty() {
                    self.add_comparison_group()
                } else {
                    self.clone()
                };
                match base.comparison_groups.last() {
                    Some(group) => base.add_comparison_condition(group.id, field, Value::Boolean(true)),
                    None => base,
                }
            }
        }
    }

    fn edit_group(&self, id: Uuid, edit: impl FnOnce(&mut ComparisonGroup)) -> Self {
        let mut next = self.clone();
        match next.comparison_groups.iter_mut().find(|g| g.id == id) {
            Some(group) => edit(group),
            None => debug!("No comparison group with id {id}"),
        }
        next
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, DatasetError> {
        let config: Self = serde_yaml::from_str(input)?;
        Ok(config.with_aligned_connectives())
    }

    pub fn from_json_str(input: &str) -> Result<Self, DatasetError> {
        let config: Self = serde_json::from_str(input)?;
        Ok(config.with_aligned_connectives())
    }

    /// Pads missing joins with `AND` and drops surplus ones so that there is exactly
    /// one connective between each pair of consecutive conditions.
    fn with_aligned_connectives(mut self) -> Self {
        let expected = self.conditions.len().saturating_sub(1);
        if self.connectives.len() != expected {
            debug!(
                "Aligning {} connective(s) to {} condition(s)",
                self.connectives.len(),
                self.conditions.len()
            );
            self.connectives.resize(expected, Connective::And);
        }
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening analysis config {path:?}"))?;
        let config = if is_json_path(path) {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
        .with_context(|| format!("Parsing analysis config {path:?}"))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = if is_json_path(path) {
            serde_json::to_string_pretty(self).context("Serializing analysis config JSON")?
        } else {
            serde_yaml::to_string(self).context("Serializing analysis config YAML")?
        };
        fs::write(path, serialized).with_context(|| format!("Writing analysis config {path:?}"))
    }
}

fn push_unique(list: &mut Vec<String>, field: &str) {
    if !list.iter().any(|existing| existing == field) {
        list.push(field.to_string());
    }
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
