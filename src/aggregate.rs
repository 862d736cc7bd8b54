use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::{FieldMap, Record, Value, parse_js_number, resolve_field};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    None,
    #[default]
    Sum,
    Average,
    Min,
    Max,
    Count,
}

/// Aggregation only runs with a reducing function, a metric and a dimension.
pub fn should_aggregate(
    aggregation: AggregationType,
    metrics: &[String],
    dimensions: &[String],
) -> bool {
    aggregation != AggregationType::None && !metrics.is_empty() && !dimensions.is_empty()
}

/// Groups records by their dimension tuple and reduces each metric per group.
///
/// Passes the records through untouched when [`should_aggregate`] is false.
/// A metric with no numeric values in a group is left out of that group's row.
pub fn aggregate_records(
    records: &[Record],
    metrics: &[String],
    dimensions: &[String],
    aggregation: AggregationType,
) -> Vec<Record> {
    if !should_aggregate(aggregation, metrics, dimensions) {
        return records.to_vec();
    }

    let mut groups: IndexMap<Vec<Option<String>>, GroupAccumulator> = IndexMap::new();
    for record in records {
        let key = dimensions
            .iter()
            .map(|dim| resolve_field(record, dim).map(Value::as_display))
            .collect::<Vec<_>>();
        groups
            .entry(key)
            .or_insert_with(|| GroupAccumulator::new(metrics.len()))
            .ingest(record, metrics);
    }
    debug!(
        "Aggregated {} record(s) into {} group(s) by {:?}",
        records.len(),
        groups.len(),
        dimensions
    );

    groups
        .into_iter()
        .map(|(key, accumulator)| accumulator.render(&key, dimensions, metrics, aggregation))
        .collect()
}

/// Reduces a list of numeric values; `None` when there is nothing to reduce.
pub fn reduce_metric(values: &[f64], aggregation: AggregationType) -> Option<f64> {
    let mut stats = MetricStats::default();
    for value in values {
        stats.add_value(*value);
    }
    stats.value(aggregation)
}

/// Numeric view of a metric field; booleans and non-numeric text are skipped.
pub fn metric_value(record: &Record, metric: &str) -> Option<f64> {
    resolve_field(record, metric).and_then(Value::as_number)
}

struct GroupAccumulator {
    metrics: Vec<MetricStats>,
}

impl GroupAccumulator {
    fn new(metric_count: usize) -> Self {
        Self {
            metrics: vec![MetricStats::default(); metric_count],
        }
    }

    fn ingest(&mut self, record: &Record, metrics: &[String]) {
        for (stats, metric) in self.metrics.iter_mut().zip(metrics) {
            if let Some(value) = metric_value(record, metric) {
                stats.add_value(value);
            }
        }
    }

    fn render(
        &self,
        key: &[Option<String>],
        dimensions: &[String],
        metrics: &[String],
        aggregation: AggregationType,
    ) -> Record {
        let mut fields = FieldMap::new();
        for (dimension, part) in dimensions.iter().zip(key) {
            fields.insert(dimension.clone(), retype_key_part(part.as_deref()));
        }
        for (metric, stats) in metrics.iter().zip(&self.metrics) {
            if let Some(value) = stats.value(aggregation) {
                fields.insert(metric.clone(), Value::Number(value));
            }
        }
        Record::from_fields(fields)
    }
}

fn retype_key_part(part: Option<&str>) -> Value {
    match part {
        None => Value::Null,
        Some(text) => parse_js_number(text)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
    }
}

#[derive(Debug, Clone, Default)]
struct MetricStats {
    count: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl MetricStats {
    fn add_value(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(match self.min {
            Some(current) => current.min(value),
            None => value,
        });
        self.max = Some(match self.max {
            Some(current) => current.max(value),
            None => value,
        });
    }

    fn value(&self, aggregation: AggregationType) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        match aggregation {
            AggregationType::None => None,
            AggregationType::Sum => Some(self.sum),
            AggregationType::Average => Some(self.sum / self.count as f64),
            AggregationType::Min => self.min,
            AggregationType::Max => self.max,
            AggregationType::Count => Some(self.count as f64),
        }
    }
}
