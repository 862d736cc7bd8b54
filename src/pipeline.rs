use indexmap::IndexMap;
use log::{debug, info};

use crate::{
    aggregate::{aggregate_records, should_aggregate},
    catalog::{CatalogStrategy, FieldDescriptor, build_field_catalog_with},
    compare::compare_groups,
    config::AnalysisConfig,
    data::Record,
    error::DatasetError,
    filter::filter_records,
    ingest,
    normalize::normalize,
};

/// Filters, then aggregates when the configuration asks for it.
pub fn process(records: &[Record], config: &AnalysisConfig) -> Vec<Record> {
    let filtered = filter_records(records, &config.conditions, &config.connectives);
    debug!(
        "Filtered {} record(s) down to {} with {} condition(s)",
        records.len(),
        filtered.len(),
        config.conditions.len()
    );
    if !should_aggregate(config.aggregation_type, &config.metrics, &config.dimensions) {
        return filtered;
    }
    aggregate_records(
        &filtered,
        &config.metrics,
        &config.dimensions,
        config.aggregation_type,
    )
}

/// Session-scoped owner of the normalized dataset and the current configuration.
///
/// Derived views are recomputed from scratch on every call; nothing is cached.
#[derive(Debug, Clone, Default)]
pub struct Session {
    records: Vec<Record>,
    config: AnalysisConfig,
    strategy: CatalogStrategy,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(strategy: CatalogStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Loads a JSON document (bare array or API envelope), replacing the dataset.
    ///
    /// On failure the dataset is cleared, mirroring a failed load in the UI.
    pub fn load_json(&mut self, input: &str) -> Result<usize, DatasetError> {
        match ingest::parse_dataset(input) {
            Ok(records) => Ok(self.replace_records(records)),
            Err(err) => {
                self.records.clear();
                Err(err)
            }
        }
    }

    pub fn replace_records(&mut self, raw: Vec<Record>) -> usize {
        self.records = normalize(raw);
        info!("Loaded {} record(s)", self.records.len());
        self.records.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AnalysisConfig) {
        self.config = config;
    }

    /// Replaces the configuration with the revision produced by `edit`.
    ///
    /// Returns whether the revision differs from the previous one.
    pub fn apply(&mut self, edit: impl FnOnce(&AnalysisConfig) -> AnalysisConfig) -> bool {
        let next = edit(&self.config);
        let changed = next != self.config;
        self.config = next;
        changed
    }

    pub fn fields(&self) -> Vec<FieldDescriptor> {
        build_field_catalog_with(&self.records, self.strategy)
    }

    pub fn processed(&self) -> Vec<Record> {
        process(&self.records, &self.config)
    }

    pub fn comparison(&self) -> IndexMap<String, Vec<Record>> {
        compare_groups(&self.records, &self.config.comparison_groups)
    }
}
