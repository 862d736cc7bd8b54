use std::fs;
use std::path::{Path, PathBuf};

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use record_lens::aggregate::AggregationType;
use record_lens::cli::{OutputFormat, ProcessArgs};
use record_lens::config::AnalysisConfig;
use record_lens::data::Record;
use record_lens::filter::{ComparisonOperator, FilterCondition};
use record_lens::normalize::normalize;
use record_lens::{pipeline, process};
use serde_json::json;
use tempfile::TempDir;

const PLATFORMS: [&str; 3] = ["Android", "iOS", "web"];

fn generate_sessions(rows: usize) -> Vec<Record> {
    (0..rows)
        .map(|i| {
            let payload = format!(
                "{{'isOfferApplied':{},'itemsInCart':{},'inventoryCount':{},'time':{}}}",
                i % 2 == 0,
                i % 25,
                100 + i % 400,
                30 + i % 200
            );
            Record::new()
                .with_payload(&payload)
                .with_field("appversion", format!("3.7.{}", i % 4))
                .with_field("userid", i as i64)
                .with_field("platform", PLATFORMS[i % PLATFORMS.len()])
        })
        .collect()
}

fn write_dataset(records: &[Record]) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = temp_dir.path().join("sessions.json");
    let envelope = json!({ "data": { "result": records }, "status": 200 });
    fs::write(&path, serde_json::to_vec(&envelope).expect("serialize dataset")).expect("write dataset");
    (temp_dir, path)
}

fn analysis_config() -> AnalysisConfig {
    AnalysisConfig::new()
        .add_metric("time")
        .add_metric("itemsInCart")
        .add_dimension("platform")
        .add_dimension("appversion")
        .push_condition(FilterCondition::new(
            "isOfferApplied",
            ComparisonOperator::Equals,
            true,
        ))
        .set_aggregation(AggregationType::Average)
}

fn process_args(input: &Path, output: &Path) -> ProcessArgs {
    ProcessArgs {
        input: input.to_path_buf(),
        output: Some(output.to_path_buf()),
        config: None,
        metrics: vec!["time".to_string()],
        dimensions: vec!["platform".to_string()],
        filters: vec!["time > 100".to_string()],
        connectives: Vec::new(),
        aggregation: Some(AggregationType::Sum),
        limit: None,
        format: OutputFormat::Csv,
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let raw = generate_sessions(20_000);
    let normalized = normalize(raw.clone());
    let config = analysis_config();
    let (temp_dir, dataset) = write_dataset(&raw);
    let output = temp_dir.path().join("summary.csv");
    let args = process_args(&dataset, &output);

    let mut group = c.benchmark_group("pipeline");

    group.bench_function("normalize", |b| {
        b.iter_batched(|| raw.clone(), normalize, BatchSize::LargeInput);
    });

    group.bench_function("filter_and_aggregate", |b| {
        b.iter(|| pipeline::process(&normalized, &config));
    });

    group.bench_function("cli_process", |b| {
        b.iter(|| process::execute(&args).expect("process dataset"));
    });

    drop(temp_dir);
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
