use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::{debug, info};

use crate::{
    aggregate::{AggregationType, metric_value, reduce_metric},
    cli::{CompareArgs, OutputFormat, ProcessArgs},
    compare::{boolean_combinations, compare_groups, parse_group},
    config::AnalysisConfig,
    data::format_number,
    filter::parse_filters,
    io_utils,
    normalize::normalize,
    pipeline, table,
};

pub fn execute(args: &ProcessArgs) -> Result<()> {
    info!(
        "Processing {} -> {}",
        io_utils::describe(&args.input),
        args.output
            .as_deref()
            .map(io_utils::describe)
            .unwrap_or_else(|| "stdout".into())
    );
    let mut config = load_config(args.config.as_deref())?;
    config = layer_selection(config, &args.metrics, &args.dimensions, args.aggregation);
    config = layer_filters(config, &args.filters, &args.connectives)?;
    debug!(
        "Effective configuration: {} metric(s), {} dimension(s), {} condition(s), aggregation {:?}",
        config.metrics.len(),
        config.dimensions.len(),
        config.conditions.len(),
        config.aggregation_type
    );

    let records = normalize(io_utils::load_dataset(&args.input)?);
    let mut rows = pipeline::process(&records, &config);
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }

    let mut writer = io_utils::open_output(args.output.as_deref())?;
    match args.format {
        OutputFormat::Json => io_utils::write_json(&mut *writer, &rows)?,
        format => {
            let preferred = config
                .dimensions
                .iter()
                .chain(&config.metrics)
                .cloned()
                .collect::<Vec<_>>();
            let columns = table::record_columns(&rows, &preferred);
            let cells = table::record_rows(&rows, &columns);
            if format == OutputFormat::Csv {
                io_utils::write_csv(&mut *writer, &columns, &cells)?;
            } else {
                io_utils::write_table(&mut *writer, &columns, &cells)?;
            }
        }
    }
    info!(
        "Emitted {} row(s) from {} record(s)",
        rows.len(),
        records.len()
    );
    Ok(())
}

pub fn execute_compare(args: &CompareArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config = layer_selection(config, &args.metrics, &[], args.aggregation);
    for expr in &args.groups {
        let group =
            parse_group(expr).with_context(|| format!("Parsing comparison group '{expr}'"))?;
        config = config.push_comparison_group(group);
    }
    if !args.combinations.is_empty() {
        for group in boolean_combinations(&args.combinations) {
            config = config.push_comparison_group(group);
        }
    }
    if config.comparison_groups.is_empty() {
        return Err(anyhow!(
            "No comparison groups defined. Supply --group, --combinations or a config file."
        ));
    }

    let records = normalize(io_utils::load_dataset(&args.input)?);
    let groups = compare_groups(&records, &config.comparison_groups);

    let mut writer = io_utils::open_output(args.output.as_deref())?;
    if args.format == OutputFormat::Json {
        io_utils::write_json(&mut *writer, &groups)?;
    } else {
        let summarize = config.aggregation_type != AggregationType::None;
        let mut headers = vec!["group".to_string(), "records".to_string()];
        if summarize {
            headers.extend(config.metrics.iter().cloned());
        }
        let rows = groups
            .iter()
            .map(|(name, members)| {
                let mut row = vec![name.clone(), members.len().to_string()];
                if summarize {
                    row.extend(config.metrics.iter().map(|metric| {
                        let values = members
                            .iter()
                            .filter_map(|record| metric_value(record, metric))
                            .collect::<Vec<_>>();
                        reduce_metric(&values, config.aggregation_type)
                            .map(format_number)
                            .unwrap_or_default()
                    }));
                }
                row
            })
            .collect::<Vec<_>>();
        if args.format == OutputFormat::Csv {
            io_utils::write_csv(&mut *writer, &headers, &rows)?;
        } else {
            io_utils::write_table(&mut *writer, &headers, &rows)?;
        }
    }
    info!(
        "Compared {} record(s) across {} group(s)",
        records.len(),
        groups.len()
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path),
        None => Ok(AnalysisConfig::new()),
    }
}

fn layer_selection(
    config: AnalysisConfig,
    metrics: &[String],
    dimensions: &[String],
    aggregation: Option<AggregationType>,
) -> AnalysisConfig {
    let mut config = metrics
        .iter()
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .fold(config, |cfg, metric| cfg.add_metric(metric));
    config = dimensions
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .fold(config, |cfg, dimension| cfg.add_dimension(dimension));
    match aggregation {
        Some(aggregation) => config.set_aggregation(aggregation),
        None => config,
    }
}

/// Appends command-line filters after any configured ones. `--connective` values
/// fill, in order, the joins those filters introduce.
fn layer_filters(
    config: AnalysisConfig,
    filters: &[String],
    connectives: &[crate::filter::Connective],
) -> Result<AnalysisConfig> {
    let first_new_join = config.connectives.len();
    let mut config = parse_filters(filters)?
        .into_iter()
        .fold(config, |cfg, condition| cfg.push_condition(condition));
    let available = config.connectives.len() - first_new_join;
    if connectives.len() > available {
        return Err(anyhow!(
            "Received {} connective(s) but the filters only introduce {available} join(s)",
            connectives.len()
        ));
    }
    for (offset, connective) in connectives.iter().enumerate() {
        config = config.set_connective(first_new_join + offset, *connective);
    }
    Ok(config)
}
