pub mod aggregate;
pub mod catalog;
pub mod cli;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod io_utils;
pub mod normalize;
pub mod pipeline;
pub mod process;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::cli::{Cli, Commands, OutputFormat};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("record_lens", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize(args) => handle_normalize(&args),
        Commands::Fields(args) => handle_fields(&args),
        Commands::Process(args) => process::execute(&args),
        Commands::Compare(args) => process::execute_compare(&args),
        Commands::Init(args) => handle_init(&args),
    }
}

fn handle_normalize(args: &cli::NormalizeArgs) -> Result<()> {
    info!("Normalizing {}", io_utils::describe(&args.input));
    let records = normalize::normalize(io_utils::load_dataset(&args.input)?);
    let mut writer = io_utils::open_output(args.output.as_deref())?;
    io_utils::write_json(&mut *writer, &records).context("Writing normalized records")?;
    info!("Normalized {} record(s)", records.len());
    Ok(())
}

fn handle_fields(args: &cli::FieldsArgs) -> Result<()> {
    info!(
        "Cataloguing fields of {} ({:?} scan)",
        io_utils::describe(&args.input),
        args.strategy
    );
    let records = normalize::normalize(io_utils::load_dataset(&args.input)?);
    let fields = catalog::build_field_catalog_with(&records, args.strategy);
    debug!(
        "Catalog: {:?}",
        fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>()
    );
    let mut writer = io_utils::open_output(None)?;
    match args.format {
        OutputFormat::Json => io_utils::write_json(&mut *writer, &fields)?,
        format => {
            let headers = vec!["#".to_string(), "name".to_string(), "type".to_string(), "category".to_string()];
            let rows = fields
                .iter()
                .enumerate()
                .map(|(idx, field)| {
                    vec![
                        (idx + 1).to_string(),
                        field.name.clone(),
                        field.field_type.as_str().to_string(),
                        if field.is_custom() {
                            data::DECODED_FIELD.to_string()
                        } else {
                            String::new()
                        },
                    ]
                })
                .collect::<Vec<_>>();
            if format == OutputFormat::Csv {
                io_utils::write_csv(&mut *writer, &headers, &rows)?;
            } else {
                io_utils::write_table(&mut *writer, &headers, &rows)?;
            }
        }
    }
    info!("Found {} field(s) across {} record(s)", fields.len(), records.len());
    Ok(())
}

fn handle_init(args: &cli::InitArgs) -> Result<()> {
    let config = config::AnalysisConfig::new()
        .set_visualization(args.visualization)
        .set_aggregation(args.aggregation);
    config
        .save(&args.output)
        .with_context(|| format!("Writing analysis config to {:?}", args.output))?;
    info!("Analysis configuration written to {:?}", args.output);
    Ok(())
}
