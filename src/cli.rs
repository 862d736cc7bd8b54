use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    aggregate::AggregationType, catalog::CatalogStrategy, config::VisualizationType,
    filter::Connective,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Explore semi-structured records: normalize, filter, aggregate and compare", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode embedded property payloads and emit normalized records as JSON
    Normalize(NormalizeArgs),
    /// List the analyzable fields of a dataset with their inferred types
    Fields(FieldsArgs),
    /// Filter records and optionally aggregate metrics by dimensions
    Process(ProcessArgs),
    /// Partition records into named comparison groups
    Compare(CompareArgs),
    /// Write an analysis configuration file with default settings
    Init(InitArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Input JSON dataset (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    /// Input JSON dataset (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// How records are scanned for fields
    #[arg(long, value_enum, default_value_t = CatalogStrategy::Exhaustive)]
    pub strategy: CatalogStrategy,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Input JSON dataset (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Analysis configuration file (.yaml or .json)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Metric fields to aggregate (comma-separated or repeated)
    #[arg(short = 'm', long = "metric", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub metrics: Vec<String>,
    /// Dimension fields to group by (comma-separated or repeated)
    #[arg(short = 'd', long = "dimension", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub dimensions: Vec<String>,
    /// Conditions such as `time >= 100` or `platform contains and`
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    /// Connectives placed between consecutive filters (default `and`)
    #[arg(long = "connective", value_enum, action = clap::ArgAction::Append)]
    pub connectives: Vec<Connective>,
    /// Aggregation applied to each metric
    #[arg(short = 'a', long = "aggregation", value_enum)]
    pub aggregation: Option<AggregationType>,
    /// Limit number of rows emitted
    #[arg(long)]
    pub limit: Option<usize>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Input JSON dataset (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Analysis configuration file (.yaml or .json)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Groups of the form `[name:]field=value[,field=value...]`
    #[arg(short = 'g', long = "group", action = clap::ArgAction::Append)]
    pub groups: Vec<String>,
    /// Generate one group per true/false combination of these boolean fields
    #[arg(long = "combinations", value_delimiter = ',')]
    pub combinations: Vec<String>,
    /// Metric fields summarized per group (comma-separated or repeated)
    #[arg(short = 'm', long = "metric", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub metrics: Vec<String>,
    /// Aggregation applied to each metric within a group
    #[arg(short = 'a', long = "aggregation", value_enum)]
    pub aggregation: Option<AggregationType>,
    /// Output format; JSON emits the member records of every group
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Destination configuration file (.yaml or .json)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Visualization type recorded in the configuration
    #[arg(long, value_enum, default_value_t = VisualizationType::Bar)]
    pub visualization: VisualizationType,
    /// Aggregation recorded in the configuration
    #[arg(short = 'a', long = "aggregation", value_enum, default_value_t = AggregationType::Sum)]
    pub aggregation: AggregationType,
}
