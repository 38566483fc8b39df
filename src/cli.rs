use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{sql::SqlLayout, transform::TransformMode};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Weave CSV files into nested JSON, SQL inserts, and distribution reports",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse, transform, report, render SQL, and store a CSV file
    Process(ProcessArgs),
    /// Parse a CSV file into nested JSON records
    Parse(ParseArgs),
    /// Print the distribution of one numeric column
    Report(ReportArgs),
    /// Render SQL INSERT statements for a CSV file
    Sql(SqlArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// YAML settings file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Validation policy for name and age fields
    #[arg(long, value_enum)]
    pub mode: Option<TransformMode>,
    /// Numeric column to chart (defaults to age, then the first numeric column)
    #[arg(short = 'C', long = "column")]
    pub column: Option<String>,
    /// Upload endpoint receiving the transformed records
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Upload timeout in seconds
    #[arg(long = "timeout-secs")]
    pub timeout_secs: Option<u64>,
    /// Keep records in memory instead of posting them to the endpoint
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Write the transformed records as pretty JSON to this file
    #[arg(long = "json-out")]
    pub json_out: Option<PathBuf>,
    /// Write the generated SQL to this file
    #[arg(long = "sql-out")]
    pub sql_out: Option<PathBuf>,
    /// Table layout for generated SQL
    #[arg(long = "sql-layout", value_enum)]
    pub sql_layout: Option<SqlLayout>,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// YAML settings file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Numeric column to chart (defaults to age, then the first numeric column)
    #[arg(short = 'C', long = "column")]
    pub column: Option<String>,
    /// Validation policy for name and age fields
    #[arg(long, value_enum)]
    pub mode: Option<TransformMode>,
}

#[derive(Debug, Args)]
pub struct SqlArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// YAML settings file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Output SQL file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Table layout for generated SQL
    #[arg(long = "layout", value_enum)]
    pub layout: Option<SqlLayout>,
    /// Validation policy for name and age fields
    #[arg(long, value_enum)]
    pub mode: Option<TransformMode>,
}
