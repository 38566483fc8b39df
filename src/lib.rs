pub mod cli;
pub mod config;
pub mod distribution;
pub mod error;
pub mod io_utils;
pub mod parser;
pub mod pipeline;
pub mod session;
pub mod sql;
pub mod storage;
pub mod table;
pub mod transform;
pub mod value;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, InputArgs},
    config::WeaverConfig,
    pipeline::PipelineOptions,
    storage::{HttpStorageGateway, MemoryStorageGateway, StorageGateway},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_weaver", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Process(args) => handle_process(&args),
        Commands::Parse(args) => handle_parse(&args),
        Commands::Report(args) => handle_report(&args),
        Commands::Sql(args) => handle_sql(&args),
    }
}

fn load_csv_text(source: &InputArgs) -> Result<String> {
    let encoding = io_utils::resolve_encoding(source.input_encoding.as_deref())?;
    debug!(
        "Reading '{}' as {}",
        source.input.display(),
        encoding.name()
    );
    io_utils::read_input_text(&source.input, encoding)
}

fn input_label(path: &Path) -> String {
    if io_utils::is_dash(path) {
        "stdin".to_string()
    } else {
        path.display().to_string()
    }
}

fn handle_process(args: &cli::ProcessArgs) -> Result<()> {
    let config = WeaverConfig::load_or_default(args.config.as_deref())?;
    let options = PipelineOptions {
        mode: args.mode.unwrap_or(config.mode),
        report_column: args.column.clone().or_else(|| config.report_column.clone()),
        sql_layout: args.sql_layout.unwrap_or(config.sql_layout),
    };
    let label = input_label(&args.source.input);
    let text = load_csv_text(&args.source)?;

    let gateway: Box<dyn StorageGateway> = if args.dry_run {
        info!("Dry run: records stay in memory");
        Box::new(MemoryStorageGateway::new())
    } else {
        let endpoint = args.endpoint.clone().unwrap_or_else(|| config.endpoint.clone());
        let timeout = args
            .timeout_secs
            .map_or_else(|| config.timeout(), std::time::Duration::from_secs);
        Box::new(
            HttpStorageGateway::new(endpoint, timeout).context("Building upload client")?,
        )
    };

    info!("Processing '{label}' in {:?} mode", options.mode);
    let output = pipeline::run(&text, &options, gateway.as_ref())
        .with_context(|| format!("Failed to process '{label}'"))?;

    if let Some(path) = &args.json_out {
        let json = serde_json::to_string_pretty(&output.records)?;
        io_utils::write_output(Some(path), &json)
            .with_context(|| format!("Writing JSON to {path:?}"))?;
        info!("Wrote {} record(s) to {:?}", output.record_count, path);
    }
    if let Some(path) = &args.sql_out {
        io_utils::write_output(Some(path), &output.sql)
            .with_context(|| format!("Writing SQL to {path:?}"))?;
        info!("Wrote SQL to {:?}", path);
    }

    print!(
        "{}",
        table::render_distribution(&output.report_column, &output.distribution)
    );
    println!(
        "{} record(s) processed. {}",
        output.record_count, output.storage.message
    );
    Ok(())
}

fn handle_parse(args: &cli::ParseArgs) -> Result<()> {
    let label = input_label(&args.source.input);
    let text = load_csv_text(&args.source)?;
    let parsed = parser::parse(&text)
        .map_err(error::PipelineError::from)
        .with_context(|| format!("Failed to parse '{label}'"))?;
    info!(
        "Parsed {} record(s) from '{label}'; numeric columns: [{}]",
        parsed.records.len(),
        parsed.numeric_columns.join(", ")
    );
    let json = serde_json::to_string_pretty(&parsed.records)?;
    io_utils::write_output(args.output.as_deref(), &json)
}

fn handle_report(args: &cli::ReportArgs) -> Result<()> {
    let config = WeaverConfig::load_or_default(args.config.as_deref())?;
    let mode = args.mode.unwrap_or(config.mode);
    let requested = args.column.clone().or(config.report_column);
    let label = input_label(&args.source.input);
    let text = load_csv_text(&args.source)?;
    let batch = pipeline::transform_text(&text, mode)
        .with_context(|| format!("Failed to process '{label}'"))?;
    let (column, bins) = pipeline::report(&batch, requested.as_deref())
        .with_context(|| format!("Failed to report on '{label}'"))?;
    print!("{}", table::render_distribution(&column, &bins));
    Ok(())
}

fn handle_sql(args: &cli::SqlArgs) -> Result<()> {
    let config = WeaverConfig::load_or_default(args.config.as_deref())?;
    let mode = args.mode.unwrap_or(config.mode);
    let layout = args.layout.unwrap_or(config.sql_layout);
    let label = input_label(&args.source.input);
    let text = load_csv_text(&args.source)?;
    let batch = pipeline::transform_text(&text, mode)
        .with_context(|| format!("Failed to process '{label}'"))?;
    let rendered = sql::render(&batch.records, layout);
    info!(
        "Rendered {} statement(s) for {:?} layout",
        batch.records.len(),
        layout
    );
    io_utils::write_output(args.output.as_deref(), &rendered)
}
