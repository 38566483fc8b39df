//! Parse, transform, analyze, render, and store one CSV upload.
//!
//! Stages run in order and the first failure aborts the rest; no partial
//! output is returned.

use log::info;
use serde::Serialize;

use crate::{
    distribution::{self, HistogramBin},
    error::{ParseError, Result},
    parser,
    sql::{self, SqlLayout},
    storage::{StorageGateway, StorageOutcome},
    transform::{self, TransformMode, TransformedRecord},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub mode: TransformMode,
    /// Column to chart; defaults to `age` or the first numeric column.
    pub report_column: Option<String>,
    pub sql_layout: SqlLayout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub records: Vec<TransformedRecord>,
    pub report_column: String,
    pub numeric_columns: Vec<String>,
    pub distribution: Vec<HistogramBin>,
    pub sql: String,
    pub record_count: usize,
    pub storage: StorageOutcome,
}

/// Parsed and transformed records, plus the columns that can be charted.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedBatch {
    pub records: Vec<TransformedRecord>,
    pub numeric_columns: Vec<String>,
}

/// Everything computed locally, before the storage hand-off.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalArtifacts {
    pub records: Vec<TransformedRecord>,
    pub report_column: String,
    pub numeric_columns: Vec<String>,
    pub distribution: Vec<HistogramBin>,
    pub sql: String,
}

/// Parses the CSV text and reshapes every row.
pub fn transform_text(csv_text: &str, mode: TransformMode) -> Result<TransformedBatch> {
    let parsed = parser::parse(csv_text)?;
    if parsed.records.is_empty() {
        return Err(ParseError::NoDataRows.into());
    }
    info!(
        "Parsed {} record(s) across {} column(s); numeric: [{}]",
        parsed.records.len(),
        parsed.headers.len(),
        parsed.numeric_columns.join(", ")
    );

    let records = transform::transform(&parsed.records, mode)?;
    info!("Transformed {} record(s) using {mode:?} mode", records.len());
    Ok(TransformedBatch {
        records,
        numeric_columns: parsed.numeric_columns,
    })
}

/// Picks the report column (the requested one, or the default) and bins it.
pub fn report(
    batch: &TransformedBatch,
    requested: Option<&str>,
) -> Result<(String, Vec<HistogramBin>)> {
    let column = match requested {
        Some(column) => {
            distribution::ensure_numeric_column(column, &batch.numeric_columns)?;
            column.to_string()
        }
        None => distribution::default_column(&batch.numeric_columns)?,
    };
    let bins = distribution::analyze(&batch.records, &column);
    info!("Distribution for '{column}' uses {} bin(s)", bins.len());
    Ok((column, bins))
}

/// Runs every stage except storage.
pub fn prepare(csv_text: &str, options: &PipelineOptions) -> Result<LocalArtifacts> {
    let batch = transform_text(csv_text, options.mode)?;
    let (report_column, distribution) = report(&batch, options.report_column.as_deref())?;
    let sql = sql::render(&batch.records, options.sql_layout);
    Ok(LocalArtifacts {
        records: batch.records,
        report_column,
        numeric_columns: batch.numeric_columns,
        distribution,
        sql,
    })
}

pub fn run(
    csv_text: &str,
    options: &PipelineOptions,
    gateway: &dyn StorageGateway,
) -> Result<PipelineOutput> {
    let local = prepare(csv_text, options)?;
    let storage = gateway.store(&local.records)?;
    info!("Storage replied: {}", storage.message);
    Ok(PipelineOutput {
        record_count: local.records.len(),
        records: local.records,
        report_column: local.report_column,
        numeric_columns: local.numeric_columns,
        distribution: local.distribution,
        sql: local.sql,
        storage,
    })
}
