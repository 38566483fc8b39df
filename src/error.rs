//! Error taxonomy for the weaving pipeline.
//!
//! Each stage owns one error type; [`PipelineError`] wraps them and prefixes
//! the message with the stage that failed. Every error is terminal for the
//! current invocation.

use thiserror::Error;

/// Malformed CSV shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("CSV file is empty")]
    Empty,

    #[error("CSV must have a header row and at least one data row")]
    MissingDataRow,

    /// A data line whose field count differs from the header's.
    #[error("Row {line} has {found} values, but header has {expected} columns")]
    ArityMismatch {
        /// 1-based physical line number.
        line: u64,
        found: usize,
        expected: usize,
    },

    #[error("CSV file contains no data rows")]
    NoDataRows,

    #[error("failed to tokenize CSV: {0}")]
    Tokenize(String),
}

/// A record is missing a field required by the strict transform policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record {id} is missing name.firstName or name.lastName")]
    MissingName { id: usize },

    #[error("record {id} ({name}) has a missing or invalid age")]
    InvalidAge { id: usize, name: String },
}

/// The distribution report cannot be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("no numeric columns available for reporting")]
    NoNumericColumns,

    #[error("column '{column}' is not numeric; available: {available}")]
    NotNumeric { column: String, available: String },

    #[error("no processed upload to analyze")]
    NothingProcessed,
}

/// Transport failure or non-success reply from the storage endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API call failed: {message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::new(err.to_string())
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Another `process` call is still outstanding on the same session.
    #[error("a CSV file is already being processed")]
    Busy,
}

impl PipelineError {
    /// Short stage name, used in log lines.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Validation(_) => "validation",
            Self::Analysis(_) => "analysis",
            Self::Storage(_) => "storage",
            Self::Busy => "session",
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_stage_prefix() {
        let err = PipelineError::from(ParseError::ArityMismatch {
            line: 3,
            found: 3,
            expected: 2,
        });
        assert_eq!(
            err.to_string(),
            "parse error: Row 3 has 3 values, but header has 2 columns"
        );
        assert_eq!(err.stage(), "parse");
    }

    #[test]
    fn storage_errors_share_a_prefix() {
        let err = PipelineError::from(StorageError::new("connection refused"));
        assert_eq!(
            err.to_string(),
            "storage error: API call failed: connection refused"
        );
    }
}
