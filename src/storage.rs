//! Hand-off of transformed batches to a storage endpoint.
//!
//! [`HttpStorageGateway`] posts the batch as a JSON array to the upload
//! endpoint. [`MemoryStorageGateway`] keeps rows in process with the same
//! all-or-nothing batch semantics and is used for dry runs.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::{error::StorageError, transform::TransformedRecord};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/upload";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest request body the upload endpoint accepts.
pub const MAX_PAYLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageOutcome {
    pub message: String,
    pub stored: usize,
}

pub trait StorageGateway {
    /// Persists the whole batch or nothing.
    fn store(&self, records: &[TransformedRecord]) -> Result<StorageOutcome, StorageError>;
}

/// Reply body of the upload endpoint, for both success and failure.
#[derive(Debug, Default, Deserialize)]
struct UploadReply {
    message: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

pub struct HttpStorageGateway {
    client: Client,
    endpoint: String,
}

impl HttpStorageGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl StorageGateway for HttpStorageGateway {
    fn store(&self, records: &[TransformedRecord]) -> Result<StorageOutcome, StorageError> {
        info!(
            "Sending {} record(s) to {}",
            records.len(),
            self.endpoint
        );
        let response = self.client.post(&self.endpoint).json(records).send()?;
        let status = response.status();
        let reply: UploadReply = response.json().unwrap_or_else(|err| {
            debug!("Upload reply was not JSON: {err}");
            UploadReply::default()
        });

        if status.is_success() {
            let message = reply
                .message
                .unwrap_or_else(|| format!("Stored {} records.", records.len()));
            return Ok(StorageOutcome {
                message,
                stored: records.len(),
            });
        }

        let error = reply
            .error
            .unwrap_or_else(|| "Unknown server error.".to_string());
        warn!(
            "Upload rejected with status {status}: {error} {}",
            reply.details.as_deref().unwrap_or_default()
        );
        let message = match reply.details {
            Some(details) => format!("DB insertion failed: {error} ({details})"),
            None => format!("DB insertion failed: {error}"),
        };
        Err(StorageError::new(message))
    }
}

/// A persisted row in the flexible layout: the age plus the rest as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRow {
    pub record_age: Option<f64>,
    pub data_json: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct MemoryStorageGateway {
    rows: Mutex<Vec<StoredRow>>,
    capacity: Option<usize>,
}

impl MemoryStorageGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses any batch that would take it past `capacity` rows.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            capacity: Some(capacity),
        }
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn rejected(error: &str, details: Option<String>) -> StorageError {
    match details {
        Some(details) => StorageError::new(format!("DB insertion failed: {error} ({details})")),
        None => StorageError::new(format!("DB insertion failed: {error}")),
    }
}

impl StorageGateway for MemoryStorageGateway {
    fn store(&self, records: &[TransformedRecord]) -> Result<StorageOutcome, StorageError> {
        if records.is_empty() {
            return Err(rejected("No record data provided or invalid format.", None));
        }
        let payload = serde_json::to_vec(records)
            .map_err(|err| rejected("Invalid record payload.", Some(err.to_string())))?;
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(rejected(
                "request entity too large",
                Some(format!("{} bytes exceeds {MAX_PAYLOAD_BYTES}", payload.len())),
            ));
        }

        let mut staged = Vec::with_capacity(records.len());
        for record in records {
            let data_json = serde_json::to_value(record.shape(false)).map_err(|err| {
                rejected(
                    "An error occurred while inserting data.",
                    Some(err.to_string()),
                )
            })?;
            let record_age = Some(record.primary_metric).filter(|age| *age != 0.0);
            staged.push(StoredRow {
                record_age,
                data_json,
            });
        }

        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(capacity) = self.capacity
            && rows.len() + staged.len() > capacity
        {
            debug!("Rolling back batch of {} row(s)", staged.len());
            return Err(rejected(
                "An error occurred while inserting data.",
                Some(format!("capacity of {capacity} rows exceeded")),
            ));
        }
        rows.extend(staged);
        info!("Stored {} record(s) in memory", records.len());
        Ok(StorageOutcome {
            message: format!("Successfully inserted {} records.", records.len()),
            stored: records.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        parser::parse,
        transform::{TransformMode, transform},
    };

    fn records(text: &str) -> Vec<TransformedRecord> {
        let parsed = parse(text).expect("parse");
        transform(&parsed.records, TransformMode::Lenient).expect("transform")
    }

    #[test]
    fn memory_gateway_stores_flexible_rows() {
        let gateway = MemoryStorageGateway::new();
        let outcome = gateway
            .store(&records("name,age,team\nAlice,30,blue\nBob,,red\n"))
            .expect("store");
        assert_eq!(outcome.message, "Successfully inserted 2 records.");
        let rows = gateway.rows();
        assert_eq!(rows[0].record_age, Some(30.0));
        assert_eq!(rows[1].record_age, None);
        assert!(rows[0].data_json.get("age").is_none());
        assert_eq!(rows[0].data_json["name"], "Alice");
    }

    #[test]
    fn memory_gateway_rejects_empty_batch() {
        let err = MemoryStorageGateway::new().store(&[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "API call failed: DB insertion failed: No record data provided or invalid format."
        );
    }

    #[test]
    fn memory_gateway_rolls_back_whole_batch() {
        let gateway = MemoryStorageGateway::with_capacity_limit(3);
        gateway
            .store(&records("name\nA\nB\n"))
            .expect("first batch fits");
        let err = gateway.store(&records("name\nC\nD\n")).unwrap_err();
        assert!(err.message.contains("capacity of 3 rows exceeded"));
        assert_eq!(gateway.len(), 2);
    }
}
