//! Interactive state around the pipeline: one upload at a time, column
//! re-selection without re-running the transform, and a full reset.

use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use log::{debug, warn};

use crate::{
    distribution::{self, HistogramBin},
    error::{AnalysisError, PipelineError, Result},
    pipeline::{self, PipelineOptions, PipelineOutput},
    storage::StorageGateway,
};

/// Entry point for embedding the pipeline behind an interactive front end.
///
/// The command-line tool runs one pipeline per invocation and does not need
/// it. A front end keeps one `Session` per user: [`Session::process`] runs an
/// upload, [`Session::select_column`] re-charts the retained records, and
/// [`Session::clear`] resets.
#[derive(Debug, Default)]
pub struct Session {
    busy: AtomicBool,
    last: Mutex<Option<PipelineOutput>>,
}

/// Clears the busy flag when a `process` call ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs the full pipeline and keeps the output for later column changes.
    pub fn process(
        &self,
        csv_text: &str,
        options: &PipelineOptions,
        gateway: &dyn StorageGateway,
    ) -> Result<PipelineOutput> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PipelineError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        self.clear();
        match pipeline::run(csv_text, options, gateway) {
            Ok(output) => {
                *self.slot() = Some(output.clone());
                Ok(output)
            }
            Err(err) => {
                warn!("Processing failed at the {} stage: {err}", err.stage());
                Err(err)
            }
        }
    }

    /// Re-runs only the distribution for another numeric column.
    pub fn select_column(&self, column: &str) -> Result<Vec<HistogramBin>> {
        let mut slot = self.slot();
        let Some(output) = slot.as_mut() else {
            return Err(AnalysisError::NothingProcessed.into());
        };
        distribution::ensure_numeric_column(column, &output.numeric_columns)?;
        let bins = distribution::analyze(&output.records, column);
        debug!("Re-analyzed '{column}' into {} bin(s)", bins.len());
        output.report_column = column.to_string();
        output.distribution = bins.clone();
        Ok(bins)
    }

    pub fn last_output(&self) -> Option<PipelineOutput> {
        self.slot().clone()
    }

    pub fn clear(&self) {
        *self.slot() = None;
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<PipelineOutput>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
